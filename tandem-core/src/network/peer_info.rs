use crate::PeerId;

use super::PeerMetadata;

/// What we learned about the remote peer during the handshake
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PeerInfo {
    pub peer_id: PeerId,
    pub metadata: Option<PeerMetadata>,
    pub protocol_version: String,
}
