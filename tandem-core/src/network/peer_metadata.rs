use crate::StorageId;

/// Metadata about a peer exchanged during the handshake.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct PeerMetadata {
    /// Whether the peer expects to connect again with this storage ID
    pub is_ephemeral: bool,
    /// The storage ID of this peer
    pub storage_id: Option<StorageId>,
}
