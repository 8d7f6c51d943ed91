use std::collections::HashMap;

use automerge::ChangeHash;

use crate::{
    ConnectionId, DocumentId, PeerId, UnixTimestamp,
    codec::{self, CborEncoder, EncodeError},
};

/// A snapshot of the state of one connection
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectionInfo {
    pub id: ConnectionId,
    pub last_received: Option<UnixTimestamp>,
    pub last_sent: Option<UnixTimestamp>,
    pub docs: HashMap<DocumentId, PeerDocState>,
    pub state: ConnectionState,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConnectionState {
    Handshaking,
    Connected { their_peer_id: PeerId },
}

/// Sync progress for one document on one connection
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct PeerDocState {
    /// When we last received a message from this peer
    pub last_received: Option<UnixTimestamp>,
    /// When we last sent a message to this peer
    pub last_sent: Option<UnixTimestamp>,
    /// The heads of the document when we last sent a message
    pub last_sent_heads: Option<Vec<ChangeHash>>,
    /// The last heads of the document that the peer said they had
    pub last_acked_heads: Option<Vec<ChangeHash>>,
}

impl PeerDocState {
    pub(crate) fn empty() -> Self {
        Self::default()
    }

    pub(crate) fn encode(&self, e: &mut CborEncoder) -> Result<(), EncodeError> {
        e.array(4)?;
        codec::encode_optional(e, self.last_received.as_ref(), |e, ts| {
            e.u64(ts.as_millis())?;
            Ok(())
        })?;
        codec::encode_optional(e, self.last_sent.as_ref(), |e, ts| {
            e.u64(ts.as_millis())?;
            Ok(())
        })?;
        codec::encode_optional(e, self.last_sent_heads.as_deref(), codec::encode_heads)?;
        codec::encode_optional(e, self.last_acked_heads.as_deref(), codec::encode_heads)?;
        Ok(())
    }

    pub(crate) fn decode(d: &mut minicbor::Decoder<'_>) -> Result<Self, minicbor::decode::Error> {
        codec::expect_array(d, 4)?;
        Ok(Self {
            last_received: codec::decode_optional(d, codec::decode_timestamp)?,
            last_sent: codec::decode_optional(d, codec::decode_timestamp)?,
            last_sent_heads: codec::decode_optional(d, codec::decode_heads)?,
            last_acked_heads: codec::decode_optional(d, codec::decode_heads)?,
        })
    }
}
