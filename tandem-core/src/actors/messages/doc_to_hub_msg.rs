use std::collections::HashMap;

use minicbor::{Decoder, decode};

use crate::{
    ConnectionId, DocumentId,
    actors::document::DocumentStatus,
    codec::{self, CborEncoder, EncodeError},
    network::PeerDocState,
};

use super::{Broadcast, MessageDecodeError, SyncMessage};

/// A message from a document actor to the hub.
///
/// Produced in
/// [`DocActorResult::outgoing_messages`](crate::actors::document::DocActorResult)
/// and delivered with
/// [`HubEvent::actor_message`](crate::actors::hub::HubEvent::actor_message).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DocToHubMsg(pub(crate) DocToHubMsgPayload);

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum DocToHubMsgPayload {
    DocumentStatusChanged {
        new_status: DocumentStatus,
    },
    SendSyncMessage {
        connection_id: ConnectionId,
        document_id: DocumentId,
        message: SyncMessage,
    },
    PeerStatesChanged {
        new_states: HashMap<ConnectionId, PeerDocState>,
    },
    Broadcast {
        connections: Vec<ConnectionId>,
        msg: Broadcast,
    },
    /// The actor has stopped, sent in response to a terminate message
    Terminated,
}

impl DocToHubMsg {
    pub fn to_bytes(&self) -> Vec<u8> {
        codec::to_vec(|e| self.0.encode(e))
    }
}

impl TryFrom<&[u8]> for DocToHubMsg {
    type Error = MessageDecodeError;

    fn try_from(value: &[u8]) -> Result<Self, Self::Error> {
        let mut d = Decoder::new(value);
        let payload = DocToHubMsgPayload::decode(&mut d)?;
        codec::finish(&d)?;
        Ok(DocToHubMsg(payload))
    }
}

impl DocToHubMsgPayload {
    fn encode(&self, e: &mut CborEncoder) -> Result<(), EncodeError> {
        match self {
            DocToHubMsgPayload::DocumentStatusChanged { new_status } => {
                e.array(2)?.u8(0)?.u8(new_status.to_u8())?;
            }
            DocToHubMsgPayload::SendSyncMessage {
                connection_id,
                document_id,
                message,
            } => {
                e.array(4)?
                    .u8(1)?
                    .u32((*connection_id).into())?
                    .bytes(document_id.as_bytes())?;
                message.encode(e)?;
            }
            DocToHubMsgPayload::PeerStatesChanged { new_states } => {
                e.array(2)?.u8(2)?;
                // Sorted so that equal maps encode to equal bytes
                let mut states = new_states.iter().collect::<Vec<_>>();
                states.sort_by_key(|(conn_id, _)| **conn_id);
                e.map(states.len() as u64)?;
                for (conn_id, state) in states {
                    e.u32((*conn_id).into())?;
                    state.encode(e)?;
                }
            }
            DocToHubMsgPayload::Broadcast { connections, msg } => {
                e.array(3)?.u8(3)?;
                e.array(connections.len() as u64)?;
                for conn_id in connections {
                    e.u32((*conn_id).into())?;
                }
                msg.encode(e)?;
            }
            DocToHubMsgPayload::Terminated => {
                e.array(1)?.u8(4)?;
            }
        }
        Ok(())
    }

    fn decode(d: &mut Decoder<'_>) -> Result<Self, decode::Error> {
        let len = codec::definite_array(d)?;
        let payload = match (d.u8()?, len) {
            (0, 2) => {
                let raw = d.u8()?;
                let new_status = DocumentStatus::from_u8(raw).ok_or_else(|| {
                    decode::Error::message(format!("invalid document status {raw}"))
                })?;
                DocToHubMsgPayload::DocumentStatusChanged { new_status }
            }
            (1, 4) => DocToHubMsgPayload::SendSyncMessage {
                connection_id: d.u32()?.into(),
                document_id: codec::decode_document_id(d)?,
                message: SyncMessage::decode(d)?,
            },
            (2, 2) => {
                let len = codec::definite_map(d)?;
                let mut new_states = HashMap::new();
                for _ in 0..len {
                    let conn_id = ConnectionId::from(d.u32()?);
                    new_states.insert(conn_id, PeerDocState::decode(d)?);
                }
                DocToHubMsgPayload::PeerStatesChanged { new_states }
            }
            (3, 3) => {
                let len = codec::definite_array(d)?;
                let connections = (0..len)
                    .map(|_| d.u32().map(ConnectionId::from))
                    .collect::<Result<Vec<_>, _>>()?;
                DocToHubMsgPayload::Broadcast {
                    connections,
                    msg: Broadcast::decode(d)?,
                }
            }
            (4, 1) => DocToHubMsgPayload::Terminated,
            (tag, len) => {
                return Err(decode::Error::message(format!(
                    "invalid doc to hub message tag {tag} with {len} elements"
                )));
            }
        };
        Ok(payload)
    }
}

impl From<DocToHubMsgPayload> for DocToHubMsg {
    fn from(payload: DocToHubMsgPayload) -> Self {
        DocToHubMsg(payload)
    }
}
