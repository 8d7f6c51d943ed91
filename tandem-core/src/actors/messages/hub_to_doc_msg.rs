use minicbor::{Decoder, decode};

use crate::{
    ConnectionId, PeerId,
    codec::{self, CborEncoder, EncodeError},
};

use super::{DocMessage, MessageDecodeError};

/// A message from the hub to one document actor.
///
/// Produced in [`HubResults::actor_messages`](crate::actors::hub::HubResults)
/// and consumed by
/// [`DocumentActor::handle_message`](crate::actors::document::DocumentActor::handle_message).
/// The contents are opaque to the host, which only needs to move them, see
/// [`HubToDocMsg::to_bytes`] for moving them across a process boundary.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HubToDocMsg(pub(crate) HubToDocMsgPayload);

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum HubToDocMsgPayload {
    /// Finish in-flight work and stop
    Terminate,
    NewConnection {
        connection_id: ConnectionId,
        peer_id: PeerId,
    },
    /// The document was not found, but someone is looking for it again
    RequestAgain,
    ConnectionClosed {
        connection_id: ConnectionId,
    },
    HandleDocMessage {
        connection_id: ConnectionId,
        message: DocMessage,
    },
}

impl HubToDocMsg {
    pub fn to_bytes(&self) -> Vec<u8> {
        codec::to_vec(|e| self.0.encode(e))
    }
}

impl TryFrom<&[u8]> for HubToDocMsg {
    type Error = MessageDecodeError;

    fn try_from(value: &[u8]) -> Result<Self, Self::Error> {
        let mut d = Decoder::new(value);
        let payload = HubToDocMsgPayload::decode(&mut d)?;
        codec::finish(&d)?;
        Ok(HubToDocMsg(payload))
    }
}

impl HubToDocMsgPayload {
    fn encode(&self, e: &mut CborEncoder) -> Result<(), EncodeError> {
        match self {
            HubToDocMsgPayload::Terminate => {
                e.array(1)?.u8(0)?;
            }
            HubToDocMsgPayload::NewConnection {
                connection_id,
                peer_id,
            } => {
                e.array(3)?
                    .u8(1)?
                    .u32((*connection_id).into())?
                    .str(peer_id.as_str())?;
            }
            HubToDocMsgPayload::RequestAgain => {
                e.array(1)?.u8(2)?;
            }
            HubToDocMsgPayload::ConnectionClosed { connection_id } => {
                e.array(2)?.u8(3)?.u32((*connection_id).into())?;
            }
            HubToDocMsgPayload::HandleDocMessage {
                connection_id,
                message,
            } => {
                e.array(3)?.u8(4)?.u32((*connection_id).into())?;
                message.encode(e)?;
            }
        }
        Ok(())
    }

    fn decode(d: &mut Decoder<'_>) -> Result<Self, decode::Error> {
        let len = codec::definite_array(d)?;
        let payload = match (d.u8()?, len) {
            (0, 1) => HubToDocMsgPayload::Terminate,
            (1, 3) => HubToDocMsgPayload::NewConnection {
                connection_id: d.u32()?.into(),
                peer_id: codec::decode_peer_id(d)?,
            },
            (2, 1) => HubToDocMsgPayload::RequestAgain,
            (3, 2) => HubToDocMsgPayload::ConnectionClosed {
                connection_id: d.u32()?.into(),
            },
            (4, 3) => HubToDocMsgPayload::HandleDocMessage {
                connection_id: d.u32()?.into(),
                message: DocMessage::decode(d)?,
            },
            (tag, len) => {
                return Err(decode::Error::message(format!(
                    "invalid hub to doc message tag {tag} with {len} elements"
                )));
            }
        };
        Ok(payload)
    }
}

impl From<HubToDocMsgPayload> for HubToDocMsg {
    fn from(payload: HubToDocMsgPayload) -> Self {
        HubToDocMsg(payload)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::actors::messages::SyncMessage;

    #[test]
    fn envelope_bytes_decode_to_the_same_message() {
        let msg = HubToDocMsg(HubToDocMsgPayload::HandleDocMessage {
            connection_id: ConnectionId::from(4),
            message: DocMessage::Sync(SyncMessage::Request {
                data: vec![1, 2, 3],
            }),
        });
        let bytes = msg.to_bytes();
        let decoded = HubToDocMsg::try_from(bytes.as_slice()).unwrap();
        assert_eq!(decoded, msg);
        assert_eq!(decoded.to_bytes(), bytes);
    }

    #[test]
    fn trailing_bytes_are_rejected() {
        let mut bytes = HubToDocMsg(HubToDocMsgPayload::Terminate).to_bytes();
        bytes.push(0);
        assert!(HubToDocMsg::try_from(bytes.as_slice()).is_err());
    }
}
