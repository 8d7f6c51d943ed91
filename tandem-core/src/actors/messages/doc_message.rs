use minicbor::{Decoder, decode};

use crate::{
    codec::{self, CborEncoder, EncodeError},
    ephemera::EphemeralMessage,
};

/// A document-scoped message received from a peer
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum DocMessage {
    Sync(SyncMessage),
    Ephemeral(EphemeralMessage),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum SyncMessage {
    /// A sync message from a peer which doesn't have the document and is
    /// asking for it
    Request { data: Vec<u8> },
    Sync { data: Vec<u8> },
    DocUnavailable,
}

/// An ephemeral message a document actor wants sent to some connections
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Broadcast {
    /// A new message originating from this peer
    New { msg: Vec<u8> },
    /// A message from another peer which we are forwarding
    Gossip { msg: EphemeralMessage },
}

impl SyncMessage {
    pub(crate) fn encode(&self, e: &mut CborEncoder) -> Result<(), EncodeError> {
        match self {
            SyncMessage::Request { data } => {
                e.array(2)?.u8(0)?.bytes(data)?;
            }
            SyncMessage::Sync { data } => {
                e.array(2)?.u8(1)?.bytes(data)?;
            }
            SyncMessage::DocUnavailable => {
                e.array(1)?.u8(2)?;
            }
        }
        Ok(())
    }

    pub(crate) fn decode(d: &mut Decoder<'_>) -> Result<Self, decode::Error> {
        let len = codec::definite_array(d)?;
        match (d.u8()?, len) {
            (0, 2) => Ok(SyncMessage::Request {
                data: d.bytes()?.to_vec(),
            }),
            (1, 2) => Ok(SyncMessage::Sync {
                data: d.bytes()?.to_vec(),
            }),
            (2, 1) => Ok(SyncMessage::DocUnavailable),
            (tag, len) => Err(decode::Error::message(format!(
                "invalid sync message tag {tag} with {len} elements"
            ))),
        }
    }
}

impl DocMessage {
    pub(crate) fn encode(&self, e: &mut CborEncoder) -> Result<(), EncodeError> {
        e.array(2)?;
        match self {
            DocMessage::Sync(msg) => {
                e.u8(0)?;
                msg.encode(e)
            }
            DocMessage::Ephemeral(msg) => {
                e.u8(1)?;
                msg.encode(e)
            }
        }
    }

    pub(crate) fn decode(d: &mut Decoder<'_>) -> Result<Self, decode::Error> {
        codec::expect_array(d, 2)?;
        match d.u8()? {
            0 => Ok(DocMessage::Sync(SyncMessage::decode(d)?)),
            1 => Ok(DocMessage::Ephemeral(EphemeralMessage::decode(d)?)),
            other => Err(decode::Error::message(format!(
                "invalid doc message tag {other}"
            ))),
        }
    }
}

impl Broadcast {
    pub(crate) fn encode(&self, e: &mut CborEncoder) -> Result<(), EncodeError> {
        e.array(2)?;
        match self {
            Broadcast::New { msg } => {
                e.u8(0)?.bytes(msg)?;
                Ok(())
            }
            Broadcast::Gossip { msg } => {
                e.u8(1)?;
                msg.encode(e)
            }
        }
    }

    pub(crate) fn decode(d: &mut Decoder<'_>) -> Result<Self, decode::Error> {
        codec::expect_array(d, 2)?;
        match d.u8()? {
            0 => Ok(Broadcast::New {
                msg: d.bytes()?.to_vec(),
            }),
            1 => Ok(Broadcast::Gossip {
                msg: EphemeralMessage::decode(d)?,
            }),
            other => Err(decode::Error::message(format!(
                "invalid broadcast tag {other}"
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn roundtrip(msg: &DocMessage) -> DocMessage {
        let bytes = codec::to_vec(|e| msg.encode(e));
        let mut d = Decoder::new(&bytes);
        let decoded = DocMessage::decode(&mut d).unwrap();
        codec::finish(&d).unwrap();
        decoded
    }

    #[test]
    fn doc_messages_survive_encoding() {
        let msgs = [
            DocMessage::Sync(SyncMessage::Request { data: vec![1, 2] }),
            DocMessage::Sync(SyncMessage::Sync { data: vec![] }),
            DocMessage::Sync(SyncMessage::DocUnavailable),
            DocMessage::Ephemeral(EphemeralMessage {
                sender_id: "bob".parse().unwrap(),
                session_id: "session".to_string(),
                count: 42,
                data: vec![0xde, 0xad],
            }),
        ];
        for msg in msgs {
            assert_eq!(roundtrip(&msg), msg);
        }
    }

    #[test]
    fn mismatched_sync_tag_and_length_is_rejected() {
        // tag 2 is doc-unavailable, which carries no payload
        let bytes = codec::to_vec(|e| {
            e.array(2)?.u8(0)?.array(2)?.u8(2)?.bytes(&[1])?;
            Ok(())
        });
        assert!(DocMessage::decode(&mut Decoder::new(&bytes)).is_err());
    }
}
