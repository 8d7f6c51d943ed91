use std::collections::HashMap;

use minicbor::{Decoder, decode};

use crate::{
    ConnectionId, DocumentActorId, DocumentId, PeerId,
    actors::{MessageDecodeError, messages::DocMessage},
    codec::{self, CborEncoder, EncodeError},
};

/// Everything needed to construct a [`DocumentActor`](super::DocumentActor).
///
/// Emitted by the hub in [`HubResults::spawn_actors`](crate::actors::hub::HubResults).
/// Hosts running actors in another thread or process can move these with
/// [`SpawnArgs::to_bytes`] and [`SpawnArgs::try_from`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpawnArgs {
    pub(crate) actor_id: DocumentActorId,
    pub(crate) local_peer_id: PeerId,
    pub(crate) document_id: DocumentId,
    /// The saved bytes of a newly created document
    pub(crate) initial_content: Option<Vec<u8>>,
    /// The established connections at spawn time, with the message which
    /// caused the spawn if there was one
    pub(crate) initial_connections: HashMap<ConnectionId, (PeerId, Option<DocMessage>)>,
}

impl SpawnArgs {
    pub fn actor_id(&self) -> DocumentActorId {
        self.actor_id
    }

    pub fn document_id(&self) -> &DocumentId {
        &self.document_id
    }

    pub fn to_bytes(&self) -> Vec<u8> {
        codec::to_vec(|e| self.encode(e))
    }

    fn encode(&self, e: &mut CborEncoder) -> Result<(), EncodeError> {
        e.array(5)?
            .u32(self.actor_id.into())?
            .str(self.local_peer_id.as_str())?
            .bytes(self.document_id.as_bytes())?;
        codec::encode_optional(e, self.initial_content.as_deref(), |e, bytes| {
            e.bytes(bytes)?;
            Ok(())
        })?;
        let mut conns = self.initial_connections.iter().collect::<Vec<_>>();
        conns.sort_by_key(|(conn_id, _)| **conn_id);
        e.map(conns.len() as u64)?;
        for (conn_id, (peer_id, msg)) in conns {
            e.u32((*conn_id).into())?
                .array(2)?
                .str(peer_id.as_str())?;
            codec::encode_optional(e, msg.as_ref(), |e, msg| msg.encode(e))?;
        }
        Ok(())
    }

    fn decode(d: &mut Decoder<'_>) -> Result<Self, decode::Error> {
        codec::expect_array(d, 5)?;
        let actor_id = DocumentActorId::from_raw(d.u32()?);
        let local_peer_id = codec::decode_peer_id(d)?;
        let document_id = codec::decode_document_id(d)?;
        let initial_content = codec::decode_optional(d, |d| d.bytes().map(<[u8]>::to_vec))?;
        let len = codec::definite_map(d)?;
        let mut initial_connections = HashMap::new();
        for _ in 0..len {
            let conn_id = ConnectionId::from(d.u32()?);
            codec::expect_array(d, 2)?;
            let peer_id = codec::decode_peer_id(d)?;
            let msg = codec::decode_optional(d, DocMessage::decode)?;
            initial_connections.insert(conn_id, (peer_id, msg));
        }
        Ok(SpawnArgs {
            actor_id,
            local_peer_id,
            document_id,
            initial_content,
            initial_connections,
        })
    }
}

impl TryFrom<&[u8]> for SpawnArgs {
    type Error = MessageDecodeError;

    fn try_from(value: &[u8]) -> Result<Self, Self::Error> {
        let mut d = Decoder::new(value);
        let args = SpawnArgs::decode(&mut d)?;
        codec::finish(&d)?;
        Ok(args)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::actors::messages::SyncMessage;

    #[test]
    fn spawn_args_survive_bytes() {
        let peer: PeerId = "bob".parse().unwrap();
        let mut initial_connections = HashMap::new();
        initial_connections.insert(ConnectionId::from(3), (peer.clone(), None));
        initial_connections.insert(
            ConnectionId::from(7),
            (
                peer,
                Some(DocMessage::Sync(SyncMessage::Request {
                    data: vec![1, 2, 3],
                })),
            ),
        );
        let args = SpawnArgs {
            actor_id: DocumentActorId::from_raw(12),
            local_peer_id: "alice".parse().unwrap(),
            document_id: DocumentId::from([9; 16]),
            initial_content: Some(vec![0xde, 0xad]),
            initial_connections,
        };
        let decoded = SpawnArgs::try_from(args.to_bytes().as_slice()).unwrap();
        assert_eq!(decoded, args);
    }

    #[test]
    fn garbage_is_rejected() {
        assert!(SpawnArgs::try_from(&[0xff, 0x00][..]).is_err());
    }
}
