//! The frames exchanged with remote peers.
//!
//! Each frame is a CBOR map with string keys and a `type` discriminant, the
//! same shape the automerge-repo network protocol uses. Unknown keys are
//! skipped so that peers can add fields without breaking older peers.
use minicbor::{Decoder, decode};

use crate::{
    DocumentId, PeerId,
    actors::messages::SyncMessage,
    codec::{self, CborEncoder, EncodeError},
    network::PeerMetadata,
};

pub(crate) const PROTOCOL_VERSION: &str = "1";

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum WireMessage {
    Join {
        sender_id: PeerId,
        supported_protocol_versions: Vec<String>,
        metadata: Option<PeerMetadata>,
    },
    Peer {
        sender_id: PeerId,
        target_id: PeerId,
        selected_protocol_version: String,
        metadata: Option<PeerMetadata>,
    },
    Error {
        message: String,
    },
    Request {
        sender_id: PeerId,
        target_id: PeerId,
        document_id: DocumentId,
        data: Vec<u8>,
    },
    Sync {
        sender_id: PeerId,
        target_id: PeerId,
        document_id: DocumentId,
        data: Vec<u8>,
    },
    DocUnavailable {
        sender_id: PeerId,
        target_id: PeerId,
        document_id: DocumentId,
    },
    Ephemeral {
        sender_id: PeerId,
        target_id: PeerId,
        count: u64,
        session_id: String,
        document_id: DocumentId,
        data: Vec<u8>,
    },
}

#[derive(Debug, thiserror::Error)]
pub(crate) enum DecodeError {
    #[error("invalid CBOR: {0}")]
    Cbor(#[from] decode::Error),
    #[error("missing field '{0}'")]
    MissingField(&'static str),
    #[error("unknown message type '{0}'")]
    UnknownType(String),
    #[error("invalid value for '{field}': {reason}")]
    InvalidField { field: &'static str, reason: String },
}

/// Addressing information for the sync-related frames of one document
pub(crate) struct WireMessageBuilder {
    pub(crate) sender_id: PeerId,
    pub(crate) target_id: PeerId,
    pub(crate) document_id: DocumentId,
}

impl WireMessageBuilder {
    pub(crate) fn from_sync_message(self, msg: SyncMessage) -> WireMessage {
        let WireMessageBuilder {
            sender_id,
            target_id,
            document_id,
        } = self;
        match msg {
            SyncMessage::Request { data } => WireMessage::Request {
                sender_id,
                target_id,
                document_id,
                data,
            },
            SyncMessage::Sync { data } => WireMessage::Sync {
                sender_id,
                target_id,
                document_id,
                data,
            },
            SyncMessage::DocUnavailable => WireMessage::DocUnavailable {
                sender_id,
                target_id,
                document_id,
            },
        }
    }
}

impl WireMessage {
    pub(crate) fn type_name(&self) -> &'static str {
        match self {
            WireMessage::Join { .. } => "join",
            WireMessage::Peer { .. } => "peer",
            WireMessage::Error { .. } => "error",
            WireMessage::Request { .. } => "request",
            WireMessage::Sync { .. } => "sync",
            WireMessage::DocUnavailable { .. } => "doc-unavailable",
            WireMessage::Ephemeral { .. } => "ephemeral",
        }
    }

    pub(crate) fn encode(&self) -> Vec<u8> {
        codec::to_vec(|e| self.encode_into(e))
    }

    fn encode_into(&self, e: &mut CborEncoder) -> Result<(), EncodeError> {
        match self {
            WireMessage::Join {
                sender_id,
                supported_protocol_versions,
                metadata,
            } => {
                e.map(3 + metadata.is_some() as u64)?;
                e.str("type")?.str("join")?;
                e.str("senderId")?.str(sender_id.as_str())?;
                e.str("supportedProtocolVersions")?
                    .array(supported_protocol_versions.len() as u64)?;
                for version in supported_protocol_versions {
                    e.str(version)?;
                }
                if let Some(metadata) = metadata {
                    e.str("peerMetadata")?;
                    encode_metadata(e, metadata)?;
                }
            }
            WireMessage::Peer {
                sender_id,
                target_id,
                selected_protocol_version,
                metadata,
            } => {
                e.map(4 + metadata.is_some() as u64)?;
                e.str("type")?.str("peer")?;
                e.str("senderId")?.str(sender_id.as_str())?;
                e.str("targetId")?.str(target_id.as_str())?;
                e.str("selectedProtocolVersion")?
                    .str(selected_protocol_version)?;
                if let Some(metadata) = metadata {
                    e.str("peerMetadata")?;
                    encode_metadata(e, metadata)?;
                }
            }
            WireMessage::Error { message } => {
                e.map(2)?;
                e.str("type")?.str("error")?;
                e.str("message")?.str(message)?;
            }
            WireMessage::Request {
                sender_id,
                target_id,
                document_id,
                data,
            }
            | WireMessage::Sync {
                sender_id,
                target_id,
                document_id,
                data,
            } => {
                e.map(5)?;
                e.str("type")?.str(self.type_name())?;
                e.str("senderId")?.str(sender_id.as_str())?;
                e.str("targetId")?.str(target_id.as_str())?;
                e.str("documentId")?.str(&document_id.to_string())?;
                e.str("data")?.bytes(data)?;
            }
            WireMessage::DocUnavailable {
                sender_id,
                target_id,
                document_id,
            } => {
                e.map(4)?;
                e.str("type")?.str("doc-unavailable")?;
                e.str("senderId")?.str(sender_id.as_str())?;
                e.str("targetId")?.str(target_id.as_str())?;
                e.str("documentId")?.str(&document_id.to_string())?;
            }
            WireMessage::Ephemeral {
                sender_id,
                target_id,
                count,
                session_id,
                document_id,
                data,
            } => {
                e.map(7)?;
                e.str("type")?.str("ephemeral")?;
                e.str("senderId")?.str(sender_id.as_str())?;
                e.str("targetId")?.str(target_id.as_str())?;
                e.str("count")?.u64(*count)?;
                e.str("sessionId")?.str(session_id)?;
                e.str("documentId")?.str(&document_id.to_string())?;
                e.str("data")?.bytes(data)?;
            }
        }
        Ok(())
    }

    pub(crate) fn decode(bytes: &[u8]) -> Result<WireMessage, DecodeError> {
        let mut d = Decoder::new(bytes);
        let fields = Fields::decode(&mut d)?;
        codec::finish(&d)?;
        fields.into_message()
    }
}

fn encode_metadata(e: &mut CborEncoder, metadata: &PeerMetadata) -> Result<(), EncodeError> {
    e.map(1 + metadata.storage_id.is_some() as u64)?;
    if let Some(storage_id) = &metadata.storage_id {
        e.str("storageId")?.str(storage_id.as_str())?;
    }
    e.str("isEphemeral")?.bool(metadata.is_ephemeral)?;
    Ok(())
}

fn decode_metadata(d: &mut Decoder<'_>) -> Result<PeerMetadata, decode::Error> {
    let len = codec::definite_map(d)?;
    let mut metadata = PeerMetadata::default();
    for _ in 0..len {
        match d.str()? {
            "storageId" => {
                metadata.storage_id = Some(codec::decode_storage_id(d)?);
            }
            "isEphemeral" => metadata.is_ephemeral = d.bool()?,
            _ => d.skip()?,
        }
    }
    Ok(metadata)
}

/// Every field any frame may carry, collected before the frame type is
/// interpreted because the `type` key may appear anywhere in the map.
#[derive(Default)]
struct Fields {
    type_name: Option<String>,
    sender_id: Option<String>,
    target_id: Option<String>,
    document_id: Option<String>,
    data: Option<Vec<u8>>,
    count: Option<u64>,
    session_id: Option<String>,
    message: Option<String>,
    selected_protocol_version: Option<String>,
    supported_protocol_versions: Option<Vec<String>>,
    metadata: Option<PeerMetadata>,
}

impl Fields {
    fn decode(d: &mut Decoder<'_>) -> Result<Fields, DecodeError> {
        let len = codec::definite_map(d)?;
        let mut fields = Fields::default();
        for _ in 0..len {
            match d.str()? {
                "type" => fields.type_name = Some(d.str()?.to_string()),
                "senderId" => fields.sender_id = Some(d.str()?.to_string()),
                "targetId" => fields.target_id = Some(d.str()?.to_string()),
                "documentId" => fields.document_id = Some(d.str()?.to_string()),
                "data" => fields.data = Some(d.bytes()?.to_vec()),
                "count" => fields.count = Some(d.u64()?),
                "sessionId" => fields.session_id = Some(d.str()?.to_string()),
                "message" => fields.message = Some(d.str()?.to_string()),
                "selectedProtocolVersion" => {
                    fields.selected_protocol_version = Some(d.str()?.to_string())
                }
                "supportedProtocolVersions" => {
                    let len = codec::definite_array(d)?;
                    let versions = (0..len)
                        .map(|_| d.str().map(str::to_string))
                        .collect::<Result<Vec<_>, _>>()?;
                    fields.supported_protocol_versions = Some(versions);
                }
                "peerMetadata" => {
                    fields.metadata = codec::decode_optional(d, decode_metadata)?
                }
                _ => d.skip()?,
            }
        }
        Ok(fields)
    }

    fn into_message(self) -> Result<WireMessage, DecodeError> {
        let type_name = self.type_name.clone().ok_or(DecodeError::MissingField("type"))?;
        match type_name.as_str() {
            "join" => Ok(WireMessage::Join {
                sender_id: self.sender_id()?,
                supported_protocol_versions: self
                    .supported_protocol_versions
                    .ok_or(DecodeError::MissingField("supportedProtocolVersions"))?,
                metadata: self.metadata,
            }),
            "peer" => Ok(WireMessage::Peer {
                sender_id: self.sender_id()?,
                target_id: self.target_id()?,
                selected_protocol_version: self
                    .selected_protocol_version
                    .ok_or(DecodeError::MissingField("selectedProtocolVersion"))?,
                metadata: self.metadata,
            }),
            "error" => Ok(WireMessage::Error {
                message: self.message.ok_or(DecodeError::MissingField("message"))?,
            }),
            "request" => Ok(WireMessage::Request {
                sender_id: self.sender_id()?,
                target_id: self.target_id()?,
                document_id: self.document_id()?,
                data: self.data.ok_or(DecodeError::MissingField("data"))?,
            }),
            "sync" => Ok(WireMessage::Sync {
                sender_id: self.sender_id()?,
                target_id: self.target_id()?,
                document_id: self.document_id()?,
                data: self.data.ok_or(DecodeError::MissingField("data"))?,
            }),
            "doc-unavailable" => Ok(WireMessage::DocUnavailable {
                sender_id: self.sender_id()?,
                target_id: self.target_id()?,
                document_id: self.document_id()?,
            }),
            "ephemeral" => Ok(WireMessage::Ephemeral {
                sender_id: self.sender_id()?,
                target_id: self.target_id()?,
                document_id: self.document_id()?,
                count: self.count.ok_or(DecodeError::MissingField("count"))?,
                session_id: self
                    .session_id
                    .ok_or(DecodeError::MissingField("sessionId"))?,
                data: self.data.ok_or(DecodeError::MissingField("data"))?,
            }),
            other => Err(DecodeError::UnknownType(other.to_string())),
        }
    }

    fn sender_id(&self) -> Result<PeerId, DecodeError> {
        parse_peer_id("senderId", self.sender_id.as_deref())
    }

    fn target_id(&self) -> Result<PeerId, DecodeError> {
        parse_peer_id("targetId", self.target_id.as_deref())
    }

    fn document_id(&self) -> Result<DocumentId, DecodeError> {
        let raw = self
            .document_id
            .as_deref()
            .ok_or(DecodeError::MissingField("documentId"))?;
        raw.parse().map_err(|e: crate::BadDocumentId| DecodeError::InvalidField {
            field: "documentId",
            reason: e.to_string(),
        })
    }
}

fn parse_peer_id(field: &'static str, raw: Option<&str>) -> Result<PeerId, DecodeError> {
    let raw = raw.ok_or(DecodeError::MissingField(field))?;
    raw.parse().map_err(|e: crate::PeerIdError| DecodeError::InvalidField {
        field,
        reason: e.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn peer(name: &str) -> PeerId {
        name.parse().unwrap()
    }

    #[test]
    fn join_frame_decodes() {
        let msg = WireMessage::Join {
            sender_id: peer("alice"),
            supported_protocol_versions: vec![PROTOCOL_VERSION.to_string()],
            metadata: Some(PeerMetadata {
                is_ephemeral: false,
                storage_id: Some("storage".parse().unwrap()),
            }),
        };
        assert_eq!(WireMessage::decode(&msg.encode()).unwrap(), msg);
    }

    #[test]
    fn sync_frame_decodes() {
        let msg = WireMessage::Sync {
            sender_id: peer("alice"),
            target_id: peer("bob"),
            document_id: DocumentId::from([9; 16]),
            data: vec![1, 2, 3],
        };
        assert_eq!(WireMessage::decode(&msg.encode()).unwrap(), msg);
    }

    #[test]
    fn unknown_keys_are_skipped() {
        let bytes = codec::to_vec(|e| {
            e.map(3)?;
            e.str("type")?.str("error")?;
            e.str("somethingNew")?.array(2)?.u8(1)?.u8(2)?;
            e.str("message")?.str("oops")?;
            Ok(())
        });
        assert_eq!(
            WireMessage::decode(&bytes).unwrap(),
            WireMessage::Error {
                message: "oops".to_string()
            }
        );
    }

    #[test]
    fn missing_fields_are_rejected() {
        let bytes = codec::to_vec(|e| {
            e.map(2)?;
            e.str("type")?.str("sync")?;
            e.str("senderId")?.str("alice")?;
            Ok(())
        });
        assert!(matches!(
            WireMessage::decode(&bytes),
            Err(DecodeError::MissingField(_))
        ));
    }

    #[test]
    fn garbage_is_rejected() {
        assert!(WireMessage::decode(&[0xff, 0x00, 0x13]).is_err());
        assert!(WireMessage::decode(&[]).is_err());
    }
}
