//! Messages passed between the hub and document actors.
//!
//! The host moves these between the hub and its actors, possibly across
//! threads or processes, so both envelopes can be turned into bytes and back.
mod doc_message;
mod doc_to_hub_msg;
mod hub_to_doc_msg;

pub(crate) use doc_message::{Broadcast, DocMessage, SyncMessage};
pub(crate) use doc_to_hub_msg::DocToHubMsgPayload;
pub use doc_to_hub_msg::DocToHubMsg;
pub(crate) use hub_to_doc_msg::HubToDocMsgPayload;
pub use hub_to_doc_msg::HubToDocMsg;

/// Bytes which do not decode to a message envelope
#[derive(Debug, thiserror::Error)]
#[error("invalid message envelope: {0}")]
pub struct MessageDecodeError(#[from] minicbor::decode::Error);
