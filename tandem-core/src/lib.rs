//! The sans-IO core of a local-first document replication runtime.
//!
//! Nothing in this crate performs I/O or spawns threads. A [`Loader`]
//! produces a [`Hub`](actors::hub::Hub), the hub hands out
//! [`SpawnArgs`](actors::document::SpawnArgs) for
//! [`DocumentActor`](actors::document::DocumentActor)s, and every I/O
//! operation any of them needs is returned to the host as an
//! [`IoTask`](io::IoTask). The host performs the task and reports the
//! outcome as an [`IoResult`](io::IoResult) with the same task id.
mod automerge_url;
pub use actors::hub::{CommandId, CommandResult, HubConfig, HubError};
pub use automerge_url::{AutomergeUrl, BadAutomergeUrl};
pub mod actors;
mod codec;
pub mod document;
mod document_changed;
mod document_id;
mod ephemera;
pub mod network;
pub use network::ConnectionId;
mod peer_id;

pub use actors::document::DocumentActorId;
pub use document_changed::DocumentChanged;
pub use document_id::{BadDocumentId, DocumentId};
pub mod io;
pub use peer_id::{PeerId, PeerIdError};
mod storage_key;
pub use storage_key::{StorageKey, StorageKeyError};
mod storage_id;
pub use storage_id::{StorageId, StorageIdError};
mod unix_timestamp;
pub use unix_timestamp::UnixTimestamp;

mod loader;
pub use loader::{Loader, LoaderError, LoaderState};
