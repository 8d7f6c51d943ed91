//! Document actors, each of which owns one automerge document.
//!
//! A document actor is a passive state machine. The hub decides when one is
//! needed and emits [`SpawnArgs`]; the host constructs a [`DocumentActor`]
//! from them and from then on feeds it the [`HubToDocMsg`](crate::actors::HubToDocMsg)s
//! the hub produces and the results of the I/O tasks the actor requests.
//!
//! The lifecycle of an actor is
//!
//! ```text
//! Loading ──► Ready
//!    │          ▲
//!    ▼          │
//! Requesting ───┤
//!    │          │
//!    ▼          │
//! NotFound ─────┘ (on sync from a peer)
//! ```
//!
//! `NotFound` also moves back to `Loading` when the hub asks for the
//! document again, and to `Requesting` when a peer requests it from us.

pub mod actor;
mod actor_io_access;
use actor_io_access::ActorIoAccess;
mod actor_state;
use actor_state::ActorState;
mod compaction;
mod document_actor_id;
mod document_status;
pub mod errors;
pub mod io;
mod peer_doc_connection;
mod ready;
mod request;
mod run;
mod spawn_args;

pub use actor::{DocActorResult, DocumentActor, WithDocResult};
pub use document_actor_id::DocumentActorId;
pub use document_status::DocumentStatus;
pub use errors::DocumentError;
pub use spawn_args::SpawnArgs;
