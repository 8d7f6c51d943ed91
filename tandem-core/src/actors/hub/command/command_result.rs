use crate::{ConnectionId, DocumentActorId, DocumentId};

/// The outcome of a command, reported once under its
/// [`CommandId`](super::CommandId).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CommandResult {
    CreateConnection {
        connection_id: ConnectionId,
    },
    /// The connection is gone and, if it existed, the host has closed its
    /// transport
    DisconnectConnection,
    /// `error` is set if the bytes could not be processed, in which case the
    /// connection has been failed
    Receive {
        connection_id: ConnectionId,
        error: Option<String>,
    },
    ActorReady,
    CreateDocument {
        actor_id: DocumentActorId,
        document_id: DocumentId,
    },
    FindDocument {
        actor_id: DocumentActorId,
        found: bool,
    },
}
