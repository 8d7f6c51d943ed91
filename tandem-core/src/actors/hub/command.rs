mod command_id;
mod command_result;

use automerge::Automerge;

pub use command_id::CommandId;
pub use command_result::CommandResult;

use crate::{ConnectionId, DocumentId, network::ConnDirection};

/// Operations which complete with a [`CommandResult`], possibly after
/// several calls to [`Hub::handle_event`](super::Hub::handle_event).
///
/// Created through the [`HubEvent`](super::HubEvent) constructors, which
/// assign each command a fresh [`CommandId`].
#[derive(Clone)]
pub(crate) enum Command {
    CreateConnection {
        direction: ConnDirection,
    },
    DisconnectConnection {
        connection_id: ConnectionId,
    },
    /// Bytes arrived on a connection
    Receive {
        connection_id: ConnectionId,
        msg: Vec<u8>,
    },
    ActorReady {
        document_id: DocumentId,
    },
    CreateDocument {
        content: Box<Automerge>,
    },
    FindDocument {
        document_id: DocumentId,
    },
}

// Documents compare by their heads, two documents with the same heads have
// the same history
impl PartialEq for Command {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (
                Command::CreateConnection { direction: a },
                Command::CreateConnection { direction: b },
            ) => a == b,
            (
                Command::DisconnectConnection { connection_id: a },
                Command::DisconnectConnection { connection_id: b },
            ) => a == b,
            (
                Command::Receive {
                    connection_id: a,
                    msg: a_msg,
                },
                Command::Receive {
                    connection_id: b,
                    msg: b_msg,
                },
            ) => a == b && a_msg == b_msg,
            (Command::ActorReady { document_id: a }, Command::ActorReady { document_id: b }) => {
                a == b
            }
            (Command::CreateDocument { content: a }, Command::CreateDocument { content: b }) => {
                a.get_heads() == b.get_heads()
            }
            (
                Command::FindDocument { document_id: a },
                Command::FindDocument { document_id: b },
            ) => a == b,
            _ => false,
        }
    }
}

impl Eq for Command {}

impl std::fmt::Debug for Command {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Command::CreateConnection { direction } => f
                .debug_struct("CreateConnection")
                .field("direction", direction)
                .finish(),
            Command::DisconnectConnection { connection_id } => f
                .debug_struct("DisconnectConnection")
                .field("connection_id", connection_id)
                .finish(),
            Command::Receive { connection_id, msg } => f
                .debug_struct("Receive")
                .field("connection_id", connection_id)
                .field("msg(bytes)", &msg.len())
                .finish(),
            Command::ActorReady { document_id } => f
                .debug_struct("ActorReady")
                .field("document_id", document_id)
                .finish(),
            Command::CreateDocument { content: _ } => f
                .debug_struct("CreateDocument")
                .field("content", &"<Automerge>")
                .finish(),
            Command::FindDocument { document_id } => f
                .debug_struct("FindDocument")
                .field("document_id", document_id)
                .finish(),
        }
    }
}
