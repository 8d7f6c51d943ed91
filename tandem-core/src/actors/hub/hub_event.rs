use automerge::{Automerge, transaction::CommitOptions};

use crate::{
    ConnectionId, DocumentActorId, DocumentId,
    actors::{
        DocToHubMsg,
        hub::{Command, CommandId},
    },
    io::IoResult,
    network::ConnDirection,
};

use super::{DispatchedCommand, HubEventPayload, HubInput, io::HubIoResult};

/// An event to be processed by [`Hub::handle_event`](super::Hub::handle_event).
///
/// Constructors returning a [`DispatchedCommand`] start a command, whose
/// result is later reported under the returned `command_id`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HubEvent {
    pub(crate) payload: HubEventPayload,
}

impl HubEvent {
    pub fn io_complete(result: IoResult<HubIoResult>) -> Self {
        HubEvent {
            payload: HubEventPayload::IoComplete(result),
        }
    }

    /// Lets the hub act on the passage of time, e.g. handshake timeouts
    pub fn tick() -> Self {
        HubEvent {
            payload: HubEventPayload::Input(HubInput::Tick),
        }
    }

    pub fn actor_message(actor_id: DocumentActorId, message: DocToHubMsg) -> Self {
        HubEvent {
            payload: HubEventPayload::Input(HubInput::ActorMessage {
                actor_id,
                message: message.0,
            }),
        }
    }

    /// The transport underneath a connection went away
    pub fn connection_lost(connection_id: ConnectionId) -> Self {
        HubEvent {
            payload: HubEventPayload::Input(HubInput::ConnectionLost { connection_id }),
        }
    }

    /// Terminate every document actor and stop the hub
    pub fn stop() -> Self {
        HubEvent {
            payload: HubEventPayload::Input(HubInput::Stop),
        }
    }

    pub fn create_connection(direction: ConnDirection) -> DispatchedCommand {
        Self::dispatch_command(Command::CreateConnection { direction })
    }

    pub fn disconnect(connection_id: ConnectionId) -> DispatchedCommand {
        Self::dispatch_command(Command::DisconnectConnection { connection_id })
    }

    pub fn receive(connection_id: ConnectionId, msg: Vec<u8>) -> DispatchedCommand {
        Self::dispatch_command(Command::Receive { connection_id, msg })
    }

    /// The host has instantiated the actor for this document
    pub fn actor_ready(document_id: DocumentId) -> DispatchedCommand {
        Self::dispatch_command(Command::ActorReady { document_id })
    }

    /// Create a new document with the given content. An empty document is
    /// given an empty commit so that it has heads.
    pub fn create_document(mut initial_content: Automerge) -> DispatchedCommand {
        // without heads the document would be indistinguishable from one
        // which could not be found
        if initial_content.get_heads().is_empty() {
            initial_content.empty_commit(CommitOptions::default());
        }
        Self::dispatch_command(Command::CreateDocument {
            content: Box::new(initial_content),
        })
    }

    pub fn find_document(document_id: DocumentId) -> DispatchedCommand {
        Self::dispatch_command(Command::FindDocument { document_id })
    }

    fn dispatch_command(command: Command) -> DispatchedCommand {
        let command_id = CommandId::new();
        DispatchedCommand {
            command_id,
            event: HubEvent {
                payload: HubEventPayload::Input(HubInput::Command {
                    command_id,
                    command: Box::new(command),
                }),
            },
        }
    }
}

impl std::fmt::Display for HubEvent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:?}", self.payload)
    }
}
