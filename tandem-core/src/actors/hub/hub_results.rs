use std::collections::HashMap;

use crate::{
    DocumentActorId,
    actors::{
        HubToDocMsg,
        document::SpawnArgs,
        hub::{CommandId, CommandResult},
    },
    io::IoTask,
    network::ConnectionEvent,
};

use super::io::HubIoAction;

/// Everything which resulted from one call to
/// [`Hub::handle_event`](super::Hub::handle_event).
///
/// Actors in `spawn_actors` must be created before the messages in
/// `actor_messages` are delivered, as messages may be addressed to them.
#[derive(Debug, Default, Clone)]
pub struct HubResults {
    /// I/O the host must perform and report back with
    /// [`HubEvent::io_complete`](super::HubEvent::io_complete)
    pub new_tasks: Vec<IoTask<HubIoAction>>,

    pub completed_commands: HashMap<CommandId, CommandResult>,

    pub spawn_actors: Vec<SpawnArgs>,

    pub actor_messages: Vec<(DocumentActorId, HubToDocMsg)>,

    pub connection_events: Vec<ConnectionEvent>,

    /// Whether the hub has stopped
    pub stopped: bool,
}
