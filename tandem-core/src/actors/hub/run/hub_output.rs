use crate::{
    DocumentActorId,
    actors::{
        HubToDocMsg,
        document::SpawnArgs,
        hub::{CommandId, CommandResult, HubResults},
        messages::HubToDocMsgPayload,
    },
    network::ConnectionEvent,
};

/// One effect of the hub run loop, collected into [`HubResults`] at the end
/// of each step
#[derive(Debug)]
pub(crate) enum HubOutput {
    Completed(CommandId, CommandResult),
    Spawn(Box<SpawnArgs>),
    ToActor(DocumentActorId, HubToDocMsgPayload),
    Connection(ConnectionEvent),
}

impl HubOutput {
    pub(crate) fn record(self, results: &mut HubResults) {
        match self {
            HubOutput::Completed(command_id, result) => {
                results.completed_commands.insert(command_id, result);
            }
            HubOutput::Spawn(args) => results.spawn_actors.push(*args),
            HubOutput::ToActor(actor_id, message) => {
                results.actor_messages.push((actor_id, HubToDocMsg(message)));
            }
            HubOutput::Connection(event) => results.connection_events.push(event),
        }
    }
}
