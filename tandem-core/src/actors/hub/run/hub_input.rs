use crate::{
    ConnectionId, DocumentActorId,
    actors::{
        hub::{Command, CommandId},
        messages::DocToHubMsgPayload,
    },
};

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum HubInput {
    Command {
        command_id: CommandId,
        command: Box<Command>,
    },
    Tick,
    ActorMessage {
        actor_id: DocumentActorId,
        message: DocToHubMsgPayload,
    },
    ConnectionLost {
        connection_id: ConnectionId,
    },
    Stop,
}
