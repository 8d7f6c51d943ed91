use crate::{
    ConnectionId, PeerId,
    actors::messages::{DocMessage, HubToDocMsgPayload},
};

/// Inputs to the run loop of a document actor
#[derive(Debug)]
pub(crate) enum ActorInput {
    Terminate,
    HandleDocMessage {
        connection_id: ConnectionId,
        message: DocMessage,
    },
    NewConnection {
        connection_id: ConnectionId,
        peer_id: PeerId,
    },
    ConnectionClosed {
        connection_id: ConnectionId,
    },
    /// Look for the document again after it was not found
    Request,
    /// Wake the loop so that it notices local edits
    Tick,
}

impl From<HubToDocMsgPayload> for ActorInput {
    fn from(message: HubToDocMsgPayload) -> Self {
        match message {
            HubToDocMsgPayload::Terminate => ActorInput::Terminate,
            HubToDocMsgPayload::HandleDocMessage {
                connection_id,
                message,
            } => ActorInput::HandleDocMessage {
                connection_id,
                message,
            },
            HubToDocMsgPayload::NewConnection {
                connection_id,
                peer_id,
            } => ActorInput::NewConnection {
                connection_id,
                peer_id,
            },
            HubToDocMsgPayload::ConnectionClosed { connection_id } => {
                ActorInput::ConnectionClosed { connection_id }
            }
            HubToDocMsgPayload::RequestAgain => ActorInput::Request,
        }
    }
}
