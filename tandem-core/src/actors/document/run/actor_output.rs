use automerge::ChangeHash;

use crate::actors::messages::DocToHubMsgPayload;

#[derive(Debug)]
pub(crate) enum ActorOutput {
    Message(DocToHubMsgPayload),
    EphemeralMessage(Vec<u8>),
    DocChanged { new_heads: Vec<ChangeHash> },
}
