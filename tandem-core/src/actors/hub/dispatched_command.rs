use super::{CommandId, HubEvent};

/// A command event together with the id its result will be reported under
/// in [`HubResults::completed_commands`](super::HubResults)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DispatchedCommand {
    pub command_id: CommandId,
    pub event: HubEvent,
}
