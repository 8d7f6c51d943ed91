use crate::io::IoResult;

use super::{io::HubIoResult, run::HubInput};

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum HubEventPayload {
    IoComplete(IoResult<HubIoResult>),
    /// Anything else, handled by the hub's event loop
    Input(HubInput),
}
