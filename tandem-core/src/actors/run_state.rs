#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum RunState {
    Running,
    /// Waiting for document actors to acknowledge termination
    Stopping,
    Stopped,
}
