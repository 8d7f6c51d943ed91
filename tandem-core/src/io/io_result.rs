use super::IoTaskId;

/// The outcome of an [`IoTask`](super::IoTask), correlated by `task_id`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IoResult<Payload> {
    pub task_id: IoTaskId,
    pub payload: Payload,
}
