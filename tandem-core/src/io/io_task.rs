use super::IoTaskId;

/// A unit of I/O the host must perform and eventually answer with an
/// [`IoResult`](super::IoResult) carrying the same `task_id`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct IoTask<Action> {
    pub task_id: IoTaskId,
    pub action: Action,
}

impl<Action> IoTask<Action> {
    pub(crate) fn map<B, F: FnOnce(Action) -> B>(self, f: F) -> IoTask<B> {
        IoTask {
            task_id: self.task_id,
            action: f(self.action),
        }
    }
}
