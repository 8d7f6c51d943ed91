use std::sync::atomic::{AtomicU32, Ordering};

static LAST_IO_TASK_ID: AtomicU32 = AtomicU32::new(0);

/// Identifies one outstanding I/O task.
///
/// Ids are allocated from a process wide counter, so a task issued by one
/// actor can never be mistaken for a task issued by another.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct IoTaskId(u32);

impl IoTaskId {
    pub(crate) fn new() -> Self {
        IoTaskId(LAST_IO_TASK_ID.fetch_add(1, Ordering::SeqCst))
    }
}

impl std::fmt::Display for IoTaskId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "io-{}", self.0)
    }
}

impl From<IoTaskId> for u32 {
    fn from(id: IoTaskId) -> Self {
        id.0
    }
}

impl From<u32> for IoTaskId {
    fn from(id: u32) -> Self {
        IoTaskId(id)
    }
}
