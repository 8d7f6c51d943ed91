//! Types describing the I/O the core delegates to its host.
//!
//! Nothing in this crate touches a disk or a socket. Instead, actors emit
//! [`IoTask`]s and the host performs them, reporting back with an
//! [`IoResult`] carrying the same [`IoTaskId`]. Each task id is consumed by
//! exactly one result, a second result for the same id is rejected.
mod io_result;
mod io_task;
mod io_task_id;
mod storage_result;
mod storage_task;

pub use io_result::IoResult;
pub use io_task::IoTask;
pub use io_task_id::IoTaskId;
pub use storage_result::StorageResult;
pub use storage_task::{StorageOp, StorageTask};

/// A host supplied an [`IoResult`] which cannot be accepted.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum IoTaskError {
    /// The task id was never issued, or its result was already provided
    #[error("no outstanding IO task with id {0}")]
    UnknownTask(IoTaskId),
    /// The result is of a different kind than the task. The task remains
    /// outstanding.
    #[error("result for {task_id} does not match the task: expected {expected}, found {found}")]
    MismatchedResult {
        task_id: IoTaskId,
        expected: String,
        found: String,
    },
}
