//! The I/O a document actor delegates to its host.
use crate::{
    PeerId,
    io::{StorageOp, StorageResult, StorageTask},
};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DocumentIoTask {
    Storage(StorageTask),
    /// Ask the host whether we should tell this peer about the document
    /// without them asking for it first. Answered with
    /// [`DocumentIoResult::CheckAnnouncePolicy`].
    CheckAnnouncePolicy { peer_id: PeerId },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DocumentIoResult {
    Storage(StorageResult),
    CheckAnnouncePolicy(bool),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocumentIoKind {
    Storage(StorageOp),
    CheckAnnouncePolicy,
}

impl DocumentIoTask {
    pub fn kind(&self) -> DocumentIoKind {
        match self {
            DocumentIoTask::Storage(task) => DocumentIoKind::Storage(task.op()),
            DocumentIoTask::CheckAnnouncePolicy { .. } => DocumentIoKind::CheckAnnouncePolicy,
        }
    }
}

impl DocumentIoResult {
    pub fn kind(&self) -> DocumentIoKind {
        match self {
            DocumentIoResult::Storage(result) => DocumentIoKind::Storage(result.op()),
            DocumentIoResult::CheckAnnouncePolicy(_) => DocumentIoKind::CheckAnnouncePolicy,
        }
    }
}
