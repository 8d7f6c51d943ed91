use crate::StorageKey;

/// A key/value storage operation.
///
/// Storage has no cross-key transactions. `LoadRange` returns every entry
/// whose key has `prefix` as a component-wise prefix (see
/// [`StorageKey::is_prefix_of`]).
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum StorageTask {
    Load { key: StorageKey },
    LoadRange { prefix: StorageKey },
    Put { key: StorageKey, value: Vec<u8> },
    Delete { key: StorageKey },
}

impl std::fmt::Display for StorageTask {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StorageTask::Load { key } => write!(f, "load({key})"),
            StorageTask::LoadRange { prefix } => write!(f, "load_range({prefix})"),
            StorageTask::Put { key, value } => write!(f, "put({key}, {} bytes)", value.len()),
            StorageTask::Delete { key } => write!(f, "delete({key})"),
        }
    }
}

/// The kind of a storage operation, shared by tasks and their results
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StorageOp {
    Load,
    LoadRange,
    Put,
    Delete,
}

impl StorageTask {
    pub fn op(&self) -> StorageOp {
        match self {
            StorageTask::Load { .. } => StorageOp::Load,
            StorageTask::LoadRange { .. } => StorageOp::LoadRange,
            StorageTask::Put { .. } => StorageOp::Put,
            StorageTask::Delete { .. } => StorageOp::Delete,
        }
    }
}
