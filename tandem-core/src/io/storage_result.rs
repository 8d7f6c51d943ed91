use std::collections::HashMap;

use crate::StorageKey;

use super::StorageOp;

/// The answer to a [`StorageTask`](super::StorageTask). The variant must
/// match the variant of the task it answers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StorageResult {
    Load {
        value: Option<Vec<u8>>,
    },
    LoadRange {
        values: HashMap<StorageKey, Vec<u8>>,
    },
    Put,
    Delete,
}

impl StorageResult {
    pub fn op(&self) -> StorageOp {
        match self {
            StorageResult::Load { .. } => StorageOp::Load,
            StorageResult::LoadRange { .. } => StorageOp::LoadRange,
            StorageResult::Put => StorageOp::Put,
            StorageResult::Delete => StorageOp::Delete,
        }
    }
}
