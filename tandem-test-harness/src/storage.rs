use std::collections::HashMap;

use tandem_core::{
    StorageKey,
    io::{StorageResult, StorageTask},
};

/// The storage contract hosts implement for the core.
///
/// There are no transactions spanning keys. `load_range` matches keys
/// component-wise, see [`StorageKey::is_prefix_of`].
pub trait Storage {
    fn load(&self, key: &StorageKey) -> Option<Vec<u8>>;
    fn load_range(&self, prefix: &StorageKey) -> HashMap<StorageKey, Vec<u8>>;
    fn put(&mut self, key: StorageKey, value: Vec<u8>);
    fn delete(&mut self, key: &StorageKey);
}

/// Perform `task` against `storage`
pub fn dispatch_storage_task<S: Storage + ?Sized>(
    storage: &mut S,
    task: StorageTask,
) -> StorageResult {
    tracing::trace!(%task, "performing storage task");
    match task {
        StorageTask::Load { key } => StorageResult::Load {
            value: storage.load(&key),
        },
        StorageTask::LoadRange { prefix } => StorageResult::LoadRange {
            values: storage.load_range(&prefix),
        },
        StorageTask::Put { key, value } => {
            storage.put(key, value);
            StorageResult::Put
        }
        StorageTask::Delete { key } => {
            storage.delete(&key);
            StorageResult::Delete
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InMemoryStorage(HashMap<StorageKey, Vec<u8>>);

impl InMemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn keys(&self) -> impl Iterator<Item = &StorageKey> {
        self.0.keys()
    }
}

impl From<HashMap<StorageKey, Vec<u8>>> for InMemoryStorage {
    fn from(values: HashMap<StorageKey, Vec<u8>>) -> Self {
        Self(values)
    }
}

impl Storage for InMemoryStorage {
    fn load(&self, key: &StorageKey) -> Option<Vec<u8>> {
        self.0.get(key).cloned()
    }

    fn load_range(&self, prefix: &StorageKey) -> HashMap<StorageKey, Vec<u8>> {
        self.0
            .iter()
            .filter(|(k, _)| prefix.is_prefix_of(k))
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect()
    }

    fn put(&mut self, key: StorageKey, value: Vec<u8>) {
        self.0.insert(key, value);
    }

    fn delete(&mut self, key: &StorageKey) {
        self.0.remove(key);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key(parts: &[&str]) -> StorageKey {
        StorageKey::from_parts(parts.iter().copied()).unwrap()
    }

    #[test]
    fn load_range_is_component_wise() {
        let mut storage = InMemoryStorage::new();
        storage.put(key(&["a", "b"]), vec![1]);
        storage.put(key(&["ab"]), vec![2]);
        storage.put(key(&["a"]), vec![3]);

        let range = storage.load_range(&key(&["a"]));
        assert_eq!(range.len(), 2);
        assert!(range.contains_key(&key(&["a", "b"])));
        assert!(range.contains_key(&key(&["a"])));
    }

    #[test]
    fn dispatch_performs_the_task() {
        let mut storage = InMemoryStorage::new();
        let put = dispatch_storage_task(
            &mut storage,
            StorageTask::Put {
                key: key(&["k"]),
                value: vec![7],
            },
        );
        assert_eq!(put, StorageResult::Put);
        let load = dispatch_storage_task(&mut storage, StorageTask::Load { key: key(&["k"]) });
        assert_eq!(load, StorageResult::Load { value: Some(vec![7]) });
        dispatch_storage_task(&mut storage, StorageTask::Delete { key: key(&["k"]) });
        assert!(storage.is_empty());
    }
}
