use std::str::FromStr;

use rand::Rng;

/// The identity of a storage backend.
///
/// Two peers which report the same storage id share a disk, which lets a
/// peer skip re-sending data the other side already persisted. Locally
/// generated ids are UUIDv4 strings, ids learned from remote peers are
/// accepted as any non-empty string.
#[derive(Clone, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct StorageId(String);

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StorageIdError {
    #[error("storage ids must not be empty")]
    Empty,
}

impl StorageId {
    pub(crate) fn new<R: Rng>(rng: &mut R) -> Self {
        let uuid = uuid::Builder::from_random_bytes(rng.random()).into_uuid();
        StorageId(uuid.to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl FromStr for StorageId {
    type Err = StorageIdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.is_empty() {
            return Err(StorageIdError::Empty);
        }
        Ok(StorageId(s.to_string()))
    }
}

impl TryFrom<String> for StorageId {
    type Error = StorageIdError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        if value.is_empty() {
            return Err(StorageIdError::Empty);
        }
        Ok(StorageId(value))
    }
}

impl From<StorageId> for String {
    fn from(id: StorageId) -> Self {
        id.0
    }
}

impl std::fmt::Display for StorageId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl std::fmt::Debug for StorageId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "StorageId({})", self.0)
    }
}
