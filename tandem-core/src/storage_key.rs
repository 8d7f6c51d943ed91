use std::fmt;

use automerge::ChangeHash;

use crate::DocumentId;

/// A hierarchical key for storage operations.
///
/// A `StorageKey` is a sequence of non-empty string components which contain
/// no `/`. Hosts typically flatten a key by joining the components with `/`,
/// the restriction on components makes that flattening reversible.
///
/// Range queries in the storage contract are defined in terms of
/// [`StorageKey::is_prefix_of`], which compares whole components rather than
/// characters.
///
/// ## Examples
///
/// ```rust
/// use tandem_core::StorageKey;
///
/// let key = StorageKey::from_parts(["docs", "123", "incremental"]).unwrap();
/// let prefix = StorageKey::from_parts(["docs", "123"]).unwrap();
/// assert!(prefix.is_prefix_of(&key));
///
/// // "doc" is not a component-wise prefix of "docs"
/// let not_prefix = StorageKey::from_parts(["doc"]).unwrap();
/// assert!(!not_prefix.is_prefix_of(&key));
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct StorageKey(Vec<String>);

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StorageKeyError {
    #[error("storage key components must not be empty")]
    EmptyComponent,
    #[error("storage key component {0:?} contains a '/'")]
    ContainsSlash(String),
}

impl StorageKey {
    pub fn storage_id_path() -> StorageKey {
        StorageKey(vec!["storage-adapter-id".to_string()])
    }

    /// The prefix under which all data for `doc_id` is stored
    pub fn document_prefix(doc_id: &DocumentId) -> StorageKey {
        StorageKey(vec![doc_id.to_string()])
    }

    pub fn incremental_prefix(doc_id: &DocumentId) -> StorageKey {
        StorageKey(vec![doc_id.to_string(), "incremental".to_string()])
    }

    pub fn incremental_path(doc_id: &DocumentId, change_hash: ChangeHash) -> StorageKey {
        StorageKey(vec![
            doc_id.to_string(),
            "incremental".to_string(),
            change_hash.to_string(),
        ])
    }

    pub fn snapshot_prefix(doc_id: &DocumentId) -> StorageKey {
        StorageKey(vec![doc_id.to_string(), "snapshot".to_string()])
    }

    pub fn snapshot_path(doc_id: &DocumentId, compaction_hash: &str) -> StorageKey {
        StorageKey(vec![
            doc_id.to_string(),
            "snapshot".to_string(),
            compaction_hash.to_string(),
        ])
    }

    /// Creates a storage key from its components, validating each one.
    ///
    /// ```rust
    /// use tandem_core::{StorageKey, StorageKeyError};
    ///
    /// assert!(StorageKey::from_parts(["users", "123"]).is_ok());
    /// assert_eq!(
    ///     StorageKey::from_parts(["users", ""]),
    ///     Err(StorageKeyError::EmptyComponent)
    /// );
    /// assert!(StorageKey::from_parts(["a/b"]).is_err());
    /// ```
    pub fn from_parts<I, S>(parts: I) -> Result<Self, StorageKeyError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let components = parts
            .into_iter()
            .map(|part| {
                let part = part.into();
                if part.is_empty() {
                    Err(StorageKeyError::EmptyComponent)
                } else if part.contains('/') {
                    Err(StorageKeyError::ContainsSlash(part))
                } else {
                    Ok(part)
                }
            })
            .collect::<Result<Vec<_>, _>>()?;
        Ok(StorageKey(components))
    }

    /// Checks if this key is a component-wise prefix of another key.
    ///
    /// Every key is a prefix of itself.
    pub fn is_prefix_of(&self, other: &StorageKey) -> bool {
        if self.0.len() > other.0.len() {
            return false;
        }
        self.0.iter().zip(other.0.iter()).all(|(a, b)| a == b)
    }

    pub fn components(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// The final component, if any
    pub fn last(&self) -> Option<&str> {
        self.0.last().map(String::as_str)
    }
}

impl<'a> IntoIterator for &'a StorageKey {
    type Item = &'a String;
    type IntoIter = std::slice::Iter<'a, String>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

impl TryFrom<Vec<String>> for StorageKey {
    type Error = StorageKeyError;

    fn try_from(value: Vec<String>) -> Result<Self, Self::Error> {
        StorageKey::from_parts(value)
    }
}

impl<'a> TryFrom<Vec<&'a str>> for StorageKey {
    type Error = StorageKeyError;

    fn try_from(value: Vec<&'a str>) -> Result<Self, Self::Error> {
        StorageKey::from_parts(value)
    }
}

impl fmt::Display for StorageKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.join("/"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key(parts: &[&str]) -> StorageKey {
        StorageKey::from_parts(parts.iter().copied()).unwrap()
    }

    #[test]
    fn prefix_is_component_wise() {
        assert!(key(&["a"]).is_prefix_of(&key(&["a", "b"])));
        assert!(!key(&["a"]).is_prefix_of(&key(&["ab"])));
        assert!(!key(&["a", "b"]).is_prefix_of(&key(&["a"])));
        assert!(key(&["a", "b"]).is_prefix_of(&key(&["a", "b"])));
    }

    #[test]
    fn empty_key_is_prefix_of_everything() {
        let empty = StorageKey::from_parts(Vec::<String>::new()).unwrap();
        assert!(empty.is_prefix_of(&key(&["x", "y"])));
    }

    #[test]
    fn document_paths_share_a_prefix() {
        let doc_id = DocumentId::from([7; 16]);
        let prefix = StorageKey::document_prefix(&doc_id);
        let snapshot = StorageKey::snapshot_path(&doc_id, "abc");
        assert!(prefix.is_prefix_of(&snapshot));
        assert!(StorageKey::snapshot_prefix(&doc_id).is_prefix_of(&snapshot));
        assert!(!StorageKey::incremental_prefix(&doc_id).is_prefix_of(&snapshot));
    }
}
