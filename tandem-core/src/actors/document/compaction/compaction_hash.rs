use automerge::ChangeHash;
use sha2::Digest;

/// Names a snapshot by the heads it contains: the SHA-256 of the sorted
/// change hashes
#[derive(Copy, Clone, PartialEq, Eq, Hash)]
pub(crate) struct CompactionHash([u8; 32]);

impl std::fmt::Debug for CompactionHash {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "CompactionHash({self})")
    }
}

impl std::fmt::Display for CompactionHash {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&hex::encode(self.0))
    }
}

impl From<&[ChangeHash]> for CompactionHash {
    fn from(heads: &[ChangeHash]) -> Self {
        let mut sorted = heads.to_vec();
        sorted.sort();
        let mut hasher = sha2::Sha256::new();
        for head in sorted {
            hasher.update(head.0);
        }
        Self(hasher.finalize().into())
    }
}
