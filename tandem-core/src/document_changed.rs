use automerge::ChangeHash;

/// Emitted by a document actor whenever the heads of its document move,
/// whether from a local edit, an incoming sync message or loading from
/// storage.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DocumentChanged {
    pub new_heads: Vec<ChangeHash>,
}
