use std::{
    marker::PhantomData,
    sync::atomic::{AtomicU64, Ordering},
};

use automerge::{AutoCommit, ChangeHash, Patch};

static LAST_TRANSACTION_ID: AtomicU64 = AtomicU64::new(0);

/// Unique across every document in the process so that a handle from one
/// document is never mistaken for a handle of another
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(super) struct TransactionId(u64);

impl TransactionId {
    pub(super) fn new() -> Self {
        Self(LAST_TRANSACTION_ID.fetch_add(1, Ordering::Relaxed) + 1)
    }
}

/// A handle to the open transaction of a [`Document`](super::Document).
///
/// Handles cannot be cloned. Passing one to
/// [`Document::commit`](super::Document::commit) or
/// [`Document::rollback`](super::Document::rollback) consumes it.
#[derive(Debug)]
#[must_use = "a transaction must be committed or rolled back"]
pub struct Transaction<K: CommitKind> {
    id: TransactionId,
    _kind: PhantomData<K>,
}

impl<K: CommitKind> Transaction<K> {
    pub(super) fn new(id: TransactionId) -> Self {
        Self {
            id,
            _kind: PhantomData,
        }
    }

    pub(super) fn id(&self) -> TransactionId {
        self.id
    }
}

mod sealed {
    pub trait Sealed {}
}

/// Decides what committing a [`Transaction`] returns
pub trait CommitKind: sealed::Sealed {
    type Output;

    #[doc(hidden)]
    fn finish(doc: &mut AutoCommit, hash: Option<ChangeHash>, start_heads: &[ChangeHash])
    -> Self::Output;
}

/// Commit returns the hash of the new change
#[derive(Debug)]
pub struct HashOnly;

/// Commit returns the hash of the new change and the patches it produced
#[derive(Debug)]
pub struct WithPatches;

impl sealed::Sealed for HashOnly {}
impl sealed::Sealed for WithPatches {}

impl CommitKind for HashOnly {
    type Output = Option<ChangeHash>;

    fn finish(
        _doc: &mut AutoCommit,
        hash: Option<ChangeHash>,
        _start: &[ChangeHash],
    ) -> Self::Output {
        hash
    }
}

impl CommitKind for WithPatches {
    type Output = (Option<ChangeHash>, Vec<Patch>);

    fn finish(
        doc: &mut AutoCommit,
        hash: Option<ChangeHash>,
        start_heads: &[ChangeHash],
    ) -> Self::Output {
        if hash.is_none() {
            return (None, Vec::new());
        }
        let after = doc.get_heads();
        (hash, doc.diff(start_heads, &after))
    }
}
