//! A single-writer wrapper around an automerge document for hosts which
//! edit documents outside of a [`DocumentActor`](crate::actors::document::DocumentActor).
//!
//! A [`Document`] is either idle or has exactly one open transaction.
//! Transactions are represented by move-only [`Transaction`] handles which
//! must be passed to every write and are consumed by
//! [`Document::commit`] or [`Document::rollback`].
//!
//! ```rust
//! use automerge::ROOT;
//! use tandem_core::document::{Document, DocError};
//!
//! let mut doc = Document::new();
//! let tx = doc.transaction().unwrap();
//! doc.put(&tx, ROOT, "count", 1_i64).unwrap();
//!
//! // only one transaction at a time
//! assert!(matches!(doc.transaction(), Err(DocError::TransactionInProgress)));
//!
//! let hash = doc.commit(tx).unwrap();
//! assert!(hash.is_some());
//! assert_eq!(doc.get_heads(), vec![hash.unwrap()]);
//! ```
use automerge::{
    ActorId, AutoCommit, AutomergeError, ChangeHash, ObjId, ObjType, Patch, Prop, ReadDoc,
    ScalarValue, Value,
    marks::{ExpandMark, Mark},
    sync::{self, SyncDoc},
    transaction::Transactable,
};

mod sync_state;
pub use sync_state::SyncState;
mod transaction;
pub use transaction::{CommitKind, HashOnly, Transaction, WithPatches};
use transaction::TransactionId;

#[derive(Debug, thiserror::Error)]
pub enum DocError {
    #[error("a transaction is already in progress")]
    TransactionInProgress,
    #[error("no transaction is in progress")]
    NoTransaction,
    #[error("transaction handle does not belong to the open transaction")]
    StaleTransaction,
    #[error(transparent)]
    Automerge(#[from] AutomergeError),
    #[error("invalid sync message: {0}")]
    InvalidSyncMessage(String),
    #[error("invalid sync state: {0}")]
    InvalidSyncState(String),
}

enum Mode {
    Idle,
    InTransaction {
        id: TransactionId,
        start_heads: Vec<ChangeHash>,
    },
}

pub struct Document {
    doc: AutoCommit,
    mode: Mode,
}

impl Default for Document {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for Document {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Document")
            .field("actor_id", self.doc.get_actor())
            .field("in_transaction", &self.in_transaction())
            .finish()
    }
}

impl Document {
    pub fn new() -> Self {
        Self::from_autocommit(AutoCommit::new())
    }

    pub fn with_actor(actor_id: ActorId) -> Self {
        Self::from_autocommit(AutoCommit::new().with_actor(actor_id))
    }

    /// # Errors
    ///
    /// [`DocError::Automerge`] if the bytes are not a valid document
    pub fn load(bytes: &[u8]) -> Result<Self, DocError> {
        Ok(Self::from_autocommit(AutoCommit::load(bytes)?))
    }

    fn from_autocommit(doc: AutoCommit) -> Self {
        Self {
            doc,
            mode: Mode::Idle,
        }
    }

    pub fn actor_id(&self) -> &ActorId {
        self.doc.get_actor()
    }

    pub fn in_transaction(&self) -> bool {
        matches!(self.mode, Mode::InTransaction { .. })
    }

    /// The heads of the document. While a transaction is open these are the
    /// heads it started from.
    pub fn get_heads(&mut self) -> Vec<ChangeHash> {
        match &self.mode {
            Mode::Idle => self.doc.get_heads(),
            Mode::InTransaction { start_heads, .. } => start_heads.clone(),
        }
    }

    pub fn save(&mut self) -> Result<Vec<u8>, DocError> {
        self.ensure_idle()?;
        Ok(self.doc.save())
    }

    /// A copy of this document with a new actor id
    pub fn fork(&mut self) -> Result<Document, DocError> {
        self.ensure_idle()?;
        Ok(Self::from_autocommit(self.doc.fork()))
    }

    /// Apply every change in `other` which this document is missing,
    /// returning the hashes of the changes applied.
    pub fn merge(&mut self, other: &mut Document) -> Result<Vec<ChangeHash>, DocError> {
        self.ensure_idle()?;
        other.ensure_idle()?;
        Ok(self.doc.merge(&mut other.doc)?)
    }

    pub fn transaction(&mut self) -> Result<Transaction<HashOnly>, DocError> {
        self.begin()
    }

    pub fn transaction_with_patches(&mut self) -> Result<Transaction<WithPatches>, DocError> {
        self.begin()
    }

    fn begin<K: CommitKind>(&mut self) -> Result<Transaction<K>, DocError> {
        self.ensure_idle()?;
        let start_heads = self.doc.get_heads();
        let id = TransactionId::new();
        tracing::trace!(?id, "opening transaction");
        self.mode = Mode::InTransaction { id, start_heads };
        Ok(Transaction::new(id))
    }

    /// Commit the pending operations of `tx`.
    ///
    /// Returns `None` in place of a hash if the transaction made no changes.
    pub fn commit<K: CommitKind>(&mut self, tx: Transaction<K>) -> Result<K::Output, DocError> {
        self.check(&tx)?;
        let Mode::InTransaction { start_heads, .. } =
            std::mem::replace(&mut self.mode, Mode::Idle)
        else {
            return Err(DocError::NoTransaction);
        };
        let hash = self.doc.commit();
        Ok(K::finish(&mut self.doc, hash, &start_heads))
    }

    /// Discard the pending operations of `tx`, returning how many there were
    pub fn rollback<K: CommitKind>(&mut self, tx: Transaction<K>) -> Result<usize, DocError> {
        self.check(&tx)?;
        self.mode = Mode::Idle;
        Ok(self.doc.rollback())
    }

    fn ensure_idle(&self) -> Result<(), DocError> {
        match self.mode {
            Mode::Idle => Ok(()),
            Mode::InTransaction { .. } => Err(DocError::TransactionInProgress),
        }
    }

    fn check<K: CommitKind>(&self, tx: &Transaction<K>) -> Result<(), DocError> {
        match &self.mode {
            Mode::Idle => Err(DocError::NoTransaction),
            Mode::InTransaction { id, .. } if *id == tx.id() => Ok(()),
            Mode::InTransaction { .. } => Err(DocError::StaleTransaction),
        }
    }

    pub fn put<K, O, P, V>(
        &mut self,
        tx: &Transaction<K>,
        obj: O,
        prop: P,
        value: V,
    ) -> Result<(), DocError>
    where
        K: CommitKind,
        O: AsRef<ObjId>,
        P: Into<Prop>,
        V: Into<ScalarValue>,
    {
        self.check(tx)?;
        Ok(self.doc.put(obj, prop, value)?)
    }

    pub fn put_object<K, O, P>(
        &mut self,
        tx: &Transaction<K>,
        obj: O,
        prop: P,
        object: ObjType,
    ) -> Result<ObjId, DocError>
    where
        K: CommitKind,
        O: AsRef<ObjId>,
        P: Into<Prop>,
    {
        self.check(tx)?;
        Ok(self.doc.put_object(obj, prop, object)?)
    }

    pub fn insert<K, O, V>(
        &mut self,
        tx: &Transaction<K>,
        obj: O,
        index: usize,
        value: V,
    ) -> Result<(), DocError>
    where
        K: CommitKind,
        O: AsRef<ObjId>,
        V: Into<ScalarValue>,
    {
        self.check(tx)?;
        Ok(self.doc.insert(obj, index, value)?)
    }

    pub fn insert_object<K, O>(
        &mut self,
        tx: &Transaction<K>,
        obj: O,
        index: usize,
        object: ObjType,
    ) -> Result<ObjId, DocError>
    where
        K: CommitKind,
        O: AsRef<ObjId>,
    {
        self.check(tx)?;
        Ok(self.doc.insert_object(obj, index, object)?)
    }

    pub fn delete<K, O, P>(&mut self, tx: &Transaction<K>, obj: O, prop: P) -> Result<(), DocError>
    where
        K: CommitKind,
        O: AsRef<ObjId>,
        P: Into<Prop>,
    {
        self.check(tx)?;
        Ok(self.doc.delete(obj, prop)?)
    }

    pub fn increment<K, O, P>(
        &mut self,
        tx: &Transaction<K>,
        obj: O,
        prop: P,
        by: i64,
    ) -> Result<(), DocError>
    where
        K: CommitKind,
        O: AsRef<ObjId>,
        P: Into<Prop>,
    {
        self.check(tx)?;
        Ok(self.doc.increment(obj, prop, by)?)
    }

    /// Replaces `del` elements of the list `obj` at `pos` with `values`
    pub fn splice<K, O, V>(
        &mut self,
        tx: &Transaction<K>,
        obj: O,
        pos: usize,
        del: isize,
        values: V,
    ) -> Result<(), DocError>
    where
        K: CommitKind,
        O: AsRef<ObjId>,
        V: IntoIterator<Item = ScalarValue>,
    {
        self.check(tx)?;
        Ok(self.doc.splice(obj, pos, del, values)?)
    }

    pub fn splice_text<K, O>(
        &mut self,
        tx: &Transaction<K>,
        obj: O,
        pos: usize,
        del: isize,
        text: &str,
    ) -> Result<(), DocError>
    where
        K: CommitKind,
        O: AsRef<ObjId>,
    {
        self.check(tx)?;
        Ok(self.doc.splice_text(obj, pos, del, text)?)
    }

    pub fn mark<K, O>(
        &mut self,
        tx: &Transaction<K>,
        obj: O,
        mark: Mark,
        expand: ExpandMark,
    ) -> Result<(), DocError>
    where
        K: CommitKind,
        O: AsRef<ObjId>,
    {
        self.check(tx)?;
        Ok(self.doc.mark(obj, mark, expand)?)
    }

    // Reads see pending operations of an open transaction

    pub fn get<O: AsRef<ObjId>, P: Into<Prop>>(
        &self,
        obj: O,
        prop: P,
    ) -> Result<Option<(Value<'_>, ObjId)>, DocError> {
        Ok(self.doc.get(obj, prop)?)
    }

    pub fn get_all<O: AsRef<ObjId>, P: Into<Prop>>(
        &self,
        obj: O,
        prop: P,
    ) -> Result<Vec<(Value<'_>, ObjId)>, DocError> {
        Ok(self.doc.get_all(obj, prop)?)
    }

    pub fn keys<O: AsRef<ObjId>>(&self, obj: O) -> Vec<String> {
        self.doc.keys(obj).collect()
    }

    pub fn length<O: AsRef<ObjId>>(&self, obj: O) -> usize {
        self.doc.length(obj)
    }

    pub fn text<O: AsRef<ObjId>>(&self, obj: O) -> Result<String, DocError> {
        Ok(self.doc.text(obj)?)
    }

    /// The next message to send to a peer whose state is `sync_state`, if
    /// there is anything left to say
    pub fn generate_sync_message(
        &mut self,
        sync_state: &mut SyncState,
    ) -> Result<Option<Vec<u8>>, DocError> {
        self.ensure_idle()?;
        Ok(self
            .doc
            .sync()
            .generate_sync_message(sync_state.inner_mut())
            .map(|msg| msg.encode()))
    }

    pub fn receive_sync_message(
        &mut self,
        sync_state: &mut SyncState,
        msg: &[u8],
    ) -> Result<(), DocError> {
        self.ensure_idle()?;
        let msg = sync::Message::decode(msg)
            .map_err(|e| DocError::InvalidSyncMessage(e.to_string()))?;
        self.doc
            .sync()
            .receive_sync_message(sync_state.inner_mut(), msg)?;
        Ok(())
    }

    /// Like [`Self::receive_sync_message`] but also returns the patches
    /// describing what the message changed
    pub fn receive_sync_message_with_patches(
        &mut self,
        sync_state: &mut SyncState,
        msg: &[u8],
    ) -> Result<Vec<Patch>, DocError> {
        let before = self.get_heads();
        self.receive_sync_message(sync_state, msg)?;
        let after = self.doc.get_heads();
        Ok(self.doc.diff(&before, &after))
    }
}
