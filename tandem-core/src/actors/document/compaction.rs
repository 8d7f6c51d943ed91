//! Deciding what to write to storage as a document changes.
//!
//! Every new change is written under its own incremental key. Once more than
//! [`COMPACTION_THRESHOLD`] changes are waiting, or more than that many
//! chunks are on disk, the whole document is written as one snapshot instead
//! and every chunk the snapshot supersedes is deleted once the snapshot put
//! has completed.
use std::collections::HashSet;

use automerge::{Automerge, ChangeHash};

use crate::{DocumentId, StorageKey};

mod compaction_hash;
use compaction_hash::CompactionHash;

const COMPACTION_THRESHOLD: usize = 10;

#[derive(Debug)]
pub(super) struct SaveState {
    last_saved_heads: Option<Vec<ChangeHash>>,
    on_disk: HashSet<StorageKey>,
    compaction: Option<Compaction>,
    deletions: HashSet<StorageKey>,
}

#[derive(Debug)]
struct Compaction {
    key: StorageKey,
    supersedes: HashSet<StorageKey>,
}

#[derive(Debug)]
pub(super) enum Job {
    Put { key: StorageKey, data: Vec<u8> },
    Delete(StorageKey),
}

#[derive(Debug)]
pub(super) enum JobComplete {
    Put(StorageKey),
    Delete(StorageKey),
}

impl SaveState {
    pub(super) fn new() -> Self {
        Self {
            last_saved_heads: None,
            on_disk: HashSet::new(),
            compaction: None,
            deletions: HashSet::new(),
        }
    }

    /// Record what a load found. Everything in the document at this point
    /// is already on disk.
    pub(super) fn loaded<I: IntoIterator<Item = StorageKey>>(
        &mut self,
        keys: I,
        heads: Vec<ChangeHash>,
    ) {
        self.on_disk.extend(keys);
        self.last_saved_heads = Some(heads);
    }

    pub(super) fn pop_new_jobs(&mut self, doc_id: &DocumentId, doc: &Automerge) -> Vec<Job> {
        let mut jobs = Vec::new();
        let new_changes = doc.get_changes(self.last_saved_heads.as_deref().unwrap_or_default());

        let should_compact = new_changes.len() > COMPACTION_THRESHOLD
            || self.on_disk.len() > COMPACTION_THRESHOLD;
        if self.compaction.is_none() && should_compact {
            tracing::debug!(
                num_changes = new_changes.len(),
                num_on_disk = self.on_disk.len(),
                "compacting document"
            );
            let heads = doc.get_heads();
            let hash = CompactionHash::from(&heads[..]);
            let key = StorageKey::snapshot_path(doc_id, &hash.to_string());
            self.compaction = Some(Compaction {
                key: key.clone(),
                supersedes: self.on_disk.iter().filter(|k| **k != key).cloned().collect(),
            });
            jobs.push(Job::Put {
                key,
                data: doc.save(),
            });
        } else {
            jobs.extend(new_changes.into_iter().map(|change| Job::Put {
                key: StorageKey::incremental_path(doc_id, change.hash()),
                data: change.raw_bytes().to_vec(),
            }));
        }

        jobs.extend(self.deletions.drain().map(Job::Delete));
        self.last_saved_heads = Some(doc.get_heads());
        jobs
    }

    pub(super) fn mark_job_complete(&mut self, completion: JobComplete) {
        match completion {
            JobComplete::Put(key) => {
                if let Some(compaction) = self.compaction.take_if(|c| c.key == key) {
                    tracing::debug!(%key, "snapshot saved, deleting superseded chunks");
                    // Anything left over if a delete never happens is
                    // superseded again by the next snapshot
                    for superseded in &compaction.supersedes {
                        self.on_disk.remove(superseded);
                    }
                    self.deletions.extend(compaction.supersedes);
                }
                self.on_disk.insert(key);
            }
            JobComplete::Delete(key) => {
                self.on_disk.remove(&key);
            }
        }
    }

    #[cfg(test)]
    pub(super) fn on_disk(&self) -> usize {
        self.on_disk.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use automerge::transaction::Transactable;

    fn doc_with_changes(n: usize) -> Automerge {
        let mut doc = Automerge::new();
        for i in 0..n {
            let mut tx = doc.transaction();
            tx.put(automerge::ROOT, "counter", i as i64).unwrap();
            tx.commit();
        }
        doc
    }

    fn complete_all(state: &mut SaveState, jobs: Vec<Job>) {
        for job in jobs {
            state.mark_job_complete(match job {
                Job::Put { key, .. } => JobComplete::Put(key),
                Job::Delete(key) => JobComplete::Delete(key),
            });
        }
    }

    #[test]
    fn few_changes_are_saved_incrementally() {
        let doc_id = DocumentId::from([1; 16]);
        let doc = doc_with_changes(3);
        let mut state = SaveState::new();
        let jobs = state.pop_new_jobs(&doc_id, &doc);
        assert_eq!(jobs.len(), 3);
        for job in &jobs {
            let Job::Put { key, .. } = job else {
                panic!("expected a put, got {job:?}");
            };
            assert!(StorageKey::incremental_prefix(&doc_id).is_prefix_of(key));
        }
        // Nothing new to do the second time round
        assert!(state.pop_new_jobs(&doc_id, &doc).is_empty());
    }

    #[test]
    fn many_changes_compact_into_a_snapshot() {
        let doc_id = DocumentId::from([2; 16]);
        let mut doc = doc_with_changes(4);
        let mut state = SaveState::new();
        let jobs = state.pop_new_jobs(&doc_id, &doc);
        complete_all(&mut state, jobs);
        assert_eq!(state.on_disk(), 4);

        for i in 0..11 {
            let mut tx = doc.transaction();
            tx.put(automerge::ROOT, "more", i as i64).unwrap();
            tx.commit();
        }
        let jobs = state.pop_new_jobs(&doc_id, &doc);
        assert_eq!(jobs.len(), 1);
        let Job::Put { key, data } = &jobs[0] else {
            panic!("expected a put");
        };
        assert!(StorageKey::snapshot_prefix(&doc_id).is_prefix_of(key));
        let reloaded = Automerge::load(data).unwrap();
        assert_eq!(reloaded.get_heads(), doc.get_heads());
        complete_all(&mut state, jobs);

        // The superseded incrementals are deleted on the next pass
        let deletes = state.pop_new_jobs(&doc_id, &doc);
        assert_eq!(deletes.len(), 4);
        assert!(deletes.iter().all(|j| matches!(j, Job::Delete(_))));
        complete_all(&mut state, deletes);
        assert_eq!(state.on_disk(), 1);
    }
}
