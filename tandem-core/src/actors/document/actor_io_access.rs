use std::collections::HashMap;

use automerge::ChangeHash;

use crate::{
    PeerId, StorageKey,
    actors::{driver::ActorIo, messages::DocToHubMsgPayload},
    io::{StorageResult, StorageTask},
};

use super::{
    DocumentActor,
    io::{DocumentIoResult, DocumentIoTask},
    run::ActorOutput,
};

// The driver only hands a future a result of the kind its task asked for,
// so the fallback arms below are never taken.

#[derive(Clone)]
pub(super) struct ActorIoAccess {
    io: ActorIo<DocumentActor>,
}

impl ActorIoAccess {
    pub(super) fn new(io: ActorIo<DocumentActor>) -> Self {
        Self { io }
    }

    pub(super) async fn load_range(&self, prefix: StorageKey) -> HashMap<StorageKey, Vec<u8>> {
        match self.storage(StorageTask::LoadRange { prefix }).await {
            StorageResult::LoadRange { values } => values,
            other => unreachable!("load_range answered with {other:?}"),
        }
    }

    pub(super) async fn put(&self, key: StorageKey, value: Vec<u8>) {
        self.storage(StorageTask::Put { key, value }).await;
    }

    pub(super) async fn delete(&self, key: StorageKey) {
        self.storage(StorageTask::Delete { key }).await;
    }

    pub(super) async fn check_announce_policy(&self, peer_id: PeerId) -> bool {
        match self
            .io
            .perform_io(DocumentIoTask::CheckAnnouncePolicy { peer_id })
            .await
        {
            DocumentIoResult::CheckAnnouncePolicy(announce) => announce,
            other => unreachable!("announce policy check answered with {other:?}"),
        }
    }

    pub(super) fn emit_ephemeral_message(&self, msg: Vec<u8>) {
        self.io.emit_event(ActorOutput::EphemeralMessage(msg));
    }

    pub(super) fn emit_doc_changed(&self, new_heads: Vec<ChangeHash>) {
        self.io.emit_event(ActorOutput::DocChanged { new_heads });
    }

    pub(super) fn send_message(&self, message: DocToHubMsgPayload) {
        self.io.emit_event(ActorOutput::Message(message));
    }

    async fn storage(&self, task: StorageTask) -> StorageResult {
        match self.io.perform_io(DocumentIoTask::Storage(task)).await {
            DocumentIoResult::Storage(result) => result,
            other => unreachable!("storage task answered with {other:?}"),
        }
    }
}
