use std::collections::VecDeque;

use automerge::Automerge;
use tandem_core::{
    DocumentChanged, DocumentId, PeerId, UnixTimestamp,
    actors::{
        DocToHubMsg, HubToDocMsg,
        document::{
            DocActorResult, DocumentActor, DocumentError, SpawnArgs, WithDocResult,
            io::{DocumentIoResult, DocumentIoTask},
        },
    },
    io::IoResult,
};

use crate::{InMemoryStorage, storage::dispatch_storage_task};

pub(crate) type AnnouncePolicy = dyn Fn(&DocumentId, &PeerId) -> bool;

/// Runs a document actor to completion of every step, performing its I/O
/// synchronously against in-memory storage
pub(crate) struct DocActorRunner {
    actor: DocumentActor,
    to_hub: Vec<DocToHubMsg>,
    ephemeral_messages: Vec<Vec<u8>>,
    change_events: Vec<DocumentChanged>,
}

impl DocActorRunner {
    pub(crate) fn spawn(
        now: UnixTimestamp,
        args: SpawnArgs,
        storage: &mut InMemoryStorage,
        policy: &AnnouncePolicy,
    ) -> Result<Self, DocumentError> {
        let (actor, result) = DocumentActor::new(now, args)?;
        let mut runner = DocActorRunner {
            actor,
            to_hub: Vec::new(),
            ephemeral_messages: Vec::new(),
            change_events: Vec::new(),
        };
        runner.handle_results(now, result, storage, policy);
        Ok(runner)
    }

    pub(crate) fn document_id(&self) -> &DocumentId {
        self.actor.document_id()
    }

    pub(crate) fn is_stopped(&self) -> bool {
        self.actor.is_stopped()
    }

    pub(crate) fn actor(&self) -> &DocumentActor {
        &self.actor
    }

    pub(crate) fn handle_message(
        &mut self,
        now: UnixTimestamp,
        msg: HubToDocMsg,
        storage: &mut InMemoryStorage,
        policy: &AnnouncePolicy,
    ) {
        match self.actor.handle_message(now, msg) {
            Ok(result) => self.handle_results(now, result, storage, policy),
            Err(e) => tracing::warn!(err = %e, "document actor rejected message"),
        }
    }

    pub(crate) fn with_document<F, T>(
        &mut self,
        now: UnixTimestamp,
        storage: &mut InMemoryStorage,
        policy: &AnnouncePolicy,
        f: F,
    ) -> Result<T, DocumentError>
    where
        F: FnOnce(&mut Automerge) -> T,
    {
        let WithDocResult {
            value,
            actor_result,
        } = self.actor.with_document(now, f)?;
        self.handle_results(now, actor_result, storage, policy);
        Ok(value)
    }

    pub(crate) fn broadcast(
        &mut self,
        now: UnixTimestamp,
        msg: Vec<u8>,
        storage: &mut InMemoryStorage,
        policy: &AnnouncePolicy,
    ) {
        let result = self.actor.broadcast(now, msg);
        self.handle_results(now, result, storage, policy);
    }

    pub(crate) fn take_outgoing(&mut self) -> Vec<DocToHubMsg> {
        std::mem::take(&mut self.to_hub)
    }

    pub(crate) fn ephemeral_messages(&self) -> &[Vec<u8>] {
        &self.ephemeral_messages
    }

    pub(crate) fn change_events(&self) -> &[DocumentChanged] {
        &self.change_events
    }

    fn handle_results(
        &mut self,
        now: UnixTimestamp,
        result: DocActorResult,
        storage: &mut InMemoryStorage,
        policy: &AnnouncePolicy,
    ) {
        let mut pending = VecDeque::from([result]);
        while let Some(result) = pending.pop_front() {
            let DocActorResult {
                io_tasks,
                outgoing_messages,
                ephemeral_messages,
                change_events,
                stopped,
            } = result;
            self.to_hub.extend(outgoing_messages);
            self.ephemeral_messages.extend(ephemeral_messages);
            self.change_events.extend(change_events);
            if stopped {
                tracing::debug!(document_id = %self.actor.document_id(), "document actor stopped");
            }

            for task in io_tasks {
                let payload = match task.action {
                    DocumentIoTask::Storage(storage_task) => {
                        DocumentIoResult::Storage(dispatch_storage_task(storage, storage_task))
                    }
                    DocumentIoTask::CheckAnnouncePolicy { peer_id } => {
                        DocumentIoResult::CheckAnnouncePolicy(policy(
                            self.actor.document_id(),
                            &peer_id,
                        ))
                    }
                };
                let result = self
                    .actor
                    .handle_io_complete(
                        now,
                        IoResult {
                            task_id: task.task_id,
                            payload,
                        },
                    )
                    .expect("document actor rejected the result of its own task");
                pending.push_back(result);
            }
        }
    }
}
