use std::sync::{Arc, Mutex};

use automerge::Automerge;
use tracing::Instrument;

use super::{
    ActorState, DocumentActorId, SpawnArgs,
    errors::DocumentError,
    io::{DocumentIoKind, DocumentIoResult, DocumentIoTask},
    run::{ActorInput, ActorOutput, actor_run},
};
use crate::{
    ConnectionId, DocumentChanged, DocumentId, PeerId, UnixTimestamp,
    actors::{
        DocToHubMsg, HubToDocMsg, RunState,
        driver::{Actor, Driver, StepResult},
        messages::{Broadcast, DocToHubMsgPayload},
    },
    io::{IoResult, IoTask},
};

/// Owns one automerge document and keeps it in sync with storage and with
/// connected peers.
///
/// Like the [`Hub`](crate::actors::hub::Hub), a document actor performs no
/// I/O. Every call returns a [`DocActorResult`] containing storage and
/// announce policy tasks for the host to run, messages for the hub, and
/// events for local observers.
pub struct DocumentActor {
    document_id: DocumentId,
    id: DocumentActorId,
    state: Arc<Mutex<ActorState>>,
    driver: Driver<Self>,
    stopped: bool,
}

impl Actor for DocumentActor {
    type IoTaskAction = DocumentIoTask;
    type IoResult = DocumentIoResult;
    type StepResults = DocActorResult;
    type Output = ActorOutput;
    type Input = ActorInput;
    type Complete = ();
    type IoKind = DocumentIoKind;

    fn task_kind(task: &DocumentIoTask) -> DocumentIoKind {
        task.kind()
    }

    fn result_kind(result: &DocumentIoResult) -> DocumentIoKind {
        result.kind()
    }

    fn finish_step(
        outputs: Vec<Self::Output>,
        new_io_tasks: Vec<IoTask<Self::IoTaskAction>>,
    ) -> Self::StepResults {
        let mut result = DocActorResult::default();
        for output in outputs {
            match output {
                ActorOutput::Message(msg) => result.outgoing_messages.push(DocToHubMsg(msg)),
                ActorOutput::EphemeralMessage(data) => result.ephemeral_messages.push(data),
                ActorOutput::DocChanged { new_heads } => {
                    result.change_events.push(DocumentChanged { new_heads });
                }
            }
        }
        result.io_tasks.extend(new_io_tasks);
        result
    }
}

impl DocumentActor {
    /// Creates the actor described by `args`.
    ///
    /// # Errors
    ///
    /// [`DocumentError::InvalidInitialContent`] if the spawn arguments carry
    /// initial content which is not a saved automerge document.
    pub fn new(
        now: UnixTimestamp,
        SpawnArgs {
            actor_id,
            local_peer_id,
            document_id,
            initial_content,
            initial_connections,
        }: SpawnArgs,
    ) -> Result<(Self, DocActorResult), DocumentError> {
        let span = tracing::info_span!("document_actor", %document_id, %local_peer_id, %actor_id);
        let state = match initial_content {
            Some(bytes) => {
                let doc = Automerge::load(&bytes)
                    .map_err(|e| DocumentError::InvalidInitialContent(e.to_string()))?;
                ActorState::new_ready(document_id, doc)
            }
            None => ActorState::new_loading(document_id),
        };
        let state = Arc::new(Mutex::new(state));

        let driver = Driver::<DocumentActor>::spawn(now, |args| {
            actor_run(
                args.now,
                args.rx_input,
                args.io,
                state.clone(),
                initial_connections,
            )
            .instrument(span)
        });

        let mut actor = Self {
            document_id,
            id: actor_id,
            state,
            driver,
            stopped: false,
        };
        let result = actor.step(now);
        Ok((actor, result))
    }

    /// Processes a message from the hub
    pub fn handle_message(
        &mut self,
        now: UnixTimestamp,
        message: HubToDocMsg,
    ) -> Result<DocActorResult, DocumentError> {
        self.ensure_running()?;
        self.driver.handle_input(now, ActorInput::from(message.0));
        Ok(self.step(now))
    }

    /// Hands the result of a task from [`DocActorResult::io_tasks`] back to
    /// the code waiting for it.
    ///
    /// # Errors
    ///
    /// [`DocumentError::Io`] if the task id is not outstanding or the result
    /// is of the wrong kind.
    #[tracing::instrument(
        skip(self, io_result),
        fields(document_id = %self.document_id, actor_id = %self.id)
    )]
    pub fn handle_io_complete(
        &mut self,
        now: UnixTimestamp,
        io_result: IoResult<DocumentIoResult>,
    ) -> Result<DocActorResult, DocumentError> {
        self.ensure_running()?;
        self.driver.handle_io_complete(now, io_result)?;
        Ok(self.step(now))
    }

    pub fn document_id(&self) -> &DocumentId {
        &self.document_id
    }

    pub fn actor_id(&self) -> DocumentActorId {
        self.id
    }

    /// Runs `f` against the document.
    ///
    /// Changes made by `f` are saved, synced to peers and reported as a
    /// [`DocumentChanged`] in the returned result.
    ///
    /// # Errors
    ///
    /// [`DocumentError::DocumentNotReady`] unless the document has been
    /// loaded or found, [`DocumentError::ActorStopped`] after termination.
    #[tracing::instrument(
        skip(self, f),
        fields(document_id = %self.document_id, actor_id = %self.id)
    )]
    pub fn with_document<F, T>(
        &mut self,
        now: UnixTimestamp,
        f: F,
    ) -> Result<WithDocResult<T>, DocumentError>
    where
        F: FnOnce(&mut Automerge) -> T,
    {
        self.ensure_running()?;
        let (value, old_heads, new_heads) = {
            let mut state = self.state.lock().unwrap();
            let doc = state.document()?;
            let old_heads = doc.get_heads();
            let value = f(&mut *doc);
            (value, old_heads, doc.get_heads())
        };

        // One turn of the run loop picks up the new changes
        self.driver.handle_input(now, ActorInput::Tick);
        let mut actor_result = self.step(now);
        if old_heads != new_heads {
            tracing::debug!("document modified locally");
            actor_result
                .change_events
                .push(DocumentChanged { new_heads });
        }

        Ok(WithDocResult {
            value,
            actor_result,
        })
    }

    /// Sends an ephemeral message to every connected peer
    pub fn broadcast(&mut self, _now: UnixTimestamp, msg: Vec<u8>) -> DocActorResult {
        let mut result = DocActorResult::default();
        if self.stopped {
            result.stopped = true;
            return result;
        }
        let connections = self.state.lock().unwrap().broadcast_targets(None);
        result
            .outgoing_messages
            .push(DocToHubMsg(DocToHubMsgPayload::Broadcast {
                connections,
                msg: Broadcast::New { msg },
            }));
        result
    }

    pub fn is_document_ready(&self) -> bool {
        self.state.lock().unwrap().is_ready()
    }

    /// The connections this document is syncing with
    pub fn peers(&self) -> Vec<(ConnectionId, PeerId)> {
        self.state.lock().unwrap().peers()
    }

    pub fn is_stopped(&self) -> bool {
        self.stopped
    }

    fn ensure_running(&self) -> Result<(), DocumentError> {
        if self.stopped {
            Err(DocumentError::ActorStopped)
        } else {
            Ok(())
        }
    }

    fn step(&mut self, now: UnixTimestamp) -> DocActorResult {
        match self.driver.step(now) {
            StepResult::Suspend(results) => results,
            StepResult::Complete { mut results, .. } => {
                debug_assert_eq!(self.state.lock().unwrap().run_state(), RunState::Stopped);
                tracing::debug!(
                    document_id = %self.document_id,
                    actor_id = %self.id,
                    "document actor finished"
                );
                self.stopped = true;
                results.stopped = true;
                results
            }
        }
    }
}

/// The value returned by the closure passed to
/// [`DocumentActor::with_document`], along with the side effects of running it
#[derive(Debug)]
pub struct WithDocResult<T> {
    pub value: T,
    pub actor_result: DocActorResult,
}

/// Everything that resulted from one call into a [`DocumentActor`]
#[derive(Debug, Default)]
pub struct DocActorResult {
    /// Tasks the host must perform and report back with
    /// [`DocumentActor::handle_io_complete`]
    pub io_tasks: Vec<IoTask<DocumentIoTask>>,
    /// Messages to deliver to the hub
    pub outgoing_messages: Vec<DocToHubMsg>,
    /// Ephemeral messages received from peers
    pub ephemeral_messages: Vec<Vec<u8>>,
    pub change_events: Vec<DocumentChanged>,
    /// The actor has terminated and can be dropped
    pub stopped: bool,
}
