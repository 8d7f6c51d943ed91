mod command;
use std::sync::{Arc, Mutex};

pub(crate) use command::Command;
pub use command::{CommandId, CommandResult};
mod command_handlers;
mod config;
pub use config::HubConfig;
mod connection;
mod dispatched_command;
pub use dispatched_command::DispatchedCommand;
mod hub_event;
mod run;
pub use hub_event::HubEvent;
use run::{HubInput, HubOutput};
mod hub_event_payload;
pub(crate) use hub_event_payload::HubEventPayload;
mod hub_results;
pub use hub_results::HubResults;
pub mod io;
mod state;
use io::{HubIoAction, HubIoKind, HubIoResult};
pub(crate) use state::State;
mod task_context;

use crate::{
    ConnectionId, DocumentActorId, Loader, PeerId, StorageId, UnixTimestamp,
    io::{IoTask, IoTaskError},
    network::ConnectionInfo,
};

use super::{
    RunState,
    driver::{Actor, Driver, StepResult},
};

/// Errors caused by the host misusing [`Hub::handle_event`].
///
/// Problems caused by remote peers are never reported this way, they are
/// surfaced as [`CommandResult`]s and
/// [`ConnectionEvent`](crate::network::ConnectionEvent)s instead.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum HubError {
    #[error(transparent)]
    Io(#[from] IoTaskError),
    #[error("no document actor with id {0}")]
    UnknownActor(DocumentActorId),
}

/// The coordinator of a peer.
///
/// The hub owns the connections to remote peers, decides when document
/// actors are spawned, and routes messages between connections and actors.
/// It performs no I/O itself, everything it needs done is returned from
/// [`Hub::handle_event`] for the host to carry out.
pub struct Hub {
    driver: Driver<Hub>,
    state: Arc<Mutex<State>>,
}

impl Actor for Hub {
    type IoTaskAction = HubIoAction;
    type IoResult = HubIoResult;
    type StepResults = HubResults;
    type Output = HubOutput;
    type Input = HubInput;
    type Complete = ();
    type IoKind = HubIoKind;

    fn task_kind(task: &HubIoAction) -> HubIoKind {
        task.kind()
    }

    fn result_kind(result: &HubIoResult) -> HubIoKind {
        result.kind()
    }

    fn finish_step(
        outputs: Vec<Self::Output>,
        new_io_tasks: Vec<IoTask<HubIoAction>>,
    ) -> Self::StepResults {
        let mut results = HubResults::default();
        for output in outputs {
            output.record(&mut results);
        }
        results.new_tasks.extend(new_io_tasks);
        results
    }
}

impl Hub {
    pub(crate) fn new<R: rand::Rng + Send + 'static>(
        rng: R,
        now: UnixTimestamp,
        state: Arc<Mutex<State>>,
    ) -> Self {
        let driver = Driver::spawn(now, |args| {
            run::run(rng, args.now, state.clone(), args.rx_input, args.io)
        });
        Hub { driver, state }
    }

    /// Begins loading a hub, see [`Loader`]
    pub fn load<R: rand::Rng + Send + 'static>(
        rng: R,
        now: UnixTimestamp,
        peer_id: PeerId,
    ) -> Loader<R> {
        Loader::new(rng, peer_id, now)
    }

    /// Processes an event and returns everything that resulted from it.
    ///
    /// Events are processed in call order. The returned [`HubResults`]
    /// contain I/O the host must perform, commands which completed, actors
    /// to spawn, messages to deliver to actors and connection events.
    ///
    /// # Errors
    ///
    /// Returns an error, without processing the event, if it is an I/O
    /// result for a task which is not outstanding or a message from an
    /// actor the hub doesn't know about.
    #[tracing::instrument(skip(self), fields(event = %event), level = "trace")]
    pub fn handle_event(
        &mut self,
        now: UnixTimestamp,
        event: HubEvent,
    ) -> Result<HubResults, HubError> {
        if self.is_stopped() {
            return Ok(HubResults {
                stopped: true,
                ..Default::default()
            });
        }
        match event.payload {
            HubEventPayload::IoComplete(result) => {
                self.driver.handle_io_complete(now, result)?;
            }
            HubEventPayload::Input(input) => {
                if let HubInput::ActorMessage { actor_id, .. } = &input {
                    if !self.state.lock().unwrap().has_actor(actor_id) {
                        return Err(HubError::UnknownActor(*actor_id));
                    }
                }
                self.driver.handle_input(now, input);
            }
        }
        match self.driver.step(now) {
            StepResult::Suspend(results) => Ok(results),
            StepResult::Complete { mut results, .. } => {
                self.state.lock().unwrap().set_run_state(RunState::Stopped);
                tracing::debug!("hub stopped");
                results.stopped = true;
                Ok(results)
            }
        }
    }

    /// The id of the storage this hub was loaded from
    pub fn storage_id(&self) -> StorageId {
        self.state.lock().unwrap().storage_id()
    }

    pub fn peer_id(&self) -> PeerId {
        self.state.lock().unwrap().peer_id().clone()
    }

    /// Every connection, whether handshaking or established
    pub fn connections(&self) -> Vec<ConnectionInfo> {
        self.state.lock().unwrap().connections()
    }

    /// The connections which completed the handshake, with the id of the
    /// peer at the other end
    pub fn established_peers(&self) -> Vec<(ConnectionId, PeerId)> {
        self.state.lock().unwrap().established_peers()
    }

    pub fn is_connected_to(&self, peer_id: &PeerId) -> bool {
        self.state.lock().unwrap().is_connected_to(peer_id)
    }

    pub fn is_stopped(&self) -> bool {
        self.state.lock().unwrap().run_state() == RunState::Stopped
    }
}
