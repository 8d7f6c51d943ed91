use std::{
    collections::{BTreeMap, HashMap, VecDeque},
    hash::{DefaultHasher, Hash, Hasher},
    time::Duration,
};

use automerge::Automerge;
use rand::{SeedableRng, rngs::StdRng};
use tandem_core::{
    CommandId, CommandResult, ConnectionId, DocumentActorId, DocumentChanged, DocumentId,
    HubConfig, Loader, LoaderState, PeerId, UnixTimestamp,
    actors::{
        DocToHubMsg, HubToDocMsg,
        document::{DocumentError, SpawnArgs},
        hub::{
            DispatchedCommand, Hub, HubEvent, HubResults,
            io::{HubIoAction, HubIoResult},
        },
    },
    io::IoResult,
    network::{ConnDirection, ConnectionEvent, ConnectionInfo, PeerDocState},
};

use crate::{
    InMemoryStorage, InMemoryTransport, Transport,
    doc_actor_runner::{AnnouncePolicy, DocActorRunner},
    storage::dispatch_storage_task,
};

/// A hub, the document actors it spawned, and the storage and transports
/// they use.
///
/// Every envelope passing between the hub and an actor is round-tripped
/// through its byte encoding, as it would be when crossing a thread or
/// language boundary.
pub struct HubWrapper {
    nickname: String,
    hub: Hub,
    now: UnixTimestamp,
    storage: InMemoryStorage,
    announce_policy: Box<AnnouncePolicy>,
    inbox: VecDeque<HubEvent>,
    transports: BTreeMap<ConnectionId, InMemoryTransport>,
    completed_commands: HashMap<CommandId, CommandResult>,
    actors: BTreeMap<DocumentActorId, DocActorRunner>,
    connection_events: Vec<ConnectionEvent>,
    peer_state_changes: HashMap<DocumentId, Vec<HashMap<ConnectionId, PeerDocState>>>,
    stopped: bool,
}

impl HubWrapper {
    pub(crate) fn new(nickname: String, mut storage: InMemoryStorage, config: HubConfig) -> Self {
        let peer_id: PeerId = nickname
            .parse()
            .expect("nickname must be a valid peer id");
        let now = UnixTimestamp::from_millis(1_000);

        let mut hasher = DefaultHasher::new();
        nickname.hash(&mut hasher);
        let rng = StdRng::seed_from_u64(hasher.finish());

        let mut loader = Loader::with_config(rng, peer_id, now, config);
        let hub = loop {
            match loader.step(now) {
                LoaderState::NeedIo(tasks) => {
                    for task in tasks {
                        let payload = dispatch_storage_task(&mut storage, task.action);
                        loader
                            .provide_io_result(
                                now,
                                IoResult {
                                    task_id: task.task_id,
                                    payload,
                                },
                            )
                            .expect("loader rejected the result of its own task");
                    }
                }
                LoaderState::Loaded(hub) => break *hub,
            }
        };

        HubWrapper {
            nickname,
            hub,
            now,
            storage,
            announce_policy: Box::new(|_, _| true),
            inbox: VecDeque::new(),
            transports: BTreeMap::new(),
            completed_commands: HashMap::new(),
            actors: BTreeMap::new(),
            connection_events: Vec::new(),
            peer_state_changes: HashMap::new(),
            stopped: false,
        }
    }

    pub(crate) fn hub(&self) -> &Hub {
        &self.hub
    }

    pub(crate) fn advance_time(&mut self, by: Duration) {
        self.now = self.now + by;
    }

    pub(crate) fn storage(&self) -> &InMemoryStorage {
        &self.storage
    }

    pub(crate) fn set_announce_policy(&mut self, policy: Box<AnnouncePolicy>) {
        self.announce_policy = policy;
    }

    pub(crate) fn is_stopped(&self) -> bool {
        self.stopped
    }

    pub(crate) fn push_event(&mut self, event: HubEvent) {
        self.inbox.push_back(event);
    }

    /// Queue a command, returning its id so the result can be looked up
    /// once the network has run
    pub(crate) fn dispatch(&mut self, command: DispatchedCommand) -> CommandId {
        self.inbox.push_back(command.event);
        command.command_id
    }

    pub(crate) fn command_result(&self, command_id: &CommandId) -> Option<&CommandResult> {
        self.completed_commands.get(command_id)
    }

    pub(crate) fn create_connection(
        &mut self,
        direction: ConnDirection,
        transport: InMemoryTransport,
    ) -> ConnectionId {
        self.handle_events();
        let DispatchedCommand { command_id, event } = HubEvent::create_connection(direction);
        let results = self
            .hub
            .handle_event(self.now, event)
            .expect("hub rejected create connection");
        let Some(CommandResult::CreateConnection { connection_id }) =
            results.completed_commands.get(&command_id).cloned()
        else {
            panic!("create connection did not complete immediately");
        };
        // the join for an outgoing connection goes out with these results
        self.transports.insert(connection_id, transport);
        self.handle_results(results);
        connection_id
    }

    pub(crate) fn close_transport(&mut self, connection_id: ConnectionId) {
        if let Some(transport) = self.transports.get_mut(&connection_id) {
            transport.close();
        }
    }

    /// Process every queued event. Returns whether there was anything to do.
    pub(crate) fn handle_events(&mut self) -> bool {
        let mut handled = false;
        while let Some(event) = self.inbox.pop_front() {
            handled = true;
            let results = self
                .hub
                .handle_event(self.now, event)
                .expect("hub rejected event");
            self.handle_results(results);
        }
        handled
    }

    /// Turn frames which arrived on our transports, and transports closed by
    /// the other end, into hub events
    pub(crate) fn pump_transports(&mut self) -> bool {
        let mut received = false;
        let mut closed = Vec::new();
        for (connection_id, transport) in self.transports.iter_mut() {
            while let Some(msg) = transport.receive() {
                self.inbox
                    .push_back(HubEvent::receive(*connection_id, msg).event);
                received = true;
            }
            if transport.is_closed() {
                closed.push(*connection_id);
            }
        }
        for connection_id in closed {
            tracing::debug!(
                nickname = %self.nickname,
                %connection_id,
                "transport closed by remote"
            );
            self.transports.remove(&connection_id);
            self.inbox.push_back(HubEvent::connection_lost(connection_id));
            received = true;
        }
        received
    }

    fn handle_results(&mut self, results: HubResults) {
        let HubResults {
            new_tasks,
            completed_commands,
            spawn_actors,
            actor_messages,
            connection_events,
            stopped,
        } = results;

        for task in new_tasks {
            let payload = match task.action {
                HubIoAction::Send { connection_id, msg } => {
                    match self.transports.get_mut(&connection_id) {
                        Some(transport) => {
                            if let Err(e) = transport.send(msg) {
                                tracing::debug!(%connection_id, err = %e, "dropping message");
                            }
                        }
                        None => tracing::warn!(%connection_id, "send on unknown transport"),
                    }
                    HubIoResult::Send
                }
                HubIoAction::Disconnect { connection_id } => {
                    if let Some(mut transport) = self.transports.remove(&connection_id) {
                        transport.close();
                    }
                    HubIoResult::Disconnect
                }
            };
            self.inbox.push_back(HubEvent::io_complete(IoResult {
                task_id: task.task_id,
                payload,
            }));
        }

        for (command_id, result) in completed_commands {
            let previous = self.completed_commands.insert(command_id, result);
            assert!(
                previous.is_none(),
                "command {command_id} completed twice on {}",
                self.nickname
            );
        }

        for event in connection_events {
            if let ConnectionEvent::StateChanged {
                connection_id,
                new_state,
            } = &event
            {
                self.record_peer_states(*connection_id, new_state);
            }
            self.connection_events.push(event);
        }

        for args in spawn_actors {
            let args = SpawnArgs::try_from(args.to_bytes().as_slice())
                .expect("spawn args should decode");
            let actor_id = args.actor_id();
            let document_id = *args.document_id();
            if let Some(existing) = self.actor_for_document(&document_id) {
                panic!(
                    "{} spawned {actor_id} for {document_id} which already has {existing}",
                    self.nickname
                );
            }
            let policy = &*self.announce_policy;
            match DocActorRunner::spawn(self.now, args, &mut self.storage, policy) {
                Ok(runner) => {
                    let previous = self.actors.insert(actor_id, runner);
                    assert!(previous.is_none(), "{actor_id} spawned twice");
                    self.inbox
                        .push_back(HubEvent::actor_ready(document_id).event);
                }
                Err(e) => tracing::error!(%actor_id, err = %e, "failed to spawn document actor"),
            }
        }

        for (actor_id, msg) in actor_messages {
            let msg = HubToDocMsg::try_from(msg.to_bytes().as_slice())
                .expect("hub to doc message should decode");
            match self.actors.get_mut(&actor_id) {
                Some(runner) => {
                    runner.handle_message(self.now, msg, &mut self.storage, &*self.announce_policy)
                }
                None => tracing::warn!(%actor_id, "message for unknown actor"),
            }
        }

        self.collect_actor_output();

        if stopped {
            self.stopped = true;
        }
    }

    fn collect_actor_output(&mut self) {
        for (actor_id, runner) in self.actors.iter_mut() {
            for msg in runner.take_outgoing() {
                let msg = DocToHubMsg::try_from(msg.to_bytes().as_slice())
                    .expect("doc to hub message should decode");
                self.inbox
                    .push_back(HubEvent::actor_message(*actor_id, msg));
            }
        }
    }

    fn record_peer_states(&mut self, connection_id: ConnectionId, info: &ConnectionInfo) {
        for (document_id, state) in &info.docs {
            let changes = self.peer_state_changes.entry(*document_id).or_default();
            let mut latest = changes.last().cloned().unwrap_or_default();
            if latest.get(&connection_id) != Some(state) {
                latest.insert(connection_id, state.clone());
                changes.push(latest);
            }
        }
    }

    pub(crate) fn create_document(&mut self, content: Automerge) -> CommandId {
        self.dispatch(HubEvent::create_document(content))
    }

    pub(crate) fn actor(&self, actor_id: &DocumentActorId) -> Option<&DocActorRunner> {
        self.actors.get(actor_id)
    }

    pub(crate) fn actor_for_document(&self, document_id: &DocumentId) -> Option<DocumentActorId> {
        self.actors
            .iter()
            .find(|(_, runner)| runner.document_id() == document_id && !runner.is_stopped())
            .map(|(actor_id, _)| *actor_id)
    }

    pub(crate) fn running_actors(&self) -> usize {
        self.actors.values().filter(|r| !r.is_stopped()).count()
    }

    pub(crate) fn with_document<F, T>(
        &mut self,
        actor_id: DocumentActorId,
        f: F,
    ) -> Result<T, DocumentError>
    where
        F: FnOnce(&mut Automerge) -> T,
    {
        let runner = self
            .actors
            .get_mut(&actor_id)
            .unwrap_or_else(|| panic!("no actor {actor_id} on {}", self.nickname));
        let value = runner.with_document(self.now, &mut self.storage, &*self.announce_policy, f)?;
        self.collect_actor_output();
        Ok(value)
    }

    pub(crate) fn broadcast(&mut self, actor_id: DocumentActorId, msg: Vec<u8>) {
        let runner = self
            .actors
            .get_mut(&actor_id)
            .unwrap_or_else(|| panic!("no actor {actor_id} on {}", self.nickname));
        runner.broadcast(self.now, msg, &mut self.storage, &*self.announce_policy);
        self.collect_actor_output();
    }

    pub(crate) fn ephemeral_messages(&self, actor_id: &DocumentActorId) -> Vec<Vec<u8>> {
        self.actors
            .get(actor_id)
            .map(|r| r.ephemeral_messages().to_vec())
            .unwrap_or_default()
    }

    pub(crate) fn change_events(&self, actor_id: &DocumentActorId) -> Vec<DocumentChanged> {
        self.actors
            .get(actor_id)
            .map(|r| r.change_events().to_vec())
            .unwrap_or_default()
    }

    pub(crate) fn connection_events(&self) -> &[ConnectionEvent] {
        &self.connection_events
    }

    pub(crate) fn peer_state_changes(
        &self,
        document_id: &DocumentId,
    ) -> &[HashMap<ConnectionId, PeerDocState>] {
        self.peer_state_changes
            .get(document_id)
            .map(Vec::as_slice)
            .unwrap_or_default()
    }
}
