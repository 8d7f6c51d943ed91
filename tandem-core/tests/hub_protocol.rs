//! Drives hubs by hand, passing bytes between them without the harness
use std::{
    collections::{HashMap, VecDeque},
    time::Duration,
};

use automerge::sync::SyncDoc;
use rand::{SeedableRng, rngs::StdRng};
use tandem_core::{
    CommandId, CommandResult, ConnectionId, DocumentActorId, DocumentId, HubConfig, HubError,
    Loader, LoaderError, LoaderState, PeerId, UnixTimestamp,
    actors::{
        document::{
            DocumentActor,
            io::{DocumentIoResult, DocumentIoTask},
        },
        hub::{
            DispatchedCommand, Hub, HubEvent, HubResults,
            io::{HubIoAction, HubIoResult},
        },
    },
    io::{IoResult, IoTaskError, StorageResult},
    network::{ConnDirection, ConnectionEvent, ConnectionState},
};
use tandem_test_harness::{InMemoryStorage, dispatch_storage_task};

fn init_logging() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .try_init();
}

fn start() -> UnixTimestamp {
    UnixTimestamp::from_millis(1_000)
}

fn load_hub(name: &str, config: HubConfig) -> Hub {
    let peer_id: PeerId = name.parse().unwrap();
    let mut storage = InMemoryStorage::new();
    let mut loader = Loader::with_config(StdRng::seed_from_u64(42), peer_id, start(), config);
    loop {
        match loader.step(start()) {
            LoaderState::NeedIo(tasks) => {
                for task in tasks {
                    let payload = dispatch_storage_task(&mut storage, task.action);
                    loader
                        .provide_io_result(
                            start(),
                            IoResult {
                                task_id: task.task_id,
                                payload,
                            },
                        )
                        .unwrap();
                }
            }
            LoaderState::Loaded(hub) => return *hub,
        }
    }
}

/// Bytes sent on `connection_id`, completing every task in `results`
fn take_sent(hub: &mut Hub, results: &HubResults, connection_id: ConnectionId) -> Vec<Vec<u8>> {
    let mut sent = Vec::new();
    for task in &results.new_tasks {
        let payload = match &task.action {
            HubIoAction::Send {
                connection_id: conn,
                msg,
            } => {
                if *conn == connection_id {
                    sent.push(msg.clone());
                }
                HubIoResult::Send
            }
            HubIoAction::Disconnect { .. } => HubIoResult::Disconnect,
        };
        hub.handle_event(
            start(),
            HubEvent::io_complete(IoResult {
                task_id: task.task_id,
                payload,
            }),
        )
        .unwrap();
    }
    sent
}

fn create_connection(hub: &mut Hub, direction: ConnDirection) -> (ConnectionId, HubResults) {
    let DispatchedCommand { command_id, event } = HubEvent::create_connection(direction);
    let results = hub.handle_event(start(), event).unwrap();
    let Some(CommandResult::CreateConnection { connection_id }) =
        results.completed_commands.get(&command_id)
    else {
        panic!("create connection should complete immediately");
    };
    (*connection_id, results)
}

fn join_frame(sender: &str, version: &str) -> Vec<u8> {
    let mut e = minicbor::Encoder::new(Vec::new());
    e.map(3)
        .unwrap()
        .str("type")
        .unwrap()
        .str("join")
        .unwrap()
        .str("senderId")
        .unwrap()
        .str(sender)
        .unwrap()
        .str("supportedProtocolVersions")
        .unwrap()
        .array(1)
        .unwrap()
        .str(version)
        .unwrap();
    e.into_writer()
}

#[test]
fn outgoing_handshake_completes() {
    init_logging();
    let mut alice = load_hub("alice", HubConfig::default());
    let mut bob = load_hub("bob", HubConfig::default());

    let (alice_conn, results) = create_connection(&mut alice, ConnDirection::Outgoing);
    let join = take_sent(&mut alice, &results, alice_conn);
    assert_eq!(join.len(), 1, "outgoing connection should send a join");
    assert!(!alice.connections().is_empty());
    assert_eq!(alice.connections()[0].state, ConnectionState::Handshaking);

    let (bob_conn, results) = create_connection(&mut bob, ConnDirection::Incoming);
    assert!(results.new_tasks.is_empty(), "incoming connection waits for join");

    let DispatchedCommand { command_id, event } = HubEvent::receive(bob_conn, join[0].clone());
    let results = bob.handle_event(start(), event).unwrap();
    assert_eq!(
        results.completed_commands.get(&command_id),
        Some(&CommandResult::Receive {
            connection_id: bob_conn,
            error: None
        })
    );
    assert!(results.connection_events.iter().any(|e| matches!(
        e,
        ConnectionEvent::HandshakeCompleted { connection_id, peer_info }
            if *connection_id == bob_conn && peer_info.peer_id.as_str() == "alice"
    )));
    let peer = take_sent(&mut bob, &results, bob_conn);
    assert_eq!(peer.len(), 1, "incoming side should answer with peer");

    let DispatchedCommand { event, .. } = HubEvent::receive(alice_conn, peer[0].clone());
    let results = alice.handle_event(start(), event).unwrap();
    assert!(results.connection_events.iter().any(|e| matches!(
        e,
        ConnectionEvent::HandshakeCompleted { peer_info, .. } if peer_info.peer_id.as_str() == "bob"
    )));
    let bob_id: PeerId = "bob".parse().unwrap();
    assert!(alice.is_connected_to(&bob_id));
    assert_eq!(alice.established_peers(), vec![(alice_conn, bob_id.clone())]);
    assert_eq!(
        alice.connections()[0].state,
        ConnectionState::Connected {
            their_peer_id: bob_id
        }
    );
}

#[test]
fn unsupported_protocol_version_fails_connection() {
    init_logging();
    let mut bob = load_hub("bob", HubConfig::default());
    let (bob_conn, _) = create_connection(&mut bob, ConnDirection::Incoming);

    let DispatchedCommand { command_id, event } =
        HubEvent::receive(bob_conn, join_frame("mallory", "2"));
    let results = bob.handle_event(start(), event).unwrap();

    assert!(results.connection_events.iter().any(|e| matches!(
        e,
        ConnectionEvent::ConnectionFailed { connection_id, .. } if *connection_id == bob_conn
    )));
    let sent_error = results.new_tasks.iter().any(|t| {
        matches!(&t.action, HubIoAction::Send { connection_id, .. } if *connection_id == bob_conn)
    });
    assert!(sent_error, "an error frame should be sent before disconnecting");
    let disconnect = results
        .new_tasks
        .iter()
        .find(|t| matches!(t.action, HubIoAction::Disconnect { .. }))
        .expect("a disconnect task");

    // The receive completes once the host has disconnected
    assert!(!results.completed_commands.contains_key(&command_id));
    let results = bob
        .handle_event(
            start(),
            HubEvent::io_complete(IoResult {
                task_id: disconnect.task_id,
                payload: HubIoResult::Disconnect,
            }),
        )
        .unwrap();
    match results.completed_commands.get(&command_id) {
        Some(CommandResult::Receive { error: Some(_), .. }) => {}
        other => panic!("expected a failed receive, got {other:?}"),
    }
    assert!(bob.connections().is_empty());
}

#[test]
fn garbage_fails_connection() {
    init_logging();
    let mut bob = load_hub("bob", HubConfig::default());
    let (bob_conn, _) = create_connection(&mut bob, ConnDirection::Incoming);

    let DispatchedCommand { command_id, event } = HubEvent::receive(bob_conn, vec![0xff, 0x00]);
    let results = bob.handle_event(start(), event).unwrap();
    let disconnect = results
        .new_tasks
        .iter()
        .find(|t| t.action == HubIoAction::Disconnect { connection_id: bob_conn })
        .expect("a disconnect task");
    let results = bob
        .handle_event(
            start(),
            HubEvent::io_complete(IoResult {
                task_id: disconnect.task_id,
                payload: HubIoResult::Disconnect,
            }),
        )
        .unwrap();
    match results.completed_commands.get(&command_id) {
        Some(CommandResult::Receive {
            error: Some(error), ..
        }) => assert!(error.starts_with("message decode error")),
        other => panic!("expected a decode error, got {other:?}"),
    }
}

#[test]
fn receive_on_unknown_connection_is_an_error_result() {
    init_logging();
    let mut alice = load_hub("alice", HubConfig::default());
    let mut bob = load_hub("bob", HubConfig::default());
    // a connection id which alice never issued
    let (bob_conn, _) = create_connection(&mut bob, ConnDirection::Incoming);

    let DispatchedCommand { command_id, event } = HubEvent::receive(bob_conn, vec![1, 2, 3]);
    let results = alice.handle_event(start(), event).unwrap();
    assert_eq!(
        results.completed_commands.get(&command_id),
        Some(&CommandResult::Receive {
            connection_id: bob_conn,
            error: Some("connection not found".to_string())
        })
    );
    assert!(results.new_tasks.is_empty());
}

#[test]
fn stale_handshakes_time_out_on_tick() {
    init_logging();
    let config = HubConfig {
        handshake_timeout: Duration::from_secs(5),
        ..Default::default()
    };
    let mut alice = load_hub("alice", config);
    let (conn, _) = create_connection(&mut alice, ConnDirection::Incoming);

    let results = alice
        .handle_event(start() + Duration::from_secs(1), HubEvent::tick())
        .unwrap();
    assert!(results.connection_events.is_empty());

    let results = alice
        .handle_event(start() + Duration::from_secs(6), HubEvent::tick())
        .unwrap();
    assert!(results.connection_events.iter().any(|e| matches!(
        e,
        ConnectionEvent::ConnectionFailed { connection_id, error }
            if *connection_id == conn && error == "handshake timed out"
    )));
    assert!(
        results
            .new_tasks
            .iter()
            .any(|t| t.action == HubIoAction::Disconnect { connection_id: conn })
    );
    assert!(alice.connections().is_empty());
}

#[test]
fn io_results_are_accepted_exactly_once() {
    init_logging();
    let mut alice = load_hub("alice", HubConfig::default());
    let (_, results) = create_connection(&mut alice, ConnDirection::Outgoing);
    let task = results.new_tasks[0].clone();
    let complete = || {
        HubEvent::io_complete(IoResult {
            task_id: task.task_id,
            payload: HubIoResult::Send,
        })
    };

    alice.handle_event(start(), complete()).unwrap();
    assert_eq!(
        alice.handle_event(start(), complete()).unwrap_err(),
        HubError::Io(IoTaskError::UnknownTask(task.task_id))
    );
}

#[test]
fn mismatched_io_result_is_rejected() {
    init_logging();
    let mut alice = load_hub("alice", HubConfig::default());
    let (_, results) = create_connection(&mut alice, ConnDirection::Outgoing);
    let task = results.new_tasks[0].clone();

    let err = alice
        .handle_event(
            start(),
            HubEvent::io_complete(IoResult {
                task_id: task.task_id,
                payload: HubIoResult::Disconnect,
            }),
        )
        .unwrap_err();
    assert!(matches!(err, HubError::Io(IoTaskError::MismatchedResult { .. })));

    // the task is still outstanding
    alice
        .handle_event(
            start(),
            HubEvent::io_complete(IoResult {
                task_id: task.task_id,
                payload: HubIoResult::Send,
            }),
        )
        .unwrap();
}

#[test]
fn loader_rejects_unknown_task() {
    init_logging();
    let mut loader = Loader::new(
        StdRng::seed_from_u64(1),
        "alice".parse().unwrap(),
        start(),
    );
    let LoaderState::NeedIo(tasks) = loader.step(start()) else {
        panic!("loader should need to load the storage id");
    };
    let task_id = tasks[0].task_id;
    let result = || IoResult {
        task_id,
        payload: StorageResult::Load { value: None },
    };
    loader.provide_io_result(start(), result()).unwrap();
    assert_eq!(
        loader.provide_io_result(start(), result()),
        Err(LoaderError::Io(IoTaskError::UnknownTask(task_id)))
    );
}

#[test]
fn loader_reuses_stored_storage_id() {
    init_logging();
    let mut storage = InMemoryStorage::new();
    let mut load = |seed| {
        let peer_id = "alice".parse().unwrap();
        let mut loader = Loader::new(StdRng::seed_from_u64(seed), peer_id, start());
        loop {
            match loader.step(start()) {
                LoaderState::NeedIo(tasks) => {
                    for task in tasks {
                        let payload = dispatch_storage_task(&mut storage, task.action);
                        loader
                            .provide_io_result(
                                start(),
                                IoResult {
                                    task_id: task.task_id,
                                    payload,
                                },
                            )
                            .unwrap();
                    }
                }
                LoaderState::Loaded(hub) => return hub.storage_id(),
            }
        }
    };
    let first = load(1);
    let second = load(2);
    assert_eq!(first, second);
}

#[test]
fn stop_without_actors_stops_immediately() {
    init_logging();
    let mut alice = load_hub("alice", HubConfig::default());
    let results = alice.handle_event(start(), HubEvent::stop()).unwrap();
    assert!(results.stopped);
    assert!(alice.is_stopped());

    let DispatchedCommand { event, .. } = HubEvent::create_connection(ConnDirection::Outgoing);
    let results = alice.handle_event(start(), event).unwrap();
    assert!(results.stopped);
    assert!(results.new_tasks.is_empty());
    assert!(results.completed_commands.is_empty());
}

#[test]
fn message_from_unknown_actor_is_rejected() {
    init_logging();
    let mut alice = load_hub("alice", HubConfig::default());
    let mut bob = load_hub("bob", HubConfig::default());

    let DispatchedCommand { event, .. } = HubEvent::create_document(automerge::Automerge::new());
    let results = alice.handle_event(start(), event).unwrap();
    let args = results.spawn_actors[0].clone();
    let actor_id = args.actor_id();
    let (_actor, actor_result) =
        tandem_core::actors::document::DocumentActor::new(start(), args).unwrap();
    let msg = actor_result.outgoing_messages[0].clone();

    assert_eq!(
        bob.handle_event(start(), HubEvent::actor_message(actor_id, msg))
            .unwrap_err(),
        HubError::UnknownActor(actor_id)
    );
}

/// A hub and the document actors it spawned, with every task performed
/// synchronously and everything the hub reported recorded
struct Node {
    hub: Hub,
    storage: InMemoryStorage,
    actors: HashMap<DocumentActorId, DocumentActor>,
    completed: Vec<(CommandId, CommandResult)>,
    spawned: Vec<DocumentActorId>,
    connection_events: Vec<ConnectionEvent>,
    sent: Vec<(ConnectionId, Vec<u8>)>,
}

impl Node {
    fn new(name: &str) -> Self {
        Node {
            hub: load_hub(name, HubConfig::default()),
            storage: InMemoryStorage::new(),
            actors: HashMap::new(),
            completed: Vec::new(),
            spawned: Vec::new(),
            connection_events: Vec::new(),
            sent: Vec::new(),
        }
    }

    /// Handles `events` and everything which follows from them
    fn run(&mut self, events: impl IntoIterator<Item = HubEvent>) {
        let mut queue: VecDeque<HubEvent> = events.into_iter().collect();
        while let Some(event) = queue.pop_front() {
            let results = self.hub.handle_event(start(), event).unwrap();
            self.completed.extend(results.completed_commands);
            self.connection_events.extend(results.connection_events);
            for task in results.new_tasks {
                let payload = match task.action {
                    HubIoAction::Send { connection_id, msg } => {
                        self.sent.push((connection_id, msg));
                        HubIoResult::Send
                    }
                    HubIoAction::Disconnect { .. } => HubIoResult::Disconnect,
                };
                queue.push_back(HubEvent::io_complete(IoResult {
                    task_id: task.task_id,
                    payload,
                }));
            }

            let mut pending = VecDeque::new();
            for args in results.spawn_actors {
                let actor_id = args.actor_id();
                let (actor, result) = DocumentActor::new(start(), args).unwrap();
                self.spawned.push(actor_id);
                self.actors.insert(actor_id, actor);
                pending.push_back((actor_id, result));
            }
            for (actor_id, msg) in results.actor_messages {
                let result = self.actors.get_mut(&actor_id).unwrap().handle_message(start(), msg);
                pending.push_back((actor_id, result.unwrap()));
            }
            while let Some((actor_id, result)) = pending.pop_front() {
                let actor = self.actors.get_mut(&actor_id).unwrap();
                queue.extend(
                    result
                        .outgoing_messages
                        .into_iter()
                        .map(|msg| HubEvent::actor_message(actor_id, msg)),
                );
                for task in result.io_tasks {
                    let payload = match task.action {
                        DocumentIoTask::Storage(storage_task) => DocumentIoResult::Storage(
                            dispatch_storage_task(&mut self.storage, storage_task),
                        ),
                        DocumentIoTask::CheckAnnouncePolicy { .. } => {
                            DocumentIoResult::CheckAnnouncePolicy(true)
                        }
                    };
                    let result = actor.handle_io_complete(
                        start(),
                        IoResult {
                            task_id: task.task_id,
                            payload,
                        },
                    );
                    pending.push_back((actor_id, result.unwrap()));
                }
            }
        }
    }

    fn dispatch(&mut self, command: DispatchedCommand) -> CommandId {
        self.run([command.event]);
        command.command_id
    }

    /// The result of `command_id`, which must not have completed more than once
    fn result(&self, command_id: CommandId) -> Option<CommandResult> {
        let mut results = self
            .completed
            .iter()
            .filter(|(id, _)| *id == command_id)
            .map(|(_, result)| result.clone());
        let result = results.next();
        assert!(results.next().is_none(), "{command_id} completed twice");
        result
    }

    fn create_connection(&mut self, direction: ConnDirection) -> ConnectionId {
        let command_id = self.dispatch(HubEvent::create_connection(direction));
        let Some(CommandResult::CreateConnection { connection_id }) = self.result(command_id)
        else {
            panic!("create connection should complete immediately");
        };
        connection_id
    }

    /// An incoming connection which has completed the handshake with `sender`
    fn accept(&mut self, sender: &str) -> ConnectionId {
        let conn = self.create_connection(ConnDirection::Incoming);
        self.run([HubEvent::receive(conn, join_frame(sender, "1")).event]);
        conn
    }

    fn take_sent(&mut self, connection_id: ConnectionId) -> Vec<Vec<u8>> {
        let (ours, rest): (Vec<_>, Vec<_>) = std::mem::take(&mut self.sent)
            .into_iter()
            .partition(|(conn, _)| *conn == connection_id);
        self.sent = rest;
        ours.into_iter().map(|(_, msg)| msg).collect()
    }

    fn states(&self, connection_id: ConnectionId) -> Vec<ConnectionState> {
        self.connection_events
            .iter()
            .filter_map(|event| match event {
                ConnectionEvent::StateChanged {
                    connection_id: conn,
                    new_state,
                } if *conn == connection_id => Some(new_state.state.clone()),
                _ => None,
            })
            .collect()
    }
}

/// Passes frames back and forth until neither side has anything to send
fn exchange(left: &mut Node, left_conn: ConnectionId, right: &mut Node, right_conn: ConnectionId) {
    loop {
        let to_right = left.take_sent(left_conn);
        let to_left = right.take_sent(right_conn);
        if to_right.is_empty() && to_left.is_empty() {
            return;
        }
        right.run(
            to_right
                .into_iter()
                .map(|msg| HubEvent::receive(right_conn, msg).event),
        );
        left.run(
            to_left
                .into_iter()
                .map(|msg| HubEvent::receive(left_conn, msg).event),
        );
    }
}

fn request_frame(sender: &str, target: &str, doc_id: &DocumentId) -> Vec<u8> {
    let data = automerge::Automerge::new()
        .generate_sync_message(&mut automerge::sync::State::new())
        .expect("a fresh sync state always has something to say")
        .encode();
    let mut e = minicbor::Encoder::new(Vec::new());
    e.map(5)
        .unwrap()
        .str("type")
        .unwrap()
        .str("request")
        .unwrap()
        .str("senderId")
        .unwrap()
        .str(sender)
        .unwrap()
        .str("targetId")
        .unwrap()
        .str(target)
        .unwrap()
        .str("documentId")
        .unwrap()
        .str(&doc_id.to_string())
        .unwrap()
        .str("data")
        .unwrap()
        .bytes(&data)
        .unwrap();
    e.into_writer()
}

fn frame_type(frame: &[u8]) -> String {
    let mut d = minicbor::Decoder::new(frame);
    let len = d.map().unwrap().expect("frames are definite maps");
    for _ in 0..len {
        if d.str().unwrap() == "type" {
            return d.str().unwrap().to_string();
        }
        d.skip().unwrap();
    }
    panic!("frame without a type");
}

fn assert_forward_only(states: &[ConnectionState]) {
    let connected = states
        .iter()
        .position(|s| matches!(s, ConnectionState::Connected { .. }))
        .expect("the connection should become connected");
    assert!(
        states[connected..]
            .iter()
            .all(|s| matches!(s, ConnectionState::Connected { .. })),
        "connection went back to handshaking: {states:?}"
    );
}

#[test]
fn simultaneous_requests_spawn_one_actor() {
    init_logging();
    let mut alice = Node::new("alice");
    let from_bob = alice.accept("bob");
    let from_carol = alice.accept("carol");
    alice.sent.clear();

    let doc_id = DocumentId::from([5; 16]);
    let bob_request = HubEvent::receive(from_bob, request_frame("bob", "alice", &doc_id));
    let carol_request = HubEvent::receive(from_carol, request_frame("carol", "alice", &doc_id));
    let find = HubEvent::find_document(doc_id);
    let commands = [
        bob_request.command_id,
        carol_request.command_id,
        find.command_id,
    ];
    alice.run([bob_request.event, carol_request.event, find.event]);

    assert_eq!(alice.spawned.len(), 1, "spawned {:?}", alice.spawned);
    assert_eq!(alice.actors.len(), 1);
    for command_id in commands {
        assert!(alice.result(command_id).is_some(), "{command_id} never completed");
    }
    assert_eq!(
        alice.result(find.command_id),
        Some(CommandResult::FindDocument {
            actor_id: alice.spawned[0],
            found: false,
        })
    );

    // both peers asked while we were looking, both hear we don't have it
    for conn in [from_bob, from_carol] {
        let frames = alice.take_sent(conn);
        assert!(
            frames.iter().any(|f| frame_type(f) == "doc-unavailable"),
            "no doc-unavailable on {conn}"
        );
    }
}

#[test]
fn connection_states_only_move_forward() {
    init_logging();
    let mut alice = Node::new("alice");
    let mut bob = Node::new("bob");
    let alice_conn = alice.create_connection(ConnDirection::Outgoing);
    let bob_conn = bob.create_connection(ConnDirection::Incoming);
    exchange(&mut alice, alice_conn, &mut bob, bob_conn);

    let created = alice.dispatch(HubEvent::create_document(automerge::Automerge::new()));
    let Some(CommandResult::CreateDocument { document_id, .. }) = alice.result(created) else {
        panic!("create document should complete once the actor is ready");
    };
    exchange(&mut alice, alice_conn, &mut bob, bob_conn);

    let find = bob.dispatch(HubEvent::find_document(document_id));
    exchange(&mut alice, alice_conn, &mut bob, bob_conn);
    assert!(matches!(
        bob.result(find),
        Some(CommandResult::FindDocument { found: true, .. })
    ));

    for (node, conn) in [(&alice, alice_conn), (&bob, bob_conn)] {
        let states = node.states(conn);
        assert_forward_only(&states);
        let synced = node.connection_events.iter().any(|e| matches!(
            e,
            ConnectionEvent::StateChanged { connection_id, new_state }
                if *connection_id == conn && new_state.docs.contains_key(&document_id)
        ));
        assert!(synced, "no sync progress recorded on {conn}");
    }
    // the outgoing side was observed handshaking first
    assert_eq!(alice.states(alice_conn)[0], ConnectionState::Handshaking);
}

fn peer_frame(sender: &str, target: &str) -> Vec<u8> {
    let mut e = minicbor::Encoder::new(Vec::new());
    e.map(4)
        .unwrap()
        .str("type")
        .unwrap()
        .str("peer")
        .unwrap()
        .str("senderId")
        .unwrap()
        .str(sender)
        .unwrap()
        .str("targetId")
        .unwrap()
        .str(target)
        .unwrap()
        .str("selectedProtocolVersion")
        .unwrap()
        .str("1")
        .unwrap();
    e.into_writer()
}

fn receive_error(node: &Node, command_id: CommandId) -> String {
    match node.result(command_id) {
        Some(CommandResult::Receive {
            error: Some(error), ..
        }) => error,
        other => panic!("expected a failed receive, got {other:?}"),
    }
}

#[test]
fn peer_addressed_to_someone_else_fails_connection() {
    init_logging();
    let mut alice = Node::new("alice");
    let conn = alice.create_connection(ConnDirection::Outgoing);

    let receive = alice.dispatch(HubEvent::receive(conn, peer_frame("bob", "carol")));

    assert!(receive_error(&alice, receive).contains("carol"));
    assert!(alice.connection_events.iter().any(|e| matches!(
        e,
        ConnectionEvent::ConnectionFailed { connection_id, .. } if *connection_id == conn
    )));
    assert!(alice.hub.connections().is_empty());
    assert!(!alice.hub.is_connected_to(&"bob".parse().unwrap()));
}

#[test]
fn sync_frames_must_come_from_the_connected_peer() {
    init_logging();
    let mut alice = Node::new("alice");
    let from_bob = alice.accept("bob");

    let doc_id = DocumentId::from([7; 16]);
    let receive = alice.dispatch(HubEvent::receive(
        from_bob,
        request_frame("mallory", "alice", &doc_id),
    ));

    let error = receive_error(&alice, receive);
    assert!(error.contains("mallory") && error.contains("bob"), "{error}");
    assert!(alice.spawned.is_empty(), "no actor for a rejected request");
    assert!(alice.hub.connections().is_empty());
}
