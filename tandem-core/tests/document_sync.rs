use automerge::{AutomergeError, ROOT, ReadDoc, transaction::Transactable};
use tandem_core::{DocumentActorId, StorageKey, network::ConnectionEvent};
use tandem_test_harness::{Connected, Network, NodeId, RunningDocIds};

fn init_logging() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .try_init();
}

fn put_key(network: &mut Network, peer: &NodeId, actor_id: DocumentActorId, key: &str) {
    network
        .peer(peer)
        .with_document_by_actor(actor_id, |doc| {
            doc.transact(|tx| {
                tx.put(ROOT, key, "value")?;
                Ok::<_, AutomergeError>(())
            })
            .unwrap();
        })
        .unwrap();
}

#[test]
fn document_created_on_one_peer_is_found_by_connected_peer() {
    init_logging();
    let mut network = Network::new();
    let alice = network.create_peer("alice");
    let bob = network.create_peer("bob");
    network.connect(alice, bob);
    network.run_until_quiescent();

    let RunningDocIds { doc_id, .. } = network.peer(&alice).create_document();

    let bob_actor = network
        .peer(&bob)
        .find_document(&doc_id)
        .expect("bob should find the document");
    assert!(network.peer(&bob).is_document_ready(&bob_actor));

    let alice_heads = network.peer(&alice).document(&doc_id).unwrap().get_heads();
    let bob_heads = network.peer(&bob).document(&doc_id).unwrap().get_heads();
    assert!(!alice_heads.is_empty());
    assert_eq!(alice_heads, bob_heads);
}

#[test]
fn document_created_before_connecting_is_found() {
    init_logging();
    let mut network = Network::new();
    let alice = network.create_peer("alice");
    let bob = network.create_peer("bob");

    let RunningDocIds { doc_id, actor_id } = network.peer(&alice).create_document();
    put_key(&mut network, &alice, actor_id, "before");

    network.connect(alice, bob);
    network.run_until_quiescent();

    let bob_actor = network.peer(&bob).find_document(&doc_id).unwrap();
    let value = network
        .peer(&bob)
        .with_document_by_actor(bob_actor, |doc| doc.get(ROOT, "before").unwrap().is_some())
        .unwrap();
    assert!(value);
}

#[test]
fn local_changes_sync_to_peers() {
    init_logging();
    let mut network = Network::new();
    let alice = network.create_peer("alice");
    let bob = network.create_peer("bob");
    network.connect(alice, bob);
    network.run_until_quiescent();

    let RunningDocIds { doc_id, actor_id } = network.peer(&alice).create_document();
    let bob_actor = network.peer(&bob).find_document(&doc_id).unwrap();

    put_key(&mut network, &alice, actor_id, "from-alice");
    put_key(&mut network, &bob, bob_actor, "from-bob");

    for peer in [&alice, &bob] {
        let keys = network
            .peer(peer)
            .document(&doc_id)
            .unwrap()
            .keys(ROOT)
            .collect::<Vec<_>>();
        assert_eq!(keys, vec!["from-alice".to_string(), "from-bob".to_string()]);
    }

    // bob saw his own edit and alice's
    let bob_changes = network.peer(&bob).change_events(&bob_actor);
    assert!(bob_changes.len() >= 2);
    let alice_heads = network.peer(&alice).document(&doc_id).unwrap().get_heads();
    assert_eq!(bob_changes.last().unwrap().new_heads, alice_heads);
}

#[test]
fn find_without_peers_reports_not_found() {
    init_logging();
    let mut network = Network::new();
    let alice = network.create_peer("alice");
    let carol = network.create_peer("carol");
    // carol is never connected, so nobody else has her document
    let RunningDocIds { doc_id, .. } = network.peer(&carol).create_document();

    assert_eq!(network.peer(&alice).find_document(&doc_id), None);
    // nothing is written for a document which was never found
    assert!(
        network
            .peer(&alice)
            .storage()
            .keys()
            .all(|k| *k == StorageKey::storage_id_path())
    );
}

#[test]
fn find_reports_not_found_when_peers_lack_document() {
    init_logging();
    let mut network = Network::new();
    let alice = network.create_peer("alice");
    let bob = network.create_peer("bob");
    let carol = network.create_peer("carol");
    network.connect(alice, bob);
    network.run_until_quiescent();

    let RunningDocIds { doc_id, .. } = network.peer(&carol).create_document();
    assert_eq!(network.peer(&bob).find_document(&doc_id), None);
}

#[test]
fn not_found_document_is_found_once_a_peer_has_it() {
    init_logging();
    let mut network = Network::new();
    let alice = network.create_peer("alice");
    let bob = network.create_peer("bob");

    let RunningDocIds { doc_id, .. } = network.peer(&alice).create_document();
    assert_eq!(network.peer(&bob).find_document(&doc_id), None);

    network.connect(alice, bob);
    network.run_until_quiescent();

    assert!(network.peer(&bob).find_document(&doc_id).is_some());
}

#[test]
fn documents_are_reloaded_from_storage() {
    init_logging();
    let mut network = Network::new();
    let alice = network.create_peer("alice");
    let RunningDocIds { doc_id, actor_id } = network.peer(&alice).create_document();
    put_key(&mut network, &alice, actor_id, "persisted");
    let heads = network.peer(&alice).document(&doc_id).unwrap().get_heads();

    let storage = network.peer(&alice).storage().clone();
    let alice_storage_id = network.peer(&alice).storage_id();
    let reloaded = network.create_peer_with_storage("alice-reloaded", storage);
    assert_eq!(network.peer(&reloaded).storage_id(), alice_storage_id);

    let actor = network
        .peer(&reloaded)
        .find_document(&doc_id)
        .expect("document should load from storage");
    let reloaded_heads = network
        .peer(&reloaded)
        .with_document_by_actor(actor, |doc| doc.get_heads())
        .unwrap();
    assert_eq!(heads, reloaded_heads);
}

#[test]
fn peers_which_do_not_announce_still_answer_requests() {
    init_logging();
    let mut network = Network::new();
    let alice = network.create_peer("alice");
    let bob = network.create_peer("bob");
    network.peer(&alice).set_announce_policy(|_, _| false);
    network.connect(alice, bob);
    network.run_until_quiescent();

    let RunningDocIds { doc_id, .. } = network.peer(&alice).create_document();
    // alice kept quiet about the new document
    assert_eq!(network.peer(&bob).running_actors(), 0);

    assert!(network.peer(&bob).find_document(&doc_id).is_some());
}

#[test]
fn local_disconnect_is_reported_on_both_sides() {
    init_logging();
    let mut network = Network::new();
    let alice = network.create_peer("alice");
    let bob = network.create_peer("bob");
    let Connected {
        left: bob_on_alice,
        right: alice_on_bob,
    } = network.connect(alice, bob);
    network.run_until_quiescent();

    let RunningDocIds { doc_id, actor_id } = network.peer(&alice).create_document();
    network.peer(&bob).find_document(&doc_id).unwrap();
    assert_eq!(network.peer(&alice).actor_peers(&actor_id).len(), 1);

    network.peer(&alice).disconnect(bob_on_alice);

    assert!(network.peer(&alice).connection_events().iter().any(|e| matches!(
        e,
        ConnectionEvent::ConnectionFailed { connection_id, error }
            if *connection_id == bob_on_alice && error == "disconnected by local request"
    )));
    assert!(network.peer(&bob).connection_events().iter().any(|e| matches!(
        e,
        ConnectionEvent::ConnectionFailed { connection_id, error }
            if *connection_id == alice_on_bob && error == "connection lost externally"
    )));
    assert!(network.peer(&alice).actor_peers(&actor_id).is_empty());
    assert!(network.peer(&alice).established_peers().is_empty());
    assert!(network.peer(&bob).connections().is_empty());
}

#[test]
fn network_failure_is_reported_on_both_sides() {
    init_logging();
    let mut network = Network::new();
    let alice = network.create_peer("alice");
    let bob = network.create_peer("bob");
    network.connect(alice, bob);
    network.run_until_quiescent();
    let bob_id = network.peer(&bob).peer_id();
    assert!(network.peer(&alice).is_connected_to(&bob_id));

    network.disconnect(alice, bob);

    assert!(!network.peer(&alice).is_connected_to(&bob_id));
    for peer in [&alice, &bob] {
        assert!(network.peer(peer).connection_events().iter().any(|e| matches!(
            e,
            ConnectionEvent::ConnectionFailed { error, .. } if error == "connection lost externally"
        )));
    }
}
