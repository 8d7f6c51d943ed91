use tandem_test_harness::{Network, RunningDocIds};

fn init_logging() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .try_init();
}

#[test]
fn broadcast_reaches_connected_peer() {
    init_logging();
    let mut network = Network::new();
    let alice = network.create_peer("alice");
    let bob = network.create_peer("bob");
    network.connect(alice, bob);
    network.run_until_quiescent();

    let RunningDocIds { doc_id, actor_id } = network.peer(&alice).create_document();
    let bob_actor = network.peer(&bob).find_document(&doc_id).unwrap();

    network.peer(&alice).broadcast(actor_id, b"cursor moved".to_vec());

    assert_eq!(
        network.peer(&bob).ephemeral_messages(&bob_actor),
        vec![b"cursor moved".to_vec()]
    );
    assert!(network.peer(&alice).ephemeral_messages(&actor_id).is_empty());
}

#[test]
fn broadcast_is_gossiped_along_a_chain() {
    init_logging();
    let mut network = Network::new();
    let alice = network.create_peer("alice");
    let bob = network.create_peer("bob");
    let carol = network.create_peer("carol");
    network.connect(alice, bob);
    network.connect(bob, carol);
    network.run_until_quiescent();

    let RunningDocIds { doc_id, actor_id } = network.peer(&alice).create_document();
    let bob_actor = network.peer(&bob).find_document(&doc_id).unwrap();
    let carol_actor = network.peer(&carol).find_document(&doc_id).unwrap();

    network.peer(&alice).broadcast(actor_id, b"hello".to_vec());

    assert_eq!(
        network.peer(&bob).ephemeral_messages(&bob_actor),
        vec![b"hello".to_vec()]
    );
    assert_eq!(
        network.peer(&carol).ephemeral_messages(&carol_actor),
        vec![b"hello".to_vec()]
    );
}

#[test]
fn broadcast_is_delivered_once_around_a_cycle() {
    init_logging();
    let mut network = Network::new();
    let alice = network.create_peer("alice");
    let bob = network.create_peer("bob");
    let carol = network.create_peer("carol");
    network.connect(alice, bob);
    network.connect(bob, carol);
    network.connect(carol, alice);
    network.run_until_quiescent();

    let RunningDocIds { doc_id, actor_id } = network.peer(&alice).create_document();
    let bob_actor = network.peer(&bob).find_document(&doc_id).unwrap();
    let carol_actor = network.peer(&carol).find_document(&doc_id).unwrap();

    network.peer(&alice).broadcast(actor_id, b"first".to_vec());
    network.peer(&alice).broadcast(actor_id, b"second".to_vec());

    let expected = vec![b"first".to_vec(), b"second".to_vec()];
    assert_eq!(network.peer(&bob).ephemeral_messages(&bob_actor), expected);
    assert_eq!(network.peer(&carol).ephemeral_messages(&carol_actor), expected);
    assert!(network.peer(&alice).ephemeral_messages(&actor_id).is_empty());
}
