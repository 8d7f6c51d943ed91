use automerge::{AutomergeError, ROOT, transaction::Transactable};
use tandem_core::actors::document::DocumentError;
use tandem_test_harness::{Network, RunningDocIds};

fn init_logging() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .try_init();
}

#[test]
fn stop_terminates_every_actor() {
    init_logging();
    let mut network = Network::new();
    let alice = network.create_peer("alice");
    let bob = network.create_peer("bob");
    network.connect(alice, bob);
    network.run_until_quiescent();

    let RunningDocIds { actor_id, .. } = network.peer(&alice).create_document();
    network.peer(&alice).create_document();
    assert_eq!(network.peer(&alice).running_actors(), 2);

    network.peer(&alice).stop();

    assert!(network.peer(&alice).is_stopped());
    assert_eq!(network.peer(&alice).running_actors(), 0);
    assert_eq!(
        network
            .peer(&alice)
            .with_document_by_actor(actor_id, |_| ())
            .unwrap_err(),
        DocumentError::ActorStopped
    );
    // bob is unaffected
    assert!(!network.peer(&bob).is_stopped());
}

#[test]
fn changes_made_before_stopping_are_saved() {
    init_logging();
    let mut network = Network::new();
    let alice = network.create_peer("alice");
    let RunningDocIds { actor_id, doc_id } = network.peer(&alice).create_document();
    network
        .peer(&alice)
        .with_document_by_actor(actor_id, |doc| {
            doc.transact(|tx| {
                tx.put(ROOT, "key", "value")?;
                Ok::<_, AutomergeError>(())
            })
            .unwrap();
            doc.get_heads()
        })
        .unwrap();
    network.peer(&alice).stop();

    let storage = network.peer(&alice).storage().clone();
    let reloaded = network.create_peer_with_storage("alice-reloaded", storage);
    assert!(network.peer(&reloaded).find_document(&doc_id).is_some());
}
