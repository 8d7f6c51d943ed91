use tandem_test_harness::{Connected, Network, RunningDocIds};

#[test]
fn peer_doc_state_changes_emitted_on_sync() {
    let mut network = Network::new();

    let alice = network.create_peer("alice");
    let bob = network.create_peer("bob");

    let Connected {
        left: bob_on_alice, ..
    } = network.connect(alice, bob);

    let RunningDocIds {
        doc_id,
        actor_id: _alice_actor,
    } = network.peer(&alice).create_document();
    network.run_until_quiescent();

    let mut changes_on_alice = network.peer(&alice).peer_state_changes(&doc_id).to_vec();

    // at least one change where nothing has been sent yet and one where
    // bob has acknowledged our heads
    assert!(changes_on_alice.len() >= 2);

    let first_changes = changes_on_alice[0].clone();
    let bob_changes = first_changes
        .get(&bob_on_alice)
        .expect("there should be a first change for Bob");
    assert!(bob_changes.last_acked_heads.is_none());
    assert!(bob_changes.last_sent.is_none());

    let last_changes = changes_on_alice.pop().unwrap();
    let last_bob_changes = last_changes
        .get(&bob_on_alice)
        .expect("there should be a last change for Bob");
    assert!(last_bob_changes.last_sent.is_some());
    assert_eq!(
        network.peer(&alice).peer_states(&doc_id).get(&bob_on_alice),
        Some(last_bob_changes)
    );
    assert!(last_bob_changes.last_received.is_some());
    let alice_local_heads = network.peer(&alice).document(&doc_id).unwrap().get_heads();
    assert_eq!(last_bob_changes.last_acked_heads, Some(alice_local_heads));
}
