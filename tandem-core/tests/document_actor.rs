//! Drives a document actor directly, playing the part of both host and hub
use std::collections::HashMap;

use rand::{SeedableRng, rngs::StdRng};
use tandem_core::{
    DocumentId, Loader, LoaderState, StorageKey, UnixTimestamp,
    actors::{
        DocToHubMsg,
        document::{
            DocActorResult, DocumentActor, DocumentError, SpawnArgs,
            io::{DocumentIoResult, DocumentIoTask},
        },
        hub::{DispatchedCommand, Hub, HubEvent},
    },
    io::{IoResult, IoTaskError, StorageResult, StorageTask},
};
use tandem_test_harness::{InMemoryStorage, dispatch_storage_task};

fn start() -> UnixTimestamp {
    UnixTimestamp::from_millis(1_000)
}

fn load_hub(name: &str) -> Hub {
    let mut storage = InMemoryStorage::new();
    let mut loader = Loader::new(StdRng::seed_from_u64(3), name.parse().unwrap(), start());
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

fn find_args(hub: &mut Hub, doc_id: DocumentId) -> SpawnArgs {
    let DispatchedCommand { event, .. } = HubEvent::find_document(doc_id);
    let mut results = hub.handle_event(start(), event).unwrap();
    results.spawn_actors.remove(0)
}

fn create_args(hub: &mut Hub) -> SpawnArgs {
    let DispatchedCommand { event, .. } = HubEvent::create_document(automerge::Automerge::new());
    let mut results = hub.handle_event(start(), event).unwrap();
    results.spawn_actors.remove(0)
}

/// Runs every storage task in `result` and any that follow, returning the
/// messages for the hub and whether the actor stopped
fn drain(
    actor: &mut DocumentActor,
    storage: &mut InMemoryStorage,
    result: DocActorResult,
) -> (Vec<DocToHubMsg>, bool) {
    let mut messages = Vec::new();
    let mut stopped = false;
    let mut pending = vec![result];
    while let Some(result) = pending.pop() {
        messages.extend(result.outgoing_messages);
        stopped |= result.stopped;
        for task in result.io_tasks {
            let DocumentIoTask::Storage(storage_task) = task.action else {
                panic!("no peers, so no announce policy checks");
            };
            let payload = DocumentIoResult::Storage(dispatch_storage_task(storage, storage_task));
            pending.push(
                actor
                    .handle_io_complete(
                        start(),
                        IoResult {
                            task_id: task.task_id,
                            payload,
                        },
                    )
                    .unwrap(),
            );
        }
    }
    (messages, stopped)
}

fn empty_range() -> DocumentIoResult {
    DocumentIoResult::Storage(StorageResult::LoadRange {
        values: HashMap::new(),
    })
}

#[test]
fn document_is_not_ready_while_loading() {
    let mut hub = load_hub("alice");
    let doc_id = DocumentId::from([7; 16]);
    let (mut actor, mut result) = DocumentActor::new(start(), find_args(&mut hub, doc_id)).unwrap();

    assert!(!actor.is_document_ready());
    assert!(matches!(
        actor.with_document(start(), |_| ()),
        Err(DocumentError::DocumentNotReady)
    ));

    // snapshots, then incremental changes
    for prefix in [
        StorageKey::snapshot_prefix(&doc_id),
        StorageKey::incremental_prefix(&doc_id),
    ] {
        assert_eq!(result.io_tasks.len(), 1);
        let task = result.io_tasks.remove(0);
        assert_eq!(
            task.action,
            DocumentIoTask::Storage(StorageTask::LoadRange { prefix })
        );
        result = actor
            .handle_io_complete(
                start(),
                IoResult {
                    task_id: task.task_id,
                    payload: empty_range(),
                },
            )
            .unwrap();
    }

    // nothing in storage and nobody to ask
    assert!(!actor.is_document_ready());
    assert!(result.io_tasks.is_empty());
    assert!(!result.outgoing_messages.is_empty());
}

#[test]
fn unknown_and_mismatched_results_are_rejected() {
    let mut hub = load_hub("alice");
    let (mut actor, mut result) =
        DocumentActor::new(start(), find_args(&mut hub, DocumentId::from([7; 16]))).unwrap();
    let task = result.io_tasks.remove(0);

    let err = actor
        .handle_io_complete(
            start(),
            IoResult {
                task_id: task.task_id,
                payload: DocumentIoResult::CheckAnnouncePolicy(true),
            },
        )
        .unwrap_err();
    assert!(matches!(
        err,
        DocumentError::Io(IoTaskError::MismatchedResult { .. })
    ));

    // the mismatch left the task outstanding
    let complete = || IoResult {
        task_id: task.task_id,
        payload: empty_range(),
    };
    actor.handle_io_complete(start(), complete()).unwrap();
    assert_eq!(
        actor.handle_io_complete(start(), complete()).unwrap_err(),
        DocumentError::Io(IoTaskError::UnknownTask(task.task_id))
    );
}

#[test]
fn created_document_is_ready_and_saves_itself() {
    let mut hub = load_hub("alice");
    let args = create_args(&mut hub);
    let doc_id = *args.document_id();
    let (mut actor, result) = DocumentActor::new(start(), args).unwrap();
    assert!(actor.is_document_ready());

    let mut storage = InMemoryStorage::new();
    drain(&mut actor, &mut storage, result);
    let prefix = StorageKey::document_prefix(&doc_id);
    assert!(storage.keys().any(|k| prefix.is_prefix_of(k)));

    let heads = actor
        .with_document(start(), |doc| doc.get_heads())
        .unwrap()
        .value;
    assert_eq!(heads.len(), 1);
}

#[test]
fn invalid_initial_content_is_rejected() {
    let mut e = minicbor::Encoder::new(Vec::new());
    e.array(5)
        .unwrap()
        .u32(1)
        .unwrap()
        .str("alice")
        .unwrap()
        .bytes(&[7; 16])
        .unwrap()
        .bytes(b"not an automerge document")
        .unwrap()
        .map(0)
        .unwrap();
    let args = SpawnArgs::try_from(e.into_writer().as_slice()).unwrap();

    assert!(matches!(
        DocumentActor::new(start(), args),
        Err(DocumentError::InvalidInitialContent(_))
    ));
}

#[test]
fn terminate_stops_the_actor() {
    let mut hub = load_hub("alice");
    let args = create_args(&mut hub);
    let actor_id = args.actor_id();
    let mut storage = InMemoryStorage::new();
    let (mut actor, result) = DocumentActor::new(start(), args).unwrap();
    drain(&mut actor, &mut storage, result);

    let results = hub.handle_event(start(), HubEvent::stop()).unwrap();
    assert!(!results.stopped, "the hub waits for its actors");
    let (target, terminate) = results.actor_messages[0].clone();
    assert_eq!(target, actor_id);

    let result = actor.handle_message(start(), terminate.clone()).unwrap();
    let (messages, stopped) = drain(&mut actor, &mut storage, result);
    assert!(stopped);
    assert!(actor.is_stopped());
    assert!(matches!(
        actor.handle_message(start(), terminate),
        Err(DocumentError::ActorStopped)
    ));

    let mut hub_stopped = false;
    for msg in messages {
        hub_stopped |= hub
            .handle_event(start(), HubEvent::actor_message(actor_id, msg))
            .unwrap()
            .stopped;
    }
    assert!(hub_stopped);
    assert!(hub.is_stopped());
}
