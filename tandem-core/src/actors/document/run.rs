use std::{
    collections::HashMap,
    sync::{Arc, Mutex},
};

use futures::{FutureExt, StreamExt, channel::mpsc, future::BoxFuture, stream::FuturesUnordered};

use crate::{
    ConnectionId, PeerId, StorageKey, UnixTimestamp,
    actors::{
        RunState,
        document::DocumentStatus,
        driver::ActorIo,
        messages::{DocMessage, DocToHubMsgPayload},
    },
};

use super::{
    ActorIoAccess, ActorState, DocumentActor,
    compaction::{Job, JobComplete},
    peer_doc_connection::AnnouncePolicy,
};

mod actor_input;
mod actor_output;

pub(super) use actor_input::ActorInput;
pub(super) use actor_output::ActorOutput;

type Operations = FuturesUnordered<BoxFuture<'static, ()>>;

/// The run loop of a document actor.
///
/// Each input becomes an operation in `running_operations`. After every
/// wake-up the loop checks for announce policies to look up, sync messages
/// to send, changes to save and peer states to report.
pub(super) async fn actor_run(
    now: Arc<Mutex<UnixTimestamp>>,
    mut rx_input: mpsc::UnboundedReceiver<ActorInput>,
    io: ActorIo<DocumentActor>,
    state: Arc<Mutex<ActorState>>,
    initial_connections: HashMap<ConnectionId, (PeerId, Option<DocMessage>)>,
) {
    let io = ActorIoAccess::new(io);
    let mut initial_connections = initial_connections.into_iter().collect::<Vec<_>>();
    initial_connections.sort_by_key(|(conn_id, _)| *conn_id);
    for (conn_id, (peer_id, msg)) in initial_connections {
        let mut state = state.lock().unwrap();
        state.add_connection(conn_id, peer_id);
        if let Some(msg) = msg {
            state.handle_doc_message(*now.lock().unwrap(), &io, conn_id, msg);
        }
    }

    let mut running_operations = Operations::new();

    if state.lock().unwrap().is_loading() {
        tracing::trace!("loading document");
        running_operations.push(load(io.clone(), state.clone(), now.clone()).boxed());
    } else {
        tracing::debug!("document actor is ready immediately");
        io.send_message(DocToHubMsgPayload::DocumentStatusChanged {
            new_status: DocumentStatus::Ready,
        });
    }

    loop {
        enqueue_announce_policy_checks(&io, &state, &mut running_operations);
        send_sync_messages(&io, &state, &now);
        save_new_changes(&io, &state, &mut running_operations);
        report_peer_states(&io, &state);

        futures::select! {
            input = rx_input.select_next_some() => {
                if let ActorInput::Terminate = input {
                    tracing::debug!("terminating document actor");
                    state.lock().unwrap().set_run_state(RunState::Stopping);
                    break;
                }
                running_operations.push(
                    handle_input(now.clone(), state.clone(), io.clone(), input).boxed(),
                );
            }
            () = running_operations.select_next_some() => {}
            complete => break,
        }
    }

    // Anything written locally but not yet saved still goes to storage
    save_new_changes(&io, &state, &mut running_operations);
    while running_operations.next().await.is_some() {}

    io.send_message(DocToHubMsgPayload::Terminated);
    state.lock().unwrap().set_run_state(RunState::Stopped);
    tracing::debug!("document actor stopped");
}

fn send_sync_messages(
    io: &ActorIoAccess,
    state: &Arc<Mutex<ActorState>>,
    now: &Arc<Mutex<UnixTimestamp>>,
) {
    let now = *now.lock().unwrap();
    let mut state = state.lock().unwrap();
    let document_id = state.document_id;
    for (connection_id, message) in state.generate_sync_messages(now) {
        io.send_message(DocToHubMsgPayload::SendSyncMessage {
            connection_id,
            document_id,
            message,
        });
    }
}

fn report_peer_states(io: &ActorIoAccess, state: &Arc<Mutex<ActorState>>) {
    if let Some(new_states) = state.lock().unwrap().pop_new_peer_states() {
        io.send_message(DocToHubMsgPayload::PeerStatesChanged { new_states });
    }
}

fn save_new_changes(
    io: &ActorIoAccess,
    state: &Arc<Mutex<ActorState>>,
    running_operations: &mut Operations,
) {
    let new_jobs = state.lock().unwrap().pop_new_jobs();
    for job in new_jobs {
        let io = io.clone();
        let state = state.clone();
        running_operations.push(
            async move {
                let completion = match job {
                    Job::Put { key, data } => {
                        io.put(key.clone(), data).await;
                        JobComplete::Put(key)
                    }
                    Job::Delete(key) => {
                        io.delete(key.clone()).await;
                        JobComplete::Delete(key)
                    }
                };
                state.lock().unwrap().mark_job_complete(completion);
            }
            .boxed(),
        );
    }
}

fn enqueue_announce_policy_checks(
    io: &ActorIoAccess,
    state: &Arc<Mutex<ActorState>>,
    running_operations: &mut Operations,
) {
    let checks = state.lock().unwrap().pop_announce_policy_tasks();
    for (peer_id, conn_id) in checks {
        tracing::trace!(%peer_id, %conn_id, "checking announce policy");
        let state = state.clone();
        let io = io.clone();
        running_operations.push(
            async move {
                let should_announce = io.check_announce_policy(peer_id.clone()).await;
                tracing::trace!(%peer_id, %conn_id, should_announce, "announce policy checked");
                let policy = if should_announce {
                    AnnouncePolicy::Announce
                } else {
                    AnnouncePolicy::DontAnnounce
                };
                state
                    .lock()
                    .unwrap()
                    .set_announce_policy(&io, conn_id, policy);
            }
            .boxed(),
        );
    }
}

async fn handle_input(
    now: Arc<Mutex<UnixTimestamp>>,
    state: Arc<Mutex<ActorState>>,
    io: ActorIoAccess,
    input: ActorInput,
) {
    match input {
        // Handled by the run loop
        ActorInput::Terminate | ActorInput::Tick => {}
        ActorInput::HandleDocMessage {
            connection_id,
            message,
        } => {
            let now = *now.lock().unwrap();
            state
                .lock()
                .unwrap()
                .handle_doc_message(now, &io, connection_id, message);
        }
        ActorInput::NewConnection {
            connection_id,
            peer_id,
        } => {
            state.lock().unwrap().add_connection(connection_id, peer_id);
        }
        ActorInput::ConnectionClosed { connection_id } => {
            state.lock().unwrap().remove_connection(&io, connection_id);
        }
        ActorInput::Request => load(io, state, now).await,
    }
}

async fn load(io: ActorIoAccess, state: Arc<Mutex<ActorState>>, now: Arc<Mutex<UnixTimestamp>>) {
    let document_id = {
        let mut state = state.lock().unwrap();
        state.ensure_request(&io);
        if !state.is_loading() {
            tracing::trace!("document already available, not reloading");
            return;
        }
        state.document_id
    };
    tracing::debug!("loading document from storage");

    let snapshots = io.load_range(StorageKey::snapshot_prefix(&document_id)).await;
    let incrementals = io
        .load_range(StorageKey::incremental_prefix(&document_id))
        .await;

    let now = *now.lock().unwrap();
    state
        .lock()
        .unwrap()
        .handle_load(now, &io, snapshots, incrementals);
}
