use std::sync::{Arc, Mutex};

use futures::{FutureExt, StreamExt, channel::mpsc, future::BoxFuture, stream::FuturesUnordered};

use crate::{
    ConnectionId, DocumentActorId, UnixTimestamp,
    actors::{
        RunState,
        driver::ActorIo,
        hub::{command_handlers, task_context::TaskContext},
        messages::{DocToHubMsgPayload, HubToDocMsgPayload},
    },
    network::ConnectionEvent,
};

use super::{Hub, State};

mod hub_input;
pub(crate) use hub_input::HubInput;
mod hub_output;
pub(crate) use hub_output::HubOutput;

pub(crate) async fn run<R: rand::Rng + Send + 'static>(
    rng: R,
    now: Arc<Mutex<UnixTimestamp>>,
    state: Arc<Mutex<State>>,
    mut rx_input: mpsc::UnboundedReceiver<HubInput>,
    io: ActorIo<Hub>,
) {
    // Commands which are currently executing
    let mut running_commands = FuturesUnordered::new();
    // Disconnects the hub started itself, these complete no command
    let mut background: FuturesUnordered<BoxFuture<'static, ()>> = FuturesUnordered::new();

    let ctx = TaskContext::new(rng, now, io.clone(), state);

    loop {
        futures::select! {
            input = rx_input.select_next_some() => {
                match input {
                    HubInput::Stop => {
                        tracing::info!("stopping hub event loop");
                        break;
                    }
                    HubInput::Command { command_id, command } => {
                        let ctx = ctx.clone();
                        running_commands.push(async move {
                            let result =
                                command_handlers::handle_command(ctx, command_id, *command).await;
                            (command_id, result)
                        });
                    }
                    HubInput::Tick => {
                        for connection_id in ctx.state().stale_handshakes() {
                            tracing::debug!(%connection_id, "handshake timed out");
                            let ctx = ctx.clone();
                            background.push(async move {
                                ctx.fail_connection_with_disconnect(
                                    connection_id,
                                    "handshake timed out".to_string(),
                                ).await;
                            }.boxed());
                        }
                    }
                    HubInput::ActorMessage { actor_id, message } => {
                        handle_actor_message(&ctx, actor_id, message);
                    }
                    HubInput::ConnectionLost { connection_id } => {
                        handle_connection_lost(&ctx, connection_id);
                    }
                }
            }
            (command_id, result) = running_commands.select_next_some() => {
                io.emit_event(HubOutput::Completed(command_id, result));
            }
            () = background.select_next_some() => {}
            complete => break,
        }

        // Every established connection tracks every document
        for (actor_id, connection_id, peer_id) in ctx.state().ensure_connections() {
            ctx.send_to_actor(
                actor_id,
                HubToDocMsgPayload::NewConnection {
                    connection_id,
                    peer_id,
                },
            );
        }

        for (connection_id, new_state) in ctx.state().pop_new_connection_info() {
            ctx.emit_connection_event(ConnectionEvent::StateChanged {
                connection_id,
                new_state,
            });
        }
    }

    ctx.state().set_run_state(RunState::Stopping);
    tracing::info!("stopping hub, terminating all document actors");

    for doc in ctx.state().document_actors() {
        ctx.send_to_actor(doc.actor_id, HubToDocMsgPayload::Terminate);
    }

    // Keep in-flight work moving until every actor has confirmed it stopped
    while !ctx.state().document_actors().is_empty() {
        futures::select! {
            input = rx_input.select_next_some() => {
                match input {
                    HubInput::Command { command_id, .. } => {
                        tracing::warn!(%command_id, "ignoring command received while stopping");
                    }
                    HubInput::ActorMessage {
                        actor_id,
                        message: DocToHubMsgPayload::Terminated,
                    } => {
                        tracing::debug!(%actor_id, "document actor terminated");
                        ctx.state().remove_document_actor(actor_id);
                    }
                    HubInput::ConnectionLost { connection_id } => {
                        handle_connection_lost(&ctx, connection_id);
                    }
                    HubInput::ActorMessage { .. } | HubInput::Tick | HubInput::Stop => {}
                }
            }
            (command_id, result) = running_commands.select_next_some() => {
                io.emit_event(HubOutput::Completed(command_id, result));
            }
            () = background.select_next_some() => {}
            complete => break,
        }
    }
}

fn handle_actor_message<R: rand::Rng>(
    ctx: &TaskContext<R>,
    actor_id: DocumentActorId,
    message: DocToHubMsgPayload,
) {
    match message {
        DocToHubMsgPayload::DocumentStatusChanged { new_status } => {
            tracing::trace!(%actor_id, ?new_status, "document status changed");
            ctx.state().update_document_status(actor_id, new_status);
        }
        DocToHubMsgPayload::SendSyncMessage {
            connection_id,
            document_id,
            message,
        } => ctx.send_sync_message(connection_id, document_id, message),
        DocToHubMsgPayload::PeerStatesChanged { new_states } => {
            ctx.state().update_peer_states(actor_id, new_states);
        }
        DocToHubMsgPayload::Broadcast { connections, msg } => {
            ctx.broadcast(actor_id, connections, msg);
        }
        DocToHubMsgPayload::Terminated => {
            // Actors only stop when told to, which happens after the loop exits
            tracing::warn!(%actor_id, "document actor terminated while hub is running");
            ctx.state().remove_document_actor(actor_id);
        }
    }
}

fn handle_connection_lost<R: rand::Rng>(ctx: &TaskContext<R>, connection_id: ConnectionId) {
    if ctx.state().remove_connection(&connection_id).is_some() {
        tracing::debug!(%connection_id, "connection lost");
        ctx.emit_disconnect_event(connection_id, "connection lost externally".to_string());
        ctx.notify_doc_actors_of_removed_connection(connection_id);
    }
}
