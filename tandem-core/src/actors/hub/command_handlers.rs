use std::collections::HashMap;

use futures::channel::oneshot;

use crate::{
    ConnectionId, DocumentActorId, DocumentId, PeerId,
    actors::{
        document::DocumentStatus,
        hub::connection::{Connection, ConnectionArgs, ReceiveEvent},
        messages::{DocMessage, HubToDocMsgPayload},
    },
    ephemera::EphemeralMessage,
    network::{ConnDirection, ConnectionEvent, wire_protocol::WireMessage},
};
use automerge::Automerge;

use super::{Command, CommandId, CommandResult, task_context::TaskContext};

pub(crate) async fn handle_command<R: rand::Rng + Send + 'static>(
    ctx: TaskContext<R>,
    command_id: CommandId,
    command: Command,
) -> CommandResult {
    match command {
        Command::CreateConnection { direction } => handle_create_connection(ctx, direction),
        Command::DisconnectConnection { connection_id } => {
            handle_disconnect(ctx, connection_id).await
        }
        Command::Receive { connection_id, msg } => handle_receive(ctx, connection_id, msg).await,
        Command::ActorReady { document_id } => {
            if ctx.state().find_actor_for_document(&document_id).is_none() {
                tracing::warn!(%document_id, "actor ready for a document with no actor");
            }
            CommandResult::ActorReady
        }
        Command::CreateDocument { content } => {
            handle_create_document(ctx, command_id, *content).await
        }
        Command::FindDocument { document_id } => {
            handle_find_document(ctx, command_id, document_id).await
        }
    }
}

fn handle_create_connection<R: rand::Rng>(
    ctx: TaskContext<R>,
    direction: ConnDirection,
) -> CommandResult {
    let connection = Connection::new_handshaking(
        &ctx.io(),
        ConnectionArgs {
            direction,
            local_peer_id: ctx.state().peer_id(),
            local_metadata: ctx.state().local_metadata(),
            created_at: ctx.now(),
        },
    );
    let connection_id = connection.id();
    tracing::debug!(%connection_id, ?direction, "creating new connection");
    ctx.state().add_connection(connection);
    CommandResult::CreateConnection { connection_id }
}

async fn handle_disconnect<R: rand::Rng>(
    ctx: TaskContext<R>,
    connection_id: ConnectionId,
) -> CommandResult {
    if ctx.state().get_connection(&connection_id).is_some() {
        let reason = "disconnected by local request".to_string();
        ctx.fail_connection_with_disconnect(connection_id, reason).await;
    } else {
        tracing::debug!(%connection_id, "disconnect for unknown connection");
    }
    CommandResult::DisconnectConnection
}

async fn handle_receive<R: rand::Rng + Send + 'static>(
    ctx: TaskContext<R>,
    connection_id: ConnectionId,
    msg: Vec<u8>,
) -> CommandResult {
    tracing::trace!(%connection_id, msg_bytes = msg.len(), "receive");
    let Some(conn) = ctx.state().get_connection(&connection_id) else {
        tracing::warn!(%connection_id, "receive for unknown connection");
        return CommandResult::Receive {
            connection_id,
            error: Some("connection not found".to_string()),
        };
    };

    let msg = match WireMessage::decode(&msg) {
        Ok(msg) => msg,
        Err(e) => {
            tracing::warn!(%connection_id, err = %e, "failed to decode message");
            let error = format!("message decode error: {e}");
            ctx.fail_connection_with_disconnect(connection_id, error.clone())
                .await;
            return CommandResult::Receive {
                connection_id,
                error: Some(error),
            };
        }
    };

    let events = match conn.receive(msg) {
        Some(Ok(events)) => events,
        Some(Err(e)) => {
            tracing::debug!(%connection_id, err = %e, "protocol error");
            let error = e.to_string();
            ctx.fail_connection_with_disconnect(connection_id, error.clone())
                .await;
            return CommandResult::Receive {
                connection_id,
                error: Some(error),
            };
        }
        None => {
            return CommandResult::Receive {
                connection_id,
                error: Some("connection not found".to_string()),
            };
        }
    };

    for evt in events {
        match evt {
            ReceiveEvent::HandshakeComplete { peer_info } => {
                tracing::debug!(
                    %connection_id,
                    remote_peer_id = %peer_info.peer_id,
                    "handshake completed"
                );
                ctx.emit_connection_event(ConnectionEvent::HandshakeCompleted {
                    connection_id,
                    peer_info,
                });
            }
            ReceiveEvent::SyncMessage {
                doc_id,
                sender_id: _,
                target_id,
                msg,
            } => route_doc_message(&ctx, connection_id, target_id, doc_id, DocMessage::Sync(msg)),
            ReceiveEvent::EphemeralMessage {
                doc_id,
                sender_id,
                target_id,
                count,
                session_id,
                msg,
            } => {
                if sender_id == ctx.state().peer_id() {
                    tracing::trace!(%connection_id, "dropping our own ephemeral message");
                    continue;
                }
                if !ctx
                    .state()
                    .receive_ephemeral_msg(&sender_id, &session_id, count)
                {
                    tracing::trace!(
                        %connection_id,
                        %sender_id,
                        count,
                        "dropping duplicate ephemeral message"
                    );
                    continue;
                }
                let msg = EphemeralMessage {
                    sender_id,
                    session_id,
                    count,
                    data: msg,
                };
                route_doc_message(
                    &ctx,
                    connection_id,
                    target_id,
                    doc_id,
                    DocMessage::Ephemeral(msg),
                );
            }
        }
    }
    CommandResult::Receive {
        connection_id,
        error: None,
    }
}

/// Hand a message to the actor for its document, spawning one if needed
fn route_doc_message<R: rand::Rng>(
    ctx: &TaskContext<R>,
    connection_id: ConnectionId,
    target_id: PeerId,
    doc_id: DocumentId,
    msg: DocMessage,
) {
    if target_id != ctx.state().peer_id() {
        tracing::trace!(%connection_id, %target_id, "ignoring message for another peer");
        return;
    }

    if let Some(existing_actor) = ctx.state().find_actor_for_document(&doc_id) {
        ctx.send_to_actor(
            existing_actor.actor_id,
            HubToDocMsgPayload::HandleDocMessage {
                connection_id,
                message: msg,
            },
        );
    } else {
        spawn_actor(ctx, doc_id, None, Some((connection_id, msg)));
    }
}

#[tracing::instrument(skip(ctx, init_doc), fields(command_id = %command_id))]
async fn handle_create_document<R: rand::Rng>(
    ctx: TaskContext<R>,
    command_id: CommandId,
    init_doc: Automerge,
) -> CommandResult {
    let document_id = ctx.with_rng(|rng| DocumentId::new(rng));
    tracing::debug!(%document_id, "creating new document");

    let actor_id = spawn_actor(&ctx, document_id.clone(), Some(init_doc.save()), None);

    let (tx, rx) = oneshot::channel();
    ctx.state()
        .add_pending_create_command(actor_id, command_id, tx);

    rx.await.unwrap_or(CommandResult::CreateDocument {
        actor_id,
        document_id,
    })
}

#[tracing::instrument(skip(ctx), fields(document_id = %document_id))]
async fn handle_find_document<R: rand::Rng>(
    ctx: TaskContext<R>,
    command_id: CommandId,
    document_id: DocumentId,
) -> CommandResult {
    let actor_id = match ctx.state().find_actor_for_document(&document_id) {
        Some(actor_info) => {
            tracing::trace!(
                actor_id = %actor_info.actor_id,
                status = ?actor_info.status,
                "found existing actor"
            );
            match actor_info.status {
                DocumentStatus::Ready => {
                    return CommandResult::FindDocument {
                        actor_id: actor_info.actor_id,
                        found: true,
                    };
                }
                DocumentStatus::NotFound => {
                    // Peers may have connected since, so start requesting again
                    ctx.send_to_actor(actor_info.actor_id, HubToDocMsgPayload::RequestAgain);
                }
                DocumentStatus::Spawned | DocumentStatus::Loading | DocumentStatus::Requesting => {}
            }
            actor_info.actor_id
        }
        None => {
            tracing::trace!("no existing actor for document, spawning one");
            spawn_actor(&ctx, document_id.clone(), None, None)
        }
    };

    let (tx, rx) = oneshot::channel();
    ctx.state()
        .add_pending_find_command(document_id, command_id, tx);
    rx.await.unwrap_or(CommandResult::FindDocument {
        actor_id,
        found: false,
    })
}

fn spawn_actor<R: rand::Rng>(
    ctx: &TaskContext<R>,
    document_id: DocumentId,
    initial_content: Option<Vec<u8>>,
    from_msg: Option<(ConnectionId, DocMessage)>,
) -> DocumentActorId {
    let actor_id = DocumentActorId::new();
    ctx.state()
        .add_document_actor(actor_id, document_id.clone());

    let mut initial_connections: HashMap<ConnectionId, (PeerId, Option<DocMessage>)> = ctx
        .state()
        .established_peers()
        .into_iter()
        .map(|(conn_id, peer_id)| (conn_id, (peer_id, None)))
        .collect();

    for conn_id in initial_connections.keys() {
        ctx.state()
            .add_document_to_connection(conn_id, document_id.clone());
    }

    if let Some((conn_id, msg)) = from_msg {
        if let Some((_, first_msg)) = initial_connections.get_mut(&conn_id) {
            *first_msg = Some(msg);
        }
    }

    ctx.spawn_actor(actor_id, document_id, initial_content, initial_connections);
    actor_id
}
