use std::{
    collections::HashMap,
    sync::{Arc, Mutex},
};

use crate::{
    ConnectionId, DocumentActorId, DocumentId, PeerId, UnixTimestamp,
    actors::{
        document::SpawnArgs,
        driver::ActorIo,
        messages::{Broadcast, DocMessage, HubToDocMsgPayload},
    },
    ephemera::{EphemeralMessage, OutgoingSessionDetails},
    network::{ConnectionEvent, wire_protocol::WireMessage},
};

mod conn_access;
pub(crate) use conn_access::ConnectionAccess;
mod state_access;
pub(crate) use state_access::StateAccess;
mod io_access;
pub(crate) use io_access::IoAccess;

use super::{Hub, State, run::HubOutput};

/// Access to the shared resources of the hub from within its futures.
///
/// Every future the hub runs gets a clone of the context. State is reached
/// through [`TaskContext::state`], which locks the state separately for each
/// call so a lock can never be held across an await point. The random number
/// generator is shared between all clones so that ids generated by
/// concurrently running commands never collide.
pub(crate) struct TaskContext<R> {
    now: Arc<Mutex<UnixTimestamp>>,
    state: Arc<Mutex<State>>,
    io: ActorIo<Hub>,
    rng: Arc<Mutex<R>>,
}

impl<R> Clone for TaskContext<R> {
    fn clone(&self) -> Self {
        Self {
            now: self.now.clone(),
            state: self.state.clone(),
            io: self.io.clone(),
            rng: self.rng.clone(),
        }
    }
}

impl<R: rand::Rng> TaskContext<R> {
    pub(crate) fn new(
        rng: R,
        now: Arc<Mutex<UnixTimestamp>>,
        io: ActorIo<Hub>,
        state: Arc<Mutex<State>>,
    ) -> Self {
        Self {
            rng: Arc::new(Mutex::new(rng)),
            now,
            state,
            io,
        }
    }

    pub(crate) fn state(&self) -> StateAccess<'_> {
        StateAccess::new(self.now(), self.io(), &self.state)
    }

    pub(crate) fn io(&self) -> IoAccess {
        IoAccess::new(self.io.clone())
    }

    pub(crate) fn now(&self) -> UnixTimestamp {
        *self.now.lock().unwrap()
    }

    pub(crate) fn with_rng<T>(&self, f: impl FnOnce(&mut R) -> T) -> T {
        f(&mut self.rng.lock().unwrap())
    }

    pub(crate) fn spawn_actor(
        &self,
        actor_id: DocumentActorId,
        document_id: DocumentId,
        initial_content: Option<Vec<u8>>,
        initial_connections: HashMap<ConnectionId, (PeerId, Option<DocMessage>)>,
    ) {
        tracing::debug!(%actor_id, %document_id, "spawning document actor");
        self.io.emit_event(HubOutput::Spawn(Box::new(SpawnArgs {
            actor_id,
            local_peer_id: self.state().peer_id(),
            document_id,
            initial_content,
            initial_connections,
        })));
    }

    pub(crate) fn send_to_actor(&self, actor_id: DocumentActorId, message: HubToDocMsgPayload) {
        self.io.emit_event(HubOutput::ToActor(actor_id, message));
    }

    pub(crate) fn emit_connection_event(&self, event: ConnectionEvent) {
        self.io.emit_event(HubOutput::Connection(event));
    }

    pub(crate) fn emit_disconnect_event(&self, connection_id: ConnectionId, error: String) {
        self.emit_connection_event(ConnectionEvent::ConnectionFailed {
            connection_id,
            error,
        });
    }

    pub(crate) fn notify_doc_actors_of_removed_connection(&self, connection_id: ConnectionId) {
        for actor_info in self.state().document_actors() {
            self.send_to_actor(
                actor_info.actor_id,
                HubToDocMsgPayload::ConnectionClosed { connection_id },
            );
        }
    }

    /// Remove a connection we have decided to close, tell everyone who
    /// cares, and wait for the host to report the transport closed
    pub(crate) async fn fail_connection_with_disconnect(
        &self,
        connection_id: ConnectionId,
        error: String,
    ) {
        let Some(connection) = self.state().remove_connection(&connection_id) else {
            tracing::warn!(%connection_id, "attempted to fail a connection which does not exist");
            return;
        };
        tracing::debug!(
            %connection_id,
            %error,
            remote_peer_id = ?connection.remote_peer_id(),
            "failing connection"
        );
        self.emit_disconnect_event(connection_id, error);
        self.notify_doc_actors_of_removed_connection(connection_id);
        self.io().disconnect(connection_id).await;
    }

    /// Send a sync message on behalf of a document actor
    pub(crate) fn send_sync_message(
        &self,
        connection_id: ConnectionId,
        document_id: DocumentId,
        message: crate::actors::messages::SyncMessage,
    ) {
        let local_peer_id = self.state().peer_id();
        let Some(target_id) = self.state().remote_peer_id(connection_id) else {
            tracing::debug!(%connection_id, "dropping sync message for closed connection");
            return;
        };
        let msg = crate::network::wire_protocol::WireMessageBuilder {
            sender_id: local_peer_id,
            target_id,
            document_id,
        }
        .from_sync_message(message);
        if let Some(conn) = self.state().get_connection(&connection_id) {
            conn.send(msg);
        }
    }

    /// Send an ephemeral message for a document to each of `to_connections`
    pub(crate) fn broadcast(
        &self,
        from_actor: DocumentActorId,
        to_connections: Vec<ConnectionId>,
        msg: Broadcast,
    ) {
        let Some(document_id) = self.state().find_document_for_actor(&from_actor) else {
            tracing::warn!(%from_actor, "broadcast from a document actor which does not exist");
            return;
        };
        let local_peer_id = self.state().peer_id();
        let msg = match msg {
            Broadcast::New { msg } => {
                let OutgoingSessionDetails {
                    session_id,
                    counter,
                } = self.state().next_ephemeral_msg_details();
                EphemeralMessage {
                    sender_id: local_peer_id,
                    session_id,
                    count: counter,
                    data: msg,
                }
            }
            Broadcast::Gossip { msg } => msg,
        };

        for conn_id in to_connections {
            let Some(target_id) = self.state().remote_peer_id(conn_id) else {
                continue;
            };
            // Never send a message back to the peer which created it
            if target_id == msg.sender_id {
                continue;
            }
            let Some(conn) = self.state().get_connection(&conn_id) else {
                continue;
            };
            conn.send(WireMessage::Ephemeral {
                sender_id: msg.sender_id.clone(),
                target_id,
                count: msg.count,
                session_id: msg.session_id.clone(),
                document_id: document_id.clone(),
                data: msg.data.clone(),
            });
        }
    }
}
