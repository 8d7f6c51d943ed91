use futures::channel::oneshot;
use std::collections::HashMap;

use crate::{
    ConnectionId, DocumentActorId, DocumentId, PeerId, StorageId, UnixTimestamp,
    actors::document::DocumentStatus,
    ephemera::{EphemeralSession, OutgoingSessionDetails},
    network::{ConnectionInfo, PeerDocState, PeerMetadata},
};

mod actor_info;
pub(crate) use actor_info::ActorInfo;

use super::{CommandId, CommandResult, HubConfig, RunState, connection::Connection};
mod pending_commands;

/// The mutable state shared by the futures running inside the hub.
///
/// Futures reach it through `TaskContext::state()`, which locks it for the
/// duration of a single call so that no lock is ever held across an await.
pub(crate) struct State {
    storage_id: StorageId,
    peer_id: PeerId,
    config: HubConfig,
    actors: HashMap<DocumentActorId, ActorInfo>,
    connections: HashMap<ConnectionId, Connection>,
    document_to_actor: HashMap<DocumentId, DocumentActorId>,
    pending_commands: pending_commands::PendingCommands,
    ephemeral_session: EphemeralSession,
    run_state: RunState,
}

impl State {
    pub(crate) fn new(
        storage_id: StorageId,
        peer_id: PeerId,
        ephemeral_session: EphemeralSession,
        config: HubConfig,
    ) -> Self {
        Self {
            storage_id,
            peer_id,
            config,
            actors: HashMap::new(),
            connections: HashMap::new(),
            document_to_actor: HashMap::new(),
            pending_commands: pending_commands::PendingCommands::new(),
            ephemeral_session,
            run_state: RunState::Running,
        }
    }

    pub(crate) fn storage_id(&self) -> StorageId {
        self.storage_id.clone()
    }

    pub(crate) fn peer_id(&self) -> &PeerId {
        &self.peer_id
    }

    pub(crate) fn add_connection(&mut self, connection: Connection) {
        self.connections.insert(connection.id(), connection);
    }

    pub(crate) fn remove_connection(&mut self, connection_id: &ConnectionId) -> Option<Connection> {
        let removed = self.connections.remove(connection_id)?;
        if let Some(peer_id) = removed.remote_peer_id() {
            let still_connected = self
                .connections
                .values()
                .any(|conn| conn.remote_peer_id() == Some(peer_id));
            if !still_connected {
                self.ephemeral_session.forget_peer(peer_id);
            }
        }
        Some(removed)
    }

    pub(crate) fn get_connection(&self, connection_id: &ConnectionId) -> Option<&Connection> {
        self.connections.get(connection_id)
    }

    pub(crate) fn get_connection_mut(
        &mut self,
        connection_id: &ConnectionId,
    ) -> Option<&mut Connection> {
        self.connections.get_mut(connection_id)
    }

    pub(crate) fn add_document_to_connection(
        &mut self,
        connection_id: &ConnectionId,
        document_id: DocumentId,
    ) {
        if let Some(connection) = self.connections.get_mut(connection_id) {
            connection.add_document(document_id);
        }
    }

    pub(crate) fn connections(&self) -> Vec<ConnectionInfo> {
        let mut infos = self
            .connections
            .values()
            .map(Connection::info)
            .collect::<Vec<_>>();
        infos.sort_by_key(|info| info.id);
        infos
    }

    pub(crate) fn established_peers(&self) -> Vec<(ConnectionId, PeerId)> {
        let mut peers = self
            .connections
            .iter()
            .filter_map(|(connection_id, conn)| {
                conn.remote_peer_id()
                    .map(|remote| (*connection_id, remote.clone()))
            })
            .collect::<Vec<_>>();
        peers.sort_by_key(|(conn_id, _)| *conn_id);
        peers
    }

    pub(crate) fn is_connected_to(&self, peer_id: &PeerId) -> bool {
        self.connections
            .values()
            .any(|conn| conn.remote_peer_id() == Some(peer_id))
    }

    /// Connections still handshaking after the configured timeout
    pub(crate) fn stale_handshakes(&self, now: UnixTimestamp) -> Vec<ConnectionId> {
        self.connections
            .values()
            .filter(|conn| {
                conn.is_handshaking()
                    && now.saturating_duration_since(conn.created_at())
                        >= self.config.handshake_timeout
            })
            .map(Connection::id)
            .collect()
    }

    pub(crate) fn add_document_actor(
        &mut self,
        actor_id: DocumentActorId,
        document_id: DocumentId,
    ) {
        self.actors
            .insert(actor_id, ActorInfo::new(actor_id, document_id.clone()));
        self.document_to_actor.insert(document_id, actor_id);
    }

    pub(crate) fn remove_document_actor(&mut self, actor_id: &DocumentActorId) {
        if let Some(actor_info) = self.actors.remove(actor_id) {
            self.document_to_actor.remove(&actor_info.document_id);
        } else {
            tracing::warn!(%actor_id, "attempted to remove non-existent document actor");
        }
    }

    pub(crate) fn has_actor(&self, actor_id: &DocumentActorId) -> bool {
        self.actors.contains_key(actor_id)
    }

    pub(crate) fn find_actor_for_document(&self, document_id: &DocumentId) -> Option<&ActorInfo> {
        self.document_to_actor
            .get(document_id)
            .and_then(|actor_id| self.actors.get(actor_id))
    }

    pub(crate) fn find_document_for_actor(&self, actor_id: &DocumentActorId) -> Option<DocumentId> {
        self.actors
            .get(actor_id)
            .map(|actor| actor.document_id.clone())
    }

    pub(crate) fn add_pending_find_command(
        &mut self,
        document_id: DocumentId,
        command_id: CommandId,
        reply: oneshot::Sender<CommandResult>,
    ) {
        self.pending_commands
            .add_pending_find_command(document_id, command_id, reply);
    }

    pub(crate) fn add_pending_create_command(
        &mut self,
        actor_id: DocumentActorId,
        command_id: CommandId,
        reply: oneshot::Sender<CommandResult>,
    ) {
        self.pending_commands
            .add_pending_create_command(actor_id, command_id, reply);
    }

    pub(crate) fn document_actors(&self) -> impl Iterator<Item = &ActorInfo> {
        self.actors.values()
    }

    pub(crate) fn update_document_status(
        &mut self,
        actor_id: DocumentActorId,
        new_status: DocumentStatus,
    ) {
        let Some(actor_info) = self.actors.get_mut(&actor_id) else {
            tracing::warn!(%actor_id, "status update for unknown document actor");
            return;
        };
        actor_info.status = new_status;
        let doc_id = actor_info.document_id.clone();
        match new_status {
            DocumentStatus::Ready => {
                self.pending_commands
                    .resolve_pending_create(actor_id, &doc_id);
                self.pending_commands
                    .resolve_pending_find(&doc_id, actor_id, true);
            }
            DocumentStatus::NotFound => {
                if self.pending_commands.has_pending_create(actor_id) {
                    tracing::error!(%actor_id, "newly created document reported not found");
                }
                self.pending_commands
                    .resolve_pending_find(&doc_id, actor_id, false);
            }
            _ => {}
        }
    }

    /// Subscribe every established connection to every document, returning
    /// the subscriptions which are new so the actors can be told
    pub(crate) fn ensure_connections(&mut self) -> Vec<(DocumentActorId, ConnectionId, PeerId)> {
        let mut result = Vec::new();
        for (conn_id, conn) in &mut self.connections {
            let Some(peer_id) = conn.remote_peer_id().cloned() else {
                continue;
            };
            for (doc_id, actor_id) in &self.document_to_actor {
                if conn.add_document(doc_id.clone()) {
                    result.push((*actor_id, *conn_id, peer_id.clone()));
                }
            }
        }
        result.sort_by_key(|(actor_id, conn_id, _)| (*actor_id, *conn_id));
        result
    }

    pub(crate) fn update_peer_states(
        &mut self,
        actor_id: DocumentActorId,
        new_states: HashMap<ConnectionId, PeerDocState>,
    ) {
        let Some(actor) = self.actors.get(&actor_id) else {
            tracing::warn!(%actor_id, "peer states from unknown document actor");
            return;
        };
        for (conn_id, new_state) in new_states {
            if let Some(connection) = self.connections.get_mut(&conn_id) {
                connection.update_peer_state(&actor.document_id, new_state);
            } else {
                tracing::trace!(%conn_id, "peer states for a connection which is gone");
            }
        }
    }

    pub(crate) fn pop_new_connection_info(&mut self) -> Vec<(ConnectionId, ConnectionInfo)> {
        let mut infos = self
            .connections
            .iter_mut()
            .filter_map(|(conn_id, conn)| conn.pop_new_info().map(|info| (*conn_id, info)))
            .collect::<Vec<_>>();
        infos.sort_by_key(|(conn_id, _)| *conn_id);
        infos
    }

    pub(crate) fn next_ephemeral_msg_details(&mut self) -> OutgoingSessionDetails {
        self.ephemeral_session.next_message_session_details()
    }

    pub(crate) fn receive_ephemeral_msg(
        &mut self,
        sender_id: &PeerId,
        session_id: &str,
        count: u64,
    ) -> bool {
        self.ephemeral_session.receive(sender_id, session_id, count)
    }

    pub(crate) fn local_metadata(&self) -> PeerMetadata {
        PeerMetadata {
            is_ephemeral: self.config.is_ephemeral,
            storage_id: Some(self.storage_id.clone()),
        }
    }

    pub(crate) fn run_state(&self) -> RunState {
        self.run_state
    }

    pub(crate) fn set_run_state(&mut self, new_state: RunState) {
        self.run_state = new_state;
    }
}
