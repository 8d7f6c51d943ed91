use std::collections::HashMap;

use automerge::Automerge;

use crate::{
    ConnectionId, DocumentId, PeerId, StorageKey, UnixTimestamp,
    actors::{
        RunState,
        messages::{Broadcast, DocMessage, DocToHubMsgPayload, SyncMessage},
    },
    network::PeerDocState,
};

use super::{
    ActorIoAccess, DocumentError, DocumentStatus,
    compaction::{Job, JobComplete, SaveState},
    peer_doc_connection::{AnnouncePolicy, PeerDocConnection},
    ready::Ready,
    request::{Request, RequestState},
};

/// Everything a document actor knows, shared between its run loop and
/// the synchronous [`DocumentActor`](super::DocumentActor) methods
#[derive(Debug)]
pub(super) struct ActorState {
    pub(super) phase: Phase,
    pub(super) document_id: DocumentId,
    doc: Automerge,
    peer_connections: HashMap<ConnectionId, PeerDocConnection>,
    save_state: SaveState,
    run_state: RunState,
}

#[derive(Debug)]
pub(super) enum Phase {
    /// Sync messages arriving while we load are replayed afterwards
    Loading {
        pending_sync_messages: HashMap<ConnectionId, Vec<SyncMessage>>,
    },
    Requesting(Request),
    Ready(Ready),
    NotFound,
}

#[derive(Debug)]
enum PhaseTransition {
    None,
    ToReady,
    ToNotFound,
    ToRequesting(Request),
    ToLoading,
}

impl ActorState {
    pub(super) fn new_loading(document_id: DocumentId) -> Self {
        Self::new(
            document_id,
            Automerge::new(),
            Phase::Loading {
                pending_sync_messages: HashMap::new(),
            },
        )
    }

    pub(super) fn new_ready(document_id: DocumentId, doc: Automerge) -> Self {
        Self::new(document_id, doc, Phase::Ready(Ready::new()))
    }

    fn new(document_id: DocumentId, doc: Automerge, phase: Phase) -> Self {
        Self {
            phase,
            document_id,
            doc,
            peer_connections: HashMap::new(),
            save_state: SaveState::new(),
            run_state: RunState::Running,
        }
    }

    fn handle_phase_transition(&mut self, io: &ActorIoAccess, transition: PhaseTransition) {
        let new_status = match transition {
            PhaseTransition::None => return,
            PhaseTransition::ToReady => {
                tracing::trace!("transitioning to ready");
                self.phase = Phase::Ready(Ready::new());
                io.emit_doc_changed(self.doc.get_heads());
                DocumentStatus::Ready
            }
            PhaseTransition::ToNotFound => {
                tracing::trace!("transitioning to not found");
                if let Phase::Requesting(request) = &self.phase {
                    for conn_id in request.peers_waiting_for_us_to_respond() {
                        self.send_doc_unavailable(io, conn_id);
                    }
                }
                self.phase = Phase::NotFound;
                DocumentStatus::NotFound
            }
            PhaseTransition::ToRequesting(request) => {
                tracing::trace!("transitioning to requesting");
                self.phase = Phase::Requesting(request);
                DocumentStatus::Requesting
            }
            PhaseTransition::ToLoading => {
                tracing::trace!("transitioning to loading");
                self.phase = Phase::Loading {
                    pending_sync_messages: HashMap::new(),
                };
                DocumentStatus::Loading
            }
        };
        io.send_message(DocToHubMsgPayload::DocumentStatusChanged { new_status });
    }

    fn send_doc_unavailable(&self, io: &ActorIoAccess, connection_id: ConnectionId) {
        io.send_message(DocToHubMsgPayload::SendSyncMessage {
            connection_id,
            document_id: self.document_id,
            message: SyncMessage::DocUnavailable,
        });
    }

    fn check_request_completion(&self) -> PhaseTransition {
        let Phase::Requesting(request) = &self.phase else {
            return PhaseTransition::None;
        };
        match request.status(&self.doc) {
            RequestState {
                finished: true,
                found: true,
            } => PhaseTransition::ToReady,
            RequestState {
                finished: true,
                found: false,
            } => PhaseTransition::ToNotFound,
            RequestState {
                finished: false, ..
            } => PhaseTransition::None,
        }
    }

    pub(super) fn handle_load(
        &mut self,
        now: UnixTimestamp,
        io: &ActorIoAccess,
        snapshots: HashMap<StorageKey, Vec<u8>>,
        incrementals: HashMap<StorageKey, Vec<u8>>,
    ) {
        for (key, chunk) in snapshots.iter().chain(incrementals.iter()) {
            if let Err(e) = self.doc.load_incremental(chunk) {
                tracing::warn!(err = %e, %key, "error loading chunk");
            }
        }
        self.save_state.loaded(
            snapshots.into_keys().chain(incrementals.into_keys()),
            self.doc.get_heads(),
        );

        let Phase::Loading { .. } = self.phase else {
            return;
        };

        if !self.doc.get_heads().is_empty() {
            tracing::trace!("load complete, transitioning to ready");
            let pending = self.take_pending_sync_messages(Phase::Ready(Ready::new()));
            io.send_message(DocToHubMsgPayload::DocumentStatusChanged {
                new_status: DocumentStatus::Ready,
            });
            io.emit_doc_changed(self.doc.get_heads());
            self.replay(now, io, pending);
            return;
        }

        let eligible_peers = self
            .peer_connections
            .values()
            .any(|p| p.announce_policy() != AnnouncePolicy::DontAnnounce);
        if eligible_peers {
            tracing::debug!("document not in storage, requesting it from peers");
            let request = Request::new(self.peer_connections.values());
            let pending = self.take_pending_sync_messages(Phase::Requesting(request));
            io.send_message(DocToHubMsgPayload::DocumentStatusChanged {
                new_status: DocumentStatus::Requesting,
            });
            self.replay(now, io, pending);
        } else {
            tracing::debug!("document not in storage and no peers to ask");
            let pending = self.take_pending_sync_messages(Phase::NotFound);
            io.send_message(DocToHubMsgPayload::DocumentStatusChanged {
                new_status: DocumentStatus::NotFound,
            });
            // Peers which asked us while we were loading still need an answer
            for (conn_id, msgs) in pending {
                if msgs.iter().any(|m| matches!(m, SyncMessage::Request { .. })) {
                    self.send_doc_unavailable(io, conn_id);
                }
            }
        }
    }

    fn take_pending_sync_messages(
        &mut self,
        next_phase: Phase,
    ) -> HashMap<ConnectionId, Vec<SyncMessage>> {
        match std::mem::replace(&mut self.phase, next_phase) {
            Phase::Loading {
                pending_sync_messages,
            } => pending_sync_messages,
            _ => HashMap::new(),
        }
    }

    fn replay(
        &mut self,
        now: UnixTimestamp,
        io: &ActorIoAccess,
        pending: HashMap<ConnectionId, Vec<SyncMessage>>,
    ) {
        for (conn_id, msgs) in pending {
            for msg in msgs {
                self.handle_sync_message(now, io, conn_id, msg);
            }
        }
    }

    pub(super) fn add_connection(&mut self, conn_id: ConnectionId, peer_id: PeerId) {
        if self.peer_connections.contains_key(&conn_id) {
            tracing::debug!(%conn_id, "connection already known to document actor");
            return;
        }
        let conn = PeerDocConnection::new(peer_id, conn_id);
        if let Phase::Requesting(request) = &mut self.phase {
            request.add_connection(&conn);
        }
        self.peer_connections.insert(conn_id, conn);
    }

    pub(super) fn remove_connection(&mut self, io: &ActorIoAccess, conn_id: ConnectionId) {
        if self.peer_connections.remove(&conn_id).is_none() {
            return;
        }
        if let Phase::Loading {
            pending_sync_messages,
        } = &mut self.phase
        {
            pending_sync_messages.remove(&conn_id);
        }
        if let Phase::Requesting(request) = &mut self.phase {
            request.remove_connection(conn_id);
        }
        let transition = self.check_request_completion();
        self.handle_phase_transition(io, transition);
    }

    pub(super) fn handle_doc_message(
        &mut self,
        now: UnixTimestamp,
        io: &ActorIoAccess,
        connection_id: ConnectionId,
        msg: DocMessage,
    ) {
        match msg {
            DocMessage::Ephemeral(msg) => {
                io.emit_ephemeral_message(msg.data.clone());
                let targets = self
                    .broadcast_targets(Some(&msg.sender_id))
                    .into_iter()
                    .filter(|c| *c != connection_id)
                    .collect::<Vec<_>>();
                if !targets.is_empty() {
                    io.send_message(DocToHubMsgPayload::Broadcast {
                        connections: targets,
                        msg: Broadcast::Gossip { msg },
                    });
                }
            }
            DocMessage::Sync(msg) => self.handle_sync_message(now, io, connection_id, msg),
        }
    }

    fn handle_sync_message(
        &mut self,
        now: UnixTimestamp,
        io: &ActorIoAccess,
        connection_id: ConnectionId,
        msg: SyncMessage,
    ) {
        let Some(peer_conn) = self.peer_connections.get_mut(&connection_id) else {
            tracing::warn!(%connection_id, "sync message from unknown connection");
            return;
        };
        tracing::trace!(
            %connection_id,
            peer_id = %peer_conn.peer_id,
            ?msg,
            "received sync message"
        );

        let transition = match &mut self.phase {
            Phase::Loading {
                pending_sync_messages,
            } => {
                pending_sync_messages
                    .entry(connection_id)
                    .or_default()
                    .push(msg);
                PhaseTransition::None
            }
            Phase::Requesting(request) => {
                request.receive_message(now, &mut self.doc, peer_conn, msg);
                self.check_request_completion()
            }
            Phase::Ready(ready) => {
                let heads_before = self.doc.get_heads();
                ready.receive_sync_message(now, &mut self.doc, peer_conn, msg);
                let heads_after = self.doc.get_heads();
                if heads_before != heads_after {
                    io.emit_doc_changed(heads_after);
                }
                PhaseTransition::None
            }
            Phase::NotFound => match msg {
                SyncMessage::Request { .. } => {
                    tracing::trace!("request received while not found, requesting again");
                    let request = Request::new(self.peer_connections.values());
                    self.handle_phase_transition(io, PhaseTransition::ToRequesting(request));
                    self.handle_sync_message(now, io, connection_id, msg);
                    return;
                }
                SyncMessage::Sync { .. } => {
                    tracing::trace!("sync received while not found, moving to ready");
                    self.handle_phase_transition(io, PhaseTransition::ToReady);
                    self.handle_sync_message(now, io, connection_id, msg);
                    return;
                }
                SyncMessage::DocUnavailable => PhaseTransition::None,
            },
        };

        self.handle_phase_transition(io, transition);
    }

    pub(super) fn generate_sync_messages(
        &mut self,
        now: UnixTimestamp,
    ) -> Vec<(ConnectionId, SyncMessage)> {
        let mut result = Vec::new();
        for (conn_id, peer_conn) in &mut self.peer_connections {
            let msg = match &mut self.phase {
                Phase::Loading { .. } | Phase::NotFound => None,
                Phase::Requesting(request) => request.generate_message(now, &self.doc, peer_conn),
                Phase::Ready(ready) => ready.generate_sync_message(now, &self.doc, peer_conn),
            };
            if let Some(msg) = msg {
                tracing::trace!(
                    %conn_id,
                    peer_id = %peer_conn.peer_id,
                    ?msg,
                    "sending sync message"
                );
                result.push((*conn_id, msg));
            }
        }
        result.sort_by_key(|(conn_id, _)| *conn_id);
        result
    }

    /// Every connection, except those to `omitting`
    pub(super) fn broadcast_targets(&self, omitting: Option<&PeerId>) -> Vec<ConnectionId> {
        let mut targets = self
            .peer_connections
            .iter()
            .filter(|(_, conn)| Some(&conn.peer_id) != omitting)
            .map(|(conn_id, _)| *conn_id)
            .collect::<Vec<_>>();
        targets.sort();
        targets
    }

    /// Go back to loading if the document was not found
    pub(super) fn ensure_request(&mut self, io: &ActorIoAccess) {
        if let Phase::NotFound = self.phase {
            tracing::debug!("document requested again, reloading");
            for peer_conn in self.peer_connections.values_mut() {
                peer_conn.reset_sync_state();
            }
            self.handle_phase_transition(io, PhaseTransition::ToLoading);
        }
    }

    pub(super) fn document(&mut self) -> Result<&mut Automerge, DocumentError> {
        if let Phase::Ready(_) = self.phase {
            Ok(&mut self.doc)
        } else {
            Err(DocumentError::DocumentNotReady)
        }
    }

    pub(super) fn is_loading(&self) -> bool {
        matches!(self.phase, Phase::Loading { .. })
    }

    pub(super) fn is_ready(&self) -> bool {
        matches!(self.phase, Phase::Ready(_))
    }

    pub(super) fn peers(&self) -> Vec<(ConnectionId, PeerId)> {
        let mut peers = self
            .peer_connections
            .iter()
            .map(|(conn_id, conn)| (*conn_id, conn.peer_id.clone()))
            .collect::<Vec<_>>();
        peers.sort_by_key(|(conn_id, _)| *conn_id);
        peers
    }

    pub(super) fn pop_new_jobs(&mut self) -> Vec<Job> {
        self.save_state.pop_new_jobs(&self.document_id, &self.doc)
    }

    pub(super) fn mark_job_complete(&mut self, completion: JobComplete) {
        self.save_state.mark_job_complete(completion);
    }

    pub(super) fn pop_new_peer_states(&mut self) -> Option<HashMap<ConnectionId, PeerDocState>> {
        let states = self
            .peer_connections
            .iter_mut()
            .filter_map(|(conn_id, conn)| conn.pop().map(|state| (*conn_id, state)))
            .collect::<HashMap<_, _>>();
        (!states.is_empty()).then_some(states)
    }

    /// Connections whose announce policy hasn't been checked yet. Marks the
    /// returned ones as being checked.
    pub(super) fn pop_announce_policy_tasks(&mut self) -> Vec<(PeerId, ConnectionId)> {
        let mut tasks = Vec::new();
        for peer_conn in self.peer_connections.values_mut() {
            if peer_conn.announce_policy() == AnnouncePolicy::Unknown {
                tasks.push((peer_conn.peer_id.clone(), peer_conn.connection_id));
                peer_conn.set_announce_policy(AnnouncePolicy::Loading);
            }
        }
        tasks
    }

    pub(super) fn set_announce_policy(
        &mut self,
        io: &ActorIoAccess,
        connection_id: ConnectionId,
        policy: AnnouncePolicy,
    ) {
        let Some(peer_conn) = self.peer_connections.get_mut(&connection_id) else {
            tracing::trace!(%connection_id, "announce policy for a connection which is gone");
            return;
        };
        peer_conn.set_announce_policy(policy);

        if let Phase::Requesting(request) = &mut self.phase {
            request.announce_policy_changed(connection_id, policy);
        }
        let transition = self.check_request_completion();
        self.handle_phase_transition(io, transition);
    }

    pub(super) fn run_state(&self) -> RunState {
        self.run_state
    }

    pub(super) fn set_run_state(&mut self, run_state: RunState) {
        self.run_state = run_state;
    }
}
