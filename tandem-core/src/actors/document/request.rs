//! Asking connected peers for a document we don't have.
use std::collections::{HashMap, HashSet};

use automerge::Automerge;

use crate::{ConnectionId, UnixTimestamp, actors::messages::SyncMessage};

use super::peer_doc_connection::{AnnouncePolicy, PeerDocConnection};

#[derive(Debug)]
pub(super) struct Request {
    peers: HashMap<ConnectionId, PeerRequestState>,
    /// Peers who asked us for the document while we were looking for it
    waiting_for_us: HashSet<ConnectionId>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum PeerRequestState {
    /// Waiting for the announce policy check
    NeedsPolicy,
    ToRequest,
    Requested,
    /// The peer answered with data
    Syncing,
    /// The peer doesn't have the document
    Unavailable,
    /// We may not ask this peer
    Ineligible,
}

pub(super) struct RequestState {
    pub(super) finished: bool,
    pub(super) found: bool,
}

impl PeerRequestState {
    fn for_policy(policy: AnnouncePolicy) -> Self {
        match policy {
            AnnouncePolicy::Unknown | AnnouncePolicy::Loading => PeerRequestState::NeedsPolicy,
            AnnouncePolicy::Announce => PeerRequestState::ToRequest,
            AnnouncePolicy::DontAnnounce => PeerRequestState::Ineligible,
        }
    }

    fn is_settled(self) -> bool {
        matches!(
            self,
            PeerRequestState::Unavailable | PeerRequestState::Ineligible
        )
    }
}

impl Request {
    pub(super) fn new<'a, I: Iterator<Item = &'a PeerDocConnection>>(peers: I) -> Self {
        let mut request = Request {
            peers: HashMap::new(),
            waiting_for_us: HashSet::new(),
        };
        for peer in peers {
            request.add_connection(peer);
        }
        request
    }

    pub(super) fn add_connection(&mut self, peer: &PeerDocConnection) {
        self.peers.insert(
            peer.connection_id,
            PeerRequestState::for_policy(peer.announce_policy()),
        );
    }

    pub(super) fn remove_connection(&mut self, conn_id: ConnectionId) {
        self.peers.remove(&conn_id);
        self.waiting_for_us.remove(&conn_id);
    }

    pub(super) fn announce_policy_changed(
        &mut self,
        conn_id: ConnectionId,
        policy: AnnouncePolicy,
    ) {
        if let Some(state) = self.peers.get_mut(&conn_id) {
            if *state == PeerRequestState::NeedsPolicy {
                *state = PeerRequestState::for_policy(policy);
            }
        }
    }

    pub(super) fn peers_waiting_for_us_to_respond(
        &self,
    ) -> impl Iterator<Item = ConnectionId> + '_ {
        self.waiting_for_us.iter().copied()
    }

    pub(super) fn receive_message(
        &mut self,
        now: UnixTimestamp,
        doc: &mut Automerge,
        peer: &mut PeerDocConnection,
        msg: SyncMessage,
    ) {
        let conn_id = peer.connection_id;
        match msg {
            SyncMessage::Request { data } => {
                // They are looking for it too
                if let Err(e) = peer.receive_sync_message(now, doc, &data) {
                    tracing::warn!(%conn_id, err = %e, "bad request message");
                }
                self.peers.insert(conn_id, PeerRequestState::Unavailable);
                self.waiting_for_us.insert(conn_id);
            }
            SyncMessage::Sync { data } => {
                if let Err(e) = peer.receive_sync_message(now, doc, &data) {
                    tracing::warn!(%conn_id, err = %e, "bad sync message");
                    self.peers.insert(conn_id, PeerRequestState::Unavailable);
                    return;
                }
                let they_have_nothing = peer.their_heads().is_some_and(|h| h.is_empty());
                let state = if doc.get_heads().is_empty() && they_have_nothing {
                    PeerRequestState::Unavailable
                } else {
                    PeerRequestState::Syncing
                };
                self.peers.insert(conn_id, state);
            }
            SyncMessage::DocUnavailable => {
                tracing::trace!(%conn_id, "peer does not have the document");
                self.peers.insert(conn_id, PeerRequestState::Unavailable);
            }
        }
    }

    pub(super) fn generate_message(
        &mut self,
        now: UnixTimestamp,
        doc: &Automerge,
        peer: &mut PeerDocConnection,
    ) -> Option<SyncMessage> {
        let state = self.peers.get_mut(&peer.connection_id)?;
        match *state {
            PeerRequestState::ToRequest => {
                let data = peer.generate_sync_message(now, doc)?;
                *state = PeerRequestState::Requested;
                Some(SyncMessage::Request { data })
            }
            PeerRequestState::Syncing => peer
                .generate_sync_message(now, doc)
                .map(|data| SyncMessage::Sync { data }),
            _ => None,
        }
    }

    pub(super) fn status(&self, doc: &Automerge) -> RequestState {
        if !doc.get_heads().is_empty() {
            return RequestState {
                finished: true,
                found: true,
            };
        }
        RequestState {
            finished: self.peers.values().all(|s| s.is_settled()),
            found: false,
        }
    }
}
