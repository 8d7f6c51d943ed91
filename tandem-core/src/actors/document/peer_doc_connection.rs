use automerge::{Automerge, ChangeHash, sync};

use crate::{ConnectionId, PeerId, UnixTimestamp, network::PeerDocState};

/// Whether we may tell a peer about this document before they ask
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(super) enum AnnouncePolicy {
    /// No check has been issued yet
    Unknown,
    /// A check is in flight
    Loading,
    Announce,
    DontAnnounce,
}

/// The sync relationship between this document and one connection
#[derive(Debug)]
pub(super) struct PeerDocConnection {
    pub(super) peer_id: PeerId,
    pub(super) connection_id: ConnectionId,
    sync_state: sync::State,
    announce_policy: AnnouncePolicy,
    has_heard_from_peer: bool,
    state: PeerDocState,
    dirty: bool,
}

#[derive(Debug, thiserror::Error)]
pub(super) enum SyncError {
    #[error("invalid sync message: {0}")]
    Decode(#[from] sync::ReadMessageError),
    #[error(transparent)]
    Apply(#[from] automerge::AutomergeError),
}

impl PeerDocConnection {
    pub(super) fn new(peer_id: PeerId, connection_id: ConnectionId) -> Self {
        Self {
            peer_id,
            connection_id,
            sync_state: sync::State::new(),
            announce_policy: AnnouncePolicy::Unknown,
            has_heard_from_peer: false,
            state: PeerDocState::empty(),
            dirty: true,
        }
    }

    pub(super) fn announce_policy(&self) -> AnnouncePolicy {
        self.announce_policy
    }

    pub(super) fn set_announce_policy(&mut self, policy: AnnouncePolicy) {
        self.announce_policy = policy;
    }

    pub(super) fn has_heard_from_peer(&self) -> bool {
        self.has_heard_from_peer
    }

    /// The heads the peer last told us they have
    pub(super) fn their_heads(&self) -> Option<&[ChangeHash]> {
        self.sync_state.their_heads.as_deref()
    }

    /// Start syncing from scratch, used when a document is requested again
    pub(super) fn reset_sync_state(&mut self) {
        self.sync_state = sync::State::new();
        self.has_heard_from_peer = false;
    }

    pub(super) fn receive_sync_message(
        &mut self,
        now: UnixTimestamp,
        doc: &mut Automerge,
        data: &[u8],
    ) -> Result<(), SyncError> {
        use automerge::sync::SyncDoc;

        self.has_heard_from_peer = true;
        self.state.last_received = Some(now);
        self.dirty = true;
        let msg = sync::Message::decode(data)?;
        doc.receive_sync_message(&mut self.sync_state, msg)?;
        self.state.last_acked_heads = self.sync_state.their_heads.clone();
        Ok(())
    }

    pub(super) fn generate_sync_message(
        &mut self,
        now: UnixTimestamp,
        doc: &Automerge,
    ) -> Option<Vec<u8>> {
        use automerge::sync::SyncDoc;

        let msg = doc.generate_sync_message(&mut self.sync_state)?;
        self.state.last_sent = Some(now);
        self.state.last_sent_heads = Some(doc.get_heads());
        self.dirty = true;
        Some(msg.encode())
    }

    /// The current sync progress, if it changed since the last call
    pub(super) fn pop(&mut self) -> Option<PeerDocState> {
        std::mem::take(&mut self.dirty).then(|| self.state.clone())
    }
}
