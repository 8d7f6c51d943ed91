use automerge::Automerge;

use crate::{UnixTimestamp, actors::messages::SyncMessage};

use super::peer_doc_connection::{AnnouncePolicy, PeerDocConnection};

/// Syncing a document we have with our peers
#[derive(Debug)]
pub(super) struct Ready;

impl Ready {
    pub(super) fn new() -> Self {
        Ready
    }

    pub(super) fn receive_sync_message(
        &mut self,
        now: UnixTimestamp,
        doc: &mut Automerge,
        peer: &mut PeerDocConnection,
        msg: SyncMessage,
    ) {
        let data = match msg {
            SyncMessage::Request { data } | SyncMessage::Sync { data } => data,
            SyncMessage::DocUnavailable => {
                tracing::trace!(
                    conn_id = %peer.connection_id,
                    "ignoring doc-unavailable, we have the document"
                );
                return;
            }
        };
        if let Err(e) = peer.receive_sync_message(now, doc, &data) {
            tracing::warn!(conn_id = %peer.connection_id, err = %e, "failed to apply sync message");
        }
    }

    /// Peers hear from us if the announce policy allows it or they
    /// contacted us first
    pub(super) fn generate_sync_message(
        &mut self,
        now: UnixTimestamp,
        doc: &Automerge,
        peer: &mut PeerDocConnection,
    ) -> Option<SyncMessage> {
        if peer.announce_policy() != AnnouncePolicy::Announce && !peer.has_heard_from_peer() {
            return None;
        }
        peer.generate_sync_message(now, doc)
            .map(|data| SyncMessage::Sync { data })
    }
}
