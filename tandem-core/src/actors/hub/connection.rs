use std::collections::HashMap;

use crate::{
    ConnectionId, DocumentId, PeerId, UnixTimestamp,
    actors::messages::SyncMessage,
    network::{
        ConnDirection, ConnectionInfo, ConnectionState, PeerDocState, PeerInfo, PeerMetadata,
        wire_protocol::{PROTOCOL_VERSION, WireMessage},
    },
};

use super::task_context::IoAccess;

/// One connection to a remote peer and its handshake state machine.
///
/// A connection starts out handshaking and moves to established exactly
/// once. There is no way back: a connection which fails is removed from the
/// hub rather than being moved into a failed state.
pub(crate) struct Connection {
    id: ConnectionId,
    direction: ConnDirection,
    local_peer_id: PeerId,
    local_metadata: PeerMetadata,
    created_at: UnixTimestamp,
    last_received: Option<UnixTimestamp>,
    last_sent: Option<UnixTimestamp>,
    phase: ConnectionPhase,
    info_changed: bool,
}

enum ConnectionPhase {
    /// Incoming connection, waiting for the remote `join`
    WaitingForJoin,
    /// Outgoing connection, we sent `join` and are waiting for `peer`
    WaitingForPeer,
    Established(EstablishedConnection),
}

struct EstablishedConnection {
    remote_peer_id: PeerId,
    document_subscriptions: HashMap<DocumentId, PeerDocState>,
}

pub(crate) struct ConnectionArgs {
    pub(crate) direction: ConnDirection,
    pub(crate) local_peer_id: PeerId,
    pub(crate) local_metadata: PeerMetadata,
    pub(crate) created_at: UnixTimestamp,
}

#[derive(Debug)]
pub(crate) enum ReceiveEvent {
    HandshakeComplete {
        peer_info: PeerInfo,
    },
    SyncMessage {
        doc_id: DocumentId,
        sender_id: PeerId,
        target_id: PeerId,
        msg: SyncMessage,
    },
    EphemeralMessage {
        doc_id: DocumentId,
        sender_id: PeerId,
        target_id: PeerId,
        count: u64,
        session_id: String,
        msg: Vec<u8>,
    },
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub(crate) enum ConnectionError {
    #[error("no supported protocol version in {0:?}")]
    UnsupportedVersions(Vec<String>),
    #[error("peer selected unsupported protocol version {0}")]
    UnsupportedSelectedVersion(String),
    #[error("unexpected '{msg_type}' message while {phase}")]
    UnexpectedMessage {
        phase: &'static str,
        msg_type: &'static str,
    },
    #[error("remote peer reported an error: {0}")]
    Remote(String),
    #[error("peer message addressed to {0} rather than us")]
    WrongTarget(PeerId),
    #[error("message claims to be from {claimed} but the connection is with {remote}")]
    SenderMismatch { claimed: PeerId, remote: PeerId },
}

impl Connection {
    /// Create a connection in the handshaking phase. An outgoing connection
    /// sends its `join` immediately.
    pub(crate) fn new_handshaking(io: &IoAccess, args: ConnectionArgs) -> Self {
        let ConnectionArgs {
            direction,
            local_peer_id,
            local_metadata,
            created_at,
        } = args;
        let phase = match direction {
            ConnDirection::Outgoing => ConnectionPhase::WaitingForPeer,
            ConnDirection::Incoming => ConnectionPhase::WaitingForJoin,
        };
        let mut conn = Connection {
            id: ConnectionId::new(),
            direction,
            local_peer_id,
            local_metadata,
            created_at,
            last_received: None,
            last_sent: None,
            phase,
            info_changed: false,
        };
        if direction == ConnDirection::Outgoing {
            let join = WireMessage::Join {
                sender_id: conn.local_peer_id.clone(),
                supported_protocol_versions: vec![PROTOCOL_VERSION.to_string()],
                metadata: Some(conn.local_metadata.clone()),
            };
            conn.send(io, created_at, join);
        }
        conn
    }

    pub(crate) fn id(&self) -> ConnectionId {
        self.id
    }

    pub(crate) fn created_at(&self) -> UnixTimestamp {
        self.created_at
    }

    pub(crate) fn is_handshaking(&self) -> bool {
        !matches!(self.phase, ConnectionPhase::Established(_))
    }

    pub(crate) fn remote_peer_id(&self) -> Option<&PeerId> {
        match &self.phase {
            ConnectionPhase::Established(established) => Some(&established.remote_peer_id),
            _ => None,
        }
    }

    pub(crate) fn send(&mut self, io: &IoAccess, now: UnixTimestamp, msg: WireMessage) {
        tracing::trace!(
            conn_id = %self.id,
            remote_peer_id = ?self.remote_peer_id(),
            msg_type = msg.type_name(),
            "sending message"
        );
        io.send(self.id, msg.encode());
        self.last_sent = Some(now);
        self.info_changed = true;
    }

    /// Process a message from the remote peer.
    ///
    /// Any error means the connection must be failed. Replies required by
    /// the handshake are sent from here.
    pub(crate) fn receive_msg(
        &mut self,
        io: &IoAccess,
        now: UnixTimestamp,
        msg: WireMessage,
    ) -> Result<Vec<ReceiveEvent>, ConnectionError> {
        self.last_received = Some(now);
        self.info_changed = true;
        match self.phase {
            ConnectionPhase::WaitingForJoin => self.receive_while_waiting_for_join(io, now, msg),
            ConnectionPhase::WaitingForPeer => self.receive_while_waiting_for_peer(msg),
            ConnectionPhase::Established(ref established) => {
                let remote = established.remote_peer_id.clone();
                Self::receive_established(&remote, msg).map(|e| vec![e])
            }
        }
    }

    fn receive_while_waiting_for_join(
        &mut self,
        io: &IoAccess,
        now: UnixTimestamp,
        msg: WireMessage,
    ) -> Result<Vec<ReceiveEvent>, ConnectionError> {
        match msg {
            WireMessage::Join {
                sender_id,
                supported_protocol_versions,
                metadata,
            } => {
                if !supported_protocol_versions
                    .iter()
                    .any(|v| v == PROTOCOL_VERSION)
                {
                    let error = ConnectionError::UnsupportedVersions(supported_protocol_versions);
                    self.send(
                        io,
                        now,
                        WireMessage::Error {
                            message: error.to_string(),
                        },
                    );
                    return Err(error);
                }
                let reply = WireMessage::Peer {
                    sender_id: self.local_peer_id.clone(),
                    target_id: sender_id.clone(),
                    selected_protocol_version: PROTOCOL_VERSION.to_string(),
                    metadata: Some(self.local_metadata.clone()),
                };
                self.send(io, now, reply);
                Ok(vec![self.establish(sender_id, metadata)])
            }
            WireMessage::Error { message } => Err(ConnectionError::Remote(message)),
            other => Err(ConnectionError::UnexpectedMessage {
                phase: "waiting for join",
                msg_type: other.type_name(),
            }),
        }
    }

    fn receive_while_waiting_for_peer(
        &mut self,
        msg: WireMessage,
    ) -> Result<Vec<ReceiveEvent>, ConnectionError> {
        match msg {
            WireMessage::Peer {
                sender_id,
                target_id,
                selected_protocol_version,
                metadata,
            } => {
                if target_id != self.local_peer_id {
                    return Err(ConnectionError::WrongTarget(target_id));
                }
                if selected_protocol_version != PROTOCOL_VERSION {
                    return Err(ConnectionError::UnsupportedSelectedVersion(
                        selected_protocol_version,
                    ));
                }
                Ok(vec![self.establish(sender_id, metadata)])
            }
            WireMessage::Error { message } => Err(ConnectionError::Remote(message)),
            other => Err(ConnectionError::UnexpectedMessage {
                phase: "waiting for peer",
                msg_type: other.type_name(),
            }),
        }
    }

    fn receive_established(
        remote: &PeerId,
        msg: WireMessage,
    ) -> Result<ReceiveEvent, ConnectionError> {
        // Ephemeral messages are gossiped and keep their original sender
        let direct_sender = match &msg {
            WireMessage::Request { sender_id, .. }
            | WireMessage::Sync { sender_id, .. }
            | WireMessage::DocUnavailable { sender_id, .. } => Some(sender_id),
            _ => None,
        };
        if let Some(claimed) = direct_sender.filter(|s| *s != remote) {
            return Err(ConnectionError::SenderMismatch {
                claimed: claimed.clone(),
                remote: remote.clone(),
            });
        }
        match msg {
            WireMessage::Request {
                sender_id,
                target_id,
                document_id,
                data,
            } => Ok(ReceiveEvent::SyncMessage {
                doc_id: document_id,
                sender_id,
                target_id,
                msg: SyncMessage::Request { data },
            }),
            WireMessage::Sync {
                sender_id,
                target_id,
                document_id,
                data,
            } => Ok(ReceiveEvent::SyncMessage {
                doc_id: document_id,
                sender_id,
                target_id,
                msg: SyncMessage::Sync { data },
            }),
            WireMessage::DocUnavailable {
                sender_id,
                target_id,
                document_id,
            } => Ok(ReceiveEvent::SyncMessage {
                doc_id: document_id,
                sender_id,
                target_id,
                msg: SyncMessage::DocUnavailable,
            }),
            WireMessage::Ephemeral {
                sender_id,
                target_id,
                count,
                session_id,
                document_id,
                data,
            } => Ok(ReceiveEvent::EphemeralMessage {
                doc_id: document_id,
                sender_id,
                target_id,
                count,
                session_id,
                msg: data,
            }),
            WireMessage::Error { message } => Err(ConnectionError::Remote(message)),
            other @ (WireMessage::Join { .. } | WireMessage::Peer { .. }) => {
                Err(ConnectionError::UnexpectedMessage {
                    phase: "established",
                    msg_type: other.type_name(),
                })
            }
        }
    }

    fn establish(
        &mut self,
        remote_peer_id: PeerId,
        remote_metadata: Option<PeerMetadata>,
    ) -> ReceiveEvent {
        tracing::debug!(
            conn_id = %self.id,
            direction = ?self.direction,
            %remote_peer_id,
            "connection established"
        );
        let peer_info = PeerInfo {
            peer_id: remote_peer_id.clone(),
            metadata: remote_metadata,
            protocol_version: PROTOCOL_VERSION.to_string(),
        };
        self.phase = ConnectionPhase::Established(EstablishedConnection {
            remote_peer_id,
            document_subscriptions: HashMap::new(),
        });
        ReceiveEvent::HandshakeComplete { peer_info }
    }

    /// Start tracking sync state for a document. Returns `false` if the
    /// connection isn't established or already tracks the document.
    pub(crate) fn add_document(&mut self, doc_id: DocumentId) -> bool {
        let ConnectionPhase::Established(established) = &mut self.phase else {
            return false;
        };
        if established.document_subscriptions.contains_key(&doc_id) {
            return false;
        }
        established
            .document_subscriptions
            .insert(doc_id, PeerDocState::empty());
        self.info_changed = true;
        true
    }

    pub(crate) fn update_peer_state(&mut self, doc_id: &DocumentId, new_state: PeerDocState) {
        let ConnectionPhase::Established(established) = &mut self.phase else {
            return;
        };
        established
            .document_subscriptions
            .insert(doc_id.clone(), new_state);
        self.info_changed = true;
    }

    pub(crate) fn info(&self) -> ConnectionInfo {
        let (docs, state) = match &self.phase {
            ConnectionPhase::Established(established) => (
                established.document_subscriptions.clone(),
                ConnectionState::Connected {
                    their_peer_id: established.remote_peer_id.clone(),
                },
            ),
            _ => (HashMap::new(), ConnectionState::Handshaking),
        };
        ConnectionInfo {
            id: self.id,
            last_received: self.last_received,
            last_sent: self.last_sent,
            docs,
            state,
        }
    }

    /// The current info, if anything changed since the last call
    pub(crate) fn pop_new_info(&mut self) -> Option<ConnectionInfo> {
        if std::mem::take(&mut self.info_changed) {
            Some(self.info())
        } else {
            None
        }
    }
}
