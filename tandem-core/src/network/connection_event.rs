use crate::ConnectionId;

use super::{PeerInfo, connection_info::ConnectionInfo};

/// Events related to connection lifecycle and handshake process.
///
/// These allow the host to track the state of its connections, in
/// particular to learn when a connection has been dropped by the hub and the
/// underlying transport can be released.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConnectionEvent {
    /// The handshake finished and the connection is ready for document
    /// synchronization.
    HandshakeCompleted {
        connection_id: ConnectionId,
        peer_info: PeerInfo,
    },
    /// The connection failed or was disconnected and has been removed from
    /// the hub.
    ConnectionFailed {
        connection_id: ConnectionId,
        error: String,
    },
    /// Some part of the connection state changed
    StateChanged {
        connection_id: ConnectionId,
        new_state: ConnectionInfo,
    },
}

impl ConnectionEvent {
    pub fn connection_id(&self) -> ConnectionId {
        match self {
            ConnectionEvent::HandshakeCompleted { connection_id, .. } => *connection_id,
            ConnectionEvent::ConnectionFailed { connection_id, .. } => *connection_id,
            ConnectionEvent::StateChanged { connection_id, .. } => *connection_id,
        }
    }
}
