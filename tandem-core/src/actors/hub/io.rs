//! The I/O a hub delegates to its host.
use crate::ConnectionId;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HubIoAction {
    /// Send these bytes, in order, on the connection
    Send {
        connection_id: ConnectionId,
        msg: Vec<u8>,
    },
    /// Close the transport underlying the connection. The hub has already
    /// forgotten about the connection.
    Disconnect { connection_id: ConnectionId },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HubIoResult {
    Send,
    Disconnect,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HubIoKind {
    Send,
    Disconnect,
}

impl HubIoAction {
    pub fn kind(&self) -> HubIoKind {
        match self {
            HubIoAction::Send { .. } => HubIoKind::Send,
            HubIoAction::Disconnect { .. } => HubIoKind::Disconnect,
        }
    }

    pub fn connection_id(&self) -> ConnectionId {
        match self {
            HubIoAction::Send { connection_id, .. } => *connection_id,
            HubIoAction::Disconnect { connection_id } => *connection_id,
        }
    }
}

impl HubIoResult {
    pub fn kind(&self) -> HubIoKind {
        match self {
            HubIoResult::Send => HubIoKind::Send,
            HubIoResult::Disconnect => HubIoKind::Disconnect,
        }
    }
}
