use std::sync::atomic::{AtomicU32, Ordering};

static LAST_CONNECTION_ID: AtomicU32 = AtomicU32::new(0);

/// Identifies a connection to a remote peer. Allocated by the hub when a
/// connection is created.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ConnectionId(u32);

impl ConnectionId {
    pub(crate) fn new() -> Self {
        ConnectionId(LAST_CONNECTION_ID.fetch_add(1, Ordering::SeqCst))
    }
}

impl std::fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<ConnectionId> for u32 {
    fn from(id: ConnectionId) -> Self {
        id.0
    }
}

impl From<u32> for ConnectionId {
    fn from(id: u32) -> Self {
        ConnectionId(id)
    }
}
