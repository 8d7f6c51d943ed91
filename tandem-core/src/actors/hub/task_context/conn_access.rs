use std::sync::{Arc, Mutex};

use crate::{
    ConnectionId, UnixTimestamp,
    actors::hub::{
        State,
        connection::{ConnectionError, ReceiveEvent},
    },
    network::wire_protocol::WireMessage,
};

use super::IoAccess;

/// Scoped access to one connection, the lock is only held for the
/// duration of each call
pub(crate) struct ConnectionAccess<'a> {
    pub(super) now: UnixTimestamp,
    pub(super) io: IoAccess,
    pub(super) state: &'a Arc<Mutex<State>>,
    pub(super) conn_id: ConnectionId,
}

impl ConnectionAccess<'_> {
    /// Returns `None` if the connection was removed in the meantime
    pub(crate) fn receive(
        &self,
        msg: WireMessage,
    ) -> Option<Result<Vec<ReceiveEvent>, ConnectionError>> {
        let mut state = self.state.lock().unwrap();
        let conn = state.get_connection_mut(&self.conn_id)?;
        Some(conn.receive_msg(&self.io, self.now, msg))
    }

    pub(crate) fn send(&self, msg: WireMessage) {
        let mut state = self.state.lock().unwrap();
        if let Some(conn) = state.get_connection_mut(&self.conn_id) {
            conn.send(&self.io, self.now, msg);
        }
    }
}
