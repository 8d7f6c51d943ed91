use futures::Future;

use crate::{
    ConnectionId,
    actors::{
        driver::ActorIo,
        hub::{
            Hub,
            io::{HubIoAction, HubIoResult},
        },
    },
};

#[derive(Clone)]
pub(crate) struct IoAccess {
    io: ActorIo<Hub>,
}

impl IoAccess {
    pub(crate) fn new(io: ActorIo<Hub>) -> Self {
        IoAccess { io }
    }

    pub(crate) fn send(&self, connection_id: ConnectionId, msg: Vec<u8>) {
        self.io
            .fire_and_forget_io(HubIoAction::Send { connection_id, msg });
    }

    /// Resolves once the host reports the transport closed
    pub(crate) fn disconnect(
        &self,
        connection_id: ConnectionId,
    ) -> impl Future<Output = ()> + 'static {
        let result = self
            .io
            .perform_io(HubIoAction::Disconnect { connection_id });
        async move {
            // The driver only accepts a Disconnect result for this task
            let HubIoResult::Disconnect = result.await else {
                unreachable!("result kind is checked by the driver");
            };
        }
    }
}
