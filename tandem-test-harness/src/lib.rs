//! A deterministic, in-process host for `tandem-core`.
//!
//! A [`Network`] owns any number of hubs, each with in-memory storage and a
//! set of [`InMemoryTransport`]s connecting it to other hubs. Hubs are
//! driven one after another until no hub has any work left, so tests see
//! the same interleaving on every run.
use std::collections::BTreeMap;

use tandem_core::{ConnectionId, HubConfig, network::ConnDirection};

mod doc_actor_runner;
mod hub_wrapper;
pub(crate) use hub_wrapper::HubWrapper;
mod node_id;
pub use node_id::NodeId;
mod peer_ref;
pub use peer_ref::PeerRef;
mod running_doc_ids;
pub use running_doc_ids::RunningDocIds;
mod storage;
pub use storage::{InMemoryStorage, Storage, dispatch_storage_task};
mod transport;
pub use transport::{InMemoryTransport, Transport, TransportClosed};

pub struct Network {
    hubs: BTreeMap<NodeId, HubWrapper>,
    connections: Vec<Connection>,
}

struct Connection {
    left_connection: ConnectionId,
    left_node: NodeId,
    right_connection: ConnectionId,
    right_node: NodeId,
}

pub struct Connected {
    pub left: ConnectionId,
    pub right: ConnectionId,
}

impl Default for Network {
    fn default() -> Self {
        Self::new()
    }
}

impl Network {
    pub fn new() -> Self {
        Network {
            hubs: BTreeMap::new(),
            connections: Vec::new(),
        }
    }

    pub fn create_peer<S: AsRef<str>>(&mut self, nickname: S) -> NodeId {
        self.create_peer_with(nickname, InMemoryStorage::new(), HubConfig::default())
    }

    pub fn create_peer_with_storage<S: AsRef<str>>(
        &mut self,
        nickname: S,
        storage: InMemoryStorage,
    ) -> NodeId {
        self.create_peer_with(nickname, storage, HubConfig::default())
    }

    pub fn create_peer_with(
        &mut self,
        nickname: impl AsRef<str>,
        storage: InMemoryStorage,
        config: HubConfig,
    ) -> NodeId {
        let wrapper = HubWrapper::new(nickname.as_ref().to_string(), storage, config);
        let id = NodeId::new();
        self.hubs.insert(id, wrapper);
        self.run_until_quiescent();
        id
    }

    /// Connect two hubs, `left` dialing `right`. The handshake only happens
    /// once the network runs.
    pub fn connect(&mut self, left: NodeId, right: NodeId) -> Connected {
        let (left_transport, right_transport) = InMemoryTransport::pair();
        let left_connection = self
            .wrapper_mut(&left)
            .create_connection(ConnDirection::Outgoing, left_transport);
        let right_connection = self
            .wrapper_mut(&right)
            .create_connection(ConnDirection::Incoming, right_transport);

        self.connections.push(Connection {
            left_connection,
            left_node: left,
            right_connection,
            right_node: right,
        });

        Connected {
            left: left_connection,
            right: right_connection,
        }
    }

    /// Sever the transport between two hubs as if the network failed. Both
    /// hubs find out when the network next runs.
    pub fn disconnect(&mut self, left: NodeId, right: NodeId) {
        let Some(index) = self.connections.iter().position(|c| {
            (c.left_node == left && c.right_node == right)
                || (c.left_node == right && c.right_node == left)
        }) else {
            return;
        };
        let connection = self.connections.remove(index);
        self.wrapper_mut(&connection.left_node)
            .close_transport(connection.left_connection);
        self.run_until_quiescent();
    }

    pub fn run_until_quiescent(&mut self) {
        loop {
            let mut progressed = false;
            for wrapper in self.hubs.values_mut() {
                progressed |= wrapper.pump_transports();
                progressed |= wrapper.handle_events();
            }
            if !progressed {
                break;
            }
        }
    }

    pub fn peer<'a>(&'a mut self, id: &'a NodeId) -> PeerRef<'a> {
        PeerRef {
            network: self,
            node_id: id,
        }
    }

    pub(crate) fn wrapper(&self, id: &NodeId) -> &HubWrapper {
        self.hubs
            .get(id)
            .unwrap_or_else(|| panic!("no hub with id {id:?}"))
    }

    pub(crate) fn wrapper_mut(&mut self, id: &NodeId) -> &mut HubWrapper {
        self.hubs
            .get_mut(id)
            .unwrap_or_else(|| panic!("no hub with id {id:?}"))
    }
}
