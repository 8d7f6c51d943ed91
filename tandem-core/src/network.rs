//! Types describing connections to remote peers and the frames exchanged
//! over them.
mod conn_direction;
mod connection_event;
mod connection_id;
mod connection_info;
mod peer_info;
mod peer_metadata;
pub(crate) mod wire_protocol;

pub use conn_direction::ConnDirection;
pub use connection_event::ConnectionEvent;
pub use connection_id::ConnectionId;
pub use connection_info::{ConnectionInfo, ConnectionState, PeerDocState};
pub use peer_info::PeerInfo;
pub use peer_metadata::PeerMetadata;
