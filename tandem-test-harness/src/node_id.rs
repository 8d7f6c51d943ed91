use std::sync::atomic::{AtomicU32, Ordering};

static LAST_NODE_ID: AtomicU32 = AtomicU32::new(0);

/// Identifies a hub within a [`Network`](crate::Network)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(u32);

impl NodeId {
    pub(crate) fn new() -> Self {
        NodeId(LAST_NODE_ID.fetch_add(1, Ordering::SeqCst))
    }
}
