use std::{
    collections::VecDeque,
    sync::{Arc, Mutex},
};

/// The transport contract: an ordered, framed, bidirectional byte channel
pub trait Transport {
    fn send(&mut self, msg: Vec<u8>) -> Result<(), TransportClosed>;
    /// The next frame from the other end, if one has arrived
    fn receive(&mut self) -> Option<Vec<u8>>;
    fn close(&mut self);
    fn is_closed(&self) -> bool;
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("transport is closed")]
pub struct TransportClosed;

#[derive(Debug, Default)]
struct Shared {
    // frames travelling towards each end, indexed by the receiving side
    queues: [VecDeque<Vec<u8>>; 2],
    closed: bool,
}

/// One end of an in-memory duplex channel
#[derive(Debug)]
pub struct InMemoryTransport {
    side: usize,
    shared: Arc<Mutex<Shared>>,
}

impl InMemoryTransport {
    pub fn pair() -> (InMemoryTransport, InMemoryTransport) {
        let shared = Arc::new(Mutex::new(Shared::default()));
        (
            InMemoryTransport {
                side: 0,
                shared: shared.clone(),
            },
            InMemoryTransport { side: 1, shared },
        )
    }
}

impl Transport for InMemoryTransport {
    fn send(&mut self, msg: Vec<u8>) -> Result<(), TransportClosed> {
        let mut shared = self.shared.lock().unwrap();
        if shared.closed {
            return Err(TransportClosed);
        }
        shared.queues[1 - self.side].push_back(msg);
        Ok(())
    }

    fn receive(&mut self) -> Option<Vec<u8>> {
        // frames already in flight are still delivered after a close
        self.shared.lock().unwrap().queues[self.side].pop_front()
    }

    fn close(&mut self) {
        self.shared.lock().unwrap().closed = true;
    }

    fn is_closed(&self) -> bool {
        self.shared.lock().unwrap().closed
    }
}
