use std::collections::HashMap;

use base64::Engine;
use minicbor::{Decoder, decode};
use rand::Rng;

use crate::{
    PeerId,
    codec::{self, CborEncoder, EncodeError},
};

/// An ephemeral message received from (or forwarded on behalf of) a peer.
///
/// Ephemeral messages are never stored. They are identified by the sending
/// peer, the sender's session and a counter which increases with every
/// message in the session, which is how duplicates arriving over several
/// gossip paths are recognised.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct EphemeralMessage {
    pub(crate) sender_id: PeerId,
    pub(crate) session_id: String,
    pub(crate) count: u64,
    pub(crate) data: Vec<u8>,
}

impl EphemeralMessage {
    pub(crate) fn encode(&self, e: &mut CborEncoder) -> Result<(), EncodeError> {
        e.array(4)?
            .str(self.sender_id.as_str())?
            .str(&self.session_id)?
            .u64(self.count)?
            .bytes(&self.data)?;
        Ok(())
    }

    pub(crate) fn decode(d: &mut Decoder<'_>) -> Result<Self, decode::Error> {
        codec::expect_array(d, 4)?;
        Ok(EphemeralMessage {
            sender_id: codec::decode_peer_id(d)?,
            session_id: d.str()?.to_string(),
            count: d.u64()?,
            data: d.bytes()?.to_vec(),
        })
    }
}

pub(crate) struct OutgoingSessionDetails {
    pub(crate) session_id: String,
    pub(crate) counter: u64,
}

/// Our own ephemeral session plus the high water mark of the latest session
/// of every peer we have heard from.
///
/// Only one session is remembered per peer. A peer which restarts gets a new
/// session id and its old session is forgotten.
pub(crate) struct EphemeralSession {
    session_id: String,
    counter: u64,
    last_seen: HashMap<PeerId, (String, u64)>,
}

impl EphemeralSession {
    pub(crate) fn new<R: Rng>(rng: &mut R) -> Self {
        let bytes: [u8; 8] = rng.random();
        Self {
            session_id: base64::engine::general_purpose::URL_SAFE_NO_PAD.encode(bytes),
            counter: 0,
            last_seen: HashMap::new(),
        }
    }

    pub(crate) fn next_message_session_details(&mut self) -> OutgoingSessionDetails {
        self.counter += 1;
        OutgoingSessionDetails {
            session_id: self.session_id.clone(),
            counter: self.counter,
        }
    }

    /// Whether this message has not been seen before. Records it if so.
    pub(crate) fn receive(&mut self, sender_id: &PeerId, session_id: &str, count: u64) -> bool {
        if let Some((session, last)) = self.last_seen.get(sender_id) {
            if session == session_id && *last >= count {
                return false;
            }
        }
        self.last_seen
            .insert(sender_id.clone(), (session_id.to_string(), count));
        true
    }

    /// Drop everything we know about `peer_id`'s sessions.
    pub(crate) fn forget_peer(&mut self, peer_id: &PeerId) {
        self.last_seen.remove(peer_id);
    }

    #[cfg(test)]
    fn tracked_peers(&self) -> usize {
        self.last_seen.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;

    #[test]
    fn duplicates_and_stale_messages_are_dropped() {
        let mut session = EphemeralSession::new(&mut rand::rngs::StdRng::seed_from_u64(0));
        let alice: PeerId = "alice".parse().unwrap();
        assert!(session.receive(&alice, "s1", 1));
        assert!(!session.receive(&alice, "s1", 1));
        assert!(session.receive(&alice, "s1", 3));
        assert!(!session.receive(&alice, "s1", 2));
        // A new session starts its own count
        assert!(session.receive(&alice, "s2", 1));
        assert!(!session.receive(&alice, "s2", 1));
    }

    #[test]
    fn one_session_is_kept_per_peer() {
        let mut session = EphemeralSession::new(&mut rand::rngs::StdRng::seed_from_u64(0));
        let alice: PeerId = "alice".parse().unwrap();
        for n in 0..100 {
            assert!(session.receive(&alice, &format!("session-{n}"), 1));
        }
        assert_eq!(session.tracked_peers(), 1);
    }

    #[test]
    fn forgotten_peers_are_accepted_again() {
        let mut session = EphemeralSession::new(&mut rand::rngs::StdRng::seed_from_u64(0));
        let alice: PeerId = "alice".parse().unwrap();
        let bob: PeerId = "bob".parse().unwrap();
        assert!(session.receive(&alice, "s1", 5));
        assert!(session.receive(&bob, "s1", 5));
        session.forget_peer(&alice);
        assert_eq!(session.tracked_peers(), 1);
        assert!(session.receive(&alice, "s1", 5));
        assert!(!session.receive(&bob, "s1", 5));
    }

    #[test]
    fn outgoing_counter_increases() {
        let mut session = EphemeralSession::new(&mut rand::rngs::StdRng::seed_from_u64(0));
        let first = session.next_message_session_details();
        let second = session.next_message_session_details();
        assert_eq!(first.session_id, second.session_id);
        assert!(second.counter > first.counter);
    }
}
