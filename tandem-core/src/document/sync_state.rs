use automerge::sync;

use super::{DocError, Document};

/// Our knowledge of what a single remote peer has of a [`Document`]
#[derive(Debug, Clone)]
pub struct SyncState(sync::State);

impl Default for SyncState {
    fn default() -> Self {
        Self::new()
    }
}

impl SyncState {
    pub fn new() -> Self {
        Self(sync::State::new())
    }

    /// Serialize the parts of the state worth keeping across sessions
    pub fn encode(&self) -> Vec<u8> {
        self.0.encode()
    }

    pub fn decode(bytes: &[u8]) -> Result<Self, DocError> {
        sync::State::decode(bytes)
            .map(Self)
            .map_err(|e| DocError::InvalidSyncState(e.to_string()))
    }

    /// Whether the heads we share with the peer are exactly the heads of
    /// `doc`, in any order
    pub fn is_in_sync(&self, doc: &mut Document) -> bool {
        let mut ours = doc.get_heads();
        let mut shared = self.0.shared_heads.clone();
        ours.sort();
        shared.sort();
        ours == shared
    }

    pub(super) fn inner_mut(&mut self) -> &mut sync::State {
        &mut self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn encode_then_decode_is_still_usable() {
        let state = SyncState::new();
        let decoded = SyncState::decode(&state.encode()).unwrap();
        let mut doc = Document::new();
        assert!(decoded.is_in_sync(&mut doc));
    }

    #[test]
    fn decode_rejects_garbage() {
        assert!(matches!(
            SyncState::decode(&[0xff, 0x01]),
            Err(DocError::InvalidSyncState(_))
        ));
    }
}
