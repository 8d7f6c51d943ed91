use std::str::FromStr;

use base64::Engine;
use rand::Rng;

/// The identity of a peer, chosen by the host.
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord, serde::Serialize, serde::Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct PeerId(String);

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PeerIdError {
    #[error("peer ids must not be empty")]
    Empty,
}

impl PeerId {
    /// A random peer id, for hosts which have no stable identity
    pub fn new_with_rng<R: Rng>(rng: &mut R) -> Self {
        let bytes: [u8; 16] = rng.random();
        PeerId(format!(
            "peer-{}",
            base64::engine::general_purpose::URL_SAFE_NO_PAD.encode(bytes)
        ))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl FromStr for PeerId {
    type Err = PeerIdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.is_empty() {
            return Err(PeerIdError::Empty);
        }
        Ok(PeerId(s.to_string()))
    }
}

impl TryFrom<String> for PeerId {
    type Error = PeerIdError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        if value.is_empty() {
            return Err(PeerIdError::Empty);
        }
        Ok(PeerId(value))
    }
}

impl TryFrom<&str> for PeerId {
    type Error = PeerIdError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<PeerId> for String {
    fn from(id: PeerId) -> Self {
        id.0
    }
}

impl std::fmt::Display for PeerId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl std::fmt::Debug for PeerId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "PeerId({})", self.0)
    }
}

#[cfg(test)]
mod tests {
    use rand::SeedableRng;

    use super::*;

    #[test]
    fn random_ids_differ_and_parse_back() {
        let mut rng = rand::rngs::StdRng::seed_from_u64(7);
        let first = PeerId::new_with_rng(&mut rng);
        let second = PeerId::new_with_rng(&mut rng);
        assert_ne!(first, second);
        assert_eq!(first.as_str().parse::<PeerId>().unwrap(), first);
    }

    #[test]
    fn empty_id_is_rejected() {
        assert_eq!("".parse::<PeerId>(), Err(PeerIdError::Empty));
    }
}
