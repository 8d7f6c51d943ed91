use std::time::Duration;

/// Settings for a [`Hub`](super::Hub), passed to
/// [`Loader::with_config`](crate::Loader::with_config).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HubConfig {
    /// Connections which have not completed the handshake this long after
    /// being created are failed on the next tick
    pub handshake_timeout: Duration,
    /// Advertised to remote peers during the handshake. An ephemeral peer
    /// does not expect to reconnect with the same storage
    pub is_ephemeral: bool,
}

impl Default for HubConfig {
    fn default() -> Self {
        Self {
            handshake_timeout: Duration::from_secs(30),
            is_ephemeral: false,
        }
    }
}
