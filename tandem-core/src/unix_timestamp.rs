use std::{
    ops::{Add, Sub},
    time::{Duration, SystemTime, UNIX_EPOCH},
};

/// Milliseconds since the unix epoch.
///
/// The core never reads the clock itself; every entry point takes a `now`
/// supplied by the host. [`UnixTimestamp::now`] is a convenience for hosts.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct UnixTimestamp {
    millis: u64,
}

impl std::fmt::Display for UnixTimestamp {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.millis)
    }
}

impl std::fmt::Debug for UnixTimestamp {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.millis)
    }
}

impl UnixTimestamp {
    pub fn now() -> Self {
        let millis = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_millis() as u64)
            .unwrap_or(0);
        Self { millis }
    }

    pub fn from_millis(millis: u64) -> Self {
        Self { millis }
    }

    pub fn as_millis(&self) -> u64 {
        self.millis
    }

    /// The time elapsed since `earlier`, zero if `earlier` is in the future
    pub fn saturating_duration_since(&self, earlier: UnixTimestamp) -> Duration {
        Duration::from_millis(self.millis.saturating_sub(earlier.millis))
    }
}

impl Add<Duration> for UnixTimestamp {
    type Output = Self;

    fn add(self, rhs: Duration) -> Self::Output {
        Self {
            millis: self.millis + rhs.as_millis() as u64,
        }
    }
}

impl Sub<UnixTimestamp> for UnixTimestamp {
    type Output = Duration;

    fn sub(self, rhs: Self) -> Self::Output {
        self.saturating_duration_since(rhs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn arithmetic() {
        let start = UnixTimestamp::from_millis(1_000);
        let later = start + Duration::from_secs(2);
        assert_eq!(later.as_millis(), 3_000);
        assert_eq!(later - start, Duration::from_secs(2));
        assert!(later > start);
    }

    #[test]
    fn going_backwards_saturates_to_zero() {
        let start = UnixTimestamp::from_millis(1_000);
        let earlier = UnixTimestamp::from_millis(400);
        assert_eq!(earlier - start, Duration::ZERO);
        assert_eq!(earlier.saturating_duration_since(start), Duration::ZERO);
        assert_eq!(start.saturating_duration_since(earlier), Duration::from_millis(600));
    }
}
