use std::time::{Duration, Instant};

/// Absolute point in time bounding a polling loop.
///
/// Created when a logical wait begins and never renewed mid-wait.
#[derive(Debug, Clone, Copy)]
pub struct Deadline {
    started: Instant,
    at: Instant,
}

impl Deadline {
    pub fn after(timeout: Duration) -> Self {
        let started = Instant::now();
        Self {
            started,
            at: started + timeout,
        }
    }

    pub fn has_expired(&self) -> bool {
        Instant::now() >= self.at
    }

    /// Time left before expiry, zero once expired.
    pub fn remaining(&self) -> Duration {
        self.at.saturating_duration_since(Instant::now())
    }

    pub fn elapsed(&self) -> Duration {
        self.started.elapsed()
    }

    /// The timeout this deadline was created with.
    pub fn timeout(&self) -> Duration {
        self.at.duration_since(self.started)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_zero_timeout_is_already_expired() {
        let d = Deadline::after(Duration::ZERO);
        assert!(d.has_expired());
        assert_eq!(d.remaining(), Duration::ZERO);
    }

    #[test]
    fn test_remaining_never_exceeds_timeout() {
        let d = Deadline::after(Duration::from_secs(5));
        assert!(!d.has_expired());
        assert!(d.remaining() <= Duration::from_secs(5));
        assert_eq!(d.timeout(), Duration::from_secs(5));
    }
}
