use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Instant;

use chrono::{DateTime, Utc};

use crate::monotonic::Monotonic;

/// Source of monotonic and wall-clock time.
///
/// Implementations must be cheap to call (no I/O) and safe to share across
/// tasks; the engine clones a `Clock` into every component that needs to
/// reason about deadlines.
pub trait Clock: Send + Sync + fmt::Debug {
    /// Monotonic "now", used for cache freshness and scheduler deadlines.
    /// Never goes backwards for a given `Clock` instance.
    fn now(&self) -> Monotonic;

    /// Wall-clock "now", used for anything recorded to the Stats Sink or
    /// stamped onto a `NewsItem`.
    fn utc_now(&self) -> DateTime<Utc>;
}

/// Production [`Clock`] backed by [`std::time::Instant`] and [`chrono::Utc`].
#[derive(Clone)]
pub struct SystemClock {
    start: Instant,
}

impl SystemClock {
    pub fn new() -> Self {
        Self {
            start: Instant::now(),
        }
    }
}

impl Default for SystemClock {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for SystemClock {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SystemClock").finish_non_exhaustive()
    }
}

impl Clock for SystemClock {
    fn now(&self) -> Monotonic {
        Monotonic::from_millis(self.start.elapsed().as_millis() as u64)
    }

    fn utc_now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Deterministic [`Clock`] for tests. Time only moves when [`TestClock::advance`]
/// is called; nothing in the engine reads the system clock directly.
#[derive(Clone)]
pub struct TestClock {
    millis: Arc<AtomicU64>,
    epoch: DateTime<Utc>,
}

impl TestClock {
    /// Create a clock starting at monotonic 0 and the given wall-clock epoch.
    pub fn new(epoch: DateTime<Utc>) -> Self {
        Self {
            millis: Arc::new(AtomicU64::new(0)),
            epoch,
        }
    }

    /// Advance both the monotonic and wall clocks by `duration`.
    pub fn advance(&self, duration: std::time::Duration) {
        self.millis
            .fetch_add(duration.as_millis() as u64, Ordering::SeqCst);
    }

    /// Set the monotonic clock to an absolute millisecond value.
    pub fn set_millis(&self, millis: u64) {
        self.millis.store(millis, Ordering::SeqCst);
    }
}

impl fmt::Debug for TestClock {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TestClock")
            .field("millis", &self.millis.load(Ordering::SeqCst))
            .finish()
    }
}

impl Clock for TestClock {
    fn now(&self) -> Monotonic {
        Monotonic::from_millis(self.millis.load(Ordering::SeqCst))
    }

    fn utc_now(&self) -> DateTime<Utc> {
        self.epoch + chrono::Duration::milliseconds(self.millis.load(Ordering::SeqCst) as i64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_clock_advances_both_clocks_together() {
        let epoch = DateTime::parse_from_rfc3339("2026-01-01T00:00:00Z")
            .unwrap()
            .with_timezone(&Utc);
        let clock = TestClock::new(epoch);
        assert_eq!(clock.now().as_millis(), 0);
        assert_eq!(clock.utc_now(), epoch);

        clock.advance(Duration::from_secs(5));
        assert_eq!(clock.now().as_millis(), 5_000);
        assert_eq!(clock.utc_now(), epoch + chrono::Duration::seconds(5));
    }

    #[test]
    fn system_clock_is_monotonic() {
        let clock = SystemClock::new();
        let a = clock.now();
        let b = clock.now();
        assert!(b >= a);
    }
}
