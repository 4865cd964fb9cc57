use std::time::Duration;

/// A monotonic timestamp, expressed as milliseconds since an implementation-defined
/// epoch (process start for [`crate::SystemClock`], an arbitrary base for
/// [`crate::TestClock`]).
///
/// Only ever compared or subtracted against another `Monotonic` produced by the
/// same [`crate::Clock`] instance. Never serialized to the Stats Sink directly —
/// wall-clock [`chrono::DateTime<chrono::Utc>`] is used for anything that crosses
/// a process boundary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Monotonic(u64);

impl Monotonic {
    /// Construct a `Monotonic` from a raw millisecond count. Exposed for [`Clock`](crate::Clock)
    /// implementations; application code should obtain instances from `Clock::now`.
    pub fn from_millis(millis: u64) -> Self {
        Self(millis)
    }

    /// Milliseconds since the clock's epoch.
    pub fn as_millis(&self) -> u64 {
        self.0
    }

    /// Duration elapsed since `earlier`, saturating at zero if `earlier` is later.
    pub fn saturating_duration_since(&self, earlier: Monotonic) -> Duration {
        Duration::from_millis(self.0.saturating_sub(earlier.0))
    }

    /// `self + duration`, saturating at `u64::MAX` milliseconds.
    pub fn saturating_add(&self, duration: Duration) -> Monotonic {
        Monotonic(self.0.saturating_add(duration.as_millis() as u64))
    }

    /// `true` if `self` is at or before `deadline`.
    pub fn has_reached(&self, deadline: Monotonic) -> bool {
        *self >= deadline
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn duration_since_saturates_at_zero() {
        let earlier = Monotonic::from_millis(100);
        let later = Monotonic::from_millis(50);
        assert_eq!(later.saturating_duration_since(earlier), Duration::ZERO);
    }

    #[test]
    fn add_and_has_reached() {
        let t0 = Monotonic::from_millis(1_000);
        let t1 = t0.saturating_add(Duration::from_millis(500));
        assert_eq!(t1.as_millis(), 1_500);
        assert!(t1.has_reached(t0));
        assert!(!t0.has_reached(t1));
    }
}
