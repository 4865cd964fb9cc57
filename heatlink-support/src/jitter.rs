use std::fmt;
use std::sync::atomic::{AtomicI64, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use rand::Rng;

/// Source of uniform random jitter, used by the Adaptive Scheduler (startup
/// spread and ±10% backoff jitter) to avoid thundering-herd dispatch.
pub trait Jitter: Send + Sync + fmt::Debug {
    /// A uniformly distributed duration in `[0, max)`. Used for the scheduler's
    /// startup spread (`now + jitter(0, update_interval_ms)`).
    fn uniform(&self, max: Duration) -> Duration;

    /// A signed percentage in `[-pct, +pct]`, applied multiplicatively to a base
    /// duration. Used for the scheduler's ±10% backoff jitter.
    fn signed_pct(&self, pct: f64) -> f64;
}

/// Production [`Jitter`] backed by the thread-local RNG.
#[derive(Clone, Default)]
pub struct SystemJitter;

impl fmt::Debug for SystemJitter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SystemJitter").finish()
    }
}

impl Jitter for SystemJitter {
    fn uniform(&self, max: Duration) -> Duration {
        if max.is_zero() {
            return Duration::ZERO;
        }
        let millis = max.as_millis().max(1) as u64;
        Duration::from_millis(rand::thread_rng().gen_range(0..millis))
    }

    fn signed_pct(&self, pct: f64) -> f64 {
        if pct <= 0.0 {
            return 0.0;
        }
        rand::thread_rng().gen_range(-pct..=pct)
    }
}

/// Deterministic [`Jitter`] for tests.
///
/// Returns a fixed fraction of the requested range on every call by default
/// (`uniform(max) == max * fixed_fraction`, `signed_pct(pct) == pct * fixed_fraction`),
/// or replays a scripted sequence of fractions in `[-1.0, 1.0]` when one is
/// supplied via [`TestJitter::scripted`].
pub struct TestJitter {
    fixed_fraction: f64,
    script: Option<Arc<Vec<f64>>>,
    cursor: AtomicUsize,
    last_signed_millionths: AtomicI64,
}

impl TestJitter {
    /// A jitter source that always returns zero (useful when a test wants
    /// fully deterministic deadlines).
    pub fn zero() -> Self {
        Self::fixed(0.0)
    }

    /// A jitter source that always scales by the same fraction of the
    /// requested range, in `[-1.0, 1.0]` for `signed_pct` or `[0.0, 1.0]` for
    /// `uniform`.
    pub fn fixed(fraction: f64) -> Self {
        Self {
            fixed_fraction: fraction,
            script: None,
            cursor: AtomicUsize::new(0),
            last_signed_millionths: AtomicI64::new(0),
        }
    }

    /// A jitter source that replays `fractions` round-robin, one per call.
    pub fn scripted(fractions: Vec<f64>) -> Self {
        Self {
            fixed_fraction: 0.0,
            script: Some(Arc::new(fractions)),
            cursor: AtomicUsize::new(0),
            last_signed_millionths: AtomicI64::new(0),
        }
    }

    fn next_fraction(&self) -> f64 {
        match &self.script {
            Some(fractions) if !fractions.is_empty() => {
                let idx = self.cursor.fetch_add(1, Ordering::SeqCst) % fractions.len();
                fractions[idx]
            }
            _ => self.fixed_fraction,
        }
    }
}

impl fmt::Debug for TestJitter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TestJitter")
            .field("fixed_fraction", &self.fixed_fraction)
            .field("scripted", &self.script.is_some())
            .finish()
    }
}

impl Jitter for TestJitter {
    fn uniform(&self, max: Duration) -> Duration {
        let fraction = self.next_fraction().clamp(0.0, 1.0);
        Duration::from_secs_f64(max.as_secs_f64() * fraction)
    }

    fn signed_pct(&self, pct: f64) -> f64 {
        let fraction = self.next_fraction().clamp(-1.0, 1.0);
        let value = pct * fraction;
        self.last_signed_millionths
            .store((value * 1_000_000.0) as i64, Ordering::SeqCst);
        value
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fixed_jitter_scales_uniform_range() {
        let jitter = TestJitter::fixed(0.5);
        assert_eq!(jitter.uniform(Duration::from_secs(10)), Duration::from_secs(5));
    }

    #[test]
    fn zero_jitter_never_perturbs() {
        let jitter = TestJitter::zero();
        assert_eq!(jitter.uniform(Duration::from_secs(10)), Duration::ZERO);
        assert_eq!(jitter.signed_pct(0.1), 0.0);
    }

    #[test]
    fn scripted_jitter_round_robins() {
        let jitter = TestJitter::scripted(vec![1.0, -1.0]);
        assert_eq!(jitter.signed_pct(0.1), 0.1);
        assert_eq!(jitter.signed_pct(0.1), -0.1);
        assert_eq!(jitter.signed_pct(0.1), 0.1);
    }
}
