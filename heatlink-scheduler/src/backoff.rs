use std::time::Duration;

use heatlink_support::Jitter;

/// Lower clamp on any computed interval, regardless of `base` (§4.6).
pub const MIN_INTERVAL_MS: u64 = 60_000;
/// Upper clamp on any computed interval, regardless of `base` (§4.6).
pub const MAX_INTERVAL_MS: u64 = 3_600_000;
/// How far the exponential error backoff is allowed to multiply `base`.
const MAX_BACKOFF_MULTIPLE: u64 = 8;

/// How the freshness factor should treat a completed fetch (§4.6
/// `factor_quiet`).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Freshness {
    /// The fetch failed; freshness does not apply (only `factor_err` does).
    Failed,
    /// Succeeded with `new_item_count` items not previously seen in cache.
    Succeeded { new_item_count: u64 },
}

/// Inputs to one backoff computation (§4.6).
#[derive(Debug, Clone, Copy)]
pub struct BackoffInput {
    /// The source's configured `update_interval_ms` (the backoff `base`).
    pub base_ms: u64,
    /// Consecutive failures *including* the outcome just recorded.
    pub consecutive_failures: u32,
    /// How long the fetch that just completed took.
    pub duration_ms: u64,
    pub freshness: Freshness,
}

/// Computes the exponential error-backoff factor: `2^min(5, e)`, capped at
/// 32x (§4.6).
pub fn factor_err(consecutive_failures: u32) -> f64 {
    let eb = consecutive_failures.min(5);
    2f64.powi(eb as i32)
}

/// Penalizes slow sources up to 3x (§4.6).
pub fn factor_slow(duration_ms: u64) -> f64 {
    let over = (duration_ms as f64 - 1_000.0) / 10_000.0;
    1.0 + over.clamp(0.0, 2.0)
}

/// Rewards sources that keep producing fresh items (§4.6).
pub fn factor_quiet(freshness: Freshness) -> f64 {
    match freshness {
        Freshness::Failed => 1.0,
        Freshness::Succeeded { new_item_count } => match new_item_count {
            0 => 2.0,
            1..=4 => 1.5,
            _ => 1.0,
        },
    }
}

/// Computes the next fetch interval after an outcome, clamped to
/// `[base, 8*base]` and further to `[60_000, 3_600_000]` ms, with ±10%
/// jitter applied (§4.6).
pub fn next_interval(input: BackoffInput, jitter: &dyn Jitter) -> Duration {
    let base = input.base_ms as f64;
    let raw = base * factor_err(input.consecutive_failures) * factor_slow(input.duration_ms)
        * factor_quiet(input.freshness);

    let clamped_to_multiple = raw.clamp(base, base * MAX_BACKOFF_MULTIPLE as f64);
    let clamped = clamped_to_multiple.clamp(MIN_INTERVAL_MS as f64, MAX_INTERVAL_MS as f64);

    let jittered_pct = jitter.signed_pct(0.10);
    let jittered = clamped * (1.0 + jittered_pct);
    Duration::from_millis(jittered.max(0.0).round() as u64)
}

/// The startup spread applied to a freshly-registered source's first
/// `next_due_at`: `now + jitter(0, update_interval_ms)` (§4.6).
pub fn startup_spread(update_interval_ms: u64, jitter: &dyn Jitter) -> Duration {
    jitter.uniform(Duration::from_millis(update_interval_ms))
}

#[cfg(test)]
mod tests {
    use super::*;
    use heatlink_support::TestJitter;

    fn input(base_ms: u64, failures: u32, duration_ms: u64, freshness: Freshness) -> BackoffInput {
        BackoffInput {
            base_ms,
            consecutive_failures: failures,
            duration_ms,
            freshness,
        }
    }

    #[test]
    fn healthy_fast_source_holds_base_interval() {
        let jitter = TestJitter::zero();
        let interval = next_interval(
            input(60_000, 0, 500, Freshness::Succeeded { new_item_count: 10 }),
            &jitter,
        );
        assert_eq!(interval, Duration::from_millis(60_000));
    }

    #[test]
    fn consecutive_failures_back_off_exponentially_capped_at_32x() {
        let jitter = TestJitter::zero();
        let at_cap = next_interval(input(60_000, 5, 500, Freshness::Failed), &jitter);
        let beyond_cap = next_interval(input(60_000, 9, 500, Freshness::Failed), &jitter);
        // Both saturate to the 8x-of-base ceiling (480_000ms), since 32x base
        // already exceeds it.
        assert_eq!(at_cap, Duration::from_millis(480_000));
        assert_eq!(at_cap, beyond_cap);
    }

    #[test]
    fn slow_fetch_extends_interval_up_to_3x() {
        let jitter = TestJitter::zero();
        let interval = next_interval(
            input(60_000, 0, 21_000, Freshness::Succeeded { new_item_count: 10 }),
            &jitter,
        );
        assert_eq!(interval, Duration::from_millis(180_000));
    }

    #[test]
    fn quiet_source_stretches_interval() {
        let jitter = TestJitter::zero();
        let interval = next_interval(
            input(60_000, 0, 500, Freshness::Succeeded { new_item_count: 0 }),
            &jitter,
        );
        assert_eq!(interval, Duration::from_millis(120_000));
    }

    #[test]
    fn global_floor_and_ceiling_are_enforced() {
        let jitter = TestJitter::zero();
        let tiny_base = next_interval(input(1_000, 0, 500, Freshness::Succeeded { new_item_count: 10 }), &jitter);
        assert_eq!(tiny_base, Duration::from_millis(MIN_INTERVAL_MS));

        let huge_base =
            next_interval(input(10_000_000, 9, 30_000, Freshness::Failed), &jitter);
        assert_eq!(huge_base, Duration::from_millis(MAX_INTERVAL_MS));
    }

    #[test]
    fn jitter_is_applied_within_ten_percent() {
        let jitter = TestJitter::fixed(1.0);
        let interval = next_interval(
            input(60_000, 0, 500, Freshness::Succeeded { new_item_count: 10 }),
            &jitter,
        );
        assert_eq!(interval, Duration::from_millis(66_000));
    }
}
