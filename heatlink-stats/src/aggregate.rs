use heatlink_core::CallType;

use crate::outcome::StatsOutcome;

/// Live aggregate over a source's outcomes for one [`CallType`] (§4.5).
///
/// `total_requests`/`error_count`/`total_duration_ms` reset to zero after
/// every successful flush; `success_rate`/`average_response_ms` are
/// therefore computed over the window since the last flush, not since
/// process start.
#[derive(Debug, Clone, Copy, Default)]
pub struct Aggregate {
    pub total_requests: u64,
    pub error_count: u64,
    pub total_duration_ms: u64,
    pub total_items: u64,
}

impl Aggregate {
    pub fn record(&mut self, outcome: &StatsOutcome) {
        self.total_requests += 1;
        self.total_duration_ms += outcome.duration_ms;
        self.total_items += outcome.item_count as u64;
        if !outcome.success {
            self.error_count += 1;
        }
    }

    pub fn success_rate(&self) -> f64 {
        if self.total_requests == 0 {
            return 1.0;
        }
        let successes = self.total_requests - self.error_count;
        successes as f64 / self.total_requests as f64
    }

    pub fn average_response_ms(&self) -> f64 {
        if self.total_requests == 0 {
            return 0.0;
        }
        self.total_duration_ms as f64 / self.total_requests as f64
    }

    fn reset(&mut self) {
        *self = Aggregate::default();
    }
}

/// Immutable snapshot published for readers: aggregates split by
/// [`CallType`], taken over the exact mean of the retained ring (§4.5).
#[derive(Debug, Clone, Copy, Default)]
pub struct AggregateSnapshot {
    pub internal: Aggregate,
    pub external: Aggregate,
}

impl AggregateSnapshot {
    pub fn record(&mut self, outcome: &StatsOutcome) {
        match outcome.api_call_type {
            CallType::Internal => self.internal.record(outcome),
            CallType::External => self.external.record(outcome),
        }
    }

    pub fn for_call_type(&self, call_type: CallType) -> &Aggregate {
        match call_type {
            CallType::Internal => &self.internal,
            CallType::External => &self.external,
        }
    }

    /// Resets the incremental counters after a successful flush. The ring
    /// buffer itself is untouched (§4.5).
    pub fn reset(&mut self) {
        self.internal.reset();
        self.external.reset();
    }
}
