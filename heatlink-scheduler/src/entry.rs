use heatlink_core::{CanonicalSourceId, SourceDescriptor};
use heatlink_support::Monotonic;

/// Per-source scheduling state (§4.6).
#[derive(Debug, Clone)]
pub struct ScheduleEntry {
    pub source_id: CanonicalSourceId,
    pub priority: i32,
    pub update_interval_ms: u64,
    pub adaptive_enabled: bool,
    pub next_due_at: Monotonic,
    pub consecutive_failures: u32,
}

impl ScheduleEntry {
    pub fn new(descriptor: &SourceDescriptor, next_due_at: Monotonic) -> Self {
        Self {
            source_id: descriptor.source_id().clone(),
            priority: descriptor.priority,
            update_interval_ms: descriptor.update_interval_ms,
            adaptive_enabled: descriptor.adaptive_enabled,
            next_due_at,
            consecutive_failures: 0,
        }
    }

    pub fn is_due(&self, now: Monotonic) -> bool {
        self.adaptive_enabled && self.next_due_at <= now
    }
}
