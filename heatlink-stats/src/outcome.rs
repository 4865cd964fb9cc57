use chrono::{DateTime, Utc};
use heatlink_core::{CallType, CanonicalSourceId, ErrorKind};

/// One fetch attempt's result (§3.5).
///
/// `error_message` is pre-truncated to 512 bytes by the caller (usually via
/// [`crate::outcome::truncate_error_message`]) before it reaches the ring
/// buffer, so the collector never has to reason about arbitrarily long
/// adapter error text.
#[derive(Debug, Clone)]
pub struct StatsOutcome {
    pub source_id: CanonicalSourceId,
    pub started_at: DateTime<Utc>,
    pub duration_ms: u64,
    pub success: bool,
    pub item_count: usize,
    pub cache_used: bool,
    pub error_kind: Option<ErrorKind>,
    pub error_message: Option<String>,
    pub api_call_type: CallType,
}

/// Truncates `message` to at most 512 bytes, respecting UTF-8 boundaries.
pub fn truncate_error_message(message: &str) -> String {
    if message.len() <= 512 {
        return message.to_string();
    }
    let mut end = 512;
    while !message.is_char_boundary(end) {
        end -= 1;
    }
    message[..end].to_string()
}
