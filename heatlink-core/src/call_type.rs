use serde::{Deserialize, Serialize};

/// Whether a fetch was initiated by the background scheduler or in
/// response to a caller (§3.7).
///
/// Kept distinct from `StatsOutcome` so every layer that cares about the
/// distinction — the cache, the stats collector, the emitter — can tag
/// with it without depending on `heatlink-stats`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CallType {
    /// Initiated by the Adaptive Scheduler (§4.8).
    Internal,
    /// Initiated in response to a `GetNews` caller (§4.9... see §4.7).
    External,
}

impl CallType {
    pub fn as_str(&self) -> &'static str {
        match self {
            CallType::Internal => "internal",
            CallType::External => "external",
        }
    }
}

impl std::fmt::Display for CallType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
