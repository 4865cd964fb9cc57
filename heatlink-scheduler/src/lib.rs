//! Adaptive per-source fetch scheduler (§4.6).
//!
//! [`Scheduler`] owns only the due-time bookkeeping — actual fetches are
//! delegated to a [`Dispatcher`] supplied at construction, keeping this
//! crate free of any registry, cache or HTTP dependency.

mod backoff;
mod dispatch;
mod entry;
mod scheduler;

pub use backoff::{factor_err, factor_quiet, factor_slow, next_interval, startup_spread, BackoffInput, Freshness, MAX_INTERVAL_MS, MIN_INTERVAL_MS};
pub use dispatch::{DispatchOutcome, Dispatcher};
pub use entry::ScheduleEntry;
pub use scheduler::{Scheduler, DEFAULT_CONCURRENCY, TICK_INTERVAL};
