//! Injectable time and jitter primitives.
//!
//! Every component in the fetch engine that reasons about deadlines,
//! cache freshness, or scheduling backoff reads time through a [`Clock`]
//! and draws randomness through a [`Jitter`] rather than calling
//! `Instant::now()` / `rand::random()` directly. Production code uses
//! [`SystemClock`] and [`SystemJitter`]; tests use [`TestClock`] and
//! [`TestJitter`] to make otherwise-flaky timing behavior deterministic.

mod clock;
mod jitter;
mod monotonic;

pub use clock::{Clock, SystemClock, TestClock};
pub use jitter::{Jitter, SystemJitter, TestJitter};
pub use monotonic::Monotonic;
