//! Shared test doubles for the HeatLink fetch engine crates (§13).
//!
//! Mirrors the teacher's own `-test` crate: an injectable [`Clock`] (via
//! `heatlink-support`'s [`TestClock`]), a scriptable [`Adapter`] stub that
//! can be told to sleep/fail/return N items on the Nth call, and recording
//! implementations of the engine's three external collaborators
//! ([`StatsSink`], `DownstreamEmitter`-shaped sink, [`SharedCache`]) so
//! engine-level tests can assert on what was recorded without any real
//! network or process.
//!
//! This crate is dev-only: every consumer pulls it in as a `dev-dependency`.

mod adapter;
mod emitter;
mod shared_cache;
mod sink;

pub use adapter::{Scripted, ScriptedAdapter};
pub use emitter::{EmitCall, RecordingEmitter};
pub use shared_cache::InMemorySharedCache;
pub use sink::{RecordingStatsSink, StatusUpsert};
