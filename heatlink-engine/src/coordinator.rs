use std::sync::Arc;
use std::time::Duration;

use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use heatlink_core::CanonicalSourceId;
use tokio::sync::watch;

/// Per-source leader/follower coordination so at most one fetch is ever in
/// flight for a source at a time (§4.9).
///
/// The leader always runs as an independently spawned task (the engine
/// never awaits it directly from the caller's future), so a canceled
/// `GetNews` call never cancels the underlying fetch — only the caller's
/// own wait for the result.
pub struct FetchCoordinator<Outcome> {
    inflight: DashMap<CanonicalSourceId, watch::Receiver<Option<Arc<Outcome>>>>,
}

/// A caller's role with respect to an in-flight fetch for one source.
pub enum Role<Outcome> {
    /// No fetch was in flight. The caller must run one, then call
    /// [`FetchCoordinator::finish`] with the returned sender.
    Leader(watch::Sender<Option<Arc<Outcome>>>),
    /// A fetch is already in flight; await its result with
    /// [`wait_for_result`].
    Follower(watch::Receiver<Option<Arc<Outcome>>>),
}

impl<Outcome> Default for FetchCoordinator<Outcome> {
    fn default() -> Self {
        Self::new()
    }
}

impl<Outcome> FetchCoordinator<Outcome> {
    pub fn new() -> Self {
        Self {
            inflight: DashMap::new(),
        }
    }

    /// `InFlight(source_id) -> bool` (§4.9), exposed for the scheduler.
    pub fn in_flight(&self, source_id: &CanonicalSourceId) -> bool {
        self.inflight.contains_key(source_id)
    }

    /// Claims the leader role for `source_id`, or joins the existing
    /// leader as a follower.
    pub fn join(&self, source_id: &CanonicalSourceId) -> Role<Outcome> {
        match self.inflight.entry(source_id.clone()) {
            Entry::Occupied(occupied) => Role::Follower(occupied.get().clone()),
            Entry::Vacant(vacant) => {
                let (tx, rx) = watch::channel(None);
                vacant.insert(rx);
                Role::Leader(tx)
            }
        }
    }

    /// Publishes the leader's result to every waiting follower and
    /// releases the guard so a later call can become leader again.
    pub fn finish(&self, source_id: &CanonicalSourceId, tx: watch::Sender<Option<Arc<Outcome>>>, outcome: Outcome) {
        let _ = tx.send(Some(Arc::new(outcome)));
        self.inflight.remove(source_id);
    }
}

/// Waits up to `deadline` for a leader to publish its result. Returns
/// `None` on timeout — the caller (§4.7 step 3) falls back to whatever
/// cached items exist, or an `in_flight_timeout` error.
pub async fn wait_for_result<Outcome>(
    mut rx: watch::Receiver<Option<Arc<Outcome>>>,
    deadline: Duration,
) -> Option<Arc<Outcome>> {
    if let Some(value) = rx.borrow().clone() {
        return Some(value);
    }
    match tokio::time::timeout(deadline, rx.changed()).await {
        Ok(Ok(())) => rx.borrow().clone(),
        _ => None,
    }
}
