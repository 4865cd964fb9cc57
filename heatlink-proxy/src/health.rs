use std::sync::Arc;
use std::time::Duration;

use reqwest::Client;
use tokio::sync::watch;
use tokio::time::Instant;
use tracing::{debug, warn};

use crate::pool::ProxyPool;

/// Upper bound on a single health-check request (§4.2).
const PROBE_DEADLINE: Duration = Duration::from_secs(5);

/// Background task that periodically probes every proxy's
/// `health_check_url` and feeds the result into [`ProxyPool::record_outcome`]
/// (§4.2).
///
/// Also decays `dead` proxies back to `unknown` once their cooldown has
/// elapsed, so they are re-probed on the next sweep.
pub struct HealthSweep {
    pool: Arc<ProxyPool>,
    client: Client,
    interval: Duration,
    shutdown: watch::Receiver<bool>,
}

impl HealthSweep {
    pub fn new(pool: Arc<ProxyPool>, interval: Duration, shutdown: watch::Receiver<bool>) -> Self {
        Self {
            pool,
            client: Client::new(),
            interval,
            shutdown,
        }
    }

    /// Run the sweep loop until the shutdown signal fires. Intended to be
    /// driven via `tokio::spawn`.
    pub async fn run(mut self) {
        let mut ticker = tokio::time::interval(self.interval);
        loop {
            tokio::select! {
                _ = ticker.tick() => self.sweep_once().await,
                result = self.shutdown.changed() => {
                    if result.is_err() || *self.shutdown.borrow() {
                        debug!("proxy health sweep shutting down");
                        return;
                    }
                }
            }
        }
    }

    /// Probe every proxy once, sequentially. Kept simple (no internal
    /// concurrency cap) since the sweep interval is coarse and the pool is
    /// expected to be small relative to the fetch concurrency budget.
    pub async fn sweep_once(&self) {
        self.pool.decay_dead_proxies();
        for proxy in self.pool.list() {
            let started = Instant::now();
            let outcome = tokio::time::timeout(
                PROBE_DEADLINE,
                self.client.get(&proxy.health_check_url).send(),
            )
            .await;

            let latency_ms = started.elapsed().as_secs_f64() * 1000.0;
            match outcome {
                Ok(Ok(response)) if response.status().is_success() => {
                    self.pool.record_outcome(&proxy.proxy_id, true, Some(latency_ms));
                }
                Ok(Ok(response)) => {
                    warn!(proxy_id = %proxy.proxy_id, status = %response.status(), "proxy health check returned non-2xx");
                    self.pool.record_outcome(&proxy.proxy_id, false, Some(latency_ms));
                }
                Ok(Err(err)) => {
                    warn!(proxy_id = %proxy.proxy_id, error = %err, "proxy health check failed");
                    self.pool.record_outcome(&proxy.proxy_id, false, None);
                }
                Err(_) => {
                    warn!(proxy_id = %proxy.proxy_id, "proxy health check timed out");
                    self.pool.record_outcome(&proxy.proxy_id, false, None);
                }
            }
        }
    }
}
