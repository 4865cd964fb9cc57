use dashmap::DashMap;
use heatlink_core::ProxyPolicy;
use heatlink_support::{Clock, Monotonic};
use smol_str::SmolStr;
use std::sync::{Arc, RwLock};
use std::time::Duration;
use tracing::debug;
use url::Url;

use crate::config::{ProxyConfig, ProxyStatus};
use crate::error::ProxyError;

/// Cooldown before a `dead` proxy is given another chance (§4.2).
pub const DEAD_COOLDOWN: Duration = Duration::from_secs(10 * 60);

/// EWMA smoothing factor for `latency_ms_ewma` (§4.2).
const LATENCY_EWMA_ALPHA: f64 = 0.25;

/// Outcome of [`ProxyPool::select`]: either a proxy to route through, or an
/// explicit direct connection.
#[derive(Debug, Clone)]
pub enum ProxySelection {
    Proxy(ProxyConfig),
    Direct,
}

/// The engine's proxy pool: domain-required policy plus an ordered,
/// health-tracked set of [`ProxyConfig`]s (§4.2).
pub struct ProxyPool {
    proxies: DashMap<SmolStr, ProxyConfig>,
    /// Suffix-matched domain labels that require a proxy under
    /// `ProxyPolicy::IfRequired` (§4.2).
    required_domains: RwLock<Vec<String>>,
    clock: Arc<dyn Clock>,
}

impl ProxyPool {
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self {
            proxies: DashMap::new(),
            required_domains: RwLock::new(Vec::new()),
            clock,
        }
    }

    /// Register or replace a proxy.
    pub fn upsert(&self, proxy: ProxyConfig) {
        self.proxies.insert(proxy.proxy_id.clone(), proxy);
    }

    /// Remove a proxy from the pool.
    pub fn remove(&self, proxy_id: &str) {
        self.proxies.remove(proxy_id);
    }

    /// Replace the domain-required list wholesale (config reload).
    pub fn set_required_domains(&self, domains: Vec<String>) {
        *self.required_domains.write().expect("required_domains lock poisoned") = domains;
    }

    /// Snapshot every known proxy, for the control plane (§6.5).
    pub fn list(&self) -> Vec<ProxyConfig> {
        self.proxies.iter().map(|e| e.value().clone()).collect()
    }

    /// A single proxy's current configuration, if known.
    pub fn get(&self, proxy_id: &str) -> Option<ProxyConfig> {
        self.proxies.get(proxy_id).map(|e| e.value().clone())
    }

    /// Whether `url` requires a proxy under `policy` (§4.2): `always`
    /// forces it, `never` disables it, `if-required` defers to the
    /// registered domain suffix list.
    pub fn requires_proxy(&self, url: &Url, policy: ProxyPolicy) -> bool {
        match policy {
            ProxyPolicy::Always => true,
            ProxyPolicy::Never => false,
            ProxyPolicy::IfRequired => {
                let Some(host) = url.host_str() else { return false };
                let domains = self.required_domains.read().expect("required_domains lock poisoned");
                domains
                    .iter()
                    .any(|pattern| host == pattern || host.ends_with(&format!(".{pattern}")))
            }
        }
    }

    /// Select a usable proxy (§4.2 Selection): orders candidates per §3.4,
    /// returns the first with `status != dead`. Falls back to `Direct`
    /// when `allow_fallback_direct`, else errors.
    pub fn select(
        &self,
        proxy_group: Option<&str>,
        allow_fallback_direct: bool,
    ) -> Result<ProxySelection, ProxyError> {
        let mut candidates: Vec<ProxyConfig> = self
            .proxies
            .iter()
            .filter(|e| proxy_group.is_none_or(|g| e.value().group == g))
            .map(|e| e.value().clone())
            .collect();

        candidates.sort_by(|a, b| a.sort_key().cmp(&b.sort_key()));

        if let Some(chosen) = candidates.into_iter().find(|p| p.status != ProxyStatus::Dead) {
            return Ok(ProxySelection::Proxy(chosen));
        }

        if allow_fallback_direct {
            Ok(ProxySelection::Direct)
        } else {
            Err(ProxyError::Unavailable)
        }
    }

    /// Apply the §4.2 health state machine to a probe or fetch-time
    /// outcome for `proxy_id`.
    pub fn record_outcome(&self, proxy_id: &str, success: bool, latency_ms: Option<f64>) {
        let Some(mut entry) = self.proxies.get_mut(proxy_id) else { return };
        let now = self.clock.now();
        entry.last_check_at = Some(now);

        if let Some(latency) = latency_ms {
            entry.latency_ms_ewma = if entry.latency_ms_ewma <= 0.0 {
                latency
            } else {
                LATENCY_EWMA_ALPHA * latency + (1.0 - LATENCY_EWMA_ALPHA) * entry.latency_ms_ewma
            };
        }

        let from = entry.status;
        if success {
            entry.consecutive_failures = 0;
            if matches!(entry.status, ProxyStatus::Unknown | ProxyStatus::Degraded | ProxyStatus::Dead) {
                entry.status = ProxyStatus::Healthy;
            }
        } else {
            entry.consecutive_failures += 1;
            entry.status = if entry.consecutive_failures >= 5 {
                ProxyStatus::Dead
            } else {
                ProxyStatus::Degraded
            };
        }

        if from != entry.status {
            debug!(proxy_id, from_status = ?from, to_status = ?entry.status, "proxy health transition");
        }
    }

    /// Recover any `dead` proxy whose cooldown has elapsed back to
    /// `unknown`, so the next sweep re-probes it (§4.2).
    pub fn decay_dead_proxies(&self) {
        let now = self.clock.now();
        for mut entry in self.proxies.iter_mut() {
            if entry.status == ProxyStatus::Dead {
                if let Some(last) = entry.last_check_at {
                    if now.saturating_duration_since(last) >= DEAD_COOLDOWN {
                        entry.status = ProxyStatus::Unknown;
                        entry.consecutive_failures = 0;
                    }
                }
            }
        }
    }

    pub(crate) fn clock(&self) -> &Arc<dyn Clock> {
        &self.clock
    }

    #[allow(dead_code)]
    fn last_check(&self, proxy_id: &str) -> Option<Monotonic> {
        self.proxies.get(proxy_id).and_then(|e| e.last_check_at)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Protocol;
    use heatlink_support::SystemClock;

    fn pool() -> ProxyPool {
        ProxyPool::new(Arc::new(SystemClock::new()))
    }

    fn proxy(id: &str, priority: i32) -> ProxyConfig {
        ProxyConfig::new(id, Protocol::Http, "h", 8080, "default", "https://h/health").with_priority(priority)
    }

    #[test]
    fn requires_proxy_honors_always_and_never() {
        let p = pool();
        let url = Url::parse("https://example.com").unwrap();
        assert!(p.requires_proxy(&url, ProxyPolicy::Always));
        assert!(!p.requires_proxy(&url, ProxyPolicy::Never));
    }

    #[test]
    fn requires_proxy_matches_domain_suffix() {
        let p = pool();
        p.set_required_domains(vec!["github.com".to_string()]);
        let api = Url::parse("https://api.github.com/repos").unwrap();
        let other = Url::parse("https://example.com").unwrap();
        assert!(p.requires_proxy(&api, ProxyPolicy::IfRequired));
        assert!(!p.requires_proxy(&other, ProxyPolicy::IfRequired));
    }

    #[test]
    fn select_prefers_higher_priority_healthy_proxy() {
        let p = pool();
        let mut p1 = proxy("p1", 10);
        p1.status = ProxyStatus::Healthy;
        let mut p2 = proxy("p2", 5);
        p2.status = ProxyStatus::Healthy;
        p.upsert(p1);
        p.upsert(p2);

        match p.select(None, false).unwrap() {
            ProxySelection::Proxy(chosen) => assert_eq!(chosen.proxy_id.as_str(), "p1"),
            ProxySelection::Direct => panic!("expected a proxy"),
        }
    }

    #[test]
    fn select_skips_dead_proxies() {
        let p = pool();
        let mut p1 = proxy("p1", 10);
        p1.status = ProxyStatus::Dead;
        let mut p2 = proxy("p2", 5);
        p2.status = ProxyStatus::Healthy;
        p.upsert(p1);
        p.upsert(p2);

        match p.select(None, false).unwrap() {
            ProxySelection::Proxy(chosen) => assert_eq!(chosen.proxy_id.as_str(), "p2"),
            ProxySelection::Direct => panic!("expected a proxy"),
        }
    }

    #[test]
    fn select_falls_back_to_direct_when_allowed() {
        let p = pool();
        let mut p1 = proxy("p1", 10);
        p1.status = ProxyStatus::Dead;
        p.upsert(p1);
        assert!(matches!(p.select(None, true).unwrap(), ProxySelection::Direct));
    }

    #[test]
    fn select_errors_when_no_fallback_allowed() {
        let p = pool();
        let mut p1 = proxy("p1", 10);
        p1.status = ProxyStatus::Dead;
        p.upsert(p1);
        assert!(p.select(None, false).is_err());
    }

    #[test]
    fn failover_scenario_s6() {
        let p = pool();
        let mut p1 = proxy("p1", 10);
        p1.status = ProxyStatus::Healthy;
        let mut p2 = proxy("p2", 5);
        p2.status = ProxyStatus::Healthy;
        p.upsert(p1);
        p.upsert(p2);

        // First attempt fails via p1.
        p.record_outcome("p1", false, None);
        let p1_after = p.get("p1").unwrap();
        assert_eq!(p1_after.consecutive_failures, 1);
        assert_eq!(p1_after.status, ProxyStatus::Degraded);

        // Subsequent selection prefers p2 (still healthy, lower priority
        // no longer matters since p1 dropped below healthy).
        match p.select(None, false).unwrap() {
            ProxySelection::Proxy(chosen) => assert_eq!(chosen.proxy_id.as_str(), "p2"),
            ProxySelection::Direct => panic!("expected a proxy"),
        }
    }

    #[test]
    fn five_consecutive_failures_marks_dead() {
        let p = pool();
        p.upsert(proxy("p1", 10));
        for _ in 0..5 {
            p.record_outcome("p1", false, None);
        }
        assert_eq!(p.get("p1").unwrap().status, ProxyStatus::Dead);
    }

    #[test]
    fn success_recovers_from_degraded() {
        let p = pool();
        p.upsert(proxy("p1", 10));
        p.record_outcome("p1", false, None);
        assert_eq!(p.get("p1").unwrap().status, ProxyStatus::Degraded);
        p.record_outcome("p1", true, Some(50.0));
        let after = p.get("p1").unwrap();
        assert_eq!(after.status, ProxyStatus::Healthy);
        assert_eq!(after.consecutive_failures, 0);
    }

    #[test]
    fn latency_ewma_applies_alpha() {
        let p = pool();
        p.upsert(proxy("p1", 10));
        p.record_outcome("p1", true, Some(100.0));
        assert_eq!(p.get("p1").unwrap().latency_ms_ewma, 100.0);
        p.record_outcome("p1", true, Some(200.0));
        // 0.25 * 200 + 0.75 * 100 = 125
        assert_eq!(p.get("p1").unwrap().latency_ms_ewma, 125.0);
    }
}
