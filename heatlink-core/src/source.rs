use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::source_id::CanonicalSourceId;

/// The shape of adapter a source requires (§3.2).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceKind {
    /// JSON API adapter.
    Api,
    /// Rendered/scraped HTML page.
    Web,
    /// RSS/Atom feed.
    Rss,
}

/// Per-source proxying requirement (§3.2, §4.2).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ProxyPolicy {
    /// Never proxy this source's requests, regardless of domain policy.
    Never,
    /// Defer to the proxy pool's domain-pattern policy.
    IfRequired,
    /// Always proxy this source's requests.
    Always,
}

/// Static per-source configuration (§3.2).
///
/// Constructed via [`SourceDescriptor::new`], which enforces the §3.2
/// constraints (`cache_ttl_ms <= update_interval_ms * 2`, minimum
/// intervals). Every other field is set through the fluent `with_*`
/// methods, consistent with adapter construction elsewhere in the engine.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceDescriptor {
    source_id: CanonicalSourceId,
    pub name: String,
    pub home_url: String,
    pub kind: SourceKind,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub country: Option<String>,
    #[serde(default)]
    pub language: Option<String>,
    #[serde(default)]
    pub priority: i32,
    #[serde(default = "serde_json::Map::new")]
    pub config: serde_json::Map<String, serde_json::Value>,
    pub update_interval_ms: u64,
    pub cache_ttl_ms: u64,
    #[serde(default = "default_true")]
    pub adaptive_enabled: bool,
    #[serde(default)]
    pub proxy_policy: ProxyPolicy,
    #[serde(default)]
    pub proxy_group: Option<String>,
    #[serde(default)]
    pub allow_fallback_direct: bool,
    /// Shrink-protection threshold override (§4.1). `None` uses the
    /// engine-wide default of 0.30.
    #[serde(default)]
    pub shrink_protection_ratio: Option<f64>,
    /// Per-source fetch deadline override in milliseconds (§4.7 step 4).
    /// `None` uses the engine-wide default of 60_000ms.
    #[serde(default)]
    pub fetch_deadline_ms: Option<u64>,
    /// Per-source connect timeout override in milliseconds (§4.3). `None`
    /// uses the engine-wide default of 10_000ms.
    #[serde(default)]
    pub connect_timeout_ms: Option<u64>,
    /// Per-source read timeout override in milliseconds (§4.3). `None`
    /// uses the engine-wide default of 30_000ms.
    #[serde(default)]
    pub read_timeout_ms: Option<u64>,
    /// TLS certificate verification for this source's requests (§4.3).
    /// Defaults to `true`; a source must opt out explicitly.
    #[serde(default = "default_true")]
    pub tls_verify: bool,
}

fn default_true() -> bool {
    true
}

impl Default for ProxyPolicy {
    fn default() -> Self {
        ProxyPolicy::IfRequired
    }
}

/// A [`SourceDescriptor`] failed the §3.2 validity constraints.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum SourceDescriptorError {
    #[error("update_interval_ms must be >= 60_000, got {0}")]
    UpdateIntervalTooShort(u64),
    #[error("cache_ttl_ms must be >= 30_000, got {0}")]
    CacheTtlTooShort(u64),
    #[error("cache_ttl_ms ({cache_ttl_ms}) must be <= update_interval_ms * 2 ({max})")]
    CacheTtlExceedsUpdateInterval { cache_ttl_ms: u64, max: u64 },
}

impl SourceDescriptor {
    /// Build a descriptor, validating the §3.2 constraints:
    /// `update_interval_ms >= 60_000`, `cache_ttl_ms >= 30_000`, and
    /// `cache_ttl_ms <= update_interval_ms * 2`.
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        source_id: impl AsRef<str>,
        name: impl Into<String>,
        home_url: impl Into<String>,
        kind: SourceKind,
        update_interval_ms: u64,
        cache_ttl_ms: u64,
    ) -> Result<Self, SourceDescriptorError> {
        if update_interval_ms < 60_000 {
            return Err(SourceDescriptorError::UpdateIntervalTooShort(update_interval_ms));
        }
        if cache_ttl_ms < 30_000 {
            return Err(SourceDescriptorError::CacheTtlTooShort(cache_ttl_ms));
        }
        let max = update_interval_ms.saturating_mul(2);
        if cache_ttl_ms > max {
            return Err(SourceDescriptorError::CacheTtlExceedsUpdateInterval {
                cache_ttl_ms,
                max,
            });
        }

        Ok(Self {
            source_id: CanonicalSourceId::canonicalize(source_id.as_ref()),
            name: name.into(),
            home_url: home_url.into(),
            kind,
            category: None,
            country: None,
            language: None,
            priority: 0,
            config: serde_json::Map::new(),
            update_interval_ms,
            cache_ttl_ms,
            adaptive_enabled: true,
            proxy_policy: ProxyPolicy::IfRequired,
            proxy_group: None,
            allow_fallback_direct: false,
            shrink_protection_ratio: None,
            fetch_deadline_ms: None,
            connect_timeout_ms: None,
            read_timeout_ms: None,
            tls_verify: true,
        })
    }

    /// The canonical (hyphen-form) source id (§3.6).
    pub fn source_id(&self) -> &CanonicalSourceId {
        &self.source_id
    }

    pub fn with_category(mut self, category: impl Into<String>) -> Self {
        self.category = Some(category.into());
        self
    }

    pub fn with_country(mut self, country: impl Into<String>) -> Self {
        self.country = Some(country.into());
        self
    }

    pub fn with_language(mut self, language: impl Into<String>) -> Self {
        self.language = Some(language.into());
        self
    }

    pub fn with_priority(mut self, priority: i32) -> Self {
        self.priority = priority;
        self
    }

    pub fn with_config(mut self, config: serde_json::Map<String, serde_json::Value>) -> Self {
        self.config = config;
        self
    }

    pub fn with_adaptive_enabled(mut self, enabled: bool) -> Self {
        self.adaptive_enabled = enabled;
        self
    }

    pub fn with_proxy_policy(mut self, policy: ProxyPolicy) -> Self {
        self.proxy_policy = policy;
        self
    }

    pub fn with_proxy_group(mut self, group: impl Into<String>) -> Self {
        self.proxy_group = Some(group.into());
        self
    }

    pub fn with_allow_fallback_direct(mut self, allow: bool) -> Self {
        self.allow_fallback_direct = allow;
        self
    }

    pub fn with_shrink_protection_ratio(mut self, ratio: f64) -> Self {
        self.shrink_protection_ratio = Some(ratio);
        self
    }

    pub fn with_fetch_deadline_ms(mut self, deadline_ms: u64) -> Self {
        self.fetch_deadline_ms = Some(deadline_ms);
        self
    }

    pub fn with_connect_timeout_ms(mut self, timeout_ms: u64) -> Self {
        self.connect_timeout_ms = Some(timeout_ms);
        self
    }

    pub fn with_read_timeout_ms(mut self, timeout_ms: u64) -> Self {
        self.read_timeout_ms = Some(timeout_ms);
        self
    }

    pub fn with_tls_verify(mut self, verify: bool) -> Self {
        self.tls_verify = verify;
        self
    }

    /// The shrink-protection ratio to apply, falling back to the engine
    /// default of 0.30 (§4.1) when the source didn't override it.
    pub fn effective_shrink_protection_ratio(&self) -> f64 {
        self.shrink_protection_ratio.unwrap_or(0.30)
    }

    /// The fetch deadline to apply, falling back to the engine default of
    /// 60s (§4.7 step 4) when the source didn't override it.
    pub fn effective_fetch_deadline_ms(&self) -> u64 {
        self.fetch_deadline_ms.unwrap_or(60_000)
    }

    /// The connect timeout to apply, falling back to the engine default of
    /// 10s (§4.3) when the source didn't override it.
    pub fn effective_connect_timeout_ms(&self) -> u64 {
        self.connect_timeout_ms.unwrap_or(10_000)
    }

    /// The read timeout to apply, falling back to the engine default of
    /// 30s (§4.3) when the source didn't override it.
    pub fn effective_read_timeout_ms(&self) -> u64 {
        self.read_timeout_ms.unwrap_or(30_000)
    }
}
