use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use heatlink_core::{NewsItem, SourceDescriptor, SourceKind};
use heatlink_registry::{Adapter, AdapterError, FetchContext};

/// One scripted response for [`ScriptedAdapter::fetch`].
#[derive(Clone)]
pub enum Scripted {
    /// Succeed, returning these items.
    Items(Vec<NewsItem>),
    /// Fail with a connect/transport-class error (§7 `network`), without
    /// any real socket I/O.
    NetworkError,
    Parse(String),
    Internal(String),
    RateLimited,
    Timeout,
    Canceled,
}

struct Step {
    delay: Duration,
    response: Scripted,
}

/// A scriptable [`Adapter`] double: told up front what to return (or fail
/// with) on the Nth call, optionally after sleeping for a fixed delay
/// first (§13, used for single-flight coalescing scenarios like S1).
///
/// Steps are consumed in order; once exhausted, the last step repeats
/// indefinitely, matching how a real source tends to keep returning its
/// most recent shape rather than going silent.
pub struct ScriptedAdapter {
    descriptor: SourceDescriptor,
    steps: Mutex<VecDeque<Step>>,
    last: Mutex<Option<Step>>,
    calls: AtomicUsize,
}

impl ScriptedAdapter {
    pub fn new(descriptor: SourceDescriptor) -> Self {
        Self {
            descriptor,
            steps: Mutex::new(VecDeque::new()),
            last: Mutex::new(None),
            calls: AtomicUsize::new(0),
        }
    }

    /// Convenience constructor: a source that always succeeds with the
    /// given titles, no artificial delay.
    pub fn returning(
        source_id: &str,
        update_interval_ms: u64,
        cache_ttl_ms: u64,
        titles: Vec<String>,
    ) -> Self {
        let descriptor =
            SourceDescriptor::new(source_id, source_id, format!("https://example.test/{source_id}"), SourceKind::Api, update_interval_ms, cache_ttl_ms)
                .expect("valid descriptor for test adapter");
        let adapter = Self::new(descriptor);
        let canonical = adapter.descriptor.source_id().clone();
        let items = titles
            .into_iter()
            .map(|title| NewsItem::builder(canonical.clone(), source_id, title.clone(), format!("https://example.test/{source_id}/{title}")).build())
            .collect();
        adapter.push(Duration::ZERO, Scripted::Items(items));
        adapter
    }

    /// Queues one more step to be consumed on the next `fetch` call.
    pub fn push(&self, delay: Duration, response: Scripted) {
        self.steps.lock().unwrap().push_back(Step { delay, response });
    }

    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    fn next_step(&self) -> Step {
        let mut queue = self.steps.lock().unwrap();
        if let Some(step) = queue.pop_front() {
            *self.last.lock().unwrap() = Some(Step {
                delay: step.delay,
                response: step.response.clone(),
            });
            step
        } else {
            self.last
                .lock()
                .unwrap()
                .as_ref()
                .map(|step| Step {
                    delay: step.delay,
                    response: step.response.clone(),
                })
                .unwrap_or(Step {
                    delay: Duration::ZERO,
                    response: Scripted::Items(Vec::new()),
                })
        }
    }
}

impl Clone for Scripted {
    fn clone(&self) -> Self {
        match self {
            Scripted::Items(items) => Scripted::Items(items.clone()),
            Scripted::NetworkError => Scripted::NetworkError,
            Scripted::Parse(msg) => Scripted::Parse(msg.clone()),
            Scripted::Internal(msg) => Scripted::Internal(msg.clone()),
            Scripted::RateLimited => Scripted::RateLimited,
            Scripted::Timeout => Scripted::Timeout,
            Scripted::Canceled => Scripted::Canceled,
        }
    }
}

#[async_trait]
impl Adapter for ScriptedAdapter {
    fn metadata(&self) -> &SourceDescriptor {
        &self.descriptor
    }

    async fn fetch(&self, _ctx: &FetchContext, _client: &reqwest::Client) -> Result<Vec<NewsItem>, AdapterError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let step = self.next_step();
        if !step.delay.is_zero() {
            tokio::time::sleep(step.delay).await;
        }
        match step.response {
            Scripted::Items(items) => Ok(items),
            Scripted::NetworkError => Err(AdapterError::Connect("simulated connection reset".to_string())),
            Scripted::Parse(msg) => Err(AdapterError::Parse(msg)),
            Scripted::Internal(msg) => Err(AdapterError::Internal(msg)),
            Scripted::RateLimited => Err(AdapterError::RateLimited),
            Scripted::Timeout => Err(AdapterError::Timeout),
            Scripted::Canceled => Err(AdapterError::Canceled),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use heatlink_core::CallType;

    #[tokio::test]
    async fn returning_adapter_yields_configured_titles() {
        let adapter = ScriptedAdapter::returning("demo", 60_000, 30_000, vec!["A".into(), "B".into()]);
        let ctx = FetchContext { deadline_ms: 1_000, call_type: CallType::External };
        let client = reqwest::Client::new();
        let items = adapter.fetch(&ctx, &client).await.unwrap();
        assert_eq!(items.len(), 2);
        assert_eq!(adapter.call_count(), 1);
    }

    #[tokio::test]
    async fn exhausted_script_repeats_last_step() {
        let descriptor = SourceDescriptor::new("demo", "Demo", "https://demo", SourceKind::Api, 60_000, 30_000).unwrap();
        let adapter = ScriptedAdapter::new(descriptor);
        adapter.push(Duration::ZERO, Scripted::RateLimited);
        let ctx = FetchContext { deadline_ms: 1_000, call_type: CallType::External };
        let client = reqwest::Client::new();
        assert!(adapter.fetch(&ctx, &client).await.is_err());
        assert!(adapter.fetch(&ctx, &client).await.is_err());
        assert_eq!(adapter.call_count(), 2);
    }
}
