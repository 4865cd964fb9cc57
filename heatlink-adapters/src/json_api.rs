use std::collections::HashMap;

use async_trait::async_trait;
use heatlink_core::{NewsItem, SourceDescriptor};
use heatlink_registry::{Adapter, AdapterError, FetchContext};
use serde::Deserialize;
use serde_json::Value;
use tracing::{debug, warn};

use crate::config::parse_config;

/// Per-source configuration for [`JsonApiAdapter`] (§4.4): a request
/// template plus a JSONPath locating the item array and a field map of
/// `NewsItem` field name -> JSONPath relative to each item.
#[derive(Debug, Clone, Deserialize)]
pub struct JsonApiConfig {
    pub url: String,
    #[serde(default = "default_method")]
    pub method: String,
    #[serde(default)]
    pub headers: HashMap<String, String>,
    #[serde(default)]
    pub body: Option<Value>,
    #[serde(default = "default_items_path")]
    pub items_path: String,
    pub field_map: FieldMap,
}

fn default_method() -> String {
    "GET".to_string()
}

fn default_items_path() -> String {
    "$.items[*]".to_string()
}

/// Where each `NewsItem` field is read from within one extracted item
/// object. `title` and `url` are required; everything else is optional.
#[derive(Debug, Clone, Deserialize)]
pub struct FieldMap {
    pub title: String,
    pub url: String,
    #[serde(default)]
    pub original_id: Option<String>,
    #[serde(default)]
    pub summary: Option<String>,
    #[serde(default)]
    pub content: Option<String>,
    #[serde(default)]
    pub author: Option<String>,
    #[serde(default)]
    pub image_url: Option<String>,
    #[serde(default)]
    pub published_at: Option<String>,
}

/// Adapter for sources whose feed is a JSON API (§4.4): fetches the
/// configured request, locates the item array with a JSONPath expression,
/// and extracts each `NewsItem` field with one JSONPath per field.
pub struct JsonApiAdapter {
    descriptor: SourceDescriptor,
    config: JsonApiConfig,
}

impl JsonApiAdapter {
    pub fn new(descriptor: SourceDescriptor) -> Result<Self, AdapterError> {
        let config: JsonApiConfig = parse_config(&descriptor)?;
        Ok(Self { descriptor, config })
    }

    fn extract_field<'a>(item: &'a Value, path: &str) -> Option<&'a Value> {
        jsonpath_lib::select(item, path).ok()?.into_iter().next()
    }

    fn extract_string(item: &Value, path: &str) -> Option<String> {
        Self::extract_field(item, path).and_then(|v| v.as_str().map(str::to_string))
    }

    fn build_item(&self, item: &Value) -> Option<NewsItem> {
        let field_map = &self.config.field_map;
        let title = Self::extract_string(item, &field_map.title)?;
        let url = Self::extract_string(item, &field_map.url)?;

        let mut builder = NewsItem::builder(
            self.descriptor.source_id().clone(),
            self.descriptor.name.clone(),
            title,
            url,
        );

        if let Some(path) = &field_map.original_id {
            if let Some(id) = Self::extract_string(item, path) {
                builder = builder.original_id(id);
            }
        }
        if let Some(path) = &field_map.summary {
            if let Some(v) = Self::extract_string(item, path) {
                builder = builder.summary(v);
            }
        }
        if let Some(path) = &field_map.content {
            if let Some(v) = Self::extract_string(item, path) {
                builder = builder.content(v);
            }
        }
        if let Some(path) = &field_map.author {
            if let Some(v) = Self::extract_string(item, path) {
                builder = builder.author(v);
            }
        }
        if let Some(path) = &field_map.image_url {
            if let Some(v) = Self::extract_string(item, path) {
                builder = builder.image_url(v);
            }
        }
        if let Some(path) = &field_map.published_at {
            if let Some(raw) = Self::extract_string(item, path) {
                if let Ok(ts) = chrono::DateTime::parse_from_rfc3339(&raw) {
                    builder = builder.published_at(ts.with_timezone(&chrono::Utc));
                }
            }
        }

        Some(builder.build())
    }
}

#[async_trait]
impl Adapter for JsonApiAdapter {
    fn metadata(&self) -> &SourceDescriptor {
        &self.descriptor
    }

    async fn fetch(
        &self,
        ctx: &FetchContext,
        client: &reqwest::Client,
    ) -> Result<Vec<NewsItem>, AdapterError> {
        let method: reqwest::Method = self.config.method.parse().unwrap_or(reqwest::Method::GET);
        let mut request = client.request(method, &self.config.url);
        for (name, value) in &self.config.headers {
            request = request.header(name, value);
        }
        if let Some(body) = &self.config.body {
            request = request.json(body);
        }

        let response = tokio::time::timeout(
            std::time::Duration::from_millis(ctx.deadline_ms),
            request.send(),
        )
        .await
        .map_err(|_| AdapterError::Timeout)??;

        let response = response.error_for_status()?;
        let document: Value = response.json().await?;

        let items = jsonpath_lib::select(&document, &self.config.items_path)
            .map_err(|err| AdapterError::Parse(format!("items_path {}: {err}", self.config.items_path)))?;

        let mut news_items = Vec::with_capacity(items.len());
        for item in items {
            match self.build_item(item) {
                Some(news_item) => news_items.push(news_item),
                None => warn!(source_id = %self.descriptor.source_id(), "skipped item missing required fields"),
            }
        }

        debug!(source_id = %self.descriptor.source_id(), count = news_items.len(), "fetched json api source");
        Ok(news_items)
    }
}
