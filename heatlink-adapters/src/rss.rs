use async_trait::async_trait;
use heatlink_core::{NewsItem, SourceDescriptor};
use heatlink_registry::{Adapter, AdapterError, FetchContext};
use serde::Deserialize;
use tracing::debug;

use crate::config::parse_config;

/// Per-source configuration for [`RssAdapter`] (§4.4): just the feed URL —
/// field extraction follows the RSS/Atom standard shape via `feed-rs`.
#[derive(Debug, Clone, Deserialize)]
pub struct RssConfig {
    pub feed_url: String,
}

/// Adapter for RSS/Atom feed sources (§4.4). Channel/feed-level metadata
/// (title) is used only to fall back for `source_name` when the descriptor
/// didn't set one; every entry maps straight to a `NewsItem`.
pub struct RssAdapter {
    descriptor: SourceDescriptor,
    config: RssConfig,
}

impl RssAdapter {
    pub fn new(descriptor: SourceDescriptor) -> Result<Self, AdapterError> {
        let config: RssConfig = parse_config(&descriptor)?;
        Ok(Self { descriptor, config })
    }

    fn build_item(&self, entry: feed_rs::model::Entry) -> Option<NewsItem> {
        let title = entry.title.as_ref().map(|t| t.content.clone())?;
        let url = entry.links.first().map(|link| link.href.clone())?;

        let mut builder = NewsItem::builder(
            self.descriptor.source_id().clone(),
            self.descriptor.name.clone(),
            title,
            url,
        )
        .original_id(entry.id.clone());

        if let Some(summary) = entry.summary.as_ref() {
            builder = builder.summary(summary.content.clone());
        }
        if let Some(content) = entry.content.as_ref().and_then(|c| c.body.clone()) {
            builder = builder.content(content);
        }
        if let Some(author) = entry.authors.first() {
            builder = builder.author(author.name.clone());
        }
        if let Some(published) = entry.published.or(entry.updated) {
            builder = builder.published_at(published);
        }
        if let Some(media) = entry.media.first().and_then(|m| m.thumbnails.first()) {
            builder = builder.image_url(media.image.uri.clone());
        }

        Some(builder.build())
    }
}

#[async_trait]
impl Adapter for RssAdapter {
    fn metadata(&self) -> &SourceDescriptor {
        &self.descriptor
    }

    async fn fetch(
        &self,
        ctx: &FetchContext,
        client: &reqwest::Client,
    ) -> Result<Vec<NewsItem>, AdapterError> {
        let response = tokio::time::timeout(
            std::time::Duration::from_millis(ctx.deadline_ms),
            client.get(&self.config.feed_url).send(),
        )
        .await
        .map_err(|_| AdapterError::Timeout)??;

        let response = response.error_for_status()?;
        let bytes = response.bytes().await?;

        let feed = feed_rs::parser::parse(bytes.as_ref())
            .map_err(|err| AdapterError::Parse(format!("feed parse error: {err}")))?;

        let mut items = Vec::with_capacity(feed.entries.len());
        for entry in feed.entries {
            match self.build_item(entry) {
                Some(item) => items.push(item),
                None => tracing::warn!(source_id = %self.descriptor.source_id(), "skipped entry missing title/link"),
            }
        }

        debug!(source_id = %self.descriptor.source_id(), count = items.len(), "fetched rss source");
        Ok(items)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use heatlink_core::SourceKind;

    fn adapter() -> RssAdapter {
        let descriptor = SourceDescriptor::new(
            "demo",
            "Demo",
            "https://demo",
            SourceKind::Rss,
            60_000,
            30_000,
        )
        .unwrap()
        .with_config(
            serde_json::json!({ "feed_url": "https://demo/feed.xml" })
                .as_object()
                .unwrap()
                .clone(),
        );
        RssAdapter::new(descriptor).unwrap()
    }

    const FEED: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<rss version="2.0">
<channel>
<title>Demo Feed</title>
<item>
<title>Big story</title>
<link>https://demo/1</link>
<guid>demo-1</guid>
<description>Short summary</description>
<pubDate>Thu, 01 Jan 2026 00:00:00 GMT</pubDate>
</item>
</channel>
</rss>"#;

    #[test]
    fn parses_feed_entries_into_news_items() {
        let adapter = adapter();
        let feed = feed_rs::parser::parse(FEED.as_bytes()).unwrap();
        let entry = feed.entries.into_iter().next().unwrap();

        let item = adapter.build_item(entry).unwrap();
        assert_eq!(item.title, "Big story");
        assert_eq!(item.url, "https://demo/1");
        assert_eq!(item.summary.as_deref(), Some("Short summary"));
        assert!(item.published_at.is_some());
    }
}
