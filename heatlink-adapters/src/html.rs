use std::sync::Arc;

use async_trait::async_trait;
use heatlink_core::{NewsItem, SourceDescriptor};
use heatlink_registry::{Adapter, AdapterError, FetchContext};
use scraper::{ElementRef, Html, Selector};
use serde::Deserialize;
use tracing::{debug, warn};

use crate::config::parse_config;

/// Renders a URL to HTML out-of-band — headless-browser lifecycle is
/// entirely opaque to this adapter (§4.4): `render(url, wait_for)` is the
/// whole contract.
#[async_trait]
pub trait Renderer: Send + Sync {
    async fn render(&self, url: &str, wait_for: Option<&str>) -> Result<String, AdapterError>;
}

/// Per-source configuration for [`HtmlAdapter`] (§4.4): the page URL, a CSS
/// selector identifying each item container, and selectors for the fields
/// within it, relative to the container.
#[derive(Debug, Clone, Deserialize)]
pub struct HtmlConfig {
    pub page_url: String,
    pub item_selector: String,
    pub field_selectors: HtmlFieldSelectors,
    /// When set, the page is rendered via a headless [`Renderer`] instead of
    /// a plain HTTP GET; the string is passed through as the renderer's
    /// `wait_for` hint (e.g. a selector to await).
    #[serde(default)]
    pub wait_for: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct HtmlFieldSelectors {
    pub title: String,
    pub url: String,
    #[serde(default)]
    pub summary: Option<String>,
    #[serde(default)]
    pub image_url: Option<String>,
    #[serde(default)]
    pub author: Option<String>,
}

/// Adapter for sources requiring HTML scraping, optionally behind a
/// headless renderer (§4.4).
pub struct HtmlAdapter {
    descriptor: SourceDescriptor,
    config: HtmlConfig,
    renderer: Option<Arc<dyn Renderer>>,
}

impl HtmlAdapter {
    pub fn new(descriptor: SourceDescriptor) -> Result<Self, AdapterError> {
        Self::with_renderer(descriptor, None)
    }

    pub fn with_renderer(
        descriptor: SourceDescriptor,
        renderer: Option<Arc<dyn Renderer>>,
    ) -> Result<Self, AdapterError> {
        let config: HtmlConfig = parse_config(&descriptor)?;
        Ok(Self {
            descriptor,
            config,
            renderer,
        })
    }

    fn select_text(element: &ElementRef, selector_str: &str) -> Option<String> {
        let selector = Selector::parse(selector_str).ok()?;
        element.select(&selector).next().map(|el| el.text().collect::<String>().trim().to_string())
    }

    fn select_attr(element: &ElementRef, selector_str: &str, attr: &str) -> Option<String> {
        let selector = Selector::parse(selector_str).ok()?;
        element
            .select(&selector)
            .next()
            .and_then(|el| el.value().attr(attr))
            .map(str::to_string)
    }

    fn build_item(&self, container: ElementRef) -> Option<NewsItem> {
        let fields = &self.config.field_selectors;
        let title = Self::select_text(&container, &fields.title)?;
        let url = Self::select_attr(&container, &fields.url, "href")
            .or_else(|| Self::select_text(&container, &fields.url))?;

        let mut builder =
            NewsItem::builder(self.descriptor.source_id().clone(), self.descriptor.name.clone(), title, url);

        if let Some(selector) = &fields.summary {
            if let Some(summary) = Self::select_text(&container, selector) {
                builder = builder.summary(summary);
            }
        }
        if let Some(selector) = &fields.image_url {
            if let Some(image) = Self::select_attr(&container, selector, "src") {
                builder = builder.image_url(image);
            }
        }
        if let Some(selector) = &fields.author {
            if let Some(author) = Self::select_text(&container, selector) {
                builder = builder.author(author);
            }
        }

        Some(builder.build())
    }

    async fn fetch_html(&self, ctx: &FetchContext, client: &reqwest::Client) -> Result<String, AdapterError> {
        if let Some(renderer) = &self.renderer {
            return renderer.render(&self.config.page_url, self.config.wait_for.as_deref()).await;
        }

        let response = tokio::time::timeout(
            std::time::Duration::from_millis(ctx.deadline_ms),
            client.get(&self.config.page_url).send(),
        )
        .await
        .map_err(|_| AdapterError::Timeout)??;

        let response = response.error_for_status()?;
        Ok(response.text().await?)
    }
}

#[async_trait]
impl Adapter for HtmlAdapter {
    fn metadata(&self) -> &SourceDescriptor {
        &self.descriptor
    }

    async fn fetch(
        &self,
        ctx: &FetchContext,
        client: &reqwest::Client,
    ) -> Result<Vec<NewsItem>, AdapterError> {
        let html = self.fetch_html(ctx, client).await?;
        let document = Html::parse_document(&html);

        let item_selector = Selector::parse(&self.config.item_selector)
            .map_err(|err| AdapterError::Parse(format!("invalid item_selector: {err:?}")))?;

        let mut items = Vec::new();
        for container in document.select(&item_selector) {
            match self.build_item(container) {
                Some(item) => items.push(item),
                None => warn!(source_id = %self.descriptor.source_id(), "skipped item missing required fields"),
            }
        }

        debug!(source_id = %self.descriptor.source_id(), count = items.len(), "fetched html source");
        Ok(items)
    }
}
