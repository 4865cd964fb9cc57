//! Reference source adapters exercising the [`heatlink_registry::Adapter`]
//! contract (§4.4): a JSON API adapter driven by JSONPath extraction, an
//! RSS/Atom adapter built on `feed-rs`, and an HTML/rendered-HTML adapter
//! built on `scraper` with an opaque headless-renderer seam.

mod config;
mod html;
mod json_api;
mod rss;

pub use html::{HtmlAdapter, HtmlConfig, HtmlFieldSelectors, Renderer};
pub use json_api::{FieldMap, JsonApiAdapter, JsonApiConfig};
pub use rss::{RssAdapter, RssConfig};
