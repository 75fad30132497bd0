// src/services/discovery.rs

//! Feed discovery service.
//!
//! Finds a blog's feed from the `<link rel="alternate">` tags of its home page.

use std::sync::LazyLock;

use scraper::{Html, Selector};
use url::Url;

use super::Fetch;
use crate::error::Result;
use crate::utils::{origin, resolve_url};

static ALTERNATE_LINKS: LazyLock<Selector> = LazyLock::new(|| {
    Selector::parse(r#"link[rel~="alternate"][href]"#).expect("valid alternate selector")
});

/// Feed formats in order of preference.
const FEED_TYPES: &[(&str, &str)] = &[
    ("application/feed+json", "json"),
    ("application/json", "json"),
    ("application/atom+xml", "atom"),
    ("application/rss+xml", "rss"),
];

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiscoveredFeed {
    pub url: String,
    /// `json`, `atom` or `rss`
    pub format: String,
}

/// Pick the preferred feed link from a home page document.
///
/// Relative hrefs resolve against the home page origin.
pub fn find_feed_link(html: &str, home_page_url: &str) -> Option<DiscoveredFeed> {
    let document = Html::parse_document(html);
    let base = origin(home_page_url).and_then(|o| Url::parse(&o).ok());

    let links: Vec<(String, String)> = document
        .select(&ALTERNATE_LINKS)
        .filter_map(|link| {
            let kind = link.value().attr("type")?.trim().to_ascii_lowercase();
            let href = link.value().attr("href")?.trim().to_string();
            Some((kind, href))
        })
        .collect();

    FEED_TYPES.iter().find_map(|(mime, format)| {
        links.iter().find(|(kind, _)| kind == mime).map(|(_, href)| {
            let url = match &base {
                Some(base) => resolve_url(base, href),
                None => href.clone(),
            };
            DiscoveredFeed {
                url,
                format: (*format).to_string(),
            }
        })
    })
}

/// Fetch a home page and discover its feed.
pub async fn discover_feed(
    fetcher: &dyn Fetch,
    home_page_url: &str,
    timeout: std::time::Duration,
) -> Result<Option<DiscoveredFeed>> {
    let html = fetcher.get_text(home_page_url, &[], timeout).await?;
    let feed = find_feed_link(&html, home_page_url);
    match &feed {
        Some(feed) => log::info!("Discovered {} feed for {}: {}", feed.format, home_page_url, feed.url),
        None => log::warn!("No feed link found on {}", home_page_url),
    }
    Ok(feed)
}
