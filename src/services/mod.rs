//! Service layer for outbound I/O.
//!
//! This module contains the network collaborators of the pipelines:
//! - `fetcher`: feed pages, API pages and link existence checks
//! - `resolver`: DOI content negotiation
//! - `discovery`: feed discovery from a blog's home page
//! - `crossref`: forward-citation graphs per DOI prefix

pub mod crossref;
pub mod discovery;
pub mod fetcher;
pub mod resolver;

#[cfg(test)]
pub mod testing;

use std::time::Duration;

use async_trait::async_trait;

use crate::error::Result;

pub use crossref::{ForwardLink, fetch_forward_links};
pub use discovery::{DiscoveredFeed, discover_feed};
pub use fetcher::HttpFetcher;
pub use resolver::{DoiResolver, Representation};

/// Outbound HTTP reads.
#[async_trait]
pub trait Fetch: Send + Sync {
    /// GET a document as text; non-success statuses are errors.
    async fn get_text(
        &self,
        url: &str,
        query: &[(String, String)],
        timeout: Duration,
    ) -> Result<String>;

    /// Whether a link resolves, i.e. a HEAD request does not answer 404.
    async fn url_exists(&self, url: &str) -> Result<bool>;
}

/// DOI metadata by content negotiation.
#[async_trait]
pub trait MetadataResolver: Send + Sync {
    /// Fetch one representation of a DOI's metadata.
    async fn fetch(&self, doi: &str, representation: &Representation) -> Result<String>;

    /// Machine-readable CSL-JSON record.
    async fn csl(&self, doi: &str) -> Result<serde_json::Value> {
        let body = self.fetch(doi, &Representation::CslJson).await?;
        Ok(serde_json::from_str(&body)?)
    }

    /// Formatted citation string.
    async fn bibliography(&self, doi: &str, style: &str, locale: &str) -> Result<String> {
        let representation = Representation::Bibliography {
            style: style.to_string(),
            locale: locale.to_string(),
        };
        let body = self.fetch(doi, &representation).await?;
        Ok(body.trim().to_string())
    }
}
