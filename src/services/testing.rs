// src/services/testing.rs

//! In-process stand-ins for the network collaborators.

use std::collections::{HashMap, HashSet};
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;

use super::{Fetch, MetadataResolver, Representation};
use crate::error::{AppError, Result};
use crate::utils::doi::validate_doi;

/// Serves canned documents by URL.
#[derive(Debug, Default)]
pub struct StubFetcher {
    pages: HashMap<String, String>,
    existing: HashSet<String>,
    /// Requests issued, `url?k=v&...`
    pub requests: Mutex<Vec<String>>,
}

impl StubFetcher {
    pub fn with_page(mut self, url: &str, body: &str) -> Self {
        self.pages.insert(url.to_string(), body.to_string());
        self
    }

    pub fn with_existing(mut self, url: &str) -> Self {
        self.existing.insert(url.to_string());
        self
    }

    pub fn request_log(&self) -> Vec<String> {
        self.requests.lock().map(|r| r.clone()).unwrap_or_default()
    }
}

#[async_trait]
impl Fetch for StubFetcher {
    async fn get_text(
        &self,
        url: &str,
        query: &[(String, String)],
        _timeout: Duration,
    ) -> Result<String> {
        let rendered = if query.is_empty() {
            url.to_string()
        } else {
            let params: Vec<String> = query.iter().map(|(k, v)| format!("{k}={v}")).collect();
            format!("{url}?{}", params.join("&"))
        };
        if let Ok(mut requests) = self.requests.lock() {
            requests.push(rendered);
        }

        self.pages
            .get(url)
            .cloned()
            .ok_or_else(|| AppError::fetch(url, "HTTP 404 Not Found"))
    }

    async fn url_exists(&self, url: &str) -> Result<bool> {
        Ok(self.existing.contains(url))
    }
}

/// Answers CSL and bibliography requests from fixed tables.
#[derive(Debug, Default)]
pub struct StubResolver {
    csl: HashMap<String, serde_json::Value>,
    bibliography: HashMap<String, String>,
}

impl StubResolver {
    pub fn with_title(doi: &str, title: &str, year: i64) -> Self {
        Self::default().with_csl(
            doi,
            serde_json::json!({
                "title": title,
                "type": "journal-article",
                "issued": {"date-parts": [[year, 3, 14]]}
            }),
        )
    }

    pub fn with_csl(mut self, doi: &str, csl: serde_json::Value) -> Self {
        self.csl.insert(key(doi), csl);
        self
    }

    pub fn with_bibliography(mut self, doi: &str, text: &str) -> Self {
        self.bibliography.insert(key(doi), text.to_string());
        self
    }
}

fn key(doi: &str) -> String {
    validate_doi(doi).unwrap_or_else(|| doi.to_string()).to_lowercase()
}

#[async_trait]
impl MetadataResolver for StubResolver {
    async fn fetch(&self, doi: &str, representation: &Representation) -> Result<String> {
        let found = match representation {
            Representation::CslJson => self.csl.get(&key(doi)).map(|v| v.to_string()),
            Representation::Bibliography { .. } => self.bibliography.get(&key(doi)).cloned(),
            _ => None,
        };
        found.ok_or_else(|| AppError::NotFound(doi.to_string()))
    }
}
