// src/services/resolver.rs

//! DOI content negotiation against the resolver.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, StatusCode, header};

use super::MetadataResolver;
use crate::error::{AppError, Result};
use crate::utils::doi::validate_doi;

const DOI_RESOLVER: &str = "https://doi.org";

/// Metadata representations the resolver can negotiate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Representation {
    CslJson,
    Bibliography { style: String, locale: String },
    BibTex,
    Ris,
    /// Registry-native document
    RegistryXml,
}

impl Representation {
    /// `Accept` header value selecting this representation.
    pub fn accept(&self) -> String {
        match self {
            Self::CslJson => "application/vnd.citationstyles.csl+json".into(),
            Self::Bibliography { style, locale } => {
                format!("text/x-bibliography; style={style}; locale={locale}")
            }
            Self::BibTex => "application/x-bibtex".into(),
            Self::Ris => "application/x-research-info-systems".into(),
            Self::RegistryXml => "application/vnd.crossref.unixsd+xml".into(),
        }
    }
}

/// Resolver client with its own short timeout.
#[derive(Debug, Clone)]
pub struct DoiResolver {
    client: Client,
    base_url: String,
    timeout: Duration,
}

impl DoiResolver {
    pub fn new(client: Client, timeout: Duration) -> Self {
        Self {
            client,
            base_url: DOI_RESOLVER.to_string(),
            timeout,
        }
    }

    /// Point at another resolver, e.g. a mirror.
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }
}

#[async_trait]
impl MetadataResolver for DoiResolver {
    async fn fetch(&self, doi: &str, representation: &Representation) -> Result<String> {
        let doi = validate_doi(doi)
            .ok_or_else(|| AppError::validation(format!("not a DOI: {doi}")))?;
        let url = format!("{}/{}", self.base_url.trim_end_matches('/'), doi);

        let response = self
            .client
            .get(&url)
            .header(header::ACCEPT, representation.accept())
            .timeout(self.timeout)
            .send()
            .await?;

        let status = response.status();
        if status == StatusCode::NOT_FOUND {
            return Err(AppError::NotFound(doi));
        }
        if status.is_server_error() {
            return Err(AppError::Upstream(format!("{doi}: HTTP {status}")));
        }
        if !status.is_success() {
            return Err(AppError::fetch(url, format!("HTTP {status}")));
        }
        Ok(response.text().await?)
    }
}
