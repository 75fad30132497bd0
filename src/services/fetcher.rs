// src/services/fetcher.rs

//! reqwest-backed fetcher.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, StatusCode};

use super::Fetch;
use crate::error::{AppError, Result};
use crate::models::HttpConfig;
use crate::utils::http::create_async_client;

/// Fetcher over a shared reqwest client.
#[derive(Debug, Clone)]
pub struct HttpFetcher {
    client: Client,
    reference_timeout: Duration,
}

impl HttpFetcher {
    pub fn new(config: &HttpConfig) -> Result<Self> {
        Ok(Self {
            client: create_async_client(config)?,
            reference_timeout: config.reference_timeout(),
        })
    }

    pub fn client(&self) -> &Client {
        &self.client
    }
}

#[async_trait]
impl Fetch for HttpFetcher {
    async fn get_text(
        &self,
        url: &str,
        query: &[(String, String)],
        timeout: Duration,
    ) -> Result<String> {
        let response = self
            .client
            .get(url)
            .query(query)
            .timeout(timeout)
            .send()
            .await
            // query strings may carry credentials
            .map_err(|e| AppError::Http(e.without_url()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(AppError::fetch(url, format!("HTTP {status}")));
        }
        response
            .text()
            .await
            .map_err(|e| AppError::Http(e.without_url()))
    }

    async fn url_exists(&self, url: &str) -> Result<bool> {
        let response = self
            .client
            .head(url)
            .timeout(self.reference_timeout)
            .send()
            .await?;
        Ok(response.status() != StatusCode::NOT_FOUND)
    }
}
