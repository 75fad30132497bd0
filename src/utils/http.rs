// src/utils/http.rs

//! HTTP client utilities.

use std::time::Duration;

use crate::error::Result;
use crate::models::HttpConfig;

/// Create a configured asynchronous HTTP client.
///
/// The client-wide timeout is the feed timeout; shorter per-request timeouts
/// are applied by callers.
pub fn create_async_client(config: &HttpConfig) -> Result<reqwest::Client> {
    let client = reqwest::Client::builder()
        .user_agent(&config.user_agent)
        .timeout(config.feed_timeout())
        .connect_timeout(Duration::from_secs(10))
        .build()?;
    Ok(client)
}
