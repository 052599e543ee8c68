//! HTTP fetcher for article pages
//!
//! One client is shared by all fetch workers; each request carries a
//! freshly picked user agent.

use crate::config::FetchConfig;
use crate::fetch::retry::FetchError;
use crate::useragent::pick_user_agent;
use reqwest::header::USER_AGENT;
use reqwest::{Client, StatusCode};
use std::time::Duration;

/// Builds the stage-2 HTTP client
///
/// The idle pool is sized to the worker count so every worker can keep a
/// connection open to the same host.
pub fn build_fetch_client(config: &FetchConfig) -> Result<Client, reqwest::Error> {
    Client::builder()
        .timeout(config.timeout())
        .pool_max_idle_per_host(config.workers.max(1))
        .pool_idle_timeout(Duration::from_secs(90))
        .gzip(true)
        .brotli(true)
        .build()
}

/// Fetches article HTML
#[derive(Debug, Clone)]
pub struct Fetcher {
    client: Client,
}

impl Fetcher {
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    pub fn from_config(config: &FetchConfig) -> Result<Self, reqwest::Error> {
        Ok(Self::new(build_fetch_client(config)?))
    }

    /// GETs `url` and returns the body of a 200 response
    ///
    /// Timeouts (while connecting or reading) map to [`FetchError::Timeout`];
    /// any status other than 200 is [`FetchError::Status`].
    pub async fn fetch(&self, url: &str) -> Result<String, FetchError> {
        let response = self
            .client
            .get(url)
            .header(USER_AGENT, pick_user_agent())
            .send()
            .await?;

        let status = response.status();
        if status != StatusCode::OK {
            return Err(FetchError::Status(status.as_u16()));
        }

        Ok(response.text().await?)
    }
}
