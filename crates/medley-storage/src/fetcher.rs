//! HTTP content download, used for FTP integrity checks and thumbnail seeding.

use async_trait::async_trait;
use bytes::Bytes;
use reqwest::Client;
use std::time::Duration;

use crate::error::{BackendError, BackendResult};

#[async_trait]
pub trait ContentFetcher: Send + Sync {
    /// Download the full body at `url`. Non-2xx statuses are errors.
    async fn fetch(&self, url: &str) -> BackendResult<Bytes>;
}

/// reqwest-backed fetcher
#[derive(Clone)]
pub struct HttpFetcher {
    client: Client,
}

impl HttpFetcher {
    pub fn new(client: Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl ContentFetcher for HttpFetcher {
    async fn fetch(&self, url: &str) -> BackendResult<Bytes> {
        let start = std::time::Instant::now();
        let response = self.client.get(url).send().await?;

        let status = response.status();
        if !status.is_success() {
            return Err(BackendError::Internal(format!(
                "GET {} returned status {}",
                url, status
            )));
        }

        let body = response.bytes().await?;
        tracing::debug!(
            url = %url,
            size_bytes = body.len(),
            duration_ms = start.elapsed().as_secs_f64() * 1000.0,
            "Fetched remote content"
        );
        Ok(body)
    }
}

/// Shared HTTP client with the configured timeout and user agent.
pub fn build_http_client(timeout: Duration, user_agent: &str) -> BackendResult<Client> {
    Client::builder()
        .timeout(timeout)
        .user_agent(user_agent)
        .build()
        .map_err(|e| BackendError::Config(format!("Failed to create HTTP client: {}", e)))
}
