use crate::config::UpstreamConfig;
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::sync::Semaphore;
use tracing::{debug, warn};
use url::Url;

/// The engine accepts at most this many results per request.
pub const MAX_RESULTS_PER_REQUEST: usize = 100;

#[derive(Debug, Error)]
pub enum UpstreamError {
    #[error("Request timeout")]
    Timeout,

    #[error("HTTP error: {0}")]
    Http(StatusCode),

    #[error("Transport error: {0}")]
    Transport(String),

    #[error("Invalid upstream response: {0}")]
    Protocol(String),

    #[error("Upstream reported an error: {0}")]
    Reported(String),

    #[error("Upstream misconfigured: {0}")]
    Config(String),
}

impl UpstreamError {
    #[must_use]
    pub const fn is_timeout(&self) -> bool {
        matches!(self, Self::Timeout)
    }
}

impl From<reqwest::Error> for UpstreamError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            Self::Timeout
        } else if let Some(status) = err.status() {
            Self::Http(status)
        } else if err.is_decode() {
            Self::Protocol(err.to_string())
        } else {
            Self::Transport(err.to_string())
        }
    }
}

/// Source of raw shopping records.
#[async_trait::async_trait]
pub trait UpstreamSearch: Send + Sync {
    /// Fetches up to `max_results` raw records for `query`.
    async fn search(
        &self,
        query: &str,
        max_results: usize,
    ) -> Result<Vec<serde_json::Value>, UpstreamError>;

    /// Stops accepting new requests.
    fn close(&self) {}
}

#[derive(Debug, Deserialize)]
struct ShoppingResponse {
    #[serde(default)]
    shopping_results: Vec<serde_json::Value>,
    #[serde(default)]
    error: Option<String>,
}

#[derive(Clone)]
pub struct SerpApiClient {
    client: Client,
    config: UpstreamConfig,
    permits: Arc<Semaphore>,
}

impl SerpApiClient {
    pub fn new(config: UpstreamConfig) -> anyhow::Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_seconds))
            .user_agent(config.user_agent.as_str())
            .pool_max_idle_per_host(config.max_idle_per_host)
            .build()
            .map_err(|e| anyhow::anyhow!("Failed to build HTTP client: {e}"))?;

        Ok(Self::with_client(client, config))
    }

    #[must_use]
    pub fn with_client(client: Client, config: UpstreamConfig) -> Self {
        let permits = Arc::new(Semaphore::new(config.max_connections.max(1)));
        Self {
            client,
            config,
            permits,
        }
    }

    #[must_use]
    pub fn is_configured(&self) -> bool {
        !self.config.api_key.is_empty()
    }

    fn request_url(&self, query: &str, max_results: usize) -> Result<Url, UpstreamError> {
        let mut url = Url::parse(&self.config.base_url)
            .map_err(|e| UpstreamError::Config(format!("invalid base_url: {e}")))?;

        let num = max_results.clamp(1, MAX_RESULTS_PER_REQUEST).to_string();
        url.query_pairs_mut()
            .append_pair("engine", &self.config.engine)
            .append_pair("q", query)
            .append_pair("api_key", &self.config.api_key)
            .append_pair("num", &num)
            .append_pair("gl", &self.config.country)
            .append_pair("hl", &self.config.language);

        Ok(url)
    }
}

#[async_trait::async_trait]
impl UpstreamSearch for SerpApiClient {
    async fn search(
        &self,
        query: &str,
        max_results: usize,
    ) -> Result<Vec<serde_json::Value>, UpstreamError> {
        if !self.is_configured() {
            return Err(UpstreamError::Config("API key is not set".to_string()));
        }

        let url = self.request_url(query, max_results)?;

        let _permit = self
            .permits
            .acquire()
            .await
            .map_err(|_| UpstreamError::Transport("client is closed".to_string()))?;

        debug!(query, max_results, "Fetching shopping results");

        let response = self.client.get(url).send().await?;
        let status = response.status();

        if !status.is_success() {
            warn!(query, %status, "Upstream returned error status");
            return Err(UpstreamError::Http(status));
        }

        let body: ShoppingResponse = response.json().await?;

        if let Some(message) = body.error {
            return Err(UpstreamError::Reported(message));
        }

        Ok(body.shopping_results)
    }

    fn close(&self) {
        self.permits.close();
    }
}
