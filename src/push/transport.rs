//! HTTP delivery of remote-write batches.

use crate::error::{ExporterError, Result};
use crate::push::config::PushConfig;
use reqwest::header::{CONTENT_ENCODING, CONTENT_TYPE};
use reqwest::Client;
use std::future::Future;
use tracing::debug;

/// Protocol version header sent with every push.
pub const REMOTE_WRITE_VERSION: &str = "0.1.0";

/// Delivers encoded batches and probes local readiness.
pub trait PushTransport: Send + Sync {
    /// Whether the local server answers at all.
    fn probe(&self) -> impl Future<Output = bool> + Send;

    /// Send one compressed batch. Any 2xx response is success.
    fn push(&self, body: Vec<u8>) -> impl Future<Output = Result<()>> + Send;
}

/// reqwest-backed remote-write client.
#[derive(Debug, Clone)]
pub struct RemoteWriteClient {
    client: Client,
    url: String,
    username: String,
    api_token: String,
    health_url: String,
}

impl RemoteWriteClient {
    /// Create a client with the configured per-request timeout.
    pub fn new(config: &PushConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(config.request_timeout)
            .build()
            .map_err(|e| ExporterError::config_error(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            client,
            url: config.url.clone(),
            username: config.username.clone(),
            api_token: config.api_token.clone(),
            health_url: config.health_url.clone(),
        })
    }
}

impl PushTransport for RemoteWriteClient {
    async fn probe(&self) -> bool {
        match self.client.get(&self.health_url).send().await {
            Ok(_) => true,
            Err(e) => {
                debug!("Readiness probe to {} failed: {}", self.health_url, e);
                false
            }
        }
    }

    async fn push(&self, body: Vec<u8>) -> Result<()> {
        let response = self
            .client
            .post(&self.url)
            .basic_auth(&self.username, Some(&self.api_token))
            .header(CONTENT_TYPE, "application/x-protobuf")
            .header(CONTENT_ENCODING, "snappy")
            .header("X-Prometheus-Remote-Write-Version", REMOTE_WRITE_VERSION)
            .body(body)
            .send()
            .await?;

        let status = response.status();
        if status.is_success() {
            return Ok(());
        }

        let body = response.text().await.unwrap_or_default();
        Err(ExporterError::PushRejected {
            status: status.as_u16(),
            body,
        })
    }
}
