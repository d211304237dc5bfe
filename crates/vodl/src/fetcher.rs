// Retrying Fetcher: one logical GET with a per-attempt timeout and fixed-delay retries.

use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use reqwest::{Client, StatusCode};
use tokio_util::sync::CancellationToken;
use tracing::{debug, instrument};
use url::Url;

use crate::error::{AttemptError, VodError};
use crate::retry::{RetryAction, RetryPolicy, retry_with_delay};

/// Anything that can turn a URL into a body. The resolver and the segment
/// pipeline only talk to the network through this.
#[async_trait]
pub trait Fetch: Send + Sync {
    async fn fetch(&self, url: &Url) -> Result<Bytes, VodError>;
}

pub struct RetryingFetcher {
    client: Client,
    policy: RetryPolicy,
    /// Bounds each attempt, not the whole call.
    timeout: Duration,
    token: CancellationToken,
}

impl RetryingFetcher {
    pub fn new(
        client: Client,
        policy: RetryPolicy,
        timeout: Duration,
        token: CancellationToken,
    ) -> Self {
        Self {
            client,
            policy,
            timeout,
            token,
        }
    }

    async fn attempt(&self, url: &Url) -> Result<Bytes, AttemptError> {
        let request = async {
            let response = self
                .client
                .get(url.clone())
                .send()
                .await
                .map_err(AttemptError::Transport)?;
            let status = response.status();
            if status != StatusCode::OK {
                return Err(AttemptError::Status(status));
            }
            response.bytes().await.map_err(AttemptError::Transport)
        };

        match tokio::time::timeout(self.timeout, request).await {
            Ok(result) => result,
            Err(_) => Err(AttemptError::Timeout(self.timeout)),
        }
    }
}

#[async_trait]
impl Fetch for RetryingFetcher {
    #[instrument(level = "trace", skip_all, fields(url = %url))]
    async fn fetch(&self, url: &Url) -> Result<Bytes, VodError> {
        let bytes = retry_with_delay(&self.policy, &self.token, url.as_str(), |_| async {
            match self.attempt(url).await {
                Ok(bytes) => RetryAction::Success(bytes),
                Err(AttemptError::Transport(e)) if e.is_builder() => {
                    RetryAction::Fail(VodError::invalid_url(url.as_str(), e))
                }
                Err(e) => RetryAction::Retry(e),
            }
        })
        .await?;

        debug!(url = %url, size = bytes.len(), "Fetched");
        Ok(bytes)
    }
}
