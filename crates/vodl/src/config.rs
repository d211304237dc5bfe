use std::path::PathBuf;
use std::sync::OnceLock;
use std::time::Duration;

use reqwest::Client;
use tracing::debug;

use crate::error::VodError;
use crate::manifest::QualityPredicate;
use crate::merge::MergeStrategy;
use crate::retry::RetryPolicy;

/// Settings shared by every component of one downloader instance.
#[derive(Debug, Clone)]
pub struct VodConfig {
    /// Deadline for a single HTTP attempt
    pub timeout: Duration,

    /// Retry ceiling per fetch, first attempt included
    pub max_attempts: u32,

    /// Fixed pause between attempts
    pub retry_delay: Duration,

    /// Root of the per-video scratch directories
    pub output_dir: PathBuf,

    /// Number of concurrent segment workers
    pub worker_count: usize,

    /// Which variant of a multi-variant manifest to download
    pub quality: QualityPredicate,

    /// How downloaded segments become one artifact
    pub merge: MergeStrategy,

    /// Overrides reqwest's default user agent when set
    pub user_agent: Option<String>,
}

impl Default for VodConfig {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(60),
            max_attempts: 3,
            retry_delay: Duration::from_secs(2),
            output_dir: PathBuf::from("./downloads"),
            worker_count: 1,
            quality: QualityPredicate::default(),
            merge: MergeStrategy::Concat,
            user_agent: None,
        }
    }
}

impl VodConfig {
    pub fn validate(&self) -> Result<(), VodError> {
        if self.max_attempts == 0 {
            return Err(VodError::configuration("max_attempts must be at least 1"));
        }
        if self.worker_count == 0 {
            return Err(VodError::configuration("worker_count must be at least 1"));
        }
        if self.timeout.is_zero() {
            return Err(VodError::configuration("timeout must be greater than zero"));
        }
        Ok(())
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy {
            max_attempts: self.max_attempts,
            delay: self.retry_delay,
        }
    }
}

fn install_rustls_provider() {
    static PROVIDER_INSTALLED: OnceLock<()> = OnceLock::new();
    PROVIDER_INSTALLED.get_or_init(|| {
        if let Err(e) = rustls::crypto::aws_lc_rs::default_provider().install_default() {
            debug!(existing_provider = ?e, "rustls CryptoProvider already installed");
        }
    });
}

/// Builds the HTTP client used for manifests, segments and metadata calls.
///
/// Timeouts are applied per attempt by the fetcher, so the client itself
/// only bounds connection setup.
pub fn build_client(config: &VodConfig) -> Result<Client, VodError> {
    install_rustls_provider();

    let mut builder = Client::builder().connect_timeout(config.timeout);
    if let Some(user_agent) = &config.user_agent {
        builder = builder.user_agent(user_agent.as_str());
    }
    builder
        .build()
        .map_err(|e| VodError::configuration(format!("failed to build HTTP client: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        let config = VodConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.retry_policy().max_attempts, 3);
        assert_eq!(config.retry_policy().delay, Duration::from_secs(2));
    }

    #[test]
    fn zero_workers_rejected() {
        let config = VodConfig {
            worker_count: 0,
            ..Default::default()
        };
        assert!(matches!(
            config.validate(),
            Err(VodError::Configuration { .. })
        ));
    }

    #[test]
    fn zero_attempts_rejected() {
        let config = VodConfig {
            max_attempts: 0,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }
}
