use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::debug;
use vodl_engine::{MergeStrategy, QualityPredicate, VodConfig};

use crate::cli::Args;
use crate::error::{AppError, Result};

const CONFIG_FILE: &str = "config.toml";
const APP_DIR: &str = "rutube-dl";

/// File-backed settings. Every field is optional in the TOML file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Root of the per-video scratch directories
    pub output_dir: PathBuf,
    /// Where merged `<title>.mp4` files are written
    pub artifact_dir: PathBuf,
    pub workers: usize,
    pub quality: String,
    pub timeout_secs: u64,
    pub max_attempts: u32,
    pub retry_delay_ms: u64,
    pub with_ffmpeg: bool,
    pub ffmpeg_path: PathBuf,
    pub api_base_url: String,
    pub user_agent: Option<String>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            output_dir: PathBuf::from("downloads"),
            artifact_dir: PathBuf::from("."),
            workers: 1,
            quality: "1920x".to_string(),
            timeout_secs: 60,
            max_attempts: 3,
            retry_delay_ms: 2000,
            with_ffmpeg: false,
            ffmpeg_path: PathBuf::from("ffmpeg"),
            api_base_url: rutube_api::DEFAULT_BASE_URL.to_string(),
            user_agent: None,
        }
    }
}

impl AppConfig {
    /// Loads `path`, or the default config file when present.
    ///
    /// An explicit path must exist; a missing default file yields defaults.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(path) => Self::from_file(path),
            None => match default_path() {
                Some(path) if path.is_file() => Self::from_file(&path),
                _ => Ok(Self::default()),
            },
        }
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path).map_err(|source| AppError::ConfigRead {
            path: path.to_path_buf(),
            source,
        })?;
        let config = toml::from_str(&raw).map_err(|source| AppError::ConfigParse {
            path: path.to_path_buf(),
            source,
        })?;
        debug!(path = %path.display(), "Loaded config file");
        Ok(config)
    }

    /// Command-line flags win over file values.
    pub fn apply_args(&mut self, args: &Args) {
        if let Some(dir) = &args.dir {
            self.output_dir = dir.clone();
        }
        if let Some(workers) = args.workers {
            self.workers = workers;
        }
        if let Some(quality) = &args.quality {
            self.quality = quality.clone();
        }
        if let Some(timeout) = args.timeout {
            self.timeout_secs = timeout;
        }
        if let Some(retries) = args.retries {
            self.max_attempts = retries;
        }
        if let Some(delay) = args.retry_delay {
            self.retry_delay_ms = delay;
        }
        if args.with_ffmpeg {
            self.with_ffmpeg = true;
        }
        if let Some(path) = &args.ffmpeg_path {
            self.ffmpeg_path = path.clone();
        }
    }

    pub fn vod_config(&self) -> Result<VodConfig> {
        let quality: QualityPredicate = self.quality.parse()?;
        let merge = if self.with_ffmpeg {
            MergeStrategy::Ffmpeg {
                binary: self.ffmpeg_path.clone(),
            }
        } else {
            MergeStrategy::Concat
        };
        let config = VodConfig {
            timeout: Duration::from_secs(self.timeout_secs),
            max_attempts: self.max_attempts,
            retry_delay: Duration::from_millis(self.retry_delay_ms),
            output_dir: self.output_dir.clone(),
            worker_count: self.workers,
            quality,
            merge,
            user_agent: self.user_agent.clone(),
        };
        config.validate()?;
        Ok(config)
    }
}

pub fn default_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join(APP_DIR).join(CONFIG_FILE))
}
