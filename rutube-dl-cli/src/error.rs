use std::path::PathBuf;

use rutube_api::ApiError;
use thiserror::Error;
use vodl_engine::{StageError, VodError};

pub type Result<T> = std::result::Result<T, AppError>;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("failed to read config {}: {source}", path.display())]
    ConfigRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config {}: {source}", path.display())]
    ConfigParse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("API error: {0}")]
    Api(#[from] ApiError),

    #[error("Engine error: {0}")]
    Engine(#[from] VodError),

    #[error("Download error: {0}")]
    Download(#[from] StageError),

    #[error("{failed} of {attempted} videos failed")]
    BatchFailed { failed: usize, attempted: usize },

    #[error("Interrupted")]
    Cancelled,
}

impl AppError {
    pub fn is_cancelled(&self) -> bool {
        match self {
            Self::Cancelled => true,
            Self::Engine(e) => e.is_cancelled(),
            Self::Download(e) => e.source.is_cancelled(),
            _ => false,
        }
    }
}
