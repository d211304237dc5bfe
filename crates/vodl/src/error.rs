use std::path::{Path, PathBuf};
use std::time::Duration;

use reqwest::StatusCode;

/// Why a single HTTP attempt did not produce a body.
#[derive(Debug, thiserror::Error)]
pub enum AttemptError {
    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("unexpected HTTP status {0}")]
    Status(StatusCode),

    #[error("attempt timed out after {0:?}")]
    Timeout(Duration),
}

#[derive(Debug, thiserror::Error)]
pub enum VodError {
    #[error("download cancelled")]
    Cancelled,

    #[error("invalid URL `{input}`: {reason}")]
    InvalidUrl { input: String, reason: String },

    #[error("configuration error: {reason}")]
    Configuration { reason: String },

    #[error("failed to fetch {url} after {attempts} attempt(s): {last_error}")]
    FetchExhausted {
        url: String,
        attempts: u32,
        #[source]
        last_error: AttemptError,
    },

    #[error("failed to fetch manifest {url}: {source}")]
    ManifestFetch {
        url: String,
        #[source]
        source: Box<VodError>,
    },

    #[error("unknown manifest type at {url}: {reason}")]
    UnknownManifestType { url: String, reason: String },

    #[error("failed to write segment {path}: {source}")]
    SegmentWrite {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("no downloaded segment recorded for {address}")]
    MissingSegmentRecord { address: String },

    #[error("merge I/O error on {path}: {source}")]
    MergeIo {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("ffmpeg concat failed: {reason}")]
    Ffmpeg { reason: String },

    #[error("failed to create directory {path}: {source}")]
    DirectoryCreate {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to remove directory {path}: {source}")]
    DirectoryRemove {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("internal error: {reason}")]
    Internal { reason: String },
}

impl VodError {
    pub fn invalid_url(input: impl Into<String>, reason: impl ToString) -> Self {
        Self::InvalidUrl {
            input: input.into(),
            reason: reason.to_string(),
        }
    }

    pub fn configuration(reason: impl Into<String>) -> Self {
        Self::Configuration {
            reason: reason.into(),
        }
    }

    pub fn manifest_fetch(url: impl Into<String>, source: VodError) -> Self {
        Self::ManifestFetch {
            url: url.into(),
            source: Box::new(source),
        }
    }

    pub fn unknown_manifest(url: impl Into<String>, reason: impl ToString) -> Self {
        Self::UnknownManifestType {
            url: url.into(),
            reason: reason.to_string(),
        }
    }

    pub fn segment_write(path: &Path, source: std::io::Error) -> Self {
        Self::SegmentWrite {
            path: path.to_path_buf(),
            source,
        }
    }

    pub fn merge_io(path: &Path, source: std::io::Error) -> Self {
        Self::MergeIo {
            path: path.to_path_buf(),
            source,
        }
    }

    pub fn is_cancelled(&self) -> bool {
        match self {
            Self::Cancelled => true,
            Self::ManifestFetch { source, .. } => source.is_cancelled(),
            _ => false,
        }
    }
}

/// Pipeline stage an orchestrated download was in when it failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Resolving,
    Downloading,
    Merging,
    Cleaning,
    Done,
}

impl Stage {
    pub fn as_str(&self) -> &'static str {
        match self {
            Stage::Resolving => "resolve",
            Stage::Downloading => "download",
            Stage::Merging => "merge",
            Stage::Cleaning => "cleanup",
            Stage::Done => "done",
        }
    }
}

impl std::fmt::Display for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Terminal `Failed(stage, cause)` of the download state machine.
#[derive(Debug, thiserror::Error)]
#[error("{stage} stage failed: {source}")]
pub struct StageError {
    pub stage: Stage,
    #[source]
    pub source: VodError,
}

impl StageError {
    pub fn new(stage: Stage, source: VodError) -> Self {
        Self { stage, source }
    }
}
