//! Segmented VOD downloader engine.
//!
//! A manifest URL goes through four stages:
//!
//! 1. [`ManifestResolver`] fetches the manifest and, for multi-variant
//!    manifests, picks the first usable variant matching a
//!    [`QualityPredicate`], producing absolute segment addresses in playback order.
//! 2. [`SegmentPipeline`] downloads the segments with a fixed pool of workers
//!    into a per-video [`ScratchDir`]. Completion order is arbitrary.
//! 3. [`Reassembler`] concatenates the segment files in manifest order.
//! 4. The scratch directory is removed.
//!
//! [`VodDownloader`] sequences the stages and tags failures with the
//! [`Stage`] they happened in. Every network call goes through
//! [`RetryingFetcher`].

pub mod config;
pub mod downloader;
pub mod error;
pub mod fetcher;
pub mod manifest;
pub mod merge;
pub mod pipeline;
pub mod progress;
pub mod resolver;
pub mod retry;
pub mod workdir;

pub use config::{VodConfig, build_client};
pub use downloader::{VodArtifact, VodDownloader, VodRequest};
pub use error::{AttemptError, Stage, StageError, VodError};
pub use fetcher::{Fetch, RetryingFetcher};
pub use manifest::{Manifest, QualityPredicate, UNKNOWN_QUALITY, Variant};
pub use merge::{MergeStrategy, Reassembler};
pub use pipeline::{DownloadJob, SegmentPipeline, SegmentRecord, SegmentRecords};
pub use progress::{NoProgress, ProgressSink};
pub use resolver::{ManifestResolver, ResolvedManifest};
pub use retry::RetryPolicy;
pub use tokio_util::sync::CancellationToken;
pub use workdir::ScratchDir;
