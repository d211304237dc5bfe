// Orchestrator: Resolving -> Downloading -> Merging -> Cleaning -> Done.

use std::path::PathBuf;
use std::sync::Arc;

use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument, warn};
use url::Url;

use crate::config::{VodConfig, build_client};
use crate::error::{Stage, StageError, VodError};
use crate::fetcher::{Fetch, RetryingFetcher};
use crate::merge::Reassembler;
use crate::pipeline::SegmentPipeline;
use crate::progress::ProgressSink;
use crate::resolver::ManifestResolver;
use crate::workdir::ScratchDir;

/// What to download and where the merged file goes.
#[derive(Debug, Clone)]
pub struct VodRequest {
    /// Names the scratch directory under the configured output dir.
    pub video_id: String,
    pub manifest_url: String,
    pub output_path: PathBuf,
}

/// A completed download.
///
/// With `segments == 0` nothing was written: no scratch directory and no file
/// at `path`.
#[derive(Debug)]
pub struct VodArtifact {
    pub path: PathBuf,
    pub quality: String,
    pub segments: usize,
    /// Scratch directory removal failure; does not fail the download.
    pub cleanup_error: Option<VodError>,
}

pub struct VodDownloader {
    config: Arc<VodConfig>,
    fetcher: Arc<dyn Fetch>,
    token: CancellationToken,
}

impl VodDownloader {
    /// Builds a downloader talking HTTP through a fresh client.
    pub fn new(config: VodConfig, token: CancellationToken) -> Result<Self, VodError> {
        config.validate()?;
        let client = build_client(&config)?;
        let fetcher = RetryingFetcher::new(
            client,
            config.retry_policy(),
            config.timeout,
            token.clone(),
        );
        Ok(Self::with_fetcher(config, Arc::new(fetcher), token))
    }

    /// Builds a downloader on top of an existing fetcher.
    pub fn with_fetcher(config: VodConfig, fetcher: Arc<dyn Fetch>, token: CancellationToken) -> Self {
        Self {
            config: Arc::new(config),
            fetcher,
            token,
        }
    }

    pub fn config(&self) -> &VodConfig {
        &self.config
    }

    /// Runs one download-and-merge operation.
    ///
    /// The scratch directory is removed only on success; on download or merge
    /// failure it is left on disk with whatever segments made it. A manifest
    /// without segments (including an unmatched quality) succeeds without
    /// touching the filesystem.
    #[instrument(skip_all, fields(video_id = %request.video_id))]
    pub async fn download(
        &self,
        request: &VodRequest,
        progress: Arc<dyn ProgressSink>,
    ) -> Result<VodArtifact, StageError> {
        let fail = |stage: Stage| move |source: VodError| StageError::new(stage, source);

        let mut stage = Stage::Resolving;
        debug!(%stage, url = %request.manifest_url, "Resolving manifest");
        let manifest_url = Url::parse(&request.manifest_url)
            .map_err(|e| VodError::invalid_url(request.manifest_url.as_str(), e))
            .map_err(fail(stage))?;
        let resolver = ManifestResolver::new(self.fetcher.clone(), self.config.quality.clone());
        let resolved = resolver.resolve(&manifest_url).await.map_err(fail(stage))?;
        let quality = resolved.quality().to_string();
        let segments = resolved.into_segments();
        if segments.is_empty() {
            warn!(
                url = %request.manifest_url,
                %quality,
                "Manifest resolved to no segments, nothing to download"
            );
            return Ok(VodArtifact {
                path: request.output_path.clone(),
                quality,
                segments: 0,
                cleanup_error: None,
            });
        }
        info!(%quality, segments = segments.len(), "Manifest resolved");

        stage = Stage::Downloading;
        let scratch = ScratchDir::create(&self.config.output_dir, &request.video_id)
            .await
            .map_err(fail(stage))?;
        let pipeline = SegmentPipeline::new(
            self.fetcher.clone(),
            self.config.worker_count,
            progress,
            self.token.clone(),
        );
        let records = pipeline
            .download(&segments, scratch.path())
            .await
            .map_err(fail(stage))?;

        stage = Stage::Merging;
        debug!(%stage, output = %request.output_path.display(), "Merging segments");
        Reassembler::new(self.config.merge.clone())
            .merge(&segments, &records, &request.output_path, scratch.path())
            .await
            .map_err(fail(stage))?;

        stage = Stage::Cleaning;
        debug!(%stage, path = %scratch.path().display(), "Removing scratch directory");
        let cleanup_error = cleanup(scratch).await;

        stage = Stage::Done;
        info!(
            %stage,
            path = %request.output_path.display(),
            %quality,
            segments = segments.len(),
            "Video downloaded"
        );
        Ok(VodArtifact {
            path: request.output_path.clone(),
            quality,
            segments: segments.len(),
            cleanup_error,
        })
    }
}

async fn cleanup(scratch: ScratchDir) -> Option<VodError> {
    let path = scratch.path().to_path_buf();
    match scratch.remove().await {
        Ok(()) => None,
        Err(e) => {
            warn!(path = %path.display(), error = %e, "Failed to remove scratch directory");
            Some(e)
        }
    }
}
