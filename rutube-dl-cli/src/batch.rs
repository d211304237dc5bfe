use std::path::PathBuf;
use std::sync::Arc;

use rutube_api::{RutubeClient, extract_video_id};
use tokio_util::sync::CancellationToken;
use tracing::{Instrument, error, info, info_span, warn};
use vodl_engine::{VodArtifact, VodDownloader, VodRequest};

use crate::error::{AppError, Result};
use crate::naming::artifact_path;
use crate::progress::SpanProgress;

/// Tally of one feed run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BatchSummary {
    pub succeeded: usize,
    pub failed: usize,
    pub skipped: usize,
}

impl BatchSummary {
    pub fn attempted(&self) -> usize {
        self.succeeded + self.failed
    }
}

/// Turns video links and feeds into downloader runs, one video at a time.
pub struct BatchRunner {
    api: RutubeClient,
    downloader: VodDownloader,
    artifact_dir: PathBuf,
    token: CancellationToken,
}

impl BatchRunner {
    pub fn new(
        api: RutubeClient,
        downloader: VodDownloader,
        artifact_dir: PathBuf,
        token: CancellationToken,
    ) -> Self {
        Self {
            api,
            downloader,
            artifact_dir,
            token,
        }
    }

    /// Downloads one video given its page URL.
    pub async fn download_link(&self, link: &str) -> Result<VodArtifact> {
        let video_id = extract_video_id(link)?;
        let meta = self.api.video_metadata(&video_id).await?;
        let request = VodRequest {
            output_path: artifact_path(&self.artifact_dir, &meta.title, &video_id),
            video_id,
            manifest_url: meta.manifest_url,
        };

        let span = info_span!("video", id = %request.video_id);
        let progress = Arc::new(SpanProgress::new(span.clone(), meta.title.clone()));
        info!(title = %meta.title, output = %request.output_path.display(), "Downloading video");

        let artifact = self
            .downloader
            .download(&request, progress)
            .instrument(span)
            .await?;
        if let Some(e) = &artifact.cleanup_error {
            warn!(error = %e, "Video saved but scratch files were left behind");
        }
        Ok(artifact)
    }

    /// Downloads every feed entry numbered `from_episode` or later.
    ///
    /// A failed video is logged and skipped; only listing failures and
    /// cancellation abort the run.
    pub async fn download_feed(&self, feed_id: &str, from_episode: u32) -> Result<BatchSummary> {
        let items = self.api.feed_items(feed_id).await?;
        info!(feed_id, items = items.len(), "Feed listed");

        let mut summary = BatchSummary::default();
        for item in items {
            if self.token.is_cancelled() {
                return Err(AppError::Cancelled);
            }
            if item.episode < from_episode {
                info!(episode = item.episode, title = %item.title, "Episode skipped");
                summary.skipped += 1;
                continue;
            }

            info!(episode = item.episode, title = %item.title, "Processing episode");
            match self.download_link(&item.video_url).await {
                Ok(_) => summary.succeeded += 1,
                Err(e) if e.is_cancelled() => return Err(e),
                Err(e) => {
                    error!(
                        episode = item.episode,
                        url = %item.video_url,
                        error = %e,
                        "Episode failed, continuing with the next one"
                    );
                    summary.failed += 1;
                }
            }
        }

        info!(
            succeeded = summary.succeeded,
            failed = summary.failed,
            skipped = summary.skipped,
            "Feed finished"
        );
        Ok(summary)
    }
}
