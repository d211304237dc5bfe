// Segment Pipeline: a fixed pool of workers draining a shared job queue.
//
// Workers complete jobs in any order; ordering is restored later by the
// reassembler, which walks the manifest order.

use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use parking_lot::Mutex;
use tokio::sync::mpsc;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, trace};
use url::Url;

use crate::error::VodError;
use crate::fetcher::Fetch;
use crate::progress::ProgressSink;

/// One segment to fetch and where to put it.
#[derive(Debug, Clone)]
pub struct DownloadJob {
    pub address: Url,
    pub destination: PathBuf,
}

/// A segment that made it to disk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SegmentRecord {
    pub address: Url,
    pub path: PathBuf,
}

/// Local file per downloaded segment address.
pub type SegmentRecords = HashMap<Url, PathBuf>;

type JobQueue = Arc<tokio::sync::Mutex<mpsc::Receiver<DownloadJob>>>;

pub struct SegmentPipeline {
    fetcher: Arc<dyn Fetch>,
    worker_count: usize,
    progress: Arc<dyn ProgressSink>,
    token: CancellationToken,
}

impl SegmentPipeline {
    pub fn new(
        fetcher: Arc<dyn Fetch>,
        worker_count: usize,
        progress: Arc<dyn ProgressSink>,
        token: CancellationToken,
    ) -> Self {
        Self {
            fetcher,
            worker_count,
            progress,
            token,
        }
    }

    /// Downloads every address into `work_dir`.
    ///
    /// Returns only after all workers exited. The first segment that cannot be
    /// fetched fails the whole call; segments already written stay on disk.
    pub async fn download(
        &self,
        addresses: &[Url],
        work_dir: &Path,
    ) -> Result<SegmentRecords, VodError> {
        if self.worker_count == 0 {
            return Err(VodError::configuration("worker_count must be at least 1"));
        }
        if addresses.is_empty() {
            debug!("No segments to download");
            return Ok(SegmentRecords::new());
        }

        // Capacity covers every job, so enqueueing never waits on a consumer.
        let (tx, rx) = mpsc::channel(addresses.len());
        let names = unique_file_names(addresses);
        for (address, name) in addresses.iter().zip(names) {
            let job = DownloadJob {
                address: address.clone(),
                destination: work_dir.join(name),
            };
            tx.try_send(job)
                .map_err(|e| VodError::Internal {
                    reason: format!("job queue rejected segment: {e}"),
                })?;
        }
        drop(tx);

        let jobs: JobQueue = Arc::new(tokio::sync::Mutex::new(rx));
        let records = Arc::new(Mutex::new(Vec::with_capacity(addresses.len())));
        let first_error: Arc<Mutex<Option<VodError>>> = Arc::new(Mutex::new(None));
        // Cancelled on the first fatal error so idle workers stop taking jobs.
        // In-flight fetches keep the parent token and are allowed to finish.
        let failed = self.token.child_token();

        let workers = self.worker_count.min(addresses.len());
        info!(
            segments = addresses.len(),
            workers,
            "Starting segment download"
        );
        self.progress.start(addresses.len() as u64);

        let mut set = JoinSet::new();
        for worker_id in 0..workers {
            let worker = Worker {
                id: worker_id,
                jobs: jobs.clone(),
                fetcher: self.fetcher.clone(),
                records: records.clone(),
                progress: self.progress.clone(),
                first_error: first_error.clone(),
                failed: failed.clone(),
            };
            set.spawn(worker.run());
        }

        while let Some(joined) = set.join_next().await {
            if let Err(e) = joined {
                error!(error = %e, "Segment worker panicked");
                first_error.lock().get_or_insert(VodError::Internal {
                    reason: format!("segment worker panicked: {e}"),
                });
                failed.cancel();
            }
        }
        self.progress.finish();

        if let Some(err) = first_error.lock().take() {
            return Err(err);
        }
        if self.token.is_cancelled() {
            return Err(VodError::Cancelled);
        }

        let records = std::mem::take(&mut *records.lock());
        debug!(downloaded = records.len(), "All segment workers finished");
        Ok(records
            .into_iter()
            .map(|record| (record.address, record.path))
            .collect())
    }
}

struct Worker {
    id: usize,
    jobs: JobQueue,
    fetcher: Arc<dyn Fetch>,
    records: Arc<Mutex<Vec<SegmentRecord>>>,
    progress: Arc<dyn ProgressSink>,
    first_error: Arc<Mutex<Option<VodError>>>,
    failed: CancellationToken,
}

impl Worker {
    async fn run(self) {
        loop {
            let next = tokio::select! {
                biased;
                _ = self.failed.cancelled() => None,
                job = async { self.jobs.lock().await.recv().await } => job,
            };
            let Some(job) = next else {
                trace!(worker = self.id, "Worker exiting");
                return;
            };

            match self.process(&job).await {
                Ok(()) => {
                    self.records.lock().push(SegmentRecord {
                        address: job.address,
                        path: job.destination,
                    });
                    self.progress.tick();
                }
                Err(err) => {
                    error!(
                        worker = self.id,
                        url = %job.address,
                        error = %err,
                        "Segment download failed"
                    );
                    self.first_error.lock().get_or_insert(err);
                    self.failed.cancel();
                    return;
                }
            }
        }
    }

    async fn process(&self, job: &DownloadJob) -> Result<(), VodError> {
        let bytes = self.fetcher.fetch(&job.address).await?;
        tokio::fs::write(&job.destination, &bytes)
            .await
            .map_err(|e| VodError::segment_write(&job.destination, e))?;
        trace!(
            worker = self.id,
            path = %job.destination.display(),
            size = bytes.len(),
            "Segment written"
        );
        Ok(())
    }
}

/// Final path component of the address, or a positional name when it has none.
pub fn segment_file_name(address: &Url, index: usize) -> String {
    address
        .path_segments()
        .and_then(|mut segments| segments.next_back())
        .filter(|name| !name.is_empty() && *name != "." && *name != "..")
        .map(str::to_string)
        .unwrap_or_else(|| format!("segment-{index:05}"))
}

/// One scratch file name per address, in address order.
///
/// A name already taken by an earlier address gets its index as a prefix,
/// so `a/seg.ts?n=1` and `b/seg.ts?n=2` never share a file.
pub fn unique_file_names(addresses: &[Url]) -> Vec<String> {
    let mut taken = HashSet::with_capacity(addresses.len());
    addresses
        .iter()
        .enumerate()
        .map(|(index, address)| {
            let base = segment_file_name(address, index);
            let mut name = base.clone();
            let mut round = 0usize;
            while !taken.insert(name.clone()) {
                round += 1;
                name = if round == 1 {
                    format!("{index:05}-{base}")
                } else {
                    format!("{index:05}-{round}-{base}")
                };
            }
            name
        })
        .collect()
}
