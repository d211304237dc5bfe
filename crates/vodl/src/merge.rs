// Reassembler: stitches downloaded segments back together in manifest order.

use std::path::{Path, PathBuf};
use std::process::Stdio;

use tokio::fs::File;
use tokio::io::{AsyncWriteExt, BufWriter};
use tracing::{debug, info};
use url::Url;

use crate::error::VodError;
use crate::pipeline::SegmentRecords;

const CONCAT_LIST_NAME: &str = "concat.txt";

/// How segment files become the final artifact.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum MergeStrategy {
    /// Plain byte concatenation.
    #[default]
    Concat,
    /// `ffmpeg -f concat ... -c copy` (stream copy, no re-encoding).
    Ffmpeg { binary: PathBuf },
}

pub struct Reassembler {
    strategy: MergeStrategy,
}

impl Reassembler {
    pub fn new(strategy: MergeStrategy) -> Self {
        Self { strategy }
    }

    /// Writes `output` from the segments of `ordered`, in that order.
    ///
    /// Output is written in place: a failure part-way leaves a partial file.
    pub async fn merge(
        &self,
        ordered: &[Url],
        records: &SegmentRecords,
        output: &Path,
        work_dir: &Path,
    ) -> Result<(), VodError> {
        match &self.strategy {
            MergeStrategy::Concat => concat(ordered, records, output).await?,
            MergeStrategy::Ffmpeg { binary } => {
                ffmpeg_concat(binary, ordered, records, output, work_dir).await?
            }
        }
        info!(
            output = %output.display(),
            segments = ordered.len(),
            "Segments merged"
        );
        Ok(())
    }
}

fn lookup<'a>(records: &'a SegmentRecords, address: &Url) -> Result<&'a PathBuf, VodError> {
    records
        .get(address)
        .ok_or_else(|| VodError::MissingSegmentRecord {
            address: address.to_string(),
        })
}

async fn concat(ordered: &[Url], records: &SegmentRecords, output: &Path) -> Result<(), VodError> {
    let file = File::create(output)
        .await
        .map_err(|e| VodError::merge_io(output, e))?;
    let mut writer = BufWriter::new(file);

    for address in ordered {
        let path = lookup(records, address)?;
        let mut segment = File::open(path)
            .await
            .map_err(|e| VodError::merge_io(path, e))?;
        let copied = tokio::io::copy(&mut segment, &mut writer)
            .await
            .map_err(|e| VodError::merge_io(output, e))?;
        debug!(path = %path.display(), bytes = copied, "Appended segment");
    }

    writer
        .flush()
        .await
        .map_err(|e| VodError::merge_io(output, e))?;
    Ok(())
}

async fn ffmpeg_concat(
    binary: &Path,
    ordered: &[Url],
    records: &SegmentRecords,
    output: &Path,
    work_dir: &Path,
) -> Result<(), VodError> {
    let list = concat_list(ordered, records)?;
    let list_path = work_dir.join(CONCAT_LIST_NAME);
    tokio::fs::write(&list_path, list)
        .await
        .map_err(|e| VodError::merge_io(&list_path, e))?;

    debug!(binary = %binary.display(), list = %list_path.display(), "Running ffmpeg concat");
    let result = tokio::process::Command::new(binary)
        .args(["-hide_banner", "-loglevel", "error", "-f", "concat", "-safe", "0", "-i"])
        .arg(&list_path)
        .args(["-c", "copy", "-y"])
        .arg(output)
        .stdin(Stdio::null())
        .kill_on_drop(true)
        .output()
        .await
        .map_err(|e| VodError::Ffmpeg {
            reason: format!("failed to run {}: {e}", binary.display()),
        })?;

    if !result.status.success() {
        return Err(VodError::Ffmpeg {
            reason: format!(
                "{} exited with {}: {}",
                binary.display(),
                result.status,
                String::from_utf8_lossy(&result.stderr).trim()
            ),
        });
    }
    Ok(())
}

/// ffmpeg concat demuxer script listing segment files in manifest order.
fn concat_list(ordered: &[Url], records: &SegmentRecords) -> Result<String, VodError> {
    let mut list = String::from("ffconcat version 1.0\n");
    for address in ordered {
        let path = lookup(records, address)?;
        let absolute = std::path::absolute(path).map_err(|e| VodError::merge_io(path, e))?;
        let escaped = absolute.to_string_lossy().replace('\'', r"'\''");
        list.push_str(&format!("file '{escaped}'\n"));
    }
    Ok(list)
}
