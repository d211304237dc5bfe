// Scratch directory bracketing one download-and-merge operation.

use std::path::{Path, PathBuf};

use tracing::debug;

use crate::error::VodError;

/// `<root>/<video id>/`, holding one file per downloaded segment.
///
/// Dropping it leaves the directory on disk; only [`ScratchDir::remove`]
/// deletes it, so failed runs keep their segments for inspection.
#[derive(Debug)]
pub struct ScratchDir {
    path: PathBuf,
}

impl ScratchDir {
    pub async fn create(root: &Path, video_id: &str) -> Result<Self, VodError> {
        if video_id.is_empty()
            || video_id == "."
            || video_id == ".."
            || video_id.contains(['/', '\\'])
        {
            return Err(VodError::configuration(format!(
                "video id `{video_id}` cannot name a scratch directory"
            )));
        }

        let path = root.join(video_id);
        tokio::fs::create_dir_all(&path)
            .await
            .map_err(|source| VodError::DirectoryCreate {
                path: path.clone(),
                source,
            })?;
        debug!(path = %path.display(), "Created scratch directory");
        Ok(Self { path })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Deletes the directory and everything in it.
    pub async fn remove(self) -> Result<(), VodError> {
        tokio::fs::remove_dir_all(&self.path)
            .await
            .map_err(|source| VodError::DirectoryRemove {
                path: self.path.clone(),
                source,
            })?;
        debug!(path = %self.path.display(), "Removed scratch directory");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn create_then_remove() {
        let root = tempfile::tempdir().unwrap();
        let scratch = ScratchDir::create(root.path(), "abc123").await.unwrap();
        let path = scratch.path().to_path_buf();
        assert!(path.is_dir());
        tokio::fs::write(path.join("1.ts"), b"x").await.unwrap();

        scratch.remove().await.unwrap();
        assert!(!path.exists());
    }

    #[tokio::test]
    async fn drop_keeps_directory() {
        let root = tempfile::tempdir().unwrap();
        let path = {
            let scratch = ScratchDir::create(root.path(), "keep").await.unwrap();
            scratch.path().to_path_buf()
        };
        assert!(path.is_dir());
    }

    #[tokio::test]
    async fn rejects_path_like_ids() {
        let root = tempfile::tempdir().unwrap();
        for id in ["", "..", "a/b", "a\\b"] {
            assert!(ScratchDir::create(root.path(), id).await.is_err(), "{id}");
        }
    }
}
