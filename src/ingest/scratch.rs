//! Scratch files for uploaded inventory data
//!
//! Uploads are written to disk before ingestion so rows can be streamed in
//! batches instead of held in memory. A [`ScratchFile`] removes itself when
//! released, on every exit path.

use crate::config::Config;
use crate::error::Result;
use chrono::Utc;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};
use uuid::Uuid;

/// Provides the directory where scratch files are created
pub trait ScratchSpace: Send + Sync {
    fn dir(&self) -> &Path;
}

/// A fixed scratch directory
#[derive(Debug, Clone)]
pub struct ScratchDir {
    path: PathBuf,
}

impl ScratchDir {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(config.paths.scratch_dir.clone())
    }
}

impl ScratchSpace for ScratchDir {
    fn dir(&self) -> &Path {
        &self.path
    }
}

/// An uploaded file buffered on disk for the duration of one ingestion
#[derive(Debug)]
pub struct ScratchFile {
    path: PathBuf,
    released: bool,
}

impl ScratchFile {
    /// Write `bytes` to a uniquely named file in the scratch space
    pub async fn create(space: &dyn ScratchSpace, bytes: &[u8]) -> Result<Self> {
        let dir = space.dir();
        tokio::fs::create_dir_all(dir).await?;

        let name = format!(
            "upload-{}-{}.csv",
            Utc::now().timestamp_millis(),
            Uuid::new_v4().simple()
        );
        let file = Self {
            path: dir.join(name),
            released: false,
        };

        // A failed write drops the guard, which removes any partial file
        tokio::fs::write(&file.path, bytes).await?;
        debug!(path = %file.path.display(), bytes = bytes.len(), "Wrote scratch file");
        Ok(file)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Delete the file. Failures are logged, never returned.
    pub async fn release(mut self) {
        self.released = true;
        match tokio::fs::remove_file(&self.path).await {
            Ok(()) => debug!(path = %self.path.display(), "Removed scratch file"),
            Err(e) => warn!(path = %self.path.display(), "Failed to remove scratch file: {}", e),
        }
    }
}

impl Drop for ScratchFile {
    fn drop(&mut self) {
        if self.released {
            return;
        }
        // Only reached when the ingestion future is cancelled before
        // `release`; a single unlink, so blocking here is acceptable.
        if let Err(e) = std::fs::remove_file(&self.path) {
            if e.kind() != std::io::ErrorKind::NotFound {
                warn!(path = %self.path.display(), "Failed to remove scratch file: {}", e);
            }
        }
    }
}
