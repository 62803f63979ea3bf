//! Scoped staging files for stores whose client reads from a local path.
//!
//! Every [`StagedFile`] gets its own `.staging-{uuid}` name, so concurrent
//! uploads never share a path and the name length does not depend on the key.
//! It is removed by [`StagedFile::release`] on the normal path, and by `Drop`
//! when the owning future is cancelled or unwinds.

use std::{
    io,
    path::{Path, PathBuf},
};
use tokio::{fs, io::AsyncWriteExt};
use tracing::warn;
use uuid::Uuid;

#[derive(Debug)]
pub struct StagedFile {
    path: PathBuf,
    released: bool,
}

impl StagedFile {
    /// Write `content` to a fresh file under `dir`.
    pub async fn write(dir: &Path, content: &[u8]) -> io::Result<Self> {
        fs::create_dir_all(dir).await?;
        let path = dir.join(format!(".staging-{}", Uuid::new_v4()));
        let mut file = fs::OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&path)
            .await?;

        // The file is ours from here, so a failed write is still cleaned up.
        let staged = Self {
            path,
            released: false,
        };
        file.write_all(content).await?;
        file.flush().await?;
        file.sync_all().await?;
        Ok(staged)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Remove the staging file. A file that is already gone counts as removed.
    pub async fn release(mut self) -> io::Result<()> {
        self.released = true;
        match fs::remove_file(&self.path).await {
            Ok(()) => Ok(()),
            Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(err) => Err(err),
        }
    }
}

impl Drop for StagedFile {
    fn drop(&mut self) {
        if self.released {
            return;
        }
        if let Err(err) = std::fs::remove_file(&self.path) {
            if err.kind() != io::ErrorKind::NotFound {
                warn!(path = %self.path.display(), "failed to remove staging file: {}", err);
            }
        }
    }
}
