//! Single-slot staging directory for the current upload and its preview.

use parking_lot::Mutex;
use std::path::{Path, PathBuf};
use tokio::io::{AsyncRead, AsyncWriteExt};
use uuid::Uuid;

use timelapse_common::{paths, Result};

/// Temp directory holding the current upload and the latest preview.
///
/// Only one upload is current at a time; staging a new one deletes the
/// previous file.
#[derive(Debug)]
pub struct StagingArea {
    dir: PathBuf,
    current: Mutex<Option<PathBuf>>,
}

impl StagingArea {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            current: Mutex::new(None),
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Create the directory if needed and delete every regular file in it.
    ///
    /// Returns how many files were removed. Files that cannot be removed are
    /// logged and skipped.
    pub fn purge_on_start(&self) -> Result<usize> {
        std::fs::create_dir_all(&self.dir)?;

        let mut removed = 0;
        for entry in std::fs::read_dir(&self.dir)? {
            let entry = match entry {
                Ok(entry) => entry,
                Err(e) => {
                    tracing::warn!("Failed to read staging entry: {}", e);
                    continue;
                }
            };
            let path = entry.path();
            if !entry.file_type().map(|t| t.is_file()).unwrap_or(false) {
                continue;
            }
            match std::fs::remove_file(&path) {
                Ok(()) => removed += 1,
                Err(e) => tracing::warn!("Failed to remove stale staging file {:?}: {}", path, e),
            }
        }

        *self.current.lock() = None;
        tracing::info!("Staging directory {:?} ready ({} stale files removed)", self.dir, removed);
        Ok(removed)
    }

    /// Stream `reader` into a new `{uuid}_{name}` file and make it the
    /// current upload.
    ///
    /// A partially written file is removed on failure and the previous
    /// upload stays current. On success the previous upload is deleted.
    pub async fn ingest<R>(&self, reader: R, original_name: &str) -> Result<PathBuf>
    where
        R: AsyncRead + Unpin,
    {
        let path = self.stage(reader, original_name).await?;
        self.promote(path.clone()).await;
        Ok(path)
    }

    /// Write `reader` into a new `{uuid}_{name}` file without touching the
    /// current upload.
    pub async fn stage<R>(&self, mut reader: R, original_name: &str) -> Result<PathBuf>
    where
        R: AsyncRead + Unpin,
    {
        tokio::fs::create_dir_all(&self.dir).await?;

        let file_name = format!(
            "{}_{}",
            Uuid::new_v4(),
            paths::sanitize_upload_name(original_name)
        );
        let path = self.dir.join(file_name);

        match write_file(&path, &mut reader).await {
            Ok(bytes) => {
                tracing::debug!("Staged {} bytes at {:?}", bytes, path);
                Ok(path)
            }
            Err(e) => {
                self.discard(&path).await;
                Err(e.into())
            }
        }
    }

    /// Make a staged file the current upload and delete the previous one.
    pub async fn promote(&self, path: PathBuf) {
        let prior = self.current.lock().replace(path);
        if let Some(prior) = prior {
            if let Err(e) = tokio::fs::remove_file(&prior).await {
                tracing::warn!("Failed to delete previous upload {:?}: {}", prior, e);
            }
        }
    }

    /// Remove a staged file that will not become current.
    pub async fn discard(&self, path: &Path) {
        if let Err(e) = tokio::fs::remove_file(path).await {
            tracing::debug!("No staged file to remove at {:?}: {}", path, e);
        }
    }

    /// The current upload, if any.
    pub fn current_upload(&self) -> Option<PathBuf> {
        self.current.lock().clone()
    }

    /// Fixed location of the preview artifact; it may not exist yet.
    pub fn preview_path(&self) -> PathBuf {
        self.dir.join(paths::PREVIEW_FILE_NAME)
    }
}

async fn write_file<R>(path: &Path, reader: &mut R) -> std::io::Result<u64>
where
    R: AsyncRead + Unpin,
{
    let mut file = tokio::fs::File::create(path).await?;
    let bytes = tokio::io::copy(reader, &mut file).await?;
    file.flush().await?;
    Ok(bytes)
}
