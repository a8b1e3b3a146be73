//! Runtime-mutable settings shared by the HTTP handlers and the transcoder.

use parking_lot::RwLock;
use std::path::PathBuf;

use timelapse_common::{Error, Result};

use super::AppConfig;

/// Output directory and FFmpeg command, changeable while the server runs.
///
/// A write is visible to the next read from any thread.
#[derive(Debug)]
pub struct ConfigStore {
    output_path: RwLock<String>,
    ffmpeg_path: RwLock<String>,
}

impl ConfigStore {
    pub fn new(output_path: impl Into<String>, ffmpeg_path: impl Into<String>) -> Self {
        Self {
            output_path: RwLock::new(output_path.into()),
            ffmpeg_path: RwLock::new(ffmpeg_path.into()),
        }
    }

    pub fn from_app_config(app: &AppConfig) -> Self {
        Self::new(app.output_path.clone(), app.ffmpeg_path.clone())
    }

    pub fn output_path(&self) -> String {
        self.output_path.read().clone()
    }

    /// Replace the output directory. Blank values are rejected.
    pub fn set_output_path(&self, path: &str) -> Result<()> {
        let path = path.trim();
        if path.is_empty() {
            return Err(Error::invalid_input("output path must not be empty"));
        }
        *self.output_path.write() = path.to_string();
        Ok(())
    }

    /// Output directory with `~` expanded.
    pub fn output_dir(&self) -> PathBuf {
        PathBuf::from(shellexpand::tilde(&self.output_path()).as_ref())
    }

    pub fn ffmpeg_path(&self) -> String {
        self.ffmpeg_path.read().clone()
    }

    pub fn set_ffmpeg_path(&self, path: &str) {
        *self.ffmpeg_path.write() = path.to_string();
    }
}
