use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use timelapse_common::paths;

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,

    #[serde(default)]
    pub app: AppConfig,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,

    #[serde(default = "default_port")]
    pub port: u16,

    /// Largest accepted upload body, in MiB
    #[serde(default = "default_max_upload_mb")]
    pub max_upload_mb: u64,

    /// Delay between two `/progress` events
    #[serde(default = "default_progress_interval_ms")]
    pub progress_interval_ms: u64,

    /// Lifetime of one `/progress` stream
    #[serde(default = "default_progress_timeout_secs")]
    pub progress_timeout_secs: u64,
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}
fn default_port() -> u16 {
    8080
}
fn default_max_upload_mb() -> u64 {
    10 * 1024
}
fn default_progress_interval_ms() -> u64 {
    500
}
fn default_progress_timeout_secs() -> u64 {
    300
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            max_upload_mb: default_max_upload_mb(),
            progress_interval_ms: default_progress_interval_ms(),
            progress_timeout_secs: default_progress_timeout_secs(),
        }
    }
}

impl ServerConfig {
    /// Upload limit in bytes.
    pub fn max_upload_bytes(&self) -> usize {
        usize::try_from(self.max_upload_mb.saturating_mul(1024 * 1024)).unwrap_or(usize::MAX)
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AppConfig {
    /// Directory receiving converted files
    #[serde(default = "paths::default_output_dir")]
    pub output_path: String,

    #[serde(default = "default_ffmpeg_path")]
    pub ffmpeg_path: String,

    #[serde(default = "default_ffprobe_path")]
    pub ffprobe_path: String,

    /// Staging directory; `{temp}/timelapse` when unset
    #[serde(default)]
    pub staging_dir: Option<PathBuf>,
}

fn default_ffmpeg_path() -> String {
    "ffmpeg".to_string()
}
fn default_ffprobe_path() -> String {
    "ffprobe".to_string()
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            output_path: paths::default_output_dir(),
            ffmpeg_path: default_ffmpeg_path(),
            ffprobe_path: default_ffprobe_path(),
            staging_dir: None,
        }
    }
}

impl AppConfig {
    /// Staging directory after applying the default.
    pub fn staging_dir(&self) -> PathBuf {
        self.staging_dir
            .as_deref()
            .map(|p| PathBuf::from(shellexpand::tilde(&p.to_string_lossy()).as_ref()))
            .unwrap_or_else(paths::default_staging_dir)
    }
}
