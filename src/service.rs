//! Upload, preview and conversion orchestration.
//!
//! [`VideoService`] owns the session state: the staged upload, its probed
//! duration, the shared progress counter and the single conversion slot.

use parking_lot::{Mutex, RwLock};
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::io::AsyncRead;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use timelapse_av::{ConversionJob, ProgressCounter};
use timelapse_common::{paths, Error, Result};

use crate::config::ConfigStore;
use crate::staging::StagingArea;

/// Result of a successful upload.
#[derive(Debug, Clone)]
pub struct UploadOutcome {
    /// Probed duration in seconds; 0 when ffprobe reported nothing usable.
    pub duration: f64,
    /// Name the client sent.
    pub filename: String,
}

pub struct VideoService {
    config: Arc<ConfigStore>,
    staging: StagingArea,
    ffprobe_path: String,
    duration: RwLock<Option<f64>>,
    progress: Arc<ProgressCounter>,
    /// Serializes uploads so the upload pointer and duration change together.
    upload_lock: tokio::sync::Mutex<()>,
    /// Serializes previews; they all write the same file.
    preview_lock: tokio::sync::Mutex<()>,
    converting: Arc<AtomicBool>,
    driver: Mutex<Option<JoinHandle<()>>>,
    shutdown: CancellationToken,
}

impl VideoService {
    pub fn new(
        config: Arc<ConfigStore>,
        staging: StagingArea,
        ffprobe_path: impl Into<String>,
    ) -> Self {
        Self {
            config,
            staging,
            ffprobe_path: ffprobe_path.into(),
            duration: RwLock::new(None),
            progress: Arc::new(ProgressCounter::new()),
            upload_lock: tokio::sync::Mutex::new(()),
            preview_lock: tokio::sync::Mutex::new(()),
            converting: Arc::new(AtomicBool::new(false)),
            driver: Mutex::new(None),
            shutdown: CancellationToken::new(),
        }
    }

    pub fn config(&self) -> &Arc<ConfigStore> {
        &self.config
    }

    pub fn staging(&self) -> &StagingArea {
        &self.staging
    }

    /// Stage a new upload and probe its duration.
    ///
    /// Rejected while a conversion is running, since the conversion reads the
    /// current upload.
    pub async fn upload<R>(&self, reader: R, original_name: &str) -> Result<UploadOutcome>
    where
        R: AsyncRead + Unpin,
    {
        let _guard = self.upload_lock.lock().await;
        if self.is_converting() {
            return Err(Error::conflict(
                "cannot replace the upload while a conversion is running",
            ));
        }

        let path = self.staging.stage(reader, original_name).await?;

        // The file only becomes current once it has a duration.
        let duration = match timelapse_av::probe_duration(&self.ffprobe_path, &path).await {
            Ok(duration) => duration,
            Err(e) => {
                self.staging.discard(&path).await;
                return Err(e);
            }
        };
        self.staging.promote(path.clone()).await;
        *self.duration.write() = Some(duration);
        tracing::info!("Uploaded {} ({:.3}s) to {:?}", original_name, duration, path);

        Ok(UploadOutcome {
            duration,
            filename: original_name.to_string(),
        })
    }

    /// Probed duration of the current upload.
    pub fn original_duration(&self) -> Option<f64> {
        *self.duration.read()
    }

    /// Duration of the output at `speed`: original duration divided by speed.
    pub fn calculate_output_duration(&self, speed: u32) -> Result<f64> {
        validate_speed(speed)?;
        let duration = self.original_duration().ok_or(Error::NoUpload)?;
        Ok(duration / f64::from(speed))
    }

    /// Encode a 30 second preview of the current upload.
    ///
    /// Waits for the encode. A failed encode is logged, and the preview path
    /// is still returned.
    pub async fn generate_preview(&self) -> Result<PathBuf> {
        let input = self.staging.current_upload().ok_or(Error::NoUpload)?;
        let output = self.staging.preview_path();

        let _guard = self.preview_lock.lock().await;
        timelapse_av::generate_preview(self.config.ffmpeg_path(), &input, &output).await?;
        Ok(output)
    }

    pub fn preview_path(&self) -> PathBuf {
        self.staging.preview_path()
    }

    /// Start converting the current upload at `speed` in the background.
    ///
    /// Returns the output path once FFmpeg has been handed to the driver
    /// task. Only one conversion runs at a time.
    pub async fn start_conversion(&self, speed: u32, filename: &str) -> Result<PathBuf> {
        validate_speed(speed)?;

        let _upload_guard = self.upload_lock.lock().await;
        let input = self.staging.current_upload().ok_or(Error::NoUpload)?;

        if self
            .converting
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            return Err(Error::conflict("a conversion is already running"));
        }

        let output_dir = self.config.output_dir();
        if let Err(e) = tokio::fs::create_dir_all(&output_dir).await {
            self.converting.store(false, Ordering::Release);
            return Err(e.into());
        }

        let output = output_dir.join(paths::output_file_name(filename, speed));
        let job = ConversionJob {
            ffmpeg: PathBuf::from(self.config.ffmpeg_path()),
            input,
            output: output.clone(),
            speed,
            total_secs: self.original_duration().unwrap_or(0.0),
        };

        self.progress.reset();
        let handle = tokio::spawn(drive_conversion(
            job,
            self.progress.clone(),
            self.converting.clone(),
            self.shutdown.child_token(),
        ));
        *self.driver.lock() = Some(handle);

        Ok(output)
    }

    pub fn is_converting(&self) -> bool {
        self.converting.load(Ordering::Acquire)
    }

    /// Current conversion percentage.
    pub fn progress(&self) -> u8 {
        self.progress.get()
    }

    /// Wait for the most recently started conversion driver to exit.
    pub async fn wait_for_conversion(&self) {
        let handle = self.driver.lock().take();
        if let Some(handle) = handle {
            if let Err(e) = handle.await {
                tracing::error!("Conversion driver panicked: {}", e);
            }
        }
    }

    /// Kill any running conversion and wait for its driver.
    pub async fn shutdown(&self) {
        self.shutdown.cancel();
        self.wait_for_conversion().await;
    }
}

fn validate_speed(speed: u32) -> Result<()> {
    if speed < 1 {
        return Err(Error::invalid_input("speed must be at least 1"));
    }
    Ok(())
}

async fn drive_conversion(
    job: ConversionJob,
    progress: Arc<ProgressCounter>,
    converting: Arc<AtomicBool>,
    cancel: CancellationToken,
) {
    let result = timelapse_av::run_conversion(&job, progress.clone(), cancel).await;

    match result {
        Ok(status) => {
            if status.success() {
                tracing::info!("Conversion finished: {:?}", job.output);
            } else {
                tracing::warn!("ffmpeg exited with {} while writing {:?}", status, job.output);
            }
            progress.complete();
        }
        Err(e) => {
            tracing::error!("Conversion of {:?} failed to run: {}", job.input, e);
        }
    }

    // Released after the final progress value; a new job resets the counter.
    converting.store(false, Ordering::Release);
}
