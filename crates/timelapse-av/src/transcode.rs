//! FFmpeg preview and time-lapse conversion.
//!
//! Every captured stream is drained by its own worker until EOF before the
//! exit status is collected. Reading one stream to completion and then the
//! other can deadlock once the unread pipe fills.

use std::path::{Path, PathBuf};
use std::process::ExitStatus;
use std::sync::Arc;
use std::time::Duration;

use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, trace, warn};

use timelapse_common::{Error, Result};

use crate::command::ToolCommand;
use crate::progress::{parse_progress_line, ProgressCounter};

/// Length of the preview clip in seconds.
pub const PREVIEW_SECONDS: u32 = 30;

/// Upper bound on a preview encode.
const PREVIEW_TIMEOUT: Duration = Duration::from_secs(30 * 60);

/// Log target for FFmpeg's diagnostic output.
pub const FFMPEG_STDERR_TARGET: &str = "ffmpeg_stderr";

fn path_arg(path: &Path) -> String {
    path.to_string_lossy().into_owned()
}

/// Arguments for a preview encode of the first [`PREVIEW_SECONDS`] seconds.
pub fn preview_args(input: &Path, output: &Path) -> Vec<String> {
    vec![
        "-y".into(),
        "-ss".into(),
        "0".into(),
        "-t".into(),
        PREVIEW_SECONDS.to_string(),
        "-i".into(),
        path_arg(input),
        "-an".into(),
        "-crf".into(),
        "18".into(),
        "-preset".into(),
        "fast".into(),
        path_arg(output),
    ]
}

/// Encode a preview of `input` into `output`.
///
/// The tool's combined output goes to the `ffmpeg_stderr` log target. A
/// non-zero exit is logged and returned, not raised.
pub async fn generate_preview(
    ffmpeg: impl Into<PathBuf>,
    input: &Path,
    output: &Path,
) -> Result<ExitStatus> {
    let mut cmd = ToolCommand::new(ffmpeg);
    cmd.args(preview_args(input, output)).timeout(PREVIEW_TIMEOUT);
    info!("Generating preview of {} -> {}", input.display(), output.display());
    debug!("Running {}", cmd.command_line());

    let out = cmd.execute().await?;
    for line in out.combined().lines().filter(|l| !l.trim().is_empty()) {
        debug!(target: FFMPEG_STDERR_TARGET, "{line}");
    }

    if out.status.success() {
        info!("Preview written to {}", output.display());
    } else {
        warn!("Preview encode exited with {}", out.status);
    }
    Ok(out.status)
}

/// A single time-lapse conversion.
#[derive(Debug, Clone)]
pub struct ConversionJob {
    /// FFmpeg command, bare name or path.
    pub ffmpeg: PathBuf,
    pub input: PathBuf,
    pub output: PathBuf,
    /// Speed multiplier, at least 1.
    pub speed: u32,
    /// Duration of the input in seconds; 0 when unknown.
    pub total_secs: f64,
}

impl ConversionJob {
    /// FFmpeg arguments: NVENC encode with `setpts=PTS/<speed>` and
    /// machine-readable progress on stdout.
    pub fn args(&self) -> Vec<String> {
        vec![
            "-y".into(),
            "-hwaccel".into(),
            "cuda".into(),
            "-i".into(),
            path_arg(&self.input),
            "-vf".into(),
            format!("setpts=PTS/{}", self.speed),
            "-an".into(),
            "-c:v".into(),
            "h264_nvenc".into(),
            "-cq".into(),
            "18".into(),
            "-preset".into(),
            "p4".into(),
            "-progress".into(),
            "pipe:1".into(),
            "-nostats".into(),
            path_arg(&self.output),
        ]
    }
}

/// Run a conversion to completion, publishing progress into `progress`.
///
/// Two workers drain stdout (progress lines) and stderr (diagnostics) while
/// this task waits for the child. Cancelling `cancel` kills the child. The
/// counter is left below 100; completing it is the caller's call.
///
/// # Errors
///
/// Spawn failures, and I/O errors while waiting for the child.
pub async fn run_conversion(
    job: &ConversionJob,
    progress: Arc<ProgressCounter>,
    cancel: CancellationToken,
) -> Result<ExitStatus> {
    let mut cmd = ToolCommand::new(job.ffmpeg.clone());
    cmd.args(job.args());
    info!(
        "Converting {} at {}x -> {}",
        job.input.display(),
        job.speed,
        job.output.display()
    );
    debug!("Running {}", cmd.command_line());

    let mut child = cmd.spawn_piped()?;
    let stdout = child
        .stdout
        .take()
        .ok_or_else(|| Error::internal("ffmpeg stdout was not captured"))?;
    let stderr = child
        .stderr
        .take()
        .ok_or_else(|| Error::internal("ffmpeg stderr was not captured"))?;

    let total_secs = job.total_secs;
    let progress_worker = tokio::spawn(track_progress(stdout, total_secs, progress));
    let stderr_worker = tokio::spawn(forward_stderr(stderr));

    let exited = tokio::select! {
        status = child.wait() => Some(status),
        _ = cancel.cancelled() => None,
    };
    let status = match exited {
        Some(status) => status,
        None => {
            warn!("Conversion cancelled, killing ffmpeg");
            if let Err(e) = child.kill().await {
                warn!("Failed to kill ffmpeg: {e}");
            }
            child.wait().await
        }
    };

    let (progress_done, stderr_done) = tokio::join!(progress_worker, stderr_worker);
    if let Err(e) = progress_done {
        error!("Progress worker failed: {e}");
    }
    if let Err(e) = stderr_done {
        error!("Stderr worker failed: {e}");
    }

    status.map_err(|e| {
        Error::tool_failed(
            cmd.program_name(),
            format!("I/O error waiting for process: {e}"),
        )
    })
}

/// Read `reader` line by line until EOF.
///
/// Lines are decoded lossily so stray bytes never stop the drain.
pub async fn drain_lines<R, F>(reader: R, mut on_line: F)
where
    R: AsyncRead + Unpin,
    F: FnMut(&str),
{
    let mut reader = BufReader::new(reader);
    let mut buf = Vec::new();
    loop {
        buf.clear();
        match reader.read_until(b'\n', &mut buf).await {
            Ok(0) => break,
            Ok(_) => {
                let line = String::from_utf8_lossy(&buf);
                on_line(line.trim_end_matches(|c: char| c == '\r' || c == '\n'));
            }
            Err(e) => {
                warn!("Stopped reading ffmpeg output: {e}");
                break;
            }
        }
    }
}

/// Progress worker: feed `out_time_ms` lines into the counter.
pub async fn track_progress<R>(reader: R, total_secs: f64, progress: Arc<ProgressCounter>)
where
    R: AsyncRead + Unpin,
{
    drain_lines(reader, |line| {
        if let Some(pct) = parse_progress_line(line, total_secs) {
            progress.advance(pct);
            trace!("Conversion progress: {}%", progress.get());
        }
    })
    .await;
}

/// Stderr worker: forward every diagnostic line to the log.
pub async fn forward_stderr<R>(reader: R)
where
    R: AsyncRead + Unpin,
{
    drain_lines(reader, |line| {
        if !line.trim().is_empty() {
            info!(target: FFMPEG_STDERR_TARGET, "{line}");
        }
    })
    .await;
}
