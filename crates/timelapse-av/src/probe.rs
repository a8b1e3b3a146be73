//! Duration probing via ffprobe.

use std::path::{Path, PathBuf};
use std::time::Duration;

use tracing::{debug, warn};

use timelapse_common::Result;

use crate::command::ToolCommand;

/// Maximum time ffprobe may run before it is killed.
pub const PROBE_TIMEOUT: Duration = Duration::from_secs(60);

/// Arguments for a duration-only ffprobe run.
pub fn probe_args(path: &Path) -> Vec<String> {
    vec![
        "-v".into(),
        "error".into(),
        "-show_entries".into(),
        "format=duration".into(),
        "-of".into(),
        "default=noprint_wrappers=1:nokey=1".into(),
        path.to_string_lossy().into_owned(),
    ]
}

/// Probe the container duration of `path` in seconds.
///
/// Output that does not parse as a finite, non-negative number yields `0.0`.
///
/// # Errors
///
/// Only process failures are errors: the tool cannot be spawned, or it runs
/// past [`PROBE_TIMEOUT`].
pub async fn probe_duration(ffprobe: impl Into<PathBuf>, path: &Path) -> Result<f64> {
    let mut cmd = ToolCommand::new(ffprobe);
    cmd.args(probe_args(path)).timeout(PROBE_TIMEOUT);
    debug!("Running {}", cmd.command_line());

    let output = cmd.execute().await?;
    if !output.status.success() {
        warn!(
            "ffprobe exited with {} for {}: {}",
            output.status,
            path.display(),
            output.stderr.trim()
        );
    }

    let duration = parse_duration(&output.combined());
    debug!("Probed {}: {duration}s", path.display());
    Ok(duration)
}

/// Parse ffprobe's combined output as a duration in seconds.
///
/// # Examples
///
/// ```
/// use timelapse_av::probe::parse_duration;
///
/// assert_eq!(parse_duration("12.500000\n"), 12.5);
/// assert_eq!(parse_duration("N/A"), 0.0);
/// ```
pub fn parse_duration(output: &str) -> f64 {
    match output.trim().parse::<f64>() {
        Ok(secs) if secs.is_finite() && secs >= 0.0 => secs,
        _ => 0.0,
    }
}
