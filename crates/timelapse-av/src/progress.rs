//! Conversion progress tracking.
//!
//! FFmpeg run with `-progress pipe:1` prints `key=value` lines on stdout. The
//! `out_time_ms` key carries the encoded position in microseconds, despite its
//! name.

use std::sync::atomic::{AtomicU8, Ordering};

/// Highest percentage the progress parser may publish. Only
/// [`ProgressCounter::complete`] reaches 100.
pub const MAX_INTERMEDIATE_PERCENT: u8 = 99;

const OUT_TIME_KEY: &str = "out_time_ms=";

/// Shared conversion percentage in `0..=100`.
///
/// One writer advances it while any number of readers poll it.
#[derive(Debug, Default)]
pub struct ProgressCounter(AtomicU8);

impl ProgressCounter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Current percentage.
    pub fn get(&self) -> u8 {
        self.0.load(Ordering::Acquire)
    }

    /// Raise the counter to `percent`, never lowering it and never past 99.
    pub fn advance(&self, percent: u8) {
        self.0
            .fetch_max(percent.min(MAX_INTERMEDIATE_PERCENT), Ordering::AcqRel);
    }

    /// Back to 0 for a new conversion.
    pub fn reset(&self) {
        self.0.store(0, Ordering::Release);
    }

    /// Mark the conversion as finished.
    pub fn complete(&self) {
        self.0.store(100, Ordering::Release);
    }
}

/// Percentage of `total_secs` covered by `elapsed_secs`, floored and capped at 99.
///
/// Returns `None` when the total is unknown (zero, negative or not finite).
pub fn percent_complete(elapsed_secs: f64, total_secs: f64) -> Option<u8> {
    if !total_secs.is_finite() || total_secs <= 0.0 {
        return None;
    }
    let elapsed = if elapsed_secs.is_finite() {
        elapsed_secs.max(0.0)
    } else {
        0.0
    };
    let pct = (elapsed / total_secs * 100.0).min(f64::from(MAX_INTERMEDIATE_PERCENT));
    Some(pct.floor() as u8)
}

/// Extract a percentage from one line of FFmpeg's progress output.
///
/// Only `out_time_ms=` lines with an integer value count; everything else,
/// including `out_time_ms=N/A`, yields `None`.
///
/// # Examples
///
/// ```
/// use timelapse_av::progress::parse_progress_line;
///
/// assert_eq!(parse_progress_line("out_time_ms=5000000", 10.0), Some(50));
/// assert_eq!(parse_progress_line("out_time_ms=N/A", 10.0), None);
/// assert_eq!(parse_progress_line("frame=120", 10.0), None);
/// ```
pub fn parse_progress_line(line: &str, total_secs: f64) -> Option<u8> {
    let value = line.trim().strip_prefix(OUT_TIME_KEY)?;
    let micros: i64 = value.trim().parse().ok()?;
    percent_complete(micros as f64 / 1_000_000.0, total_secs)
}
