//! # timelapse-av
//!
//! FFmpeg and FFprobe orchestration for the timelapse service.
//!
//! This crate provides:
//!
//! - **Command execution** ([`ToolCommand`]) -- async builder that drains
//!   stdout and stderr concurrently, with timeout support.
//! - **Probing** ([`probe_duration`]) -- container duration via ffprobe.
//! - **Transcoding** ([`generate_preview`], [`run_conversion`]) -- preview
//!   clips and speed-multiplied conversions.
//! - **Progress** ([`ProgressCounter`]) -- shared percentage fed from
//!   FFmpeg's `-progress` output.
//! - **Tool detection** ([`check_tools`]) -- availability and version banners.

pub mod command;
pub mod probe;
pub mod progress;
pub mod tools;
pub mod transcode;

// ---- Re-exports for convenience ----

pub use command::{ToolCommand, ToolOutput};
pub use probe::probe_duration;
pub use progress::ProgressCounter;
pub use tools::{check_tool, check_tools, ToolInfo};
pub use transcode::{generate_preview, run_conversion, ConversionJob};
