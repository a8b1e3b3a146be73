//! External tool detection.

use std::path::PathBuf;
use std::process::Command;

/// Availability report for one configured tool.
#[derive(Debug, Clone)]
pub struct ToolInfo {
    /// Role of the tool (`ffmpeg` or `ffprobe`).
    pub name: String,
    /// Configured command, bare name or path.
    pub command: String,
    /// Whether the tool answered `-version` successfully.
    pub available: bool,
    /// First line of the version banner.
    pub version: Option<String>,
    /// Resolved executable path.
    pub path: Option<PathBuf>,
}

/// Check a tool by running `<command> -version`.
///
/// # Example
///
/// ```no_run
/// use timelapse_av::check_tool;
///
/// let info = check_tool("ffprobe", "/opt/ffmpeg/bin/ffprobe");
/// if info.available {
///     println!("ffprobe version: {:?}", info.version);
/// }
/// ```
pub fn check_tool(name: &str, command: &str) -> ToolInfo {
    let result = Command::new(command).arg("-version").output();

    match result {
        Ok(output) if output.status.success() => {
            let version = String::from_utf8_lossy(&output.stdout)
                .lines()
                .next()
                .map(|s| s.to_string());

            ToolInfo {
                name: name.to_string(),
                command: command.to_string(),
                available: true,
                version,
                path: which::which(command).ok(),
            }
        }
        _ => ToolInfo {
            name: name.to_string(),
            command: command.to_string(),
            available: false,
            version: None,
            path: None,
        },
    }
}

/// Check both configured FFmpeg tools.
pub fn check_tools(ffmpeg: &str, ffprobe: &str) -> Vec<ToolInfo> {
    vec![check_tool("ffmpeg", ffmpeg), check_tool("ffprobe", ffprobe)]
}
