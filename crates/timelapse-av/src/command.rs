//! Builder for executing external tool commands with timeout support.

use std::path::PathBuf;
use std::process::{ExitStatus, Stdio};
use std::time::Duration;

use tokio::process::{Child, Command};

use timelapse_common::{Error, Result};

/// Default command timeout: 5 minutes.
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(300);

/// Output captured from a tool execution.
#[derive(Debug, Clone)]
pub struct ToolOutput {
    /// Process exit status.
    pub status: ExitStatus,
    /// Captured standard output (lossy UTF-8).
    pub stdout: String,
    /// Captured standard error (lossy UTF-8).
    pub stderr: String,
}

impl ToolOutput {
    /// Both streams as a single log, stdout first.
    pub fn combined(&self) -> String {
        let mut log = String::with_capacity(self.stdout.len() + self.stderr.len() + 1);
        log.push_str(&self.stdout);
        if !self.stdout.is_empty() && !self.stdout.ends_with('\n') && !self.stderr.is_empty() {
            log.push('\n');
        }
        log.push_str(&self.stderr);
        log
    }
}

/// A builder for constructing and executing external tool invocations.
///
/// Both stdout and stderr are always piped and drained concurrently, so a
/// chatty tool can never block on a full pipe.
///
/// # Example
///
/// ```no_run
/// use timelapse_av::ToolCommand;
///
/// # async fn example() -> timelapse_common::Result<()> {
/// let output = ToolCommand::new("ffprobe")
///     .arg("-v").arg("error")
///     .arg("-show_entries").arg("format=duration")
///     .arg("/path/to/video.mp4")
///     .execute()
///     .await?;
/// println!("{}", output.combined());
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct ToolCommand {
    program: PathBuf,
    args: Vec<String>,
    timeout: Duration,
}

impl ToolCommand {
    /// Create a new command for the given program (bare name or path).
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            timeout: DEFAULT_TIMEOUT,
        }
    }

    /// Append a single argument.
    pub fn arg(&mut self, s: impl Into<String>) -> &mut Self {
        self.args.push(s.into());
        self
    }

    /// Append multiple arguments.
    pub fn args(&mut self, iter: impl IntoIterator<Item = impl Into<String>>) -> &mut Self {
        self.args.extend(iter.into_iter().map(Into::into));
        self
    }

    /// Set the maximum execution time for [`ToolCommand::execute`].
    pub fn timeout(&mut self, d: Duration) -> &mut Self {
        self.timeout = d;
        self
    }

    /// Short name of the program, used in errors and logs.
    pub fn program_name(&self) -> String {
        self.program
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_else(|| self.program.to_string_lossy().to_string())
    }

    /// The full command line, for debug logging.
    pub fn command_line(&self) -> String {
        let mut line = self.program.to_string_lossy().to_string();
        for arg in &self.args {
            line.push(' ');
            line.push_str(arg);
        }
        line
    }

    /// Spawn the process with stdout and stderr piped and stdin closed.
    ///
    /// The caller owns draining both pipes. The child is killed if the
    /// returned handle is dropped before it exits.
    pub fn spawn_piped(&self) -> Result<Child> {
        Command::new(&self.program)
            .args(&self.args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| spawn_error(self.program_name(), e))
    }

    /// Run to completion, capturing stdout and stderr.
    ///
    /// A non-zero exit is not an error here; callers inspect
    /// [`ToolOutput::status`] and decide.
    ///
    /// # Errors
    ///
    /// - [`Error::ToolNotFound`] if the program does not exist.
    /// - [`Error::ToolFailed`] if spawning fails for another reason, waiting
    ///   fails, or the timeout elapses (the child is killed).
    pub async fn execute(&self) -> Result<ToolOutput> {
        let program_name = self.program_name();
        let child = self.spawn_piped()?;

        // wait_with_output drains stdout and stderr concurrently.
        let result = tokio::time::timeout(self.timeout, child.wait_with_output()).await;

        match result {
            Ok(Ok(output)) => Ok(ToolOutput {
                status: output.status,
                stdout: String::from_utf8_lossy(&output.stdout).to_string(),
                stderr: String::from_utf8_lossy(&output.stderr).to_string(),
            }),
            Ok(Err(e)) => Err(Error::tool_failed(
                program_name,
                format!("I/O error waiting for process: {e}"),
            )),
            // The dropped future drops the child, and kill_on_drop reaps it.
            Err(_elapsed) => Err(Error::tool_failed(
                program_name,
                format!("timed out after {:?}", self.timeout),
            )),
        }
    }
}

fn spawn_error(program_name: String, e: std::io::Error) -> Error {
    if e.kind() == std::io::ErrorKind::NotFound {
        Error::tool_not_found(program_name)
    } else {
        Error::tool_failed(program_name, format!("failed to spawn: {e}"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn execute_echo() {
        let output = ToolCommand::new("echo").arg("hello").execute().await;

        match output {
            Ok(out) => {
                assert!(out.status.success());
                assert!(out.stdout.trim().contains("hello"));
            }
            Err(_) => {
                // On some minimal environments echo may not exist; skip.
            }
        }
    }

    #[tokio::test]
    async fn execute_nonexistent_tool() {
        let result = ToolCommand::new("nonexistent_tool_xyz_12345")
            .execute()
            .await;
        assert!(matches!(result, Err(Error::ToolNotFound { .. })));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn nonzero_exit_is_reported_not_raised() {
        let out = ToolCommand::new("sh")
            .args(["-c", "echo oops >&2; exit 3"])
            .execute()
            .await
            .unwrap();
        assert_eq!(out.status.code(), Some(3));
        assert_eq!(out.stderr.trim(), "oops");
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn large_stderr_does_not_block() {
        // Well past a 64 KiB pipe buffer on both streams.
        let out = ToolCommand::new("sh")
            .args([
                "-c",
                "i=0; while [ $i -lt 5000 ]; do \
                 echo \"stderr line $i with some padding to fill the pipe\" >&2; \
                 echo \"stdout line $i\"; i=$((i+1)); done",
            ])
            .timeout(Duration::from_secs(30))
            .execute()
            .await
            .unwrap();
        assert!(out.status.success());
        assert_eq!(out.stderr.lines().count(), 5000);
        assert_eq!(out.stdout.lines().count(), 5000);
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn timeout_fires() {
        let result = ToolCommand::new("sleep")
            .arg("10")
            .timeout(Duration::from_millis(100))
            .execute()
            .await;
        let err = result.unwrap_err().to_string();
        assert!(err.contains("timed out"), "unexpected error: {err}");
    }

    #[test]
    fn combined_puts_stdout_first() {
        let out = ToolOutput {
            status: ExitStatus::default(),
            stdout: "12.5".into(),
            stderr: "warning: something\n".into(),
        };
        assert_eq!(out.combined(), "12.5\nwarning: something\n");
    }

    #[test]
    fn command_line_and_program_name() {
        let mut cmd = ToolCommand::new("/usr/local/bin/ffmpeg");
        cmd.args(["-y", "-i", "in.mp4"]);
        assert_eq!(cmd.program_name(), "ffmpeg");
        assert_eq!(cmd.command_line(), "/usr/local/bin/ffmpeg -y -i in.mp4");
    }
}
