//! Common error type used throughout timelapse.
//!
//! Every failure the HTTP layer can report funnels into [`Error`]; its
//! `Display` text is what clients see in the `message` field.

/// Common error type for timelapse.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// An operation needs a staged upload but none exists.
    #[error("No video has been uploaded")]
    NoUpload,

    /// Invalid input was provided.
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// The request clashes with work already in progress.
    #[error("Conflict: {0}")]
    Conflict(String),

    /// An I/O operation failed.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// A required external tool could not be started.
    #[error("tool not found: {tool}")]
    ToolNotFound { tool: String },

    /// An external tool failed to execute.
    #[error("tool execution failed: {tool}: {message}")]
    ToolFailed { tool: String, message: String },

    /// An internal error occurred.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl Error {
    /// Create a new InvalidInput error.
    pub fn invalid_input<S: Into<String>>(msg: S) -> Self {
        Self::InvalidInput(msg.into())
    }

    /// Create a new Conflict error.
    pub fn conflict<S: Into<String>>(msg: S) -> Self {
        Self::Conflict(msg.into())
    }

    /// Create a tool not found error.
    pub fn tool_not_found(tool: impl Into<String>) -> Self {
        Self::ToolNotFound { tool: tool.into() }
    }

    /// Create a tool execution failed error.
    pub fn tool_failed(tool: impl Into<String>, message: impl Into<String>) -> Self {
        Self::ToolFailed {
            tool: tool.into(),
            message: message.into(),
        }
    }

    /// Create a new Internal error.
    pub fn internal<S: Into<String>>(msg: S) -> Self {
        Self::Internal(msg.into())
    }

    /// Short machine-readable name of the error kind, used in logs.
    pub fn code(&self) -> &'static str {
        match self {
            Error::NoUpload => "no_upload",
            Error::InvalidInput(_) => "invalid_input",
            Error::Conflict(_) => "conflict",
            Error::Io(_) => "io_error",
            Error::ToolNotFound { .. } => "tool_not_found",
            Error::ToolFailed { .. } => "tool_error",
            Error::Internal(_) => "internal_error",
        }
    }
}

/// Result type alias using the common Error type.
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        assert_eq!(Error::NoUpload.to_string(), "No video has been uploaded");

        let err = Error::invalid_input("speed must be at least 1");
        assert_eq!(err.to_string(), "Invalid input: speed must be at least 1");

        let err = Error::conflict("a conversion is already running");
        assert_eq!(err.to_string(), "Conflict: a conversion is already running");

        let err = Error::tool_not_found("ffprobe");
        assert_eq!(err.to_string(), "tool not found: ffprobe");

        let err = Error::tool_failed("ffmpeg", "timed out after 1s");
        assert_eq!(
            err.to_string(),
            "tool execution failed: ffmpeg: timed out after 1s"
        );

        let err = Error::internal("unexpected state");
        assert_eq!(err.to_string(), "Internal error: unexpected state");
    }

    #[test]
    fn test_error_from_io() {
        let io_err = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "read-only");
        let err = Error::from(io_err);
        assert!(matches!(err, Error::Io(_)));
        assert_eq!(err.code(), "io_error");
    }

    #[test]
    fn test_error_codes() {
        assert_eq!(Error::NoUpload.code(), "no_upload");
        assert_eq!(Error::invalid_input("x").code(), "invalid_input");
        assert_eq!(Error::conflict("x").code(), "conflict");
        assert_eq!(Error::tool_not_found("ffmpeg").code(), "tool_not_found");
        assert_eq!(Error::tool_failed("ffmpeg", "x").code(), "tool_error");
        assert_eq!(Error::internal("x").code(), "internal_error");
    }
}
