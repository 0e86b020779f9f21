//! Unified error type for the ripforge application.
//!
//! All crates funnel their failures into [`Error`]. Parse anomalies in the
//! MakeMKV protocol and unreadable queue files are deliberately *not* error
//! variants: both are recovered locally with a safe default and logged at low
//! severity.

use std::fmt;

/// Unified error type covering all failure modes in ripforge.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// An external tool could not be spawned (missing or non-executable).
    #[error("failed to launch {tool}: {source}")]
    Launch {
        /// Name of the tool that could not be started.
        tool: String,
        /// The underlying spawn error.
        #[source]
        source: std::io::Error,
    },

    /// An external tool exited with a non-accepted status code.
    #[error("{tool} exited with status {code:?}: {stderr}")]
    Tool {
        /// Name of the tool that failed.
        tool: String,
        /// Exit code, if the process exited normally.
        code: Option<i32>,
        /// Decoded standard-error output captured from the process.
        stderr: String,
    },

    /// Track selection could not satisfy a required slot.
    #[error("Selection error: {0}")]
    Selection(String),

    /// Invalid or unusable configuration.
    #[error("Configuration error: {0}")]
    Config(String),

    /// A pipeline stage failed.
    #[error("Stage error [{stage}]: {message}")]
    Stage {
        /// The stage that failed.
        stage: String,
        /// Human-readable error description.
        message: String,
    },

    /// An I/O operation failed.
    #[error("IO error: {source}")]
    Io {
        /// The underlying I/O error.
        #[from]
        source: std::io::Error,
    },
}

impl Error {
    /// Convenience constructor for [`Error::Launch`].
    pub fn launch(tool: impl Into<String>, source: std::io::Error) -> Self {
        Error::Launch {
            tool: tool.into(),
            source,
        }
    }

    /// Convenience constructor for [`Error::Tool`].
    pub fn tool(tool: impl Into<String>, code: Option<i32>, stderr: impl Into<String>) -> Self {
        Error::Tool {
            tool: tool.into(),
            code,
            stderr: stderr.into(),
        }
    }

    /// Convenience constructor for [`Error::Stage`].
    pub fn stage(stage: impl Into<String>, message: impl fmt::Display) -> Self {
        Error::Stage {
            stage: stage.into(),
            message: message.to_string(),
        }
    }
}

/// Result alias using the crate-level [`Error`].
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn launch_display() {
        let io = std::io::Error::new(std::io::ErrorKind::NotFound, "no such file");
        let err = Error::launch("makemkvcon", io);
        assert_eq!(
            err.to_string(),
            "failed to launch makemkvcon: no such file"
        );
    }

    #[test]
    fn tool_display_carries_stderr() {
        let err = Error::tool("HandBrakeCLI", Some(3), "scan failed");
        let text = err.to_string();
        assert!(text.contains("HandBrakeCLI"));
        assert!(text.contains("scan failed"));
    }

    #[test]
    fn stage_display() {
        let err = Error::stage("makemkv", "no titles on disc");
        assert_eq!(err.to_string(), "Stage error [makemkv]: no titles on disc");
    }

    #[test]
    fn io_from_std() {
        let io_err = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied");
        let err = Error::from(io_err);
        assert!(matches!(err, Error::Io { .. }));
    }

    #[test]
    fn result_alias() {
        fn ok_fn() -> Result<i32> {
            Ok(7)
        }
        assert_eq!(ok_fn().unwrap(), 7);
    }
}
