//! Unified error type for deckforge.
//!
//! All crates funnel their failures into [`Error`]. The three domain kinds
//! are [`Error::Cache`] (local storage), [`Error::Download`] (remote fetch)
//! and [`Error::Conversion`] (external transcoder); the CLI derives its exit
//! status via [`Error::exit_code`].

use std::fmt;
use std::path::PathBuf;

/// Unified error type covering all failure modes in deckforge.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The on-disk resource cache could not be read or written.
    #[error("Cache error [{}]: {message}", .path.display())]
    Cache {
        /// Cache path involved in the failure.
        path: PathBuf,
        /// Human-readable error description.
        message: String,
    },

    /// A remote resource could not be fetched or does not exist.
    #[error("Download error [{url}]: {message}")]
    Download {
        /// Origin URL (or stream locator) of the resource.
        url: String,
        /// Human-readable error description.
        message: String,
    },

    /// The external transcoder refused or failed to produce the output.
    #[error("Conversion error: {message}{}", conversion_details(.command, .exit_code, .output))]
    Conversion {
        /// Human-readable error description.
        message: String,
        /// Full command line, when a process was actually invoked.
        command: Option<String>,
        /// Process exit code, when the process ran to completion.
        exit_code: Option<i32>,
        /// Captured stdout and stderr of the process.
        output: String,
    },

    /// An I/O operation failed.
    #[error("IO error: {source}")]
    Io {
        /// The underlying I/O error.
        #[from]
        source: std::io::Error,
    },

    /// An external tool could not be spawned or misbehaved.
    #[error("Tool error [{tool}]: {message}")]
    Tool {
        /// Name of the tool that failed.
        tool: String,
        /// Human-readable error description.
        message: String,
    },

    /// Input data (config, manifest, timeline) failed validation.
    #[error("Validation error: {0}")]
    Validation(String),

    /// The input uses a format deckforge cannot handle.
    #[error("Unsupported: {0}")]
    Unsupported(String),

    /// Catch-all for unexpected internal errors.
    #[error("Internal error: {0}")]
    Internal(String),
}

fn conversion_details(command: &Option<String>, exit_code: &Option<i32>, output: &str) -> String {
    let mut details = String::new();
    if let Some(command) = command {
        details.push_str(&format!("\n\tCommand: {command}"));
    }
    if let Some(code) = exit_code {
        details.push_str(&format!("\n\tExit code: {code}"));
    }
    if !output.trim().is_empty() {
        details.push_str(&format!("\n\tOutput:\n{}", output.trim_end()));
    }
    details
}

impl Error {
    /// Process exit status the CLI should report for this error.
    ///
    /// Download and conversion failures exit with `2`, everything else with `1`.
    pub fn exit_code(&self) -> i32 {
        match self {
            Error::Download { .. } | Error::Conversion { .. } => 2,
            _ => 1,
        }
    }

    /// Convenience constructor for [`Error::Cache`].
    pub fn cache(path: impl Into<PathBuf>, message: impl fmt::Display) -> Self {
        Error::Cache {
            path: path.into(),
            message: message.to_string(),
        }
    }

    /// Convenience constructor for [`Error::Download`].
    pub fn download(url: impl Into<String>, message: impl fmt::Display) -> Self {
        Error::Download {
            url: url.into(),
            message: message.to_string(),
        }
    }

    /// A conversion failure detected before any process was invoked.
    pub fn conversion(message: impl Into<String>) -> Self {
        Error::Conversion {
            message: message.into(),
            command: None,
            exit_code: None,
            output: String::new(),
        }
    }

    /// Convenience constructor for [`Error::Tool`].
    pub fn tool(tool: impl Into<String>, message: impl Into<String>) -> Self {
        Error::Tool {
            tool: tool.into(),
            message: message.into(),
        }
    }

    /// Whether this is a [`Error::Download`].
    pub fn is_download(&self) -> bool {
        matches!(self, Error::Download { .. })
    }
}

/// Result alias using the crate-level [`Error`].
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cache_display() {
        let err = Error::cache("/tmp/cache/foo", "disk full");
        assert_eq!(err.to_string(), "Cache error [/tmp/cache/foo]: disk full");
        assert_eq!(err.exit_code(), 1);
    }

    #[test]
    fn download_display() {
        let err = Error::download("http://example.com/a.jpg", "not found");
        assert_eq!(
            err.to_string(),
            "Download error [http://example.com/a.jpg]: not found"
        );
        assert_eq!(err.exit_code(), 2);
        assert!(err.is_download());
    }

    #[test]
    fn conversion_without_process() {
        let err = Error::conversion("out.avi already exists");
        assert_eq!(err.to_string(), "Conversion error: out.avi already exists");
        assert_eq!(err.exit_code(), 2);
        assert!(!err.is_download());
    }

    #[test]
    fn conversion_with_process_details() {
        let err = Error::Conversion {
            message: "failed to create out.avi".into(),
            command: Some("ffmpeg -i in out.avi".into()),
            exit_code: Some(1),
            output: "Unknown encoder 'libx264'\n".into(),
        };
        let text = err.to_string();
        assert!(text.contains("Command: ffmpeg -i in out.avi"));
        assert!(text.contains("Exit code: 1"));
        assert!(text.contains("Unknown encoder 'libx264'"));
    }

    #[test]
    fn io_from_std() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file missing");
        let err = Error::from(io_err);
        assert!(matches!(err, Error::Io { .. }));
        assert_eq!(err.exit_code(), 1);
    }

    #[test]
    fn tool_display() {
        let err = Error::tool("rtmpdump", "failed to spawn");
        assert_eq!(err.to_string(), "Tool error [rtmpdump]: failed to spawn");
    }
}
