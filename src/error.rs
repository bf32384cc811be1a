//! Error types for Gangplank
//!
//! One `thiserror` enum for the whole crate; commands propagate it up to
//! the binary boundary, where `ui::report_error` renders it by variant.

use thiserror::Error;

/// Result type alias for Gangplank operations
pub type DeployResult<T> = Result<T, DeployError>;

/// Main error type for Gangplank operations
#[derive(Error, Debug)]
pub enum DeployError {
    /// Required configuration values are missing (pre-flight, fatal)
    #[error("missing required configuration: {}", missing.join(", "))]
    Config { missing: Vec<String> },

    /// SSH transport unreachable or rejected the connection
    #[error("cannot connect to server: {message}")]
    Connection { message: String },

    /// A remote command exited non-zero; carries the full failure context
    #[error("remote command failed with exit code {exit_code}: {command}")]
    RemoteExec {
        command: String,
        exit_code: i32,
        stdout: String,
        stderr: String,
    },

    /// Non-2xx response from the GitHub API (404 existence probes excluded)
    #[error("GitHub API request failed ({status}): {message}")]
    Provider { status: u16, message: String },

    /// User declined an interactive prompt; terminal but not a defect
    #[error("cancelled by user")]
    Cancelled,

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// HTTP transport error
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
}

impl DeployError {
    /// Exit code reported when a remote process was killed by a signal
    pub const SIGNAL_EXIT: i32 = -1;

    pub fn connection(message: impl Into<String>) -> Self {
        DeployError::Connection {
            message: message.into(),
        }
    }

    pub fn provider(status: u16, message: impl Into<String>) -> Self {
        DeployError::Provider {
            status,
            message: message.into(),
        }
    }
}
