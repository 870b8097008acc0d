//! CLI error types.

use thiserror::Error;

/// CLI-specific errors.
#[derive(Debug, Error)]
pub enum CliError {
    /// Invalid configuration or arguments.
    #[error("configuration error: {0}")]
    Config(String),

    /// The wrapped command could not be started.
    #[error("failed to start '{program}': {source}")]
    Spawn {
        /// Program that failed to start.
        program: String,
        /// Underlying error.
        source: std::io::Error,
    },

    /// The wrapped command exited unsuccessfully.
    #[error("command exited with {}", .code.map_or_else(|| "a signal".to_string(), |c| format!("status {c}")))]
    ChildFailed {
        /// Exit code, if the command was not killed by a signal.
        code: Option<i32>,
    },

    /// Settlement library error.
    #[error(transparent)]
    Mint(#[from] mint_settle::MintError),

    /// Output formatting error.
    #[error("format error: {0}")]
    Format(#[from] serde_json::Error),

    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl CliError {
    /// Process exit code to report for this error.
    #[must_use]
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::ChildFailed { code } => code.unwrap_or(1),
            Self::Spawn { .. } => 127,
            _ => 1,
        }
    }
}
