use std::path::PathBuf;

use thiserror::Error;

/// Why a task did not produce an artifact.
///
/// Everything a delegated primitive reports ends up in `Operation` with the
/// original message untouched, so the front end can show it as-is.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TaskError {
    /// A required input is missing or unusable (empty URL, no file chosen, ...).
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// The user backed out (no destination chosen, or cancelled via the handle).
    #[error("cancelled")]
    Cancelled,

    /// The delegated download/conversion primitive failed.
    #[error("{0}")]
    Operation(String),

    #[error("timed out after {0:?}")]
    TimedOut(std::time::Duration),
}

impl TaskError {
    pub fn invalid_input(message: impl Into<String>) -> Self {
        Self::InvalidInput(message.into())
    }

    pub fn operation(message: impl Into<String>) -> Self {
        Self::Operation(message.into())
    }

    /// Short status-line text, as opposed to the full message for a dialog.
    pub fn summary(&self) -> &'static str {
        match self {
            TaskError::InvalidInput(_) => "invalid input",
            TaskError::Cancelled => "cancelled",
            TaskError::Operation(_) => "failed",
            TaskError::TimedOut(_) => "timed out",
        }
    }
}

/// Record store failures.
#[derive(Debug, Error)]
pub enum StoreError {
    /// The backing file exists but does not hold a record list.
    #[error("history file {path} is corrupt: {source}")]
    Corrupt {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("history file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to encode history: {0}")]
    Encode(#[source] serde_json::Error),
}

impl StoreError {
    pub fn is_corrupt(&self) -> bool {
        matches!(self, StoreError::Corrupt { .. })
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
}
