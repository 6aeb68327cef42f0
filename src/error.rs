//! Centralized error types for attachsift.

use std::path::PathBuf;
use thiserror::Error;

/// All errors produced by the attachsift library.
#[derive(Error, Debug)]
pub enum SiftError {
    /// I/O error with the associated file path.
    #[error("I/O error on '{path}': {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    /// The specified file or directory does not exist.
    #[error("Not found: {0}")]
    FileNotFound(PathBuf),

    /// An input name that does not carry a message number.
    #[error("Invalid path: {0}")]
    InvalidPath(String),

    /// A required credential is absent from the environment and the command line.
    #[error("Missing credential: {0} must be set")]
    MissingCredential(&'static str),

    /// Configuration could not be used as given.
    #[error("Configuration error: {0}")]
    Config(String),

    /// The model provider could not be reached (network failure or timeout).
    #[error("Model transport error: {0}")]
    Transport(String),

    /// The model provider answered with a non-success HTTP status.
    #[error("Model provider returned HTTP {status}: {body}")]
    Status { status: u16, body: String },

    /// The model answer did not contain a usable JSON classification.
    #[error("Could not parse model answer: {0}")]
    AnswerParse(String),

    /// A persisted partition file is unreadable or inconsistent.
    #[error("Invalid partition file '{path}': {reason}")]
    InvalidPartitionFile { path: PathBuf, reason: String },
}

/// Convenience alias for `Result<T, SiftError>`.
pub type Result<T> = std::result::Result<T, SiftError>;

/// Coarse classification of a per-message failure, used for degradation reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    /// Network, timeout, or HTTP status failure talking to the model.
    Transport,
    /// The model answered, but the answer held no usable JSON object.
    Parse,
    /// Anything else (I/O, invalid input files).
    Other,
}

impl SiftError {
    /// Create an `Io` variant from a path and an `io::Error`.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    /// The failure kind this error is reported as.
    pub fn failure_kind(&self) -> FailureKind {
        match self {
            Self::Transport(_) | Self::Status { .. } => FailureKind::Transport,
            Self::AnswerParse(_) => FailureKind::Parse,
            _ => FailureKind::Other,
        }
    }
}

impl From<reqwest::Error> for SiftError {
    fn from(err: reqwest::Error) -> Self {
        if let Some(status) = err.status() {
            Self::Status {
                status: status.as_u16(),
                body: err.to_string(),
            }
        } else {
            Self::Transport(err.to_string())
        }
    }
}

/// Allow `?` on `std::io::Error` when no path context is available
/// (rare, prefer `SiftError::io`).
impl From<std::io::Error> for SiftError {
    fn from(source: std::io::Error) -> Self {
        Self::Io {
            path: PathBuf::from("<unknown>"),
            source,
        }
    }
}
