//! Error types for model resolution, download and cache management

use std::fmt;
use std::path::PathBuf;
use thiserror::Error;

/// Result alias used throughout the library
pub type ModelResult<T> = Result<T, ModelError>;

/// Errors surfaced by the model store
#[derive(Debug, Error)]
pub enum ModelError {
    #[error("Unknown model '{name}'. Valid models: {}", .valid.join(", "))]
    UnknownModel { name: String, valid: Vec<String> },

    #[error(
        "Invalid stat model name '{name}': names may only contain lowercase letters and underscores"
    )]
    InvalidName { name: String },

    #[error("Failed to download model '{model}': {source}")]
    DownloadFailed {
        model: String,
        #[source]
        source: FetchError,
    },

    #[error("Cached model '{model}' at {path:?} is corrupted or unreadable: {reason}")]
    CorruptCache {
        model: String,
        path: PathBuf,
        reason: String,
    },

    #[error("Invalid cache scope '{scope}': expected one of all, core, stat")]
    InvalidScope { scope: String },

    #[error("I/O error at {path:?}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid configuration: {0}")]
    Config(String),
}

impl ModelError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}

/// Failure of every transport in a fetch chain
///
/// Keeps one message per transport, in the order they were attempted.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FetchError {
    pub attempts: Vec<TransportFailure>,
}

/// A single transport's failure message
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransportFailure {
    pub transport: String,
    pub message: String,
}

impl FetchError {
    pub fn push(&mut self, transport: impl Into<String>, message: impl Into<String>) {
        self.attempts.push(TransportFailure {
            transport: transport.into(),
            message: message.into(),
        });
    }

    /// Message reported by the named transport, if it was attempted
    pub fn message_for(&self, transport: &str) -> Option<&str> {
        self.attempts
            .iter()
            .find(|a| a.transport == transport)
            .map(|a| a.message.as_str())
    }
}

impl fmt::Display for FetchError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.attempts.is_empty() {
            return write!(f, "no transports configured");
        }
        let parts: Vec<String> = self
            .attempts
            .iter()
            .map(|a| format!("{}: {}", a.transport, a.message))
            .collect();
        write!(f, "{}", parts.join("; "))
    }
}

impl std::error::Error for FetchError {}
