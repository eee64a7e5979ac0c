//! Error types for the harvest pipeline.
//!
//! Recoverable conditions (transient network failures, documents missing a
//! title, a malformed metadata store, classification failures) surface as
//! values the caller downgrades to logged skips. Local filesystem failures
//! are fatal and propagate out of the run.

use std::path::PathBuf;

/// Top-level error type for all harvest operations.
#[derive(Debug, thiserror::Error)]
pub enum HarvestError {
    /// Configuration loading or validation error.
    #[error("config error: {0}")]
    Config(String),

    /// Transient network/HTTP failure for a single request.
    #[error("network error for {url}: {message}")]
    Network { url: String, message: String },

    /// A fetch gave up after exhausting its retry budget.
    #[error("fetch failed for {url} after {attempts} attempts")]
    Fetch { url: String, attempts: usize },

    /// A required field was absent from a document page.
    #[error("missing data: {0}")]
    MissingData(&'static str),

    /// The metadata store could not be read or written coherently.
    #[error("store error: {0}")]
    Store(String),

    /// Filesystem I/O error. Always fatal to the run.
    #[error("I/O error at {path:?}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    /// The classifier call failed (timeout, malformed response, rate limit).
    #[error("classification error: {0}")]
    Classification(String),
}

/// Convenience alias used throughout the crate.
pub type Result<T> = std::result::Result<T, HarvestError>;

impl HarvestError {
    pub fn network(url: impl Into<String>, message: impl ToString) -> Self {
        Self::Network {
            url: url.into(),
            message: message.to_string(),
        }
    }

    /// Wrap a `std::io::Error` with the path it occurred at.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    /// Whether this error must abort the whole run rather than skip one item.
    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::Io { .. } | Self::Store(_) | Self::Config(_))
    }
}
