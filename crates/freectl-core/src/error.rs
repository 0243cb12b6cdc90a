//! Error types and handling for freectl-core operations.
//!
//! All fallible operations in this crate return [`Result<T>`]. Errors are
//! categorized so boundary layers (CLI, HTTP) can translate them into exit
//! codes and status codes, and carry a recoverability hint for retry logic.
//!
//! ## Error Categories
//!
//! - **I/O errors**: file system operations on the cache and config trees
//! - **Network errors**: HTTP fetches for wiki/HTML/RSS/CSV sources
//! - **Git errors**: clone and pull operations on repository sources
//! - **Parse errors**: markdown, feed, or CSV content that cannot be decoded
//! - **Storage errors**: processed-artifact persistence beyond plain I/O
//! - **Config errors**: unusable settings files or missing config directories
//! - **Validation / conflict / not-found**: boundary-input failures

use thiserror::Error;

/// The main error type for freectl-core operations.
///
/// Per-item extraction failures are deliberately *not* represented here; they
/// are collected as strings on the processed artifact so a bad link never
/// aborts its source.
#[derive(Error, Debug)]
pub enum Error {
    /// I/O operation failed.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Network operation failed.
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    /// Git clone or pull failed.
    #[error("Git error: {0}")]
    Git(String),

    /// Content could not be parsed (markdown, feed, CSV, HTML).
    #[error("Parse error: {0}")]
    Parse(String),

    /// Processed-artifact storage operation failed.
    #[error("Storage error: {0}")]
    Storage(String),

    /// Settings are invalid or inaccessible.
    #[error("Configuration error: {0}")]
    Config(String),

    /// A named source or cache path does not exist.
    #[error("Not found: {0}")]
    NotFound(String),

    /// An entity with the same identity already exists.
    #[error("Conflict: {0}")]
    Conflict(String),

    /// Input rejected at a boundary (query shape, source type, field limits).
    #[error("Validation error: {0}")]
    Validation(String),

    /// URL is malformed or uses an unsupported scheme.
    #[error("Invalid URL: {0}")]
    InvalidUrl(String),

    /// Serialization or deserialization failed.
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Extraction pipeline failed for a whole source.
    #[error("Extraction error: {0}")]
    Extraction(String),
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization(err.to_string())
    }
}

impl From<git2::Error> for Error {
    fn from(err: git2::Error) -> Self {
        Self::Git(err.message().to_string())
    }
}

impl From<url::ParseError> for Error {
    fn from(err: url::ParseError) -> Self {
        Self::InvalidUrl(err.to_string())
    }
}

impl Error {
    /// Check if the error might be recoverable through retry logic.
    ///
    /// Returns `true` for failures that are typically temporary: network
    /// timeouts, connection resets, and interrupted I/O. Permanent failures
    /// (validation, conflicts, parse errors) return `false`.
    #[must_use]
    pub fn is_recoverable(&self) -> bool {
        match self {
            Self::Network(e) => e.is_timeout() || e.is_connect(),
            Self::Io(e) => matches!(
                e.kind(),
                std::io::ErrorKind::TimedOut | std::io::ErrorKind::Interrupted
            ),
            _ => false,
        }
    }

    /// Get the error category as a stable string identifier.
    ///
    /// Used for structured logging and for mapping onto HTTP status codes at
    /// the server boundary.
    #[must_use]
    pub const fn category(&self) -> &'static str {
        match self {
            Self::Io(_) => "io",
            Self::Network(_) => "network",
            Self::Git(_) => "git",
            Self::Parse(_) => "parse",
            Self::Storage(_) => "storage",
            Self::Config(_) => "config",
            Self::NotFound(_) => "not_found",
            Self::Conflict(_) => "conflict",
            Self::Validation(_) => "validation",
            Self::InvalidUrl(_) => "invalid_url",
            Self::Serialization(_) => "serialization",
            Self::Extraction(_) => "extraction",
        }
    }
}

/// Convenience type alias for `std::result::Result<T, Error>`.
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use std::io;

    #[test]
    fn display_includes_message() {
        let err = Error::Validation("query too short".to_string());
        assert!(err.to_string().contains("query too short"));
        assert!(err.to_string().contains("Validation"));
    }

    #[test]
    fn categories_are_stable() {
        let cases = vec![
            (Error::Io(io::Error::other("x")), "io"),
            (Error::Git("x".into()), "git"),
            (Error::Parse("x".into()), "parse"),
            (Error::Storage("x".into()), "storage"),
            (Error::Config("x".into()), "config"),
            (Error::NotFound("x".into()), "not_found"),
            (Error::Conflict("x".into()), "conflict"),
            (Error::Validation("x".into()), "validation"),
            (Error::InvalidUrl("x".into()), "invalid_url"),
            (Error::Serialization("x".into()), "serialization"),
            (Error::Extraction("x".into()), "extraction"),
        ];
        for (err, category) in cases {
            assert_eq!(err.category(), category);
        }
    }

    #[test]
    fn io_timeouts_are_recoverable() {
        assert!(Error::Io(io::Error::new(io::ErrorKind::TimedOut, "t")).is_recoverable());
        assert!(Error::Io(io::Error::new(io::ErrorKind::Interrupted, "i")).is_recoverable());
        assert!(!Error::Io(io::Error::new(io::ErrorKind::NotFound, "n")).is_recoverable());
    }

    #[test]
    fn logic_errors_are_not_recoverable() {
        assert!(!Error::Conflict("dup".into()).is_recoverable());
        assert!(!Error::Validation("bad".into()).is_recoverable());
        assert!(!Error::Parse("bad".into()).is_recoverable());
    }

    #[test]
    fn source_chain_is_preserved() {
        let err: Error = io::Error::new(io::ErrorKind::PermissionDenied, "denied").into();
        let source = std::error::Error::source(&err).unwrap();
        assert!(source.to_string().contains("denied"));
    }
}
