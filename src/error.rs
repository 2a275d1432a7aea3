//! Error types for github-backup
//!
//! Every failure the library can produce is a variant of [`Error`]. Errors are
//! account-local: the orchestrator records them per account and keeps going,
//! so the only errors that reach the process boundary are configuration
//! problems and [`Error::NoAccounts`].

use std::path::PathBuf;
use thiserror::Error;

use crate::types::MigrationId;

/// Result type alias for github-backup operations
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for github-backup
#[derive(Debug, Error)]
pub enum Error {
    /// Configuration error with context about which setting is invalid
    #[error("configuration error: {message}")]
    Config {
        /// Human-readable error message describing the configuration issue
        message: String,
        /// The configuration key that caused the error (e.g., "token")
        key: Option<String>,
    },

    /// The request never produced an HTTP response (DNS, connect, reset, timeout)
    #[error("request to {url} failed: {source}")]
    Transport {
        /// The URL that was requested
        url: String,
        /// The underlying client error
        #[source]
        source: reqwest::Error,
    },

    /// The service answered with a non-success status
    #[error("{url} returned HTTP {status}: {body}")]
    Api {
        /// HTTP status code
        status: u16,
        /// The URL that was requested
        url: String,
        /// Response body as returned by the service
        body: String,
    },

    /// A success response whose body could not be decoded
    #[error("unexpected response from {url}: {source}")]
    Decode {
        /// The URL that was requested
        url: String,
        /// The underlying decode error
        #[source]
        source: reqwest::Error,
    },

    /// The service reported `state == "failed"` for a migration
    #[error("migration {id} for {login} failed")]
    ExportFailed {
        /// The migration that failed
        id: MigrationId,
        /// The account the migration belongs to
        login: String,
    },

    /// Streaming the archive to disk failed
    #[error("failed to save archive to {path}: {reason}")]
    Download {
        /// Destination file
        path: PathBuf,
        /// What went wrong
        reason: String,
    },

    /// The output path template could not be rendered
    #[error("invalid output template {template:?}: {reason}")]
    Template {
        /// The template as configured
        template: String,
        /// What went wrong
        reason: String,
    },

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// None of the configured accounts could start a migration
    #[error("no account could start a migration")]
    NoAccounts,
}

impl Error {
    /// Shorthand for a configuration error tied to one key
    pub(crate) fn config(key: &str, message: impl Into<String>) -> Self {
        Error::Config {
            message: message.into(),
            key: Some(key.to_string()),
        }
    }

    /// Machine-readable error code, used as a structured log field
    pub fn error_code(&self) -> &'static str {
        match self {
            Error::Config { .. } => "config_error",
            Error::Transport { .. } => "transport_error",
            Error::Api { .. } => "api_error",
            Error::Decode { .. } => "decode_error",
            Error::ExportFailed { .. } => "export_failed",
            Error::Download { .. } => "download_error",
            Error::Template { .. } => "template_error",
            Error::Io(_) => "io_error",
            Error::NoAccounts => "no_accounts",
        }
    }
}
