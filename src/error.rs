//! Error types for distro-torrents
//!
//! Errors fall into three families that the run driver treats differently:
//! - **Transport** - connection failures, timeouts, non-success HTTP status
//! - **Parse** - the page was fetched but the expected structure is absent
//! - **Local** - configuration, filesystem and serialization problems
//!
//! "Already handled" is deliberately not an error; the fetch sink reports it
//! as a skip.

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for distro-torrents operations
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for distro-torrents
#[derive(Debug, Error)]
pub enum Error {
    /// Configuration error with context about which setting is invalid
    #[error("configuration error: {message}")]
    Config {
        /// Human-readable error message describing the configuration issue
        message: String,
        /// The configuration key that caused the error (e.g., "HTTP_TIMEOUT_SECS")
        key: Option<String>,
    },

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Network error (connection refused, DNS failure, timeout, truncated body)
    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),

    /// The server answered with a non-success status
    #[error("HTTP {status} from {url}")]
    HttpStatus {
        /// The requested URL
        url: String,
        /// The numeric HTTP status code
        status: u16,
    },

    /// Expected structure was absent from a provider page
    #[error("{provider}: {message}")]
    Parse {
        /// Provider that failed to extract a release
        provider: String,
        /// What was missing
        message: String,
    },

    /// A release candidate that cannot be written safely
    #[error("invalid release candidate '{name}': {reason}")]
    InvalidCandidate {
        /// The offending candidate name
        name: String,
        /// Why it was rejected
        reason: String,
    },

    /// Torrent client RPC failure
    #[error("torrent client RPC error: {0}")]
    Rpc(String),

    /// Failed to read filesystem statistics
    #[error("failed to read disk usage for {path}: {reason}")]
    DiskUsage {
        /// Path that was queried
        path: PathBuf,
        /// Underlying OS error
        reason: String,
    },

    /// Serialization error
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Other error
    #[error("{0}")]
    Other(String),
}

impl Error {
    /// Build a parse error for the given provider
    pub fn parse(provider: impl Into<String>, message: impl Into<String>) -> Self {
        Error::Parse {
            provider: provider.into(),
            message: message.into(),
        }
    }

    /// Build a configuration error tied to a key
    pub fn config(key: impl Into<String>, message: impl Into<String>) -> Self {
        Error::Config {
            message: message.into(),
            key: Some(key.into()),
        }
    }

    /// Whether this error came from the network boundary
    #[must_use]
    pub fn is_transport(&self) -> bool {
        matches!(self, Error::Network(_) | Error::HttpStatus { .. })
    }

    /// Whether this error came from page content that could not be understood
    #[must_use]
    pub fn is_parse(&self) -> bool {
        matches!(self, Error::Parse { .. } | Error::Serialization(_))
    }

    /// Machine-readable error code, used as a structured log field
    #[must_use]
    pub fn error_code(&self) -> &'static str {
        match self {
            Error::Config { .. } => "config_error",
            Error::Io(_) => "io_error",
            Error::Network(e) if e.is_timeout() => "timeout",
            Error::Network(_) => "network_error",
            Error::HttpStatus { .. } => "http_status",
            Error::Parse { .. } => "parse_error",
            Error::InvalidCandidate { .. } => "invalid_candidate",
            Error::Rpc(_) => "rpc_error",
            Error::DiskUsage { .. } => "disk_usage_error",
            Error::Serialization(_) => "serialization_error",
            Error::Other(_) => "internal_error",
        }
    }
}
