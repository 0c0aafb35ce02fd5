//! Error types for the clamgate library.
//!
//! Scan operations never surface these directly: every scan outcome is a
//! [`ScanResult`](crate::core::ScanResult) value. Errors are returned only from
//! the diagnostic and configuration entry points (`connect`, endpoint parsing,
//! config loading).

use std::time::Duration;
use thiserror::Error;

/// A socket-level failure while talking to the scanning daemon.
///
/// Any transport error moves the owning connection into its sticky failed
/// state. Scans map it to [`ScanResult::Unavailable`](crate::core::ScanResult::Unavailable).
#[derive(Debug, Error)]
pub enum TransportError {
    /// The socket could not be opened.
    #[error("failed to connect to '{endpoint}': {source}")]
    Connect {
        /// Endpoint that refused the connection.
        endpoint: String,
        /// Underlying socket error.
        #[source]
        source: std::io::Error,
    },

    /// A send or receive on an established session failed.
    #[error("I/O error on daemon socket: {0}")]
    Io(#[from] std::io::Error),

    /// Connecting took longer than the configured connect timeout.
    #[error("timed out after {0:?} waiting for the daemon")]
    Timeout(Duration),

    /// The connection already failed earlier and is not retried.
    #[error("daemon connection unavailable: {reason}")]
    Unavailable {
        /// Why the connection was given up.
        reason: String,
    },

    /// The configured endpoint could not be resolved.
    #[error(transparent)]
    Config(#[from] ConfigError),
}

impl TransportError {
    /// Creates an `Unavailable` error.
    pub fn unavailable(reason: impl Into<String>) -> Self {
        Self::Unavailable {
            reason: reason.into(),
        }
    }

    /// Returns `true` if this error reports the cached failed state rather
    /// than a fresh fault.
    pub fn is_sticky(&self) -> bool {
        matches!(self, Self::Unavailable { .. })
    }
}

/// Error type for configuration loading and endpoint resolution.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The socket endpoint string is neither a Unix path nor `host:port`.
    #[error("invalid socket endpoint '{value}': {reason}")]
    InvalidEndpoint {
        /// The rejected endpoint string.
        value: String,
        /// What is wrong with it.
        reason: String,
    },

    /// The configuration document could not be parsed.
    #[error("failed to parse configuration: {0}")]
    Parse(#[from] serde_json::Error),
}

impl ConfigError {
    /// Creates an `InvalidEndpoint` error.
    pub fn invalid_endpoint(value: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidEndpoint {
            value: value.into(),
            reason: reason.into(),
        }
    }
}
