//! Error types for the synchronization core
//!
//! None of these are fatal. Load failures fall back to the next seed source and
//! propagation failures are logged and counted, so callers of
//! [`Store::send`](pantry_runtime::Store::send) never see them.

use thiserror::Error;

/// Errors from the local persistent cache
#[derive(Debug, Error)]
pub enum CacheError {
    /// Reading or writing the underlying storage failed
    #[error("Cache I/O failed for key '{key}': {message}")]
    Io {
        /// Cache key being accessed
        key: String,
        /// Underlying error message
        message: String,
    },

    /// The stored bytes are not a valid snapshot, or the snapshot could not be encoded
    #[error("Cache serialization failed: {0}")]
    Serialization(String),

    /// The storage refused the write because it is full
    #[error("Cache quota exceeded: {size} bytes over limit of {limit}")]
    QuotaExceeded {
        /// Size of the rejected value
        size: usize,
        /// Configured limit
        limit: usize,
    },
}

impl From<serde_json::Error> for CacheError {
    fn from(error: serde_json::Error) -> Self {
        Self::Serialization(error.to_string())
    }
}

/// Errors from the remote data gateway
#[derive(Debug, Error)]
pub enum GatewayError {
    /// The request could not be sent or the connection failed
    #[error("Request failed: {0}")]
    RequestFailed(String),

    /// No response before the configured timeout
    #[error("Request timed out")]
    Timeout,

    /// The server rejected the bearer token
    #[error("Unauthorized - missing or invalid token")]
    Unauthorized,

    /// The server answered with a non-success status
    #[error("Remote error (status {status}): {message}")]
    Status {
        /// HTTP status code
        status: u16,
        /// Response body
        message: String,
    },

    /// The response body did not have the expected shape
    #[error("Malformed response: {0}")]
    MalformedResponse(String),
}

impl From<reqwest::Error> for GatewayError {
    fn from(error: reqwest::Error) -> Self {
        if error.is_timeout() {
            Self::Timeout
        } else if error.is_decode() {
            Self::MalformedResponse(error.to_string())
        } else {
            Self::RequestFailed(error.to_string())
        }
    }
}

/// Errors from loading [`SyncConfig`](crate::config::SyncConfig)
#[derive(Debug, Error)]
pub enum ConfigError {
    /// A value is present but unusable
    #[error("Invalid value for {key}: {message}")]
    InvalidValue {
        /// Setting name
        key: &'static str,
        /// What is wrong with it
        message: String,
    },

    /// A required value is missing
    #[error("Missing required setting: {0}")]
    MissingValue(&'static str),
}

/// [`ChangePropagator::flush`](crate::propagator::ChangePropagator::flush) gave up waiting
#[derive(Debug, Error)]
#[error("Flush timed out with {pending} snapshot(s) not yet attempted")]
pub struct FlushTimeout {
    /// Enqueued snapshots the remote worker had not attempted yet
    pub pending: u64,
}

/// Errors from assembling or running an [`App`](crate::app::App)
#[derive(Debug, Error)]
pub enum AppError {
    /// Configuration is unusable
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// The local cache could not be opened
    #[error(transparent)]
    Cache(#[from] CacheError),

    /// The remote gateway could not be built
    #[error(transparent)]
    Gateway(#[from] GatewayError),

    /// The store rejected an action
    #[error(transparent)]
    Store(#[from] pantry_runtime::StoreError),

    /// Pending remote syncs did not finish in time
    #[error(transparent)]
    Flush(#[from] FlushTimeout),
}
