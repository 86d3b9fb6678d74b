//! Engine error types
//!
//! Variants carry owned strings so errors can live inside cloned state
//! snapshots published over watch channels.

use thiserror::Error;

/// Snapshot fetch error
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FetchError {
    /// The backend does not know this order; terminal for the session
    #[error("order not found: {0}")]
    NotFound(String),

    /// Network failure or non-404 error status; eligible for retry
    #[error("transient fetch failure: {0}")]
    Transient(String),

    /// The response body could not be parsed into a snapshot
    #[error("malformed order payload: {0}")]
    Schema(String),
}

impl FetchError {
    /// Whether a retry of the same request could reasonably succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(self, FetchError::Transient(_))
    }
}

/// Result type for fetch operations
pub type FetchResult<T> = Result<T, FetchError>;

/// Live channel transport error
///
/// Internal to the channel layer: a failed push transport degrades to
/// polling and keeps retrying, it never fails a tracking session.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ChannelError {
    /// Could not establish the push connection
    #[error("channel connect failed: {0}")]
    Connect(String),

    /// The transport broke after connecting
    #[error("channel protocol error: {0}")]
    Protocol(String),

    /// The server closed the stream
    #[error("channel closed by server")]
    Closed,
}
