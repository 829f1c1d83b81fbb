//! Error types for the Stealth runtime.

use thiserror::Error;

/// Result type alias for runtime operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in the Stealth runtime.
///
/// These cover transport and protocol faults only. Expected failure paths of
/// controller operations (bad config shape, no current tab, exhausted
/// history) are reported as boolean or sentinel results, not errors.
#[derive(Debug, Error)]
pub enum Error {
    /// Failed to establish a connection with the service peer.
    #[error("Failed to connect to Stealth service: {0}")]
    ConnectionFailed(String),

    /// Transport-level error (framing, socket I/O).
    #[error("Transport error: {0}")]
    TransportError(String),

    /// Protocol-level error (malformed envelope, unexpected message).
    #[error("Protocol error: {0}")]
    ProtocolError(String),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Channel closed unexpectedly.
    #[error("Channel closed unexpectedly")]
    ChannelClosed,

    /// Timeout waiting for operation.
    #[error("Timeout: {0}")]
    Timeout(String),
}

impl Error {
    /// Returns true if this is a timeout error.
    pub fn is_timeout(&self) -> bool {
        matches!(self, Error::Timeout(_))
    }

    /// Returns true if this error came from the transport layer.
    pub fn is_transport(&self) -> bool {
        matches!(
            self,
            Error::ConnectionFailed(_) | Error::TransportError(_) | Error::Io(_)
        )
    }
}
