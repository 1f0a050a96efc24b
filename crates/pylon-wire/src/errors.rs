//! Wire-level error type.

/// Errors raised while encoding or sending frames.
///
/// Decode failures are never surfaced as errors: malformed inbound frames
/// are logged and skipped by the codec.
#[derive(Debug, thiserror::Error)]
pub enum WireError {
    /// Frame could not be serialized.
    #[error("frame encode failed: {0}")]
    Encode(#[from] serde_json::Error),

    /// The outbound byte sink rejected the write.
    #[error("sink write failed: {message}")]
    Sink {
        /// Description from the underlying transport.
        message: String,
    },

    /// The codec was already closed.
    #[error("codec closed")]
    Closed,

    /// Handshake attempted more than once.
    #[error("handshake already started")]
    HandshakeStarted,
}
