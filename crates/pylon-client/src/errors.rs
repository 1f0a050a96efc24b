//! Transport error type.

/// Errors raised by a [`crate::transport::Transport`] implementation.
///
/// These never cross the session's public boundary: failures surface to the
/// application as state transitions plus logged diagnostics.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    /// The connection could not be established.
    #[error("connect failed: {0}")]
    Connect(String),

    /// A write to the open connection failed.
    #[error("send failed: {0}")]
    Send(String),

    /// The transport was already closed or never opened.
    #[error("transport not open")]
    NotOpen,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn connect_display() {
        let err = TransportError::Connect("refused".into());
        assert_eq!(err.to_string(), "connect failed: refused");
    }

    #[test]
    fn send_display() {
        let err = TransportError::Send("broken pipe".into());
        assert_eq!(err.to_string(), "send failed: broken pipe");
    }

    #[test]
    fn not_open_display() {
        assert_eq!(TransportError::NotOpen.to_string(), "transport not open");
    }
}
