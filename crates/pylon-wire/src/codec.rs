//! Codec boundary traits.
//!
//! The session drives any handshake-and-framing implementation through
//! [`ProtocolCodec`]; the codec writes outbound bytes through a [`ByteSink`]
//! supplied at construction (in production, the transport).

use serde_json::Value;

use crate::errors::WireError;
use crate::message::InboundMessage;

/// Outbound byte path the codec writes through.
pub trait ByteSink: Send + Sync {
    /// Write one encoded frame's bytes to the peer.
    fn send_bytes(&self, bytes: &[u8]) -> Result<(), WireError>;
}

/// One-shot callback invoked with the handshake acknowledgement payload.
pub type HandshakeCallback = Box<dyn FnOnce(Value) + Send>;

/// Handshake and framing boundary consumed by the session.
///
/// Implementations own the wire format; the session only sees decoded
/// [`InboundMessage`] values. A codec is constructed once per session,
/// only after the transport reports opened.
pub trait ProtocolCodec: Send + Sync {
    /// Perform the handshake over the already-open transport.
    ///
    /// `on_handshake_ack` fires once, on the transport's execution context,
    /// when the server acknowledges.
    fn start(
        &self,
        identity: Option<Value>,
        on_handshake_ack: Option<HandshakeCallback>,
    ) -> Result<(), WireError>;

    /// Send a correlated message; exactly one reply with `id` is expected.
    fn send_request(&self, route: &str, id: u32, payload: Value) -> Result<(), WireError>;

    /// Send an uncorrelated one-way message.
    fn send_notify(&self, route: &str, payload: Value) -> Result<(), WireError>;

    /// Feed raw bytes in; returns zero or more fully decoded messages.
    ///
    /// Partial frames must buffer across calls.
    fn process_bytes(&self, buf: &[u8]) -> Vec<InboundMessage>;

    /// Release the codec; subsequent calls are no-ops / errors.
    fn close(&self);
}
