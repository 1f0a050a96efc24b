//! JSON frame envelope for the stock line-delimited protocol.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// One wire frame, tagged by its `type` field.
///
/// The client emits `handshake`, `request`, and `notify`; the server emits
/// `handshake.ack`, `response`, and `push`. Unknown frame directions are
/// tolerated on decode and dropped by the codec.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum Frame {
    /// Opens the session; first client frame after the transport connects.
    #[serde(rename = "handshake")]
    Handshake {
        /// Caller-supplied identity blob (auth token, client info).
        #[serde(skip_serializing_if = "Option::is_none")]
        identity: Option<Value>,
    },

    /// Server acknowledgement of the handshake.
    #[serde(rename = "handshake.ack")]
    HandshakeAck {
        /// Session parameters granted by the server.
        payload: Value,
    },

    /// Correlated request expecting exactly one `response` with the same id.
    #[serde(rename = "request")]
    Request {
        /// Target route (e.g. `auth.login`).
        route: String,
        /// Correlation id, unique per session.
        id: u32,
        /// Request payload.
        payload: Value,
    },

    /// Fire-and-forget message; no reply is ever produced.
    #[serde(rename = "notify")]
    Notify {
        /// Target route.
        route: String,
        /// Message payload.
        payload: Value,
    },

    /// Reply to a `request`, matched by id.
    #[serde(rename = "response")]
    Response {
        /// Correlation id echoed from the request.
        id: u32,
        /// Reply payload.
        payload: Value,
    },

    /// Server-initiated event, not tied to any request.
    #[serde(rename = "push")]
    Push {
        /// Event route name.
        route: String,
        /// Event payload.
        payload: Value,
    },
}
