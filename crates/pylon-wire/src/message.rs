//! Decoded inbound message model.

use serde_json::Value;

/// Classification of a decoded inbound message.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MessageKind {
    /// Reply to a correlated request, matched by request id.
    Response,
    /// Server-initiated push, identified by route name.
    Push,
}

/// A fully decoded message handed from the codec to the dispatcher.
///
/// Consumed exactly once; `id` is meaningful only for `Response` and
/// `route` only for `Push`.
#[derive(Clone, Debug)]
pub struct InboundMessage {
    /// Message classification.
    pub kind: MessageKind,
    /// Correlation id of the originating request (`Response` only).
    pub id: u32,
    /// Route / event name (`Push` only).
    pub route: String,
    /// Decoded payload.
    pub payload: Value,
}

impl InboundMessage {
    /// Build a reply message for request `id`.
    pub fn response(id: u32, payload: Value) -> Self {
        Self {
            kind: MessageKind::Response,
            id,
            route: String::new(),
            payload,
        }
    }

    /// Build a push message for `route`.
    pub fn push(route: impl Into<String>, payload: Value) -> Self {
        Self {
            kind: MessageKind::Push,
            id: 0,
            route: route.into(),
            payload,
        }
    }
}
