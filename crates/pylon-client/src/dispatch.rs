//! Correlation & dispatch engine.
//!
//! Owns the request-id → reply-callback map and the route → push-handler
//! map, and is the single place that interprets an inbound message's kind.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::Mutex;
use pylon_wire::{InboundMessage, MessageKind};
use serde_json::Value;
use tracing::debug;

/// Reply callback; consumed on first (and only) invocation.
pub type ReplyHandler = Box<dyn FnOnce(Value) + Send>;

/// Push handler; fires for every matching push for the life of the session.
pub type PushHandler = Arc<dyn Fn(Value) + Send + Sync>;

/// Maps in-flight request ids to reply callbacks and event routes to push
/// handlers.
///
/// Handlers are always invoked after the table locks are released, so a
/// handler may re-enter the session (issue a follow-up request, register
/// another push handler) without deadlocking.
#[derive(Default)]
pub struct Dispatcher {
    replies: Mutex<HashMap<u32, ReplyHandler>>,
    pushes: Mutex<HashMap<String, PushHandler>>,
}

impl Dispatcher {
    /// Create an empty engine.
    pub fn new() -> Self {
        Self::default()
    }

    /// Store `callback` under `id`. A reused id silently overwrites, which
    /// cannot happen while the session's counter invariant holds.
    pub fn register_reply(&self, id: u32, callback: ReplyHandler) {
        let _ = self.replies.lock().insert(id, callback);
    }

    /// Drop the pending reply for `id` without invoking it (send failure).
    pub fn discard_reply(&self, id: u32) {
        let _ = self.replies.lock().remove(&id);
    }

    /// Invoke and remove the reply callback for `id` exactly once.
    ///
    /// An unknown or already-consumed id is the late/duplicate-reply case:
    /// the message is dropped with no error surfaced. Returns whether a
    /// callback fired.
    pub fn invoke_reply(&self, id: u32, payload: Value) -> bool {
        let callback = self.replies.lock().remove(&id);
        match callback {
            Some(callback) => {
                callback(payload);
                true
            }
            None => {
                debug!(id, "dropping reply with no pending request");
                false
            }
        }
    }

    /// Register `handler` for `route`, replacing any prior handler for the
    /// same route (last writer wins).
    pub fn register_push(&self, route: impl Into<String>, handler: PushHandler) {
        let _ = self.pushes.lock().insert(route.into(), handler);
    }

    /// Invoke the push handler for `route`, if any. Unlike replies the
    /// handler stays registered. Returns whether a handler fired.
    pub fn invoke_push(&self, route: &str, payload: Value) -> bool {
        let handler = self.pushes.lock().get(route).cloned();
        match handler {
            Some(handler) => {
                handler(payload);
                true
            }
            None => {
                debug!(route, "dropping push with no registered handler");
                false
            }
        }
    }

    /// Route one decoded message to its target.
    ///
    /// The unifying entry point for all inbound traffic: responses go to
    /// [`Self::invoke_reply`], pushes to [`Self::invoke_push`].
    pub fn dispatch(&self, message: InboundMessage) {
        match message.kind {
            MessageKind::Response => {
                let _ = self.invoke_reply(message.id, message.payload);
            }
            MessageKind::Push => {
                let _ = self.invoke_push(&message.route, message.payload);
            }
        }
    }

    /// Clear both tables. Pending reply callbacks are dropped, never
    /// invoked: in-flight requests at teardown simply get no reply.
    pub fn release_all(&self) {
        self.replies.lock().clear();
        self.pushes.lock().clear();
    }

    /// Number of in-flight requests awaiting a reply.
    pub fn pending_replies(&self) -> usize {
        self.replies.lock().len()
    }
}
