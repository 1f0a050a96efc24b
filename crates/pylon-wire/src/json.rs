//! Stock line-delimited JSON codec.
//!
//! Each frame is one [`Frame`] serialized as a single JSON line. The codec
//! starts in the handshake phase: the first `handshake.ack` from the server
//! is consumed internally (it fires the handshake callback and is never
//! yielded as a message). Everything after decodes to responses and pushes.
//!
//! Malformed or direction-inverted frames are logged and skipped; decoding
//! never fails the session.

use std::sync::Arc;

use parking_lot::Mutex;
use serde_json::Value;
use tracing::{debug, warn};

use crate::codec::{ByteSink, HandshakeCallback, ProtocolCodec};
use crate::errors::WireError;
use crate::frames::Frame;
use crate::message::InboundMessage;

/// Handshake phase of the codec.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Phase {
    /// Constructed; handshake not yet sent.
    Idle,
    /// Handshake sent; waiting for the server acknowledgement.
    AwaitingAck,
    /// Handshake acknowledged; normal message flow.
    Active,
    /// Released; all operations are no-ops.
    Closed,
}

struct CodecState {
    phase: Phase,
    buffer: Vec<u8>,
    on_ack: Option<HandshakeCallback>,
}

/// Line-delimited JSON implementation of [`ProtocolCodec`].
pub struct JsonCodec {
    sink: Arc<dyn ByteSink>,
    state: Mutex<CodecState>,
}

impl JsonCodec {
    /// Create a codec writing through `sink`.
    pub fn new(sink: Arc<dyn ByteSink>) -> Self {
        Self {
            sink,
            state: Mutex::new(CodecState {
                phase: Phase::Idle,
                buffer: Vec::new(),
                on_ack: None,
            }),
        }
    }

    fn write_frame(&self, frame: &Frame) -> Result<(), WireError> {
        let mut text = serde_json::to_string(frame)?;
        text.push('\n');
        self.sink.send_bytes(text.as_bytes())
    }

    fn ensure_open(&self) -> Result<(), WireError> {
        if self.state.lock().phase == Phase::Closed {
            return Err(WireError::Closed);
        }
        Ok(())
    }

    /// Decode one complete line into a message, mutating handshake state.
    ///
    /// Returns the ack callback (to be invoked after the lock is released)
    /// when this line completed the handshake.
    fn decode_line(
        state: &mut CodecState,
        line: &[u8],
        out: &mut Vec<InboundMessage>,
    ) -> Option<(HandshakeCallback, Value)> {
        let frame: Frame = match serde_json::from_slice(line) {
            Ok(frame) => frame,
            Err(err) => {
                warn!(error = %err, line = %String::from_utf8_lossy(line), "dropping malformed frame");
                return None;
            }
        };

        match frame {
            Frame::HandshakeAck { payload } => {
                if state.phase == Phase::AwaitingAck {
                    state.phase = Phase::Active;
                    debug!("handshake acknowledged");
                    return state.on_ack.take().map(|cb| (cb, payload));
                }
                warn!("dropping unexpected handshake ack");
            }
            Frame::Response { id, payload } => {
                out.push(InboundMessage::response(id, payload));
            }
            Frame::Push { route, payload } => {
                out.push(InboundMessage::push(route, payload));
            }
            Frame::Handshake { .. } | Frame::Request { .. } | Frame::Notify { .. } => {
                warn!("dropping client-direction frame received from server");
            }
        }
        None
    }
}

impl ProtocolCodec for JsonCodec {
    fn start(
        &self,
        identity: Option<Value>,
        on_handshake_ack: Option<HandshakeCallback>,
    ) -> Result<(), WireError> {
        {
            let mut state = self.state.lock();
            match state.phase {
                Phase::Closed => return Err(WireError::Closed),
                Phase::AwaitingAck | Phase::Active => return Err(WireError::HandshakeStarted),
                Phase::Idle => {}
            }
            state.phase = Phase::AwaitingAck;
            state.on_ack = on_handshake_ack;
        }

        if let Err(err) = self.write_frame(&Frame::Handshake { identity }) {
            let mut state = self.state.lock();
            state.phase = Phase::Idle;
            state.on_ack = None;
            return Err(err);
        }
        Ok(())
    }

    fn send_request(&self, route: &str, id: u32, payload: Value) -> Result<(), WireError> {
        self.ensure_open()?;
        self.write_frame(&Frame::Request {
            route: route.to_owned(),
            id,
            payload,
        })
    }

    fn send_notify(&self, route: &str, payload: Value) -> Result<(), WireError> {
        self.ensure_open()?;
        self.write_frame(&Frame::Notify {
            route: route.to_owned(),
            payload,
        })
    }

    fn process_bytes(&self, buf: &[u8]) -> Vec<InboundMessage> {
        let mut out = Vec::new();
        let mut ack = None;
        {
            let mut state = self.state.lock();
            if state.phase == Phase::Closed {
                return out;
            }
            state.buffer.extend_from_slice(buf);

            while let Some(pos) = state.buffer.iter().position(|b| *b == b'\n') {
                let mut line: Vec<u8> = state.buffer.drain(..=pos).collect();
                let _ = line.pop(); // the newline itself
                if line.last() == Some(&b'\r') {
                    let _ = line.pop();
                }
                if line.is_empty() {
                    continue;
                }
                if let Some(fired) = Self::decode_line(&mut state, &line, &mut out) {
                    ack = Some(fired);
                }
            }
        }

        // Invoke outside the lock so the callback may re-enter the codec.
        if let Some((cb, payload)) = ack {
            cb(payload);
        }
        out
    }

    fn close(&self) {
        let mut state = self.state.lock();
        state.phase = Phase::Closed;
        state.buffer.clear();
        state.on_ack = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::message::MessageKind;
    use serde_json::json;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Records every outbound frame; optionally fails all writes.
    struct RecordingSink {
        sent: Mutex<Vec<String>>,
        fail: bool,
    }

    impl RecordingSink {
        fn new() -> Arc<Self> {
            Arc::new(Self {
                sent: Mutex::new(Vec::new()),
                fail: false,
            })
        }

        fn failing() -> Arc<Self> {
            Arc::new(Self {
                sent: Mutex::new(Vec::new()),
                fail: true,
            })
        }

        fn sent(&self) -> Vec<String> {
            self.sent.lock().clone()
        }
    }

    impl ByteSink for RecordingSink {
        fn send_bytes(&self, bytes: &[u8]) -> Result<(), WireError> {
            if self.fail {
                return Err(WireError::Sink {
                    message: "stub failure".into(),
                });
            }
            self.sent
                .lock()
                .push(String::from_utf8(bytes.to_vec()).unwrap());
            Ok(())
        }
    }

    fn codec() -> (JsonCodec, Arc<RecordingSink>) {
        let sink = RecordingSink::new();
        (JsonCodec::new(sink.clone()), sink)
    }

    // ── Handshake ───────────────────────────────────────────────────

    #[test]
    fn start_sends_handshake_frame() {
        let (codec, sink) = codec();
        codec.start(Some(json!({"token": "t"})), None).unwrap();
        let sent = sink.sent();
        assert_eq!(sent.len(), 1);
        assert!(sent[0].ends_with('\n'));
        let v: Value = serde_json::from_str(&sent[0]).unwrap();
        assert_eq!(v["type"], "handshake");
        assert_eq!(v["identity"]["token"], "t");
    }

    #[test]
    fn ack_fires_callback_once_with_payload() {
        let (codec, _sink) = codec();
        let fired = Arc::new(AtomicUsize::new(0));
        let fired2 = fired.clone();
        codec
            .start(
                None,
                Some(Box::new(move |payload| {
                    assert_eq!(payload["heartbeat"], 30);
                    let _ = fired2.fetch_add(1, Ordering::SeqCst);
                })),
            )
            .unwrap();

        let msgs =
            codec.process_bytes(b"{\"type\":\"handshake.ack\",\"payload\":{\"heartbeat\":30}}\n");
        assert!(msgs.is_empty());
        assert_eq!(fired.load(Ordering::SeqCst), 1);

        // A second ack is unexpected and dropped.
        let msgs =
            codec.process_bytes(b"{\"type\":\"handshake.ack\",\"payload\":{\"heartbeat\":30}}\n");
        assert!(msgs.is_empty());
        assert_eq!(fired.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn ack_before_start_is_dropped() {
        let (codec, _sink) = codec();
        let msgs = codec.process_bytes(b"{\"type\":\"handshake.ack\",\"payload\":{}}\n");
        assert!(msgs.is_empty());
    }

    #[test]
    fn double_start_is_rejected() {
        let (codec, _sink) = codec();
        codec.start(None, None).unwrap();
        assert!(matches!(
            codec.start(None, None),
            Err(WireError::HandshakeStarted)
        ));
    }

    #[test]
    fn failed_handshake_send_allows_retry() {
        let sink = RecordingSink::failing();
        let codec = JsonCodec::new(sink);
        assert!(matches!(
            codec.start(None, None),
            Err(WireError::Sink { .. })
        ));
        // The phase was rolled back, so a retry is not "already started".
        assert!(matches!(
            codec.start(None, None),
            Err(WireError::Sink { .. })
        ));
    }

    // ── Outbound frames ─────────────────────────────────────────────

    #[test]
    fn send_request_encodes_route_and_id() {
        let (codec, sink) = codec();
        codec.send_request("auth.login", 3, json!({"uid": 1})).unwrap();
        let v: Value = serde_json::from_str(&sink.sent()[0]).unwrap();
        assert_eq!(v["type"], "request");
        assert_eq!(v["route"], "auth.login");
        assert_eq!(v["id"], 3);
    }

    #[test]
    fn send_notify_has_no_id() {
        let (codec, sink) = codec();
        codec.send_notify("room.leave", json!({})).unwrap();
        let v: Value = serde_json::from_str(&sink.sent()[0]).unwrap();
        assert_eq!(v["type"], "notify");
        assert!(v.get("id").is_none());
    }

    // ── Inbound decoding ────────────────────────────────────────────

    #[test]
    fn decodes_response_and_push() {
        let (codec, _sink) = codec();
        let msgs = codec.process_bytes(
            b"{\"type\":\"response\",\"id\":1,\"payload\":{\"v\":1}}\n\
              {\"type\":\"push\",\"route\":\"alert\",\"payload\":{\"v\":2}}\n",
        );
        assert_eq!(msgs.len(), 2);
        assert_eq!(msgs[0].kind, MessageKind::Response);
        assert_eq!(msgs[0].id, 1);
        assert_eq!(msgs[1].kind, MessageKind::Push);
        assert_eq!(msgs[1].route, "alert");
    }

    #[test]
    fn partial_frame_buffers_across_calls() {
        let (codec, _sink) = codec();
        let line = b"{\"type\":\"response\",\"id\":5,\"payload\":{}}\n";
        let (head, tail) = line.split_at(17);
        assert!(codec.process_bytes(head).is_empty());
        let msgs = codec.process_bytes(tail);
        assert_eq!(msgs.len(), 1);
        assert_eq!(msgs[0].id, 5);
    }

    #[test]
    fn malformed_line_is_skipped() {
        let (codec, _sink) = codec();
        let msgs = codec.process_bytes(
            b"this is not json\n{\"type\":\"response\",\"id\":2,\"payload\":{}}\n",
        );
        assert_eq!(msgs.len(), 1);
        assert_eq!(msgs[0].id, 2);
    }

    #[test]
    fn crlf_line_endings_are_tolerated() {
        let (codec, _sink) = codec();
        let msgs = codec.process_bytes(b"{\"type\":\"response\",\"id\":9,\"payload\":{}}\r\n");
        assert_eq!(msgs.len(), 1);
        assert_eq!(msgs[0].id, 9);
    }

    #[test]
    fn blank_lines_are_ignored() {
        let (codec, _sink) = codec();
        let msgs = codec.process_bytes(b"\n\n{\"type\":\"response\",\"id\":1,\"payload\":{}}\n");
        assert_eq!(msgs.len(), 1);
    }

    #[test]
    fn client_direction_frames_are_dropped() {
        let (codec, _sink) = codec();
        let msgs = codec.process_bytes(
            b"{\"type\":\"request\",\"route\":\"x\",\"id\":1,\"payload\":{}}\n",
        );
        assert!(msgs.is_empty());
    }

    // ── Close ───────────────────────────────────────────────────────

    #[test]
    fn close_stops_all_operations() {
        let (codec, _sink) = codec();
        codec.close();
        assert!(matches!(codec.start(None, None), Err(WireError::Closed)));
        assert!(matches!(
            codec.send_request("r", 1, json!({})),
            Err(WireError::Closed)
        ));
        assert!(matches!(
            codec.send_notify("r", json!({})),
            Err(WireError::Closed)
        ));
        let msgs = codec.process_bytes(b"{\"type\":\"response\",\"id\":1,\"payload\":{}}\n");
        assert!(msgs.is_empty());
    }

    #[test]
    fn close_is_idempotent() {
        let (codec, _sink) = codec();
        codec.close();
        codec.close();
        assert!(matches!(codec.start(None, None), Err(WireError::Closed)));
    }
}
