//! Session controller: the connection lifecycle state machine.
//!
//! Composes the transport, the codec, and the dispatch engine. The caller
//! thread drives [`Session::initialize`] / [`Session::request`] /
//! [`Session::disconnect`]; the transport's reader thread delivers
//! notifications and runs every user callback. `initialize` is the only
//! blocking call: it parks on a one-shot gate until the transport opens or
//! the configured deadline expires.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use parking_lot::Mutex;
use pylon_wire::{ByteSink, HandshakeCallback, JsonCodec, ProtocolCodec, WireError};
use serde_json::Value;
use tracing::{debug, error, warn};

use crate::config::ClientConfig;
use crate::dispatch::Dispatcher;
use crate::gate::ConnectGate;
use crate::state::{NetworkState, StateObservers};
use crate::transport::{Transport, TransportEvents, WsTransport};

/// Callback invoked once, on the transport context, when the connection
/// opens.
pub type ReadyCallback = Box<dyn FnOnce() + Send>;

/// Builds the protocol codec after the transport reports opened.
pub type CodecFactory = Box<dyn Fn(Arc<dyn ByteSink>) -> Arc<dyn ProtocolCodec> + Send + Sync>;

/// Builds the transport for the host and port given to `initialize`.
pub type TransportFactory = Box<dyn Fn(&str, u16) -> Arc<dyn Transport> + Send + Sync>;

/// Adapts the transport's outbound path to the codec's byte sink.
struct TransportSink(Arc<dyn Transport>);

impl ByteSink for TransportSink {
    fn send_bytes(&self, bytes: &[u8]) -> Result<(), WireError> {
        self.0.send(bytes).map_err(|err| WireError::Sink {
            message: err.to_string(),
        })
    }
}

struct SessionInner {
    config: ClientConfig,
    state: Mutex<NetworkState>,
    observers: StateObservers,
    dispatcher: Dispatcher,
    transport_factory: TransportFactory,
    codec_factory: CodecFactory,
    transport: Mutex<Option<Arc<dyn Transport>>>,
    codec: Mutex<Option<Arc<dyn ProtocolCodec>>>,
    next_request_id: Mutex<u32>,
    gate: ConnectGate,
    on_ready: Mutex<Option<ReadyCallback>>,
    disposed: AtomicBool,
}

/// A client session over one transport connection.
///
/// One session owns one transport and one codec; the codec exists only
/// between the transport reporting opened and teardown. Dropping the
/// session tears it down.
pub struct Session {
    inner: Arc<SessionInner>,
}

impl Session {
    /// Create a session with the stock websocket transport and line-JSON
    /// codec.
    pub fn new(config: ClientConfig) -> Self {
        let poll = config.read_poll_interval();
        Self::with_parts(
            config,
            Box::new(move |host: &str, port: u16| -> Arc<dyn Transport> {
                Arc::new(WsTransport::new(format!("ws://{host}:{port}"), poll))
            }),
            Box::new(|sink: Arc<dyn ByteSink>| -> Arc<dyn ProtocolCodec> {
                Arc::new(JsonCodec::new(sink))
            }),
        )
    }

    /// Create a session with injected transport and codec factories.
    ///
    /// This is the seam the lifecycle tests use; it also lets callers bring
    /// their own wire protocol.
    pub fn with_parts(
        config: ClientConfig,
        transport_factory: TransportFactory,
        codec_factory: CodecFactory,
    ) -> Self {
        Self {
            inner: Arc::new(SessionInner {
                config,
                state: Mutex::new(NetworkState::Closed),
                observers: StateObservers::new(),
                dispatcher: Dispatcher::new(),
                transport_factory,
                codec_factory,
                transport: Mutex::new(None),
                codec: Mutex::new(None),
                next_request_id: Mutex::new(1),
                gate: ConnectGate::new(),
                on_ready: Mutex::new(None),
                disposed: AtomicBool::new(false),
            }),
        }
    }

    /// Register an observer for every subsequent state transition.
    ///
    /// Observers run synchronously, in registration order, on the thread
    /// that produced the transition.
    pub fn on_state_change(&self, observer: impl Fn(NetworkState) + Send + Sync + 'static) {
        self.inner.observers.add(Arc::new(observer));
    }

    /// Open the transport and block until it reports opened or the
    /// configured timeout elapses.
    ///
    /// `on_ready` is invoked on the transport context, before this call
    /// returns, when the connection opens. If the deadline expires while
    /// the state is still neither connected nor errored, the session moves
    /// to [`NetworkState::Timeout`] and tears down. Returns the state
    /// observed on exit. Single-shot: a second call is a logged no-op.
    pub fn initialize(
        &self,
        host: &str,
        port: u16,
        on_ready: Option<ReadyCallback>,
    ) -> NetworkState {
        {
            let state = self.inner.state.lock();
            if *state != NetworkState::Closed {
                warn!(state = %*state, "initialize called more than once");
                return *state;
            }
        }
        *self.inner.on_ready.lock() = on_ready;
        self.inner.set_state(NetworkState::Connecting);

        let transport = (self.inner.transport_factory)(host, port);
        *self.inner.transport.lock() = Some(transport.clone());

        let events: Arc<dyn TransportEvents> = self.inner.clone();
        if let Err(err) = transport.open(events) {
            error!(error = %err, host, port, "transport open failed");
            self.inner.set_state(NetworkState::Error);
            self.inner.dispose();
            return NetworkState::Error;
        }

        if !self.inner.gate.wait(self.inner.config.connect_timeout()) {
            let still_pending = {
                let state = self.inner.state.lock();
                *state != NetworkState::Connected && *state != NetworkState::Error
            };
            if still_pending {
                warn!(host, port, "connect deadline expired");
                self.inner.set_state(NetworkState::Timeout);
                self.inner.dispose();
            }
        }
        self.inner.current_state()
    }

    /// Perform the protocol handshake over the connected session.
    ///
    /// `on_handshake_ack` fires once, on the transport context, with the
    /// server's acknowledgement payload. Any codec failure is logged and
    /// converted to `false`; nothing propagates to the caller.
    pub fn connect(
        &self,
        identity: Option<Value>,
        on_handshake_ack: Option<HandshakeCallback>,
    ) -> bool {
        // The codec exists exactly while the session is connected.
        let Some(codec) = self.inner.codec() else {
            warn!("connect called while not connected");
            return false;
        };
        match codec.start(identity, on_handshake_ack) {
            Ok(()) => true,
            Err(err) => {
                error!(error = %err, "handshake failed");
                false
            }
        }
    }

    /// Send a correlated request; `on_reply` fires at most once, on the
    /// transport context, with the reply payload.
    ///
    /// Ids are allocated from a per-session counter starting at 1. No
    /// ordering is guaranteed across routes. If the session is torn down
    /// while the request is in flight, `on_reply` is never invoked.
    pub fn request(
        &self,
        route: &str,
        payload: Value,
        on_reply: impl FnOnce(Value) + Send + 'static,
    ) {
        let Some(codec) = self.inner.codec() else {
            warn!(route, "request dropped; session not connected");
            return;
        };
        let id = self.inner.allocate_request_id();
        self.inner.dispatcher.register_reply(id, Box::new(on_reply));
        if let Err(err) = codec.send_request(route, id, payload) {
            error!(error = %err, route, id, "request send failed");
            self.inner.dispatcher.discard_reply(id);
        }
    }

    /// Send a fire-and-forget notification; no reply is expected.
    pub fn notify(&self, route: &str, payload: Value) {
        let Some(codec) = self.inner.codec() else {
            warn!(route, "notify dropped; session not connected");
            return;
        };
        if let Err(err) = codec.send_notify(route, payload) {
            error!(error = %err, route, "notify send failed");
        }
    }

    /// Register `handler` for pushes on `event`; fires every time a
    /// matching push arrives. Registering the same event again replaces
    /// the prior handler.
    pub fn on_push(&self, event: &str, handler: impl Fn(Value) + Send + Sync + 'static) {
        self.inner.dispatcher.register_push(event, Arc::new(handler));
    }

    /// Tear the session down and move to [`NetworkState::Disconnected`],
    /// regardless of the current state.
    pub fn disconnect(&self) {
        self.inner.disconnect();
    }
}

impl Drop for Session {
    fn drop(&mut self) {
        self.inner.dispose();
    }
}

impl SessionInner {
    fn current_state(&self) -> NetworkState {
        *self.state.lock()
    }

    /// Record the transition, then broadcast it with no lock held.
    fn set_state(&self, state: NetworkState) {
        {
            *self.state.lock() = state;
        }
        self.observers.broadcast(state);
    }

    fn codec(&self) -> Option<Arc<dyn ProtocolCodec>> {
        self.codec.lock().clone()
    }

    fn allocate_request_id(&self) -> u32 {
        let mut next = self.next_request_id.lock();
        let id = *next;
        *next += 1;
        id
    }

    fn disconnect(&self) {
        self.dispose();
        self.set_state(NetworkState::Disconnected);
    }

    /// Idempotent teardown; the release body runs at most once however
    /// many triggers race here.
    fn dispose(&self) {
        if self
            .disposed
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            return;
        }
        debug!("tearing down session");

        if let Some(codec) = self.codec.lock().take() {
            codec.close();
        }
        self.dispatcher.release_all();
        if let Some(transport) = self.transport.lock().take() {
            transport.detach();
            // The transport logs (and swallows) any error raised while
            // closing.
            transport.close();
        }
    }
}

impl TransportEvents for SessionInner {
    fn on_opened(&self) {
        if self.disposed.load(Ordering::SeqCst) {
            debug!("ignoring opened notification after teardown");
            return;
        }
        let Some(transport) = self.transport.lock().clone() else {
            return;
        };
        let sink: Arc<dyn ByteSink> = Arc::new(TransportSink(transport));
        *self.codec.lock() = Some((self.codec_factory)(sink));

        self.set_state(NetworkState::Connected);
        if let Some(on_ready) = self.on_ready.lock().take() {
            on_ready();
        }
        self.gate.open();
    }

    fn on_data(&self, bytes: &[u8]) {
        if self.current_state() != NetworkState::Connected {
            return;
        }
        if bytes.is_empty() {
            // A zero-length read mirrors a half-closed connection.
            debug!("zero-length read; disconnecting");
            self.disconnect();
            return;
        }
        let Some(codec) = self.codec() else { return };
        for message in codec.process_bytes(bytes) {
            self.dispatcher.dispatch(message);
        }
    }

    fn on_closed(&self, reason: &str) {
        warn!(reason, "transport closed");
        if self.current_state() != NetworkState::Timeout {
            self.set_state(NetworkState::Closed);
        }
        self.dispose();
    }

    fn on_error(&self, reason: &str) {
        error!(reason, "transport error");
        if self.current_state() != NetworkState::Timeout {
            self.set_state(NetworkState::Error);
        }
        self.dispose();
    }
}
