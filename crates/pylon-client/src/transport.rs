//! Transport boundary and the stock websocket adapter.
//!
//! The session drives any duplex byte-stream through [`Transport`] and
//! receives its notifications through [`TransportEvents`]. [`WsTransport`]
//! is the production adapter: a `tungstenite` client whose reader thread is
//! the transport execution context all inbound callbacks run on.

use std::net::TcpStream;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;
use std::time::Duration;

use parking_lot::Mutex;
use tracing::{debug, warn};
use tungstenite::stream::MaybeTlsStream;
use tungstenite::{Error as WsError, Message, WebSocket};

use crate::errors::TransportError;

/// Notifications delivered on the transport's own execution context.
pub trait TransportEvents: Send + Sync {
    /// The connection is open and writable.
    fn on_opened(&self);
    /// A chunk of payload bytes arrived. May be empty (half-closed peer).
    fn on_data(&self, bytes: &[u8]);
    /// The peer or the stack closed the connection.
    fn on_closed(&self, reason: &str);
    /// The connection failed.
    fn on_error(&self, reason: &str);
}

/// A duplex byte-stream connection.
///
/// `open` attaches the event sink and starts connecting; all four
/// notifications fire on the transport's context, never the caller's.
/// `detach` drops the event sink so nothing fires after teardown.
pub trait Transport: Send + Sync {
    /// Begin connecting and deliver notifications to `events`.
    fn open(&self, events: Arc<dyn TransportEvents>) -> Result<(), TransportError>;
    /// Write payload bytes to the peer.
    fn send(&self, bytes: &[u8]) -> Result<(), TransportError>;
    /// Close the connection. Errors while closing are logged, not surfaced.
    fn close(&self);
    /// Detach the event sink; subsequent notifications are dropped.
    fn detach(&self);
}

type WsSocket = WebSocket<MaybeTlsStream<TcpStream>>;

struct Shared {
    url: String,
    poll: Duration,
    socket: Mutex<Option<WsSocket>>,
    events: Mutex<Option<Arc<dyn TransportEvents>>>,
    closing: AtomicBool,
}

impl Shared {
    fn events(&self) -> Option<Arc<dyn TransportEvents>> {
        self.events.lock().clone()
    }
}

/// Websocket implementation of [`Transport`].
///
/// `open` spawns the reader thread, which connects, reports opened, and
/// then pumps frames: Binary/Text payloads become `on_data`, a close frame
/// or closed stream becomes `on_closed`, failures become `on_error`. The
/// socket sits behind a mutex with a read timeout so writers are never
/// blocked longer than one poll interval.
pub struct WsTransport {
    shared: Arc<Shared>,
    started: AtomicBool,
}

impl WsTransport {
    /// Create a transport for `url` (e.g. `ws://127.0.0.1:7002`).
    pub fn new(url: impl Into<String>, poll: Duration) -> Self {
        Self {
            shared: Arc::new(Shared {
                url: url.into(),
                poll,
                socket: Mutex::new(None),
                events: Mutex::new(None),
                closing: AtomicBool::new(false),
            }),
            started: AtomicBool::new(false),
        }
    }

    fn run_reader(shared: &Arc<Shared>) {
        let (socket, _response) = match tungstenite::connect(shared.url.as_str()) {
            Ok(pair) => pair,
            Err(err) => {
                if let Some(events) = shared.events() {
                    events.on_error(&err.to_string());
                }
                return;
            }
        };
        if let MaybeTlsStream::Plain(stream) = socket.get_ref() {
            if let Err(err) = stream.set_read_timeout(Some(shared.poll)) {
                warn!(error = %err, "failed to set read timeout");
            }
        }
        *shared.socket.lock() = Some(socket);

        if let Some(events) = shared.events() {
            events.on_opened();
        }

        loop {
            if shared.closing.load(Ordering::SeqCst) {
                break;
            }
            let read = {
                let mut guard = shared.socket.lock();
                guard.as_mut().map(WebSocket::read)
            };
            let Some(result) = read else { break };

            match result {
                Ok(Message::Binary(data)) => {
                    if let Some(events) = shared.events() {
                        events.on_data(&data);
                    }
                }
                Ok(Message::Text(text)) => {
                    if let Some(events) = shared.events() {
                        events.on_data(text.as_bytes());
                    }
                }
                Ok(Message::Close(_)) => {
                    if let Some(events) = shared.events() {
                        events.on_closed("close frame received");
                    }
                    break;
                }
                // Ping/Pong are answered by tungstenite itself.
                Ok(Message::Ping(_) | Message::Pong(_) | Message::Frame(_)) => {}
                Err(WsError::Io(err))
                    if matches!(
                        err.kind(),
                        std::io::ErrorKind::WouldBlock | std::io::ErrorKind::TimedOut
                    ) =>
                {
                    // Read timeout tick; give writers a turn at the lock.
                    thread::sleep(Duration::from_millis(1));
                }
                Err(WsError::ConnectionClosed | WsError::AlreadyClosed) => {
                    if let Some(events) = shared.events() {
                        events.on_closed("connection closed");
                    }
                    break;
                }
                Err(err) => {
                    if !shared.closing.load(Ordering::SeqCst) {
                        if let Some(events) = shared.events() {
                            events.on_error(&err.to_string());
                        }
                    }
                    break;
                }
            }
        }
        debug!("websocket reader finished");
    }
}

impl Transport for WsTransport {
    fn open(&self, events: Arc<dyn TransportEvents>) -> Result<(), TransportError> {
        if self.started.swap(true, Ordering::SeqCst) {
            return Err(TransportError::Connect("transport already opened".into()));
        }
        *self.shared.events.lock() = Some(events);

        let shared = self.shared.clone();
        let _ = thread::Builder::new()
            .name("pylon-ws-reader".into())
            .spawn(move || Self::run_reader(&shared))
            .map_err(|err| TransportError::Connect(err.to_string()))?;
        Ok(())
    }

    fn send(&self, bytes: &[u8]) -> Result<(), TransportError> {
        let mut guard = self.shared.socket.lock();
        let socket = guard.as_mut().ok_or(TransportError::NotOpen)?;
        socket
            .send(Message::binary(bytes.to_vec()))
            .map_err(|err| TransportError::Send(err.to_string()))
    }

    fn close(&self) {
        self.shared.closing.store(true, Ordering::SeqCst);
        let mut guard = self.shared.socket.lock();
        if let Some(socket) = guard.as_mut() {
            // Failures here are expected when the peer vanished first.
            if let Err(err) = socket.close(None) {
                debug!(error = %err, "error while closing websocket");
            }
        }
    }

    fn detach(&self) {
        let _ = self.shared.events.lock().take();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct NullEvents;

    impl TransportEvents for NullEvents {
        fn on_opened(&self) {}
        fn on_data(&self, _bytes: &[u8]) {}
        fn on_closed(&self, _reason: &str) {}
        fn on_error(&self, _reason: &str) {}
    }

    #[test]
    fn send_before_open_is_not_open() {
        let transport = WsTransport::new("ws://127.0.0.1:1", Duration::from_millis(10));
        assert!(matches!(transport.send(b"x"), Err(TransportError::NotOpen)));
    }

    #[test]
    fn double_open_is_rejected() {
        let transport = WsTransport::new("ws://127.0.0.1:1", Duration::from_millis(10));
        transport.open(Arc::new(NullEvents)).unwrap();
        assert!(matches!(
            transport.open(Arc::new(NullEvents)),
            Err(TransportError::Connect(_))
        ));
        transport.close();
    }

    #[test]
    fn close_before_open_is_a_noop() {
        let transport = WsTransport::new("ws://127.0.0.1:1", Duration::from_millis(10));
        transport.close();
        transport.detach();
    }
}
