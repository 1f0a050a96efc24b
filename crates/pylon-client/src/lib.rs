//! # pylon-client
//!
//! Client-side session manager for request/response-plus-push RPC over a
//! persistent duplex connection.
//!
//! - [`Session`]: connection lifecycle state machine, blocking connect with
//!   deadline, request-id allocation, idempotent teardown
//! - [`dispatch::Dispatcher`]: reply correlation + push dispatch
//! - [`transport::Transport`] / [`transport::WsTransport`]: the byte-stream
//!   boundary and the stock websocket adapter
//!
//! ```no_run
//! use pylon_client::{ClientConfig, Session};
//! use serde_json::json;
//!
//! let session = Session::new(ClientConfig::default());
//! session.on_state_change(|state| println!("network: {state}"));
//! let state = session.initialize("127.0.0.1", 7002, None);
//! if state == pylon_client::NetworkState::Connected {
//!     let _ = session.connect(None, None);
//!     session.request("auth.login", json!({"uid": 1}), |reply| {
//!         println!("reply: {reply}");
//!     });
//! }
//! ```

#![deny(unsafe_code)]

pub mod config;
pub mod dispatch;
pub mod errors;
pub mod gate;
pub mod session;
pub mod state;
pub mod transport;

pub use config::ClientConfig;
pub use errors::TransportError;
pub use pylon_wire::HandshakeCallback;
pub use session::{CodecFactory, ReadyCallback, Session, TransportFactory};
pub use state::NetworkState;
