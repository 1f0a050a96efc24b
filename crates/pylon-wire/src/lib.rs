//! # pylon-wire
//!
//! Wire-level message model and codec boundary for the Pylon client.
//!
//! - [`InboundMessage`] / [`MessageKind`]: the decoded message shape handed
//!   from the codec to the session's dispatcher.
//! - [`ProtocolCodec`] / [`ByteSink`]: the boundary the session drives; any
//!   handshake-and-framing implementation plugs in here.
//! - [`Frame`] + [`JsonCodec`]: the stock line-delimited JSON protocol.

#![deny(unsafe_code)]

mod codec;
mod errors;
mod frames;
mod json;
mod message;

pub use codec::{ByteSink, HandshakeCallback, ProtocolCodec};
pub use errors::WireError;
pub use frames::Frame;
pub use json::JsonCodec;
pub use message::{InboundMessage, MessageKind};
