//! Client configuration.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Configuration for one session, fixed at construction.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ClientConfig {
    /// How long `initialize` blocks waiting for the transport to open,
    /// in milliseconds (default `8000`).
    pub connect_timeout_ms: u64,
    /// Poll interval of the websocket reader thread in milliseconds
    /// (default `25`). Bounds how long an outbound send can wait for the
    /// socket lock.
    pub read_poll_interval_ms: u64,
}

impl ClientConfig {
    /// Connect timeout as a [`Duration`].
    pub fn connect_timeout(&self) -> Duration {
        Duration::from_millis(self.connect_timeout_ms)
    }

    /// Reader poll interval as a [`Duration`].
    pub fn read_poll_interval(&self) -> Duration {
        Duration::from_millis(self.read_poll_interval_ms)
    }
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            connect_timeout_ms: 8000,
            read_poll_interval_ms: 25,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_connect_timeout() {
        let cfg = ClientConfig::default();
        assert_eq!(cfg.connect_timeout_ms, 8000);
        assert_eq!(cfg.connect_timeout(), Duration::from_secs(8));
    }

    #[test]
    fn default_read_poll_interval() {
        let cfg = ClientConfig::default();
        assert_eq!(cfg.read_poll_interval_ms, 25);
        assert_eq!(cfg.read_poll_interval(), Duration::from_millis(25));
    }

    #[test]
    fn serde_roundtrip() {
        let cfg = ClientConfig {
            connect_timeout_ms: 50,
            read_poll_interval_ms: 5,
        };
        let json = serde_json::to_string(&cfg).unwrap();
        let back: ClientConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(back.connect_timeout_ms, 50);
        assert_eq!(back.read_poll_interval_ms, 5);
    }

    #[test]
    fn deserialize_from_json_string() {
        let json = r#"{"connect_timeout_ms":100,"read_poll_interval_ms":10}"#;
        let cfg: ClientConfig = serde_json::from_str(json).unwrap();
        assert_eq!(cfg.connect_timeout_ms, 100);
        assert_eq!(cfg.read_poll_interval_ms, 10);
    }
}
