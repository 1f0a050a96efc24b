//! Minimal login flow against a running server.
//!
//! ```sh
//! cargo run --example login -- 127.0.0.1 7002
//! ```

use std::sync::Arc;
use std::time::Duration;

use pylon_client::{ClientConfig, NetworkState, Session};
use serde_json::json;

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "pylon_client=debug,pylon_wire=debug".into()),
        )
        .init();

    let mut args = std::env::args().skip(1);
    let host = args.next().unwrap_or_else(|| "127.0.0.1".into());
    let port: u16 = args.next().unwrap_or_else(|| "7002".into()).parse()?;

    let session = Arc::new(Session::new(ClientConfig::default()));
    session.on_state_change(|state| println!("network state: {state}"));
    session.on_push("TEST_PUSH", |payload| println!("push: {payload}"));

    let handshake_session = session.clone();
    let state = session.initialize(
        &host,
        port,
        Some(Box::new(move || {
            let reply_session = handshake_session.clone();
            let ok = handshake_session.connect(
                None,
                Some(Box::new(move |ack| {
                    println!("handshake ack: {ack}");
                    reply_session.request("auth.login", json!({"uid": 111}), |reply| {
                        println!("login reply: {reply}");
                    });
                })),
            );
            if !ok {
                eprintln!("handshake could not be started");
            }
        })),
    );

    if state != NetworkState::Connected {
        anyhow::bail!("could not connect: {state}");
    }

    // Let replies and pushes arrive for a while, then hang up.
    std::thread::sleep(Duration::from_secs(10));
    session.disconnect();
    Ok(())
}
