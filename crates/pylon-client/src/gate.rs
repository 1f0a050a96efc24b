//! One-shot binary signal with a deadline.
//!
//! The single synchronization point between the caller thread and the
//! transport's callback context at startup: `initialize` waits here until
//! the transport reports opened or the deadline expires.

use std::time::{Duration, Instant};

use parking_lot::{Condvar, Mutex};

/// Settable-once gate the connecting thread blocks on.
///
/// The waiter observes exactly one of {signaled, deadline-expired}. Opening
/// an already-open gate is a no-op; a waiter arriving after the gate opened
/// returns immediately.
#[derive(Default)]
pub struct ConnectGate {
    opened: Mutex<bool>,
    condvar: Condvar,
}

impl ConnectGate {
    /// Create a closed gate.
    pub fn new() -> Self {
        Self::default()
    }

    /// Open the gate, releasing any current or future waiter.
    pub fn open(&self) {
        let mut opened = self.opened.lock();
        *opened = true;
        let _ = self.condvar.notify_all();
    }

    /// Block until the gate opens or `timeout` elapses.
    ///
    /// Returns `true` if the gate was opened, `false` on deadline expiry.
    pub fn wait(&self, timeout: Duration) -> bool {
        let deadline = Instant::now() + timeout;
        let mut opened = self.opened.lock();
        while !*opened {
            if self.condvar.wait_until(&mut opened, deadline).timed_out() {
                break;
            }
        }
        *opened
    }
}
