//! Connection lifecycle states and the synchronous observer multicast.

use std::fmt;
use std::sync::Arc;

use parking_lot::Mutex;

/// Current phase of the session's connection lifecycle.
///
/// Exactly one value is current at any instant. Transitions follow the
/// session state machine: `Closed → Connecting → Connected`, then one of
/// `Closed` / `Error` (transport-initiated), `Disconnected` (explicit), or
/// `Timeout` (the connect deadline expired first). `Timeout` pre-empts
/// later transport notifications and is never overwritten by them.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum NetworkState {
    /// Initial state; also reached when the transport closes the connection.
    Closed,
    /// Transport open requested; waiting for it to report opened.
    Connecting,
    /// Transport open; codec constructed; session usable.
    Connected,
    /// Explicitly disconnected by the application.
    Disconnected,
    /// The connect deadline expired before the transport opened.
    Timeout,
    /// The transport reported a failure.
    Error,
}

impl fmt::Display for NetworkState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Closed => "closed",
            Self::Connecting => "connecting",
            Self::Connected => "connected",
            Self::Disconnected => "disconnected",
            Self::Timeout => "timeout",
            Self::Error => "error",
        };
        f.write_str(name)
    }
}

/// Observer invoked synchronously on every state transition.
pub type StateObserver = Arc<dyn Fn(NetworkState) + Send + Sync>;

/// Explicit multicast list of state observers.
///
/// Observers run in registration order, on the thread that produced the
/// transition. The list is snapshotted before invocation so an observer may
/// register further observers without deadlocking.
#[derive(Default)]
pub struct StateObservers {
    observers: Mutex<Vec<StateObserver>>,
}

impl StateObservers {
    /// Create an empty list.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append an observer; it will see every subsequent transition.
    pub fn add(&self, observer: StateObserver) {
        self.observers.lock().push(observer);
    }

    /// Invoke every observer with `state`, in registration order.
    pub fn broadcast(&self, state: NetworkState) {
        let snapshot: Vec<StateObserver> = self.observers.lock().clone();
        for observer in snapshot {
            observer(state);
        }
    }
}
