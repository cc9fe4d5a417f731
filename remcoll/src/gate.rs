//! Connection gate
//!
//! Lazily establishes one store connection and shares it with every
//! collection built against the gate.
//!
//! # Lifecycle
//!
//! ```text
//! Uninitialized ──connect()──▶ Connecting ──ok──▶ Connected
//!       ▲                          │                  │
//!       └──────────failed──────────┘                  │
//!                                                     ▼
//!   (any state) ────────────dispose()──────────▶ Disposed
//! ```
//!
//! Callers that arrive while an attempt is in flight await that same attempt
//! and observe its outcome, success or failure. After a failure the gate is
//! back to `Uninitialized` and the next `connect()` starts a new attempt.

use futures::future::{BoxFuture, FutureExt, Shared};
use parking_lot::Mutex;
use std::fmt;
use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tracing::{debug, warn};

use crate::error::CollectionError;
use crate::io::{ListStore, StoreError};

type Attempt<S> = Shared<BoxFuture<'static, Result<Arc<S>, StoreError>>>;

type Factory<S> = Box<dyn Fn() -> BoxFuture<'static, Result<S, StoreError>> + Send + Sync>;

/// Observable state of a gate
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Uninitialized,
    Connecting,
    Connected,
    Disposed,
}

enum GateState<S> {
    Uninitialized,
    Connecting { attempt: u64, future: Attempt<S> },
    Connected(Arc<S>),
    Disposed,
}

/// One-time, shared connection establishment
///
/// Share a gate between collections with `Arc<ConnectionGate<S>>`. The
/// internal lock only guards state transitions; it is never held while the
/// connection attempt is awaited.
pub struct ConnectionGate<S> {
    factory: Factory<S>,
    state: Mutex<GateState<S>>,
    attempts: AtomicU64,
}

impl<S: ListStore + 'static> ConnectionGate<S> {
    /// Create a gate that calls `factory` to connect
    pub fn new<F, Fut>(factory: F) -> Self
    where
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<S, StoreError>> + Send + 'static,
    {
        Self {
            factory: Box::new(move || factory().boxed()),
            state: Mutex::new(GateState::Uninitialized),
            attempts: AtomicU64::new(0),
        }
    }

    /// Create a gate around an already established store
    pub fn connected(store: S) -> Self {
        let gate = Self::new(|| async {
            Err(StoreError::Connect(
                "gate was created from an established store".to_string(),
            ))
        });
        *gate.state.lock() = GateState::Connected(Arc::new(store));
        gate
    }

    /// Return the shared store, connecting on first use
    ///
    /// # Errors
    /// - `UseAfterDispose` once the gate is disposed
    /// - `Connection` when the attempt this call joined failed
    pub async fn connect(&self) -> Result<Arc<S>, CollectionError> {
        let (attempt, future) = {
            let mut state = self.state.lock();
            if matches!(*state, GateState::Uninitialized) {
                let attempt = self.attempts.fetch_add(1, Ordering::Relaxed) + 1;
                debug!(attempt, "gate.connect: starting connection attempt");
                let future = (self.factory)()
                    .map(|result| result.map(Arc::new))
                    .boxed()
                    .shared();
                *state = GateState::Connecting { attempt, future };
            }
            match &*state {
                GateState::Connected(store) => return Ok(Arc::clone(store)),
                GateState::Connecting { attempt, future } => (*attempt, future.clone()),
                GateState::Uninitialized | GateState::Disposed => {
                    return Err(CollectionError::UseAfterDispose("connection gate"))
                }
            }
        };

        let outcome = future.await;

        let mut state = self.state.lock();
        let current = match &*state {
            GateState::Disposed => {
                return Err(CollectionError::UseAfterDispose("connection gate"))
            }
            GateState::Connecting { attempt, .. } => Some(*attempt),
            _ => None,
        };
        // Only the attempt we joined may settle the state
        if current == Some(attempt) {
            *state = match &outcome {
                Ok(store) => {
                    debug!(attempt, "gate.connect: connected");
                    GateState::Connected(Arc::clone(store))
                }
                Err(e) => {
                    warn!(attempt, error = %e, "gate.connect: connection attempt failed");
                    GateState::Uninitialized
                }
            };
        }
        outcome.map_err(CollectionError::Connection)
    }

    /// Tear down the connection; the gate is unusable afterwards
    pub fn dispose(&self) {
        let previous = std::mem::replace(&mut *self.state.lock(), GateState::Disposed);
        if !matches!(previous, GateState::Disposed) {
            debug!("gate.dispose: connection released");
        }
    }

    #[must_use]
    pub fn state(&self) -> ConnectionState {
        match &*self.state.lock() {
            GateState::Uninitialized => ConnectionState::Uninitialized,
            GateState::Connecting { .. } => ConnectionState::Connecting,
            GateState::Connected(_) => ConnectionState::Connected,
            GateState::Disposed => ConnectionState::Disposed,
        }
    }

    /// Number of connection attempts started so far
    #[must_use]
    pub fn attempts(&self) -> u64 {
        self.attempts.load(Ordering::Relaxed)
    }
}

impl<S> fmt::Debug for ConnectionGate<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = match &*self.state.lock() {
            GateState::Uninitialized => "Uninitialized",
            GateState::Connecting { .. } => "Connecting",
            GateState::Connected(_) => "Connected",
            GateState::Disposed => "Disposed",
        };
        f.debug_struct("ConnectionGate")
            .field("state", &state)
            .field("attempts", &self.attempts.load(Ordering::Relaxed))
            .finish_non_exhaustive()
    }
}
