//! Per-key request coalescing.
//!
//! The first caller for a key spawns the work; later callers attach to the
//! same shared future until it resolves. Work runs on its own task so a
//! caller going away never tears down a flight others are waiting on. When
//! every waiter has gone the flight is signalled through its [`CancelSignal`],
//! unless the registry was built with [`SingleFlight::detached`].

use futures::FutureExt;
use futures::future::{BoxFuture, Shared};
use std::collections::HashMap;
use std::future::Future;
use std::hash::Hash;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use thiserror::Error;
use tokio::sync::watch;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("In-flight work aborted: {0}")]
pub struct FlightError(String);

type FlightFuture<V> = Shared<BoxFuture<'static, Result<V, FlightError>>>;

struct FlightState {
    waiters: AtomicUsize,
    cancel: watch::Sender<bool>,
    cancellable: bool,
}

impl FlightState {
    fn is_cancelled(&self) -> bool {
        *self.cancel.borrow()
    }

    /// Registers another waiter. Fails once a cancellable flight has lost
    /// its last waiter, even if the cancel flag is not yet visible.
    fn try_join(&self) -> bool {
        self.waiters
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |n| {
                (n > 0 || !self.cancellable).then_some(n + 1)
            })
            .is_ok()
    }
}

struct Flight<V> {
    id: u64,
    future: FlightFuture<V>,
    state: Arc<FlightState>,
}

/// Resolves once every caller waiting on the flight has gone away.
pub struct CancelSignal {
    rx: watch::Receiver<bool>,
}

impl CancelSignal {
    pub async fn cancelled(&mut self) {
        let closed = self.rx.wait_for(|cancelled| *cancelled).await.is_err();
        if closed {
            // Sender dropped without cancelling: the flight finished normally.
            std::future::pending::<()>().await;
        }
    }

    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        *self.rx.borrow()
    }
}

struct WaiterGuard {
    state: Arc<FlightState>,
}

impl Drop for WaiterGuard {
    fn drop(&mut self) {
        if self.state.waiters.fetch_sub(1, Ordering::AcqRel) == 1 && self.state.cancellable {
            self.state.cancel.send_replace(true);
        }
    }
}

type Registry<K, V> = Arc<Mutex<HashMap<K, Flight<V>>>>;

/// Registry of in-progress work keyed by `K`.
pub struct SingleFlight<K, V> {
    flights: Registry<K, V>,
    next_id: AtomicU64,
    cancel_when_abandoned: bool,
}

impl<K, V> Default for SingleFlight<K, V> {
    fn default() -> Self {
        Self {
            flights: Arc::new(Mutex::new(HashMap::new())),
            next_id: AtomicU64::new(0),
            cancel_when_abandoned: true,
        }
    }
}

impl<K, V> SingleFlight<K, V>
where
    K: Eq + Hash + Clone + Send + 'static,
    V: Clone + Send + Sync + 'static,
{
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// A registry whose flights always run to completion and stay joinable
    /// after their last waiter leaves. For work that ignores its signal.
    #[must_use]
    pub fn detached() -> Self {
        Self {
            cancel_when_abandoned: false,
            ..Self::default()
        }
    }

    /// Runs `work` for `key` unless a flight for it is already running, in
    /// which case this call waits for that flight instead.
    ///
    /// Returns the value and whether this call started the flight.
    pub async fn run<F, Fut>(&self, key: K, work: F) -> Result<(V, bool), FlightError>
    where
        F: FnOnce(CancelSignal) -> Fut,
        Fut: Future<Output = V> + Send + 'static,
    {
        let (future, guard, leader) = {
            let mut flights = self.flights.lock().unwrap_or_else(PoisonError::into_inner);

            let existing = flights
                .get(&key)
                .filter(|flight| !flight.state.is_cancelled() && flight.state.try_join())
                .map(|flight| (flight.future.clone(), Arc::clone(&flight.state)));

            if let Some((future, state)) = existing {
                (future, WaiterGuard { state }, false)
            } else {
                let id = self.next_id.fetch_add(1, Ordering::Relaxed);
                let (cancel, rx) = watch::channel(false);
                let state = Arc::new(FlightState {
                    waiters: AtomicUsize::new(1),
                    cancel,
                    cancellable: self.cancel_when_abandoned,
                });

                let work = work(CancelSignal { rx });
                let registry = Arc::clone(&self.flights);
                let cleanup_key = key.clone();
                let handle = tokio::spawn(async move {
                    let value = work.await;
                    let mut flights = registry.lock().unwrap_or_else(PoisonError::into_inner);
                    if flights.get(&cleanup_key).is_some_and(|f| f.id == id) {
                        flights.remove(&cleanup_key);
                    }
                    value
                });

                let future = handle
                    .map(|joined| joined.map_err(|e| FlightError(e.to_string())))
                    .boxed()
                    .shared();

                flights.insert(
                    key,
                    Flight {
                        id,
                        future: future.clone(),
                        state: Arc::clone(&state),
                    },
                );
                (future, WaiterGuard { state }, true)
            }
        };

        let value = future.await;
        drop(guard);
        value.map(|v| (v, leader))
    }

    /// Number of keys with work currently in progress.
    #[must_use]
    pub fn in_flight(&self) -> usize {
        self.flights
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }
}
