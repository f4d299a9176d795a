//! In-flight computation table for request coalescing.
//!
//! The first caller for a key registers a flight and becomes its leader; later
//! callers subscribe to the flight's watch channel. The leader publishes exactly
//! one terminal state. If the leader's future is dropped first, its guard
//! publishes [`FlightState::Abandoned`] so a waiter can take over.

use std::any::Any;
use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::Mutex;
use tokio::sync::watch;

/// Type-erased shared outcome. Callers of one key agree on the concrete types.
pub(crate) type Shared = Arc<dyn Any + Send + Sync>;

#[derive(Clone)]
pub(crate) enum FlightState {
    Running,
    Done(Result<Shared, Shared>),
    Abandoned,
}

pub(crate) enum Flight<'a> {
    Leader(FlightGuard<'a>),
    Follower(watch::Receiver<FlightState>),
}

#[derive(Default)]
pub(crate) struct FlightTable {
    flights: Mutex<HashMap<String, watch::Receiver<FlightState>>>,
}

impl FlightTable {
    /// Leads a new flight for `key`, or follows the one already registered.
    pub fn join(&self, key: &str) -> Flight<'_> {
        let mut flights = self.flights.lock();
        if let Some(rx) = flights.get(key) {
            return Flight::Follower(rx.clone());
        }
        let (tx, rx) = watch::channel(FlightState::Running);
        flights.insert(key.to_string(), rx);
        Flight::Leader(FlightGuard {
            table: self,
            key: key.to_string(),
            tx: Some(tx),
        })
    }

    pub fn in_flight(&self) -> usize {
        self.flights.lock().len()
    }

    fn remove(&self, key: &str) {
        self.flights.lock().remove(key);
    }
}

/// Held by the leader; deregisters the flight however the leader exits.
pub(crate) struct FlightGuard<'a> {
    table: &'a FlightTable,
    key: String,
    tx: Option<watch::Sender<FlightState>>,
}

impl FlightGuard<'_> {
    pub fn complete(mut self, outcome: Result<Shared, Shared>) {
        if let Some(tx) = self.tx.take() {
            self.table.remove(&self.key);
            tx.send_replace(FlightState::Done(outcome));
        }
    }
}

impl Drop for FlightGuard<'_> {
    fn drop(&mut self) {
        if let Some(tx) = self.tx.take() {
            self.table.remove(&self.key);
            tx.send_replace(FlightState::Abandoned);
        }
    }
}

/// Waits for the flight to leave `Running`.
pub(crate) async fn wait(mut rx: watch::Receiver<FlightState>) -> FlightState {
    let settled = rx
        .wait_for(|state| !matches!(state, FlightState::Running))
        .await
        .map(|state| state.clone());
    settled.unwrap_or(FlightState::Abandoned)
}
