//! Per-key in-flight request registry.
//!
//! The first request for a key becomes the leader and executes the real
//! query; concurrent duplicates attach as waiters and receive the leader's
//! result. An entry lives only while its leader runs — if the leader is
//! dropped mid-flight (client disconnect), the entry is removed and the
//! waiters see a closed channel rather than hanging forever.

use hashbrown::HashMap;
use parking_lot::Mutex;
use tokio::sync::watch;
use vista_cache::CapturedResponse;

type Slot = watch::Receiver<Option<CapturedResponse>>;

/// Registry of requests currently in flight, keyed by cache key.
#[derive(Default)]
pub struct Flights {
    inner: Mutex<HashMap<String, Slot>>,
}

/// Where a joining request landed.
pub enum FlightSlot<'a> {
    /// This request executes the query and broadcasts the result.
    Leader(FlightLeader<'a>),
    /// This request waits for an identical in-flight one.
    Waiter(Slot),
}

/// Leader handle; completes or, on drop, vacates the key.
pub struct FlightLeader<'a> {
    flights: &'a Flights,
    key: String,
    tx: Option<watch::Sender<Option<CapturedResponse>>>,
}

impl Flights {
    pub fn new() -> Self {
        Self::default()
    }

    /// Join the flight for `key`: leader if none is running, waiter else.
    pub fn join(&self, key: &str) -> FlightSlot<'_> {
        let mut inner = self.inner.lock();
        if let Some(rx) = inner.get(key) {
            return FlightSlot::Waiter(rx.clone());
        }
        let (tx, rx) = watch::channel(None);
        inner.insert(key.to_string(), rx);
        FlightSlot::Leader(FlightLeader {
            flights: self,
            key: key.to_string(),
            tx: Some(tx),
        })
    }

    /// Number of keys currently in flight.
    pub fn len(&self) -> usize {
        self.inner.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.lock().is_empty()
    }

    fn vacate(&self, key: &str) {
        self.inner.lock().remove(key);
    }
}

impl FlightLeader<'_> {
    /// Broadcast the result to every waiter and vacate the key.
    pub fn complete(mut self, value: CapturedResponse) {
        self.flights.vacate(&self.key);
        if let Some(tx) = self.tx.take() {
            let _ = tx.send(Some(value));
        }
    }
}

impl Drop for FlightLeader<'_> {
    fn drop(&mut self) {
        if self.tx.is_some() {
            self.flights.vacate(&self.key);
        }
    }
}

/// Wait for the leader's broadcast. `None` if the leader went away without
/// producing a result.
pub async fn await_result(mut slot: Slot) -> Option<CapturedResponse> {
    loop {
        if let Some(value) = slot.borrow().clone() {
            return Some(value);
        }
        if slot.changed().await.is_err() {
            return slot.borrow().clone();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    fn captured(tag: u8) -> CapturedResponse {
        CapturedResponse::new(200, "t", "e", vec![tag])
    }

    #[tokio::test]
    async fn waiters_receive_the_leader_result() {
        let flights = Arc::new(Flights::new());

        let leader = match flights.join("k") {
            FlightSlot::Leader(l) => l,
            FlightSlot::Waiter(_) => panic!("expected leader"),
        };
        let waiter = match flights.join("k") {
            FlightSlot::Waiter(w) => w,
            FlightSlot::Leader(_) => panic!("expected waiter"),
        };

        let waited = tokio::spawn(await_result(waiter));
        leader.complete(captured(7));

        assert_eq!(waited.await.unwrap(), Some(captured(7)));
        assert!(flights.is_empty());
    }

    #[tokio::test]
    async fn dropped_leader_vacates_the_key() {
        let flights = Flights::new();
        let leader = match flights.join("k") {
            FlightSlot::Leader(l) => l,
            FlightSlot::Waiter(_) => panic!("expected leader"),
        };
        let waiter = match flights.join("k") {
            FlightSlot::Waiter(w) => w,
            FlightSlot::Leader(_) => panic!("expected waiter"),
        };
        drop(leader);

        assert!(flights.is_empty());
        assert_eq!(await_result(waiter).await, None);

        // The key is free for the next request.
        assert!(matches!(flights.join("k"), FlightSlot::Leader(_)));
    }

    #[tokio::test]
    async fn concurrent_joins_elect_exactly_one_leader() {
        let flights = Arc::new(Flights::new());
        let leaders = Arc::new(AtomicUsize::new(0));

        let mut handles = Vec::new();
        for _ in 0..8 {
            let flights = flights.clone();
            let leaders = leaders.clone();
            handles.push(tokio::spawn(async move {
                match flights.join("k") {
                    FlightSlot::Leader(l) => {
                        leaders.fetch_add(1, Ordering::SeqCst);
                        tokio::time::sleep(std::time::Duration::from_millis(10)).await;
                        l.complete(captured(1));
                        None
                    }
                    FlightSlot::Waiter(w) => await_result(w).await,
                }
            }));
        }

        for handle in handles {
            let _ = handle.await.unwrap();
        }
        assert_eq!(leaders.load(Ordering::SeqCst), 1);
    }
}
