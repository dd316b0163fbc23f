use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tokio::sync::OwnedMutexGuard;

struct Slot {
    lock: Arc<tokio::sync::Mutex<()>>,
    /// Holder plus waiters, including waiters whose future was dropped
    /// before they got the lock.
    users: usize,
}

/// Per-key async locks: at most one holder per key at a time.
#[derive(Default)]
pub struct SingleFlight {
    slots: Mutex<HashMap<String, Slot>>,
}

pub struct FlightGuard<'a> {
    owner: &'a SingleFlight,
    key: String,
    waited: bool,
    held: Option<OwnedMutexGuard<()>>,
}

impl SingleFlight {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn acquire(&self, key: &str) -> FlightGuard<'_> {
        let lock = {
            let mut slots = self.slots();
            let slot = slots.entry(key.to_owned()).or_insert_with(|| Slot {
                lock: Arc::default(),
                users: 0,
            });
            slot.users += 1;
            slot.lock.clone()
        };
        // Registered before waiting so a cancelled waiter still releases its slot.
        let mut guard = FlightGuard {
            owner: self,
            key: key.to_owned(),
            waited: false,
            held: None,
        };
        let held = match lock.clone().try_lock_owned() {
            Ok(held) => held,
            Err(_) => {
                guard.waited = true;
                lock.lock_owned().await
            }
        };
        guard.held = Some(held);
        guard
    }

    /// Keys with a holder or waiter.
    pub fn in_flight(&self) -> usize {
        self.slots().len()
    }

    fn slots(&self) -> MutexGuard<'_, HashMap<String, Slot>> {
        self.slots.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl FlightGuard<'_> {
    /// Whether another holder had the key when this one arrived.
    pub fn waited(&self) -> bool {
        self.waited
    }
}

impl Drop for FlightGuard<'_> {
    fn drop(&mut self) {
        self.held.take();
        let mut slots = self.owner.slots();
        let idle = match slots.get_mut(&self.key) {
            Some(slot) => {
                slot.users = slot.users.saturating_sub(1);
                slot.users == 0
            }
            None => false,
        };
        if idle {
            slots.remove(&self.key);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    #[tokio::test]
    async fn releases_slot_after_last_holder() {
        let flights = SingleFlight::new();
        {
            let _a = flights.acquire("k").await;
            assert_eq!(flights.in_flight(), 1);
        }
        assert_eq!(flights.in_flight(), 0);
    }

    #[tokio::test]
    async fn serializes_holders_of_the_same_key() {
        let flights = Arc::new(SingleFlight::new());
        let active = Arc::new(AtomicUsize::new(0));
        let peak = Arc::new(AtomicUsize::new(0));
        let mut tasks = Vec::new();
        for _ in 0..8 {
            let flights = flights.clone();
            let active = active.clone();
            let peak = peak.clone();
            tasks.push(tokio::spawn(async move {
                let _guard = flights.acquire("same").await;
                let now = active.fetch_add(1, Ordering::SeqCst) + 1;
                peak.fetch_max(now, Ordering::SeqCst);
                tokio::time::sleep(Duration::from_millis(5)).await;
                active.fetch_sub(1, Ordering::SeqCst);
            }));
        }
        for t in tasks {
            t.await.unwrap();
        }
        assert_eq!(peak.load(Ordering::SeqCst), 1);
        assert_eq!(flights.in_flight(), 0);
    }

    #[tokio::test]
    async fn different_keys_do_not_block() {
        let flights = SingleFlight::new();
        let _a = flights.acquire("a").await;
        let _b = tokio::time::timeout(Duration::from_secs(1), flights.acquire("b"))
            .await
            .expect("independent key should not wait");
        assert_eq!(flights.in_flight(), 2);
    }

    #[tokio::test]
    async fn cancelled_waiter_releases_its_slot() {
        let flights = SingleFlight::new();
        let holder = flights.acquire("k").await;
        assert!(!holder.waited());
        let waiting = tokio::time::timeout(Duration::from_millis(20), flights.acquire("k")).await;
        assert!(waiting.is_err());
        assert_eq!(flights.in_flight(), 1);
        drop(holder);
        assert_eq!(flights.in_flight(), 0);
    }

    #[tokio::test]
    async fn waiter_released_after_holder_leaves_no_slot() {
        let flights = Arc::new(SingleFlight::new());
        let holder = flights.acquire("k").await;
        let waiter = {
            let flights = flights.clone();
            tokio::spawn(async move {
                let guard = flights.acquire("k").await;
                guard.waited()
            })
        };
        tokio::time::sleep(Duration::from_millis(20)).await;
        drop(holder);
        assert!(waiter.await.unwrap());
        assert_eq!(flights.in_flight(), 0);
    }
}
