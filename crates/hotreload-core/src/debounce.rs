//! Trailing-edge debouncing with an explicit per-key timer table
//!
//! Each key owns at most one pending timer. Scheduling a key that already has
//! a pending timer cancels that timer and replaces it, so a burst of requests
//! fires once, one window after the last request.

use std::collections::HashMap;
use std::fmt::Debug;
use std::hash::Hash;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use parking_lot::Mutex;
use tokio::task::JoinHandle;
use tracing::debug;

/// Pending timer for one key
struct Slot {
    token: u64,
    handle: JoinHandle<()>,
}

/// Per-key timer-token table
pub struct Debouncer<K> {
    slots: Arc<Mutex<HashMap<K, Slot>>>,
    next_token: AtomicU64,
}

impl<K> Default for Debouncer<K> {
    fn default() -> Self {
        Self {
            slots: Arc::new(Mutex::new(HashMap::new())),
            next_token: AtomicU64::new(0),
        }
    }
}

impl<K> Debouncer<K>
where
    K: Eq + Hash + Clone + Debug + Send + 'static,
{
    pub fn new() -> Self {
        Self::default()
    }

    /// Run `fire` once `delay` has passed without another `schedule` for the
    /// same key. Must be called from within a tokio runtime.
    pub fn schedule<F>(&self, key: K, delay: Duration, fire: F)
    where
        F: FnOnce() + Send + 'static,
    {
        let token = self.next_token.fetch_add(1, Ordering::Relaxed);
        let slots = self.slots.clone();
        let timer_key = key.clone();

        // Held across spawn so the timer cannot observe the table before its
        // own slot is inserted.
        let mut table = self.slots.lock();
        let handle = tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            let current = {
                let mut table = slots.lock();
                match table.get(&timer_key) {
                    Some(slot) if slot.token == token => {
                        table.remove(&timer_key);
                        true
                    }
                    _ => false,
                }
            };
            if current {
                fire();
            }
        });

        if let Some(previous) = table.insert(key.clone(), Slot { token, handle }) {
            previous.handle.abort();
            debug!("Debounce timer for {:?} replaced", key);
        }
    }

    /// Cancel the pending timer for `key`
    pub fn cancel(&self, key: &K) -> bool {
        match self.slots.lock().remove(key) {
            Some(slot) => {
                slot.handle.abort();
                true
            }
            None => false,
        }
    }

    /// Cancel every pending timer
    pub fn cancel_all(&self) {
        for (_, slot) in self.slots.lock().drain() {
            slot.handle.abort();
        }
    }

    pub fn is_pending(&self, key: &K) -> bool {
        self.slots.lock().contains_key(key)
    }

    /// Keys with a pending timer
    pub fn pending(&self) -> Vec<K> {
        self.slots.lock().keys().cloned().collect()
    }
}

impl<K> Drop for Debouncer<K> {
    fn drop(&mut self) {
        for (_, slot) in self.slots.lock().drain() {
            slot.handle.abort();
        }
    }
}
