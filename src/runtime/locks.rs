//! Per-client serialization of flow mutations
//!
//! Two requests from the same client never interleave their
//! load-modify-save of the session or history; different clients never wait
//! on each other.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use tokio::sync::OwnedMutexGuard;

type ClientMutex = Arc<tokio::sync::Mutex<()>>;

#[derive(Debug, Default)]
pub struct ClientLocks {
    locks: Mutex<HashMap<String, ClientMutex>>,
}

impl ClientLocks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Wait for exclusive access to `client_id`'s state
    pub async fn acquire(&self, client_id: &str) -> OwnedMutexGuard<()> {
        let lock = {
            let mut locks = self.locks.lock().unwrap_or_else(std::sync::PoisonError::into_inner);
            // Drop entries no request is holding or waiting on
            locks.retain(|_, l| Arc::strong_count(l) > 1);
            Arc::clone(locks.entry(client_id.to_string()).or_default())
        };
        lock.lock_owned().await
    }

    /// Number of clients with a request in flight
    pub fn active(&self) -> usize {
        self.locks
            .lock()
            .map(|locks| locks.values().filter(|l| Arc::strong_count(l) > 1).count())
            .unwrap_or(0)
    }
}
