//! Per-user turn serialization.
//!
//! A webhook turn reads the session, waits on the LLM and writes the session
//! back. Two overlapping turns for the same user would otherwise race and
//! the later write would drop the earlier exchange. The inactivity sweep
//! takes the same lock around extract → save → mark.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::Mutex;
use tokio::sync::{OwnedSemaphorePermit, Semaphore};

/// One `Semaphore(1)` per external user id.
pub struct TurnLockMap {
    locks: Mutex<HashMap<String, Arc<Semaphore>>>,
}

impl Default for TurnLockMap {
    fn default() -> Self {
        Self::new()
    }
}

impl TurnLockMap {
    pub fn new() -> Self {
        Self {
            locks: Mutex::new(HashMap::new()),
        }
    }

    /// Wait for exclusive access to `user_id`. The permit releases on drop.
    pub async fn acquire(&self, user_id: &str) -> Result<OwnedSemaphorePermit, TurnLockClosed> {
        let sem = {
            let mut locks = self.locks.lock();
            locks
                .entry(user_id.to_owned())
                .or_insert_with(|| Arc::new(Semaphore::new(1)))
                .clone()
        };
        sem.acquire_owned().await.map_err(|_| TurnLockClosed)
    }

    /// Number of tracked users.
    pub fn user_count(&self) -> usize {
        self.locks.lock().len()
    }

    /// Drop entries nobody holds or waits on.
    pub fn prune_idle(&self) -> usize {
        let mut locks = self.locks.lock();
        let before = locks.len();
        // The map holds one reference; any other means a holder or waiter.
        locks.retain(|_, sem| Arc::strong_count(sem) > 1);
        before - locks.len()
    }
}

/// The semaphore behind a lock was closed.
#[derive(Debug)]
pub struct TurnLockClosed;

impl std::fmt::Display for TurnLockClosed {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "turn lock closed")
    }
}

impl std::error::Error for TurnLockClosed {}
