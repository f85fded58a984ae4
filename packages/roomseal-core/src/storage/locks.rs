//! Per-room write locks.
//!
//! Calls touching the same room serialize their read-modify-write sections
//! (rotation, storing a received key, deletion). Distinct rooms never
//! contend, and reads never lock.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::Mutex;
use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};

#[derive(Default)]
pub(crate) struct RoomLocks {
    locks: Mutex<HashMap<String, Arc<AsyncMutex<()>>>>,
}

impl RoomLocks {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Wait for exclusive access to `room_id`
    ///
    /// The guard is held across awaits on the secret store; the outer map
    /// lock is only held long enough to find or insert the room's mutex.
    pub(crate) async fn acquire(&self, room_id: &str) -> OwnedMutexGuard<()> {
        let lock = {
            let mut locks = self.locks.lock();
            locks
                .entry(room_id.to_string())
                .or_insert_with(|| Arc::new(AsyncMutex::new(())))
                .clone()
        };
        lock.lock_owned().await
    }

    /// Drop mutexes nobody is holding or waiting on
    pub(crate) fn prune(&self) {
        self.locks.lock().retain(|_, lock| Arc::strong_count(lock) > 1);
    }

    #[cfg(test)]
    pub(crate) fn len(&self) -> usize {
        self.locks.lock().len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn test_same_room_serializes() {
        let locks = Arc::new(RoomLocks::new());
        let guard = locks.acquire("room").await;

        let contender = {
            let locks = locks.clone();
            tokio::spawn(async move {
                let _g = locks.acquire("room").await;
            })
        };

        tokio::task::yield_now().await;
        assert!(!contender.is_finished());

        drop(guard);
        tokio::time::timeout(Duration::from_secs(5), contender)
            .await
            .unwrap()
            .unwrap();
    }

    #[tokio::test]
    async fn test_distinct_rooms_do_not_contend() {
        let locks = RoomLocks::new();
        let _a = locks.acquire("room-a").await;
        let _b = tokio::time::timeout(Duration::from_secs(5), locks.acquire("room-b"))
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_prune_keeps_held_locks() {
        let locks = RoomLocks::new();
        let held = locks.acquire("held").await;
        drop(locks.acquire("released").await);

        locks.prune();
        assert_eq!(locks.len(), 1);
        drop(held);

        locks.prune();
        assert_eq!(locks.len(), 0);
    }
}
