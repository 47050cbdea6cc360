/// Per-room mutual exclusion
///
/// Join, exit and close all perform a read-modify-write against one cache
/// key; holding the room's lock across that span keeps concurrent calls
/// from overwriting each other's membership update.
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{Mutex, OwnedMutexGuard};

/// Keyed async locks, one per room id
#[derive(Default)]
pub struct RoomLocks {
    inner: Mutex<HashMap<String, Arc<Mutex<()>>>>,
}

impl RoomLocks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Acquire the lock for a room, creating it on first use
    pub async fn acquire(&self, room_id: &str) -> OwnedMutexGuard<()> {
        let lock = {
            let mut map = self.inner.lock().await;
            Arc::clone(
                map.entry(room_id.to_string())
                    .or_insert_with(|| Arc::new(Mutex::new(()))),
            )
        };
        lock.lock_owned().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn test_same_room_serializes() {
        let locks = Arc::new(RoomLocks::new());

        let guard = locks.acquire("room-1").await;

        let locks2 = Arc::clone(&locks);
        let contender = tokio::spawn(async move {
            let _guard = locks2.acquire("room-1").await;
        });

        tokio::time::sleep(Duration::from_millis(10)).await;
        assert!(!contender.is_finished());

        drop(guard);
        tokio::time::timeout(Duration::from_millis(100), contender)
            .await
            .expect("lock released")
            .unwrap();
    }

    #[tokio::test]
    async fn test_different_rooms_do_not_block() {
        let locks = RoomLocks::new();
        let _a = locks.acquire("room-a").await;
        let _b = locks.acquire("room-b").await;
    }
}
