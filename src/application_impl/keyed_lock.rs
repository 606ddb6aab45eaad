use dashmap::DashMap;
use std::sync::Arc;
use tokio::sync::{Mutex, OwnedMutexGuard};

type Slots = Arc<DashMap<String, Arc<Mutex<()>>>>;

/// Mutual exclusion scoped to a string key. Slots only live while someone
/// holds or waits on them.
pub struct KeyedLock {
    slots: Slots,
}

pub struct KeyedLockGuard {
    key: String,
    slots: Slots,
    guard: Option<OwnedMutexGuard<()>>,
}

impl KeyedLock {
    pub fn new() -> Self {
        Self {
            slots: Arc::new(DashMap::new()),
        }
    }

    pub async fn acquire(&self, key: &str) -> KeyedLockGuard {
        let slot = {
            let entry = self
                .slots
                .entry(key.to_owned())
                .or_insert_with(|| Arc::new(Mutex::new(())));
            Arc::clone(entry.value())
        };

        let guard = slot.lock_owned().await;

        KeyedLockGuard {
            key: key.to_owned(),
            slots: self.slots.clone(),
            guard: Some(guard),
        }
    }

    pub fn active_keys(&self) -> usize {
        self.slots.len()
    }
}

impl Default for KeyedLock {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for KeyedLockGuard {
    fn drop(&mut self) {
        drop(self.guard.take());
        // Only the map's own reference left means nobody is waiting.
        self.slots
            .remove_if(&self.key, |_, slot| Arc::strong_count(slot) == 1);
    }
}
