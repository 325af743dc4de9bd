//! Per-chat backfill exclusion. A chat id is held by at most one [`BackfillGuard`]; dropping the
//! guard (normal return, error, or unwinding panic) releases it.

use std::collections::HashSet;
use std::sync::{Arc, Mutex, MutexGuard};

#[derive(Clone, Default)]
pub struct BackfillRegistry {
    active: Arc<Mutex<HashSet<i64>>>,
}

impl BackfillRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Marks `chat_id` in progress. `None` if a backfill already holds it.
    pub fn try_acquire(&self, chat_id: i64) -> Option<BackfillGuard> {
        if self.lock().insert(chat_id) {
            Some(BackfillGuard {
                chat_id,
                registry: self.clone(),
            })
        } else {
            None
        }
    }

    pub fn is_active(&self, chat_id: i64) -> bool {
        self.lock().contains(&chat_id)
    }

    /// Chat ids currently being backfilled.
    pub fn active(&self) -> Vec<i64> {
        let mut ids: Vec<i64> = self.lock().iter().copied().collect();
        ids.sort_unstable();
        ids
    }

    fn release(&self, chat_id: i64) {
        self.lock().remove(&chat_id);
    }

    // A poisoned lock still holds a consistent set; keep using it.
    fn lock(&self) -> MutexGuard<'_, HashSet<i64>> {
        self.active.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

/// Holds the in-progress flag for one chat until dropped.
pub struct BackfillGuard {
    chat_id: i64,
    registry: BackfillRegistry,
}

impl Drop for BackfillGuard {
    fn drop(&mut self) {
        self.registry.release(self.chat_id);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_second_acquire_rejected_until_release() {
        let registry = BackfillRegistry::new();
        let guard = registry.try_acquire(7).expect("first acquire");
        assert!(registry.is_active(7));
        assert!(registry.try_acquire(7).is_none());

        drop(guard);
        assert!(!registry.is_active(7));
        assert!(registry.try_acquire(7).is_some());
    }

    #[test]
    fn test_different_chats_are_independent() {
        let registry = BackfillRegistry::new();
        let _a = registry.try_acquire(1).expect("chat 1");
        let _b = registry.try_acquire(2).expect("chat 2");
        assert_eq!(registry.active(), vec![1, 2]);
    }

    #[test]
    fn test_release_on_panic() {
        let registry = BackfillRegistry::new();
        let cloned = registry.clone();
        let result = std::thread::spawn(move || {
            let _guard = cloned.try_acquire(3).expect("acquire");
            panic!("walk crashed");
        })
        .join();

        assert!(result.is_err());
        assert!(!registry.is_active(3));
    }
}
