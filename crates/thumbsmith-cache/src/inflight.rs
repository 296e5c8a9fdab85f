//! Per-fingerprint mutual exclusion for renders in flight.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};

/// Registry of locks keyed by target path.
///
/// Two saves that resolve to the same target serialize on one lock, so the
/// second observes the first's file instead of rendering again. Entries are
/// dropped once no caller holds or waits on them.
#[derive(Debug, Default)]
pub struct InFlight {
    locks: Mutex<HashMap<String, Arc<Mutex<()>>>>,
}

impl InFlight {
    /// Run `f` while holding the lock for `key`.
    pub fn with_lock<T>(&self, key: &str, f: impl FnOnce() -> T) -> T {
        let lock = {
            let mut locks = self.locks.lock().unwrap_or_else(PoisonError::into_inner);
            Arc::clone(locks.entry(key.to_owned()).or_default())
        };

        let result = {
            let _guard = lock.lock().unwrap_or_else(PoisonError::into_inner);
            f()
        };

        let mut locks = self.locks.lock().unwrap_or_else(PoisonError::into_inner);
        // One reference in the map, one here: nobody else is waiting.
        if Arc::strong_count(&lock) == 2 {
            locks.remove(key);
        }
        result
    }

    /// Number of keys currently registered.
    #[must_use]
    pub fn len(&self) -> usize {
        self.locks
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    /// Whether no key is registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::thread;
    use std::time::Duration;

    use super::*;

    #[test]
    fn entries_are_released() {
        let inflight = InFlight::default();
        assert_eq!(inflight.with_lock("a", || 7), 7);
        assert!(inflight.is_empty());
    }

    #[test]
    fn same_key_is_exclusive() {
        let inflight = InFlight::default();
        let active = AtomicUsize::new(0);
        let max_seen = AtomicUsize::new(0);

        thread::scope(|s| {
            for _ in 0..8 {
                s.spawn(|| {
                    inflight.with_lock("same", || {
                        let now = active.fetch_add(1, Ordering::SeqCst) + 1;
                        max_seen.fetch_max(now, Ordering::SeqCst);
                        thread::sleep(Duration::from_millis(5));
                        active.fetch_sub(1, Ordering::SeqCst);
                    });
                });
            }
        });

        assert_eq!(max_seen.load(Ordering::SeqCst), 1);
        assert!(inflight.is_empty());
    }

    #[test]
    fn different_keys_do_not_block_each_other() {
        let inflight = InFlight::default();
        inflight.with_lock("outer", || {
            // Re-entrant use of another key must not deadlock.
            assert_eq!(inflight.with_lock("inner", || 1), 1);
            assert_eq!(inflight.len(), 1);
        });
        assert!(inflight.is_empty());
    }
}
