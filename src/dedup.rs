//! Bounded in-memory cache of processed event ids.
//!
//! Slack delivers events at-least-once; the cache suppresses reprocessing
//! within one process lifetime. The bound is enforced by clearing the whole
//! set once it is exceeded. Duplicates arriving right after a clear slip
//! through, which callers accept as best-effort. Nothing is persisted, so a
//! restart also re-opens the duplicate window.

use std::collections::HashSet;
use std::sync::{Mutex, MutexGuard, PoisonError};

/// Mutex-guarded set of event ids with a clear-on-overflow bound.
#[derive(Debug)]
pub struct EventCache {
    capacity: usize,
    seen: Mutex<HashSet<String>>,
}

impl EventCache {
    /// Create a cache that clears itself once `capacity` is exceeded.
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity,
            seen: Mutex::new(HashSet::new()),
        }
    }

    /// Whether `event_id` has been recorded in the current cache lifetime.
    #[must_use]
    pub fn seen(&self, event_id: &str) -> bool {
        self.lock().contains(event_id)
    }

    /// Record `event_id`, clearing the whole set when the bound is exceeded.
    pub fn record(&self, event_id: &str) {
        let mut seen = self.lock();
        seen.insert(event_id.to_owned());
        if seen.len() > self.capacity {
            seen.clear();
        }
    }

    /// Membership check and record under a single lock.
    ///
    /// Returns `true` when the id is new. The combined operation closes the
    /// check/insert race that separate `seen` + `record` calls would leave
    /// open under concurrent deliveries.
    #[must_use]
    pub fn insert(&self, event_id: &str) -> bool {
        let mut seen = self.lock();
        if seen.contains(event_id) {
            return false;
        }
        seen.insert(event_id.to_owned());
        if seen.len() > self.capacity {
            seen.clear();
        }
        true
    }

    fn lock(&self) -> MutexGuard<'_, HashSet<String>> {
        self.seen.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
