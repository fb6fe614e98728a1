//! Per-match mutual exclusion.

use kalah_rules::MatchId;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};
use tracing::{debug, instrument};

/// Serializes read-modify-write cycles on the same match.
///
/// Different matches never contend. An entry lives only while some caller
/// holds or waits on it.
#[derive(Debug, Clone, Default)]
pub struct MatchLocks {
    locks: Arc<Mutex<HashMap<MatchId, Arc<Mutex<()>>>>>,
}

impl MatchLocks {
    /// Creates an empty lock map.
    pub fn new() -> Self {
        Self::default()
    }

    /// Runs `f` while holding the lock for `match_id`.
    ///
    /// The entry is released even if `f` panics.
    #[instrument(skip(self, f))]
    pub fn with_lock<T>(&self, match_id: &str, f: impl FnOnce() -> T) -> T {
        let release = Release::acquire(&self.locks, match_id);
        let _held = release
            .entry
            .as_ref()
            .map(|entry| entry.lock().unwrap_or_else(PoisonError::into_inner));
        debug!("Acquired match lock");
        f()
    }

    /// Number of matches with a live lock entry.
    pub fn len(&self) -> usize {
        self.locks
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    /// Returns true when no lock entries are live.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Holds one reference to a match's lock entry and drops the map entry when
/// it was the last user.
struct Release<'a> {
    map: &'a Mutex<HashMap<MatchId, Arc<Mutex<()>>>>,
    match_id: &'a str,
    entry: Option<Arc<Mutex<()>>>,
}

impl<'a> Release<'a> {
    fn acquire(map: &'a Mutex<HashMap<MatchId, Arc<Mutex<()>>>>, match_id: &'a str) -> Self {
        let mut locks = map.lock().unwrap_or_else(PoisonError::into_inner);
        let entry = Arc::clone(
            locks
                .entry(match_id.to_string())
                .or_insert_with(|| Arc::new(Mutex::new(()))),
        );
        Self {
            map,
            match_id,
            entry: Some(entry),
        }
    }
}

impl Drop for Release<'_> {
    fn drop(&mut self) {
        let mut locks = self.map.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(entry) = self.entry.take() {
            // One reference in the map, one here: nobody else is waiting.
            if Arc::strong_count(&entry) == 2 {
                locks.remove(self.match_id);
            }
            // Dropped under the map lock so the next check sees it gone.
            drop(entry);
        }
    }
}
