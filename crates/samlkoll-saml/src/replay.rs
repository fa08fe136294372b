#![forbid(unsafe_code)]

//! Assertion replay detection.

use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::{Mutex, PoisonError};

/// Remembers assertion IDs until they expire.
///
/// Implementations must make `check_and_insert_all` atomic: when several
/// callers present the same ID concurrently, exactly one succeeds, and a
/// batch that fails records nothing.
pub trait ReplayCache: Send + Sync {
    /// Record every `(id, expires_at)` pair, or none of them. Returns the
    /// first ID that is already recorded and not yet expired at `now`.
    fn check_and_insert_all(
        &self,
        entries: &[(&str, DateTime<Utc>)],
        now: DateTime<Utc>,
    ) -> Result<(), String>;

    /// Record a single `id` until `expires_at`. Returns `false` on a replay.
    fn check_and_insert(&self, id: &str, expires_at: DateTime<Utc>, now: DateTime<Utc>) -> bool {
        self.check_and_insert_all(&[(id, expires_at)], now).is_ok()
    }
}

/// Process-local replay cache.
#[derive(Debug, Default)]
pub struct InMemoryReplayCache {
    entries: Mutex<HashMap<String, DateTime<Utc>>>,
}

impl InMemoryReplayCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of recorded IDs, expired ones included until the next insert.
    pub fn len(&self) -> usize {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl ReplayCache for InMemoryReplayCache {
    fn check_and_insert_all(
        &self,
        batch: &[(&str, DateTime<Utc>)],
        now: DateTime<Utc>,
    ) -> Result<(), String> {
        let mut entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
        entries.retain(|_, exp| *exp >= now);
        for (i, (id, _)) in batch.iter().enumerate() {
            if entries.contains_key(*id) || batch[..i].iter().any(|(seen, _)| seen == id) {
                return Err((*id).to_owned());
            }
        }
        for (id, expires_at) in batch {
            entries.insert((*id).to_owned(), *expires_at);
        }
        Ok(())
    }
}
