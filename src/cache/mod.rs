//! In-memory deduplication cache
//!
//! Crawls revisit the same discovery keys many times in a single run (a
//! listing item repeated across pages, two categories sharing recipes), so
//! every discovered item is checked against this cache before it is emitted
//! downstream. Membership is permanent for the process lifetime: no TTL, no
//! eviction.
//!
//! All methods take `&self` and synchronize internally, so the cache can be
//! shared across workers behind a plain `Arc` without external locking.
//! [`DedupCache::insert`] performs the membership check and the insert under
//! one write lock and reports whether the key was new, so two concurrent
//! callers can never both observe a key as unseen.

use std::collections::HashSet;
use std::sync::RwLock;

/// Concurrency-safe set of already-seen discovery keys
#[derive(Debug, Default)]
pub struct DedupCache {
    seen: RwLock<HashSet<String>>,
}

impl DedupCache {
    /// Create an empty cache
    pub fn new() -> Self {
        Self::default()
    }

    /// Check whether a key has been recorded
    pub fn exists(&self, key: &str) -> bool {
        self.seen
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .contains(key)
    }

    /// Record a key, returning `true` if it was not present before
    ///
    /// Idempotent: inserting an already-present key is a no-op that returns
    /// `false`. Check and insert happen atomically under the write lock.
    pub fn insert(&self, key: &str) -> bool {
        self.seen
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .insert(key.to_string())
    }

    /// Number of recorded keys
    pub fn len(&self) -> usize {
        self.seen.read().unwrap_or_else(|e| e.into_inner()).len()
    }

    /// Whether the cache is empty
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Build a namespaced dedup key so same-named items of different kinds never
/// mask each other
pub fn dedup_key(namespace: &str, name: &str) -> String {
    format!("{namespace}:{name}")
}
