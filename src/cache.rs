//! Per-key query cache backing stale-while-revalidate reads.

use std::sync::atomic::{AtomicU64, Ordering};

use dashmap::mapref::entry::Entry as MapEntry;
use dashmap::DashMap;
use serde_json::Value;
use tokio::time::Instant;

use crate::policy::{CachePolicy, Freshness};

/// Cache key: endpoint path, plus the bearer token for protected calls so
/// two sessions never share an entry.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey {
    path: String,
    token: Option<String>,
}

impl CacheKey {
    pub fn public(path: &str) -> Self {
        Self {
            path: path.to_string(),
            token: None,
        }
    }

    pub fn protected(path: &str, token: &str) -> Self {
        Self {
            path: path.to_string(),
            token: Some(token.to_string()),
        }
    }

    pub fn path(&self) -> &str {
        &self.path
    }
}

#[derive(Debug)]
struct Entry {
    value: Value,
    stored_at: Instant,
    revalidating: bool,
}

impl Entry {
    fn new(value: Value) -> Self {
        Self {
            value,
            stored_at: Instant::now(),
            revalidating: false,
        }
    }
}

/// Last write wins per key.
///
/// Every invalidation bumps a generation counter. Writers that started a
/// request before an invalidation use [`QueryCache::insert_if_current`] so
/// their result cannot resurrect dropped data.
#[derive(Debug, Default)]
pub struct QueryCache {
    entries: DashMap<CacheKey, Entry>,
    generation: AtomicU64,
}

impl QueryCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Cached value and its freshness. Expired entries are removed and
    /// reported as a miss.
    pub fn lookup(&self, key: &CacheKey, policy: &CachePolicy) -> Option<(Value, Freshness)> {
        let freshness = {
            let entry = self.entries.get(key)?;
            let freshness = policy.freshness(entry.stored_at.elapsed());
            if freshness != Freshness::Expired {
                return Some((entry.value.clone(), freshness));
            }
            freshness
        };

        tracing::trace!(path = %key.path, ?freshness, "evicting cache entry");
        self.entries.remove(key);
        None
    }

    pub fn insert(&self, key: CacheKey, value: Value) {
        self.entries.insert(key, Entry::new(value));
    }

    /// Current invalidation generation; read it before sending a request.
    pub fn generation(&self) -> u64 {
        self.generation.load(Ordering::SeqCst)
    }

    /// Stores `value` only if nothing was invalidated since `generation` was
    /// read. Returns whether it was stored.
    pub fn insert_if_current(&self, key: CacheKey, value: Value, generation: u64) -> bool {
        // The shard lock is held across the check, so a concurrent
        // invalidation either bumps first or removes this entry afterwards.
        match self.entries.entry(key) {
            MapEntry::Occupied(mut occupied) => {
                if self.generation() != generation {
                    occupied.get_mut().revalidating = false;
                    return false;
                }
                occupied.insert(Entry::new(value));
            }
            MapEntry::Vacant(vacant) => {
                if self.generation() != generation {
                    return false;
                }
                vacant.insert(Entry::new(value));
            }
        }
        true
    }

    /// Drops every expired entry, not only the ones being looked up.
    pub fn sweep_expired(&self, policy: &CachePolicy) -> usize {
        let before = self.entries.len();
        self.entries
            .retain(|_, entry| policy.freshness(entry.stored_at.elapsed()) != Freshness::Expired);
        let swept = before.saturating_sub(self.entries.len());
        if swept > 0 {
            tracing::trace!(swept, "swept expired cache entries");
        }
        swept
    }

    /// Marks a background revalidation as started. Returns false when one is
    /// already running for this key or the entry is gone.
    pub fn begin_revalidation(&self, key: &CacheKey) -> bool {
        match self.entries.get_mut(key) {
            Some(mut entry) if !entry.revalidating => {
                entry.revalidating = true;
                true
            }
            _ => false,
        }
    }

    pub fn end_revalidation(&self, key: &CacheKey) {
        if let Some(mut entry) = self.entries.get_mut(key) {
            entry.revalidating = false;
        }
    }

    /// Drops every entry whose path starts with `prefix`. Returns how many.
    pub fn invalidate_prefix(&self, prefix: &str) -> usize {
        self.generation.fetch_add(1, Ordering::SeqCst);
        let before = self.entries.len();
        self.entries.retain(|key, _| !key.path.starts_with(prefix));
        before - self.entries.len()
    }

    /// Drops every entry tied to a bearer token.
    pub fn clear_protected(&self) {
        self.generation.fetch_add(1, Ordering::SeqCst);
        self.entries.retain(|key, _| key.token.is_none());
    }

    pub fn clear(&self) {
        self.generation.fetch_add(1, Ordering::SeqCst);
        self.entries.clear();
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
