//! Record store: the environment's local cache of query results.
//!
//! Results are cached whole per [`QueryKey`]; there is no normalization.
//! Entries carry the time they were fetched so policies can judge
//! staleness, and the store can be snapshotted to JSON so cached data
//! survives into the next session.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::query::QueryKey;

/// Current snapshot format version.
const SNAPSHOT_VERSION: u32 = 1;

/// One cached query result.
#[derive(Debug, Clone)]
pub struct CacheEntry {
    pub data: Arc<Value>,
    pub fetched_at: DateTime<Utc>,
}

impl CacheEntry {
    /// Whether the entry is still usable by `store-or-network` at `now`.
    ///
    /// With no TTL configured, entries never go stale.
    pub fn is_fresh(&self, ttl: Option<Duration>, now: DateTime<Utc>) -> bool {
        let Some(ttl) = ttl else {
            return true;
        };
        match chrono::Duration::from_std(ttl) {
            Ok(ttl) => now.signed_duration_since(self.fetched_at) < ttl,
            // TTL too large to represent: treat as never stale.
            Err(_) => true,
        }
    }
}

/// Serializable form of a [`RecordStore`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreSnapshot {
    pub version: u32,
    pub entries: Vec<SnapshotEntry>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SnapshotEntry {
    pub key: QueryKey,
    pub data: Value,
    pub fetched_at: DateTime<Utc>,
}

/// Concurrent cache of query results keyed by [`QueryKey`].
///
/// Cloning is cheap; clones share the same entries.
#[derive(Clone, Default)]
pub struct RecordStore {
    entries: Arc<DashMap<QueryKey, CacheEntry>>,
}

impl RecordStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn lookup(&self, key: &QueryKey) -> Option<CacheEntry> {
        self.entries.get(key).map(|entry| entry.value().clone())
    }

    /// Store a freshly fetched result.
    pub fn publish(&self, key: QueryKey, data: Arc<Value>) -> CacheEntry {
        self.publish_at(key, data, Utc::now())
    }

    /// Store a result with an explicit fetch time.
    pub fn publish_at(&self, key: QueryKey, data: Arc<Value>, fetched_at: DateTime<Utc>) -> CacheEntry {
        let entry = CacheEntry { data, fetched_at };
        tracing::debug!(%key, %fetched_at, "publishing query result to store");
        self.entries.insert(key, entry.clone());
        entry
    }

    pub fn evict(&self, key: &QueryKey) -> Option<CacheEntry> {
        self.entries.remove(key).map(|(_, entry)| entry)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn snapshot(&self) -> StoreSnapshot {
        let mut entries: Vec<SnapshotEntry> = self
            .entries
            .iter()
            .map(|entry| SnapshotEntry {
                key: entry.key().clone(),
                data: entry.value().data.as_ref().clone(),
                fetched_at: entry.value().fetched_at,
            })
            .collect();
        entries.sort_by(|a, b| a.key.to_string().cmp(&b.key.to_string()));

        StoreSnapshot {
            version: SNAPSHOT_VERSION,
            entries,
        }
    }

    /// Rebuild a store from a snapshot.
    ///
    /// Snapshots from another format version are ignored and yield an
    /// empty store.
    pub fn restore(snapshot: StoreSnapshot) -> Self {
        let store = Self::new();
        if snapshot.version != SNAPSHOT_VERSION {
            tracing::warn!(
                found = snapshot.version,
                expected = SNAPSHOT_VERSION,
                "ignoring record store snapshot with unknown version"
            );
            return store;
        }

        for entry in snapshot.entries {
            store
                .entries
                .insert(entry.key, CacheEntry {
                    data: Arc::new(entry.data),
                    fetched_at: entry.fetched_at,
                });
        }
        store
    }
}

impl std::fmt::Debug for RecordStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RecordStore")
            .field("entries", &self.entries.len())
            .finish()
    }
}
