//! The data environment: network, record store, and in-flight requests.
//!
//! One environment lives for the whole process and is shared by cloning.
//! Fetches run as spawned tokio tasks, so the environment must be used
//! from within a Tokio runtime.
//!
//! # Dedupe
//!
//! At most one request per [`QueryKey`] is in flight. A second fetch for
//! the same key while the first is pending receives the same watch
//! channel instead of issuing another request.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use tokio::sync::watch;

use crate::network::Network;
use crate::preload::FetchState;
use crate::query::{QueryDefinition, QueryKey, Variables};
use crate::store::{CacheEntry, RecordStore};

/// Tunables for an [`Environment`].
#[derive(Debug, Clone, Default)]
pub struct EnvironmentConfig {
    /// How long a cached result stays fresh for `store-or-network`.
    /// `None` means cached results never go stale.
    pub query_cache_ttl: Option<Duration>,
}

struct EnvironmentInner {
    network: Arc<dyn Network>,
    store: RecordStore,
    inflight: DashMap<QueryKey, watch::Receiver<FetchState>>,
    config: EnvironmentConfig,
    requests: AtomicUsize,
}

/// Client-side environment that executes queries and caches their results.
#[derive(Clone)]
pub struct Environment {
    inner: Arc<EnvironmentInner>,
}

impl Environment {
    /// Create an environment with an empty store and default config.
    pub fn new(network: Arc<dyn Network>) -> Self {
        Self::with_store(network, RecordStore::new())
    }

    /// Create an environment around an existing (e.g. restored) store.
    pub fn with_store(network: Arc<dyn Network>, store: RecordStore) -> Self {
        Self {
            inner: Arc::new(EnvironmentInner {
                network,
                store,
                inflight: DashMap::new(),
                config: EnvironmentConfig::default(),
                requests: AtomicUsize::new(0),
            }),
        }
    }

    /// Replace the configuration. Only valid before the environment is shared.
    pub fn with_config(self, config: EnvironmentConfig) -> Self {
        Self {
            inner: Arc::new(EnvironmentInner {
                network: self.inner.network.clone(),
                store: self.inner.store.clone(),
                inflight: DashMap::new(),
                config,
                requests: AtomicUsize::new(self.network_requests()),
            }),
        }
    }

    pub fn store(&self) -> &RecordStore {
        &self.inner.store
    }

    pub fn config(&self) -> &EnvironmentConfig {
        &self.inner.config
    }

    /// Number of network requests issued so far (deduped fetches excluded).
    pub fn network_requests(&self) -> usize {
        self.inner.requests.load(Ordering::SeqCst)
    }

    /// Number of requests currently in flight.
    pub fn inflight(&self) -> usize {
        self.inner
            .inflight
            .iter()
            .filter(|entry| entry.value().borrow().is_pending())
            .count()
    }

    /// Cached entry for `key`, regardless of age.
    pub fn lookup(&self, key: &QueryKey) -> Option<CacheEntry> {
        self.inner.store.lookup(key)
    }

    /// Cached entry for `key` if it is still fresh.
    pub fn lookup_fresh(&self, key: &QueryKey) -> Option<CacheEntry> {
        self.lookup(key)
            .filter(|entry| entry.is_fresh(self.inner.config.query_cache_ttl, Utc::now()))
    }

    /// Start (or join) a network fetch for `key`.
    ///
    /// Returns immediately with a receiver that settles once the request
    /// completes. On success the result is published to the store before
    /// the receiver observes it.
    pub(crate) fn fetch(
        &self,
        query: &QueryDefinition,
        variables: &Variables,
        key: &QueryKey,
    ) -> watch::Receiver<FetchState> {
        let (tx, rx) = watch::channel(FetchState::Pending);

        match self.inner.inflight.entry(key.clone()) {
            Entry::Occupied(entry) if entry.get().borrow().is_pending() => {
                tracing::debug!(%key, "joining in-flight request");
                return entry.get().clone();
            }
            entry => {
                entry.insert(rx.clone());
            }
        }

        let request = self.inner.requests.fetch_add(1, Ordering::SeqCst) + 1;
        tracing::debug!(%key, request, "issuing network request");

        let inner = self.inner.clone();
        let query = *query;
        let variables = variables.clone();
        let key = key.clone();
        tokio::spawn(async move {
            let state = match inner.network.execute(&query, &variables).await {
                Ok(data) => {
                    let entry = inner.store.publish(key.clone(), Arc::new(data));
                    FetchState::Resolved(entry.data)
                }
                Err(err) => {
                    tracing::warn!(%key, error = %err, "query fetch failed");
                    FetchState::Failed(err)
                }
            };

            tx.send_replace(state);
            inner
                .inflight
                .remove_if(&key, |_, rx| !rx.borrow().is_pending());
        });

        rx
    }
}

impl std::fmt::Debug for Environment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Environment")
            .field("store", &self.inner.store)
            .field("config", &self.inner.config)
            .field("network_requests", &self.network_requests())
            .finish()
    }
}
