//! Preloading queries and reading them from render.
//!
//! [`preload`] is the non-blocking half: it consults the store according
//! to the fetch policy, starts a network fetch when needed, and hands back
//! a [`PreloadedQuery`]. [`read`] is the observing half: a pure function of
//! the handle's current settlement that returns data, an error, or a
//! [`Suspension`] for the renderer to wait on.

use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde_json::Value;
use tokio::sync::watch;
use uuid::Uuid;

use crate::environment::Environment;
use crate::error::{FetchError, QueryError};
use crate::policy::FetchPolicy;
use crate::query::{QueryDefinition, QueryKey, Variables};

/// Settlement state of a network fetch.
#[derive(Debug, Clone)]
pub enum FetchState {
    Pending,
    Resolved(Arc<Value>),
    Failed(FetchError),
}

impl FetchState {
    pub fn is_pending(&self) -> bool {
        matches!(self, FetchState::Pending)
    }
}

/// Why a render pass stopped before producing a view.
#[derive(Debug)]
pub enum Interrupt {
    /// Data is not available yet; retry the pass once the suspension settles.
    Suspend(Suspension),
    /// A read failed; propagate to the nearest error boundary.
    Error(QueryError),
}

impl From<QueryError> for Interrupt {
    fn from(err: QueryError) -> Self {
        Interrupt::Error(err)
    }
}

/// A pending read the renderer can wait on.
#[derive(Debug, Clone)]
pub struct Suspension {
    query: &'static str,
    fetch: watch::Receiver<FetchState>,
}

impl Suspension {
    pub fn query(&self) -> &'static str {
        self.query
    }

    /// Resolves once the underlying fetch has settled, or its task is gone.
    pub async fn settled(mut self) {
        let _ = self.fetch.wait_for(|state| !state.is_pending()).await;
    }
}

enum Source {
    /// Answered from the store; no network involved.
    Store(Arc<Value>),
    /// Backed by a network fetch, optionally with cached data to serve meanwhile.
    Network {
        cached: Option<Arc<Value>>,
        fetch: watch::Receiver<FetchState>,
    },
    /// `store-only` found nothing.
    Missing,
    Disposed,
}

/// Handle to one in-flight-or-resolved fetch for a `(query, variables)` pair.
///
/// Produced only by [`preload`]. Not `Clone`: it belongs to the scope that
/// preloaded it and is read by that scope's renders.
pub struct PreloadedQuery {
    id: Uuid,
    query: &'static str,
    key: QueryKey,
    policy: FetchPolicy,
    source: Source,
}

impl PreloadedQuery {
    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn query(&self) -> &'static str {
        self.query
    }

    pub fn key(&self) -> &QueryKey {
        &self.key
    }

    pub fn policy(&self) -> FetchPolicy {
        self.policy
    }

    pub fn is_disposed(&self) -> bool {
        matches!(self.source, Source::Disposed)
    }

    /// Whether this handle issued (or joined) a network fetch.
    pub fn hit_network(&self) -> bool {
        matches!(self.source, Source::Network { .. })
    }

    /// Whether a read right now would return data without suspending.
    pub fn is_ready(&self) -> bool {
        match &self.source {
            Source::Store(_) => true,
            Source::Network { cached, fetch } => {
                cached.is_some() || matches!(*fetch.borrow(), FetchState::Resolved(_))
            }
            Source::Missing | Source::Disposed => false,
        }
    }

    /// End this handle's lifetime.
    ///
    /// Any fetch it started is left to complete and still lands in the
    /// store; this handle just stops observing it.
    pub fn dispose(&mut self) {
        if !self.is_disposed() {
            tracing::debug!(query = self.query, id = %self.id, "disposing preloaded query");
            self.source = Source::Disposed;
        }
    }

    /// Receiver for subsequent settlements, if this handle tracks a fetch.
    pub(crate) fn watch(&self) -> Option<watch::Receiver<FetchState>> {
        match &self.source {
            Source::Network { fetch, .. } => Some(fetch.clone()),
            _ => None,
        }
    }
}

impl std::fmt::Debug for PreloadedQuery {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PreloadedQuery")
            .field("id", &self.id)
            .field("key", &self.key)
            .field("policy", &self.policy)
            .field("ready", &self.is_ready())
            .field("disposed", &self.is_disposed())
            .finish()
    }
}

/// Start resolving `query` and return a handle without blocking.
///
/// Must run inside a Tokio runtime when the policy may hit the network.
/// Fetch failures never fail the preload; they are observed by [`read`].
pub fn preload(
    env: &Environment,
    query: &QueryDefinition,
    variables: Variables,
    policy: FetchPolicy,
) -> PreloadedQuery {
    let key = QueryKey::new(query, &variables);

    let source = match policy {
        FetchPolicy::StoreOrNetwork => match env.lookup_fresh(&key) {
            Some(entry) => Source::Store(entry.data),
            None => Source::Network {
                cached: None,
                fetch: env.fetch(query, &variables, &key),
            },
        },
        FetchPolicy::StoreAndNetwork => Source::Network {
            cached: env.lookup(&key).map(|entry| entry.data),
            fetch: env.fetch(query, &variables, &key),
        },
        FetchPolicy::NetworkOnly => Source::Network {
            cached: None,
            fetch: env.fetch(query, &variables, &key),
        },
        FetchPolicy::StoreOnly => env
            .lookup(&key)
            .map(|entry| Source::Store(entry.data))
            .unwrap_or(Source::Missing),
    };

    let handle = PreloadedQuery {
        id: Uuid::new_v4(),
        query: query.name(),
        key,
        policy,
        source,
    };
    tracing::debug!(
        query = handle.query,
        id = %handle.id,
        %policy,
        network = handle.hit_network(),
        ready = handle.is_ready(),
        "preloaded query"
    );
    handle
}

/// Read the data behind `handle`.
///
/// Returns data synchronously when the handle is settled (or has cached
/// data to serve while refreshing), suspends while the fetch is in flight,
/// and surfaces fetch failures as errors. Never starts a fetch.
pub fn read(query: &QueryDefinition, handle: &PreloadedQuery) -> Result<Arc<Value>, Interrupt> {
    if handle.query != query.name() {
        return Err(QueryError::HandleMismatch {
            expected: query.name(),
            found: handle.query,
        }
        .into());
    }

    match &handle.source {
        Source::Store(data) => Ok(data.clone()),
        Source::Missing => Err(QueryError::MissingFromStore(handle.query).into()),
        Source::Disposed => Err(QueryError::Disposed(handle.query).into()),
        Source::Network { cached, fetch } => {
            let state = fetch.borrow().clone();
            match (state, cached) {
                (FetchState::Resolved(data), _) => Ok(data),
                (FetchState::Failed(err), Some(data)) => {
                    tracing::warn!(
                        query = handle.query,
                        error = %err,
                        "refresh failed, serving cached data"
                    );
                    Ok(data.clone())
                }
                (FetchState::Failed(err), None) => Err(QueryError::Fetch(err).into()),
                (FetchState::Pending, Some(data)) => Ok(data.clone()),
                (FetchState::Pending, None) => {
                    if fetch.has_changed().is_err() {
                        return Err(QueryError::Abandoned(handle.query).into());
                    }
                    tracing::debug!(query = handle.query, id = %handle.id, "suspending read");
                    Err(Interrupt::Suspend(Suspension {
                        query: handle.query,
                        fetch: fetch.clone(),
                    }))
                }
            }
        }
    }
}

/// [`read`], then decode the data into a typed response.
pub fn read_as<R: DeserializeOwned>(
    query: &QueryDefinition,
    handle: &PreloadedQuery,
) -> Result<R, Interrupt> {
    let data = read(query, handle)?;
    R::deserialize(data.as_ref()).map_err(|err| {
        Interrupt::Error(QueryError::Decode {
            query: query.name(),
            message: err.to_string(),
        })
    })
}
