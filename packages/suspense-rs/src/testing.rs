//! Testing utilities for environments and render trees.
//!
//! # Feature Flag
//!
//! This module is only available with the `testing` feature:
//!
//! ```toml
//! [dev-dependencies]
//! suspense = { version = "0.1", features = ["testing"] }
//! ```
//!
//! # Quick Start
//!
//! ```ignore
//! use std::sync::Arc;
//! use suspense::testing::MockNetwork;
//!
//! let network = Arc::new(MockNetwork::new());
//! network.respond("AppUserQuery", Ok(json!({"me": null})));
//! network.hold("AppUserQuery");            // keep the request in flight
//!
//! let env = Environment::new(network.clone());
//! // ... render, observe the suspension ...
//! network.release("AppUserQuery");         // let it land
//! assert_eq!(network.requests_for("AppUserQuery"), 1);
//! ```

use std::collections::{HashMap, VecDeque};
use std::sync::{Mutex, PoisonError};

use async_trait::async_trait;
use serde_json::Value;
use tokio::sync::watch;

use crate::error::FetchError;
use crate::network::Network;
use crate::query::{QueryDefinition, Variables};

type Scripted = Result<Value, FetchError>;

/// Scripted [`Network`] that records every request.
///
/// Responses are queued per query name and consumed in order. The last
/// response for a query is repeated once its queue runs down to one entry,
/// so a single `respond` serves any number of refetches. A query with no
/// scripted response fails with [`FetchError::Network`].
#[derive(Default)]
pub struct MockNetwork {
    responses: Mutex<HashMap<String, VecDeque<Scripted>>>,
    gates: Mutex<HashMap<String, watch::Sender<bool>>>,
    requests: Mutex<Vec<(String, Variables)>>,
}

impl MockNetwork {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a response for the next request of `query`.
    pub fn respond(&self, query: &str, response: Scripted) {
        self.responses
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .entry(query.to_string())
            .or_default()
            .push_back(response);
    }

    /// Hold requests for `query` in flight until [`release`](Self::release).
    pub fn hold(&self, query: &str) {
        let (tx, _rx) = watch::channel(false);
        self.gates
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(query.to_string(), tx);
    }

    /// Let held requests for `query` complete.
    pub fn release(&self, query: &str) {
        if let Some(gate) = self
            .gates
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(query)
        {
            gate.send_replace(true);
        }
    }

    /// Total number of requests received.
    pub fn request_count(&self) -> usize {
        self.requests.lock().unwrap_or_else(PoisonError::into_inner).len()
    }

    /// Number of requests received for `query`.
    pub fn requests_for(&self, query: &str) -> usize {
        self.requests
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .filter(|(name, _)| name == query)
            .count()
    }

    /// Query names in the order they were requested.
    pub fn request_log(&self) -> Vec<String> {
        self.requests
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .map(|(name, _)| name.clone())
            .collect()
    }

    fn next_response(&self, query: &str) -> Scripted {
        let mut responses = self.responses.lock().unwrap_or_else(PoisonError::into_inner);
        match responses.get_mut(query) {
            Some(queue) if queue.len() > 1 => queue
                .pop_front()
                .unwrap_or_else(|| Err(FetchError::NoData)),
            Some(queue) => queue
                .front()
                .cloned()
                .unwrap_or_else(|| Err(FetchError::Network(format!("no scripted response for {query}")))),
            None => Err(FetchError::Network(format!("no scripted response for {query}"))),
        }
    }
}

#[async_trait]
impl Network for MockNetwork {
    async fn execute(
        &self,
        query: &QueryDefinition,
        variables: &Variables,
    ) -> Result<Value, FetchError> {
        self.requests
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push((query.name().to_string(), variables.clone()));

        let gate = self
            .gates
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(query.name())
            .map(watch::Sender::subscribe);
        if let Some(mut gate) = gate {
            let _ = gate.wait_for(|open| *open).await;
        }

        self.next_response(query.name())
    }
}
