//! The network seam used by the [`Environment`](crate::Environment).

use async_trait::async_trait;
use serde_json::Value;

use crate::error::FetchError;
use crate::query::{QueryDefinition, Variables};

/// Executes a query against a remote source.
///
/// Implementations return the response's `data` object. The environment
/// owns caching and dedupe; a network only moves bytes.
#[async_trait]
pub trait Network: Send + Sync + 'static {
    async fn execute(
        &self,
        query: &QueryDefinition,
        variables: &Variables,
    ) -> Result<Value, FetchError>;
}
