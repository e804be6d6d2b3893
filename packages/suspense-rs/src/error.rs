//! Error types for fetching, reading, and rendering.
//!
//! Every error here is `Clone`: one fetch settlement fans out to every
//! handle and every render pass that observes it.

use thiserror::Error;

/// Failure reported by a [`Network`](crate::Network) while executing a query.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FetchError {
    /// Transport-level failure (connection refused, timeout, bad status).
    #[error("network error: {0}")]
    Network(String),

    /// The server answered with a GraphQL `errors` array.
    #[error("GraphQL error: {0}")]
    GraphQL(String),

    /// The server answered without `data` and without errors.
    #[error("no data returned")]
    NoData,
}

/// Error observed when reading a preloaded query.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum QueryError {
    /// The fetch backing the handle failed and no cached data was available.
    #[error(transparent)]
    Fetch(#[from] FetchError),

    /// The handle was produced by a preload of a different query.
    #[error("handle was preloaded for `{found}`, not `{expected}`")]
    HandleMismatch {
        expected: &'static str,
        found: &'static str,
    },

    /// The handle was disposed before it was read.
    #[error("preloaded query `{0}` was disposed")]
    Disposed(&'static str),

    /// A `store-only` preload found nothing in the record store.
    #[error("query `{0}` is not available in the store")]
    MissingFromStore(&'static str),

    /// The fetch task went away without settling the handle.
    #[error("fetch for `{0}` ended without settling")]
    Abandoned(&'static str),

    /// The resolved data did not match the requested response type.
    #[error("failed to decode `{query}` response: {message}")]
    Decode {
        query: &'static str,
        message: String,
    },
}

/// Error returned by the [`Renderer`](crate::Renderer) for a render pass.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RenderError {
    /// A query error reached the root without an `ErrorBoundary` to catch it.
    #[error("uncaught render error: {0}")]
    Uncaught(#[from] QueryError),
}

/// Error returned when parsing a [`FetchPolicy`](crate::FetchPolicy) name.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown fetch policy `{0}`")]
pub struct ParsePolicyError(pub String);
