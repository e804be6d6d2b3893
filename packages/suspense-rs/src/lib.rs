//! # Suspense
//!
//! Preload-then-suspend query loading for client UIs: queries are issued
//! before the component that needs them renders, the component reads a
//! handle that either yields data or suspends the render pass, and the
//! renderer retries the pass once the handle settles.
//!
//! ## Core Concepts
//!
//! - [`Environment`] = network + record cache + in-flight request table
//! - [`preload`] = start resolution now, get a [`PreloadedQuery`] back
//! - [`read`] = pure function of the handle's settlement: data or [`Interrupt`]
//! - [`Renderer`] = cooperative scheduler that re-runs suspended passes
//!
//! The key principle: **issue work early, read it late**. A read never
//! starts a fetch; it only observes one that a preload already started.
//!
//! ## Architecture
//!
//! ```text
//! Component.render()
//!     │
//!     ├─► cx.use_preloaded_query() ──► preload() ──► Environment
//!     │                                                │
//!     │                                 cache hit ◄────┤
//!     │                                                ▼
//!     │                                   tokio::spawn(Network.execute)
//!     │                                                │
//!     │                                                ▼ publish
//!     │                                          RecordStore
//!     │
//!     └─► read(handle)
//!            ├─► Ok(data)              ─► effects queued on the scope
//!            ├─► Interrupt::Suspend    ─► pass discarded, Renderer awaits
//!            └─► Interrupt::Error      ─► nearest ErrorBoundary
//!
//! Renderer
//!     ├─► pass succeeded ─► Scope.commit() (effects run at most once)
//!     └─► pass suspended ─► Scope.discard(), wait, re-render from scratch
//! ```
//!
//! ## Key Invariants
//!
//! 1. **Preload precedes read** - a read needs a handle, and only `preload` makes one
//! 2. **Reads are idempotent** - same settlement, same `Arc`, no second fetch
//! 3. **Effects commit at most once** - only for passes that complete
//! 4. **Fetch errors surface** - reads never swallow a failure without cached data
//! 5. **Handles are not cancelled** - a dropped handle's fetch still lands in the store
//!
//! ## Example
//!
//! ```ignore
//! use suspense::{Component, Environment, FetchPolicy, Interrupt, QueryDefinition,
//!     RenderContext, Renderer, Variables, View};
//!
//! const USER_QUERY: QueryDefinition =
//!     QueryDefinition::new("AppUserQuery", "query AppUserQuery { me { id } }");
//!
//! struct Profile { env: Environment }
//!
//! impl Component for Profile {
//!     fn name(&self) -> &'static str { "Profile" }
//!
//!     fn render(&mut self, cx: &mut RenderContext<'_>) -> Result<View, Interrupt> {
//!         let data = cx.use_query(&self.env, &USER_QUERY, Variables::new(), FetchPolicy::StoreOrNetwork)?;
//!         Ok(View::text(data.to_string()))
//!     }
//! }
//!
//! let mut renderer = Renderer::new(Profile { env });
//! let view = renderer.run_until_settled().await?;
//! ```

mod boundary;
mod environment;
mod error;
mod network;
mod policy;
mod preload;
mod query;
mod render;
mod renderer;
mod store;

// Testing utilities (feature-gated)
#[cfg(any(test, feature = "testing"))]
pub mod testing;

pub use boundary::{ErrorBoundary, Suspense};
pub use environment::{Environment, EnvironmentConfig};
pub use error::{FetchError, ParsePolicyError, QueryError, RenderError};
pub use network::Network;
pub use policy::FetchPolicy;
pub use preload::{preload, read, read_as, FetchState, Interrupt, PreloadedQuery, Suspension};
pub use query::{QueryDefinition, QueryKey, Variables};
pub use render::{Component, RenderContext, Scope, View};
pub use renderer::{Frame, RenderStats, Renderer};
pub use store::{CacheEntry, RecordStore, SnapshotEntry, StoreSnapshot};

// Re-export commonly used external types
pub use async_trait::async_trait;
