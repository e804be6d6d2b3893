//! App shell: gated bootstrap for a GraphQL-backed client.
//!
//! Startup runs in two phases:
//!
//! ```text
//! ┌───────────────┐  assets settled  ┌────────────────────────────────────┐
//! │ BootstrapGate │ ───────────────▶ │ ErrorBoundary                      │
//! │ "Loading..."  │                  │  └─ Suspense ("App fallback...")   │
//! └───────────────┘                  │      └─ AppRoot (AppUserQuery)     │
//!                                    │          ├─ set_user effect        │
//!                                    │          └─ RootNavigator          │
//!                                    │              ├─ Suspense          │
//!                                    │              │   └─ Header        │
//!                                    │              └─ screen            │
//!                                    └────────────────────────────────────┘
//! ```
//!
//! The gate holds back every data query until the icon set has been
//! prefetched (or failed to). The app then preloads the current user
//! store-or-network and publishes it into [`AppContext`] once the render
//! commits. The header reads store-and-network, so cached data shows
//! immediately and a background refresh re-renders it in place.

pub mod app;
pub mod assets;
pub mod bootstrap;
pub mod cache;
pub mod config;
pub mod graphql;
pub mod header;
pub mod navigation;
pub mod state;
pub mod types;

pub use app::{scaffold, AppRoot, AppScaffold, APP_FALLBACK};
pub use assets::{icon_assets, AssetPrewarmer, AssetRef, HttpAssetPrewarmer, PrefetchReport};
pub use bootstrap::{BootstrapGate, GateState, LOADING_PLACEHOLDER};
pub use config::AppConfig;
pub use header::{Header, HEADER_FALLBACK};
pub use navigation::{RootNavigator, Route};
pub use state::AppContext;
pub use types::User;
