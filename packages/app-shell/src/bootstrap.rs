//! Bootstrap gate: hold the app back until assets are prefetched
//!
//! ```text
//! AssetsLoading ──(all prefetches settled)──► Ready
//! ```
//!
//! The transition happens at most once and never reverses. While loading,
//! only the placeholder renders; the app subtree (and every query it
//! would issue) is not rendered at all.

use std::sync::Arc;

use suspense::{Component, Interrupt, RenderContext, View};

use crate::assets::{AssetPrewarmer, AssetRef, PrefetchReport};

/// Placeholder shown while assets load.
pub const LOADING_PLACEHOLDER: &str = "Loading assets...";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GateState {
    AssetsLoading,
    Ready,
}

pub struct BootstrapGate<C> {
    state: GateState,
    prewarmer: Arc<dyn AssetPrewarmer>,
    assets: Vec<AssetRef>,
    report: Option<PrefetchReport>,
    app: C,
}

impl<C: Component> BootstrapGate<C> {
    pub fn new(prewarmer: Arc<dyn AssetPrewarmer>, assets: Vec<AssetRef>, app: C) -> Self {
        Self {
            state: GateState::AssetsLoading,
            prewarmer,
            assets,
            report: None,
            app,
        }
    }

    pub fn state(&self) -> GateState {
        self.state
    }

    /// Prefetch outcome, once the gate is ready.
    pub fn report(&self) -> Option<&PrefetchReport> {
        self.report.as_ref()
    }

    pub fn app(&self) -> &C {
        &self.app
    }

    pub fn app_mut(&mut self) -> &mut C {
        &mut self.app
    }

    /// Prefetch every asset, then open the gate.
    ///
    /// Individual failures are tolerated. Calling this again once ready
    /// does nothing.
    pub async fn load_assets(&mut self) -> GateState {
        if self.state == GateState::Ready {
            return self.state;
        }

        tracing::info!(assets = self.assets.len(), "prefetching assets");
        let report = self.prewarmer.prefetch_all(&self.assets).await;
        self.open(report);
        self.state
    }

    fn open(&mut self, report: PrefetchReport) {
        if self.state == GateState::Ready {
            return;
        }
        tracing::info!(
            loaded = report.loaded.len(),
            failed = report.failed.len(),
            "assets settled, mounting app"
        );
        self.report = Some(report);
        self.state = GateState::Ready;
    }
}

impl<C: Component> Component for BootstrapGate<C> {
    fn name(&self) -> &'static str {
        "BootstrapGate"
    }

    fn render(&mut self, cx: &mut RenderContext<'_>) -> Result<View, Interrupt> {
        match self.state {
            GateState::AssetsLoading => Ok(View::fallback(LOADING_PLACEHOLDER)),
            GateState::Ready => cx.render_child(&mut self.app),
        }
    }
}
