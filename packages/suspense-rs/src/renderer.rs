//! Cooperative render scheduler.
//!
//! The [`Renderer`] drives a root component on the caller's task. Each
//! pass renders the whole tree from scratch:
//!
//! - completed pass: queued effects commit, the view is returned
//! - suspended pass (no boundary caught it): everything queued is discarded
//!   and the caller awaits [`Renderer::wait_for_suspensions`] before
//!   rendering again
//! - failed pass (no boundary caught it): discarded, returned as
//!   [`RenderError::Uncaught`]
//!
//! Effects that ran during a commit may have changed state the tree reads,
//! so a commit that ran effects is followed by another pass, up to
//! [`MAX_EFFECT_PASSES`].

use futures::future::select_all;
use tokio::sync::watch;

use crate::error::{QueryError, RenderError};
use crate::preload::{FetchState, Interrupt, Suspension};
use crate::render::{Component, PassState, RenderContext, Scope, View};

/// Upper bound on consecutive passes triggered by committed effects.
pub const MAX_EFFECT_PASSES: usize = 16;

/// Result of one [`Renderer::render`] call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Frame {
    /// The pass completed; boundaries inside may still show fallbacks.
    Committed(View),
    /// The root itself suspended; nothing was committed.
    Suspended,
}

/// Counters for observing the scheduler in tests and logs.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RenderStats {
    pub passes: usize,
    pub commits: usize,
    pub suspended_passes: usize,
    pub effects: usize,
}

/// Drives render passes for a root component.
pub struct Renderer<C> {
    root: C,
    scope: Scope,
    suspensions: Vec<Suspension>,
    observed: Vec<watch::Receiver<FetchState>>,
    caught: Vec<QueryError>,
    stats: RenderStats,
}

impl<C: Component> Renderer<C> {
    pub fn new(root: C) -> Self {
        Self {
            root,
            scope: Scope::new(),
            suspensions: Vec::new(),
            observed: Vec::new(),
            caught: Vec::new(),
            stats: RenderStats::default(),
        }
    }

    pub fn root(&self) -> &C {
        &self.root
    }

    pub fn root_mut(&mut self) -> &mut C {
        &mut self.root
    }

    /// Hook scope of the root component.
    pub fn scope(&self) -> Option<&Scope> {
        self.scope.child(self.root.name())
    }

    pub fn stats(&self) -> RenderStats {
        self.stats
    }

    /// Whether the last pass left any subtree suspended.
    pub fn is_settled(&self) -> bool {
        self.suspensions.is_empty()
    }

    pub fn pending_suspensions(&self) -> usize {
        self.suspensions.len()
    }

    /// Errors caught by error boundaries during the last pass.
    pub fn caught_errors(&self) -> &[QueryError] {
        &self.caught
    }

    /// Render until no committed effect asks for another pass.
    pub fn render(&mut self) -> Result<Frame, RenderError> {
        let mut frame = Frame::Suspended;
        for _ in 0..MAX_EFFECT_PASSES {
            let (next, effects) = self.pass()?;
            frame = next;
            if effects == 0 {
                return Ok(frame);
            }
        }

        tracing::warn!(
            passes = MAX_EFFECT_PASSES,
            "effects kept re-triggering renders, returning last frame"
        );
        Ok(frame)
    }

    fn pass(&mut self) -> Result<(Frame, usize), RenderError> {
        let mut state = PassState::default();
        self.scope.begin_pass();
        self.stats.passes += 1;

        let result = {
            let mut cx = RenderContext::new(&mut self.scope, &mut state);
            cx.render_child(&mut self.root)
        };

        self.observed = state.observed;
        self.caught = state.caught;
        self.suspensions = state.suspensions;

        match result {
            Ok(view) => {
                let effects = self.scope.commit();
                self.stats.commits += 1;
                self.stats.effects += effects;
                tracing::debug!(
                    root = self.root.name(),
                    effects,
                    suspended = self.suspensions.len(),
                    "committed render pass"
                );
                Ok((Frame::Committed(view), effects))
            }
            Err(Interrupt::Suspend(suspension)) => {
                self.scope.discard();
                self.stats.suspended_passes += 1;
                tracing::debug!(
                    root = self.root.name(),
                    query = suspension.query(),
                    "root suspended, pass discarded"
                );
                self.suspensions.push(suspension);
                Ok((Frame::Suspended, 0))
            }
            Err(Interrupt::Error(err)) => {
                self.scope.discard();
                self.suspensions.clear();
                tracing::error!(root = self.root.name(), error = %err, "uncaught render error");
                Err(RenderError::Uncaught(err))
            }
        }
    }

    /// Wait until at least one suspension from the last pass settles.
    pub async fn wait_for_suspensions(&mut self) {
        if self.suspensions.is_empty() {
            return;
        }
        let waits = self
            .suspensions
            .drain(..)
            .map(|suspension| Box::pin(suspension.settled()));
        select_all(waits).await;
    }

    /// Render, waiting out suspensions, until a pass commits with nothing
    /// left suspended.
    pub async fn run_until_settled(&mut self) -> Result<View, RenderError> {
        loop {
            match self.render()? {
                Frame::Committed(view) if self.suspensions.is_empty() => return Ok(view),
                _ => self.wait_for_suspensions().await,
            }
        }
    }

    /// Wait for data observed by the last pass to change (e.g. a
    /// background refresh landing).
    ///
    /// Returns `false` when nothing observed can change anymore.
    pub async fn next_update(&mut self) -> bool {
        let mut live: Vec<watch::Receiver<FetchState>> = self.observed.drain(..).collect();

        while !live.is_empty() {
            let waits = live.iter_mut().map(|rx| Box::pin(rx.changed()));
            let (result, index, rest) = select_all(waits).await;
            drop(rest);

            if result.is_ok() {
                return true;
            }
            live.swap_remove(index);
        }
        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::environment::Environment;
    use crate::policy::FetchPolicy;
    use crate::query::{QueryDefinition, Variables};
    use crate::testing::MockNetwork;
    use crate::{ErrorBoundary, FetchError, Suspense};
    use serde_json::json;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    const ME: QueryDefinition = QueryDefinition::new("Me", "query Me { me { id } }");

    struct Profile {
        env: Environment,
        policy: FetchPolicy,
        committed: Arc<AtomicUsize>,
        renders: usize,
    }

    impl Component for Profile {
        fn name(&self) -> &'static str {
            "Profile"
        }

        fn render(&mut self, cx: &mut RenderContext<'_>) -> Result<View, Interrupt> {
            self.renders += 1;
            let data = cx.use_query(&self.env, &ME, Variables::new(), self.policy)?;
            let committed = self.committed.clone();
            cx.use_effect("seen", data.to_string(), move || {
                committed.fetch_add(1, Ordering::SeqCst);
            });
            Ok(View::text(data["me"]["id"].to_string()))
        }
    }

    fn profile(env: &Environment, policy: FetchPolicy) -> Profile {
        Profile {
            env: env.clone(),
            policy,
            committed: Arc::new(AtomicUsize::new(0)),
            renders: 0,
        }
    }

    #[tokio::test]
    async fn suspended_root_retries_and_commits_once() {
        let network = Arc::new(MockNetwork::new());
        network.hold("Me");
        network.respond("Me", Ok(json!({"me": {"id": "1"}})));
        let env = Environment::new(network.clone());
        let mut renderer = Renderer::new(profile(&env, FetchPolicy::StoreOrNetwork));

        assert_eq!(renderer.render().unwrap(), Frame::Suspended);
        assert_eq!(renderer.pending_suspensions(), 1);
        assert_eq!(renderer.root().committed.load(Ordering::SeqCst), 0);

        network.release("Me");
        let view = renderer.run_until_settled().await.unwrap();

        assert_eq!(view, View::text("\"1\""));
        assert_eq!(renderer.root().committed.load(Ordering::SeqCst), 1);
        assert!(renderer.stats().suspended_passes >= 1);
        assert_eq!(network.requests_for("Me"), 1);
    }

    #[tokio::test]
    async fn rerender_reuses_handle_without_refetching() {
        let network = Arc::new(MockNetwork::new());
        network.respond("Me", Ok(json!({"me": {"id": "1"}})));
        let env = Environment::new(network.clone());
        let mut renderer = Renderer::new(profile(&env, FetchPolicy::NetworkOnly));

        renderer.run_until_settled().await.unwrap();
        let handle_id = renderer.scope().unwrap().query(&ME).unwrap().id();
        renderer.render().unwrap();
        renderer.render().unwrap();

        assert_eq!(renderer.scope().unwrap().query(&ME).unwrap().id(), handle_id);
        assert_eq!(network.requests_for("Me"), 1);
        assert_eq!(renderer.root().committed.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn suspense_boundary_shows_fallback() {
        let network = Arc::new(MockNetwork::new());
        network.hold("Me");
        network.respond("Me", Ok(json!({"me": {"id": "1"}})));
        let env = Environment::new(network.clone());
        let mut renderer = Renderer::new(Suspense::new("loading", profile(&env, FetchPolicy::StoreOrNetwork)));

        assert_eq!(renderer.render().unwrap(), Frame::Committed(View::fallback("loading")));
        assert!(!renderer.is_settled());

        network.release("Me");
        let view = renderer.run_until_settled().await.unwrap();
        assert_eq!(view, View::text("\"1\""));
    }

    #[tokio::test]
    async fn uncaught_error_is_returned() {
        let network = Arc::new(MockNetwork::new());
        network.respond("Me", Err(FetchError::Network("offline".into())));
        let env = Environment::new(network.clone());
        let mut renderer = Renderer::new(profile(&env, FetchPolicy::StoreOrNetwork));

        let err = renderer.run_until_settled().await.unwrap_err();
        assert_eq!(
            err,
            RenderError::Uncaught(QueryError::Fetch(FetchError::Network("offline".into())))
        );
        assert_eq!(renderer.root().committed.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn error_boundary_catches_failure() {
        let network = Arc::new(MockNetwork::new());
        network.respond("Me", Err(FetchError::GraphQL("boom".into())));
        let env = Environment::new(network.clone());
        let mut renderer = Renderer::new(ErrorBoundary::new(
            |err| View::text(format!("failed: {err}")),
            Suspense::new("loading", profile(&env, FetchPolicy::StoreOrNetwork)),
        ));

        let view = renderer.run_until_settled().await.unwrap();
        assert_eq!(view, View::text("failed: GraphQL error: boom"));
        assert_eq!(renderer.caught_errors().len(), 1);
    }

    const SETTINGS: QueryDefinition = QueryDefinition::new("Settings", "query Settings { settings }");

    struct Settings {
        env: Environment,
    }

    impl Component for Settings {
        fn name(&self) -> &'static str {
            "Settings"
        }

        fn render(&mut self, cx: &mut RenderContext<'_>) -> Result<View, Interrupt> {
            let data = cx.use_query(&self.env, &SETTINGS, Variables::new(), FetchPolicy::StoreAndNetwork)?;
            Ok(View::text(data["settings"].to_string()))
        }
    }

    struct Account {
        env: Environment,
        id: u32,
        settings: Settings,
    }

    impl Component for Account {
        fn name(&self) -> &'static str {
            "Account"
        }

        fn render(&mut self, cx: &mut RenderContext<'_>) -> Result<View, Interrupt> {
            let variables = Variables::new().with("id", self.id);
            let data = cx.use_query(&self.env, &ME, variables, FetchPolicy::StoreOrNetwork)?;
            let settings = cx.render_child(&mut self.settings)?;
            Ok(View::node("Account", vec![View::text(data["me"]["id"].to_string()), settings]))
        }
    }

    #[tokio::test]
    async fn resuspended_subtree_keeps_child_handles() {
        let network = Arc::new(MockNetwork::new());
        network.respond("Me", Ok(json!({"me": {"id": "1"}})));
        network.respond("Settings", Ok(json!({"settings": "dark"})));
        let env = Environment::new(network.clone());
        let account = Account {
            env: env.clone(),
            id: 1,
            settings: Settings { env: env.clone() },
        };
        let mut renderer = Renderer::new(Suspense::new("loading", account));

        renderer.run_until_settled().await.unwrap();
        let settings_scope = |renderer: &Renderer<Suspense<Account>>| {
            renderer
                .scope()
                .and_then(|scope| scope.child("Account"))
                .and_then(|scope| scope.child("Settings"))
                .and_then(|scope| scope.query(&SETTINGS))
                .map(|handle| handle.id())
        };
        let handle_id = settings_scope(&renderer).unwrap();
        assert_eq!(network.requests_for("Settings"), 1);

        network.hold("Me");
        renderer.root_mut().child_mut().id = 2;
        assert_eq!(renderer.render().unwrap(), Frame::Committed(View::fallback("loading")));
        assert_eq!(settings_scope(&renderer), Some(handle_id));

        network.release("Me");
        let view = renderer.run_until_settled().await.unwrap();

        assert!(view.contains_text("dark"));
        assert_eq!(settings_scope(&renderer), Some(handle_id));
        assert_eq!(network.requests_for("Settings"), 1);
        assert_eq!(network.requests_for("Me"), 2);
    }

    #[tokio::test]
    async fn next_update_fires_when_refresh_lands() {
        let network = Arc::new(MockNetwork::new());
        network.hold("Me");
        network.respond("Me", Ok(json!({"me": {"id": "2"}})));
        let env = Environment::new(network.clone());
        env.store().publish(
            crate::QueryKey::new(&ME, &Variables::new()),
            Arc::new(json!({"me": {"id": "1"}})),
        );
        let mut renderer = Renderer::new(profile(&env, FetchPolicy::StoreAndNetwork));

        assert_eq!(renderer.render().unwrap(), Frame::Committed(View::text("\"1\"")));

        network.release("Me");
        assert!(renderer.next_update().await);
        assert_eq!(renderer.render().unwrap(), Frame::Committed(View::text("\"2\"")));
        assert_eq!(renderer.stats().suspended_passes, 0);

        assert!(!renderer.next_update().await);
    }
}
