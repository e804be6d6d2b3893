//! Root application component and the scaffold it mounts in

use suspense::{
    Component, Environment, ErrorBoundary, FetchPolicy, Interrupt, RenderContext, Suspense,
    Variables, View,
};

use crate::graphql::USER_QUERY;
use crate::navigation::RootNavigator;
use crate::state::AppContext;
use crate::types::AppUserQueryResponse;

/// Placeholder shown while the current user is loading.
pub const APP_FALLBACK: &str = "App fallback...";

/// Error boundary → suspense boundary → app root.
pub type AppScaffold = ErrorBoundary<Suspense<AppRoot>>;

/// Root application component
///
/// Loads the current user, copies it into the [`AppContext`] whenever a
/// new non-null value commits, and renders the navigator. A null `me`
/// renders normally and leaves the context untouched.
pub struct AppRoot {
    env: Environment,
    ctx: AppContext,
    navigator: RootNavigator,
}

impl AppRoot {
    pub fn new(env: Environment, ctx: AppContext) -> Self {
        let navigator = RootNavigator::new(env.clone(), ctx.clone());
        Self { env, ctx, navigator }
    }

    pub fn navigator(&self) -> &RootNavigator {
        &self.navigator
    }

    pub fn navigator_mut(&mut self) -> &mut RootNavigator {
        &mut self.navigator
    }
}

impl Component for AppRoot {
    fn name(&self) -> &'static str {
        "App"
    }

    fn render(&mut self, cx: &mut RenderContext<'_>) -> Result<View, Interrupt> {
        let AppUserQueryResponse { me } = cx.use_query_as(
            &self.env,
            &USER_QUERY,
            Variables::new(),
            FetchPolicy::StoreOrNetwork,
        )?;

        if let Some(me) = me {
            let ctx = self.ctx.clone();
            cx.use_effect("propagate-user", me.clone(), move || ctx.set_user(me));
        }

        cx.render_child(&mut self.navigator)
    }
}

/// Build the scaffold the bootstrap gate mounts once assets are ready.
pub fn scaffold(env: Environment, ctx: AppContext) -> AppScaffold {
    ErrorBoundary::new(
        |err| View::node("Error", vec![View::text(format!("Something went wrong: {err}"))]),
        Suspense::new(APP_FALLBACK, AppRoot::new(env, ctx)),
    )
}
