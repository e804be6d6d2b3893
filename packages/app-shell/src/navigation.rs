//! Root navigator: header plus the active screen

use suspense::{Component, Environment, Interrupt, RenderContext, Suspense, View};

use crate::header::Header;
use crate::state::AppContext;

/// Screens reachable from the drawer
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum Route {
    #[default]
    Home,
    Temp,
}

impl Route {
    pub fn label(&self) -> &'static str {
        match self {
            Route::Home => "Home",
            Route::Temp => "Temp",
        }
    }
}

pub struct RootNavigator {
    ctx: AppContext,
    route: Route,
    header: Suspense<Header>,
}

impl RootNavigator {
    pub fn new(env: Environment, ctx: AppContext) -> Self {
        Self {
            ctx,
            route: Route::default(),
            header: Header::with_boundary(env),
        }
    }

    pub fn route(&self) -> Route {
        self.route
    }

    pub fn navigate(&mut self, route: Route) {
        tracing::debug!(from = self.route.label(), to = route.label(), "navigating");
        self.route = route;
    }

    fn screen(&self) -> View {
        let body = match (self.route, self.ctx.current_user()) {
            (Route::Home, Some(user)) => View::text(format!("Signed in as {}", user.display_name())),
            (Route::Home, None) => View::text("Not signed in"),
            (Route::Temp, _) => View::text("Temp"),
        };
        View::node(self.route.label(), vec![body])
    }
}

impl Component for RootNavigator {
    fn name(&self) -> &'static str {
        "RootNavigator"
    }

    fn render(&mut self, cx: &mut RenderContext<'_>) -> Result<View, Interrupt> {
        let header = cx.render_child(&mut self.header)?;
        Ok(View::node("RootNavigator", vec![header, self.screen()]))
    }
}
