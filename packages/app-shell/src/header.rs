//! Header with its own preload/suspend cycle for the signed-in user

use suspense::{Component, Environment, FetchPolicy, Interrupt, RenderContext, Suspense, Variables, View};

use crate::graphql::HEADER_QUERY;
use crate::types::{HeaderQueryResponse, HeaderUser};

/// Placeholder shown while the header's first fetch is in flight.
pub const HEADER_FALLBACK: &str = "Header pending...";

/// App header: menu button plus the user widget.
///
/// Uses `store-and-network` so a cached avatar renders immediately while a
/// fresh copy is fetched in the background. Its handle is unrelated to the
/// app root's user query.
pub struct Header {
    env: Environment,
}

impl Header {
    pub fn new(env: Environment) -> Self {
        Self { env }
    }

    /// The header wrapped in its own suspense boundary.
    pub fn with_boundary(env: Environment) -> Suspense<Header> {
        Suspense::new(HEADER_FALLBACK, Self::new(env))
    }
}

impl Component for Header {
    fn name(&self) -> &'static str {
        "Header"
    }

    fn render(&mut self, cx: &mut RenderContext<'_>) -> Result<View, Interrupt> {
        let HeaderQueryResponse { me } = cx.use_query_as(
            &self.env,
            &HEADER_QUERY,
            Variables::new(),
            FetchPolicy::StoreAndNetwork,
        )?;

        tracing::debug!(?me, "header rendering");

        Ok(View::node(
            "Header",
            vec![
                View::node("Menu", vec![View::text("Menu")]),
                header_right_widget(me.as_ref()),
            ],
        ))
    }
}

/// Right-hand widget: who is signed in, or a sign-in prompt.
pub fn header_right_widget(user: Option<&HeaderUser>) -> View {
    let children = match user {
        Some(user) => {
            let mut children = vec![View::text(user.name.as_deref().unwrap_or(&user.id))];
            if let Some(photo) = &user.photo_url {
                children.push(View::text(format!("avatar: {photo}")));
            }
            children
        }
        None => vec![View::text("Sign in")],
    };
    View::node("HeaderRightWidget", children)
}
