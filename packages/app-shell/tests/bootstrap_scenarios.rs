//! End-to-end bootstrap scenarios against a scripted network.

use std::io;
use std::path::Path;
use std::sync::{Arc, Mutex};

use app_shell::assets::AssetError;
use app_shell::graphql::{HEADER_QUERY, USER_QUERY};
use app_shell::{
    scaffold, AppContext, AppScaffold, AssetPrewarmer, AssetRef, BootstrapGate, GateState, Route,
    User, APP_FALLBACK, HEADER_FALLBACK, LOADING_PLACEHOLDER,
};
use async_trait::async_trait;
use serde_json::json;
use suspense::testing::MockNetwork;
use suspense::{Environment, FetchError, Frame, QueryKey, Renderer, Scope, Variables, View};

/// Prewarmer that fails any asset whose path mentions `search` and records
/// how many network requests had been made when each prefetch ran.
struct ScriptedPrewarmer {
    network: Arc<MockNetwork>,
    requests_seen: Mutex<Vec<usize>>,
}

impl ScriptedPrewarmer {
    fn new(network: Arc<MockNetwork>) -> Self {
        Self {
            network,
            requests_seen: Mutex::new(Vec::new()),
        }
    }
}

#[async_trait]
impl AssetPrewarmer for ScriptedPrewarmer {
    async fn prefetch(&self, asset: &AssetRef) -> Result<(), AssetError> {
        self.requests_seen
            .lock()
            .unwrap()
            .push(self.network.request_count());
        match asset {
            AssetRef::Bundled(path) if path.to_string_lossy().contains("search") => {
                Err(AssetError::Io {
                    path: path.clone(),
                    source: io::Error::new(io::ErrorKind::NotFound, "missing"),
                })
            }
            _ => Ok(()),
        }
    }
}

struct Harness {
    network: Arc<MockNetwork>,
    prewarmer: Arc<ScriptedPrewarmer>,
    env: Environment,
    ctx: AppContext,
    renderer: Renderer<BootstrapGate<AppScaffold>>,
}

fn harness() -> Harness {
    let network = Arc::new(MockNetwork::new());
    let prewarmer = Arc::new(ScriptedPrewarmer::new(network.clone()));
    let env = Environment::new(network.clone());
    let ctx = AppContext::new();
    let gate = BootstrapGate::new(
        prewarmer.clone(),
        app_shell::icon_assets(Path::new("assets")),
        scaffold(env.clone(), ctx.clone()),
    );
    Harness {
        network,
        prewarmer,
        env,
        ctx,
        renderer: Renderer::new(gate),
    }
}

fn ada() -> User {
    User {
        id: "u1".into(),
        email: Some("ada@example.com".into()),
        name: Some("Ada".into()),
        photo_url: Some("https://cdn.example.com/ada.png".into()),
    }
}

fn user_response() -> serde_json::Value {
    json!({"me": {
        "id": "u1",
        "email": "ada@example.com",
        "name": "Ada",
        "photoURL": "https://cdn.example.com/ada.png"
    }})
}

fn header_response(name: &str) -> serde_json::Value {
    json!({"me": {"id": "u1", "name": name, "photoURL": "https://cdn.example.com/ada.png"}})
}

fn scope_at<'a>(scope: &'a Scope, path: &[&str]) -> &'a Scope {
    path.iter().fold(scope, |scope, name| {
        scope
            .child(name)
            .unwrap_or_else(|| panic!("no mounted scope named {name}"))
    })
}

const APP_SCOPE: &[&str] = &["App", "App", "App"];
const HEADER_SCOPE: &[&str] = &["App", "App", "App", "RootNavigator", "Header", "Header"];

#[tokio::test]
async fn cold_cache_suspends_then_propagates_user() {
    let mut h = harness();
    h.network.respond(USER_QUERY.name(), Ok(user_response()));
    h.network.respond(HEADER_QUERY.name(), Ok(header_response("Ada")));
    h.network.hold(USER_QUERY.name());

    h.renderer.root_mut().load_assets().await;
    assert_eq!(
        h.renderer.render().unwrap(),
        Frame::Committed(View::fallback(APP_FALLBACK))
    );
    assert!(h.ctx.current_user().is_none());

    h.network.release(USER_QUERY.name());
    let view = h.renderer.run_until_settled().await.unwrap();

    assert_eq!(h.ctx.current_user(), Some(ada()));
    assert!(view.contains_text("Signed in as Ada"));
    assert!(view.contains_text("avatar: https://cdn.example.com/ada.png"));
    assert!(!view.has_fallback());
    assert_eq!(h.network.requests_for(USER_QUERY.name()), 1);
}

#[tokio::test]
async fn warm_cache_renders_without_fetching_user() {
    let mut h = harness();
    h.env.store().publish(
        QueryKey::new(&USER_QUERY, &Variables::new()),
        Arc::new(user_response()),
    );
    h.env.store().publish(
        QueryKey::new(&HEADER_QUERY, &Variables::new()),
        Arc::new(header_response("Ada")),
    );
    h.network.respond(HEADER_QUERY.name(), Ok(header_response("Ada")));

    h.renderer.root_mut().load_assets().await;
    let Frame::Committed(view) = h.renderer.render().unwrap() else {
        panic!("warm cache should commit on the first pass");
    };

    assert!(!view.has_fallback());
    assert_eq!(h.ctx.current_user(), Some(ada()));
    assert_eq!(h.network.requests_for(USER_QUERY.name()), 0);
    assert_eq!(h.renderer.stats().suspended_passes, 0);
}

#[tokio::test]
async fn header_shows_cached_user_then_refreshes_in_place() {
    let mut h = harness();
    h.env.store().publish(
        QueryKey::new(&USER_QUERY, &Variables::new()),
        Arc::new(user_response()),
    );
    h.env.store().publish(
        QueryKey::new(&HEADER_QUERY, &Variables::new()),
        Arc::new(header_response("Old Name")),
    );
    h.network.hold(HEADER_QUERY.name());
    h.network.respond(HEADER_QUERY.name(), Ok(header_response("New Name")));

    h.renderer.root_mut().load_assets().await;
    let Frame::Committed(first) = h.renderer.render().unwrap() else {
        panic!("cached header should commit");
    };
    assert!(first.contains_text("Old Name"));
    assert!(!first.contains_text(HEADER_FALLBACK));

    h.network.release(HEADER_QUERY.name());
    assert!(h.renderer.next_update().await);

    let Frame::Committed(second) = h.renderer.render().unwrap() else {
        panic!("refresh should commit");
    };
    assert!(second.contains_text("New Name"));
    assert!(!second.has_fallback());
    assert_eq!(h.network.requests_for(HEADER_QUERY.name()), 1);
}

#[tokio::test]
async fn failed_user_query_reaches_error_boundary() {
    let mut h = harness();
    h.network.respond(
        USER_QUERY.name(),
        Err(FetchError::Network("connection refused".into())),
    );

    h.renderer.root_mut().load_assets().await;
    let view = h.renderer.run_until_settled().await.unwrap();

    assert!(view.find("Error").is_some());
    assert!(view.contains_text("connection refused"));
    assert!(h.ctx.current_user().is_none());
    assert_eq!(h.ctx.writes(), 0);
    assert_eq!(h.renderer.caught_errors().len(), 1);
    assert_eq!(h.network.requests_for(HEADER_QUERY.name()), 0);
}

#[tokio::test]
async fn failing_asset_still_opens_gate_and_nothing_fetches_before() {
    let mut h = harness();
    h.network.respond(USER_QUERY.name(), Ok(user_response()));
    h.network.respond(HEADER_QUERY.name(), Ok(header_response("Ada")));

    assert_eq!(
        h.renderer.render().unwrap(),
        Frame::Committed(View::fallback(LOADING_PLACEHOLDER))
    );
    assert_eq!(h.renderer.root().state(), GateState::AssetsLoading);
    assert_eq!(h.network.request_count(), 0);

    assert_eq!(h.renderer.root_mut().load_assets().await, GateState::Ready);
    let report = h.renderer.root().report().unwrap();
    assert_eq!(report.total(), 5);
    assert_eq!(report.failed.len(), 1);
    assert!(h
        .prewarmer
        .requests_seen
        .lock()
        .unwrap()
        .iter()
        .all(|&seen| seen == 0));

    let view = h.renderer.run_until_settled().await.unwrap();
    assert!(view.contains_text("Signed in as Ada"));
}

#[tokio::test]
async fn null_user_leaves_context_unset() {
    let mut h = harness();
    h.network.respond(USER_QUERY.name(), Ok(json!({"me": null})));
    h.network.respond(HEADER_QUERY.name(), Ok(json!({"me": null})));

    h.renderer.root_mut().load_assets().await;
    let view = h.renderer.run_until_settled().await.unwrap();

    assert!(view.contains_text("Not signed in"));
    assert!(view.contains_text("Sign in"));
    assert!(h.ctx.current_user().is_none());
    assert_eq!(h.ctx.writes(), 0);
}

#[tokio::test]
async fn rerenders_do_not_rewrite_user_or_refetch() {
    let mut h = harness();
    h.network.respond(USER_QUERY.name(), Ok(user_response()));
    h.network.respond(HEADER_QUERY.name(), Ok(header_response("Ada")));

    h.renderer.root_mut().load_assets().await;
    h.renderer.run_until_settled().await.unwrap();
    for _ in 0..3 {
        h.renderer.render().unwrap();
    }

    assert_eq!(h.ctx.writes(), 1);
    assert_eq!(h.network.requests_for(USER_QUERY.name()), 1);
    assert_eq!(h.network.requests_for(HEADER_QUERY.name()), 1);
}

#[tokio::test]
async fn app_and_header_hold_independent_handles() {
    let mut h = harness();
    h.network.respond(USER_QUERY.name(), Ok(user_response()));
    h.network.respond(HEADER_QUERY.name(), Ok(header_response("Ada")));

    h.renderer.root_mut().load_assets().await;
    h.renderer.run_until_settled().await.unwrap();

    let gate_scope = h.renderer.scope().unwrap();
    let app_handle = scope_at(gate_scope, APP_SCOPE).query(&USER_QUERY).unwrap();
    let header_handle = scope_at(gate_scope, HEADER_SCOPE).query(&HEADER_QUERY).unwrap();

    assert_ne!(app_handle.id(), header_handle.id());
    assert_ne!(app_handle.key(), header_handle.key());
    assert!(scope_at(gate_scope, APP_SCOPE).query(&HEADER_QUERY).is_none());
}

#[tokio::test]
async fn navigation_keeps_header_mounted() {
    let mut h = harness();
    h.network.respond(USER_QUERY.name(), Ok(user_response()));
    h.network.respond(HEADER_QUERY.name(), Ok(header_response("Ada")));

    h.renderer.root_mut().load_assets().await;
    h.renderer.run_until_settled().await.unwrap();

    h.renderer
        .root_mut()
        .app_mut()
        .child_mut()
        .child_mut()
        .navigator_mut()
        .navigate(Route::Temp);
    let Frame::Committed(view) = h.renderer.render().unwrap() else {
        panic!("navigation should commit");
    };

    assert!(view.find("Temp").is_some());
    assert!(view.contains_text("Ada"));
    assert_eq!(h.network.requests_for(HEADER_QUERY.name()), 1);
}

fn grace() -> User {
    User {
        id: "u0".into(),
        email: None,
        name: Some("Grace".into()),
        photo_url: None,
    }
}

#[tokio::test]
async fn null_user_keeps_prior_user() {
    let mut h = harness();
    h.ctx.set_user(grace());
    h.network.respond(USER_QUERY.name(), Ok(json!({"me": null})));
    h.network.respond(HEADER_QUERY.name(), Ok(json!({"me": null})));

    h.renderer.root_mut().load_assets().await;
    let view = h.renderer.run_until_settled().await.unwrap();

    assert!(view.contains_text("Signed in as Grace"));
    assert_eq!(h.ctx.current_user(), Some(grace()));
    assert_eq!(h.ctx.writes(), 1);
}

#[tokio::test]
async fn failed_user_query_keeps_prior_user() {
    let mut h = harness();
    h.ctx.set_user(grace());
    h.network.respond(
        USER_QUERY.name(),
        Err(FetchError::GraphQL("Not authorized".into())),
    );

    h.renderer.root_mut().load_assets().await;
    let view = h.renderer.run_until_settled().await.unwrap();

    assert!(view.find("Error").is_some());
    assert_eq!(h.ctx.current_user(), Some(grace()));
    assert_eq!(h.ctx.writes(), 1);
}
