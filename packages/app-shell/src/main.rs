use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use suspense::{Environment, EnvironmentConfig, Frame, RecordStore, Renderer};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use app_shell::cache::{load_record_store, save_record_store};
use app_shell::graphql::{GraphQLClient, GraphQLNetwork};
use app_shell::{icon_assets, scaffold, AppConfig, AppContext, BootstrapGate, HttpAssetPrewarmer};

#[derive(Parser, Debug)]
#[command(name = "app-shell", about = "Boot the app shell against a GraphQL API")]
struct Cli {
    /// GraphQL endpoint (overrides API_URL)
    #[arg(long)]
    api_url: Option<String>,

    /// Keep rendering as background refreshes land
    #[arg(long)]
    watch: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,app_shell=debug,suspense=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let cli = Cli::parse();

    let mut config = AppConfig::from_env().context("Failed to load configuration")?;
    if let Some(api_url) = cli.api_url {
        config.api_url = api_url;
    }
    tracing::info!(api_url = %config.api_url, "starting app shell");

    let store = match &config.record_cache_path {
        Some(path) => load_record_store(path).await?,
        None => RecordStore::new(),
    };

    let mut client = GraphQLClient::new(&config.api_url);
    if let Some(token) = &config.auth_token {
        client = client.with_token(token);
    }
    let env = Environment::with_store(Arc::new(GraphQLNetwork::new(client)), store).with_config(
        EnvironmentConfig {
            query_cache_ttl: config.query_cache_ttl,
        },
    );

    let ctx = AppContext::new();
    let prewarmer = Arc::new(HttpAssetPrewarmer::new(&config.asset_cache_dir));
    let gate = BootstrapGate::new(
        prewarmer,
        icon_assets(&config.asset_root),
        scaffold(env.clone(), ctx.clone()),
    );
    let mut renderer = Renderer::new(gate);

    if let Frame::Committed(view) = renderer.render()? {
        println!("{view}");
    }

    renderer.root_mut().load_assets().await;
    let view = renderer.run_until_settled().await?;
    println!("{view}");

    if cli.watch {
        while renderer.next_update().await {
            if let Frame::Committed(view) = renderer.render()? {
                println!("{view}");
            }
        }
    }

    match ctx.current_user() {
        Some(user) => tracing::info!(user_id = %user.id, "session ready"),
        None => tracing::info!("session ready, no signed-in user"),
    }

    if let Some(path) = &config.record_cache_path {
        save_record_store(env.store(), path).await?;
    }

    Ok(())
}
