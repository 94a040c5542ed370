mod api;
mod state;

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use url::Url;

use romshelf_core::catalog::{GameCatalog, SqliteCatalog};
use romshelf_core::index::{HttpSearchIndex, SearchIndex};
use romshelf_core::metadata::{IgdbClient, MetadataProvider};
use romshelf_core::{
    create_authenticator, load_config, validate_config, Authenticator, Pipeline, Scheduler,
};

use api::create_router;
use state::AppState;

#[tokio::main]
async fn main() {
    if let Err(e) = run().await {
        error!("Fatal error: {:#}", e);
        std::process::exit(1);
    }
}

async fn run() -> Result<()> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Determine config path
    let config_path = std::env::var("ROMSHELF_CONFIG")
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from("config.toml"));

    // Load configuration
    info!("Loading configuration from {:?}", config_path);
    let config = load_config(&config_path)
        .with_context(|| format!("Failed to load config from {:?}", config_path))?;

    validate_config(&config).context("Configuration validation failed")?;

    info!("Configuration loaded successfully");
    info!("Auth method: {:?}", config.auth.method);
    info!("Archive base: {}", config.archive.base_url);

    let authenticator: Arc<dyn Authenticator> = Arc::from(create_authenticator(&config.auth));

    // Catalog store
    let catalog: Arc<dyn GameCatalog> = Arc::new(
        SqliteCatalog::new(&config.database.path).context("Failed to open catalog database")?,
    );

    // Search index
    let index: Arc<dyn SearchIndex> = Arc::new(HttpSearchIndex::new(&config.index));

    // Metadata provider (enrichment is optional; crawling is not)
    let provider: Option<Arc<dyn MetadataProvider>> = match &config.igdb {
        Some(igdb_config) => Some(Arc::new(
            IgdbClient::new(igdb_config.clone()).context("Failed to create metadata client")?,
        )),
        None => {
            info!("No metadata provider credentials; enrichment disabled");
            None
        }
    };

    let base_url = Url::parse(&config.archive.base_url).context("Invalid archive base URL")?;
    let pipeline = Arc::new(Pipeline::new(
        config.pipeline.clone(),
        base_url,
        Arc::clone(&catalog),
        Arc::clone(&index),
        provider,
    ));

    let scheduler = Arc::new(
        Scheduler::start(
            Arc::clone(&pipeline),
            config.scheduler.schedule_path.clone(),
        )
        .await
        .context("Failed to start scheduler")?,
    );

    // Create app state and router
    let state = Arc::new(AppState::new(
        config.clone(),
        authenticator,
        catalog,
        index,
        pipeline,
        scheduler,
    ));
    let app = create_router(state);

    // Start server
    let addr = SocketAddr::new(config.server.host, config.server.port);
    info!("Starting server on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind to {}", addr))?;

    axum::serve(listener, app).await.context("Server error")?;

    Ok(())
}
