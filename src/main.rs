use anyhow::Result;
use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use reelist::catalog::tmdb::TmdbCatalog;
use reelist::config::Config;
use reelist::service::WatchlistService;
use reelist::AppState;

#[derive(Parser, Debug)]
#[command(name = "reelist")]
#[command(author, version, about = "A self-hosted movie watchlist and catalog server", long_about = None)]
struct Cli {
    /// Path to configuration file
    #[arg(short, long, default_value = "reelist.toml")]
    config: PathBuf,

    /// Override log level
    #[arg(short, long)]
    log_level: Option<String>,

    /// TMDB API key (overrides the config file)
    #[arg(long, env = "REELIST_TMDB_API_KEY")]
    tmdb_api_key: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Load configuration
    let mut config = Config::load(&cli.config)?;
    if let Some(key) = cli.tmdb_api_key {
        config.catalog.api_key = key;
    }

    // Initialize logging
    let log_level = cli
        .log_level
        .as_ref()
        .unwrap_or(&config.logging.level)
        .clone();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&log_level)),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Starting Reelist v{}", env!("CARGO_PKG_VERSION"));

    // Ensure data directory exists
    reelist::utils::ensure_dir(&config.server.data_dir)?;

    // Initialize database
    let db = reelist::db::init(&config.server.data_dir).await?;

    // Seed the default admin account into an empty database
    reelist::db::seeders::seed_default_admin(&db, &config.auth).await?;

    // Initialize metrics
    let metrics_handle = reelist::api::metrics::init_metrics();

    // Wire the movie catalog and the domain service
    let catalog = Arc::new(TmdbCatalog::new(&config.catalog)?);
    let service = WatchlistService::new(
        db.clone(),
        catalog.clone(),
        config.catalog.fanout_concurrency,
    );

    // Run startup self-checks; refuse to start on critical failures
    let report = reelist::startup::run_startup_checks(&config, &db, catalog.as_ref()).await;
    if !report.all_critical_passed {
        anyhow::bail!("Startup checks failed: {}", report.summary);
    }

    // Create app state and router
    let state = Arc::new(AppState::new(config.clone(), db, service).with_metrics(metrics_handle));
    let app = reelist::api::create_router(state);

    // Start API server
    let addr = format!("{}:{}", config.server.host, config.server.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;

    tracing::info!("Server listening on http://{}", addr);
    tracing::info!("Admin token: {}", config.auth.admin_token);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("Failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    tracing::info!("Shutdown signal received");
}
