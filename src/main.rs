use std::sync::Arc;
use std::time::Duration;

use sqlx::postgres::PgPoolOptions;
use tokio::sync::Mutex;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::EnvFilter;

use whalemind::api::{self, AppState};
use whalemind::cache::TtlCache;
use whalemind::classifier::BehaviorClassifier;
use whalemind::config::Config;
use whalemind::fetch::EtherscanClient;

#[tokio::main]
async fn main() -> eyre::Result<()> {
    color_eyre::install()?;

    // Initialize structured logging (set RUST_LOG=info for output)
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_target(true)
        .init();

    tracing::info!("WhaleMind starting");

    // Load configuration
    let config_path = std::env::args()
        .nth(1)
        .unwrap_or_else(|| "config.toml".to_string());

    let config = Config::load(&config_path)?;
    tracing::info!("Configuration loaded from {}", config_path);

    if config.etherscan.api_key.is_empty() {
        tracing::warn!("ETHERSCAN_API_KEY not set. Upstream rate limits will be lower.");
    }

    // Create database connection pool
    let pool = PgPoolOptions::new()
        .max_connections(config.database.max_connections)
        .connect(&config.database.url)
        .await
        .map_err(|e| eyre::eyre!("Failed to connect to database: {}", e))?;

    tracing::info!("Connected to PostgreSQL");

    // Run migrations
    sqlx::migrate!("./migrations")
        .run(&pool)
        .await
        .map_err(|e| eyre::eyre!("Failed to run migrations: {}", e))?;

    tracing::info!("Database migrations complete");

    let classifier = BehaviorClassifier::new(config.classifier.clone());
    let etherscan = EtherscanClient::new(config.etherscan.clone())?;
    let analyze_cache = Mutex::new(TtlCache::new(Duration::from_secs(
        config.cache.analyze_ttl_secs,
    )));

    let state = Arc::new(AppState {
        pool,
        classifier,
        etherscan,
        analyze_cache,
        api_config: config.api.clone(),
        cache_config: config.cache.clone(),
    });

    // Serve the API until ctrl-c
    let shutdown = CancellationToken::new();
    let server = {
        let state = state.clone();
        let shutdown = shutdown.clone();
        let host = config.api.host.clone();
        let port = config.api.port;
        tokio::spawn(async move {
            if let Err(e) = api::serve(state, &host, port, shutdown).await {
                tracing::error!(error = %e, "API server failed");
            }
        })
    };

    tokio::signal::ctrl_c().await?;
    tracing::info!("Shutdown signal received, stopping API server...");
    shutdown.cancel();
    let _ = server.await;

    tracing::info!("WhaleMind stopped gracefully");
    Ok(())
}
