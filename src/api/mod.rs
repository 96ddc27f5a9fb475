pub mod handlers;
pub mod types;

use axum::{
    routing::{get, post},
    Router,
};
use sqlx::PgPool;
use std::sync::Arc;
use tokio::sync::Mutex;
use tokio_util::sync::CancellationToken;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::cache::TtlCache;
use crate::classifier::BehaviorClassifier;
use crate::config::{ApiConfig, CacheConfig};
use crate::fetch::EtherscanClient;

use types::AiResponse;

pub struct AppState {
    pub pool: PgPool,
    pub classifier: BehaviorClassifier,
    pub etherscan: EtherscanClient,
    pub analyze_cache: Mutex<TtlCache<AiResponse>>,
    pub api_config: ApiConfig,
    pub cache_config: CacheConfig,
}

pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/api/v1/health", get(handlers::health))
        .route("/api/v1/analyze", post(handlers::analyze))
        .route("/api/v1/wallet/{address}", get(handlers::wallet_analysis))
        .route(
            "/api/v1/wallet/{address}/balance",
            get(handlers::wallet_balance),
        )
        .with_state(state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
}

pub async fn serve(
    state: Arc<AppState>,
    host: &str,
    port: u16,
    shutdown: CancellationToken,
) -> eyre::Result<()> {
    let app = router(state);
    let addr = format!("{}:{}", host, port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!(%addr, "API server listening");
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown.cancelled_owned())
        .await?;
    Ok(())
}
