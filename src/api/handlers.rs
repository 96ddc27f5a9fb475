use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::Json;
use chrono::Utc;
use std::sync::Arc;

use crate::db::repository::{self, IntelligenceRow};

use super::types::*;
use super::AppState;

type ApiResult<T> = Result<Json<T>, (StatusCode, Json<ErrorResponse>)>;

fn api_error(
    status: StatusCode,
    code: &str,
    msg: impl Into<String>,
) -> (StatusCode, Json<ErrorResponse>) {
    (
        status,
        Json(ErrorResponse {
            error: msg.into(),
            code: code.to_string(),
        }),
    )
}

fn parse_wallet(wallet: &str) -> Result<String, (StatusCode, Json<ErrorResponse>)> {
    validate_wallet(wallet).map_err(|e| api_error(StatusCode::BAD_REQUEST, "VALIDATION_ERROR", e))
}

fn ai_response_from_row(row: &IntelligenceRow) -> AiResponse {
    AiResponse {
        address: row.address.clone(),
        verdict: row.verdict.clone(),
        confidence: row.confidence,
        entity_type: row.entity_type.clone(),
        summary: row.summary.clone().unwrap_or_default(),
        last_updated: row.last_updated.to_rfc3339(),
        data_source: DATA_SOURCE.to_string(),
    }
}

// ============================================================
// Health
// ============================================================

pub async fn health(State(state): State<Arc<AppState>>) -> ApiResult<HealthResponse> {
    let cached_wallets = repository::count_cached_wallets(&state.pool)
        .await
        .map_err(|e| api_error(StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL_ERROR", e.to_string()))?;

    Ok(Json(HealthResponse {
        status: "ok".to_string(),
        service: "whalemind".to_string(),
        cached_wallets,
    }))
}

// ============================================================
// Analyze
// ============================================================

/// Analyze a wallet: fetch transactions, classify, persist, return the
/// verdict. Cached results (DB first, then in-memory) front repeated
/// upstream calls for the same wallet within the analyze TTL.
pub async fn analyze(
    State(state): State<Arc<AppState>>,
    Json(body): Json<AnalyzeRequest>,
) -> ApiResult<AiResponse> {
    let wallet = parse_wallet(&body.wallet)?;

    let ttl_secs = state.cache_config.analyze_ttl_secs as f64;
    match repository::get_wallet_intelligence(&state.pool, &wallet, Some(ttl_secs)).await {
        Ok(Some(row)) => return Ok(Json(ai_response_from_row(&row))),
        Ok(None) => {}
        Err(e) => tracing::warn!(wallet = %wallet, error = %e, "Cache lookup failed"),
    }
    if let Some(hit) = state.analyze_cache.lock().await.get(&wallet) {
        return Ok(Json(hit));
    }

    let transactions = state
        .etherscan
        .fetch_transactions(&wallet, state.api_config.analyze_tx_limit)
        .await
        .map_err(|e| {
            tracing::warn!(wallet = %wallet, error = %e, "Transaction fetch failed");
            api_error(
                StatusCode::BAD_GATEWAY,
                "UPSTREAM_ERROR",
                "Failed to fetch transactions",
            )
        })?;

    let result = state.classifier.classify(&wallet, &transactions, true);

    if let Err(e) = repository::save_wallet_intelligence(&state.pool, &result).await {
        tracing::warn!(wallet = %wallet, error = %e, "Cache save failed");
    }

    let response = AiResponse {
        address: result.address.clone(),
        verdict: result.verdict.as_str().to_string(),
        confidence: result.confidence,
        entity_type: result.entity_type.as_str().to_string(),
        summary: result.behavior_summary.clone(),
        last_updated: Utc::now().to_rfc3339(),
        data_source: DATA_SOURCE.to_string(),
    };
    state
        .analyze_cache
        .lock()
        .await
        .insert(wallet, response.clone());

    Ok(Json(response))
}

// ============================================================
// Wallet
// ============================================================

/// Full wallet analysis including the derived metrics. Served from the
/// persisted classification when it is fresh enough (24h window), otherwise
/// fetched, classified, and the raw transactions persisted best-effort.
pub async fn wallet_analysis(
    State(state): State<Arc<AppState>>,
    Path(address): Path<String>,
    Query(params): Query<LimitParams>,
) -> ApiResult<WalletAnalysisResponse> {
    let wallet = parse_wallet(&address)?;

    let max_age_secs = state.cache_config.wallet_ttl_hours as f64 * 3600.0;
    match repository::get_wallet_intelligence(&state.pool, &wallet, Some(max_age_secs)).await {
        Ok(Some(row)) => {
            let behavior = row.behavior_json.clone().unwrap_or(serde_json::json!({}));
            let transactions_count = behavior
                .get("total_txs")
                .and_then(|v| v.as_i64())
                .unwrap_or(0);
            return Ok(Json(WalletAnalysisResponse {
                address: row.address,
                cached: true,
                verdict: row.verdict,
                confidence: row.confidence,
                entity_inference: row.entity_type,
                behavior_summary: row.summary.unwrap_or_default(),
                transactions_count,
                behavior,
            }));
        }
        Ok(None) => {}
        Err(e) => tracing::warn!(wallet = %wallet, error = %e, "Cache lookup failed"),
    }

    let limit = params
        .limit
        .unwrap_or(state.api_config.analyze_tx_limit)
        .clamp(1, state.api_config.max_tx_limit);

    let transactions = state
        .etherscan
        .fetch_transactions(&wallet, limit)
        .await
        .map_err(|e| {
            tracing::warn!(wallet = %wallet, error = %e, "Transaction fetch failed");
            api_error(
                StatusCode::BAD_GATEWAY,
                "UPSTREAM_ERROR",
                "Failed to fetch transactions",
            )
        })?;

    let result = state.classifier.classify(&wallet, &transactions, true);

    if let Err(e) = persist_wallet_transactions(&state, &wallet, &transactions).await {
        tracing::warn!(wallet = %wallet, error = %e, "DB persist failed");
    }

    let behavior = result
        .metrics_used
        .as_ref()
        .and_then(|m| serde_json::to_value(m).ok())
        .unwrap_or(serde_json::json!({}));

    Ok(Json(WalletAnalysisResponse {
        address: result.address,
        cached: false,
        verdict: result.verdict.as_str().to_string(),
        confidence: result.confidence,
        entity_inference: result.entity_inference.as_str().to_string(),
        behavior_summary: result.behavior_summary,
        transactions_count: transactions.len() as i64,
        behavior,
    }))
}

async fn persist_wallet_transactions(
    state: &AppState,
    wallet: &str,
    transactions: &[crate::classifier::types::TransferRecord],
) -> eyre::Result<()> {
    repository::upsert_wallet(&state.pool, wallet).await?;
    repository::insert_transactions_batch(&state.pool, wallet, transactions).await?;
    Ok(())
}

// ============================================================
// Balance
// ============================================================

pub async fn wallet_balance(
    State(state): State<Arc<AppState>>,
    Path(address): Path<String>,
) -> ApiResult<BalanceResponse> {
    let wallet = parse_wallet(&address)?;

    let balance = state.etherscan.fetch_balance(&wallet).await.map_err(|e| {
        tracing::warn!(wallet = %wallet, error = %e, "Balance fetch failed");
        api_error(
            StatusCode::BAD_GATEWAY,
            "UPSTREAM_ERROR",
            "Failed to fetch balance",
        )
    })?;

    match balance {
        Some(balance_wei) => Ok(Json(BalanceResponse {
            address: wallet,
            balance_wei,
        })),
        None => Err(api_error(
            StatusCode::BAD_GATEWAY,
            "UPSTREAM_ERROR",
            "Failed to fetch balance (timeout or upstream error)",
        )),
    }
}
