use bigdecimal::BigDecimal;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use std::str::FromStr;

use crate::classifier::types::{ClassificationResult, TransferRecord};

/// A cached classification row from wallet_intelligence.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct IntelligenceRow {
    pub address: String,
    pub verdict: String,
    pub confidence: f64,
    pub entity_type: String,
    pub behavior_json: Option<serde_json::Value>,
    pub summary: Option<String>,
    pub last_updated: DateTime<Utc>,
}

/// Upsert the classification result for a wallet (idempotent, keeps the
/// newest run).
pub async fn save_wallet_intelligence(
    pool: &PgPool,
    result: &ClassificationResult,
) -> eyre::Result<()> {
    let behavior_json = result
        .metrics_used
        .as_ref()
        .and_then(|m| serde_json::to_value(m).ok());

    sqlx::query(
        "INSERT INTO wallet_intelligence (address, verdict, confidence, entity_type, behavior_json, summary, last_updated)
         VALUES ($1, $2, $3, $4, $5, $6, NOW())
         ON CONFLICT (address) DO UPDATE
         SET verdict = $2, confidence = $3, entity_type = $4, behavior_json = $5, summary = $6, last_updated = NOW()",
    )
    .bind(result.address.to_lowercase())
    .bind(result.verdict.as_str())
    .bind(result.confidence)
    .bind(result.entity_type.as_str())
    .bind(behavior_json)
    .bind(&result.behavior_summary)
    .execute(pool)
    .await?;

    Ok(())
}

/// Load the cached classification for a wallet. With `max_age_secs` set,
/// only a row younger than the window is returned.
pub async fn get_wallet_intelligence(
    pool: &PgPool,
    address: &str,
    max_age_secs: Option<f64>,
) -> eyre::Result<Option<IntelligenceRow>> {
    let row = sqlx::query_as::<_, IntelligenceRow>(
        "SELECT address, verdict, confidence, entity_type, behavior_json, summary, last_updated
         FROM wallet_intelligence
         WHERE address = $1
         AND ($2::float8 IS NULL OR last_updated > NOW() - make_interval(secs => $2))",
    )
    .bind(address.to_lowercase())
    .bind(max_age_secs)
    .fetch_optional(pool)
    .await?;

    Ok(row)
}

/// Touch the wallet row, keeping last_seen_at current.
pub async fn upsert_wallet(pool: &PgPool, address: &str) -> eyre::Result<()> {
    sqlx::query(
        "INSERT INTO wallets (address, last_seen_at) VALUES ($1, NOW())
         ON CONFLICT (address) DO UPDATE SET last_seen_at = NOW()",
    )
    .bind(address.to_lowercase())
    .execute(pool)
    .await?;

    Ok(())
}

/// Insert a batch of raw transactions with multi-row INSERT and
/// ON CONFLICT DO NOTHING. Chunks to stay within PostgreSQL parameter
/// limits; records without a tx hash are skipped.
pub async fn insert_transactions_batch(
    pool: &PgPool,
    wallet_address: &str,
    transfers: &[TransferRecord],
) -> eyre::Result<u64> {
    let wallet_address = wallet_address.to_lowercase();
    let rows: Vec<&TransferRecord> = transfers.iter().filter(|t| t.hash.is_some()).collect();
    if rows.is_empty() {
        return Ok(0);
    }

    let mut inserted = 0u64;
    for chunk in rows.chunks(1000) {
        let mut query_builder: sqlx::QueryBuilder<sqlx::Postgres> = sqlx::QueryBuilder::new(
            "INSERT INTO transactions (wallet_address, tx_hash, from_address, to_address, \
             value_wei, block_number, block_timestamp) ",
        );

        query_builder.push_values(chunk, |mut b, t| {
            let value_wei =
                BigDecimal::from_str(t.value.trim()).unwrap_or_else(|_| BigDecimal::from(0));
            let block_timestamp = t.timestamp().and_then(|ts| DateTime::from_timestamp(ts, 0));
            b.push_bind(wallet_address.clone())
                .push_bind(t.hash.clone())
                .push_bind(t.from.to_lowercase())
                .push_bind(t.to.to_lowercase())
                .push_bind(value_wei)
                .push_bind(t.block())
                .push_bind(block_timestamp);
        });

        query_builder.push(" ON CONFLICT (tx_hash) DO NOTHING");
        let result = query_builder.build().execute(pool).await?;
        inserted += result.rows_affected();
    }

    Ok(inserted)
}

/// Number of wallets with a cached classification (for /health).
pub async fn count_cached_wallets(pool: &PgPool) -> eyre::Result<i64> {
    let row: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM wallet_intelligence")
        .fetch_one(pool)
        .await?;
    Ok(row.0)
}
