use serde::{Deserialize, Serialize};

pub const DATA_SOURCE: &str = "WhaleMind";

/// Wallet addresses are 0x-prefixed 20-byte hex strings.
const WALLET_HEX_LEN: usize = 40;
const WALLET_MAX_LEN: usize = 42;

/// Validate a wallet address and return its canonical lowercase form.
/// Callers run this before the classification engine is ever invoked.
pub fn validate_wallet(wallet: &str) -> Result<String, String> {
    let wallet = wallet.trim();
    if wallet.is_empty() {
        return Err("Missing or invalid wallet".to_string());
    }
    if wallet.len() > WALLET_MAX_LEN {
        return Err("Wallet address too long".to_string());
    }
    let hex_part = wallet
        .strip_prefix("0x")
        .ok_or_else(|| "Invalid wallet: must be 0x followed by 40 hex characters".to_string())?;
    if hex_part.len() != WALLET_HEX_LEN || hex::decode(hex_part).is_err() {
        return Err("Invalid wallet: must be 0x followed by 40 hex characters".to_string());
    }
    Ok(wallet.to_lowercase())
}

// ============================================================
// Request types
// ============================================================

#[derive(Debug, Deserialize)]
pub struct AnalyzeRequest {
    #[serde(default)]
    pub wallet: String,
}

#[derive(Debug, Deserialize)]
pub struct LimitParams {
    pub limit: Option<u32>,
}

// ============================================================
// Response types
// ============================================================

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub service: String,
    pub cached_wallets: i64,
}

/// Minimal AI-agent consumable response for /analyze.
#[derive(Debug, Clone, Serialize)]
pub struct AiResponse {
    pub address: String,
    pub verdict: String,
    pub confidence: f64,
    pub entity_type: String,
    pub summary: String,
    pub last_updated: String,
    pub data_source: String,
}

#[derive(Debug, Serialize)]
pub struct WalletAnalysisResponse {
    pub address: String,
    pub cached: bool,
    pub verdict: String,
    pub confidence: f64,
    pub entity_inference: String,
    pub behavior_summary: String,
    pub transactions_count: i64,
    pub behavior: serde_json::Value,
}

#[derive(Debug, Serialize)]
pub struct BalanceResponse {
    pub address: String,
    pub balance_wei: String,
}

/// Consistent error envelope for all failure responses.
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
    pub code: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_wallet_accepts_and_normalizes() {
        let wallet = "0xA0B86991C6218B36C1D19D4A2E9EB0CE3606EB48";
        assert_eq!(
            validate_wallet(wallet).unwrap(),
            "0xa0b86991c6218b36c1d19d4a2e9eb0ce3606eb48"
        );
        // surrounding whitespace is trimmed
        assert!(validate_wallet("  0xa0b86991c6218b36c1d19d4a2e9eb0ce3606eb48 ").is_ok());
    }

    #[test]
    fn test_validate_wallet_rejects_malformed() {
        assert!(validate_wallet("").is_err());
        assert!(validate_wallet("a0b86991c6218b36c1d19d4a2e9eb0ce3606eb48").is_err());
        assert!(validate_wallet("0x1234").is_err());
        assert!(validate_wallet("0xZZb86991c6218b36c1d19d4a2e9eb0ce3606eb48").is_err());
        assert!(validate_wallet("0xa0b86991c6218b36c1d19d4a2e9eb0ce3606eb48ff").is_err());
    }
}
