use sqlx::PgPool;
use std::path::Path;

use crate::api::types::validate_wallet;
use crate::classifier::types::ClassificationResult;
use crate::classifier::BehaviorClassifier;
use crate::db::repository;
use crate::fetch::EtherscanClient;

#[derive(Debug, Default)]
pub struct PrecomputeReport {
    pub ok: u32,
    pub failed: u32,
}

/// Batch-classify a list of wallets and store the results. Per-wallet
/// failures are logged and counted; the run itself never aborts.
pub async fn run(
    pool: &PgPool,
    classifier: &BehaviorClassifier,
    client: &EtherscanClient,
    tx_limit: u32,
    wallets: &[String],
    quiet: bool,
) -> PrecomputeReport {
    let total = wallets.len();
    let mut report = PrecomputeReport::default();

    tracing::info!(wallets = total, "Precompute starting");

    for (i, wallet) in wallets.iter().enumerate() {
        match analyze_and_save(pool, classifier, client, tx_limit, wallet).await {
            Ok(result) => {
                report.ok += 1;
                if !quiet {
                    tracing::info!(
                        progress = %format!("{}/{}", i + 1, total),
                        wallet = %result.address,
                        verdict = result.verdict.as_str(),
                        confidence = result.confidence,
                        "Wallet classified"
                    );
                }
            }
            Err(e) => {
                report.failed += 1;
                tracing::warn!(
                    progress = %format!("{}/{}", i + 1, total),
                    wallet = %wallet,
                    error = %e,
                    "Wallet precompute failed"
                );
            }
        }
    }

    report
}

async fn analyze_and_save(
    pool: &PgPool,
    classifier: &BehaviorClassifier,
    client: &EtherscanClient,
    tx_limit: u32,
    wallet: &str,
) -> eyre::Result<ClassificationResult> {
    let wallet = validate_wallet(wallet).map_err(|e| eyre::eyre!(e))?;

    let transactions = client.fetch_transactions(&wallet, tx_limit).await?;
    let result = classifier.classify(&wallet, &transactions, true);

    repository::save_wallet_intelligence(pool, &result).await?;
    repository::upsert_wallet(pool, &wallet).await?;

    Ok(result)
}

/// Parse a wallet list from free text (comma-, whitespace-, or
/// newline-separated). Comments and invalid addresses are skipped.
pub fn parse_wallet_list(raw: &str) -> Vec<String> {
    raw.split(|c: char| c.is_whitespace() || c == ',')
        .map(str::trim)
        .filter(|s| !s.is_empty() && !s.starts_with('#'))
        .filter(|s| validate_wallet(s).is_ok())
        .map(|s| s.to_string())
        .collect()
}

/// Load addresses from a file, one per line. Empty lines, comments, and
/// invalid addresses are skipped.
pub fn load_wallets_from_file(path: impl AsRef<Path>) -> eyre::Result<Vec<String>> {
    let path = path.as_ref();
    let text = std::fs::read_to_string(path)
        .map_err(|e| eyre::eyre!("Could not read wallet file '{}': {}", path.display(), e))?;

    Ok(text
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .filter(|line| validate_wallet(line).is_ok())
        .map(|line| line.to_string())
        .collect())
}

/// Load addresses from the WALLETS environment variable.
pub fn load_wallets_from_env() -> Vec<String> {
    match std::env::var("WALLETS") {
        Ok(raw) => parse_wallet_list(&raw),
        Err(_) => Vec::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const VALID_A: &str = "0xa0b86991c6218b36c1d19d4a2e9eb0ce3606eb48";
    const VALID_B: &str = "0xdac17f958d2ee523a2206206994597c13d831ec7";

    #[test]
    fn test_parse_wallet_list_mixed_separators() {
        let raw = format!("{VALID_A},\n  {VALID_B}\t not-an-address");
        let wallets = parse_wallet_list(&raw);
        assert_eq!(wallets, vec![VALID_A.to_string(), VALID_B.to_string()]);
    }

    #[test]
    fn test_parse_wallet_list_skips_comments_and_blanks() {
        let raw = format!("#seed wallets\n\n{VALID_A}\n#trailing");
        let wallets = parse_wallet_list(&raw);
        assert_eq!(wallets, vec![VALID_A.to_string()]);
    }

    #[test]
    fn test_parse_wallet_list_empty_input() {
        assert!(parse_wallet_list("").is_empty());
        assert!(parse_wallet_list("  \n ,, \n").is_empty());
    }
}
