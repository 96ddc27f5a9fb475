use reqwest::Client;
use serde::Deserialize;
use std::time::Duration;

use crate::classifier::types::TransferRecord;
use crate::config::EtherscanConfig;

/// Standard upstream response envelope: `result` stays untyped because the
/// API reuses the field for both payloads and error strings.
#[derive(Debug, Deserialize)]
struct ApiEnvelope {
    #[serde(default)]
    status: String,
    #[serde(default)]
    message: String,
    #[serde(default)]
    result: serde_json::Value,
}

/// Client for an Etherscan-style V2 account API. Transport failures retry
/// with exponential backoff; upstream "no data" responses degrade to empty
/// results rather than errors.
#[derive(Debug, Clone)]
pub struct EtherscanClient {
    http: Client,
    config: EtherscanConfig,
}

impl EtherscanClient {
    pub fn new(config: EtherscanConfig) -> eyre::Result<Self> {
        let http = Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .build()
            .map_err(|e| eyre::eyre!("Failed to build HTTP client: {}", e))?;
        Ok(Self { http, config })
    }

    /// Fetch normal transactions for a wallet, newest first.
    pub async fn fetch_transactions(
        &self,
        address: &str,
        limit: u32,
    ) -> eyre::Result<Vec<TransferRecord>> {
        let chain_id = self.config.chain_id.to_string();
        let offset = limit.min(10_000).to_string();
        let params = [
            ("chainid", chain_id.as_str()),
            ("module", "account"),
            ("action", "txlist"),
            ("address", address),
            ("startblock", "0"),
            ("endblock", "99999999"),
            ("page", "1"),
            ("offset", offset.as_str()),
            ("sort", "desc"),
            ("apikey", self.config.api_key.as_str()),
        ];

        let envelope = self.get_with_retry(&params).await?;
        if envelope.status != "1" {
            tracing::debug!(
                address,
                message = %envelope.message,
                "Upstream returned no transaction data"
            );
            return Ok(Vec::new());
        }

        match serde_json::from_value::<Vec<TransferRecord>>(envelope.result) {
            Ok(transactions) => Ok(transactions),
            Err(e) => {
                tracing::warn!(address, error = %e, "Upstream transaction list parse error");
                Ok(Vec::new())
            }
        }
    }

    /// Fetch the native balance for an address, in wei as a string.
    /// Returns None when the upstream reports an error status.
    pub async fn fetch_balance(&self, address: &str) -> eyre::Result<Option<String>> {
        let chain_id = self.config.chain_id.to_string();
        let params = [
            ("chainid", chain_id.as_str()),
            ("module", "account"),
            ("action", "balance"),
            ("address", address),
            ("tag", "latest"),
            ("apikey", self.config.api_key.as_str()),
        ];

        let envelope = self.get_with_retry(&params).await?;
        if envelope.status != "1" {
            tracing::debug!(address, message = %envelope.message, "Upstream balance error");
            return Ok(None);
        }
        Ok(envelope.result.as_str().map(|s| s.to_string()))
    }

    /// Retry transient transport failures with exponential backoff.
    async fn get_with_retry(&self, params: &[(&str, &str)]) -> eyre::Result<ApiEnvelope> {
        let mut delay = Duration::from_millis(500);
        let max_retries = self.config.max_retries;

        for attempt in 0..max_retries {
            match self.get_once(params).await {
                Ok(envelope) => return Ok(envelope),
                Err(e) => {
                    tracing::warn!(
                        attempt = attempt + 1,
                        max_retries,
                        error = %e,
                        delay_ms = delay.as_millis() as u64,
                        "Upstream request failed, retrying..."
                    );
                    tokio::time::sleep(delay).await;
                    delay = std::cmp::min(delay * 2, Duration::from_secs(30));
                }
            }
        }

        self.get_once(params)
            .await
            .map_err(|e| eyre::eyre!("Upstream request failed after {} retries: {}", max_retries, e))
    }

    async fn get_once(&self, params: &[(&str, &str)]) -> eyre::Result<ApiEnvelope> {
        let response = self
            .http
            .get(&self.config.api_base)
            .query(params)
            .send()
            .await?
            .error_for_status()?;
        Ok(response.json::<ApiEnvelope>().await?)
    }
}
