use serde::Deserialize;
use std::collections::HashMap;

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    pub database: DatabaseConfig,
    #[serde(default)]
    pub etherscan: EtherscanConfig,
    #[serde(default)]
    pub classifier: ClassifierConfig,
    #[serde(default)]
    pub cache: CacheConfig,
    #[serde(default)]
    pub api: ApiConfig,
    #[serde(default)]
    pub precompute: PrecomputeConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct DatabaseConfig {
    pub url: String,
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
}

fn default_max_connections() -> u32 {
    10
}

// ============================================================
// Upstream (Etherscan-style) API Config
// ============================================================

#[derive(Debug, Deserialize, Clone)]
pub struct EtherscanConfig {
    #[serde(default = "default_api_base")]
    pub api_base: String,
    #[serde(default)]
    pub api_key: String,
    #[serde(default = "default_chain_id")]
    pub chain_id: u64,
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
}

impl Default for EtherscanConfig {
    fn default() -> Self {
        Self {
            api_base: default_api_base(),
            api_key: String::new(),
            chain_id: default_chain_id(),
            request_timeout_secs: default_request_timeout_secs(),
            max_retries: default_max_retries(),
        }
    }
}

fn default_api_base() -> String {
    "https://api.etherscan.io/v2/api".to_string()
}

fn default_chain_id() -> u64 {
    1
}

fn default_request_timeout_secs() -> u64 {
    25
}

fn default_max_retries() -> u32 {
    3
}

// ============================================================
// Classifier Config
// ============================================================

#[derive(Debug, Deserialize, Clone)]
pub struct ClassifierConfig {
    #[serde(default)]
    pub thresholds: ClassifierThresholds,
    #[serde(default)]
    pub confidence: ConfidenceConfig,
    /// Per-signal weight overrides, keyed by signal name.
    /// Unlisted signals keep their built-in default weight.
    #[serde(default)]
    pub signal_weights: HashMap<String, f64>,
    /// Best normalized score below this forces a NEUTRAL verdict.
    #[serde(default = "default_min_signal_floor")]
    pub min_signal_floor: f64,
}

fn default_min_signal_floor() -> f64 {
    0.30
}

impl Default for ClassifierConfig {
    fn default() -> Self {
        Self {
            thresholds: ClassifierThresholds::default(),
            confidence: ConfidenceConfig::default(),
            signal_weights: HashMap::new(),
            min_signal_floor: default_min_signal_floor(),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct ClassifierThresholds {
    /// inflow/outflow >= this -> accumulation signal
    #[serde(default = "default_ratio_accum")]
    pub inflow_outflow_ratio_accum: f64,
    /// outflow/inflow >= this -> distribution signal
    #[serde(default = "default_ratio_dist")]
    pub outflow_inflow_ratio_dist: f64,
    #[serde(default = "default_net_inflow_min_eth")]
    pub net_inflow_min_eth: f64,
    #[serde(default = "default_net_outflow_min_eth")]
    pub net_outflow_min_eth: f64,
    /// txs per day >= this -> high activity (exchange rotation)
    #[serde(default = "default_tx_freq_high")]
    pub tx_freq_high_per_day: f64,
    /// min span_days before frequency is computed at all
    #[serde(default = "default_tx_freq_min_days")]
    pub tx_freq_min_days: f64,
    /// unique counterparties >= this -> routing/exchange behavior
    #[serde(default = "default_counterparties_many")]
    pub counterparties_many: u32,
    /// unique counterparties <= this + high value -> whale accumulation
    #[serde(default = "default_counterparties_few")]
    pub counterparties_few: u32,
    /// single transfer >= this (ETH) is "large"
    #[serde(default = "default_large_transfer_eth")]
    pub large_transfer_eth: f64,
    /// single transfer >= this (ETH) counts as a spike
    #[serde(default = "default_spike_eth")]
    pub spike_eth: f64,
    #[serde(default = "default_large_transfers_min_count")]
    pub large_transfers_min_count: u32,
    #[serde(default = "default_accum_min_inflows")]
    pub accum_min_inflows: u32,
    /// used both for the many-outflows signal and the staggered-exit check
    #[serde(default = "default_dist_min_outflows")]
    pub dist_min_outflows: u32,
    /// total flow >= this (ETH) -> whale history
    #[serde(default = "default_whale_historical_eth")]
    pub whale_historical_eth: f64,
    /// trailing recency window in days
    #[serde(default = "default_recency_days")]
    pub recency_days: i64,
    /// <= this many txs in the recency window -> dormant
    #[serde(default = "default_recency_max_txs_dormant")]
    pub recency_max_txs_dormant: u32,
    /// need this much history before calling a wallet dormant
    #[serde(default = "default_recency_min_historical_txs")]
    pub recency_min_historical_txs: u32,
    /// span >= this many days + few recent txs -> dormant whale
    #[serde(default = "default_recency_span_days_whale")]
    pub recency_span_days_whale: f64,
    #[serde(default = "default_dormant_strict_recent_max")]
    pub dormant_strict_recent_max: u32,
    #[serde(default = "default_exchange_rotation_min_txs")]
    pub exchange_rotation_min_txs: u32,
    /// same hour-of-day bucket >= this many times -> timing pattern
    #[serde(default = "default_timing_min_txs")]
    pub timing_min_txs_for_pattern: u32,
}

impl Default for ClassifierThresholds {
    fn default() -> Self {
        Self {
            inflow_outflow_ratio_accum: default_ratio_accum(),
            outflow_inflow_ratio_dist: default_ratio_dist(),
            net_inflow_min_eth: default_net_inflow_min_eth(),
            net_outflow_min_eth: default_net_outflow_min_eth(),
            tx_freq_high_per_day: default_tx_freq_high(),
            tx_freq_min_days: default_tx_freq_min_days(),
            counterparties_many: default_counterparties_many(),
            counterparties_few: default_counterparties_few(),
            large_transfer_eth: default_large_transfer_eth(),
            spike_eth: default_spike_eth(),
            large_transfers_min_count: default_large_transfers_min_count(),
            accum_min_inflows: default_accum_min_inflows(),
            dist_min_outflows: default_dist_min_outflows(),
            whale_historical_eth: default_whale_historical_eth(),
            recency_days: default_recency_days(),
            recency_max_txs_dormant: default_recency_max_txs_dormant(),
            recency_min_historical_txs: default_recency_min_historical_txs(),
            recency_span_days_whale: default_recency_span_days_whale(),
            dormant_strict_recent_max: default_dormant_strict_recent_max(),
            exchange_rotation_min_txs: default_exchange_rotation_min_txs(),
            timing_min_txs_for_pattern: default_timing_min_txs(),
        }
    }
}

fn default_ratio_accum() -> f64 {
    1.5
}

fn default_ratio_dist() -> f64 {
    1.5
}

fn default_net_inflow_min_eth() -> f64 {
    50.0
}

fn default_net_outflow_min_eth() -> f64 {
    50.0
}

fn default_tx_freq_high() -> f64 {
    0.5
}

fn default_tx_freq_min_days() -> f64 {
    1.0
}

fn default_counterparties_many() -> u32 {
    15
}

fn default_counterparties_few() -> u32 {
    10
}

fn default_large_transfer_eth() -> f64 {
    10.0
}

fn default_spike_eth() -> f64 {
    25.0
}

fn default_large_transfers_min_count() -> u32 {
    2
}

fn default_accum_min_inflows() -> u32 {
    3
}

fn default_dist_min_outflows() -> u32 {
    5
}

fn default_whale_historical_eth() -> f64 {
    200.0
}

fn default_recency_days() -> i64 {
    30
}

fn default_recency_max_txs_dormant() -> u32 {
    3
}

fn default_recency_min_historical_txs() -> u32 {
    10
}

fn default_recency_span_days_whale() -> f64 {
    60.0
}

fn default_dormant_strict_recent_max() -> u32 {
    2
}

fn default_exchange_rotation_min_txs() -> u32 {
    30
}

fn default_timing_min_txs() -> u32 {
    5
}

#[derive(Debug, Deserialize, Clone)]
pub struct ConfidenceConfig {
    #[serde(default = "default_confidence_min")]
    pub min: f64,
    #[serde(default = "default_confidence_max")]
    pub max: f64,
    /// how much the winning score matters
    #[serde(default = "default_strength_weight")]
    pub strength_weight: f64,
    /// how much the gap to second-best matters
    #[serde(default = "default_margin_weight")]
    pub margin_weight: f64,
    /// how much tx count (data quality) matters
    #[serde(default = "default_data_weight")]
    pub data_weight: f64,
    #[serde(default = "default_data_floor_txs")]
    pub data_floor_txs: u32,
    #[serde(default = "default_data_ceiling_txs")]
    pub data_ceiling_txs: u32,
    /// fixed confidence when the neutral fallback was taken
    #[serde(default = "default_neutral_confidence")]
    pub neutral: f64,
}

impl Default for ConfidenceConfig {
    fn default() -> Self {
        Self {
            min: default_confidence_min(),
            max: default_confidence_max(),
            strength_weight: default_strength_weight(),
            margin_weight: default_margin_weight(),
            data_weight: default_data_weight(),
            data_floor_txs: default_data_floor_txs(),
            data_ceiling_txs: default_data_ceiling_txs(),
            neutral: default_neutral_confidence(),
        }
    }
}

fn default_confidence_min() -> f64 {
    0.30
}

fn default_confidence_max() -> f64 {
    0.95
}

fn default_strength_weight() -> f64 {
    0.50
}

fn default_margin_weight() -> f64 {
    0.35
}

fn default_data_weight() -> f64 {
    0.15
}

fn default_data_floor_txs() -> u32 {
    10
}

fn default_data_ceiling_txs() -> u32 {
    80
}

fn default_neutral_confidence() -> f64 {
    0.45
}

// ============================================================
// Cache Config
// ============================================================

#[derive(Debug, Deserialize, Clone)]
pub struct CacheConfig {
    /// TTL for the /analyze response cache (seconds)
    #[serde(default = "default_analyze_ttl_secs")]
    pub analyze_ttl_secs: u64,
    /// freshness window for persisted wallet intelligence (hours)
    #[serde(default = "default_wallet_ttl_hours")]
    pub wallet_ttl_hours: u64,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            analyze_ttl_secs: default_analyze_ttl_secs(),
            wallet_ttl_hours: default_wallet_ttl_hours(),
        }
    }
}

fn default_analyze_ttl_secs() -> u64 {
    300
}

fn default_wallet_ttl_hours() -> u64 {
    24
}

// ============================================================
// API Config
// ============================================================

#[derive(Debug, Deserialize, Clone)]
pub struct ApiConfig {
    #[serde(default = "default_api_host")]
    pub host: String,
    #[serde(default = "default_api_port")]
    pub port: u16,
    /// max transactions fetched per /analyze call
    #[serde(default = "default_analyze_tx_limit")]
    pub analyze_tx_limit: u32,
    /// hard cap on the ?limit= query parameter
    #[serde(default = "default_max_tx_limit")]
    pub max_tx_limit: u32,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            host: default_api_host(),
            port: default_api_port(),
            analyze_tx_limit: default_analyze_tx_limit(),
            max_tx_limit: default_max_tx_limit(),
        }
    }
}

fn default_api_host() -> String {
    "0.0.0.0".to_string()
}

fn default_api_port() -> u16 {
    5000
}

fn default_analyze_tx_limit() -> u32 {
    100
}

fn default_max_tx_limit() -> u32 {
    1000
}

// ============================================================
// Precompute Config
// ============================================================

#[derive(Debug, Deserialize, Clone)]
pub struct PrecomputeConfig {
    /// max transactions fetched per wallet (same bound as the API)
    #[serde(default = "default_analyze_tx_limit")]
    pub tx_limit: u32,
}

impl Default for PrecomputeConfig {
    fn default() -> Self {
        Self {
            tx_limit: default_analyze_tx_limit(),
        }
    }
}

impl Config {
    pub fn load(path: &str) -> eyre::Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| eyre::eyre!("Failed to read config file '{}': {}", path, e))?;
        let mut config: Config = toml::from_str(&content)
            .map_err(|e| eyre::eyre!("Failed to parse config file '{}': {}", path, e))?;

        // Secrets can come from the environment instead of the config file
        if let Ok(url) = std::env::var("DATABASE_URL") {
            if !url.is_empty() {
                config.database.url = url;
            }
        }
        if let Ok(key) = std::env::var("ETHERSCAN_API_KEY") {
            if !key.is_empty() {
                config.etherscan.api_key = key;
            }
        }

        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> eyre::Result<()> {
        if self.database.url.is_empty() {
            return Err(eyre::eyre!(
                "database.url must be set (config file or DATABASE_URL)"
            ));
        }

        let c = &self.classifier.confidence;
        if !(0.0..=1.0).contains(&c.min) || !(0.0..=1.0).contains(&c.max) || c.min >= c.max {
            return Err(eyre::eyre!(
                "classifier.confidence bounds must satisfy 0 <= min < max <= 1"
            ));
        }
        if c.data_floor_txs == 0 || c.data_ceiling_txs <= c.data_floor_txs {
            return Err(eyre::eyre!(
                "classifier.confidence data_floor_txs must be > 0 and < data_ceiling_txs"
            ));
        }

        if !(0.0..=1.0).contains(&self.classifier.min_signal_floor) {
            return Err(eyre::eyre!(
                "classifier.min_signal_floor must be within [0, 1]"
            ));
        }

        for (name, weight) in &self.classifier.signal_weights {
            if !weight.is_finite() || *weight < 0.0 {
                return Err(eyre::eyre!(
                    "signal weight '{}' must be a finite non-negative number, got {}",
                    name,
                    weight
                ));
            }
        }

        if self.api.max_tx_limit == 0 || self.api.analyze_tx_limit == 0 {
            return Err(eyre::eyre!("api transaction limits must be positive"));
        }

        Ok(())
    }
}
