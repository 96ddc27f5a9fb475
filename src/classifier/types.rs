use serde::{Deserialize, Serialize};

/// One native-asset value movement, in the shape the upstream transaction
/// API returns it (addresses and amounts as strings). The engine never
/// mutates a record; malformed fields degrade to zero/absent during
/// metrics computation.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct TransferRecord {
    #[serde(default)]
    pub from: String,
    #[serde(default)]
    pub to: String,
    /// Wei amount as a decimal string; may exceed 64-bit range.
    #[serde(default = "default_value")]
    pub value: String,
    #[serde(default, rename = "timeStamp")]
    pub time_stamp: Option<String>,
    #[serde(default)]
    pub hash: Option<String>,
    #[serde(default, rename = "blockNumber")]
    pub block_number: Option<String>,
}

fn default_value() -> String {
    "0".to_string()
}

impl TransferRecord {
    pub fn new(from: &str, to: &str, value: &str, timestamp: Option<i64>) -> Self {
        Self {
            from: from.to_string(),
            to: to.to_string(),
            value: value.to_string(),
            time_stamp: timestamp.map(|ts| ts.to_string()),
            hash: None,
            block_number: None,
        }
    }

    /// Unix timestamp in seconds, or None when absent/unparseable.
    pub fn timestamp(&self) -> Option<i64> {
        self.time_stamp
            .as_deref()
            .and_then(|s| s.trim().parse::<i64>().ok())
    }

    pub fn block(&self) -> Option<i64> {
        self.block_number
            .as_deref()
            .and_then(|s| s.trim().parse::<i64>().ok())
    }
}

/// The classification engine's final categorical output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Verdict {
    SmartMoneyAccumulation,
    StealthDistribution,
    ExchangeRotation,
    WhaleDormant,
    Neutral,
}

impl Verdict {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::SmartMoneyAccumulation => "SMART_MONEY_ACCUMULATION",
            Self::StealthDistribution => "STEALTH_DISTRIBUTION",
            Self::ExchangeRotation => "EXCHANGE_ROTATION",
            Self::WhaleDormant => "WHALE_DORMANT",
            Self::Neutral => "NEUTRAL",
        }
    }

    /// Total mapping from verdict to inferred entity type.
    pub fn entity_inference(&self) -> EntityType {
        match self {
            Self::SmartMoneyAccumulation => EntityType::LikelyIndividualWhale,
            Self::StealthDistribution => EntityType::LikelyDistributor,
            Self::ExchangeRotation => EntityType::LikelyExchangeRotator,
            Self::WhaleDormant => EntityType::LikelyDormantWhale,
            Self::Neutral => EntityType::Unknown,
        }
    }
}

impl std::fmt::Display for Verdict {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityType {
    LikelyIndividualWhale,
    LikelyDistributor,
    LikelyExchangeRotator,
    LikelyDormantWhale,
    Unknown,
}

impl EntityType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::LikelyIndividualWhale => "likely_individual_whale",
            Self::LikelyDistributor => "likely_distributor",
            Self::LikelyExchangeRotator => "likely_exchange_rotator",
            Self::LikelyDormantWhale => "likely_dormant_whale",
            Self::Unknown => "unknown",
        }
    }
}

impl std::fmt::Display for EntityType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Derived statistics for one subject address over one transfer batch.
/// All counts are >= 0; ratios are None when their denominator is zero.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct BehaviorMetrics {
    pub total_in_eth: f64,
    pub total_out_eth: f64,
    pub net_eth: f64,
    pub inflow_outflow_ratio: Option<f64>,
    pub outflow_inflow_ratio: Option<f64>,
    pub total_txs: u32,
    pub span_days: f64,
    pub tx_frequency: f64,
    pub unique_counterparties: u32,
    pub large_transfers_count: u32,
    pub spike_count: u32,
    pub spike_total_eth: f64,
    pub recent_tx_count: u32,
    pub first_seen: Option<i64>,
    pub last_seen: Option<i64>,
    pub staggered_exits: bool,
    pub repeated_timing: bool,
    pub total_flow_eth: f64,
    pub historically_large: bool,
    pub dormant_candidate: bool,
    pub num_inflows: u32,
    pub num_outflows: u32,
}

impl BehaviorMetrics {
    /// Inflow/outflow ratio as the scorer sees it. A wallet with zero
    /// outflow but nonzero inflow gets a large synthetic ratio (inflow x 10)
    /// so one-directional wallets still trip ratio signals; the serialized
    /// metric stays undefined.
    pub fn inflow_outflow_signal(&self) -> f64 {
        match self.inflow_outflow_ratio {
            Some(r) => r,
            None if self.total_in_eth > 0.0 => self.total_in_eth * 10.0,
            None => 0.0,
        }
    }

    /// Outflow/inflow counterpart of [`Self::inflow_outflow_signal`].
    pub fn outflow_inflow_signal(&self) -> f64 {
        match self.outflow_inflow_ratio {
            Some(r) => r,
            None if self.total_out_eth > 0.0 => self.total_out_eth * 10.0,
            None => 0.0,
        }
    }
}

/// Normalized score per candidate verdict, built fresh per classification.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct VerdictScores {
    pub accumulation: f64,
    pub distribution: f64,
    pub exchange_rotation: f64,
    pub whale_dormant: f64,
}

impl VerdictScores {
    /// Scores in fixed evaluation order; ties resolve to the earliest entry.
    pub fn entries(&self) -> [(Verdict, f64); 4] {
        [
            (Verdict::SmartMoneyAccumulation, self.accumulation),
            (Verdict::StealthDistribution, self.distribution),
            (Verdict::ExchangeRotation, self.exchange_rotation),
            (Verdict::WhaleDormant, self.whale_dormant),
        ]
    }

    pub fn best(&self) -> (Verdict, f64) {
        let mut best = (Verdict::SmartMoneyAccumulation, self.accumulation);
        for (verdict, score) in self.entries() {
            if score > best.1 {
                best = (verdict, score);
            }
        }
        best
    }

    /// Second-highest score across all candidates (equal to the best when
    /// two verdicts tie), used for the confidence margin.
    pub fn second_best(&self) -> f64 {
        let mut scores: Vec<f64> = self.entries().iter().map(|(_, s)| *s).collect();
        scores.sort_by(|a, b| b.partial_cmp(a).unwrap_or(std::cmp::Ordering::Equal));
        scores[1]
    }
}

/// The sole externally visible artifact of a classification call.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ClassificationResult {
    pub address: String,
    pub verdict: Verdict,
    pub confidence: f64,
    pub entity_inference: EntityType,
    /// Alias of `entity_inference` kept for API consumers.
    pub entity_type: EntityType,
    pub behavior_summary: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub metrics_used: Option<BehaviorMetrics>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_verdict_serializes_screaming_snake() {
        let json = serde_json::to_string(&Verdict::SmartMoneyAccumulation).unwrap();
        assert_eq!(json, "\"SMART_MONEY_ACCUMULATION\"");
        assert_eq!(Verdict::WhaleDormant.as_str(), "WHALE_DORMANT");
    }

    #[test]
    fn test_entity_mapping_is_total() {
        assert_eq!(
            Verdict::SmartMoneyAccumulation.entity_inference(),
            EntityType::LikelyIndividualWhale
        );
        assert_eq!(
            Verdict::StealthDistribution.entity_inference(),
            EntityType::LikelyDistributor
        );
        assert_eq!(
            Verdict::ExchangeRotation.entity_inference(),
            EntityType::LikelyExchangeRotator
        );
        assert_eq!(
            Verdict::WhaleDormant.entity_inference(),
            EntityType::LikelyDormantWhale
        );
        assert_eq!(Verdict::Neutral.entity_inference(), EntityType::Unknown);
        assert_eq!(EntityType::Unknown.as_str(), "unknown");
    }

    #[test]
    fn test_transfer_record_deserializes_upstream_shape() {
        let json = r#"{
            "blockNumber": "18500000",
            "timeStamp": "1700000000",
            "hash": "0xabc",
            "from": "0x1111111111111111111111111111111111111111",
            "to": "0x2222222222222222222222222222222222222222",
            "value": "123456789000000000000000000000",
            "gas": "21000",
            "isError": "0"
        }"#;
        let record: TransferRecord = serde_json::from_str(json).unwrap();
        assert_eq!(record.timestamp(), Some(1_700_000_000));
        assert_eq!(record.block(), Some(18_500_000));
        assert_eq!(record.value, "123456789000000000000000000000");
    }

    #[test]
    fn test_transfer_record_tolerates_missing_fields() {
        let record: TransferRecord = serde_json::from_str("{}").unwrap();
        assert_eq!(record.value, "0");
        assert_eq!(record.timestamp(), None);
        assert!(record.from.is_empty());

        let bad_ts = TransferRecord {
            time_stamp: Some("not-a-number".to_string()),
            ..Default::default()
        };
        assert_eq!(bad_ts.timestamp(), None);
    }

    #[test]
    fn test_verdict_scores_tie_breaks_in_order() {
        let scores = VerdictScores {
            accumulation: 0.5,
            distribution: 0.5,
            exchange_rotation: 0.2,
            whale_dormant: 0.1,
        };
        let (verdict, best) = scores.best();
        assert_eq!(verdict, Verdict::SmartMoneyAccumulation);
        assert_eq!(best, 0.5);
        assert_eq!(scores.second_best(), 0.5);
    }
}
