use crate::config::ClassifierConfig;

use super::metrics::{compute_metrics, round_to};
use super::signals::score_all;
use super::types::{
    BehaviorMetrics, ClassificationResult, TransferRecord, Verdict, VerdictScores,
};

/// The behavior classification engine. A pure function of its inputs: no
/// I/O, no shared state, safe to call concurrently for many wallets.
#[derive(Debug, Clone)]
pub struct BehaviorClassifier {
    config: ClassifierConfig,
}

impl BehaviorClassifier {
    pub fn new(config: ClassifierConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &ClassifierConfig {
        &self.config
    }

    /// Classify one wallet from its transfer batch. Never fails: an empty
    /// batch short-circuits to the canned NEUTRAL result, and malformed
    /// records degrade inside the metrics pass.
    pub fn classify(
        &self,
        address: &str,
        transfers: &[TransferRecord],
        include_metrics: bool,
    ) -> ClassificationResult {
        if transfers.is_empty() {
            return ClassificationResult {
                address: address.to_string(),
                verdict: Verdict::Neutral,
                confidence: self.config.confidence.min,
                entity_inference: Verdict::Neutral.entity_inference(),
                entity_type: Verdict::Neutral.entity_inference(),
                behavior_summary: "No transaction data available.".to_string(),
                metrics_used: None,
            };
        }

        let metrics = compute_metrics(transfers, address, &self.config.thresholds);
        let scores = score_all(&metrics, &self.config);

        let (best_verdict, best_score) = scores.best();
        let neutral_fallback = best_score < self.config.min_signal_floor;
        let verdict = if neutral_fallback {
            Verdict::Neutral
        } else {
            best_verdict
        };

        let entity = verdict.entity_inference();
        let confidence = self.confidence(verdict, &scores, &metrics, neutral_fallback);
        let behavior_summary = self.summarize(verdict, &metrics);

        ClassificationResult {
            address: address.to_string(),
            verdict,
            confidence,
            entity_inference: entity,
            entity_type: entity,
            behavior_summary,
            metrics_used: include_metrics.then_some(metrics),
        }
    }

    /// Confidence in [min, max] blending winning-signal strength, margin
    /// over the runner-up, and data volume. The neutral fallback gets a
    /// fixed low constant: "we actively declined to call a pattern" is a
    /// different statement than a weak directional score.
    fn confidence(
        &self,
        verdict: Verdict,
        scores: &VerdictScores,
        metrics: &BehaviorMetrics,
        neutral_fallback: bool,
    ) -> f64 {
        let c = &self.config.confidence;
        if neutral_fallback {
            return round_to(c.neutral, 2);
        }

        let strength = scores
            .entries()
            .iter()
            .find(|(v, _)| *v == verdict)
            .map(|(_, s)| *s)
            .unwrap_or(0.0);
        let margin = (strength - scores.second_best()).clamp(0.0, 1.0);

        let txs = metrics.total_txs;
        let floor = c.data_floor_txs as f64;
        let ceiling = c.data_ceiling_txs as f64;
        let data_quality = if txs <= c.data_floor_txs {
            txs as f64 / floor
        } else {
            ((txs as f64 - floor) / (ceiling - floor)).min(1.0)
        };

        let confidence = c.min
            + (c.max - c.min)
                * (c.strength_weight * strength
                    + c.margin_weight * margin
                    + c.data_weight * data_quality);

        round_to(confidence.clamp(c.min, c.max), 2)
    }

    /// One-line human-readable behavior summary per verdict.
    fn summarize(&self, verdict: Verdict, metrics: &BehaviorMetrics) -> String {
        match verdict {
            Verdict::SmartMoneyAccumulation => format!(
                "Net inflow dominance (net {:.1} ETH) with repeated high-value buys; {} counterparties.",
                metrics.net_eth, metrics.unique_counterparties
            ),
            Verdict::StealthDistribution => format!(
                "Sustained outflows (net {:.1} ETH) with staggered transfers; distribution pattern.",
                metrics.net_eth
            ),
            Verdict::ExchangeRotation => format!(
                "High counterparty count ({}), {} txs; exchange or routing behavior.",
                metrics.unique_counterparties, metrics.total_txs
            ),
            Verdict::WhaleDormant => format!(
                "Historically large flow ({:.0} ETH) with low recent activity ({} txs in last {}d).",
                metrics.total_flow_eth,
                metrics.recent_tx_count,
                self.config.thresholds.recency_days
            ),
            Verdict::Neutral => {
                "No strong directional behavior detected; insufficient signal for classification."
                    .to_string()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::classifier::signals::score_all;
    use crate::classifier::types::EntityType;
    use crate::config::ClassifierThresholds;

    const SUBJECT: &str = "0xaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaa";
    const BASE_TS: i64 = 1_700_000_000;
    const DAY: i64 = 86_400;

    fn eth(amount: f64) -> String {
        format!("{}", (amount * 1e18) as u128)
    }

    fn classifier() -> BehaviorClassifier {
        BehaviorClassifier::new(ClassifierConfig::default())
    }

    /// 5 inbound transfers of 30 ETH from distinct senders over 10 days.
    fn accumulation_wallet() -> Vec<TransferRecord> {
        (0..5)
            .map(|i| {
                TransferRecord::new(
                    &format!("0xb{i}"),
                    SUBJECT,
                    &eth(30.0),
                    // 2.5-day spacing: exactly 10 days first-to-last
                    Some(BASE_TS + i * 216_000),
                )
            })
            .collect()
    }

    #[test]
    fn test_empty_batch_short_circuits_to_neutral() {
        let result = classifier().classify(SUBJECT, &[], true);
        assert_eq!(result.verdict, Verdict::Neutral);
        assert_eq!(result.confidence, 0.30);
        assert_eq!(result.entity_inference, EntityType::Unknown);
        assert_eq!(result.entity_type, EntityType::Unknown);
        assert_eq!(result.behavior_summary, "No transaction data available.");
        assert!(result.metrics_used.is_none());
    }

    #[test]
    fn test_accumulation_scenario() {
        let result = classifier().classify(SUBJECT, &accumulation_wallet(), true);
        assert_eq!(result.verdict, Verdict::SmartMoneyAccumulation);
        assert_eq!(result.entity_inference, EntityType::LikelyIndividualWhale);
        assert!(result.confidence > 0.30);

        let metrics = result.metrics_used.unwrap();
        assert_eq!(metrics.net_eth, 150.0);
        assert_eq!(metrics.unique_counterparties, 5);
        // one-directional: reported as undefined, scored synthetically large
        assert_eq!(metrics.inflow_outflow_ratio, None);
        assert!(metrics.inflow_outflow_signal() > 1.5);
    }

    #[test]
    fn test_exchange_rotation_scenario() {
        // 40 roughly balanced transfers over ~5 days with 20 counterparties
        let transfers: Vec<TransferRecord> = (0..40)
            .map(|i| {
                let peer = format!("0xc{:02}", i % 20);
                let ts = Some(BASE_TS + i * 10_800); // every 3 hours
                if i % 2 == 0 {
                    TransferRecord::new(&peer, SUBJECT, &eth(5.0), ts)
                } else {
                    TransferRecord::new(SUBJECT, &peer, &eth(5.0), ts)
                }
            })
            .collect();

        let result = classifier().classify(SUBJECT, &transfers, true);
        assert_eq!(result.verdict, Verdict::ExchangeRotation);
        assert_eq!(result.entity_inference, EntityType::LikelyExchangeRotator);

        let metrics = result.metrics_used.unwrap();
        assert_eq!(metrics.unique_counterparties, 20);
        assert!(metrics.tx_frequency >= 0.5);
        assert_eq!(metrics.total_flow_eth, 200.0);
    }

    #[test]
    fn test_dormant_whale_scenario() {
        // 15 balanced transfers totaling 255 ETH: 14 in the first ~8 weeks,
        // one final transfer at day 90
        let mut transfers: Vec<TransferRecord> = (0..14)
            .map(|i| {
                let peer = format!("0xd{}", i % 4);
                let ts = Some(BASE_TS + i * (4 * DAY + 3_600));
                if i % 2 == 0 {
                    TransferRecord::new(&peer, SUBJECT, &eth(17.0), ts)
                } else {
                    TransferRecord::new(SUBJECT, &peer, &eth(17.0), ts)
                }
            })
            .collect();
        transfers.push(TransferRecord::new(
            "0xd0",
            SUBJECT,
            &eth(17.0),
            Some(BASE_TS + 90 * DAY),
        ));

        let result = classifier().classify(SUBJECT, &transfers, true);
        assert_eq!(result.verdict, Verdict::WhaleDormant);
        assert_eq!(result.entity_inference, EntityType::LikelyDormantWhale);

        let metrics = result.metrics_used.unwrap();
        assert!(metrics.dormant_candidate);
        assert_eq!(metrics.recent_tx_count, 1);
        assert!(metrics.span_days >= 60.0);
    }

    #[test]
    fn test_neutral_fallback_has_fixed_confidence() {
        // balanced small wallet over a slow span: no table reaches the floor
        let transfers = vec![
            TransferRecord::new("0xb1", SUBJECT, &eth(1.0), Some(BASE_TS)),
            TransferRecord::new(SUBJECT, "0xb2", &eth(1.0), Some(BASE_TS + 10 * DAY)),
        ];
        let result = classifier().classify(SUBJECT, &transfers, true);
        assert_eq!(result.verdict, Verdict::Neutral);
        assert_eq!(result.confidence, 0.45);
        assert_eq!(result.entity_inference, EntityType::Unknown);
        assert_eq!(
            result.behavior_summary,
            "No strong directional behavior detected; insufficient signal for classification."
        );
    }

    #[test]
    fn test_sub_floor_scores_never_promote_a_verdict() {
        // two large transfers between third parties: the only signal that
        // fires anywhere is accum_large_transfers (0.10)
        let transfers = vec![
            TransferRecord::new("0xb1", "0xb2", &eth(12.0), None),
            TransferRecord::new("0xb2", "0xb3", &eth(15.0), None),
        ];
        let result = classifier().classify(SUBJECT, &transfers, true);

        let metrics = result.metrics_used.as_ref().unwrap();
        let scores = score_all(metrics, classifier().config());
        for (_, score) in scores.entries() {
            assert!(score < 0.30);
        }
        assert_eq!(result.verdict, Verdict::Neutral);
        assert_eq!(result.confidence, 0.45);
    }

    #[test]
    fn test_confidence_stays_within_bounds() {
        let wallets = vec![
            accumulation_wallet(),
            vec![TransferRecord::new("0xb1", SUBJECT, &eth(0.2), None)],
            vec![TransferRecord::new(SUBJECT, "0xb1", &eth(500.0), Some(BASE_TS))],
        ];
        for transfers in wallets {
            let result = classifier().classify(SUBJECT, &transfers, false);
            assert!(
                (0.30..=0.95).contains(&result.confidence),
                "confidence out of range: {}",
                result.confidence
            );
        }
    }

    #[test]
    fn test_classification_is_idempotent() {
        let transfers = accumulation_wallet();
        let first = classifier().classify(SUBJECT, &transfers, true);
        let second = classifier().classify(SUBJECT, &transfers, true);
        assert_eq!(first, second);
    }

    #[test]
    fn test_accumulation_score_monotone_in_inbound_total() {
        let thresholds = ClassifierThresholds::default();
        let config = ClassifierConfig::default();

        let base = vec![
            TransferRecord::new("0xb1", SUBJECT, &eth(20.0), Some(BASE_TS)),
            TransferRecord::new(SUBJECT, "0xb2", &eth(30.0), Some(BASE_TS + DAY)),
        ];
        let mut bigger = base.clone();
        bigger[0].value = eth(80.0);

        let low = score_all(&compute_metrics(&base, SUBJECT, &thresholds), &config);
        let high = score_all(&compute_metrics(&bigger, SUBJECT, &thresholds), &config);
        assert!(high.accumulation >= low.accumulation);
    }

    #[test]
    fn test_metrics_serialization_keeps_undefined_ratio_null() {
        let transfers = accumulation_wallet();
        let result = classifier().classify(SUBJECT, &transfers, true);
        let json = serde_json::to_value(result.metrics_used.unwrap()).unwrap();
        assert!(json["inflow_outflow_ratio"].is_null());
        assert_eq!(json["total_in_eth"], 150.0);
    }

    #[test]
    fn test_relaxed_threshold_configuration() {
        // test fixtures with relaxed thresholds can coexist with defaults
        let mut config = ClassifierConfig::default();
        config.thresholds.net_inflow_min_eth = 1.0;
        config.thresholds.accum_min_inflows = 1;
        let relaxed = BehaviorClassifier::new(config);

        let transfers = vec![TransferRecord::new("0xb1", SUBJECT, &eth(2.0), None)];
        let relaxed_result = relaxed.classify(SUBJECT, &transfers, false);
        assert_eq!(relaxed_result.verdict, Verdict::SmartMoneyAccumulation);
    }
}
