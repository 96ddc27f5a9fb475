use std::collections::HashMap;

use crate::config::{ClassifierConfig, ClassifierThresholds};

use super::metrics::round_to;
use super::types::{BehaviorMetrics, Verdict, VerdictScores};

/// One weighted predicate over the metrics bag. The tables below are the
/// scoring rules as data; weights can be overridden per signal name through
/// `[classifier.signal_weights]` without touching the scoring routine.
pub struct Signal {
    pub name: &'static str,
    pub weight: f64,
    pub check: fn(&BehaviorMetrics, &ClassifierThresholds) -> bool,
}

/// Inflow dominance, repeated buys, few counterparties, large inflows.
pub static ACCUMULATION_SIGNALS: &[Signal] = &[
    Signal {
        name: "accum_inflow_ratio",
        weight: 0.30,
        check: |m, t| m.inflow_outflow_signal() >= t.inflow_outflow_ratio_accum,
    },
    Signal {
        name: "accum_net_inflow",
        weight: 0.25,
        check: |m, t| m.net_eth >= t.net_inflow_min_eth,
    },
    Signal {
        name: "accum_repeated_inflows",
        weight: 0.20,
        check: |m, t| m.num_inflows >= t.accum_min_inflows && m.total_in_eth >= t.net_inflow_min_eth,
    },
    Signal {
        name: "accum_concentrated_sources",
        weight: 0.15,
        check: |m, t| {
            m.unique_counterparties <= t.counterparties_few
                && m.total_in_eth >= t.large_transfer_eth
        },
    },
    Signal {
        name: "accum_large_transfers",
        weight: 0.10,
        check: |m, t| m.large_transfers_count >= t.large_transfers_min_count,
    },
];

/// Outflow dominance, staggered exits, distribution pattern.
pub static DISTRIBUTION_SIGNALS: &[Signal] = &[
    Signal {
        name: "dist_outflow_ratio",
        weight: 0.30,
        check: |m, t| m.outflow_inflow_signal() >= t.outflow_inflow_ratio_dist,
    },
    Signal {
        name: "dist_net_outflow",
        weight: 0.25,
        check: |m, t| m.net_eth <= -t.net_outflow_min_eth,
    },
    Signal {
        name: "dist_staggered_exits",
        weight: 0.20,
        check: |m, _| m.staggered_exits,
    },
    Signal {
        name: "dist_many_outflows",
        weight: 0.15,
        check: |m, t| m.num_outflows >= t.dist_min_outflows,
    },
    Signal {
        name: "dist_spike_outflow",
        weight: 0.10,
        check: |m, _| m.spike_count >= 1 && m.total_out_eth > m.total_in_eth,
    },
];

/// Many counterparties, high tx frequency, routing behavior.
pub static EXCHANGE_ROTATION_SIGNALS: &[Signal] = &[
    Signal {
        name: "exch_many_counterparties",
        weight: 0.35,
        check: |m, t| m.unique_counterparties >= t.counterparties_many,
    },
    Signal {
        name: "exch_high_frequency",
        weight: 0.30,
        check: |m, t| {
            m.tx_frequency >= t.tx_freq_high_per_day || m.total_txs >= t.exchange_rotation_min_txs
        },
    },
    Signal {
        name: "exch_large_total_flow",
        weight: 0.20,
        check: |m, t| m.total_flow_eth >= t.whale_historical_eth,
    },
    Signal {
        name: "exch_repeated_timing",
        weight: 0.15,
        check: |m, _| m.repeated_timing,
    },
];

/// Historically large flow, little recent activity.
pub static WHALE_DORMANT_SIGNALS: &[Signal] = &[
    Signal {
        name: "dorm_dormancy_candidate",
        weight: 0.45,
        check: |m, _| m.dormant_candidate,
    },
    Signal {
        name: "dorm_low_recency_large",
        weight: 0.30,
        check: |m, t| m.recent_tx_count <= t.recency_max_txs_dormant && m.historically_large,
    },
    Signal {
        name: "dorm_long_span_quiet",
        weight: 0.25,
        check: |m, t| {
            m.span_days >= t.recency_span_days_whale
                && m.recent_tx_count <= t.dormant_strict_recent_max
        },
    },
];

pub fn verdict_signals(verdict: Verdict) -> &'static [Signal] {
    match verdict {
        Verdict::SmartMoneyAccumulation => ACCUMULATION_SIGNALS,
        Verdict::StealthDistribution => DISTRIBUTION_SIGNALS,
        Verdict::ExchangeRotation => EXCHANGE_ROTATION_SIGNALS,
        Verdict::WhaleDormant => WHALE_DORMANT_SIGNALS,
        Verdict::Neutral => &[],
    }
}

/// Score one verdict's table: sum of matched weights normalized by the sum
/// of all weights, so every verdict tops out at 1.0 regardless of how many
/// signals it defines.
fn score_signals(
    signals: &[Signal],
    metrics: &BehaviorMetrics,
    thresholds: &ClassifierThresholds,
    overrides: &HashMap<String, f64>,
) -> f64 {
    let weight_of =
        |s: &Signal| -> f64 { overrides.get(s.name).copied().unwrap_or(s.weight).max(0.0) };

    let max_score: f64 = signals.iter().map(|s| weight_of(s)).sum();
    if max_score <= 0.0 {
        return 0.0;
    }
    let raw: f64 = signals
        .iter()
        .filter(|s| (s.check)(metrics, thresholds))
        .map(|s| weight_of(s))
        .sum();

    round_to(raw / max_score, 4).min(1.0)
}

/// Evaluate every candidate verdict against the metrics bag.
pub fn score_all(metrics: &BehaviorMetrics, config: &ClassifierConfig) -> VerdictScores {
    let t = &config.thresholds;
    let w = &config.signal_weights;
    VerdictScores {
        accumulation: score_signals(ACCUMULATION_SIGNALS, metrics, t, w),
        distribution: score_signals(DISTRIBUTION_SIGNALS, metrics, t, w),
        exchange_rotation: score_signals(EXCHANGE_ROTATION_SIGNALS, metrics, t, w),
        whale_dormant: score_signals(WHALE_DORMANT_SIGNALS, metrics, t, w),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> ClassifierConfig {
        ClassifierConfig::default()
    }

    fn accumulation_metrics() -> BehaviorMetrics {
        BehaviorMetrics {
            total_in_eth: 150.0,
            net_eth: 150.0,
            num_inflows: 5,
            unique_counterparties: 5,
            large_transfers_count: 5,
            total_txs: 5,
            ..Default::default()
        }
    }

    #[test]
    fn test_accumulation_table_saturates_at_one() {
        let scores = score_all(&accumulation_metrics(), &config());
        // all five signals hit (ratio via the synthetic one-directional path)
        assert_eq!(scores.accumulation, 1.0);
        assert_eq!(scores.distribution, 0.0);
        assert_eq!(scores.whale_dormant, 0.0);
    }

    #[test]
    fn test_scores_stay_within_unit_interval() {
        let metrics = BehaviorMetrics {
            total_in_eth: 100.0,
            total_out_eth: 100.0,
            total_flow_eth: 200.0,
            unique_counterparties: 20,
            total_txs: 40,
            tx_frequency: 8.0,
            num_inflows: 20,
            num_outflows: 20,
            repeated_timing: true,
            recent_tx_count: 40,
            ..Default::default()
        };
        let scores = score_all(&metrics, &config());
        for (_, score) in scores.entries() {
            assert!((0.0..=1.0).contains(&score), "score out of range: {score}");
        }
        assert_eq!(scores.exchange_rotation, 1.0);
    }

    #[test]
    fn test_distribution_signals() {
        let metrics = BehaviorMetrics {
            total_in_eth: 10.0,
            total_out_eth: 80.0,
            net_eth: -70.0,
            inflow_outflow_ratio: Some(0.125),
            outflow_inflow_ratio: Some(8.0),
            num_outflows: 8,
            unique_counterparties: 8,
            staggered_exits: true,
            spike_count: 1,
            total_txs: 10,
            ..Default::default()
        };
        let scores = score_all(&metrics, &config());
        assert_eq!(scores.distribution, 1.0);
        assert!(scores.accumulation < 0.30);
    }

    #[test]
    fn test_weight_override_renormalizes() {
        let metrics = accumulation_metrics();
        let mut config = config();
        // silence the net-inflow signal entirely
        config
            .signal_weights
            .insert("accum_net_inflow".to_string(), 0.0);
        let scores = score_all(&metrics, &config);
        // the remaining signals all hit, so the score still saturates
        assert_eq!(scores.accumulation, 1.0);

        // boost one signal and miss it: score drops below the default miss
        let mut config2 = ClassifierConfig::default();
        config2
            .signal_weights
            .insert("accum_inflow_ratio".to_string(), 0.70);
        let mut balanced = accumulation_metrics();
        balanced.total_out_eth = 150.0;
        balanced.net_eth = 0.0;
        balanced.inflow_outflow_ratio = Some(1.0);
        let scores = score_all(&balanced, &config2);
        // hit: repeated_inflows 0.20 + concentrated 0.15 + large 0.10 = 0.45
        // max: 0.70 + 0.25 + 0.45 = 1.40
        assert_eq!(scores.accumulation, round_to(0.45 / 1.40, 4));
    }

    #[test]
    fn test_negative_override_clamped_to_zero() {
        let metrics = accumulation_metrics();
        let mut config = config();
        config
            .signal_weights
            .insert("accum_inflow_ratio".to_string(), -5.0);
        let scores = score_all(&metrics, &config);
        // clamped to 0 means dropped from both numerator and denominator
        assert_eq!(scores.accumulation, 1.0);
        assert!(scores.accumulation <= 1.0);
    }

    #[test]
    fn test_dormant_signals() {
        let metrics = BehaviorMetrics {
            total_txs: 15,
            total_flow_eth: 250.0,
            historically_large: true,
            dormant_candidate: true,
            recent_tx_count: 1,
            span_days: 90.0,
            ..Default::default()
        };
        let scores = score_all(&metrics, &config());
        assert_eq!(scores.whale_dormant, 1.0);
    }
}
