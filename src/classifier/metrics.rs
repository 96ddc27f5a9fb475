use bigdecimal::BigDecimal;
use bigdecimal::ToPrimitive;
use std::collections::HashSet;
use std::str::FromStr;

use crate::config::ClassifierThresholds;

use super::types::{BehaviorMetrics, TransferRecord};

/// The native unit carries 18 fractional decimal digits.
const WEI_DECIMALS: u32 = 18;

const SECS_PER_DAY: f64 = 24.0 * 3600.0;

/// Convert a wei amount string to whole ETH. Parsing goes through
/// BigDecimal so amounts beyond 64-bit range keep their precision until the
/// final float conversion; anything unparseable maps to 0.0.
pub fn wei_to_eth(wei: &str) -> f64 {
    let Ok(raw) = BigDecimal::from_str(wei.trim()) else {
        return 0.0;
    };
    let divisor = BigDecimal::from(10u64.pow(WEI_DECIMALS));
    (raw / divisor).to_f64().unwrap_or(0.0)
}

pub(crate) fn round_to(value: f64, places: i32) -> f64 {
    let factor = 10f64.powi(places);
    (value * factor).round() / factor
}

/// Derive all behavior metrics for one subject address in a single pass
/// over the transfer batch. Never fails: malformed values, timestamps, and
/// addresses degrade to zero/absent.
pub fn compute_metrics(
    transfers: &[TransferRecord],
    subject: &str,
    thresholds: &ClassifierThresholds,
) -> BehaviorMetrics {
    let subject = subject.trim().to_lowercase();

    let mut total_in = 0.0f64;
    let mut total_out = 0.0f64;
    let mut counterparties: HashSet<String> = HashSet::new();
    let mut large_transfers = 0u32;
    let mut spike_count = 0u32;
    let mut spike_total = 0.0f64;
    let mut in_values: Vec<f64> = Vec::new();
    let mut out_values: Vec<f64> = Vec::new();
    let mut timestamps: Vec<i64> = Vec::new();
    let mut hour_counts = [0u32; 24];

    for tx in transfers {
        let from = tx.from.trim().to_lowercase();
        let to = tx.to.trim().to_lowercase();
        let value_eth = wei_to_eth(&tx.value);

        if let Some(ts) = tx.timestamp() {
            timestamps.push(ts);
            let hour = ts.div_euclid(3600).rem_euclid(24) as usize;
            hour_counts[hour] += 1;
        }

        if !subject.is_empty() && from == subject {
            total_out += value_eth;
            out_values.push(value_eth);
            if !to.is_empty() {
                counterparties.insert(to.clone());
            }
        }
        if !subject.is_empty() && to == subject {
            total_in += value_eth;
            in_values.push(value_eth);
            if !from.is_empty() {
                counterparties.insert(from);
            }
        }

        if value_eth >= thresholds.large_transfer_eth {
            large_transfers += 1;
        }
        if value_eth >= thresholds.spike_eth {
            spike_count += 1;
            spike_total += value_eth;
        }
    }

    let total_in = round_to(total_in, 4);
    let total_out = round_to(total_out, 4);
    let net_eth = round_to(total_in - total_out, 4);
    let total_txs = transfers.len() as u32;

    let first_seen = timestamps.iter().min().copied();
    let last_seen = timestamps.iter().max().copied();

    let span_days = match (first_seen, last_seen) {
        (Some(first), Some(last)) => (last - first) as f64 / SECS_PER_DAY,
        _ => 0.0,
    };
    let tx_frequency = if span_days >= thresholds.tx_freq_min_days {
        round_to(total_txs as f64 / span_days, 4)
    } else {
        0.0
    };
    let span_days = round_to(span_days, 2);

    let recent_tx_count = match last_seen {
        Some(last) => {
            let cutoff = last - thresholds.recency_days * 24 * 3600;
            timestamps.iter().filter(|ts| **ts >= cutoff).count() as u32
        }
        None => 0,
    };

    let inflow_outflow_ratio = if total_out > 0.0 {
        Some(round_to(total_in / total_out, 4))
    } else {
        None
    };
    let outflow_inflow_ratio = if total_in > 0.0 {
        Some(round_to(total_out / total_in, 4))
    } else {
        None
    };

    // Staggered distribution: many smaller outflows rather than one big one
    let median_out = median(&mut out_values);
    let staggered_exits = out_values.len() as u32 >= thresholds.dist_min_outflows
        && median_out < thresholds.large_transfer_eth
        && total_out > thresholds.net_outflow_min_eth;

    let max_same_hour = hour_counts.iter().max().copied().unwrap_or(0);
    let repeated_timing = max_same_hour >= thresholds.timing_min_txs_for_pattern;

    let total_flow_eth = round_to(total_in + total_out, 4);
    let historically_large = total_flow_eth >= thresholds.whale_historical_eth;
    let dormant_candidate = total_txs >= thresholds.recency_min_historical_txs
        && recent_tx_count <= thresholds.recency_max_txs_dormant
        && historically_large;

    BehaviorMetrics {
        total_in_eth: total_in,
        total_out_eth: total_out,
        net_eth,
        inflow_outflow_ratio,
        outflow_inflow_ratio,
        total_txs,
        span_days,
        tx_frequency,
        unique_counterparties: counterparties.len() as u32,
        large_transfers_count: large_transfers,
        spike_count,
        spike_total_eth: round_to(spike_total, 4),
        recent_tx_count,
        first_seen,
        last_seen,
        staggered_exits,
        repeated_timing,
        total_flow_eth,
        historically_large,
        dormant_candidate,
        num_inflows: in_values.len() as u32,
        num_outflows: out_values.len() as u32,
    }
}

/// Upper median of the value list (sorts in place). 0.0 when empty.
fn median(values: &mut [f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    values.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));
    values[values.len() / 2]
}
