use std::collections::{BTreeMap, BTreeSet};

use temper_core::{BiasDetail, BiasType, Session, UserBaseline};

const RAPID_FIRE_THRESHOLD_MS: i64 = 120_000;
const RAPID_FIRE_FRACTION_TRIGGER: f64 = 0.3;
const RAPID_FIRE_BONUS_MAX: f64 = 25.0;

/// Output of a single bias scorer: the auditable score/metrics detail, and
/// the set of trade indices the labeler should treat as tagged for this
/// bias when it decides per-trade grades.
pub struct ScorerOutput {
    pub detail: BiasDetail,
    pub tagged_trades: BTreeSet<usize>,
}

pub fn score(session: &Session, baseline: &UserBaseline) -> ScorerOutput {
    let trade_count = session.trades.len() as f64;
    let denom = baseline.avg_trades_per_day.max(1.0);
    let ratio = trade_count / denom;

    let base = ((ratio - 1.0) / 2.0 * 100.0).clamp(0.0, 100.0);

    let intervals: Vec<i64> = session
        .trades
        .iter()
        .filter_map(|t| t.time_since_last_trade_ms)
        .collect();
    let rapid_fire_fraction = if intervals.is_empty() {
        0.0
    } else {
        intervals
            .iter()
            .filter(|&&gap| gap < RAPID_FIRE_THRESHOLD_MS)
            .count() as f64
            / intervals.len() as f64
    };

    let bonus = if rapid_fire_fraction > RAPID_FIRE_FRACTION_TRIGGER {
        ((rapid_fire_fraction - RAPID_FIRE_FRACTION_TRIGGER) / (1.0 - RAPID_FIRE_FRACTION_TRIGGER)
            * RAPID_FIRE_BONUS_MAX)
            .clamp(0.0, RAPID_FIRE_BONUS_MAX)
    } else {
        0.0
    };

    let score_value = (base + bonus).clamp(0.0, 100.0);

    let mut triggered_rules = Vec::new();
    if ratio > 1.0 {
        triggered_rules.push(format!("TRADE_RATIO_{:.2}X_BASELINE", ratio));
    }
    if bonus > 0.0 {
        triggered_rules.push(format!("RAPID_FIRE_FRACTION_{:.2}", rapid_fire_fraction));
    }

    // Every trade beyond the user's normal daily count is overtrading-tagged,
    // matching the labeler's "overtrading-tagged" predicate.
    let baseline_count = baseline.avg_trades_per_day.round().max(0.0) as usize;
    let tagged_trades: BTreeSet<usize> = session
        .trades
        .iter()
        .filter(|t| t.running_trade_count > baseline_count)
        .map(|t| t.index)
        .collect();

    let mut metrics = BTreeMap::new();
    metrics.insert("trade_count".to_string(), trade_count);
    metrics.insert("avg_trades_per_day".to_string(), baseline.avg_trades_per_day);
    metrics.insert("ratio".to_string(), ratio);
    metrics.insert("rapid_fire_fraction".to_string(), rapid_fire_fraction);

    ScorerOutput {
        detail: BiasDetail {
            bias_type: BiasType::Overtrading,
            score: score_value,
            metrics,
            triggered_rules,
        },
        tagged_trades,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::DateTime;
    use temper_core::{ProfitFactor, Side, Trade};
    use uuid::Uuid;

    fn trade(index: usize, gap_ms: Option<i64>) -> Trade {
        Trade {
            id: Uuid::new_v4(),
            index,
            timestamp: DateTime::parse_from_rfc3339("2026-02-06T09:30:00Z")
                .unwrap()
                .into(),
            timestamp_ms: 0,
            symbol: "AAPL".to_string(),
            side: Side::Long,
            quantity: 100.0,
            price: 100.0,
            pnl: 10.0,
            tags: Vec::new(),
            running_pnl: 10.0 * (index as f64 + 1.0),
            running_trade_count: index + 1,
            peak_pnl_at_trade: 10.0 * (index as f64 + 1.0),
            drawdown_from_peak: 0.0,
            time_since_last_trade_ms: gap_ms,
            size_relative_to_baseline: 1.0,
            is_win: true,
            r_multiple: None,
        }
    }

    fn session_with(count: usize, gap_ms: Option<i64>) -> Session {
        let trades: Vec<Trade> = (0..count).map(|i| trade(i, if i == 0 { None } else { gap_ms })).collect();
        Session {
            id: Uuid::new_v4(),
            user_id: "u".to_string(),
            date: chrono::NaiveDate::from_ymd_opt(2026, 2, 6).unwrap(),
            aggregates: temper_core::SessionAggregates {
                total_pnl: 0.0,
                max_drawdown: 0.0,
                max_runup: 0.0,
                trade_count: trades.len(),
                win_count: 0,
                loss_count: 0,
                win_rate: 0.0,
                avg_win: 0.0,
                avg_loss: 0.0,
                profit_factor: ProfitFactor::Infinite,
                largest_win: 0.0,
                largest_loss: 0.0,
                avg_holding_time_ms: 0.0,
                avg_win_holding_time_ms: 0.0,
                avg_loss_holding_time_ms: 0.0,
                peak_pnl: 0.0,
                distinct_symbols: Vec::new(),
                duration_ms: 0,
                avg_position_size: 0.0,
            },
            trades,
        }
    }

    #[test]
    fn at_baseline_ratio_score_is_zero() {
        let session = session_with(5, Some(600_000));
        let out = score(&session, &UserBaseline::default());
        assert_eq!(out.detail.score, 0.0);
    }

    #[test]
    fn triple_baseline_volume_maxes_the_base_score() {
        let baseline = UserBaseline::default();
        let session = session_with(15, Some(600_000));
        let out = score(&session, &baseline);
        assert!(out.detail.score >= 100.0 - 1e-9);
    }

    #[test]
    fn rapid_fire_entries_add_a_bonus() {
        let baseline = UserBaseline::default();
        let session = session_with(5, Some(10_000));
        let out = score(&session, &baseline);
        assert!(out.detail.score > 0.0);
    }
}
