use std::collections::{BTreeMap, BTreeSet};

use temper_core::{BiasDetail, BiasType, Session, UserBaseline};

use crate::overtrading::ScorerOutput;

const SIZE_MULTIPLE: f64 = 1.5;
const SCORE_PER_OCCURRENCE: f64 = 20.0;
const RUNUP_VS_DRAWDOWN_MULTIPLE: f64 = 2.0;
const OVERSTAY_BONUS: f64 = 20.0;

pub fn score(session: &Session, baseline: &UserBaseline) -> ScorerOutput {
    let mut occurrence_count = 0usize;

    for i in 0..session.trades.len().saturating_sub(1) {
        let t = &session.trades[i];
        let set_new_peak = t.running_pnl >= t.peak_pnl_at_trade - f64::EPSILON;
        if set_new_peak && session.trades[i + 1].size_relative_to_baseline > SIZE_MULTIPLE {
            occurrence_count += 1;
        }
    }

    let overstayed = session.aggregates.max_runup
        >= RUNUP_VS_DRAWDOWN_MULTIPLE * session.aggregates.max_drawdown.abs()
        && session.trades.len() as f64 > baseline.avg_trades_per_day;

    let mut score_value = SCORE_PER_OCCURRENCE * occurrence_count as f64;
    if overstayed {
        score_value += OVERSTAY_BONUS;
    }
    let score_value = score_value.clamp(0.0, 100.0);

    let mut triggered_rules = Vec::new();
    if occurrence_count > 0 {
        triggered_rules.push(format!("SIZE_UP_AFTER_NEW_PEAK_X{occurrence_count}"));
    }
    if overstayed {
        triggered_rules.push("OVERSTAYED_WINNING_SESSION".to_string());
    }

    let mut metrics = BTreeMap::new();
    metrics.insert("occurrence_count".to_string(), occurrence_count as f64);
    metrics.insert("max_runup".to_string(), session.aggregates.max_runup);
    metrics.insert("max_drawdown".to_string(), session.aggregates.max_drawdown);

    ScorerOutput {
        detail: BiasDetail {
            bias_type: BiasType::Greed,
            score: score_value,
            metrics,
            triggered_rules,
        },
        // Greed does not gate an individual trade's label in the base
        // contract; it only contributes to the aggregate and the penalty.
        tagged_trades: BTreeSet::new(),
    }
}
