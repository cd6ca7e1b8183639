use std::collections::{BTreeMap, BTreeSet};

use temper_core::{BiasDetail, BiasType, Session, UserBaseline};

use crate::overtrading::ScorerOutput;

const GAP_THRESHOLD_MS: i64 = 30_000;
const SIZE_MULTIPLE: f64 = 1.5;
const SCORE_PER_EVENT: f64 = 20.0;

pub fn score(session: &Session, _baseline: &UserBaseline) -> ScorerOutput {
    let mut tagged_trades = BTreeSet::new();

    for window in session.trades.windows(2) {
        let (prev, entry) = (&window[0], &window[1]);
        let fast = entry
            .time_since_last_trade_ms
            .map(|gap| gap < GAP_THRESHOLD_MS)
            .unwrap_or(false);
        let oversized = entry.size_relative_to_baseline > SIZE_MULTIPLE;
        let chases_direction = entry.side == prev.side;
        if fast && oversized && chases_direction {
            tagged_trades.insert(entry.index);
        }
    }

    let count = tagged_trades.len();
    let score_value = (SCORE_PER_EVENT * count as f64).clamp(0.0, 100.0);

    let mut triggered_rules = Vec::new();
    if count > 0 {
        triggered_rules.push(format!("LATE_CHASE_ENTRY_X{count}"));
    }

    let mut metrics = BTreeMap::new();
    metrics.insert("event_count".to_string(), count as f64);

    ScorerOutput {
        detail: BiasDetail {
            bias_type: BiasType::Fomo,
            score: score_value,
            metrics,
            triggered_rules,
        },
        tagged_trades,
    }
}
