use std::collections::{BTreeMap, BTreeSet};

use temper_core::{BiasDetail, BiasType, Session, UserBaseline};

use crate::overtrading::ScorerOutput;

const RATIO_FLOOR: f64 = 1.0;
const RATIO_CEIL: f64 = 4.0;
const SIZE_DROP_MULTIPLE: f64 = 0.7;
const SIZE_DROP_BONUS: f64 = 5.0;

pub fn score(session: &Session, baseline: &UserBaseline) -> ScorerOutput {
    let ratio = session.aggregates.avg_loss_holding_time_ms
        / session.aggregates.avg_win_holding_time_ms.max(1.0);

    let base = ((ratio - RATIO_FLOOR) / (RATIO_CEIL - RATIO_FLOOR) * 100.0).clamp(0.0, 100.0);

    let mut shrink_count = 0usize;
    for window in session.trades.windows(2) {
        let (prior, after) = (&window[0], &window[1]);
        if prior.pnl < 0.0 && after.quantity < SIZE_DROP_MULTIPLE * prior.quantity {
            shrink_count += 1;
        }
    }
    let bonus = (shrink_count as f64 * SIZE_DROP_BONUS).clamp(0.0, 100.0 - base.min(100.0));
    let score_value = (base + bonus).clamp(0.0, 100.0);

    // Losing trades held longer than the user's typical loss-holding time
    // are the ones the labeler should grade as MISS.
    let tagged_trades: BTreeSet<usize> = session
        .trades
        .iter()
        .filter(|t| {
            t.pnl < 0.0
                && t.time_since_last_trade_ms
                    .map(|gap| gap as f64 > baseline.avg_loss_holding_time_ms)
                    .unwrap_or(false)
        })
        .map(|t| t.index)
        .collect();

    let mut triggered_rules = Vec::new();
    if ratio > RATIO_FLOOR {
        triggered_rules.push(format!("HOLDING_TIME_ASYMMETRY_{:.2}X", ratio));
    }
    if shrink_count > 0 {
        triggered_rules.push(format!("SIZE_SHRINK_AFTER_LOSS_X{shrink_count}"));
    }

    let mut metrics = BTreeMap::new();
    metrics.insert("ratio".to_string(), ratio);
    metrics.insert(
        "avg_loss_holding_time_ms".to_string(),
        session.aggregates.avg_loss_holding_time_ms,
    );
    metrics.insert(
        "avg_win_holding_time_ms".to_string(),
        session.aggregates.avg_win_holding_time_ms,
    );
    metrics.insert("shrink_count".to_string(), shrink_count as f64);

    ScorerOutput {
        detail: BiasDetail {
            bias_type: BiasType::LossAversion,
            score: score_value,
            metrics,
            triggered_rules,
        },
        tagged_trades,
    }
}
