use std::collections::{BTreeMap, BTreeSet};

use temper_core::{BiasDetail, BiasType, Session, UserBaseline};

use crate::overtrading::ScorerOutput;

const REVENGE_WINDOW_MS: i64 = 15 * 60 * 1000;
const REVENGE_SIZE_MULTIPLE: f64 = 2.5;
const REVENGE_SCORE_PER_EVENT: f64 = 25.0;
const BACK_TO_BACK_GAP_MS: i64 = 60_000;
const BACK_TO_BACK_DRAWDOWN_MULTIPLE: f64 = 1.5;
const BACK_TO_BACK_BONUS: f64 = 10.0;

pub fn score(session: &Session, _baseline: &UserBaseline) -> ScorerOutput {
    let avg_loss_abs = session.aggregates.avg_loss.abs();
    let big_loss_threshold = 400.0_f64.max(2.0 * avg_loss_abs);

    let mut tagged_trades = BTreeSet::new();
    let mut event_count = 0usize;

    for (i, loss) in session.trades.iter().enumerate() {
        if loss.pnl >= 0.0 || loss.pnl.abs() < big_loss_threshold {
            continue;
        }
        let mut triggered = false;
        for follower in session.trades.iter().skip(i + 1) {
            let gap = follower.timestamp_ms - loss.timestamp_ms;
            if gap > REVENGE_WINDOW_MS {
                break;
            }
            if follower.size_relative_to_baseline >= REVENGE_SIZE_MULTIPLE {
                tagged_trades.insert(follower.index);
                triggered = true;
            }
        }
        if triggered {
            event_count += 1;
        }
    }

    let mut back_to_back_bonus_count = 0usize;
    for window in session.trades.windows(2) {
        let (a, b) = (&window[0], &window[1]);
        let both_losses = a.pnl < 0.0 && b.pnl < 0.0;
        let tight_gap = b
            .time_since_last_trade_ms
            .map(|g| g < BACK_TO_BACK_GAP_MS)
            .unwrap_or(false);
        let combined_drawdown = (a.pnl + b.pnl).abs();
        if both_losses
            && tight_gap
            && combined_drawdown > BACK_TO_BACK_DRAWDOWN_MULTIPLE * avg_loss_abs
        {
            back_to_back_bonus_count += 1;
        }
    }

    let score_value = (REVENGE_SCORE_PER_EVENT * event_count as f64
        + BACK_TO_BACK_BONUS * back_to_back_bonus_count as f64)
        .clamp(0.0, 100.0);

    let mut triggered_rules = Vec::new();
    if event_count > 0 {
        triggered_rules.push(format!("BIG_LOSS_THEN_OVERSIZED_REENTRY_X{event_count}"));
    }
    if back_to_back_bonus_count > 0 {
        triggered_rules.push(format!("BACK_TO_BACK_LOSSES_X{back_to_back_bonus_count}"));
    }

    let mut metrics = BTreeMap::new();
    metrics.insert("big_loss_threshold".to_string(), big_loss_threshold);
    metrics.insert("event_count".to_string(), event_count as f64);
    metrics.insert(
        "back_to_back_bonus_count".to_string(),
        back_to_back_bonus_count as f64,
    );

    ScorerOutput {
        detail: BiasDetail {
            bias_type: BiasType::RevengeTrading,
            score: score_value,
            metrics,
            triggered_rules,
        },
        tagged_trades,
    }
}
