//! Chess-style decision labeling. One label per trade, assigned by the
//! first matching rule in a fixed, documented order. Decision labels and
//! reason codes are closed tagged variants — there is no polymorphic
//! label hierarchy to extend.

use temper_bias::BiasMembership;
use temper_core::{DecisionEvent, DecisionLabel, ReasonCode, Session, Trade};

const LARGE_WINNER_MULTIPLE: f64 = 2.0;
const LARGE_WINNER_COOLDOWN_MS: i64 = 5 * 60 * 1000;
const LARGE_WINNER_SIZE_CEILING: f64 = 1.25;
const PLANNED_TAGS: [&str; 2] = ["plan", "setup"];
const BOOK_SIZE_CEILING: f64 = 1.25;

/// `(scoreContribution in [0,10], eloValue in [0,1])` per label, in
/// desirability order.
fn label_weights(label: DecisionLabel) -> (f64, f64) {
    match label {
        DecisionLabel::Brilliant => (10.0, 1.0),
        DecisionLabel::Great => (9.0, 0.95),
        DecisionLabel::Best => (8.5, 0.9),
        DecisionLabel::Excellent => (8.0, 0.85),
        DecisionLabel::Good => (6.5, 0.75),
        DecisionLabel::Book => (5.5, 0.65),
        DecisionLabel::Forced => (5.0, 0.5),
        DecisionLabel::Interesting => (4.5, 0.45),
        DecisionLabel::Inaccuracy => (4.0, 0.4),
        DecisionLabel::Mistake => (2.5, 0.25),
        DecisionLabel::Miss => (2.0, 0.2),
        DecisionLabel::Blunder => (1.0, 0.1),
        DecisionLabel::Megablunder => (0.0, 0.0),
        // Session-result labels are not produced by the per-trade rule set.
        DecisionLabel::Winner
        | DecisionLabel::Draw
        | DecisionLabel::Resign
        | DecisionLabel::Checkmated => (5.0, 0.5),
    }
}

pub fn label_trades(session: &Session, membership: &BiasMembership) -> Vec<DecisionEvent> {
    let avg_win = session.aggregates.avg_win;
    let avg_loss_abs = session.aggregates.avg_loss.abs();

    session
        .trades
        .iter()
        .map(|trade| label_one(trade, membership, avg_win, avg_loss_abs))
        .collect()
}

fn label_one(
    trade: &Trade,
    membership: &BiasMembership,
    avg_win: f64,
    avg_loss_abs: f64,
) -> DecisionEvent {
    let (label, reasons, explanation) = classify(trade, membership, avg_win, avg_loss_abs);
    let (score_contribution, elo_value) = label_weights(label);

    DecisionEvent {
        trade_id: trade.id,
        trade_index: trade.index,
        label,
        symbol: trade.symbol.clone(),
        reasons,
        score_contribution,
        elo_value,
        explanation,
    }
}

fn classify(
    trade: &Trade,
    membership: &BiasMembership,
    avg_win: f64,
    avg_loss_abs: f64,
) -> (DecisionLabel, Vec<ReasonCode>, String) {
    if membership.tilt_cluster.contains(&trade.index) {
        let label = if trade.pnl <= -2.0 * avg_loss_abs {
            DecisionLabel::Megablunder
        } else {
            DecisionLabel::Blunder
        };
        return (
            label,
            vec![ReasonCode::OvertradeCluster],
            "part of a tilt cluster of oversized consecutive losers".to_string(),
        );
    }

    if membership.revenge_trading.contains(&trade.index) {
        let label = if trade.pnl < 0.0 {
            DecisionLabel::Blunder
        } else {
            DecisionLabel::Mistake
        };
        return (
            label,
            vec![ReasonCode::RevengeAfterBigLoss],
            "oversized re-entry within minutes of a big loss".to_string(),
        );
    }

    if membership.overtrading.contains(&trade.index) {
        let label = if trade.pnl < 0.0 {
            DecisionLabel::Mistake
        } else {
            DecisionLabel::Inaccuracy
        };
        return (
            label,
            vec![ReasonCode::OvertradeCluster],
            "placed beyond the user's normal daily trade count".to_string(),
        );
    }

    if membership.fomo.contains(&trade.index) {
        let label = if trade.pnl < 0.0 {
            DecisionLabel::Mistake
        } else {
            DecisionLabel::Inaccuracy
        };
        return (
            label,
            vec![ReasonCode::FomoLateEntry],
            "chased the prior trade's direction within seconds, oversized".to_string(),
        );
    }

    if membership.loss_aversion.contains(&trade.index) {
        return (
            DecisionLabel::Miss,
            vec![ReasonCode::LossHeldTooLong],
            "held a losing position well past the user's typical hold time".to_string(),
        );
    }

    let is_large_winner = trade.pnl >= LARGE_WINNER_MULTIPLE * avg_win
        && trade
            .time_since_last_trade_ms
            .map(|gap| gap >= LARGE_WINNER_COOLDOWN_MS)
            .unwrap_or(true)
        && trade.size_relative_to_baseline <= LARGE_WINNER_SIZE_CEILING;
    if is_large_winner {
        return (
            DecisionLabel::Brilliant,
            vec![ReasonCode::DisciplinedExit],
            "patient, normally-sized entry that became a standout winner".to_string(),
        );
    }

    let has_plan_tag = trade
        .tags
        .iter()
        .any(|tag| PLANNED_TAGS.contains(&tag.to_lowercase().as_str()));
    if trade.is_win && has_plan_tag {
        return (
            DecisionLabel::Excellent,
            vec![ReasonCode::FollowedPlan],
            "winning trade executed against a pre-written plan".to_string(),
        );
    }

    if trade.is_win {
        return (
            DecisionLabel::Good,
            Vec::new(),
            "a straightforward winner".to_string(),
        );
    }

    let is_book_loss =
        trade.pnl < 0.0 && trade.pnl.abs() <= avg_loss_abs && trade.size_relative_to_baseline <= BOOK_SIZE_CEILING;
    if is_book_loss {
        return (
            DecisionLabel::Book,
            vec![ReasonCode::DisciplinedExit],
            "a normally-sized loss within the user's usual range".to_string(),
        );
    }

    (
        DecisionLabel::Forced,
        Vec::new(),
        "no bias pattern matched; graded on context alone".to_string(),
    )
}
