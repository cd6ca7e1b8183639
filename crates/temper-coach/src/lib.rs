//! Coach-facts builder: projects a `TemperReport` into the flat,
//! free-text-free payload an LLM coach consumes. No field here is a
//! sentence — every string is an engine-authored explanation already
//! attached to a decision.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use temper_bias::tilt;
use temper_core::{BiasScores, BiasType, DecisionLabel, ReasonCode, Session, TemperReport};
use uuid::Uuid;

const MAX_MAGNITUDE_EVENTS: usize = 5;
const BEST_STREAK_THRESHOLD: f64 = 0.75;
const WORST_STREAK_THRESHOLD: f64 = 0.3;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KeyEvent {
    pub trade_index: usize,
    pub symbol: String,
    pub label: DecisionLabel,
    pub pnl: f64,
    pub explanation: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TiltSequence {
    pub start_index: usize,
    pub end_index: usize,
    pub duration_description: String,
    pub aggregate_pnl: f64,
    pub dominant_bias: BiasType,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Streak {
    pub start_index: usize,
    pub end_index: usize,
    pub length: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Streaks {
    pub best: Option<Streak>,
    pub worst: Option<Streak>,
}

/// Headline numbers a coach opens with, before any per-trade detail.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CoachFactsOverview {
    pub temper_score: u32,
    pub bias_scores: BiasScores,
    pub elo_delta: f64,
}

/// Everything `temper-replay` produced, minus the trades themselves — the
/// coach gets the shape of the rule violations, never the raw ledger.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DisciplinedReplaySummary {
    pub original_pnl: f64,
    pub disciplined_pnl: f64,
    pub trades_kept: usize,
    pub trades_removed: usize,
    pub removed_trade_ids: Vec<Uuid>,
    pub removed_reasons: BTreeMap<Uuid, ReasonCode>,
    pub savings: f64,
}

impl From<&temper_core::DisciplinedSessionResult> for DisciplinedReplaySummary {
    fn from(result: &temper_core::DisciplinedSessionResult) -> Self {
        DisciplinedReplaySummary {
            original_pnl: result.original_pnl,
            disciplined_pnl: result.disciplined_pnl,
            trades_kept: result.trades_kept,
            trades_removed: result.trades_removed,
            removed_trade_ids: result.removed_trade_ids.clone(),
            removed_reasons: result.removed_reasons.clone(),
            savings: result.savings,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CoachFactsPayload {
    pub overview: CoachFactsOverview,
    pub label_summary: BTreeMap<DecisionLabel, u32>,
    pub key_events: Vec<KeyEvent>,
    pub tilt_sequences: Vec<TiltSequence>,
    pub disciplined_replay: DisciplinedReplaySummary,
    pub streaks: Streaks,
}

pub fn build(report: &TemperReport) -> CoachFactsPayload {
    CoachFactsPayload {
        overview: CoachFactsOverview {
            temper_score: report.temper_score.value,
            bias_scores: report.bias_scores,
            elo_delta: report.elo_delta,
        },
        label_summary: report.temper_score.label_distribution.clone(),
        key_events: key_events(report),
        tilt_sequences: tilt_sequences(&report.session, &report.decisions),
        disciplined_replay: DisciplinedReplaySummary::from(&report.replay),
        streaks: streaks(report),
    }
}

fn key_events(report: &TemperReport) -> Vec<KeyEvent> {
    let mut indices: std::collections::BTreeSet<usize> = report
        .decisions
        .iter()
        .filter(|d| matches!(d.label, DecisionLabel::Brilliant | DecisionLabel::Blunder | DecisionLabel::Megablunder))
        .map(|d| d.trade_index)
        .collect();

    let mut by_magnitude: Vec<&temper_core::Trade> = report.session.trades.iter().collect();
    by_magnitude.sort_by(|a, b| b.pnl.abs().partial_cmp(&a.pnl.abs()).unwrap());
    for trade in by_magnitude.into_iter().take(MAX_MAGNITUDE_EVENTS) {
        indices.insert(trade.index);
    }

    indices
        .into_iter()
        .filter_map(|index| {
            let decision = report.decisions.iter().find(|d| d.trade_index == index)?;
            let trade = report.session.trades.iter().find(|t| t.index == index)?;
            Some(KeyEvent {
                trade_index: index,
                symbol: trade.symbol.clone(),
                label: decision.label,
                pnl: trade.pnl,
                explanation: decision.explanation.clone(),
            })
        })
        .collect()
}

fn tilt_sequences(session: &Session, decisions: &[temper_core::DecisionEvent]) -> Vec<TiltSequence> {
    tilt::tilt_cluster_runs(session)
        .into_iter()
        .map(|(start, end)| {
            let trades = &session.trades[start..=end];
            let aggregate_pnl = trades.iter().map(|t| t.pnl).sum();
            let duration_ms = trades.last().unwrap().timestamp_ms - trades.first().unwrap().timestamp_ms;
            TiltSequence {
                start_index: start,
                end_index: end,
                duration_description: format!("{} trades over {}m", trades.len(), duration_ms / 60_000),
                aggregate_pnl,
                dominant_bias: dominant_bias(decisions, start, end),
            }
        })
        .collect()
}

/// Most-tagged bias among the decisions in `[start, end]`, falling back to
/// overtrading — every tilt-cluster member is by construction an oversized
/// consecutive loser, overtrading's signature.
fn dominant_bias(decisions: &[temper_core::DecisionEvent], start: usize, end: usize) -> BiasType {
    let mut counts: BTreeMap<BiasType, usize> = BTreeMap::new();
    for decision in decisions {
        if decision.trade_index < start || decision.trade_index > end {
            continue;
        }
        for reason in &decision.reasons {
            if let Some(bias) = reason_to_bias(*reason) {
                *counts.entry(bias).or_insert(0) += 1;
            }
        }
    }
    counts
        .into_iter()
        .max_by_key(|(_, count)| *count)
        .map(|(bias, _)| bias)
        .unwrap_or(BiasType::Overtrading)
}

fn reason_to_bias(reason: ReasonCode) -> Option<BiasType> {
    match reason {
        ReasonCode::OvertradeCluster => Some(BiasType::Overtrading),
        ReasonCode::RevengeAfterBigLoss => Some(BiasType::RevengeTrading),
        ReasonCode::FomoLateEntry => Some(BiasType::Fomo),
        ReasonCode::LossHeldTooLong => Some(BiasType::LossAversion),
        ReasonCode::SizeSpikeAfterStreak => Some(BiasType::Greed),
        ReasonCode::DisciplinedExit | ReasonCode::FollowedPlan | ReasonCode::MaxLossBreach => None,
    }
}

fn streaks(report: &TemperReport) -> Streaks {
    Streaks {
        best: longest_run(&report.decisions, |d| d.elo_value >= BEST_STREAK_THRESHOLD),
        worst: longest_run(&report.decisions, |d| d.elo_value <= WORST_STREAK_THRESHOLD),
    }
}

fn longest_run(
    decisions: &[temper_core::DecisionEvent],
    predicate: impl Fn(&temper_core::DecisionEvent) -> bool,
) -> Option<Streak> {
    let mut best: Option<Streak> = None;
    let mut run_start: Option<usize> = None;

    for (position, decision) in decisions.iter().enumerate() {
        if predicate(decision) {
            let start = *run_start.get_or_insert(position);
            let length = position - start + 1;
            let candidate = Streak {
                start_index: decisions[start].trade_index,
                end_index: decision.trade_index,
                length,
            };
            if best.map(|b| length > b.length).unwrap_or(true) {
                best = Some(candidate);
            }
        } else {
            run_start = None;
        }
    }
    best
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::DateTime;
    use std::collections::BTreeMap;
    use temper_core::{
        BiasScores, DecisionEloState, DecisionEvent, DisciplinedSessionResult, ProfitFactor, Side,
        SessionAggregates, TemperScore, Trade,
    };
    use uuid::Uuid;

    fn trade(index: usize, pnl: f64) -> Trade {
        Trade {
            id: Uuid::new_v4(),
            index,
            timestamp: DateTime::parse_from_rfc3339("2026-02-06T09:30:00Z").unwrap().into(),
            timestamp_ms: index as i64 * 60_000,
            symbol: "AAPL".to_string(),
            side: Side::Long,
            quantity: 1.0,
            price: 1.0,
            pnl,
            tags: Vec::new(),
            running_pnl: pnl,
            running_trade_count: index + 1,
            peak_pnl_at_trade: pnl.max(0.0),
            drawdown_from_peak: pnl.min(0.0),
            time_since_last_trade_ms: Some(60_000),
            size_relative_to_baseline: 1.0,
            is_win: pnl > 0.0,
            r_multiple: None,
        }
    }

    fn decision(trade_index: usize, label: DecisionLabel, elo_value: f64) -> DecisionEvent {
        DecisionEvent {
            trade_id: Uuid::new_v4(),
            trade_index,
            label,
            symbol: "AAPL".to_string(),
            reasons: Vec::new(),
            score_contribution: 5.0,
            elo_value,
            explanation: "note".to_string(),
        }
    }

    fn no_bias() -> BiasScores {
        BiasScores {
            overtrading: 0.0,
            loss_aversion: 0.0,
            revenge_trading: 0.0,
            fomo: 0.0,
            greed: 0.0,
            aggregate: 0.0,
        }
    }

    fn report(trades: Vec<Trade>, decisions: Vec<DecisionEvent>) -> TemperReport {
        let session = Session {
            id: Uuid::new_v4(),
            user_id: "u".to_string(),
            date: chrono::NaiveDate::from_ymd_opt(2026, 2, 6).unwrap(),
            aggregates: SessionAggregates {
                total_pnl: trades.iter().map(|t| t.pnl).sum(),
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
        };

        TemperReport {
            id: Uuid::new_v4(),
            bias_details: BTreeMap::new(),
            bias_scores: no_bias(),
            temper_score: TemperScore {
                value: 70,
                raw_score: 70.0,
                bias_penalty: 0.0,
                trade_score_avg: 7.0,
                label_distribution: BTreeMap::from([(DecisionLabel::Book, 1)]),
            },
            replay: DisciplinedSessionResult {
                original_pnl: session.aggregates.total_pnl,
                disciplined_pnl: session.aggregates.total_pnl,
                trades_kept: session.trades.len(),
                trades_removed: 0,
                removed_trade_ids: Vec::new(),
                removed_reasons: BTreeMap::new(),
                disciplined_trades: session.trades.clone(),
                savings: 0.0,
            },
            elo_before: DecisionEloState::default(),
            elo_after: DecisionEloState::default(),
            elo_delta: 0.0,
            decisions,
            session,
        }
    }

    #[test]
    fn brilliant_and_blunder_trades_are_always_key_events() {
        let trades = vec![trade(0, 500.0), trade(1, -10.0), trade(2, -500.0)];
        let decisions = vec![
            decision(0, DecisionLabel::Brilliant, 1.0),
            decision(1, DecisionLabel::Book, 0.6),
            decision(2, DecisionLabel::Megablunder, 0.0),
        ];
        let r = report(trades, decisions);
        let events = key_events(&r);
        let indices: Vec<usize> = events.iter().map(|e| e.trade_index).collect();
        assert!(indices.contains(&0));
        assert!(indices.contains(&2));
    }

    #[test]
    fn best_streak_finds_the_longest_high_elo_run() {
        let trades = vec![trade(0, 10.0), trade(1, 10.0), trade(2, 10.0), trade(3, -5.0)];
        let decisions = vec![
            decision(0, DecisionLabel::Good, 0.8),
            decision(1, DecisionLabel::Good, 0.9),
            decision(2, DecisionLabel::Good, 0.75),
            decision(3, DecisionLabel::Mistake, 0.2),
        ];
        let r = report(trades, decisions);
        let s = streaks(&r);
        let best = s.best.unwrap();
        assert_eq!(best.length, 3);
        assert_eq!((best.start_index, best.end_index), (0, 2));
    }

    #[test]
    fn no_qualifying_trades_yields_no_streak() {
        let trades = vec![trade(0, 1.0)];
        let decisions = vec![decision(0, DecisionLabel::Forced, 0.5)];
        let r = report(trades, decisions);
        let s = streaks(&r);
        assert!(s.best.is_none());
        assert!(s.worst.is_none());
    }

    #[test]
    fn reason_to_bias_covers_the_tagging_codes() {
        assert_eq!(reason_to_bias(ReasonCode::OvertradeCluster), Some(BiasType::Overtrading));
        assert_eq!(reason_to_bias(ReasonCode::DisciplinedExit), None);
    }

    #[test]
    fn build_carries_the_label_summary_and_full_replay_detail() {
        let trades = vec![trade(0, 500.0), trade(1, -500.0)];
        let decisions = vec![
            decision(0, DecisionLabel::Brilliant, 1.0),
            decision(1, DecisionLabel::Megablunder, 0.0),
        ];
        let r = report(trades, decisions);
        let facts = build(&r);

        assert_eq!(facts.overview.temper_score, r.temper_score.value);
        assert_eq!(facts.label_summary, r.temper_score.label_distribution);
        assert_eq!(facts.disciplined_replay.trades_kept, r.replay.trades_kept);
        assert_eq!(facts.disciplined_replay.savings, r.replay.savings);
        assert_eq!(
            facts.disciplined_replay.trades_kept + facts.disciplined_replay.trades_removed,
            r.session.trades.len()
        );
    }
}
