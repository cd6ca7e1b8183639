//! Orchestrator: wires the pure pipeline stages into the five entry points
//! external callers depend on. Every function here is itself pure — the
//! orchestrator introduces no I/O, only sequencing.

use temper_core::{DecisionEloState, RawTrade, Session, TemperError, TemperReport, UserBaseline};
use uuid::Uuid;

pub use temper_coach::{build as build_coach_facts, CoachFactsPayload};
pub use temper_parser::{parse, ParseResult};

/// Replay rule set plus the two pieces of per-user state the core never
/// owns: last session's baseline and the rating carried from the prior run.
pub struct AnalyzeSessionInput<'a> {
    pub session: &'a Session,
    pub baseline: &'a UserBaseline,
    pub previous_elo: &'a DecisionEloState,
    pub rules: &'a temper_core::ReplayRules,
}

#[derive(Debug)]
pub struct AnalyzeSessionOutput {
    pub report: TemperReport,
    pub new_elo: DecisionEloState,
}

pub fn reconstruct_sessions(user_id: &str, trades: &[RawTrade], baseline: &UserBaseline) -> Vec<Session> {
    temper_session::reconstruct_sessions(user_id, trades, baseline)
}

/// Runs the bias scorers, then the labeler (which consults the scorers'
/// per-trade tag membership), then the score, replay and Elo stages, in
/// that documented order, and assembles the frozen `TemperReport`.
pub fn analyze_session(input: AnalyzeSessionInput<'_>) -> Result<AnalyzeSessionOutput, TemperError> {
    let AnalyzeSessionInput {
        session,
        baseline,
        previous_elo,
        rules,
    } = input;

    if session.trades.is_empty() {
        tracing::warn!(session_id = %session.id, "empty session");
        return Err(TemperError::EmptyInput);
    }

    tracing::debug!(session_id = %session.id, trade_count = session.trade_count(), "analyzing session");

    let bias_report = temper_bias::analyze(session, baseline);
    let decisions = temper_labeler::label_trades(session, &bias_report.membership);
    let temper_score = temper_score::compute(&decisions, &bias_report.scores);
    let replay = temper_replay::replay(session, rules)?;
    let new_elo = temper_elo::update(previous_elo, &decisions, session.date);
    let elo_delta = new_elo.rating - previous_elo.rating;

    let report = TemperReport {
        id: Uuid::new_v5(
            &Uuid::NAMESPACE_URL,
            format!("temper-report:{}:{}", session.id, session.date).as_bytes(),
        ),
        session: session.clone(),
        bias_details: bias_report.details,
        bias_scores: bias_report.scores,
        decisions,
        temper_score,
        replay,
        elo_before: previous_elo.clone(),
        elo_after: new_elo.clone(),
        elo_delta,
    };

    tracing::info!(
        session_id = %session.id,
        temper_score = report.temper_score.value,
        elo_delta,
        "session analyzed"
    );

    Ok(AnalyzeSessionOutput { report, new_elo })
}

pub fn update_baseline(previous: &UserBaseline, sessions: &[Session]) -> UserBaseline {
    temper_baseline::update(previous, sessions)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::DateTime;

    fn raw(ts: &str, pnl: f64) -> RawTrade {
        RawTrade {
            timestamp: DateTime::parse_from_rfc3339(ts).unwrap().into(),
            symbol: "AAPL".to_string(),
            side: temper_core::Side::Long,
            quantity: 100.0,
            price: 100.0,
            pnl,
            tags: Vec::new(),
        }
    }

    #[test]
    fn full_pipeline_produces_a_report() {
        let trades = vec![
            raw("2026-02-06T09:30:00Z", 150.0),
            raw("2026-02-06T09:35:00Z", -40.0),
            raw("2026-02-06T09:40:00Z", 60.0),
        ];
        let baseline = UserBaseline::default();
        let sessions = reconstruct_sessions("user-1", &trades, &baseline);
        assert_eq!(sessions.len(), 1);

        let previous_elo = DecisionEloState::default();
        let rules = temper_core::ReplayRules::default();
        let output = analyze_session(AnalyzeSessionInput {
            session: &sessions[0],
            baseline: &baseline,
            previous_elo: &previous_elo,
            rules: &rules,
        })
        .unwrap();

        assert_eq!(output.report.decisions.len(), 3);
        assert_eq!(output.new_elo.sessions_played, 1);

        let facts = build_coach_facts(&output.report);
        assert_eq!(facts.overview.temper_score, output.report.temper_score.value);

        let updated_baseline = update_baseline(&baseline, &sessions);
        assert_eq!(updated_baseline.sessions_count, 1);
    }

    #[test]
    fn empty_session_is_a_contract_error() {
        let baseline = UserBaseline::default();
        let empty_session = Session {
            id: Uuid::new_v4(),
            user_id: "user-1".to_string(),
            date: chrono::NaiveDate::from_ymd_opt(2026, 2, 6).unwrap(),
            trades: Vec::new(),
            aggregates: temper_core::SessionAggregates {
                total_pnl: 0.0,
                max_drawdown: 0.0,
                max_runup: 0.0,
                trade_count: 0,
                win_count: 0,
                loss_count: 0,
                win_rate: 0.0,
                avg_win: 0.0,
                avg_loss: 0.0,
                profit_factor: temper_core::ProfitFactor::Infinite,
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
        };
        let result = analyze_session(AnalyzeSessionInput {
            session: &empty_session,
            baseline: &baseline,
            previous_elo: &DecisionEloState::default(),
            rules: &temper_core::ReplayRules::default(),
        });
        assert_eq!(result.unwrap_err(), TemperError::EmptyInput);
    }
}
