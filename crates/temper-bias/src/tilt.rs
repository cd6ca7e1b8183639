//! Tilt cluster detection: the predicate shared by the labeler (to grade a
//! cluster's trades MEGABLUNDER/BLUNDER) and the coach-facts builder (to
//! describe tilt sequences). A trade is a cluster member if it sits inside
//! a maximal run of three or more consecutive losers, each oversized
//! relative to baseline, each within five minutes of the last.

use std::collections::BTreeSet;

use temper_core::Session;

const CLUSTER_MIN_LEN: usize = 3;
const CLUSTER_GAP_MS: i64 = 5 * 60 * 1000;
const CLUSTER_SIZE_MULTIPLE: f64 = 1.5;

fn is_candidate(session: &Session, index: usize) -> bool {
    let t = &session.trades[index];
    t.pnl < 0.0 && t.size_relative_to_baseline > CLUSTER_SIZE_MULTIPLE
}

/// Maximal runs of tilt-cluster members, as `(start_index, end_index)`
/// inclusive ranges over `session.trades`.
pub fn tilt_cluster_runs(session: &Session) -> Vec<(usize, usize)> {
    let mut runs = Vec::new();
    let mut run_start: Option<usize> = None;

    for i in 0..session.trades.len() {
        let candidate = is_candidate(session, i);
        let chains = match run_start {
            Some(_) => session.trades[i]
                .time_since_last_trade_ms
                .map(|gap| gap <= CLUSTER_GAP_MS)
                .unwrap_or(false),
            None => true,
        };

        if candidate && chains {
            if run_start.is_none() {
                run_start = Some(i);
            }
        } else {
            if let Some(start) = run_start.take() {
                if i - start >= CLUSTER_MIN_LEN {
                    runs.push((start, i - 1));
                }
            }
            if candidate {
                run_start = Some(i);
            }
        }
    }
    if let Some(start) = run_start {
        let end = session.trades.len() - 1;
        if end - start + 1 >= CLUSTER_MIN_LEN {
            runs.push((start, end));
        }
    }
    runs
}

/// Flattened set of every trade index belonging to any tilt cluster.
pub fn tilt_cluster_members(session: &Session) -> BTreeSet<usize> {
    tilt_cluster_runs(session)
        .into_iter()
        .flat_map(|(start, end)| start..=end)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::DateTime;
    use temper_core::{Side, Trade, UserBaseline};
    use uuid::Uuid;

    fn trade(index: usize, pnl: f64, size: f64, gap_ms: Option<i64>) -> Trade {
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
            pnl,
            tags: Vec::new(),
            running_pnl: pnl,
            running_trade_count: index + 1,
            peak_pnl_at_trade: pnl.max(0.0),
            drawdown_from_peak: pnl.min(0.0),
            time_since_last_trade_ms: gap_ms,
            size_relative_to_baseline: size,
            is_win: pnl > 0.0,
            r_multiple: None,
        }
    }

    fn session(trades: Vec<Trade>) -> Session {
        Session {
            id: Uuid::new_v4(),
            user_id: "user-1".to_string(),
            date: chrono::NaiveDate::from_ymd_opt(2026, 2, 6).unwrap(),
            aggregates: temper_session_aggregates_stub(&trades),
            trades,
        }
    }

    // Minimal aggregates stub; these tests only exercise tilt detection.
    fn temper_session_aggregates_stub(trades: &[Trade]) -> temper_core::SessionAggregates {
        temper_core::SessionAggregates {
            total_pnl: trades.iter().map(|t| t.pnl).sum(),
            max_drawdown: 0.0,
            max_runup: 0.0,
            trade_count: trades.len(),
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
        }
    }

    #[test]
    fn three_oversized_losers_in_a_row_form_a_cluster() {
        let trades = vec![
            trade(0, -50.0, 2.0, None),
            trade(1, -60.0, 2.0, Some(30_000)),
            trade(2, -70.0, 2.0, Some(30_000)),
        ];
        let s = session(trades);
        assert_eq!(tilt_cluster_runs(&s), vec![(0, 2)]);
        assert_eq!(
            tilt_cluster_members(&s),
            BTreeSet::from([0usize, 1, 2])
        );
    }

    #[test]
    fn two_losers_do_not_form_a_cluster() {
        let trades = vec![trade(0, -50.0, 2.0, None), trade(1, -60.0, 2.0, Some(30_000))];
        let s = session(trades);
        assert!(tilt_cluster_runs(&s).is_empty());
    }

    #[test]
    fn a_gap_over_five_minutes_breaks_the_chain() {
        let trades = vec![
            trade(0, -50.0, 2.0, None),
            trade(1, -60.0, 2.0, Some(30_000)),
            trade(2, -70.0, 2.0, Some(6 * 60 * 1000)),
        ];
        let s = session(trades);
        assert!(tilt_cluster_runs(&s).is_empty());
    }

    #[test]
    fn a_small_normal_sized_loss_does_not_qualify() {
        let trades = vec![
            trade(0, -50.0, 1.0, None),
            trade(1, -60.0, 2.0, Some(30_000)),
            trade(2, -70.0, 2.0, Some(30_000)),
        ];
        let s = session(trades);
        assert!(tilt_cluster_runs(&s).is_empty());
    }
}
