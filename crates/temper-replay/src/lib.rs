//! Disciplined replay: a deterministic single pass that answers "what
//! would this session's P&L have been under an explicit rule set?" Action
//! space is closed to `KEEP`/`SKIP` — `RESCALE`/`LOSS_CAP` are documented
//! future extensions, not exercised here.

use std::collections::BTreeMap;

use temper_core::{DisciplinedSessionResult, ReasonCode, ReplayRules, Session, TemperError};

struct Carry {
    running_pnl: f64,
    trades_taken: usize,
    last_loss_timestamp_ms: Option<i64>,
}

pub fn replay(session: &Session, rules: &ReplayRules) -> Result<DisciplinedSessionResult, TemperError> {
    if let Err(err) = rules.validate() {
        tracing::warn!(session_id = %session.id, error = %err, "rejected replay rules");
        return Err(err);
    }

    let session_start_ms = session.trades.first().map(|t| t.timestamp_ms).unwrap_or(0);

    let mut carry = Carry {
        running_pnl: 0.0,
        trades_taken: 0,
        last_loss_timestamp_ms: None,
    };

    let mut disciplined_trades = Vec::new();
    let mut removed_trade_ids = Vec::new();
    let mut removed_reasons = BTreeMap::new();

    for trade in &session.trades {
        let reason = skip_reason(trade, &carry, rules, session_start_ms);

        match reason {
            Some(reason) => {
                tracing::warn!(trade_id = %trade.id, trade_index = trade.index, ?reason, "replay skipped trade");
                removed_trade_ids.push(trade.id);
                removed_reasons.insert(trade.id, reason);
            }
            None => {
                carry.running_pnl += trade.pnl;
                carry.trades_taken += 1;
                if trade.pnl <= 0.0 {
                    carry.last_loss_timestamp_ms = Some(trade.timestamp_ms);
                }
                disciplined_trades.push(trade.clone());
            }
        }
    }

    let original_pnl = session.aggregates.total_pnl;
    let disciplined_pnl: f64 = disciplined_trades.iter().map(|t| t.pnl).sum();

    Ok(DisciplinedSessionResult {
        original_pnl,
        disciplined_pnl,
        trades_kept: disciplined_trades.len(),
        trades_removed: removed_trade_ids.len(),
        removed_trade_ids,
        removed_reasons,
        disciplined_trades,
        savings: disciplined_pnl - original_pnl,
    })
}

fn skip_reason(
    trade: &temper_core::Trade,
    carry: &Carry,
    rules: &ReplayRules,
    session_start_ms: i64,
) -> Option<ReasonCode> {
    if carry.running_pnl <= rules.max_daily_loss_absolute {
        return Some(ReasonCode::MaxLossBreach);
    }
    if carry.trades_taken >= rules.max_trades_per_day {
        return Some(ReasonCode::OvertradeCluster);
    }
    if let Some(last_loss_ms) = carry.last_loss_timestamp_ms {
        if trade.timestamp_ms - last_loss_ms < rules.revenge_window_ms {
            return Some(ReasonCode::RevengeAfterBigLoss);
        }
    }
    if trade.size_relative_to_baseline > rules.max_position_size_multiple {
        return Some(ReasonCode::SizeSpikeAfterStreak);
    }
    if let Some(cutoff) = rules.no_entry_after_time_ms {
        if trade.timestamp_ms - session_start_ms > cutoff {
            return Some(ReasonCode::FomoLateEntry);
        }
    }
    None
}
