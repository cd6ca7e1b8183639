//! Baseline updater: folds a batch of freshly analyzed sessions into the
//! user's rolling `UserBaseline` via an exponential moving average whose
//! weight shrinks as more sessions accumulate.

use temper_core::{Session, UserBaseline};

pub fn update(previous: &UserBaseline, sessions: &[Session]) -> UserBaseline {
    let Some(latest) = sessions.last() else {
        return *previous;
    };

    let alpha = (2.0 / (previous.sessions_count as f64 + 1.0)).min(0.3);
    let agg = &latest.aggregates;

    UserBaseline {
        avg_trades_per_day: ema(previous.avg_trades_per_day, agg.trade_count as f64, alpha),
        avg_position_size: ema(previous.avg_position_size, agg.avg_position_size, alpha),
        avg_daily_pnl: ema(previous.avg_daily_pnl, agg.total_pnl, alpha),
        win_rate: ema(previous.win_rate, agg.win_rate, alpha),
        avg_holding_time_ms: ema(previous.avg_holding_time_ms, agg.avg_holding_time_ms, alpha),
        avg_win_holding_time_ms: ema(
            previous.avg_win_holding_time_ms,
            agg.avg_win_holding_time_ms,
            alpha,
        ),
        avg_loss_holding_time_ms: ema(
            previous.avg_loss_holding_time_ms,
            agg.avg_loss_holding_time_ms,
            alpha,
        ),
        sessions_count: previous.sessions_count + sessions.len() as u32,
    }
}

fn ema(previous: f64, sample: f64, alpha: f64) -> f64 {
    previous + alpha * (sample - previous)
}
