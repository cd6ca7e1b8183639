//! Session reconstruction: groups a sorted run of [`RawTrade`]s into
//! calendar-day [`Session`]s and derives every per-trade and per-session
//! field in two linear passes. No field here is anything but a pure
//! function of the session's own trade list.

use std::collections::BTreeSet;

use temper_core::{
    ProfitFactor, RawTrade, Session, SessionAggregates, Trade, UserBaseline,
};
use uuid::Uuid;

/// Guards `quantity / baseline.avg_position_size` against division by a
/// baseline that has never seen a trade.
const SIZE_EPSILON: f64 = 1e-9;

pub fn reconstruct_sessions(user_id: &str, trades: &[RawTrade], baseline: &UserBaseline) -> Vec<Session> {
    group_by_date(trades)
        .into_iter()
        .map(|(date, rows)| build_session(user_id, date, rows, baseline))
        .collect()
}

fn group_by_date(trades: &[RawTrade]) -> Vec<(chrono::NaiveDate, Vec<RawTrade>)> {
    let mut groups: Vec<(chrono::NaiveDate, Vec<RawTrade>)> = Vec::new();
    for trade in trades {
        let date = trade.timestamp.date_naive();
        match groups.last_mut() {
            Some((last_date, rows)) if *last_date == date => rows.push(trade.clone()),
            _ => groups.push((date, vec![trade.clone()])),
        }
    }
    groups
}

fn build_session(
    user_id: &str,
    date: chrono::NaiveDate,
    rows: Vec<RawTrade>,
    baseline: &UserBaseline,
) -> Session {
    let session_id = Uuid::new_v5(
        &Uuid::NAMESPACE_URL,
        format!("temper-session:{user_id}:{date}").as_bytes(),
    );

    let mut trades = Vec::with_capacity(rows.len());
    let mut running_pnl = 0.0;
    let mut peak_pnl_at_trade = f64::NEG_INFINITY;
    let mut last_timestamp_ms: Option<i64> = None;

    for (index, raw) in rows.into_iter().enumerate() {
        let timestamp_ms = raw.timestamp.timestamp_millis();
        running_pnl += raw.pnl;
        peak_pnl_at_trade = peak_pnl_at_trade.max(running_pnl);
        let drawdown_from_peak = running_pnl - peak_pnl_at_trade;
        let time_since_last_trade_ms = last_timestamp_ms.map(|prev| timestamp_ms - prev);
        last_timestamp_ms = Some(timestamp_ms);

        let size_relative_to_baseline =
            raw.quantity / baseline.avg_position_size.max(SIZE_EPSILON);

        let id = Uuid::new_v5(
            &Uuid::NAMESPACE_URL,
            format!("temper-trade:{session_id}:{index}").as_bytes(),
        );

        trades.push(Trade {
            id,
            index,
            timestamp: raw.timestamp,
            timestamp_ms,
            symbol: raw.symbol,
            side: raw.side,
            quantity: raw.quantity,
            price: raw.price,
            pnl: raw.pnl,
            tags: raw.tags,
            running_pnl,
            running_trade_count: index + 1,
            peak_pnl_at_trade,
            drawdown_from_peak,
            time_since_last_trade_ms,
            size_relative_to_baseline,
            is_win: raw.pnl > 0.0,
            r_multiple: None,
        });
    }

    let aggregates = compute_aggregates(&trades);

    Session {
        id: session_id,
        user_id: user_id.to_string(),
        date,
        trades,
        aggregates,
    }
}

fn compute_aggregates(trades: &[Trade]) -> SessionAggregates {
    let trade_count = trades.len();

    let mut running_min = f64::INFINITY;
    let mut max_drawdown = 0.0_f64;
    let mut max_runup = 0.0_f64;
    for t in trades {
        max_drawdown = max_drawdown.min(t.drawdown_from_peak);
        running_min = running_min.min(t.running_pnl);
        max_runup = max_runup.max(t.running_pnl - running_min);
    }

    let winners: Vec<&Trade> = trades.iter().filter(|t| t.pnl > 0.0).collect();
    let losers: Vec<&Trade> = trades.iter().filter(|t| t.pnl < 0.0).collect();

    let win_count = winners.len();
    let loss_count = losers.len();
    let win_rate = if trade_count > 0 {
        win_count as f64 / trade_count as f64
    } else {
        0.0
    };

    let avg_win = mean(winners.iter().map(|t| t.pnl));
    let avg_loss = mean(losers.iter().map(|t| t.pnl));

    let gross_profit: f64 = winners.iter().map(|t| t.pnl).sum();
    let gross_loss_abs: f64 = losers.iter().map(|t| t.pnl.abs()).sum();
    let profit_factor = ProfitFactor::compute(gross_profit, gross_loss_abs);

    let largest_win = winners.iter().map(|t| t.pnl).fold(0.0, f64::max);
    let largest_loss = losers.iter().map(|t| t.pnl).fold(0.0, f64::min);

    let avg_holding_time_ms = mean(
        trades
            .iter()
            .filter_map(|t| t.time_since_last_trade_ms)
            .map(|ms| ms as f64),
    );
    let avg_win_holding_time_ms = mean(
        trades
            .iter()
            .filter(|t| t.pnl > 0.0)
            .filter_map(|t| t.time_since_last_trade_ms)
            .map(|ms| ms as f64),
    );
    let avg_loss_holding_time_ms = mean(
        trades
            .iter()
            .filter(|t| t.pnl < 0.0)
            .filter_map(|t| t.time_since_last_trade_ms)
            .map(|ms| ms as f64),
    );

    let peak_pnl = trades
        .last()
        .map(|t| t.peak_pnl_at_trade)
        .unwrap_or(0.0);

    let distinct_symbols: BTreeSet<String> = trades.iter().map(|t| t.symbol.clone()).collect();

    let duration_ms = match (trades.first(), trades.last()) {
        (Some(first), Some(last)) => last.timestamp_ms - first.timestamp_ms,
        _ => 0,
    };

    let avg_position_size = mean(trades.iter().map(|t| t.quantity));

    SessionAggregates {
        total_pnl: trades.iter().map(|t| t.pnl).sum(),
        max_drawdown,
        max_runup,
        trade_count,
        win_count,
        loss_count,
        win_rate,
        avg_win,
        avg_loss,
        profit_factor,
        largest_win,
        largest_loss,
        avg_holding_time_ms,
        avg_win_holding_time_ms,
        avg_loss_holding_time_ms,
        peak_pnl,
        distinct_symbols: distinct_symbols.into_iter().collect(),
        duration_ms,
        avg_position_size,
    }
}

fn mean(values: impl Iterator<Item = f64>) -> f64 {
    let mut sum = 0.0;
    let mut count = 0usize;
    for v in values {
        sum += v;
        count += 1;
    }
    if count == 0 {
        0.0
    } else {
        sum / count as f64
    }
}
