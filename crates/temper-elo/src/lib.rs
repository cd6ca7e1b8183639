//! Decision Elo: a per-session rating update over the day's decision
//! events, in the spirit of a chess Elo update where the "opponent" is a
//! fixed 1500 baseline of disciplined trading.

use chrono::NaiveDate;
use temper_core::{DecisionEloState, DecisionEvent, EloHistoryEntry};

const BASELINE_RATING: f64 = 1500.0;
const MIN_K_FACTOR: f64 = 16.0;
const STARTING_K_FACTOR: f64 = 40.0;
const K_DECAY_PER_SESSION: f64 = 0.8;
const DEFAULT_PERFORMANCE: f64 = 0.5;

pub fn update(previous: &DecisionEloState, decisions: &[DecisionEvent], date: NaiveDate) -> DecisionEloState {
    let k = (STARTING_K_FACTOR - previous.sessions_played as f64 * K_DECAY_PER_SESSION).max(MIN_K_FACTOR);

    let expected = 1.0 / (1.0 + 10f64.powf((BASELINE_RATING - previous.rating) / 400.0));

    let performance = if decisions.is_empty() {
        DEFAULT_PERFORMANCE
    } else {
        decisions.iter().map(|d| d.elo_value).sum::<f64>() / decisions.len() as f64
    };

    let delta = k * (performance - expected);
    let rating = previous.rating + delta;
    let peak_rating = previous.peak_rating.max(rating);
    let sessions_played = previous.sessions_played + 1;

    let mut history = previous.history.clone();
    history.push(EloHistoryEntry { date, rating, delta });

    DecisionEloState {
        rating,
        peak_rating,
        sessions_played,
        k_factor: k,
        last_session_delta: delta,
        last_session_performance: performance,
        last_session_expected: expected,
        history,
    }
}
