use std::collections::BTreeMap;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Trade direction, normalized from whatever alias the source used
/// (`BUY`/`LONG` and `SELL`/`SHORT` both resolve here).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Side {
    Long,
    Short,
}

/// A single parsed, validated execution row. Carries no derived state —
/// everything here comes straight off the source row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawTrade {
    pub timestamp: DateTime<Utc>,
    pub symbol: String,
    pub side: Side,
    pub quantity: f64,
    pub price: f64,
    pub pnl: f64,
    #[serde(default)]
    pub tags: Vec<String>,
}

/// A `RawTrade` enriched with fields that only make sense once a trade's
/// position within a session is known. All derived fields are pure
/// functions of the session's trade sequence up to and including this one.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Trade {
    pub id: Uuid,
    pub index: usize,
    pub timestamp: DateTime<Utc>,
    pub timestamp_ms: i64,
    pub symbol: String,
    pub side: Side,
    pub quantity: f64,
    pub price: f64,
    pub pnl: f64,
    pub tags: Vec<String>,

    pub running_pnl: f64,
    pub running_trade_count: usize,
    pub peak_pnl_at_trade: f64,
    pub drawdown_from_peak: f64,
    pub time_since_last_trade_ms: Option<i64>,
    pub size_relative_to_baseline: f64,
    pub is_win: bool,
    pub r_multiple: Option<f64>,
}

/// Serializes a division-by-zero profit factor as an explicit sentinel
/// rather than a bare float, so no artifact ever carries an `Infinity`
/// or `NaN` JSON value.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum ProfitFactor {
    Finite(f64),
    Infinite,
}

impl ProfitFactor {
    pub fn compute(gross_profit: f64, gross_loss_abs: f64) -> Self {
        if gross_loss_abs <= f64::EPSILON {
            ProfitFactor::Infinite
        } else {
            ProfitFactor::Finite(gross_profit / gross_loss_abs)
        }
    }

    pub fn as_f64(&self) -> f64 {
        match self {
            ProfitFactor::Finite(v) => *v,
            ProfitFactor::Infinite => f64::MAX,
        }
    }
}

/// Aggregates computed once per session, each a pure function of the
/// session's trade list.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionAggregates {
    pub total_pnl: f64,
    pub max_drawdown: f64,
    pub max_runup: f64,
    pub trade_count: usize,
    pub win_count: usize,
    pub loss_count: usize,
    pub win_rate: f64,
    pub avg_win: f64,
    pub avg_loss: f64,
    pub profit_factor: ProfitFactor,
    pub largest_win: f64,
    pub largest_loss: f64,
    pub avg_holding_time_ms: f64,
    pub avg_win_holding_time_ms: f64,
    pub avg_loss_holding_time_ms: f64,
    pub peak_pnl: f64,
    pub distinct_symbols: Vec<String>,
    pub duration_ms: i64,
    pub avg_position_size: f64,
}

/// One calendar day of a user's trading activity, in UTC.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Session {
    pub id: Uuid,
    pub user_id: String,
    pub date: NaiveDate,
    pub trades: Vec<Trade>,
    pub aggregates: SessionAggregates,
}

impl Session {
    pub fn trade_count(&self) -> usize {
        self.trades.len()
    }
}

/// Rolling per-user averages used as the reference point for "relative to
/// normal" comparisons across the bias scorers.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct UserBaseline {
    pub avg_trades_per_day: f64,
    pub avg_position_size: f64,
    pub avg_daily_pnl: f64,
    pub win_rate: f64,
    pub avg_holding_time_ms: f64,
    pub avg_win_holding_time_ms: f64,
    pub avg_loss_holding_time_ms: f64,
    pub sessions_count: u32,
}

impl Default for UserBaseline {
    /// Documented defaults for a user with no trading history yet: a
    /// moderate five-trade day, $100 clips, a coin-flip win rate and a
    /// five-minute average hold.
    fn default() -> Self {
        Self {
            avg_trades_per_day: 5.0,
            avg_position_size: 100.0,
            avg_daily_pnl: 0.0,
            win_rate: 0.5,
            avg_holding_time_ms: 300_000.0,
            avg_win_holding_time_ms: 300_000.0,
            avg_loss_holding_time_ms: 300_000.0,
            sessions_count: 0,
        }
    }
}

/// The five behavioral biases the engine screens every session for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum BiasType {
    Overtrading,
    LossAversion,
    RevengeTrading,
    Fomo,
    Greed,
}

impl BiasType {
    pub const ALL: [BiasType; 5] = [
        BiasType::Overtrading,
        BiasType::LossAversion,
        BiasType::RevengeTrading,
        BiasType::Fomo,
        BiasType::Greed,
    ];

    /// Weight used when folding the five scores into `BiasScores::aggregate`.
    pub fn weight(&self) -> f64 {
        match self {
            BiasType::Overtrading => 0.25,
            BiasType::RevengeTrading => 0.25,
            BiasType::LossAversion => 0.20,
            BiasType::Fomo => 0.15,
            BiasType::Greed => 0.15,
        }
    }
}

/// Per-bias score plus the raw metrics and triggered rule names that
/// justify it, for auditability.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BiasDetail {
    #[serde(rename = "type")]
    pub bias_type: BiasType,
    pub score: f64,
    pub metrics: BTreeMap<String, f64>,
    pub triggered_rules: Vec<String>,
}

/// The five bias scores plus their weighted aggregate, all in `[0, 100]`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BiasScores {
    pub overtrading: f64,
    pub loss_aversion: f64,
    pub revenge_trading: f64,
    pub fomo: f64,
    pub greed: f64,
    pub aggregate: f64,
}

impl BiasScores {
    pub fn get(&self, bias: BiasType) -> f64 {
        match bias {
            BiasType::Overtrading => self.overtrading,
            BiasType::LossAversion => self.loss_aversion,
            BiasType::RevengeTrading => self.revenge_trading,
            BiasType::Fomo => self.fomo,
            BiasType::Greed => self.greed,
        }
    }
}

/// Deterministic justifications attached to a decision event. Never free
/// text — always one of this closed set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ReasonCode {
    OvertradeCluster,
    RevengeAfterBigLoss,
    FomoLateEntry,
    LossHeldTooLong,
    DisciplinedExit,
    FollowedPlan,
    MaxLossBreach,
    SizeSpikeAfterStreak,
}

/// Chess-style grade assigned to a trade (or, for the session-level
/// variants, to the day as a whole). Declared in desirability order so the
/// derived `Ord` matches the spec's ranking and `BTreeMap<DecisionLabel, _>`
/// serializes in a stable, human-meaningful order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DecisionLabel {
    Brilliant,
    Great,
    Best,
    Excellent,
    Good,
    Book,
    Forced,
    Interesting,
    Inaccuracy,
    Mistake,
    Miss,
    Blunder,
    Megablunder,
    Winner,
    Draw,
    Resign,
    Checkmated,
}

impl DecisionLabel {
    pub const TRADE_LABELS: [DecisionLabel; 13] = [
        DecisionLabel::Brilliant,
        DecisionLabel::Great,
        DecisionLabel::Best,
        DecisionLabel::Excellent,
        DecisionLabel::Good,
        DecisionLabel::Book,
        DecisionLabel::Forced,
        DecisionLabel::Interesting,
        DecisionLabel::Inaccuracy,
        DecisionLabel::Mistake,
        DecisionLabel::Miss,
        DecisionLabel::Blunder,
        DecisionLabel::Megablunder,
    ];
}

/// The per-trade verdict produced by the labeler.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DecisionEvent {
    pub trade_id: Uuid,
    pub trade_index: usize,
    pub label: DecisionLabel,
    pub symbol: String,
    pub reasons: Vec<ReasonCode>,
    pub score_contribution: f64,
    pub elo_value: f64,
    pub explanation: String,
}

/// The 0-100 composite day-discipline score.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TemperScore {
    pub value: u32,
    pub raw_score: f64,
    pub bias_penalty: f64,
    pub trade_score_avg: f64,
    pub label_distribution: BTreeMap<DecisionLabel, u32>,
}

/// One entry in a `DecisionEloState`'s history.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EloHistoryEntry {
    pub date: NaiveDate,
    pub rating: f64,
    pub delta: f64,
}

/// Elo-like rating of decision quality, accumulated across sessions.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DecisionEloState {
    pub rating: f64,
    pub peak_rating: f64,
    pub sessions_played: u32,
    pub k_factor: f64,
    pub last_session_delta: f64,
    pub last_session_performance: f64,
    pub last_session_expected: f64,
    pub history: Vec<EloHistoryEntry>,
}

impl Default for DecisionEloState {
    fn default() -> Self {
        Self {
            rating: 1200.0,
            peak_rating: 1200.0,
            sessions_played: 0,
            k_factor: 40.0,
            last_session_delta: 0.0,
            last_session_performance: 0.5,
            last_session_expected: 0.5,
            history: Vec::new(),
        }
    }
}

/// Explicit rule parameters for the disciplined replay. Defaults mirror
/// the base contract; `no_entry_after_time_ms` is `None` unless the caller
/// wants a hard cutoff on new entries.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ReplayRules {
    pub max_daily_loss_absolute: f64,
    pub max_trades_per_day: usize,
    pub revenge_window_ms: i64,
    pub max_position_size_multiple: f64,
    pub no_entry_after_time_ms: Option<i64>,
}

impl Default for ReplayRules {
    fn default() -> Self {
        Self {
            max_daily_loss_absolute: -500.0,
            max_trades_per_day: 10,
            revenge_window_ms: 15 * 60 * 1000,
            max_position_size_multiple: 1.5,
            no_entry_after_time_ms: None,
        }
    }
}

impl ReplayRules {
    /// `RuleError`-worthy misconfiguration: negative windows, non-finite
    /// thresholds, or a trade cap of zero.
    pub fn validate(&self) -> Result<(), crate::error::TemperError> {
        if !self.max_daily_loss_absolute.is_finite() {
            return Err(crate::error::TemperError::Rule(
                "maxDailyLossAbsolute must be finite".into(),
            ));
        }
        if self.max_trades_per_day == 0 {
            return Err(crate::error::TemperError::Rule(
                "maxTradesPerDay must be positive".into(),
            ));
        }
        if self.revenge_window_ms < 0 {
            return Err(crate::error::TemperError::Rule(
                "revengeWindowMs must not be negative".into(),
            ));
        }
        if !self.max_position_size_multiple.is_finite() || self.max_position_size_multiple <= 0.0
        {
            return Err(crate::error::TemperError::Rule(
                "maxPositionSizeMultiple must be a positive finite number".into(),
            ));
        }
        if let Some(cutoff) = self.no_entry_after_time_ms {
            if cutoff < 0 {
                return Err(crate::error::TemperError::Rule(
                    "noEntryAfterTimeMs must not be negative".into(),
                ));
            }
        }
        Ok(())
    }
}

/// Outcome of replaying a session under `ReplayRules`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DisciplinedSessionResult {
    pub original_pnl: f64,
    pub disciplined_pnl: f64,
    pub trades_kept: usize,
    pub trades_removed: usize,
    pub removed_trade_ids: Vec<Uuid>,
    pub removed_reasons: BTreeMap<Uuid, ReasonCode>,
    pub disciplined_trades: Vec<Trade>,
    pub savings: f64,
}

/// The frozen bundle of a session plus every analysis run over it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TemperReport {
    pub id: Uuid,
    pub session: Session,
    pub bias_details: BTreeMap<BiasType, BiasDetail>,
    pub bias_scores: BiasScores,
    pub decisions: Vec<DecisionEvent>,
    pub temper_score: TemperScore,
    pub replay: DisciplinedSessionResult,
    pub elo_before: DecisionEloState,
    pub elo_after: DecisionEloState,
    pub elo_delta: f64,
}
