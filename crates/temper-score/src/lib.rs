//! Temper Score: the 0-100 composite that folds the day's per-trade grades
//! and the five bias scores into one number.

use std::collections::BTreeMap;

use temper_core::{BiasScores, DecisionEvent, DecisionLabel, TemperScore};

const DEFAULT_TRADE_SCORE_AVG: f64 = 5.0;
const BIAS_PENALTY_DENOMINATOR: f64 = 500.0;
const BIAS_PENALTY_SCALE: f64 = 20.0;

pub fn compute(decisions: &[DecisionEvent], bias_scores: &BiasScores) -> TemperScore {
    let trade_score_avg = if decisions.is_empty() {
        DEFAULT_TRADE_SCORE_AVG
    } else {
        decisions.iter().map(|d| d.score_contribution).sum::<f64>() / decisions.len() as f64
    };

    let raw_score = trade_score_avg * 10.0;

    let bias_sum = bias_scores.overtrading
        + bias_scores.loss_aversion
        + bias_scores.revenge_trading
        + bias_scores.fomo
        + bias_scores.greed;
    let bias_penalty = (bias_sum / BIAS_PENALTY_DENOMINATOR * BIAS_PENALTY_SCALE).clamp(0.0, 20.0);

    let value = (raw_score - bias_penalty).round().clamp(0.0, 100.0) as u32;

    let mut label_distribution: BTreeMap<DecisionLabel, u32> = DecisionLabel::TRADE_LABELS
        .iter()
        .map(|&label| (label, 0))
        .collect();
    for decision in decisions {
        *label_distribution.entry(decision.label).or_insert(0) += 1;
    }

    TemperScore {
        value,
        raw_score,
        bias_penalty,
        trade_score_avg,
        label_distribution,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

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

    fn decision(label: DecisionLabel, score_contribution: f64) -> DecisionEvent {
        DecisionEvent {
            trade_id: uuid::Uuid::new_v4(),
            trade_index: 0,
            label,
            symbol: "AAPL".to_string(),
            reasons: Vec::new(),
            score_contribution,
            elo_value: 0.5,
            explanation: String::new(),
        }
    }

    #[test]
    fn empty_session_defaults_to_a_mid_score() {
        let ts = compute(&[], &no_bias());
        assert_eq!(ts.trade_score_avg, 5.0);
        assert_eq!(ts.value, 50);
    }

    #[test]
    fn all_brilliant_with_no_bias_scores_near_one_hundred() {
        let decisions = vec![decision(DecisionLabel::Brilliant, 10.0); 5];
        let ts = compute(&decisions, &no_bias());
        assert_eq!(ts.value, 100);
        assert_eq!(ts.label_distribution[&DecisionLabel::Brilliant], 5);
        assert_eq!(ts.label_distribution[&DecisionLabel::Blunder], 0);
    }

    #[test]
    fn heavy_bias_pulls_the_score_down() {
        let decisions = vec![decision(DecisionLabel::Good, 6.5); 5];
        let heavy_bias = BiasScores {
            overtrading: 100.0,
            loss_aversion: 100.0,
            revenge_trading: 100.0,
            fomo: 100.0,
            greed: 100.0,
            aggregate: 100.0,
        };
        let ts = compute(&decisions, &heavy_bias);
        assert_eq!(ts.bias_penalty, 20.0);
        assert_eq!(ts.value, (65.0_f64 - 20.0).round() as u32);
    }

    #[test]
    fn value_is_always_in_bounds() {
        let decisions = vec![decision(DecisionLabel::Megablunder, 0.0); 3];
        let ts = compute(&decisions, &no_bias());
        assert!(ts.value <= 100);
    }
}
