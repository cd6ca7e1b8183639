//! The five bias scorers. Each is a pure function over `(Session,
//! UserBaseline)`; they are composed here as a fixed list rather than a
//! polymorphic registry, since the set is closed and small.

pub mod fomo;
pub mod greed;
pub mod loss_aversion;
pub mod overtrading;
pub mod revenge;
pub mod tilt;

use std::collections::{BTreeMap, BTreeSet};

use temper_core::{BiasDetail, BiasScores, BiasType, Session, UserBaseline};

pub use overtrading::ScorerOutput;

/// Per-trade tag membership produced alongside the scores. The labeler
/// consults these sets (plus the tilt cluster predicate) to decide each
/// trade's grade.
#[derive(Debug, Clone, Default)]
pub struct BiasMembership {
    pub overtrading: BTreeSet<usize>,
    pub loss_aversion: BTreeSet<usize>,
    pub revenge_trading: BTreeSet<usize>,
    pub fomo: BTreeSet<usize>,
    pub tilt_cluster: BTreeSet<usize>,
}

pub struct BiasReport {
    pub scores: BiasScores,
    pub details: BTreeMap<BiasType, BiasDetail>,
    pub membership: BiasMembership,
}

pub fn analyze(session: &Session, baseline: &UserBaseline) -> BiasReport {
    let overtrading = overtrading::score(session, baseline);
    let revenge = revenge::score(session, baseline);
    let loss_aversion = loss_aversion::score(session, baseline);
    let fomo = fomo::score(session, baseline);
    let greed = greed::score(session, baseline);

    let scores = BiasScores {
        overtrading: overtrading.detail.score,
        loss_aversion: loss_aversion.detail.score,
        revenge_trading: revenge.detail.score,
        fomo: fomo.detail.score,
        greed: greed.detail.score,
        aggregate: aggregate_score(
            overtrading.detail.score,
            revenge.detail.score,
            loss_aversion.detail.score,
            fomo.detail.score,
            greed.detail.score,
        ),
    };

    let mut details = BTreeMap::new();
    details.insert(BiasType::Overtrading, overtrading.detail);
    details.insert(BiasType::RevengeTrading, revenge.detail);
    details.insert(BiasType::LossAversion, loss_aversion.detail);
    details.insert(BiasType::Fomo, fomo.detail);
    details.insert(BiasType::Greed, greed.detail);

    let membership = BiasMembership {
        overtrading: overtrading.tagged_trades,
        loss_aversion: loss_aversion.tagged_trades,
        revenge_trading: revenge.tagged_trades,
        fomo: fomo.tagged_trades,
        tilt_cluster: tilt::tilt_cluster_members(session),
    };

    BiasReport {
        scores,
        details,
        membership,
    }
}

fn aggregate_score(overtrading: f64, revenge: f64, loss_aversion: f64, fomo: f64, greed: f64) -> f64 {
    let weighted = overtrading * BiasType::Overtrading.weight()
        + revenge * BiasType::RevengeTrading.weight()
        + loss_aversion * BiasType::LossAversion.weight()
        + fomo * BiasType::Fomo.weight()
        + greed * BiasType::Greed.weight();
    let total_weight: f64 = BiasType::ALL.iter().map(|b| b.weight()).sum();
    (weighted / total_weight).round()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn aggregate_matches_the_documented_weights() {
        let value = aggregate_score(100.0, 100.0, 100.0, 100.0, 100.0);
        assert_eq!(value, 100.0);
        let value = aggregate_score(0.0, 0.0, 0.0, 0.0, 0.0);
        assert_eq!(value, 0.0);
    }

    #[test]
    fn all_scores_stay_within_bounds() {
        // Sanity check over the weight table itself.
        let total: f64 = BiasType::ALL.iter().map(|b| b.weight()).sum();
        assert!((total - 1.0).abs() < 1e-9);
    }
}
