//! Candidate bid scoring.
//!
//! Blends the agent's own utility with the opponent's predicted utility.
//! The own-utility term dominates for most of the session and only gives
//! way to the opponent term close to the deadline.

use crate::profile::UtilitySpace;
use crate::types::Bid;

use super::opponent::OpponentModel;

// ---------------------------------------------------------------------------
// Configuration
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy)]
pub struct ScorerConfig {
    /// Blend constant α: share of the score reserved for own utility.
    pub alpha: f64,
    /// Concession exponent ε; time pressure is `1 - progress^(1/ε)`.
    pub epsilon: f64,
}

impl Default for ScorerConfig {
    fn default() -> Self {
        Self {
            alpha: 0.95,
            epsilon: 0.1,
        }
    }
}

// ---------------------------------------------------------------------------
// Scorer
// ---------------------------------------------------------------------------

pub struct BidScorer {
    config: ScorerConfig,
}

impl BidScorer {
    pub fn new(config: ScorerConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &ScorerConfig {
        &self.config
    }

    /// Time pressure weight: stays near 1 for most of the session and
    /// collapses toward 0 only as `progress` approaches 1.
    pub fn time_pressure(&self, progress: f64) -> f64 {
        1.0 - progress.clamp(0.0, 1.0).powf(1.0 / self.config.epsilon)
    }

    /// Score a candidate bid at `progress`.
    ///
    /// `α·tp·own + (1 − α·tp)·opponent`, or just `α·tp·own` when no
    /// opponent model exists yet.
    pub fn score(
        &self,
        bid: &Bid,
        progress: f64,
        profile: &dyn UtilitySpace,
        opponent: Option<&OpponentModel>,
    ) -> f64 {
        let own = profile.utility(bid);
        let own_weight = self.config.alpha * self.time_pressure(progress);
        let mut score = own_weight * own;

        if let Some(model) = opponent {
            score += (1.0 - own_weight) * model.predict_utility(bid);
        }
        score
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::profile::MockUtilitySpace;
    use crate::types::{Domain, Value};
    use std::collections::BTreeMap;

    fn binary_domain() -> Domain {
        let mut issues = BTreeMap::new();
        issues.insert("A".to_string(), vec![Value::from("0"), Value::from("1")]);
        Domain::new("single", issues)
    }

    fn profile_with_utility(u: f64) -> MockUtilitySpace {
        let mut profile = MockUtilitySpace::new();
        profile.expect_utility().return_const(u);
        profile
    }

    #[test]
    fn test_time_pressure_curve() {
        let scorer = BidScorer::new(ScorerConfig::default());
        assert_eq!(scorer.time_pressure(0.0), 1.0);
        assert_eq!(scorer.time_pressure(1.0), 0.0);
        // 0.5^10 ≈ 0.001: still almost no pressure halfway through.
        assert!(scorer.time_pressure(0.5) > 0.99);
        assert!(scorer.time_pressure(0.95) < 0.41);
    }

    #[test]
    fn test_score_without_opponent_model() {
        let scorer = BidScorer::new(ScorerConfig::default());
        let profile = profile_with_utility(0.8);
        let bid = Bid::from_pairs([("A", "1")]);
        let score = scorer.score(&bid, 0.0, &profile, None);
        assert!((score - 0.95 * 0.8).abs() < 1e-12);
    }

    #[test]
    fn test_score_with_opponent_model_at_start() {
        let scorer = BidScorer::new(ScorerConfig::default());
        let profile = profile_with_utility(0.6);
        let domain = binary_domain();
        let mut model = OpponentModel::new(&domain);
        let bid = Bid::from_pairs([("A", "1")]);
        model.update(&bid);

        let score = scorer.score(&bid, 0.0, &profile, Some(&model));
        assert!((score - (0.95 * 0.6 + 0.05 * 1.0)).abs() < 1e-12);
    }

    #[test]
    fn test_opponent_term_takes_over_at_deadline() {
        let scorer = BidScorer::new(ScorerConfig::default());
        let profile = profile_with_utility(1.0);
        let domain = binary_domain();
        let mut model = OpponentModel::new(&domain);
        model.update(&Bid::from_pairs([("A", "0")]));

        let ours = Bid::from_pairs([("A", "1")]);
        let theirs = Bid::from_pairs([("A", "0")]);
        let early_gap = scorer.score(&theirs, 0.0, &profile, Some(&model))
            - scorer.score(&ours, 0.0, &profile, Some(&model));
        let late_gap = scorer.score(&theirs, 1.0, &profile, Some(&model))
            - scorer.score(&ours, 1.0, &profile, Some(&model));

        assert!(late_gap > early_gap);
        assert!((scorer.score(&theirs, 1.0, &profile, Some(&model)) - 1.0).abs() < 1e-12);
        assert_eq!(scorer.score(&ours, 1.0, &profile, Some(&model)), 0.0);
    }
}
