//! Frequency-based opponent model.
//!
//! Estimates the opponent's hidden preferences from the offers it makes.
//! Per issue, values the opponent offers often are assumed to be valued
//! highly, and issues on which the opponent rarely changes its value are
//! assumed to matter more to it.

use std::collections::{BTreeMap, HashMap};
use tracing::debug;

use crate::types::{Bid, Domain, Value};

// ---------------------------------------------------------------------------
// Issue estimator
// ---------------------------------------------------------------------------

/// Observed value frequencies for a single issue.
#[derive(Debug, Clone)]
struct IssueEstimator {
    /// Number of permissible values in the domain.
    num_values: usize,
    counts: HashMap<Value, u64>,
    observations: u64,
    max_count: u64,
}

impl IssueEstimator {
    fn new(num_values: usize) -> Self {
        Self {
            num_values,
            counts: HashMap::new(),
            observations: 0,
            max_count: 0,
        }
    }

    fn record(&mut self, value: &Value) {
        let count = self.counts.entry(value.clone()).or_insert(0);
        *count += 1;
        self.max_count = self.max_count.max(*count);
        self.observations += 1;
    }

    /// How concentrated the observed distribution is, in [0, 1].
    ///
    /// 0 when the observations are spread evenly over all values (or the
    /// issue has a single value and carries no information), 1 when every
    /// observation picked the same value.
    fn concentration(&self) -> f64 {
        if self.observations == 0 || self.num_values == 0 {
            return 0.0;
        }
        let equal_share = self.observations as f64 / self.num_values as f64;
        let spread = self.observations as f64 - equal_share;
        if spread <= 0.0 {
            return 0.0;
        }
        ((self.max_count as f64 - equal_share) / spread).clamp(0.0, 1.0)
    }

    /// Observed frequency of `value` relative to the most frequent value.
    fn value_score(&self, value: &Value) -> f64 {
        if self.max_count == 0 {
            return 0.0;
        }
        let count = self.counts.get(value).copied().unwrap_or(0);
        count as f64 / self.max_count as f64
    }
}

// ---------------------------------------------------------------------------
// Opponent model
// ---------------------------------------------------------------------------

/// Running estimate of the opponent's utility function.
///
/// Counts only ever grow; the model lives for one session.
#[derive(Debug, Clone)]
pub struct OpponentModel {
    issues: BTreeMap<String, IssueEstimator>,
    offers_seen: u64,
}

impl OpponentModel {
    pub fn new(domain: &Domain) -> Self {
        let issues = domain
            .issues
            .iter()
            .map(|(issue, values)| (issue.clone(), IssueEstimator::new(values.len())))
            .collect();
        Self {
            issues,
            offers_seen: 0,
        }
    }

    /// Record one more observed opponent offer.
    pub fn update(&mut self, bid: &Bid) {
        for (issue, estimator) in self.issues.iter_mut() {
            if let Some(value) = bid.value(issue) {
                estimator.record(value);
            }
        }
        self.offers_seen += 1;
        debug!(offers_seen = self.offers_seen, bid = %bid, "Opponent model updated");
    }

    /// Number of offers observed so far.
    pub fn offers_seen(&self) -> u64 {
        self.offers_seen
    }

    /// Normalised issue weights (sum to 1). Uniform until some issue shows
    /// a concentrated value distribution.
    pub fn issue_weights(&self) -> BTreeMap<String, f64> {
        let raw: BTreeMap<String, f64> = self
            .issues
            .iter()
            .map(|(issue, est)| (issue.clone(), est.concentration()))
            .collect();
        let total: f64 = raw.values().sum();

        if total <= 0.0 {
            let uniform = if raw.is_empty() { 0.0 } else { 1.0 / raw.len() as f64 };
            return raw.into_keys().map(|issue| (issue, uniform)).collect();
        }
        raw.into_iter().map(|(issue, w)| (issue, w / total)).collect()
    }

    /// Score of `value` on `issue` in [0, 1]; unseen values score 0.
    pub fn value_score(&self, issue: &str, value: &Value) -> f64 {
        self.issues
            .get(issue)
            .map(|est| est.value_score(value))
            .unwrap_or(0.0)
    }

    /// Predicted opponent utility of `bid`, in [0, 1].
    ///
    /// 0 for every bid until the first observation.
    pub fn predict_utility(&self, bid: &Bid) -> f64 {
        if self.offers_seen == 0 {
            return 0.0;
        }
        let weights = self.issue_weights();
        let predicted: f64 = weights
            .iter()
            .map(|(issue, weight)| {
                let score = bid
                    .value(issue)
                    .map(|v| self.value_score(issue, v))
                    .unwrap_or(0.0);
                weight * score
            })
            .sum();
        predicted.clamp(0.0, 1.0)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
