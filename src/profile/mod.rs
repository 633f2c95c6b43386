//! Preference profiles.
//!
//! Defines the `UtilitySpace` trait through which the strategy reads the
//! agent's own preferences, and the linear-additive implementation loaded
//! from a JSON profile resource at session start.

use anyhow::{Context, Result};
use serde::Deserialize;
use std::collections::BTreeMap;
use std::path::Path;
use tracing::{debug, info};

use crate::types::{Bid, Domain, NegotiationError};

/// Tolerance on the sum of issue weights.
const WEIGHT_SUM_TOLERANCE: f64 = 1e-6;

/// The agent's own preferences over bids.
///
/// Implementors map every valid bid of their domain to a utility in [0, 1].
#[cfg_attr(test, mockall::automock)]
pub trait UtilitySpace {
    /// Utility of `bid` for this agent.
    fn utility(&self, bid: &Bid) -> f64;

    /// The domain the preferences are defined over.
    fn domain(&self) -> &Domain;
}

// ---------------------------------------------------------------------------
// Linear-additive utility space
// ---------------------------------------------------------------------------

/// Utility = Σ issue_weight × value_utility over all issues.
#[derive(Debug, Clone)]
pub struct LinearAdditiveUtilitySpace {
    name: String,
    domain: Domain,
    issue_weights: BTreeMap<String, f64>,
    value_utilities: BTreeMap<String, BTreeMap<String, f64>>,
}

/// On-disk representation of a profile.
#[derive(Debug, Clone, Deserialize)]
pub struct ProfileDocument {
    pub name: String,
    pub domain: Domain,
    pub issue_weights: BTreeMap<String, f64>,
    pub value_utilities: BTreeMap<String, BTreeMap<String, f64>>,
}

impl LinearAdditiveUtilitySpace {
    /// Build and validate a utility space.
    pub fn new(
        name: impl Into<String>,
        domain: Domain,
        issue_weights: BTreeMap<String, f64>,
        value_utilities: BTreeMap<String, BTreeMap<String, f64>>,
    ) -> Result<Self, NegotiationError> {
        let space = Self {
            name: name.into(),
            domain,
            issue_weights,
            value_utilities,
        };
        space.validate()?;
        Ok(space)
    }

    pub fn from_document(doc: ProfileDocument) -> Result<Self, NegotiationError> {
        Self::new(doc.name, doc.domain, doc.issue_weights, doc.value_utilities)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Weight of `issue`, 0 for unknown issues.
    pub fn issue_weight(&self, issue: &str) -> f64 {
        self.issue_weights.get(issue).copied().unwrap_or(0.0)
    }

    fn validate(&self) -> Result<(), NegotiationError> {
        let domain = &self.domain;
        if domain.issues.is_empty() {
            return Err(NegotiationError::Profile(format!(
                "domain {} has no issues",
                domain.name
            )));
        }

        let mut weight_sum = 0.0;
        for (issue, values) in &domain.issues {
            if values.is_empty() {
                return Err(NegotiationError::Profile(format!(
                    "issue {issue} has no values"
                )));
            }
            let weight = self.issue_weights.get(issue).copied().ok_or_else(|| {
                NegotiationError::Profile(format!("missing weight for issue {issue}"))
            })?;
            if !(weight >= 0.0) {
                return Err(NegotiationError::Profile(format!(
                    "negative weight {weight} for issue {issue}"
                )));
            }
            weight_sum += weight;

            let utilities = self.value_utilities.get(issue).ok_or_else(|| {
                NegotiationError::Profile(format!("missing value utilities for issue {issue}"))
            })?;
            for value in values {
                let u = utilities.get(value.as_str()).copied().ok_or_else(|| {
                    NegotiationError::Profile(format!(
                        "missing utility for value {value} of issue {issue}"
                    ))
                })?;
                if !(0.0..=1.0).contains(&u) {
                    return Err(NegotiationError::Profile(format!(
                        "utility {u} for value {value} of issue {issue} is outside [0, 1]"
                    )));
                }
            }
        }

        if self.issue_weights.len() != domain.issues.len() {
            return Err(NegotiationError::Profile(
                "issue weights name issues outside the domain".to_string(),
            ));
        }
        if (weight_sum - 1.0).abs() > WEIGHT_SUM_TOLERANCE {
            return Err(NegotiationError::Profile(format!(
                "issue weights sum to {weight_sum}, expected 1"
            )));
        }
        Ok(())
    }
}

impl UtilitySpace for LinearAdditiveUtilitySpace {
    fn utility(&self, bid: &Bid) -> f64 {
        self.issue_weights
            .iter()
            .map(|(issue, weight)| {
                let value_utility = bid
                    .value(issue)
                    .and_then(|v| self.value_utilities.get(issue)?.get(v.as_str()))
                    .copied()
                    .unwrap_or(0.0);
                weight * value_utility
            })
            .sum::<f64>()
            .clamp(0.0, 1.0)
    }

    fn domain(&self) -> &Domain {
        &self.domain
    }
}

// ---------------------------------------------------------------------------
// Loading
// ---------------------------------------------------------------------------

/// Strip an optional `file:` / `file://` scheme from a profile reference.
pub fn resolve_profile_path(reference: &str) -> &str {
    reference
        .strip_prefix("file://")
        .or_else(|| reference.strip_prefix("file:"))
        .unwrap_or(reference)
}

/// Load a linear-additive profile from a path or `file:` URI.
pub fn load_profile(reference: &str) -> Result<LinearAdditiveUtilitySpace> {
    let path = resolve_profile_path(reference);
    if !Path::new(path).exists() {
        return Err(NegotiationError::Profile(format!("profile not found: {path}")).into());
    }

    let json = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read profile {path}"))?;
    let doc: ProfileDocument = serde_json::from_str(&json)
        .with_context(|| format!("Failed to parse profile {path}"))?;
    debug!(path, issues = doc.domain.issues.len(), "Profile document parsed");

    let space = LinearAdditiveUtilitySpace::from_document(doc)
        .with_context(|| format!("Invalid profile {path}"))?;

    info!(
        profile = %space.name(),
        domain = %space.domain().name,
        issues = space.domain().issue_count(),
        "Profile loaded"
    );
    Ok(space)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
