//! Strategy engine: opponent modelling, bid scoring, counter-offer search
//! and the accept/counter decision policy.

pub mod opponent;
pub mod scorer;
pub mod search;

use rand::Rng;
use tracing::{debug, info};

use crate::engine::clock::SessionTimeHistory;
use crate::profile::UtilitySpace;
use crate::types::{Bid, NegotiationError};
use opponent::OpponentModel;
use search::{CounterOfferSearch, ScoredBid};

// ---------------------------------------------------------------------------
// Configuration (defaults — overridden by config.toml at runtime)
// ---------------------------------------------------------------------------

/// Acceptance policy parameters.
#[derive(Debug, Clone, Copy)]
pub struct AcceptanceConfig {
    /// Threshold at zero time pressure.
    pub initial_threshold: f64,
    /// Lowest threshold reached at full time pressure, before the
    /// opponent-prediction adjustment.
    pub final_threshold: f64,
    /// Offers at or below this utility are never accepted late.
    pub floor_utility: f64,
    /// Time pressure above which the utility floor applies.
    pub floor_pressure: f64,
    /// No acceptance at or above this time pressure.
    pub max_accept_pressure: f64,
    /// Cap on the history-damped time pressure.
    pub damped_pressure_cap: f64,
    /// Past sessions required before time pressure is damped by history.
    pub min_history_sessions: usize,
}

impl Default for AcceptanceConfig {
    fn default() -> Self {
        Self {
            initial_threshold: 0.9,
            final_threshold: 0.75,
            floor_utility: 0.75,
            floor_pressure: 0.91,
            max_accept_pressure: 0.8,
            damped_pressure_cap: 0.8,
            min_history_sessions: 11,
        }
    }
}

// ---------------------------------------------------------------------------
// Decisions
// ---------------------------------------------------------------------------

/// Why an offer was accepted or rejected.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    /// Late and low-valued: rejected regardless of the threshold.
    HardFloor,
    /// Above threshold while time pressure is still moderate.
    Accepted,
    /// At or below the acceptance threshold.
    BelowThreshold,
    /// Above threshold, but time pressure is too high to accept.
    PressureTooHigh,
}

/// Everything computed while evaluating a received offer.
#[derive(Debug, Clone)]
pub struct AcceptanceCheck {
    pub utility: f64,
    pub time_pressure_factor: f64,
    /// Opponent's predicted utility for the offer, when a model exists.
    pub prediction: Option<f64>,
    pub threshold: f64,
    pub verdict: Verdict,
}

impl AcceptanceCheck {
    pub fn accepts(&self) -> bool {
        self.verdict == Verdict::Accepted
    }
}

/// Outcome of a turn.
#[derive(Debug, Clone)]
pub enum Decision {
    /// Accept the last received bid.
    Accept(Bid),
    /// Propose a new bid.
    Counter(ScoredBid),
}

impl Decision {
    /// The bid accepted or proposed.
    pub fn bid(&self) -> &Bid {
        match self {
            Decision::Accept(bid) => bid,
            Decision::Counter(scored) => &scored.bid,
        }
    }

    pub fn is_accept(&self) -> bool {
        matches!(self, Decision::Accept(_))
    }
}

// ---------------------------------------------------------------------------
// Policy
// ---------------------------------------------------------------------------

/// Decides each turn between accepting the last offer and countering.
///
/// Holds no per-turn state: everything it needs (profile, opponent model,
/// progress, past session times) is passed in.
pub struct NegotiationStrategy {
    acceptance: AcceptanceConfig,
    search: CounterOfferSearch,
}

impl NegotiationStrategy {
    pub fn new(acceptance: AcceptanceConfig, search: CounterOfferSearch) -> Self {
        Self { acceptance, search }
    }

    pub fn acceptance(&self) -> &AcceptanceConfig {
        &self.acceptance
    }

    pub fn search(&self) -> &CounterOfferSearch {
        &self.search
    }

    /// Time pressure at `progress`.
    ///
    /// Plain progress, unless enough past sessions are on record, in which
    /// case progress is measured against the mean past session length and
    /// capped.
    pub fn time_pressure_factor(&self, progress: f64, past: &SessionTimeHistory) -> f64 {
        if past.len() < self.acceptance.min_history_sessions {
            return progress;
        }
        match past.mean() {
            Some(mean) if mean > 0.0 => (progress / mean).min(self.acceptance.damped_pressure_cap),
            _ => progress,
        }
    }

    /// Acceptance threshold: starts at the initial threshold and relaxes
    /// linearly toward `max(final_threshold, prediction)` as pressure grows.
    pub fn acceptance_threshold(&self, time_pressure_factor: f64, prediction: Option<f64>) -> f64 {
        let initial = self.acceptance.initial_threshold;
        let target = match prediction {
            Some(p) => self.acceptance.final_threshold.max(p),
            None => self.acceptance.final_threshold,
        };
        initial + (target - initial) * time_pressure_factor
    }

    /// Evaluate a received offer without searching for a counter-offer.
    pub fn evaluate(
        &self,
        bid: &Bid,
        profile: &dyn UtilitySpace,
        opponent: Option<&OpponentModel>,
        progress: f64,
        past: &SessionTimeHistory,
    ) -> AcceptanceCheck {
        let cfg = &self.acceptance;
        let utility = profile.utility(bid);
        let time_pressure_factor = self.time_pressure_factor(progress, past);
        let prediction = opponent.map(|m| m.predict_utility(bid));
        let threshold = self.acceptance_threshold(time_pressure_factor, prediction);

        let verdict = if utility <= cfg.floor_utility && time_pressure_factor > cfg.floor_pressure {
            Verdict::HardFloor
        } else if utility > threshold {
            if time_pressure_factor < cfg.max_accept_pressure {
                Verdict::Accepted
            } else {
                Verdict::PressureTooHigh
            }
        } else {
            Verdict::BelowThreshold
        };

        debug!(
            bid = %bid,
            utility = format!("{utility:.4}"),
            time_pressure_factor = format!("{time_pressure_factor:.4}"),
            prediction = ?prediction,
            threshold = format!("{threshold:.4}"),
            verdict = ?verdict,
            "Offer evaluated"
        );

        AcceptanceCheck {
            utility,
            time_pressure_factor,
            prediction,
            threshold,
            verdict,
        }
    }

    /// Decide this turn's action.
    ///
    /// With no offer received yet the answer is always a counter-offer.
    pub fn decide<R: Rng + ?Sized>(
        &self,
        last_received: Option<&Bid>,
        profile: &dyn UtilitySpace,
        opponent: Option<&OpponentModel>,
        progress: f64,
        past: &SessionTimeHistory,
        rng: &mut R,
    ) -> Result<Decision, NegotiationError> {
        if let Some(bid) = last_received {
            let check = self.evaluate(bid, profile, opponent, progress, past);
            if check.accepts() {
                info!(
                    bid = %bid,
                    utility = format!("{:.4}", check.utility),
                    threshold = format!("{:.4}", check.threshold),
                    "Accepting offer"
                );
                return Ok(Decision::Accept(bid.clone()));
            }
        }

        let counter = self.search.propose(profile, progress, opponent, rng)?;
        info!(
            bid = %counter.bid,
            utility = format!("{:.4}", profile.utility(&counter.bid)),
            score = format!("{:.4}", counter.score),
            "Countering"
        );
        Ok(Decision::Counter(counter))
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
