//! Counter-offer search.
//!
//! Monte-Carlo search over the bid space: draws a fixed number of bids
//! uniformly at random (with replacement), scores each one and keeps the
//! best. The sample budget bounds the latency of a turn.

use rand::Rng;
use tracing::debug;

use crate::profile::UtilitySpace;
use crate::types::{AllBids, Bid, NegotiationError};

use super::opponent::OpponentModel;
use super::scorer::BidScorer;

/// Default number of sampled candidates per search.
pub const DEFAULT_SAMPLE_COUNT: usize = 1500;

/// Best candidate found by a search.
#[derive(Debug, Clone)]
pub struct ScoredBid {
    pub bid: Bid,
    pub score: f64,
}

pub struct CounterOfferSearch {
    scorer: BidScorer,
    sample_count: usize,
}

impl CounterOfferSearch {
    pub fn new(scorer: BidScorer, sample_count: usize) -> Self {
        Self {
            scorer,
            sample_count: sample_count.max(1),
        }
    }

    pub fn scorer(&self) -> &BidScorer {
        &self.scorer
    }

    pub fn sample_count(&self) -> usize {
        self.sample_count
    }

    /// Sample the bid space of `profile` and return the best-scoring bid.
    ///
    /// Ties keep the earliest sample. Fails only when the domain admits
    /// no bid.
    pub fn propose<R: Rng + ?Sized>(
        &self,
        profile: &dyn UtilitySpace,
        progress: f64,
        opponent: Option<&OpponentModel>,
        rng: &mut R,
    ) -> Result<ScoredBid, NegotiationError> {
        let all_bids = AllBids::new(profile.domain())?;
        let size = all_bids.size();

        let mut best: Option<ScoredBid> = None;
        for _ in 0..self.sample_count {
            let Some(bid) = all_bids.get(rng.gen_range(0..size)) else {
                continue;
            };
            let score = self.scorer.score(&bid, progress, profile, opponent);
            let improves = match &best {
                Some(current) => score > current.score,
                None => true,
            };
            if improves {
                best = Some(ScoredBid { bid, score });
            }
        }

        let best = best.ok_or_else(|| NegotiationError::EmptyBidSpace(profile.domain().name.clone()))?;
        debug!(
            bid = %best.bid,
            score = format!("{:.4}", best.score),
            samples = self.sample_count,
            space = size,
            "Counter-offer selected"
        );
        Ok(best)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
