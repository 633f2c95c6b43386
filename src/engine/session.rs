//! Per-session state.
//!
//! A `SessionContext` is built from the settings message, threaded
//! through every event of the session and dropped when it finishes.

use std::path::{Path, PathBuf};

use tracing::{debug, info};
use uuid::Uuid;

use crate::engine::clock::SessionClock;
use crate::profile::UtilitySpace;
use crate::strategy::opponent::OpponentModel;
use crate::types::{Bid, BidLogEntry, PartyId, ProgressTime};

pub struct SessionContext {
    id: Uuid,
    me: PartyId,
    profile: Box<dyn UtilitySpace + Send>,
    clock: SessionClock,
    storage_dir: PathBuf,
    opponent_name: Option<String>,
    /// Created on the first received offer.
    opponent_model: Option<OpponentModel>,
    last_received: Option<Bid>,
    bid_log: Vec<BidLogEntry>,
}

impl SessionContext {
    pub fn new(
        me: PartyId,
        profile: Box<dyn UtilitySpace + Send>,
        progress: ProgressTime,
        storage_dir: PathBuf,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            me,
            profile,
            clock: SessionClock::new(progress),
            storage_dir,
            opponent_name: None,
            opponent_model: None,
            last_received: None,
            bid_log: Vec::new(),
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn me(&self) -> &PartyId {
        &self.me
    }

    pub fn profile(&self) -> &dyn UtilitySpace {
        self.profile.as_ref()
    }

    pub fn storage_dir(&self) -> &Path {
        &self.storage_dir
    }

    pub fn opponent_name(&self) -> Option<&str> {
        self.opponent_name.as_deref()
    }

    pub fn opponent_model(&self) -> Option<&OpponentModel> {
        self.opponent_model.as_ref()
    }

    pub fn last_received(&self) -> Option<&Bid> {
        self.last_received.as_ref()
    }

    pub fn bid_log(&self) -> &[BidLogEntry] {
        &self.bid_log
    }

    /// The bid we accepted, if this session ended in our acceptance.
    pub fn agreement(&self) -> Option<&BidLogEntry> {
        self.bid_log.iter().rev().find(|entry| entry.accepted)
    }

    /// Read deadline progress at `now_millis` (non-decreasing).
    pub fn progress(&mut self, now_millis: i64) -> f64 {
        self.clock.read(now_millis)
    }

    pub fn last_progress(&self) -> f64 {
        self.clock.last()
    }

    /// Note the opponent's identity from one of its actions.
    pub fn observe_opponent(&mut self, actor: &PartyId) {
        if self.opponent_name.as_deref() != Some(actor.name()) {
            info!(session = %self.id, opponent = actor.name(), "Opponent identified");
            self.opponent_name = Some(actor.name().to_string());
        }
    }

    /// Record an offer received from the opponent.
    pub fn receive_offer(&mut self, bid: Bid) {
        let domain = self.profile.domain();
        let model = self
            .opponent_model
            .get_or_insert_with(|| OpponentModel::new(domain));
        model.update(&bid);
        debug!(
            session = %self.id,
            bid = %bid,
            utility = format!("{:.4}", self.profile.utility(&bid)),
            "Offer received"
        );
        self.last_received = Some(bid);
    }

    /// Record the bid we accepted or proposed this turn.
    pub fn record_turn(&mut self, bid: &Bid, progress: f64, accepted: bool) {
        self.bid_log.push(BidLogEntry {
            bid: bid.clone(),
            utility: self.profile.utility(bid),
            progress,
            accepted,
        });
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

    fn make_session() -> SessionContext {
        let mut issues = BTreeMap::new();
        issues.insert("A".to_string(), vec![Value::from("0"), Value::from("1")]);
        let mut profile = MockUtilitySpace::new();
        profile.expect_domain().return_const(Domain::new("d", issues));
        profile.expect_utility().return_const(0.6);

        SessionContext::new(
            PartyId::new("me_1"),
            Box::new(profile),
            ProgressTime::new(0, 10_000),
            PathBuf::from("/tmp"),
        )
    }

    #[test]
    fn test_opponent_model_created_on_first_offer() {
        let mut session = make_session();
        assert!(session.opponent_model().is_none());
        assert!(session.last_received().is_none());

        session.receive_offer(Bid::from_pairs([("A", "1")]));
        session.receive_offer(Bid::from_pairs([("A", "0")]));

        assert_eq!(session.opponent_model().unwrap().offers_seen(), 2);
        assert_eq!(session.last_received(), Some(&Bid::from_pairs([("A", "0")])));
    }

    #[test]
    fn test_record_turn_logs_utility_and_progress() {
        let mut session = make_session();
        let progress = session.progress(2_500);
        session.record_turn(&Bid::from_pairs([("A", "1")]), progress, false);

        let log = session.bid_log();
        assert_eq!(log.len(), 1);
        assert!((log[0].utility - 0.6).abs() < 1e-12);
        assert!((log[0].progress - 0.25).abs() < 1e-12);
        assert!(!log[0].accepted);
        assert!(session.agreement().is_none());
    }

    #[test]
    fn test_agreement_is_the_accepted_bid() {
        let mut session = make_session();
        session.record_turn(&Bid::from_pairs([("A", "1")]), 0.1, false);
        session.record_turn(&Bid::from_pairs([("A", "0")]), 0.4, true);

        let agreement = session.agreement().unwrap();
        assert_eq!(agreement.bid, Bid::from_pairs([("A", "0")]));
        assert!((agreement.progress - 0.4).abs() < 1e-12);
    }

    #[test]
    fn test_observe_opponent_strips_position() {
        let mut session = make_session();
        session.observe_opponent(&PartyId::new("hardliner_2"));
        assert_eq!(session.opponent_name(), Some("hardliner"));
    }
}
