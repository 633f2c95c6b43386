//! Negotiation agent — the event dispatcher.
//!
//! Receives one `Inform` at a time, keeps the current `SessionContext`,
//! and answers every turn prompt with exactly one action. The bounded
//! history of past session times outlives individual sessions.

use anyhow::{Context, Result};
use rand::rngs::StdRng;
use rand::SeedableRng;
use serde::Serialize;
use std::collections::BTreeSet;
use std::path::PathBuf;
use tracing::{error, info, warn};

use crate::config::AppConfig;
use crate::engine::clock::{now_millis, SessionTimeHistory};
use crate::engine::session::SessionContext;
use crate::profile;
use crate::strategy::scorer::BidScorer;
use crate::strategy::search::CounterOfferSearch;
use crate::strategy::{Decision, NegotiationStrategy};
use crate::storage;
use crate::types::{Action, Inform, SessionSettings};

const DESCRIPTION: &str =
    "Frequency-modelling agent that concedes toward the opponent only near the deadline.";

/// Protocols and profile kinds this agent supports.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Capabilities {
    pub protocols: BTreeSet<String>,
    pub profiles: BTreeSet<String>,
}

pub struct NegotiationAgent {
    strategy: NegotiationStrategy,
    history: SessionTimeHistory,
    session: Option<SessionContext>,
    rng: StdRng,
    default_storage_dir: PathBuf,
    sessions_completed: u64,
}

impl NegotiationAgent {
    pub fn new(
        strategy: NegotiationStrategy,
        history: SessionTimeHistory,
        rng: StdRng,
        default_storage_dir: PathBuf,
    ) -> Self {
        Self {
            strategy,
            history,
            session: None,
            rng,
            default_storage_dir,
            sessions_completed: 0,
        }
    }

    /// Build an agent from application configuration.
    pub fn from_config(cfg: &AppConfig) -> Self {
        let search = CounterOfferSearch::new(
            BidScorer::new(cfg.strategy.scorer()),
            cfg.strategy.sample_count,
        );
        let strategy = NegotiationStrategy::new(cfg.strategy.acceptance(), search);
        let rng = match cfg.agent.rng_seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        Self::new(
            strategy,
            SessionTimeHistory::new(cfg.strategy.history_capacity),
            rng,
            cfg.agent.default_storage_dir.clone(),
        )
    }

    pub fn capabilities(&self) -> Capabilities {
        Capabilities {
            protocols: BTreeSet::from(["SAOP".to_string()]),
            profiles: BTreeSet::from(["geniusweb.profile.utilityspace.LinearAdditive".to_string()]),
        }
    }

    pub fn description(&self) -> &'static str {
        DESCRIPTION
    }

    /// The active session, if any.
    pub fn session(&self) -> Option<&SessionContext> {
        self.session.as_ref()
    }

    pub fn history(&self) -> &SessionTimeHistory {
        &self.history
    }

    pub fn sessions_completed(&self) -> u64 {
        self.sessions_completed
    }

    /// Handle one event at the current wall-clock time.
    pub fn handle(&mut self, inform: Inform) -> Result<Option<Action>> {
        self.handle_at(inform, now_millis())
    }

    /// Handle one event at a specific time (for testing).
    ///
    /// Returns the action to send, if the event calls for one. Errors are
    /// fatal for the session (profile resolution, empty bid space).
    pub fn handle_at(&mut self, inform: Inform, now_millis: i64) -> Result<Option<Action>> {
        match inform {
            Inform::Settings(settings) => {
                self.on_settings(settings)?;
                Ok(None)
            }
            Inform::ActionDone { action } => {
                self.on_action_done(action);
                Ok(None)
            }
            Inform::YourTurn => self.on_your_turn(now_millis),
            Inform::Finished => {
                self.on_finished(now_millis);
                Ok(None)
            }
            Inform::Unknown => {
                warn!("Ignoring unknown event");
                Ok(None)
            }
        }
    }

    fn on_settings(&mut self, settings: SessionSettings) -> Result<()> {
        if let Some(previous) = &self.session {
            warn!(session = %previous.id(), "New settings before previous session finished; discarding it");
        }

        let space = profile::load_profile(&settings.profile)
            .with_context(|| format!("Failed to resolve profile {}", settings.profile))?;
        let storage_dir = settings
            .storage_dir()
            .map(PathBuf::from)
            .unwrap_or_else(|| self.default_storage_dir.clone());

        let session = SessionContext::new(
            settings.party_id.clone(),
            Box::new(space),
            settings.progress,
            storage_dir,
        );
        info!(
            session = %session.id(),
            party = %settings.party_id,
            profile = %settings.profile,
            deadline_millis = settings.progress.deadline_millis(),
            storage_dir = %session.storage_dir().display(),
            "Session started"
        );
        self.session = Some(session);
        Ok(())
    }

    fn on_action_done(&mut self, action: Action) {
        let Some(session) = self.session.as_mut() else {
            warn!(action = %action, "Action received without an active session");
            return;
        };
        if action.actor() == session.me() {
            return;
        }

        session.observe_opponent(action.actor());
        match action {
            Action::Offer { bid, .. } => {
                if let Err(e) = session.profile().domain().validate_bid(&bid) {
                    warn!(error = %e, "Ignoring opponent offer outside our domain");
                    return;
                }
                session.receive_offer(bid);
            }
            Action::Accept { bid, .. } => {
                info!(bid = %bid, opponent = ?session.opponent_name(), "Opponent accepted");
            }
        }
    }

    fn on_your_turn(&mut self, now_millis: i64) -> Result<Option<Action>> {
        let Some(session) = self.session.as_mut() else {
            warn!("Turn prompt without an active session; no action sent");
            return Ok(None);
        };

        let progress = session.progress(now_millis);
        let decision = self.strategy.decide(
            session.last_received(),
            session.profile(),
            session.opponent_model(),
            progress,
            &self.history,
            &mut self.rng,
        )?;

        let me = session.me().clone();
        let action = match decision {
            Decision::Accept(bid) => {
                session.record_turn(&bid, progress, true);
                Action::Accept { actor: me, bid }
            }
            Decision::Counter(scored) => {
                session.record_turn(&scored.bid, progress, false);
                Action::Offer {
                    actor: me,
                    bid: scored.bid,
                }
            }
        };
        info!(
            session = %session.id(),
            progress = format!("{progress:.4}"),
            action = %action,
            "Turn complete"
        );
        Ok(Some(action))
    }

    fn on_finished(&mut self, now_millis: i64) {
        let Some(mut session) = self.session.take() else {
            warn!("Finished received without an active session");
            return;
        };

        let progress = session.progress(now_millis);
        let dir = session.storage_dir().to_path_buf();
        if let Err(e) = storage::write_session_notes(&dir) {
            error!(error = %e, "Failed to write session notes");
        }
        if let Err(e) = storage::append_bid_log(&dir, session.bid_log()) {
            error!(error = %e, "Failed to append bid log");
        }

        self.history.push(progress);
        self.sessions_completed += 1;
        info!(
            session = %session.id(),
            progress = format!("{progress:.4}"),
            bids = session.bid_log().len(),
            agreement = ?session.agreement().map(|entry| entry.bid.to_string()),
            past_sessions = self.history.len(),
            "Session finished"
        );
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
