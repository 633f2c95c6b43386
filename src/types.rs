//! Shared types for the PARLEY agent.
//!
//! These types form the negotiation data model used across all modules:
//! bids over a discrete issue/value domain, the deadline tracker, the
//! actions exchanged with the opponent and the inbound events delivered
//! by the protocol runtime. They do not depend on any other module so
//! that profile, strategy and engine code can share them freely.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

// ---------------------------------------------------------------------------
// Values and bids
// ---------------------------------------------------------------------------

/// A single discrete value an issue can take.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Value(String);

impl Value {
    pub fn new(value: impl Into<String>) -> Self {
        Value(value.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Value(value.to_string())
    }
}

impl From<String> for Value {
    fn from(value: String) -> Self {
        Value(value)
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "\"{}\"", self.0)
    }
}

/// One concrete assignment of values to issues.
///
/// Immutable once built. Equality and hashing are by content, so two bids
/// with the same issue→value mapping are interchangeable everywhere.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Bid {
    values: BTreeMap<String, Value>,
}

impl Bid {
    pub fn new(values: BTreeMap<String, Value>) -> Self {
        Self { values }
    }

    /// Build a bid from `(issue, value)` pairs.
    pub fn from_pairs<I, K, V>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<Value>,
    {
        Self {
            values: pairs
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }

    /// The value chosen for `issue`, if the bid assigns one.
    pub fn value(&self, issue: &str) -> Option<&Value> {
        self.values.get(issue)
    }

    /// Issue identifiers in sorted order.
    pub fn issues(&self) -> impl Iterator<Item = &str> {
        self.values.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.values.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

impl fmt::Display for Bid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let parts: Vec<String> = self
            .values
            .iter()
            .map(|(issue, value)| format!("{issue}={value}"))
            .collect();
        write!(f, "Bid{{{}}}", parts.join(", "))
    }
}

// ---------------------------------------------------------------------------
// Domain
// ---------------------------------------------------------------------------

/// The issues of a negotiation and the values each one admits.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Domain {
    pub name: String,
    /// Issue → permissible values, in declared order.
    pub issues: BTreeMap<String, Vec<Value>>,
}

impl Domain {
    pub fn new(name: impl Into<String>, issues: BTreeMap<String, Vec<Value>>) -> Self {
        Self {
            name: name.into(),
            issues,
        }
    }

    /// Issue identifiers in sorted order.
    pub fn issues(&self) -> impl Iterator<Item = &str> {
        self.issues.keys().map(String::as_str)
    }

    /// Permissible values for `issue`.
    pub fn values(&self, issue: &str) -> Option<&[Value]> {
        self.issues.get(issue).map(Vec::as_slice)
    }

    pub fn issue_count(&self) -> usize {
        self.issues.len()
    }

    /// Check that `bid` assigns exactly one permissible value to every issue.
    pub fn validate_bid(&self, bid: &Bid) -> Result<(), NegotiationError> {
        if bid.len() != self.issues.len() {
            return Err(NegotiationError::InvalidBid(format!(
                "{bid} assigns {} issues, domain {} has {}",
                bid.len(),
                self.name,
                self.issues.len()
            )));
        }
        for (issue, values) in &self.issues {
            match bid.value(issue) {
                Some(v) if values.contains(v) => {}
                Some(v) => {
                    return Err(NegotiationError::InvalidBid(format!(
                        "value {v} not allowed for issue {issue}"
                    )))
                }
                None => {
                    return Err(NegotiationError::InvalidBid(format!(
                        "{bid} is missing issue {issue}"
                    )))
                }
            }
        }
        Ok(())
    }
}

/// Indexed view over every bid in a domain.
///
/// Issues are taken in sorted order, values in declared order; index `i`
/// is decoded mixed-radix with the last issue varying fastest.
#[derive(Debug, Clone)]
pub struct AllBids<'a> {
    domain: &'a Domain,
    size: u64,
}

impl<'a> AllBids<'a> {
    /// Fails when the domain admits no bid at all.
    pub fn new(domain: &'a Domain) -> Result<Self, NegotiationError> {
        if domain.issues.is_empty() {
            return Err(NegotiationError::EmptyBidSpace(domain.name.clone()));
        }
        let mut size: u64 = 1;
        for values in domain.issues.values() {
            if values.is_empty() {
                return Err(NegotiationError::EmptyBidSpace(domain.name.clone()));
            }
            size = size
                .checked_mul(values.len() as u64)
                .ok_or_else(|| NegotiationError::BidSpaceTooLarge(domain.name.clone()))?;
        }
        Ok(Self { domain, size })
    }

    pub fn size(&self) -> u64 {
        self.size
    }

    /// The bid at `index`, or `None` past the end.
    pub fn get(&self, index: u64) -> Option<Bid> {
        if index >= self.size {
            return None;
        }
        let mut rest = index;
        let mut values = BTreeMap::new();
        for (issue, options) in self.domain.issues.iter().rev() {
            let radix = options.len() as u64;
            let pick = (rest % radix) as usize;
            rest /= radix;
            values.insert(issue.clone(), options[pick].clone());
        }
        Some(Bid::new(values))
    }

    pub fn iter(&self) -> impl Iterator<Item = Bid> + '_ {
        (0..self.size).filter_map(move |i| self.get(i))
    }
}

// ---------------------------------------------------------------------------
// Parties and actions
// ---------------------------------------------------------------------------

/// Identifier of a negotiation party, e.g. `"parley_1"`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PartyId(String);

impl PartyId {
    pub fn new(id: impl Into<String>) -> Self {
        PartyId(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The party name with its trailing `_<position>` suffix cut off.
    pub fn name(&self) -> &str {
        match self.0.rsplit_once('_') {
            Some((name, _)) => name,
            None => &self.0,
        }
    }
}

impl fmt::Display for PartyId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// An action performed by a party.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Action {
    /// Propose `bid` to the other party.
    Offer { actor: PartyId, bid: Bid },
    /// Agree to `bid`, ending the negotiation.
    Accept { actor: PartyId, bid: Bid },
}

impl Action {
    pub fn actor(&self) -> &PartyId {
        match self {
            Action::Offer { actor, .. } | Action::Accept { actor, .. } => actor,
        }
    }

    pub fn bid(&self) -> &Bid {
        match self {
            Action::Offer { bid, .. } | Action::Accept { bid, .. } => bid,
        }
    }

    pub fn is_accept(&self) -> bool {
        matches!(self, Action::Accept { .. })
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Action::Offer { actor, bid } => write!(f, "Offer({actor}, {bid})"),
            Action::Accept { actor, bid } => write!(f, "Accept({actor}, {bid})"),
        }
    }
}

// ---------------------------------------------------------------------------
// Deadline tracking
// ---------------------------------------------------------------------------

/// Time-based deadline: progress runs from 0 at `start_millis` to 1 at
/// `start_millis + duration_millis`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProgressTime {
    pub start_millis: i64,
    pub duration_millis: u64,
}

impl ProgressTime {
    pub fn new(start_millis: i64, duration_millis: u64) -> Self {
        Self {
            start_millis,
            duration_millis,
        }
    }

    /// Progress at wall-clock time `now_millis`, clamped to [0, 1].
    pub fn get(&self, now_millis: i64) -> f64 {
        if self.duration_millis == 0 {
            return 1.0;
        }
        let elapsed = now_millis.saturating_sub(self.start_millis) as f64;
        (elapsed / self.duration_millis as f64).clamp(0.0, 1.0)
    }

    /// Wall-clock time at which progress reaches 1.
    pub fn deadline_millis(&self) -> i64 {
        let duration = i64::try_from(self.duration_millis).unwrap_or(i64::MAX);
        self.start_millis.saturating_add(duration)
    }
}

// ---------------------------------------------------------------------------
// Bid log
// ---------------------------------------------------------------------------

/// One bid we proposed or accepted, with the context of that turn.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BidLogEntry {
    pub bid: Bid,
    /// Our own utility for the bid.
    pub utility: f64,
    /// Progress at the start of the turn.
    pub progress: f64,
    pub accepted: bool,
}

// ---------------------------------------------------------------------------
// Inbound events
// ---------------------------------------------------------------------------

/// Session-start configuration delivered by the protocol runtime.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionSettings {
    /// Our own identity in this session.
    pub party_id: PartyId,
    pub progress: ProgressTime,
    /// Path or `file:` URI of the profile resource.
    pub profile: String,
    /// Free-form protocol parameters (`storage_dir`, ...).
    #[serde(default)]
    pub parameters: BTreeMap<String, serde_json::Value>,
}

impl SessionSettings {
    /// The `storage_dir` parameter, if supplied.
    pub fn storage_dir(&self) -> Option<&str> {
        self.parameters.get("storage_dir").and_then(|v| v.as_str())
    }
}

/// Events delivered to the agent, one at a time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Inform {
    /// First message of every session.
    Settings(SessionSettings),
    /// An action performed by one of the parties (including ourselves).
    ActionDone { action: Action },
    /// It is our turn: exactly one action must be emitted.
    YourTurn,
    /// The negotiation ended (agreement or deadline).
    Finished,
    /// Any event kind this agent does not understand.
    #[serde(other)]
    Unknown,
}

impl Inform {
    /// Short event-kind label for logging.
    pub fn kind(&self) -> &'static str {
        match self {
            Inform::Settings(_) => "settings",
            Inform::ActionDone { .. } => "action_done",
            Inform::YourTurn => "your_turn",
            Inform::Finished => "finished",
            Inform::Unknown => "unknown",
        }
    }
}

// ---------------------------------------------------------------------------
// Error types
// ---------------------------------------------------------------------------

#[derive(Debug, thiserror::Error)]
pub enum NegotiationError {
    #[error("Domain {0} has an empty bid space")]
    EmptyBidSpace(String),

    #[error("Domain {0} has too many bids to index")]
    BidSpaceTooLarge(String),

    #[error("Profile error: {0}")]
    Profile(String),

    #[error("Invalid bid: {0}")]
    InvalidBid(String),
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
