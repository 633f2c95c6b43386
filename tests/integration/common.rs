//! Shared fixtures for integration tests.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use parley::config::AppConfig;
use parley::engine::agent::NegotiationAgent;
use parley::types::{Action, Bid, Inform, PartyId, ProgressTime, SessionSettings};

/// Two binary issues; we want A=1 and B=0, A matters more.
pub const PROFILE: &str = r#"{
    "name": "seller",
    "domain": {"name": "binary", "issues": {"A": ["0", "1"], "B": ["0", "1"]}},
    "issue_weights": {"A": 0.6, "B": 0.4},
    "value_utilities": {"A": {"0": 0.0, "1": 1.0}, "B": {"0": 1.0, "1": 0.0}}
}"#;

pub const ME: &str = "parley_1";
pub const OPPONENT: &str = "hardliner_2";

/// A fresh scratch directory holding the profile.
pub fn scratch_dir() -> PathBuf {
    let mut p = std::env::temp_dir();
    p.push(format!("parley_it_{}", uuid::Uuid::new_v4()));
    std::fs::create_dir_all(&p).unwrap();
    std::fs::write(p.join("profile.json"), PROFILE).unwrap();
    p
}

pub fn make_agent(seed: u64) -> NegotiationAgent {
    let mut cfg = AppConfig::default();
    cfg.agent.rng_seed = Some(seed);
    cfg.strategy.sample_count = 300;
    NegotiationAgent::from_config(&cfg)
}

pub fn settings(dir: &Path, start_millis: i64, duration_millis: u64) -> SessionSettings {
    SessionSettings {
        party_id: PartyId::new(ME),
        progress: ProgressTime::new(start_millis, duration_millis),
        profile: format!("file:{}", dir.join("profile.json").display()),
        parameters: BTreeMap::from([(
            "storage_dir".to_string(),
            serde_json::Value::String(dir.to_string_lossy().to_string()),
        )]),
    }
}

pub fn bid(a: &str, b: &str) -> Bid {
    Bid::from_pairs([("A", a), ("B", b)])
}

pub fn opponent_offer(a: &str, b: &str) -> Inform {
    Inform::ActionDone {
        action: Action::Offer {
            actor: PartyId::new(OPPONENT),
            bid: bid(a, b),
        },
    }
}
