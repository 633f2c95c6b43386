//! End-to-end sessions through `NegotiationAgent::handle_at`.

use parley::storage::BID_LOG_FILE;
use parley::types::{Inform, Value};

use crate::common::*;

// ---------------------------------------------------------------------------
// Opponent modelling
// ---------------------------------------------------------------------------

#[test]
fn test_opponent_model_learns_from_offers() {
    let dir = scratch_dir();
    let mut agent = make_agent(1);
    agent
        .handle_at(Inform::Settings(settings(&dir, 0, 10_000)), 0)
        .unwrap();

    for t in 0..3 {
        agent.handle_at(opponent_offer("1", "0"), 100 * t).unwrap();
    }
    agent.handle_at(opponent_offer("1", "1"), 400).unwrap();

    let session = agent.session().unwrap();
    let model = session.opponent_model().unwrap();
    assert_eq!(model.offers_seen(), 4);
    assert_eq!(model.value_score("A", &Value::from("1")), 1.0);
    assert_eq!(model.value_score("B", &Value::from("0")), 1.0);
    assert!(model.value_score("B", &Value::from("1")) < 1.0);
    assert!(model.predict_utility(&bid("1", "0")) > model.predict_utility(&bid("0", "1")));
    assert_eq!(session.last_received(), Some(&bid("1", "1")));
    assert_eq!(session.opponent_name(), Some("hardliner"));

    std::fs::remove_dir_all(&dir).unwrap();
}

// ---------------------------------------------------------------------------
// Decisions
// ---------------------------------------------------------------------------

#[test]
fn test_opening_turn_proposes_our_best_bid() {
    let dir = scratch_dir();
    let mut agent = make_agent(2);
    agent
        .handle_at(Inform::Settings(settings(&dir, 0, 10_000)), 0)
        .unwrap();

    let action = agent.handle_at(Inform::YourTurn, 10).unwrap().unwrap();
    assert!(!action.is_accept());
    assert_eq!(action.bid(), &bid("1", "0"));

    std::fs::remove_dir_all(&dir).unwrap();
}

#[test]
fn test_generous_offer_is_accepted() {
    let dir = scratch_dir();
    let mut agent = make_agent(3);
    agent
        .handle_at(Inform::Settings(settings(&dir, 0, 10_000)), 0)
        .unwrap();
    agent.handle_at(Inform::YourTurn, 500).unwrap();
    agent.handle_at(opponent_offer("1", "0"), 2_500).unwrap();

    let action = agent.handle_at(Inform::YourTurn, 3_000).unwrap().unwrap();
    assert!(action.is_accept());
    assert_eq!(action.bid(), &bid("1", "0"));
    assert_eq!(action.actor().as_str(), ME);

    std::fs::remove_dir_all(&dir).unwrap();
}

#[test]
fn test_late_low_offer_is_countered() {
    let dir = scratch_dir();
    let mut agent = make_agent(4);
    agent
        .handle_at(Inform::Settings(settings(&dir, 0, 10_000)), 0)
        .unwrap();
    // Utility 0.4 for us, offered at 95% of the deadline.
    agent.handle_at(opponent_offer("0", "0"), 9_400).unwrap();

    let action = agent.handle_at(Inform::YourTurn, 9_500).unwrap().unwrap();
    assert!(!action.is_accept());

    std::fs::remove_dir_all(&dir).unwrap();
}

#[test]
fn test_counter_offer_concedes_at_deadline() {
    let dir = scratch_dir();
    let mut agent = make_agent(5);
    agent
        .handle_at(Inform::Settings(settings(&dir, 0, 10_000)), 0)
        .unwrap();
    for t in 0..5 {
        agent.handle_at(opponent_offer("0", "1"), 1_000 * t).unwrap();
    }

    // At the deadline own utility carries no weight: the search lands on
    // the bid the opponent keeps asking for.
    let action = agent.handle_at(Inform::YourTurn, 10_000).unwrap().unwrap();
    assert!(!action.is_accept());
    assert_eq!(action.bid(), &bid("0", "1"));

    std::fs::remove_dir_all(&dir).unwrap();
}

// ---------------------------------------------------------------------------
// Session end and cross-session memory
// ---------------------------------------------------------------------------

#[test]
fn test_sessions_share_history_and_bid_log() {
    let dir = scratch_dir();
    let mut agent = make_agent(6);

    for session in 0..2 {
        agent
            .handle_at(Inform::Settings(settings(&dir, 0, 10_000)), 0)
            .unwrap();
        agent.handle_at(Inform::YourTurn, 1_000).unwrap();
        agent.handle_at(opponent_offer("0", "1"), 2_000).unwrap();
        agent.handle_at(Inform::YourTurn, 3_000).unwrap();
        agent.handle_at(Inform::Finished, 4_000 + 1_000 * session).unwrap();
    }

    assert_eq!(agent.sessions_completed(), 2);
    let times: Vec<f64> = agent.history().iter().collect();
    assert_eq!(times.len(), 2);
    assert!((times[0] - 0.4).abs() < 1e-12);
    assert!((times[1] - 0.5).abs() < 1e-12);

    let log = std::fs::read_to_string(dir.join(BID_LOG_FILE)).unwrap();
    let lines: Vec<&str> = log.lines().collect();
    assert_eq!(lines[0], "bid,utility,time_pressure_factor");
    assert_eq!(lines.len(), 1 + 4);
    assert_eq!(lines.iter().filter(|l| l.starts_with("bid,")).count(), 1);

    std::fs::remove_dir_all(&dir).unwrap();
}

#[test]
fn test_past_session_history_is_bounded() {
    let dir = scratch_dir();
    let mut agent = make_agent(7);

    for i in 0..12i64 {
        agent
            .handle_at(Inform::Settings(settings(&dir, 0, 1_000)), 0)
            .unwrap();
        agent.handle_at(Inform::Finished, (i + 1) * 50).unwrap();
    }

    let times: Vec<f64> = agent.history().iter().collect();
    assert_eq!(times.len(), 10);
    for (k, t) in times.iter().enumerate() {
        let expected = (k as f64 + 3.0) * 0.05;
        assert!((t - expected).abs() < 1e-9, "slot {k}: {t} != {expected}");
    }

    std::fs::remove_dir_all(&dir).unwrap();
}
