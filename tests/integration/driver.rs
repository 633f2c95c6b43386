//! The JSON-lines driver over in-memory streams.

use parley::engine::driver;
use parley::types::Action;

use crate::common::*;

fn settings_line(dir: &std::path::Path) -> String {
    let now = chrono::Utc::now().timestamp_millis();
    let mut value = serde_json::to_value(settings(dir, now, 3_600_000)).unwrap();
    value["type"] = serde_json::Value::String("settings".to_string());
    value.to_string()
}

#[test]
fn test_driver_answers_every_turn() {
    let dir = scratch_dir();
    let mut agent = make_agent(11);

    let input = [
        settings_line(&dir),
        r#"{"type":"your_turn"}"#.to_string(),
        format!(
            r#"{{"type":"action_done","action":{{"type":"offer","actor":"{OPPONENT}","bid":{{"A":"0","B":"1"}}}}}}"#
        ),
        r#"{"type":"heartbeat"}"#.to_string(),
        "this is not json".to_string(),
        String::new(),
        r#"{"type":"your_turn"}"#.to_string(),
        r#"{"type":"finished"}"#.to_string(),
    ]
    .join("\n");

    let mut output: Vec<u8> = Vec::new();
    let report = tokio_test::block_on(driver::run(input.as_bytes(), &mut output, &mut agent)).unwrap();

    assert_eq!(report.events, 6);
    assert_eq!(report.actions, 2);
    assert_eq!(report.skipped, 1);

    let actions: Vec<Action> = String::from_utf8(output)
        .unwrap()
        .lines()
        .map(|l| serde_json::from_str(l).unwrap())
        .collect();
    assert_eq!(actions.len(), 2);
    assert!(actions.iter().all(|a| !a.is_accept()));
    assert_eq!(actions[0].actor().as_str(), ME);
    assert_eq!(agent.sessions_completed(), 1);

    std::fs::remove_dir_all(&dir).unwrap();
}

#[test]
fn test_driver_stops_on_malformed_settings() {
    let mut agent = make_agent(12);
    let input = r#"{"type":"settings","profile":42}"#;
    let mut output: Vec<u8> = Vec::new();
    let result = tokio_test::block_on(driver::run(input.as_bytes(), &mut output, &mut agent));
    assert!(result.is_err());
    assert!(output.is_empty());
}
