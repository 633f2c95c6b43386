//! Line-based transport adapter.
//!
//! Reads newline-delimited JSON `Inform` events, feeds them to the agent
//! one at a time and writes each resulting `Action` as one JSON line.

use anyhow::{Context, Result};
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt};
use tracing::{debug, warn};

use crate::engine::agent::NegotiationAgent;
use crate::types::Inform;

/// Counters for one driver run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DriverReport {
    pub events: u64,
    pub actions: u64,
    pub skipped: u64,
}

/// Decode one event line.
///
/// Returns `Ok(None)` for lines that cannot be decoded and are safe to
/// skip. A malformed settings event is an error.
pub fn decode_event(line: &str) -> Result<Option<Inform>> {
    match serde_json::from_str::<Inform>(line) {
        Ok(inform) => Ok(Some(inform)),
        Err(e) => {
            let kind = serde_json::from_str::<serde_json::Value>(line)
                .ok()
                .and_then(|v| v.get("type").and_then(|t| t.as_str()).map(str::to_string));
            if kind.as_deref() == Some("settings") {
                return Err(anyhow::Error::new(e).context("Malformed settings event"));
            }
            warn!(error = %e, kind = ?kind, "Skipping undecodable event");
            Ok(None)
        }
    }
}

/// Run the agent over `reader` until end of input.
pub async fn run<R, W>(reader: R, writer: &mut W, agent: &mut NegotiationAgent) -> Result<DriverReport>
where
    R: AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin,
{
    let mut report = DriverReport::default();
    let mut lines = reader.lines();

    while let Some(line) = lines.next_line().await.context("Failed to read event")? {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        let Some(inform) = decode_event(line)? else {
            report.skipped += 1;
            continue;
        };
        report.events += 1;
        debug!(kind = inform.kind(), "Event received");

        if let Some(action) = agent.handle(inform)? {
            let mut json = serde_json::to_string(&action).context("Failed to serialise action")?;
            json.push('\n');
            writer
                .write_all(json.as_bytes())
                .await
                .context("Failed to write action")?;
            writer.flush().await.context("Failed to flush action")?;
            report.actions += 1;
        }
    }

    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_known_event() {
        let inform = decode_event(r#"{"type":"finished"}"#).unwrap();
        assert_eq!(inform, Some(Inform::Finished));
    }

    #[test]
    fn test_decode_garbage_is_skipped() {
        assert!(decode_event("not json").unwrap().is_none());
        assert!(decode_event(r#"{"type":"action_done"}"#).unwrap().is_none());
    }

    #[test]
    fn test_decode_malformed_settings_is_fatal() {
        assert!(decode_event(r#"{"type":"settings","party_id":"me_1"}"#).is_err());
    }
}
