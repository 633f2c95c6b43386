//! Persistence layer.
//!
//! At the end of each session the bids we proposed or accepted are
//! appended to `bids.csv` in the session's storage directory, and a short
//! learning-data note is written to `data.md`.

use anyhow::{Context, Result};
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::Path;
use tracing::{debug, info};

use crate::types::BidLogEntry;

/// Bid log file name inside the storage directory.
pub const BID_LOG_FILE: &str = "bids.csv";

/// Session note file name inside the storage directory.
pub const NOTES_FILE: &str = "data.md";

/// Header row, written only to an empty log.
pub const BID_LOG_HEADER: [&str; 3] = ["bid", "utility", "time_pressure_factor"];

const NOTES: &str = "Data for learning (see README.md)";

/// Append `entries` to the bid log, writing the header first if the file
/// is empty. Returns the number of rows written (header excluded).
pub fn append_bid_log(dir: &Path, entries: &[BidLogEntry]) -> Result<usize> {
    fs::create_dir_all(dir)
        .with_context(|| format!("Failed to create storage dir {}", dir.display()))?;
    let path = dir.join(BID_LOG_FILE);

    let mut file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(&path)
        .with_context(|| format!("Failed to open bid log {}", path.display()))?;
    let is_empty = file
        .metadata()
        .with_context(|| format!("Failed to stat bid log {}", path.display()))?
        .len()
        == 0;

    let mut out = String::new();
    if is_empty {
        out.push_str(&BID_LOG_HEADER.join(","));
        out.push('\n');
    }
    for entry in entries {
        let bid = serde_json::to_string(&entry.bid).context("Failed to serialise bid")?;
        out.push_str(&format!(
            "{},{},{}\n",
            csv_field(&bid),
            entry.utility,
            entry.progress
        ));
        debug!(bid = %entry.bid, utility = entry.utility, progress = entry.progress, "Bid logged");
    }

    file.write_all(out.as_bytes())
        .with_context(|| format!("Failed to write bid log {}", path.display()))?;

    info!(path = %path.display(), rows = entries.len(), "Bid log appended");
    Ok(entries.len())
}

/// Overwrite the session note file.
pub fn write_session_notes(dir: &Path) -> Result<()> {
    fs::create_dir_all(dir)
        .with_context(|| format!("Failed to create storage dir {}", dir.display()))?;
    let path = dir.join(NOTES_FILE);
    fs::write(&path, NOTES).with_context(|| format!("Failed to write {}", path.display()))?;
    Ok(())
}

/// Quote a CSV field when it contains a delimiter, quote or newline.
fn csv_field(raw: &str) -> String {
    if raw.contains([',', '"', '\n', '\r']) {
        format!("\"{}\"", raw.replace('"', "\"\""))
    } else {
        raw.to_string()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
