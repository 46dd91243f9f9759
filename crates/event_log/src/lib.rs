//! Durable event log for the scoreboard bot.
//! JSONL event stream (one file per day) + raw payload dumps for failed cycles.

use anyhow::Result;
use chrono::Utc;
use serde::Serialize;
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::PathBuf;

pub struct EventLogger {
    log_dir: PathBuf,
}

impl EventLogger {
    pub fn new(log_dir: impl Into<PathBuf>) -> Self {
        let dir = log_dir.into();
        fs::create_dir_all(&dir).ok();
        Self { log_dir: dir }
    }

    pub fn log<T: Serialize>(&self, event: &T) -> Result<()> {
        let date = Utc::now().format("%Y-%m-%d").to_string();
        let path = self.log_dir.join(format!("{date}.jsonl"));
        let line = serde_json::to_string(event)?;
        let mut f = OpenOptions::new().create(true).append(true).open(&path)?;
        writeln!(f, "{line}")?;
        Ok(())
    }

    /// Persist a raw payload that broke a cycle, keyed by context and
    /// timestamp, so the offending response can be inspected later.
    pub fn dump_payload(&self, context: &str, raw: &str) -> Result<PathBuf> {
        let dir = self.log_dir.join("error_payload");
        fs::create_dir_all(&dir)?;
        let ts = Utc::now().format("%Y-%m-%d_%H-%M-%S");
        let path = dir.join(format!("error_payload_{}_{ts}.json", sanitize(context)));
        fs::write(&path, raw)?;
        Ok(path)
    }
}

// Context strings can contain match-page urls; keep filenames safe.
fn sanitize(context: &str) -> String {
    context
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() { c } else { '_' })
        .collect()
}

pub fn now_iso() -> String {
    Utc::now().to_rfc3339()
}

// ── Event types ──────────────────────────────────────────────────────────────

#[derive(Serialize, Debug)]
pub struct MapLine {
    pub map_number: u32,
    pub map_name: String,
    pub rounds1: u32,
    pub rounds2: u32,
}

/// Emitted when a match is settled ("MATCH_FINALIZED") and again when its
/// state is archived and purged ("MATCH_ARCHIVED").
#[derive(Serialize, Debug)]
pub struct MatchFinalizedEvent {
    pub ts: String,
    pub event: &'static str, // "MATCH_FINALIZED" | "MATCH_ARCHIVED"
    pub match_id: String,
    pub team1: String,
    pub team2: String,
    pub maps_won1: u32,
    pub maps_won2: u32,
    pub maps: Vec<MapLine>,
}

#[derive(Serialize, Debug)]
pub struct CycleErrorEvent {
    pub ts: String,
    pub event: &'static str, // "CYCLE_ERROR"
    pub task: String,        // "live" | "upcoming"
    pub match_id: Option<String>,
    pub error: String,
    pub payload_file: Option<String>,
}

/// A designed skip, not an error: the upstream reported unhealthy.
#[derive(Serialize, Debug)]
pub struct HealthSkipEvent {
    pub ts: String,
    pub event: &'static str, // "HEALTH_SKIP"
    pub aggregator: String,
    pub origin: String,
}

#[derive(Serialize, Debug)]
pub struct CadenceEvent {
    pub ts: String,
    pub event: &'static str, // "CADENCE"
    pub updates_allowed: bool,
    pub active_matches: usize,
    pub next_match_in: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sanitize_keeps_filenames_safe() {
        assert_eq!(
            sanitize("https://www.vlr.gg/12345/loud-vs-drx"),
            "https___www_vlr_gg_12345_loud_vs_drx"
        );
        assert_eq!(sanitize("live"), "live");
    }
}
