//! vlrggapi client — live scores, upcoming matches, upstream health.
//!
//! Endpoints:
//!   match?q=live_score  → data.segments[]: one snapshot per live match
//!   match?q=upcoming    → data.segments[]: schedule with time_until_match
//!   health              → upstream url → { status }
//!
//! All payload fields arrive as strings and any of them can be missing or
//! malformed; models default rather than fail, and the caller decides what
//! is recoverable. Decode failures keep the raw body so the bot can dump it
//! for diagnostics.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::time::Duration;
use thiserror::Error;
use tracing::debug;

pub const DEFAULT_API_BASE: &str = "https://vlrggapi.vercel.app";

/// Health map key for the score aggregator itself.
pub const HEALTH_AGGREGATOR_KEY: &str = "https://vlrggapi.vercel.app";
/// Health map key for the site the aggregator scrapes.
pub const HEALTH_ORIGIN_KEY: &str = "https://vlr.gg";

#[derive(Debug, Error)]
pub enum FetchError {
    /// Connection-level failure (DNS, refused, timeout, body read).
    #[error("request failed: {0}")]
    Connect(#[source] reqwest::Error),
    #[error("unexpected HTTP status {0}")]
    Status(reqwest::StatusCode),
    /// Body was not the expected JSON shape; raw payload kept for diagnostics.
    #[error("payload decode failed: {source}")]
    Decode {
        #[source]
        source: serde_json::Error,
        raw: String,
    },
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LiveSegment {
    #[serde(default)]
    pub team1: String,
    #[serde(default)]
    pub team2: String,
    #[serde(default)]
    pub score1: String,
    #[serde(default)]
    pub score2: String,
    #[serde(default)]
    pub team1_round_ct: String,
    #[serde(default)]
    pub team1_round_t: String,
    #[serde(default)]
    pub team2_round_ct: String,
    #[serde(default)]
    pub team2_round_t: String,
    #[serde(default)]
    pub map_number: String,
    #[serde(default)]
    pub current_map: String,
    #[serde(default)]
    pub match_event: String,
    #[serde(default)]
    pub match_series: String,
    /// Canonical match page url; doubles as the stable match id.
    #[serde(default)]
    pub match_page: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UpcomingSegment {
    #[serde(default)]
    pub team1: String,
    #[serde(default)]
    pub team2: String,
    #[serde(default)]
    pub match_event: String,
    #[serde(default)]
    pub match_series: String,
    #[serde(default)]
    pub time_until_match: String,
    #[serde(default)]
    pub match_page: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpstreamHealth {
    #[serde(default)]
    pub status: String,
}

#[derive(Deserialize)]
struct Envelope<T> {
    data: SegmentList<T>,
}

#[derive(Deserialize)]
struct SegmentList<T> {
    segments: Vec<T>,
}

fn decode_segments<T: DeserializeOwned>(raw: &str) -> Result<Vec<T>, FetchError> {
    let envelope: Envelope<T> = serde_json::from_str(raw).map_err(|source| FetchError::Decode {
        source,
        raw: raw.to_string(),
    })?;
    Ok(envelope.data.segments)
}

pub fn parse_live(raw: &str) -> Result<Vec<LiveSegment>, FetchError> {
    decode_segments(raw)
}

pub fn parse_upcoming(raw: &str) -> Result<Vec<UpcomingSegment>, FetchError> {
    decode_segments(raw)
}

pub fn parse_health(raw: &str) -> Result<HashMap<String, UpstreamHealth>, FetchError> {
    serde_json::from_str(raw).map_err(|source| FetchError::Decode {
        source,
        raw: raw.to_string(),
    })
}

pub struct VlrClient {
    client: reqwest::Client,
    base: String,
}

impl VlrClient {
    pub fn new(base: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::builder()
                .user_agent("Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36")
                .timeout(Duration::from_secs(10))
                .build()
                .unwrap_or_else(|_| reqwest::Client::new()),
            base: base.into(),
        }
    }

    async fn get_text(&self, path: &str) -> Result<String, FetchError> {
        let url = format!("{}/{}", self.base.trim_end_matches('/'), path);
        debug!("GET {url}");
        let resp = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(FetchError::Connect)?;
        let status = resp.status();
        if !status.is_success() {
            return Err(FetchError::Status(status));
        }
        resp.text().await.map_err(FetchError::Connect)
    }

    pub async fn live(&self) -> Result<Vec<LiveSegment>, FetchError> {
        parse_live(&self.get_text("match?q=live_score").await?)
    }

    pub async fn upcoming(&self) -> Result<Vec<UpcomingSegment>, FetchError> {
        parse_upcoming(&self.get_text("match?q=upcoming").await?)
    }

    pub async fn health(&self) -> Result<HashMap<String, UpstreamHealth>, FetchError> {
        parse_health(&self.get_text("health").await?)
    }
}
