//! Discord notification sink — one message per match, edited in place.
//!
//! Keyed by match id: the first publish posts a new channel message, every
//! later publish edits it. Message-id bookkeeping lives here so the core
//! never has to know about Discord.

use anyhow::{Context, Result};
use serde_json::json;
use std::collections::HashMap;
use std::time::Duration;
use tracing::info;

const EMBED_COLOR: u32 = 0x5865F2;

/// One rendered scoreboard update bound for the sink.
#[derive(Debug, Clone)]
pub struct MatchUpdate<'a> {
    pub match_id: &'a str,
    pub title: &'a str,
    pub description: &'a str,
    pub url: &'a str,
    pub event_label: &'a str,
}

/// Anything that can publish per-match scoreboard messages.
#[allow(async_fn_in_trait)]
pub trait Notify {
    /// Create the match's message on first sight, edit it afterwards.
    async fn publish(&mut self, update: MatchUpdate<'_>) -> Result<()>;

    /// Drop bookkeeping for an archived match.
    fn forget(&mut self, match_id: &str);
}

pub struct DiscordNotifier {
    client: reqwest::Client,
    token: String,
    channel_id: u64,
    /// match id → discord message id
    messages: HashMap<String, String>,
}

impl DiscordNotifier {
    pub fn new(token: impl Into<String>, channel_id: u64) -> Self {
        Self {
            client: reqwest::Client::builder()
                .timeout(Duration::from_secs(10))
                .build()
                .unwrap_or_else(|_| reqwest::Client::new()),
            token: token.into(),
            channel_id,
            messages: HashMap::new(),
        }
    }

    fn embed_body(update: &MatchUpdate<'_>) -> serde_json::Value {
        json!({
            "embeds": [{
                "title": update.title,
                "description": update.description,
                "url": update.url,
                "color": EMBED_COLOR,
                "footer": { "text": format!("{}\nScores via VLR.gg", update.event_label) },
            }]
        })
    }

    fn auth(&self) -> String {
        format!("Bot {}", self.token)
    }
}

impl Notify for DiscordNotifier {
    async fn publish(&mut self, update: MatchUpdate<'_>) -> Result<()> {
        let body = Self::embed_body(&update);

        if let Some(message_id) = self.messages.get(update.match_id) {
            let url = format!(
                "https://discord.com/api/v10/channels/{}/messages/{}",
                self.channel_id, message_id
            );
            let resp = self
                .client
                .patch(&url)
                .header("Authorization", self.auth())
                .json(&body)
                .send()
                .await
                .context("discord message edit failed")?;
            if !resp.status().is_success() {
                anyhow::bail!("discord message edit: HTTP {}", resp.status());
            }
        } else {
            let url = format!(
                "https://discord.com/api/v10/channels/{}/messages",
                self.channel_id
            );
            let resp = self
                .client
                .post(&url)
                .header("Authorization", self.auth())
                .json(&body)
                .send()
                .await
                .context("discord message post failed")?;
            if !resp.status().is_success() {
                anyhow::bail!("discord message post: HTTP {}", resp.status());
            }
            let created: serde_json::Value = resp
                .json()
                .await
                .context("discord response decode failed")?;
            let message_id = created
                .get("id")
                .and_then(|v| v.as_str())
                .context("discord response missing message id")?;
            self.messages
                .insert(update.match_id.to_string(), message_id.to_string());
            info!("Posted scoreboard message for {}", update.match_id);
        }
        Ok(())
    }

    fn forget(&mut self, match_id: &str) {
        self.messages.remove(match_id);
    }
}
