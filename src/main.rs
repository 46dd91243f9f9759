//! VCT Live Scoreboard — Discord bot
//!
//! What it does:
//!   1. Polls vlrggapi live scores every 60s and reconciles each tracked
//!      match into a per-map history (round totals never regress, TBD map
//!      names upgrade in place, stale map rewinds are dropped)
//!   2. Mirrors every match into one Discord message, edited in place
//!   3. Infers the final map score when a match disappears from the feed
//!      and posts one last "Match Results" edit
//!   4. Pauses the fast cycle when nothing is live or imminent; archives
//!      and purges finalized matches once a day
//!
//! Run:
//!   DISCORD_TOKEN=... DISCORD_CHANNEL_ID=... cargo run --bin scoreboard-bot

use anyhow::{Context, Result};
use dotenv::dotenv;
use event_log::{
    now_iso, CadenceEvent, CycleErrorEvent, EventLogger, HealthSkipEvent, MapLine,
    MatchFinalizedEvent,
};
use notify::{DiscordNotifier, MatchUpdate, Notify};
use scoreboard_core::finalize::finalize_match;
use scoreboard_core::gate::{feed_is_healthy, next_match_is_distant, CycleFlags};
use scoreboard_core::reconcile::{reconcile_snapshot, MatchStatus};
use scoreboard_core::state::{MatchSnapshot, ScoreboardState};
use std::env;
use std::fs::File;
use tokio::time::{sleep, Duration};
use tracing::{error, info, warn};
use tracing_subscriber::{fmt, EnvFilter};
use vlr_client::{
    FetchError, LiveSegment, VlrClient, DEFAULT_API_BASE, HEALTH_AGGREGATOR_KEY, HEALTH_ORIGIN_KEY,
};

/// Upcoming-matches check cadence, in live-cycle ticks (10 × 60s).
const UPCOMING_EVERY_CYCLES: u64 = 10;
/// Archive-and-purge cadence, in live-cycle ticks (24h at 60s).
const CLEANUP_EVERY_CYCLES: u64 = 1440;

struct ScoreboardBot<N: Notify> {
    api: VlrClient,
    state: ScoreboardState,
    flags: CycleFlags,
    sink: N,
    events: EventLogger,
    event_tag: String,
}

impl<N: Notify> ScoreboardBot<N> {
    fn new(api: VlrClient, sink: N, events: EventLogger, event_tag: String) -> Self {
        Self {
            api,
            state: ScoreboardState::new(),
            flags: CycleFlags::default(),
            sink,
            events,
            event_tag,
        }
    }

    /// One fast reconciliation pass: health gate, live snapshots, then
    /// finalization of matches that left the feed.
    async fn live_cycle(&mut self) -> Result<()> {
        match self.api.health().await {
            Ok(statuses) => {
                let aggregator = statuses.get(HEALTH_AGGREGATOR_KEY).map(|u| u.status.as_str());
                let origin = statuses.get(HEALTH_ORIGIN_KEY).map(|u| u.status.as_str());
                if !feed_is_healthy(aggregator, origin) {
                    info!("Feed unhealthy (aggregator={aggregator:?}, origin={origin:?}) — skipping cycle");
                    let _ = self.events.log(&HealthSkipEvent {
                        ts: now_iso(),
                        event: "HEALTH_SKIP",
                        aggregator: aggregator.unwrap_or("missing").to_string(),
                        origin: origin.unwrap_or("missing").to_string(),
                    });
                    return Ok(());
                }
            }
            Err(e) => {
                info!("Health check failed ({e}) — skipping cycle");
                return Ok(());
            }
        }

        let segments = match self.api.live().await {
            Ok(segments) => segments,
            Err(e) => return Err(self.record_fetch_error("live", e)),
        };

        let tracked: Vec<&LiveSegment> = segments
            .iter()
            .filter(|s| s.match_event.contains(&self.event_tag))
            .collect();

        self.state.begin_cycle();

        for seg in tracked {
            self.state.mark_seen(&seg.match_page);
            if let Err(e) = self.process_live_segment(seg).await {
                // One bad match must not block the rest of the cycle.
                warn!("Match update failed for {}: {e:#}", seg.match_page);
                let payload_file = serde_json::to_string_pretty(seg)
                    .ok()
                    .and_then(|raw| self.events.dump_payload(&seg.match_page, &raw).ok());
                let _ = self.events.log(&CycleErrorEvent {
                    ts: now_iso(),
                    event: "CYCLE_ERROR",
                    task: "live".to_string(),
                    match_id: Some(seg.match_page.clone()),
                    error: format!("{e:#}"),
                    payload_file: payload_file.map(|p| p.display().to_string()),
                });
            }
        }

        self.flags.apply_active(self.state.active_count());
        self.finalize_ended().await;
        Ok(())
    }

    async fn process_live_segment(&mut self, seg: &LiveSegment) -> Result<()> {
        let snap = snapshot_from_segment(seg)?;
        let match_id = seg.match_page.as_str();

        let Some(description) =
            reconcile_snapshot(&mut self.state, match_id, &snap, MatchStatus::Live)
        else {
            info!("Dropped stale snapshot for {match_id}");
            return Ok(());
        };

        let title = format!("{} vs {}", snap.team1, snap.team2);
        self.sink
            .publish(MatchUpdate {
                match_id,
                title: &title,
                description: &description,
                url: match_id,
                event_label: &snap.event_label,
            })
            .await?;

        // The source un-ended a match we had already settled.
        if self.state.reopen(match_id) {
            info!("Match {match_id} is live again — finalization undone");
        }
        Ok(())
    }

    /// Matches tracked last poll but missing from this one get a terminal
    /// record, a last message edit, and an archival event. The terminal mark
    /// waits for the edit to go out; a sink failure leaves the match eligible
    /// for another attempt next cycle.
    async fn finalize_ended(&mut self) {
        for match_id in self.state.ended_matches() {
            let Some(done) = finalize_match(&mut self.state, &match_id) else {
                continue;
            };

            let title = format!("{} vs {}", done.team1, done.team2);
            let update = MatchUpdate {
                match_id: &match_id,
                title: &title,
                description: &done.description,
                url: &match_id,
                event_label: &done.event_label,
            };
            if let Err(e) = self.sink.publish(update).await {
                warn!("Final update failed for {match_id}: {e:#} — retrying next cycle");
                continue;
            }
            self.state.set_finalized(&match_id);

            let _ = self.events.log(&MatchFinalizedEvent {
                ts: now_iso(),
                event: "MATCH_FINALIZED",
                match_id: match_id.clone(),
                team1: done.team1.clone(),
                team2: done.team2.clone(),
                maps_won1: done.maps_won.0,
                maps_won2: done.maps_won.1,
                maps: map_lines(&done.maps),
            });
        }
    }

    /// Slow cadence check: when no match is live and the next one is more
    /// than 15 minutes out, suspend the fast cycle until that changes.
    async fn upcoming_cycle(&mut self) -> Result<()> {
        if !self.flags.pause_allowed {
            return Ok(());
        }

        let segments = match self.api.upcoming().await {
            Ok(segments) => segments,
            Err(e) => return Err(self.record_fetch_error("upcoming", e)),
        };

        let next = segments
            .iter()
            .find(|s| s.match_event.contains(&self.event_tag));
        let time_until = next.map(|s| s.time_until_match.as_str()).unwrap_or("");
        // An empty schedule counts as distant: nothing to hurry for.
        let distant = next.is_none() || next_match_is_distant(time_until);

        let allowed = self
            .flags
            .apply_upcoming(distant, self.state.active_count());
        if allowed {
            info!("Match imminent or live (next in {time_until:?}) — updates active");
        } else {
            info!("No match live or imminent (next in {time_until:?}) — pausing updates");
        }
        let _ = self.events.log(&CadenceEvent {
            ts: now_iso(),
            event: "CADENCE",
            updates_allowed: allowed,
            active_matches: self.state.active_count(),
            next_match_in: time_until.to_string(),
        });
        Ok(())
    }

    /// Daily: write finalized matches to the durable log, then drop their
    /// in-memory state and message bookkeeping.
    async fn cleanup_cycle(&mut self) {
        for (match_id, entry) in self.state.purge_finalized() {
            let _ = self.events.log(&MatchFinalizedEvent {
                ts: now_iso(),
                event: "MATCH_ARCHIVED",
                match_id: match_id.clone(),
                team1: entry.team1.clone(),
                team2: entry.team2.clone(),
                maps_won1: entry.maps_won.0,
                maps_won2: entry.maps_won.1,
                maps: entry
                    .maps
                    .iter()
                    .map(|(&n, rec)| MapLine {
                        map_number: n,
                        map_name: rec.name.clone(),
                        rounds1: rec.rounds1,
                        rounds2: rec.rounds2,
                    })
                    .collect(),
            });
            self.sink.forget(&match_id);
            info!("Archived and purged {match_id}");
        }
    }

    /// Fetch failures abort the cycle; decode failures also dump the raw
    /// payload so the offending response survives for inspection.
    fn record_fetch_error(&self, task: &'static str, err: FetchError) -> anyhow::Error {
        let payload_file = if let FetchError::Decode { raw, .. } = &err {
            self.events.dump_payload(task, raw).ok()
        } else {
            None
        };
        let _ = self.events.log(&CycleErrorEvent {
            ts: now_iso(),
            event: "CYCLE_ERROR",
            task: task.to_string(),
            match_id: None,
            error: err.to_string(),
            payload_file: payload_file.map(|p| p.display().to_string()),
        });
        anyhow::Error::new(err).context(format!("{task} fetch failed"))
    }
}

fn map_lines(maps: &[(u32, scoreboard_core::MapRecord)]) -> Vec<MapLine> {
    maps.iter()
        .map(|(n, rec)| MapLine {
            map_number: *n,
            map_name: rec.name.clone(),
            rounds1: rec.rounds1,
            rounds2: rec.rounds2,
        })
        .collect()
}

/// Shape-check one live segment into a typed snapshot. Aggregate scores and
/// a numeric map number must parse; round figures stay raw for the
/// normalizer to handle.
fn snapshot_from_segment(seg: &LiveSegment) -> Result<MatchSnapshot> {
    let score1 = seg
        .score1
        .trim()
        .parse()
        .with_context(|| format!("bad score1 {:?}", seg.score1))?;
    let score2 = seg
        .score2
        .trim()
        .parse()
        .with_context(|| format!("bad score2 {:?}", seg.score2))?;

    let raw_number = seg.map_number.trim();
    let map_number = if raw_number.is_empty() || raw_number.eq_ignore_ascii_case("unknown") {
        None
    } else {
        Some(
            raw_number
                .parse()
                .with_context(|| format!("bad map_number {:?}", seg.map_number))?,
        )
    };

    Ok(MatchSnapshot {
        team1: seg.team1.clone(),
        team2: seg.team2.clone(),
        score1,
        score2,
        map_number,
        current_map: seg.current_map.clone(),
        team1_round_t: seg.team1_round_t.clone(),
        team1_round_ct: seg.team1_round_ct.clone(),
        team2_round_t: seg.team2_round_t.clone(),
        team2_round_ct: seg.team2_round_ct.clone(),
        event_label: format!("{} — {}", seg.match_event, seg.match_series),
    })
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenv().ok();

    fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    info!("=== VCT Live Scoreboard — starting ===");

    // Single instance lock
    let lock_file_path = env::temp_dir().join("vct_scoreboard.lock");
    let lock_file = match File::create(&lock_file_path) {
        Ok(f) => f,
        Err(e) => {
            warn!("Failed to create lock file at {:?}: {}", lock_file_path, e);
            return Ok(());
        }
    };
    let mut lock = fd_lock::RwLock::new(lock_file);
    let _write_guard = match lock.try_write() {
        Ok(guard) => {
            info!("Acquired single-instance lock.");
            guard
        }
        Err(_) => {
            warn!("Another instance of scoreboard-bot is already running! Exiting.");
            return Ok(());
        }
    };

    let token = env::var("DISCORD_TOKEN").context("DISCORD_TOKEN not set")?;
    let channel_id: u64 = env::var("DISCORD_CHANNEL_ID")
        .context("DISCORD_CHANNEL_ID not set")?
        .parse()
        .context("DISCORD_CHANNEL_ID must be numeric")?;
    let api_base = env::var("VLR_API_BASE").unwrap_or_else(|_| DEFAULT_API_BASE.to_string());
    let event_tag = env::var("EVENT_TAG").unwrap_or_else(|_| "VCT".to_string());
    let poll_interval_secs = env::var("POLL_INTERVAL_SECS")
        .ok()
        .and_then(|v| v.parse::<u64>().ok())
        .unwrap_or(60);

    info!("Tracking events matching {event_tag:?}, polling every {poll_interval_secs}s");
    info!("Logs: ./logs/");

    let mut bot = ScoreboardBot::new(
        VlrClient::new(api_base),
        DiscordNotifier::new(token, channel_id),
        EventLogger::new("logs"),
        event_tag,
    );

    let mut cycle: u64 = 0;
    loop {
        if cycle % UPCOMING_EVERY_CYCLES == 0 {
            if let Err(e) = bot.upcoming_cycle().await {
                error!("Upcoming check failed: {e:#}");
            }
        }

        if bot.flags.updates_allowed {
            if let Err(e) = bot.live_cycle().await {
                error!("Live cycle failed: {e:#}");
            }
        } else {
            info!("Updates paused — no match live or imminent");
        }

        if cycle % CLEANUP_EVERY_CYCLES == CLEANUP_EVERY_CYCLES - 1 {
            bot.cleanup_cycle().await;
        }

        cycle += 1;
        sleep(Duration::from_secs(poll_interval_secs)).await;
    }
}
