//! Map reconciliation: merge one live snapshot into a match's map history.
//!
//! The merge has to survive three kinds of feed noise without ever letting
//! the recorded history move backward:
//! - stale re-emits of an earlier map after a later one already progressed
//! - maps that end "silently" (aggregate score moves, rounds reset to 0-0)
//! - placeholder map names that only later resolve to the real map

use std::collections::BTreeMap;
use tracing::{info, warn};

use crate::rounds::{finalize_round_totals, safe_total};
use crate::state::{MapRecord, MatchSnapshot, ScoreboardState};

/// Placeholder names the source emits before a map is announced.
const TBD_NAMES: [&str; 2] = ["tbd", "unknown"];

pub fn is_tbd(name: &str) -> bool {
    let n = name.trim().to_lowercase();
    n.is_empty() || TBD_NAMES.contains(&n.as_str())
}

/// Only affects the rendered header; the merge itself is identical.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatchStatus {
    Live,
    Final,
}

/// Merge `snap` into the match's history and render the scoreboard text.
/// Returns `None` when the snapshot must be discarded (map rewind); a
/// discarded snapshot mutates nothing.
pub fn reconcile_snapshot(
    state: &mut ScoreboardState,
    id: &str,
    snap: &MatchSnapshot,
    status: MatchStatus,
) -> Option<String> {
    // The "Unknown" sentinel means the first map.
    let requested = snap.map_number.unwrap_or(1);
    let round1 = safe_total(&snap.team1_round_t, &snap.team1_round_ct);
    let round2 = safe_total(&snap.team2_round_t, &snap.team2_round_ct);

    // Rewind guard: the source sometimes re-emits a stale earlier-map
    // snapshot after later maps already have progress. Checked read-only,
    // before anything touches the entry.
    if let Some(entry) = state.entry(id) {
        if let (Some(&max_map), Some(rec)) = (entry.maps.keys().max(), entry.maps.get(&requested)) {
            if requested < max_map && (rec.rounds1 > 0 || rec.rounds2 > 0) {
                warn!(
                    "Map rewind for {id}: map {requested} already has {}-{}, dropping snapshot",
                    rec.rounds1, rec.rounds2
                );
                return None;
            }
        }
    }

    let prev_won = state.entry(id).map(|e| e.maps_won);
    let entry = state.upsert(id, snap);

    // A map ended without us ever seeing its final rounds: the aggregate
    // score moved while the new map sits at 0-0. Settle the latest recorded
    // slot before anything else touches it.
    if let Some(prev) = prev_won {
        if (snap.score1, snap.score2) != prev && round1 == 0 && round2 == 0 {
            if let Some(rec) = entry.maps.values_mut().next_back() {
                let settled = finalize_round_totals(rec.rounds1, rec.rounds2);
                if settled != (rec.rounds1, rec.rounds2) {
                    info!(
                        "Silent map end for {id}: {} settled {}-{} -> {}-{}",
                        rec.name, rec.rounds1, rec.rounds2, settled.0, settled.1
                    );
                }
                (rec.rounds1, rec.rounds2) = settled;
            }
        }
    }

    let slot = resolve_map_slot(&mut entry.maps, &snap.current_map, requested);

    // Monotonic merge: true round counts never decrease while a map is
    // ongoing, so a lower figure is transient under-reporting.
    match entry.maps.get_mut(&slot) {
        Some(rec) => {
            rec.rounds1 = rec.rounds1.max(round1);
            rec.rounds2 = rec.rounds2.max(round2);
        }
        None => {
            entry.maps.insert(
                slot,
                MapRecord {
                    name: snap.current_map.clone(),
                    rounds1: round1,
                    rounds2: round2,
                },
            );
        }
    }

    entry.maps_won = (snap.score1, snap.score2);

    Some(render_description(
        &entry.team1,
        &entry.team2,
        entry.maps_won,
        &entry.maps,
        status,
    ))
}

/// Decide which map slot a snapshot belongs to, in priority order: exact
/// name match, TBD → real-name upgrade (renamed in place), first free slot
/// at or above the requested number.
pub fn resolve_map_slot(maps: &mut BTreeMap<u32, MapRecord>, incoming: &str, requested: u32) -> u32 {
    for (&slot, rec) in maps.iter_mut() {
        if rec.name == incoming {
            return slot;
        }
        if is_tbd(&rec.name) && !is_tbd(incoming) {
            info!("Map name resolved on slot {slot}: {:?} -> {incoming:?}", rec.name);
            rec.name = incoming.to_string();
            return slot;
        }
    }
    let mut slot = requested;
    while maps.contains_key(&slot) {
        slot += 1;
    }
    slot
}

/// Multi-line scoreboard text: header, aggregate line, then one block per
/// recorded map in chronological order.
pub fn render_description(
    team1: &str,
    team2: &str,
    (score1, score2): (u32, u32),
    maps: &BTreeMap<u32, MapRecord>,
    status: MatchStatus,
) -> String {
    let header = match status {
        MatchStatus::Final => "🎮 Match Results",
        MatchStatus::Live => "🎮 Current Score (LIVE)",
    };
    let mut desc = format!("{header}\n{team1} {score1} - {score2} {team2}\n");
    for rec in maps.values() {
        desc.push_str(&format!(
            "\n🗺️ Map: {}\n{team1}: {}\n{team2}: {}",
            rec.name, rec.rounds1, rec.rounds2
        ));
    }
    desc
}
