//! Finalization: infer a terminal record for a match that left the live feed.
//!
//! The feed never says "this map just ended" — the match simply stops being
//! reported. The last recorded slot is settled to a rules-valid score and
//! the inferred map winner gets the aggregate bump; the terminal mark is the
//! caller's to set once the final update has been delivered.

use tracing::{info, warn};

use crate::reconcile::{render_description, MatchStatus};
use crate::rounds::finalize_round_totals;
use crate::state::{MapRecord, ScoreboardState};

/// Outcome of finalizing one vanished match, ready for the sink and the
/// archival log.
#[derive(Debug, Clone)]
pub struct FinalizedMatch {
    pub team1: String,
    pub team2: String,
    pub event_label: String,
    pub maps_won: (u32, u32),
    pub maps: Vec<(u32, MapRecord)>,
    pub description: String,
}

/// Settle a match absent from the current poll. The round arithmetic runs
/// exactly once per disappearance (`entry.settled` guards it), so repeated
/// calls re-render the same terminal record — that is what lets the caller
/// retry a failed final delivery without double-counting the map winner.
/// The caller marks the match finalized once the final update actually went
/// out; after that this returns `None` until the match is reopened.
pub fn finalize_match(state: &mut ScoreboardState, id: &str) -> Option<FinalizedMatch> {
    if state.is_finalized(id) {
        return None;
    }
    let entry = state.entry_mut(id)?;

    if !entry.settled {
        let Some((&last_slot, rec)) = entry.maps.iter_mut().next_back() else {
            warn!("Finalize requested for {id} with no recorded maps");
            return None;
        };

        let (r1, r2) = finalize_round_totals(rec.rounds1, rec.rounds2);
        rec.rounds1 = r1;
        rec.rounds2 = r2;

        // The feed never confirms the map winner; the larger settled total is
        // the only signal we get.
        if r1 > r2 {
            entry.maps_won.0 += 1;
        } else if r2 > r1 {
            entry.maps_won.1 += 1;
        }
        entry.settled = true;

        info!(
            "Match ended: {id} — map {last_slot} settled at {r1}-{r2}, series {}-{}",
            entry.maps_won.0, entry.maps_won.1
        );
    }

    let description = render_description(
        &entry.team1,
        &entry.team2,
        entry.maps_won,
        &entry.maps,
        MatchStatus::Final,
    );
    let out = FinalizedMatch {
        team1: entry.team1.clone(),
        team2: entry.team2.clone(),
        event_label: entry.event_label.clone(),
        maps_won: entry.maps_won,
        maps: entry
            .maps
            .iter()
            .map(|(&n, rec)| (n, rec.clone()))
            .collect(),
        description,
    };

    Some(out)
}
