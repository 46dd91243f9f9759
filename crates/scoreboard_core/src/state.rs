//! In-process store for every match the bot is tracking.
//!
//! Owned by the bot loop; all mutation happens run-to-completion inside one
//! poll cycle, so no lock is needed around it.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap, HashSet};

/// One poll's view of a match, shape-checked by the caller. Round figures
/// stay raw strings — the normalizer decides what they are worth.
#[derive(Debug, Clone)]
pub struct MatchSnapshot {
    pub team1: String,
    pub team2: String,
    /// Aggregate maps won so far.
    pub score1: u32,
    pub score2: u32,
    /// `None` when the source reported "Unknown".
    pub map_number: Option<u32>,
    pub current_map: String,
    pub team1_round_t: String,
    pub team1_round_ct: String,
    pub team2_round_t: String,
    pub team2_round_ct: String,
    /// "{event} — {series}", carried through to the sink footer.
    pub event_label: String,
}

/// One recorded map slot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MapRecord {
    pub name: String,
    pub rounds1: u32,
    pub rounds2: u32,
}

/// Everything we remember about one tracked match.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MatchEntry {
    pub team1: String,
    pub team2: String,
    pub event_label: String,
    /// Map number (ascending = chronological) → record. Once set, round
    /// totals in a slot only ever grow until finalization overwrites them.
    pub maps: BTreeMap<u32, MapRecord>,
    /// Last known aggregate maps-won score (team1, team2).
    pub maps_won: (u32, u32),
    /// Terminal totals already applied; guards against double-counting the
    /// map winner when a final update has to be redelivered.
    #[serde(default)]
    pub settled: bool,
}

#[derive(Debug, Default)]
pub struct ScoreboardState {
    matches: HashMap<String, MatchEntry>,
    /// Match ids present in the current poll.
    seen: HashSet<String>,
    /// Matches already terminally processed; makes finalization idempotent.
    finalized: HashSet<String>,
}

impl ScoreboardState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start a poll cycle: forget which matches the previous poll saw.
    pub fn begin_cycle(&mut self) {
        self.seen.clear();
    }

    pub fn mark_seen(&mut self, id: &str) {
        self.seen.insert(id.to_string());
    }

    /// Matches present in the current poll.
    pub fn active_count(&self) -> usize {
        self.seen.len()
    }

    pub fn entry(&self, id: &str) -> Option<&MatchEntry> {
        self.matches.get(id)
    }

    pub(crate) fn entry_mut(&mut self, id: &str) -> Option<&mut MatchEntry> {
        self.matches.get_mut(id)
    }

    /// Create the match lazily on first sighting; refresh the display
    /// metadata afterwards. A fresh entry starts with the snapshot's own
    /// aggregate so the first poll never looks like a score transition.
    pub(crate) fn upsert(&mut self, id: &str, snap: &MatchSnapshot) -> &mut MatchEntry {
        let entry = self
            .matches
            .entry(id.to_string())
            .or_insert_with(|| MatchEntry {
                team1: snap.team1.clone(),
                team2: snap.team2.clone(),
                event_label: snap.event_label.clone(),
                maps: BTreeMap::new(),
                maps_won: (snap.score1, snap.score2),
                settled: false,
            });
        entry.team1 = snap.team1.clone();
        entry.team2 = snap.team2.clone();
        entry.event_label = snap.event_label.clone();
        entry
    }

    /// Tracked matches that the current poll did not report: candidates for
    /// finalization. Sorted for deterministic processing order.
    pub fn ended_matches(&self) -> Vec<String> {
        let mut ended: Vec<String> = self
            .matches
            .keys()
            .filter(|id| !self.seen.contains(*id))
            .cloned()
            .collect();
        ended.sort();
        ended
    }

    pub fn is_finalized(&self, id: &str) -> bool {
        self.finalized.contains(id)
    }

    /// Mark a match terminal. Called only once its final update has actually
    /// been delivered, so a sink failure leaves the match eligible for
    /// another finalization attempt next cycle.
    pub fn set_finalized(&mut self, id: &str) {
        self.finalized.insert(id.to_string());
    }

    /// A finalized match showed up live again (transient feed gap): resume
    /// normal reconciliation. Returns true if it was finalized.
    pub fn reopen(&mut self, id: &str) -> bool {
        if let Some(entry) = self.matches.get_mut(id) {
            entry.settled = false;
        }
        self.finalized.remove(id)
    }

    /// Remove finalized matches entirely, handing their entries to the
    /// caller for archival.
    pub fn purge_finalized(&mut self) -> Vec<(String, MatchEntry)> {
        let mut ids: Vec<String> = self.finalized.drain().collect();
        ids.sort();
        ids.into_iter()
            .filter_map(|id| self.matches.remove(&id).map(|entry| (id, entry)))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn snap(team1: &str, team2: &str) -> MatchSnapshot {
        MatchSnapshot {
            team1: team1.into(),
            team2: team2.into(),
            score1: 0,
            score2: 0,
            map_number: None,
            current_map: "TBD".into(),
            team1_round_t: "0".into(),
            team1_round_ct: "0".into(),
            team2_round_t: "0".into(),
            team2_round_ct: "0".into(),
            event_label: "VCT Champions — Group A".into(),
        }
    }

    #[test]
    fn ended_matches_are_tracked_minus_seen() {
        let mut state = ScoreboardState::new();
        state.upsert("m1", &snap("A", "B"));
        state.upsert("m2", &snap("C", "D"));
        state.begin_cycle();
        state.mark_seen("m1");
        assert_eq!(state.ended_matches(), vec!["m2".to_string()]);
        assert_eq!(state.active_count(), 1);
    }

    #[test]
    fn purge_removes_only_finalized_entries() {
        let mut state = ScoreboardState::new();
        state.upsert("m1", &snap("A", "B"));
        state.upsert("m2", &snap("C", "D"));
        state.set_finalized("m1");
        let archived = state.purge_finalized();
        assert_eq!(archived.len(), 1);
        assert_eq!(archived[0].0, "m1");
        assert!(state.entry("m1").is_none());
        assert!(state.entry("m2").is_some());
        assert!(!state.is_finalized("m1"));
    }

    #[test]
    fn reopen_clears_the_finalized_mark() {
        let mut state = ScoreboardState::new();
        state.upsert("m1", &snap("A", "B"));
        state.set_finalized("m1");
        assert!(state.reopen("m1"));
        assert!(!state.is_finalized("m1"));
        assert!(!state.reopen("m1"));
    }
}
