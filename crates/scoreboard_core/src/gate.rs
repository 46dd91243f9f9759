//! Availability / cadence gate.
//!
//! Two independent decisions, both taken at the top of a scheduled cycle:
//! - health: both upstreams (the score aggregator and the site it scrapes)
//!   must report healthy, otherwise the whole cycle is skipped untouched
//! - cadence: when the next scheduled match is far away and nothing is
//!   live, the fast reconciliation cycle is suspended

use regex::Regex;
use std::sync::OnceLock;

/// Next match further away than this (and nothing live) ⇒ pause updates.
pub const IMMINENT_WINDOW_SECS: u64 = 900;

fn duration_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(\d+)\s*([dhms])").unwrap())
}

/// Parse the feed's compact countdown ("1d 2h 3m 4s") into total seconds.
/// Unknown units and surrounding text are ignored; garbage parses to 0.
pub fn parse_duration_secs(raw: &str) -> u64 {
    let mut total = 0u64;
    for cap in duration_re().captures_iter(raw) {
        let value: u64 = cap[1].parse().unwrap_or(0);
        total += match &cap[2] {
            "d" => value * 86_400,
            "h" => value * 3_600,
            "m" => value * 60,
            _ => value,
        };
    }
    total
}

/// True when the next scheduled match is too far away to keep polling for.
pub fn next_match_is_distant(time_until: &str) -> bool {
    parse_duration_secs(time_until) > IMMINENT_WINDOW_SECS
}

/// Both upstream statuses must literally report "Healthy" before a cycle is
/// allowed to touch state. A missing upstream counts as unhealthy.
pub fn feed_is_healthy(aggregator: Option<&str>, origin: Option<&str>) -> bool {
    matches!((aggregator, origin), (Some("Healthy"), Some("Healthy")))
}

/// Cooperative pause flags shared by the scheduled cycles. Mutated only
/// here, read at the top of each cycle — deterministic to test by direct
/// manipulation.
#[derive(Debug, Clone, Copy)]
pub struct CycleFlags {
    /// Cleared when no match is live or imminent; gates the fast cycle.
    pub updates_allowed: bool,
    /// Set when zero matches are live; gates the upcoming-matches check.
    pub pause_allowed: bool,
}

impl Default for CycleFlags {
    fn default() -> Self {
        Self {
            updates_allowed: true,
            pause_allowed: true,
        }
    }
}

impl CycleFlags {
    /// Outcome of one upcoming-matches check. Returns the new gate value.
    pub fn apply_upcoming(&mut self, next_is_distant: bool, active_matches: usize) -> bool {
        self.updates_allowed = !(next_is_distant && active_matches == 0);
        self.updates_allowed
    }

    /// The live cycle reports how many tracked matches it saw.
    pub fn apply_active(&mut self, active_matches: usize) {
        self.pause_allowed = active_matches == 0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_full_duration_strings() {
        assert_eq!(parse_duration_secs("1d 2h 3m 4s"), 93_784);
        assert_eq!(parse_duration_secs("45m"), 2_700);
        assert_eq!(parse_duration_secs("12s"), 12);
        assert_eq!(parse_duration_secs("2h"), 7_200);
    }

    #[test]
    fn garbage_parses_to_zero() {
        assert_eq!(parse_duration_secs("LIVE"), 0);
        assert_eq!(parse_duration_secs(""), 0);
    }

    #[test]
    fn imminence_threshold_is_900_seconds() {
        assert!(!next_match_is_distant("15m"));
        assert!(next_match_is_distant("16m"));
        assert!(next_match_is_distant("1d"));
        assert!(!next_match_is_distant("LIVE"));
    }

    #[test]
    fn health_requires_both_upstreams() {
        assert!(feed_is_healthy(Some("Healthy"), Some("Healthy")));
        assert!(!feed_is_healthy(Some("Healthy"), Some("Degraded")));
        assert!(!feed_is_healthy(Some("Down"), Some("Healthy")));
        assert!(!feed_is_healthy(None, Some("Healthy")));
        assert!(!feed_is_healthy(Some("Healthy"), None));
    }

    #[test]
    fn updates_pause_only_when_distant_and_idle() {
        let mut flags = CycleFlags::default();
        assert!(!flags.apply_upcoming(true, 0));
        assert!(!flags.updates_allowed);
        assert!(flags.apply_upcoming(true, 1));
        assert!(flags.apply_upcoming(false, 0));
    }

    #[test]
    fn pause_flag_follows_active_matches() {
        let mut flags = CycleFlags::default();
        flags.apply_active(2);
        assert!(!flags.pause_allowed);
        flags.apply_active(0);
        assert!(flags.pause_allowed);
    }
}
