//! Round-score normalizer.
//!
//! The feed reports each team's rounds split by side (attack/defense) and
//! any of the four figures can be missing or non-numeric.

use tracing::warn;

/// A map is won at 13 rounds...
pub const ROUNDS_TO_WIN: u32 = 13;
/// ...with at least a two-round margin.
pub const WIN_MARGIN: u32 = 2;

fn safe_int(raw: &str, label: &str) -> u32 {
    match raw.trim().parse::<u32>() {
        Ok(v) => v,
        Err(_) => {
            warn!("Invalid round figure for {label}: {raw:?} — counting as 0");
            0
        }
    }
}

/// Sum of one team's attack-side and defense-side rounds. Malformed figures
/// count as 0; this never fails.
pub fn safe_total(t_raw: &str, ct_raw: &str) -> u32 {
    safe_int(t_raw, "T-side") + safe_int(ct_raw, "CT-side")
}

/// Extrapolate the smallest rules-valid finished score from the last totals
/// we saw. The feed never confirms a map's final tally, so when a map is
/// superseded or the match vanishes we walk the trailing side up until the
/// leader has 13+ rounds and a 2+ margin. `(0, 0)` means nothing was played
/// and is returned unchanged. The leader never flips; an exact tie starts
/// bumping side 2.
pub fn finalize_round_totals(mut r1: u32, mut r2: u32) -> (u32, u32) {
    if r1 == 0 && r2 == 0 {
        return (0, 0);
    }
    while r1.max(r2) < ROUNDS_TO_WIN || r1.abs_diff(r2) < WIN_MARGIN {
        if r1 > r2 {
            r1 += 1;
        } else {
            r2 += 1;
        }
    }
    (r1, r2)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn safe_total_sums_numeric_strings() {
        assert_eq!(safe_total("7", "5"), 12);
        assert_eq!(safe_total(" 3 ", "0"), 3);
    }

    #[test]
    fn safe_total_treats_garbage_as_zero() {
        assert_eq!(safe_total("N/A", "5"), 5);
        assert_eq!(safe_total("", "x"), 0);
        assert_eq!(safe_total("-3", "4"), 4);
    }

    #[test]
    fn nothing_played_stays_zero() {
        assert_eq!(finalize_round_totals(0, 0), (0, 0));
    }

    #[test]
    fn trailing_side_walks_up_to_valid_score() {
        assert_eq!(finalize_round_totals(9, 5), (13, 5));
        assert_eq!(finalize_round_totals(5, 9), (5, 13));
        assert_eq!(finalize_round_totals(12, 11), (13, 11));
        assert_eq!(finalize_round_totals(13, 12), (14, 12));
    }

    #[test]
    fn overtime_scores_keep_the_margin() {
        // 14-13 is not done yet, 15-13 is
        assert_eq!(finalize_round_totals(14, 13), (15, 13));
        assert_eq!(finalize_round_totals(15, 13), (15, 13));
    }

    #[test]
    fn result_is_always_rules_valid_and_leader_holds() {
        for r1 in 0..20u32 {
            for r2 in 0..20u32 {
                if r1 == 0 && r2 == 0 {
                    continue;
                }
                let (f1, f2) = finalize_round_totals(r1, r2);
                assert!(f1.max(f2) >= ROUNDS_TO_WIN, "{r1}-{r2} -> {f1}-{f2}");
                assert!(f1.abs_diff(f2) >= WIN_MARGIN, "{r1}-{r2} -> {f1}-{f2}");
                if r1 > r2 {
                    assert!(f1 > f2, "leader flipped: {r1}-{r2} -> {f1}-{f2}");
                }
                if r2 > r1 {
                    assert!(f2 > f1, "leader flipped: {r1}-{r2} -> {f1}-{f2}");
                }
            }
        }
    }
}
