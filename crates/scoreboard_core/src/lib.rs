//! Match-state reconciliation for the live scoreboard bot.
//!
//! The live feed is noisy: map numbers come back as "Unknown" or jump
//! backward, round counts regress between polls, and a finished map's final
//! tally is never confirmed — the match simply drops out of the feed. This
//! crate turns that stream into a clean per-match, per-map history:
//! - `rounds`    — round figure parsing + finished-score extrapolation
//! - `state`     — the in-process store for all tracked matches
//! - `reconcile` — merges one snapshot into a match's map history
//! - `finalize`  — settles a match that vanished from the feed
//! - `gate`      — upstream health + polling cadence decisions
//!
//! No I/O here; the bot binary owns the network and the sink.

pub mod finalize;
pub mod gate;
pub mod reconcile;
pub mod rounds;
pub mod state;

pub use finalize::{finalize_match, FinalizedMatch};
pub use reconcile::{reconcile_snapshot, MatchStatus};
pub use state::{MapRecord, MatchEntry, MatchSnapshot, ScoreboardState};
