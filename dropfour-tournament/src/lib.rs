//! DROPFOUR Tournament - Match play and single-elimination brackets
//!
//! This crate provides tournament infrastructure:
//! - Single games between two policies, with transcripts
//! - Best-of-N matches with randomized side assignment
//! - Pure bracket pairing with BYE handling
//! - Bracket tournaments with tie-breaks
//!
//! ## Architecture (4-layer granularity)
//!
//! - Level 1: run_bracket (orchestration)
//! - Level 2: play_match, play_round (phases)
//! - Level 3: play_game, initial_pairing, advance_round (steps)
//! - Level 4: utilities, configuration

pub mod bracket;
mod config;
mod error;
mod game_runner;
mod match_play;
mod tournament;

pub use bracket::{
    advance_round, initial_pairing, next_power_of_two, pad_to_power_of_two, pair_slots,
    rounds_needed, Advance, Pairing, Slot,
};
pub use config::{BracketConfig, MatchConfig, DRAW_SLACK};
pub use error::{BracketError, MatchError, TournamentError};
pub use game_runner::{Contestant, GameRecord, GameRunner};
pub use match_play::{play_match, play_single_game, MatchResult, MatchSide};
pub use tournament::{
    run_bracket, run_bracket_until, BracketMatch, BracketResult, Competitor, Decision,
    RoundSummary,
};
