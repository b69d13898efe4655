//! DROPFOUR Core - Game engine, policy contract and value tables
//!
//! This crate provides the pieces every other DROPFOUR crate builds on:
//! - Board geometry (6x7 grid, 69 precomputed winning lines)
//! - Game state with incremental win detection
//! - The `Policy` contract (mount / act / finalize) and board canonicalization
//! - Value tables with crash-safe JSON persistence
//! - A small catalogue of built-in agents

pub mod agents;
pub mod board;
pub mod error;
pub mod game;
pub mod policy;
pub mod value_table;

// Re-exports for convenient access
pub use board::{Board, Player, CELLS, COLS, CONNECT, EMPTY, LINES, ROWS};
pub use error::{ConfigError, GameError, MoveRejection, TableError};
pub use game::{GameResult, GameState};
pub use policy::{
    action_key, canonicalize, unit_probability, Column, EpisodeMemory, Outcome, Perspective, Policy,
};
pub use value_table::ValueTable;
