//! DROPFOUR MCTS - Monte Carlo Tree Search agent
//!
//! This crate provides the reference tree-search policy:
//! - Tree policy (UCB1 over mean reward, unvisited children first)
//! - Bounded random rollouts scored by a direct line check
//! - Backpropagation of rewards relative to the root player
//! - Final move by most visits

pub mod rollout;
pub mod search;
pub mod tree;

use std::time::Duration;

use dropfour_core::agents::simple::fallback_column;
use dropfour_core::{canonicalize, Board, Column, GameState, Outcome, Perspective, Player, Policy};
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};
use tracing::trace;

pub use rollout::{random_rollout, RolloutResult};
pub use search::{run_search, MoveStatistics, SearchResult};
pub use tree::{MctsNode, MctsTree, NodeId, NodeStats};

/// MCTS configuration
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MctsConfig {
    /// Iterations per move when no time budget is given
    pub simulations: u32,
    /// UCB1 exploration constant
    pub exploration: f64,
    /// Random plies per rollout
    pub max_rollout_depth: u32,
    /// Iterations granted per second of advisory budget
    pub simulations_per_second: u32,
    pub min_simulations: u32,
    pub max_simulations: u32,
    pub perspective: Perspective,
}

impl Default for MctsConfig {
    fn default() -> Self {
        Self {
            simulations: 400,
            exploration: std::f64::consts::SQRT_2,
            max_rollout_depth: 12,
            simulations_per_second: 2000,
            min_simulations: 50,
            max_simulations: 4000,
            perspective: Perspective::PieceCount,
        }
    }
}

impl MctsConfig {
    pub fn with_simulations(mut self, simulations: u32) -> Self {
        self.simulations = simulations;
        self
    }

    pub fn with_exploration(mut self, exploration: f64) -> Self {
        self.exploration = exploration;
        self
    }

    pub fn with_rollout_depth(mut self, depth: u32) -> Self {
        self.max_rollout_depth = depth;
        self
    }

    /// Iteration count for an advisory time budget: linear in the budget,
    /// clamped to `[min_simulations, max_simulations]`
    pub fn simulations_for(&self, budget: Option<Duration>) -> u32 {
        match budget {
            None => self.simulations,
            Some(budget) => {
                let scaled = budget.as_secs_f64() * self.simulations_per_second as f64;
                let floor = self.min_simulations.min(self.max_simulations);
                (scaled as u32).clamp(floor, self.max_simulations)
            }
        }
    }
}

/// Tree-search agent. Stateless between moves apart from the iteration
/// count derived at mount time.
pub struct MctsPolicy {
    config: MctsConfig,
    simulations: u32,
    seat: Option<Player>,
    rng: ChaCha8Rng,
}

impl MctsPolicy {
    pub fn new(config: MctsConfig, seed: u64) -> Self {
        let simulations = config.simulations;
        Self { config, simulations, seat: None, rng: ChaCha8Rng::seed_from_u64(seed) }
    }

    pub fn config(&self) -> &MctsConfig {
        &self.config
    }

    /// Iterations each `act` call will run
    pub fn simulations(&self) -> u32 {
        self.simulations
    }

    /// Full search from `board`, for analysis tools
    pub fn search(&mut self, board: &Board) -> Option<SearchResult> {
        let canon = canonicalize(board, self.config.perspective, self.seat);
        let root = GameState::from_board(canon, Player::Plus).ok()?;
        Some(run_search(MctsTree::new(root), &self.config, self.simulations, &mut self.rng))
    }
}

impl Policy for MctsPolicy {
    fn mount(&mut self, time_budget: Option<Duration>) {
        self.simulations = self.config.simulations_for(time_budget);
    }

    fn act(&mut self, board: &Board) -> Column {
        let choice = self.search(board).and_then(|result| {
            trace!(
                simulations = result.total_simulations,
                nodes = result.tree.len(),
                "mcts search finished"
            );
            result.best_move()
        });

        // Legality is re-derived from the caller's snapshot
        match choice {
            Some(col) if board.is_column_open(col) => col,
            _ => fallback_column(board),
        }
    }

    fn finalize(&mut self, _outcome: Outcome) {}

    fn seat(&mut self, side: Player) {
        self.seat = Some(side);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_simulations_for_budget() {
        let config = MctsConfig::default();
        assert_eq!(config.simulations_for(None), 400);
        assert_eq!(config.simulations_for(Some(Duration::from_millis(100))), 200);
        assert_eq!(config.simulations_for(Some(Duration::from_millis(1))), 50);
        assert_eq!(config.simulations_for(Some(Duration::from_secs(60))), 4000);
    }

    #[test]
    fn test_mount_sets_simulation_count() {
        let mut policy = MctsPolicy::new(MctsConfig::default(), 0);
        policy.mount(Some(Duration::from_millis(500)));
        assert_eq!(policy.simulations(), 1000);
        policy.mount(None);
        assert_eq!(policy.simulations(), 400);
    }

    #[test]
    fn test_act_without_mount_is_legal() {
        let mut policy = MctsPolicy::new(MctsConfig::default().with_simulations(30), 1);
        let col = policy.act(&Board::new());
        assert!(col < dropfour_core::COLS);
    }

    #[test]
    fn test_blocks_as_minus() {
        // Plus threatens (5,3) along the bottom row; Minus must answer there
        let mut state = GameState::new_empty();
        for c in [0, 6, 1, 6, 2] {
            state.apply_in_place(c).unwrap();
        }
        let snapshot = *state.board();
        let mut policy = MctsPolicy::new(MctsConfig::default().with_simulations(800), 3);
        assert_eq!(policy.act(&snapshot), 3);
        assert_eq!(&snapshot, state.board());
    }

    #[test]
    fn test_returns_only_open_column() {
        // Only column 3 has room
        let moves = [
            4, 1, 6, 2, 1, 0, 1, 4, 4, 2, 4, 1, 3, 6, 3, 3, 1, 0, 4, 6, 6, 1, 2, 3, 2, 3, 2, 2,
            6, 5, 5, 0, 5, 4, 6, 5, 5, 5, 0, 0, 0,
        ];
        let mut state = GameState::new_empty();
        for c in moves {
            state.apply_in_place(c).unwrap();
        }
        let mut policy = MctsPolicy::new(MctsConfig::default().with_simulations(20), 2);
        assert_eq!(policy.act(state.board()), 3);
    }
}
