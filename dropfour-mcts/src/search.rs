//! MCTS Search Loop
//!
//! Implements the core MCTS algorithm:
//! 1. Selection - Use UCB1 to traverse tree
//! 2. Expansion - Add child node
//! 3. Simulation - Bounded random rollout
//! 4. Backpropagation - Update statistics
//!
//! ## Architecture
//! - Level 2: Search loop coordination
//! - Level 3: Individual MCTS phases
//! - Level 4: Utilities

use dropfour_core::Column;
use rand::Rng;

use crate::rollout::random_rollout;
use crate::tree::{MctsTree, NodeId};
use crate::MctsConfig;

// ============================================================================
// SEARCH RESULT
// ============================================================================

/// Result of MCTS search
#[derive(Debug)]
pub struct SearchResult {
    /// The final tree after search
    pub tree: MctsTree,
    /// Total simulations performed
    pub total_simulations: u32,
    /// Statistics for each root move
    pub move_stats: Vec<MoveStatistics>,
}

/// Statistics for a single move at root
#[derive(Clone, Debug)]
pub struct MoveStatistics {
    pub column: Column,
    pub visits: u32,
    pub mean_reward: f64,
}

impl SearchResult {
    /// Most visited root move
    pub fn best_move(&self) -> Option<Column> {
        self.tree.best_move()
    }

    /// Root moves sorted by visits, most visited first
    pub fn moves_by_visits(&self) -> Vec<(Column, u32)> {
        let mut moves: Vec<_> = self.move_stats.iter().map(|s| (s.column, s.visits)).collect();
        moves.sort_by(|a, b| b.1.cmp(&a.1).then(a.0.cmp(&b.0)));
        moves
    }
}

// ============================================================================
// SEARCH LOOP (Level 2 - Main Coordination)
// ============================================================================

/// Run `simulations` MCTS iterations on `tree`
///
/// Level 2 function - coordinates the search phases.
pub fn run_search<R: Rng>(
    mut tree: MctsTree,
    config: &MctsConfig,
    simulations: u32,
    rng: &mut R,
) -> SearchResult {
    for _ in 0..simulations {
        run_single_iteration(&mut tree, config, rng);
    }

    let total_simulations = tree.total_simulations();
    let move_stats = collect_move_statistics(&tree);

    SearchResult { tree, total_simulations, move_stats }
}

// ============================================================================
// SINGLE ITERATION (Level 3 - MCTS Phases)
// ============================================================================

/// Single MCTS iteration
///
/// Level 3 function - implements one complete MCTS cycle.
fn run_single_iteration<R: Rng>(tree: &mut MctsTree, config: &MctsConfig, rng: &mut R) {
    // Phase 1: Selection
    let path = tree.select_leaf(config.exploration);
    let leaf_id = path.last().copied().unwrap_or(NodeId::ROOT);

    // Phase 2: Expansion (if not terminal)
    let node = tree.get(leaf_id);
    let simulation_node = if !node.is_terminal() && !node.is_fully_expanded() {
        tree.expand(leaf_id).unwrap_or(leaf_id)
    } else {
        leaf_id
    };

    // Phase 3: Simulation
    let result = random_rollout(&tree.get(simulation_node).state, config.max_rollout_depth, rng);
    let reward = result.reward_for(tree.root_player());

    // Phase 4: Backpropagation
    tree.backpropagate(simulation_node, reward);
}

// ============================================================================
// STATISTICS COLLECTION (Level 4 - Utilities)
// ============================================================================

fn collect_move_statistics(tree: &MctsTree) -> Vec<MoveStatistics> {
    tree.move_statistics()
        .into_iter()
        .map(|(column, visits, mean_reward)| MoveStatistics { column, visits, mean_reward })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use dropfour_core::GameState;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    fn play(moves: &[usize]) -> GameState {
        let mut state = GameState::new_empty();
        for &c in moves {
            state.apply_in_place(c).unwrap();
        }
        state
    }

    #[test]
    fn test_search_counts_simulations() {
        let mut rng = ChaCha8Rng::seed_from_u64(7);
        let result = run_search(MctsTree::new(GameState::new_empty()), &MctsConfig::default(), 100, &mut rng);
        assert_eq!(result.total_simulations, 100);
        assert_eq!(result.move_stats.len(), 7);
        let visits: u32 = result.move_stats.iter().map(|s| s.visits).sum();
        assert_eq!(visits, 100);
    }

    #[test]
    fn test_search_finds_immediate_win() {
        // Plus: (5,0) (5,1) (5,2); Minus: (4,0) (4,1) (4,2); Plus to move
        let state = play(&[0, 0, 1, 1, 2, 2]);
        let mut rng = ChaCha8Rng::seed_from_u64(11);
        let result = run_search(MctsTree::new(state), &MctsConfig::default(), 400, &mut rng);
        assert_eq!(result.best_move(), Some(3));
    }

    #[test]
    fn test_search_is_deterministic_for_seed() {
        let state = play(&[3, 3]);
        let config = MctsConfig::default();
        let a = run_search(MctsTree::new(state.clone()), &config, 60, &mut ChaCha8Rng::seed_from_u64(5));
        let b = run_search(MctsTree::new(state), &config, 60, &mut ChaCha8Rng::seed_from_u64(5));
        assert_eq!(a.moves_by_visits(), b.moves_by_visits());
    }
}
