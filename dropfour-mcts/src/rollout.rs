//! Bounded random rollouts
//!
//! A rollout plays uniformly random legal moves for at most `max_depth`
//! plies, then scores the position by a direct line check. Positions that
//! are still open at the depth limit count as draws.

use dropfour_core::{GameState, Player};
use rand::prelude::*;

/// Result of a single rollout
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RolloutResult {
    /// Sign owning a complete line, or 0
    pub winner: i8,
    pub moves_played: u32,
}

impl RolloutResult {
    /// +1 / 0 / -1 reward from `player`'s point of view
    pub fn reward_for(&self, player: Player) -> f64 {
        (self.winner * player.sign()) as f64
    }
}

/// Play random moves from `state` on a private copy. Iterative, so deep
/// limits cannot exhaust the stack.
pub fn random_rollout<R: Rng>(state: &GameState, max_depth: u32, rng: &mut R) -> RolloutResult {
    let mut current = state.clone();
    let mut moves_played = 0;

    while moves_played < max_depth && !current.is_terminal() {
        let moves = current.legal_moves();
        let Some(&col) = moves.choose(rng) else { break };
        if current.apply_in_place(col).is_err() {
            break;
        }
        moves_played += 1;
    }

    RolloutResult { winner: current.board().line_winner(), moves_played }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand_chacha::ChaCha8Rng;

    #[test]
    fn test_rollout_respects_depth() {
        let mut rng = ChaCha8Rng::seed_from_u64(1);
        let result = random_rollout(&GameState::new_empty(), 5, &mut rng);
        assert_eq!(result.moves_played, 5);
        // Five pieces cannot make a line
        assert_eq!(result.winner, 0);
    }

    #[test]
    fn test_rollout_on_terminal_state_plays_nothing() {
        let mut state = GameState::new_empty();
        for c in [0, 6, 1, 6, 2, 6, 3] {
            state.apply_in_place(c).unwrap();
        }
        let mut rng = ChaCha8Rng::seed_from_u64(1);
        let result = random_rollout(&state, 10, &mut rng);
        assert_eq!(result.moves_played, 0);
        assert_eq!(result.winner, 1);
        assert_eq!(result.reward_for(Player::Plus), 1.0);
        assert_eq!(result.reward_for(Player::Minus), -1.0);
    }

    #[test]
    fn test_rollout_is_seeded() {
        let state = GameState::new_empty();
        let a = random_rollout(&state, 42, &mut ChaCha8Rng::seed_from_u64(3));
        let b = random_rollout(&state, 42, &mut ChaCha8Rng::seed_from_u64(3));
        assert_eq!(a, b);
    }

    #[test]
    fn test_rollout_does_not_touch_input() {
        let state = GameState::new_empty();
        let copy = state.clone();
        random_rollout(&state, 20, &mut ChaCha8Rng::seed_from_u64(9));
        assert_eq!(state, copy);
    }
}
