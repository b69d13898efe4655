//! Game state and move generation

use serde::{Deserialize, Serialize};

use crate::board::{Board, Player, CELLS, COLS, EMPTY, ROWS};
use crate::error::{GameError, MoveRejection};

// ============================================================================
// CORE TYPES
// ============================================================================

/// Game result
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum GameResult {
    Ongoing,
    PlusWins,
    MinusWins,
    Draw,
}

// ============================================================================
// GAME STATE
// ============================================================================

/// Game state.
///
/// `apply` derives a fresh state and leaves `self` untouched; `apply_in_place`
/// mutates the only copy and is what rollouts use. Both go through the same
/// placement code, so outcomes are identical.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct GameState {
    board: Board,
    current_player: Player,
    /// Pieces stacked in each column
    heights: [u8; COLS],
    empty_count: u8,
    /// Set by the move that completes four in a row, never recomputed
    winner: i8,
}

impl Default for GameState {
    fn default() -> Self {
        Self::new_empty()
    }
}

impl GameState {
    // ========================================================================
    // CONSTRUCTORS
    // ========================================================================

    /// Empty board, `Plus` to move
    pub fn new_empty() -> Self {
        Self {
            board: Board::new(),
            current_player: Player::Plus,
            heights: [0; COLS],
            empty_count: CELLS as u8,
            winner: 0,
        }
    }

    /// Rebuild a state from a board snapshot.
    ///
    /// Heights and the empty count are derived from the cells; the winner comes
    /// from a single full line scan. Pieces hanging above an empty cell are
    /// rejected.
    pub fn from_board(board: Board, current_player: Player) -> Result<Self, GameError> {
        let mut heights = [0u8; COLS];

        for (col, height) in heights.iter_mut().enumerate() {
            let top = (0..ROWS).find(|&r| board.get(r, col) != EMPTY);
            if let Some(top) = top {
                if (top..ROWS).any(|r| board.get(r, col) == EMPTY) {
                    return Err(GameError::FloatingPiece { row: top, column: col });
                }
                *height = (ROWS - top) as u8;
            }
        }

        let placed: usize = heights.iter().map(|&h| h as usize).sum();

        Ok(Self {
            board,
            current_player,
            heights,
            empty_count: (CELLS - placed) as u8,
            winner: board.line_winner(),
        })
    }

    // ========================================================================
    // ACCESSORS
    // ========================================================================

    pub fn board(&self) -> &Board {
        &self.board
    }

    pub fn current_player(&self) -> Player {
        self.current_player
    }

    pub fn heights(&self) -> &[u8; COLS] {
        &self.heights
    }

    pub fn empty_count(&self) -> usize {
        self.empty_count as usize
    }

    /// Cached winner sign: +1, -1, or 0. Meaningful once `is_terminal()`.
    pub fn winner(&self) -> i8 {
        self.winner
    }

    pub fn is_terminal(&self) -> bool {
        self.winner != 0 || self.empty_count == 0
    }

    pub fn result(&self) -> GameResult {
        match self.winner {
            1 => GameResult::PlusWins,
            -1 => GameResult::MinusWins,
            _ if self.empty_count == 0 => GameResult::Draw,
            _ => GameResult::Ongoing,
        }
    }

    // ========================================================================
    // MOVE GENERATION
    // ========================================================================

    /// A column is playable iff it has room and the game is still running
    pub fn is_applicable(&self, col: usize) -> bool {
        col < COLS && (self.heights[col] as usize) < ROWS && !self.is_terminal()
    }

    /// Playable columns, ascending. Empty once the game is over.
    pub fn legal_moves(&self) -> Vec<usize> {
        if self.is_terminal() {
            return Vec::new();
        }
        (0..COLS)
            .filter(|&c| (self.heights[c] as usize) < ROWS)
            .collect()
    }

    // ========================================================================
    // TRANSITIONS
    // ========================================================================

    /// Pure transition: returns the successor, `self` is unchanged
    pub fn apply(&self, col: usize) -> Result<GameState, GameError> {
        let mut next = self.clone();
        next.apply_in_place(col)?;
        Ok(next)
    }

    /// In-place transition for rollouts where copying dominates
    pub fn apply_in_place(&mut self, col: usize) -> Result<(), GameError> {
        self.check_move(col)?;

        let row = ROWS - 1 - self.heights[col] as usize;
        self.board.set(row, col, self.current_player.sign());
        self.heights[col] += 1;
        self.empty_count -= 1;

        if self.board.connects_at(row, col) {
            self.winner = self.current_player.sign();
        }

        self.current_player = self.current_player.opponent();
        Ok(())
    }

    fn check_move(&self, col: usize) -> Result<(), GameError> {
        let reason = if col >= COLS {
            MoveRejection::OutOfRange
        } else if self.is_terminal() {
            MoveRejection::GameOver
        } else if self.heights[col] as usize >= ROWS {
            MoveRejection::ColumnFull
        } else {
            return Ok(());
        };
        Err(GameError::InvalidMove { column: col, reason })
    }
}
