//! Board geometry: a 6x7 grid of signed cells, row 0 at the top

use serde::{Deserialize, Serialize};

use crate::error::GameError;

/// Number of rows (row 0 is the top, pieces fall toward row 5)
pub const ROWS: usize = 6;

/// Number of columns
pub const COLS: usize = 7;

/// Total number of cells
pub const CELLS: usize = ROWS * COLS;

/// Value of an unoccupied cell
pub const EMPTY: i8 = 0;

/// Pieces in a row needed to win
pub const CONNECT: usize = 4;

/// Direction vectors (dr, dc) for line checks: horizontal, vertical, both diagonals
pub const DIRECTIONS: [(isize, isize); 4] = [(0, 1), (1, 0), (1, 1), (1, -1)];

/// Number of distinct four-cell winning lines on a 6x7 board
pub const LINE_COUNT: usize = 69;

/// Every winning line as (row, col) cells, precomputed at compile time
pub const LINES: [[(usize, usize); CONNECT]; LINE_COUNT] = build_lines();

const fn build_lines() -> [[(usize, usize); CONNECT]; LINE_COUNT] {
    let mut lines = [[(0, 0); CONNECT]; LINE_COUNT];
    let mut n = 0;
    let mut r = 0;
    while r < ROWS {
        let mut c = 0;
        while c < COLS {
            if c + 3 < COLS {
                lines[n] = [(r, c), (r, c + 1), (r, c + 2), (r, c + 3)];
                n += 1;
            }
            if r + 3 < ROWS {
                lines[n] = [(r, c), (r + 1, c), (r + 2, c), (r + 3, c)];
                n += 1;
            }
            if r + 3 < ROWS && c + 3 < COLS {
                lines[n] = [(r, c), (r + 1, c + 1), (r + 2, c + 2), (r + 3, c + 3)];
                n += 1;
            }
            if r + 3 < ROWS && c >= 3 {
                lines[n] = [(r, c), (r + 1, c - 1), (r + 2, c - 2), (r + 3, c - 3)];
                n += 1;
            }
            c += 1;
        }
        r += 1;
    }
    lines
}

// ============================================================================
// PLAYER
// ============================================================================

/// Side to move. `Plus` always opens the game.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Player {
    Plus,
    Minus,
}

impl Player {
    pub fn opponent(self) -> Self {
        match self {
            Player::Plus => Player::Minus,
            Player::Minus => Player::Plus,
        }
    }

    /// Cell value written for this player's pieces (+1 / -1)
    pub fn sign(self) -> i8 {
        match self {
            Player::Plus => 1,
            Player::Minus => -1,
        }
    }

    pub fn from_sign(sign: i8) -> Option<Self> {
        match sign {
            1 => Some(Player::Plus),
            -1 => Some(Player::Minus),
            _ => None,
        }
    }
}

// ============================================================================
// BOARD
// ============================================================================

/// Raw grid of cells. Cheap to copy; every derived state owns its own copy.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Board {
    cells: [[i8; COLS]; ROWS],
}

impl Board {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a board from raw rows, rejecting values outside {-1, 0, 1}
    pub fn from_rows(rows: [[i8; COLS]; ROWS]) -> Result<Self, GameError> {
        for (row, cells) in rows.iter().enumerate() {
            for (column, &value) in cells.iter().enumerate() {
                if !(-1..=1).contains(&value) {
                    return Err(GameError::InvalidCell { row, column, value });
                }
            }
        }
        Ok(Self { cells: rows })
    }

    pub fn rows(&self) -> &[[i8; COLS]; ROWS] {
        &self.cells
    }

    pub fn get(&self, row: usize, col: usize) -> i8 {
        self.cells[row][col]
    }

    pub(crate) fn set(&mut self, row: usize, col: usize, value: i8) {
        self.cells[row][col] = value;
    }

    /// A column accepts a piece iff its top cell is empty
    pub fn is_column_open(&self, col: usize) -> bool {
        col < COLS && self.cells[0][col] == EMPTY
    }

    /// Columns with space in row 0, ascending
    pub fn open_columns(&self) -> Vec<usize> {
        (0..COLS).filter(|&c| self.cells[0][c] == EMPTY).collect()
    }

    /// Lowest empty row of a column (where a dropped piece lands)
    pub fn drop_row(&self, col: usize) -> Option<usize> {
        (0..ROWS).rev().find(|&r| self.cells[r][col] == EMPTY)
    }

    /// Number of cells holding `sign`
    pub fn count(&self, sign: i8) -> usize {
        self.cells.iter().flatten().filter(|&&v| v == sign).count()
    }

    /// Number of non-empty cells
    pub fn placed(&self) -> usize {
        self.cells.iter().flatten().filter(|&&v| v != EMPTY).count()
    }

    /// Sign-flipped copy: every +1 becomes -1 and vice versa
    pub fn inverted(&self) -> Board {
        let mut out = *self;
        for cell in out.cells.iter_mut().flatten() {
            *cell = -*cell;
        }
        out
    }

    /// Length of the run of `sign` through (row, col) along one direction,
    /// counting both forward and backward from the cell
    pub fn run_through(&self, row: usize, col: usize, (dr, dc): (isize, isize), sign: i8) -> usize {
        let mut count = 1;
        for step in [1isize, -1] {
            let mut r = row as isize + dr * step;
            let mut c = col as isize + dc * step;
            while in_bounds(r, c) && self.cells[r as usize][c as usize] == sign {
                count += 1;
                r += dr * step;
                c += dc * step;
            }
        }
        count
    }

    /// Would the piece at (row, col) complete four in a row?
    pub fn connects_at(&self, row: usize, col: usize) -> bool {
        let sign = self.cells[row][col];
        sign != EMPTY
            && DIRECTIONS
                .iter()
                .any(|&dir| self.run_through(row, col, dir, sign) >= CONNECT)
    }

    /// Full scan of all 69 lines. Returns the sign owning a complete line, or 0.
    ///
    /// Only used when reconstructing a state from a snapshot or scoring a
    /// bounded rollout; the move path checks incrementally instead.
    pub fn line_winner(&self) -> i8 {
        for line in LINES.iter() {
            let (r0, c0) = line[0];
            let first = self.cells[r0][c0];
            if first != EMPTY && line[1..].iter().all(|&(r, c)| self.cells[r][c] == first) {
                return first;
            }
        }
        0
    }

    /// Fixed-length hex encoding of the 42 cells, row-major, one byte per cell
    pub fn fingerprint(&self) -> String {
        let mut out = String::with_capacity(CELLS * 2);
        for &cell in self.cells.iter().flatten() {
            out.push_str(&format!("{:02x}", cell as u8));
        }
        out
    }
}

fn in_bounds(r: isize, c: isize) -> bool {
    (0..ROWS as isize).contains(&r) && (0..COLS as isize).contains(&c)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_line_table_size() {
        assert_eq!(LINES.len(), 69);
        // Every line stays on the board
        for line in LINES.iter() {
            for &(r, c) in line {
                assert!(r < ROWS && c < COLS);
            }
        }
    }

    #[test]
    fn test_player_sign_roundtrip() {
        assert_eq!(Player::from_sign(Player::Plus.sign()), Some(Player::Plus));
        assert_eq!(Player::from_sign(Player::Minus.sign()), Some(Player::Minus));
        assert_eq!(Player::from_sign(0), None);
        assert_eq!(Player::Plus.opponent(), Player::Minus);
    }

    #[test]
    fn test_from_rows_rejects_bad_cells() {
        let mut rows = [[0i8; COLS]; ROWS];
        rows[5][2] = 2;
        assert!(matches!(
            Board::from_rows(rows),
            Err(GameError::InvalidCell { row: 5, column: 2, value: 2 })
        ));
    }

    #[test]
    fn test_drop_row_and_open_columns() {
        let mut rows = [[0i8; COLS]; ROWS];
        for r in 0..ROWS {
            rows[r][4] = if r % 2 == 0 { 1 } else { -1 };
        }
        rows[5][0] = 1;
        let board = Board::from_rows(rows).unwrap();

        assert_eq!(board.drop_row(0), Some(4));
        assert_eq!(board.drop_row(1), Some(5));
        assert_eq!(board.drop_row(4), None);
        assert_eq!(board.open_columns(), vec![0, 1, 2, 3, 5, 6]);
        assert!(!board.is_column_open(4));
        assert!(!board.is_column_open(7));
    }

    #[test]
    fn test_inverted_swaps_counts() {
        let mut rows = [[0i8; COLS]; ROWS];
        rows[5][0] = 1;
        rows[5][1] = 1;
        rows[5][2] = -1;
        let board = Board::from_rows(rows).unwrap();
        let inv = board.inverted();

        assert_eq!(inv.count(1), 1);
        assert_eq!(inv.count(-1), 2);
        assert_eq!(inv.inverted(), board);
    }

    #[test]
    fn test_line_winner_scan() {
        let mut rows = [[0i8; COLS]; ROWS];
        for c in 1..5 {
            rows[5][c] = -1;
        }
        let board = Board::from_rows(rows).unwrap();
        assert_eq!(board.line_winner(), -1);
        assert!(board.connects_at(5, 2));

        rows[5][4] = 1;
        let board = Board::from_rows(rows).unwrap();
        assert_eq!(board.line_winner(), 0);
        assert!(!board.connects_at(5, 2));
    }

    #[test]
    fn test_fingerprint_is_fixed_length_hex() {
        let mut board = Board::new();
        assert_eq!(board.fingerprint().len(), CELLS * 2);
        assert!(board.fingerprint().chars().all(|ch| ch == '0'));

        board.set(5, 6, -1);
        board.set(5, 5, 1);
        let fp = board.fingerprint();
        assert_eq!(fp.len(), CELLS * 2);
        assert!(fp.ends_with("01ff"));
    }
}
