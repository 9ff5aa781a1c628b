use std::{fmt::Write, ops::Range};

use arrayvec::ArrayVec;
use serde::{Deserialize, Serialize};

use crate::piece::Piece;

pub const PLAYABLE_WIDTH: usize = 10;
pub const PLAYABLE_HEIGHT: usize = 20;
pub const SENTINEL_MARGIN_LEFT: usize = 2;
pub const SENTINEL_MARGIN_TOP: usize = 2;
pub const SENTINEL_MARGIN_BOTTOM: usize = 2;
pub const TOTAL_WIDTH: usize = PLAYABLE_WIDTH + 2 * SENTINEL_MARGIN_LEFT;
pub const TOTAL_HEIGHT: usize = PLAYABLE_HEIGHT + SENTINEL_MARGIN_TOP + SENTINEL_MARGIN_BOTTOM;

pub(crate) const PIECE_SPAWN_X: usize = 5;
pub(crate) const PIECE_SPAWN_Y: usize = 0;

// Left sentinel: bits 0-1, right sentinel: bits 12-13.
const LEFT_SENTINEL_MASK: u16 = 0b11;
const RIGHT_SENTINEL_MASK: u16 = 0b11 << (SENTINEL_MARGIN_LEFT + PLAYABLE_WIDTH);
const SENTINEL_MASK: u16 = LEFT_SENTINEL_MASK | RIGHT_SENTINEL_MASK;
const FULL_ROW_MASK: u16 = (1 << TOTAL_WIDTH) - 1;
const PLAYABLE_MASK: u16 = FULL_ROW_MASK & !SENTINEL_MASK;

/// Single row of the board as a 16-bit occupancy mask.
///
/// Bits 0-1 and 12-13 are wall sentinels that are always set; bits 2-11 are
/// the 10 playable cells. Keeping the walls inside the mask means piece
/// collision is a single AND per row with no bounds checks.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BitRow {
    bits: u16,
}

impl BitRow {
    pub const EMPTY: Self = Self {
        bits: SENTINEL_MASK,
    };
    pub const FULL_SENTINEL: Self = Self {
        bits: FULL_ROW_MASK,
    };

    /// Checks if every playable cell in the row is occupied.
    #[inline]
    #[must_use]
    pub fn is_playable_filled(self) -> bool {
        (self.bits & PLAYABLE_MASK) == PLAYABLE_MASK
    }

    #[inline]
    #[must_use]
    pub fn is_cell_occupied(self, x: usize) -> bool {
        (self.bits & (1 << x)) != 0
    }

    /// Checks if any cell under the mask (shifted by `x0`) is occupied.
    #[inline]
    #[must_use]
    pub(crate) fn is_any_cell_occupied(self, x0: usize, mask: u16) -> bool {
        (self.bits & (mask << x0)) != 0
    }

    #[inline]
    pub(crate) fn occupy_cells(&mut self, x0: usize, mask: u16) {
        self.bits |= mask << x0;
    }

    /// Occupied status of each playable cell, left to right.
    #[inline]
    pub fn iter_playable_cells(self) -> impl Iterator<Item = bool> {
        (SENTINEL_MARGIN_LEFT..SENTINEL_MARGIN_LEFT + PLAYABLE_WIDTH)
            .map(move |x| (self.bits & (1 << x)) != 0)
    }

    /// Number of occupied playable cells in the row.
    #[inline]
    #[must_use]
    pub fn playable_count(self) -> u32 {
        (self.bits & PLAYABLE_MASK).count_ones()
    }
}

/// Playable row indices removed by one [`BitBoard::clear_lines`] call,
/// ordered top to bottom. A single placement clears at most four rows, but
/// the board operation itself is not placement-bound, so the capacity covers
/// the full playable height.
pub type ClearedRows = ArrayVec<u8, PLAYABLE_HEIGHT>;

/// Bit-packed board for O(piece height) collision tests and line clears.
///
/// One `u16` per row, 24 rows total: 2 spawn rows above the playable area,
/// 20 playable rows, and 2 fully-occupied sentinel rows at the bottom that
/// stop downward movement. The 2-cell side margins exist so every piece's
/// 4x4 mask can slide to both walls without shifting bits out of the row.
///
/// Cloning is a plain array copy; a clone shares nothing with its source.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BitBoard {
    rows: [BitRow; TOTAL_HEIGHT],
}

impl Serialize for BitBoard {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        // Format: "3003,3003,..." (one 4-digit hex value per row)
        let mut hex = String::with_capacity(TOTAL_HEIGHT * 5);
        for (i, row) in self.rows.iter().enumerate() {
            if i > 0 {
                hex.push(',');
            }
            write!(&mut hex, "{:04x}", row.bits).unwrap();
        }
        serializer.serialize_str(&hex)
    }
}

impl<'de> Deserialize<'de> for BitBoard {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;

        let parts: Vec<&str> = s.split(',').collect();
        if parts.len() != TOTAL_HEIGHT {
            return Err(serde::de::Error::custom(format!(
                "expected {} comma-separated hex values, got {}",
                TOTAL_HEIGHT,
                parts.len()
            )));
        }

        let mut rows = [BitRow::EMPTY; TOTAL_HEIGHT];
        for (i, hex_str) in parts.iter().enumerate() {
            let bits = u16::from_str_radix(hex_str, 16).map_err(|e| {
                serde::de::Error::custom(format!("invalid hex at row {i}: {hex_str} ({e})"))
            })?;
            if bits & SENTINEL_MASK != SENTINEL_MASK {
                return Err(serde::de::Error::custom(format!(
                    "row {i} is missing sentinel bits: {hex_str}"
                )));
            }
            rows[i] = BitRow { bits };
        }

        Ok(BitBoard { rows })
    }
}

impl Default for BitBoard {
    fn default() -> Self {
        Self::INITIAL
    }
}

impl BitBoard {
    pub const TOTAL_WIDTH: usize = TOTAL_WIDTH;
    pub const TOTAL_HEIGHT: usize = TOTAL_HEIGHT;
    pub const PLAYABLE_WIDTH: usize = PLAYABLE_WIDTH;
    pub const PLAYABLE_HEIGHT: usize = PLAYABLE_HEIGHT;
    pub const PLAYABLE_X_RANGE: Range<usize> =
        SENTINEL_MARGIN_LEFT..(SENTINEL_MARGIN_LEFT + PLAYABLE_WIDTH);
    pub const PLAYABLE_Y_RANGE: Range<usize> =
        SENTINEL_MARGIN_TOP..(SENTINEL_MARGIN_TOP + PLAYABLE_HEIGHT);

    pub const INITIAL: Self = {
        let mut rows = [BitRow::EMPTY; TOTAL_HEIGHT];
        let mut y = SENTINEL_MARGIN_TOP + PLAYABLE_HEIGHT;
        while y < TOTAL_HEIGHT {
            rows[y] = BitRow::FULL_SENTINEL;
            y += 1;
        }
        Self { rows }
    };

    /// Returns a playable row by index (0 = top).
    #[must_use]
    pub fn playable_row(&self, y: usize) -> BitRow {
        self.rows[y + SENTINEL_MARGIN_TOP]
    }

    /// Iterates the playable rows top to bottom.
    pub fn playable_rows(&self) -> impl Iterator<Item = BitRow> + '_ {
        self.rows[SENTINEL_MARGIN_TOP..][..PLAYABLE_HEIGHT]
            .iter()
            .copied()
    }

    /// Checks whether the piece overlaps any occupied cell (walls included).
    #[must_use]
    pub fn is_colliding(&self, piece: Piece) -> bool {
        let x0 = piece.position().x();
        let y0 = piece.position().y();
        for (mask, row) in piece.mask().into_iter().zip(&self.rows[y0..]) {
            if row.is_any_cell_occupied(x0, mask) {
                return true;
            }
        }
        false
    }

    /// Locks a piece onto the board by setting its occupied cells.
    pub fn fill_piece(&mut self, piece: Piece) {
        let x0 = piece.position().x();
        let y0 = piece.position().y();
        for (mask, row) in piece.mask().into_iter().zip(&mut self.rows[y0..]) {
            row.occupy_cells(x0, mask);
        }
    }

    /// Removes every fully-occupied playable row, compacting the rows above
    /// it downward, and returns the removed playable row indices in top to
    /// bottom order. Relative order of surviving rows and the total row
    /// count are preserved.
    pub fn clear_lines(&mut self) -> ClearedRows {
        let playable_rows = &mut self.rows[SENTINEL_MARGIN_TOP..][..PLAYABLE_HEIGHT];
        let mut cleared = ClearedRows::new();

        for y in (0..PLAYABLE_HEIGHT).rev() {
            if playable_rows[y].is_playable_filled() {
                cleared.push(u8::try_from(y).unwrap());
                continue;
            }
            let count = cleared.len();
            if count > 0 {
                playable_rows[y + count] = playable_rows[y];
            }
        }

        // Cleared rows leave empty space at the top.
        playable_rows[..cleared.len()].fill(BitRow::EMPTY);
        cleared.reverse();
        cleared
    }

    /// Per-column stack heights: distance from the bottom of the playable
    /// area up to the first occupied cell, 0 for an empty column.
    #[must_use]
    pub fn column_heights(&self) -> [u8; PLAYABLE_WIDTH] {
        let mut heights = [0; PLAYABLE_WIDTH];
        for (x, h) in Self::PLAYABLE_X_RANGE.zip(&mut heights) {
            let top = self
                .playable_rows()
                .enumerate()
                .find(|(_y, row)| row.is_cell_occupied(x));
            if let Some((top, _)) = top {
                *h = u8::try_from(PLAYABLE_HEIGHT - top).unwrap();
            }
        }
        heights
    }

    /// Creates a `BitBoard` from ASCII art for testing.
    /// '#' is an occupied cell, '.' an empty one; rows are top to bottom
    /// and must be exactly 10 cells wide.
    #[must_use]
    pub fn from_ascii(art: &str) -> Self {
        let mut board = Self::INITIAL;
        let lines: Vec<&str> = art.lines().filter(|line| !line.trim().is_empty()).collect();

        for (y, line) in lines.iter().enumerate() {
            let chars: Vec<char> = line.chars().filter(|c| *c == '#' || *c == '.').collect();
            assert_eq!(
                chars.len(),
                PLAYABLE_WIDTH,
                "each row must have exactly {} cells, got {} at row {}",
                PLAYABLE_WIDTH,
                chars.len(),
                y
            );

            for (x, &ch) in chars.iter().enumerate() {
                if ch == '#' {
                    board.rows[y + SENTINEL_MARGIN_TOP]
                        .occupy_cells(x + SENTINEL_MARGIN_LEFT, 0b1);
                }
            }
        }
        board
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn occupy_cell(board: &mut BitBoard, x: usize, y: usize) {
        board.rows[y].occupy_cells(x, 0b1);
    }

    fn fill_playable_row(board: &mut BitBoard, playable_y: usize) {
        for x in BitBoard::PLAYABLE_X_RANGE {
            occupy_cell(board, x, playable_y + SENTINEL_MARGIN_TOP);
        }
    }

    #[test]
    fn initial_board_layout() {
        let board = BitBoard::INITIAL;

        for y in 0..TOTAL_HEIGHT {
            for x in 0..TOTAL_WIDTH {
                let cell = board.rows[y].is_cell_occupied(x);
                if y >= SENTINEL_MARGIN_TOP + PLAYABLE_HEIGHT {
                    assert!(cell, "bottom sentinel must be occupied at ({x}, {y})");
                } else if !BitBoard::PLAYABLE_X_RANGE.contains(&x) {
                    assert!(cell, "side sentinel must be occupied at ({x}, {y})");
                } else {
                    assert!(!cell, "playable cell must start empty at ({x}, {y})");
                }
            }
        }
    }

    #[test]
    fn clone_is_independent() {
        let original = BitBoard::from_ascii(
            r"
            ..........
            ..........
            ..........
            ..........
            ..........
            ..........
            ..........
            ..........
            ..........
            ..........
            ..........
            ..........
            ..........
            ..........
            ..........
            ..........
            ..........
            ..........
            ..........
            ####......
            ",
        );

        let mut clone = original.clone();
        occupy_cell(&mut clone, SENTINEL_MARGIN_LEFT + 5, SENTINEL_MARGIN_TOP + 3);
        fill_playable_row(&mut clone, 19);
        clone.clear_lines();

        assert_ne!(clone, original);
        let reference = BitBoard::from_ascii(
            r"
            ..........
            ..........
            ..........
            ..........
            ..........
            ..........
            ..........
            ..........
            ..........
            ..........
            ..........
            ..........
            ..........
            ..........
            ..........
            ..........
            ..........
            ..........
            ..........
            ####......
            ",
        );
        assert_eq!(original, reference);
    }

    #[test]
    fn clear_lines_single() {
        let mut board = BitBoard::INITIAL;
        fill_playable_row(&mut board, 0);

        let cleared = board.clear_lines();
        assert_eq!(cleared.as_slice(), [0]);
        assert!(!board.playable_row(0).is_playable_filled());
    }

    #[test]
    fn clear_lines_reports_indices_top_to_bottom() {
        let mut board = BitBoard::INITIAL;
        fill_playable_row(&mut board, 17);
        fill_playable_row(&mut board, 19);

        let cleared = board.clear_lines();
        assert_eq!(cleared.as_slice(), [17, 19]);
    }

    #[test]
    fn clear_lines_preserves_remaining_row_order() {
        let mut board = BitBoard::from_ascii(
            r"
            ..........
            ..........
            ..........
            ..........
            ..........
            ..........
            ..........
            ..........
            ..........
            ..........
            ..........
            ..........
            ..........
            ..........
            ..........
            ..........
            #.........
            .#........
            ..........
            ..#.......
            ",
        );
        fill_playable_row(&mut board, 18);

        let cleared = board.clear_lines();
        assert_eq!(cleared.as_slice(), [18]);

        // Partial rows shift down by one, keeping their relative order.
        assert!(board.playable_row(17).is_cell_occupied(SENTINEL_MARGIN_LEFT));
        assert!(board.playable_row(18).is_cell_occupied(SENTINEL_MARGIN_LEFT + 1));
        assert!(board.playable_row(19).is_cell_occupied(SENTINEL_MARGIN_LEFT + 2));
    }

    #[test]
    fn clear_lines_partial_row_untouched() {
        let mut board = BitBoard::INITIAL;
        for x in BitBoard::PLAYABLE_X_RANGE.take(PLAYABLE_WIDTH - 1) {
            occupy_cell(&mut board, x, SENTINEL_MARGIN_TOP);
        }

        let cleared = board.clear_lines();
        assert!(cleared.is_empty());
        assert_eq!(board.playable_row(0).playable_count(), 9);
    }

    #[test]
    fn clear_lines_all_filled() {
        let mut board = BitBoard::INITIAL;
        for y in 0..PLAYABLE_HEIGHT {
            fill_playable_row(&mut board, y);
        }

        let cleared = board.clear_lines();
        assert_eq!(cleared.len(), PLAYABLE_HEIGHT);
        assert_eq!(board, BitBoard::INITIAL);
    }

    #[test]
    fn clear_lines_preserves_sentinels() {
        let mut board = BitBoard::INITIAL;
        fill_playable_row(&mut board, 0);
        board.clear_lines();

        for y in BitBoard::PLAYABLE_Y_RANGE {
            assert!(board.rows[y].is_cell_occupied(0));
            assert!(board.rows[y].is_cell_occupied(1));
            assert!(board.rows[y].is_cell_occupied(TOTAL_WIDTH - 2));
            assert!(board.rows[y].is_cell_occupied(TOTAL_WIDTH - 1));
        }
    }

    #[test]
    fn column_heights_measures_top_of_stack() {
        let board = BitBoard::from_ascii(
            r"
            ..........
            ..........
            ..........
            ..........
            ..........
            ..........
            ..........
            ..........
            ..........
            ..........
            ..........
            ..........
            ..........
            ..........
            ..........
            ..........
            #.........
            #.........
            #...#.....
            #...#....#
            ",
        );

        let heights = board.column_heights();
        assert_eq!(heights, [4, 0, 0, 0, 2, 0, 0, 0, 0, 1]);
    }

    #[test]
    fn column_heights_counts_covered_gaps() {
        // Height is measured to the topmost block, holes included.
        let board = BitBoard::from_ascii(
            r"
            ..........
            ..........
            ..........
            ..........
            ..........
            ..........
            ..........
            ..........
            ..........
            ..........
            ..........
            ..........
            ..........
            ..........
            ..........
            ..........
            ..........
            #.........
            ..........
            #.........
            ",
        );

        assert_eq!(board.column_heights()[0], 3);
    }

    #[test]
    fn serialization_round_trip() {
        let board = BitBoard::from_ascii(
            r"
            ##........
            ..........
            ..........
            ..........
            ..........
            ..........
            ..........
            ..........
            ..........
            ..........
            ..........
            ..........
            ..........
            ..........
            ..........
            ..........
            ..........
            ..........
            .#........
            ..#.......
            ",
        );

        let serialized = serde_json::to_string(&board).unwrap();
        assert!(serialized.contains("300f")); // the ## row
        assert!(serialized.contains("3fff")); // bottom sentinel rows

        let deserialized: BitBoard = serde_json::from_str(&serialized).unwrap();
        assert_eq!(deserialized, board);
    }

    #[test]
    fn deserialization_rejects_malformed_input() {
        // Wrong row count
        assert!(serde_json::from_str::<BitBoard>("\"3003,3003\"").is_err());
        // Not hex
        let bad: String = std::iter::repeat_n("zzzz", TOTAL_HEIGHT)
            .collect::<Vec<_>>()
            .join(",");
        assert!(serde_json::from_str::<BitBoard>(&format!("\"{bad}\"")).is_err());
        // Missing sentinel bits
        let bare: String = std::iter::repeat_n("0000", TOTAL_HEIGHT)
            .collect::<Vec<_>>()
            .join(",");
        assert!(serde_json::from_str::<BitBoard>(&format!("\"{bare}\"")).is_err());
    }
}
