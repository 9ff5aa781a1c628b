use std::{cell::OnceCell, iter};

use stackwise_engine::BitBoard;

/// Lazily-computed structural metrics for one board snapshot.
///
/// Each metric is computed at most once per snapshot; features that share
/// intermediates (column heights feed holes, wells, and bumpiness) do not
/// repeat the column scans.
#[derive(Debug)]
pub struct BoardAnalysis {
    board: BitBoard,
    column_heights: OnceCell<[u8; BitBoard::PLAYABLE_WIDTH]>,
    column_occupied_cells: OnceCell<[u8; BitBoard::PLAYABLE_WIDTH]>,
    column_well_depths: OnceCell<[u8; BitBoard::PLAYABLE_WIDTH]>,
    max_height: OnceCell<u8>,
    num_holes: OnceCell<u8>,
    blocks_above_holes: OnceCell<u32>,
    row_transitions: OnceCell<u32>,
    column_transitions: OnceCell<u32>,
    surface_bumpiness: OnceCell<u32>,
    open_columns: OnceCell<u8>,
}

impl BoardAnalysis {
    #[must_use]
    pub fn from_board(board: &BitBoard) -> Self {
        Self {
            board: board.clone(),
            column_heights: OnceCell::new(),
            column_occupied_cells: OnceCell::new(),
            column_well_depths: OnceCell::new(),
            max_height: OnceCell::new(),
            num_holes: OnceCell::new(),
            blocks_above_holes: OnceCell::new(),
            row_transitions: OnceCell::new(),
            column_transitions: OnceCell::new(),
            surface_bumpiness: OnceCell::new(),
            open_columns: OnceCell::new(),
        }
    }

    #[must_use]
    pub fn board(&self) -> &BitBoard {
        &self.board
    }

    #[must_use]
    pub fn column_heights(&self) -> &[u8; BitBoard::PLAYABLE_WIDTH] {
        self.column_heights.get_or_init(|| self.board.column_heights())
    }

    #[must_use]
    pub fn column_occupied_cells(&self) -> &[u8; BitBoard::PLAYABLE_WIDTH] {
        self.column_occupied_cells.get_or_init(|| {
            let mut occupied = [0; BitBoard::PLAYABLE_WIDTH];
            for (x, o) in iter::zip(BitBoard::PLAYABLE_X_RANGE, &mut occupied) {
                for row in self.board.playable_rows() {
                    if row.is_cell_occupied(x) {
                        *o += 1;
                    }
                }
            }
            occupied
        })
    }

    /// Well depth per column: how far the column sits below both neighbors
    /// (walls count as infinitely tall).
    #[must_use]
    pub fn column_well_depths(&self) -> &[u8; BitBoard::PLAYABLE_WIDTH] {
        self.column_well_depths.get_or_init(|| {
            let h = self.column_heights();
            let start = &[u8::MAX, h[0], h[1]][..];
            let end = &[h[h.len() - 2], h[h.len() - 1], u8::MAX][..];
            let triples = iter::once(start).chain(h.windows(3)).chain(iter::once(end));
            let wells = triples.map(|w| {
                if w[1] < w[0] && w[1] < w[2] {
                    u8::min(w[0], w[2]) - w[1]
                } else {
                    0
                }
            });
            let mut depths = [0; BitBoard::PLAYABLE_WIDTH];
            for (w, d) in iter::zip(wells, &mut depths) {
                *d = w;
            }
            depths
        })
    }

    #[must_use]
    pub fn max_height(&self) -> u8 {
        *self
            .max_height
            .get_or_init(|| *self.column_heights().iter().max().unwrap())
    }

    /// Empty cells with at least one occupied cell above them.
    #[must_use]
    pub fn num_holes(&self) -> u8 {
        *self.num_holes.get_or_init(|| {
            iter::zip(self.column_heights(), self.column_occupied_cells())
                .map(|(h, occ)| h - occ)
                .sum()
        })
    }

    /// For every hole, the number of occupied cells stacked above it,
    /// summed. Measures how expensive holes are to dig out.
    #[must_use]
    pub fn blocks_above_holes(&self) -> u32 {
        *self.blocks_above_holes.get_or_init(|| {
            let mut total = 0u32;
            for x in BitBoard::PLAYABLE_X_RANGE {
                let mut blocks_above = 0u32;
                for y in 0..BitBoard::PLAYABLE_HEIGHT {
                    if self.board.playable_row(y).is_cell_occupied(x) {
                        blocks_above += 1;
                    } else if blocks_above > 0 {
                        total += blocks_above;
                    }
                }
            }
            total
        })
    }

    #[must_use]
    pub fn row_transitions(&self) -> u32 {
        *self.row_transitions.get_or_init(|| {
            let mut transitions = 0;
            for row in self.board.playable_rows() {
                let mut cells = row.iter_playable_cells();
                let mut prev_occupied = cells.next().unwrap();
                for occupied in cells {
                    if occupied != prev_occupied {
                        transitions += 1;
                    }
                    prev_occupied = occupied;
                }
            }
            transitions
        })
    }

    #[must_use]
    pub fn column_transitions(&self) -> u32 {
        *self.column_transitions.get_or_init(|| {
            let mut transitions = 0;
            for x in BitBoard::PLAYABLE_X_RANGE {
                let mut prev_occupied = self.board.playable_row(0).is_cell_occupied(x);
                for y in 1..BitBoard::PLAYABLE_HEIGHT {
                    let occupied = self.board.playable_row(y).is_cell_occupied(x);
                    if occupied != prev_occupied {
                        transitions += 1;
                    }
                    prev_occupied = occupied;
                }
            }
            transitions
        })
    }

    /// Sum of absolute height differences between adjacent columns.
    #[must_use]
    pub fn surface_bumpiness(&self) -> u32 {
        *self.surface_bumpiness.get_or_init(|| {
            self.column_heights()
                .windows(2)
                .map(|w| (i32::from(w[1]) - i32::from(w[0])).unsigned_abs())
                .sum()
        })
    }

    /// Columns without holes: a vertical drop reaches their true surface.
    #[must_use]
    pub fn open_columns(&self) -> u8 {
        *self.open_columns.get_or_init(|| {
            iter::zip(self.column_heights(), self.column_occupied_cells())
                .filter(|(h, occ)| h == occ)
                .count()
                .try_into()
                .unwrap()
        })
    }

    /// Deepest well that a line-clearing piece could still enter: depth of
    /// the deepest well whose column is hole-free.
    #[must_use]
    pub fn deepest_open_well(&self) -> u8 {
        iter::zip(self.column_well_depths(), iter::zip(self.column_heights(), self.column_occupied_cells()))
            .filter(|(_d, (h, occ))| h == occ)
            .map(|(d, _)| *d)
            .max()
            .unwrap_or(0)
    }
}
