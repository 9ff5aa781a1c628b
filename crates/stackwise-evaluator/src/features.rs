use serde::{Deserialize, Serialize};
use stackwise_engine::{BitBoard, Piece, SENTINEL_MARGIN_TOP};

use crate::{BoardAnalysis, WeightVector};

/// Fill ratio above which a row contributes to the cubic row-fill bonus.
const ROW_FILL_BONUS_THRESHOLD: f32 = 0.7;
/// Occupied cells (of 10) above which a non-full row counts as a potential
/// line.
const POTENTIAL_LINE_CELLS: u32 = 8;

/// Fixed penalty applied whenever a placement clears nothing. This is a
/// policy choice, not a tuning detail: it biases every strategy toward
/// clearing, and because it is uniform across non-clearing placements their
/// relative ranking stays governed by the structural features alone.
pub const NO_CLEAR_PENALTY: f32 = 4.0;

/// Column height beyond which the quadratic stacking penalty kicks in.
pub const TALL_STACK_THRESHOLD: f32 = 12.0;
const TALL_STACK_FACTOR: f32 = 0.5;

/// The thirteen board-quality features of one hypothetical placement.
///
/// Extracted fresh per candidate move and never cached across boards; the
/// extraction clones the base board, so evaluating a placement can never
/// alter the caller's state.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FeatureVector {
    /// Rows between the placement's lowest cell and the floor (0 = resting
    /// on the bottom row).
    pub landing_height: f32,
    pub lines_cleared: f32,
    /// Near-full rows (>= 8 of 10 cells) left on the pre-clear board.
    pub potential_lines: f32,
    pub row_transitions: f32,
    pub column_transitions: f32,
    pub holes: f32,
    pub well_depth_sum: f32,
    pub blocks_above_holes: f32,
    /// 1.0 when the deepest well is at least two deep and hole-free, so a
    /// vertical piece can still use it.
    pub well_open: f32,
    /// Count of hole-free columns: surfaces still reachable by a straight
    /// drop.
    pub escape_route: f32,
    pub bumpiness: f32,
    pub max_height: f32,
    /// Sum of ratio^3 over rows filled beyond the bonus threshold.
    pub row_fill_ratio: f32,
}

impl FeatureVector {
    /// Simulates `placement` on a clone of `board` and measures it.
    ///
    /// Lines cleared come from running the clear step; every structural
    /// feature is measured on the pre-clear board (board plus locked piece,
    /// before row removal), which reflects the structural consequence of
    /// the choice rather than the post-clear residue.
    #[expect(clippy::cast_precision_loss)]
    #[must_use]
    pub fn extract(board: &BitBoard, placement: Piece) -> Self {
        let mut pre_clear = board.clone();
        pre_clear.fill_piece(placement);

        let mut post_clear = pre_clear.clone();
        let lines_cleared = post_clear.clear_lines().len();

        let analysis = BoardAnalysis::from_board(&pre_clear);

        let lowest_cell = placement
            .occupied_positions()
            .map(|(_x, y)| y)
            .max()
            .expect("piece masks are never empty");
        let landing_height =
            (BitBoard::PLAYABLE_HEIGHT + SENTINEL_MARGIN_TOP - 1).saturating_sub(lowest_cell);

        let mut potential_lines = 0u32;
        let mut row_fill_bonus = 0.0f32;
        for row in pre_clear.playable_rows() {
            let filled = row.playable_count();
            if filled == 0 {
                continue;
            }
            let ratio = filled as f32 / BitBoard::PLAYABLE_WIDTH as f32;
            if !row.is_playable_filled() && filled >= POTENTIAL_LINE_CELLS {
                potential_lines += 1;
            }
            if ratio >= ROW_FILL_BONUS_THRESHOLD {
                row_fill_bonus += ratio * ratio * ratio;
            }
        }

        Self {
            landing_height: landing_height as f32,
            lines_cleared: lines_cleared as f32,
            potential_lines: potential_lines as f32,
            row_transitions: analysis.row_transitions() as f32,
            column_transitions: analysis.column_transitions() as f32,
            holes: f32::from(analysis.num_holes()),
            well_depth_sum: analysis
                .column_well_depths()
                .iter()
                .map(|d| u32::from(*d))
                .sum::<u32>() as f32,
            blocks_above_holes: analysis.blocks_above_holes() as f32,
            well_open: if analysis.deepest_open_well() >= 2 {
                1.0
            } else {
                0.0
            },
            escape_route: f32::from(analysis.open_columns()),
            bumpiness: analysis.surface_bumpiness() as f32,
            max_height: f32::from(analysis.max_height()),
            row_fill_ratio: row_fill_bonus,
        }
    }

    fn linear_sum(&self, weights: &WeightVector) -> f32 {
        self.landing_height * weights.landing_height
            + self.lines_cleared * weights.lines_cleared
            + self.potential_lines * weights.potential_lines
            + self.row_transitions * weights.row_transitions
            + self.column_transitions * weights.column_transitions
            + self.holes * weights.holes
            + self.well_depth_sum * weights.well_depth_sum
            + self.blocks_above_holes * weights.blocks_above_holes
            + self.well_open * weights.well_open
            + self.escape_route * weights.escape_route
            + self.bumpiness * weights.bumpiness
            + self.max_height * weights.max_height
            + self.row_fill_ratio * weights.row_fill_ratio
    }
}

/// Reduces a feature vector to a scalar, higher is better.
///
/// A weighted linear sum with two deliberate nonlinearities that change
/// move ranking versus a pure linear model and must survive any rewrite:
///
/// 1. a fixed penalty whenever nothing is cleared ([`NO_CLEAR_PENALTY`]);
/// 2. a quadratic penalty once the stack grows past
///    [`TALL_STACK_THRESHOLD`], so "very tall" is punished much harder
///    than "tall".
///
/// Pure function of its two inputs.
#[must_use]
pub fn score(features: &FeatureVector, weights: &WeightVector) -> f32 {
    let mut score = features.linear_sum(weights);
    if features.lines_cleared == 0.0 {
        score -= NO_CLEAR_PENALTY;
    }
    let overshoot = features.max_height - TALL_STACK_THRESHOLD;
    if overshoot > 0.0 {
        score -= overshoot * overshoot * TALL_STACK_FACTOR;
    }
    score
}
