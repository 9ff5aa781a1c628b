use serde::{Deserialize, Serialize};

use crate::BoardAnalysis;

/// One weight per [`FeatureVector`](crate::FeatureVector) field.
///
/// Weights multiply raw feature values, so penalties are negative. The
/// default set is hand-tuned with one correctness-relevant invariant: the
/// `lines_cleared` reward dominates every structural penalty in magnitude,
/// which keeps the evaluator biased toward clearing even from ugly stacks.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct WeightVector {
    pub landing_height: f32,
    pub lines_cleared: f32,
    pub potential_lines: f32,
    pub row_transitions: f32,
    pub column_transitions: f32,
    pub holes: f32,
    pub well_depth_sum: f32,
    pub blocks_above_holes: f32,
    pub well_open: f32,
    pub escape_route: f32,
    pub bumpiness: f32,
    pub max_height: f32,
    pub row_fill_ratio: f32,
}

impl WeightVector {
    pub const DEFAULT: Self = Self {
        landing_height: -1.0,
        lines_cleared: 60.0,
        potential_lines: 3.0,
        row_transitions: -2.0,
        column_transitions: -2.0,
        holes: -7.0,
        well_depth_sum: -1.5,
        blocks_above_holes: -0.8,
        well_open: 2.0,
        escape_route: 0.5,
        bumpiness: -1.0,
        max_height: -1.5,
        row_fill_ratio: 2.5,
    };

    /// Applies a partial update, returning the patched vector.
    #[must_use]
    pub fn patched(self, patch: &WeightPatch) -> Self {
        Self {
            landing_height: patch.landing_height.unwrap_or(self.landing_height),
            lines_cleared: patch.lines_cleared.unwrap_or(self.lines_cleared),
            potential_lines: patch.potential_lines.unwrap_or(self.potential_lines),
            row_transitions: patch.row_transitions.unwrap_or(self.row_transitions),
            column_transitions: patch.column_transitions.unwrap_or(self.column_transitions),
            holes: patch.holes.unwrap_or(self.holes),
            well_depth_sum: patch.well_depth_sum.unwrap_or(self.well_depth_sum),
            blocks_above_holes: patch.blocks_above_holes.unwrap_or(self.blocks_above_holes),
            well_open: patch.well_open.unwrap_or(self.well_open),
            escape_route: patch.escape_route.unwrap_or(self.escape_route),
            bumpiness: patch.bumpiness.unwrap_or(self.bumpiness),
            max_height: patch.max_height.unwrap_or(self.max_height),
            row_fill_ratio: patch.row_fill_ratio.unwrap_or(self.row_fill_ratio),
        }
    }
}

impl Default for WeightVector {
    fn default() -> Self {
        Self::DEFAULT
    }
}

/// Partial weight update; `None` fields keep their current value.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WeightPatch {
    pub landing_height: Option<f32>,
    pub lines_cleared: Option<f32>,
    pub potential_lines: Option<f32>,
    pub row_transitions: Option<f32>,
    pub column_transitions: Option<f32>,
    pub holes: Option<f32>,
    pub well_depth_sum: Option<f32>,
    pub blocks_above_holes: Option<f32>,
    pub well_open: Option<f32>,
    pub escape_route: Option<f32>,
    pub bumpiness: Option<f32>,
    pub max_height: Option<f32>,
    pub row_fill_ratio: Option<f32>,
}

/// Difficulty presets as deterministic overrides of the default vector.
///
/// Penalty magnitudes for holes, height, and bumpiness rise monotonically
/// with difficulty, as does the line-clear reward.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Difficulty {
    Easy,
    Medium,
    Hard,
    Expert,
}

impl Difficulty {
    #[must_use]
    pub fn weights(self) -> WeightVector {
        let patch = match self {
            Difficulty::Easy => WeightPatch {
                holes: Some(-4.0),
                max_height: Some(-1.0),
                bumpiness: Some(-0.5),
                lines_cleared: Some(40.0),
                ..WeightPatch::default()
            },
            Difficulty::Medium => WeightPatch::default(),
            Difficulty::Hard => WeightPatch {
                holes: Some(-9.0),
                max_height: Some(-2.0),
                bumpiness: Some(-1.5),
                lines_cleared: Some(70.0),
                ..WeightPatch::default()
            },
            Difficulty::Expert => WeightPatch {
                holes: Some(-12.0),
                max_height: Some(-2.5),
                bumpiness: Some(-2.0),
                lines_cleared: Some(80.0),
                ..WeightPatch::default()
            },
        };
        WeightVector::DEFAULT.patched(&patch)
    }
}

/// Board situations that call for re-weighting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Situation {
    Normal,
    /// The stack is tall enough that survival outweighs stacking quality.
    Danger,
}

/// Stack height at which the evaluator switches to danger weighting.
pub const DANGER_HEIGHT: u8 = 14;

/// Classifies the board; a pure function composed with the weight manager
/// rather than a mutation of it.
#[must_use]
pub fn situation(board: &BoardAnalysis) -> Situation {
    if board.max_height() >= DANGER_HEIGHT {
        Situation::Danger
    } else {
        Situation::Normal
    }
}

impl Situation {
    /// Applies the situational adjustment to a copied weight vector.
    #[must_use]
    pub fn adjust(self, weights: WeightVector) -> WeightVector {
        match self {
            Situation::Normal => weights,
            Situation::Danger => WeightVector {
                // Burying cells or growing the stack is what loses games
                // from here; flat, clearable surfaces are all that matters.
                holes: weights.holes * 1.5,
                max_height: weights.max_height * 1.5,
                landing_height: weights.landing_height * 1.5,
                lines_cleared: weights.lines_cleared * 1.25,
                ..weights
            },
        }
    }
}
