//! Positional evaluation for piece placements.
//!
//! The evaluator turns a hypothetical placement into a scalar score in three
//! steps:
//!
//! 1. [`BoardAnalysis`] lazily computes structural metrics (heights, holes,
//!    transitions, wells) for a board snapshot.
//! 2. [`FeatureVector::extract`] simulates the placement on a cloned board
//!    and collects the thirteen named features. Lines cleared come from the
//!    clear step; all structural features are measured on the *pre-clear*
//!    board, since that is the structural consequence of the placement
//!    choice rather than the post-clear residue.
//! 3. [`score`] reduces features and a [`WeightVector`] to one number.
//!
//! Weights are owned by the immutable-functional [`WeightManager`];
//! [`situation`] supplies danger-mode re-weighting without mutating it.

pub use self::{
    board_analysis::BoardAnalysis,
    features::{FeatureVector, score},
    weight_manager::{ExternalWeightSource, WeightLoadError, WeightManager},
    weights::{Difficulty, Situation, WeightPatch, WeightVector, situation},
};

mod board_analysis;
mod features;
mod weight_manager;
mod weights;
