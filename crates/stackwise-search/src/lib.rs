//! Move selection strategies.
//!
//! Two interchangeable policies behind [`SearchStrategy`]: a single-ply
//! [`GreedySearch`] and a bounded-width, bounded-depth [`BeamSearch`] that
//! plans across the piece queue and the reserve slot. Both consume an
//! immutable [`Snapshot`] and yield an optional [`Decision`]; an empty
//! result means the board has no legal move, which is an answer, not an
//! error.

use serde::{Deserialize, Serialize};
use stackwise_engine::{BitBoard, Piece, PieceKind};
use stackwise_evaluator::{BoardAnalysis, WeightVector, situation};

pub use self::{beam::BeamSearch, greedy::GreedySearch};

mod beam;
mod greedy;

/// Everything a search episode may look at, copied out of the host's game
/// state. Strategies never see live game objects.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    pub board: BitBoard,
    /// The piece that must be acted on this turn.
    pub active: PieceKind,
    /// Upcoming pieces, nearest first. May be empty; lookahead stops at the
    /// known horizon.
    #[serde(default)]
    pub queue: Vec<PieceKind>,
    /// Content of the reserve (hold) slot, if any.
    #[serde(default)]
    pub reserve: Option<PieceKind>,
    /// Whether the reserve swap is still available this turn.
    #[serde(default)]
    pub can_swap: bool,
}

impl Snapshot {
    #[must_use]
    pub fn new(board: BitBoard, active: PieceKind) -> Self {
        Self {
            board,
            active,
            queue: Vec::new(),
            reserve: None,
            can_swap: false,
        }
    }
}

/// A chosen action: where the first piece goes and whether the reserve
/// swap is used to get it. Immutable; owned by the caller after return.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Decision {
    pub placement: Piece,
    pub uses_swap: bool,
    pub score: f32,
}

/// Search policy selector carried over the wire.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SearchMode {
    Greedy,
    #[default]
    Beam,
}

pub trait SearchStrategy: Send + Sync {
    /// Picks the best first move for the snapshot, or `None` when no legal
    /// placement exists (board effectively full).
    fn best_move(&self, snapshot: &Snapshot) -> Option<Decision>;
}

/// Builds the strategy for a wire-selected mode with the given weights.
#[must_use]
pub fn make_strategy(mode: SearchMode, weights: WeightVector) -> Box<dyn SearchStrategy> {
    match mode {
        SearchMode::Greedy => Box::new(GreedySearch::new(weights)),
        SearchMode::Beam => Box::new(BeamSearch::new(weights)),
    }
}

/// Base weights adjusted for the board's situation (danger re-weighting).
pub(crate) fn effective_weights(board: &BitBoard, base: WeightVector) -> WeightVector {
    situation(&BoardAnalysis::from_board(board)).adjust(base)
}

/// The piece placed when swapping, given the node's reserve and queue view:
/// the reserved piece if one exists, otherwise the next queued piece.
pub(crate) fn swap_target(reserve: Option<PieceKind>, next_queued: Option<PieceKind>) -> Option<PieceKind> {
    reserve.or(next_queued)
}
