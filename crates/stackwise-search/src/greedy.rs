use arrayvec::ArrayVec;
use stackwise_engine::{PieceKind, enumerate_placements};
use stackwise_evaluator::{FeatureVector, WeightVector, score};

use crate::{Decision, SearchStrategy, Snapshot, effective_weights, swap_target};

/// Single-ply argmax over every legal placement of the active piece, plus
/// the reserve-swap branch when it is available.
///
/// Ties are broken by first-enumerated order (no-swap before swap,
/// rotation-major then column-major within a piece), which downstream
/// tests rely on for determinism.
#[derive(Debug, Clone)]
pub struct GreedySearch {
    weights: WeightVector,
}

impl GreedySearch {
    #[must_use]
    pub fn new(weights: WeightVector) -> Self {
        Self { weights }
    }
}

/// Candidate (piece, uses-swap) branches for one turn.
pub(crate) fn turn_branches(snapshot: &Snapshot) -> ArrayVec<(PieceKind, bool), 2> {
    let mut branches = ArrayVec::new();
    branches.push((snapshot.active, false));
    if snapshot.can_swap
        && let Some(kind) = swap_target(snapshot.reserve, snapshot.queue.first().copied())
    {
        branches.push((kind, true));
    }
    branches
}

impl SearchStrategy for GreedySearch {
    fn best_move(&self, snapshot: &Snapshot) -> Option<Decision> {
        let weights = effective_weights(&snapshot.board, self.weights);

        let mut best: Option<Decision> = None;
        for (kind, uses_swap) in turn_branches(snapshot) {
            for placement in enumerate_placements(&snapshot.board, kind) {
                let features = FeatureVector::extract(&snapshot.board, placement);
                let candidate = Decision {
                    placement,
                    uses_swap,
                    score: score(&features, &weights),
                };
                if best.is_none_or(|b| candidate.score > b.score) {
                    best = Some(candidate);
                }
            }
        }
        best
    }
}
