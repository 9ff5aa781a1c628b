use stackwise_engine::{BitBoard, PieceKind, enumerate_placements};
use stackwise_evaluator::{FeatureVector, WeightVector, score};

use crate::{Decision, SearchStrategy, Snapshot, effective_weights, swap_target};

pub const DEFAULT_BEAM_WIDTH: usize = 5;
pub const DEFAULT_BEAM_DEPTH: usize = 3;
/// Fraction of beam slots reserved for first-move diversity.
pub const DEFAULT_DIVERSITY: f32 = 0.2;

/// One partial line of play: the board after N plies, the next piece to
/// place, the reserve content, the accumulated score, and the first move
/// taken. Nodes live for exactly one expansion round; only the top-scoring
/// ones are carried into the next ply, the rest are discarded.
#[derive(Debug, Clone)]
struct SearchNode {
    board: BitBoard,
    /// Piece to place in the next expansion; `None` once the known piece
    /// horizon is exhausted.
    active: Option<PieceKind>,
    /// Index of the next unconsumed entry in the snapshot queue.
    queue_index: usize,
    reserve: Option<PieceKind>,
    score: f32,
    first: Option<Decision>,
}

impl SearchNode {
    fn first_placement(&self) -> Option<(stackwise_engine::Piece, bool)> {
        self.first.map(|d| (d.placement, d.uses_swap))
    }
}

/// Bounded-width, bounded-depth lookahead over placement sequences.
///
/// Each ply expands every surviving node with all placements of its next
/// known piece plus a reserve-swap branch, scores the simulated boards,
/// merges the children, and keeps the best `width`. The first-ply move of
/// the best surviving node is returned. With `width = 1, depth = 1` this
/// chooses exactly what [`GreedySearch`](crate::GreedySearch) chooses.
#[derive(Debug, Clone)]
pub struct BeamSearch {
    weights: WeightVector,
    width: usize,
    depth: usize,
    diversity: f32,
}

impl BeamSearch {
    #[must_use]
    pub fn new(weights: WeightVector) -> Self {
        Self::with_params(
            weights,
            DEFAULT_BEAM_WIDTH,
            DEFAULT_BEAM_DEPTH,
            DEFAULT_DIVERSITY,
        )
    }

    /// # Panics
    ///
    /// Panics if `width` or `depth` is zero or `diversity` is outside
    /// `0.0..=1.0`.
    #[must_use]
    pub fn with_params(weights: WeightVector, width: usize, depth: usize, diversity: f32) -> Self {
        assert!(width > 0 && depth > 0);
        assert!((0.0..=1.0).contains(&diversity));
        Self {
            weights,
            width,
            depth,
            diversity,
        }
    }

    /// Expands one node into every child reachable by placing its active
    /// piece as-is or through the reserve swap.
    fn expand(&self, snapshot: &Snapshot, node: &SearchNode, out: &mut Vec<SearchNode>) {
        let Some(active) = node.active else {
            // The piece horizon ran out one ply earlier for this line than
            // for its siblings (an empty-reserve swap consumed an extra
            // queue entry). The line is complete, not dead: it keeps
            // competing on its score against the longer lines.
            out.push(node.clone());
            return;
        };
        let weights = effective_weights(&node.board, self.weights);

        // Branch 1: place the active piece; the reserve is untouched and
        // the next queued piece becomes active.
        self.expand_branch(snapshot, node, active, false, node.reserve, node.queue_index, &weights, out);

        // Branch 2: swap with the reserve slot. An empty reserve absorbs
        // the active piece and the swap plays the next queued piece
        // instead, consuming one extra queue entry. The first ply honors
        // the host's swap availability; later plies each place a piece, so
        // the once-per-opportunity rule holds per ply by construction.
        let swap_allowed = node.first.is_some() || snapshot.can_swap;
        if swap_allowed
            && let Some(swapped_in) =
                swap_target(node.reserve, snapshot.queue.get(node.queue_index).copied())
        {
            let extra = usize::from(node.reserve.is_none());
            self.expand_branch(
                snapshot,
                node,
                swapped_in,
                true,
                Some(active),
                node.queue_index + extra,
                &weights,
                out,
            );
        }
    }

    #[expect(clippy::too_many_arguments)]
    fn expand_branch(
        &self,
        snapshot: &Snapshot,
        node: &SearchNode,
        kind: PieceKind,
        uses_swap: bool,
        reserve_after: Option<PieceKind>,
        queue_index: usize,
        weights: &WeightVector,
        out: &mut Vec<SearchNode>,
    ) {
        let child_active = snapshot.queue.get(queue_index).copied();
        let child_queue_index = queue_index + usize::from(child_active.is_some());

        for placement in enumerate_placements(&node.board, kind) {
            let features = FeatureVector::extract(&node.board, placement);
            let cumulative = node.score + score(&features, weights);

            let mut board = node.board.clone();
            board.fill_piece(placement);
            let _cleared = board.clear_lines();

            let first = match node.first {
                Some(first) => first,
                None => Decision {
                    placement,
                    uses_swap,
                    score: cumulative,
                },
            };

            out.push(SearchNode {
                board,
                active: child_active,
                queue_index: child_queue_index,
                reserve: reserve_after,
                score: cumulative,
                first: Some(first),
            });
        }
    }

    /// Keeps the `width` best children. A fraction of the slots is
    /// reserved for the best nodes whose first move is not represented
    /// among the globally top-scoring ones, to avoid the whole beam
    /// converging on a single opening placement.
    fn prune(&self, mut children: Vec<SearchNode>) -> Vec<SearchNode> {
        // Stable sort: equal scores keep enumeration order, which is what
        // makes the width-1 beam agree with greedy tie-breaking.
        children.sort_by(|a, b| b.score.total_cmp(&a.score));
        if children.len() <= self.width {
            return children;
        }

        #[expect(clippy::cast_precision_loss, clippy::cast_possible_truncation, clippy::cast_sign_loss)]
        let diversity_slots = (self.diversity * self.width as f32).floor() as usize;
        let top_slots = self.width - diversity_slots;
        if diversity_slots == 0 {
            children.truncate(self.width);
            return children;
        }

        let mut kept: Vec<SearchNode> = Vec::with_capacity(self.width);
        let mut skipped: Vec<SearchNode> = Vec::new();
        for child in children {
            if kept.len() < top_slots {
                kept.push(child);
                continue;
            }
            if kept.len() < self.width {
                let first = child.first_placement();
                let seen = kept.iter().any(|k| k.first_placement() == first);
                if seen {
                    skipped.push(child);
                } else {
                    kept.push(child);
                }
            }
        }

        // Not enough distinct first moves: fall back to global order.
        for child in skipped {
            if kept.len() >= self.width {
                break;
            }
            kept.push(child);
        }
        kept.sort_by(|a, b| b.score.total_cmp(&a.score));
        kept
    }
}

impl SearchStrategy for BeamSearch {
    fn best_move(&self, snapshot: &Snapshot) -> Option<Decision> {
        let root = SearchNode {
            board: snapshot.board.clone(),
            active: Some(snapshot.active),
            queue_index: 0,
            reserve: snapshot.reserve,
            score: 0.0,
            first: None,
        };

        let mut beam = vec![root];
        for _ply in 0..self.depth {
            let mut children = Vec::new();
            for node in &beam {
                self.expand(snapshot, node, &mut children);
            }
            if children.is_empty() {
                // Either no legal move at the root, or every surviving
                // line is stuck; answer from what is already known.
                break;
            }
            beam = self.prune(children);

            if beam.iter().all(|n| n.active.is_none()) {
                // Piece bag exhausted: terminate at the known horizon.
                break;
            }
        }

        let top = beam.into_iter().next()?;
        let first = top.first?;
        Some(Decision {
            score: top.score,
            ..first
        })
    }
}
