use crate::{
    bit_board::{BitBoard, PIECE_SPAWN_Y, SENTINEL_MARGIN_LEFT},
    piece::{Piece, PieceKind, PiecePosition, mask_x_span},
};

/// Enumerates every legal resting placement for `kind` on `board`.
///
/// Enumeration is rotation-major, then column-major left to right, and that
/// order is part of the contract: downstream argmax selection breaks ties
/// by first-enumerated placement, so reordering here changes decisions.
///
/// For each (rotation, column) the piece is spawned above the playable area
/// and gravity-scanned downward with per-row sparse masks; the landing row
/// is the last non-colliding one. A column whose spawn cell is already
/// blocked contributes nothing. An empty result means the board has no
/// legal move for this piece, which callers must treat as "board full",
/// not as an error.
#[must_use]
pub fn enumerate_placements(board: &BitBoard, kind: PieceKind) -> Vec<Piece> {
    let mut placements = Vec::new();
    for rotation in kind.rotations() {
        let mask = kind.mask(rotation);
        let (min_dx, max_dx) = mask_x_span(mask);

        // Anchor range keeping every occupied cell inside the playable
        // columns. min_dx can exceed the left margin only for masks wider
        // than the board, which do not exist.
        let x_first = SENTINEL_MARGIN_LEFT.saturating_sub(min_dx);
        let x_last = SENTINEL_MARGIN_LEFT + BitBoard::PLAYABLE_WIDTH - 1 - max_dx;

        for x0 in x_first..=x_last {
            let spawned = Piece::at(
                kind,
                rotation,
                PiecePosition::new(
                    u8::try_from(x0).unwrap(),
                    u8::try_from(PIECE_SPAWN_Y).unwrap(),
                ),
            );
            if board.is_colliding(spawned) {
                continue;
            }
            let landed = spawned.simulate_drop_position(board);
            // A piece resting above the playable rows is a top-out, not a
            // placement.
            if landed
                .occupied_positions()
                .all(|(_x, y)| BitBoard::PLAYABLE_Y_RANGE.contains(&y))
            {
                placements.push(landed);
            }
        }
    }
    placements
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn placement_counts_on_empty_board() {
        let board = BitBoard::INITIAL;

        // rotations x reachable columns for each piece shape
        let expected = [
            (PieceKind::I, 7 + 10),
            (PieceKind::O, 9),
            (PieceKind::S, 8 + 9),
            (PieceKind::Z, 8 + 9),
            (PieceKind::J, 8 + 9 + 8 + 9),
            (PieceKind::L, 8 + 9 + 8 + 9),
            (PieceKind::T, 8 + 9 + 8 + 9),
        ];
        for (kind, count) in expected {
            assert_eq!(
                enumerate_placements(&board, kind).len(),
                count,
                "{kind:?}"
            );
        }
    }

    #[test]
    fn placements_satisfy_resting_invariant() {
        let boards = [
            BitBoard::INITIAL,
            BitBoard::from_ascii(
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
                ....##....
                ....##....
                ##....####
                ##.#..####
                ##.#..####
                ",
            ),
        ];

        for board in &boards {
            for kind in PieceKind::ALL {
                for placement in enumerate_placements(board, kind) {
                    assert!(
                        !board.is_colliding(placement),
                        "{kind:?} placement overlaps the stack"
                    );
                    let below = placement.down().expect("landed piece has a row below");
                    assert!(
                        board.is_colliding(below),
                        "{kind:?} placement floats above its landing row"
                    );
                }
            }
        }
    }

    #[test]
    fn enumeration_is_rotation_major_then_column_major() {
        let board = BitBoard::INITIAL;
        let placements = enumerate_placements(&board, PieceKind::T);

        let mut previous: Option<(u8, usize)> = None;
        for p in placements {
            let key = (p.rotation().index(), p.position().x());
            if let Some(prev) = previous {
                assert!(key > prev, "enumeration order regressed: {prev:?} -> {key:?}");
            }
            previous = Some(key);
        }
    }

    #[test]
    fn vertical_piece_nests_into_narrow_well() {
        // A 1-wide well of depth 4 at the left edge. Only the sparse per-row
        // masks allow the vertical I to reach the bottom; a bounding-box
        // collision test would hit the neighboring stacks.
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
            .#########
            .#########
            .#########
            .#########
            ",
        );

        let placements = enumerate_placements(&board, PieceKind::I);
        let well_fill = placements
            .iter()
            .find(|p| {
                p.occupied_positions()
                    .all(|(x, _y)| x == SENTINEL_MARGIN_LEFT)
            })
            .expect("vertical I must reach the well column");

        let ys: Vec<usize> = well_fill.occupied_positions().map(|(_x, y)| y).collect();
        let bottom = BitBoard::PLAYABLE_Y_RANGE.end - 1;
        assert_eq!(ys, vec![bottom - 3, bottom - 2, bottom - 1, bottom]);
    }

    #[test]
    fn blocked_board_yields_no_placements() {
        // Stacks reach the top everywhere: any drop would rest above the
        // playable rows.
        let board = BitBoard::from_ascii(&"##########\n".repeat(20));

        for kind in PieceKind::ALL {
            assert!(
                enumerate_placements(&board, kind).is_empty(),
                "{kind:?} should have no legal placement on a full board"
            );
        }
    }
}
