//! Board representation and move enumeration for a falling-block puzzle.
//!
//! This crate owns the bit-packed board ([`BitBoard`]), the piece geometry
//! table ([`PieceKind`] / [`Piece`]), and exhaustive placement enumeration
//! ([`enumerate_placements`]). Everything here is a pure function of the
//! bits: boards are cloned before any hypothetical mutation, so many
//! simulations can run from one shared base board without interference.

pub use self::{bit_board::*, piece::*, placement::*};

pub(crate) mod bit_board;
pub(crate) mod piece;
pub(crate) mod placement;

/// A board snapshot or piece failed basic shape validation.
#[derive(Debug, derive_more::Display, derive_more::Error)]
pub enum InvalidInput {
    #[display("unknown piece kind: {_0}")]
    UnknownPieceKind(#[error(not(source))] char),
    #[display("rotation must be 0-3, got {_0}")]
    InvalidRotation(#[error(not(source))] u8),
}
