use rand::{Rng, distr::StandardUniform, prelude::Distribution};
use serde::{Deserialize, Serialize};

use crate::InvalidInput;
use crate::bit_board::{BitBoard, PIECE_SPAWN_X, PIECE_SPAWN_Y};

/// A falling-block piece with position, rotation, and type.
///
/// Pieces are immutable value objects; movement and rotation return new
/// `Piece` instances. Position is the top-left anchor of the piece's 4x4
/// mask in board coordinates (sentinel margins included).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Piece {
    position: PiecePosition,
    rotation: PieceRotation,
    kind: PieceKind,
}

impl Serialize for Piece {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        // Format: "kind#rotation@x,y" (e.g. "T#1@4,18")
        let s = format!(
            "{}#{}@{},{}",
            self.kind.as_char(),
            self.rotation.0,
            self.position.x,
            self.position.y
        );
        serializer.serialize_str(&s)
    }
}

impl<'de> Deserialize<'de> for Piece {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        let err = || {
            serde::de::Error::custom(format!("expected format 'kind#rotation@x,y', got '{s}'"))
        };

        let (kind_str, rest) = s.split_once('#').ok_or_else(err)?;
        let (rotation_str, position_str) = rest.split_once('@').ok_or_else(err)?;
        let (x_str, y_str) = position_str.split_once(',').ok_or_else(err)?;

        let mut kind_chars = kind_str.chars();
        let kind_char = kind_chars.next().ok_or_else(err)?;
        if kind_chars.next().is_some() {
            return Err(err());
        }
        let kind = PieceKind::from_char(kind_char).map_err(serde::de::Error::custom)?;

        let rotation_num = rotation_str.parse::<u8>().map_err(|e| {
            serde::de::Error::custom(format!("invalid rotation: {rotation_str} ({e})"))
        })?;
        let rotation = PieceRotation::new(rotation_num)
            .ok_or(InvalidInput::InvalidRotation(rotation_num))
            .map_err(serde::de::Error::custom)?;

        let x = x_str
            .parse::<u8>()
            .map_err(|e| serde::de::Error::custom(format!("invalid x position: {x_str} ({e})")))?;
        let y = y_str
            .parse::<u8>()
            .map_err(|e| serde::de::Error::custom(format!("invalid y position: {y_str} ({e})")))?;
        if usize::from(x) >= BitBoard::TOTAL_WIDTH || usize::from(y) >= BitBoard::TOTAL_HEIGHT {
            return Err(serde::de::Error::custom(format!(
                "position out of bounds: {x},{y}"
            )));
        }

        Ok(Piece {
            position: PiecePosition::new(x, y),
            rotation,
            kind,
        })
    }
}

impl Piece {
    #[must_use]
    pub fn new(kind: PieceKind) -> Self {
        Self {
            position: PiecePosition::SPAWN_POSITION,
            rotation: PieceRotation::default(),
            kind,
        }
    }

    #[must_use]
    pub fn at(kind: PieceKind, rotation: PieceRotation, position: PiecePosition) -> Self {
        Self {
            position,
            rotation,
            kind,
        }
    }

    #[must_use]
    pub fn position(&self) -> PiecePosition {
        self.position
    }

    #[must_use]
    pub fn rotation(&self) -> PieceRotation {
        self.rotation
    }

    #[must_use]
    pub fn kind(&self) -> PieceKind {
        self.kind
    }

    #[must_use]
    pub fn mask(&self) -> PieceMask {
        self.kind.mask(self.rotation)
    }

    /// Board coordinates of every cell the piece occupies.
    pub fn occupied_positions(&self) -> impl Iterator<Item = (usize, usize)> + '_ {
        let mask = self.mask();
        let x0 = self.position.x();
        let y0 = self.position.y();
        (0..4).flat_map(move |dy| {
            (0..4).filter_map(move |dx| {
                if mask[dy] & (1 << dx) != 0 {
                    Some((x0 + dx, y0 + dy))
                } else {
                    None
                }
            })
        })
    }

    #[must_use]
    pub fn down(&self) -> Option<Self> {
        let new_pos = self.position.down()?;
        Some(Self {
            position: new_pos,
            ..*self
        })
    }

    /// Simulates gravity: the lowest non-colliding position straight below.
    #[must_use]
    pub fn simulate_drop_position(&self, board: &BitBoard) -> Self {
        let mut dropped = *self;
        while let Some(piece) = dropped.down().filter(|m| !board.is_colliding(*m)) {
            dropped = piece;
        }
        dropped
    }
}

/// Position of a piece's 4x4 mask anchor on the board.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
pub struct PiecePosition {
    x: u8,
    y: u8,
}

impl PiecePosition {
    #[expect(clippy::cast_possible_truncation)]
    pub const SPAWN_POSITION: Self = Self::new(PIECE_SPAWN_X as u8, PIECE_SPAWN_Y as u8);

    #[must_use]
    pub const fn new(x: u8, y: u8) -> Self {
        assert!((x as usize) < BitBoard::TOTAL_WIDTH);
        assert!((y as usize) < BitBoard::TOTAL_HEIGHT);
        Self { x, y }
    }

    #[must_use]
    pub fn x(self) -> usize {
        usize::from(self.x)
    }

    #[must_use]
    pub fn y(self) -> usize {
        usize::from(self.y)
    }

    #[must_use]
    pub const fn down(&self) -> Option<Self> {
        if self.y as usize >= BitBoard::TOTAL_HEIGHT - 1 {
            None
        } else {
            Some(Self::new(self.x, self.y + 1))
        }
    }
}

/// Rotation state: 0 = spawn, then 90-degree clockwise steps, modulo 4.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PieceRotation(u8);

impl PieceRotation {
    #[must_use]
    pub const fn new(r: u8) -> Option<Self> {
        if r > 3 { None } else { Some(Self(r)) }
    }

    #[must_use]
    pub fn rotated_right(self) -> Self {
        PieceRotation((self.0 + 1) % 4)
    }

    #[must_use]
    pub fn index(self) -> u8 {
        self.0
    }

    const fn as_usize(self) -> usize {
        self.0 as usize
    }
}

/// The closed set of piece shapes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize, Serialize)]
#[repr(u8)]
pub enum PieceKind {
    I = 0,
    O = 1,
    S = 2,
    Z = 3,
    J = 4,
    L = 5,
    T = 6,
}

impl Distribution<PieceKind> for StandardUniform {
    fn sample<R: Rng + ?Sized>(&self, rng: &mut R) -> PieceKind {
        match rng.random_range(0..=6) {
            0 => PieceKind::I,
            1 => PieceKind::O,
            2 => PieceKind::S,
            3 => PieceKind::Z,
            4 => PieceKind::J,
            5 => PieceKind::L,
            _ => PieceKind::T,
        }
    }
}

impl PieceKind {
    /// Number of piece types (7).
    pub const LEN: usize = 7;

    pub const ALL: [Self; Self::LEN] = [
        Self::I,
        Self::O,
        Self::S,
        Self::Z,
        Self::J,
        Self::L,
        Self::T,
    ];

    pub(crate) fn mask(self, rotation: PieceRotation) -> PieceMask {
        PIECE_MASKS[self as usize][rotation.as_usize()]
    }

    /// Rotation states that produce distinct cell patterns. Enumerating
    /// beyond this count would only yield duplicate placements.
    #[must_use]
    pub const fn distinct_rotations(self) -> u8 {
        match self {
            PieceKind::O => 1,
            PieceKind::I | PieceKind::S | PieceKind::Z => 2,
            PieceKind::J | PieceKind::L | PieceKind::T => 4,
        }
    }

    /// Distinct rotations in enumeration order (rotation-major ordering for
    /// the move generator).
    pub fn rotations(self) -> impl Iterator<Item = PieceRotation> {
        (0..self.distinct_rotations()).map(PieceRotation)
    }

    #[must_use]
    pub const fn as_char(self) -> char {
        match self {
            PieceKind::I => 'I',
            PieceKind::O => 'O',
            PieceKind::S => 'S',
            PieceKind::Z => 'Z',
            PieceKind::J => 'J',
            PieceKind::L => 'L',
            PieceKind::T => 'T',
        }
    }

    pub const fn from_char(c: char) -> Result<Self, InvalidInput> {
        match c {
            'I' => Ok(PieceKind::I),
            'O' => Ok(PieceKind::O),
            'S' => Ok(PieceKind::S),
            'Z' => Ok(PieceKind::Z),
            'J' => Ok(PieceKind::J),
            'L' => Ok(PieceKind::L),
            'T' => Ok(PieceKind::T),
            _ => Err(InvalidInput::UnknownPieceKind(c)),
        }
    }
}

/// Bit pattern of a piece within its 4x4 bounding box, one 4-bit row per
/// element. Sparse per-row masks are what let pieces nest into gaps exposed
/// by previous clears: collision only tests cells the piece actually fills.
pub type PieceMask = [u16; 4];

/// Horizontal extent of a mask: `(min_dx, max_dx)` over its occupied cells.
#[must_use]
pub(crate) fn mask_x_span(mask: PieceMask) -> (usize, usize) {
    let combined = mask.iter().fold(0u16, |acc, row| acc | row);
    debug_assert_ne!(combined, 0);
    let min = combined.trailing_zeros() as usize;
    let max = 15 - combined.leading_zeros() as usize;
    (min, max)
}

/// Generates all 4 rotation states of a mask by rotating 90 degrees
/// clockwise within the piece's effective grid.
const fn mask_rotations(size: usize, mask: PieceMask) -> [PieceMask; 4] {
    let mut rotates = [mask; 4];
    let mut i = 1;
    while i < 4 {
        let mut new_mask = [0; 4];
        let mut y = 0;
        while y < size {
            let mut x = 0;
            while x < size {
                if (rotates[i - 1][size - 1 - x] & (1 << y)) != 0 {
                    new_mask[y] |= 1 << x;
                }
                x += 1;
            }
            y += 1;
        }
        rotates[i] = new_mask;
        i += 1;
    }
    rotates
}

const PIECE_MASKS: [[PieceMask; 4]; PieceKind::LEN] = {
    const fn m(bits: [bool; 4]) -> u16 {
        let mut mask = 0;
        let mut i = 0;
        while i < 4 {
            if bits[i] {
                mask |= 1 << i;
            }
            i += 1;
        }
        mask
    }

    const C: bool = true;
    const E: bool = false;
    const EEEE: u16 = m([E; 4]);

    [
        // I-piece
        mask_rotations(4, [EEEE, m([C, C, C, C]), EEEE, EEEE]),
        // O-piece
        mask_rotations(2, [m([C, C, E, E]), m([C, C, E, E]), EEEE, EEEE]),
        // S-piece
        mask_rotations(3, [m([E, C, C, E]), m([C, C, E, E]), EEEE, EEEE]),
        // Z-piece
        mask_rotations(3, [m([C, C, E, E]), m([E, C, C, E]), EEEE, EEEE]),
        // J-piece
        mask_rotations(3, [m([C, E, E, E]), m([C, C, C, E]), EEEE, EEEE]),
        // L-piece
        mask_rotations(3, [m([E, E, C, E]), m([C, C, C, E]), EEEE, EEEE]),
        // T-piece
        mask_rotations(3, [m([E, C, E, E]), m([C, C, C, E]), EEEE, EEEE]),
    ]
};
