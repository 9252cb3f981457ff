//! Puzzle piece definitions and coordinate types.
//!
//! A piece is a set of unit voxel positions on the (x, z) grid. The puzzle is
//! planar in the sliding axes; height is uniform. Shapes are created once at
//! import time and shared immutably between configurations via `Rc` — only the
//! per-configuration placement offset changes as pieces slide.

use std::rc::Rc;

/// A 2D grid cell in piece-local coordinates.
pub type Voxel = (i32, i32);

/// An immutable piece shape: the voxels it occupies before any translation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Piece {
    pub voxels: Vec<Voxel>,
}

impl Piece {
    pub fn new(voxels: Vec<Voxel>) -> Rc<Self> {
        Rc::new(Self { voxels })
    }
}

/// Per-configuration placement of a piece: a translation applied to all of its
/// voxels to obtain world-grid coordinates.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PieceState {
    pub offset_x: i32,
    pub offset_z: i32,
}

impl PieceState {
    pub fn new(offset_x: i32, offset_z: i32) -> Self {
        Self { offset_x, offset_z }
    }

    /// The placement shifted by `steps` unit moves of `(dx, dz)`.
    pub fn translated(self, dx: i32, dz: i32, steps: i32) -> Self {
        Self {
            offset_x: self.offset_x + dx * steps,
            offset_z: self.offset_z + dz * steps,
        }
    }
}

/// A piece together with its placement inside one configuration.
#[derive(Debug, Clone)]
pub struct PlacedPiece {
    pub piece: Rc<Piece>,
    pub state: PieceState,
}

impl PlacedPiece {
    pub fn new(piece: Rc<Piece>) -> Self {
        Self {
            piece,
            state: PieceState::default(),
        }
    }

    /// Iterates the piece's voxels in world-grid coordinates.
    pub fn world_voxels(&self) -> impl Iterator<Item = Voxel> + '_ {
        self.piece
            .voxels
            .iter()
            .map(move |&(x, z)| (x + self.state.offset_x, z + self.state.offset_z))
    }
}

/// Three side-by-side vertical bars. Every outer bar slides straight out, so
/// each disassembly move has depth 1.
pub const TRIPLE_BAR: &str = "\
271828
3
3
0 0
0 1
0 2
3
1 0
1 1
1 2
3
2 0
2 1
2 2
";

/// A frame with a plug trapped in a pocket. The plug must slide one step
/// sideways before it can drop out through the bottom gap, so the shortest
/// first disassembly move has depth 2.
pub const POCKET: &str = "\
271828
2
9
0 0
1 0
3 0
0 1
3 1
0 2
1 2
2 2
3 2
1
1 1
";

/// A wider frame holding two plugs in one cavity with a single offset exit.
/// Both plugs have to shuffle along the cavity before dropping out, which
/// gives the search several phases with non-trivial kernels.
pub const DOUBLE_POCKET: &str = "\
271828
3
11
0 0
1 0
2 0
4 0
0 1
4 1
0 2
1 2
2 2
3 2
4 2
1
1 1
1
2 1
";
