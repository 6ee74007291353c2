//! Typed indices into the mass-point arrays.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Opaque handle to a mass point.
///
/// Every per-point array in a [`ClothState`](crate::state::ClothState) is
/// index-aligned, so a `PointId` addresses positions, velocities, masses and
/// force buffers alike. Handles coming from outside the crate are checked
/// with [`ClothState::resolve`](crate::state::ClothState::resolve) before use.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PointId(u32);

impl PointId {
    /// Wrap a raw linear index
    pub const fn new(index: u32) -> Self {
        Self(index)
    }

    /// Linear address of grid cell `(col, row)` in a grid `cols` wide
    pub const fn from_grid(col: u32, row: u32, cols: u32) -> Self {
        Self(row * cols + col)
    }

    /// The raw index, for slicing into index-aligned arrays
    pub const fn index(self) -> usize {
        self.0 as usize
    }

    /// The raw index as stored in GPU-style index buffers
    pub const fn raw(self) -> u32 {
        self.0
    }

    /// Inverse of [`PointId::from_grid`]: `(col, row)`
    pub const fn grid_coords(self, cols: u32) -> (u32, u32) {
        (self.0 % cols, self.0 / cols)
    }
}

impl fmt::Display for PointId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}
