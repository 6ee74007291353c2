//! Spring topology for a rectangular cloth grid
//!
//! Every grid cell `(x, y)` looks at six "forward" neighbour offsets, so each
//! spring is emitted exactly once, from the endpoint that sees the other one
//! ahead of it:
//!
//! - **Structural**: `(x+1, y)`, `(x, y+1)`
//! - **Shear**: `(x-1, y+1)`, `(x+1, y+1)`
//! - **Flexion**: `(x+2, y)`, `(x, y+2)`
//!
//! Rest lengths are measured from the initial positions, so they stay exact
//! even if those positions are not a perfectly regular lattice.

use glam::{Vec2, Vec3};
use serde::{Deserialize, Serialize};

use crate::handle::PointId;

/// The role a spring plays in the cloth
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SpringKind {
    /// Direct horizontal/vertical neighbours; resists stretching
    Structural,
    /// Diagonal neighbours; resists in-plane shearing
    Shear,
    /// Skip-one neighbours; resists bending
    Flexion,
}

impl SpringKind {
    pub const ALL: [SpringKind; 3] = [Self::Structural, Self::Shear, Self::Flexion];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Structural => "structural",
            Self::Shear => "shear",
            Self::Flexion => "flexion",
        }
    }
}

/// Forward offsets scanned from every cell, with the spring kind they create
const NEIGHBOR_OFFSETS: [(i64, i64, SpringKind); 6] = [
    (1, 0, SpringKind::Structural),
    (0, 1, SpringKind::Structural),
    (-1, 1, SpringKind::Shear),
    (1, 1, SpringKind::Shear),
    (2, 0, SpringKind::Flexion),
    (0, 2, SpringKind::Flexion),
];

/// An elastic link between two mass points.
///
/// Springs are immutable after the build: the rest length is fixed even
/// though the simulated length changes every step.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Spring {
    /// First endpoint; receives `+force`
    pub a: PointId,
    /// Second endpoint; receives `-force`
    pub b: PointId,
    /// Distance between the endpoints at build time
    pub rest_length: f32,
    /// Spring constant
    pub stiffness: f32,
    pub kind: SpringKind,
}

impl Spring {
    /// Create a spring whose rest length is the current distance between
    /// `positions[a]` and `positions[b]`.
    ///
    /// # Panics
    ///
    /// If `a == b` or either endpoint is outside `positions`. Both indicate a
    /// bug in the caller building the topology.
    pub fn between(
        a: PointId,
        b: PointId,
        positions: &[Vec3],
        stiffness: f32,
        kind: SpringKind,
    ) -> Self {
        assert_ne!(a, b, "spring endpoints must differ");
        assert!(
            a.index() < positions.len() && b.index() < positions.len(),
            "spring {a}-{b} out of range for {} points",
            positions.len()
        );
        Self {
            a,
            b,
            rest_length: positions[a.index()].distance(positions[b.index()]),
            stiffness,
            kind,
        }
    }

    /// Current length given live positions
    pub fn length(&self, positions: &[Vec3]) -> f32 {
        positions[self.a.index()].distance(positions[self.b.index()])
    }

    /// Elastic energy `½ k (l - l0)²` at the given positions
    pub fn potential_energy(&self, positions: &[Vec3]) -> f32 {
        let stretch = self.length(positions) - self.rest_length;
        0.5 * self.stiffness * stretch * stretch
    }
}

/// Rest positions of a `cols × rows` grid.
///
/// Columns run along +X and rows along -Y from `origin`, so the cloth hangs
/// in the XY plane facing +Z.
pub fn grid_positions(cols: u32, rows: u32, spacing: Vec2, origin: Vec3) -> Vec<Vec3> {
    (0..rows)
        .flat_map(|row| {
            (0..cols).map(move |col| {
                origin + Vec3::new(col as f32 * spacing.x, -(row as f32) * spacing.y, 0.0)
            })
        })
        .collect()
}

/// Texture coordinates in `[0, 1]²`, index-aligned with [`grid_positions`]
pub fn grid_uvs(cols: u32, rows: u32) -> Vec<Vec2> {
    let norm = |i: u32, n: u32| if n > 1 { i as f32 / (n - 1) as f32 } else { 0.0 };
    (0..rows)
        .flat_map(|row| (0..cols).map(move |col| Vec2::new(norm(col, cols), norm(row, rows))))
        .collect()
}

/// Triangle list for the grid: two triangles per quad, split along the
/// `(c+1, r)`–`(c, r+1)` diagonal.
///
/// With `i0=(c,r)`, `i1=(c+1,r)`, `i2=(c,r+1)`, `i3=(c+1,r+1)` the triangles
/// are `(i0, i2, i1)` and `(i1, i2, i3)`; both wind so that the rest cloth's
/// normals point along +Z.
pub fn grid_triangles(cols: u32, rows: u32) -> Vec<u32> {
    if cols < 2 || rows < 2 {
        return Vec::new();
    }
    let mut indices = Vec::with_capacity(((cols - 1) * (rows - 1) * 6) as usize);
    for row in 0..rows - 1 {
        for col in 0..cols - 1 {
            let i0 = row * cols + col;
            let i1 = i0 + 1;
            let i2 = i0 + cols;
            let i3 = i2 + 1;
            indices.extend_from_slice(&[i0, i2, i1, i1, i2, i3]);
        }
    }
    indices
}

/// Generate structural, shear and flexion springs for the grid.
///
/// `positions` must hold `cols * rows` points in row-major order. Grids with
/// fewer than two points on an axis simply yield no springs along it.
pub fn build_springs(cols: u32, rows: u32, positions: &[Vec3], stiffness: f32) -> Vec<Spring> {
    assert_eq!(
        positions.len(),
        cols as usize * rows as usize,
        "positions do not match a {cols}x{rows} grid"
    );

    let (w, h) = (i64::from(cols), i64::from(rows));
    let mut springs = Vec::new();
    for y in 0..h {
        for x in 0..w {
            let a = PointId::from_grid(x as u32, y as u32, cols);
            for &(dx, dy, kind) in &NEIGHBOR_OFFSETS {
                let (nx, ny) = (x + dx, y + dy);
                if nx < 0 || nx >= w || ny >= h {
                    continue;
                }
                let b = PointId::from_grid(nx as u32, ny as u32, cols);
                springs.push(Spring::between(a, b, positions, stiffness, kind));
            }
        }
    }
    springs
}

/// Number of springs of each kind, in [`SpringKind::ALL`] order
pub fn count_by_kind(springs: &[Spring]) -> [(SpringKind, usize); 3] {
    SpringKind::ALL.map(|kind| (kind, springs.iter().filter(|s| s.kind == kind).count()))
}
