//! Mass-point state of a built cloth
//!
//! Points are stored as parallel arrays (structure of arrays) so the force and
//! integration passes stream through contiguous `Vec3` buffers. Every array is
//! index-aligned with the others and addressed through [`PointId`].

use glam::{Vec2, Vec3};
use serde::Serialize;

use crate::config::ClothConfig;
use crate::error::{ClothError, ClothResult};
use crate::handle::PointId;
use crate::mesh::{MeshSnapshot, MeshVertex, MeshView};
use crate::normals;
use crate::topology::{self, Spring};

/// Normal assigned to every point before the first normal pass
pub const DEFAULT_NORMAL: Vec3 = Vec3::Z;

/// A snapshot of one mass point, assembled from the parallel arrays
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct MassPoint {
    pub id: PointId,
    pub mass: f32,
    pub position: Vec3,
    pub velocity: Vec3,
    pub acceleration: Vec3,
    pub normal: Vec3,
    /// `false` for pinned points, which the integrator never moves
    pub is_simulated: bool,
}

/// The complete simulated state of one cloth
#[derive(Debug, Clone)]
pub struct ClothState {
    cols: u32,
    rows: u32,
    spacing: Vec2,

    pub(crate) positions: Vec<Vec3>,
    pub(crate) velocities: Vec<Vec3>,
    pub(crate) accelerations: Vec<Vec3>,
    pub(crate) normals: Vec<Vec3>,
    pub(crate) masses: Vec<f32>,
    pub(crate) simulated: Vec<bool>,

    springs: Vec<Spring>,
    uvs: Vec<Vec2>,
    indices: Vec<u32>,
}

impl ClothState {
    /// Lay out the rest grid, pin the anchors and build the springs.
    ///
    /// The configuration is validated first; nothing is allocated for an
    /// invalid one.
    pub fn build(config: &ClothConfig) -> ClothResult<Self> {
        config.validate()?;

        let (cols, rows) = (config.cols(), config.rows());
        let count = config.point_count();
        let spacing = config.spacing();

        let positions = topology::grid_positions(cols, rows, spacing, config.origin);
        let springs = topology::build_springs(cols, rows, &positions, config.stiffness);

        let mut simulated = vec![true; count];
        for id in config.pinned_points() {
            simulated[id.index()] = false;
        }

        let mut state = Self {
            cols,
            rows,
            spacing,
            positions,
            velocities: vec![Vec3::ZERO; count],
            accelerations: vec![Vec3::ZERO; count],
            normals: vec![DEFAULT_NORMAL; count],
            masses: vec![config.point_mass(); count],
            simulated,
            springs,
            uvs: topology::grid_uvs(cols, rows),
            indices: topology::grid_triangles(cols, rows),
        };
        state.update_normals();
        Ok(state)
    }

    /// Grid dimensions `(cols, rows)`
    pub fn grid_size(&self) -> (u32, u32) {
        (self.cols, self.rows)
    }

    /// Rest distance between neighbours along x and y
    pub fn spacing(&self) -> Vec2 {
        self.spacing
    }

    pub fn point_count(&self) -> usize {
        self.positions.len()
    }

    /// Check that `id` addresses a live point and return its raw index
    pub fn resolve(&self, id: PointId) -> ClothResult<usize> {
        let index = id.index();
        if index < self.point_count() {
            Ok(index)
        } else {
            Err(ClothError::InvalidPoint {
                id,
                count: self.point_count(),
            })
        }
    }

    /// Assemble a [`MassPoint`] view of one point
    pub fn point(&self, id: PointId) -> ClothResult<MassPoint> {
        let i = self.resolve(id)?;
        Ok(self.point_at(i))
    }

    fn point_at(&self, i: usize) -> MassPoint {
        MassPoint {
            id: PointId::new(i as u32),
            mass: self.masses[i],
            position: self.positions[i],
            velocity: self.velocities[i],
            acceleration: self.accelerations[i],
            normal: self.normals[i],
            is_simulated: self.simulated[i],
        }
    }

    /// Iterate over all points in index order
    pub fn points(&self) -> impl Iterator<Item = MassPoint> + '_ {
        (0..self.point_count()).map(|i| self.point_at(i))
    }

    pub fn positions(&self) -> &[Vec3] {
        &self.positions
    }

    pub fn velocities(&self) -> &[Vec3] {
        &self.velocities
    }

    pub fn accelerations(&self) -> &[Vec3] {
        &self.accelerations
    }

    pub fn normals(&self) -> &[Vec3] {
        &self.normals
    }

    pub fn masses(&self) -> &[f32] {
        &self.masses
    }

    pub fn springs(&self) -> &[Spring] {
        &self.springs
    }

    /// Whether the point takes part in integration
    pub fn is_simulated(&self, id: PointId) -> ClothResult<bool> {
        Ok(self.simulated[self.resolve(id)?])
    }

    /// Ids of all pinned points, ascending
    pub fn pinned(&self) -> Vec<PointId> {
        self.simulated
            .iter()
            .enumerate()
            .filter(|&(_, &sim)| !sim)
            .map(|(i, _)| PointId::new(i as u32))
            .collect()
    }

    /// Fix a point in space. Its velocity and acceleration are left as they
    /// were; the integrator simply stops touching them.
    pub fn pin(&mut self, id: PointId) -> ClothResult<()> {
        let i = self.resolve(id)?;
        self.simulated[i] = false;
        Ok(())
    }

    /// Release a pinned point back into the simulation, at rest
    pub fn unpin(&mut self, id: PointId) -> ClothResult<()> {
        let i = self.resolve(id)?;
        if !self.simulated[i] {
            self.velocities[i] = Vec3::ZERO;
            self.accelerations[i] = Vec3::ZERO;
        }
        self.simulated[i] = true;
        Ok(())
    }

    /// Move a point (e.g. while dragging it) and stop it dead
    pub fn set_position(&mut self, id: PointId, position: Vec3) -> ClothResult<()> {
        let i = self.resolve(id)?;
        self.positions[i] = position;
        self.velocities[i] = Vec3::ZERO;
        Ok(())
    }

    /// Recompute vertex normals from the current positions
    pub fn update_normals(&mut self) {
        normals::update_normals(&self.positions, &self.indices, &mut self.normals);
    }

    /// Kinetic energy of the free points
    pub fn kinetic_energy(&self) -> f32 {
        self.velocities
            .iter()
            .zip(&self.masses)
            .zip(&self.simulated)
            .filter(|&(_, &sim)| sim)
            .map(|((v, m), _)| 0.5 * m * v.length_squared())
            .sum()
    }

    /// Elastic energy stored in all springs
    pub fn potential_energy(&self) -> f32 {
        self.springs
            .iter()
            .map(|s| s.potential_energy(&self.positions))
            .sum()
    }

    /// Borrow the render-facing buffers
    pub fn mesh(&self) -> MeshView<'_> {
        MeshView {
            positions: &self.positions,
            normals: &self.normals,
            uvs: &self.uvs,
            indices: &self.indices,
        }
    }

    /// Interleaved vertices ready for a vertex buffer
    pub fn vertices(&self) -> Vec<MeshVertex> {
        self.positions
            .iter()
            .zip(&self.normals)
            .zip(&self.uvs)
            .map(|((&p, &n), &uv)| MeshVertex::new(p, n, uv))
            .collect()
    }

    /// Owned copy of the mesh for export
    pub fn snapshot(&self) -> MeshSnapshot {
        self.mesh().to_snapshot()
    }

    /// Spring endpoint pairs, for debug line rendering
    pub fn debug_lines(&self) -> Vec<[u32; 2]> {
        self.springs.iter().map(|s| [s.a.raw(), s.b.raw()]).collect()
    }
}
