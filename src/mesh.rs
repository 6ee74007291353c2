//! Render-facing mesh data
//!
//! The simulation hands its deformed surface to a renderer through these
//! types only: borrowed buffers for zero-copy reads, an interleaved
//! [`MeshVertex`] for direct GPU upload, and an owned [`MeshSnapshot`] for
//! export.

use bytemuck::{Pod, Zeroable};
use glam::{Vec2, Vec3};
use serde::{Deserialize, Serialize};

/// A vertex with position, normal and texture coordinate.
///
/// `repr(C)` so it can be cast straight into a vertex buffer.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Pod, Zeroable)]
pub struct MeshVertex {
    pub position: [f32; 3],
    pub normal: [f32; 3],
    pub uv: [f32; 2],
}

impl MeshVertex {
    pub fn new(position: Vec3, normal: Vec3, uv: Vec2) -> Self {
        Self {
            position: position.to_array(),
            normal: normal.to_array(),
            uv: uv.to_array(),
        }
    }
}

/// Borrowed view of the live mesh buffers, all index-aligned with positions
#[derive(Debug, Clone, Copy)]
pub struct MeshView<'a> {
    pub positions: &'a [Vec3],
    pub normals: &'a [Vec3],
    pub uvs: &'a [Vec2],
    /// Flat triangle list, three indices per triangle
    pub indices: &'a [u32],
}

impl MeshView<'_> {
    pub fn vertex_count(&self) -> usize {
        self.positions.len()
    }

    pub fn triangle_count(&self) -> usize {
        self.indices.len() / 3
    }

    /// Iterate over triangles as index triples
    pub fn triangles(&self) -> impl Iterator<Item = [u32; 3]> + '_ {
        self.indices.chunks_exact(3).map(|t| [t[0], t[1], t[2]])
    }

    /// Copy the buffers out for serialization
    pub fn to_snapshot(&self) -> MeshSnapshot {
        MeshSnapshot {
            positions: self.positions.to_vec(),
            normals: self.normals.to_vec(),
            uvs: self.uvs.to_vec(),
            indices: self.indices.to_vec(),
        }
    }
}

/// Owned mesh, as written by the exporters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MeshSnapshot {
    pub positions: Vec<Vec3>,
    pub normals: Vec<Vec3>,
    pub uvs: Vec<Vec2>,
    pub indices: Vec<u32>,
}
