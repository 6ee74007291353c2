//! Per-vertex normals for a triangulated cloth
//!
//! Each triangle adds its unnormalized face normal (twice its area times the
//! unit normal) to all three corners, so larger faces weigh more. Every
//! accumulator is normalized once at the end of the pass.

use glam::Vec3;

/// Accumulated normals shorter than this are treated as degenerate
pub const NORMAL_EPSILON: f32 = 1e-12;

/// Area-weighted face normal `(b - a) × (c - a)`
pub fn face_normal(a: Vec3, b: Vec3, c: Vec3) -> Vec3 {
    (b - a).cross(c - a)
}

/// Recompute `normals` from `positions` and the flat triangle list.
///
/// A vertex whose accumulated normal vanishes (not referenced by any
/// triangle, or surrounded only by collapsed triangles) keeps its previous
/// normal, so every entry stays unit length once it has been set.
///
/// # Panics
///
/// If `normals` is not index-aligned with `positions`, or a triangle index is
/// out of range.
pub fn update_normals(positions: &[Vec3], indices: &[u32], normals: &mut [Vec3]) {
    assert_eq!(
        positions.len(),
        normals.len(),
        "normals must be index-aligned with positions"
    );

    let mut accum = vec![Vec3::ZERO; positions.len()];
    for tri in indices.chunks_exact(3) {
        let [a, b, c] = [tri[0] as usize, tri[1] as usize, tri[2] as usize];
        let n = face_normal(positions[a], positions[b], positions[c]);
        accum[a] += n;
        accum[b] += n;
        accum[c] += n;
    }

    for (normal, sum) in normals.iter_mut().zip(accum) {
        if sum.length_squared() > NORMAL_EPSILON {
            *normal = sum.normalize();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::topology::{grid_positions, grid_triangles};
    use glam::Vec2;

    #[test]
    fn flat_grid_normals_point_up_z() {
        let positions = grid_positions(4, 3, Vec2::ONE, Vec3::ZERO);
        let indices = grid_triangles(4, 3);
        let mut normals = vec![Vec3::ZERO; positions.len()];
        update_normals(&positions, &indices, &mut normals);
        for n in normals {
            assert!((n - Vec3::Z).length() < 1e-6, "{n:?}");
        }
    }

    #[test]
    fn folded_grid_normals_are_unit_length() {
        let mut positions = grid_positions(5, 5, Vec2::splat(0.25), Vec3::ZERO);
        for (i, p) in positions.iter_mut().enumerate() {
            p.z = (i as f32 * 0.7).sin() * 0.3;
        }
        let indices = grid_triangles(5, 5);
        let mut normals = vec![Vec3::Z; positions.len()];
        update_normals(&positions, &indices, &mut normals);
        for n in normals {
            assert!((n.length() - 1.0).abs() < 1e-5, "{n:?}");
        }
    }

    #[test]
    fn tilted_quad_normal_follows_surface() {
        // Rows run along +Z instead of -Y: the quad lies in the XZ plane
        let positions = vec![
            Vec3::new(0.0, 0.0, 0.0),
            Vec3::new(1.0, 0.0, 0.0),
            Vec3::new(0.0, 0.0, 1.0),
            Vec3::new(1.0, 0.0, 1.0),
        ];
        let indices = grid_triangles(2, 2);
        let mut normals = vec![Vec3::Z; 4];
        update_normals(&positions, &indices, &mut normals);
        for n in normals {
            assert!((n - Vec3::Y).length() < 1e-6, "{n:?}");
        }
    }

    #[test]
    fn collapsed_triangles_keep_previous_normal() {
        let positions = vec![Vec3::ZERO; 4];
        let indices = grid_triangles(2, 2);
        let mut normals = vec![Vec3::X; 4];
        update_normals(&positions, &indices, &mut normals);
        assert_eq!(normals, vec![Vec3::X; 4]);
    }

    #[test]
    fn face_normal_is_area_weighted() {
        let n = face_normal(Vec3::ZERO, Vec3::new(0.0, -2.0, 0.0), Vec3::new(2.0, 0.0, 0.0));
        assert_eq!(n, Vec3::new(0.0, 0.0, 4.0));
    }
}
