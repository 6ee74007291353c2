//! Internal (spring) and external (environment) forces
//!
//! Both passes write into [`ForceBuffers`], which are index-aligned with the
//! mass points and zeroed at the start of every pass.

use glam::Vec3;

use crate::config::{ClothConfig, DragModel};
use crate::topology::Spring;

/// Springs shorter than this have no usable direction and exert no force
pub const LENGTH_EPSILON: f32 = 1e-6;

/// Drag normal used when the fluid is at rest
pub const REFERENCE_DRAG_NORMAL: Vec3 = Vec3::NEG_Z;

/// Normalize `v`, or return zero when it is too short to have a direction
pub fn safe_normalize(v: Vec3) -> Vec3 {
    let len = v.length();
    if len > LENGTH_EPSILON {
        v / len
    } else {
        Vec3::ZERO
    }
}

/// Per-point force accumulators
#[derive(Debug, Clone, Default)]
pub struct ForceBuffers {
    pub internal: Vec<Vec3>,
    pub external: Vec<Vec3>,
}

impl ForceBuffers {
    /// Zeroed buffers for `count` points
    pub fn new(count: usize) -> Self {
        Self {
            internal: vec![Vec3::ZERO; count],
            external: vec![Vec3::ZERO; count],
        }
    }

    /// Match the point count, zeroing everything
    pub fn reset(&mut self, count: usize) {
        self.internal.clear();
        self.internal.resize(count, Vec3::ZERO);
        self.external.clear();
        self.external.resize(count, Vec3::ZERO);
    }

    pub fn len(&self) -> usize {
        self.internal.len()
    }

    pub fn is_empty(&self) -> bool {
        self.internal.is_empty()
    }

    /// Total force on point `i`
    pub fn total(&self, i: usize) -> Vec3 {
        self.internal[i] + self.external[i]
    }
}

/// Hooke force applied to endpoint `a` (and negated on `b`).
///
/// `k · (d - l0 · d̂)` with `d = b - a`: zero at rest length, pulling `a`
/// toward `b` when stretched. Returns `None` for a collapsed spring.
pub fn spring_force(spring: &Spring, positions: &[Vec3]) -> Option<Vec3> {
    let displacement = positions[spring.b.index()] - positions[spring.a.index()];
    let length = displacement.length();
    if length < LENGTH_EPSILON {
        return None;
    }
    let direction = displacement / length;
    Some(spring.stiffness * (displacement - spring.rest_length * direction))
}

/// Zero `out` and accumulate every spring's force into it.
///
/// Returns the number of springs skipped because they had collapsed.
pub fn accumulate_internal(springs: &[Spring], positions: &[Vec3], out: &mut [Vec3]) -> usize {
    out.fill(Vec3::ZERO);
    let mut skipped = 0;
    for spring in springs {
        match spring_force(spring, positions) {
            Some(force) => {
                out[spring.a.index()] += force;
                out[spring.b.index()] -= force;
            }
            None => skipped += 1,
        }
    }
    skipped
}

/// Environmental parameters for the external force pass
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Environment {
    pub gravity: Vec3,
    pub damping: f32,
    pub viscosity: f32,
    pub fluid_velocity: Vec3,
    pub drag: DragModel,
}

impl From<&ClothConfig> for Environment {
    fn from(config: &ClothConfig) -> Self {
        Self {
            gravity: config.gravity,
            damping: config.damping,
            viscosity: config.viscosity,
            fluid_velocity: config.fluid_velocity,
            drag: config.drag,
        }
    }
}

impl Environment {
    /// Direction the drag acts along for the flow-aligned model
    pub fn flow_normal(&self) -> Vec3 {
        let n = -safe_normalize(self.fluid_velocity);
        if n == Vec3::ZERO {
            REFERENCE_DRAG_NORMAL
        } else {
            n
        }
    }

    /// Drag normal for a point whose vertex normal is `surface`
    pub fn drag_normal(&self, surface: Vec3) -> Vec3 {
        match self.drag {
            DragModel::FlowAligned => self.flow_normal(),
            DragModel::SurfaceNormal => {
                let n = safe_normalize(surface);
                if n == Vec3::ZERO {
                    self.flow_normal()
                } else if n.dot(self.fluid_velocity) > 0.0 {
                    -n
                } else {
                    n
                }
            }
        }
    }

    /// Gravity + linear damping + fluid drag on a single point
    pub fn force_on(&self, mass: f32, velocity: Vec3, surface_normal: Vec3) -> Vec3 {
        let gravity = mass * self.gravity;
        let damping = -self.damping * velocity;
        let n = self.drag_normal(surface_normal);
        let fluid = self.viscosity * n.dot(self.fluid_velocity - velocity) * n;
        gravity + damping + fluid
    }
}

/// Zero `out` and fill it with each point's external force
pub fn accumulate_external(
    env: &Environment,
    masses: &[f32],
    velocities: &[Vec3],
    normals: &[Vec3],
    out: &mut [Vec3],
) {
    for (((f, &m), &v), &n) in out.iter_mut().zip(masses).zip(velocities).zip(normals) {
        *f = env.force_on(m, v, n);
    }
}
