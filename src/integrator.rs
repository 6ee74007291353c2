//! Explicit time integration of the mass-spring network
//!
//! One frame is a sequence of sub-steps. Each sub-step recomputes the
//! internal forces from the current positions and the external forces from
//! the current velocities, then advances every free point with semi-implicit
//! Euler:
//!
//! ```text
//! a = (F_int + F_ext) / m
//! v += a·dt
//! x += v·dt
//! ```
//!
//! Pinned points are skipped entirely. The step size is clamped to
//! `π·sqrt(m/k)·stability_factor` because explicit integration of stiff
//! springs diverges beyond it.

use glam::Vec3;
use serde::Serialize;
use tracing::trace;

use crate::config::{ClothConfig, IterationPolicy};
use crate::forces::{self, Environment, ForceBuffers};
use crate::state::ClothState;

/// What a single frame did
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Default)]
pub struct StepReport {
    /// Time step the caller asked for
    pub requested_dt: f32,
    /// Time step each sub-step actually integrated
    pub dt: f32,
    /// Whether `dt` was reduced to the stability limit
    pub clamped: bool,
    /// Sub-steps executed
    pub sub_steps: u32,
    /// Mean squared per-point displacement over the last sub-step
    pub variation: f32,
    /// Whether the iteration cap ended a variation-driven loop early
    pub hit_iteration_cap: bool,
    /// Springs skipped because they had collapsed, summed over sub-steps
    pub skipped_springs: usize,
    pub kinetic_energy: f32,
    pub potential_energy: f32,
}

/// Clamp `dt` to the stability limit, returning the step and whether it
/// was reduced
pub fn clamp_time_step(dt: f32, max_step: f32) -> (f32, bool) {
    if dt > max_step {
        (max_step, true)
    } else {
        (dt, false)
    }
}

/// Advances a [`ClothState`] frame by frame, owning the force buffers so they
/// are not reallocated every frame
#[derive(Debug, Clone, Default)]
pub struct Integrator {
    forces: ForceBuffers,
}

impl Integrator {
    pub fn new(point_count: usize) -> Self {
        Self {
            forces: ForceBuffers::new(point_count),
        }
    }

    /// Force buffers from the last sub-step
    pub fn forces(&self) -> &ForceBuffers {
        &self.forces
    }

    /// Advance `state` by one frame of (at most) `dt` per sub-step, then
    /// recompute the normals.
    ///
    /// `dt` must be finite and positive; the controller checks this.
    pub fn step(&mut self, state: &mut ClothState, config: &ClothConfig, dt: f32) -> StepReport {
        let (step_dt, clamped) = clamp_time_step(dt, config.max_stable_step());
        let env = Environment::from(config);
        let policy: IterationPolicy = config.iterations;

        if self.forces.len() != state.point_count() {
            self.forces.reset(state.point_count());
        }
        self.forces.internal.fill(Vec3::ZERO);

        let mut report = StepReport {
            requested_dt: dt,
            dt: step_dt,
            clamped,
            ..StepReport::default()
        };

        while policy.should_continue(report.sub_steps, report.variation) {
            let (skipped, variation) = self.sub_step(state, &env, step_dt);
            report.skipped_springs += skipped;
            report.variation = variation;
            report.sub_steps += 1;
            trace!(
                sub_step = report.sub_steps,
                variation = report.variation,
                "sub-step complete"
            );
        }
        report.hit_iteration_cap = policy
            .variation_threshold
            .is_some_and(|t| report.sub_steps >= policy.max_iterations && report.variation > t);

        state.update_normals();

        report.kinetic_energy = state.kinetic_energy();
        report.potential_energy = state.potential_energy();
        report
    }

    /// One force evaluation + integration pass.
    ///
    /// Returns the number of collapsed springs skipped and the mean squared
    /// displacement of all points.
    fn sub_step(&mut self, state: &mut ClothState, env: &Environment, dt: f32) -> (usize, f32) {
        let skipped =
            forces::accumulate_internal(state.springs(), &state.positions, &mut self.forces.internal);
        forces::accumulate_external(
            env,
            &state.masses,
            &state.velocities,
            &state.normals,
            &mut self.forces.external,
        );

        let mut displacement_sq = 0.0;
        for i in 0..state.point_count() {
            if !state.simulated[i] {
                continue;
            }
            let acceleration = self.forces.total(i) / state.masses[i];
            state.accelerations[i] = acceleration;
            state.velocities[i] += acceleration * dt;
            let delta = state.velocities[i] * dt;
            state.positions[i] += delta;
            displacement_sq += delta.length_squared();
        }
        (skipped, displacement_sq / state.point_count().max(1) as f32)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::PinMode;
    use crate::handle::PointId;

    fn three_by_three() -> ClothConfig {
        ClothConfig::default()
            .with_grid(3, 3)
            .with_spacing(1.0)
            .with_total_mass(9.0)
    }

    fn run(config: &ClothConfig, dt: f32, frames: usize) -> (ClothState, Vec<StepReport>) {
        let mut state = ClothState::build(config).unwrap();
        let mut integrator = Integrator::new(state.point_count());
        let reports = (0..frames)
            .map(|_| integrator.step(&mut state, config, dt))
            .collect();
        (state, reports)
    }

    #[test]
    fn clamp_only_reduces() {
        assert_eq!(clamp_time_step(0.5, 0.1), (0.1, true));
        assert_eq!(clamp_time_step(0.05, 0.1), (0.05, false));
    }

    #[test]
    fn zero_force_grid_stays_put() {
        let config = three_by_three()
            .without_external_forces()
            .with_pinning(PinMode::Indices(vec![PointId::new(0)]));
        let before = ClothState::build(&config).unwrap();
        let (after, reports) = run(&config, 0.01, 1);

        assert_eq!(reports[0].sub_steps, config.iterations.min_iterations);
        for (a, b) in before.positions().iter().zip(after.positions()) {
            assert!((*a - *b).length() < 1e-5, "{a:?} moved to {b:?}");
        }
    }

    #[test]
    fn free_point_falls_with_gravity_first() {
        let config = three_by_three()
            .without_external_forces()
            .with_gravity(Vec3::new(0.0, -9.81, 0.0))
            .with_stiffness(1.0e6)
            .with_iterations(IterationPolicy::fixed(1))
            .with_pinning(PinMode::Indices(
                (0..9).filter(|&i| i != 4).map(PointId::new).collect(),
            ));
        let (state, reports) = run(&config, 0.01, 1);
        assert_eq!(reports[0].sub_steps, 1);

        let a = state.accelerations()[4];
        assert!((a.y + 9.81).abs() < 1e-3, "{a:?}");
        assert!(a.x.abs() < 1e-3 && a.z.abs() < 1e-3, "{a:?}");
        let rest_y = config.origin.y - 1.0;
        assert!(state.positions()[4].y < rest_y);
    }

    #[test]
    fn pinned_points_never_move() {
        let config = three_by_three().with_pinning(PinMode::TopRow);
        let before = ClothState::build(&config).unwrap();
        let (after, _) = run(&config, config.time_step, 50);
        for id in before.pinned() {
            let i = id.index();
            assert_eq!(before.positions()[i], after.positions()[i]);
            assert_eq!(before.velocities()[i], after.velocities()[i]);
            assert_eq!(before.accelerations()[i], after.accelerations()[i]);
        }
        // The free rows did sag
        assert!(after.positions()[7].y < before.positions()[7].y);
    }

    #[test]
    fn oversized_step_is_clamped() {
        let config = three_by_three();
        let (_, reports) = run(&config, 10.0, 1);
        assert!(reports[0].clamped);
        assert_eq!(reports[0].requested_dt, 10.0);
        assert_eq!(reports[0].dt, config.max_stable_step());
    }

    #[test]
    fn small_grid_stays_finite() {
        let config = ClothConfig::default()
            .with_grid(2, 2)
            .with_spacing(1.0)
            .without_external_forces();
        let mut state = ClothState::build(&config).unwrap();
        let mut integrator = Integrator::new(state.point_count());
        for _ in 0..100 {
            integrator.step(&mut state, &config, 0.01);
            assert!(integrator.forces().internal.iter().all(|f| f.is_finite()));
            assert!(state.positions().iter().all(|p| p.is_finite()));
        }
    }

    #[test]
    fn displaced_point_settles_back() {
        let config = three_by_three()
            .without_external_forces()
            .with_damping(0.5)
            .with_stiffness(50.0)
            .with_pinning(PinMode::Indices(
                (0..9).filter(|&i| i != 4).map(PointId::new).collect(),
            ));
        let mut state = ClothState::build(&config).unwrap();
        let rest = state.positions()[4];
        state
            .set_position(PointId::new(4), rest + Vec3::new(0.2, -0.1, 0.3))
            .unwrap();
        let initial = state.positions()[4].distance(rest);

        let mut integrator = Integrator::new(state.point_count());
        let mut energy = f32::INFINITY;
        for frame in 0..400 {
            let report = integrator.step(&mut state, &config, 0.01);
            if frame % 100 == 99 {
                let total = report.kinetic_energy + report.potential_energy;
                assert!(total < energy, "energy grew to {total}");
                energy = total;
            }
        }
        let remaining = state.positions()[4].distance(rest);
        assert!(remaining < initial * 0.1, "{remaining} vs {initial}");
    }

    #[test]
    fn variation_threshold_adds_sub_steps_up_to_cap() {
        let config = three_by_three().with_iterations(IterationPolicy {
            min_iterations: 2,
            max_iterations: 7,
            variation_threshold: Some(1.0e-12),
        });
        let (_, reports) = run(&config, config.time_step, 1);
        assert_eq!(reports[0].sub_steps, 7);
        assert!(reports[0].hit_iteration_cap);

        let relaxed = config.with_iterations(IterationPolicy {
            min_iterations: 2,
            max_iterations: 7,
            variation_threshold: Some(1.0e6),
        });
        let (_, reports) = run(&relaxed, relaxed.time_step, 1);
        assert_eq!(reports[0].sub_steps, 2);
        assert!(!reports[0].hit_iteration_cap);
    }

    #[test]
    fn collapsed_springs_are_reported() {
        let config = three_by_three()
            .without_external_forces()
            .with_iterations(IterationPolicy::fixed(1))
            .with_pinning(PinMode::Indices((0..9).map(PointId::new).collect()));
        let mut state = ClothState::build(&config).unwrap();
        let target = state.positions()[0];
        state.set_position(PointId::new(1), target).unwrap();

        let mut integrator = Integrator::new(state.point_count());
        let report = integrator.step(&mut state, &config, 0.01);
        assert_eq!(report.skipped_springs, 1);
        assert!(state.positions().iter().all(|p| p.is_finite()));
    }
}
