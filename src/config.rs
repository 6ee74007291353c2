//! Simulation configuration
//!
//! A [`ClothConfig`] is plain data: it can be edited freely, loaded from YAML
//! or JSON, and only takes effect when a simulation is (re)built from it.

use std::f32::consts::PI;

use glam::{Vec2, Vec3};
use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::handle::PointId;

// =============================================================================
// Default Constants
// =============================================================================

/// Largest accepted grid dimension on either axis
pub const MAX_GRID_DIM: u32 = 1024;

/// Default grid resolution (columns, rows)
pub const DEFAULT_GRID: [u32; 2] = [10, 10];

/// Default physical cloth size in meters (width, height)
pub const DEFAULT_SIZE: [f32; 2] = [1.0, 1.0];

/// Default total cloth mass in kilograms
pub const DEFAULT_TOTAL_MASS: f32 = 1.0;

/// Default spring stiffness in N/m
pub const DEFAULT_STIFFNESS: f32 = 100.0;

/// Default linear damping coefficient in N·s/m
pub const DEFAULT_DAMPING: f32 = 0.01;

/// Default fluid viscosity coefficient
pub const DEFAULT_VISCOSITY: f32 = 0.1;

/// Default sub-step time step: the default five sub-steps make up one 60 Hz
/// frame, and it stays below the default cloth's stability limit
pub const DEFAULT_TIME_STEP: f32 = 1.0 / 300.0;

/// Default fraction of the spring half-period used as the largest stable step
pub const DEFAULT_STABILITY_FACTOR: f32 = 0.15;

/// Default number of sub-steps always executed per frame
pub const DEFAULT_MIN_ITERATIONS: u32 = 5;

/// Default hard cap on sub-steps per frame
pub const DEFAULT_MAX_ITERATIONS: u32 = 50;

/// Standard gravity along -Y
pub const DEFAULT_GRAVITY: Vec3 = Vec3::new(0.0, -9.81, 0.0);

/// Default fluid (wind) velocity, blowing along +Z
pub const DEFAULT_FLUID_VELOCITY: Vec3 = Vec3::new(0.0, 0.0, 1.0);

/// Which mass points are pinned when the cloth is built
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum PinMode {
    /// Everything is simulated
    None,
    /// The two corners of the first row
    #[default]
    TopCorners,
    /// The whole first row
    TopRow,
    /// All four grid corners
    Corners,
    /// An explicit list of linear indices
    Indices(Vec<PointId>),
}

/// Normal used to project the fluid-drag force
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum DragModel {
    /// `-normalize(fluid_velocity)`, or `-Z` when there is no flow
    #[default]
    FlowAligned,
    /// The point's current vertex normal, turned to face the flow
    SurfaceNormal,
}

/// How many sub-steps a single frame runs
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct IterationPolicy {
    /// Sub-steps that always run, whatever the variation
    pub min_iterations: u32,
    /// Hard cap when the variation threshold keeps the loop going
    pub max_iterations: u32,
    /// Keep sub-stepping while the mean squared per-point displacement
    /// between sub-steps exceeds this value. `None` runs exactly
    /// `min_iterations`.
    pub variation_threshold: Option<f32>,
}

impl Default for IterationPolicy {
    fn default() -> Self {
        Self {
            min_iterations: DEFAULT_MIN_ITERATIONS,
            max_iterations: DEFAULT_MAX_ITERATIONS,
            variation_threshold: None,
        }
    }
}

impl IterationPolicy {
    /// Exactly `n` sub-steps per frame
    pub fn fixed(n: u32) -> Self {
        Self {
            min_iterations: n,
            max_iterations: n,
            variation_threshold: None,
        }
    }

    /// Whether another sub-step should run after `done` sub-steps with the
    /// given variation
    pub fn should_continue(&self, done: u32, variation: f32) -> bool {
        if done < self.min_iterations {
            return true;
        }
        if done >= self.max_iterations {
            return false;
        }
        self.variation_threshold
            .is_some_and(|threshold| variation > threshold)
    }
}

/// Physical and numerical parameters for one cloth
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ClothConfig {
    /// Mass points per axis: `[cols, rows]`
    pub grid: [u32; 2],
    /// Physical extent of the rest cloth in meters: `[width, height]`
    pub size: [f32; 2],
    /// World position of grid cell (0, 0); rows extend along -Y
    pub origin: Vec3,
    /// Mass of the whole cloth, spread evenly over the points
    pub total_mass: f32,
    /// Spring constant shared by every spring
    pub stiffness: f32,
    /// Linear velocity damping
    pub damping: f32,
    /// Fluid drag coefficient
    pub viscosity: f32,
    /// Velocity of the surrounding fluid
    pub fluid_velocity: Vec3,
    /// Gravitational acceleration
    pub gravity: Vec3,
    /// Time step each sub-step of `update_frame` integrates
    pub time_step: f32,
    /// Scale on `π·sqrt(m/k)` giving the largest step that is integrated
    pub stability_factor: f32,
    /// Sub-stepping policy
    pub iterations: IterationPolicy,
    /// Drag normal model
    pub drag: DragModel,
    /// Anchor points, written as `top_row` or `indices: [..]`
    #[serde(with = "serde_yaml::with::singleton_map")]
    pub pinning: PinMode,
}

impl Default for ClothConfig {
    fn default() -> Self {
        Self {
            grid: DEFAULT_GRID,
            size: DEFAULT_SIZE,
            origin: Vec3::new(-0.5, 1.0, 0.0),
            total_mass: DEFAULT_TOTAL_MASS,
            stiffness: DEFAULT_STIFFNESS,
            damping: DEFAULT_DAMPING,
            viscosity: DEFAULT_VISCOSITY,
            fluid_velocity: DEFAULT_FLUID_VELOCITY,
            gravity: DEFAULT_GRAVITY,
            time_step: DEFAULT_TIME_STEP,
            stability_factor: DEFAULT_STABILITY_FACTOR,
            iterations: IterationPolicy::default(),
            drag: DragModel::default(),
            pinning: PinMode::default(),
        }
    }
}

impl ClothConfig {
    /// Set the grid resolution
    pub fn with_grid(mut self, cols: u32, rows: u32) -> Self {
        self.grid = [cols, rows];
        self
    }

    /// Set the physical size so that rest spacing is `spacing` on both axes
    pub fn with_spacing(mut self, spacing: f32) -> Self {
        let [cols, rows] = self.grid;
        self.size = [
            spacing * cols.saturating_sub(1).max(1) as f32,
            spacing * rows.saturating_sub(1).max(1) as f32,
        ];
        self
    }

    /// Set the total mass
    pub fn with_total_mass(mut self, total_mass: f32) -> Self {
        self.total_mass = total_mass;
        self
    }

    /// Set the spring stiffness
    pub fn with_stiffness(mut self, stiffness: f32) -> Self {
        self.stiffness = stiffness;
        self
    }

    /// Set the damping coefficient
    pub fn with_damping(mut self, damping: f32) -> Self {
        self.damping = damping;
        self
    }

    /// Set the viscosity coefficient
    pub fn with_viscosity(mut self, viscosity: f32) -> Self {
        self.viscosity = viscosity;
        self
    }

    /// Set the fluid velocity
    pub fn with_fluid_velocity(mut self, fluid_velocity: Vec3) -> Self {
        self.fluid_velocity = fluid_velocity;
        self
    }

    /// Set gravity
    pub fn with_gravity(mut self, gravity: Vec3) -> Self {
        self.gravity = gravity;
        self
    }

    /// Set the frame time step
    pub fn with_time_step(mut self, time_step: f32) -> Self {
        self.time_step = time_step;
        self
    }

    /// Set the sub-stepping policy
    pub fn with_iterations(mut self, iterations: IterationPolicy) -> Self {
        self.iterations = iterations;
        self
    }

    /// Set the pinning mode
    pub fn with_pinning(mut self, pinning: PinMode) -> Self {
        self.pinning = pinning;
        self
    }

    /// Set the drag model
    pub fn with_drag(mut self, drag: DragModel) -> Self {
        self.drag = drag;
        self
    }

    /// A config with every environmental force switched off
    pub fn without_external_forces(self) -> Self {
        self.with_gravity(Vec3::ZERO)
            .with_damping(0.0)
            .with_viscosity(0.0)
    }

    pub fn cols(&self) -> u32 {
        self.grid[0]
    }

    pub fn rows(&self) -> u32 {
        self.grid[1]
    }

    /// Number of mass points in the grid
    pub fn point_count(&self) -> usize {
        self.cols() as usize * self.rows() as usize
    }

    /// Mass of a single point
    pub fn point_mass(&self) -> f32 {
        self.total_mass / self.point_count().max(1) as f32
    }

    /// Rest distance between neighbouring points along x and y
    pub fn spacing(&self) -> Vec2 {
        let axis = |extent: f32, n: u32| {
            if n > 1 {
                extent / (n - 1) as f32
            } else {
                extent
            }
        };
        Vec2::new(
            axis(self.size[0], self.cols()),
            axis(self.size[1], self.rows()),
        )
    }

    /// Largest time step integrated without risking divergence:
    /// `π·sqrt(m/k)·stability_factor`
    pub fn max_stable_step(&self) -> f32 {
        PI * (self.point_mass() / self.stiffness).sqrt() * self.stability_factor
    }

    /// Resolve the pinning mode into sorted, de-duplicated point ids.
    ///
    /// Explicit indices are returned as given (sorted); range checking is
    /// done by [`ClothConfig::validate`].
    pub fn pinned_points(&self) -> Vec<PointId> {
        let (cols, rows) = (self.cols(), self.rows());
        if cols == 0 || rows == 0 {
            return Vec::new();
        }
        let last_col = cols - 1;
        let last_row = rows - 1;
        let mut ids = match &self.pinning {
            PinMode::None => Vec::new(),
            PinMode::TopCorners => vec![
                PointId::from_grid(0, 0, cols),
                PointId::from_grid(last_col, 0, cols),
            ],
            PinMode::TopRow => (0..cols).map(|c| PointId::from_grid(c, 0, cols)).collect(),
            PinMode::Corners => vec![
                PointId::from_grid(0, 0, cols),
                PointId::from_grid(last_col, 0, cols),
                PointId::from_grid(0, last_row, cols),
                PointId::from_grid(last_col, last_row, cols),
            ],
            PinMode::Indices(ids) => ids.clone(),
        };
        ids.sort_unstable();
        ids.dedup();
        ids
    }

    /// Check every field against its documented range.
    ///
    /// Returns all violations at once so a UI can flag each offending field.
    pub fn validate(&self) -> Result<(), Vec<ConfigError>> {
        let mut errors = Vec::new();

        for (axis, value) in [("cols", self.cols()), ("rows", self.rows())] {
            if !(1..=MAX_GRID_DIM).contains(&value) {
                errors.push(ConfigError::GridDimension {
                    axis,
                    value,
                    max: MAX_GRID_DIM,
                });
            }
        }

        let positive = [
            ("size.width", self.size[0]),
            ("size.height", self.size[1]),
            ("total_mass", self.total_mass),
            ("stiffness", self.stiffness),
            ("time_step", self.time_step),
        ];
        for (field, value) in positive {
            if !(value.is_finite() && value > 0.0) {
                errors.push(ConfigError::NotPositive { field, value });
            }
        }

        for (field, value) in [("damping", self.damping), ("viscosity", self.viscosity)] {
            if !(value.is_finite() && value >= 0.0) {
                errors.push(ConfigError::Negative { field, value });
            }
        }

        let vectors = [
            ("origin", self.origin),
            ("fluid_velocity", self.fluid_velocity),
            ("gravity", self.gravity),
        ];
        for (field, value) in vectors {
            if !value.is_finite() {
                errors.push(ConfigError::NotFinite { field });
            }
        }

        if !(self.stability_factor > 0.0 && self.stability_factor <= 1.0) {
            errors.push(ConfigError::StabilityFactor(self.stability_factor));
        }

        let IterationPolicy {
            min_iterations,
            max_iterations,
            variation_threshold,
        } = self.iterations;
        if min_iterations == 0 || max_iterations < min_iterations {
            errors.push(ConfigError::IterationBounds {
                min: min_iterations,
                max: max_iterations,
            });
        }
        if let Some(value) = variation_threshold {
            if !(value.is_finite() && value > 0.0) {
                errors.push(ConfigError::NotPositive {
                    field: "iterations.variation_threshold",
                    value,
                });
            }
        }

        let count = self.point_count();
        if let PinMode::Indices(ids) = &self.pinning {
            for &id in ids.iter().filter(|id| id.index() >= count) {
                errors.push(ConfigError::PinOutOfRange { id, count });
            }
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_valid() {
        assert_eq!(ClothConfig::default().validate(), Ok(()));
    }

    #[test]
    fn point_mass_spreads_total_mass() {
        let cfg = ClothConfig::default().with_grid(4, 5).with_total_mass(2.0);
        assert_eq!(cfg.point_count(), 20);
        assert!((cfg.point_mass() - 0.1).abs() < 1e-6);
    }

    #[test]
    fn spacing_follows_size() {
        let cfg = ClothConfig::default().with_grid(3, 5).with_spacing(0.5);
        assert_eq!(cfg.size, [1.0, 2.0]);
        assert_eq!(cfg.spacing(), Vec2::new(0.5, 0.5));
    }

    #[test]
    fn single_point_axis_keeps_full_extent() {
        let mut cfg = ClothConfig::default().with_grid(1, 4);
        cfg.size = [2.0, 3.0];
        assert_eq!(cfg.spacing(), Vec2::new(2.0, 1.0));
    }

    #[test]
    fn max_stable_step_shrinks_with_stiffness() {
        let soft = ClothConfig::default().with_stiffness(10.0);
        let stiff = ClothConfig::default().with_stiffness(1000.0);
        assert!(stiff.max_stable_step() < soft.max_stable_step());
        let expected = PI * (0.01_f32 / 10.0).sqrt() * DEFAULT_STABILITY_FACTOR;
        assert!((soft.max_stable_step() - expected).abs() < 1e-7);
    }

    #[test]
    fn pinned_points_for_each_mode() {
        let cfg = ClothConfig::default().with_grid(3, 3);
        let raw = |cfg: &ClothConfig| {
            cfg.pinned_points()
                .into_iter()
                .map(PointId::raw)
                .collect::<Vec<_>>()
        };
        assert_eq!(raw(&cfg), vec![0, 2]);
        assert_eq!(raw(&cfg.clone().with_pinning(PinMode::TopRow)), vec![0, 1, 2]);
        assert_eq!(
            raw(&cfg.clone().with_pinning(PinMode::Corners)),
            vec![0, 2, 6, 8]
        );
        assert!(raw(&cfg.clone().with_pinning(PinMode::None)).is_empty());
        let explicit = PinMode::Indices(vec![PointId::new(4), PointId::new(0), PointId::new(4)]);
        assert_eq!(raw(&cfg.with_pinning(explicit)), vec![0, 4]);
    }

    #[test]
    fn corners_collapse_on_single_column() {
        let cfg = ClothConfig::default()
            .with_grid(1, 1)
            .with_pinning(PinMode::Corners);
        assert_eq!(cfg.pinned_points(), vec![PointId::new(0)]);
    }

    #[test]
    fn validate_reports_every_violation() {
        let mut cfg = ClothConfig::default()
            .with_grid(0, 2)
            .with_stiffness(-1.0)
            .with_damping(f32::NAN)
            .with_pinning(PinMode::Indices(vec![PointId::new(7)]));
        cfg.stability_factor = 0.0;
        cfg.iterations = IterationPolicy {
            min_iterations: 3,
            max_iterations: 2,
            variation_threshold: Some(0.0),
        };

        let errors = cfg.validate().unwrap_err();
        assert!(errors.contains(&ConfigError::GridDimension {
            axis: "cols",
            value: 0,
            max: MAX_GRID_DIM
        }));
        assert!(errors.contains(&ConfigError::NotPositive {
            field: "stiffness",
            value: -1.0
        }));
        assert!(errors.iter().any(|e| matches!(
            e,
            ConfigError::Negative {
                field: "damping",
                ..
            }
        )));
        assert!(errors.contains(&ConfigError::StabilityFactor(0.0)));
        assert!(errors.contains(&ConfigError::IterationBounds { min: 3, max: 2 }));
        assert!(errors.contains(&ConfigError::PinOutOfRange {
            id: PointId::new(7),
            count: 0
        }));
        assert_eq!(errors.len(), 7);
    }

    #[test]
    fn iteration_policy_respects_floor_and_cap() {
        let policy = IterationPolicy {
            min_iterations: 2,
            max_iterations: 4,
            variation_threshold: Some(0.5),
        };
        assert!(policy.should_continue(0, 0.0));
        assert!(policy.should_continue(1, 0.0));
        assert!(!policy.should_continue(2, 0.1));
        assert!(policy.should_continue(2, 1.0));
        assert!(!policy.should_continue(4, 1.0));

        let fixed = IterationPolicy::fixed(3);
        assert!(fixed.should_continue(2, 100.0));
        assert!(!fixed.should_continue(3, 100.0));
    }

    #[test]
    fn parses_partial_yaml_with_defaults() {
        let yaml = "grid: [4, 3]\nstiffness: 250.0\npinning: top_row\n";
        let cfg: ClothConfig = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(cfg.grid, [4, 3]);
        assert_eq!(cfg.stiffness, 250.0);
        assert_eq!(cfg.pinning, PinMode::TopRow);
        assert_eq!(cfg.gravity, DEFAULT_GRAVITY);
        assert_eq!(cfg.iterations, IterationPolicy::default());
    }

    #[test]
    fn parses_explicit_pin_indices() {
        let yaml = "pinning:\n  indices: [0, 5]\n";
        let cfg: ClothConfig = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(
            cfg.pinning,
            PinMode::Indices(vec![PointId::new(0), PointId::new(5)])
        );
    }

    #[test]
    fn explicit_pin_indices_serialize_as_a_map() {
        let cfg = ClothConfig::default()
            .with_pinning(PinMode::Indices(vec![PointId::new(3), PointId::new(7)]));
        let yaml = serde_yaml::to_string(&cfg).unwrap();
        assert!(yaml.contains("pinning:\n  indices:\n  - 3\n  - 7\n"), "{yaml}");

        let json = serde_json::to_value(&cfg).unwrap();
        assert_eq!(json["pinning"], serde_json::json!({ "indices": [3, 7] }));
        assert_eq!(serde_json::from_value::<ClothConfig>(json).unwrap(), cfg);
    }

    #[test]
    fn unit_pin_modes_stay_plain_strings() {
        let yaml = serde_yaml::to_string(&ClothConfig::default()).unwrap();
        assert!(yaml.contains("pinning: top_corners\n"), "{yaml}");
    }

    #[test]
    fn default_time_step_is_stable() {
        let cfg = ClothConfig::default();
        assert!(cfg.time_step <= cfg.max_stable_step());
        let frame = cfg.time_step * cfg.iterations.min_iterations as f32;
        assert!((frame - 1.0 / 60.0).abs() < 1e-6, "{frame}");
    }

    #[test]
    fn rejects_unknown_fields() {
        let yaml = "stifness: 10.0\n";
        assert!(serde_yaml::from_str::<ClothConfig>(yaml).is_err());
    }
}
