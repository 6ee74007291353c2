//! Simulation controller
//!
//! [`Simulation`] owns the configuration, the built cloth and the integrator,
//! and sequences their lifecycle:
//!
//! ```text
//! Uninitialized --startup--> Built --update--> Running
//!       ^                      ^                  |
//!       |                      +----- reset ------+
//!       +------------------ shutdown -------------+
//! ```
//!
//! Configuration is double-buffered. The *active* config is what the live
//! cloth was built from and never changes during a run; the *pending* config
//! can be edited at any time and replaces the active one only on reset.

use glam::Vec3;
use tracing::{debug, info, warn};

use crate::config::ClothConfig;
use crate::error::{ClothError, ClothResult};
use crate::handle::PointId;
use crate::integrator::{Integrator, StepReport};
use crate::mesh::MeshView;
use crate::state::{ClothState, MassPoint};

/// Lifecycle phase of a [`Simulation`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    /// No cloth allocated
    Uninitialized,
    /// Cloth built, not yet advanced
    Built,
    /// At least one frame integrated since the last build
    Running,
}

/// Owns and drives one cloth
#[derive(Debug)]
pub struct Simulation {
    active: ClothConfig,
    pending: ClothConfig,
    state: Option<ClothState>,
    integrator: Integrator,
    phase: Phase,
    simulating: bool,
    reset_requested: bool,
    show_springs: bool,
    frame: u64,
    clamp_warned: bool,
    last_report: Option<StepReport>,
}

impl Simulation {
    /// Create a controller for `config`. Nothing is built until
    /// [`Simulation::startup`].
    pub fn new(config: ClothConfig) -> ClothResult<Self> {
        config.validate()?;
        Ok(Self {
            pending: config.clone(),
            active: config,
            state: None,
            integrator: Integrator::default(),
            phase: Phase::Uninitialized,
            simulating: true,
            reset_requested: false,
            show_springs: false,
            frame: 0,
            clamp_warned: false,
            last_report: None,
        })
    }

    /// Build the cloth from the active configuration.
    ///
    /// Calling this on an already built simulation does nothing.
    pub fn startup(&mut self) -> ClothResult<()> {
        if self.state.is_some() {
            debug!("startup ignored: cloth already built");
            return Ok(());
        }
        let state = ClothState::build(&self.active)?;
        info!(
            points = state.point_count(),
            springs = state.springs().len(),
            pinned = state.pinned().len(),
            max_step = self.active.max_stable_step(),
            "cloth built"
        );
        self.integrator = Integrator::new(state.point_count());
        self.state = Some(state);
        self.phase = Phase::Built;
        self.frame = 0;
        self.clamp_warned = false;
        self.last_report = None;
        Ok(())
    }

    /// Release the cloth. If a reset was requested, rebuild immediately from
    /// the pending configuration.
    pub fn shutdown(&mut self) -> ClothResult<()> {
        self.release();
        info!("simulation shut down");
        if self.reset_requested {
            self.apply_reset()?;
        }
        Ok(())
    }

    /// Advance one frame with the configured time step
    pub fn update_frame(&mut self) -> ClothResult<StepReport> {
        self.update(self.active.time_step)
    }

    /// Advance one frame.
    ///
    /// A pending reset is applied first. While simulation is paused the
    /// state is left untouched and the report shows zero sub-steps.
    pub fn update(&mut self, dt: f32) -> ClothResult<StepReport> {
        if !(dt.is_finite() && dt > 0.0) {
            return Err(ClothError::InvalidTimeStep(dt));
        }
        if self.reset_requested {
            self.apply_reset()?;
        }
        let state = self.state.as_mut().ok_or(ClothError::NotStarted)?;

        if !self.simulating {
            return Ok(StepReport {
                requested_dt: dt,
                kinetic_energy: state.kinetic_energy(),
                potential_energy: state.potential_energy(),
                ..StepReport::default()
            });
        }

        let report = self.integrator.step(state, &self.active, dt);
        self.phase = Phase::Running;
        self.frame += 1;

        if report.clamped && !self.clamp_warned {
            warn!(
                requested = report.requested_dt,
                used = report.dt,
                "time step exceeds stability limit; clamping"
            );
            self.clamp_warned = true;
        }
        if report.hit_iteration_cap {
            warn!(
                sub_steps = report.sub_steps,
                variation = report.variation,
                "iteration cap reached before variation settled"
            );
        }
        debug!(
            frame = self.frame,
            sub_steps = report.sub_steps,
            dt = report.dt,
            kinetic = report.kinetic_energy,
            potential = report.potential_energy,
            "frame advanced"
        );

        self.last_report = Some(report);
        Ok(report)
    }

    /// Ask for the cloth to be rebuilt from the pending configuration before
    /// the next update (or immediately on shutdown)
    pub fn request_reset(&mut self) {
        self.reset_requested = true;
    }

    pub fn is_reset_pending(&self) -> bool {
        self.reset_requested
    }

    /// Validate the pending config, drop the old cloth, promote the pending
    /// config and build again. On a validation error the running cloth is
    /// kept and the request is dropped.
    fn apply_reset(&mut self) -> ClothResult<()> {
        self.reset_requested = false;
        self.pending.validate()?;
        self.release();
        self.active = self.pending.clone();
        info!("resetting cloth with pending configuration");
        self.startup()
    }

    fn release(&mut self) {
        self.state = None;
        self.integrator = Integrator::default();
        self.phase = Phase::Uninitialized;
        self.last_report = None;
    }

    /// Configuration the live cloth was built from
    pub fn active_config(&self) -> &ClothConfig {
        &self.active
    }

    /// Configuration that the next reset will apply
    pub fn pending_config(&self) -> &ClothConfig {
        &self.pending
    }

    /// Edit the pending configuration; changes apply on reset
    pub fn pending_config_mut(&mut self) -> &mut ClothConfig {
        &mut self.pending
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    /// Frames integrated since the last build
    pub fn frame(&self) -> u64 {
        self.frame
    }

    pub fn last_report(&self) -> Option<&StepReport> {
        self.last_report.as_ref()
    }

    /// Pause or resume integration without tearing anything down
    pub fn set_simulating(&mut self, simulating: bool) {
        self.simulating = simulating;
    }

    pub fn is_simulating(&self) -> bool {
        self.simulating
    }

    /// Toggle spring debug lines
    pub fn set_show_springs(&mut self, show: bool) {
        self.show_springs = show;
    }

    pub fn shows_springs(&self) -> bool {
        self.show_springs
    }

    /// The live cloth, if built
    pub fn state(&self) -> Option<&ClothState> {
        self.state.as_ref()
    }

    /// Render buffers of the live cloth
    pub fn mesh(&self) -> ClothResult<MeshView<'_>> {
        Ok(self.built()?.mesh())
    }

    /// Spring endpoint pairs when debug lines are enabled, otherwise empty
    pub fn debug_lines(&self) -> Vec<[u32; 2]> {
        match (&self.state, self.show_springs) {
            (Some(state), true) => state.debug_lines(),
            _ => Vec::new(),
        }
    }

    pub fn point(&self, id: PointId) -> ClothResult<MassPoint> {
        self.built()?.point(id)
    }

    /// Pin a point of the live cloth
    pub fn pin(&mut self, id: PointId) -> ClothResult<()> {
        self.built_mut()?.pin(id)
    }

    /// Release a pinned point of the live cloth
    pub fn unpin(&mut self, id: PointId) -> ClothResult<()> {
        self.built_mut()?.unpin(id)
    }

    /// Move a point of the live cloth, e.g. while the user drags it
    pub fn set_position(&mut self, id: PointId, position: Vec3) -> ClothResult<()> {
        self.built_mut()?.set_position(id, position)
    }

    fn built(&self) -> ClothResult<&ClothState> {
        self.state.as_ref().ok_or(ClothError::NotStarted)
    }

    fn built_mut(&mut self) -> ClothResult<&mut ClothState> {
        self.state.as_mut().ok_or(ClothError::NotStarted)
    }
}
