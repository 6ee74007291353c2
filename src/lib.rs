//! clothsim - A mass-spring cloth simulation.
//!
//! A rectangular grid of mass points is connected by structural, shear and
//! flexion springs, driven by gravity, damping and fluid drag, and integrated
//! with sub-stepped semi-implicit Euler. The deformed surface is exposed as a
//! render-ready mesh and can be exported to OBJ or JSON.

pub mod config;
pub mod error;
pub mod forces;
pub mod handle;
pub mod integrator;
pub mod io;
pub mod mesh;
pub mod normals;
pub mod simulation;
pub mod state;
pub mod topology;

pub use config::{ClothConfig, DragModel, IterationPolicy, PinMode};
pub use error::{ClothError, ClothResult, ConfigError};
pub use handle::PointId;
pub use integrator::StepReport;
pub use mesh::{MeshSnapshot, MeshVertex, MeshView};
pub use simulation::{Phase, Simulation};
pub use state::{ClothState, MassPoint};
pub use topology::{Spring, SpringKind};
