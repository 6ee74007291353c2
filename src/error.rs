//! Error types shared across the simulation, configuration and export layers.

use thiserror::Error;

use crate::handle::PointId;

/// A single violated bound in a [`ClothConfig`](crate::config::ClothConfig).
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ConfigError {
    /// Grid dimension outside `1..=MAX_GRID_DIM`
    #[error("grid dimension {axis} = {value} is outside 1..={max}")]
    GridDimension {
        axis: &'static str,
        value: u32,
        max: u32,
    },

    /// A scalar that must be strictly positive and finite
    #[error("{field} must be finite and > 0 (got {value})")]
    NotPositive { field: &'static str, value: f32 },

    /// A scalar that must be finite and non-negative
    #[error("{field} must be finite and >= 0 (got {value})")]
    Negative { field: &'static str, value: f32 },

    /// A vector with a NaN or infinite component
    #[error("{field} must have finite components")]
    NotFinite { field: &'static str },

    /// Stability factor outside `(0, 1]`
    #[error("stability_factor must be in (0, 1] (got {0})")]
    StabilityFactor(f32),

    /// Iteration bounds that cannot be satisfied
    #[error("iterations: need 1 <= min_iterations ({min}) <= max_iterations ({max})")]
    IterationBounds { min: u32, max: u32 },

    /// A pinned index that does not exist in the grid
    #[error("pinned point {id} is outside the {count}-point grid")]
    PinOutOfRange { id: PointId, count: usize },
}

/// Errors that can occur while driving or exporting a simulation
#[derive(Error, Debug)]
pub enum ClothError {
    /// The configuration failed validation
    #[error("invalid configuration: {}", join_config_errors(.0))]
    Config(Vec<ConfigError>),

    /// A handle does not refer to a live mass point
    #[error("point {id} does not exist (cloth has {count} points)")]
    InvalidPoint { id: PointId, count: usize },

    /// The simulation has no built state yet
    #[error("simulation has not been started")]
    NotStarted,

    /// A frame time step that is not finite and positive
    #[error("time step must be finite and > 0 (got {0})")]
    InvalidTimeStep(f32),

    /// The file format is not supported
    #[error("unsupported format: {0}")]
    UnsupportedFormat(String),

    /// The file extension could not be determined
    #[error("could not determine file format from path: {0}")]
    UnknownExtension(String),

    /// An I/O error occurred
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// A parsing error occurred
    #[error("parse error: {0}")]
    Parse(String),

    /// A rendering/writing error occurred
    #[error("write error: {0}")]
    Write(String),
}

impl From<Vec<ConfigError>> for ClothError {
    fn from(errors: Vec<ConfigError>) -> Self {
        Self::Config(errors)
    }
}

fn join_config_errors(errors: &[ConfigError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

/// Result type for simulation operations
pub type ClothResult<T> = Result<T, ClothError>;
