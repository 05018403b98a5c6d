//! Error types for the head pointer library.

use crate::calibration::CalibrationStep;
use thiserror::Error;

/// Main error type for the library
#[derive(Error, Debug)]
pub enum Error {
    /// A landmark required by the feature extractor is absent from the frame
    #[error("Missing landmark {index} (frame has {available} points)")]
    MissingLandmark {
        /// Index in the landmark scheme
        index: usize,
        /// Number of points the frame carried
        available: usize,
    },

    /// Landmark geometry cannot produce a finite feature (e.g. zero-width eye)
    #[error("Degenerate geometry: {0}")]
    DegenerateGeometry(String),

    /// A profile or configuration value violates its invariants
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// A calibration run was cancelled before completion
    #[error("Calibration aborted during {step}")]
    CalibrationAborted {
        /// Step that was in progress when the run was cancelled
        step: CalibrationStep,
    },

    /// File I/O operation failed
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// A record could not be parsed or written
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Invalid input parameters provided
    #[error("Invalid input: {0}")]
    InvalidInput(String),
}

/// Convenience type alias for Results with our Error type
pub type Result<T> = std::result::Result<T, Error>;
