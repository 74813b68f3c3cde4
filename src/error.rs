//! Error types for the gaze estimation library.

use thiserror::Error;

/// Main error type for the library
#[derive(Error, Debug)]
pub enum Error {
    /// File I/O operation failed
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Calibration record could not be encoded or decoded
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Image encoding failed
    #[error("Image error: {0}")]
    Image(#[from] image::ImageError),

    /// Not enough samples to run an estimation step
    #[error("Insufficient data for {what}: need {needed}, have {available}")]
    InsufficientData {
        /// Which estimation step was attempted
        what: &'static str,
        /// Minimum number of samples required
        needed: usize,
        /// Number of samples available
        available: usize,
    },

    /// Regression normal equations could not be inverted
    #[error("Singular matrix: {0}")]
    SingularMatrix(String),

    /// Operation requires a fitted calibration model
    #[error("Calibration model is not calibrated")]
    NotCalibrated,

    /// Invalid input parameters provided
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    ConfigError(String),
}

/// Convenience type alias for Results with our Error type
pub type Result<T> = std::result::Result<T, Error>;
