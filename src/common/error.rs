//! Error handling primitives shared across the core.
//!
//! Every failure that leaves the crate is an [`AeroError`]; the numeric
//! [`AeroCode`] is what crosses the C ABI.

use std::io;

use thiserror::Error;

/// Stable error codes that cross the FFI boundary.
#[repr(u32)]
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum AeroCode {
    /// Success code used as a sentinel.
    Ok = 0,
    /// No storage entry matches the model identifier.
    NotFound = 1,
    /// Bundle could not be deserialized or has an unknown shape.
    CorruptBundle = 2,
    /// Prediction requested before any model was activated.
    NoModelLoaded = 3,
    /// Reconciled feature width disagrees with the bundle.
    FeatureMismatch = 4,
    /// The predictor itself failed.
    PredictionFailure = 5,
    /// Caller payload failed validation.
    InvalidInput = 6,
    /// Storage IO failed.
    Io = 7,
}

/// Canonical error type for the core.
#[derive(Error, Debug)]
pub enum AeroError {
    #[error("model not found: {0}")]
    NotFound(String),

    #[error("corrupt bundle {id}: {reason}")]
    CorruptBundle { id: String, reason: String },

    #[error("no model loaded")]
    NoModelLoaded,

    #[error("feature count mismatch: expected {expected}, got {actual}")]
    FeatureMismatch { expected: usize, actual: usize },

    #[error("prediction failed: {0}")]
    PredictionFailure(String),

    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("io error: {0}")]
    Io(#[from] io::Error),
}

/// Result alias used throughout the crate.
pub type AeroResult<T> = Result<T, AeroError>;

impl AeroError {
    /// Corrupt bundle helper.
    pub fn corrupt(id: impl Into<String>, reason: impl ToString) -> Self {
        Self::CorruptBundle {
            id: id.into(),
            reason: reason.to_string(),
        }
    }

    /// Predictor failure helper.
    pub fn prediction(reason: impl Into<String>) -> Self {
        Self::PredictionFailure(reason.into())
    }

    /// Machine parsable code for this error.
    pub fn code(&self) -> AeroCode {
        match self {
            AeroError::NotFound(_) => AeroCode::NotFound,
            AeroError::CorruptBundle { .. } => AeroCode::CorruptBundle,
            AeroError::NoModelLoaded => AeroCode::NoModelLoaded,
            AeroError::FeatureMismatch { .. } => AeroCode::FeatureMismatch,
            AeroError::PredictionFailure(_) => AeroCode::PredictionFailure,
            AeroError::InvalidInput(_) => AeroCode::InvalidInput,
            AeroError::Io(_) => AeroCode::Io,
        }
    }
}
