//! Shared utilities that glue the different domains together.
pub mod config;
pub mod error;
pub mod log;
pub mod matrix;
pub mod repr;

pub use error::{AeroCode, AeroError, AeroResult};
pub use matrix::Matrix;
