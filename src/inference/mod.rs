//! Inference domain: the prediction facade and the results it returns.

pub mod domain;
pub mod service;

pub use domain::{BatchRow, PredictionResult};
pub use service::PredictionService;
