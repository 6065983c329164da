// lib.rs - aviation damage prediction core
pub mod api;
pub mod common;
pub mod features;
pub mod inference;
pub mod models;

pub use common::{AeroCode, AeroError, AeroResult};
pub use features::{sample_record, InputRecord, RawValue};
pub use inference::{PredictionResult, PredictionService};
pub use models::{FsModelRepo, InMemoryModelRepo, ModelId, ModelRepo};
