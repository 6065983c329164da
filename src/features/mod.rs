//! Features domain: input records, categorical encoding, scaling and the
//! reconciler that turns arbitrary records into a model's feature matrix.

pub mod domain;
pub mod encoder;
pub mod scaler;
pub mod service;

pub use domain::{sample_record, InputRecord, RawValue, IMPORTANT_FEATURES};
pub use encoder::{CategoryEncoder, EncoderSet};
pub use scaler::StandardScaler;
