//! Models domain: stored bundles, the predictors inside them and the registry
//! that discovers and loads them.

pub mod domain;
pub mod predictor;
pub mod repo_fs;
pub mod repo_mem;
pub mod service;

pub use domain::{ModelBundle, ModelId, ModelRepo, StoredBundle};
pub use predictor::{ClassLabel, Classifier, PredictorModel};
pub use repo_fs::FsModelRepo;
pub use repo_mem::InMemoryModelRepo;
