//! The prediction facade: owns the active bundle and answers requests with it.

use std::slice;
use std::sync::Arc;
use std::time::Instant;

use parking_lot::RwLock;
use tracing::{debug, info, warn};

use crate::common::error::{AeroError, AeroResult};
use crate::features::domain::{InputRecord, IMPORTANT_FEATURES};
use crate::features::service as features;
use crate::models::domain::{ModelBundle, ModelId, ModelRepo};
use crate::models::predictor::Classifier;
use crate::models::service as models;

use super::domain::{confidence_from_row, display_label, BatchRow, PredictionResult};

/// A bundle together with the identifier it was loaded under.
#[derive(Debug)]
pub struct ActiveModel {
    pub id: ModelId,
    pub bundle: ModelBundle,
}

/// Single source of truth for which model answers requests.
///
/// Predictions take a shared reference to the active model, so an
/// activation never disturbs a prediction already in flight.
pub struct PredictionService {
    repo: Arc<dyn ModelRepo>,
    active: RwLock<Option<Arc<ActiveModel>>>,
}

impl PredictionService {
    /// Build the service and activate the first listed model, if any.
    pub fn new(repo: Arc<dyn ModelRepo>) -> Self {
        let service = Self::empty(repo);
        match service.list_models().into_iter().next() {
            Some(first) => {
                if let Err(err) = service.activate(first.as_str()) {
                    warn!(model = %first, error = %err, "default model failed to load");
                }
            }
            None => warn!("no model bundles found; predictions unavailable until activation"),
        }
        service
    }

    /// Build the service without activating anything.
    pub fn empty(repo: Arc<dyn ModelRepo>) -> Self {
        Self {
            repo,
            active: RwLock::new(None),
        }
    }

    pub fn list_models(&self) -> Vec<ModelId> {
        models::list_models(self.repo.as_ref())
    }

    /// Load `id` and make it the active model. On failure the previously
    /// active model keeps serving.
    pub fn activate(&self, id: &str) -> AeroResult<()> {
        let id = ModelId::new(id);
        let bundle = models::load_bundle(self.repo.as_ref(), &id)?;
        let next = Arc::new(ActiveModel {
            id: id.clone(),
            bundle,
        });
        let previous = self.active.write().replace(next);
        info!(
            model = %id,
            previous = ?previous.as_ref().map(|p| p.id.as_str()),
            "activated model"
        );
        Ok(())
    }

    /// Identifier of the model currently answering requests.
    pub fn active_model(&self) -> Option<ModelId> {
        self.current().map(|active| active.id.clone())
    }

    /// Effective schema of the active model.
    pub fn schema(&self) -> Option<Vec<String>> {
        self.current().map(|active| active.bundle.schema.clone())
    }

    /// Curated columns surfaced to end users.
    pub fn feature_names(&self) -> &'static [&'static str] {
        &IMPORTANT_FEATURES
    }

    fn current(&self) -> Option<Arc<ActiveModel>> {
        self.active.read().clone()
    }

    /// Predict one record with the active model.
    pub fn predict(&self, record: &InputRecord) -> AeroResult<PredictionResult> {
        let active = self.current().ok_or(AeroError::NoModelLoaded)?;
        let started = Instant::now();
        let bundle = &active.bundle;

        let x = features::transform(slice::from_ref(record), bundle)?;
        let labels = bundle.predictor.predict(&x).map_err(|err| match err {
            AeroError::PredictionFailure(_) => err,
            other => AeroError::prediction(other.to_string()),
        })?;

        let confidence = match bundle.predictor.predict_proba(&x) {
            Some(Ok(proba)) if proba.n_rows() > 0 => confidence_from_row(proba.row(0)),
            Some(Ok(_)) => 0.0,
            Some(Err(err)) => {
                debug!(model = %active.id, error = %err, "probabilities failed; confidence set to 0");
                0.0
            }
            None => {
                debug!(model = %active.id, "predictor has no probabilities; confidence set to 0");
                0.0
            }
        };

        let result = PredictionResult {
            label: display_label(&labels),
            confidence,
            model: active.id.clone(),
        };
        debug!(
            model = %result.model,
            label = %result.label,
            confidence = result.confidence,
            dur_us = started.elapsed().as_micros() as u64,
            "prediction"
        );
        Ok(result)
    }

    /// Predict every record in order. Later rows see vocabulary added by
    /// earlier ones; a failing row does not stop the batch.
    pub fn predict_batch(&self, records: &[InputRecord]) -> Vec<BatchRow> {
        records
            .iter()
            .enumerate()
            .map(|(row_index, record)| match self.predict(record) {
                Ok(result) => BatchRow {
                    row_index,
                    prediction: Some(result.label),
                    confidence: result.confidence,
                    error: None,
                },
                Err(err) => BatchRow {
                    row_index,
                    prediction: None,
                    confidence: 0.0,
                    error: Some(err.to_string()),
                },
            })
            .collect()
    }
}
