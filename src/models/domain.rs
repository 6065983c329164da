//! Domain types for model bundles, their storage shapes and the registry seam.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::common::error::AeroResult;
use crate::features::domain::DEFAULT_SCHEMA;
use crate::features::encoder::{CategoryEncoder, EncoderSet};
use crate::features::scaler::StandardScaler;

use super::predictor::{Classifier, PredictorModel};

/// Suffix that marks a model bundle file in the models directory.
pub const BUNDLE_SUFFIX: &str = ".bundle.json";

/// Identifier of a stored model: its file name without [`BUNDLE_SUFFIX`].
#[derive(Clone, Debug, Eq, PartialEq, Ord, PartialOrd, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ModelId(String);

impl ModelId {
    /// Construct a model identifier from a string slice.
    pub fn new<S: Into<String>>(value: S) -> Self {
        Self(value.into())
    }

    /// Borrow the identifier as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ModelId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ModelId {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

/// Full bundle as written by the training pipeline.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct BundleParts {
    pub model: PredictorModel,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scaler: Option<StandardScaler>,
    #[serde(default)]
    pub label_encoders: BTreeMap<String, CategoryEncoder>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub feature_names: Option<Vec<String>>,
}

/// The two shapes a stored bundle may take.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(untagged)]
pub enum StoredBundle {
    Structured(BundleParts),
    Bare(PredictorModel),
}

/// A loaded model and everything needed to feed it.
///
/// Only `encoders` changes after load, as unseen categories arrive.
#[derive(Debug)]
pub struct ModelBundle {
    pub predictor: PredictorModel,
    pub scaler: Option<StandardScaler>,
    pub encoders: EncoderSet,
    /// Effective column order fed to the predictor.
    pub schema: Vec<String>,
    pub expected_feature_count: usize,
}

impl ModelBundle {
    /// Resolve either storage shape into the canonical bundle.
    pub fn from_stored(stored: StoredBundle) -> Self {
        let (predictor, scaler, encoders, stored_schema) = match stored {
            StoredBundle::Structured(parts) => (
                parts.model,
                parts.scaler,
                parts.label_encoders,
                parts.feature_names,
            ),
            StoredBundle::Bare(model) => (model, None, BTreeMap::new(), None),
        };
        let stored_schema = stored_schema
            .unwrap_or_else(|| DEFAULT_SCHEMA.iter().map(|s| s.to_string()).collect());

        let declared = predictor.n_features_in();
        let schema = reconcile_schema(&stored_schema, declared, &DEFAULT_SCHEMA);
        let expected_feature_count = declared.unwrap_or(schema.len());

        Self {
            predictor,
            scaler,
            encoders: EncoderSet::from_map(encoders),
            schema,
            expected_feature_count,
        }
    }

    /// Structured storage shape carrying the current encoder vocabularies.
    pub fn to_stored(&self) -> StoredBundle {
        StoredBundle::Structured(BundleParts {
            model: self.predictor.clone(),
            scaler: self.scaler.clone(),
            label_encoders: self.encoders.snapshot(),
            feature_names: Some(self.schema.clone()),
        })
    }
}

/// Fit `stored` to the predictor's declared width.
///
/// Longer schemas are truncated. Shorter ones are padded with `defaults`
/// entries not already present, then with `Unnamed.<i>` placeholders if the
/// defaults run out. Without a declared width the stored schema is kept as is.
pub fn reconcile_schema<S: AsRef<str>>(
    stored: &[String],
    declared: Option<usize>,
    defaults: &[S],
) -> Vec<String> {
    let Some(width) = declared else {
        return stored.to_vec();
    };

    let mut schema: Vec<String> = stored.iter().take(width).cloned().collect();
    for column in defaults {
        if schema.len() >= width {
            break;
        }
        let column = column.as_ref();
        if !schema.iter().any(|c| c == column) {
            schema.push(column.to_string());
        }
    }
    let mut filler = schema.len();
    while schema.len() < width {
        schema.push(format!("Unnamed.{filler}"));
        filler += 1;
    }
    schema
}

/// Storage backend the registry and loader read bundles from.
pub trait ModelRepo: Send + Sync {
    /// Identifiers of every stored bundle, sorted. Empty when the storage
    /// location is absent or unreadable.
    fn list(&self) -> Vec<ModelId>;

    /// Raw bytes of one bundle; `NotFound` when nothing matches.
    fn read(&self, id: &ModelId) -> AeroResult<Vec<u8>>;

    /// Store raw bundle bytes under `id`, replacing any previous entry.
    fn write(&self, id: &ModelId, bytes: &[u8]) -> AeroResult<()>;
}
