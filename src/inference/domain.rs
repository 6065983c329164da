//! Results handed back to callers of the prediction service.

use serde::Serialize;

use crate::models::domain::ModelId;
use crate::models::predictor::ClassLabel;

/// Outcome of a single prediction call.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct PredictionResult {
    #[serde(rename = "prediction")]
    pub label: String,
    /// Highest class probability as a percentage; 0 when unavailable.
    pub confidence: f64,
    #[serde(rename = "model_used")]
    pub model: ModelId,
}

/// One row of a batch run. Failed rows carry the error message instead.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct BatchRow {
    pub row_index: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub prediction: Option<String>,
    pub confidence: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Render the predictor's answer for one input row as a display string.
///
/// A single label is unwrapped; anything else renders as a bracketed list.
pub fn display_label(labels: &[ClassLabel]) -> String {
    match labels {
        [single] => single.to_string(),
        many => {
            let items: Vec<String> = many.iter().map(ToString::to_string).collect();
            format!("[{}]", items.join(", "))
        }
    }
}

/// Confidence percentage from one row of class probabilities.
pub fn confidence_from_row(row: &[f64]) -> f64 {
    row.iter()
        .copied()
        .filter(|p| p.is_finite())
        .fold(None, |best: Option<f64>, p| Some(best.map_or(p, |b| b.max(p))))
        .map_or(0.0, |p| p * 100.0)
}
