//! Trained classifiers that can live inside a bundle.
//!
//! Each kind is plain data (coefficients, tree nodes, centroids) exported by
//! the training pipeline; [`PredictorModel`] dispatches to them behind the
//! [`Classifier`] seam.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::common::error::{AeroError, AeroResult};
use crate::common::matrix::Matrix;
use crate::common::repr::float_repr;

/// A class label as stored by the training pipeline.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ClassLabel {
    Integer(i64),
    Float(f64),
    Text(String),
}

impl fmt::Display for ClassLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ClassLabel::Integer(i) => write!(f, "{i}"),
            ClassLabel::Float(x) => f.write_str(&float_repr(*x)),
            ClassLabel::Text(s) => f.write_str(s),
        }
    }
}

impl From<&str> for ClassLabel {
    fn from(value: &str) -> Self {
        ClassLabel::Text(value.to_string())
    }
}

/// Behaviour every predictor must offer.
pub trait Classifier {
    /// Input width the predictor was trained on, if it records one.
    fn n_features_in(&self) -> Option<usize>;

    /// One label per row of `x`.
    fn predict(&self, x: &Matrix) -> AeroResult<Vec<ClassLabel>>;

    /// Per-class probabilities, one row per row of `x`. `None` when the
    /// predictor has no probability estimates at all.
    fn predict_proba(&self, _x: &Matrix) -> Option<AeroResult<Matrix>> {
        None
    }
}

fn check_width(x: &Matrix, expected: usize) -> AeroResult<()> {
    if x.n_cols() == expected {
        Ok(())
    } else {
        Err(AeroError::prediction(format!(
            "X has {} features, but the predictor is expecting {expected} features",
            x.n_cols()
        )))
    }
}

fn argmax(values: &[f64]) -> Option<usize> {
    let mut best: Option<(usize, f64)> = None;
    for (idx, &value) in values.iter().enumerate() {
        match best {
            Some((_, current)) if value <= current => {}
            _ => best = Some((idx, value)),
        }
    }
    best.map(|(idx, _)| idx)
}

fn labels_from_proba(classes: &[ClassLabel], proba: &Matrix) -> AeroResult<Vec<ClassLabel>> {
    proba
        .rows()
        .map(|row| {
            argmax(row)
                .and_then(|idx| classes.get(idx).cloned())
                .ok_or_else(|| AeroError::prediction("no class scores for row"))
        })
        .collect()
}

/// Linear model with sigmoid (binary) or softmax (multiclass) output.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct LogisticModel {
    pub classes: Vec<ClassLabel>,
    /// One coefficient row for binary problems, one per class otherwise.
    pub coef: Vec<Vec<f64>>,
    pub intercept: Vec<f64>,
}

impl LogisticModel {
    fn width(&self) -> usize {
        self.coef.first().map_or(0, Vec::len)
    }

    fn decision(&self, row: &[f64]) -> Vec<f64> {
        self.coef
            .iter()
            .zip(&self.intercept)
            .map(|(w, b)| w.iter().zip(row).map(|(w, x)| w * x).sum::<f64>() + b)
            .collect()
    }

    fn proba(&self, x: &Matrix) -> AeroResult<Matrix> {
        check_width(x, self.width())?;
        let binary = self.coef.len() == 1 && self.classes.len() == 2;
        if !binary && self.coef.len() != self.classes.len() {
            return Err(AeroError::prediction(format!(
                "{} coefficient rows for {} classes",
                self.coef.len(),
                self.classes.len()
            )));
        }
        if self.intercept.len() != self.coef.len() {
            return Err(AeroError::prediction("intercept length differs from coef rows"));
        }

        let rows: Vec<Vec<f64>> = x
            .rows()
            .map(|row| {
                let scores = self.decision(row);
                if binary {
                    let p = 1.0 / (1.0 + (-scores[0]).exp());
                    vec![1.0 - p, p]
                } else {
                    softmax(&scores)
                }
            })
            .collect();
        Matrix::from_rows(&rows).ok_or_else(|| AeroError::prediction("ragged probabilities"))
    }
}

fn softmax(scores: &[f64]) -> Vec<f64> {
    let max = scores.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    let exp: Vec<f64> = scores.iter().map(|s| (s - max).exp()).collect();
    let total: f64 = exp.iter().sum();
    exp.into_iter().map(|e| e / total).collect()
}

impl Classifier for LogisticModel {
    fn n_features_in(&self) -> Option<usize> {
        Some(self.width())
    }

    fn predict(&self, x: &Matrix) -> AeroResult<Vec<ClassLabel>> {
        labels_from_proba(&self.classes, &self.proba(x)?)
    }

    fn predict_proba(&self, x: &Matrix) -> Option<AeroResult<Matrix>> {
        Some(self.proba(x))
    }
}

/// One node of a binary decision tree.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum TreeNode {
    /// Go `left` when `x[feature] <= threshold`, `right` otherwise.
    Split {
        feature: usize,
        threshold: f64,
        left: usize,
        right: usize,
    },
    /// Per-class training weights that reached this leaf.
    Leaf { value: Vec<f64> },
}

/// Decision tree; node 0 is the root.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct DecisionTreeModel {
    pub classes: Vec<ClassLabel>,
    pub nodes: Vec<TreeNode>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub n_features: Option<usize>,
}

impl DecisionTreeModel {
    fn leaf(&self, row: &[f64]) -> AeroResult<&[f64]> {
        let mut idx = 0;
        // a well-formed tree reaches a leaf in at most nodes.len() steps
        for _ in 0..=self.nodes.len() {
            match self.nodes.get(idx) {
                Some(TreeNode::Leaf { value }) => return Ok(value.as_slice()),
                Some(TreeNode::Split {
                    feature,
                    threshold,
                    left,
                    right,
                }) => {
                    let value = row.get(*feature).ok_or_else(|| {
                        AeroError::prediction(format!(
                            "split on feature {feature} but row has {}",
                            row.len()
                        ))
                    })?;
                    idx = if *value <= *threshold { *left } else { *right };
                }
                None => return Err(AeroError::prediction(format!("tree node {idx} missing"))),
            }
        }
        Err(AeroError::prediction("tree contains a cycle"))
    }

    fn proba(&self, x: &Matrix) -> AeroResult<Matrix> {
        if let Some(width) = self.n_features {
            check_width(x, width)?;
        }
        let rows = x
            .rows()
            .map(|row| {
                let value = self.leaf(row)?;
                if value.len() != self.classes.len() {
                    return Err(AeroError::prediction("leaf width differs from class count"));
                }
                let total: f64 = value.iter().sum();
                Ok(if total > 0.0 {
                    value.iter().map(|v| v / total).collect()
                } else {
                    value.to_vec()
                })
            })
            .collect::<AeroResult<Vec<Vec<f64>>>>()?;
        Matrix::from_vec(x.n_rows(), self.classes.len(), rows.concat())
            .ok_or_else(|| AeroError::prediction("ragged probabilities"))
    }
}

impl Classifier for DecisionTreeModel {
    fn n_features_in(&self) -> Option<usize> {
        self.n_features
    }

    fn predict(&self, x: &Matrix) -> AeroResult<Vec<ClassLabel>> {
        labels_from_proba(&self.classes, &self.proba(x)?)
    }

    fn predict_proba(&self, x: &Matrix) -> Option<AeroResult<Matrix>> {
        Some(self.proba(x))
    }
}

/// Nearest centroid by Euclidean distance. Has no probability estimates.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct NearestCentroidModel {
    pub classes: Vec<ClassLabel>,
    pub centroids: Vec<Vec<f64>>,
}

impl Classifier for NearestCentroidModel {
    fn n_features_in(&self) -> Option<usize> {
        self.centroids.first().map(Vec::len)
    }

    fn predict(&self, x: &Matrix) -> AeroResult<Vec<ClassLabel>> {
        if self.centroids.len() != self.classes.len() {
            return Err(AeroError::prediction("centroid count differs from class count"));
        }
        check_width(x, self.n_features_in().unwrap_or(0))?;
        x.rows()
            .map(|row| {
                let distances: Vec<f64> = self
                    .centroids
                    .iter()
                    .map(|c| -c.iter().zip(row).map(|(c, x)| (c - x).powi(2)).sum::<f64>())
                    .collect();
                argmax(&distances)
                    .map(|idx| self.classes[idx].clone())
                    .ok_or_else(|| AeroError::prediction("no centroids"))
            })
            .collect()
    }
}

/// Every predictor kind a bundle may carry, tagged by `kind`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum PredictorModel {
    Logistic(LogisticModel),
    DecisionTree(DecisionTreeModel),
    NearestCentroid(NearestCentroidModel),
}

impl PredictorModel {
    pub fn kind(&self) -> &'static str {
        match self {
            PredictorModel::Logistic(_) => "logistic",
            PredictorModel::DecisionTree(_) => "decision_tree",
            PredictorModel::NearestCentroid(_) => "nearest_centroid",
        }
    }

    fn inner(&self) -> &dyn Classifier {
        match self {
            PredictorModel::Logistic(m) => m,
            PredictorModel::DecisionTree(m) => m,
            PredictorModel::NearestCentroid(m) => m,
        }
    }
}

impl Classifier for PredictorModel {
    fn n_features_in(&self) -> Option<usize> {
        self.inner().n_features_in()
    }

    fn predict(&self, x: &Matrix) -> AeroResult<Vec<ClassLabel>> {
        self.inner().predict(x)
    }

    fn predict_proba(&self, x: &Matrix) -> Option<AeroResult<Matrix>> {
        self.inner().predict_proba(x)
    }
}
