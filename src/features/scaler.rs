//! Standard scaler applied after reconciliation, already fit at training time.

use serde::{Deserialize, Serialize};

use crate::common::error::{AeroError, AeroResult};
use crate::common::matrix::Matrix;

fn enabled() -> bool {
    true
}

/// Standardizes features: z = (x - mean) / scale.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct StandardScaler {
    /// Per-feature mean, in schema order.
    pub mean: Vec<f64>,
    /// Per-feature scale (standard deviation). Zero is treated as one.
    pub scale: Vec<f64>,
    #[serde(default = "enabled")]
    pub with_mean: bool,
    #[serde(default = "enabled")]
    pub with_std: bool,
}

impl StandardScaler {
    pub fn new(mean: Vec<f64>, scale: Vec<f64>) -> Self {
        Self {
            mean,
            scale,
            with_mean: true,
            with_std: true,
        }
    }

    pub fn n_features(&self) -> usize {
        self.mean.len()
    }

    /// Scale `x`; its width must match the fitted width.
    pub fn transform(&self, x: &Matrix) -> AeroResult<Matrix> {
        if self.mean.len() != self.scale.len() {
            return Err(AeroError::prediction(format!(
                "scaler has {} means but {} scales",
                self.mean.len(),
                self.scale.len()
            )));
        }
        if x.n_cols() != self.n_features() {
            return Err(AeroError::prediction(format!(
                "scaler was fit on {} features, got {}",
                self.n_features(),
                x.n_cols()
            )));
        }

        let mut out = x.clone();
        out.map_in_place(|j, mut value| {
            if self.with_mean {
                value -= self.mean[j];
            }
            if self.with_std && self.scale[j].abs() > 1e-12 {
                value /= self.scale[j];
            }
            value
        });
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn standardizes_each_column() {
        let scaler = StandardScaler::new(vec![1.0, 10.0], vec![2.0, 0.0]);
        let x = Matrix::from_rows(&[vec![3.0, 12.0]]).unwrap();
        let z = scaler.transform(&x).unwrap();
        assert_eq!(z.row(0), &[1.0, 2.0]);
    }

    #[test]
    fn width_mismatch_is_reported() {
        let scaler = StandardScaler::new(vec![0.0; 3], vec![1.0; 3]);
        let x = Matrix::from_rows(&[vec![1.0, 2.0]]).unwrap();
        let err = scaler.transform(&x).unwrap_err();
        assert!(matches!(err, AeroError::PredictionFailure(_)));
        assert!(err.to_string().contains("fit on 3 features, got 2"), "{err}");
    }

    #[test]
    fn flags_default_to_enabled() {
        let scaler: StandardScaler =
            serde_json::from_str(r#"{"mean":[1.0],"scale":[1.0]}"#).unwrap();
        assert!(scaler.with_mean && scaler.with_std);
    }
}
