//! Feature reconciliation: arbitrary records in, the bundle's exact matrix out.

use crate::common::error::{AeroError, AeroResult};
use crate::common::matrix::Matrix;
use crate::models::domain::ModelBundle;

use super::domain::{is_numeric_column, InputRecord, RawValue, UNKNOWN};

/// Reconcile `records` against `bundle.schema`, one output row per record in
/// input order and one column per schema entry in schema order.
///
/// Categorical columns go through the bundle's encoders, so vocabulary grown
/// by an earlier row is visible to later ones.
pub fn transform(records: &[InputRecord], bundle: &ModelBundle) -> AeroResult<Matrix> {
    let n_rows = records.len();
    let missing_categorical = RawValue::Text(UNKNOWN.to_string());
    let missing_numeric = RawValue::Integer(0);

    let mut columns = Vec::with_capacity(bundle.schema.len());
    for column in &bundle.schema {
        let numeric = is_numeric_column(column);
        let raw = records.iter().map(|record| {
            record.get(column).unwrap_or(if numeric {
                &missing_numeric
            } else {
                &missing_categorical
            })
        });

        let values: Vec<f64> = if numeric {
            raw.map(RawValue::to_number).collect()
        } else {
            let labels: Vec<String> = raw.map(RawValue::to_category).collect();
            bundle
                .encoders
                .encode(column, &labels)
                .into_iter()
                .map(f64::from)
                .collect()
        };
        columns.push(values);
    }

    let mut matrix = Matrix::from_columns(n_rows, &columns).ok_or(AeroError::FeatureMismatch {
        expected: bundle.expected_feature_count,
        actual: columns.len(),
    })?;
    matrix.map_in_place(|_, value| if value.is_nan() { 0.0 } else { value });

    if matrix.n_cols() != bundle.expected_feature_count {
        return Err(AeroError::FeatureMismatch {
            expected: bundle.expected_feature_count,
            actual: matrix.n_cols(),
        });
    }

    match &bundle.scaler {
        Some(scaler) => scaler.transform(&matrix),
        None => Ok(matrix),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::features::encoder::{CategoryEncoder, EncoderSet};
    use crate::features::scaler::StandardScaler;
    use crate::models::predictor::{NearestCentroidModel, PredictorModel};
    use std::collections::BTreeMap;

    fn bundle(schema: &[&str], encoders: EncoderSet) -> ModelBundle {
        let width = schema.len();
        ModelBundle {
            predictor: PredictorModel::NearestCentroid(NearestCentroidModel {
                classes: vec!["a".into()],
                centroids: vec![vec![0.0; width]],
            }),
            scaler: None,
            encoders,
            schema: schema.iter().map(|s| s.to_string()).collect(),
            expected_feature_count: width,
        }
    }

    #[test]
    fn missing_categorical_column_encodes_unknown() {
        let b = bundle(&["A", "B"], EncoderSet::new());
        let record = InputRecord::new().with("A", "x");

        let x = transform(&[record], &b).unwrap();
        let a = b.encoders.snapshot()["A"].code("x").unwrap();
        let unknown = b.encoders.snapshot()["B"].code(UNKNOWN).unwrap();
        assert_eq!(x.row(0), &[f64::from(a), f64::from(unknown)]);
    }

    #[test]
    fn numeric_columns_default_and_coerce_to_zero() {
        let b = bundle(
            &["Total.Fatal.Injuries", "Number.of.Engines", "Total.Uninjured"],
            EncoderSet::new(),
        );
        let record = InputRecord::new()
            .with("Total.Fatal.Injuries", "N/A")
            .with("Total.Uninjured", 4_i64);

        let x = transform(&[record], &b).unwrap();
        assert_eq!(x.row(0), &[0.0, 0.0, 4.0]);
    }

    #[test]
    fn output_follows_schema_order_not_record_order() {
        let encoders = EncoderSet::from_map(BTreeMap::from([
            ("Make".to_string(), CategoryEncoder::with_classes("Make", ["Cessna", "Piper"])),
        ]));
        let b = bundle(&["Number.of.Engines", "Make"], encoders);
        let record = InputRecord::new()
            .with("Make", "Piper")
            .with("Number.of.Engines", 2_i64)
            .with("Ignored.Column", "whatever");

        let x = transform(&[record], &b).unwrap();
        assert_eq!(x.row(0), &[2.0, 1.0]);
    }

    #[test]
    fn batch_rows_share_growing_vocabulary() {
        let b = bundle(&["Make"], EncoderSet::new());
        let rows = [
            InputRecord::new().with("Make", "Beech"),
            InputRecord::new().with("Make", "Mooney"),
            InputRecord::new().with("Make", "Beech"),
        ];

        let x = transform(&rows, &b).unwrap();
        assert_eq!(x.as_slice(), &[0.0, 1.0, 0.0]);
    }

    #[test]
    fn scaler_is_applied_after_encoding() {
        let mut b = bundle(&["Number.of.Engines"], EncoderSet::new());
        b.scaler = Some(StandardScaler::new(vec![1.0], vec![0.5]));
        let record = InputRecord::new().with("Number.of.Engines", 2_i64);

        let x = transform(&[record], &b).unwrap();
        assert_eq!(x.row(0), &[2.0]);
    }

    #[test]
    fn width_disagreement_is_a_feature_mismatch() {
        let mut b = bundle(&["A"], EncoderSet::new());
        b.expected_feature_count = 2;

        let err = transform(&[InputRecord::new()], &b).unwrap_err();
        assert!(matches!(
            err,
            AeroError::FeatureMismatch {
                expected: 2,
                actual: 1
            }
        ));
    }
}
