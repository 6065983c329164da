//! Input records and the column catalogues the reconciler works from.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::common::repr::float_repr;

/// Placeholder for categorical values that are absent from a record.
pub const UNKNOWN: &str = "Unknown";

/// Columns coerced to numbers; everything else is categorical.
pub const NUMERIC_COLUMNS: [&str; 5] = [
    "Number.of.Engines",
    "Total.Fatal.Injuries",
    "Total.Serious.Injuries",
    "Total.Minor.Injuries",
    "Total.Uninjured",
];

/// Curated subset surfaced to end users.
pub const IMPORTANT_FEATURES: [&str; 11] = [
    "Investigation.Type",
    "Location",
    "Country",
    "Injury.Severity",
    "Aircraft.Category",
    "Make",
    "Amateur.Built",
    "Engine.Type",
    "Purpose.of.flight",
    "Weather.Condition",
    "Broad.phase.of.flight",
];

/// Schema assumed for bare predictors and used to pad short stored schemas.
pub const DEFAULT_SCHEMA: [&str; 23] = [
    "Investigation.Type",
    "Location",
    "Country",
    "Injury.Severity",
    "Aircraft.Category",
    "Make",
    "Amateur.Built",
    "Engine.Type",
    "Purpose.of.flight",
    "Weather.Condition",
    "Broad.phase.of.flight",
    "Number.of.Engines",
    "Aircraft.damage",
    "Total.Fatal.Injuries",
    "Total.Serious.Injuries",
    "Total.Minor.Injuries",
    "Total.Uninjured",
    "Event.Date",
    "Airport.Code",
    "Model",
    "Schedule",
    "Air.carrier",
    "FAR.Description",
];

pub fn is_numeric_column(column: &str) -> bool {
    NUMERIC_COLUMNS.contains(&column)
}

/// One raw scalar as supplied by the caller.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RawValue {
    Missing,
    Bool(bool),
    Integer(i64),
    Float(f64),
    Text(String),
}

impl RawValue {
    /// Numeric coercion: unparseable values and NaN collapse to 0.
    pub fn to_number(&self) -> f64 {
        let value = match self {
            RawValue::Missing => 0.0,
            RawValue::Bool(b) => f64::from(u8::from(*b)),
            RawValue::Integer(i) => *i as f64,
            RawValue::Float(f) => *f,
            RawValue::Text(s) => s.trim().parse::<f64>().unwrap_or(0.0),
        };
        if value.is_nan() {
            0.0
        } else {
            value
        }
    }

    /// Categorical coercion: missing values become [`UNKNOWN`].
    pub fn to_category(&self) -> String {
        match self {
            RawValue::Missing => UNKNOWN.to_string(),
            other => other.to_string(),
        }
    }
}

impl fmt::Display for RawValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RawValue::Missing => f.write_str("None"),
            RawValue::Bool(true) => f.write_str("True"),
            RawValue::Bool(false) => f.write_str("False"),
            RawValue::Integer(i) => write!(f, "{i}"),
            RawValue::Float(x) => f.write_str(&float_repr(*x)),
            RawValue::Text(s) => f.write_str(s),
        }
    }
}

impl From<&str> for RawValue {
    fn from(value: &str) -> Self {
        RawValue::Text(value.to_string())
    }
}

impl From<String> for RawValue {
    fn from(value: String) -> Self {
        RawValue::Text(value)
    }
}

impl From<i64> for RawValue {
    fn from(value: i64) -> Self {
        RawValue::Integer(value)
    }
}

impl From<f64> for RawValue {
    fn from(value: f64) -> Self {
        RawValue::Float(value)
    }
}

/// Mapping from column name to raw scalar; one per prediction call.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct InputRecord(BTreeMap<String, RawValue>);

impl InputRecord {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, column: &str) -> Option<&RawValue> {
        self.0.get(column)
    }

    pub fn insert(&mut self, column: impl Into<String>, value: impl Into<RawValue>) {
        self.0.insert(column.into(), value.into());
    }

    /// Builder-style [`InputRecord::insert`].
    pub fn with(mut self, column: impl Into<String>, value: impl Into<RawValue>) -> Self {
        self.insert(column, value);
        self
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl<K: Into<String>, V: Into<RawValue>> FromIterator<(K, V)> for InputRecord {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self(
            iter.into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        )
    }
}

/// A plausible record over [`IMPORTANT_FEATURES`], handy for smoke tests.
pub fn sample_record() -> InputRecord {
    IMPORTANT_FEATURES
        .iter()
        .map(|&column| {
            let value = match column {
                "Investigation.Type" => "Accident",
                "Location" => "New York, NY",
                "Country" => "United States",
                "Injury.Severity" => "Minor",
                "Aircraft.Category" => "Airplane",
                "Make" => "Cessna",
                "Amateur.Built" => "No",
                "Engine.Type" => "Reciprocating",
                "Purpose.of.flight" => "Personal",
                "Weather.Condition" => "VMC",
                "Broad.phase.of.flight" => "Landing",
                _ => UNKNOWN,
            };
            (column, value)
        })
        .collect()
}
