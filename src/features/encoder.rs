//! Per-column categorical encoders whose vocabulary grows on demand.
//!
//! Codes are assigned in first-seen order and never reassigned. When a stored
//! vocabulary turns out to be inconsistent the column's encoder is rebuilt
//! from the batch being encoded, which breaks compatibility with the training
//! codes for that column but keeps predictions flowing.

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use parking_lot::{Mutex, RwLock};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::warn;

/// Failures internal to a single encoder. Recovered by [`EncoderSet`].
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum EncoderError {
    #[error("vocabulary for {column} holds duplicate entry {value:?}")]
    Inconsistent { column: String, value: String },

    #[error("value {value:?} unseen by encoder for {column}")]
    Unseen { column: String, value: String },
}

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
struct EncoderRepr {
    #[serde(default)]
    column: String,
    classes: Vec<String>,
}

/// Maps the string values of one column to stable integer codes.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(from = "EncoderRepr", into = "EncoderRepr")]
pub struct CategoryEncoder {
    column: String,
    classes: Vec<String>,
    index: HashMap<String, u32>,
}

impl From<EncoderRepr> for CategoryEncoder {
    fn from(repr: EncoderRepr) -> Self {
        let mut index = HashMap::with_capacity(repr.classes.len());
        for (code, value) in repr.classes.iter().enumerate() {
            // first occurrence keeps its code; duplicates surface on next use
            index.entry(value.clone()).or_insert(code as u32);
        }
        Self {
            column: repr.column,
            classes: repr.classes,
            index,
        }
    }
}

impl From<CategoryEncoder> for EncoderRepr {
    fn from(encoder: CategoryEncoder) -> Self {
        Self {
            column: encoder.column,
            classes: encoder.classes,
        }
    }
}

impl CategoryEncoder {
    /// Empty encoder for `column`.
    pub fn new(column: impl Into<String>) -> Self {
        Self {
            column: column.into(),
            ..Self::default()
        }
    }

    /// Encoder over an explicit vocabulary, in code order.
    pub fn with_classes<I, S>(column: impl Into<String>, classes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        EncoderRepr {
            column: column.into(),
            classes: classes.into_iter().map(Into::into).collect(),
        }
        .into()
    }

    /// Fresh encoder fit on `values`, codes in order of first appearance.
    pub fn fit<S: AsRef<str>>(column: impl Into<String>, values: &[S]) -> Self {
        let mut encoder = Self::new(column);
        for value in values {
            encoder.push(value.as_ref());
        }
        encoder
    }

    pub fn column(&self) -> &str {
        &self.column
    }

    pub(crate) fn set_column(&mut self, column: &str) {
        if self.column.is_empty() {
            self.column = column.to_string();
        }
    }

    /// Known values, indexed by code.
    pub fn classes(&self) -> &[String] {
        &self.classes
    }

    pub fn code(&self, value: &str) -> Option<u32> {
        self.index.get(value).copied()
    }

    fn push(&mut self, value: &str) -> u32 {
        if let Some(code) = self.index.get(value) {
            return *code;
        }
        let code = self.classes.len() as u32;
        self.classes.push(value.to_string());
        self.index.insert(value.to_string(), code);
        code
    }

    fn check_consistent(&self) -> Result<(), EncoderError> {
        if self.index.len() == self.classes.len() {
            return Ok(());
        }
        let duplicate = self
            .classes
            .iter()
            .enumerate()
            .find(|(code, value)| self.index.get(*value) != Some(&(*code as u32)))
            .map(|(_, value)| value.clone())
            .unwrap_or_default();
        Err(EncoderError::Inconsistent {
            column: self.column.clone(),
            value: duplicate,
        })
    }

    /// Append every value not yet known, keeping existing codes.
    pub fn extend<S: AsRef<str>>(&mut self, values: &[S]) -> Result<(), EncoderError> {
        self.check_consistent()?;
        for value in values {
            self.push(value.as_ref());
        }
        Ok(())
    }

    /// Encode known values; fails on anything outside the vocabulary.
    pub fn transform<S: AsRef<str>>(&self, values: &[S]) -> Result<Vec<u32>, EncoderError> {
        self.check_consistent()?;
        values
            .iter()
            .map(|value| {
                self.code(value.as_ref()).ok_or_else(|| EncoderError::Unseen {
                    column: self.column.clone(),
                    value: value.as_ref().to_string(),
                })
            })
            .collect()
    }

    /// Extend with unseen values, then encode.
    pub fn extend_and_transform<S: AsRef<str>>(
        &mut self,
        values: &[S],
    ) -> Result<Vec<u32>, EncoderError> {
        self.extend(values)?;
        self.transform(values)
    }
}

/// The encoders of one bundle, one lock per column.
#[derive(Debug, Default)]
pub struct EncoderSet {
    columns: RwLock<HashMap<String, Arc<Mutex<CategoryEncoder>>>>,
}

impl EncoderSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build from stored encoders, filling in column names from the keys.
    pub fn from_map(encoders: BTreeMap<String, CategoryEncoder>) -> Self {
        let columns = encoders
            .into_iter()
            .map(|(column, mut encoder)| {
                encoder.set_column(&column);
                (column, Arc::new(Mutex::new(encoder)))
            })
            .collect();
        Self {
            columns: RwLock::new(columns),
        }
    }

    fn slot(&self, column: &str) -> Option<Arc<Mutex<CategoryEncoder>>> {
        self.columns.read().get(column).cloned()
    }

    /// Encode `values` for `column`, creating, extending or rebuilding the
    /// column's encoder as needed. Never fails.
    pub fn encode<S: AsRef<str>>(&self, column: &str, values: &[S]) -> Vec<u32> {
        let slot = match self.slot(column) {
            Some(slot) => slot,
            None => {
                let mut columns = self.columns.write();
                match columns.get(column) {
                    // another caller installed it while we waited
                    Some(existing) => existing.clone(),
                    None => {
                        let mut fresh = CategoryEncoder::fit(column, values);
                        let codes = transform_fitted(&mut fresh, values);
                        columns.insert(column.to_string(), Arc::new(Mutex::new(fresh)));
                        return codes;
                    }
                }
            }
        };

        let mut encoder = slot.lock();
        match encoder.extend_and_transform(values) {
            Ok(codes) => codes,
            Err(err) => {
                warn!(column, error = %err, "rebuilding categorical encoder from current batch");
                let mut fresh = CategoryEncoder::fit(column, values);
                let codes = transform_fitted(&mut fresh, values);
                *encoder = fresh;
                codes
            }
        }
    }

    pub fn contains(&self, column: &str) -> bool {
        self.columns.read().contains_key(column)
    }

    /// Copy of the current vocabularies, keyed by column.
    pub fn snapshot(&self) -> BTreeMap<String, CategoryEncoder> {
        self.columns
            .read()
            .iter()
            .map(|(column, slot)| (column.clone(), slot.lock().clone()))
            .collect()
    }
}

fn transform_fitted<S: AsRef<str>>(encoder: &mut CategoryEncoder, values: &[S]) -> Vec<u32> {
    // a freshly fit encoder knows every value it was fit on
    values
        .iter()
        .map(|value| encoder.push(value.as_ref()))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn fit_assigns_codes_in_first_seen_order() {
        let encoder = CategoryEncoder::fit("Make", &["Piper", "Cessna", "Piper"]);
        assert_eq!(encoder.classes(), &["Piper".to_string(), "Cessna".to_string()]);
        assert_eq!(encoder.code("Piper"), Some(0));
        assert_eq!(encoder.code("Cessna"), Some(1));
    }

    #[test]
    fn unseen_value_gets_next_code_and_keeps_it() {
        let set = EncoderSet::from_map(BTreeMap::from([(
            "Make".to_string(),
            CategoryEncoder::with_classes("", ["Cessna", "Piper"]),
        )]));

        assert_eq!(set.encode("Make", &["Beech"]), vec![2]);
        assert_eq!(set.encode("Make", &["Cessna", "Beech"]), vec![0, 2]);
        assert_eq!(set.snapshot()["Make"].column(), "Make");
    }

    #[test]
    fn missing_encoder_is_created_on_first_use() {
        let set = EncoderSet::new();
        assert!(!set.contains("Country"));
        assert_eq!(set.encode("Country", &["US", "FR", "US"]), vec![0, 1, 0]);
        assert!(set.contains("Country"));
    }

    #[test]
    fn inconsistent_vocabulary_is_rebuilt_from_batch() {
        let set = EncoderSet::from_map(BTreeMap::from([(
            "Make".to_string(),
            CategoryEncoder::with_classes("Make", ["Cessna", "Piper", "Cessna"]),
        )]));

        assert_eq!(set.encode("Make", &["Piper", "Mooney"]), vec![0, 1]);
        let rebuilt = &set.snapshot()["Make"];
        assert_eq!(rebuilt.classes(), &["Piper".to_string(), "Mooney".to_string()]);
    }

    #[test]
    fn transform_rejects_unseen_values() {
        let encoder = CategoryEncoder::with_classes("Make", ["Cessna"]);
        let err = encoder.transform(&["Piper"]).unwrap_err();
        assert!(matches!(err, EncoderError::Unseen { .. }));
    }

    #[test]
    fn serde_keeps_vocabulary_order() {
        let encoder = CategoryEncoder::fit("Make", &["b", "a"]);
        let json = serde_json::to_string(&encoder).unwrap();
        let back: CategoryEncoder = serde_json::from_str(&json).unwrap();
        assert_eq!(back.classes(), encoder.classes());
        assert_eq!(back.code("a"), Some(1));
    }

    proptest! {
        #[test]
        fn codes_never_change_once_assigned(
            first in prop::collection::vec("[a-e]{1,2}", 1..20),
            second in prop::collection::vec("[a-h]{1,2}", 0..20),
        ) {
            let set = EncoderSet::new();
            let before = set.encode("col", &first);
            set.encode("col", &second);
            let after = set.encode("col", &first);
            prop_assert_eq!(before, after);
        }
    }
}
