//! Registry, loader and saver operations over a [`ModelRepo`].

use tracing::{debug, info};

use crate::common::error::{AeroError, AeroResult};

use super::domain::{ModelBundle, ModelId, ModelRepo, StoredBundle};
use super::predictor::Classifier;

/// Identifiers of every stored bundle.
pub fn list_models(repo: &dyn ModelRepo) -> Vec<ModelId> {
    repo.list()
}

/// Parse raw bytes into one of the accepted storage shapes.
pub fn decode_bundle(id: &ModelId, bytes: &[u8]) -> AeroResult<StoredBundle> {
    serde_json::from_slice(bytes).map_err(|err| {
        AeroError::corrupt(
            id.as_str(),
            format!("neither a predictor nor a recognised bundle ({err})"),
        )
    })
}

/// Load and resolve one bundle. Never touches any other loaded bundle.
pub fn load_bundle(repo: &dyn ModelRepo, id: &ModelId) -> AeroResult<ModelBundle> {
    let bytes = repo.read(id)?;
    let stored = decode_bundle(id, &bytes)?;
    let structured = matches!(stored, StoredBundle::Structured(_));
    let bundle = ModelBundle::from_stored(stored);
    if let Some(scaler) = &bundle.scaler {
        if scaler.n_features() != bundle.expected_feature_count {
            return Err(AeroError::corrupt(
                id.as_str(),
                format!(
                    "scaler expects {} features, schema has {}",
                    scaler.n_features(),
                    bundle.expected_feature_count
                ),
            ));
        }
    }

    info!(
        model = %id,
        kind = bundle.predictor.kind(),
        structured,
        declared_width = ?bundle.predictor.n_features_in(),
        features = bundle.schema.len(),
        scaler = bundle.scaler.is_some(),
        "loaded model bundle"
    );
    debug!(model = %id, schema = ?bundle.schema, "effective schema");
    Ok(bundle)
}

/// Persist `bundle` under `id` in the structured shape.
pub fn save_bundle(repo: &dyn ModelRepo, id: &ModelId, bundle: &ModelBundle) -> AeroResult<()> {
    let bytes = serde_json::to_vec_pretty(&bundle.to_stored())
        .map_err(|err| AeroError::corrupt(id.as_str(), err))?;
    repo.write(id, &bytes)?;
    info!(model = %id, bytes = bytes.len(), "saved model bundle");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::features::encoder::CategoryEncoder;
    use crate::features::scaler::StandardScaler;
    use crate::models::domain::BundleParts;
    use crate::models::predictor::{LogisticModel, PredictorModel};
    use crate::models::repo_mem::InMemoryModelRepo;
    use std::collections::BTreeMap;

    fn logistic(width: usize) -> PredictorModel {
        PredictorModel::Logistic(LogisticModel {
            classes: vec!["Minor".into(), "Destroyed".into()],
            coef: vec![vec![0.1; width]],
            intercept: vec![0.0],
        })
    }

    #[test]
    fn unknown_id_is_not_found() {
        let repo = InMemoryModelRepo::new();
        let err = load_bundle(&repo, &"ghost".into()).unwrap_err();
        assert!(matches!(err, AeroError::NotFound(_)));
    }

    #[test]
    fn garbage_is_a_corrupt_bundle() {
        let repo = InMemoryModelRepo::new()
            .with("bad", "not json")
            .with("odd", r#"{"weights":[1,2,3]}"#);
        for id in ["bad", "odd"] {
            let err = load_bundle(&repo, &id.into()).unwrap_err();
            assert!(matches!(err, AeroError::CorruptBundle { .. }), "{id}: {err}");
        }
    }

    #[test]
    fn structured_bundle_schema_is_fitted_to_declared_width() {
        let parts = BundleParts {
            model: logistic(13),
            scaler: None,
            label_encoders: BTreeMap::new(),
            feature_names: Some(vec!["Make".into(), "Country".into()]),
        };
        let repo = InMemoryModelRepo::new()
            .with("m", serde_json::to_vec(&StoredBundle::Structured(parts)).unwrap());

        let bundle = load_bundle(&repo, &"m".into()).unwrap();
        assert_eq!(bundle.schema.len(), 13);
        assert_eq!(&bundle.schema[..3], &["Make", "Country", "Investigation.Type"]);
        assert_eq!(bundle.expected_feature_count, 13);
    }

    #[test]
    fn scaler_narrower_or_wider_than_schema_is_corrupt() {
        let parts = BundleParts {
            model: logistic(2),
            scaler: Some(StandardScaler::new(vec![0.0; 3], vec![1.0; 3])),
            label_encoders: BTreeMap::new(),
            feature_names: None,
        };
        let repo = InMemoryModelRepo::new()
            .with("m", serde_json::to_vec(&StoredBundle::Structured(parts)).unwrap());

        let err = load_bundle(&repo, &"m".into()).unwrap_err();
        assert!(matches!(err, AeroError::CorruptBundle { .. }), "{err}");
        assert!(err.to_string().contains("scaler expects 3 features, schema has 2"));
    }

    #[test]
    fn save_then_load_reproduces_bundle_state() {
        let repo = InMemoryModelRepo::new();
        let original = ModelBundle::from_stored(StoredBundle::Structured(BundleParts {
            model: logistic(2),
            scaler: Some(StandardScaler::new(vec![1.0, 2.0], vec![0.5, 4.0])),
            label_encoders: BTreeMap::from([(
                "Make".to_string(),
                CategoryEncoder::with_classes("Make", ["Cessna", "Piper"]),
            )]),
            feature_names: Some(vec!["Make".into(), "Number.of.Engines".into()]),
        }));
        original.encoders.encode("Make", &["Beech"]);

        save_bundle(&repo, &"copy".into(), &original).unwrap();
        let loaded = load_bundle(&repo, &"copy".into()).unwrap();

        assert_eq!(loaded.schema, original.schema);
        assert_eq!(loaded.scaler, original.scaler);
        assert_eq!(loaded.predictor, original.predictor);
        let make = &loaded.encoders.snapshot()["Make"];
        assert_eq!(make.classes(), &["Cessna", "Piper", "Beech"]);
        assert_eq!(list_models(&repo), vec![ModelId::new("copy")]);
    }
}
