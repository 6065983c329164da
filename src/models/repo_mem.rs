//! In-memory registry, for tests and embedders that ship bundles inline.

use std::collections::BTreeMap;

use parking_lot::RwLock;

use crate::common::error::{AeroError, AeroResult};

use super::domain::{ModelId, ModelRepo};

#[derive(Default)]
pub struct InMemoryModelRepo {
    bundles: RwLock<BTreeMap<ModelId, Vec<u8>>>,
}

impl InMemoryModelRepo {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style insert of raw bundle bytes.
    pub fn with(self, id: impl Into<String>, bytes: impl Into<Vec<u8>>) -> Self {
        self.bundles
            .write()
            .insert(ModelId::new(id), bytes.into());
        self
    }
}

impl ModelRepo for InMemoryModelRepo {
    fn list(&self) -> Vec<ModelId> {
        self.bundles.read().keys().cloned().collect()
    }

    fn read(&self, id: &ModelId) -> AeroResult<Vec<u8>> {
        self.bundles
            .read()
            .get(id)
            .cloned()
            .ok_or_else(|| AeroError::NotFound(id.to_string()))
    }

    fn write(&self, id: &ModelId, bytes: &[u8]) -> AeroResult<()> {
        self.bundles.write().insert(id.clone(), bytes.to_vec());
        Ok(())
    }
}
