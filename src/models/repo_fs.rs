//! Filesystem registry: one `<id>.bundle.json` file per model.

use std::fs;
use std::io::{self, Write};
use std::path::PathBuf;

use tempfile::NamedTempFile;

use tracing::{debug, warn};

use crate::common::config::AppCfg;
use crate::common::error::{AeroError, AeroResult};

use super::domain::{ModelId, ModelRepo, BUNDLE_SUFFIX};

/// Bundles stored as files directly under `cfg.models_dir`.
pub struct FsModelRepo {
    root: PathBuf,
}

impl FsModelRepo {
    pub fn new(cfg: &AppCfg) -> Self {
        Self::at(cfg.models_dir.clone())
    }

    pub fn at(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Path for `id`, refusing identifiers that would escape the root.
    fn bundle_path(&self, id: &ModelId) -> AeroResult<PathBuf> {
        let raw = id.as_str();
        if !is_plain_id(raw) {
            return Err(AeroError::NotFound(raw.to_string()));
        }
        Ok(self.root.join(format!("{raw}{BUNDLE_SUFFIX}")))
    }
}

/// A single file-name component: no separators, not `.` or `..`.
fn is_plain_id(raw: &str) -> bool {
    !raw.is_empty() && raw != "." && raw != ".." && !raw.contains(['/', '\\'])
}

impl ModelRepo for FsModelRepo {
    fn list(&self) -> Vec<ModelId> {
        let entries = match fs::read_dir(&self.root) {
            Ok(entries) => entries,
            Err(err) => {
                if err.kind() == io::ErrorKind::NotFound {
                    debug!(dir = %self.root.display(), "models directory does not exist");
                } else {
                    warn!(dir = %self.root.display(), error = %err, "cannot read models directory");
                }
                return Vec::new();
            }
        };

        let mut ids: Vec<ModelId> = entries
            .filter_map(Result::ok)
            .filter(|entry| entry.file_type().map(|t| t.is_file()).unwrap_or(false))
            .filter_map(|entry| {
                let name = entry.file_name().into_string().ok()?;
                let stem = name.strip_suffix(BUNDLE_SUFFIX)?;
                is_plain_id(stem).then(|| ModelId::new(stem))
            })
            .collect();
        ids.sort();
        debug!(count = ids.len(), "listed model bundles");
        ids
    }

    fn read(&self, id: &ModelId) -> AeroResult<Vec<u8>> {
        let path = self.bundle_path(id)?;
        match fs::read(&path) {
            Ok(bytes) => Ok(bytes),
            Err(err) if err.kind() == io::ErrorKind::NotFound => {
                Err(AeroError::NotFound(id.to_string()))
            }
            Err(err) => Err(AeroError::corrupt(id.as_str(), err)),
        }
    }

    fn write(&self, id: &ModelId, bytes: &[u8]) -> AeroResult<()> {
        let path = self.bundle_path(id)?;
        fs::create_dir_all(&self.root)?;
        // unique sibling file, renamed over the target once fully written
        let mut tmp = NamedTempFile::new_in(&self.root)?;
        tmp.write_all(bytes)?;
        tmp.as_file().sync_all()?;
        tmp.persist(&path).map_err(|err| AeroError::Io(err.error))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lists_only_bundle_files_sorted() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("rf.bundle.json"), "{}").unwrap();
        fs::write(dir.path().join("gbm.bundle.json"), "{}").unwrap();
        fs::write(dir.path().join("notes.txt"), "x").unwrap();
        fs::create_dir(dir.path().join("sub.bundle.json")).unwrap();

        let repo = FsModelRepo::at(dir.path());
        assert_eq!(repo.list(), vec![ModelId::new("gbm"), ModelId::new("rf")]);
    }

    #[test]
    fn absent_directory_lists_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let repo = FsModelRepo::at(dir.path().join("missing"));
        assert!(repo.list().is_empty());
    }

    #[test]
    fn unknown_and_escaping_ids_are_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let repo = FsModelRepo::at(dir.path());
        assert!(matches!(repo.read(&"nope".into()), Err(AeroError::NotFound(_))));
        assert!(matches!(repo.read(&"../etc".into()), Err(AeroError::NotFound(_))));
        assert!(matches!(repo.read(&"..".into()), Err(AeroError::NotFound(_))));
        assert!(matches!(repo.read(&"a\\b".into()), Err(AeroError::NotFound(_))));
    }

    #[test]
    fn every_listed_id_is_readable() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("rf..v2.bundle.json"), "{}").unwrap();
        fs::write(dir.path().join("..bundle.json"), "{}").unwrap();
        fs::write(dir.path().join("v1.2.bundle.json"), "{}").unwrap();

        let repo = FsModelRepo::at(dir.path());
        let ids = repo.list();
        assert_eq!(ids, vec![ModelId::new("rf..v2"), ModelId::new("v1.2")]);
        for id in &ids {
            assert_eq!(repo.read(id).unwrap(), b"{}");
        }
    }

    #[test]
    fn concurrent_writes_leave_one_complete_bundle() {
        let dir = tempfile::tempdir().unwrap();
        let repo = std::sync::Arc::new(FsModelRepo::at(dir.path()));
        let payloads: Vec<Vec<u8>> = (0..8)
            .map(|i| format!("{{\"writer\":{i},\"pad\":\"{}\"}}", "x".repeat(4096)).into_bytes())
            .collect();

        let handles: Vec<_> = payloads
            .iter()
            .cloned()
            .map(|bytes| {
                let repo = repo.clone();
                std::thread::spawn(move || repo.write(&"shared".into(), &bytes))
            })
            .collect();
        for handle in handles {
            handle.join().unwrap().unwrap();
        }

        let stored = repo.read(&"shared".into()).unwrap();
        assert!(payloads.contains(&stored));
        assert_eq!(repo.list(), vec![ModelId::new("shared")]);
        let leftovers = fs::read_dir(dir.path()).unwrap().count();
        assert_eq!(leftovers, 1);
    }

    #[test]
    fn write_creates_directory_and_round_trips() {
        let dir = tempfile::tempdir().unwrap();
        let repo = FsModelRepo::at(dir.path().join("models"));
        repo.write(&"m1".into(), b"{\"a\":1}").unwrap();
        assert_eq!(repo.read(&"m1".into()).unwrap(), b"{\"a\":1}");
        assert_eq!(repo.list(), vec![ModelId::new("m1")]);
    }
}
