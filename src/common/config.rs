//! Runtime configuration loaded from environment and optional JSON files.

use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use super::error::{AeroError, AeroResult};

/// Snapshot of configuration values consumed by the core.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppCfg {
    /// Directory scanned for `*.bundle.json` model files.
    pub models_dir: PathBuf,
    /// Default tracing filter when `RUST_LOG` is unset.
    pub log_level: String,
    /// Emit JSON lines instead of human readable logs.
    pub json_logs: bool,
}

impl Default for AppCfg {
    fn default() -> Self {
        Self {
            models_dir: PathBuf::from("models"),
            log_level: "info".to_string(),
            json_logs: false,
        }
    }
}

impl AppCfg {
    /// Create a configuration snapshot from the process environment.
    pub fn load() -> Self {
        Self::default().with_env_overrides()
    }

    /// Like [`AppCfg::load`], but starts from the JSON file named by
    /// `AERODAMAGE_CONFIG` when that variable is set.
    pub fn discover() -> AeroResult<Self> {
        let path = env::var_os("AERODAMAGE_CONFIG").map(PathBuf::from);
        Self::resolve(path.as_deref())
    }

    pub fn resolve(config: Option<&Path>) -> AeroResult<Self> {
        match config {
            Some(path) => Self::from_file(path),
            None => Ok(Self::load()),
        }
    }

    /// Read a JSON config file, then apply environment overrides on top.
    pub fn from_file(path: &Path) -> AeroResult<Self> {
        let content = fs::read_to_string(path)?;
        let cfg: Self = serde_json::from_str(&content).map_err(|e| {
            AeroError::InvalidInput(format!("config {}: {e}", path.display()))
        })?;
        Ok(cfg.with_env_overrides())
    }

    fn with_env_overrides(mut self) -> Self {
        if let Ok(dir) = env::var("AERODAMAGE_MODELS_DIR") {
            self.models_dir = PathBuf::from(dir);
        }
        if let Ok(level) = env::var("AERODAMAGE_LOG_LEVEL") {
            self.log_level = level;
        }
        if let Ok(flag) = env::var("AERODAMAGE_LOG_JSON") {
            self.json_logs = matches!(flag.trim(), "1" | "true" | "yes");
        }
        self
    }
}
