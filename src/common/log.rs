//! Logging bootstrap for hosts embedding the core.
//!
//! The library itself only emits `tracing` events; installing a subscriber is
//! left to whoever owns the process.

use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use super::config::AppCfg;
use super::error::{AeroError, AeroResult};

/// Install a global subscriber. `RUST_LOG` wins over `cfg.log_level`.
pub fn init(cfg: &AppCfg) -> AeroResult<()> {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&cfg.log_level));
    let registry = tracing_subscriber::registry().with(filter);

    let installed = if cfg.json_logs {
        registry.with(fmt::layer().json()).try_init()
    } else {
        registry.with(fmt::layer()).try_init()
    };

    installed.map_err(|e| AeroError::InvalidInput(format!("logging already initialised: {e}")))
}
