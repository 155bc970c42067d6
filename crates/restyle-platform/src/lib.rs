//! Host integrations (file-backed preferences, window metrics, OS theme;
//! desktop via winit)
//!

use std::path::Path;

use anyhow::Context;
use restyle_core::RuntimeConfig;

pub mod appearance;
pub mod storage;
pub mod viewport;

#[cfg(feature = "desktop")]
pub mod desktop;

pub use appearance::FixedAppearance;
pub use storage::FileStorage;
pub use viewport::WindowMetrics;

/// Installs `env_logger` (filtered by `RUST_LOG`). Safe to call more than once.
pub fn init_logging() {
    if env_logger::try_init().is_err() {
        log::debug!("logger already installed");
    }
}

/// Reads a [`RuntimeConfig`] from a JSON file.
pub fn load_config(path: impl AsRef<Path>) -> anyhow::Result<RuntimeConfig> {
    let path = path.as_ref();
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("reading config {}", path.display()))?;
    let config = RuntimeConfig::from_json(&text)
        .with_context(|| format!("parsing config {}", path.display()))?;
    log::debug!("loaded config for platform `{}`", config.platform);
    Ok(config)
}
