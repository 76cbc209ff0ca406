//! Loads `probs.toml`.

use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use probs_graph::{Config, Settings};

/// Reads and validates a configuration file.
///
/// Relative `preload` paths are resolved against the directory holding the
/// file.
///
/// # Errors
///
/// Returns an error if the file cannot be read, is not valid TOML of the
/// expected shape, or fails validation.
pub fn load(path: &Path) -> Result<(Config, Settings)> {
    let text = fs::read_to_string(path)
        .with_context(|| format!("Failed to read config: {}", path.display()))?;
    let mut config: Config = toml::from_str(&text)
        .with_context(|| format!("Failed to parse config: {}", path.display()))?;

    let base = path.parent().unwrap_or_else(|| Path::new("."));
    for preload in &mut config.preload {
        if preload.is_relative() {
            *preload = base.join(&*preload);
        }
    }

    let settings = Settings::from_config(&config)
        .with_context(|| format!("Invalid config: {}", path.display()))?;
    tracing::debug!(
        path = %path.display(),
        system = settings.namespaces.system(),
        units = config.units.len(),
        "loaded configuration"
    );
    Ok((config, settings))
}
