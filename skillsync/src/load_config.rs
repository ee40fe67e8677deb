/// `load_config` module: locates and loads the project's `.skillsrc` for the CLI.
///
/// Parsing and validation live in [`skillsync_core::config::ConfigStore`]; this
/// adapter turns its outcomes into CLI-grade errors with tracing around them.
///
/// # Errors
/// A missing file and an invalid file are both fatal for the commands that
/// need a config, and surface as `anyhow::Error` at the CLI boundary.
use anyhow::Result;
use skillsync_core::config::{Config, ConfigStore};
use std::path::Path;
use tracing::{error, info};

pub fn load_config<P: AsRef<Path>>(project_root: P) -> Result<Config> {
    let store = ConfigStore::new(project_root.as_ref());
    info!(config_path = ?store.path(), "Loading configuration from file");

    match store.load() {
        Ok(Some(config)) => {
            info!(config_path = ?store.path(), "Parsed config YAML successfully");
            Ok(config)
        }
        Ok(None) => {
            error!(config_path = ?store.path(), "Config file not found");
            Err(anyhow::anyhow!(
                "{} not found. Run `skillsync init` first.",
                store.path().display()
            ))
        }
        Err(e) => {
            error!(error = ?e, config_path = ?store.path(), "Failed to load config");
            Err(anyhow::anyhow!("Failed to load config: {e}"))
        }
    }
}

/// Like [`load_config`], but a missing file is `Ok(None)`.
pub fn load_optional_config<P: AsRef<Path>>(project_root: P) -> Result<Option<Config>> {
    let store = ConfigStore::new(project_root.as_ref());
    if !store.exists() {
        return Ok(None);
    }
    load_config(project_root).map(Some)
}
