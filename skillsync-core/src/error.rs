use std::path::PathBuf;

use thiserror::Error;

/// Failures while loading, validating or persisting `.skillsrc`.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file {path:?}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config YAML {path:?}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },

    #[error("invalid .skillsrc format: {}", .problems.join("; "))]
    Invalid { problems: Vec<String> },

    #[error("failed to serialize config: {0}")]
    Serialize(#[source] serde_yaml::Error),

    #[error("failed to write config file {path:?}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Run-level fatal conditions. Everything else is a diagnostic.
#[derive(Debug, Error)]
pub enum SyncError {
    #[error("only GitHub registries are supported, got {registry:?}")]
    UnsupportedRegistry { registry: String },

    #[error(transparent)]
    Config(#[from] ConfigError),
}
