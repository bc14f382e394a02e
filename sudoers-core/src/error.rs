//! Error types for sudoers-core.

use std::path::PathBuf;

use thiserror::Error;

/// Errors raised by the YAML intent/ownership store.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Underlying I/O failure (permission denied, unreadable directory, etc.).
    #[error("I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// YAML serialization error (write/save path).
    #[error("YAML serialization error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// YAML parse error on load, with the offending file.
    #[error("failed to parse {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },

    /// No intent document exists for this host.
    #[error("no intent for host '{host}' at {path}")]
    NodeNotFound { host: String, path: PathBuf },

    /// No ownership document exists for this application.
    #[error("no ownership data for '{app}' at {path}")]
    OwnersNotFound { app: String, path: PathBuf },

    /// The application name cannot be used as a file name.
    #[error("invalid application name '{name}': {reason}")]
    InvalidAppName { name: String, reason: &'static str },
}

/// Errors raised while loading [`crate::SudoersConfig`].
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("cannot read config at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config at {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },

    /// The managed prefix must be non-empty, or every file in the directory
    /// would be considered managed.
    #[error("managed file prefix must not be empty")]
    EmptyPrefix,

    #[error("validator program must not be empty")]
    EmptyValidator,
}

pub(crate) fn io_err(path: impl Into<PathBuf>, source: std::io::Error) -> StoreError {
    StoreError::Io {
        path: path.into(),
        source,
    }
}
