//! Error types for sudoers-sync.

use std::path::PathBuf;

use thiserror::Error;

use sudoers_core::StoreError;
use sudoers_renderer::RenderError;

use crate::validator::ValidationFailure;

/// All errors that can arise from a reconciliation pass.
#[derive(Debug, Error)]
pub enum SyncError {
    /// An error from the rendering engine.
    #[error("render error: {0}")]
    Render(#[from] RenderError),

    /// An error from the intent or ownership store.
    #[error("store error: {0}")]
    Store(#[from] StoreError),

    /// The candidate file was rejected by the syntax checker.
    #[error("validation of {path} failed: {failure}")]
    Validation {
        path: PathBuf,
        failure: ValidationFailure,
    },

    /// The managed directory could not be listed; the pass cannot compute
    /// staleness and is aborted.
    #[error("cannot list managed directory {path}: {source}")]
    ListDir {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// An I/O error, with annotated path for context.
    #[error("I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Convenience constructor for [`SyncError::Io`].
pub(crate) fn io_err(path: impl Into<PathBuf>, source: std::io::Error) -> SyncError {
    SyncError::Io {
        path: path.into(),
        source,
    }
}
