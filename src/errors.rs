//! Typed error hierarchy for flowboard.
//!
//! - `BoardError`: board and roadmap controller failures
//! - `PrefsError`: local preference persistence failures
//!
//! Store failures come from `flowboard_common::StoreError` and are wrapped
//! where a controller surfaces them.

use flowboard_common::StoreError;
use thiserror::Error;

/// Errors from the board and roadmap controllers.
#[derive(Debug, Error)]
pub enum BoardError {
    #[error("Failed to load board data: {0}")]
    Load(#[source] StoreError),

    #[error("Failed to confirm change: {0}")]
    Confirmation(#[source] StoreError),

    #[error("{0}")]
    Validation(String),

    #[error("Task {reference} not found")]
    TaskNotFound { reference: String },

    #[error("Version {id} not found")]
    VersionNotFound { id: String },

    #[error("No delete is awaiting confirmation")]
    NoPendingDelete,

    #[error("No organization selected")]
    NoOrganization,

    #[error(transparent)]
    Preferences(#[from] PrefsError),

    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Errors from the local preference store.
#[derive(Debug, Error)]
pub enum PrefsError {
    #[error("Failed to write preferences at {path}: {source}")]
    Io {
        path: std::path::PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to serialize preferences: {0}")]
    Serialize(#[from] serde_json::Error),

    #[error("Preference store lock poisoned")]
    LockPoisoned,
}
