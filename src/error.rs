//! Crate-wide error type.

use thiserror::Error;

/// Every failure the library can surface.
///
/// Traversal never produces an error: malformed topology simply leaves
/// records unlabeled. Only configuration checks and store I/O fail a run.
#[derive(Debug, Error)]
pub enum HierLabelError {
    #[error("database error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// Missing table, unresolved field, unknown view, bad option value.
    #[error("configuration error: {0}")]
    Config(String),

    /// A batch update was rejected by the store. Earlier batches stay applied.
    #[error("update of batch {batch} failed after {applied} records were saved: {source}")]
    Persistence {
        batch: usize,
        applied: usize,
        #[source]
        source: Box<HierLabelError>,
    },

    #[error("{0}")]
    Other(String),
}

impl HierLabelError {
    /// Shorthand for a [`HierLabelError::Config`] error.
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Whether this error was raised before any record was touched.
    pub fn is_config(&self) -> bool {
        matches!(self, Self::Config(_))
    }
}

pub type Result<T> = std::result::Result<T, HierLabelError>;
