use thiserror::Error;

use crate::model::{ModelError, WindowIdentity};

#[derive(Debug, Error)]
pub enum WorkspaceError {
    #[error(transparent)]
    Model(#[from] ModelError),
    #[error("Application {uuid} cannot be restored: {reason}")]
    Unrestorable { uuid: String, reason: &'static str },
    #[error("Metadata for {0} is unavailable")]
    MetadataUnavailable(String),
    #[error("Client {0} did not answer in time")]
    ClientTimeout(WindowIdentity),
    #[error("Workspace schema {found} is incompatible with {supported}")]
    IncompatibleSchema { found: String, supported: String },
    #[error("Invalid schema version: {0:?}")]
    InvalidSchemaVersion(String),
    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

impl WorkspaceError {
    /// Whether this error stops a whole pass instead of a single item.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            WorkspaceError::IncompatibleSchema { .. }
                | WorkspaceError::InvalidSchemaVersion(_)
                | WorkspaceError::Json(_)
        )
    }
}
