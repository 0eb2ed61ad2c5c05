//! Capturing the desktop's arrangement into a versioned document and
//! re-applying such a document later.

pub mod document;
mod error;
pub mod regroup;
pub mod repair;
pub mod snapshot;

pub use document::{
    DocumentType, SCHEMA_VERSION, SchemaVersion, TabGroupSave, Workspace, WorkspaceApp,
    WorkspaceWindow,
};
pub use error::WorkspaceError;
pub use regroup::{RegroupReport, regroup_workspace};
pub use repair::{RepairedTabGroups, repair_tab_groups};
pub use snapshot::{GENERATE_WORKSPACE_TOPIC, SnapshotBuilder};

#[cfg(test)]
mod tests;
