use thiserror::Error;

use super::groups::SnapGroupId;
use super::identity::WindowIdentity;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ModelError {
    #[error("Window not registered: {0}")]
    NotFound(WindowIdentity),
    #[error("Window is not tabbed: {0}")]
    NotTabbed(WindowIdentity),
    #[error("Window is already tabbed: {0}")]
    AlreadyTabbed(WindowIdentity),
    #[error("A tab group needs at least two windows, got {0}")]
    TooFewTabs(usize),
    #[error("Snap group no longer exists: {0:?}")]
    UnknownSnapGroup(SnapGroupId),
    #[error("Docking is disabled for {0}")]
    DockingDisabled(WindowIdentity),
}
