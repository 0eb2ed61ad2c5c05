use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::error::WorkspaceError;
use crate::host::AppInfo;
use crate::model::{DisplayState, TabGroupInfo, WindowIdentity};
use crate::sys::geometry::Rect;

/// Bumped whenever the document layout changes. A new major version means
/// older documents cannot be restored.
pub const SCHEMA_VERSION: &str = "1.0.0";

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SchemaVersion {
    pub major: u64,
    pub minor: u64,
    pub patch: u64,
}

impl SchemaVersion {
    pub const CURRENT: SchemaVersion = SchemaVersion { major: 1, minor: 0, patch: 0 };

    pub fn is_compatible(&self) -> bool { self.major == Self::CURRENT.major }
}

impl FromStr for SchemaVersion {
    type Err = WorkspaceError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || WorkspaceError::InvalidSchemaVersion(s.to_string());
        // Pre-release and build metadata do not affect compatibility.
        let core = s.trim().split(['-', '+']).next().unwrap_or_default();
        let mut parts = core.split('.').map(|p| {
            if p.is_empty() || !p.bytes().all(|b| b.is_ascii_digit()) {
                return Err(invalid());
            }
            p.parse::<u64>().map_err(|_| invalid())
        });
        let version = SchemaVersion {
            major: parts.next().ok_or_else(invalid)??,
            minor: parts.next().ok_or_else(invalid)??,
            patch: parts.next().ok_or_else(invalid)??,
        };
        if parts.next().is_some() {
            return Err(invalid());
        }
        Ok(version)
    }
}

impl fmt::Display for SchemaVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}.{}", self.major, self.minor, self.patch)
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DocumentType {
    #[default]
    Layout,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Workspace {
    #[serde(rename = "type")]
    pub kind: DocumentType,
    pub schema_version: String,
    pub apps: Vec<WorkspaceApp>,
    #[serde(default)]
    pub monitor_info: Value,
    #[serde(default)]
    pub tab_groups: Vec<TabGroupSave>,
}

impl Workspace {
    pub fn new(apps: Vec<WorkspaceApp>, monitor_info: Value, tab_groups: Vec<TabGroupSave>) -> Self {
        Self {
            kind: DocumentType::Layout,
            schema_version: SCHEMA_VERSION.to_string(),
            apps,
            monitor_info,
            tab_groups,
        }
    }

    pub fn from_json(json: &str) -> Result<Self, WorkspaceError> { Ok(serde_json::from_str(json)?) }

    pub fn to_json_pretty(&self) -> Result<String, WorkspaceError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Parses the document's schema version and rejects other major versions.
    pub fn check_compatible(&self) -> Result<SchemaVersion, WorkspaceError> {
        let version: SchemaVersion = self.schema_version.parse()?;
        if !version.is_compatible() {
            return Err(WorkspaceError::IncompatibleSchema {
                found: version.to_string(),
                supported: SchemaVersion::CURRENT.to_string(),
            });
        }
        Ok(version)
    }

    pub fn app(&self, uuid: &str) -> Option<&WorkspaceApp> { self.apps.iter().find(|a| a.uuid == uuid) }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkspaceApp {
    pub uuid: String,
    pub main_window: WorkspaceWindow,
    #[serde(default)]
    pub child_windows: Vec<WorkspaceWindow>,
    #[serde(flatten)]
    pub info: AppInfo,
    #[serde(default)]
    pub confirmed: bool,
    /// `Some(Value::Null)` when the client was asked but sent nothing back.
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        deserialize_with = "present"
    )]
    pub custom_data: Option<Value>,
}

/// Keeps an explicit `null` as `Some(Value::Null)`; only a missing field is `None`.
fn present<'de, D: serde::Deserializer<'de>>(deserializer: D) -> Result<Option<Value>, D::Error> {
    Value::deserialize(deserializer).map(Some)
}

impl WorkspaceApp {
    /// Main window first, then children in capture order.
    pub fn windows(&self) -> impl Iterator<Item = &WorkspaceWindow> {
        std::iter::once(&self.main_window).chain(&self.child_windows)
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkspaceWindow {
    pub uuid: String,
    pub name: String,
    #[serde(flatten)]
    pub bounds: Rect,
    pub is_showing: bool,
    pub frame: bool,
    #[serde(default)]
    pub state: DisplayState,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    /// Snap-group siblings at capture time.
    #[serde(default)]
    pub window_group: Vec<WindowIdentity>,
    #[serde(default)]
    pub is_tabbed: bool,
}

impl WorkspaceWindow {
    pub fn identity(&self) -> WindowIdentity { WindowIdentity::new(&self.uuid, &self.name) }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TabGroupSave {
    pub group_info: TabGroupInfo,
    pub tabs: Vec<WindowIdentity>,
}
