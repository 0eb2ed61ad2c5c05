//! Seams to the collaborators the service talks to but does not own: the
//! windowing host, the application metadata service and connected clients.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

use crate::model::WindowIdentity;

pub mod fixture;

pub use fixture::FixtureHost;

/// A window as enumerated by the host. Its geometry is tracked by the
/// registry, which the host keeps up to date.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct HostWindow {
    pub name: String,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HostApp {
    pub uuid: String,
    pub main_window: Option<HostWindow>,
    #[serde(default)]
    pub child_windows: Vec<HostWindow>,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct HostWindowInfo {
    pub url: Option<String>,
    pub title: Option<String>,
}

/// Descriptive metadata of a running application.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AppInfo {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub manifest_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub manifest: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub initial_options: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent_uuid: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub launch_mode: Option<String>,
}

#[derive(Debug, Error, Clone, PartialEq)]
pub enum HostError {
    #[error("No such application: {0}")]
    UnknownApp(String),
    #[error("Client {0} is not connected")]
    Disconnected(WindowIdentity),
    #[error("Request {topic} to {identity} failed: {message}")]
    Request {
        identity: WindowIdentity,
        topic: String,
        message: String,
    },
}

#[allow(async_fn_in_trait)]
pub trait WindowHost {
    /// Every application the host knows about, in host order.
    async fn all_windows(&self) -> Vec<HostApp>;

    /// Windows the host has grouped with `identity`, excluding itself.
    async fn window_group(&self, identity: &WindowIdentity) -> Vec<WindowIdentity>;

    async fn window_info(&self, identity: &WindowIdentity) -> Option<HostWindowInfo>;

    async fn is_running(&self, uuid: &str) -> bool;

    async fn monitor_info(&self) -> Value;
}

#[allow(async_fn_in_trait)]
pub trait AppMetadataService {
    async fn app_info(&self, uuid: &str) -> Result<AppInfo, HostError>;
}

#[allow(async_fn_in_trait)]
pub trait ClientChannel {
    fn is_connected(&self, identity: &WindowIdentity) -> bool;

    /// Sends `payload` under `topic` and waits for the client's answer. May
    /// never resolve if the client hangs.
    async fn request(
        &self,
        identity: &WindowIdentity,
        topic: &str,
        payload: Value,
    ) -> Result<Option<Value>, HostError>;
}
