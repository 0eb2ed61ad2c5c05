//! An in-memory host described by a JSON document, used by tests and by the
//! `layouts` binary to exercise snapshot and restore without a real desktop.
//!
//! ```json
//! {
//!   "monitorInfo": {},
//!   "apps": [{
//!     "uuid": "app1",
//!     "info": { "manifestUrl": "https://example.com/app1.json" },
//!     "mainWindow": { "name": "app1", "bounds": { "left": 0, "top": 0, "width": 400, "height": 300 } },
//!     "childWindows": []
//!   }],
//!   "windowGroups": [[{ "uuid": "app1", "name": "app1" }, { "uuid": "app2", "name": "app2" }]],
//!   "tabGroups": [],
//!   "clients": [{ "uuid": "app1", "customData": { "k": 1 } }]
//! }
//! ```

use std::path::Path;

use anyhow::Context;
use parking_lot::Mutex;
use serde::Deserialize;
use serde_json::Value;
use tracing::{debug, warn};

use super::{
    AppInfo, AppMetadataService, ClientChannel, HostApp, HostError, HostWindow, HostWindowInfo,
    WindowHost,
};
use crate::model::{Desktop, WindowIdentity, WindowState};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct FixtureWindow {
    name: String,
    #[serde(flatten)]
    state: WindowState,
    #[serde(default)]
    url: Option<String>,
    #[serde(default)]
    title: Option<String>,
    /// Unregistered windows exist on the host but not in the desktop model.
    #[serde(default = "yes")]
    registered: bool,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct FixtureApp {
    uuid: String,
    #[serde(default = "yes")]
    running: bool,
    /// Missing metadata makes the metadata service fail for this app.
    #[serde(default)]
    info: Option<AppInfo>,
    #[serde(default)]
    main_window: Option<FixtureWindow>,
    #[serde(default)]
    child_windows: Vec<FixtureWindow>,
}

impl FixtureApp {
    fn windows(&self) -> impl Iterator<Item = &FixtureWindow> {
        self.main_window.iter().chain(&self.child_windows)
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ClientBehavior {
    #[default]
    Respond,
    /// Never answers.
    Hang,
    Fail,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct FixtureClient {
    uuid: String,
    #[serde(default)]
    behavior: ClientBehavior,
    #[serde(default)]
    custom_data: Option<Value>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct FixtureTabGroup {
    tabs: Vec<WindowIdentity>,
    #[serde(default)]
    active: Option<WindowIdentity>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct FixtureData {
    #[serde(default)]
    monitor_info: Value,
    #[serde(default)]
    apps: Vec<FixtureApp>,
    #[serde(default)]
    window_groups: Vec<Vec<WindowIdentity>>,
    #[serde(default)]
    tab_groups: Vec<FixtureTabGroup>,
    #[serde(default)]
    clients: Vec<FixtureClient>,
}

#[derive(Debug, Default)]
pub struct FixtureHost {
    data: FixtureData,
    requests: Mutex<Vec<(WindowIdentity, String)>>,
}

impl FixtureHost {
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        Ok(Self {
            data: serde_json::from_str(json)?,
            requests: Mutex::default(),
        })
    }

    pub fn read(path: &Path) -> anyhow::Result<Self> {
        let buf = std::fs::read_to_string(path)
            .with_context(|| format!("reading fixture {}", path.display()))?;
        Self::from_json(&buf).with_context(|| format!("parsing fixture {}", path.display()))
    }

    /// Registers the fixture's windows with `desktop`, then recreates its tab
    /// groups and window groups there.
    pub async fn populate(&self, desktop: &Desktop) {
        for app in &self.data.apps {
            for window in app.windows().filter(|w| w.registered) {
                desktop.register(WindowIdentity::new(&app.uuid, &window.name), window.state).await;
            }
        }
        for group in &self.data.tab_groups {
            if let Err(e) = desktop.create_tab_group(&group.tabs) {
                warn!(?e, "fixture tab group not created");
                continue;
            }
            if let Some(active) = &group.active
                && let Err(e) = desktop.set_active_tab(active)
            {
                warn!(?e, "fixture active tab not set");
            }
        }
        for group in &self.data.window_groups {
            let Some((first, rest)) = group.split_first() else { continue };
            for member in rest {
                if let Err(e) = desktop.dock(member, first) {
                    debug!(?e, %member, "fixture window not grouped");
                }
            }
        }
    }

    /// Topics requested so far, in order.
    pub fn requests(&self) -> Vec<(WindowIdentity, String)> { self.requests.lock().clone() }

    fn app(&self, uuid: &str) -> Option<&FixtureApp> { self.data.apps.iter().find(|a| a.uuid == uuid) }

    fn window(&self, identity: &WindowIdentity) -> Option<&FixtureWindow> {
        self.app(&identity.uuid)?.windows().find(|w| w.name == identity.name)
    }

    fn client(&self, uuid: &str) -> Option<&FixtureClient> {
        self.data.clients.iter().find(|c| c.uuid == uuid)
    }
}

fn yes() -> bool { true }

impl WindowHost for FixtureHost {
    async fn all_windows(&self) -> Vec<HostApp> {
        self.data
            .apps
            .iter()
            .map(|app| HostApp {
                uuid: app.uuid.clone(),
                main_window: app.main_window.as_ref().map(|w| HostWindow { name: w.name.clone() }),
                child_windows: app
                    .child_windows
                    .iter()
                    .map(|w| HostWindow { name: w.name.clone() })
                    .collect(),
            })
            .collect()
    }

    async fn window_group(&self, identity: &WindowIdentity) -> Vec<WindowIdentity> {
        self.data
            .window_groups
            .iter()
            .find(|group| group.contains(identity))
            .map(|group| group.iter().filter(|m| *m != identity).cloned().collect())
            .unwrap_or_default()
    }

    async fn window_info(&self, identity: &WindowIdentity) -> Option<HostWindowInfo> {
        self.window(identity).map(|w| HostWindowInfo {
            url: w.url.clone(),
            title: w.title.clone(),
        })
    }

    async fn is_running(&self, uuid: &str) -> bool { self.app(uuid).is_some_and(|a| a.running) }

    async fn monitor_info(&self) -> Value { self.data.monitor_info.clone() }
}

impl AppMetadataService for FixtureHost {
    async fn app_info(&self, uuid: &str) -> Result<AppInfo, HostError> {
        self.app(uuid)
            .and_then(|a| a.info.clone())
            .ok_or_else(|| HostError::UnknownApp(uuid.to_string()))
    }
}

impl ClientChannel for FixtureHost {
    fn is_connected(&self, identity: &WindowIdentity) -> bool { self.client(&identity.uuid).is_some() }

    async fn request(
        &self,
        identity: &WindowIdentity,
        topic: &str,
        _payload: Value,
    ) -> Result<Option<Value>, HostError> {
        self.requests.lock().push((identity.clone(), topic.to_string()));
        let Some(client) = self.client(&identity.uuid) else {
            return Err(HostError::Disconnected(identity.clone()));
        };
        match client.behavior {
            ClientBehavior::Respond => Ok(client.custom_data.clone()),
            ClientBehavior::Hang => std::future::pending().await,
            ClientBehavior::Fail => Err(HostError::Request {
                identity: identity.clone(),
                topic: topic.to_string(),
                message: "client rejected the request".to_string(),
            }),
        }
    }
}
