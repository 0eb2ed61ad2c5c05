//! Builds [`Workspace`] documents from the live desktop.

use futures::future::join_all;
use serde_json::Value;
use tracing::{Instrument, debug, info, info_span, warn};

use super::document::{TabGroupSave, Workspace, WorkspaceApp, WorkspaceWindow};
use super::error::WorkspaceError;
use super::repair::{RepairedTabGroups, repair_tab_groups};
use crate::actor::broadcast::BroadcastEvent;
use crate::host::{AppInfo, AppMetadataService, ClientChannel, HostApp, WindowHost};
use crate::model::{Desktop, WindowIdentity};

/// Topic under which clients are asked for their custom workspace data.
pub const GENERATE_WORKSPACE_TOPIC: &str = "generate-workspace";

pub struct SnapshotBuilder<'a, H, M, C> {
    desktop: &'a Desktop,
    host: &'a H,
    metadata: &'a M,
    clients: &'a C,
}

impl<'a, H, M, C> SnapshotBuilder<'a, H, M, C>
where
    H: WindowHost,
    M: AppMetadataService,
    C: ClientChannel,
{
    pub fn new(desktop: &'a Desktop, host: &'a H, metadata: &'a M, clients: &'a C) -> Self {
        Self { desktop, host, metadata, clients }
    }

    /// Captures the current arrangement and broadcasts it as
    /// `workspace-generated`.
    pub async fn get_current_workspace(&self) -> Workspace {
        let _pass = self.desktop.begin_pass().await;
        self.snapshot().await
    }

    /// Like [`get_current_workspace`](Self::get_current_workspace), then asks
    /// every connected client for its custom data. Clients that do not answer
    /// in time get `null`.
    pub async fn generate_workspace(&self) -> Workspace {
        let _pass = self.desktop.begin_pass().await;
        let workspace = self.snapshot().await;

        let span = info_span!("generate_workspace", apps = workspace.apps.len());
        let Workspace { kind, schema_version, apps, monitor_info, tab_groups } = workspace;
        let apps = join_all(apps.into_iter().map(|app| self.request_custom_data(app)))
            .instrument(span)
            .await;
        Workspace { kind, schema_version, apps, monitor_info, tab_groups }
    }

    async fn snapshot(&self) -> Workspace {
        let saved: Vec<TabGroupSave> = self
            .desktop
            .tab_groups()
            .into_iter()
            .map(|group| TabGroupSave { group_info: group.info, tabs: group.tabs })
            .collect();
        let repaired = repair_tab_groups(&saved, |id| self.desktop.is_live(id));

        let span = info_span!("snapshot", tab_groups = repaired.tab_groups.len());
        let workspace = async {
            let monitor_info = self.host.monitor_info().await;
            let host_apps = self.host.all_windows().await;
            let total = host_apps.len();

            let captured = join_all(host_apps.iter().map(|app| self.capture_app(app, &repaired))).await;
            let apps: Vec<WorkspaceApp> = captured
                .into_iter()
                .zip(&host_apps)
                .filter_map(|(result, host_app)| match result {
                    Ok(app) => app,
                    Err(e @ WorkspaceError::Unrestorable { .. }) => {
                        warn!(uuid = %host_app.uuid, "not saving app: {e}");
                        None
                    }
                    Err(e) => {
                        warn!(uuid = %host_app.uuid, "error adding app to workspace: {e}");
                        None
                    }
                })
                .collect();

            info!(total, saved = apps.len(), "captured workspace");
            Workspace::new(apps, monitor_info, repaired.tab_groups.clone())
        }
        .instrument(span)
        .await;

        self.desktop.events().publish(BroadcastEvent::WorkspaceGenerated {
            workspace: workspace.clone(),
        });
        workspace
    }

    /// `Ok(None)` means the app is not part of the workspace at all.
    async fn capture_app(
        &self,
        app: &HostApp,
        repaired: &RepairedTabGroups,
    ) -> Result<Option<WorkspaceApp>, WorkspaceError> {
        let uuid = app.uuid.as_str();
        if uuid == self.desktop.service_uuid() {
            return Ok(None);
        }
        let Some(main) = &app.main_window else {
            debug!(%uuid, "skipping app without main window");
            return Ok(None);
        };
        let main_identity = WindowIdentity::new(uuid, &main.name);
        if !self.desktop.is_live(&main_identity) {
            debug!(%uuid, "skipping app with deregistered main window");
            return Ok(None);
        }
        if !self.host.is_running(uuid).await {
            debug!(%uuid, "skipping app that is not running");
            return Ok(None);
        }

        let info = match self.metadata.app_info(uuid).await {
            Ok(info) => info,
            Err(e) => {
                let e = WorkspaceError::MetadataUnavailable(format!("{uuid}: {e}"));
                warn!("{e}, using an empty record");
                AppInfo::default()
            }
        };
        let info = classify(uuid, info)?;

        let children: Vec<WindowIdentity> = app
            .child_windows
            .iter()
            .map(|child| WindowIdentity::new(uuid, &child.name))
            .filter(|child| self.desktop.is_live(child))
            .collect();

        let main_window = self.capture_window(&main_identity, repaired).await?;
        let child_windows = join_all(children.iter().map(|child| self.capture_window(child, repaired)))
            .await
            .into_iter()
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Some(WorkspaceApp {
            uuid: uuid.to_string(),
            main_window,
            child_windows,
            info,
            confirmed: false,
            custom_data: None,
        }))
    }

    async fn capture_window(
        &self,
        identity: &WindowIdentity,
        repaired: &RepairedTabGroups,
    ) -> Result<WorkspaceWindow, WorkspaceError> {
        let window = self.desktop.expect(identity)?;
        let (group, host_info) =
            futures::join!(self.host.window_group(identity), self.host.window_info(identity));

        let window_group = group
            .into_iter()
            .filter(|member| {
                !self.desktop.is_service(member)
                    && self.desktop.is_live(member)
                    && self.desktop.is_live(&member.main_window())
            })
            .collect();
        let host_info = host_info.unwrap_or_default();

        Ok(WorkspaceWindow {
            uuid: identity.uuid.clone(),
            name: identity.name.clone(),
            bounds: repaired.captured_bounds(identity, window.bounds()),
            is_showing: !window.state.hidden,
            frame: window.state.frame,
            state: window.state.state,
            url: host_info.url,
            title: host_info.title,
            window_group,
            is_tabbed: repaired.is_tabbed(identity),
        })
    }

    async fn request_custom_data(&self, mut app: WorkspaceApp) -> WorkspaceApp {
        let identity = WindowIdentity::main_window_of(&app.uuid);
        if !self.clients.is_connected(&identity) {
            return app;
        }
        debug!(%identity, "requesting custom data");

        let payload = match serde_json::to_value(&app) {
            Ok(payload) => payload,
            Err(e) => {
                warn!(%identity, "could not encode app record: {e}");
                Value::Null
            }
        };
        let timeout = self.desktop.config().settings.client_timeout();
        let request = self.clients.request(&identity, GENERATE_WORKSPACE_TOPIC, payload);
        let custom_data = match tokio::time::timeout(timeout, request).await {
            Ok(Ok(data)) => data,
            Ok(Err(e)) => {
                warn!(%identity, "custom data request failed: {e}");
                None
            }
            Err(_) => {
                warn!("{}", WorkspaceError::ClientTimeout(identity));
                None
            }
        };

        app.custom_data = Some(custom_data.unwrap_or(Value::Null));
        app.confirmed = true;
        app
    }
}

/// Keeps only the metadata needed to relaunch the app: the manifest URL for
/// apps started from their own manifest, the initial options for apps created
/// programmatically.
fn classify(uuid: &str, mut info: AppInfo) -> Result<AppInfo, WorkspaceError> {
    if created_from_manifest(uuid, &info) {
        info.manifest = None;
        return Ok(info);
    }
    if info.initial_options.is_some() {
        info.manifest = None;
        info.manifest_url = None;
        return Ok(info);
    }
    Err(WorkspaceError::Unrestorable {
        uuid: uuid.to_string(),
        reason: "neither a manifest URL nor initial options",
    })
}

fn created_from_manifest(uuid: &str, info: &AppInfo) -> bool {
    if info.manifest_url.as_deref().is_none_or(str::is_empty) {
        return false;
    }
    let startup_uuid = info
        .manifest
        .as_ref()
        .and_then(|manifest| manifest.pointer("/startup_app/uuid"))
        .and_then(Value::as_str);
    startup_uuid.is_none_or(|startup| startup == uuid)
}
