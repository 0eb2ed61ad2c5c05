//! Re-applies the tab and snap relationships recorded in a [`Workspace`].

use tracing::{debug, info, info_span, warn};

use super::document::{TabGroupSave, Workspace, WorkspaceWindow};
use super::error::WorkspaceError;
use crate::model::{Desktop, ModelError};

/// What a regroup pass did. Skipped items were missing or refused and left
/// alone.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct RegroupReport {
    pub tab_groups: usize,
    pub merges: usize,
    pub skipped: usize,
}

/// Restores tab groups, then merges every captured window with its captured
/// siblings. Running it again on the same document changes nothing.
///
/// Fails only when the document's schema version cannot be restored.
pub async fn regroup_workspace(
    desktop: &Desktop,
    workspace: &Workspace,
) -> Result<RegroupReport, WorkspaceError> {
    let version = workspace.check_compatible()?;
    let _pass = desktop.begin_pass().await;
    let span = info_span!("regroup", %version, apps = workspace.apps.len());
    let _enter = span.enter();

    let mut report = RegroupReport::default();
    for saved in &workspace.tab_groups {
        restore_tab_group(desktop, saved, &mut report);
    }
    for app in &workspace.apps {
        for window in app.windows() {
            group_window(desktop, window, &mut report);
        }
    }

    info!(?report, "regrouped workspace");
    Ok(report)
}

fn restore_tab_group(desktop: &Desktop, saved: &TabGroupSave, report: &mut RegroupReport) {
    let tabs: Vec<_> = saved.tabs.iter().filter(|t| desktop.is_live(t)).cloned().collect();
    if tabs.len() < 2 {
        debug!(live = tabs.len(), "not enough live tabs to restore group");
        report.skipped += 1;
        return;
    }
    match desktop.restore_tab_group(&tabs, saved.group_info.clone()) {
        Ok(_) => report.tab_groups += 1,
        Err(e) => {
            warn!("tab group not restored: {e}");
            report.skipped += 1;
        }
    }
}

fn group_window(desktop: &Desktop, window: &WorkspaceWindow, report: &mut RegroupReport) {
    let identity = window.identity();
    for sibling in &window.window_group {
        if desktop.is_service(sibling) {
            continue;
        }
        match desktop.dock(sibling, &identity) {
            Ok(true) => report.merges += 1,
            Ok(false) => {}
            Err(ModelError::NotFound(missing)) => {
                debug!(%missing, "window not registered, not regrouping");
                report.skipped += 1;
            }
            Err(e) => {
                debug!(%identity, %sibling, "not regrouping: {e}");
                report.skipped += 1;
            }
        }
    }
}
