//! The live desktop: registered windows plus the snap and tab groups over them.
//!
//! Group membership is tracked twice, as member lists in [`GroupStore`] and as
//! ids on each [`DesktopWindow`]. Both sides are only changed while holding the
//! group lock, so they never disagree for longer than one operation.

use parking_lot::RwLock;
use tokio::sync::{RwLock as PassGate, RwLockReadGuard};
use tracing::{debug, info, trace, warn};

use super::error::ModelError;
use super::groups::{GroupStore, SnapGroupId, TabGroup, TabGroupDimensions, TabGroupId, TabGroupInfo};
use super::identity::WindowIdentity;
use super::registry::{DesktopWindow, WindowRegistry, WindowState};
use crate::actor::broadcast::{BroadcastEvent, Broadcaster};
use crate::common::collections::HashSet;
use crate::common::config::Config;
use crate::layout_engine::{ResizeCascade, ResizeMember};
use crate::sys::geometry::{Rect, Round};

pub struct Desktop {
    registry: WindowRegistry,
    groups: RwLock<GroupStore>,
    pass_gate: PassGate<()>,
    config: Config,
    events: Broadcaster,
    cascade: ResizeCascade,
}

impl Desktop {
    pub fn new(config: Config) -> Self {
        let cascade = ResizeCascade::new(config.settings.snap.edge_tolerance);
        Self {
            registry: WindowRegistry::new(),
            groups: RwLock::new(GroupStore::new()),
            pass_gate: PassGate::new(()),
            config,
            events: Broadcaster::new(),
            cascade,
        }
    }

    pub fn config(&self) -> &Config { &self.config }

    pub fn events(&self) -> &Broadcaster { &self.events }

    pub fn registry(&self) -> &WindowRegistry { &self.registry }

    /// Held by snapshot and regroup passes for their whole duration, so that
    /// registration changes wait until the pass is over.
    pub async fn begin_pass(&self) -> RwLockReadGuard<'_, ()> { self.pass_gate.read().await }

    pub fn service_uuid(&self) -> &str { &self.config.settings.service_uuid }

    pub fn is_service(&self, identity: &WindowIdentity) -> bool {
        identity.uuid == self.config.settings.service_uuid
    }

    /// Registers a window in a fresh singleton snap group. Registering a known
    /// window only refreshes its state. Returns `true` if the window was new.
    pub async fn register(&self, identity: WindowIdentity, state: WindowState) -> bool {
        let _gate = self.pass_gate.write().await;
        let mut groups = self.groups.write();
        if self.registry.update(&identity, |w| w.state = state) {
            trace!(%identity, "refreshed window state");
            return false;
        }
        let snap_group = groups.create_snap_group(identity.clone());
        self.registry.upsert(DesktopWindow {
            identity: identity.clone(),
            state,
            snap_group,
            tab_group: None,
        });
        debug!(%identity, "registered window");
        true
    }

    /// Forgets a window, taking it out of its snap and tab groups. Unknown
    /// windows are ignored.
    pub async fn deregister(&self, identity: &WindowIdentity) -> bool {
        let _gate = self.pass_gate.write().await;
        let mut groups = self.groups.write();
        let Some(window) = self.registry.remove(identity) else {
            trace!(%identity, "deregistering unknown window");
            return false;
        };
        if let Some(tab_group) = window.tab_group {
            self.detach_tab(&mut groups, tab_group, identity);
        }
        groups.remove_from_snap_group(window.snap_group, identity);
        debug!(%identity, "deregistered window");
        true
    }

    /// Replaces the host-reported state of a window in one step.
    pub fn update_state(&self, identity: &WindowIdentity, f: impl FnOnce(&mut WindowState)) -> bool {
        self.registry.update(identity, |w| f(&mut w.state))
    }

    pub fn get(&self, identity: &WindowIdentity) -> Option<DesktopWindow> { self.registry.get(identity) }

    pub fn expect(&self, identity: &WindowIdentity) -> Result<DesktopWindow, ModelError> {
        self.registry.expect(identity)
    }

    /// Whether the window is registered. Everything that is not live is
    /// filtered out silently.
    pub fn is_live(&self, identity: &WindowIdentity) -> bool { self.registry.contains(identity) }

    pub fn snap_group_of(&self, identity: &WindowIdentity) -> Option<SnapGroupId> {
        self.registry.get(identity).map(|w| w.snap_group)
    }

    /// Other live members of the window's snap group, in joining order.
    pub fn group_members(&self, identity: &WindowIdentity) -> Vec<WindowIdentity> {
        let Some(window) = self.registry.get(identity) else { return Vec::new() };
        let groups = self.groups.read();
        let Some(group) = groups.snap_group(window.snap_group) else { return Vec::new() };
        group
            .members()
            .iter()
            .filter(|m| *m != identity && !self.is_service(m) && self.is_live(m))
            .cloned()
            .collect()
    }

    /// Live, non-service members of every snap group, each sorted, sorted by
    /// first member.
    pub fn snap_groups(&self) -> Vec<Vec<WindowIdentity>> {
        let groups = self.groups.read();
        let mut seen = HashSet::default();
        let mut partition: Vec<Vec<WindowIdentity>> = Vec::new();
        for identity in self.registry.identities() {
            let Some(window) = self.registry.get(&identity) else { continue };
            if !seen.insert(window.snap_group) {
                continue;
            }
            let Some(group) = groups.snap_group(window.snap_group) else { continue };
            let mut members: Vec<WindowIdentity> = group
                .members()
                .iter()
                .filter(|m| !self.is_service(m) && self.is_live(m))
                .cloned()
                .collect();
            if members.is_empty() {
                continue;
            }
            members.sort();
            partition.push(members);
        }
        partition.sort();
        partition
    }

    pub fn tab_group_of(&self, identity: &WindowIdentity) -> Option<TabGroup> {
        let id = self.registry.get(identity)?.tab_group?;
        self.groups.read().tab_group(id).cloned()
    }

    pub fn tab_groups(&self) -> Vec<TabGroup> { self.groups.read().tab_groups().cloned().collect() }

    /// The window that stands for `identity` in snap groups: the active tab for
    /// a tabbed window, the window itself otherwise.
    pub fn representative(&self, identity: &WindowIdentity) -> WindowIdentity {
        match self.tab_group_of(identity) {
            Some(group) => group.info.active,
            None => identity.clone(),
        }
    }

    /// Merges the window's snap group into `target`. Returns `false` if the
    /// window already was in `target`.
    pub fn set_snap_group(
        &self,
        identity: &WindowIdentity,
        target: SnapGroupId,
    ) -> Result<bool, ModelError> {
        let mut groups = self.groups.write();
        let window = self.registry.expect(identity)?;
        if window.snap_group == target {
            return Ok(false);
        }
        if groups.snap_group(target).is_none() {
            return Err(ModelError::UnknownSnapGroup(target));
        }
        let moved = groups.merge_snap_groups(window.snap_group, target);
        for member in &moved {
            self.registry.update(member, |w| w.snap_group = target);
        }
        debug!(%identity, moved = moved.len(), "merged snap groups");
        Ok(true)
    }

    /// Groups `identity` with `onto`, resolving both to their representatives.
    pub fn dock(&self, identity: &WindowIdentity, onto: &WindowIdentity) -> Result<bool, ModelError> {
        let window = self.representative(identity);
        let target = self.representative(onto);
        for side in [&window, &target] {
            if !self.config.dock_enabled(side) {
                debug!(identity = %side, "docking disabled, not grouping");
                return Err(ModelError::DockingDisabled(side.clone()));
            }
        }
        let target_group = self.expect(&target)?.snap_group;
        self.set_snap_group(&window, target_group)
    }

    /// Moves a window, or its whole tab group, into a snap group of its own.
    pub fn undock(&self, identity: &WindowIdentity) -> Result<bool, ModelError> {
        let mut groups = self.groups.write();
        let window = self.registry.expect(identity)?;
        let unit = match window.tab_group.and_then(|id| groups.tab_group(id)) {
            Some(group) => group.tabs.clone(),
            None => vec![identity.clone()],
        };
        let alone = groups
            .snap_group(window.snap_group)
            .is_none_or(|g| g.members().iter().all(|m| unit.contains(m)));
        if alone {
            return Ok(false);
        }
        let fresh = groups.create_snap_group(unit[0].clone());
        for member in &unit {
            self.move_to_snap_group(&mut groups, member, fresh);
        }
        debug!(%identity, "undocked");
        Ok(true)
    }

    /// Creates a tab group from at least two untabbed windows. The first window
    /// becomes the active tab and provides the container geometry, and every
    /// tab joins its snap group.
    pub fn create_tab_group(&self, tabs: &[WindowIdentity]) -> Result<TabGroupId, ModelError> {
        let first = tabs.first().ok_or(ModelError::TooFewTabs(0))?;
        let bounds = self.expect(first)?.bounds();
        let info = TabGroupInfo {
            url: None,
            active: first.clone(),
            dimensions: TabGroupDimensions::around(bounds, self.config.settings.tabs.tab_strip_height),
        };
        self.insert_tab_group(tabs, info)
    }

    /// Recreates a saved tab group over the given tabs. A group that already
    /// holds exactly these tabs is kept as is.
    pub fn restore_tab_group(
        &self,
        tabs: &[WindowIdentity],
        info: TabGroupInfo,
    ) -> Result<TabGroupId, ModelError> {
        if let Some(first) = tabs.first()
            && let Some(existing) = self.tab_group_of(first)
            && existing.tabs == tabs
        {
            trace!(tabs = tabs.len(), "tab group already in place");
            return Ok(existing.id);
        }
        self.insert_tab_group(tabs, info)
    }

    fn insert_tab_group(
        &self,
        tabs: &[WindowIdentity],
        mut info: TabGroupInfo,
    ) -> Result<TabGroupId, ModelError> {
        let mut unique: Vec<WindowIdentity> = Vec::with_capacity(tabs.len());
        for tab in tabs {
            if !unique.contains(tab) {
                unique.push(tab.clone());
            }
        }
        if unique.len() < 2 {
            return Err(ModelError::TooFewTabs(unique.len()));
        }

        let mut groups = self.groups.write();
        let mut snap_group = None;
        for tab in &unique {
            let window = self.registry.expect(tab)?;
            if window.is_tabbed() {
                return Err(ModelError::AlreadyTabbed(tab.clone()));
            }
            snap_group.get_or_insert(window.snap_group);
        }
        let Some(snap_group) = snap_group else { return Err(ModelError::TooFewTabs(0)) };

        if !unique.contains(&info.active) {
            info.active = unique[0].clone();
        }
        let tab_bounds = info.dimensions.tab_bounds();
        let id = groups.insert_tab_group(unique.clone(), info);
        for tab in &unique {
            self.move_to_snap_group(&mut groups, tab, snap_group);
            self.registry.update(tab, |w| {
                w.tab_group = Some(id);
                w.state.bounds = tab_bounds;
            });
        }
        drop(groups);

        info!(tabs = unique.len(), "created tab group");
        for (index, tab) in unique.iter().enumerate() {
            self.events.publish(BroadcastEvent::TabAdded {
                identity: tab.clone(),
                tab_group: unique.clone(),
                index,
            });
        }
        Ok(id)
    }

    /// Adds an untabbed window to the tab group of `group_of`. Returns its
    /// index in the group.
    pub fn add_tab(&self, group_of: &WindowIdentity, identity: &WindowIdentity) -> Result<usize, ModelError> {
        let mut groups = self.groups.write();
        let host = self.registry.expect(group_of)?;
        let id = host.tab_group.ok_or_else(|| ModelError::NotTabbed(group_of.clone()))?;
        let window = self.registry.expect(identity)?;
        if window.is_tabbed() {
            return Err(ModelError::AlreadyTabbed(identity.clone()));
        }
        let Some(group) = groups.tab_group_mut(id) else {
            return Err(ModelError::NotTabbed(group_of.clone()));
        };
        group.tabs.push(identity.clone());
        let index = group.tabs.len() - 1;
        let tabs = group.tabs.clone();
        let tab_bounds = group.info.dimensions.tab_bounds();

        self.move_to_snap_group(&mut groups, identity, host.snap_group);
        self.registry.update(identity, |w| {
            w.tab_group = Some(id);
            w.state.bounds = tab_bounds;
        });
        drop(groups);

        debug!(%identity, index, "added tab");
        self.events.publish(BroadcastEvent::TabAdded {
            identity: identity.clone(),
            tab_group: tabs,
            index,
        });
        Ok(index)
    }

    /// Takes a window out of its tab group into a snap group of its own and
    /// gives it back its untabbed geometry.
    pub fn remove_tab(&self, identity: &WindowIdentity) -> Result<(), ModelError> {
        let mut groups = self.groups.write();
        let window = self.registry.expect(identity)?;
        let id = window.tab_group.ok_or_else(|| ModelError::NotTabbed(identity.clone()))?;
        let dimensions = groups.tab_group(id).map(|g| g.info.dimensions).unwrap_or_default();

        let fresh = groups.create_snap_group(identity.clone());
        self.move_to_snap_group(&mut groups, identity, fresh);
        self.registry.update(identity, |w| {
            w.tab_group = None;
            w.state.bounds = dimensions.untabbed(w.state.bounds);
        });
        self.detach_tab(&mut groups, id, identity);
        Ok(())
    }

    pub fn set_active_tab(&self, identity: &WindowIdentity) -> Result<(), ModelError> {
        let mut groups = self.groups.write();
        let window = self.registry.expect(identity)?;
        let group = window
            .tab_group
            .and_then(|id| groups.tab_group_mut(id))
            .ok_or_else(|| ModelError::NotTabbed(identity.clone()))?;
        if group.info.active == *identity {
            return Ok(());
        }
        group.info.active = identity.clone();
        drop(groups);
        self.events.publish(BroadcastEvent::TabActivated { identity: identity.clone() });
        Ok(())
    }

    pub fn get_tabs(&self, identity: &WindowIdentity) -> Option<Vec<WindowIdentity>> {
        self.tab_group_of(identity).map(|group| group.tabs)
    }

    pub fn tabbed_windows(&self) -> Vec<WindowIdentity> { self.windows_where(|w| w.is_tabbed()) }

    pub fn untabbed_windows(&self) -> Vec<WindowIdentity> { self.windows_where(|w| !w.is_tabbed()) }

    fn windows_where(&self, f: impl Fn(&DesktopWindow) -> bool) -> Vec<WindowIdentity> {
        let mut windows: Vec<WindowIdentity> = self
            .registry
            .identities()
            .into_iter()
            .filter(|id| !self.is_service(id))
            .filter(|id| self.registry.get(id).is_some_and(|w| f(&w)))
            .collect();
        windows.sort();
        windows
    }

    /// Applies a host-requested resize or move of one window to its whole snap
    /// group. A tab group takes part as one unit. Returns every window whose
    /// bounds changed.
    pub fn apply_resize(
        &self,
        identity: &WindowIdentity,
        requested: Rect,
    ) -> Result<Vec<(WindowIdentity, Rect)>, ModelError> {
        let mut groups = self.groups.write();
        let window = self.registry.expect(identity)?;
        let dragged = match window.tab_group.and_then(|id| groups.tab_group(id)) {
            Some(group) => group.info.active.clone(),
            None => identity.clone(),
        };

        let members: Vec<ResizeMember> = groups
            .snap_group(window.snap_group)
            .map(|g| g.members().to_vec())
            .unwrap_or_default()
            .into_iter()
            .filter_map(|m| self.registry.get(&m))
            .filter(|w| match w.tab_group.and_then(|id| groups.tab_group(id)) {
                Some(group) => group.info.active == w.identity,
                None => true,
            })
            .map(|w| ResizeMember {
                identity: w.identity.clone(),
                bounds: w.bounds(),
                min_size: w.state.min_size,
            })
            .collect();

        let changes = self.cascade.apply(&members, &dragged, requested);
        let mut applied = Vec::with_capacity(changes.len());
        for (unit, bounds) in changes {
            let bounds = bounds.round();
            let tab_group = self.registry.get(&unit).and_then(|w| w.tab_group);
            match tab_group.and_then(|id| groups.tab_group_mut(id)) {
                Some(group) => {
                    let dims = &mut group.info.dimensions;
                    dims.x = bounds.left;
                    dims.y = bounds.top - dims.tab_group_height;
                    dims.width = bounds.width;
                    dims.app_height = bounds.height;
                    for tab in &group.tabs {
                        self.registry.update(tab, |w| w.state.bounds = bounds);
                        applied.push((tab.clone(), bounds));
                    }
                }
                None => {
                    self.registry.update(&unit, |w| w.state.bounds = bounds);
                    applied.push((unit, bounds));
                }
            }
        }
        trace!(%identity, changed = applied.len(), "applied resize");
        Ok(applied)
    }

    fn move_to_snap_group(&self, groups: &mut GroupStore, identity: &WindowIdentity, target: SnapGroupId) {
        let Some(window) = self.registry.get(identity) else { return };
        if window.snap_group != target {
            groups.remove_from_snap_group(window.snap_group, identity);
        }
        groups.add_to_snap_group(target, identity.clone());
        self.registry.update(identity, |w| w.snap_group = target);
    }

    /// Drops `identity` from the tab group's tab list. A group left with a
    /// single tab is dissolved and its survivor restored to untabbed geometry,
    /// staying in its snap group.
    fn detach_tab(&self, groups: &mut GroupStore, id: TabGroupId, identity: &WindowIdentity) {
        let Some(group) = groups.tab_group_mut(id) else {
            warn!(%identity, "tab group vanished before its tab");
            return;
        };
        group.tabs.retain(|t| t != identity);
        let remaining = group.tabs.clone();
        let dimensions = group.info.dimensions;
        let mut activated = None;
        if remaining.len() >= 2 && group.info.active == *identity {
            group.info.active = remaining[0].clone();
            activated = Some(remaining[0].clone());
        }

        if remaining.len() < 2 {
            groups.remove_tab_group(id);
            for survivor in &remaining {
                self.registry.update(survivor, |w| {
                    w.tab_group = None;
                    w.state.bounds = dimensions.untabbed(w.state.bounds);
                });
            }
            debug!(%identity, "tab group dissolved");
        }

        self.events.publish(BroadcastEvent::TabRemoved {
            identity: identity.clone(),
            tab_group: remaining,
        });
        if let Some(identity) = activated {
            self.events.publish(BroadcastEvent::TabActivated { identity });
        }
    }
}

impl std::fmt::Debug for Desktop {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Desktop")
            .field("windows", &self.registry.len())
            .field("tab_groups", &self.groups.read().tab_groups().count())
            .finish()
    }
}
