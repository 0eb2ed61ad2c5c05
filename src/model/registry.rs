use std::sync::Arc;

use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use serde::{Deserialize, Serialize};

use super::error::ModelError;
use super::groups::{SnapGroupId, TabGroupId};
use super::identity::WindowIdentity;
use crate::sys::geometry::{Rect, Size};

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DisplayState {
    #[default]
    Normal,
    Minimized,
    Maximized,
}

/// Host-reported state of a window, replaced as a whole on every update.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WindowState {
    pub bounds: Rect,
    #[serde(default)]
    pub hidden: bool,
    #[serde(default = "yes")]
    pub frame: bool,
    #[serde(default)]
    pub state: DisplayState,
    #[serde(default = "default_min_size")]
    pub min_size: Size,
}

impl WindowState {
    pub fn new(bounds: Rect) -> Self {
        Self {
            bounds,
            hidden: false,
            frame: true,
            state: DisplayState::Normal,
            min_size: default_min_size(),
        }
    }

    pub fn with_min_size(self, min_size: Size) -> Self { Self { min_size, ..self } }
}

fn yes() -> bool { true }

fn default_min_size() -> Size { Size::ZERO }

#[derive(Clone, Debug, PartialEq)]
pub struct DesktopWindow {
    pub identity: WindowIdentity,
    pub state: WindowState,
    pub snap_group: SnapGroupId,
    pub tab_group: Option<TabGroupId>,
}

impl DesktopWindow {
    pub fn bounds(&self) -> Rect { self.state.bounds }

    pub fn is_tabbed(&self) -> bool { self.tab_group.is_some() }
}

/// Thread-safe store of registered windows keyed by identity.
///
/// Readers always get a clone of a complete record; writers replace or mutate
/// a record while holding its shard lock.
#[derive(Clone, Default, Debug)]
pub struct WindowRegistry(Arc<DashMap<WindowIdentity, DesktopWindow>>);

impl WindowRegistry {
    pub fn new() -> Self { Self::default() }

    /// Inserts a record, or refreshes the state of an existing one while
    /// keeping its group memberships. Returns `true` if the window was new.
    pub fn upsert(&self, window: DesktopWindow) -> bool {
        match self.0.entry(window.identity.clone()) {
            Entry::Occupied(mut entry) => {
                entry.get_mut().state = window.state;
                false
            }
            Entry::Vacant(entry) => {
                entry.insert(window);
                true
            }
        }
    }

    pub fn get(&self, identity: &WindowIdentity) -> Option<DesktopWindow> {
        self.0.get(identity).map(|entry| entry.clone())
    }

    /// Like [`get`](Self::get), for callers that have just proven the window
    /// exists; absence means it was deregistered in between.
    pub fn expect(&self, identity: &WindowIdentity) -> Result<DesktopWindow, ModelError> {
        self.get(identity).ok_or_else(|| ModelError::NotFound(identity.clone()))
    }

    pub fn contains(&self, identity: &WindowIdentity) -> bool { self.0.contains_key(identity) }

    pub fn remove(&self, identity: &WindowIdentity) -> Option<DesktopWindow> {
        self.0.remove(identity).map(|(_, window)| window)
    }

    /// Applies `f` to the record atomically. Returns `false` for unknown windows.
    pub fn update(&self, identity: &WindowIdentity, f: impl FnOnce(&mut DesktopWindow)) -> bool {
        match self.0.get_mut(identity) {
            Some(mut entry) => {
                f(entry.value_mut());
                true
            }
            None => false,
        }
    }

    pub fn identities(&self) -> Vec<WindowIdentity> {
        self.0.iter().map(|entry| entry.key().clone()).collect()
    }

    pub fn len(&self) -> usize { self.0.len() }

    pub fn is_empty(&self) -> bool { self.0.is_empty() }
}

#[cfg(test)]
mod tests {
    use slotmap::SlotMap;

    use super::*;

    fn window(name: &str, group: SnapGroupId, bounds: Rect) -> DesktopWindow {
        DesktopWindow {
            identity: WindowIdentity::new("app", name),
            state: WindowState::new(bounds),
            snap_group: group,
            tab_group: None,
        }
    }

    fn group_ids(n: usize) -> Vec<SnapGroupId> {
        let mut map: SlotMap<SnapGroupId, ()> = SlotMap::default();
        (0..n).map(|_| map.insert(())).collect()
    }

    #[test]
    fn test_registry_upsert_and_get() {
        let registry = WindowRegistry::new();
        let ids = group_ids(1);
        let bounds = Rect::new(0.0, 0.0, 100.0, 100.0);

        assert!(registry.upsert(window("a", ids[0], bounds)));
        let record = registry.get(&WindowIdentity::new("app", "a")).expect("Should have record");
        assert_eq!(record.bounds(), bounds);
        assert_eq!(record.snap_group, ids[0]);
    }

    #[test]
    fn test_registry_upsert_existing_keeps_memberships() {
        let registry = WindowRegistry::new();
        let ids = group_ids(2);
        registry.upsert(window("a", ids[0], Rect::ZERO));

        let moved = Rect::new(10.0, 10.0, 50.0, 50.0);
        assert!(!registry.upsert(window("a", ids[1], moved)));

        let record = registry.get(&WindowIdentity::new("app", "a")).unwrap();
        assert_eq!(record.bounds(), moved);
        assert_eq!(record.snap_group, ids[0]);
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_registry_expect_missing() {
        let registry = WindowRegistry::new();
        let missing = WindowIdentity::new("app", "missing");
        assert_eq!(registry.expect(&missing), Err(ModelError::NotFound(missing)));
    }

    #[test]
    fn test_registry_remove_unknown_is_noop() {
        let registry = WindowRegistry::new();
        assert!(registry.remove(&WindowIdentity::new("app", "nope")).is_none());
        assert!(registry.is_empty());
    }

    #[test]
    fn test_registry_update() {
        let registry = WindowRegistry::new();
        let ids = group_ids(1);
        registry.upsert(window("a", ids[0], Rect::ZERO));

        let identity = WindowIdentity::new("app", "a");
        assert!(registry.update(&identity, |w| w.state.hidden = true));
        assert!(registry.get(&identity).unwrap().state.hidden);
        assert!(!registry.update(&WindowIdentity::new("app", "b"), |w| w.state.hidden = true));
    }

    #[test]
    fn test_registry_clone_shares_storage() {
        let registry = WindowRegistry::new();
        let cloned = registry.clone();
        let ids = group_ids(1);
        registry.upsert(window("a", ids[0], Rect::ZERO));
        assert!(cloned.contains(&WindowIdentity::new("app", "a")));
    }
}
