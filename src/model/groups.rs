use serde::{Deserialize, Serialize};
use slotmap::{SlotMap, new_key_type};

use super::identity::WindowIdentity;
use crate::sys::geometry::Rect;

new_key_type! {
    pub struct SnapGroupId;
    pub struct TabGroupId;
}

/// Windows that move and resize together.
#[derive(Clone, Debug, Default)]
pub struct SnapGroup {
    members: Vec<WindowIdentity>,
}

impl SnapGroup {
    pub fn members(&self) -> &[WindowIdentity] { &self.members }

    pub fn len(&self) -> usize { self.members.len() }

    pub fn is_empty(&self) -> bool { self.members.is_empty() }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TabGroupDimensions {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub tab_group_height: f64,
    pub app_height: f64,
}

impl TabGroupDimensions {
    /// Dimensions of a container whose tab strip sits on top of `bounds`.
    pub fn around(bounds: Rect, tab_strip_height: f64) -> Self {
        Self {
            x: bounds.left,
            y: bounds.top,
            width: bounds.width,
            tab_group_height: tab_strip_height,
            app_height: (bounds.height - tab_strip_height).max(0.0),
        }
    }

    /// Bounds every tab takes: the container minus the strip.
    pub fn tab_bounds(&self) -> Rect {
        Rect::new(self.x, self.y + self.tab_group_height, self.width, self.app_height)
    }

    /// Bounds a tab gets back once it leaves the container.
    pub fn untabbed(&self, tab_bounds: Rect) -> Rect {
        Rect::new(
            tab_bounds.left,
            tab_bounds.top - self.tab_group_height,
            tab_bounds.width,
            tab_bounds.height + self.tab_group_height,
        )
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TabGroupInfo {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    pub active: WindowIdentity,
    pub dimensions: TabGroupDimensions,
}

/// Windows sharing one tabbed container. Only `active` is visible.
#[derive(Clone, Debug, PartialEq)]
pub struct TabGroup {
    pub id: TabGroupId,
    pub tabs: Vec<WindowIdentity>,
    pub info: TabGroupInfo,
}

impl TabGroup {
    pub fn active(&self) -> &WindowIdentity { &self.info.active }

    pub fn contains(&self, identity: &WindowIdentity) -> bool { self.tabs.contains(identity) }
}

/// Arena for snap and tab groups. Windows refer to groups by id only.
#[derive(Debug, Default)]
pub struct GroupStore {
    snap_groups: SlotMap<SnapGroupId, SnapGroup>,
    tab_groups: SlotMap<TabGroupId, TabGroup>,
    // Creation order, since slot order is not stable across removals.
    tab_order: Vec<TabGroupId>,
}

impl GroupStore {
    pub fn new() -> Self { Self::default() }

    pub fn create_snap_group(&mut self, member: WindowIdentity) -> SnapGroupId {
        self.snap_groups.insert(SnapGroup { members: vec![member] })
    }

    pub fn snap_group(&self, id: SnapGroupId) -> Option<&SnapGroup> { self.snap_groups.get(id) }

    pub fn snap_group_count(&self) -> usize { self.snap_groups.len() }

    pub fn add_to_snap_group(&mut self, id: SnapGroupId, member: WindowIdentity) {
        if let Some(group) = self.snap_groups.get_mut(id)
            && !group.members.contains(&member)
        {
            group.members.push(member);
        }
    }

    /// Removes `member` from the group, dropping the group once it is empty.
    pub fn remove_from_snap_group(&mut self, id: SnapGroupId, member: &WindowIdentity) {
        let Some(group) = self.snap_groups.get_mut(id) else { return };
        group.members.retain(|m| m != member);
        if group.members.is_empty() {
            self.snap_groups.remove(id);
        }
    }

    /// Moves every member of `from` into `into` and drops `from`. Returns the
    /// moved members.
    pub fn merge_snap_groups(&mut self, from: SnapGroupId, into: SnapGroupId) -> Vec<WindowIdentity> {
        if from == into || !self.snap_groups.contains_key(into) {
            return Vec::new();
        }
        let Some(source) = self.snap_groups.remove(from) else { return Vec::new() };
        let target = &mut self.snap_groups[into];
        for member in &source.members {
            if !target.members.contains(member) {
                target.members.push(member.clone());
            }
        }
        source.members
    }

    pub fn insert_tab_group(
        &mut self,
        tabs: Vec<WindowIdentity>,
        info: TabGroupInfo,
    ) -> TabGroupId {
        let id = self.tab_groups.insert_with_key(|id| TabGroup { id, tabs, info });
        self.tab_order.push(id);
        id
    }

    pub fn tab_group(&self, id: TabGroupId) -> Option<&TabGroup> { self.tab_groups.get(id) }

    pub fn tab_group_mut(&mut self, id: TabGroupId) -> Option<&mut TabGroup> {
        self.tab_groups.get_mut(id)
    }

    pub fn remove_tab_group(&mut self, id: TabGroupId) -> Option<TabGroup> {
        self.tab_order.retain(|&other| other != id);
        self.tab_groups.remove(id)
    }

    /// Tab groups in creation order.
    pub fn tab_groups(&self) -> impl Iterator<Item = &TabGroup> + '_ {
        self.tab_order.iter().filter_map(|&id| self.tab_groups.get(id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn w(name: &str) -> WindowIdentity { WindowIdentity::new("app", name) }

    fn info(active: &str) -> TabGroupInfo {
        TabGroupInfo {
            url: None,
            active: w(active),
            dimensions: TabGroupDimensions::default(),
        }
    }

    #[test]
    fn test_snap_group_create_and_add() {
        let mut store = GroupStore::new();
        let id = store.create_snap_group(w("a"));
        store.add_to_snap_group(id, w("b"));
        store.add_to_snap_group(id, w("b"));

        assert_eq!(store.snap_group(id).unwrap().members(), &[w("a"), w("b")]);
    }

    #[test]
    fn test_remove_last_member_drops_group() {
        let mut store = GroupStore::new();
        let id = store.create_snap_group(w("a"));
        store.remove_from_snap_group(id, &w("a"));
        assert!(store.snap_group(id).is_none());
        assert_eq!(store.snap_group_count(), 0);
    }

    #[test]
    fn test_merge_snap_groups() {
        let mut store = GroupStore::new();
        let a = store.create_snap_group(w("a"));
        let b = store.create_snap_group(w("b"));
        store.add_to_snap_group(b, w("c"));

        let moved = store.merge_snap_groups(b, a);
        assert_eq!(moved, vec![w("b"), w("c")]);
        assert!(store.snap_group(b).is_none());
        assert_eq!(store.snap_group(a).unwrap().members(), &[w("a"), w("b"), w("c")]);
    }

    #[test]
    fn test_merge_into_self_is_noop() {
        let mut store = GroupStore::new();
        let a = store.create_snap_group(w("a"));
        assert!(store.merge_snap_groups(a, a).is_empty());
        assert_eq!(store.snap_group(a).unwrap().len(), 1);
    }

    #[test]
    fn test_dimensions_round_trip_through_untabbed() {
        let container = Rect::new(100.0, 50.0, 400.0, 300.0);
        let dims = TabGroupDimensions::around(container, 60.0);
        assert_eq!(dims.app_height, 240.0);

        let tab = dims.tab_bounds();
        assert_eq!(tab, Rect::new(100.0, 110.0, 400.0, 240.0));
        assert_eq!(dims.untabbed(tab), container);
    }

    #[test]
    fn test_dimensions_clamp_short_windows() {
        let dims = TabGroupDimensions::around(Rect::new(0.0, 0.0, 100.0, 40.0), 60.0);
        assert_eq!(dims.app_height, 0.0);
    }

    #[test]
    fn test_tab_groups_iterate_in_creation_order() {
        let mut store = GroupStore::new();
        let first = store.insert_tab_group(vec![w("a"), w("b")], info("a"));
        let second = store.insert_tab_group(vec![w("c"), w("d")], info("c"));
        store.remove_tab_group(first);
        let third = store.insert_tab_group(vec![w("e"), w("f")], info("e"));

        let order: Vec<TabGroupId> = store.tab_groups().map(|g| g.id).collect();
        assert_eq!(order, vec![second, third]);
    }
}
