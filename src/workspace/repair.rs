//! Snapshot-time cleanup of tab groups whose members went away.

use tracing::debug;

use super::document::TabGroupSave;
use crate::common::collections::{HashMap, HashSet};
use crate::model::{TabGroupDimensions, WindowIdentity};
use crate::sys::geometry::Rect;

#[derive(Clone, Debug, Default, PartialEq)]
pub struct RepairedTabGroups {
    /// Groups that still have at least two valid tabs, in their original order.
    pub tab_groups: Vec<TabGroupSave>,
    /// Sole survivors of dissolved groups, with the dissolved group's
    /// dimensions.
    pub formerly_tabbed: HashMap<WindowIdentity, TabGroupDimensions>,
    tabbed: HashSet<WindowIdentity>,
}

impl RepairedTabGroups {
    pub fn is_tabbed(&self, identity: &WindowIdentity) -> bool { self.tabbed.contains(identity) }

    /// Geometry to record for a window: its untabbed geometry if its tab group
    /// was dissolved, `bounds` otherwise.
    pub fn captured_bounds(&self, identity: &WindowIdentity, bounds: Rect) -> Rect {
        match self.formerly_tabbed.get(identity) {
            Some(dimensions) => dimensions.untabbed(bounds),
            None => bounds,
        }
    }
}

/// Drops tabs that are no longer valid, re-elects the active tab when it was
/// dropped, and dissolves groups left with fewer than two tabs.
///
/// A tab is valid when both it and its application's main window pass
/// `is_live`.
pub fn repair_tab_groups(
    groups: &[TabGroupSave],
    is_live: impl Fn(&WindowIdentity) -> bool,
) -> RepairedTabGroups {
    let mut repaired = RepairedTabGroups::default();

    for group in groups {
        let tabs: Vec<WindowIdentity> = group
            .tabs
            .iter()
            .filter(|tab| is_live(tab) && is_live(&tab.main_window()))
            .cloned()
            .collect();

        match tabs.len() {
            0 => debug!(dropped = group.tabs.len(), "dropping tab group without valid tabs"),
            1 => {
                debug!(survivor = %tabs[0], "dissolving tab group with a single valid tab");
                repaired.formerly_tabbed.insert(tabs[0].clone(), group.group_info.dimensions);
            }
            _ => {
                let mut group_info = group.group_info.clone();
                if !tabs.contains(&group_info.active) {
                    debug!(removed = %group_info.active, elected = %tabs[0], "re-electing active tab");
                    group_info.active = tabs[0].clone();
                }
                repaired.tabbed.extend(tabs.iter().cloned());
                repaired.tab_groups.push(TabGroupSave { group_info, tabs });
            }
        }
    }

    repaired
}
