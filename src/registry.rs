//! Per-tab and per-window privacy state.
//!
//! Pure data: no I/O, no events. Only the engine mutates it.

use crate::entity::{Entity, TabId, WindowId};
use std::collections::HashMap;

/// State tracked for one tab
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TabRecord {
    pub window: Option<WindowId>,
    pub is_private: bool,
    /// Not yet fully loaded by the host
    pub is_pending: bool,
    /// Skip the next open rule for this tab (used once, then cleared)
    pub ignore_next_open_event: bool,
}

/// State tracked for one window
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WindowRecord {
    /// The window itself is a dedicated private context
    pub is_private: bool,
    /// Session restore in progress
    pub is_busy: bool,
    pub is_target_window: bool,
    /// `FirstPrivateTab` already emitted for this window
    pub had_private_tab: bool,
    /// Skip last-private checks for this window's tabs (deliberate close
    /// flow, or the window itself is closing)
    pub suspend_last_private_check: bool,
    /// Flag for the next tab opened here (set by `ready_to_open_tab`)
    pub open_next_as: Option<bool>,
    /// Same as `open_next_as` but sticky until cleared
    pub open_all_as: Option<bool>,
}

#[derive(Debug, Default)]
pub struct PrivacyRegistry {
    tabs: HashMap<TabId, TabRecord>,
    windows: HashMap<WindowId, WindowRecord>,
}

impl PrivacyRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    // ---- tabs ----

    pub fn tab(&self, id: TabId) -> Option<&TabRecord> {
        self.tabs.get(&id)
    }

    pub fn tab_mut(&mut self, id: TabId) -> Option<&mut TabRecord> {
        self.tabs.get_mut(&id)
    }

    /// Record a tab on first observation; existing entries are kept
    pub fn observe_tab(&mut self, id: TabId, window: WindowId) -> &mut TabRecord {
        let record = self.tabs.entry(id).or_default();
        record.window = Some(window);
        record
    }

    /// `None` for tabs never observed (or already destroyed)
    pub fn get(&self, id: TabId) -> Option<bool> {
        self.tabs.get(&id).map(|t| t.is_private)
    }

    /// Set the privacy flag. Returns the previous value, or `None` when the tab
    /// is unknown (nothing is recorded in that case).
    pub fn set(&mut self, id: TabId, is_private: bool) -> Option<bool> {
        let record = self.tabs.get_mut(&id)?;
        Some(std::mem::replace(&mut record.is_private, is_private))
    }

    pub fn clear(&mut self, id: TabId) -> Option<TabRecord> {
        self.tabs.remove(&id)
    }

    pub fn window_of(&self, id: TabId) -> Option<WindowId> {
        self.tabs.get(&id).and_then(|t| t.window)
    }

    /// Tabs owned by `window`, sorted by id
    pub fn tabs_in(&self, window: WindowId) -> Vec<TabId> {
        let mut tabs: Vec<TabId> = self
            .tabs
            .iter()
            .filter(|(_, t)| t.window == Some(window))
            .map(|(id, _)| *id)
            .collect();
        tabs.sort();
        tabs
    }

    // ---- windows ----

    pub fn window(&self, id: WindowId) -> Option<&WindowRecord> {
        self.windows.get(&id)
    }

    pub fn window_mut(&mut self, id: WindowId) -> Option<&mut WindowRecord> {
        self.windows.get_mut(&id)
    }

    pub fn observe_window(&mut self, id: WindowId) -> &mut WindowRecord {
        self.windows.entry(id).or_default()
    }

    /// Drop the window and every tab it owns
    pub fn clear_window(&mut self, id: WindowId) -> Option<WindowRecord> {
        self.tabs.retain(|_, t| t.window != Some(id));
        self.windows.remove(&id)
    }

    pub fn windows(&self) -> impl Iterator<Item = (&WindowId, &WindowRecord)> {
        self.windows.iter()
    }

    // ---- derived queries ----

    /// True when nothing outside `entity` carries the private flag.
    ///
    /// For a tab, every other tab counts. For a window, only tabs owned by other
    /// windows count. Windows that are private at window level always count as
    /// a remaining private context, unless that window is `entity` itself.
    pub fn is_last_private(&self, entity: Entity) -> bool {
        let tab_outside = |id: &TabId, t: &TabRecord| match entity {
            Entity::Tab(tab) => *id != tab,
            Entity::Window(window) => t.window != Some(window),
        };
        let other_private_tab = self
            .tabs
            .iter()
            .any(|(id, t)| t.is_private && tab_outside(id, t));
        if other_private_tab {
            return false;
        }
        let this_window = match entity {
            Entity::Window(window) => Some(window),
            Entity::Tab(_) => None,
        };
        !self
            .windows
            .iter()
            .any(|(id, w)| w.is_private && Some(*id) != this_window)
    }

    pub fn has_any_private(&self, window: WindowId) -> bool {
        self.tabs
            .values()
            .any(|t| t.is_private && t.window == Some(window))
    }

    /// Private tabs in `window`
    pub fn private_tabs_in(&self, window: WindowId) -> Vec<TabId> {
        let mut tabs: Vec<TabId> = self
            .tabs
            .iter()
            .filter(|(_, t)| t.is_private && t.window == Some(window))
            .map(|(id, _)| *id)
            .collect();
        tabs.sort();
        tabs
    }

    /// Any private tab or private window left at all
    pub fn has_private_context(&self) -> bool {
        self.tabs.values().any(|t| t.is_private) || self.windows.values().any(|w| w.is_private)
    }

    pub fn private_tab_count(&self) -> usize {
        self.tabs.values().filter(|t| t.is_private).count()
    }
}
