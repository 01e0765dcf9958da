//! Drag and drop between tabs and windows.
//!
//! A drop either opens a new tab or loads into the existing target tab, and
//! the host doesn't say which up front. The target tab is switched to the
//! resolved flag right away; then whichever comes first decides: a new tab
//! in the drop window (it takes the flag and the target tab is switched
//! back) or the zero-delay timeout (the target tab keeps the flag).

use super::{PendingDrop, PrivacyEngine};
use crate::config::DndResolution;
use crate::dnd::{self, DndContext};
use crate::entity::{NodeId, TabId, WindowId};

impl PrivacyEngine {
    /// `source_tab` is the tab the dragged node belongs to, if any
    pub fn drag_start(&mut self, node: NodeId, source_tab: Option<TabId>, is_tab_drag: bool) {
        if !self.ensure_live() {
            return;
        }
        let context = DndContext {
            source_node: node,
            source_is_private: source_tab.and_then(|tab| self.registry.get(tab)),
            source_window: source_tab.and_then(|tab| self.registry.window_of(tab)),
            is_tab_drag,
        };
        log::debug!("Drag start: {:?}", context);
        self.dnd = Some(context);
    }

    pub fn drag_end(&mut self) {
        if self.dnd.take().is_some() {
            log::debug!("Drag end");
        }
    }

    /// Something was dropped on `window`, over `target_tab` when the drop hit
    /// a tab (or the content area, whose tab is the selected one).
    ///
    /// Returns the resolved flag, or `None` when the drop is left to the host.
    pub fn drop(&mut self, node: NodeId, window: WindowId, target_tab: Option<TabId>) -> Option<bool> {
        if !self.ensure_live() {
            return None;
        }
        let context = self.dnd.take().filter(|c| c.source_node == node);
        let Some(window_is_private) = self
            .registry
            .window(window)
            .filter(|w| w.is_target_window)
            .map(|w| w.is_private)
        else {
            log::debug!("Drop on untracked {}, ignore", window);
            return None;
        };

        let (source_is_private, source_window, is_tab_drag) = context
            .map(|c| (c.source_is_private, c.source_window, c.is_tab_drag))
            .unwrap_or((None, None, false));
        if !dnd::should_resolve(
            self.config.same_window_tab_drop,
            is_tab_drag,
            source_window,
            window,
        ) {
            log::debug!("Tab dropped within its own {}, ignore", window);
            return None;
        }

        let target_tab = target_tab.filter(|tab| self.registry.get(*tab).is_some());
        let target_is_private = match target_tab {
            Some(tab) => self.registry.get(tab).unwrap_or(false),
            None => window_is_private,
        };
        let mode = self.config.dnd_resolution;
        let resolved = dnd::resolve(mode, source_is_private, target_is_private);
        log::debug!(
            "Drop: source {:?}, target {}, mode {} => {}",
            source_is_private,
            target_is_private,
            mode.display_name(),
            resolved
        );

        if let Some(previous) = self.pending_drop.take() {
            self.scheduler.cancel(previous.timeout);
        }

        let mut original = None;
        if let Some(tab) = target_tab
            && mode != DndResolution::TargetWins
            && target_is_private != resolved
        {
            // the dropped link may load right here
            original = Some(target_is_private);
            self.set_tab_private(tab, resolved, true);
        }

        let timeout = self.scheduler.schedule(0, |engine| engine.finish_drop(None));
        self.pending_drop = Some(PendingDrop {
            window,
            target_tab,
            resolved,
            original,
            timeout,
        });
        Some(resolved)
    }

    /// Settle a pending drop. `new_tab` is the tab the drop opened, if any.
    pub(super) fn finish_drop(&mut self, new_tab: Option<TabId>) {
        let Some(pending) = self.pending_drop.take() else {
            return;
        };
        if new_tab.is_some() {
            self.scheduler.cancel(pending.timeout);
        }
        let Some(tab) = new_tab.or(pending.target_tab) else {
            return;
        };

        if let (Some(original), Some(target)) = (pending.original, pending.target_tab) {
            if tab == target {
                log::debug!("Drop loaded into {}, keep it", target);
                self.highlight(target);
            } else {
                log::debug!("Drop opened {}, restore {}", tab, target);
                self.set_tab_private(target, original, true);
            }
        }

        if let Some(record) = self.registry.tab_mut(tab) {
            record.ignore_next_open_event = true;
            self.expire_ignore_flag(tab);
        }
        self.set_tab_private(tab, pending.resolved, false);
    }
}
