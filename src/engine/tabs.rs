//! Tab lifecycle events.

use super::{PrivacyEngine, PrivacyEvent};
use crate::config::CreationPolicy;
use crate::entity::{Entity, TabId, WindowId};
use crate::error::PrivacyError;

/// What the host knows about a freshly opened tab
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TabOpenInfo {
    /// Blank or new-tab page
    pub is_empty: bool,
    /// Not loaded yet (lazy session restore)
    pub is_pending: bool,
}

/// Phase of the host's tab close notification
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClosePhase {
    /// Before the tab is gone; a replacement tab may still be opened
    Capture,
    /// After the tab is gone; cleanup only
    Bubble,
}

impl PrivacyEngine {
    pub fn tab_created(&mut self, tab: TabId, window: WindowId, info: TabOpenInfo) {
        if !self.ensure_live() {
            return;
        }
        if !self
            .registry
            .window(window)
            .is_some_and(|w| w.is_target_window)
        {
            log::debug!("Ignore {} opened in untracked {}", tab, window);
            return;
        }

        let record = self.registry.observe_tab(tab, window);
        record.is_pending = info.is_pending;
        if record.ignore_next_open_event {
            // a following tab_restoring in this turn is ours as well
            self.expire_ignore_flag(tab);
            return;
        }

        if self
            .pending_drop
            .as_ref()
            .is_some_and(|drop| drop.window == window)
        {
            self.finish_drop(Some(tab));
            return;
        }

        let ready = self.registry.window_mut(window).and_then(|w| {
            w.open_next_as
                .take()
                .map(|flag| (flag, true))
                .or(w.open_all_as.map(|flag| (flag, false)))
        });
        if let Some((is_private, once)) = ready {
            log::debug!(
                "Ready to open: make {} {}",
                tab,
                if is_private { "private" } else { "not private" }
            );
            self.set_tab_private(tab, is_private, false);
            if once && let Some(record) = self.registry.tab_mut(tab) {
                record.ignore_next_open_event = true;
                self.expire_ignore_flag(tab);
            }
            return;
        }

        match self.open_rule(tab, window, info.is_empty) {
            Some(is_private) => {
                log::debug!("Tab opened: {} inherits private = {}", tab, is_private);
                self.set_tab_private(tab, is_private, false);
            }
            None => {
                self.scheduler.schedule(0, move |engine| engine.resync_tab(tab));
            }
        }
    }

    /// Flag for a newly opened tab, `None` to leave it to the next-turn re-sync
    fn open_rule(&self, tab: TabId, window: WindowId, is_empty: bool) -> Option<bool> {
        let record = self.registry.window(window)?;
        let policy = self.config.empty_tab_policy;

        if !is_empty || policy == CreationPolicy::Inherit {
            if self.content_is_private(window, Some(tab)) {
                return Some(true);
            }
            if record.is_private {
                return Some(false);
            }
            return None;
        }

        if policy == CreationPolicy::AlwaysPrivate && !record.is_busy {
            return Some(true);
        }
        if record.is_busy {
            log::debug!("{} is restoring its session, leave {} alone", window, tab);
        }
        None
    }

    pub fn tab_restoring(&mut self, tab: TabId) {
        if !self.ensure_live() {
            return;
        }
        let Some(record) = self.registry.tab_mut(tab) else {
            log::debug!("{}", PrivacyError::DestroyedEntity(Entity::Tab(tab)));
            return;
        };
        if record.ignore_next_open_event {
            record.ignore_next_open_event = false;
            let is_private = record.is_private;
            self.host.set_persisted_marker(tab, is_private);
            return;
        }

        let is_private = self.host.has_persisted_marker(tab);
        if record.is_private != is_private {
            log::info!(
                "Make restored {} {}",
                tab,
                if is_private { "private" } else { "not private" }
            );
            self.set_tab_private(tab, is_private, false);
        }
    }

    /// The host finished loading a pending tab
    pub fn tab_loaded(&mut self, tab: TabId) {
        if let Some(record) = self.registry.tab_mut(tab) {
            record.is_pending = false;
        }
    }

    /// Re-check the selected tab once other listeners had their say
    pub fn tab_selected(&mut self, tab: TabId) {
        if !self.ensure_live() {
            return;
        }
        let Some(window) = self.registry.window_of(tab) else {
            log::debug!("{}", PrivacyError::DestroyedEntity(Entity::Tab(tab)));
            return;
        };
        if let Some(previous) = self.select_rechecks.remove(&window) {
            self.scheduler.cancel(previous);
        }
        let task = self
            .scheduler
            .schedule(self.config.select_recheck_delay_ms, move |engine| {
                engine.select_rechecks.remove(&window);
                engine.resync_tab(tab);
            });
        self.select_rechecks.insert(window, task);
    }

    /// Returns `false` when the close must not proceed.
    ///
    /// In the capture phase closing the last private tab raises the
    /// last-private check. A cancelled check either vetoes the close or, with
    /// `reopen_on_last_private_tab_closed`, lets it proceed and opens a private
    /// replacement at the same position. The bubble phase only cleans up.
    pub fn tab_closing(&mut self, tab: TabId, phase: ClosePhase) -> bool {
        if !self.ensure_live() {
            return true;
        }
        match phase {
            ClosePhase::Capture => self.check_last_private_close(tab),
            ClosePhase::Bubble => {
                self.forget_tab(tab);
                true
            }
        }
    }

    fn check_last_private_close(&mut self, tab: TabId) -> bool {
        let Some(record) = self.registry.tab(tab) else {
            return true;
        };
        let Some(window) = record.window else {
            return true;
        };
        if !record.is_private {
            return true;
        }
        if self
            .registry
            .window(window)
            .is_some_and(|w| w.suspend_last_private_check)
        {
            return true;
        }
        if !self.registry.is_last_private(Entity::Tab(tab)) {
            return true;
        }
        log::info!("Closing last private {}", tab);

        let guard = self.config.guard_last_private_close;
        let vetoed = guard && self.guard_vetoes(Entity::Tab(tab));

        if self.config.reopen_on_last_private_tab_closed {
            if !guard || vetoed {
                self.reopen_private_placeholder(tab, window);
            }
            return true;
        }
        !vetoed
    }

    fn reopen_private_placeholder(&mut self, closing: TabId, window: WindowId) {
        let position = self.host.tab_position(closing);
        let Some(new_tab) = self.host.open_tab(window, position, None) else {
            log::warn!("Host refused to open a private placeholder in {}", window);
            return;
        };
        log::info!("Reopened private placeholder {} at {:?}", new_tab, position);
        self.registry.observe_tab(new_tab, window).ignore_next_open_event = true;
        self.set_tab_private(new_tab, true, false);
    }

    /// Bubble-phase cleanup for a tab that is gone
    pub(super) fn forget_tab(&mut self, tab: TabId) {
        let Some(record) = self.registry.clear(tab) else {
            log::debug!("{}", PrivacyError::DestroyedEntity(Entity::Tab(tab)));
            return;
        };
        if let Some(pending) = self.pending_drop.as_mut()
            && pending.target_tab == Some(tab)
        {
            pending.target_tab = None;
            pending.original = None;
        }
        if !record.is_private {
            return;
        }
        if !self.config.remember_closed_private_tabs
            && let Some(window) = record.window
        {
            if self.host.forget_closed_tab(window, tab) {
                log::debug!("Forgot closed private {}", tab);
            } else {
                log::warn!("Can't forget about closed private {}: not in undo history", tab);
            }
        }
        self.cleanup_if_private_exited();
    }

    /// Re-announce a tab's flag without changing it (used after drops)
    pub(super) fn highlight(&mut self, tab: TabId) {
        if let Some(is_private) = self.registry.get(tab) {
            self.emit(PrivacyEvent::PrivacyChanged { tab, is_private });
        }
    }
}
