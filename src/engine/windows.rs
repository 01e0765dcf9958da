//! Window lifecycle events and window-wide operations.

use super::{PrivacyEngine, ShimKind};
use crate::config::CreationPolicy;
use crate::entity::{Entity, TabId, WindowId};

/// Time a closing window keeps last-private checks of its tabs suspended
const WINDOW_CLOSE_SETTLE_MS: u64 = 50;

/// What the host knows about a new window
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct WindowOpenInfo {
    /// Window this one was opened from
    pub opener: Option<WindowId>,
    /// Opened without content (new blank window)
    pub is_empty: bool,
    /// The window is a dedicated private context
    pub is_private: bool,
    /// Popup or utility window; the engine leaves it alone
    pub is_popup: bool,
    /// Opened by an external application
    pub from_external: bool,
}

impl PrivacyEngine {
    pub fn window_created(&mut self, window: WindowId, info: WindowOpenInfo) {
        if !self.ensure_live() {
            return;
        }
        let record = self.registry.observe_window(window);
        record.is_private = info.is_private;
        record.is_target_window = !info.is_popup;
        if info.is_popup {
            log::debug!("Ignore popup {}", window);
            return;
        }
        log::debug!("Window created: {} {:?}", window, info);

        if self.config.drag_tabs_between_windows {
            self.install_shim(window, ShimKind::TabDragBetweenWindows);
        }
        self.install_shim(window, ShimKind::ThumbnailCapture);
        self.install_shim(window, ShimKind::CloseWindowWarning);

        self.inherit_window_state(window, info);
    }

    fn inherit_window_state(&mut self, window: WindowId, info: WindowOpenInfo) {
        let policy = self.config.empty_window_policy;
        if (info.opener.is_none() || info.is_empty) && policy == CreationPolicy::AlwaysPrivate {
            log::info!("Make new empty {} private", window);
            self.make_window_private(window);
            return;
        }

        let Some(opener) = info.opener else {
            return;
        };
        if !self
            .registry
            .window(opener)
            .is_some_and(|w| w.is_target_window)
        {
            return;
        }
        if info.from_external && !self.config.allow_open_external_links_in_private_tabs {
            log::debug!("{} was opened from an external application, ignore", window);
            return;
        }
        if info.is_empty && policy != CreationPolicy::Inherit {
            return;
        }
        if info.is_private {
            return;
        }
        if !self.content_is_private(opener, None) {
            return;
        }
        log::info!("{} inherits private state from {}", window, opener);
        self.make_window_private(window);
    }

    /// Make every tab of the window private. With no tabs known yet, the first
    /// tab opened there becomes private.
    fn make_window_private(&mut self, window: WindowId) {
        let tabs = self.registry.tabs_in(window);
        if tabs.is_empty() {
            if let Some(record) = self.registry.window_mut(window) {
                record.open_next_as = Some(true);
            }
            return;
        }
        for tab in tabs {
            self.set_tab_private(tab, true, false);
        }
    }

    /// Session restore started or finished in the window
    pub fn window_busy(&mut self, window: WindowId, busy: bool) {
        if let Some(record) = self.registry.window_mut(window) {
            log::debug!("{} busy: {}", window, busy);
            record.is_busy = busy;
        }
    }

    /// Returns `false` when the window must stay open.
    ///
    /// A window holding the last private tabs raises the last-private check
    /// (when guarded). Unless private sessions are persisted, the private tabs
    /// of a closing non-private window are closed first so they never reach
    /// the session store.
    pub fn window_closing(&mut self, window: WindowId) -> bool {
        if !self.ensure_live() {
            return true;
        }
        let Some(record) = self.registry.window(window) else {
            return true;
        };
        let window_is_private = record.is_private;

        if self.config.guard_last_private_close
            && self.registry.has_any_private(window)
            && self.registry.is_last_private(Entity::Window(window))
        {
            if self.guard_vetoes(Entity::Window(window)) {
                log::info!("Closing {} cancelled: it holds the last private tabs", window);
                return false;
            }
            self.suspend_last_private_check(window, WINDOW_CLOSE_SETTLE_MS);
        }

        if !window_is_private && !self.config.persist_private_sessions {
            self.close_private_tabs(window);
        }
        if self.config.cleans_up_closed_private_tabs() {
            self.forget_closed_private_tabs(window);
        }
        true
    }

    fn forget_closed_private_tabs(&self, window: WindowId) {
        let count = self.host.forget_closed_private_tabs(window);
        if count > 0 {
            log::debug!("Forgot {} closed private tab(s) in {}", count, window);
        }
    }

    /// Once no private tab or window is left, drop remembered closed private
    /// tabs from every window's undo history
    pub(super) fn cleanup_if_private_exited(&mut self) {
        if !self.config.cleans_up_closed_private_tabs() || self.registry.has_private_context() {
            return;
        }
        let mut windows: Vec<WindowId> = self
            .registry
            .windows()
            .filter(|(_, w)| w.is_target_window)
            .map(|(id, _)| *id)
            .collect();
        windows.sort();
        log::info!("Last private context exited, forget closed private tabs");
        for window in windows {
            self.forget_closed_private_tabs(window);
        }
    }

    /// The window is gone; drop everything attached to it
    pub fn window_closed(&mut self, window: WindowId) {
        if self.shut_down {
            return;
        }
        self.shims.remove_window(&self.interceptor, window, false);
        if let Some(task) = self.select_rechecks.remove(&window) {
            self.scheduler.cancel(task);
        }
        if self
            .pending_drop
            .as_ref()
            .is_some_and(|drop| drop.window == window)
            && let Some(pending) = self.pending_drop.take()
        {
            self.scheduler.cancel(pending.timeout);
        }
        self.registry.clear_window(window);
        log::debug!("Window closed: {}", window);
    }

    fn suspend_last_private_check(&mut self, window: WindowId, for_ms: u64) {
        if let Some(record) = self.registry.window_mut(window) {
            record.suspend_last_private_check = true;
        }
        self.scheduler.schedule(for_ms, move |engine| {
            if let Some(record) = engine.registry.window_mut(window) {
                record.suspend_last_private_check = false;
            }
        });
    }

    /// Close every private tab of the window.
    ///
    /// Never triggers the last-private reopen rule. A window left without tabs
    /// gets a blank non-private tab first. Returns whether the window held only
    /// private tabs.
    pub fn close_private_tabs(&mut self, window: WindowId) -> bool {
        if !self.ensure_live() {
            return false;
        }
        let all = self.registry.tabs_in(window);
        let private = self.registry.private_tabs_in(window);
        let only_private = private.len() == all.len();
        if private.is_empty() {
            return only_private;
        }

        if only_private {
            match self.host.open_tab(window, None, None) {
                Some(blank) => {
                    self.registry.observe_tab(blank, window).ignore_next_open_event = true;
                    self.host.set_persisted_marker(blank, false);
                    self.host.select_tab(blank);
                }
                None => log::warn!("Host refused to open a blank tab in {}", window),
            }
        }

        let previous = self
            .registry
            .window_mut(window)
            .map(|w| std::mem::replace(&mut w.suspend_last_private_check, true))
            .unwrap_or(false);
        for tab in private.iter().rev() {
            log::debug!("close_private_tabs(): remove {}", tab);
            self.host.close_tab(*tab);
            self.forget_tab(*tab);
        }
        if let Some(record) = self.registry.window_mut(window) {
            record.suspend_last_private_check = previous;
        }
        log::info!("Closed {} private tab(s) in {}", private.len(), window);
        only_private
    }

    /// Close the private tabs of every non-private window.
    ///
    /// Returns the windows that held nothing but private tabs; the caller
    /// usually closes those.
    pub fn close_all_private_tabs(&mut self) -> Vec<WindowId> {
        let mut windows: Vec<WindowId> = self
            .registry
            .windows()
            .filter(|(_, w)| w.is_target_window && !w.is_private)
            .map(|(id, _)| *id)
            .collect();
        windows.sort();

        windows
            .into_iter()
            .filter(|window| {
                self.registry.has_any_private(*window) && self.close_private_tabs(*window)
            })
            .collect()
    }

    /// The next tab opened in `window` (this turn) gets `is_private`
    pub fn ready_to_open_tab(&mut self, window: WindowId, is_private: bool) {
        let Some(record) = self.registry.window_mut(window) else {
            return;
        };
        record.open_next_as = Some(is_private);
        self.scheduler.schedule(0, move |engine| {
            if let Some(record) = engine.registry.window_mut(window)
                && record.open_next_as.take().is_some()
            {
                log::debug!("ready_to_open_tab(): no tab opened in {}", window);
            }
        });
    }

    /// Every tab opened in `window` gets `is_private` until
    /// [`Self::stop_to_open_tabs`]
    pub fn ready_to_open_tabs(&mut self, window: WindowId, is_private: bool) {
        if let Some(record) = self.registry.window_mut(window) {
            record.open_all_as = Some(is_private);
        }
    }

    pub fn stop_to_open_tabs(&mut self, window: WindowId) {
        if let Some(record) = self.registry.window_mut(window) {
            record.open_all_as = None;
        }
    }

    /// Open `uri` in a new non-private tab instead of a private one
    pub(super) fn divert_external_load(&mut self, window: WindowId, uri: &str) {
        if !self.registry.window(window).is_some_and(|w| w.is_target_window) {
            return;
        }
        let Some(tab) = self.host.open_tab(window, None, Some(uri)) else {
            log::warn!("Can't divert external load into {}", window);
            return;
        };
        self.registry.observe_tab(tab, window).ignore_next_open_event = true;
        self.set_tab_private(tab, false, false);
    }

    /// Tabs of the window as known to the engine
    pub fn tabs_in(&self, window: WindowId) -> Vec<TabId> {
        self.registry.tabs_in(window)
    }
}
