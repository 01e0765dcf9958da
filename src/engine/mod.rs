//! Privacy state propagation engine
//!
//! Host lifecycle events arrive here as method calls. The engine decides the
//! privacy flag of each tab, keeps the host's persisted marker in step with
//! it, installs host function shims where the host offers no hook, and
//! filters session snapshots before they are written.
//!
//! The engine is an explicitly constructed service: create it with
//! [`PrivacyEngine::new`] when the host starts and tear it down with
//! [`PrivacyEngine::destroy`]. Everything runs on the host's event loop; work
//! deferred to "the next turn" sits in the [`Scheduler`] until the host calls
//! [`PrivacyEngine::run_pending`] or [`PrivacyEngine::advance`].

pub mod events;
pub mod host;
pub mod integrations;
pub mod scheduler;
pub mod shims;

mod drop;
mod tabs;
mod windows;

pub use events::PrivacyEvent;
pub use host::{Host, ShimTarget};
pub use integrations::{DiagnosticSink, Integration, LogSink};
pub use scheduler::{Scheduler, TaskId};
pub use shims::ShimKind;
pub use tabs::{ClosePhase, TabOpenInfo};
pub use windows::WindowOpenInfo;

use crate::config::Config;
use crate::dnd::DndContext;
use crate::entity::{Entity, TabId, WindowId};
use crate::error::PrivacyError;
use crate::interception::Interceptor;
use crate::registry::PrivacyRegistry;
use crate::session::PRIVATE_ATTR;
use crate::session::filter::{self, FilterOptions};
use crate::session::{SessionSnapshot, capture};
use events::EventOutbox;
use integrations::Integrations;
use shims::{ShimContext, ShimSet};
use std::collections::HashMap;
use std::rc::Rc;

/// A drop whose outcome is decided by whether a new tab appears
struct PendingDrop {
    window: WindowId,
    target_tab: Option<TabId>,
    resolved: bool,
    /// Set when the target tab was temporarily switched to `resolved`
    original: Option<bool>,
    timeout: TaskId,
}

pub struct PrivacyEngine {
    config: Config,
    host: Rc<dyn Host>,
    registry: PrivacyRegistry,
    interceptor: Interceptor,
    scheduler: Scheduler,
    shims: ShimSet,
    events: EventOutbox,
    integrations: Integrations,
    dnd: Option<DndContext>,
    pending_drop: Option<PendingDrop>,
    select_rechecks: HashMap<WindowId, TaskId>,
    seen_private_tab: bool,
    shut_down: bool,
}

impl std::fmt::Debug for PrivacyEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PrivacyEngine")
            .field("registry", &self.registry)
            .field("interceptor", &self.interceptor)
            .field("scheduler", &self.scheduler)
            .field("shut_down", &self.shut_down)
            .finish_non_exhaustive()
    }
}

impl PrivacyEngine {
    pub fn new(config: Config, host: Rc<dyn Host>) -> Self {
        log::info!(
            "Privacy engine started (empty tabs: {}, dnd: {}, persist private: {})",
            config.empty_tab_policy.display_name(),
            config.dnd_resolution.display_name(),
            config.persist_private_sessions
        );
        Self {
            config,
            host,
            registry: PrivacyRegistry::new(),
            interceptor: Interceptor::new(),
            scheduler: Scheduler::new(),
            shims: ShimSet::default(),
            events: EventOutbox::default(),
            integrations: Integrations::default(),
            dnd: None,
            pending_drop: None,
            select_rechecks: HashMap::new(),
            seen_private_tab: false,
            shut_down: false,
        }
    }

    /// Restore every shimmed host function, drop pending work and state.
    ///
    /// Calling it twice is harmless. Every later event is ignored.
    pub fn destroy(&mut self) {
        if self.shut_down {
            return;
        }
        self.shims.remove_all(&self.interceptor);
        self.scheduler.cancel_all();
        self.select_rechecks.clear();
        self.pending_drop = None;
        self.dnd = None;
        self.integrations.clear();
        self.registry = PrivacyRegistry::new();
        self.shut_down = true;
        log::info!("Privacy engine destroyed");
    }

    pub fn is_shut_down(&self) -> bool {
        self.shut_down
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn registry(&self) -> &PrivacyRegistry {
        &self.registry
    }

    pub fn interceptor(&self) -> &Interceptor {
        &self.interceptor
    }

    pub fn scheduler(&self) -> &Scheduler {
        &self.scheduler
    }

    /// Privacy of a live tab
    pub fn is_private(&self, tab: TabId) -> Option<bool> {
        self.registry.get(tab)
    }

    pub fn is_shim_installed(&self, window: WindowId, kind: ShimKind) -> bool {
        self.shims.is_installed(window, kind)
    }

    /// Take all events emitted since the last call
    pub fn drain_events(&mut self) -> Vec<PrivacyEvent> {
        self.events.drain()
    }

    pub fn add_integration(&mut self, integration: Box<dyn Integration>) {
        self.integrations.add(integration);
    }

    pub fn set_diagnostic_sink(&mut self, sink: Box<dyn DiagnosticSink>) {
        self.integrations.set_sink(sink);
    }

    /// Pick up a reloaded configuration
    pub fn apply_config(&mut self, config: Config) {
        if self.shut_down {
            return;
        }
        let old = std::mem::replace(&mut self.config, config);
        let windows: Vec<(WindowId, bool, bool)> = self
            .registry
            .windows()
            .filter(|(_, w)| w.is_target_window)
            .map(|(id, w)| (*id, w.had_private_tab, w.is_private))
            .collect();

        if old.drag_tabs_between_windows != self.config.drag_tabs_between_windows {
            for (window, _, _) in &windows {
                if self.config.drag_tabs_between_windows {
                    self.install_shim(*window, ShimKind::TabDragBetweenWindows);
                } else {
                    self.shims.remove(
                        &self.interceptor,
                        *window,
                        ShimKind::TabDragBetweenWindows,
                        false,
                    );
                }
            }
        }

        let allow = self.config.allow_open_external_links_in_private_tabs;
        if old.allow_open_external_links_in_private_tabs != allow {
            for (window, had_private_tab, is_private) in &windows {
                if allow {
                    self.shims.remove(
                        &self.interceptor,
                        *window,
                        ShimKind::ExternalLinkDiversion,
                        false,
                    );
                } else if *had_private_tab && !*is_private {
                    self.install_shim(*window, ShimKind::ExternalLinkDiversion);
                }
            }
        }
        log::info!("Privacy engine configuration updated");
    }

    /// Run every task that is due now, including ones scheduled while running
    pub fn run_pending(&mut self) {
        while !self.shut_down {
            let Some(task) = self.scheduler.pop_due() else {
                break;
            };
            task(self);
        }
    }

    /// Move the virtual clock forward, running tasks as they come due
    pub fn advance(&mut self, ms: u64) {
        let target = self.scheduler.now().saturating_add(ms);
        while let Some(due) = self.scheduler.next_due() {
            if due > target || self.shut_down {
                break;
            }
            self.scheduler.set_now(due);
            self.run_pending();
        }
        self.scheduler.set_now(target);
        self.run_pending();
    }

    /// Filter a serialized snapshot the host is about to write.
    ///
    /// Returns the replacement text, or `None` to write the original as is.
    pub fn session_about_to_write(&self, state: &str) -> Option<String> {
        match filter::filter_json(state, FilterOptions::from(&self.config)) {
            Ok(filtered) => filtered,
            Err(e) => {
                log::warn!("Session filter failed, leaving snapshot untouched: {:#}", e);
                None
            }
        }
    }

    /// Typed variant of [`Self::session_about_to_write`]
    pub fn filter_session(&self, snapshot: &SessionSnapshot) -> Option<SessionSnapshot> {
        filter::filter_snapshot(snapshot, FilterOptions::from(&self.config))
    }

    /// Explicit toggle. `None` flips the current flag.
    ///
    /// Turning off the last private tab raises the last-private check first and
    /// gives up if it is cancelled. Returns the new flag, or `None` when
    /// nothing changed hands.
    pub fn toggle_tab(&mut self, tab: TabId, is_private: Option<bool>) -> Option<bool> {
        if !self.ensure_live() {
            return None;
        }
        let Some(current) = self.registry.get(tab) else {
            log::debug!("{}", PrivacyError::DestroyedEntity(Entity::Tab(tab)));
            return None;
        };
        let wanted = is_private.unwrap_or(!current);
        if current
            && !wanted
            && self.registry.is_last_private(Entity::Tab(tab))
            && self.guard_vetoes(Entity::Tab(tab))
        {
            log::info!("Toggle of last private {} cancelled", tab);
            return None;
        }
        self.set_tab_private(tab, wanted, false);
        self.patch_pending_tab(tab, wanted);
        Some(wanted)
    }

    // ---- internals shared by the event handlers ----

    fn ensure_live(&self) -> bool {
        if self.shut_down {
            log::debug!("{}", PrivacyError::ShutDown);
        }
        !self.shut_down
    }

    fn emit(&mut self, event: PrivacyEvent) {
        self.integrations.dispatch(&event);
        self.events.push(event);
    }

    /// Set the flag on a live tab and mirror it to the host.
    ///
    /// Returns whether the flag changed. `silent` suppresses `PrivacyChanged`.
    fn set_tab_private(&mut self, tab: TabId, is_private: bool, silent: bool) -> bool {
        let Some(previous) = self.registry.set(tab, is_private) else {
            log::debug!("{}", PrivacyError::DestroyedEntity(Entity::Tab(tab)));
            return false;
        };
        self.host.apply_tab_privacy(tab, is_private);
        self.host.set_persisted_marker(tab, is_private);
        let changed = previous != is_private;
        if changed {
            log::debug!(
                "Set {} {}",
                tab,
                if is_private { "private" } else { "not private" }
            );
            if !silent {
                self.emit(PrivacyEvent::PrivacyChanged { tab, is_private });
            }
        }
        if is_private {
            self.note_private_tab(tab);
        } else if changed {
            self.cleanup_if_private_exited();
        }
        changed
    }

    /// Adopt the host's live flag and re-mirror the persisted marker
    fn resync_tab(&mut self, tab: TabId) {
        let Some(current) = self.registry.get(tab) else {
            log::debug!("{}", PrivacyError::DestroyedEntity(Entity::Tab(tab)));
            return;
        };
        let Some(live) = self.host.live_privacy(tab) else {
            log::debug!("{} is gone on the host side", tab);
            return;
        };
        if live != current {
            self.registry.set(tab, live);
            self.emit(PrivacyEvent::PrivacyChanged {
                tab,
                is_private: live,
            });
            if live {
                self.note_private_tab(tab);
            } else {
                self.cleanup_if_private_exited();
            }
        }
        self.host.set_persisted_marker(tab, live);
    }

    fn note_private_tab(&mut self, tab: TabId) {
        if !self.seen_private_tab {
            self.seen_private_tab = true;
            self.host.register_persisted_attribute(PRIVATE_ATTR);
            self.emit(PrivacyEvent::FirstPrivateTabEver { tab });
        }

        let Some(window) = self.registry.window_of(tab) else {
            return;
        };
        let Some(record) = self.registry.window_mut(window) else {
            return;
        };
        if record.had_private_tab {
            return;
        }
        record.had_private_tab = true;
        let window_is_private = record.is_private;
        log::info!("First private tab in {}", window);
        self.emit(PrivacyEvent::FirstPrivateTab { window, tab });
        if !self.config.allow_open_external_links_in_private_tabs && !window_is_private {
            self.install_shim(window, ShimKind::ExternalLinkDiversion);
        }
    }

    /// Run the cancellable last-private check. Errors count as a veto.
    fn guard_vetoes(&self, entity: Entity) -> bool {
        match self.host.last_private_check(entity) {
            Ok(cancelled) => cancelled,
            Err(e) => {
                log::warn!("Last private check for {} failed, keeping it: {:#}", entity, e);
                true
            }
        }
    }

    /// Rewrite the stored session state of a pending tab so the marker sticks
    fn patch_pending_tab(&mut self, tab: TabId, is_private: bool) {
        if !self.config.workaround_for_pending_tabs {
            return;
        }
        if !self.registry.tab(tab).is_some_and(|t| t.is_pending) {
            return;
        }
        let Some(state) = self.host.tab_session_state(tab) else {
            return;
        };
        log::debug!("Update session state of pending {}", tab);
        let patched = match capture::mark_tab_state(&state, is_private) {
            Ok(patched) => patched,
            Err(e) => {
                log::warn!("Can't patch session state of {}: {:#}", tab, e);
                return;
            }
        };
        if let Some(record) = self.registry.tab_mut(tab) {
            record.ignore_next_open_event = true;
        }
        if let Err(e) = self.host.set_tab_session_state(tab, &patched) {
            log::warn!("Can't store session state of {}: {:#}", tab, e);
            if let Some(record) = self.registry.tab_mut(tab) {
                record.ignore_next_open_event = false;
            }
        }
    }

    fn install_shim(&mut self, window: WindowId, kind: ShimKind) -> bool {
        let ctx = ShimContext {
            host: &self.host,
            interceptor: &self.interceptor,
            scheduler: &self.scheduler,
        };
        self.shims.install(&ctx, window, kind)
    }

    /// Private flag of the window's content area, ignoring `exclude`
    fn content_is_private(&self, window: WindowId, exclude: Option<TabId>) -> bool {
        self.host
            .selected_tab(window)
            .filter(|tab| Some(*tab) != exclude)
            .and_then(|tab| self.registry.get(tab))
            .unwrap_or(false)
    }

    /// Drop the ignore flag of `tab` on the next turn
    fn expire_ignore_flag(&mut self, tab: TabId) {
        self.scheduler.schedule(0, move |engine| {
            if let Some(record) = engine.registry.tab_mut(tab) {
                record.ignore_next_open_event = false;
            }
        });
    }
}
