//! Shared integration test helpers for private-tab.
//!
//! [`FakeHost`] records everything the engine asks of it and exposes
//! [`HostObject`]s for every shim target, so the shims can be exercised end
//! to end. [`Harness`] wires a fake host to an engine and plays the host's
//! side of tab and window lifecycles.
//!
//! Include with `mod common;` at the top of each test file. The
//! `#[allow(dead_code)]` suppresses warnings when only a subset of helpers
//! is used per file.

#![allow(dead_code)]

use private_tab::config::Config;
use private_tab::engine::shims::{
    IS_WINDOW_PRIVATE, LOAD_URI, SET_EFFECT_ALLOWED, SHOULD_CAPTURE, SWAP_BROWSERS,
    WARN_ABOUT_CLOSING_WINDOW,
};
use private_tab::engine::{ClosePhase, Host, PrivacyEngine, ShimTarget, TabOpenInfo, WindowOpenInfo};
use private_tab::entity::{Entity, TabId, WindowId};
use private_tab::interception::{HostObject, MethodHost};
use serde_json::Value;
use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

/// How the fake host answers the last-private check
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum GuardResponse {
    #[default]
    Allow,
    Cancel,
    Fail,
}

#[derive(Debug, Default)]
pub struct FakeState {
    /// Host-side privacy of each live tab
    pub live: HashMap<TabId, bool>,
    /// Tabs carrying the persisted marker
    pub markers: HashMap<TabId, bool>,
    /// Tab order per window
    pub tabs: HashMap<WindowId, Vec<TabId>>,
    pub selected: HashMap<WindowId, TabId>,
    pub next_tab: u64,
    /// `(window, position, url, new tab)` for every tab the engine opened
    pub opened: Vec<(WindowId, Option<usize>, Option<String>, TabId)>,
    pub closed: Vec<TabId>,
    pub forgotten: Vec<TabId>,
    /// Windows whose undo history was swept of private entries
    pub swept: Vec<WindowId>,
    pub guard: GuardResponse,
    pub checks: Vec<Entity>,
    pub persisted_attributes: Vec<String>,
    pub session_states: HashMap<TabId, String>,
    pub refuse_open: bool,
    /// `(tab, uri)` of every load that reached the original loader
    pub loads: Vec<(u64, String)>,
}

#[derive(Default)]
pub struct FakeHost {
    pub state: RefCell<FakeState>,
    objects: RefCell<HashMap<ShimTarget, Rc<HostObject>>>,
}

impl FakeHost {
    pub fn new() -> Rc<Self> {
        let host = Rc::new(Self::default());
        host.state.borrow_mut().next_tab = 1;
        host
    }

    /// Create a tab on the host side only
    pub fn add_tab(&self, window: WindowId, position: Option<usize>) -> TabId {
        let mut state = self.state.borrow_mut();
        let tab = TabId(state.next_tab);
        state.next_tab += 1;
        state.live.insert(tab, false);
        let tabs = state.tabs.entry(window).or_default();
        match position {
            Some(index) if index <= tabs.len() => tabs.insert(index, tab),
            _ => tabs.push(tab),
        }
        state.selected.entry(window).or_insert(tab);
        tab
    }

    /// Remove a tab on the host side only
    pub fn remove_tab(&self, tab: TabId) {
        let mut state = self.state.borrow_mut();
        state.live.remove(&tab);
        state.markers.remove(&tab);
        for tabs in state.tabs.values_mut() {
            tabs.retain(|t| *t != tab);
        }
        let reselect: Vec<(WindowId, Option<TabId>)> = state
            .selected
            .iter()
            .filter(|(_, selected)| **selected == tab)
            .map(|(window, _)| (*window, state.tabs.get(window).and_then(|t| t.first().copied())))
            .collect();
        for (window, next) in reselect {
            match next {
                Some(next) => state.selected.insert(window, next),
                None => state.selected.remove(&window),
            };
        }
    }

    pub fn set_guard(&self, response: GuardResponse) {
        self.state.borrow_mut().guard = response;
    }

    pub fn set_live(&self, tab: TabId, is_private: bool) {
        self.state.borrow_mut().live.insert(tab, is_private);
    }

    pub fn set_marker(&self, tab: TabId, is_private: bool) {
        self.state.borrow_mut().markers.insert(tab, is_private);
    }

    pub fn marker(&self, tab: TabId) -> bool {
        self.state.borrow().markers.get(&tab).copied().unwrap_or(false)
    }

    pub fn live(&self, tab: TabId) -> Option<bool> {
        self.state.borrow().live.get(&tab).copied()
    }

    pub fn select(&self, window: WindowId, tab: TabId) {
        self.state.borrow_mut().selected.insert(window, tab);
    }

    pub fn tabs_of(&self, window: WindowId) -> Vec<TabId> {
        self.state.borrow().tabs.get(&window).cloned().unwrap_or_default()
    }

    pub fn object(&self, target: ShimTarget) -> Option<Rc<HostObject>> {
        self.objects.borrow().get(&target).cloned()
    }

    /// Create the host objects the shims patch, for one window.
    ///
    /// The drag and close-warning methods answer with whatever the window's
    /// privacy query says at call time.
    pub fn add_window_objects(&self, window: WindowId, window_is_private: bool) {
        let utils = HostObject::new("privacy_utils");
        utils.define(IS_WINDOW_PRIVATE, move |_| Value::Bool(window_is_private));

        let tab_strip = HostObject::new("tab_strip");
        let query = Rc::clone(&utils);
        tab_strip.define(SET_EFFECT_ALLOWED, move |args| {
            query.call(IS_WINDOW_PRIVATE, args).unwrap_or(Value::Null)
        });

        let tab_browser = HostObject::new("tab_browser");
        let query = Rc::clone(&utils);
        tab_browser.define(SWAP_BROWSERS, move |args| {
            query.call(IS_WINDOW_PRIVATE, args).unwrap_or(Value::Null)
        });

        let window_object = HostObject::new("window");
        let query = Rc::clone(&utils);
        window_object.define(WARN_ABOUT_CLOSING_WINDOW, move |args| {
            query.call(IS_WINDOW_PRIVATE, args).unwrap_or(Value::Null)
        });

        let thumbnails = HostObject::new("thumbnails");
        thumbnails.define(SHOULD_CAPTURE, |_| Value::Bool(true));

        let loader = HostObject::new("content_loader");
        // loads are recorded by the harness through `record_loads`
        loader.define(LOAD_URI, |_| Value::Bool(false));

        let mut objects = self.objects.borrow_mut();
        objects.insert(ShimTarget::PrivacyUtils(window), utils);
        objects.insert(ShimTarget::TabStrip(window), tab_strip);
        objects.insert(ShimTarget::TabBrowser(window), tab_browser);
        objects.insert(ShimTarget::Window(window), window_object);
        objects.insert(ShimTarget::Thumbnails(window), thumbnails);
        objects.insert(ShimTarget::ContentLoader(window), loader);
    }

    /// Make the window's loader record loads into [`FakeState::loads`]
    pub fn record_loads(self: &Rc<Self>, window: WindowId) {
        let Some(loader) = self.object(ShimTarget::ContentLoader(window)) else {
            return;
        };
        let host = Rc::downgrade(self);
        loader.define(LOAD_URI, move |args| {
            if let Some(host) = host.upgrade() {
                let tab = args.first().and_then(Value::as_u64).unwrap_or(0);
                let uri = args.get(1).and_then(Value::as_str).unwrap_or("").to_string();
                host.state.borrow_mut().loads.push((tab, uri));
            }
            Value::Bool(false)
        });
    }
}

impl Host for FakeHost {
    fn apply_tab_privacy(&self, tab: TabId, is_private: bool) {
        if let Some(live) = self.state.borrow_mut().live.get_mut(&tab) {
            *live = is_private;
        }
    }

    fn live_privacy(&self, tab: TabId) -> Option<bool> {
        self.live(tab)
    }

    fn has_persisted_marker(&self, tab: TabId) -> bool {
        self.marker(tab)
    }

    fn set_persisted_marker(&self, tab: TabId, is_private: bool) {
        let mut state = self.state.borrow_mut();
        if is_private {
            state.markers.insert(tab, true);
        } else {
            state.markers.remove(&tab);
        }
    }

    fn selected_tab(&self, window: WindowId) -> Option<TabId> {
        self.state.borrow().selected.get(&window).copied()
    }

    fn tab_position(&self, tab: TabId) -> Option<usize> {
        let state = self.state.borrow();
        state
            .tabs
            .values()
            .find_map(|tabs| tabs.iter().position(|t| *t == tab))
    }

    fn open_tab(&self, window: WindowId, position: Option<usize>, url: Option<&str>) -> Option<TabId> {
        if self.state.borrow().refuse_open {
            return None;
        }
        let tab = self.add_tab(window, position);
        self.state
            .borrow_mut()
            .opened
            .push((window, position, url.map(str::to_string), tab));
        Some(tab)
    }

    fn close_tab(&self, tab: TabId) {
        self.state.borrow_mut().closed.push(tab);
        self.remove_tab(tab);
    }

    fn select_tab(&self, tab: TabId) {
        let window = {
            let state = self.state.borrow();
            state
                .tabs
                .iter()
                .find(|(_, tabs)| tabs.contains(&tab))
                .map(|(window, _)| *window)
        };
        if let Some(window) = window {
            self.select(window, tab);
        }
    }

    fn forget_closed_tab(&self, _window: WindowId, tab: TabId) -> bool {
        self.state.borrow_mut().forgotten.push(tab);
        true
    }

    fn forget_closed_private_tabs(&self, window: WindowId) -> usize {
        self.state.borrow_mut().swept.push(window);
        1
    }

    fn register_persisted_attribute(&self, name: &str) {
        self.state
            .borrow_mut()
            .persisted_attributes
            .push(name.to_string());
    }

    fn last_private_check(&self, entity: Entity) -> anyhow::Result<bool> {
        let mut state = self.state.borrow_mut();
        state.checks.push(entity);
        match state.guard {
            GuardResponse::Allow => Ok(false),
            GuardResponse::Cancel => Ok(true),
            GuardResponse::Fail => anyhow::bail!("listener threw"),
        }
    }

    fn tab_session_state(&self, tab: TabId) -> Option<String> {
        self.state.borrow().session_states.get(&tab).cloned()
    }

    fn set_tab_session_state(&self, tab: TabId, state: &str) -> anyhow::Result<()> {
        self.state
            .borrow_mut()
            .session_states
            .insert(tab, state.to_string());
        Ok(())
    }

    fn shim_target(&self, target: ShimTarget) -> Option<Rc<dyn MethodHost>> {
        let object: Rc<dyn MethodHost> = self.object(target)?;
        Some(object)
    }
}

/// A fake host plus the engine driving it
pub struct Harness {
    pub host: Rc<FakeHost>,
    pub engine: PrivacyEngine,
}

impl Harness {
    pub fn new(config: Config) -> Self {
        let host = FakeHost::new();
        let dyn_host: Rc<dyn Host> = host.clone();
        let engine = PrivacyEngine::new(config, dyn_host);
        Self { host, engine }
    }

    /// Open a window with a full set of shim targets
    pub fn open_window(&mut self, window: WindowId, info: WindowOpenInfo) {
        self.host.add_window_objects(window, info.is_private);
        self.engine.window_created(window, info);
    }

    /// Open a tab on the host and deliver the open event
    pub fn open_tab(&mut self, window: WindowId, info: TabOpenInfo) -> TabId {
        let tab = self.host.add_tab(window, None);
        self.engine.tab_created(tab, window, info);
        tab
    }

    /// Open a non-empty tab and make it private
    pub fn open_private_tab(&mut self, window: WindowId) -> TabId {
        let tab = self.open_tab(window, TabOpenInfo::default());
        self.engine.toggle_tab(tab, Some(true));
        tab
    }

    /// Deliver open events for tabs the engine itself asked the host to open
    pub fn deliver_opened(&mut self) {
        let opened: Vec<(WindowId, TabId)> = self
            .host
            .state
            .borrow()
            .opened
            .iter()
            .map(|(window, _, _, tab)| (*window, *tab))
            .collect();
        for (window, tab) in opened {
            self.engine.tab_created(tab, window, TabOpenInfo::default());
        }
    }

    /// Play a user-initiated close. Returns whether the tab is gone.
    pub fn close_tab(&mut self, tab: TabId) -> bool {
        if !self.engine.tab_closing(tab, ClosePhase::Capture) {
            return false;
        }
        self.host.remove_tab(tab);
        self.engine.tab_closing(tab, ClosePhase::Bubble);
        true
    }

    /// Every live tab's marker equals its registry flag
    pub fn assert_markers_consistent(&self) {
        let state = self.host.state.borrow();
        for tab in state.live.keys() {
            if let Some(is_private) = self.engine.is_private(*tab) {
                let marker = state.markers.get(tab).copied().unwrap_or(false);
                assert_eq!(
                    marker, is_private,
                    "marker of {} disagrees with its flag",
                    tab
                );
            }
        }
    }
}

/// Window info for a plain top-level window
pub fn plain_window() -> WindowOpenInfo {
    WindowOpenInfo::default()
}

/// Window info for a window opened from `opener`
pub fn window_from(opener: WindowId) -> WindowOpenInfo {
    WindowOpenInfo {
        opener: Some(opener),
        ..WindowOpenInfo::default()
    }
}
