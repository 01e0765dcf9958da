//! The engine's view of the host application.

use crate::entity::{Entity, TabId, WindowId};
use crate::interception::MethodHost;
use crate::session::restore;
use std::rc::Rc;

/// Host objects whose methods the engine may shim
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ShimTarget {
    /// Tab strip of a window; owns the drag effect computation
    TabStrip(WindowId),
    /// Tab container of a window; owns browser swapping between windows
    TabBrowser(WindowId),
    /// The window itself; owns the close warning
    Window(WindowId),
    /// The window's privacy query helper
    PrivacyUtils(WindowId),
    /// Thumbnail capture service of a window
    Thumbnails(WindowId),
    /// URI loader shared by a window's tabs
    ContentLoader(WindowId),
}

/// Host services the engine drives and queries.
///
/// All methods take `&self`; hosts keep their own interior mutability. The
/// engine never calls back into itself through the host, so implementations
/// may queue follow-up events (e.g. `tab_closing` after [`Host::close_tab`])
/// and deliver them afterwards.
pub trait Host {
    /// Switch the tab's browsing context to private or non-private.
    fn apply_tab_privacy(&self, tab: TabId, is_private: bool);

    /// Privacy of the tab's browsing context as the host currently sees it.
    ///
    /// May differ from the engine's view when the host or another extension
    /// changed it behind our back. `None` when the tab no longer exists.
    fn live_privacy(&self, tab: TabId) -> Option<bool>;

    /// Whether the tab carries the persisted session marker.
    ///
    /// Hosts that only hand over serialized tab state can rely on the default,
    /// which reads the marker out of [`Host::tab_session_state`].
    fn has_persisted_marker(&self, tab: TabId) -> bool {
        let Some(state) = self.tab_session_state(tab) else {
            return false;
        };
        match restore::privacy_from_state(&state) {
            Ok(is_private) => is_private,
            Err(e) => {
                log::debug!("Unreadable session state of {}: {:#}", tab, e);
                false
            }
        }
    }

    /// Add or remove the persisted session marker.
    fn set_persisted_marker(&self, tab: TabId, is_private: bool);

    /// Currently selected tab of a window.
    fn selected_tab(&self, window: WindowId) -> Option<TabId>;

    /// Position of the tab within its window.
    fn tab_position(&self, tab: TabId) -> Option<usize>;

    /// Open a tab. `position` of `None` appends, `url` of `None` opens a blank
    /// tab. Returns the new tab, or `None` if the host refused.
    fn open_tab(&self, window: WindowId, position: Option<usize>, url: Option<&str>) -> Option<TabId>;

    /// Close a tab without further prompts.
    fn close_tab(&self, tab: TabId);

    /// Make `tab` the selected tab of its window.
    fn select_tab(&self, tab: TabId);

    /// Remove a just-closed tab from the window's undo-close history.
    ///
    /// Returns `false` when the entry could not be found.
    fn forget_closed_tab(&self, _window: WindowId, _tab: TabId) -> bool {
        false
    }

    /// Remove every private entry from the window's undo-close history.
    ///
    /// Returns how many entries were forgotten.
    fn forget_closed_private_tabs(&self, _window: WindowId) -> usize {
        0
    }

    /// Ask the session store to persist a tab attribute.
    fn register_persisted_attribute(&self, _name: &str) {}

    /// Raise the cancellable "last private context is exiting" check.
    ///
    /// `Ok(true)` means some listener cancelled. An error is treated as a
    /// cancellation by the engine.
    fn last_private_check(&self, entity: Entity) -> anyhow::Result<bool>;

    /// Serialized session state of a single tab, if the host keeps one.
    fn tab_session_state(&self, _tab: TabId) -> Option<String> {
        None
    }

    /// Replace the serialized session state of a single tab.
    ///
    /// The host will follow up with `tab_restoring` for the tab.
    fn set_tab_session_state(&self, _tab: TabId, _state: &str) -> anyhow::Result<()> {
        anyhow::bail!("tab session state is not supported by this host")
    }

    /// Object to intercept for a shim, if this host exposes it.
    fn shim_target(&self, _target: ShimTarget) -> Option<Rc<dyn MethodHost>> {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::engine::{PrivacyEngine, TabOpenInfo, WindowOpenInfo};
    use std::cell::RefCell;
    use std::collections::HashMap;

    /// Keeps nothing but serialized tab state, like a bare session store
    #[derive(Default)]
    struct StateOnlyHost {
        states: RefCell<HashMap<TabId, String>>,
    }

    impl Host for StateOnlyHost {
        fn apply_tab_privacy(&self, _tab: TabId, _is_private: bool) {}

        fn live_privacy(&self, _tab: TabId) -> Option<bool> {
            None
        }

        fn set_persisted_marker(&self, _tab: TabId, _is_private: bool) {}

        fn selected_tab(&self, _window: WindowId) -> Option<TabId> {
            None
        }

        fn tab_position(&self, _tab: TabId) -> Option<usize> {
            None
        }

        fn open_tab(&self, _window: WindowId, _position: Option<usize>, _url: Option<&str>) -> Option<TabId> {
            None
        }

        fn close_tab(&self, _tab: TabId) {}

        fn select_tab(&self, _tab: TabId) {}

        fn last_private_check(&self, _entity: Entity) -> anyhow::Result<bool> {
            Ok(false)
        }

        fn tab_session_state(&self, tab: TabId) -> Option<String> {
            self.states.borrow().get(&tab).cloned()
        }
    }

    #[test]
    fn test_default_marker_reads_session_state() {
        let host = Rc::new(StateOnlyHost::default());
        let (marked, plain, garbled) = (TabId(1), TabId(2), TabId(3));
        {
            let mut states = host.states.borrow_mut();
            states.insert(marked, r#"{"attributes":{"privateTab-isPrivate":"true"}}"#.to_string());
            states.insert(plain, r#"{"attributes":{}}"#.to_string());
            states.insert(garbled, "{ broken".to_string());
        }
        assert!(host.has_persisted_marker(marked));
        assert!(!host.has_persisted_marker(plain));
        assert!(!host.has_persisted_marker(garbled));
        assert!(!host.has_persisted_marker(TabId(4)));

        let dyn_host: Rc<dyn Host> = host;
        let mut engine = PrivacyEngine::new(Config::default(), dyn_host);
        engine.window_created(WindowId(1), WindowOpenInfo::default());
        engine.tab_created(marked, WindowId(1), TabOpenInfo::default());
        engine.tab_created(plain, WindowId(1), TabOpenInfo::default());
        engine.tab_restoring(marked);
        engine.tab_restoring(plain);
        assert_eq!(engine.is_private(marked), Some(true));
        assert_eq!(engine.is_private(plain), Some(false));
    }
}
