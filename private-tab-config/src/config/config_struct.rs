//! Core `Config` struct and its `Default` impl.

use crate::types::{CreationPolicy, DndResolution, LogLevel, SameWindowTabDrop};
use serde::{Deserialize, Serialize};

/// Privacy engine configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Config {
    // ========================================================================
    // Creation rules
    // ========================================================================
    /// Privacy of a new tab opened without explicit content
    #[serde(default = "crate::defaults::empty_tab_policy")]
    pub empty_tab_policy: CreationPolicy,

    /// Privacy of a new window opened without an opener or content
    #[serde(default = "crate::defaults::empty_window_policy")]
    pub empty_window_policy: CreationPolicy,

    // ========================================================================
    // Drag and drop
    // ========================================================================
    /// Which side decides the flag when content is dropped
    #[serde(default = "crate::defaults::dnd_resolution")]
    pub dnd_resolution: DndResolution,

    /// Handling of tab drops onto the tab strip of the same window
    #[serde(default = "crate::defaults::same_window_tab_drop")]
    pub same_window_tab_drop: SameWindowTabDrop,

    /// Let tabs be dragged between private and non-private windows
    #[serde(default = "crate::defaults::bool_true")]
    pub drag_tabs_between_windows: bool,

    // ========================================================================
    // Persistence
    // ========================================================================
    /// Keep private tabs in the persisted session snapshot
    #[serde(default = "crate::defaults::bool_false")]
    pub persist_private_sessions: bool,

    /// Keep closed private tabs in the undo-close history
    #[serde(default = "crate::defaults::bool_false")]
    pub remember_closed_private_tabs: bool,

    /// With remembered closed private tabs: forget them when a window closes
    /// and when the last private tab goes away
    #[serde(default = "crate::defaults::bool_false")]
    pub closed_private_tabs_cleanup: bool,

    /// Patch the session state of not yet loaded tabs directly when toggled
    #[serde(default = "crate::defaults::bool_true")]
    pub workaround_for_pending_tabs: bool,

    // ========================================================================
    // Last private context
    // ========================================================================
    /// Veto closing a window that holds the last private tab(s)
    #[serde(default = "crate::defaults::bool_true")]
    pub guard_last_private_close: bool,

    /// Reopen a private placeholder tab when the last private tab is closed
    #[serde(default = "crate::defaults::bool_false")]
    pub reopen_on_last_private_tab_closed: bool,

    // ========================================================================
    // Links
    // ========================================================================
    /// Allow links from external applications to load inside private tabs
    #[serde(default = "crate::defaults::bool_false")]
    pub allow_open_external_links_in_private_tabs: bool,

    // ========================================================================
    // Timing
    // ========================================================================
    /// Delay (ms) before a selected tab's marker is re-checked
    #[serde(default = "crate::defaults::select_recheck_delay_ms")]
    pub select_recheck_delay_ms: u64,

    /// Debounce (ms) for config file hot reload
    #[serde(default = "crate::defaults::reload_debounce_ms")]
    pub reload_debounce_ms: u64,

    // ========================================================================
    // Diagnostics
    // ========================================================================
    /// Log level for the debug log file
    #[serde(default = "crate::defaults::log_level")]
    pub log_level: LogLevel,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            empty_tab_policy: crate::defaults::empty_tab_policy(),
            empty_window_policy: crate::defaults::empty_window_policy(),
            dnd_resolution: crate::defaults::dnd_resolution(),
            same_window_tab_drop: crate::defaults::same_window_tab_drop(),
            drag_tabs_between_windows: true,
            persist_private_sessions: false,
            remember_closed_private_tabs: false,
            closed_private_tabs_cleanup: false,
            workaround_for_pending_tabs: true,
            guard_last_private_close: true,
            reopen_on_last_private_tab_closed: false,
            allow_open_external_links_in_private_tabs: false,
            select_recheck_delay_ms: crate::defaults::select_recheck_delay_ms(),
            reload_debounce_ms: crate::defaults::reload_debounce_ms(),
            log_level: crate::defaults::log_level(),
        }
    }
}

impl Config {
    /// Create a new configuration with default values
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the empty-tab policy
    pub fn with_empty_tab_policy(mut self, policy: CreationPolicy) -> Self {
        self.empty_tab_policy = policy;
        self
    }

    /// Set the empty-window policy
    pub fn with_empty_window_policy(mut self, policy: CreationPolicy) -> Self {
        self.empty_window_policy = policy;
        self
    }

    /// Set the drag-and-drop resolution mode
    pub fn with_dnd_resolution(mut self, resolution: DndResolution) -> Self {
        self.dnd_resolution = resolution;
        self
    }

    /// Whether remembered closed private tabs are cleaned up on private exit
    pub fn cleans_up_closed_private_tabs(&self) -> bool {
        self.remember_closed_private_tabs && self.closed_private_tabs_cleanup
    }
}
