//! Default value functions for configuration.
//!
//! Used as `#[serde(default = "crate::defaults::...")]` attributes on `Config`
//! fields so that partial YAML files pick up the same values as `Config::default()`.

use crate::types::{CreationPolicy, DndResolution, LogLevel, SameWindowTabDrop};

pub fn bool_true() -> bool {
    true
}

pub fn bool_false() -> bool {
    false
}

pub fn empty_tab_policy() -> CreationPolicy {
    CreationPolicy::Never
}

pub fn empty_window_policy() -> CreationPolicy {
    CreationPolicy::Never
}

pub fn dnd_resolution() -> DndResolution {
    DndResolution::Either
}

pub fn same_window_tab_drop() -> SameWindowTabDrop {
    SameWindowTabDrop::Ignore
}

pub fn log_level() -> LogLevel {
    LogLevel::Info
}

/// Delay before a selected tab's marker is re-checked against its live flag
pub fn select_recheck_delay_ms() -> u64 {
    50
}

/// Debounce for config hot reload
pub fn reload_debounce_ms() -> u64 {
    100
}
