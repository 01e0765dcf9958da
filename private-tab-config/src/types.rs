//! Policy enums recognised by the privacy engine.

use serde::{Deserialize, Serialize};

// ============================================================================
// Creation Policies
// ============================================================================

/// How a freshly created empty tab or window picks its privacy flag.
///
/// Used for both `empty_tab_policy` and `empty_window_policy`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum CreationPolicy {
    /// Follow the opener: the creating window's selected tab, then the window itself
    Inherit,
    /// Always start private (suppressed while the window is restoring a session)
    AlwaysPrivate,
    /// Never mark as private on creation (default)
    #[default]
    Never,
}

impl CreationPolicy {
    /// Display name for UI
    pub fn display_name(&self) -> &'static str {
        match self {
            CreationPolicy::Inherit => "Inherit from opener",
            CreationPolicy::AlwaysPrivate => "Always private",
            CreationPolicy::Never => "Never",
        }
    }

    /// All available policies for UI iteration
    pub fn all() -> &'static [CreationPolicy] {
        &[
            CreationPolicy::Inherit,
            CreationPolicy::AlwaysPrivate,
            CreationPolicy::Never,
        ]
    }
}

/// Empty-tab creation policy.
pub type EmptyTabPolicy = CreationPolicy;

/// Empty-window creation policy.
pub type EmptyWindowPolicy = CreationPolicy;

// ============================================================================
// Drag and Drop
// ============================================================================

/// Which side decides the privacy flag when content is dropped
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum DndResolution {
    /// Result is the source's flag
    SourceWins,
    /// Result is the drop target's flag
    TargetWins,
    /// Private if either side is private (default)
    #[default]
    Either,
}

impl DndResolution {
    /// Display name for UI
    pub fn display_name(&self) -> &'static str {
        match self {
            DndResolution::SourceWins => "Source wins",
            DndResolution::TargetWins => "Target wins",
            DndResolution::Either => "Private if either side is private",
        }
    }
}

/// What to do when a tab is dropped onto a tab or the tab strip of its own window.
///
/// The host's own tab-reordering code already handles these drops, so resolving
/// them again is usually double handling.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum SameWindowTabDrop {
    /// Leave same-window tab drops to the host (default)
    #[default]
    Ignore,
    /// Run the normal drop resolution anyway
    Resolve,
}

// ============================================================================
// Logging
// ============================================================================

/// Log level written by the debug log bridge
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum LogLevel {
    Off,
    Error,
    Warn,
    /// Default
    #[default]
    Info,
    Debug,
    Trace,
}

impl LogLevel {
    /// Convert to the `log` crate's filter
    pub fn to_level_filter(self) -> log::LevelFilter {
        match self {
            LogLevel::Off => log::LevelFilter::Off,
            LogLevel::Error => log::LevelFilter::Error,
            LogLevel::Warn => log::LevelFilter::Warn,
            LogLevel::Info => log::LevelFilter::Info,
            LogLevel::Debug => log::LevelFilter::Debug,
            LogLevel::Trace => log::LevelFilter::Trace,
        }
    }
}
