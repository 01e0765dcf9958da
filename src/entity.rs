//! Identifiers for host-owned tabs and windows.
//!
//! Host events are resolved into these once, at the boundary; the engine never
//! re-derives whether something is a tab or a window.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Opaque host-assigned tab identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TabId(pub u64);

/// Opaque host-assigned window identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct WindowId(pub u64);

/// Opaque identifier of a dragged content node (link, text selection, tab)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct NodeId(pub u64);

/// A tab or a window
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Entity {
    Tab(TabId),
    Window(WindowId),
}

impl fmt::Display for TabId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "tab#{}", self.0)
    }
}

impl fmt::Display for WindowId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "window#{}", self.0)
    }
}

impl fmt::Display for Entity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Entity::Tab(id) => id.fmt(f),
            Entity::Window(id) => id.fmt(f),
        }
    }
}

impl From<TabId> for Entity {
    fn from(id: TabId) -> Self {
        Entity::Tab(id)
    }
}

impl From<WindowId> for Entity {
    fn from(id: WindowId) -> Self {
        Entity::Window(id)
    }
}
