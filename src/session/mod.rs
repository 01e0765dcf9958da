//! Session snapshot types and privacy filtering
//!
//! The host serializes all open windows and tabs into a JSON snapshot before
//! writing it to disk. Private tabs carry the [`PRIVATE_ATTR`] marker in their
//! `attributes`; this module strips them so they never reach persistent storage.
//!
//! Only the fields the filter needs are typed. Everything else is kept in the
//! `extra` maps and written back unchanged.

pub mod capture;
pub mod filter;
pub mod restore;
pub mod storage;

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};

/// Tab attribute that marks a tab as private in the host's session store.
/// Its presence, not its value, is what counts.
pub const PRIVATE_ATTR: &str = "privateTab-isPrivate";

/// Top-level session snapshot: every window the host is about to persist
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SessionSnapshot {
    #[serde(default)]
    pub windows: Vec<WindowState>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// A single window in the snapshot
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct WindowState {
    #[serde(default)]
    pub tabs: Vec<TabState>,
    /// 1-based index of the selected tab
    #[serde(
        default,
        deserialize_with = "lenient_index",
        skip_serializing_if = "Option::is_none"
    )]
    pub selected: Option<usize>,
    /// The whole window is a private context (the host skips it itself)
    #[serde(
        rename = "isPrivate",
        default,
        deserialize_with = "lenient_flag",
        skip_serializing_if = "Option::is_none"
    )]
    pub is_private: Option<bool>,
    /// Undo-close history
    #[serde(rename = "_closedTabs", default, skip_serializing_if = "Option::is_none")]
    pub closed_tabs: Option<Vec<ClosedTab>>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// A single tab in the snapshot
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TabState {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub attributes: Option<Map<String, Value>>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// An entry of a window's undo-close history
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ClosedTab {
    #[serde(default)]
    pub state: TabState,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Accepts a number or a numeric string; anything else reads as unset
fn lenient_index<'de, D>(deserializer: D) -> Result<Option<usize>, D::Error>
where
    D: Deserializer<'de>,
{
    let index = match Value::deserialize(deserializer)? {
        Value::Number(n) => n.as_u64().and_then(|n| usize::try_from(n).ok()),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    };
    Ok(index)
}

/// Accepts booleans, `0`/`1` and `"true"`/`"false"`; anything else reads as unset
fn lenient_flag<'de, D>(deserializer: D) -> Result<Option<bool>, D::Error>
where
    D: Deserializer<'de>,
{
    let flag = match Value::deserialize(deserializer)? {
        Value::Bool(b) => Some(b),
        Value::Number(n) => n.as_i64().map(|n| n != 0),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    };
    Ok(flag)
}

impl TabState {
    /// Whether the private marker is present
    pub fn is_private(&self) -> bool {
        self.attributes
            .as_ref()
            .is_some_and(|attrs| attrs.contains_key(PRIVATE_ATTR))
    }

    /// Add or remove the private marker
    pub fn set_private(&mut self, is_private: bool) {
        if is_private {
            self.attributes
                .get_or_insert_with(Map::new)
                .insert(PRIVATE_ATTR.to_string(), Value::String("true".to_string()));
        } else if let Some(attrs) = self.attributes.as_mut() {
            attrs.remove(PRIVATE_ATTR);
        }
    }
}

impl WindowState {
    pub fn is_private_window(&self) -> bool {
        self.is_private.unwrap_or(false)
    }

    pub fn private_tab_count(&self) -> usize {
        self.tabs.iter().filter(|t| t.is_private()).count()
    }
}

impl SessionSnapshot {
    pub fn tab_count(&self) -> usize {
        self.windows.iter().map(|w| w.tabs.len()).sum()
    }

    pub fn private_tab_count(&self) -> usize {
        self.windows.iter().map(WindowState::private_tab_count).sum()
    }
}
