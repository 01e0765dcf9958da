//! Patch the session state of a single tab.
//!
//! A pending tab (not loaded yet) only exists in the host's session store, so
//! changing its privacy means rewriting its stored state directly.

use super::TabState;
use anyhow::{Context, Result};

/// Return `state` with the private marker added or removed
pub fn mark_tab_state(state: &str, is_private: bool) -> Result<String> {
    let mut tab: TabState = serde_json::from_str(state).context("Failed to parse tab state")?;
    tab.set_private(is_private);
    serde_json::to_string(&tab).context("Failed to serialize tab state")
}
