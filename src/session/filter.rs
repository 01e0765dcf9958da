//! Strip private tabs from a session snapshot before the host persists it.

use super::{PRIVATE_ATTR, SessionSnapshot, WindowState};
use crate::config::Config;
use anyhow::{Context, Result};

/// Filter knobs, taken from [`Config`]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FilterOptions {
    /// Keep private tabs in the snapshot (filter disabled)
    pub persist_private_sessions: bool,
    /// Keep private entries in the undo-close history
    pub remember_closed_private_tabs: bool,
}

impl From<&Config> for FilterOptions {
    fn from(config: &Config) -> Self {
        Self {
            persist_private_sessions: config.persist_private_sessions,
            remember_closed_private_tabs: config.remember_closed_private_tabs,
        }
    }
}

/// Return a filtered copy of `snapshot`, or `None` when nothing had to go.
///
/// Windows that are private as a whole pass through untouched. In every other
/// window private tabs are removed and `selected` is moved to the first
/// surviving tab at or after the old selection, falling back to the last
/// surviving tab.
pub fn filter_snapshot(snapshot: &SessionSnapshot, options: FilterOptions) -> Option<SessionSnapshot> {
    if options.persist_private_sessions {
        return None;
    }

    let mut filtered = snapshot.clone();
    let mut changed = false;
    for window in filtered.windows.iter_mut() {
        if window.is_private_window() {
            continue;
        }
        changed |= filter_window(window);
        if !options.remember_closed_private_tabs {
            changed |= filter_closed_tabs(window);
        }
    }

    changed.then_some(filtered)
}

/// Returns whether any tab was removed
fn filter_window(window: &mut WindowState) -> bool {
    let old_selected = window.selected.unwrap_or(1);
    let mut new_selected = None;
    let mut kept = 0usize;
    let before = window.tabs.len();

    let tabs = std::mem::take(&mut window.tabs);
    for (i, tab) in tabs.into_iter().enumerate() {
        if tab.is_private() {
            continue;
        }
        kept += 1;
        if new_selected.is_none() && i + 1 >= old_selected {
            new_selected = Some(kept);
        }
        window.tabs.push(tab);
    }

    if window.tabs.len() == before {
        return false;
    }
    window.selected = Some(new_selected.unwrap_or(window.tabs.len()));
    log::debug!(
        "Removed {} private tab(s) from window snapshot, selected {} => {:?}",
        before - window.tabs.len(),
        old_selected,
        window.selected
    );
    true
}

fn filter_closed_tabs(window: &mut WindowState) -> bool {
    let Some(closed) = window.closed_tabs.as_mut() else {
        return false;
    };
    let before = closed.len();
    closed.retain(|entry| !entry.state.is_private());
    closed.len() != before
}

/// Filter a serialized snapshot.
///
/// Skips parsing entirely when the marker does not occur in the text.
pub fn filter_json(state: &str, options: FilterOptions) -> Result<Option<String>> {
    if options.persist_private_sessions || !state.contains(&format!("\"{PRIVATE_ATTR}\"")) {
        return Ok(None);
    }
    let snapshot: SessionSnapshot =
        serde_json::from_str(state).context("Failed to parse session snapshot")?;
    let Some(filtered) = filter_snapshot(&snapshot, options) else {
        return Ok(None);
    };
    let out = serde_json::to_string(&filtered).context("Failed to serialize session snapshot")?;
    Ok((out != state).then_some(out))
}
