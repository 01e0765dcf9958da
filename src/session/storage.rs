//! File I/O for session snapshots
//!
//! Snapshots are plain JSON files in the host's format.

use super::SessionSnapshot;
use anyhow::{Context, Result};
use std::path::Path;

/// Load a snapshot from a file
///
/// Returns `None` if the file doesn't exist or is empty.
/// Returns an error if the file exists but is corrupt.
pub fn load_snapshot_from(path: &Path) -> Result<Option<SessionSnapshot>> {
    if !path.exists() {
        return Ok(None);
    }

    let contents = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read session snapshot from {:?}", path))?;

    if contents.trim().is_empty() {
        return Ok(None);
    }

    let snapshot: SessionSnapshot = serde_json::from_str(&contents)
        .with_context(|| format!("Failed to parse session snapshot from {:?}", path))?;

    log::info!(
        "Loaded session snapshot ({} windows, {} tabs) from {:?}",
        snapshot.windows.len(),
        snapshot.tab_count(),
        path
    );
    Ok(Some(snapshot))
}

/// Save a snapshot to a file, creating parent directories as needed
pub fn save_snapshot_to(snapshot: &SessionSnapshot, path: &Path) -> Result<()> {
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create directory {:?}", parent))?;
    }

    let contents =
        serde_json::to_string(snapshot).context("Failed to serialize session snapshot")?;

    std::fs::write(path, contents)
        .with_context(|| format!("Failed to write session snapshot to {:?}", path))?;

    log::info!(
        "Saved session snapshot ({} windows) to {:?}",
        snapshot.windows.len(),
        path
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::{TabState, WindowState};
    use tempfile::tempdir;

    fn sample_snapshot() -> SessionSnapshot {
        let mut private = TabState::default();
        private.set_private(true);
        SessionSnapshot {
            windows: vec![WindowState {
                tabs: vec![TabState::default(), private],
                selected: Some(2),
                ..Default::default()
            }],
            ..Default::default()
        }
    }

    #[test]
    fn test_load_nonexistent_file() {
        let temp = tempdir().unwrap();
        let result = load_snapshot_from(&temp.path().join("nonexistent.json")).unwrap();
        assert!(result.is_none());
    }

    #[test]
    fn test_load_empty_file() {
        let temp = tempdir().unwrap();
        let path = temp.path().join("empty.json");
        std::fs::write(&path, "  \n").unwrap();
        assert!(load_snapshot_from(&path).unwrap().is_none());
    }

    #[test]
    fn test_load_corrupt_file() {
        let temp = tempdir().unwrap();
        let path = temp.path().join("corrupt.json");
        std::fs::write(&path, "{\"windows\": [").unwrap();
        assert!(load_snapshot_from(&path).is_err());
    }

    #[test]
    fn test_save_creates_parent_directory() {
        let temp = tempdir().unwrap();
        let path = temp.path().join("nested").join("dir").join("session.json");

        save_snapshot_to(&sample_snapshot(), &path).unwrap();
        let loaded = load_snapshot_from(&path).unwrap().unwrap();
        assert_eq!(loaded.windows[0].tabs.len(), 2);
        assert_eq!(loaded.private_tab_count(), 1);
    }
}
