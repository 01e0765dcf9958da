//! Subcommand implementations.

use crate::config::Config;
use crate::debug;
use crate::session::filter::{FilterOptions, filter_snapshot};
use crate::session::storage::{load_snapshot_from, save_snapshot_to};
use anyhow::{Context, Result, anyhow, bail};
use std::path::Path;

/// Config for commands that only read it; a missing default file is not created
fn load_config(path: Option<&Path>) -> Result<Config> {
    let config = match path {
        Some(path) => Config::load_from(path)?,
        None if Config::config_path().exists() => Config::load_from(&Config::config_path())?,
        None => Config::default(),
    };
    debug::apply_config_level(config.log_level);
    Ok(config)
}

/// Strip private tabs from the snapshot at `input`.
///
/// The filter always runs here, even when the config persists private
/// sessions; asking for it is the point of the command.
pub fn filter_session_cli(
    input: &Path,
    output: Option<&Path>,
    config_path: Option<&Path>,
    keep_closed: bool,
) -> Result<()> {
    let config = load_config(config_path)?;
    let mut options = FilterOptions::from(&config);
    options.persist_private_sessions = false;
    options.remember_closed_private_tabs |= keep_closed;

    let snapshot = load_snapshot_from(input)?
        .ok_or_else(|| anyhow!("No session snapshot at {:?}", input))?;
    let before = snapshot.tab_count();

    let (result, changed) = match filter_snapshot(&snapshot, options) {
        Some(filtered) => (filtered, true),
        None => (snapshot, false),
    };
    let removed = before - result.tab_count();
    log::info!(
        "filter-session: {} of {} tab(s) removed from {:?}",
        removed,
        before,
        input
    );

    match output {
        Some(path) => {
            save_snapshot_to(&result, path)?;
            println!("Removed {} private tab(s); wrote {}", removed, path.display());
        }
        None => {
            let json = serde_json::to_string_pretty(&result)
                .context("Failed to serialize session snapshot")?;
            println!("{}", json);
            if changed {
                eprintln!("Removed {} private tab(s)", removed);
            }
        }
    }
    Ok(())
}

/// Load `path` (or the default config file) and report its settings
pub fn check_config_cli(path: Option<&Path>) -> Result<()> {
    let path = path
        .map(Path::to_path_buf)
        .unwrap_or_else(Config::config_path);
    if !path.exists() {
        bail!("Config file {:?} does not exist", path);
    }
    let config = Config::load_from(&path)?;

    println!("Config OK: {}", path.display());
    println!("  empty_tab_policy:          {}", config.empty_tab_policy.display_name());
    println!("  empty_window_policy:       {}", config.empty_window_policy.display_name());
    println!("  dnd_resolution:            {}", config.dnd_resolution.display_name());
    println!("  persist_private_sessions:  {}", config.persist_private_sessions);
    println!("  guard_last_private_close:  {}", config.guard_last_private_close);
    println!(
        "  reopen_on_last_private_tab_closed: {}",
        config.reopen_on_last_private_tab_closed
    );
    Ok(())
}

/// Write a default config to `path` (or the default location)
pub fn init_config_cli(path: Option<&Path>, force: bool) -> Result<()> {
    let path = path
        .map(Path::to_path_buf)
        .unwrap_or_else(Config::config_path);
    if path.exists() && !force {
        bail!("{:?} already exists (use --force to overwrite)", path);
    }
    Config::default().save_to(&path)?;
    println!("Wrote default config to {}", path.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::PRIVATE_ATTR;
    use serde_json::json;
    use tempfile::tempdir;

    fn write_session(path: &Path) {
        let session = json!({
            "windows": [{
                "tabs": [
                    { "attributes": { PRIVATE_ATTR: "true" } },
                    { "attributes": {} },
                ],
                "selected": 1
            }]
        });
        std::fs::write(path, session.to_string()).unwrap();
    }

    #[test]
    fn test_filter_session_to_file() {
        let dir = tempdir().unwrap();
        let input = dir.path().join("session.json");
        let output = dir.path().join("out").join("filtered.json");
        let config = dir.path().join("config.yaml");
        write_session(&input);
        Config::default().save_to(&config).unwrap();

        filter_session_cli(&input, Some(&output), Some(&config), false).unwrap();

        let filtered = load_snapshot_from(&output).unwrap().unwrap();
        assert_eq!(filtered.tab_count(), 1);
        assert_eq!(filtered.private_tab_count(), 0);
        assert_eq!(filtered.windows[0].selected, Some(1));
    }

    #[test]
    fn test_filter_session_runs_with_persisting_config() {
        let dir = tempdir().unwrap();
        let input = dir.path().join("session.json");
        let output = dir.path().join("filtered.json");
        let config = dir.path().join("config.yaml");
        write_session(&input);
        let mut persisting = Config::default();
        persisting.persist_private_sessions = true;
        persisting.save_to(&config).unwrap();

        filter_session_cli(&input, Some(&output), Some(&config), false).unwrap();

        let filtered = load_snapshot_from(&output).unwrap().unwrap();
        assert_eq!(filtered.private_tab_count(), 0);
    }

    #[test]
    fn test_filter_session_missing_input() {
        let dir = tempdir().unwrap();
        let config = dir.path().join("config.yaml");
        Config::default().save_to(&config).unwrap();
        let err = filter_session_cli(
            &dir.path().join("missing.json"),
            None,
            Some(&config),
            false,
        )
        .unwrap_err();
        assert!(err.to_string().contains("No session snapshot"));
    }

    #[test]
    fn test_init_then_check_config() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("private-tab").join("config.yaml");

        init_config_cli(Some(&path), false).unwrap();
        assert!(path.exists());
        check_config_cli(Some(&path)).unwrap();

        assert!(init_config_cli(Some(&path), false).is_err());
        init_config_cli(Some(&path), true).unwrap();
    }

    #[test]
    fn test_check_config_rejects_invalid() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("config.yaml");
        std::fs::write(&path, "select_recheck_delay_ms: 999999\n").unwrap();
        assert!(check_config_cli(Some(&path)).is_err());
        assert!(check_config_cli(Some(&dir.path().join("nope.yaml"))).is_err());
    }
}
