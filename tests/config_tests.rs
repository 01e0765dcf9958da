use private_tab::config::{
    Config, ConfigError, CreationPolicy, DndResolution, LogLevel, SameWindowTabDrop,
};
use tempfile::TempDir;

#[test]
fn test_config_defaults() {
    let config = Config::default();
    assert_eq!(config.empty_tab_policy, CreationPolicy::Never);
    assert_eq!(config.empty_window_policy, CreationPolicy::Never);
    assert_eq!(config.dnd_resolution, DndResolution::Either);
    assert_eq!(config.same_window_tab_drop, SameWindowTabDrop::Ignore);
    assert!(!config.persist_private_sessions);
    assert!(config.guard_last_private_close);
    assert!(!config.reopen_on_last_private_tab_closed);
    assert!(config.drag_tabs_between_windows);
    assert!(!config.remember_closed_private_tabs);
    assert!(!config.closed_private_tabs_cleanup);
    assert!(!config.allow_open_external_links_in_private_tabs);
    assert!(config.workaround_for_pending_tabs);
    assert_eq!(config.select_recheck_delay_ms, 50);
    assert_eq!(config.log_level, LogLevel::Info);
}

#[test]
fn test_config_builder_chain() {
    let config = Config::new()
        .with_empty_tab_policy(CreationPolicy::Inherit)
        .with_empty_window_policy(CreationPolicy::AlwaysPrivate)
        .with_dnd_resolution(DndResolution::SourceWins);
    assert_eq!(config.empty_tab_policy, CreationPolicy::Inherit);
    assert_eq!(config.empty_window_policy, CreationPolicy::AlwaysPrivate);
    assert_eq!(config.dnd_resolution, DndResolution::SourceWins);
}

#[test]
fn test_config_partial_yaml() {
    let yaml = r#"
empty_tab_policy: always_private
dnd_resolution: target_wins
persist_private_sessions: true
"#;
    let config = Config::from_yaml(yaml).unwrap();
    assert_eq!(config.empty_tab_policy, CreationPolicy::AlwaysPrivate);
    assert_eq!(config.dnd_resolution, DndResolution::TargetWins);
    assert!(config.persist_private_sessions);
    // unspecified fields keep their defaults
    assert!(config.guard_last_private_close);
    assert_eq!(config.empty_window_policy, CreationPolicy::Never);
}

#[test]
fn test_closed_tab_cleanup_needs_remembered_tabs() {
    let config = Config::from_yaml("closed_private_tabs_cleanup: true\n").unwrap();
    assert!(!config.cleans_up_closed_private_tabs());

    let yaml = "remember_closed_private_tabs: true\nclosed_private_tabs_cleanup: true\n";
    assert!(Config::from_yaml(yaml).unwrap().cleans_up_closed_private_tabs());
}

#[test]
fn test_config_empty_yaml_is_default() {
    assert_eq!(Config::from_yaml("  \n").unwrap(), Config::default());
}

#[test]
fn test_config_rejects_unknown_policy() {
    let err = Config::from_yaml("empty_tab_policy: sometimes\n").unwrap_err();
    assert!(matches!(err, ConfigError::Parse(_)));
}

#[test]
fn test_config_validation() {
    let err = Config::from_yaml("select_recheck_delay_ms: 120000\n").unwrap_err();
    assert!(matches!(err, ConfigError::Validation(_)));
}

#[test]
fn test_config_save_load_roundtrip() {
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    let path = temp_dir.path().join("nested").join("config.yaml");

    let mut config = Config::new().with_dnd_resolution(DndResolution::SourceWins);
    config.reopen_on_last_private_tab_closed = true;
    config.log_level = LogLevel::Debug;
    config.save_to(&path).unwrap();

    assert!(!path.with_extension("yaml.tmp").exists());
    let loaded = Config::load_from(&path).unwrap();
    assert_eq!(loaded, config);
}
