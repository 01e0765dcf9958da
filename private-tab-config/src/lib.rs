//! Configuration system for the private-tab privacy engine.
//!
//! This crate provides configuration loading, saving, validation and default
//! values for the engine. It includes:
//!
//! - The `Config` struct and its YAML persistence
//! - Creation, drag-and-drop and logging policy enums
//! - Configuration file watching for hot reload

pub mod config;
pub mod defaults;
pub mod error;
mod types;
#[cfg(feature = "watcher")]
pub mod watcher;

pub use config::Config;
pub use error::ConfigError;
pub use types::{
    CreationPolicy, DndResolution, EmptyTabPolicy, EmptyWindowPolicy, LogLevel,
    SameWindowTabDrop,
};
#[cfg(feature = "watcher")]
pub use watcher::{ConfigReloadEvent, ConfigWatcher};
