//! Privacy engine configuration management.
//!
//! # Sub-modules
//!
//! - [`config_struct`]: Core `Config` struct and its `Default` impl
//! - [`persistence`]: `impl Config` methods for load/save, validation and path resolution

pub mod config_struct;
pub mod persistence;

pub use config_struct::Config;
