//! Per-tab private browsing state.
//!
//! [`engine::PrivacyEngine`] tracks which tabs are private, propagates the
//! flag through tab and window lifecycle events, and keeps private tabs out of
//! persisted sessions. The host application is reached through
//! [`engine::Host`]; its functions are intercepted through
//! [`interception::Interceptor`].

/// Crate version, for the CLI banner
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

pub use private_tab_config as config;

pub mod cli;
pub mod debug;
pub mod dnd;
pub mod engine;
pub mod entity;
pub mod error;
pub mod interception;
pub mod registry;
pub mod session;

pub use engine::{Host, PrivacyEngine, PrivacyEvent};
pub use entity::{Entity, NodeId, TabId, WindowId};
pub use error::PrivacyError;
