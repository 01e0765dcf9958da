//! Error types for the privacy engine and interception layer

use crate::entity::Entity;
use crate::interception::HookId;
use thiserror::Error;

/// Errors raised by the core.
///
/// None of these are fatal: `TargetMissing` disables one shim for the current
/// host, `StaleHandle` and `DestroyedEntity` are logged and otherwise ignored.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum PrivacyError {
    /// The interception target has no method with the given name
    #[error("Can't find {target}.{method}()")]
    TargetMissing { target: String, method: String },

    /// `unwrap` was called for a hook that is no longer registered
    #[error("Hook {hook:?} for {target}.{method}() is already removed")]
    StaleHandle {
        target: String,
        method: String,
        hook: HookId,
    },

    /// An operation was attempted on a tab/window that was already torn down
    #[error("{0} is already destroyed")]
    DestroyedEntity(Entity),

    /// The engine was used after `destroy`
    #[error("Privacy engine is shut down")]
    ShutDown,
}

/// Result alias for core operations
pub type Result<T> = std::result::Result<T, PrivacyError>;
