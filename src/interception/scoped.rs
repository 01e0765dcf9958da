//! Scoped method overrides with guaranteed release.

use super::{HostFn, MethodHost};
use crate::error::{PrivacyError, Result};
use std::cell::{Cell, RefCell};
use std::rc::Rc;

/// Replaces a host method for as long as the guard lives.
///
/// Dropping the guard puts the previous function back, on every exit path. If
/// something else has replaced the method in the meantime, that newer function
/// is left alone.
pub struct MethodOverride {
    target: Rc<dyn MethodHost>,
    method: String,
    previous: HostFn,
    installed: HostFn,
}

impl std::fmt::Debug for MethodOverride {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MethodOverride")
            .field("target", &self.target.target_key())
            .field("method", &self.method)
            .finish_non_exhaustive()
    }
}

impl MethodOverride {
    /// Install `replacement` as `target.method` until the guard is dropped
    pub fn install(target: Rc<dyn MethodHost>, method: &str, replacement: HostFn) -> Result<Self> {
        let previous = target
            .method(method)
            .ok_or_else(|| PrivacyError::TargetMissing {
                target: target.target_key().to_string(),
                method: method.to_string(),
            })?;
        if !target.replace_method(method, Rc::clone(&replacement)) {
            return Err(PrivacyError::TargetMissing {
                target: target.target_key().to_string(),
                method: method.to_string(),
            });
        }
        log::trace!("Override {}.{}()", target.target_key(), method);
        Ok(Self {
            target,
            method: method.to_string(),
            previous,
            installed: replacement,
        })
    }

    /// Restore now instead of at end of scope
    pub fn release(self) {}
}

impl Drop for MethodOverride {
    fn drop(&mut self) {
        match self.target.method(&self.method) {
            Some(current) if Rc::ptr_eq(&current, &self.installed) => {
                self.target
                    .replace_method(&self.method, Rc::clone(&self.previous));
                log::trace!(
                    "Restored {}.{}()",
                    self.target.target_key(),
                    self.method
                );
            }
            Some(_) => log::debug!(
                "{}.{}() was replaced during override, leaving it",
                self.target.target_key(),
                self.method
            ),
            None => log::debug!(
                "{}.{}() is gone, nothing to restore",
                self.target.target_key(),
                self.method
            ),
        }
    }
}

/// A slot holding at most one live override.
///
/// Before-hooks fill it, after-hooks and fallback tasks empty it; emptying an
/// already empty slot is a no-op, so whichever runs first wins.
///
/// [`OverrideSlot::enter`] and [`OverrideSlot::leave`] count nested scopes:
/// the override is installed by the outermost enter and released by the
/// matching leave.
#[derive(Clone, Default)]
pub struct OverrideSlot {
    guard: Rc<RefCell<Option<MethodOverride>>>,
    depth: Rc<Cell<usize>>,
}

impl OverrideSlot {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store a guard, releasing any previous one first
    pub fn set(&self, guard: MethodOverride) {
        let previous = self.guard.borrow_mut().take();
        drop(previous);
        *self.guard.borrow_mut() = Some(guard);
    }

    /// Open a scope. `install` runs only when no override is held yet.
    pub fn enter(&self, install: impl FnOnce() -> Result<MethodOverride>) -> Result<()> {
        self.depth.set(self.depth.get() + 1);
        if self.is_active() {
            return Ok(());
        }
        self.set(install()?);
        Ok(())
    }

    /// Close a scope. Releases the override when the outermost scope closes;
    /// returns whether it did.
    pub fn leave(&self) -> bool {
        let depth = self.depth.get().saturating_sub(1);
        self.depth.set(depth);
        depth == 0 && self.release_guard()
    }

    /// Release the held guard, if any, and forget every open scope. Returns
    /// whether something was released.
    pub fn release(&self) -> bool {
        self.depth.set(0);
        self.release_guard()
    }

    fn release_guard(&self) -> bool {
        let guard = self.guard.borrow_mut().take();
        guard.is_some()
    }

    pub fn is_active(&self) -> bool {
        self.guard.borrow().is_some()
    }

    /// Number of open scopes
    pub fn depth(&self) -> usize {
        self.depth.get()
    }
}
