//! Runtime interception of host-owned functions.
//!
//! The host has no extension points for the behaviors the engine needs to
//! change, so its functions are replaced with a single wrapper per
//! `(target, method)` pair. Independent call sites register before/after hooks
//! on that wrapper. When the last hook goes away the original function object
//! is put back exactly as it was.
//!
//! Calls use a uniform `&[Value] -> Value` convention so any host function can
//! be wrapped without knowing its signature.

mod host_object;
mod scoped;

pub use host_object::{HostObject, MethodHost};
pub use scoped::{MethodOverride, OverrideSlot};

use crate::error::{PrivacyError, Result};
use serde_json::Value;
use std::cell::RefCell;
use std::collections::HashMap;
use std::fmt;
use std::rc::Rc;

/// A host function as seen by the interception layer
pub type HostFn = Rc<dyn Fn(&[Value]) -> Value>;

/// Runs before the original. Receives the call arguments.
pub type BeforeHook = Rc<dyn Fn(&[Value]) -> BeforeOutcome>;

/// Runs after the original. Receives the current return value and the call
/// arguments; `Some` replaces the value passed on to later hooks and the caller.
pub type AfterHook = Rc<dyn Fn(&Value, &[Value]) -> Option<Value>>;

/// What a before hook wants the wrapper to do next
#[derive(Debug, Clone, PartialEq)]
pub enum BeforeOutcome {
    /// Keep going: next before hook, then the original
    Continue,
    /// Skip the original and every remaining hook; return this value
    ShortCircuit(Value),
}

/// Identifies one registered hook pair
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct HookId(u64);

impl fmt::Display for HookId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "hook#{}", self.0)
    }
}

#[derive(Clone)]
struct Hook {
    id: HookId,
    before: Option<BeforeHook>,
    after: Option<AfterHook>,
}

/// Bookkeeping for one wrapped pair
struct Interception {
    original: HostFn,
    wrapper: HostFn,
    hooks: Rc<RefCell<Vec<Hook>>>,
}

#[derive(Default)]
struct InterceptorState {
    table: HashMap<(String, String), Interception>,
    next_hook: u64,
}

/// The interception table.
///
/// Cloning gives another handle to the same table, so hooks may capture a
/// handle and wrap or unwrap from inside a call.
#[derive(Clone, Default)]
pub struct Interceptor {
    state: Rc<RefCell<InterceptorState>>,
}

impl fmt::Debug for Interceptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.state.borrow();
        let mut pairs: Vec<String> = state
            .table
            .iter()
            .map(|((target, method), entry)| {
                format!("{target}.{method}({})", entry.hooks.borrow().len())
            })
            .collect();
        pairs.sort();
        f.debug_struct("Interceptor").field("wrapped", &pairs).finish()
    }
}

fn key_for(target: &dyn MethodHost, method: &str) -> (String, String) {
    (target.target_key().to_string(), method.to_string())
}

/// Build the one physical wrapper for a pair.
fn make_wrapper(original: HostFn, hooks: Rc<RefCell<Vec<Hook>>>) -> HostFn {
    Rc::new(move |args: &[Value]| -> Value {
        // Snapshot so hooks can wrap/unwrap (or recurse) while we iterate
        let snapshot: Vec<Hook> = hooks.borrow().clone();

        for hook in &snapshot {
            if let Some(before) = &hook.before
                && let BeforeOutcome::ShortCircuit(value) = before(args)
            {
                return value;
            }
        }

        let mut ret = original(args);

        for hook in &snapshot {
            if let Some(after) = &hook.after
                && let Some(value) = after(&ret, args)
            {
                ret = value;
            }
        }
        ret
    })
}

impl Interceptor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a before/after hook pair on `target.method`.
    ///
    /// The first registration for a pair installs the wrapper; later ones just
    /// append to its hook list.
    pub fn wrap(
        &self,
        target: &dyn MethodHost,
        method: &str,
        before: Option<BeforeHook>,
        after: Option<AfterHook>,
    ) -> Result<HookId> {
        let key = key_for(target, method);

        let (id, wrapper) = {
            let mut state = self.state.borrow_mut();
            let id = HookId(state.next_hook);
            state.next_hook += 1;
            let hook = Hook { id, before, after };

            if let Some(entry) = state.table.get(&key) {
                entry.hooks.borrow_mut().push(hook);
                log::trace!("Added {} to {}.{}()", id, key.0, key.1);
                return Ok(id);
            }

            let original = target
                .method(method)
                .ok_or_else(|| PrivacyError::TargetMissing {
                    target: key.0.clone(),
                    method: key.1.clone(),
                })?;
            let hooks = Rc::new(RefCell::new(vec![hook]));
            let wrapper = make_wrapper(Rc::clone(&original), Rc::clone(&hooks));
            state.table.insert(
                key.clone(),
                Interception {
                    original,
                    wrapper: Rc::clone(&wrapper),
                    hooks,
                },
            );
            (id, wrapper)
        };

        if !target.replace_method(method, wrapper) {
            self.state.borrow_mut().table.remove(&key);
            return Err(PrivacyError::TargetMissing {
                target: key.0,
                method: key.1,
            });
        }
        log::debug!("Wrapped {}.{}()", key.0, key.1);
        Ok(id)
    }

    /// Remove one hook.
    ///
    /// Unknown hooks are a no-op. Removing the last hook restores the original
    /// function when our wrapper is still the installed one. If another party
    /// has layered its own function on top, a non-forced unwrap keeps the
    /// wrapper as an empty pass-through; `force` drops the bookkeeping anyway.
    pub fn unwrap(&self, target: &dyn MethodHost, method: &str, hook: HookId, force: bool) {
        let key = key_for(target, method);

        let entry = {
            let mut state = self.state.borrow_mut();
            let Some(entry) = state.table.get(&key) else {
                log_stale(&key, hook);
                return;
            };
            let now_empty = {
                let mut hooks = entry.hooks.borrow_mut();
                let before = hooks.len();
                hooks.retain(|h| h.id != hook);
                if hooks.len() == before {
                    drop(hooks);
                    log_stale(&key, hook);
                    return;
                }
                hooks.is_empty()
            };
            if !now_empty {
                log::trace!("Removed {} from {}.{}()", hook, key.0, key.1);
                return;
            }
            match state.table.remove(&key) {
                Some(entry) => entry,
                None => return,
            }
        };

        match target.method(method) {
            Some(current) if Rc::ptr_eq(&current, &entry.wrapper) => {
                target.replace_method(method, Rc::clone(&entry.original));
                log::debug!("Restored {}.{}()", key.0, key.1);
            }
            Some(_) if !force => {
                log::warn!(
                    "{}.{}() was wrapped by someone else, leaving our wrapper as pass-through",
                    key.0,
                    key.1
                );
                self.state.borrow_mut().table.insert(key, entry);
            }
            Some(_) => {
                log::debug!("Force unwrap of {}.{}() over a foreign wrapper", key.0, key.1);
            }
            None => {
                log::debug!("{}.{}() is gone, dropping wrapper bookkeeping", key.0, key.1);
            }
        }
    }

    /// Drop every wrapped pair of the given targets. Used at teardown.
    ///
    /// Pass-through entries go too. Where our wrapper is still installed the
    /// original is put back; under a foreign wrapper ours is emptied so it
    /// only forwards.
    pub fn unwrap_all(&self, targets: &[&dyn MethodHost]) {
        for target in targets {
            let entries: Vec<(String, Interception)> = {
                let mut state = self.state.borrow_mut();
                let keys: Vec<(String, String)> = state
                    .table
                    .keys()
                    .filter(|(t, _)| t == target.target_key())
                    .cloned()
                    .collect();
                keys.into_iter()
                    .filter_map(|key| state.table.remove(&key).map(|entry| (key.1, entry)))
                    .collect()
            };
            for (method, entry) in entries {
                entry.hooks.borrow_mut().clear();
                match target.method(&method) {
                    Some(current) if Rc::ptr_eq(&current, &entry.wrapper) => {
                        target.replace_method(&method, Rc::clone(&entry.original));
                        log::debug!("Restored {}.{}()", target.target_key(), method);
                    }
                    _ => log::debug!(
                        "Dropped bookkeeping of {}.{}()",
                        target.target_key(),
                        method
                    ),
                }
            }
        }
    }

    /// Whether a wrapper is installed (or kept as pass-through) for the pair
    pub fn is_wrapped(&self, target: &dyn MethodHost, method: &str) -> bool {
        self.state
            .borrow()
            .table
            .contains_key(&key_for(target, method))
    }

    /// Whether any pair of `target` is still in the table
    pub fn wraps_target(&self, target: &dyn MethodHost) -> bool {
        self.state
            .borrow()
            .table
            .keys()
            .any(|(t, _)| t == target.target_key())
    }

    /// Number of live hooks on the pair
    pub fn hook_count(&self, target: &dyn MethodHost, method: &str) -> usize {
        self.state
            .borrow()
            .table
            .get(&key_for(target, method))
            .map(|entry| entry.hooks.borrow().len())
            .unwrap_or(0)
    }

    /// The original function of a wrapped pair
    pub fn original(&self, target: &dyn MethodHost, method: &str) -> Option<HostFn> {
        self.state
            .borrow()
            .table
            .get(&key_for(target, method))
            .map(|entry| Rc::clone(&entry.original))
    }

    pub fn is_empty(&self) -> bool {
        self.state.borrow().table.is_empty()
    }
}

fn log_stale(key: &(String, String), hook: HookId) {
    let err = PrivacyError::StaleHandle {
        target: key.0.clone(),
        method: key.1.clone(),
        hook,
    };
    log::debug!("{err}");
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::cell::Cell;

    fn adder() -> Rc<HostObject> {
        let obj = HostObject::new("math");
        obj.define("add", |args| {
            json!(args.iter().filter_map(Value::as_i64).sum::<i64>())
        });
        obj
    }

    #[test]
    fn test_wrap_missing_method() {
        let obj = adder();
        let interceptor = Interceptor::new();
        let err = interceptor.wrap(&*obj, "sub", None, None);
        assert!(matches!(err, Err(PrivacyError::TargetMissing { .. })));
        assert!(interceptor.is_empty());
    }

    #[test]
    fn test_before_short_circuit_skips_after() {
        let obj = adder();
        let interceptor = Interceptor::new();
        let after_ran = Rc::new(Cell::new(false));
        let flag = after_ran.clone();
        interceptor
            .wrap(
                &*obj,
                "add",
                Some(Rc::new(|_| BeforeOutcome::ShortCircuit(json!("blocked")))),
                Some(Rc::new(move |_, _| {
                    flag.set(true);
                    None
                })),
            )
            .unwrap();
        assert_eq!(obj.call("add", &[json!(1), json!(2)]), Some(json!("blocked")));
        assert!(!after_ran.get());
    }

    #[test]
    fn test_after_hooks_chain_in_order() {
        let obj = adder();
        let interceptor = Interceptor::new();
        interceptor
            .wrap(
                &*obj,
                "add",
                None,
                Some(Rc::new(|ret, _| ret.as_i64().map(|v| json!(v * 10)))),
            )
            .unwrap();
        interceptor
            .wrap(
                &*obj,
                "add",
                None,
                Some(Rc::new(|ret, _| ret.as_i64().map(|v| json!(v + 1)))),
            )
            .unwrap();
        assert_eq!(obj.call("add", &[json!(1), json!(2)]), Some(json!(31)));
        assert_eq!(interceptor.hook_count(&*obj, "add"), 2);
    }

    #[test]
    fn test_single_hook_restores_original() {
        let obj = adder();
        let original = obj.method("add").unwrap();
        let interceptor = Interceptor::new();
        let id = interceptor.wrap(&*obj, "add", None, None).unwrap();
        assert!(!Rc::ptr_eq(&obj.method("add").unwrap(), &original));
        interceptor.unwrap(&*obj, "add", id, false);
        assert!(Rc::ptr_eq(&obj.method("add").unwrap(), &original));
        assert!(!interceptor.is_wrapped(&*obj, "add"));
    }

    #[test]
    fn test_foreign_wrapper_keeps_pass_through() {
        let obj = adder();
        let interceptor = Interceptor::new();
        let id = interceptor.wrap(&*obj, "add", None, None).unwrap();
        let ours = obj.method("add").unwrap();
        let theirs: HostFn = Rc::new(move |args: &[Value]| ours(args));
        obj.replace_method("add", Rc::clone(&theirs));

        interceptor.unwrap(&*obj, "add", id, false);
        assert!(interceptor.is_wrapped(&*obj, "add"));
        assert_eq!(interceptor.hook_count(&*obj, "add"), 0);
        assert!(Rc::ptr_eq(&obj.method("add").unwrap(), &theirs));
        assert_eq!(obj.call("add", &[json!(2), json!(2)]), Some(json!(4)));

        // a later wrap reuses the dormant wrapper underneath the foreign one
        let doubled = interceptor
            .wrap(
                &*obj,
                "add",
                None,
                Some(Rc::new(|ret, _| ret.as_i64().map(|v| json!(v * 2)))),
            )
            .unwrap();
        assert_eq!(obj.call("add", &[json!(2), json!(2)]), Some(json!(8)));
        interceptor.unwrap(&*obj, "add", doubled, true);
        assert!(!interceptor.is_wrapped(&*obj, "add"));
    }

    #[test]
    fn test_force_unwrap_after_teardown() {
        let obj = adder();
        let interceptor = Interceptor::new();
        let id = interceptor.wrap(&*obj, "add", None, None).unwrap();
        obj.tear_down();
        interceptor.unwrap(&*obj, "add", id, true);
        assert!(interceptor.is_empty());
    }

    #[test]
    fn test_unwrap_all() {
        let obj = adder();
        obj.define("mul", |_| json!(0));
        let add = obj.method("add").unwrap();
        let mul = obj.method("mul").unwrap();
        let interceptor = Interceptor::new();
        interceptor.wrap(&*obj, "add", None, None).unwrap();
        interceptor.wrap(&*obj, "add", None, None).unwrap();
        interceptor.wrap(&*obj, "mul", None, None).unwrap();
        let target: &dyn MethodHost = &*obj;
        interceptor.unwrap_all(&[target]);
        assert!(interceptor.is_empty());
        assert!(Rc::ptr_eq(&obj.method("add").unwrap(), &add));
        assert!(Rc::ptr_eq(&obj.method("mul").unwrap(), &mul));
    }

    #[test]
    fn test_unwrap_all_drops_pass_through() {
        let obj = adder();
        let interceptor = Interceptor::new();
        let id = interceptor
            .wrap(&*obj, "add", Some(Rc::new(|_| BeforeOutcome::ShortCircuit(json!(0)))), None)
            .unwrap();
        let ours = obj.method("add").unwrap();
        let theirs: HostFn = Rc::new(move |args: &[Value]| ours(args));
        obj.replace_method("add", Rc::clone(&theirs));
        interceptor.unwrap(&*obj, "add", id, false);
        interceptor
            .wrap(&*obj, "add", Some(Rc::new(|_| BeforeOutcome::ShortCircuit(json!(0)))), None)
            .unwrap();

        let target: &dyn MethodHost = &*obj;
        interceptor.unwrap_all(&[target]);
        assert!(interceptor.is_empty());
        assert!(!interceptor.is_wrapped(&*obj, "add"));
        // the foreign function stays; our emptied wrapper just forwards
        assert!(Rc::ptr_eq(&obj.method("add").unwrap(), &theirs));
        assert_eq!(obj.call("add", &[json!(2), json!(3)]), Some(json!(5)));
    }
}
