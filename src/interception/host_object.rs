//! Host-owned objects whose methods can be looked up and replaced at runtime.

use super::HostFn;
use serde_json::Value;
use std::cell::{Cell, RefCell};
use std::collections::HashMap;
use std::rc::Rc;
use std::sync::atomic::{AtomicU64, Ordering};

/// Something that owns named, replaceable methods.
///
/// The key must be unique among live targets; the interception table is keyed
/// by `(target_key, method)`.
pub trait MethodHost {
    /// Stable identity of this target
    fn target_key(&self) -> &str;

    /// Currently installed function for `name`, if any
    fn method(&self, name: &str) -> Option<HostFn>;

    /// Install `f` as `name`. Returns `false` when the target can no longer be
    /// modified (e.g. it was torn down).
    fn replace_method(&self, name: &str, f: HostFn) -> bool;
}

static NEXT_OBJECT_SERIAL: AtomicU64 = AtomicU64::new(1);

/// A simple method table used by hosts that expose their functions to the engine.
pub struct HostObject {
    key: String,
    methods: RefCell<HashMap<String, HostFn>>,
    alive: Cell<bool>,
}

impl std::fmt::Debug for HostObject {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HostObject")
            .field("key", &self.key)
            .field("methods", &self.methods.borrow().keys().collect::<Vec<_>>())
            .field("alive", &self.alive.get())
            .finish()
    }
}

impl HostObject {
    /// Create an empty object. `name` is only used for diagnostics.
    pub fn new(name: &str) -> Rc<Self> {
        let serial = NEXT_OBJECT_SERIAL.fetch_add(1, Ordering::Relaxed);
        Rc::new(Self {
            key: format!("{name}#{serial}"),
            methods: RefCell::new(HashMap::new()),
            alive: Cell::new(true),
        })
    }

    /// Define (or redefine) a method
    pub fn define<F>(&self, name: &str, f: F)
    where
        F: Fn(&[Value]) -> Value + 'static,
    {
        self.methods.borrow_mut().insert(name.to_string(), Rc::new(f));
    }

    /// Call a method by name. Returns `None` when it doesn't exist.
    ///
    /// The function is cloned out of the table before it runs, so it may freely
    /// call back into this object or replace its own entry.
    pub fn call(&self, name: &str, args: &[Value]) -> Option<Value> {
        let f = self.method(name)?;
        Some(f(args))
    }

    /// Whether the host has torn this object down
    pub fn is_alive(&self) -> bool {
        self.alive.get()
    }

    /// Simulate host teardown: all methods disappear and further replacement fails
    pub fn tear_down(&self) {
        self.alive.set(false);
        self.methods.borrow_mut().clear();
    }
}

impl MethodHost for HostObject {
    fn target_key(&self) -> &str {
        &self.key
    }

    fn method(&self, name: &str) -> Option<HostFn> {
        self.methods.borrow().get(name).cloned()
    }

    fn replace_method(&self, name: &str, f: HostFn) -> bool {
        if !self.alive.get() {
            return false;
        }
        self.methods.borrow_mut().insert(name.to_string(), f);
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_define_and_call() {
        let obj = HostObject::new("utils");
        obj.define("double", |args| json!(args[0].as_i64().unwrap_or(0) * 2));
        assert_eq!(obj.call("double", &[json!(21)]), Some(json!(42)));
        assert_eq!(obj.call("missing", &[]), None);
    }

    #[test]
    fn test_keys_are_unique() {
        let a = HostObject::new("gBrowser");
        let b = HostObject::new("gBrowser");
        assert_ne!(a.target_key(), b.target_key());
    }

    #[test]
    fn test_tear_down_blocks_replacement() {
        let obj = HostObject::new("window");
        obj.define("close", |_| Value::Null);
        obj.tear_down();
        assert!(obj.method("close").is_none());
        assert!(!obj.replace_method("close", Rc::new(|_: &[Value]| Value::Null)));
    }
}
