//! Context-local registry of invocable callbacks.
//!
//! Each function prop a component passes downward is registered here under
//! a method key and replaced on the wire by an opaque method-reference
//! marker. The key construction is part of the protocol and must be
//! reproduced exactly for interoperability:
//! - `method::body::ownerId` for callbacks owned by a root caller,
//! - `method::ownerId` for callbacks owned by a nested component,
//! - `body::componentId` for function-valued call arguments.
//!
//! Entries are never evicted: a component may invoke a closure-captured
//! callback an unbounded number of times for the context's lifetime.

use std::collections::BTreeMap;

use crate::component_id::ComponentId;
use crate::node::CallbackFn;

/// Separator between key segments.
pub const KEY_SEPARATOR: &str = "::";

/// Method key for a callback owned by a root caller (responds to the host
/// directly). Includes the function's textual identity to distinguish
/// call sites.
pub fn dom_callback_key(method: &str, body: &str, owner: &ComponentId) -> String {
    format!("{method}{KEY_SEPARATOR}{body}{KEY_SEPARATOR}{owner}")
}

/// Method key for a callback owned by a nested component.
pub fn component_callback_key(method: &str, owner: &ComponentId) -> String {
    format!("{method}{KEY_SEPARATOR}{owner}")
}

/// Method key for a function-valued argument inside a callback invocation.
pub fn argument_callback_key(body: &str, component: &ComponentId) -> String {
    format!("{body}{KEY_SEPARATOR}{component}")
}

/// Mapping from method key to the live function, scoped to one container.
#[derive(Clone, Default)]
pub struct CallbackRegistry {
    entries: BTreeMap<String, CallbackFn>,
}

impl CallbackRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a callback under its method key. Re-registration replaces
    /// the previous entry: a later render pass supersedes earlier closures
    /// declared at the same call site.
    pub fn register(&mut self, key: impl Into<String>, func: CallbackFn) {
        self.entries.insert(key.into(), func);
    }

    pub fn get(&self, key: &str) -> Option<&CallbackFn> {
        self.entries.get(key)
    }

    pub fn contains(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl std::fmt::Debug for CallbackRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CallbackRegistry")
            .field("keys", &self.entries.keys().collect::<Vec<_>>())
            .finish()
    }
}
