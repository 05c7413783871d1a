//! Host runtime boundary
//!
//! The contract layer does not execute actions itself. It relies on a host
//! runtime that can tell which types are actions, register before/after
//! hooks for them, and hand each hook the invocation's mutable context.
//! The host also owns the per-action contract state, so every registry
//! declaring on the same host sees the same schemas and installed hooks.
//! [`crate::runtime::Runtime`] is the reference host shipped with this crate.

use std::any::TypeId;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

use crate::declaration::SharedContracts;

/// Read-only view of the invocation data handed to validators
pub type Snapshot = serde_json::Map<String, serde_json::Value>;

/// Callback run by the host immediately before or after an action body
pub type Hook<C> = Arc<dyn Fn(&mut C) + Send + Sync>;

/// Identity of an action type
///
/// Equality and hashing use the [`TypeId`] only; the name is kept for
/// diagnostics.
#[derive(Clone, Copy)]
pub struct ActionId {
    type_id: TypeId,
    name: &'static str,
}

impl ActionId {
    /// Identity of the action type `A`
    pub fn of<A: ?Sized + 'static>() -> Self {
        Self {
            type_id: TypeId::of::<A>(),
            name: std::any::type_name::<A>(),
        }
    }

    /// Fully qualified type name
    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Type name without its module path
    pub fn short_name(&self) -> &'static str {
        let base = self.name.split('<').next().unwrap_or(self.name);
        base.rsplit("::").next().unwrap_or(base)
    }

    /// Underlying type identity
    pub fn type_id(&self) -> TypeId {
        self.type_id
    }
}

impl PartialEq for ActionId {
    fn eq(&self, other: &Self) -> bool {
        self.type_id == other.type_id
    }
}

impl Eq for ActionId {}

impl Hash for ActionId {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.type_id.hash(state);
    }
}

impl fmt::Debug for ActionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ActionId({})", self.name)
    }
}

impl fmt::Display for ActionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.short_name())
    }
}

/// The per-invocation context a host passes to hooks
pub trait ActionContext {
    /// Snapshot of the current data as a map
    fn snapshot(&self) -> Snapshot;

    /// Mark the invocation as failed, optionally with a message
    ///
    /// A failed invocation runs no further hooks and no action body.
    fn fail(&mut self, message: Option<String>);

    /// Whether the invocation has been marked as failed
    fn is_failure(&self) -> bool;
}

/// A runtime that executes actions and lets callers hook around them
pub trait HookHost {
    /// Context type handed to hooks
    type Context: ActionContext;

    /// Capability check: whether `action` is a valid action for this host
    fn is_action(&self, action: &ActionId) -> bool;

    /// Contract state for `action`, created on first request
    ///
    /// Must return the same state for every call with the same action.
    fn contracts(&mut self, action: &ActionId) -> SharedContracts<Self::Context>;

    /// Register a hook that runs before the action body
    ///
    /// Returns `false` if the host did not install the hook.
    fn before(&mut self, action: &ActionId, hook: Hook<Self::Context>) -> bool;

    /// Register a hook that runs after the action body
    ///
    /// Returns `false` if the host did not install the hook.
    fn after(&mut self, action: &ActionId, hook: Hook<Self::Context>) -> bool;
}
