//! Reference host runtime
//!
//! A small, synchronous action pipeline: each registered [`Action`] is a
//! step with an ordered list of before-hooks and after-hooks. Steps share a
//! single [`Context`] and stop at the first failure.
//!
//! Step execution order:
//!
//! 1. A context that already failed (or asked to skip remaining steps) is
//!    passed through untouched.
//! 2. Before-hooks run in registration order; a failure stops the step.
//! 3. The action body runs.
//! 4. After-hooks run in registration order unless the context has failed.
//!
//! The runtime also keeps the contract side table for its actions, keyed
//! by [`ActionId`].

pub mod context;

pub use context::{Context, Outcome};

use std::collections::HashMap;
use std::sync::Arc;

use crate::declaration::SharedContracts;
use crate::error::{ContractError, Result};
use crate::host::{ActionId, Hook, HookHost};

/// A single-responsibility pipeline step
pub trait Action: Send + Sync + 'static {
    /// Run the step against the shared context
    fn execute(&self, context: &mut Context);
}

struct Step {
    action: Arc<dyn Action>,
    before: Vec<Hook<Context>>,
    after: Vec<Hook<Context>>,
}

/// Registry and executor for actions
#[derive(Default)]
pub struct Runtime {
    steps: HashMap<ActionId, Step>,
    contracts: HashMap<ActionId, SharedContracts<Context>>,
}

impl Runtime {
    /// Create an empty runtime
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an action type, returning its identity
    ///
    /// Registering the same type again replaces its body and keeps any
    /// hooks already installed.
    pub fn register<A: Action>(&mut self, action: A) -> ActionId {
        let id = ActionId::of::<A>();
        let action: Arc<dyn Action> = Arc::new(action);

        match self.steps.get_mut(&id) {
            Some(step) => step.action = action,
            None => {
                self.steps.insert(
                    id,
                    Step {
                        action,
                        before: Vec::new(),
                        after: Vec::new(),
                    },
                );
            }
        }

        tracing::debug!(action = %id, "Registered action");
        id
    }

    /// Whether `action` has been registered
    pub fn is_registered(&self, action: &ActionId) -> bool {
        self.steps.contains_key(action)
    }

    /// Number of before-hooks installed for `action`
    pub fn before_hook_count(&self, action: &ActionId) -> usize {
        self.steps.get(action).map(|s| s.before.len()).unwrap_or(0)
    }

    /// Number of after-hooks installed for `action`
    pub fn after_hook_count(&self, action: &ActionId) -> usize {
        self.steps.get(action).map(|s| s.after.len()).unwrap_or(0)
    }

    /// Run the action type `A` as a single step
    pub fn run<A: Action>(&self, context: Context) -> Result<Context> {
        self.run_step(&ActionId::of::<A>(), context)
    }

    /// Run one registered step
    pub fn run_step(&self, action: &ActionId, mut context: Context) -> Result<Context> {
        let step = self
            .steps
            .get(action)
            .ok_or_else(|| ContractError::unknown_action(action.name()))?;

        if context.is_failure() || context.is_skip_remaining() {
            tracing::trace!(action = %action, "Skipping step");
            return Ok(context);
        }

        tracing::debug!(
            action = %action,
            invocation_id = %context.invocation_id(),
            "Running action"
        );

        for hook in &step.before {
            hook(&mut context);
            if context.is_failure() {
                return Ok(context);
            }
        }

        step.action.execute(&mut context);
        if context.is_failure() {
            return Ok(context);
        }

        for hook in &step.after {
            hook(&mut context);
            if context.is_failure() {
                break;
            }
        }

        Ok(context)
    }

    /// Run steps in order, stopping at the first failure or skip request
    pub fn reduce(&self, steps: &[ActionId], mut context: Context) -> Result<Context> {
        for action in steps {
            context = self.run_step(action, context)?;
            if context.is_failure() || context.is_skip_remaining() {
                break;
            }
        }
        Ok(context)
    }

    fn step_mut(&mut self, action: &ActionId) -> Option<&mut Step> {
        let step = self.steps.get_mut(action);
        if step.is_none() {
            tracing::warn!(action = %action, "Ignoring hook for unregistered action");
        }
        step
    }
}

impl HookHost for Runtime {
    type Context = Context;

    fn is_action(&self, action: &ActionId) -> bool {
        self.is_registered(action)
    }

    fn contracts(&mut self, action: &ActionId) -> SharedContracts<Context> {
        Arc::clone(self.contracts.entry(*action).or_default())
    }

    fn before(&mut self, action: &ActionId, hook: Hook<Context>) -> bool {
        match self.step_mut(action) {
            Some(step) => {
                step.before.push(hook);
                true
            }
            None => false,
        }
    }

    fn after(&mut self, action: &ActionId, hook: Hook<Context>) -> bool {
        match self.step_mut(action) {
            Some(step) => {
                step.after.push(hook);
                true
            }
            None => false,
        }
    }
}
