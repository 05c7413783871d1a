//! Contract declaration API
//!
//! Contracts are kept in a side table keyed by action type, rather than on
//! the action itself. Each action gets two schemas (expectations checked
//! before the body, assurances checked after it) and an ordered list of
//! consequence handlers. The table belongs to the host (see
//! [`HookHost::contracts`]); a [`ContractRegistry`] is a view onto it, so
//! several registries declaring on one host extend the same contracts and
//! share one before-hook and one after-hook per action.
//!
//! ```
//! use action_contracts::{Action, Context, ContractRegistry, RuleBlock, Runtime};
//!
//! struct Greet;
//!
//! impl Action for Greet {
//!     fn execute(&self, context: &mut Context) {
//!         let name = context.get_str("name").unwrap_or_default().to_string();
//!         context.insert("greeting", format!("Hello, {}", name));
//!     }
//! }
//!
//! # fn main() -> action_contracts::Result<()> {
//! let mut runtime = Runtime::new();
//! runtime.register(Greet);
//!
//! let mut contracts: ContractRegistry<Context> = ContractRegistry::new();
//! contracts
//!     .declare::<Greet, _>(&mut runtime)?
//!     .expects(RuleBlock::new().required("name", |f| f.filled()))
//!     .assures(RuleBlock::new().required("greeting", |f| f.filled()));
//!
//! let ctx = runtime.run::<Greet>(Context::new().with("name", "Billy"))?;
//! assert!(ctx.is_success());
//!
//! let ctx = runtime.run::<Greet>(Context::new().with("first_name", "Billy"))?;
//! assert!(ctx.is_failure());
//! # Ok(())
//! # }
//! ```

use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use crate::breach::Breach;
use crate::config::EnforcementConfig;
use crate::enforcer::{default_consequence, Consequence, Enforcer};
use crate::error::{ContractError, Result};
use crate::hooks;
use crate::host::{ActionContext, ActionId, HookHost};
use crate::schema::{RuleBlock, Schema};

/// The two contracts an action can declare
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ContractKind {
    /// Preconditions, checked before the action body
    Expectations,
    /// Postconditions, checked after the action body
    Assurances,
}

impl fmt::Display for ContractKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ContractKind::Expectations => write!(f, "expectations"),
            ContractKind::Assurances => write!(f, "assurances"),
        }
    }
}

/// Which hooks have been installed for an action
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct HookFlags {
    pub expectations: bool,
    pub assurances: bool,
}

impl HookFlags {
    /// Whether the hook enforcing `kind` is installed
    pub fn is_installed(&self, kind: ContractKind) -> bool {
        match kind {
            ContractKind::Expectations => self.expectations,
            ContractKind::Assurances => self.assurances,
        }
    }
}

/// Contract state for one action type
pub struct ActionContracts<C> {
    expectations: Schema,
    assurances: Schema,
    consequences: Vec<Consequence<C>>,
    hooks: HookFlags,
}

impl<C: ActionContext + 'static> ActionContracts<C> {
    fn new() -> Self {
        Self {
            expectations: Schema::empty(),
            assurances: Schema::empty(),
            consequences: Vec::new(),
            hooks: HookFlags::default(),
        }
    }

    /// Schema currently in effect for `kind`
    pub fn schema(&self, kind: ContractKind) -> &Schema {
        match kind {
            ContractKind::Expectations => &self.expectations,
            ContractKind::Assurances => &self.assurances,
        }
    }

    /// Preconditions
    pub fn expectations(&self) -> &Schema {
        &self.expectations
    }

    /// Postconditions
    pub fn assurances(&self) -> &Schema {
        &self.assurances
    }

    /// Handlers registered with `on_breach`, in registration order
    pub fn consequences(&self) -> &[Consequence<C>] {
        &self.consequences
    }

    /// Registered handlers, or the default consequence when none are registered
    pub fn effective_consequences(&self) -> Vec<Consequence<C>> {
        if self.consequences.is_empty() {
            vec![default_consequence()]
        } else {
            self.consequences.clone()
        }
    }

    /// Installed hook flags
    pub fn hooks(&self) -> HookFlags {
        self.hooks
    }

    fn extend(&mut self, kind: ContractKind, block: RuleBlock) {
        let schema = match kind {
            ContractKind::Expectations => &mut self.expectations,
            ContractKind::Assurances => &mut self.assurances,
        };
        *schema = schema.extend(block);
    }

    /// Set the hook flag for `kind`, returning whether it was newly set
    pub(crate) fn mark_hook_installed(&mut self, kind: ContractKind) -> bool {
        let flag = match kind {
            ContractKind::Expectations => &mut self.hooks.expectations,
            ContractKind::Assurances => &mut self.hooks.assurances,
        };
        !std::mem::replace(flag, true)
    }
}

impl<C: ActionContext + 'static> Default for ActionContracts<C> {
    fn default() -> Self {
        Self::new()
    }
}

impl<C> fmt::Debug for ActionContracts<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ActionContracts")
            .field("expectations", &self.expectations)
            .field("assurances", &self.assurances)
            .field("consequences", &self.consequences.len())
            .field("hooks", &self.hooks)
            .finish()
    }
}

/// Contract state for one action, shared by the host, its registries and
/// the installed hooks
pub type SharedContracts<C> = Arc<RwLock<ActionContracts<C>>>;

pub(crate) fn read<C>(contracts: &SharedContracts<C>) -> RwLockReadGuard<'_, ActionContracts<C>> {
    contracts.read().unwrap_or_else(PoisonError::into_inner)
}

pub(crate) fn write<C>(contracts: &SharedContracts<C>) -> RwLockWriteGuard<'_, ActionContracts<C>> {
    contracts.write().unwrap_or_else(PoisonError::into_inner)
}

/// Per-type registry of action contracts
pub struct ContractRegistry<C> {
    entries: HashMap<ActionId, SharedContracts<C>>,
    enforcer: Enforcer,
}

impl<C: ActionContext + 'static> Default for ContractRegistry<C> {
    fn default() -> Self {
        Self::new()
    }
}

impl<C: ActionContext + 'static> ContractRegistry<C> {
    /// Create a registry with the default enforcement configuration
    pub fn new() -> Self {
        Self::with_config(EnforcementConfig::default())
    }

    /// Create a registry with a custom enforcement configuration
    pub fn with_config(config: EnforcementConfig) -> Self {
        Self {
            entries: HashMap::new(),
            enforcer: Enforcer::new(config),
        }
    }

    /// Enforcer shared by every hook this registry installs
    pub fn enforcer(&self) -> &Enforcer {
        &self.enforcer
    }

    /// Start declaring contracts for the action type `A`
    ///
    /// The contracts themselves live on `host`; declarations made through
    /// other registries on the same host extend the same schemas.
    /// # Errors
    ///
    /// Returns [`ContractError::NotAnAction`] if `host` does not recognise
    /// `A` as an action.
    pub fn declare<'h, A, H>(&mut self, host: &'h mut H) -> Result<Declaration<'h, C, H>>
    where
        A: ?Sized + 'static,
        H: HookHost<Context = C>,
    {
        self.declare_id(host, ActionId::of::<A>())
    }

    /// Start declaring contracts for an action identified at run time
    ///
    /// # Errors
    ///
    /// Returns [`ContractError::NotAnAction`] if `host` does not recognise
    /// `action` as an action.
    pub fn declare_id<'h, H>(&mut self, host: &'h mut H, action: ActionId) -> Result<Declaration<'h, C, H>>
    where
        H: HookHost<Context = C>,
    {
        if !host.is_action(&action) {
            tracing::error!(action = %action, "Contracts declared on a type that is not an action");
            return Err(ContractError::not_an_action(action.name()));
        }

        let contracts = host.contracts(&action);
        if self.entries.insert(action, Arc::clone(&contracts)).is_none() {
            tracing::debug!(action = %action, "Tracking action contracts");
        }

        Ok(Declaration {
            action,
            contracts,
            host,
            enforcer: self.enforcer.clone(),
        })
    }

    /// Whether contracts have been declared for `action`
    pub fn is_declared(&self, action: &ActionId) -> bool {
        self.entries.contains_key(action)
    }

    /// Current preconditions for `action`
    pub fn expectations(&self, action: &ActionId) -> Option<Schema> {
        self.entries.get(action).map(|c| read(c).expectations().clone())
    }

    /// Current postconditions for `action`
    pub fn assurances(&self, action: &ActionId) -> Option<Schema> {
        self.entries.get(action).map(|c| read(c).assurances().clone())
    }

    /// Handlers registered for `action`
    pub fn consequences(&self, action: &ActionId) -> Option<Vec<Consequence<C>>> {
        self.entries.get(action).map(|c| read(c).consequences().to_vec())
    }

    /// Handlers that will run on a breach of `action`'s contracts
    pub fn effective_consequences(&self, action: &ActionId) -> Option<Vec<Consequence<C>>> {
        self.entries.get(action).map(|c| read(c).effective_consequences())
    }

    /// Hook flags for `action`
    pub fn hooks(&self, action: &ActionId) -> Option<HookFlags> {
        self.entries.get(action).map(|c| read(c).hooks())
    }
}

impl<C> fmt::Debug for ContractRegistry<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ContractRegistry")
            .field("actions", &self.entries.keys().collect::<Vec<_>>())
            .field("enforcer", &self.enforcer)
            .finish()
    }
}

/// Handle for declaring one action's contracts
///
/// Every declaration is applied immediately; the handle can be dropped at
/// any time.
pub struct Declaration<'h, C, H> {
    action: ActionId,
    contracts: SharedContracts<C>,
    host: &'h mut H,
    enforcer: Enforcer,
}

impl<'h, C, H> Declaration<'h, C, H>
where
    C: ActionContext + 'static,
    H: HookHost<Context = C>,
{
    /// Action this handle declares contracts for
    pub fn action(&self) -> ActionId {
        self.action
    }

    /// Add preconditions and make sure the before-hook is installed
    pub fn expects(&mut self, block: RuleBlock) -> &mut Self {
        self.extend(ContractKind::Expectations, block);
        hooks::ensure_before_hook(&mut *self.host, &self.action, &self.contracts, &self.enforcer);
        self
    }

    /// Add postconditions and make sure the after-hook is installed
    pub fn assures(&mut self, block: RuleBlock) -> &mut Self {
        self.extend(ContractKind::Assurances, block);
        hooks::ensure_after_hook(&mut *self.host, &self.action, &self.contracts, &self.enforcer);
        self
    }

    /// Append a consequence handler
    ///
    /// Once any handler is registered, the default consequence no longer runs.
    pub fn on_breach<F>(&mut self, handler: F) -> &mut Self
    where
        F: Fn(&mut C, &[Breach]) + Send + Sync + 'static,
    {
        let mut contracts = write(&self.contracts);
        contracts.consequences.push(Arc::new(handler));
        tracing::debug!(
            action = %self.action,
            handlers = contracts.consequences.len(),
            "Registered breach consequence"
        );
        drop(contracts);
        self
    }

    /// Current preconditions
    pub fn expectations(&self) -> Schema {
        read(&self.contracts).expectations().clone()
    }

    /// Current postconditions
    pub fn assurances(&self) -> Schema {
        read(&self.contracts).assurances().clone()
    }

    /// Registered handlers
    pub fn consequences(&self) -> Vec<Consequence<C>> {
        read(&self.contracts).consequences().to_vec()
    }

    /// Registered handlers, or the default consequence
    pub fn effective_consequences(&self) -> Vec<Consequence<C>> {
        read(&self.contracts).effective_consequences()
    }

    fn extend(&mut self, kind: ContractKind, block: RuleBlock) {
        let mut contracts = write(&self.contracts);
        contracts.extend(kind, block);
        tracing::trace!(
            action = %self.action,
            kind = %kind,
            version = contracts.schema(kind).version(),
            rules = contracts.schema(kind).rule_count(),
            "Extended contract"
        );
    }
}
