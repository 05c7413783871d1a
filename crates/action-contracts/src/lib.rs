//! Action Contracts
//!
//! Declarative input/output contracts for single-responsibility pipeline
//! actions. An action declares what data it **expects** before it runs and
//! what data it **assures** after it runs; the contracts are enforced by
//! hooks around the action body, and every failed field becomes a
//! [`Breach`] handed to the action's consequence handlers.
//!
//! ## Architecture
//!
//! 1. **Schema** (`schema/`): immutable, composable rule sets over named
//!    fields. Extending a schema produces a new one.
//!
//! 2. **Enforcer** (`enforcer`): validates a data snapshot against a schema
//!    and dispatches breaches to consequence handlers.
//!
//! 3. **Declaration** (`declaration`): per-action registry of expectations,
//!    assurances and consequences.
//!
//! 4. **Hooks** (`hooks`): installs exactly one before-hook and one
//!    after-hook per action, reading the latest contracts when fired.
//!
//! 5. **Host** (`host`): the boundary to the action runtime.
//!    [`Runtime`] (`runtime/`) is the bundled implementation.
//!
//! ## Breach handling
//!
//! Without any `on_breach` handler, a breach fails the invocation with no
//! message. Registering a handler replaces that default entirely:
//!
//! ```
//! use action_contracts::{Action, Context, ContractRegistry, RuleBlock, Runtime};
//!
//! struct SavePerson;
//!
//! impl Action for SavePerson {
//!     fn execute(&self, context: &mut Context) {
//!         context.insert("person", serde_json::Value::Null);
//!     }
//! }
//!
//! # fn main() -> action_contracts::Result<()> {
//! let mut runtime = Runtime::new();
//! runtime.register(SavePerson);
//!
//! let mut contracts: ContractRegistry<Context> = ContractRegistry::new();
//! contracts
//!     .declare::<SavePerson, _>(&mut runtime)?
//!     .assures(RuleBlock::new().required("person", |f| f.filled()))
//!     .on_breach(|ctx, breaches| {
//!         ctx.fail_with_message(format!("{} was not produced", breaches[0].property()));
//!     });
//!
//! let ctx = runtime.run::<SavePerson>(Context::new())?;
//! assert_eq!(ctx.message(), Some("person was not produced"));
//! # Ok(())
//! # }
//! ```

pub mod breach;
pub mod config;
pub mod declaration;
pub mod enforcer;
pub mod error;
mod hooks;
pub mod host;
pub mod runtime;
pub mod schema;

pub use breach::Breach;
pub use config::{EnforcementConfig, EnforcementConfigBuilder};
pub use declaration::{
    ActionContracts, ContractKind, ContractRegistry, Declaration, HookFlags, SharedContracts,
};
pub use enforcer::{default_consequence, Consequence, Enforcer};
pub use error::{ContractError, Result};
pub use host::{ActionContext, ActionId, Hook, HookHost, Snapshot};
pub use runtime::{Action, Context, Outcome, Runtime};
pub use schema::{FieldSpec, Messages, Rule, RuleBlock, Schema, ValidationOutcome};
