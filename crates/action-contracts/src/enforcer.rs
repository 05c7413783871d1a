//! Contract enforcement
//!
//! Runs a schema against a data snapshot and, on failure, turns the
//! validator's messages into [`Breach`] records and dispatches them to the
//! consequence handlers. The enforcer never fails the invocation itself;
//! only handlers do.

use std::sync::Arc;

use crate::breach::Breach;
use crate::config::EnforcementConfig;
use crate::host::{ActionContext, Snapshot};
use crate::schema::Schema;

/// Handler invoked with every breach from one failed enforcement
///
/// Receives the running invocation's context explicitly so it can fail the
/// invocation, record a reason, or compensate for side effects.
pub type Consequence<C> = Arc<dyn Fn(&mut C, &[Breach]) + Send + Sync>;

/// The implicit consequence used when an action registers none:
/// fail the invocation without a message.
pub fn default_consequence<C: ActionContext + 'static>() -> Consequence<C> {
    Arc::new(|context: &mut C, _breaches: &[Breach]| context.fail(None))
}

/// Validates snapshots and dispatches breaches
#[derive(Debug, Clone, Default)]
pub struct Enforcer {
    config: Arc<EnforcementConfig>,
}

impl Enforcer {
    /// Create an enforcer with the given configuration
    pub fn new(config: EnforcementConfig) -> Self {
        Self {
            config: Arc::new(config),
        }
    }

    /// Active configuration
    pub fn config(&self) -> &EnforcementConfig {
        &self.config
    }

    /// Validate `snapshot` against `schema` and dispatch any breaches
    ///
    /// Handlers run in order, each receiving the full breach list. With
    /// `halt_on_failure` enabled, dispatch stops as soon as a handler leaves
    /// the context failed. Returns the breaches that were dispatched (empty
    /// when the contract holds).
    pub fn enforce<C: ActionContext>(
        &self,
        schema: &Schema,
        snapshot: &Snapshot,
        consequences: &[Consequence<C>],
        context: &mut C,
    ) -> Vec<Breach> {
        let outcome = schema.validate(snapshot);

        if outcome.is_success() {
            if self.config.log_passes {
                tracing::debug!(rules = schema.rule_count(), "Contract satisfied");
            }
            return Vec::new();
        }

        let breaches = Breach::from_messages(outcome.messages());

        if self.config.log_breaches {
            tracing::warn!(
                breaches = breaches.len(),
                property = breaches.first().map(Breach::property).unwrap_or_default(),
                "Contract breached"
            );
        }

        if self.config.halt_on_failure && context.is_failure() {
            tracing::debug!("Invocation already failed, skipping consequences");
            return breaches;
        }

        for (index, consequence) in consequences.iter().enumerate() {
            consequence(context, &breaches);

            if self.config.halt_on_failure && context.is_failure() {
                let skipped = consequences.len() - index - 1;
                if skipped > 0 {
                    tracing::debug!(skipped, "Invocation failed, skipping remaining consequences");
                }
                break;
            }
        }

        breaches
    }
}
