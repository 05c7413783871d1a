//! Hook installer
//!
//! Installs at most one before-hook (expectations) and one after-hook
//! (assurances) per action, no matter how many times contracts are
//! declared. Installed hooks hold the shared contract state, not a copy of
//! the schema, so rules declared after installation are still enforced.

use std::sync::Arc;

use crate::declaration::{read, write, ContractKind, SharedContracts};
use crate::enforcer::Enforcer;
use crate::host::{ActionContext, ActionId, Hook, HookHost};

/// Install the expectations hook for `action` unless it is already installed
pub(crate) fn ensure_before_hook<H>(
    host: &mut H,
    action: &ActionId,
    contracts: &SharedContracts<H::Context>,
    enforcer: &Enforcer,
) where
    H: HookHost,
    H::Context: 'static,
{
    ensure_hook(host, action, ContractKind::Expectations, contracts, enforcer);
}

/// Install the assurances hook for `action` unless it is already installed
pub(crate) fn ensure_after_hook<H>(
    host: &mut H,
    action: &ActionId,
    contracts: &SharedContracts<H::Context>,
    enforcer: &Enforcer,
) where
    H: HookHost,
    H::Context: 'static,
{
    ensure_hook(host, action, ContractKind::Assurances, contracts, enforcer);
}

fn ensure_hook<H>(
    host: &mut H,
    action: &ActionId,
    kind: ContractKind,
    contracts: &SharedContracts<H::Context>,
    enforcer: &Enforcer,
) where
    H: HookHost,
    H::Context: 'static,
{
    if read(contracts).hooks().is_installed(kind) {
        return;
    }

    let hook = contract_hook(*action, kind, Arc::clone(contracts), enforcer.clone());
    let accepted = match kind {
        ContractKind::Expectations => host.before(action, hook),
        ContractKind::Assurances => host.after(action, hook),
    };

    // Only an accepted hook counts, so a later declaration retries
    if !accepted {
        tracing::warn!(action = %action, kind = %kind, "Host rejected contract hook");
        return;
    }

    write(contracts).mark_hook_installed(kind);
    tracing::debug!(action = %action, kind = %kind, "Installed contract hook");
}

/// Build the hook that enforces `kind` for `action`
///
/// The schema and handlers are read when the hook fires.
fn contract_hook<C>(
    action: ActionId,
    kind: ContractKind,
    contracts: SharedContracts<C>,
    enforcer: Enforcer,
) -> Hook<C>
where
    C: ActionContext + 'static,
{
    Arc::new(move |context: &mut C| {
        let span = tracing::debug_span!("contract", action = %action, kind = %kind);
        let _enter = span.enter();

        let (schema, consequences) = {
            let state = read(&contracts);
            (state.schema(kind).clone(), state.effective_consequences())
        };

        let snapshot = context.snapshot();
        enforcer.enforce(&schema, &snapshot, &consequences, context);
    })
}
