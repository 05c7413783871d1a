//! Integration tests for action contracts
//!
//! Exercises the full path from declaration through hook installation to
//! enforcement inside the bundled runtime:
//! - Expectations blocking the action body
//! - Assurances flagging bad output after the body ran
//! - Default and custom breach consequences
//! - Idempotent hook installation
//! - Configuration errors for non-actions

use action_contracts::{
    Action, ActionId, Breach, Context, ContractError, ContractRegistry, EnforcementConfig,
    RuleBlock, Runtime,
};
use serde_json::{json, Value};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

/// Greets by name; records that the body ran
struct Greet;

impl Action for Greet {
    fn execute(&self, context: &mut Context) {
        let greeting = format!("Hello, {}", context.get_str("name").unwrap_or_default());
        context.insert("greeting", greeting);
        context.insert("executed", true);
    }
}

/// Pretends to persist a person but loses it
struct SavePerson;

impl Action for SavePerson {
    fn execute(&self, context: &mut Context) {
        context.insert("saved", true);
        context.insert("person", Value::Null);
    }
}

/// Uppercases the greeting
struct Shout;

impl Action for Shout {
    fn execute(&self, context: &mut Context) {
        let loud = context.get_str("greeting").map(str::to_uppercase);
        if let Some(loud) = loud {
            context.insert("greeting", loud);
        }
    }
}

/// Never registered with the runtime
struct PlainStruct;

fn name_contract() -> RuleBlock {
    RuleBlock::new().required("name", |f| f.filled())
}

fn setup() -> (Runtime, ContractRegistry<Context>) {
    init_tracing();
    let mut runtime = Runtime::new();
    runtime.register(Greet);
    runtime.register(SavePerson);
    runtime.register(Shout);
    (runtime, ContractRegistry::new())
}

/// Handler that records every breach list it sees and then fails the invocation
fn recording(store: Arc<Mutex<Vec<Vec<Breach>>>>) -> impl Fn(&mut Context, &[Breach]) + Send + Sync {
    move |ctx: &mut Context, breaches: &[Breach]| {
        store.lock().unwrap().push(breaches.to_vec());
        ctx.fail(None);
    }
}

#[test]
fn test_missing_expectation_blocks_body() {
    let (mut runtime, mut registry) = setup();
    let seen = Arc::new(Mutex::new(Vec::new()));

    registry
        .declare::<Greet, _>(&mut runtime)
        .unwrap()
        .expects(name_contract())
        .on_breach(recording(seen.clone()));

    let ctx = runtime
        .run::<Greet>(Context::new().with("first_name", "Billy"))
        .unwrap();

    assert!(ctx.is_failure());
    assert!(!ctx.contains_key("executed"));

    let seen = seen.lock().unwrap();
    assert_eq!(seen.len(), 1);
    assert_eq!(seen[0].len(), 1);
    assert_eq!(seen[0][0].property(), "name");
    assert!(!seen[0][0].messages().is_empty());
}

#[test]
fn test_satisfied_expectation_runs_body() {
    let (mut runtime, mut registry) = setup();
    let seen = Arc::new(Mutex::new(Vec::new()));

    registry
        .declare::<Greet, _>(&mut runtime)
        .unwrap()
        .expects(name_contract())
        .on_breach(recording(seen.clone()));

    let ctx = runtime.run::<Greet>(Context::new().with("name", "Billy")).unwrap();

    assert!(ctx.is_success());
    assert_eq!(ctx.get_str("greeting"), Some("Hello, Billy"));
    assert!(seen.lock().unwrap().is_empty());
}

#[test]
fn test_default_consequence_fails_without_message() {
    let (mut runtime, mut registry) = setup();

    registry
        .declare::<Greet, _>(&mut runtime)
        .unwrap()
        .expects(name_contract());

    let ctx = runtime.run::<Greet>(Context::new()).unwrap();
    assert!(ctx.is_failure());
    assert_eq!(ctx.message(), None);
    assert!(!ctx.contains_key("executed"));
}

#[test]
fn test_assurance_breach_after_body_ran() {
    let (mut runtime, mut registry) = setup();
    let seen = Arc::new(Mutex::new(Vec::new()));

    registry
        .declare::<SavePerson, _>(&mut runtime)
        .unwrap()
        .assures(RuleBlock::new().required("person", |f| f.filled()))
        .on_breach(recording(seen.clone()));

    let ctx = runtime.run::<SavePerson>(Context::new()).unwrap();

    // The body's side effects are not rolled back
    assert_eq!(ctx.get("saved"), Some(&json!(true)));
    assert!(ctx.is_failure());

    let seen = seen.lock().unwrap();
    assert_eq!(seen.len(), 1);
    assert_eq!(seen[0][0].property(), "person");
    assert_eq!(seen[0][0].messages(), ["must be filled"]);
}

#[test]
fn test_assurance_with_default_consequence() {
    let (mut runtime, mut registry) = setup();

    registry
        .declare::<SavePerson, _>(&mut runtime)
        .unwrap()
        .assures(RuleBlock::new().required("person", |f| f.filled()));

    let ctx = runtime.run::<SavePerson>(Context::new()).unwrap();
    assert!(ctx.is_failure());
    assert_eq!(ctx.message(), None);
}

#[test]
fn test_repeated_expects_install_one_hook() {
    let (mut runtime, mut registry) = setup();
    let id = ActionId::of::<Greet>();
    let fired = Arc::new(AtomicUsize::new(0));
    let counter = fired.clone();

    registry
        .declare::<Greet, _>(&mut runtime)
        .unwrap()
        .expects(name_contract())
        .expects(RuleBlock::new().required("locale", |f| f.string()))
        .expects(RuleBlock::new().optional("age", |f| f.integer()))
        .on_breach(move |ctx, _| {
            counter.fetch_add(1, Ordering::SeqCst);
            ctx.fail(None);
        });

    assert_eq!(runtime.before_hook_count(&id), 1);
    assert_eq!(registry.expectations(&id).unwrap().rule_count(), 3);

    // Violates rules from two different blocks: one hook, one dispatch
    let ctx = runtime
        .run::<Greet>(Context::new().with("name", "Billy").with("age", "old"))
        .unwrap();
    assert!(ctx.is_failure());
    assert_eq!(fired.load(Ordering::SeqCst), 1);

    // Satisfies the union of all blocks
    let ctx = runtime
        .run::<Greet>(Context::new().with("name", "Billy").with("locale", "en"))
        .unwrap();
    assert!(ctx.is_success());
    assert_eq!(fired.load(Ordering::SeqCst), 1);
}

#[test]
fn test_two_registries_share_one_hook_per_action() {
    let (mut runtime, mut registry) = setup();
    let mut other: ContractRegistry<Context> =
        ContractRegistry::with_config(EnforcementConfig::builder().log_passes(true).build());
    let id = ActionId::of::<Greet>();
    let seen = Arc::new(Mutex::new(Vec::new()));

    registry
        .declare::<Greet, _>(&mut runtime)
        .unwrap()
        .expects(name_contract())
        .assures(RuleBlock::new().required("greeting", |f| f.filled()));
    other
        .declare::<Greet, _>(&mut runtime)
        .unwrap()
        .expects(RuleBlock::new().required("email", |f| f.filled()))
        .assures(RuleBlock::new().required("executed", |f| f.boolean()))
        .on_breach(recording(seen.clone()));

    assert_eq!(runtime.before_hook_count(&id), 1);
    assert_eq!(runtime.after_hook_count(&id), 1);

    // Rules from either registry block the body
    let ctx = runtime.run::<Greet>(Context::new().with("name", "Billy")).unwrap();
    assert!(ctx.is_failure());
    assert!(!ctx.contains_key("executed"));

    let ctx = runtime
        .run::<Greet>(Context::new().with("email", "billy@example.com"))
        .unwrap();
    assert!(ctx.is_failure());

    let seen = seen.lock().unwrap();
    assert_eq!(seen.len(), 2);
    assert_eq!(seen[0][0].property(), "email");
    assert_eq!(seen[1][0].property(), "name");
    drop(seen);

    let ctx = runtime
        .run::<Greet>(
            Context::new()
                .with("name", "Billy")
                .with("email", "billy@example.com"),
        )
        .unwrap();
    assert!(ctx.is_success());
    assert_eq!(ctx.get_str("greeting"), Some("Hello, Billy"));
}

#[test]
fn test_breach_lists_fields_in_declaration_order() {
    let (mut runtime, mut registry) = setup();
    let seen = Arc::new(Mutex::new(Vec::new()));

    registry
        .declare::<Greet, _>(&mut runtime)
        .unwrap()
        .expects(name_contract())
        .expects(RuleBlock::new().required("locale", |f| f.string()))
        .on_breach(recording(seen.clone()));

    runtime.run::<Greet>(Context::new().with("locale", 7)).unwrap();

    let seen = seen.lock().unwrap();
    let fields: Vec<&str> = seen[0].iter().map(Breach::property).collect();
    assert_eq!(fields, vec!["name", "locale"]);
    assert_eq!(seen[0][1].messages(), ["must be a string"]);
}

#[test]
fn test_custom_consequence_may_choose_not_to_fail() {
    let (mut runtime, mut registry) = setup();

    registry
        .declare::<Greet, _>(&mut runtime)
        .unwrap()
        .expects(name_contract())
        .on_breach(|ctx, breaches| {
            let warnings: Vec<String> = breaches.iter().map(Breach::to_string).collect();
            ctx.insert("warnings", warnings);
        });

    let ctx = runtime.run::<Greet>(Context::new()).unwrap();
    assert!(ctx.is_success());
    assert_eq!(ctx.get("warnings"), Some(&json!(["name is missing"])));
    assert_eq!(ctx.get_str("greeting"), Some("Hello, "));
}

#[test]
fn test_custom_consequence_tags_failure_reason() {
    let (mut runtime, mut registry) = setup();

    registry
        .declare::<Greet, _>(&mut runtime)
        .unwrap()
        .expects(name_contract())
        .on_breach(|ctx, breaches| {
            let reason = format!("invalid_{}", breaches[0].property());
            ctx.fail_with_message(reason);
        });

    let ctx = runtime.run::<Greet>(Context::new()).unwrap();
    assert_eq!(ctx.message(), Some("invalid_name"));
}

#[test]
fn test_first_failing_consequence_halts_the_rest() {
    let (mut runtime, mut registry) = setup();
    let later = Arc::new(AtomicUsize::new(0));
    let counter = later.clone();

    registry
        .declare::<Greet, _>(&mut runtime)
        .unwrap()
        .expects(name_contract())
        .on_breach(|ctx, _| ctx.fail_with_message("first"))
        .on_breach(move |ctx, _| {
            counter.fetch_add(1, Ordering::SeqCst);
            ctx.fail_with_message("second");
        });

    let ctx = runtime.run::<Greet>(Context::new()).unwrap();
    assert_eq!(ctx.message(), Some("first"));
    assert_eq!(later.load(Ordering::SeqCst), 0);
}

#[test]
fn test_all_consequences_run_when_halting_disabled() {
    init_tracing();
    let mut runtime = Runtime::new();
    runtime.register(Greet);
    let mut registry: ContractRegistry<Context> =
        ContractRegistry::with_config(EnforcementConfig::builder().halt_on_failure(false).build());

    registry
        .declare::<Greet, _>(&mut runtime)
        .unwrap()
        .expects(name_contract())
        .on_breach(|ctx, _| ctx.fail_with_message("first"))
        .on_breach(|ctx, _| ctx.fail_with_message("second"));

    let ctx = runtime.run::<Greet>(Context::new()).unwrap();
    assert_eq!(ctx.message(), Some("second"));
}

#[test]
fn test_empty_contract_is_a_no_op() {
    let (mut runtime, mut registry) = setup();
    let id = ActionId::of::<Greet>();

    registry
        .declare::<Greet, _>(&mut runtime)
        .unwrap()
        .expects(RuleBlock::new())
        .assures(RuleBlock::new());

    assert_eq!(runtime.before_hook_count(&id), 1);
    assert_eq!(runtime.after_hook_count(&id), 1);

    let ctx = runtime.run::<Greet>(Context::new()).unwrap();
    assert!(ctx.is_success());
    assert_eq!(ctx.get("executed"), Some(&json!(true)));
}

#[test]
fn test_declaring_on_non_action_is_configuration_error() {
    let (mut runtime, mut registry) = setup();

    let err = registry.declare::<PlainStruct, _>(&mut runtime).err();
    match err {
        Some(err @ ContractError::NotAnAction { .. }) => {
            assert!(err.is_configuration_error());
            assert!(err.to_string().contains("PlainStruct"));
        }
        other => panic!("expected a configuration error, got {:?}", other.map(|e| e.to_string())),
    }
}

#[test]
fn test_contracts_are_per_action() {
    let (mut runtime, mut registry) = setup();

    registry
        .declare::<Greet, _>(&mut runtime)
        .unwrap()
        .expects(name_contract());

    assert!(registry.is_declared(&ActionId::of::<Greet>()));
    assert!(!registry.is_declared(&ActionId::of::<Shout>()));

    let ctx = runtime.run::<Shout>(Context::new()).unwrap();
    assert!(ctx.is_success());
}

#[test]
fn test_pipeline_stops_at_contract_breach() {
    let (mut runtime, mut registry) = setup();

    registry
        .declare::<Greet, _>(&mut runtime)
        .unwrap()
        .assures(RuleBlock::new().required("greeting", |f| f.filled().string()));
    registry
        .declare::<Shout, _>(&mut runtime)
        .unwrap()
        .expects(RuleBlock::new().required("greeting", |f| f.min_size(10)))
        .on_breach(|ctx, breaches| ctx.fail_with_message(breaches[0].to_string()));

    let steps = [ActionId::of::<Greet>(), ActionId::of::<Shout>()];

    let ctx = runtime
        .reduce(&steps, Context::new().with("name", "Billy"))
        .unwrap();
    assert!(ctx.is_success());
    assert_eq!(ctx.get_str("greeting"), Some("HELLO, BILLY"));

    let ctx = runtime.reduce(&steps, Context::new().with("name", "B")).unwrap();
    assert!(ctx.is_failure());
    assert_eq!(ctx.message(), Some("greeting size cannot be less than 10"));
    assert_eq!(ctx.get_str("greeting"), Some("Hello, B"));
}

#[test]
fn test_nested_contract_reports_dotted_paths() {
    let (mut runtime, mut registry) = setup();
    let seen = Arc::new(Mutex::new(Vec::new()));

    registry
        .declare::<Greet, _>(&mut runtime)
        .unwrap()
        .expects(RuleBlock::new().required("address", |f| {
            f.schema(
                RuleBlock::new()
                    .required("city", |f| f.filled())
                    .optional("zip", |f| f.format(r"^\d{5}$")),
            )
        }))
        .on_breach(recording(seen.clone()));

    runtime
        .run::<Greet>(Context::new().with("address", json!({ "zip": "ABCDE" })))
        .unwrap();

    let seen = seen.lock().unwrap();
    let fields: Vec<&str> = seen[0].iter().map(Breach::property).collect();
    assert_eq!(fields, vec!["address.city", "address.zip"]);
    assert_eq!(seen[0][1].messages(), ["is in invalid format"]);
}

#[test]
fn test_concurrent_invocations_share_contracts() {
    let (mut runtime, mut registry) = setup();

    registry
        .declare::<Greet, _>(&mut runtime)
        .unwrap()
        .expects(name_contract())
        .assures(RuleBlock::new().required("greeting", |f| f.filled()));

    let runtime = Arc::new(runtime);
    std::thread::scope(|scope| {
        let handles: Vec<_> = (0..8)
            .map(|i| {
                let runtime = Arc::clone(&runtime);
                scope.spawn(move || {
                    let ctx = if i % 2 == 0 {
                        Context::new().with("name", format!("user-{}", i))
                    } else {
                        Context::new()
                    };
                    runtime.run::<Greet>(ctx).unwrap().is_success()
                })
            })
            .collect();

        for (i, handle) in handles.into_iter().enumerate() {
            assert_eq!(handle.join().unwrap(), i % 2 == 0);
        }
    });
}
