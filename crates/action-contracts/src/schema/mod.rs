//! Rule schema builder
//!
//! A [`Schema`] is an immutable, shareable set of rules over named fields.
//! New rules never modify an existing schema: [`Schema::extend`] returns a
//! new schema that runs the base rules followed by the new block, so any
//! earlier reference (or another action holding the base) is unaffected.
//!
//! Rules are deterministic and pure. They read the data snapshot and record
//! per-field messages; they never mutate the snapshot.

pub mod rules;

use std::fmt;
use std::sync::Arc;

use crate::host::Snapshot;

pub use rules::{ExpectedType, FieldRule, FieldSpec, Predicate, Presence};

/// Trait for implementing schema rules
///
/// Each rule should be focused on a single field (or a small, related set of
/// fields) and record one message per failed check.
pub trait Rule: Send + Sync {
    /// Identifier for this rule, used in diagnostics
    fn id(&self) -> &str;

    /// Evaluate the rule against a data snapshot, recording failures in `messages`
    fn evaluate(&self, data: &Snapshot, messages: &mut Messages);
}

/// Insertion-ordered mapping of field name to failure messages
///
/// Field order is the order in which a failure was first recorded for that
/// field. Identical messages for the same field are collapsed.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Messages {
    entries: Vec<(String, Vec<String>)>,
}

impl Messages {
    /// Create an empty message set
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a failure message for a field
    pub fn push(&mut self, field: impl Into<String>, message: impl Into<String>) {
        let field = field.into();
        let message = message.into();

        match self.entries.iter_mut().find(|(name, _)| *name == field) {
            Some((_, existing)) => {
                if !existing.contains(&message) {
                    existing.push(message);
                }
            }
            None => self.entries.push((field, vec![message])),
        }
    }

    /// Merge another message set, prefixing each field as `prefix.field`
    pub fn extend_prefixed(&mut self, prefix: &str, other: Messages) {
        for (field, messages) in other.entries {
            let path = format!("{}.{}", prefix, field);
            for message in messages {
                self.push(path.clone(), message);
            }
        }
    }

    /// Messages recorded for a field
    pub fn get(&self, field: &str) -> Option<&[String]> {
        self.entries
            .iter()
            .find(|(name, _)| name == field)
            .map(|(_, messages)| messages.as_slice())
    }

    /// Iterate over failed fields in recorded order
    pub fn iter(&self) -> impl Iterator<Item = (&str, &[String])> {
        self.entries
            .iter()
            .map(|(field, messages)| (field.as_str(), messages.as_slice()))
    }

    /// Names of failed fields in recorded order
    pub fn fields(&self) -> Vec<&str> {
        self.entries.iter().map(|(field, _)| field.as_str()).collect()
    }

    /// Number of failed fields
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether no failures were recorded
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Result of running a schema against a snapshot
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ValidationOutcome {
    messages: Messages,
}

impl ValidationOutcome {
    /// Whether every rule passed
    pub fn is_success(&self) -> bool {
        self.messages.is_empty()
    }

    /// Per-field failure messages (empty on success)
    pub fn messages(&self) -> &Messages {
        &self.messages
    }

    /// Consume the outcome, returning its messages
    pub fn into_messages(self) -> Messages {
        self.messages
    }
}

/// A block of rules to be added to a schema
///
/// ```
/// use action_contracts::schema::{RuleBlock, Schema};
/// use serde_json::json;
///
/// let schema = Schema::empty().extend(
///     RuleBlock::new()
///         .required("name", |f| f.filled().string())
///         .optional("age", |f| f.integer().gteq(0.0)),
/// );
///
/// let data = json!({ "name": "Billy" });
/// assert!(schema.validate(data.as_object().unwrap()).is_success());
/// ```
#[derive(Clone, Default)]
pub struct RuleBlock {
    rules: Vec<Arc<dyn Rule>>,
}

impl RuleBlock {
    /// Create an empty rule block
    pub fn new() -> Self {
        Self::default()
    }

    /// Require a key to be present, then apply the field checks built by `build`
    pub fn required<F>(self, key: impl Into<String>, build: F) -> Self
    where
        F: FnOnce(FieldSpec) -> FieldSpec,
    {
        self.field(key, Presence::Required, build)
    }

    /// Apply the field checks built by `build` only when the key is present
    pub fn optional<F>(self, key: impl Into<String>, build: F) -> Self
    where
        F: FnOnce(FieldSpec) -> FieldSpec,
    {
        self.field(key, Presence::Optional, build)
    }

    /// Add a custom rule
    pub fn rule<R: Rule + 'static>(mut self, rule: R) -> Self {
        self.rules.push(Arc::new(rule));
        self
    }

    fn field<F>(mut self, key: impl Into<String>, presence: Presence, build: F) -> Self
    where
        F: FnOnce(FieldSpec) -> FieldSpec,
    {
        let spec = build(FieldSpec::new());
        self.rules.push(Arc::new(FieldRule::new(key, presence, spec)));
        self
    }

    /// Number of rules in the block
    pub fn len(&self) -> usize {
        self.rules.len()
    }

    /// Whether the block declares no rules
    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }
}

impl fmt::Debug for RuleBlock {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list()
            .entries(self.rules.iter().map(|r| r.id()))
            .finish()
    }
}

/// An immutable, composable rule set over named fields
#[derive(Clone)]
pub struct Schema {
    rules: Arc<Vec<Arc<dyn Rule>>>,
    version: u32,
}

impl Default for Schema {
    fn default() -> Self {
        Self::empty()
    }
}

impl Schema {
    /// A schema with no rules; validates every snapshot successfully
    pub fn empty() -> Self {
        Self {
            rules: Arc::new(Vec::new()),
            version: 0,
        }
    }

    /// Build a new schema running this schema's rules followed by `block`
    ///
    /// `self` is left untouched.
    pub fn extend(&self, block: RuleBlock) -> Schema {
        let mut rules = Vec::with_capacity(self.rules.len() + block.rules.len());
        rules.extend(self.rules.iter().cloned());
        rules.extend(block.rules);

        Schema {
            rules: Arc::new(rules),
            version: self.version.saturating_add(1),
        }
    }

    /// Run every rule against the snapshot
    pub fn validate(&self, data: &Snapshot) -> ValidationOutcome {
        let mut messages = Messages::new();
        for rule in self.rules.iter() {
            rule.evaluate(data, &mut messages);
        }
        ValidationOutcome { messages }
    }

    /// Number of rule blocks applied since the empty schema
    pub fn version(&self) -> u32 {
        self.version
    }

    /// Number of rules in the schema
    pub fn rule_count(&self) -> usize {
        self.rules.len()
    }

    /// Whether the schema has no rules
    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    /// Rule identifiers in evaluation order
    pub fn rule_ids(&self) -> Vec<&str> {
        self.rules.iter().map(|r| r.id()).collect()
    }
}

impl fmt::Debug for Schema {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Schema")
            .field("version", &self.version)
            .field("rules", &self.rule_ids())
            .finish()
    }
}
