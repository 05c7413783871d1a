//! Built-in field rules
//!
//! A [`FieldRule`] checks a single key of the snapshot: presence first, then
//! a chain of [`Predicate`]s. The first failing predicate records its message
//! and ends the chain for that field, so a field reports at most one message
//! per rule.

use regex::Regex;
use serde_json::Value;
use std::fmt;
use std::sync::Arc;

use super::{Messages, Rule, RuleBlock, Schema};
use crate::host::Snapshot;

/// Message recorded when a required key is absent
pub const MISSING: &str = "is missing";

/// Whether a key must be present
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Presence {
    Required,
    Optional,
}

impl fmt::Display for Presence {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Presence::Required => write!(f, "required"),
            Presence::Optional => write!(f, "optional"),
        }
    }
}

/// Expected JSON type for a field
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExpectedType {
    String,
    Integer,
    /// Integer or float
    Number,
    Boolean,
    Array,
    Object,
}

impl ExpectedType {
    /// Check if a value matches this expected type
    pub fn matches(&self, value: &Value) -> bool {
        match (self, value) {
            (ExpectedType::String, Value::String(_)) => true,
            (ExpectedType::Integer, Value::Number(n)) => n.is_i64() || n.is_u64(),
            (ExpectedType::Number, Value::Number(_)) => true,
            (ExpectedType::Boolean, Value::Bool(_)) => true,
            (ExpectedType::Array, Value::Array(_)) => true,
            (ExpectedType::Object, Value::Object(_)) => true,
            _ => false,
        }
    }

    /// Failure message for a mismatched value
    pub fn message(&self) -> &'static str {
        match self {
            ExpectedType::String => "must be a string",
            ExpectedType::Integer => "must be an integer",
            ExpectedType::Number => "must be a number",
            ExpectedType::Boolean => "must be boolean",
            ExpectedType::Array => "must be an array",
            ExpectedType::Object => "must be an object",
        }
    }
}

/// Compiled `format` pattern; compile errors surface at validation time
#[derive(Clone)]
pub struct FormatPattern {
    source: String,
    compiled: Result<Regex, String>,
}

impl FormatPattern {
    fn new(source: impl Into<String>) -> Self {
        let source = source.into();
        let compiled = Regex::new(&source).map_err(|e| e.to_string());
        Self { source, compiled }
    }

    /// The pattern as written
    pub fn source(&self) -> &str {
        &self.source
    }
}

/// Custom predicate over a field value
pub type CustomCheck = Arc<dyn Fn(&Value) -> bool + Send + Sync>;

/// A single check applied to a present field value
#[derive(Clone)]
pub enum Predicate {
    /// Not null, and not an empty string, array or object
    Filled,
    Type(ExpectedType),
    MinSize(usize),
    MaxSize(usize),
    Gteq(f64),
    Lteq(f64),
    Format(FormatPattern),
    IncludedIn(Vec<Value>),
    Custom { message: String, check: CustomCheck },
    /// Nested rules for an object value; failures are reported as `key.field`
    Nested(Schema),
}

impl fmt::Debug for Predicate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Predicate::Filled => write!(f, "filled"),
            Predicate::Type(t) => write!(f, "type({:?})", t),
            Predicate::MinSize(n) => write!(f, "min_size({})", n),
            Predicate::MaxSize(n) => write!(f, "max_size({})", n),
            Predicate::Gteq(n) => write!(f, "gteq({})", n),
            Predicate::Lteq(n) => write!(f, "lteq({})", n),
            Predicate::Format(p) => write!(f, "format({:?})", p.source),
            Predicate::IncludedIn(values) => write!(f, "included_in({:?})", values),
            Predicate::Custom { message, .. } => write!(f, "satisfies({:?})", message),
            Predicate::Nested(schema) => write!(f, "schema({:?})", schema),
        }
    }
}

fn display_value(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

fn size_of(value: &Value) -> Option<usize> {
    match value {
        Value::String(s) => Some(s.chars().count()),
        Value::Array(items) => Some(items.len()),
        Value::Object(map) => Some(map.len()),
        _ => None,
    }
}

fn is_empty_value(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::String(s) => s.is_empty(),
        Value::Array(items) => items.is_empty(),
        Value::Object(map) => map.is_empty(),
        _ => false,
    }
}

impl Predicate {
    /// Check a scalar predicate, returning the failure message
    ///
    /// Nested schemas are handled by [`FieldRule`] since they can report
    /// more than one field.
    fn check(&self, value: &Value) -> Result<(), String> {
        match self {
            Predicate::Filled => {
                if is_empty_value(value) {
                    return Err("must be filled".to_string());
                }
            }
            Predicate::Type(expected) => {
                if !expected.matches(value) {
                    return Err(expected.message().to_string());
                }
            }
            Predicate::MinSize(min) => match size_of(value) {
                Some(size) if size >= *min => {}
                _ => return Err(format!("size cannot be less than {}", min)),
            },
            Predicate::MaxSize(max) => match size_of(value) {
                Some(size) if size <= *max => {}
                _ => return Err(format!("size cannot be greater than {}", max)),
            },
            Predicate::Gteq(bound) => match value.as_f64() {
                Some(n) if n >= *bound => {}
                Some(_) => return Err(format!("must be greater than or equal to {}", bound)),
                None => return Err(ExpectedType::Number.message().to_string()),
            },
            Predicate::Lteq(bound) => match value.as_f64() {
                Some(n) if n <= *bound => {}
                Some(_) => return Err(format!("must be less than or equal to {}", bound)),
                None => return Err(ExpectedType::Number.message().to_string()),
            },
            Predicate::Format(pattern) => {
                let regex = pattern
                    .compiled
                    .as_ref()
                    .map_err(|e| format!("has an invalid format pattern: {}", e))?;
                match value.as_str() {
                    Some(s) if regex.is_match(s) => {}
                    Some(_) => return Err("is in invalid format".to_string()),
                    None => return Err(ExpectedType::String.message().to_string()),
                }
            }
            Predicate::IncludedIn(allowed) => {
                if !allowed.contains(value) {
                    let names: Vec<String> = allowed.iter().map(display_value).collect();
                    return Err(format!("must be one of: {}", names.join(", ")));
                }
            }
            Predicate::Custom { message, check } => {
                if !check(value) {
                    return Err(message.clone());
                }
            }
            Predicate::Nested(_) => {}
        }
        Ok(())
    }
}

/// Builder for the checks applied to one field
#[derive(Debug, Clone, Default)]
pub struct FieldSpec {
    nullable: bool,
    predicates: Vec<Predicate>,
}

impl FieldSpec {
    /// Create a spec with no checks (presence only)
    pub fn new() -> Self {
        Self::default()
    }

    fn with(mut self, predicate: Predicate) -> Self {
        self.predicates.push(predicate);
        self
    }

    /// Allow an explicit `null`, which skips every other check
    pub fn maybe(mut self) -> Self {
        self.nullable = true;
        self
    }

    /// Value must not be null or empty
    pub fn filled(self) -> Self {
        self.with(Predicate::Filled)
    }

    /// Value must be a string
    pub fn string(self) -> Self {
        self.with(Predicate::Type(ExpectedType::String))
    }

    /// Value must be an integer
    pub fn integer(self) -> Self {
        self.with(Predicate::Type(ExpectedType::Integer))
    }

    /// Value must be a number
    pub fn number(self) -> Self {
        self.with(Predicate::Type(ExpectedType::Number))
    }

    /// Value must be a boolean
    pub fn boolean(self) -> Self {
        self.with(Predicate::Type(ExpectedType::Boolean))
    }

    /// Value must be an array
    pub fn array(self) -> Self {
        self.with(Predicate::Type(ExpectedType::Array))
    }

    /// Value must be an object
    pub fn object(self) -> Self {
        self.with(Predicate::Type(ExpectedType::Object))
    }

    /// String length, array length or object size must be at least `min`
    pub fn min_size(self, min: usize) -> Self {
        self.with(Predicate::MinSize(min))
    }

    /// String length, array length or object size must be at most `max`
    pub fn max_size(self, max: usize) -> Self {
        self.with(Predicate::MaxSize(max))
    }

    /// Number must be greater than or equal to `bound`
    pub fn gteq(self, bound: f64) -> Self {
        self.with(Predicate::Gteq(bound))
    }

    /// Number must be less than or equal to `bound`
    pub fn lteq(self, bound: f64) -> Self {
        self.with(Predicate::Lteq(bound))
    }

    /// String must match the regular expression `pattern`
    pub fn format(self, pattern: impl Into<String>) -> Self {
        self.with(Predicate::Format(FormatPattern::new(pattern)))
    }

    /// Value must equal one of `values`
    pub fn included_in<I, V>(self, values: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<Value>,
    {
        self.with(Predicate::IncludedIn(
            values.into_iter().map(Into::into).collect(),
        ))
    }

    /// Value must satisfy `check`, otherwise `message` is recorded
    pub fn satisfies<F>(self, message: impl Into<String>, check: F) -> Self
    where
        F: Fn(&Value) -> bool + Send + Sync + 'static,
    {
        self.with(Predicate::Custom {
            message: message.into(),
            check: Arc::new(check),
        })
    }

    /// Value must be an object satisfying the nested rules
    pub fn schema(self, block: RuleBlock) -> Self {
        self.with(Predicate::Nested(Schema::empty().extend(block)))
    }

    /// Checks in declaration order
    pub fn predicates(&self) -> &[Predicate] {
        &self.predicates
    }

    /// Whether `null` is accepted
    pub fn is_nullable(&self) -> bool {
        self.nullable
    }
}

/// Rule validating a single key of the snapshot
#[derive(Debug, Clone)]
pub struct FieldRule {
    id: String,
    key: String,
    presence: Presence,
    spec: FieldSpec,
}

impl FieldRule {
    /// Create a new field rule
    pub fn new(key: impl Into<String>, presence: Presence, spec: FieldSpec) -> Self {
        let key = key.into();
        Self {
            id: format!("{}:{}", presence, key),
            key,
            presence,
            spec,
        }
    }

    /// The validated key
    pub fn key(&self) -> &str {
        &self.key
    }

    /// Whether the key must be present
    pub fn presence(&self) -> Presence {
        self.presence
    }

    fn check_value(&self, value: &Value, messages: &mut Messages) {
        for predicate in &self.spec.predicates {
            if let Predicate::Nested(schema) = predicate {
                let Some(map) = value.as_object() else {
                    messages.push(self.key.as_str(), ExpectedType::Object.message());
                    return;
                };
                let nested = schema.validate(map);
                if !nested.is_success() {
                    messages.extend_prefixed(&self.key, nested.into_messages());
                    return;
                }
                continue;
            }

            if let Err(message) = predicate.check(value) {
                messages.push(self.key.as_str(), message);
                return;
            }
        }
    }
}

impl Rule for FieldRule {
    fn id(&self) -> &str {
        &self.id
    }

    fn evaluate(&self, data: &Snapshot, messages: &mut Messages) {
        match data.get(&self.key) {
            None => {
                if self.presence == Presence::Required {
                    messages.push(self.key.as_str(), MISSING);
                }
            }
            Some(Value::Null) if self.spec.nullable => {}
            Some(value) => self.check_value(value, messages),
        }
    }
}
