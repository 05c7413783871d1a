//! Invocation context for the reference runtime

use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

use crate::host::{ActionContext, Snapshot};

/// Outcome of an invocation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum Outcome {
    Success,
    Failure { message: Option<String> },
}

/// Shared mutable data carried through the steps of a pipeline
#[derive(Debug, Clone)]
pub struct Context {
    invocation_id: Uuid,
    data: Snapshot,
    outcome: Outcome,
    skip_remaining: bool,
}

impl Default for Context {
    fn default() -> Self {
        Self::new()
    }
}

impl Context {
    /// Create an empty, successful context
    pub fn new() -> Self {
        Self::from_data(Snapshot::new())
    }

    /// Create a context over existing data
    pub fn from_data(data: Snapshot) -> Self {
        Self {
            invocation_id: Uuid::new_v4(),
            data,
            outcome: Outcome::Success,
            skip_remaining: false,
        }
    }

    /// Add a key, builder style
    pub fn with(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.insert(key, value);
        self
    }

    /// Identifier for log correlation
    pub fn invocation_id(&self) -> Uuid {
        self.invocation_id
    }

    /// Get a value
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.data.get(key)
    }

    /// Get a string value
    pub fn get_str(&self, key: &str) -> Option<&str> {
        self.data.get(key).and_then(Value::as_str)
    }

    /// Insert or replace a value, returning the previous one
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<Value>) -> Option<Value> {
        self.data.insert(key.into(), value.into())
    }

    /// Remove a value
    pub fn remove(&mut self, key: &str) -> Option<Value> {
        self.data.remove(key)
    }

    /// Whether a key is present (a `null` value counts as present)
    pub fn contains_key(&self, key: &str) -> bool {
        self.data.contains_key(key)
    }

    /// Borrow the underlying data
    pub fn data(&self) -> &Snapshot {
        &self.data
    }

    /// Mark the invocation as failed
    pub fn fail(&mut self, message: Option<String>) {
        self.outcome = Outcome::Failure { message };
    }

    /// Mark the invocation as failed with a message
    pub fn fail_with_message(&mut self, message: impl Into<String>) {
        self.fail(Some(message.into()));
    }

    /// Skip every remaining step without failing
    pub fn skip_remaining(&mut self) {
        self.skip_remaining = true;
    }

    /// Whether remaining steps should be skipped
    pub fn is_skip_remaining(&self) -> bool {
        self.skip_remaining
    }

    /// Whether no step has failed
    pub fn is_success(&self) -> bool {
        matches!(self.outcome, Outcome::Success)
    }

    /// Whether a step has failed
    pub fn is_failure(&self) -> bool {
        !self.is_success()
    }

    /// Failure message, if one was given
    pub fn message(&self) -> Option<&str> {
        match &self.outcome {
            Outcome::Failure { message } => message.as_deref(),
            Outcome::Success => None,
        }
    }

    /// Current outcome
    pub fn outcome(&self) -> &Outcome {
        &self.outcome
    }
}

impl ActionContext for Context {
    fn snapshot(&self) -> Snapshot {
        self.data.clone()
    }

    fn fail(&mut self, message: Option<String>) {
        Context::fail(self, message);
    }

    fn is_failure(&self) -> bool {
        Context::is_failure(self)
    }
}
