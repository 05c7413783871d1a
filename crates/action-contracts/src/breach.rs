//! Contract breach records

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::schema::Messages;

/// A single field that failed a contract, with its failure messages
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Breach {
    property: String,
    messages: Vec<String>,
}

impl Breach {
    /// Create a new breach
    pub fn new(property: impl Into<String>, messages: Vec<String>) -> Self {
        Self {
            property: property.into(),
            messages,
        }
    }

    /// Name of the field that failed (dotted for nested fields)
    pub fn property(&self) -> &str {
        &self.property
    }

    /// Human-readable failure messages, in the order the validator produced them
    pub fn messages(&self) -> &[String] {
        &self.messages
    }

    /// Build one breach per failed field, keeping the validator's field order
    pub fn from_messages(messages: &Messages) -> Vec<Breach> {
        messages
            .iter()
            .map(|(field, msgs)| Breach::new(field, msgs.to_vec()))
            .collect()
    }
}

impl fmt::Display for Breach {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.property, self.messages.join(", "))
    }
}
