//! Error types for action contracts
//!
//! Contract breaches are not errors: they are routed to consequence handlers.
//! The variants here cover programming mistakes made while wiring actions
//! and contracts together.

use thiserror::Error;

/// Main error type for contract declaration and step execution
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ContractError {
    /// Contracts were declared on a type the host runtime does not know as an action
    #[error("Configuration error: '{action}' is not a registered action and cannot declare contracts")]
    NotAnAction { action: String },

    /// The host runtime was asked to run a step that was never registered
    #[error("Unknown action: '{action}' is not registered with the runtime")]
    UnknownAction { action: String },
}

impl ContractError {
    /// Create a configuration error for the given action name
    pub fn not_an_action(action: impl Into<String>) -> Self {
        ContractError::NotAnAction {
            action: action.into(),
        }
    }

    /// Create an unknown-step error for the given action name
    pub fn unknown_action(action: impl Into<String>) -> Self {
        ContractError::UnknownAction {
            action: action.into(),
        }
    }

    /// Check if this is a load-time configuration error (never retried)
    pub fn is_configuration_error(&self) -> bool {
        matches!(self, ContractError::NotAnAction { .. })
    }
}

/// Result type alias for contract operations
pub type Result<T> = std::result::Result<T, ContractError>;
