//! Enforcement configuration
//!
//! Controls how breaches are dispatched and logged. Defaults match the
//! behaviour most pipelines want: stop dispatching once a handler fails the
//! invocation, and log every breach.

/// Environment variable for [`EnforcementConfig::halt_on_failure`]
pub const ENV_HALT_ON_FAILURE: &str = "ACTION_CONTRACTS_HALT_ON_FAILURE";
/// Environment variable for [`EnforcementConfig::log_breaches`]
pub const ENV_LOG_BREACHES: &str = "ACTION_CONTRACTS_LOG_BREACHES";
/// Environment variable for [`EnforcementConfig::log_passes`]
pub const ENV_LOG_PASSES: &str = "ACTION_CONTRACTS_LOG_PASSES";

/// Configuration for contract enforcement
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnforcementConfig {
    /// Stop invoking consequence handlers once the context reports failure
    pub halt_on_failure: bool,

    /// Emit a warning event for every breached contract
    pub log_breaches: bool,

    /// Emit a debug event for every contract that passes
    pub log_passes: bool,
}

impl Default for EnforcementConfig {
    fn default() -> Self {
        Self {
            halt_on_failure: true,
            log_breaches: true,
            log_passes: false,
        }
    }
}

impl EnforcementConfig {
    /// Create a new config builder
    pub fn builder() -> EnforcementConfigBuilder {
        EnforcementConfigBuilder::new()
    }

    /// Create config from environment variables
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Create config from an arbitrary key lookup, falling back to defaults
    /// for missing or unparseable values
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();
        let flag = |key: &str, default: bool| {
            lookup(key)
                .map(|v| v.trim().parse().unwrap_or(default))
                .unwrap_or(default)
        };

        Self {
            halt_on_failure: flag(ENV_HALT_ON_FAILURE, defaults.halt_on_failure),
            log_breaches: flag(ENV_LOG_BREACHES, defaults.log_breaches),
            log_passes: flag(ENV_LOG_PASSES, defaults.log_passes),
        }
    }
}

/// Builder for EnforcementConfig
#[derive(Debug, Default)]
pub struct EnforcementConfigBuilder {
    config: EnforcementConfig,
}

impl EnforcementConfigBuilder {
    /// Create a new builder with defaults
    pub fn new() -> Self {
        Self::default()
    }

    /// Set whether dispatch stops at the first failing handler
    pub fn halt_on_failure(mut self, halt: bool) -> Self {
        self.config.halt_on_failure = halt;
        self
    }

    /// Set whether breaches are logged
    pub fn log_breaches(mut self, enabled: bool) -> Self {
        self.config.log_breaches = enabled;
        self
    }

    /// Set whether passing contracts are logged
    pub fn log_passes(mut self, enabled: bool) -> Self {
        self.config.log_passes = enabled;
        self
    }

    /// Build the configuration
    pub fn build(self) -> EnforcementConfig {
        self.config
    }
}
