//! Per-double configuration.

use crate::result::MimicryResult;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Configuration attached to a double type and inherited by its reprises
///
/// ```
/// use mimicry::DoubleConfig;
///
/// let config = DoubleConfig::from_yaml_str("check_arity: false").unwrap();
/// assert!(!config.check_arity);
/// assert!(config.log_invocations);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DoubleConfig {
    /// Reject calls whose argument count the declared arity does not accept
    pub check_arity: bool,
    /// Emit a `tracing` event for every invocation
    pub log_invocations: bool,
    /// Most recent invocations quoted in expectation failure messages
    pub failure_context: usize,
}

impl Default for DoubleConfig {
    fn default() -> Self {
        Self {
            check_arity: true,
            log_invocations: true,
            failure_context: 10,
        }
    }
}

impl DoubleConfig {
    /// Create a new config
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Enable or disable arity checking
    #[must_use]
    pub const fn with_arity_check(mut self, enabled: bool) -> Self {
        self.check_arity = enabled;
        self
    }

    /// Enable or disable invocation logging
    #[must_use]
    pub const fn with_invocation_logging(mut self, enabled: bool) -> Self {
        self.log_invocations = enabled;
        self
    }

    /// Set how many invocations failure messages quote
    #[must_use]
    pub const fn with_failure_context(mut self, records: usize) -> Self {
        self.failure_context = records;
        self
    }

    /// Parse from YAML; omitted keys keep their defaults
    pub fn from_yaml_str(yaml: &str) -> MimicryResult<Self> {
        Ok(serde_yaml_ng::from_str(yaml)?)
    }

    /// Load from a YAML file
    pub fn from_path(path: impl AsRef<Path>) -> MimicryResult<Self> {
        let contents = std::fs::read_to_string(path)?;
        Self::from_yaml_str(&contents)
    }
}
