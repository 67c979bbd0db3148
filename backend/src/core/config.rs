//! Bridge configuration
//!
//! Loaded from JSON (or built in code) and validated before a
//! [`CallContext`](crate::CallContext) is created from it.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::codec::Encoding;

/// Errors raised while loading or validating a [`BridgeConfig`]
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Invalid config JSON: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("max_call_depth must be positive")]
    ZeroCallDepth,

    #[error("Unknown default encoding: '{0}'")]
    UnknownEncoding(String),
}

/// Tunables for a call context
///
/// Every field has a default, so a partial JSON document is valid:
///
/// ```
/// use host_bridge_core_rs::BridgeConfig;
///
/// let config = BridgeConfig::from_json(r#"{"max_call_depth": 64}"#).unwrap();
/// assert_eq!(config.max_call_depth, 64);
/// assert_eq!(config.default_encoding, "utf-8");
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct BridgeConfig {
    /// Maximum nesting of invocations through the bridge before a
    /// `RecursionError` is raised
    pub max_call_depth: usize,

    /// Encoding used by the text codec when the caller names none
    pub default_encoding: String,

    /// Escalate warnings to failures instead of recording them
    pub warnings_as_errors: bool,

    /// Upper bound on pre-allocation from a length hint while draining
    pub drain_prealloc_limit: usize,
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            max_call_depth: 1000,
            default_encoding: "utf-8".to_string(),
            warnings_as_errors: false,
            drain_prealloc_limit: 1024,
        }
    }
}

impl BridgeConfig {
    /// Parse and validate a JSON configuration document
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let config: BridgeConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Serialize to a JSON document
    pub fn to_json(&self) -> Result<String, ConfigError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_call_depth == 0 {
            return Err(ConfigError::ZeroCallDepth);
        }
        self.encoding()?;
        Ok(())
    }

    /// The default encoding, resolved
    pub fn encoding(&self) -> Result<Encoding, ConfigError> {
        Encoding::parse(&self.default_encoding)
            .map_err(|_| ConfigError::UnknownEncoding(self.default_encoding.clone()))
    }
}
