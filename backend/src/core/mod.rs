//! Call context and configuration

pub mod config;
pub mod context;

pub use config::{BridgeConfig, ConfigError};
pub use context::{CallContext, WarningRecord};
