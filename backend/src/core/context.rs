//! Call context
//!
//! Everything the bridge keeps between calls lives here rather than in
//! process-wide globals: the pending-failure channel, the current call depth,
//! the module registry, the capsule arena, and recorded warnings.
//!
//! # Re-entrancy
//!
//! A target invoked through [`CallContext::invoke`] may call back into any
//! bridge entry point. Each invocation stashes the channel's current content
//! before running the target and restores it afterwards, so a failure raised
//! at one nesting level is never reported at another.

use std::cell::{Cell, RefCell};
use std::collections::HashMap;

use tracing::{debug, trace, warn};

use super::config::{BridgeConfig, ConfigError};
use crate::capsule::CapsuleArena;
use crate::codec::Encoding;
use crate::exceptions::{ErrorKind, FailureChannel, HostError, WarningCategory};
use crate::models::function::CallArgs;
use crate::models::namespace::Module;
use crate::models::value::{HostObject, Owned};

/// A warning issued through [`CallContext::warn`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WarningRecord {
    pub category: WarningCategory,
    pub message: String,
}

/// Per-embedding state shared by every bridge entry point
///
/// # Example
///
/// ```rust
/// use host_bridge_core_rs::{CallContext, HostError};
///
/// let ctx = CallContext::new();
/// ctx.raise_pending(HostError::runtime_error("Test error"));
/// assert!(ctx.failure_pending());
///
/// let failure = ctx.fetch_pending().unwrap();
/// assert_eq!(failure.message(), "Test error");
/// assert!(!ctx.failure_pending());
/// ```
#[derive(Debug)]
pub struct CallContext {
    config: BridgeConfig,
    encoding: Encoding,
    channel: FailureChannel,
    depth: Cell<usize>,
    modules: RefCell<HashMap<String, Owned>>,
    capsules: CapsuleArena,
    warnings: RefCell<Vec<WarningRecord>>,
}

/// Decrements the call depth when an invocation returns
struct DepthGuard<'a> {
    depth: &'a Cell<usize>,
}

impl Drop for DepthGuard<'_> {
    fn drop(&mut self) {
        self.depth.set(self.depth.get().saturating_sub(1));
    }
}

impl Default for CallContext {
    fn default() -> Self {
        Self::new()
    }
}

impl CallContext {
    /// Create a context with the default configuration
    pub fn new() -> Self {
        Self::build(BridgeConfig::default(), Encoding::Utf8)
    }

    /// Create a context from a validated configuration
    pub fn with_config(config: BridgeConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        let encoding = config.encoding()?;
        Ok(Self::build(config, encoding))
    }

    fn build(config: BridgeConfig, encoding: Encoding) -> Self {
        Self {
            config,
            encoding,
            channel: FailureChannel::new(),
            depth: Cell::new(0),
            modules: RefCell::new(HashMap::new()),
            capsules: CapsuleArena::new(),
            warnings: RefCell::new(Vec::new()),
        }
    }

    pub fn config(&self) -> &BridgeConfig {
        &self.config
    }

    /// Encoding used when a codec entry point is given none
    pub fn default_encoding(&self) -> Encoding {
        self.encoding
    }

    /// Current nesting depth of invocations
    pub fn depth(&self) -> usize {
        self.depth.get()
    }

    pub fn capsules(&self) -> &CapsuleArena {
        &self.capsules
    }

    // ========================================================================
    // Pending-failure channel
    // ========================================================================

    /// Report a failure through the channel instead of returning it
    pub fn raise_pending(&self, error: HostError) {
        self.channel.raise(error);
    }

    pub fn failure_pending(&self) -> bool {
        self.channel.is_pending()
    }

    /// Read and clear the pending failure
    pub fn fetch_pending(&self) -> Option<HostError> {
        self.channel.take()
    }

    pub fn clear_pending(&self) {
        self.channel.clear();
    }

    // ========================================================================
    // Invocation
    // ========================================================================

    /// Invoke `target` after probing its invocable capability
    ///
    /// A failure the target returns, or raises into the channel, comes back
    /// as `Err` with the same kind and message and one more traceback frame.
    pub fn invoke(&self, target: &Owned, args: CallArgs) -> Result<Owned, HostError> {
        let invocable = target.as_invocable().ok_or_else(|| {
            HostError::invocation(format!("'{}' object is not callable", target.type_name()))
        })?;
        let _guard = self.enter()?;
        trace!(callee = invocable.name(), depth = self.depth(), "invoking");

        let outer = self.channel.take();
        let result = invocable.invoke(self, args);
        let raised = self.channel.take();
        self.channel.restore(outer);

        let result = match (result, raised) {
            (Err(error), _) => Err(error),
            (Ok(_), Some(error)) => Err(error),
            (Ok(value), None) => Ok(value),
        };
        result.map_err(|mut error| {
            error.push_frame(invocable.name());
            error
        })
    }

    fn enter(&self) -> Result<DepthGuard<'_>, HostError> {
        let depth = self.depth.get();
        if depth >= self.config.max_call_depth {
            return Err(HostError::new(
                ErrorKind::Recursion,
                "maximum recursion depth exceeded",
            ));
        }
        self.depth.set(depth + 1);
        Ok(DepthGuard { depth: &self.depth })
    }

    // ========================================================================
    // Module registry
    // ========================================================================

    /// Make `module` importable by name, replacing any module of that name
    pub fn register_module(&self, module: Module) -> Owned {
        let name = module.name().to_string();
        let handle = Owned::new(HostObject::Module(module));
        debug!(module = %name, "registered module");
        self.modules.borrow_mut().insert(name, handle.clone());
        handle
    }

    pub fn import(&self, name: &str) -> Result<Owned, HostError> {
        self.modules.borrow().get(name).cloned().ok_or_else(|| {
            HostError::new(ErrorKind::Import, format!("No module named '{}'", name))
        })
    }

    // ========================================================================
    // Warnings
    // ========================================================================

    /// Issue a non-fatal warning
    ///
    /// Recorded on the context, or returned as a failure when
    /// `warnings_as_errors` is set.
    pub fn warn(&self, category: WarningCategory, message: impl Into<String>) -> Result<(), HostError> {
        let message = message.into();
        if self.config.warnings_as_errors {
            return Err(HostError::new(ErrorKind::Warning(category), message));
        }
        warn!(%category, text = %message, "host warning");
        self.warnings
            .borrow_mut()
            .push(WarningRecord { category, message });
        Ok(())
    }

    pub fn warnings(&self) -> Vec<WarningRecord> {
        self.warnings.borrow().clone()
    }

    pub fn take_warnings(&self) -> Vec<WarningRecord> {
        std::mem::take(&mut *self.warnings.borrow_mut())
    }
}
