//! Exception Bridge
//!
//! Failure values crossing the native/host boundary, the call-context-scoped
//! pending-failure channel, and the three capture entry points.
//!
//! # Propagation Policy
//!
//! Every entry point outside [`bridge`] propagates a target's failure
//! unchanged: same [`ErrorKind`], same message. The only thing the bridge adds
//! on the way out is a traceback frame naming the function the failure passed
//! through.
//!
//! # Example
//!
//! ```rust
//! use host_bridge_core_rs::{CallContext, ErrorKind, HostError, NativeFunction, Owned, Signature};
//! use host_bridge_core_rs::exceptions::bridge::{classify, ExceptionClass};
//!
//! let ctx = CallContext::new();
//! let failing = Owned::function(NativeFunction::new("failing", Signature::new(), |_, _| {
//!     Err(HostError::value_error("bad value"))
//! }));
//!
//! assert_eq!(classify(&ctx, &failing), ExceptionClass::ValueError);
//! assert!(!ctx.failure_pending());
//! ```

pub mod bridge;
pub mod channel;

use serde::{Serialize, Serializer};
use std::any::Any;
use std::fmt;
use std::rc::Rc;
use thiserror::Error;

pub use bridge::{check_and_clear, classify, snapshot, ClearOutcome, ExceptionClass, ExceptionRecord};
pub use channel::FailureChannel;

/// Category of a non-fatal warning issued through the bridge
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum WarningCategory {
    Deprecation,
    Runtime,
    User,
}

impl fmt::Display for WarningCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            WarningCategory::Deprecation => "DeprecationWarning",
            WarningCategory::Runtime => "RuntimeWarning",
            WarningCategory::User => "UserWarning",
        };
        f.write_str(name)
    }
}

/// Kind tag of a failure
///
/// Kinds are compared by identity: `Custom("CustomError")` only matches another
/// `Custom("CustomError")`, never a built-in kind.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// Target does not satisfy the invocable capability
    Invocation,
    /// Named member absent from the receiver
    AttributeLookup,
    /// Arity or type mismatch against the target's signature
    Argument,
    /// Value exposes no iteration capability
    IterationUnsupported,
    /// Handle is not a capsule of the expected type
    CapsuleType,
    /// Range iterator constructed with `step == 0`
    StepZero,
    /// Raised by arithmetic targets invoked through the bridge
    DivisionByZero,
    Value,
    Type,
    Runtime,
    Index,
    Key,
    Import,
    Lookup,
    Encoding,
    Recursion,
    /// End of sequence signalled by an explicit `next` request
    StopIteration,
    /// A borrowed reference outlived its referent
    ReferenceExpired,
    Warning(WarningCategory),
    /// Host-defined failure kind, identified by name
    Custom(String),
}

impl ErrorKind {
    /// Host-visible name of this kind (e.g. `"ValueError"`)
    pub fn name(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ErrorKind::Invocation => "InvocationError",
            ErrorKind::AttributeLookup => "AttributeLookupError",
            ErrorKind::Argument => "ArgumentError",
            ErrorKind::IterationUnsupported => "IterationUnsupportedError",
            ErrorKind::CapsuleType => "CapsuleTypeError",
            ErrorKind::StepZero => "StepZeroError",
            ErrorKind::DivisionByZero => "DivisionByZeroError",
            ErrorKind::Value => "ValueError",
            ErrorKind::Type => "TypeError",
            ErrorKind::Runtime => "RuntimeError",
            ErrorKind::Index => "IndexError",
            ErrorKind::Key => "KeyError",
            ErrorKind::Import => "ImportError",
            ErrorKind::Lookup => "LookupError",
            ErrorKind::Encoding => "EncodingError",
            ErrorKind::Recursion => "RecursionError",
            ErrorKind::StopIteration => "StopIteration",
            ErrorKind::ReferenceExpired => "ReferenceExpiredError",
            ErrorKind::Warning(category) => return write!(f, "{}", category),
            ErrorKind::Custom(name) => name.as_str(),
        };
        f.write_str(name)
    }
}

impl Serialize for ErrorKind {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

/// A failure raised by a target or by the bridge itself
///
/// Carries the traceback frames it passed through and, optionally, an opaque
/// origin object (e.g. the foreign exception it was translated from) so an
/// embedding layer can hand back the exact failure it received.
#[derive(Debug, Clone, Error)]
#[error("{kind}: {message}")]
pub struct HostError {
    kind: ErrorKind,
    message: String,
    traceback: Vec<String>,
    origin: Option<Rc<dyn Any>>,
}

impl HostError {
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            traceback: Vec::new(),
            origin: None,
        }
    }

    pub fn invocation(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Invocation, message)
    }

    pub fn attribute_lookup(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::AttributeLookup, message)
    }

    pub fn argument(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Argument, message)
    }

    pub fn iteration_unsupported(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::IterationUnsupported, message)
    }

    pub fn capsule_type(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::CapsuleType, message)
    }

    pub fn division_by_zero(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::DivisionByZero, message)
    }

    pub fn value_error(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Value, message)
    }

    pub fn type_error(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Type, message)
    }

    pub fn runtime_error(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Runtime, message)
    }

    pub fn index_error(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Index, message)
    }

    pub fn key_error(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Key, message)
    }

    pub fn kind(&self) -> &ErrorKind {
        &self.kind
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    /// Frames this failure passed through, innermost first
    pub fn traceback(&self) -> &[String] {
        &self.traceback
    }

    pub fn has_traceback(&self) -> bool {
        !self.traceback.is_empty()
    }

    /// True if this failure is exactly of `kind`
    pub fn matches(&self, kind: &ErrorKind) -> bool {
        &self.kind == kind
    }

    pub(crate) fn push_frame(&mut self, frame: &str) {
        self.traceback.push(frame.to_string());
    }

    /// Attach the foreign object this failure was translated from
    pub fn with_origin(mut self, origin: Rc<dyn Any>) -> Self {
        self.origin = Some(origin);
        self
    }

    pub fn origin(&self) -> Option<&Rc<dyn Any>> {
        self.origin.as_ref()
    }
}

impl PartialEq for HostError {
    fn eq(&self, other: &Self) -> bool {
        self.kind == other.kind && self.message == other.message
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_names() {
        assert_eq!(ErrorKind::Value.name(), "ValueError");
        assert_eq!(ErrorKind::StepZero.name(), "StepZeroError");
        assert_eq!(ErrorKind::Custom("CustomError".into()).name(), "CustomError");
        assert_eq!(
            ErrorKind::Warning(WarningCategory::Deprecation).name(),
            "DeprecationWarning"
        );
    }

    #[test]
    fn test_display_includes_kind_and_message() {
        let err = HostError::division_by_zero("Cannot divide by zero");
        assert_eq!(err.to_string(), "DivisionByZeroError: Cannot divide by zero");
    }

    #[test]
    fn test_equality_ignores_traceback() {
        let mut a = HostError::value_error("x");
        a.push_frame("inner");
        let b = HostError::value_error("x");
        assert_eq!(a, b);
        assert!(a.has_traceback());
        assert!(!b.has_traceback());
    }
}
