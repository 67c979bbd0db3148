//! Capture entry points
//!
//! Each entry point invokes a target with no arguments and reports what it
//! raised. Any stale failure is discarded before the call, and the channel is
//! always empty when an entry point returns.

use std::fmt;

use serde::Serialize;
use tracing::debug;

use super::{ErrorKind, HostError};
use crate::core::CallContext;
use crate::models::{CallArgs, Owned};

/// Result of [`check_and_clear`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClearOutcome {
    Cleared { kind: ErrorKind },
    NoException,
}

impl ClearOutcome {
    pub fn was_cleared(&self) -> bool {
        matches!(self, ClearOutcome::Cleared { .. })
    }
}

impl fmt::Display for ClearOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ClearOutcome::Cleared { .. } => f.write_str("Exception was caught and cleared"),
            ClearOutcome::NoException => f.write_str("No exception occurred"),
        }
    }
}

/// Coarse classification reported by [`classify`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ExceptionClass {
    ValueError,
    TypeError,
    Other,
    NoException,
}

impl fmt::Display for ExceptionClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            ExceptionClass::ValueError => "ValueError caught",
            ExceptionClass::TypeError => "TypeError caught",
            ExceptionClass::Other => "Other exception caught",
            ExceptionClass::NoException => "No exception",
        };
        f.write_str(text)
    }
}

/// Snapshot of a captured failure
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ExceptionRecord {
    pub kind: ErrorKind,
    pub message: String,
    pub has_traceback: bool,
}

impl ExceptionRecord {
    pub fn from_error(error: &HostError) -> Self {
        Self {
            kind: error.kind().clone(),
            message: error.message().to_string(),
            has_traceback: error.has_traceback(),
        }
    }

    /// Host dict `{type, value, has_traceback}`
    pub fn to_host(&self) -> Owned {
        Owned::dict([
            ("type", Owned::str(self.kind.name())),
            ("value", Owned::str(self.message.as_str())),
            ("has_traceback", Owned::from(self.has_traceback)),
        ])
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}

/// Invoke `target` with no arguments and hand back what it raised, leaving
/// the channel empty
fn capture(ctx: &CallContext, target: &Owned) -> Option<HostError> {
    if let Some(stale) = ctx.fetch_pending() {
        debug!(kind = %stale.kind(), "discarding stale pending failure");
    }
    let captured = ctx.invoke(target, CallArgs::new()).err();
    ctx.clear_pending();
    if let Some(error) = &captured {
        debug!(kind = %error.kind(), text = %error.message(), "captured failure");
    }
    captured
}

/// Invoke `target` and swallow whatever it raises
pub fn check_and_clear(ctx: &CallContext, target: &Owned) -> ClearOutcome {
    match capture(ctx, target) {
        Some(error) => ClearOutcome::Cleared {
            kind: error.kind().clone(),
        },
        None => ClearOutcome::NoException,
    }
}

/// Invoke `target` and classify its failure by kind identity
pub fn classify(ctx: &CallContext, target: &Owned) -> ExceptionClass {
    match capture(ctx, target).map(|error| error.kind().clone()) {
        None => ExceptionClass::NoException,
        Some(ErrorKind::Value) => ExceptionClass::ValueError,
        Some(ErrorKind::Type) => ExceptionClass::TypeError,
        Some(_) => ExceptionClass::Other,
    }
}

/// Invoke `target` and snapshot its failure; `None` when it succeeded
pub fn snapshot(ctx: &CallContext, target: &Owned) -> Option<ExceptionRecord> {
    capture(ctx, target).map(|error| ExceptionRecord::from_error(&error))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_outcome_messages() {
        let cleared = ClearOutcome::Cleared { kind: ErrorKind::Runtime };
        assert_eq!(cleared.to_string(), "Exception was caught and cleared");
        assert_eq!(ClearOutcome::NoException.to_string(), "No exception occurred");
        assert_eq!(ExceptionClass::TypeError.to_string(), "TypeError caught");
    }

    #[test]
    fn test_record_serializes_kind_by_name() {
        let record = ExceptionRecord {
            kind: ErrorKind::Custom("CustomError".into()),
            message: "Custom message".into(),
            has_traceback: true,
        };
        let json: serde_json::Value = serde_json::from_str(&record.to_json().unwrap()).unwrap();
        assert_eq!(json["kind"], "CustomError");
        assert_eq!(json["message"], "Custom message");
        assert_eq!(json["has_traceback"], true);
    }
}
