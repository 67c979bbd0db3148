//! FFI (Foreign Function Interface) module
//!
//! PyO3 bindings exposing the bridge as a Python extension module.
//!
//! # Design Principles
//!
//! 1. **One context per thread**: every entry point runs against a
//!    thread-local [`CallContext`](crate::CallContext); handles are unsendable.
//! 2. **Data crosses by value**: None, bool, int, float, str, bytes, list,
//!    tuple and dict are copied; everything else crosses as an opaque
//!    `HostObject` handle.
//! 3. **Failures keep their identity**: a Python exception that passed through
//!    the bridge is re-raised as the same exception object.

pub mod functions;
pub mod host_object;
pub mod types;

use crate::core::CallContext;

thread_local! {
    static CONTEXT: CallContext = CallContext::new();
}

/// Run `f` against this thread's call context
pub(crate) fn with_context<R>(f: impl FnOnce(&CallContext) -> R) -> R {
    CONTEXT.with(f)
}
