//! Host Bridge Core - Rust Engine
//!
//! Native-side adapter layer between native code and a dynamic host runtime.
//!
//! # Architecture
//!
//! - **core**: Call context (failure channel, call depth, module registry) and configuration
//! - **models**: Host object model (values, references, functions, namespaces)
//! - **invocation**: Calls over opaque callables and method dispatch
//! - **iteration**: Draining iterables, range iterators, generators
//! - **capsule**: Opaque resource handles with destructor lifecycle
//! - **exceptions**: Failure kinds, pending-failure channel, capture entry points
//! - **codec**: Strict bytes/text conversion
//!
//! # Critical Invariants
//!
//! 1. Every acquired reference is released exactly once (`Owned` is counted, `Borrowed` is not)
//! 2. At most one failure is pending per context, and every capture entry point leaves none
//! 3. A capsule name never exceeds its fixed buffer
//! 4. FFI boundary is minimal and safe

// Module declarations
pub mod capsule;
pub mod codec;
pub mod core;
pub mod exceptions;
pub mod invocation;
pub mod iteration;
pub mod models;

// Re-exports for convenience
pub use capsule::{CapsuleArena, CapsuleName, CapsuleRef, Point};
pub use codec::Encoding;
pub use crate::core::{BridgeConfig, CallContext, ConfigError, WarningRecord};
pub use exceptions::{
    ClearOutcome, ErrorKind, ExceptionClass, ExceptionRecord, FailureChannel, HostError,
    WarningCategory,
};
pub use iteration::{Generator, Iterable, RangeIterator};
pub use models::{
    Borrowed, BoundArgs, CallArgs, Class, Dict, FromHost, HostObject, Instance, Invocable, Module,
    NativeFunction, Owned, Signature,
};

// FFI module (when feature enabled)
#[cfg(feature = "pyo3")]
pub mod ffi;

// PyO3 exports (when feature enabled)
#[cfg(feature = "pyo3")]
use pyo3::prelude::*;

#[cfg(feature = "pyo3")]
#[pymodule]
fn host_bridge_core_rs(m: &Bound<'_, PyModule>) -> PyResult<()> {
    ffi::functions::register(m)
}
