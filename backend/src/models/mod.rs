//! Host object model: values, references, functions, namespaces

pub mod function;
pub mod namespace;
pub mod value;

// Re-exports
pub use function::{BoundArgs, BoundMethod, CallArgs, Invocable, NativeFunction, Parameter, Signature};
pub use namespace::{lookup_attribute, Attributes, Class, Instance, Module};
pub use value::{Borrowed, Dict, FromHost, HostObject, Owned, MAX_NESTING_DEPTH};
