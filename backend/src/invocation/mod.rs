//! Invocation Adapter
//!
//! Generic calls over opaque callables. The invocable capability is probed at
//! call time; a failure raised inside the target comes back unchanged.
//!
//! # Example
//!
//! ```rust
//! use host_bridge_core_rs::{CallContext, NativeFunction, Owned, Signature};
//! use host_bridge_core_rs::invocation::call_with_keywords;
//!
//! let ctx = CallContext::new();
//! let greet = Owned::function(NativeFunction::new(
//!     "greet",
//!     Signature::new().required("name").optional("greeting", "Hello"),
//!     |_, args| {
//!         let name: String = args.arg(0)?;
//!         let greeting: String = args.arg(1)?;
//!         Ok(Owned::str(format!("{}, {}!", greeting, name)))
//!     },
//! ));
//!
//! let result = call_with_keywords(&ctx, &greet, &[Owned::from("Alice")], &[("greeting".to_string(), Owned::from("Hi"))]).unwrap();
//! assert_eq!(result.extract::<String>().unwrap(), "Hi, Alice!");
//! ```

pub mod methods;

use tracing::debug;

use crate::core::CallContext;
use crate::exceptions::HostError;
use crate::models::{lookup_attribute, CallArgs, HostObject, Owned};

/// Invoke `target` with positional arguments only
///
/// # Errors
///
/// `InvocationError` if `target` is not invocable; otherwise whatever the
/// target raises.
pub fn call(ctx: &CallContext, target: &Owned, positional: &[Owned]) -> Result<Owned, HostError> {
    ctx.invoke(target, CallArgs::positional(positional.iter().cloned()))
}

/// Invoke `target` with positional arguments, then named arguments
///
/// Parameters named in neither fall back to the target's declared defaults.
///
/// # Errors
///
/// `ArgumentError` if `keywords` repeats a name or binding fails,
/// `InvocationError` if `target` is not invocable.
pub fn call_with_keywords(
    ctx: &CallContext,
    target: &Owned,
    positional: &[Owned],
    keywords: &[(String, Owned)],
) -> Result<Owned, HostError> {
    for (index, (name, _)) in keywords.iter().enumerate() {
        if keywords[..index].iter().any(|(earlier, _)| earlier == name) {
            return Err(HostError::argument(format!(
                "keyword argument repeated: '{}'",
                name
            )));
        }
    }
    let args = CallArgs::positional(positional.iter().cloned()).with_keywords(keywords.iter().cloned());
    ctx.invoke(target, args)
}

/// Invoke `target` with host-shaped arguments: a tuple or list of positional
/// values and an optional dict of named values
///
/// # Errors
///
/// `TypeError` if `args` is not a tuple/list or `kwargs` is not a dict.
pub fn call_object(
    ctx: &CallContext,
    target: &Owned,
    args: &Owned,
    kwargs: Option<&Owned>,
) -> Result<Owned, HostError> {
    let positional: Vec<Owned> = match args.object() {
        HostObject::Tuple(items) => items.clone(),
        HostObject::List(items) => items.borrow().clone(),
        _ => {
            return Err(HostError::type_error(format!(
                "argument list must be a tuple, not {}",
                args.type_name()
            )))
        }
    };
    let keywords = match kwargs.map(|kwargs| kwargs.object()) {
        None | Some(HostObject::None) => Vec::new(),
        Some(HostObject::Dict(dict)) => dict.entries(),
        Some(other) => {
            return Err(HostError::type_error(format!(
                "keyword arguments must be a dict, not {}",
                other.type_name()
            )))
        }
    };
    call_with_keywords(ctx, target, &positional, &keywords)
}

/// Resolve `method_name` on `receiver` and invoke it with `args`
///
/// # Errors
///
/// `AttributeLookupError` if absent, `InvocationError` if the member is not
/// invocable.
pub fn call_method(
    ctx: &CallContext,
    receiver: &Owned,
    method_name: &str,
    args: &[Owned],
) -> Result<Owned, HostError> {
    debug!(method = method_name, receiver = %receiver.type_name(), "call_method");
    let member = lookup_attribute(receiver, method_name)?;
    if !member.is_callable() {
        return Err(HostError::invocation(format!(
            "'{}' attribute '{}' of '{}' object is not callable",
            member.type_name(),
            method_name,
            receiver.type_name()
        )));
    }
    call(ctx, &member, args)
}

/// Import a registered module and call one of its functions with no arguments
///
/// # Errors
///
/// `ImportError` for an unknown module, `AttributeLookupError` for an unknown
/// function, `InvocationError` if the attribute is not invocable.
pub fn import_and_call(ctx: &CallContext, module_name: &str, function_name: &str) -> Result<Owned, HostError> {
    let module = ctx.import(module_name)?;
    let function = lookup_attribute(&module, function_name)?;
    if !function.is_callable() {
        return Err(HostError::invocation("attribute is not callable"));
    }
    ctx.invoke(&function, CallArgs::new())
}
