//! Iteration Adapter
//!
//! Uniform draining of anything exposing the iteration capability: lists,
//! tuples, text (one-character strings), bytes (integers), dicts (keys),
//! generators, range iterators, and instances with an invocable `__iter__`.
//!
//! Length hints only size the initial allocation (capped by
//! `drain_prealloc_limit`); production order and count come from the source
//! alone.
//!
//! # Example
//!
//! ```rust
//! use host_bridge_core_rs::{CallContext, Owned, RangeIterator};
//! use host_bridge_core_rs::iteration::drain;
//!
//! let ctx = CallContext::new();
//! let iter = Owned::range_iterator(RangeIterator::new(0, 3, 1).unwrap());
//!
//! let first: Vec<i64> = drain(&ctx, &iter).unwrap().iter().map(|v| v.extract().unwrap()).collect();
//! assert_eq!(first, vec![0, 1, 2]);
//! assert!(drain(&ctx, &iter).unwrap().is_empty());
//! ```

pub mod generator;
pub mod range;

use std::cell::RefCell;

use tracing::debug;

use crate::core::CallContext;
use crate::exceptions::HostError;
use crate::models::{lookup_attribute, CallArgs, Dict, HostObject, Owned};

pub use generator::{Generator, Producer};
pub use range::RangeIterator;

/// The iteration capability
///
/// `cursor` is private to one drain: indexable sources use it as a position,
/// one-shot sources ignore it and advance their own state.
pub trait Iterable {
    fn next_item(&self, ctx: &CallContext, cursor: &mut usize) -> Result<Option<Owned>, HostError>;

    fn length_hint(&self) -> Option<usize> {
        None
    }
}

impl HostObject {
    pub fn as_iterable(&self) -> Option<&dyn Iterable> {
        match self {
            HostObject::List(items) => Some(items as &dyn Iterable),
            HostObject::Tuple(items) => Some(items as &dyn Iterable),
            HostObject::Str(text) => Some(text as &dyn Iterable),
            HostObject::Bytes(bytes) => Some(bytes as &dyn Iterable),
            HostObject::Dict(dict) => Some(dict as &dyn Iterable),
            HostObject::Generator(generator) => Some(generator as &dyn Iterable),
            HostObject::RangeIterator(iterator) => Some(iterator as &dyn Iterable),
            _ => None,
        }
    }
}

impl Iterable for RefCell<Vec<Owned>> {
    fn next_item(&self, _ctx: &CallContext, cursor: &mut usize) -> Result<Option<Owned>, HostError> {
        let item = self.borrow().get(*cursor).cloned();
        if item.is_some() {
            *cursor += 1;
        }
        Ok(item)
    }

    fn length_hint(&self) -> Option<usize> {
        Some(self.borrow().len())
    }
}

impl Iterable for Vec<Owned> {
    fn next_item(&self, _ctx: &CallContext, cursor: &mut usize) -> Result<Option<Owned>, HostError> {
        let item = self.get(*cursor).cloned();
        if item.is_some() {
            *cursor += 1;
        }
        Ok(item)
    }

    fn length_hint(&self) -> Option<usize> {
        Some(self.len())
    }
}

impl Iterable for String {
    fn next_item(&self, _ctx: &CallContext, cursor: &mut usize) -> Result<Option<Owned>, HostError> {
        let next = self.get(*cursor..).and_then(|rest| rest.chars().next());
        Ok(next.map(|ch| {
            *cursor += ch.len_utf8();
            Owned::str(ch.to_string())
        }))
    }

    fn length_hint(&self) -> Option<usize> {
        Some(self.len())
    }
}

impl Iterable for Vec<u8> {
    fn next_item(&self, _ctx: &CallContext, cursor: &mut usize) -> Result<Option<Owned>, HostError> {
        let byte = self.get(*cursor).copied();
        if byte.is_some() {
            *cursor += 1;
        }
        Ok(byte.map(|b| Owned::from(i64::from(b))))
    }

    fn length_hint(&self) -> Option<usize> {
        Some(self.len())
    }
}

impl Iterable for Dict {
    fn next_item(&self, _ctx: &CallContext, cursor: &mut usize) -> Result<Option<Owned>, HostError> {
        let key = self.key_at(*cursor);
        if key.is_some() {
            *cursor += 1;
        }
        Ok(key.map(Owned::str))
    }

    fn length_hint(&self) -> Option<usize> {
        Some(self.len())
    }
}

impl Iterable for Generator {
    fn next_item(&self, ctx: &CallContext, _cursor: &mut usize) -> Result<Option<Owned>, HostError> {
        self.resume(ctx)
    }

    fn length_hint(&self) -> Option<usize> {
        Generator::length_hint(self)
    }
}

impl Iterable for RefCell<RangeIterator> {
    fn next_item(&self, _ctx: &CallContext, _cursor: &mut usize) -> Result<Option<Owned>, HostError> {
        Ok(self.borrow_mut().next().map(Owned::from))
    }

    fn length_hint(&self) -> Option<usize> {
        Some(self.borrow().remaining())
    }
}

fn not_iterable(value: &Owned) -> HostError {
    HostError::iteration_unsupported(format!("'{}' object is not iterable", value.type_name()))
}

/// Convert any iterable into a finite ordered sequence
///
/// # Errors
///
/// - `IterationUnsupportedError` if `iterable` exposes no iteration capability
/// - any failure raised by the source while producing
pub fn drain(ctx: &CallContext, iterable: &Owned) -> Result<Vec<Owned>, HostError> {
    if let Some(source) = iterable.as_iterable() {
        return drain_source(ctx, source);
    }

    if let HostObject::Instance(_) = iterable.object() {
        if let Ok(method) = lookup_attribute(iterable, "__iter__") {
            if method.is_callable() {
                let produced = ctx.invoke(&method, CallArgs::new())?;
                return match produced.as_iterable() {
                    Some(source) => drain_source(ctx, source),
                    None => Err(HostError::iteration_unsupported(format!(
                        "iter() returned non-iterator of type '{}'",
                        produced.type_name()
                    ))),
                };
            }
        }
    }

    Err(not_iterable(iterable))
}

fn drain_source(ctx: &CallContext, source: &dyn Iterable) -> Result<Vec<Owned>, HostError> {
    let capacity = source
        .length_hint()
        .unwrap_or(0)
        .min(ctx.config().drain_prealloc_limit);
    let mut items = Vec::with_capacity(capacity);
    let mut cursor = 0;
    while let Some(item) = source.next_item(ctx, &mut cursor)? {
        items.push(item);
    }
    debug!(count = items.len(), "drained iterable");
    Ok(items)
}

/// Drain into a host list
pub fn iterate(ctx: &CallContext, iterable: &Owned) -> Result<Owned, HostError> {
    drain(ctx, iterable).map(Owned::list)
}

/// Request one value from a one-shot iterator
///
/// Returns `Ok(None)` at end of sequence.
///
/// # Errors
///
/// `IterationUnsupportedError` if `iterator` is not a generator or range
/// iterator; otherwise whatever the producer raises.
pub fn next(ctx: &CallContext, iterator: &Owned) -> Result<Option<Owned>, HostError> {
    match iterator.object() {
        HostObject::Generator(generator) => generator.resume(ctx),
        HostObject::RangeIterator(range) => Ok(range.borrow_mut().next().map(Owned::from)),
        _ => Err(HostError::iteration_unsupported(format!(
            "'{}' object is not an iterator",
            iterator.type_name()
        ))),
    }
}
