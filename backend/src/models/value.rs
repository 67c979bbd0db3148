//! Host values and references
//!
//! [`HostObject`] is the tagged set of value shapes the host can hand to native
//! code. Native code holds them through two reference types:
//!
//! - [`Owned`]: a counted reference. Cloning it takes a new reference and
//!   dropping it releases one; it may be stored anywhere.
//! - [`Borrowed`]: valid only while the owner it was borrowed from is in
//!   scope. It is neither `Clone` nor `Copy` and keeps only a weak link, so it
//!   cannot keep its referent alive. Retaining it requires
//!   [`Borrowed::promote`], which fails if the referent was released in the
//!   meantime.
//!
//! # Example
//!
//! ```rust
//! use host_bridge_core_rs::Owned;
//!
//! let list = Owned::list(vec![Owned::from(1), Owned::from(2)]);
//! let first = list.get_item(0).unwrap();   // borrowed
//! let kept = first.promote().unwrap();     // owned from here on
//! assert_eq!(kept.extract::<i64>().unwrap(), 1);
//! ```

use std::cell::RefCell;
use std::collections::HashSet;
use std::fmt;
use std::marker::PhantomData;
use std::ops::Deref;
use std::rc::{Rc, Weak};

use crate::capsule::CapsuleRef;
use crate::exceptions::{ErrorKind, HostError};
use crate::iteration::{Generator, RangeIterator};

use super::function::{BoundMethod, Invocable, NativeFunction};
use super::namespace::{Instance, Module};

/// A host-managed value of runtime-determined shape
pub enum HostObject {
    None,
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(String),
    Bytes(Vec<u8>),
    List(RefCell<Vec<Owned>>),
    Tuple(Vec<Owned>),
    Dict(Dict),
    Function(NativeFunction),
    BoundMethod(BoundMethod),
    Generator(Generator),
    RangeIterator(RefCell<RangeIterator>),
    Capsule(CapsuleRef),
    Instance(Instance),
    Module(Module),
}

impl HostObject {
    /// Host-visible type name, used in failure messages
    pub fn type_name(&self) -> String {
        let name = match self {
            HostObject::None => "NoneType",
            HostObject::Bool(_) => "bool",
            HostObject::Int(_) => "int",
            HostObject::Float(_) => "float",
            HostObject::Str(_) => "str",
            HostObject::Bytes(_) => "bytes",
            HostObject::List(_) => "list",
            HostObject::Tuple(_) => "tuple",
            HostObject::Dict(_) => "dict",
            HostObject::Function(_) => "builtin_function",
            HostObject::BoundMethod(_) => "method",
            HostObject::Generator(_) => "generator",
            HostObject::RangeIterator(_) => "RangeIterator",
            HostObject::Capsule(_) => "capsule",
            HostObject::Instance(instance) => return instance.class_name().to_string(),
            HostObject::Module(_) => "module",
        };
        name.to_string()
    }

    fn repr(&self) -> String {
        self.repr_within(&mut HashSet::new())
    }

    /// `open` holds the containers currently being formatted; meeting one of
    /// them again prints an ellipsis instead of recursing
    fn repr_within(&self, open: &mut HashSet<*const HostObject>) -> String {
        let this: *const HostObject = self;
        let ellipsis = match self {
            HostObject::List(_) => "[...]",
            HostObject::Tuple(_) => "(...)",
            HostObject::Dict(_) => "{...}",
            _ => "",
        };
        if !ellipsis.is_empty() && !open.insert(this) {
            return ellipsis.to_string();
        }
        let text = match self {
            HostObject::None => "None".to_string(),
            HostObject::Bool(true) => "True".to_string(),
            HostObject::Bool(false) => "False".to_string(),
            HostObject::Int(value) => value.to_string(),
            HostObject::Float(value) => format!("{:?}", value),
            HostObject::Str(text) => format!("{:?}", text),
            HostObject::Bytes(bytes) => format!("b{:?}", String::from_utf8_lossy(bytes)),
            HostObject::List(items) => format!("[{}]", join_repr(&items.borrow(), open)),
            HostObject::Tuple(items) => format!("({})", join_repr(items, open)),
            HostObject::Dict(dict) => {
                let entries: Vec<String> = dict
                    .entries()
                    .iter()
                    .map(|(key, value)| format!("{:?}: {}", key, value.repr_within(open)))
                    .collect();
                format!("{{{}}}", entries.join(", "))
            }
            HostObject::Function(function) => format!("<built-in function {}>", function.name()),
            HostObject::BoundMethod(method) => format!("<bound method {}>", method.name()),
            HostObject::Generator(generator) => format!("<generator {}>", generator.name()),
            HostObject::Module(module) => format!("<module '{}'>", module.name()),
            other => format!("<{} object>", other.type_name()),
        };
        open.remove(&this);
        text
    }
}

fn join_repr(items: &[Owned], open: &mut HashSet<*const HostObject>) -> String {
    items
        .iter()
        .map(|item| item.repr_within(open))
        .collect::<Vec<_>>()
        .join(", ")
}

impl fmt::Debug for HostObject {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.repr())
    }
}

impl PartialEq for HostObject {
    /// Structural equality for data shapes; everything else compares unequal
    /// here and only equal by identity (see `Owned`'s `PartialEq`). Nesting
    /// past [`MAX_NESTING_DEPTH`] compares unequal; use [`Owned::try_eq`] to
    /// see it as a failure.
    fn eq(&self, other: &Self) -> bool {
        structural_eq(self, other, 0).unwrap_or(false)
    }
}

/// Containers nested deeper than this are treated as runaway (typically
/// cyclic) by structural comparison and by conversions that copy values
pub const MAX_NESTING_DEPTH: usize = 256;

pub(crate) fn nesting_too_deep(operation: &str) -> HostError {
    HostError::new(
        ErrorKind::Recursion,
        format!("maximum recursion depth exceeded {}", operation),
    )
}

fn structural_eq(a: &HostObject, b: &HostObject, depth: usize) -> Result<bool, HostError> {
    if std::ptr::eq(a, b) {
        return Ok(true);
    }
    if depth > MAX_NESTING_DEPTH {
        return Err(nesting_too_deep("in comparison"));
    }
    let equal = match (a, b) {
        (HostObject::None, HostObject::None) => true,
        (HostObject::Bool(a), HostObject::Bool(b)) => a == b,
        (HostObject::Int(a), HostObject::Int(b)) => a == b,
        (HostObject::Float(a), HostObject::Float(b)) => a == b,
        (HostObject::Int(a), HostObject::Float(b)) | (HostObject::Float(b), HostObject::Int(a)) => {
            *a as f64 == *b
        }
        (HostObject::Str(a), HostObject::Str(b)) => a == b,
        (HostObject::Bytes(a), HostObject::Bytes(b)) => a == b,
        (HostObject::List(a), HostObject::List(b)) => sequences_eq(&a.borrow(), &b.borrow(), depth)?,
        (HostObject::Tuple(a), HostObject::Tuple(b)) => sequences_eq(a, b, depth)?,
        (HostObject::Dict(a), HostObject::Dict(b)) => dicts_eq(a, b, depth)?,
        _ => false,
    };
    Ok(equal)
}

fn sequences_eq(a: &[Owned], b: &[Owned], depth: usize) -> Result<bool, HostError> {
    if a.len() != b.len() {
        return Ok(false);
    }
    for (left, right) in a.iter().zip(b) {
        if !structural_eq(left, right, depth + 1)? {
            return Ok(false);
        }
    }
    Ok(true)
}

fn dicts_eq(a: &Dict, b: &Dict, depth: usize) -> Result<bool, HostError> {
    if a.len() != b.len() {
        return Ok(false);
    }
    for (key, value) in a.entries() {
        let Some(other) = b.get(&key) else {
            return Ok(false);
        };
        if !structural_eq(&value, &other, depth + 1)? {
            return Ok(false);
        }
    }
    Ok(true)
}

/// String-keyed mapping preserving insertion order
#[derive(Default)]
pub struct Dict {
    entries: RefCell<Vec<(String, Owned)>>,
}

impl Dict {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, key: &str) -> Option<Owned> {
        self.entries
            .borrow()
            .iter()
            .find(|(existing, _)| existing == key)
            .map(|(_, value)| value.clone())
    }

    /// Insert or replace; a replaced key keeps its original position
    pub fn set(&self, key: impl Into<String>, value: Owned) {
        let key = key.into();
        let mut entries = self.entries.borrow_mut();
        match entries.iter_mut().find(|(existing, _)| *existing == key) {
            Some(entry) => entry.1 = value,
            None => entries.push((key, value)),
        }
    }

    pub fn remove(&self, key: &str) -> Option<Owned> {
        let mut entries = self.entries.borrow_mut();
        let index = entries.iter().position(|(existing, _)| existing == key)?;
        Some(entries.remove(index).1)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.entries.borrow().iter().any(|(existing, _)| existing == key)
    }

    pub fn len(&self) -> usize {
        self.entries.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn keys(&self) -> Vec<String> {
        self.entries.borrow().iter().map(|(key, _)| key.clone()).collect()
    }

    /// Key at insertion position `index`
    pub fn key_at(&self, index: usize) -> Option<String> {
        self.entries.borrow().get(index).map(|(key, _)| key.clone())
    }

    /// Snapshot of all entries
    pub fn entries(&self) -> Vec<(String, Owned)> {
        self.entries.borrow().clone()
    }
}

impl PartialEq for Dict {
    fn eq(&self, other: &Self) -> bool {
        dicts_eq(self, other, 0).unwrap_or(false)
    }
}

/// Counted reference to a host value
#[derive(Clone)]
pub struct Owned(Rc<HostObject>);

impl Owned {
    pub fn new(object: HostObject) -> Self {
        Owned(Rc::new(object))
    }

    pub fn none() -> Self {
        Self::new(HostObject::None)
    }

    pub fn str(text: impl Into<String>) -> Self {
        Self::new(HostObject::Str(text.into()))
    }

    pub fn bytes(bytes: impl Into<Vec<u8>>) -> Self {
        Self::new(HostObject::Bytes(bytes.into()))
    }

    pub fn list(items: Vec<Owned>) -> Self {
        Self::new(HostObject::List(RefCell::new(items)))
    }

    pub fn tuple(items: Vec<Owned>) -> Self {
        Self::new(HostObject::Tuple(items))
    }

    pub fn dict<K: Into<String>>(entries: impl IntoIterator<Item = (K, Owned)>) -> Self {
        let dict = Dict::new();
        for (key, value) in entries {
            dict.set(key, value);
        }
        Self::new(HostObject::Dict(dict))
    }

    pub fn function(function: NativeFunction) -> Self {
        Self::new(HostObject::Function(function))
    }

    /// Bind `function` to `receiver`, which is passed as the first argument
    pub fn bound_method(receiver: Owned, function: Owned) -> Self {
        Self::new(HostObject::BoundMethod(BoundMethod::new(receiver, function)))
    }

    pub fn generator(generator: Generator) -> Self {
        Self::new(HostObject::Generator(generator))
    }

    pub fn range_iterator(iterator: RangeIterator) -> Self {
        Self::new(HostObject::RangeIterator(RefCell::new(iterator)))
    }

    pub fn instance(instance: Instance) -> Self {
        Self::new(HostObject::Instance(instance))
    }

    pub fn object(&self) -> &HostObject {
        &self.0
    }

    pub fn is_none(&self) -> bool {
        matches!(*self.0, HostObject::None)
    }

    /// Identity comparison
    pub fn is(&self, other: &Owned) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }

    /// Number of owned references currently held
    pub fn ref_count(&self) -> usize {
        Rc::strong_count(&self.0)
    }

    /// Invocable capability probe
    pub fn is_callable(&self) -> bool {
        self.as_invocable().is_some()
    }

    /// Iteration capability probe (built-in shapes only)
    pub fn is_iterable(&self) -> bool {
        self.as_iterable().is_some()
    }

    /// Borrow this value for the current scope without taking a reference
    pub fn borrow(&self) -> Borrowed<'_> {
        Borrowed::new(&self.0)
    }

    /// Borrow the list item at `index`
    ///
    /// The result does not keep the item alive: if a re-entrant call removes
    /// it from the list, promotion fails with `ReferenceExpiredError`.
    pub fn get_item(&self, index: usize) -> Result<Borrowed<'_>, HostError> {
        let HostObject::List(items) = self.object() else {
            return Err(HostError::type_error(format!(
                "expected list, got {}",
                self.type_name()
            )));
        };
        let items = items.borrow();
        let item = items
            .get(index)
            .ok_or_else(|| HostError::index_error("list index out of range"))?;
        Ok(Borrowed::new(&item.0))
    }

    pub fn extract<T: FromHost>(&self) -> Result<T, HostError> {
        T::from_host(self)
    }

    /// Structural comparison that reports runaway nesting
    ///
    /// # Errors
    ///
    /// `RecursionError` once containers nest past [`MAX_NESTING_DEPTH`], as
    /// when two distinct lists each contain themselves.
    pub fn try_eq(&self, other: &Owned) -> Result<bool, HostError> {
        structural_eq(self, other, 0)
    }
}

impl Deref for Owned {
    type Target = HostObject;

    fn deref(&self) -> &HostObject {
        &self.0
    }
}

impl fmt::Debug for Owned {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(&*self.0, f)
    }
}

impl fmt::Display for Owned {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.object() {
            HostObject::Str(text) => f.write_str(text),
            other => f.write_str(&other.repr()),
        }
    }
}

impl PartialEq for Owned {
    fn eq(&self, other: &Self) -> bool {
        self.is(other) || *self.0 == *other.0
    }
}

impl From<i64> for Owned {
    fn from(value: i64) -> Self {
        Owned::new(HostObject::Int(value))
    }
}

impl From<i32> for Owned {
    fn from(value: i32) -> Self {
        Owned::new(HostObject::Int(i64::from(value)))
    }
}

impl From<f64> for Owned {
    fn from(value: f64) -> Self {
        Owned::new(HostObject::Float(value))
    }
}

impl From<bool> for Owned {
    fn from(value: bool) -> Self {
        Owned::new(HostObject::Bool(value))
    }
}

impl From<&str> for Owned {
    fn from(value: &str) -> Self {
        Owned::str(value)
    }
}

impl From<String> for Owned {
    fn from(value: String) -> Self {
        Owned::str(value)
    }
}

/// Reference valid only while its owner is in scope
///
/// Deliberately neither `Clone` nor `Copy`.
pub struct Borrowed<'a> {
    referent: Weak<HostObject>,
    _scope: PhantomData<&'a HostObject>,
}

impl<'a> Borrowed<'a> {
    fn new(referent: &Rc<HostObject>) -> Self {
        Self {
            referent: Rc::downgrade(referent),
            _scope: PhantomData,
        }
    }

    /// True while the referent is still held by someone
    pub fn is_alive(&self) -> bool {
        self.referent.strong_count() > 0
    }

    /// Take an owned reference that may outlive the borrow
    pub fn promote(&self) -> Result<Owned, HostError> {
        self.referent.upgrade().map(Owned).ok_or_else(|| {
            HostError::new(
                ErrorKind::ReferenceExpired,
                "borrowed reference outlived its referent",
            )
        })
    }

    /// Run `f` against the referent, failing if it has been released
    pub fn with<R>(&self, f: impl FnOnce(&HostObject) -> R) -> Result<R, HostError> {
        let owned = self.promote()?;
        Ok(f(owned.object()))
    }
}

impl fmt::Debug for Borrowed<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.referent.upgrade() {
            Some(object) => write!(f, "Borrowed({:?})", object),
            None => f.write_str("Borrowed(<expired>)"),
        }
    }
}

/// Conversion from a host value into a native Rust value
pub trait FromHost: Sized {
    fn from_host(value: &Owned) -> Result<Self, HostError>;
}

fn expected(what: &str, value: &Owned) -> HostError {
    HostError::argument(format!("expected {}, got {}", what, value.type_name()))
}

impl FromHost for Owned {
    fn from_host(value: &Owned) -> Result<Self, HostError> {
        Ok(value.clone())
    }
}

impl FromHost for i64 {
    fn from_host(value: &Owned) -> Result<Self, HostError> {
        match value.object() {
            HostObject::Int(number) => Ok(*number),
            HostObject::Bool(flag) => Ok(i64::from(*flag)),
            _ => Err(expected("int", value)),
        }
    }
}

impl FromHost for i32 {
    fn from_host(value: &Owned) -> Result<Self, HostError> {
        let wide = i64::from_host(value)?;
        i32::try_from(wide).map_err(|_| {
            HostError::argument(format!("integer {} out of range for a 32-bit int", wide))
        })
    }
}

impl FromHost for f64 {
    fn from_host(value: &Owned) -> Result<Self, HostError> {
        match value.object() {
            HostObject::Float(number) => Ok(*number),
            HostObject::Int(number) => Ok(*number as f64),
            _ => Err(expected("float", value)),
        }
    }
}

impl FromHost for bool {
    fn from_host(value: &Owned) -> Result<Self, HostError> {
        match value.object() {
            HostObject::Bool(flag) => Ok(*flag),
            _ => Err(expected("bool", value)),
        }
    }
}

impl FromHost for String {
    fn from_host(value: &Owned) -> Result<Self, HostError> {
        match value.object() {
            HostObject::Str(text) => Ok(text.clone()),
            _ => Err(expected("str", value)),
        }
    }
}

impl<T: FromHost> FromHost for Vec<T> {
    fn from_host(value: &Owned) -> Result<Self, HostError> {
        match value.object() {
            HostObject::List(items) => items.borrow().iter().map(T::from_host).collect(),
            HostObject::Tuple(items) => items.iter().map(T::from_host).collect(),
            _ => Err(expected("list or tuple", value)),
        }
    }
}

impl<T: FromHost> FromHost for Option<T> {
    fn from_host(value: &Owned) -> Result<Self, HostError> {
        if value.is_none() {
            Ok(None)
        } else {
            T::from_host(value).map(Some)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_structural_equality() {
        let a = Owned::list(vec![Owned::from(1), Owned::from("x")]);
        let b = Owned::list(vec![Owned::from(1), Owned::from("x")]);
        assert_eq!(a, b);
        assert!(!a.is(&b));
        assert_eq!(Owned::from(2), Owned::from(2.0));
    }

    #[test]
    fn test_dict_equality_ignores_order() {
        let a = Owned::dict(vec![("x", Owned::from(1)), ("y", Owned::from(2))]);
        let b = Owned::dict(vec![("y", Owned::from(2)), ("x", Owned::from(1))]);
        assert_eq!(a, b);
    }

    #[test]
    fn test_dict_set_keeps_position() {
        let dict = Dict::new();
        dict.set("a", Owned::from(1));
        dict.set("b", Owned::from(2));
        dict.set("a", Owned::from(3));
        assert_eq!(dict.keys(), vec!["a".to_string(), "b".to_string()]);
        assert_eq!(dict.get("a"), Some(Owned::from(3)));
    }

    #[test]
    fn test_ref_count_tracks_clones() {
        let value = Owned::from("shared");
        assert_eq!(value.ref_count(), 1);
        let second = value.clone();
        assert_eq!(value.ref_count(), 2);
        drop(second);
        assert_eq!(value.ref_count(), 1);
    }

    #[test]
    fn test_borrow_does_not_take_reference() {
        let value = Owned::from(7);
        let borrowed = value.borrow();
        assert_eq!(value.ref_count(), 1);
        assert!(borrowed.is_alive());
    }

    #[test]
    fn test_repr() {
        let value = Owned::list(vec![Owned::none(), Owned::from(true), Owned::from("a")]);
        assert_eq!(format!("{:?}", value), "[None, True, \"a\"]");
    }
}
