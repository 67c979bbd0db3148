//! Attribute-bearing host values: classes, instances, modules
//!
//! Member lookup ([`lookup_attribute`]) is the capability probe behind
//! `call_method`: instance attributes first, then class methods (bound to the
//! receiver), then module attributes, then the builtin methods of the
//! receiver's shape.

use std::cell::RefCell;
use std::rc::Rc;

use crate::exceptions::HostError;
use crate::invocation::methods::builtin_method;

use super::function::NativeFunction;
use super::value::{HostObject, Owned};

/// Named attribute storage
#[derive(Debug, Default)]
pub struct Attributes {
    entries: RefCell<Vec<(String, Owned)>>,
}

impl Attributes {
    pub fn get(&self, name: &str) -> Option<Owned> {
        self.entries
            .borrow()
            .iter()
            .find(|(existing, _)| existing == name)
            .map(|(_, value)| value.clone())
    }

    pub fn set(&self, name: impl Into<String>, value: Owned) {
        let name = name.into();
        let mut entries = self.entries.borrow_mut();
        match entries.iter_mut().find(|(existing, _)| *existing == name) {
            Some(entry) => entry.1 = value,
            None => entries.push((name, value)),
        }
    }

    pub fn contains(&self, name: &str) -> bool {
        self.entries.borrow().iter().any(|(existing, _)| existing == name)
    }

    pub fn names(&self) -> Vec<String> {
        self.entries.borrow().iter().map(|(name, _)| name.clone()).collect()
    }
}

/// Method table shared by all instances of a class
#[derive(Debug)]
pub struct Class {
    name: String,
    methods: Vec<(String, Owned)>,
}

impl Class {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            methods: Vec::new(),
        }
    }

    /// Add a method; the instance is passed as its first argument
    pub fn method(mut self, name: impl Into<String>, function: NativeFunction) -> Self {
        self.methods.push((name.into(), Owned::function(function)));
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    fn find_method(&self, name: &str) -> Option<&Owned> {
        self.methods
            .iter()
            .find(|(existing, _)| existing == name)
            .map(|(_, function)| function)
    }
}

#[derive(Debug)]
pub struct Instance {
    class: Rc<Class>,
    attributes: Attributes,
}

impl Instance {
    pub fn new(class: Rc<Class>) -> Self {
        Self {
            class,
            attributes: Attributes::default(),
        }
    }

    pub fn with_attr(self, name: impl Into<String>, value: Owned) -> Self {
        self.attributes.set(name, value);
        self
    }

    pub fn class_name(&self) -> &str {
        self.class.name()
    }

    pub fn attributes(&self) -> &Attributes {
        &self.attributes
    }
}

/// Importable namespace registered on a [`CallContext`](crate::CallContext)
#[derive(Debug)]
pub struct Module {
    name: String,
    attributes: Attributes,
}

impl Module {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            attributes: Attributes::default(),
        }
    }

    /// Add `function` as attribute `name`
    pub fn with_function(self, name: impl Into<String>, function: NativeFunction) -> Self {
        self.attributes.set(name, Owned::function(function));
        self
    }

    pub fn with_attr(self, name: impl Into<String>, value: Owned) -> Self {
        self.attributes.set(name, value);
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn attributes(&self) -> &Attributes {
        &self.attributes
    }
}

/// Resolve `name` against the capability set of `receiver`
///
/// # Errors
///
/// `AttributeLookupError` if no member of that name exists.
pub fn lookup_attribute(receiver: &Owned, name: &str) -> Result<Owned, HostError> {
    match receiver.object() {
        HostObject::Instance(instance) => {
            if let Some(value) = instance.attributes().get(name) {
                return Ok(value);
            }
            if let Some(method) = instance.class.find_method(name) {
                return Ok(Owned::bound_method(receiver.clone(), method.clone()));
            }
        }
        HostObject::Module(module) => {
            if let Some(value) = module.attributes().get(name) {
                return Ok(value);
            }
        }
        _ => {}
    }

    builtin_method(receiver, name).ok_or_else(|| match receiver.object() {
        HostObject::Module(module) => HostError::attribute_lookup(format!(
            "module '{}' has no attribute '{}'",
            module.name(),
            name
        )),
        _ => HostError::attribute_lookup(format!(
            "'{}' object has no attribute '{}'",
            receiver.type_name(),
            name
        )),
    })
}
