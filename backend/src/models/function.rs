//! Native functions and the invocable capability
//!
//! A native function pairs a body with a declared [`Signature`]. Binding
//! follows the host's calling convention: positional arguments fill
//! parameters in order, keyword arguments fill the rest by name, and anything
//! still unbound falls back to the parameter's default.

use std::fmt;
use std::rc::Rc;

use crate::core::CallContext;
use crate::exceptions::HostError;

use super::value::{FromHost, HostObject, Owned};

/// Body of a native function
pub type NativeBody = dyn Fn(&CallContext, BoundArgs) -> Result<Owned, HostError>;

/// The invocable capability
///
/// Implemented by the host variants that can be called; probed at call time
/// through [`HostObject::as_invocable`].
pub trait Invocable {
    /// Name used for traceback frames and failure messages
    fn name(&self) -> &str;

    fn invoke(&self, ctx: &CallContext, args: CallArgs) -> Result<Owned, HostError>;
}

impl HostObject {
    pub fn as_invocable(&self) -> Option<&dyn Invocable> {
        match self {
            HostObject::Function(function) => Some(function as &dyn Invocable),
            HostObject::BoundMethod(method) => Some(method as &dyn Invocable),
            _ => None,
        }
    }
}

/// Arguments as supplied by the caller, before binding
#[derive(Debug, Clone, Default)]
pub struct CallArgs {
    pub positional: Vec<Owned>,
    pub keywords: Vec<(String, Owned)>,
}

impl CallArgs {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn positional(args: impl IntoIterator<Item = Owned>) -> Self {
        Self {
            positional: args.into_iter().collect(),
            keywords: Vec::new(),
        }
    }

    pub fn with_keywords(mut self, keywords: impl IntoIterator<Item = (String, Owned)>) -> Self {
        self.keywords.extend(keywords);
        self
    }

    fn prepend(&mut self, receiver: Owned) {
        self.positional.insert(0, receiver);
    }
}

#[derive(Debug, Clone)]
pub struct Parameter {
    name: String,
    default: Option<Owned>,
}

impl Parameter {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn default_value(&self) -> Option<&Owned> {
        self.default.as_ref()
    }
}

/// Declared parameters of a native function
///
/// ```
/// use host_bridge_core_rs::Signature;
///
/// let signature = Signature::new()
///     .required("name")
///     .optional("greeting", "Hello");
/// assert_eq!(signature.params().len(), 2);
/// ```
#[derive(Debug, Clone, Default)]
pub struct Signature {
    params: Vec<Parameter>,
    var_positional: bool,
    var_keywords: bool,
}

impl Signature {
    pub fn new() -> Self {
        Self::default()
    }

    /// Accepts any positional and keyword arguments, collected unbound
    pub fn variadic() -> Self {
        Self {
            params: Vec::new(),
            var_positional: true,
            var_keywords: true,
        }
    }

    pub fn required(mut self, name: impl Into<String>) -> Self {
        self.params.push(Parameter {
            name: name.into(),
            default: None,
        });
        self
    }

    pub fn optional(mut self, name: impl Into<String>, default: impl Into<Owned>) -> Self {
        self.params.push(Parameter {
            name: name.into(),
            default: Some(default.into()),
        });
        self
    }

    /// Collect surplus positional arguments instead of rejecting them
    pub fn var_positional(mut self) -> Self {
        self.var_positional = true;
        self
    }

    /// Collect unknown keyword arguments instead of rejecting them
    pub fn var_keywords(mut self) -> Self {
        self.var_keywords = true;
        self
    }

    pub fn params(&self) -> &[Parameter] {
        &self.params
    }

    /// Bind caller arguments to the declared parameters
    ///
    /// # Errors
    ///
    /// `ArgumentError` on too many positional arguments, a parameter given
    /// twice, an unexpected keyword, or a missing required parameter.
    pub fn bind(&self, function: &str, args: CallArgs) -> Result<BoundArgs, HostError> {
        let CallArgs {
            positional,
            keywords,
        } = args;
        let given = positional.len();
        let mut slots: Vec<Option<Owned>> = vec![None; self.params.len()];
        let mut extra_positional = Vec::new();

        for (index, value) in positional.into_iter().enumerate() {
            if index < slots.len() {
                slots[index] = Some(value);
            } else if self.var_positional {
                extra_positional.push(value);
            } else {
                return Err(HostError::argument(format!(
                    "{}() takes {} positional argument{} but {} {} given",
                    function,
                    self.params.len(),
                    if self.params.len() == 1 { "" } else { "s" },
                    given,
                    if given == 1 { "was" } else { "were" },
                )));
            }
        }

        let mut extra_keywords: Vec<(String, Owned)> = Vec::new();
        for (name, value) in keywords {
            match self.params.iter().position(|param| param.name == name) {
                Some(index) if slots[index].is_some() => {
                    return Err(HostError::argument(format!(
                        "{}() got multiple values for argument '{}'",
                        function, name
                    )));
                }
                Some(index) => slots[index] = Some(value),
                None if self.var_keywords => {
                    if extra_keywords.iter().any(|(existing, _)| *existing == name) {
                        return Err(HostError::argument(format!(
                            "{}() got multiple values for keyword argument '{}'",
                            function, name
                        )));
                    }
                    extra_keywords.push((name, value));
                }
                None => {
                    return Err(HostError::argument(format!(
                        "{}() got an unexpected keyword argument '{}'",
                        function, name
                    )));
                }
            }
        }

        let mut values = Vec::with_capacity(slots.len());
        for (param, slot) in self.params.iter().zip(slots) {
            match slot.or_else(|| param.default.clone()) {
                Some(value) => values.push(value),
                None => {
                    return Err(HostError::argument(format!(
                        "{}() missing required argument '{}'",
                        function, param.name
                    )));
                }
            }
        }

        Ok(BoundArgs {
            values,
            extra_positional,
            extra_keywords,
        })
    }
}

/// Arguments after binding, one value per declared parameter
#[derive(Debug, Clone)]
pub struct BoundArgs {
    values: Vec<Owned>,
    extra_positional: Vec<Owned>,
    extra_keywords: Vec<(String, Owned)>,
}

impl BoundArgs {
    pub fn get(&self, index: usize) -> Option<&Owned> {
        self.values.get(index)
    }

    /// Extract parameter `index` as a native value
    pub fn arg<T: FromHost>(&self, index: usize) -> Result<T, HostError> {
        self.values
            .get(index)
            .ok_or_else(|| HostError::argument(format!("no argument bound at position {}", index)))?
            .extract()
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn extra_positional(&self) -> &[Owned] {
        &self.extra_positional
    }

    pub fn extra_keywords(&self) -> &[(String, Owned)] {
        &self.extra_keywords
    }
}

/// A function implemented in native code
#[derive(Clone)]
pub struct NativeFunction {
    name: String,
    signature: Signature,
    body: Rc<NativeBody>,
}

impl NativeFunction {
    pub fn new<F>(name: impl Into<String>, signature: Signature, body: F) -> Self
    where
        F: Fn(&CallContext, BoundArgs) -> Result<Owned, HostError> + 'static,
    {
        Self {
            name: name.into(),
            signature,
            body: Rc::new(body),
        }
    }

    pub fn signature(&self) -> &Signature {
        &self.signature
    }
}

impl Invocable for NativeFunction {
    fn name(&self) -> &str {
        &self.name
    }

    fn invoke(&self, ctx: &CallContext, args: CallArgs) -> Result<Owned, HostError> {
        let bound = self.signature.bind(&self.name, args)?;
        (self.body)(ctx, bound)
    }
}

impl fmt::Debug for NativeFunction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NativeFunction")
            .field("name", &self.name)
            .field("signature", &self.signature)
            .finish()
    }
}

/// A function with its receiver bound as the first argument
#[derive(Debug, Clone)]
pub struct BoundMethod {
    receiver: Owned,
    function: Owned,
}

impl BoundMethod {
    pub fn new(receiver: Owned, function: Owned) -> Self {
        Self { receiver, function }
    }

    pub fn receiver(&self) -> &Owned {
        &self.receiver
    }
}

impl Invocable for BoundMethod {
    fn name(&self) -> &str {
        self.function
            .as_invocable()
            .map(|invocable| invocable.name())
            .unwrap_or("method")
    }

    fn invoke(&self, ctx: &CallContext, mut args: CallArgs) -> Result<Owned, HostError> {
        let invocable = self.function.as_invocable().ok_or_else(|| {
            HostError::invocation(format!(
                "'{}' object is not callable",
                self.function.type_name()
            ))
        })?;
        args.prepend(self.receiver.clone());
        invocable.invoke(ctx, args)
    }
}
