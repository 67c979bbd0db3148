//! Lazy one-shot producers
//!
//! A generator yields values from a producer closure until the closure
//! reports the end or fails. Either way the producer is dropped and every later
//! request yields nothing.

use std::cell::RefCell;
use std::fmt;

use crate::core::CallContext;
use crate::exceptions::HostError;
use crate::models::Owned;

/// Producer closure: `Ok(Some(v))` yields, `Ok(None)` ends, `Err` fails
pub type Producer = dyn FnMut(&CallContext) -> Result<Option<Owned>, HostError>;

pub struct Generator {
    name: String,
    producer: RefCell<Option<Box<Producer>>>,
    length_hint: Option<usize>,
}

impl Generator {
    pub fn new<F>(name: impl Into<String>, producer: F) -> Self
    where
        F: FnMut(&CallContext) -> Result<Option<Owned>, HostError> + 'static,
    {
        Self {
            name: name.into(),
            producer: RefCell::new(Some(Box::new(producer))),
            length_hint: None,
        }
    }

    /// Generator over a fixed sequence of values
    pub fn from_values<I>(name: impl Into<String>, values: I) -> Self
    where
        I: IntoIterator<Item = Owned>,
        I::IntoIter: 'static,
    {
        let mut values = values.into_iter();
        Self::new(name, move |_| Ok(values.next()))
    }

    /// Advertise an expected length; never trusted for correctness
    pub fn with_length_hint(mut self, hint: usize) -> Self {
        self.length_hint = Some(hint);
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn length_hint(&self) -> Option<usize> {
        self.length_hint
    }

    /// True once the producer has ended or failed
    pub fn is_exhausted(&self) -> bool {
        self.producer
            .try_borrow()
            .map(|producer| producer.is_none())
            .unwrap_or(false)
    }

    /// Request the next value
    ///
    /// # Errors
    ///
    /// The producer's own failure, or `ValueError` if the generator is asked
    /// for a value from inside its own producer.
    pub fn resume(&self, ctx: &CallContext) -> Result<Option<Owned>, HostError> {
        let mut slot = self
            .producer
            .try_borrow_mut()
            .map_err(|_| HostError::value_error("generator already executing"))?;
        let Some(producer) = slot.as_mut() else {
            return Ok(None);
        };
        match producer(ctx) {
            Ok(Some(value)) => Ok(Some(value)),
            Ok(None) => {
                *slot = None;
                Ok(None)
            }
            Err(error) => {
                *slot = None;
                Err(error)
            }
        }
    }
}

impl fmt::Debug for Generator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Generator")
            .field("name", &self.name)
            .field("exhausted", &self.is_exhausted())
            .finish()
    }
}
