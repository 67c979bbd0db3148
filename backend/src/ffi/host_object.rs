//! PyO3 wrapper for opaque host values
//!
//! Functions, iterators, capsules, instances and modules cross into Python as
//! a `HostObject`. Iterators support the Python iterator protocol and callables
//! can be called directly.

use pyo3::exceptions::PyTypeError;
use pyo3::prelude::*;
use pyo3::types::{PyDict, PyTuple};

use super::types::{host_to_py, py_to_host, to_py_err};
use super::with_context;
use crate::iteration;
use crate::models::{CallArgs, HostObject, Owned};

/// Python handle to a host value
///
/// # Example (from Python)
///
/// ```python
/// from host_bridge_core_rs import range_iterator
///
/// it = range_iterator(0, 10, 3)
/// assert list(it) == [0, 3, 6, 9]
/// assert list(it) == []
/// ```
#[pyclass(unsendable, name = "HostObject")]
pub struct PyHostObject {
    inner: Owned,
}

impl PyHostObject {
    pub fn new(inner: Owned) -> Self {
        Self { inner }
    }

    pub fn inner(&self) -> &Owned {
        &self.inner
    }
}

#[pymethods]
impl PyHostObject {
    /// Host type name, e.g. `"RangeIterator"` or `"capsule"`
    #[getter]
    fn type_name(&self) -> String {
        self.inner.type_name()
    }

    fn __iter__(slf: PyRef<'_, Self>) -> PyResult<PyRef<'_, Self>> {
        match slf.inner.object() {
            HostObject::Generator(_) | HostObject::RangeIterator(_) => Ok(slf),
            _ => Err(PyErr::new::<PyTypeError, _>(format!(
                "'{}' object is not iterable",
                slf.inner.type_name()
            ))),
        }
    }

    fn __next__(&self, py: Python<'_>) -> PyResult<Option<PyObject>> {
        let next = with_context(|ctx| iteration::next(ctx, &self.inner)).map_err(|err| to_py_err(py, err))?;
        next.map(|value| host_to_py(py, &value)).transpose()
    }

    #[pyo3(signature = (*args, **kwargs))]
    fn __call__(
        &self,
        py: Python<'_>,
        args: &Bound<'_, PyTuple>,
        kwargs: Option<&Bound<'_, PyDict>>,
    ) -> PyResult<PyObject> {
        let positional = args
            .iter()
            .map(|arg| py_to_host(&arg))
            .collect::<PyResult<Vec<_>>>()?;
        let mut keywords = Vec::new();
        if let Some(kwargs) = kwargs {
            for (key, value) in kwargs.iter() {
                keywords.push((key.extract::<String>()?, py_to_host(&value)?));
            }
        }
        let args = CallArgs::positional(positional).with_keywords(keywords);
        let result = with_context(|ctx| ctx.invoke(&self.inner, args)).map_err(|err| to_py_err(py, err))?;
        host_to_py(py, &result)
    }

    fn __repr__(&self) -> String {
        format!("<HostObject {:?}>", self.inner)
    }
}
