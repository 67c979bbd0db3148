//! Type conversion utilities for FFI boundary
//!
//! Converts between host values and Python objects, and between
//! [`HostError`] and `PyErr`.

use std::rc::Rc;

use pyo3::exceptions::{
    PyAttributeError, PyDeprecationWarning, PyImportError, PyIndexError, PyKeyError,
    PyLookupError, PyRecursionError, PyReferenceError, PyRuntimeError, PyRuntimeWarning,
    PyStopIteration, PyTypeError, PyUnicodeError, PyUserWarning, PyValueError,
    PyZeroDivisionError,
};
use pyo3::prelude::*;
use pyo3::types::{PyBool, PyBytes, PyDict, PyFloat, PyList, PyLong, PyString, PyTuple};

use super::host_object::PyHostObject;
use crate::exceptions::{ErrorKind, HostError, WarningCategory};
use crate::iteration::Generator;
use crate::models::value::{nesting_too_deep, MAX_NESTING_DEPTH};
use crate::models::{HostObject, NativeFunction, Owned, Signature};

/// A Python exception carried through the bridge as a failure's origin
struct ForeignException(PyErr);

// ========================================================================
// Python -> host
// ========================================================================

/// Convert a Python object into a host value
///
/// Callables become variadic native functions and other iterables become
/// generators; both call back into Python when used.
///
/// # Errors
///
/// Returns TypeError for objects with no host shape, and whatever Python
/// raises while reading containers.
pub fn py_to_host(obj: &Bound<'_, PyAny>) -> PyResult<Owned> {
    py_to_host_at(obj, 0)
}

fn py_to_host_at(obj: &Bound<'_, PyAny>, depth: usize) -> PyResult<Owned> {
    if depth > MAX_NESTING_DEPTH {
        return Err(to_py_err(obj.py(), nesting_too_deep("while converting from Python")));
    }
    if obj.is_none() {
        return Ok(Owned::none());
    }
    if let Ok(handle) = obj.downcast::<PyHostObject>() {
        return Ok(handle.borrow().inner().clone());
    }
    if obj.is_instance_of::<PyBool>() {
        return Ok(Owned::from(obj.extract::<bool>()?));
    }
    if obj.is_instance_of::<PyLong>() {
        return Ok(Owned::from(obj.extract::<i64>()?));
    }
    if obj.is_instance_of::<PyFloat>() {
        return Ok(Owned::from(obj.extract::<f64>()?));
    }
    if let Ok(text) = obj.downcast::<PyString>() {
        return Ok(Owned::str(text.to_str()?));
    }
    if let Ok(bytes) = obj.downcast::<PyBytes>() {
        return Ok(Owned::bytes(bytes.as_bytes()));
    }
    if let Ok(list) = obj.downcast::<PyList>() {
        let items = list.iter().map(|item| py_to_host_at(&item, depth + 1)).collect::<PyResult<Vec<_>>>()?;
        return Ok(Owned::list(items));
    }
    if let Ok(tuple) = obj.downcast::<PyTuple>() {
        let items = tuple.iter().map(|item| py_to_host_at(&item, depth + 1)).collect::<PyResult<Vec<_>>>()?;
        return Ok(Owned::tuple(items));
    }
    if let Ok(dict) = obj.downcast::<PyDict>() {
        let mut entries = Vec::with_capacity(dict.len());
        for (key, value) in dict.iter() {
            let key: String = key
                .extract()
                .map_err(|_| PyErr::new::<PyTypeError, _>("dict keys must be str"))?;
            entries.push((key, py_to_host_at(&value, depth + 1)?));
        }
        return Ok(Owned::dict(entries));
    }
    if obj.is_callable() {
        return Ok(wrap_callable(obj));
    }
    if let Ok(iterator) = obj.iter() {
        return Ok(wrap_iterator(iterator));
    }
    Err(PyErr::new::<PyTypeError, _>(format!(
        "cannot pass '{}' object across the bridge",
        obj.get_type().getattr("__name__")?.extract::<String>()?
    )))
}

fn callable_name(obj: &Bound<'_, PyAny>) -> String {
    obj.getattr("__name__")
        .and_then(|name| name.extract::<String>())
        .unwrap_or_else(|_| "<callable>".to_string())
}

fn wrap_callable(obj: &Bound<'_, PyAny>) -> Owned {
    let name = callable_name(obj);
    let callable: PyObject = obj.clone().unbind();
    Owned::function(NativeFunction::new(name, Signature::variadic(), move |_, args| {
        Python::with_gil(|py| {
            let positional = args
                .extra_positional()
                .iter()
                .map(|value| host_to_py(py, value))
                .collect::<PyResult<Vec<_>>>()
                .map_err(|err| py_err_to_host(py, err))?;
            let keywords = PyDict::new_bound(py);
            for (key, value) in args.extra_keywords() {
                let value = host_to_py(py, value).map_err(|err| py_err_to_host(py, err))?;
                keywords
                    .set_item(key, value)
                    .map_err(|err| py_err_to_host(py, err))?;
            }
            let kwargs = (!keywords.is_empty()).then_some(&keywords);
            let result = callable
                .bind(py)
                .call(PyTuple::new_bound(py, positional), kwargs)
                .map_err(|err| py_err_to_host(py, err))?;
            py_to_host(&result).map_err(|err| py_err_to_host(py, err))
        })
    }))
}

fn wrap_iterator(iterator: Bound<'_, pyo3::types::PyIterator>) -> Owned {
    let iterator: Py<pyo3::types::PyIterator> = iterator.unbind();
    Owned::generator(Generator::new("python_iterator", move |_| {
        Python::with_gil(|py| {
            let mut bound = iterator.bind(py).clone();
            match bound.next() {
                None => Ok(None),
                Some(Ok(item)) => py_to_host(&item)
                    .map(Some)
                    .map_err(|err| py_err_to_host(py, err)),
                Some(Err(err)) => Err(py_err_to_host(py, err)),
            }
        })
    }))
}

// ========================================================================
// Host -> Python
// ========================================================================

/// Convert a host value into a Python object
///
/// Data shapes are copied; everything else is wrapped in a `HostObject`.
/// A container nested past [`MAX_NESTING_DEPTH`] (a list holding itself, for
/// one) raises `RecursionError`.
pub fn host_to_py(py: Python<'_>, value: &Owned) -> PyResult<PyObject> {
    host_to_py_at(py, value, 0)
}

fn host_to_py_at(py: Python<'_>, value: &Owned, depth: usize) -> PyResult<PyObject> {
    if depth > MAX_NESTING_DEPTH {
        return Err(to_py_err(py, nesting_too_deep("while converting to Python")));
    }
    let object = match value.object() {
        HostObject::None => py.None(),
        HostObject::Bool(flag) => flag.into_py(py),
        HostObject::Int(number) => number.into_py(py),
        HostObject::Float(number) => number.into_py(py),
        HostObject::Str(text) => text.into_py(py),
        HostObject::Bytes(bytes) => PyBytes::new_bound(py, bytes).into_any().unbind(),
        HostObject::List(items) => {
            let items = items
                .borrow()
                .iter()
                .map(|item| host_to_py_at(py, item, depth + 1))
                .collect::<PyResult<Vec<_>>>()?;
            PyList::new_bound(py, items).into_any().unbind()
        }
        HostObject::Tuple(items) => {
            let items = items
                .iter()
                .map(|item| host_to_py_at(py, item, depth + 1))
                .collect::<PyResult<Vec<_>>>()?;
            PyTuple::new_bound(py, items).into_any().unbind()
        }
        HostObject::Dict(dict) => {
            let result = PyDict::new_bound(py);
            for (key, item) in dict.entries() {
                result.set_item(key, host_to_py_at(py, &item, depth + 1)?)?;
            }
            result.into_any().unbind()
        }
        _ => Py::new(py, PyHostObject::new(value.clone()))?.into_py(py),
    };
    Ok(object)
}

// ========================================================================
// Errors
// ========================================================================

/// Convert a bridge failure into a Python exception
///
/// A failure that originated as a Python exception is handed back as that
/// same exception object.
pub fn to_py_err(py: Python<'_>, error: HostError) -> PyErr {
    if let Some(foreign) = error
        .origin()
        .and_then(|origin| origin.downcast_ref::<ForeignException>())
    {
        return foreign.0.clone_ref(py);
    }
    let message = error.message().to_string();
    match error.kind() {
        ErrorKind::Value | ErrorKind::StepZero => PyErr::new::<PyValueError, _>(message),
        ErrorKind::Type
        | ErrorKind::Invocation
        | ErrorKind::Argument
        | ErrorKind::IterationUnsupported
        | ErrorKind::CapsuleType => PyErr::new::<PyTypeError, _>(message),
        ErrorKind::AttributeLookup => PyErr::new::<PyAttributeError, _>(message),
        ErrorKind::DivisionByZero => PyErr::new::<PyZeroDivisionError, _>(message),
        ErrorKind::Runtime => PyErr::new::<PyRuntimeError, _>(message),
        ErrorKind::Index => PyErr::new::<PyIndexError, _>(message),
        ErrorKind::Key => PyErr::new::<PyKeyError, _>(message),
        ErrorKind::Import => PyErr::new::<PyImportError, _>(message),
        ErrorKind::Lookup => PyErr::new::<PyLookupError, _>(message),
        ErrorKind::Encoding => PyErr::new::<PyUnicodeError, _>(message),
        ErrorKind::Recursion => PyErr::new::<PyRecursionError, _>(message),
        ErrorKind::ReferenceExpired => PyErr::new::<PyReferenceError, _>(message),
        ErrorKind::StopIteration => PyErr::new::<PyStopIteration, _>(message),
        ErrorKind::Warning(WarningCategory::Deprecation) => PyErr::new::<PyDeprecationWarning, _>(message),
        ErrorKind::Warning(WarningCategory::Runtime) => PyErr::new::<PyRuntimeWarning, _>(message),
        ErrorKind::Warning(WarningCategory::User) => PyErr::new::<PyUserWarning, _>(message),
        ErrorKind::Custom(name) => PyErr::new::<PyRuntimeError, _>(format!("{}: {}", name, message)),
    }
}

/// Convert a Python exception into a bridge failure, keeping the original
/// exception as its origin
pub fn py_err_to_host(py: Python<'_>, err: PyErr) -> HostError {
    let kind = if err.is_instance_of::<PyZeroDivisionError>(py) {
        ErrorKind::DivisionByZero
    } else if err.is_instance_of::<PyRecursionError>(py) {
        ErrorKind::Recursion
    } else if err.is_instance_of::<PyUnicodeError>(py) {
        ErrorKind::Encoding
    } else if err.is_instance_of::<PyValueError>(py) {
        ErrorKind::Value
    } else if err.is_instance_of::<PyTypeError>(py) {
        ErrorKind::Type
    } else if err.is_instance_of::<PyAttributeError>(py) {
        ErrorKind::AttributeLookup
    } else if err.is_instance_of::<PyIndexError>(py) {
        ErrorKind::Index
    } else if err.is_instance_of::<PyKeyError>(py) {
        ErrorKind::Key
    } else if err.is_instance_of::<PyLookupError>(py) {
        ErrorKind::Lookup
    } else if err.is_instance_of::<PyImportError>(py) {
        ErrorKind::Import
    } else if err.is_instance_of::<PyReferenceError>(py) {
        ErrorKind::ReferenceExpired
    } else if err.is_instance_of::<PyStopIteration>(py) {
        ErrorKind::StopIteration
    } else if err.is_instance_of::<PyRuntimeError>(py) {
        ErrorKind::Runtime
    } else {
        let name = err
            .get_type_bound(py)
            .getattr("__name__")
            .and_then(|name| name.extract::<String>())
            .unwrap_or_else(|_| "Exception".to_string());
        ErrorKind::Custom(name)
    };
    let message = err
        .value_bound(py)
        .str()
        .map(|text| text.to_string())
        .unwrap_or_default();
    HostError::new(kind, message).with_origin(Rc::new(ForeignException(err)))
}
