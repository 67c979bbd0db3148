//! Module-level Python functions
//!
//! Each function converts its arguments, runs one bridge operation against the
//! thread's call context, and converts the result back.

use pyo3::exceptions::{PyDeprecationWarning, PyTypeError};
use pyo3::prelude::*;
use pyo3::types::{PyDict, PyTuple};

use super::host_object::PyHostObject;
use super::types::{host_to_py, py_to_host, to_py_err};
use super::with_context;
use crate::capsule;
use crate::codec;
use crate::exceptions::{self, HostError, WarningCategory};
use crate::invocation;
use crate::iteration::{self, RangeIterator};
use crate::models::{CallArgs, Owned};

fn finish(py: Python<'_>, result: Result<Owned, HostError>) -> PyResult<PyObject> {
    let value = result.map_err(|err| to_py_err(py, err))?;
    host_to_py(py, &value)
}

/// Call `func` with the positional arguments in `args`
#[pyfunction]
pub fn call_function(py: Python<'_>, func: &Bound<'_, PyAny>, args: &Bound<'_, PyTuple>) -> PyResult<PyObject> {
    let target = py_to_host(func)?;
    let args = py_to_host(args.as_any())?;
    finish(py, with_context(|ctx| invocation::call_object(ctx, &target, &args, None)))
}

/// Call `func` with positional `args` and keyword `kwargs`
#[pyfunction]
#[pyo3(signature = (func, args, kwargs=None))]
pub fn call_with_kwargs(
    py: Python<'_>,
    func: &Bound<'_, PyAny>,
    args: &Bound<'_, PyTuple>,
    kwargs: Option<&Bound<'_, PyDict>>,
) -> PyResult<PyObject> {
    let target = py_to_host(func)?;
    let args = py_to_host(args.as_any())?;
    let kwargs = kwargs.map(|kwargs| py_to_host(kwargs.as_any())).transpose()?;
    finish(
        py,
        with_context(|ctx| invocation::call_object(ctx, &target, &args, kwargs.as_ref())),
    )
}

/// Call method `method_name` of `obj` with `args`
///
/// Host handles resolve the method on the host side; any other Python object
/// resolves it in Python so that the call acts on the object itself.
#[pyfunction]
#[pyo3(signature = (obj, method_name, *args))]
pub fn call_method(
    py: Python<'_>,
    obj: &Bound<'_, PyAny>,
    method_name: &str,
    args: &Bound<'_, PyTuple>,
) -> PyResult<PyObject> {
    let positional = args
        .iter()
        .map(|arg| py_to_host(&arg))
        .collect::<PyResult<Vec<_>>>()?;
    if let Ok(handle) = obj.downcast::<PyHostObject>() {
        let receiver = handle.borrow().inner().clone();
        return finish(
            py,
            with_context(|ctx| invocation::call_method(ctx, &receiver, method_name, &positional)),
        );
    }
    let member = obj.getattr(method_name)?;
    if !member.is_callable() {
        return Err(PyErr::new::<PyTypeError, _>(format!(
            "attribute '{}' is not callable",
            method_name
        )));
    }
    let target = py_to_host(&member)?;
    finish(py, with_context(|ctx| invocation::call(ctx, &target, &positional)))
}

/// Lazy arithmetic progression `start, start + step, ...` stopping before `stop`
#[pyfunction]
#[pyo3(signature = (start, stop, step=1))]
pub fn range_iterator(py: Python<'_>, start: i64, stop: i64, step: i64) -> PyResult<PyHostObject> {
    let iterator = RangeIterator::new(start, stop, step).map_err(|err| to_py_err(py, err))?;
    Ok(PyHostObject::new(Owned::range_iterator(iterator)))
}

/// Drain any iterable into a list
#[pyfunction]
pub fn iterate(py: Python<'_>, iterable: &Bound<'_, PyAny>) -> PyResult<PyObject> {
    let source = py_to_host(iterable)?;
    finish(py, with_context(|ctx| iteration::iterate(ctx, &source)))
}

/// Capsule holding a named point
#[pyfunction]
pub fn create_point(py: Python<'_>, x: i32, y: i32, name: &str) -> PyResult<PyObject> {
    finish(py, with_context(|ctx| capsule::create_point(ctx, x, y, name)))
}

/// `{"x", "y", "name"}` of a point capsule
#[pyfunction]
pub fn get_point(py: Python<'_>, obj: &Bound<'_, PyAny>) -> PyResult<PyObject> {
    let handle = py_to_host(obj)?;
    finish(py, capsule::get_point(&handle))
}

/// Import `module_name` and call its `func_name` with no arguments
#[pyfunction]
pub fn import_and_call(py: Python<'_>, module_name: &str, func_name: &str) -> PyResult<PyObject> {
    let registered = with_context(|ctx| ctx.import(module_name).is_ok());
    if registered {
        return finish(
            py,
            with_context(|ctx| invocation::import_and_call(ctx, module_name, func_name)),
        );
    }
    let module = PyModule::import_bound(py, module_name)?;
    let function = module.getattr(func_name)?;
    if !function.is_callable() {
        return Err(PyErr::new::<PyTypeError, _>("attribute is not callable"));
    }
    let target = py_to_host(&function)?;
    finish(py, with_context(|ctx| ctx.invoke(&target, CallArgs::new())))
}

/// Call `func`; report whether it raised, swallowing the exception
#[pyfunction]
pub fn check_and_clear(func: &Bound<'_, PyAny>) -> PyResult<String> {
    let target = py_to_host(func)?;
    Ok(with_context(|ctx| exceptions::check_and_clear(ctx, &target)).to_string())
}

/// Call `func`; report which kind of exception it raised
#[pyfunction]
pub fn check_exception_type(func: &Bound<'_, PyAny>) -> PyResult<String> {
    let target = py_to_host(func)?;
    Ok(with_context(|ctx| exceptions::classify(ctx, &target)).to_string())
}

/// Call `func`; `{"type", "value", "has_traceback"}` of what it raised, or
/// None if it returned normally
#[pyfunction]
pub fn get_exception_info(py: Python<'_>, func: &Bound<'_, PyAny>) -> PyResult<PyObject> {
    let target = py_to_host(func)?;
    match with_context(|ctx| exceptions::snapshot(ctx, &target)) {
        Some(record) => host_to_py(py, &record.to_host()),
        None => Ok(py.None()),
    }
}

/// True if a failure is pending on this thread's call context
#[pyfunction]
pub fn check_error_occurred() -> bool {
    with_context(|ctx| ctx.failure_pending())
}

/// Issue a deprecation warning
///
/// Recorded on the call context and forwarded to Python's `warnings`
/// machinery; raises `DeprecationWarning` when the context escalates warnings.
#[pyfunction]
pub fn issue_warning(py: Python<'_>, message: &str) -> PyResult<()> {
    with_context(|ctx| ctx.warn(WarningCategory::Deprecation, message)).map_err(|err| to_py_err(py, err))?;
    let category = py.get_type_bound::<PyDeprecationWarning>();
    PyErr::warn_bound(py, category.as_any(), message, 1)
}

/// Decode bytes to text; text is returned unchanged
#[pyfunction]
#[pyo3(signature = (s, encoding=None))]
pub fn str_to_unicode(py: Python<'_>, s: &Bound<'_, PyAny>, encoding: Option<&str>) -> PyResult<PyObject> {
    let value = py_to_host(s)?;
    if value.extract::<String>().is_ok() {
        return host_to_py(py, &value);
    }
    finish(py, with_context(|ctx| codec::decode_value(ctx, &value, encoding)))
}

/// Encode text to bytes
#[pyfunction]
#[pyo3(signature = (u, encoding=None))]
pub fn unicode_to_str(py: Python<'_>, u: &Bound<'_, PyAny>, encoding: Option<&str>) -> PyResult<PyObject> {
    let value = py_to_host(u)?;
    finish(py, with_context(|ctx| codec::encode_value(ctx, &value, encoding)))
}

/// Register every function above on `m`
pub fn register(m: &Bound<'_, PyModule>) -> PyResult<()> {
    m.add_class::<PyHostObject>()?;
    m.add_function(wrap_pyfunction!(call_function, m)?)?;
    m.add_function(wrap_pyfunction!(call_with_kwargs, m)?)?;
    m.add_function(wrap_pyfunction!(call_method, m)?)?;
    m.add_function(wrap_pyfunction!(range_iterator, m)?)?;
    m.add_function(wrap_pyfunction!(iterate, m)?)?;
    m.add_function(wrap_pyfunction!(create_point, m)?)?;
    m.add_function(wrap_pyfunction!(get_point, m)?)?;
    m.add_function(wrap_pyfunction!(import_and_call, m)?)?;
    m.add_function(wrap_pyfunction!(check_and_clear, m)?)?;
    m.add_function(wrap_pyfunction!(check_exception_type, m)?)?;
    m.add_function(wrap_pyfunction!(get_exception_info, m)?)?;
    m.add_function(wrap_pyfunction!(check_error_occurred, m)?)?;
    m.add_function(wrap_pyfunction!(issue_warning, m)?)?;
    m.add_function(wrap_pyfunction!(str_to_unicode, m)?)?;
    m.add_function(wrap_pyfunction!(unicode_to_str, m)?)?;
    Ok(())
}

