//! ForeignValue <-> live interpreter objects
//!
//! Building interpreter objects always allocates fresh ones; nothing on the
//! host side aliases interpreter memory. Reading classifies each object by
//! exact runtime type checks, in the order bool, int, float, str, bytes,
//! dict, list/tuple, other sequences, then float-coercible objects.
//! Everything else becomes `Opaque` with its type name.
//!
//! `from_python` mirrors a whole value; `from_python_flat` reads only the
//! outer sequence and is what numeric/text read-back uses.

use pyembed_core::{BridgeError, BridgeResult, ForeignValue};
use pyo3::prelude::*;
use pyo3::types::{
    PyBool, PyBytes, PyDict, PyFloat, PyInt, PyList, PySequence, PyString, PyTuple,
};

/// Containers nested deeper than this are read as `Opaque`
///
/// Also terminates reads of self-referential containers.
pub const MAX_DEPTH: usize = 64;

/// Objects visited by one `from_python` call before the rest read as `Opaque`
pub const MAX_NODES: usize = 100_000;

pub(crate) fn interpreter_error(err: PyErr) -> BridgeError {
    BridgeError::Interpreter(err.to_string())
}

/// Interpreter type name of `obj`
pub fn type_name(obj: &Bound<'_, PyAny>) -> String {
    obj.get_type()
        .name()
        .map(|n| n.to_string())
        .unwrap_or_else(|_| "object".to_string())
}

pub fn to_python<'py>(py: Python<'py>, value: &ForeignValue) -> BridgeResult<Bound<'py, PyAny>> {
    let obj = match value {
        ForeignValue::None => py.None().into_bound(py),
        ForeignValue::Bool(b) => PyBool::new(py, *b).to_owned().into_any(),
        ForeignValue::Int(i) => match (*i).into_pyobject(py) {
            Ok(obj) => obj.into_any(),
            Err(never) => match never {},
        },
        ForeignValue::Float(v) => PyFloat::new(py, *v).into_any(),
        ForeignValue::Text(s) => PyString::new(py, s).into_any(),
        ForeignValue::Bytes(b) => PyBytes::new(py, b).into_any(),
        ForeignValue::Sequence(items) => {
            let items = items
                .iter()
                .map(|item| to_python(py, item))
                .collect::<BridgeResult<Vec<_>>>()?;
            PyList::new(py, items)
                .map_err(interpreter_error)?
                .into_any()
        }
        ForeignValue::Mapping(entries) => {
            let dict = PyDict::new(py);
            for (key, val) in entries {
                dict.set_item(to_python(py, key)?, to_python(py, val)?)
                    .map_err(interpreter_error)?;
            }
            dict.into_any()
        }
        ForeignValue::Opaque(name) => return Err(BridgeError::UnsupportedValue(name.clone())),
    };
    Ok(obj)
}

/// Full recursive read, for values of any shape
///
/// Bounded by `MAX_DEPTH` and by `MAX_NODES` objects in total, so shared
/// sublists cannot make the read exponential.
pub fn from_python(obj: &Bound<'_, PyAny>) -> ForeignValue {
    Reader {
        remaining: MAX_NODES,
    }
    .read(obj, 0)
}

/// One-level read for host sequence read-back
///
/// A sequence becomes a `Sequence` of leaf values; nested containers are not
/// entered and show up as `Opaque` with their type name. Anything else is read
/// as a single leaf. Cost is linear in the outer length.
pub fn from_python_flat(obj: &Bound<'_, PyAny>) -> ForeignValue {
    if let Some(scalar) = read_scalar(obj) {
        return scalar;
    }
    match sequence_items(obj) {
        Some(items) => ForeignValue::Sequence(items.iter().map(read_leaf).collect()),
        None => read_leaf(obj),
    }
}

struct Reader {
    remaining: usize,
}

impl Reader {
    fn read(&mut self, obj: &Bound<'_, PyAny>, depth: usize) -> ForeignValue {
        if self.remaining == 0 {
            return ForeignValue::Opaque(type_name(obj));
        }
        self.remaining -= 1;

        if let Some(scalar) = read_scalar(obj) {
            return scalar;
        }
        if depth >= MAX_DEPTH {
            return ForeignValue::Opaque(type_name(obj));
        }
        if let Ok(dict) = obj.downcast::<PyDict>() {
            return ForeignValue::Mapping(
                dict.iter()
                    .map(|(k, v)| (self.read(&k, depth + 1), self.read(&v, depth + 1)))
                    .collect(),
            );
        }
        match sequence_items(obj) {
            Some(items) => ForeignValue::Sequence(
                items.iter().map(|item| self.read(item, depth + 1)).collect(),
            ),
            None => read_leaf(obj),
        }
    }
}

/// None, bool, int, float, str and bytes; `None` for anything else
fn read_scalar(obj: &Bound<'_, PyAny>) -> Option<ForeignValue> {
    if obj.is_none() {
        return Some(ForeignValue::None);
    }
    // bool is a subclass of int, so it is checked first
    if let Ok(b) = obj.downcast::<PyBool>() {
        return Some(ForeignValue::Bool(b.is_true()));
    }
    if obj.is_instance_of::<PyInt>() {
        return Some(match obj.extract::<i64>() {
            Ok(i) => ForeignValue::Int(i),
            Err(_) => obj
                .extract::<f64>()
                .map(ForeignValue::Float)
                .unwrap_or_else(|_| ForeignValue::Opaque(type_name(obj))),
        });
    }
    if let Ok(f) = obj.downcast::<PyFloat>() {
        return Some(ForeignValue::Float(f.value()));
    }
    if let Ok(s) = obj.downcast::<PyString>() {
        return Some(match s.to_str() {
            Ok(text) => ForeignValue::Text(text.to_owned()),
            // Lone surrogates cannot be represented in UTF-8
            Err(_) => ForeignValue::Text(s.to_string_lossy().into_owned()),
        });
    }
    if let Ok(b) = obj.downcast::<PyBytes>() {
        return Some(ForeignValue::Bytes(b.as_bytes().to_vec()));
    }
    None
}

/// Scalar, float-coercible, or `Opaque`; never enters containers
fn read_leaf(obj: &Bound<'_, PyAny>) -> ForeignValue {
    if let Some(scalar) = read_scalar(obj) {
        return scalar;
    }
    if obj.hasattr("__float__").unwrap_or(false) {
        if let Ok(v) = obj.extract::<f64>() {
            return ForeignValue::Float(v);
        }
    }
    ForeignValue::Opaque(type_name(obj))
}

/// Elements of a list, tuple or other sequence protocol object
///
/// Callers rule out str and bytes first. `None` when `obj` is not a sequence
/// or iterating it raised.
fn sequence_items<'py>(obj: &Bound<'py, PyAny>) -> Option<Vec<Bound<'py, PyAny>>> {
    if let Ok(list) = obj.downcast::<PyList>() {
        return Some(list.iter().collect());
    }
    if let Ok(tuple) = obj.downcast::<PyTuple>() {
        return Some(tuple.iter().collect());
    }
    if obj.downcast::<PySequence>().is_err() {
        return None;
    }
    obj.try_iter().ok()?.collect::<PyResult<Vec<_>>>().ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;
    use std::ffi::CString;

    fn eval(py: Python<'_>, expr: &str) -> ForeignValue {
        let code = CString::new(expr).unwrap();
        let obj = py.eval(&code, None, None).unwrap();
        from_python(&obj)
    }

    fn with_python<R>(f: impl for<'py> FnOnce(Python<'py>) -> R) -> R {
        pyo3::prepare_freethreaded_python();
        Python::with_gil(f)
    }

    #[test]
    #[serial]
    fn test_reads_scalars_by_exact_type() {
        with_python(|py| {
            assert_eq!(eval(py, "None"), ForeignValue::None);
            assert_eq!(eval(py, "True"), ForeignValue::Bool(true));
            assert_eq!(eval(py, "42"), ForeignValue::Int(42));
            assert_eq!(eval(py, "2.5"), ForeignValue::Float(2.5));
            assert_eq!(eval(py, "'héllo'"), ForeignValue::Text("héllo".into()));
            assert_eq!(eval(py, "b'ab'"), ForeignValue::Bytes(b"ab".to_vec()));
        });
    }

    #[test]
    #[serial]
    fn test_big_int_degrades_to_float() {
        with_python(|py| {
            assert_eq!(eval(py, "2**70"), ForeignValue::Float(2f64.powi(70)));
        });
    }

    #[test]
    #[serial]
    fn test_reads_containers() {
        with_python(|py| {
            assert_eq!(
                eval(py, "[1.0, (2, 'x')]"),
                ForeignValue::Sequence(vec![
                    ForeignValue::Float(1.0),
                    ForeignValue::Sequence(vec![ForeignValue::Int(2), ForeignValue::from("x")]),
                ])
            );
            assert_eq!(
                eval(py, "{'a': [1]}"),
                ForeignValue::Mapping(vec![(
                    ForeignValue::from("a"),
                    ForeignValue::Sequence(vec![ForeignValue::Int(1)])
                )])
            );
            assert_eq!(
                eval(py, "range(3)"),
                ForeignValue::Sequence(vec![
                    ForeignValue::Int(0),
                    ForeignValue::Int(1),
                    ForeignValue::Int(2)
                ])
            );
        });
    }

    #[test]
    #[serial]
    fn test_float_coercible_and_opaque_objects() {
        with_python(|py| {
            assert_eq!(
                eval(py, "__import__('fractions').Fraction(1, 4)"),
                ForeignValue::Float(0.25)
            );
            assert_eq!(
                eval(py, "__import__('sys')"),
                ForeignValue::Opaque("module".into())
            );
            assert_eq!(eval(py, "{1, 2}"), ForeignValue::Opaque("set".into()));
        });
    }

    #[test]
    #[serial]
    fn test_self_referential_list_terminates() {
        with_python(|py| {
            let code = CString::new("l = []\nl.append(l)").unwrap();
            let globals = PyDict::new(py);
            py.run(&code, Some(&globals), None).unwrap();
            let l = globals.get_item("l").unwrap().unwrap();

            let mut value = from_python(&l);
            let mut depth = 0;
            while let ForeignValue::Sequence(mut items) = value {
                value = items.remove(0);
                depth += 1;
            }
            assert_eq!(depth, MAX_DEPTH);
            assert_eq!(value, ForeignValue::Opaque("list".into()));
        });
    }

    #[test]
    #[serial]
    fn test_builds_fresh_objects() {
        with_python(|py| {
            let value = ForeignValue::Mapping(vec![
                (ForeignValue::from("n"), ForeignValue::Int(-5)),
                (
                    ForeignValue::from("l"),
                    ForeignValue::Sequence(vec![
                        ForeignValue::Bool(false),
                        ForeignValue::None,
                        ForeignValue::Bytes(vec![0, 255]),
                    ]),
                ),
            ]);
            let obj = to_python(py, &value).unwrap();
            assert_eq!(type_name(&obj), "dict");
            assert_eq!(from_python(&obj), value);
        });
    }

    #[test]
    #[serial]
    fn test_opaque_cannot_be_built() {
        with_python(|py| {
            let err = to_python(py, &ForeignValue::Opaque("module".into())).unwrap_err();
            assert_eq!(err, BridgeError::UnsupportedValue("module".into()));
        });
    }

    #[test]
    #[serial]
    fn test_flat_read_does_not_enter_containers() {
        with_python(|py| {
            let code = CString::new("[1.5, 'a', [2.0], {'k': 1}, b'x']").unwrap();
            let obj = py.eval(&code, None, None).unwrap();
            assert_eq!(
                from_python_flat(&obj),
                ForeignValue::Sequence(vec![
                    ForeignValue::Float(1.5),
                    ForeignValue::from("a"),
                    ForeignValue::Opaque("list".into()),
                    ForeignValue::Opaque("dict".into()),
                    ForeignValue::Bytes(b"x".to_vec()),
                ])
            );

            let text = py.eval(c"'abc'", None, None).unwrap();
            assert_eq!(from_python_flat(&text), ForeignValue::from("abc"));
            let dict = py.eval(c"{'a': 1}", None, None).unwrap();
            assert_eq!(from_python_flat(&dict), ForeignValue::Opaque("dict".into()));
            let range = py.eval(c"range(2)", None, None).unwrap();
            assert_eq!(
                from_python_flat(&range),
                ForeignValue::Sequence(vec![ForeignValue::Int(0), ForeignValue::Int(1)])
            );
        });
    }

    #[test]
    #[serial]
    fn test_shared_sublists_stay_within_node_budget() {
        with_python(|py| {
            let code = CString::new("a = [0.0]\nfor _ in range(40):\n    a = [a, a]").unwrap();
            let globals = PyDict::new(py);
            py.run(&code, Some(&globals), None).unwrap();
            let a = globals.get_item("a").unwrap().unwrap();

            fn count(value: &ForeignValue) -> usize {
                match value {
                    ForeignValue::Sequence(items) => 1 + items.iter().map(count).sum::<usize>(),
                    _ => 1,
                }
            }
            let value = from_python(&a);
            assert!(value.is_sequence());
            assert!(count(&value) < 3 * MAX_NODES);

            let flat = from_python_flat(&a);
            assert_eq!(
                flat,
                ForeignValue::Sequence(vec![
                    ForeignValue::Opaque("list".into()),
                    ForeignValue::Opaque("list".into())
                ])
            );
        });
    }
}
