//! Main namespace access
//!
//! The `__main__` module dictionary is the only exchange point between host
//! and interpreter. These functions work on live objects so that group
//! dictionaries keep entries the host cannot mirror (functions, arrays).

use crate::marshal::interpreter_error;
use pyembed_core::BridgeResult;
use pyo3::prelude::*;
use pyo3::types::PyDict;

pub const MAIN_MODULE: &str = "__main__";

pub fn main_dict(py: Python<'_>) -> BridgeResult<Bound<'_, PyDict>> {
    let main = PyModule::import(py, MAIN_MODULE).map_err(interpreter_error)?;
    Ok(main.dict())
}

/// Bind `name` to `value`, replacing any previous binding
pub fn publish<'py>(py: Python<'py>, name: &str, value: Bound<'py, PyAny>) -> BridgeResult<()> {
    main_dict(py)?
        .set_item(name, value)
        .map_err(interpreter_error)
}

/// Current binding of `name`; `None` when unbound
pub fn retrieve<'py>(py: Python<'py>, name: &str) -> BridgeResult<Option<Bound<'py, PyAny>>> {
    main_dict(py)?.get_item(name).map_err(interpreter_error)
}

/// Set `entry` inside the dict bound to `group`
///
/// A missing group, or a group name bound to something other than a dict,
/// gets a fresh empty dict. Read-modify-write: concurrent writers to the
/// same group can lose updates.
pub fn publish_into_group<'py>(
    py: Python<'py>,
    entry: &str,
    group: &str,
    value: Bound<'py, PyAny>,
) -> BridgeResult<()> {
    let globals = main_dict(py)?;
    let existing = globals.get_item(group).map_err(interpreter_error)?;
    let dict = match existing {
        Some(obj) => match obj.downcast_into::<PyDict>() {
            Ok(dict) => dict,
            Err(_) => PyDict::new(py),
        },
        None => PyDict::new(py),
    };
    dict.set_item(entry, value).map_err(interpreter_error)?;
    globals.set_item(group, dict).map_err(interpreter_error)
}

/// String-keyed bindings of the main namespace at one point in time
pub(crate) type Snapshot = Vec<(String, Py<PyAny>)>;

fn names(py: Python<'_>) -> BridgeResult<Vec<String>> {
    let globals = main_dict(py)?;
    Ok(globals
        .keys()
        .iter()
        .filter_map(|k| k.extract::<String>().ok())
        .collect())
}

pub(crate) fn snapshot(py: Python<'_>) -> BridgeResult<Snapshot> {
    let globals = main_dict(py)?;
    Ok(globals
        .iter()
        .filter_map(|(k, v)| k.extract::<String>().ok().map(|name| (name, v.unbind())))
        .collect())
}

/// Return the main namespace to `snapshot`
///
/// Names bound since are deleted and snapshot names are rebound to their
/// original objects. Returns the number of names deleted.
pub(crate) fn restore(py: Python<'_>, snapshot: &Snapshot) -> BridgeResult<usize> {
    let globals = main_dict(py)?;
    let mut removed = 0;
    for name in names(py)? {
        if !snapshot.iter().any(|(kept, _)| *kept == name) {
            globals.del_item(&name).map_err(interpreter_error)?;
            removed += 1;
        }
    }
    for (name, value) in snapshot {
        globals
            .set_item(name, value.bind(py))
            .map_err(interpreter_error)?;
    }
    Ok(removed)
}
