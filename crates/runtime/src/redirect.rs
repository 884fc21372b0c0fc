//! Stream redirection into the host console
//!
//! Installing redirection registers two callbacks in the main namespace,
//! defines one catcher class per stream whose `write` calls its callback,
//! and assigns catcher instances to `sys.stdout` / `sys.stderr`. Callbacks
//! look up the sink registered for the session, so the interpreter-side
//! objects never hold host state.
//!
//! ```text
//! print("10")  ->  sys.stdout.write("10")  ->  _pyembed_stdout("10")
//!              ->  ConsoleSink::write(Stdout, "10")
//! ```

use crate::marshal::{interpreter_error, type_name};
use pyembed_core::{BridgeError, BridgeResult, ConsoleSink, StdConsole, StreamId};
use pyo3::prelude::*;
use pyo3::types::{PyDict, PyString, PyTuple};
use std::ffi::CStr;
use std::sync::{Arc, RwLock};
use tracing::{debug, warn};

pub const STDOUT_CALLBACK: &str = "_pyembed_stdout";
pub const STDERR_CALLBACK: &str = "_pyembed_stderr";
pub const STDOUT_CATCHER: &str = "_PyembedStdoutCatcher";
pub const STDERR_CATCHER: &str = "_PyembedStderrCatcher";

const CATCHER_SOURCE: &CStr = c"
class _PyembedStdoutCatcher:
    encoding = 'utf-8'
    def write(self, out):
        _pyembed_stdout(out)
    def flush(self):
        pass
    def isatty(self):
        return False

class _PyembedStderrCatcher:
    encoding = 'utf-8'
    def write(self, out):
        _pyembed_stderr(out)
    def flush(self):
        pass
    def isatty(self):
        return False
";

/// Sink for the live session; `None` between sessions
static SINK: RwLock<Option<Arc<dyn ConsoleSink>>> = RwLock::new(None);

pub(crate) fn set_sink(sink: Option<Arc<dyn ConsoleSink>>) {
    *SINK.write().unwrap_or_else(|e| e.into_inner()) = sink;
}

/// Send text to the session sink, or to process stdio when there is none
pub fn dispatch(stream: StreamId, text: &str) {
    let sink = SINK.read().unwrap_or_else(|e| e.into_inner()).clone();
    match sink {
        Some(sink) => sink.write(stream, text),
        None => StdConsole.write(stream, text),
    }
}

fn catcher_class(stream: StreamId) -> &'static str {
    match stream {
        StreamId::Stdout => STDOUT_CATCHER,
        StreamId::Stderr => STDERR_CATCHER,
    }
}

/// Extract the single text argument of a callback invocation
fn single_text(stream: StreamId, args: &Bound<'_, PyTuple>) -> BridgeResult<String> {
    if args.len() != 1 {
        return Err(BridgeError::ArgumentTypeMismatch {
            stream,
            found: format!("{} arguments", args.len()),
        });
    }
    let arg = args.get_item(0).map_err(interpreter_error)?;
    match arg.downcast::<PyString>() {
        Ok(s) => Ok(s.to_string_lossy().into_owned()),
        Err(_) => Err(BridgeError::ArgumentTypeMismatch {
            stream,
            found: type_name(&arg),
        }),
    }
}

pub(crate) fn forward(stream: StreamId, args: &Bound<'_, PyTuple>) -> BridgeResult<()> {
    let text = single_text(stream, args)?;
    dispatch(stream, &text);
    Ok(())
}

fn deliver(stream: StreamId, args: &Bound<'_, PyTuple>) {
    if let Err(err) = forward(stream, args) {
        warn!("dropping redirected write: {}", err);
    }
}

#[pyfunction]
#[pyo3(name = "_pyembed_stdout", signature = (*args))]
fn host_stdout(args: &Bound<'_, PyTuple>) {
    deliver(StreamId::Stdout, args);
}

#[pyfunction]
#[pyo3(name = "_pyembed_stderr", signature = (*args))]
fn host_stderr(args: &Bound<'_, PyTuple>) {
    deliver(StreamId::Stderr, args);
}

/// Switch both streams from Native to Redirected
pub fn install<'py>(py: Python<'py>, globals: &Bound<'py, PyDict>) -> BridgeResult<()> {
    let module = PyModule::new(py, "_pyembed_redirect").map_err(interpreter_error)?;
    let stdout_cb = wrap_pyfunction!(host_stdout, &module).map_err(interpreter_error)?;
    let stderr_cb = wrap_pyfunction!(host_stderr, &module).map_err(interpreter_error)?;
    globals
        .set_item(STDOUT_CALLBACK, stdout_cb)
        .map_err(interpreter_error)?;
    globals
        .set_item(STDERR_CALLBACK, stderr_cb)
        .map_err(interpreter_error)?;

    py.run(CATCHER_SOURCE, Some(globals), None)
        .map_err(interpreter_error)?;

    let sys = PyModule::import(py, "sys").map_err(interpreter_error)?;
    for stream in StreamId::ALL {
        let class = globals
            .get_item(catcher_class(stream))
            .map_err(interpreter_error)?
            .ok_or_else(|| {
                BridgeError::Interpreter(format!("{} was not defined", catcher_class(stream)))
            })?;
        let catcher = class.call0().map_err(interpreter_error)?;
        sys.setattr(stream.sys_attr(), catcher)
            .map_err(interpreter_error)?;
    }
    debug!("stdout/stderr redirected to host console");
    Ok(())
}

/// Point `sys.stdout` / `sys.stderr` back at the interpreter's originals
pub(crate) fn restore_native(py: Python<'_>) -> BridgeResult<()> {
    let sys = PyModule::import(py, "sys").map_err(interpreter_error)?;
    for stream in StreamId::ALL {
        let original = sys
            .getattr(format!("__{}__", stream.sys_attr()).as_str())
            .map_err(interpreter_error)?;
        sys.setattr(stream.sys_attr(), original)
            .map_err(interpreter_error)?;
    }
    Ok(())
}
