//! C ABI for host processes
//!
//! A host links the runtime as a static library and drives one session
//! through these functions. The session lives in a process-wide slot whose
//! lock also serializes every call, so concurrent host threads cannot
//! interleave namespace updates.
//!
//! # Conventions
//!
//! - Fallible calls return `false` (or null) and record a message readable
//!   with `pyembed_take_error`.
//! - Strings are NUL-terminated UTF-8.
//! - Arrays returned by `pyembed_retrieve_*` are owned by the caller and must
//!   be released with the matching `pyembed_free_*` function. An empty result
//!   is a null pointer with `*out_len == 0`.
//! - Interpreter output goes to the host process's stdout/stderr.
//!
//! # Safety Contract
//!
//! Pointers must be null or valid for the stated length; the functions check
//! for null but cannot check anything else.

use crate::config::EmbedConfig;
use crate::error::set_last_error;
use crate::lifecycle::Interpreter;
use crate::logging;
use pyembed_core::{BridgeError, BridgeResult, StdConsole};
use std::ffi::{CStr, CString, c_char};
use std::path::Path;
use std::ptr;
use std::sync::{Arc, Mutex, MutexGuard};
use tracing::debug;

static SESSION: Mutex<Option<Interpreter>> = Mutex::new(None);

fn lock_session() -> MutexGuard<'static, Option<Interpreter>> {
    SESSION.lock().unwrap_or_else(|e| e.into_inner())
}

fn with_session<T>(f: impl FnOnce(&Interpreter) -> BridgeResult<T>) -> BridgeResult<T> {
    let session = lock_session();
    match session.as_ref() {
        Some(interp) => f(interp),
        None => Err(BridgeError::NotRunning),
    }
}

fn report<T>(result: BridgeResult<T>) -> Option<T> {
    match result {
        Ok(value) => Some(value),
        Err(err) => {
            debug!("C ABI call failed: {}", err);
            set_last_error(&err);
            None
        }
    }
}

fn start_session(config: EmbedConfig) -> BridgeResult<()> {
    let mut session = lock_session();
    if session.is_some() {
        return Err(BridgeError::AlreadyRunning);
    }
    *session = Some(Interpreter::start(config, Arc::new(StdConsole))?);
    Ok(())
}

unsafe fn c_str<'a>(ptr: *const c_char, what: &str) -> BridgeResult<&'a str> {
    if ptr.is_null() {
        return Err(BridgeError::InvalidArgument(format!("{} is null", what)));
    }
    // SAFETY: caller guarantees ptr is a valid NUL-terminated string
    unsafe { CStr::from_ptr(ptr) }
        .to_str()
        .map_err(|_| BridgeError::InvalidText(format!("{} is not valid UTF-8", what)))
}

unsafe fn f64_slice<'a>(values: *const f64, len: usize) -> BridgeResult<&'a [f64]> {
    if len == 0 {
        return Ok(&[]);
    }
    if values.is_null() {
        return Err(BridgeError::InvalidArgument(format!(
            "values is null with length {}",
            len
        )));
    }
    // SAFETY: caller guarantees values points to len readable f64s
    Ok(unsafe { std::slice::from_raw_parts(values, len) })
}

unsafe fn str_vec<'a>(values: *const *const c_char, len: usize) -> BridgeResult<Vec<&'a str>> {
    if len == 0 {
        return Ok(Vec::new());
    }
    if values.is_null() {
        return Err(BridgeError::InvalidArgument(format!(
            "values is null with length {}",
            len
        )));
    }
    // SAFETY: caller guarantees values points to len string pointers
    let ptrs = unsafe { std::slice::from_raw_parts(values, len) };
    ptrs.iter()
        .enumerate()
        .map(|(i, &p)| unsafe { c_str(p, &format!("values[{}]", i)) })
        .collect()
}

fn into_raw_array<T>(items: Vec<T>) -> *mut T {
    if items.is_empty() {
        return ptr::null_mut();
    }
    Box::into_raw(items.into_boxed_slice()) as *mut T
}

unsafe fn from_raw_array<T>(ptr: *mut T, len: usize) -> Option<Box<[T]>> {
    if ptr.is_null() {
        return None;
    }
    // SAFETY: ptr/len came from into_raw_array
    Some(unsafe { Box::from_raw(ptr::slice_from_raw_parts_mut(ptr, len)) })
}

unsafe fn set_len(out_len: *mut usize, len: usize) {
    if !out_len.is_null() {
        // SAFETY: caller guarantees out_len is writable when non-null
        unsafe { *out_len = len };
    }
}

/// Start the session with configuration from `PYEMBED_*` variables
#[unsafe(no_mangle)]
pub extern "C" fn pyembed_initialize() -> bool {
    logging::init();
    report(start_session(EmbedConfig::from_env())).is_some()
}

/// Start the session from a TOML file, with `PYEMBED_*` overrides applied
///
/// # Safety
/// `path` must be null or a valid NUL-terminated string
#[unsafe(no_mangle)]
pub unsafe extern "C" fn pyembed_initialize_from_file(path: *const c_char) -> bool {
    logging::init();
    let result = unsafe { c_str(path, "path") }
        .and_then(|p| EmbedConfig::load(Path::new(p)))
        .and_then(|config| start_session(config.with_env_overrides()));
    report(result).is_some()
}

/// Stop the session; does nothing when none is running
#[unsafe(no_mangle)]
pub extern "C" fn pyembed_finalize() {
    let mut session = lock_session();
    if let Some(interp) = session.take() {
        report(interp.stop());
    }
}

#[unsafe(no_mangle)]
pub extern "C" fn pyembed_is_running() -> bool {
    lock_session().is_some()
}

/// # Safety
/// `code` must be null or a valid NUL-terminated string
#[unsafe(no_mangle)]
pub unsafe extern "C" fn pyembed_run_code(code: *const c_char) -> bool {
    let result =
        unsafe { c_str(code, "code") }.and_then(|code| with_session(|i| i.run_code(code)));
    report(result).is_some()
}

/// # Safety
/// `name` must be a valid string; `values` must point to `len` doubles
#[unsafe(no_mangle)]
pub unsafe extern "C" fn pyembed_publish_numeric(
    name: *const c_char,
    values: *const f64,
    len: usize,
) -> bool {
    let result = (|| {
        let name = unsafe { c_str(name, "name") }?;
        let values = unsafe { f64_slice(values, len) }?;
        with_session(|i| i.publish_numeric(name, values))
    })();
    report(result).is_some()
}

/// # Safety
/// `name` must be a valid string; `values` must point to `len` valid strings
#[unsafe(no_mangle)]
pub unsafe extern "C" fn pyembed_publish_text(
    name: *const c_char,
    values: *const *const c_char,
    len: usize,
) -> bool {
    let result = (|| {
        let name = unsafe { c_str(name, "name") }?;
        let values = unsafe { str_vec(values, len) }?;
        with_session(|i| i.publish_text(name, &values))
    })();
    report(result).is_some()
}

/// # Safety
/// `name` and `group` must be valid strings; `values` must point to `len` doubles
#[unsafe(no_mangle)]
pub unsafe extern "C" fn pyembed_publish_numeric_into_group(
    name: *const c_char,
    values: *const f64,
    len: usize,
    group: *const c_char,
) -> bool {
    let result = (|| {
        let name = unsafe { c_str(name, "name") }?;
        let group = unsafe { c_str(group, "group") }?;
        let values = unsafe { f64_slice(values, len) }?;
        with_session(|i| i.publish_numeric_into_group(name, values, group))
    })();
    report(result).is_some()
}

/// # Safety
/// `name` and `group` must be valid strings; `values` must point to `len` valid strings
#[unsafe(no_mangle)]
pub unsafe extern "C" fn pyembed_publish_text_into_group(
    name: *const c_char,
    values: *const *const c_char,
    len: usize,
    group: *const c_char,
) -> bool {
    let result = (|| {
        let name = unsafe { c_str(name, "name") }?;
        let group = unsafe { c_str(group, "group") }?;
        let values = unsafe { str_vec(values, len) }?;
        with_session(|i| i.publish_text_into_group(name, &values, group))
    })();
    report(result).is_some()
}

/// Read `name` as doubles
///
/// An unbound name yields an empty result and a diagnostic on stdout, not an
/// error. Release the result with `pyembed_free_numeric`.
///
/// # Safety
/// `name` must be a valid string; `out_len` must be null or writable
#[unsafe(no_mangle)]
pub unsafe extern "C" fn pyembed_retrieve_numeric(
    name: *const c_char,
    out_len: *mut usize,
) -> *mut f64 {
    unsafe { set_len(out_len, 0) };
    let result = unsafe { c_str(name, "name") }
        .and_then(|name| with_session(|i| i.retrieve_numeric(name)));
    match report(result) {
        Some(values) => {
            unsafe { set_len(out_len, values.len()) };
            into_raw_array(values)
        }
        None => ptr::null_mut(),
    }
}

/// # Safety
/// `values`/`len` must come from `pyembed_retrieve_numeric` (null is allowed)
#[unsafe(no_mangle)]
pub unsafe extern "C" fn pyembed_free_numeric(values: *mut f64, len: usize) {
    drop(unsafe { from_raw_array(values, len) });
}

/// Read `name` as strings
///
/// Release the result with `pyembed_free_text`.
///
/// # Safety
/// `name` must be a valid string; `out_len` must be null or writable
#[unsafe(no_mangle)]
pub unsafe extern "C" fn pyembed_retrieve_text(
    name: *const c_char,
    out_len: *mut usize,
) -> *mut *mut c_char {
    unsafe { set_len(out_len, 0) };
    let result = unsafe { c_str(name, "name") }
        .and_then(|name| with_session(|i| i.retrieve_text(name)))
        .and_then(|values| {
            values
                .into_iter()
                .enumerate()
                .map(|(index, s)| {
                    CString::new(s).map_err(|_| {
                        BridgeError::InvalidText(format!("element {} contains a NUL byte", index))
                    })
                })
                .collect::<BridgeResult<Vec<_>>>()
        });
    match report(result) {
        Some(values) => {
            unsafe { set_len(out_len, values.len()) };
            into_raw_array(values.into_iter().map(CString::into_raw).collect())
        }
        None => ptr::null_mut(),
    }
}

/// # Safety
/// `values`/`len` must come from `pyembed_retrieve_text` (null is allowed)
#[unsafe(no_mangle)]
pub unsafe extern "C" fn pyembed_free_text(values: *mut *mut c_char, len: usize) {
    if let Some(strings) = unsafe { from_raw_array(values, len) } {
        for s in strings.iter().copied() {
            // SAFETY: each element came from CString::into_raw
            drop(unsafe { CString::from_raw(s) });
        }
    }
}
