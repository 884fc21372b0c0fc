//! Shared runtime library preloading
//!
//! Hosts usually load native extensions with local symbol visibility, which
//! hides the interpreter's C API from extension modules the interpreter
//! imports later. Reopening the runtime library with `RTLD_GLOBAL` before
//! initialization makes those symbols resolvable process-wide.
//!
//! The handle is never closed: the library must stay mapped for the life of
//! the process.

use std::path::Path;

/// Load `path` with lazy binding and global symbol visibility
///
/// Returns `Err` with the loader's message when the library cannot be
/// opened. On platforms without `dlopen` this is a no-op.
#[cfg(unix)]
pub fn preload_global(path: &Path) -> Result<(), String> {
    use std::ffi::{CStr, CString};
    use std::os::unix::ffi::OsStrExt;

    let c_path = CString::new(path.as_os_str().as_bytes())
        .map_err(|_| format!("{}: path contains a NUL byte", path.display()))?;

    // SAFETY: c_path is a valid NUL-terminated string for the duration of the call
    let handle = unsafe { libc::dlopen(c_path.as_ptr(), libc::RTLD_LAZY | libc::RTLD_GLOBAL) };
    if handle.is_null() {
        // SAFETY: dlerror returns a thread-local message or null
        let msg = unsafe {
            let err = libc::dlerror();
            if err.is_null() {
                "unknown dlopen failure".to_string()
            } else {
                CStr::from_ptr(err).to_string_lossy().into_owned()
            }
        };
        return Err(msg);
    }
    Ok(())
}

#[cfg(not(unix))]
pub fn preload_global(_path: &Path) -> Result<(), String> {
    Ok(())
}
