//! Last-error slot for the C ABI
//!
//! C entry points never panic across the boundary. A failing call returns
//! `false` (or null) and leaves its message here for the host to fetch.
//!
//! ```ignore
//! if (!pyembed_publish_numeric("x", values, n)) {
//!     const char *msg = pyembed_take_error();
//!     /* copy msg before the next pyembed_* call */
//! }
//! ```

use pyembed_core::BridgeError;
use std::cell::RefCell;
use std::ffi::{CString, c_char};
use std::ptr;

thread_local! {
    static LAST_ERROR: RefCell<Option<String>> = const { RefCell::new(None) };

    /// Keeps the pointer handed to C valid until the next error call
    static ERROR_CSTRING: RefCell<Option<CString>> = const { RefCell::new(None) };
}

pub fn set_last_error(err: &BridgeError) {
    ERROR_CSTRING.with(|cs| *cs.borrow_mut() = None);
    LAST_ERROR.with(|e| *e.borrow_mut() = Some(err.to_string()));
}

pub fn take_last_error() -> Option<String> {
    LAST_ERROR.with(|e| e.borrow_mut().take())
}

pub fn has_last_error() -> bool {
    LAST_ERROR.with(|e| e.borrow().is_some())
}

pub fn clear_last_error() {
    LAST_ERROR.with(|e| *e.borrow_mut() = None);
    ERROR_CSTRING.with(|cs| *cs.borrow_mut() = None);
}

fn cache_cstring(msg: &str) -> *const c_char {
    let safe: String = msg.chars().map(|c| if c == '\0' { '?' } else { c }).collect();
    match CString::new(safe) {
        Ok(cstring) => ERROR_CSTRING.with(|cs| {
            let ptr = cstring.as_ptr();
            *cs.borrow_mut() = Some(cstring);
            ptr
        }),
        Err(_) => ptr::null(),
    }
}

#[unsafe(no_mangle)]
pub extern "C" fn pyembed_has_error() -> bool {
    has_last_error()
}

/// Last error message without clearing it, or null
///
/// The pointer is valid until the next error-slot call on this thread.
#[unsafe(no_mangle)]
pub extern "C" fn pyembed_get_error() -> *const c_char {
    match LAST_ERROR.with(|e| e.borrow().clone()) {
        Some(msg) => cache_cstring(&msg),
        None => ptr::null(),
    }
}

/// Take (and clear) the last error message, or null
///
/// The pointer is valid until the next error-slot call on this thread.
#[unsafe(no_mangle)]
pub extern "C" fn pyembed_take_error() -> *const c_char {
    match take_last_error() {
        Some(msg) => cache_cstring(&msg),
        None => ptr::null(),
    }
}

#[unsafe(no_mangle)]
pub extern "C" fn pyembed_clear_error() {
    clear_last_error();
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::ffi::CStr;

    #[test]
    fn test_set_and_take_error() {
        clear_last_error();
        assert!(!has_last_error());

        set_last_error(&BridgeError::NotRunning);
        assert!(pyembed_has_error());
        assert_eq!(
            take_last_error(),
            Some("no embedded interpreter is running".to_string())
        );
        assert!(!has_last_error());
    }

    #[test]
    fn test_c_accessors() {
        clear_last_error();
        assert!(pyembed_take_error().is_null());

        set_last_error(&BridgeError::InvalidText("nul\0inside".into()));
        let peeked = unsafe { CStr::from_ptr(pyembed_get_error()) }
            .to_str()
            .unwrap()
            .to_string();
        assert_eq!(peeked, "invalid text: nul?inside");
        assert!(pyembed_has_error());

        let taken = unsafe { CStr::from_ptr(pyembed_take_error()) }
            .to_str()
            .unwrap()
            .to_string();
        assert_eq!(taken, peeked);
        assert!(!pyembed_has_error());

        set_last_error(&BridgeError::AlreadyRunning);
        pyembed_clear_error();
        assert!(pyembed_get_error().is_null());
    }
}
