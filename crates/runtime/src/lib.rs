//! pyembed runtime: an embedded CPython session for a host process
//!
//! Key design principles:
//! - One interpreter per process, owned by an `Interpreter` handle
//! - Host data crosses as numeric or text sequences, bound in `__main__`
//! - Interpreter stdout/stderr flow back to the host through a `ConsoleSink`
//! - Everything a C host needs is exported from `ffi` and `error`
//!
//! ```ignore
//! let console = Arc::new(CaptureConsole::new());
//! let interp = Interpreter::start(EmbedConfig::default(), console.clone())?;
//! interp.publish_numeric("x", &[1.0, 2.0, 3.0])?;
//! interp.run_code("print(sum(x))")?;
//! assert_eq!(console.take_stdout(), "6.0\n");
//! interp.stop()?;
//! ```

pub mod config;
pub mod error;
pub mod ffi;
pub mod host;
pub mod lifecycle;
pub mod logging;
pub mod marshal;
pub mod namespace;
pub mod preload;
pub mod redirect;

pub use config::{DEFAULT_PROGRAM_NAME, EmbedConfig, TeardownMode};
pub use lifecycle::{Interpreter, LifecycleState};

// Interpreter-independent types, re-exported for hosts that only link this crate
pub use pyembed_core::{
    BridgeError, BridgeResult, CaptureConsole, ConsoleSink, ForeignValue, StdConsole, StreamId,
    TextModel,
};

// C ABI error slot
pub use error::{pyembed_clear_error, pyembed_get_error, pyembed_has_error, pyembed_take_error};

// C ABI session surface
pub use ffi::{
    pyembed_finalize, pyembed_free_numeric, pyembed_free_text, pyembed_initialize,
    pyembed_initialize_from_file, pyembed_is_running, pyembed_publish_numeric,
    pyembed_publish_numeric_into_group, pyembed_publish_text, pyembed_publish_text_into_group,
    pyembed_retrieve_numeric, pyembed_retrieve_text, pyembed_run_code,
};
