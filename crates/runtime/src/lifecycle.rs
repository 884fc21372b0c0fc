//! Embedded interpreter lifecycle
//!
//! One interpreter session per process. The process-wide state moves
//! `Uninitialized -> Running -> Uninitialized`, or ends in `Finalized` when a
//! session is torn down with `TeardownMode::Finalize`. The `Interpreter`
//! handle is the only way to reach the main namespace while `Running`.
//!
//! # Start sequence
//!
//! 1. Preload the shared runtime library (when configured)
//! 2. Initialize the interpreter
//! 3. Set the program identity
//! 4. Snapshot the main namespace
//! 5. Install the redirected streams (when enabled)
//! 6. Run startup statements
//!
//! Any failure after step 2 tears the half-built session down again.

use crate::config::{EmbedConfig, TeardownMode};
use crate::marshal::interpreter_error;
use crate::{namespace, preload, redirect};
use pyembed_core::{BridgeError, BridgeResult, ConsoleSink, TextModel};
use pyo3::prelude::*;
use pyo3::types::PyList;
use std::sync::{Arc, Mutex, MutexGuard};
use tracing::{debug, info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifecycleState {
    Uninitialized,
    Running,
    /// The runtime was shut down; it cannot be started again in this process
    Finalized,
}

static STATE: Mutex<LifecycleState> = Mutex::new(LifecycleState::Uninitialized);

fn lock_state() -> MutexGuard<'static, LifecycleState> {
    STATE.lock().unwrap_or_else(|e| e.into_inner())
}

pub fn state() -> LifecycleState {
    *lock_state()
}

pub fn is_running() -> bool {
    state() == LifecycleState::Running
}

/// Handle to the live interpreter session
///
/// Dropping the handle stops the session.
pub struct Interpreter {
    pub(crate) config: EmbedConfig,
    pub(crate) console: Arc<dyn ConsoleSink>,
    /// Bindings of `__main__` before the session added anything
    baseline: Option<namespace::Snapshot>,
    running: bool,
}

impl std::fmt::Debug for Interpreter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Interpreter")
            .field("config", &self.config)
            .field("running", &self.running)
            .finish_non_exhaustive()
    }
}

impl Interpreter {
    pub fn start(config: EmbedConfig, console: Arc<dyn ConsoleSink>) -> BridgeResult<Self> {
        {
            let mut state = lock_state();
            match *state {
                LifecycleState::Running => return Err(BridgeError::AlreadyRunning),
                LifecycleState::Finalized => {
                    return Err(BridgeError::ReinitializationUnsupported);
                }
                LifecycleState::Uninitialized => {}
            }

            if let Some(path) = &config.library_path {
                match preload::preload_global(path) {
                    Ok(()) => debug!("preloaded {} with global symbols", path.display()),
                    Err(msg) => warn!("could not preload {}: {}", path.display(), msg),
                }
            }

            pyo3::prepare_freethreaded_python();
            // SAFETY: Py_IsInitialized has no preconditions
            if unsafe { pyo3::ffi::Py_IsInitialized() } == 0 {
                return Err(BridgeError::InitializationFailure(
                    "runtime reports uninitialized after initialization".to_string(),
                ));
            }
            *state = LifecycleState::Running;
        }

        redirect::set_sink(Some(console.clone()));
        let mut interp = Interpreter {
            config,
            console,
            baseline: None,
            running: true,
        };

        // From here on, returning Err drops `interp`, which tears down
        let baseline = Python::with_gil(|py| -> BridgeResult<namespace::Snapshot> {
            set_program_name(py, &interp.config.program_name)?;
            namespace::snapshot(py)
        })?;
        interp.baseline = Some(baseline);

        if interp.config.redirect_streams {
            Python::with_gil(|py| -> BridgeResult<()> {
                let globals = namespace::main_dict(py)?;
                redirect::install(py, &globals)
            })?;
        }

        for statement in &interp.config.startup {
            interp.run_code(statement)?;
        }

        info!(
            "embedded interpreter started as '{}'",
            interp.config.program_name
        );
        Ok(interp)
    }

    /// End the session according to the configured teardown mode
    pub fn stop(mut self) -> BridgeResult<()> {
        self.teardown()
    }

    pub fn config(&self) -> &EmbedConfig {
        &self.config
    }

    pub fn text_model(&self) -> TextModel {
        self.config.text_model
    }

    pub fn console(&self) -> &Arc<dyn ConsoleSink> {
        &self.console
    }

    fn teardown(&mut self) -> BridgeResult<()> {
        if !self.running {
            return Ok(());
        }
        self.running = false;
        redirect::set_sink(None);

        let mode = self.config.teardown;
        let result = match mode {
            TeardownMode::Reset => Python::with_gil(|py| -> BridgeResult<()> {
                if self.config.redirect_streams {
                    redirect::restore_native(py)?;
                }
                if let Some(baseline) = self.baseline.take() {
                    let removed = namespace::restore(py, &baseline)?;
                    debug!("session reset, {} names removed", removed);
                }
                Ok(())
            }),
            TeardownMode::Finalize => {
                // Release snapshot references while the runtime still exists
                Python::with_gil(|_| drop(self.baseline.take()));
                finalize_runtime()
            }
        };

        *lock_state() = match mode {
            TeardownMode::Reset => LifecycleState::Uninitialized,
            TeardownMode::Finalize => LifecycleState::Finalized,
        };
        info!("embedded interpreter stopped ({:?})", mode);
        result
    }
}

impl Drop for Interpreter {
    fn drop(&mut self) {
        if let Err(err) = self.teardown() {
            warn!("interpreter teardown failed: {}", err);
        }
    }
}

fn set_program_name(py: Python<'_>, name: &str) -> BridgeResult<()> {
    let sys = PyModule::import(py, "sys").map_err(interpreter_error)?;
    let argv = PyList::new(py, [name]).map_err(interpreter_error)?;
    sys.setattr("argv", argv).map_err(interpreter_error)
}

fn finalize_runtime() -> BridgeResult<()> {
    // SAFETY: called without any live pyo3 references on this thread; the
    // thread takes the GIL and finalization releases it with the runtime
    let status = unsafe {
        pyo3::ffi::PyGILState_Ensure();
        pyo3::ffi::Py_FinalizeEx()
    };
    if status < 0 {
        return Err(BridgeError::Interpreter(
            "buffered data could not be flushed during finalization".to_string(),
        ));
    }
    Ok(())
}
