//! Log subscriber setup for hosts
//!
//! The runtime only emits `tracing` events. Rust hosts that already install
//! a subscriber need nothing from here; C hosts get one installed by the
//! `pyembed_initialize*` entry points. Filter directives come from
//! `PYEMBED_LOG` (for example `PYEMBED_LOG=pyembed_runtime=debug`).

use tracing_subscriber::EnvFilter;

pub const LOG_ENV: &str = "PYEMBED_LOG";
const DEFAULT_DIRECTIVE: &str = "pyembed_runtime=warn";

/// Install a stderr subscriber unless one is already set
pub fn init() {
    let filter =
        EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new(DEFAULT_DIRECTIVE));

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}
