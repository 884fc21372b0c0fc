//! Embedding configuration
//!
//! Configuration comes from three places, in increasing precedence when a
//! host combines them: built-in defaults, a TOML file, and environment
//! variables.
//!
//! ## Environment Variables
//!
//! | Variable | Default | Description |
//! |----------|---------|-------------|
//! | `PYEMBED_PROGRAM_NAME` | `pyembed` | Program identity (`sys.argv[0]`) |
//! | `PYEMBED_LIBPYTHON` | unset | Shared runtime library to preload with global symbols |
//! | `PYEMBED_TEXT_MODEL` | `unicode` | `unicode` or `legacy` (also decode `bytes`) |
//! | `PYEMBED_TEARDOWN` | `reset` | `reset` (clear session) or `finalize` (shut runtime down) |
//! | `PYEMBED_REDIRECT` | `1` | `0` leaves the interpreter's own stdout/stderr in place |
//! | `PYEMBED_STARTUP` | unset | `;`-separated statements run after start |
//!
//! ## File Format
//!
//! ```toml
//! program_name = "analysis"
//! library_path = "/usr/lib/x86_64-linux-gnu/libpython3.11.so"
//! text_model = "legacy"
//! teardown = "reset"
//! redirect_streams = true
//! startup = ["import math"]
//! ```

use pyembed_core::{BridgeError, BridgeResult, TextModel};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use tracing::warn;

pub const DEFAULT_PROGRAM_NAME: &str = "pyembed";

/// What `Interpreter::stop` does to the embedded runtime
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TeardownMode {
    /// Discard the session (namespace entries, redirected streams) and keep
    /// the runtime resident so a later start gets a fresh namespace
    #[default]
    Reset,
    /// Shut the runtime down; later starts in this process are refused
    Finalize,
}

impl TeardownMode {
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_ascii_lowercase().as_str() {
            "reset" => Some(TeardownMode::Reset),
            "finalize" => Some(TeardownMode::Finalize),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct EmbedConfig {
    /// Program identity the interpreter reports
    pub program_name: String,

    /// Shared runtime library to load with global symbol visibility before
    /// initialization (Unix only)
    pub library_path: Option<PathBuf>,

    /// Text representations accepted on read-back
    pub text_model: TextModel,

    pub teardown: TeardownMode,

    /// Install the redirected stdout/stderr streams at start
    pub redirect_streams: bool,

    /// Statements run in the main namespace once streams are installed
    pub startup: Vec<String>,
}

impl Default for EmbedConfig {
    fn default() -> Self {
        EmbedConfig {
            program_name: DEFAULT_PROGRAM_NAME.to_string(),
            library_path: None,
            text_model: TextModel::default(),
            teardown: TeardownMode::default(),
            redirect_streams: true,
            startup: Vec::new(),
        }
    }
}

impl EmbedConfig {
    pub fn new() -> Self {
        EmbedConfig::default()
    }

    pub fn with_program_name(mut self, name: impl Into<String>) -> Self {
        self.program_name = name.into();
        self
    }

    pub fn with_library_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.library_path = Some(path.into());
        self
    }

    pub fn with_text_model(mut self, model: TextModel) -> Self {
        self.text_model = model;
        self
    }

    pub fn with_teardown(mut self, mode: TeardownMode) -> Self {
        self.teardown = mode;
        self
    }

    pub fn with_redirect_streams(mut self, enabled: bool) -> Self {
        self.redirect_streams = enabled;
        self
    }

    pub fn with_startup(mut self, statement: impl Into<String>) -> Self {
        self.startup.push(statement.into());
        self
    }

    pub fn from_toml_str(source: &str) -> BridgeResult<Self> {
        toml::from_str(source).map_err(|e| BridgeError::Config(e.to_string()))
    }

    pub fn load(path: &Path) -> BridgeResult<Self> {
        let source = std::fs::read_to_string(path)
            .map_err(|e| BridgeError::Config(format!("{}: {}", path.display(), e)))?;
        Self::from_toml_str(&source)
    }

    /// Defaults with environment overrides applied
    pub fn from_env() -> Self {
        EmbedConfig::default().with_env_overrides()
    }

    /// Apply any `PYEMBED_*` variables on top of `self`
    ///
    /// Unrecognized values are reported and leave the field unchanged.
    pub fn with_env_overrides(mut self) -> Self {
        if let Some(name) = env_nonempty("PYEMBED_PROGRAM_NAME") {
            self.program_name = name;
        }

        if let Some(path) = env_nonempty("PYEMBED_LIBPYTHON") {
            self.library_path = Some(PathBuf::from(path));
        }

        if let Some(val) = env_nonempty("PYEMBED_TEXT_MODEL") {
            match TextModel::parse(&val) {
                Some(model) => self.text_model = model,
                None => warn!("PYEMBED_TEXT_MODEL='{}' not recognized, ignoring", val),
            }
        }

        if let Some(val) = env_nonempty("PYEMBED_TEARDOWN") {
            match TeardownMode::parse(&val) {
                Some(mode) => self.teardown = mode,
                None => warn!("PYEMBED_TEARDOWN='{}' not recognized, ignoring", val),
            }
        }

        if let Some(val) = env_nonempty("PYEMBED_REDIRECT") {
            match val.to_ascii_lowercase().as_str() {
                "0" | "false" | "off" => self.redirect_streams = false,
                "1" | "true" | "on" => self.redirect_streams = true,
                _ => warn!("PYEMBED_REDIRECT='{}' not recognized, ignoring", val),
            }
        }

        if let Some(val) = env_nonempty("PYEMBED_STARTUP") {
            self.startup = val
                .split(';')
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(String::from)
                .collect();
        }

        self
    }
}

fn env_nonempty(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;
    use std::io::Write;

    const ENV_KEYS: [&str; 6] = [
        "PYEMBED_PROGRAM_NAME",
        "PYEMBED_LIBPYTHON",
        "PYEMBED_TEXT_MODEL",
        "PYEMBED_TEARDOWN",
        "PYEMBED_REDIRECT",
        "PYEMBED_STARTUP",
    ];

    fn clear_env() {
        // SAFETY: env tests are #[serial]
        unsafe {
            for key in ENV_KEYS {
                std::env::remove_var(key);
            }
        }
    }

    #[test]
    fn test_defaults() {
        let config = EmbedConfig::default();
        assert_eq!(config.program_name, "pyembed");
        assert_eq!(config.library_path, None);
        assert_eq!(config.text_model, TextModel::Unicode);
        assert_eq!(config.teardown, TeardownMode::Reset);
        assert!(config.redirect_streams);
        assert!(config.startup.is_empty());
    }

    #[test]
    fn test_builder() {
        let config = EmbedConfig::new()
            .with_program_name("host")
            .with_text_model(TextModel::Legacy)
            .with_teardown(TeardownMode::Finalize)
            .with_redirect_streams(false)
            .with_startup("import math")
            .with_startup("x = 1");
        assert_eq!(config.program_name, "host");
        assert_eq!(config.text_model, TextModel::Legacy);
        assert_eq!(config.teardown, TeardownMode::Finalize);
        assert!(!config.redirect_streams);
        assert_eq!(config.startup, vec!["import math", "x = 1"]);
    }

    #[test]
    fn test_toml_partial_keys_keep_defaults() {
        let config = EmbedConfig::from_toml_str(
            r#"
            program_name = "analysis"
            text_model = "legacy"
            startup = ["import math"]
            "#,
        )
        .unwrap();
        assert_eq!(config.program_name, "analysis");
        assert_eq!(config.text_model, TextModel::Legacy);
        assert_eq!(config.teardown, TeardownMode::Reset);
        assert!(config.redirect_streams);
        assert_eq!(config.startup, vec!["import math"]);
    }

    #[test]
    fn test_toml_rejects_unknown_keys_and_values() {
        assert!(matches!(
            EmbedConfig::from_toml_str("programme = \"x\""),
            Err(BridgeError::Config(_))
        ));
        assert!(matches!(
            EmbedConfig::from_toml_str("teardown = \"sometimes\""),
            Err(BridgeError::Config(_))
        ));
    }

    #[test]
    fn test_load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "library_path = \"/opt/lib/libpython3.so\"").unwrap();
        writeln!(file, "teardown = \"finalize\"").unwrap();
        writeln!(file, "redirect_streams = false").unwrap();

        let config = EmbedConfig::load(file.path()).unwrap();
        assert_eq!(
            config.library_path,
            Some(PathBuf::from("/opt/lib/libpython3.so"))
        );
        assert_eq!(config.teardown, TeardownMode::Finalize);
        assert!(!config.redirect_streams);
    }

    #[test]
    fn test_load_missing_file() {
        let err = EmbedConfig::load(Path::new("/nonexistent/pyembed.toml")).unwrap_err();
        assert!(err.to_string().contains("/nonexistent/pyembed.toml"));
    }

    #[test]
    #[serial]
    fn test_env_overrides() {
        clear_env();
        // SAFETY: env tests are #[serial]
        unsafe {
            std::env::set_var("PYEMBED_PROGRAM_NAME", "from-env");
            std::env::set_var("PYEMBED_TEXT_MODEL", "legacy");
            std::env::set_var("PYEMBED_TEARDOWN", "finalize");
            std::env::set_var("PYEMBED_REDIRECT", "0");
            std::env::set_var("PYEMBED_STARTUP", "import math; ; y = 2");
        }
        let config = EmbedConfig::from_env();
        clear_env();

        assert_eq!(config.program_name, "from-env");
        assert_eq!(config.text_model, TextModel::Legacy);
        assert_eq!(config.teardown, TeardownMode::Finalize);
        assert!(!config.redirect_streams);
        assert_eq!(config.startup, vec!["import math", "y = 2"]);
    }

    #[test]
    #[serial]
    fn test_env_unrecognized_values_are_ignored() {
        clear_env();
        // SAFETY: env tests are #[serial]
        unsafe {
            std::env::set_var("PYEMBED_TEXT_MODEL", "ebcdic");
            std::env::set_var("PYEMBED_TEARDOWN", "");
            std::env::set_var("PYEMBED_REDIRECT", "maybe");
        }
        let base = EmbedConfig::new().with_text_model(TextModel::Legacy);
        let config = base.clone().with_env_overrides();
        clear_env();

        assert_eq!(config, base);
    }
}
