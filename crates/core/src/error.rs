//! Bridge error taxonomy
//!
//! Conversion and lookup errors are recovered at the host surface (empty
//! results plus a diagnostic, or a checked `Err`). Lifecycle errors are
//! propagated to the host, which decides whether to abort.

use crate::console::StreamId;

#[derive(Debug, Clone, PartialEq)]
pub enum BridgeError {
    /// A read-back target was not the expected container shape
    TypeMismatch {
        expected: &'static str,
        found: String,
    },
    /// One element of a sequence failed coercion
    ElementTypeMismatch {
        index: usize,
        expected: &'static str,
        found: String,
    },
    /// A redirected-stream callback received something other than one string
    ArgumentTypeMismatch { stream: StreamId, found: String },
    /// Lookup of a name that is not bound in the main namespace
    UnknownVariable(String),
    /// The embedded runtime failed to start
    InitializationFailure(String),
    /// `start` while a session is already live
    AlreadyRunning,
    /// `start` after the runtime was finalized in this process
    ReinitializationUnsupported,
    /// Operation needs a live session and there is none
    NotRunning,
    /// Text crossing a boundary contained a NUL byte or invalid UTF-8
    InvalidText(String),
    /// A host-supplied argument was unusable (null pointer, bad length)
    InvalidArgument(String),
    /// Unexpected exception raised by the bridge's own interpreter calls
    Interpreter(String),
    /// Value has no interpreter-side constructor
    UnsupportedValue(String),
    /// Configuration could not be read or parsed
    Config(String),
}

impl std::fmt::Display for BridgeError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            BridgeError::TypeMismatch { expected, found } => {
                write!(f, "type mismatch: expected {}, found {}", expected, found)
            }
            BridgeError::ElementTypeMismatch {
                index,
                expected,
                found,
            } => write!(
                f,
                "element {} has wrong type: expected {}, found {}",
                index, expected, found
            ),
            BridgeError::ArgumentTypeMismatch { stream, found } => write!(
                f,
                "{} redirect expects a single str argument, got {}",
                stream, found
            ),
            BridgeError::UnknownVariable(name) => write!(f, "unknown variable: {}", name),
            BridgeError::InitializationFailure(msg) => {
                write!(f, "interpreter initialization failed: {}", msg)
            }
            BridgeError::AlreadyRunning => write!(f, "an embedded interpreter is already running"),
            BridgeError::ReinitializationUnsupported => write!(
                f,
                "the embedded interpreter was finalized and cannot be restarted in this process"
            ),
            BridgeError::NotRunning => write!(f, "no embedded interpreter is running"),
            BridgeError::InvalidText(msg) => write!(f, "invalid text: {}", msg),
            BridgeError::InvalidArgument(msg) => write!(f, "invalid argument: {}", msg),
            BridgeError::Interpreter(msg) => write!(f, "interpreter error: {}", msg),
            BridgeError::UnsupportedValue(ty) => {
                write!(f, "cannot build an interpreter value from <{}>", ty)
            }
            BridgeError::Config(msg) => write!(f, "configuration error: {}", msg),
        }
    }
}

impl std::error::Error for BridgeError {}

pub type BridgeResult<T> = Result<T, BridgeError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_names_the_offending_element() {
        let err = BridgeError::ElementTypeMismatch {
            index: 3,
            expected: "float",
            found: "str".into(),
        };
        assert_eq!(
            err.to_string(),
            "element 3 has wrong type: expected float, found str"
        );
    }

    #[test]
    fn test_display_for_stream_mismatch() {
        let err = BridgeError::ArgumentTypeMismatch {
            stream: StreamId::Stderr,
            found: "int".into(),
        };
        assert_eq!(
            err.to_string(),
            "stderr redirect expects a single str argument, got int"
        );
        assert_eq!(
            BridgeError::UnknownVariable("x".into()).to_string(),
            "unknown variable: x"
        );
    }
}
