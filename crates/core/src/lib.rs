//! pyembed core: interpreter-independent pieces of the bridge
//!
//! This crate has no dependency on the embedded runtime itself, so the value
//! model and conversion rules can be tested without an interpreter.
//!
//! # Modules
//!
//! - `value`: `ForeignValue`, the tagged mirror of interpreter objects
//! - `convert`: host numeric/text sequences <-> `ForeignValue`
//! - `console`: `ConsoleSink` capability and stock sinks
//! - `error`: `BridgeError` taxonomy

pub mod console;
pub mod convert;
pub mod error;
pub mod value;

pub use console::{CaptureConsole, ConsoleSink, StdConsole, StreamId};
pub use convert::{
    TextModel, foreign_to_numeric, foreign_to_text, numeric_to_foreign, text_to_foreign,
};
pub use error::{BridgeError, BridgeResult};
pub use value::ForeignValue;
