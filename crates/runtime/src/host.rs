//! Host-facing operations on a running session
//!
//! Lookup of an unbound name is a soft failure: the call returns an empty
//! vector and writes `unknown variable: <name>` to the host output stream.
//! Shape errors on read-back are returned as `Err`.
//!
//! Exceptions raised by code passed to `run_code` are printed to the
//! (redirected) error stream and are not returned to the caller.

use crate::lifecycle::Interpreter;
use crate::{marshal, namespace};
use pyembed_core::{
    BridgeError, BridgeResult, ForeignValue, StreamId, foreign_to_numeric, foreign_to_text,
    numeric_to_foreign, text_to_foreign,
};
use pyo3::prelude::*;
use std::ffi::CString;
use tracing::debug;

impl Interpreter {
    /// Execute `code` in the main namespace
    pub fn run_code(&self, code: &str) -> BridgeResult<()> {
        let code = CString::new(code)
            .map_err(|_| BridgeError::InvalidText("code contains a NUL byte".to_string()))?;
        Python::with_gil(|py| {
            let globals = namespace::main_dict(py)?;
            if let Err(err) = py.run(&code, Some(&globals), None) {
                debug!("executed code raised: {}", err);
                err.display(py);
            }
            Ok(())
        })
    }

    pub fn publish(&self, name: &str, value: &ForeignValue) -> BridgeResult<()> {
        Python::with_gil(|py| namespace::publish(py, name, marshal::to_python(py, value)?))
    }

    /// Current value of `name`, or `None` when unbound
    pub fn retrieve(&self, name: &str) -> BridgeResult<Option<ForeignValue>> {
        Python::with_gil(|py| {
            Ok(namespace::retrieve(py, name)?.map(|obj| marshal::from_python(&obj)))
        })
    }

    pub fn publish_into_group(
        &self,
        entry: &str,
        group: &str,
        value: &ForeignValue,
    ) -> BridgeResult<()> {
        Python::with_gil(|py| {
            namespace::publish_into_group(py, entry, group, marshal::to_python(py, value)?)
        })
    }

    pub fn publish_numeric(&self, name: &str, values: &[f64]) -> BridgeResult<()> {
        self.publish(name, &numeric_to_foreign(values))
    }

    pub fn publish_text<S: AsRef<str>>(&self, name: &str, values: &[S]) -> BridgeResult<()> {
        self.publish(name, &text_to_foreign(values))
    }

    pub fn publish_numeric_into_group(
        &self,
        name: &str,
        values: &[f64],
        group: &str,
    ) -> BridgeResult<()> {
        self.publish_into_group(name, group, &numeric_to_foreign(values))
    }

    pub fn publish_text_into_group<S: AsRef<str>>(
        &self,
        name: &str,
        values: &[S],
        group: &str,
    ) -> BridgeResult<()> {
        self.publish_into_group(name, group, &text_to_foreign(values))
    }

    pub fn retrieve_numeric(&self, name: &str) -> BridgeResult<Vec<f64>> {
        match self.retrieve_flat(name)? {
            Some(value) => foreign_to_numeric(&value),
            None => {
                self.report_unknown(name);
                Ok(Vec::new())
            }
        }
    }

    pub fn retrieve_text(&self, name: &str) -> BridgeResult<Vec<String>> {
        match self.retrieve_flat(name)? {
            Some(value) => foreign_to_text(&value, self.text_model()),
            None => {
                self.report_unknown(name);
                Ok(Vec::new())
            }
        }
    }

    fn retrieve_flat(&self, name: &str) -> BridgeResult<Option<ForeignValue>> {
        Python::with_gil(|py| {
            Ok(namespace::retrieve(py, name)?.map(|obj| marshal::from_python_flat(&obj)))
        })
    }

    fn report_unknown(&self, name: &str) {
        let err = BridgeError::UnknownVariable(name.to_string());
        debug!("{}", err);
        self.console.write(StreamId::Stdout, &format!("{}\n", err));
    }
}
