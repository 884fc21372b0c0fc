//! Host sequence <-> foreign value conversion
//!
//! These functions are pure and allocate a fresh result on every call.
//! Order and length are preserved exactly; a conversion either accounts for
//! every element or fails naming the first one it could not convert.

use crate::error::{BridgeError, BridgeResult};
use crate::value::ForeignValue;
use serde::Deserialize;

/// Which interpreter text representations `foreign_to_text` accepts
///
/// Interpreters that kept a separate byte-string type alongside Unicode
/// text need the legacy branch to read back values produced by older code.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TextModel {
    /// Only Unicode `str` elements
    #[default]
    Unicode,
    /// `str` elements, plus `bytes` elements decoded as UTF-8
    #[serde(alias = "legacy-bytes")]
    Legacy,
}

impl TextModel {
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_ascii_lowercase().as_str() {
            "unicode" => Some(TextModel::Unicode),
            "legacy" | "legacy-bytes" => Some(TextModel::Legacy),
            _ => None,
        }
    }
}

pub fn numeric_to_foreign(values: &[f64]) -> ForeignValue {
    ForeignValue::Sequence(values.iter().copied().map(ForeignValue::Float).collect())
}

pub fn text_to_foreign<S: AsRef<str>>(values: &[S]) -> ForeignValue {
    ForeignValue::Sequence(
        values
            .iter()
            .map(|s| ForeignValue::Text(s.as_ref().to_string()))
            .collect(),
    )
}

fn expect_sequence(value: &ForeignValue) -> BridgeResult<&[ForeignValue]> {
    match value {
        ForeignValue::Sequence(items) => Ok(items),
        other => Err(BridgeError::TypeMismatch {
            expected: "sequence",
            found: other.type_name().to_string(),
        }),
    }
}

pub fn foreign_to_numeric(value: &ForeignValue) -> BridgeResult<Vec<f64>> {
    let items = expect_sequence(value)?;
    items
        .iter()
        .enumerate()
        .map(|(index, item)| {
            item.as_f64().ok_or_else(|| BridgeError::ElementTypeMismatch {
                index,
                expected: "float",
                found: item.type_name().to_string(),
            })
        })
        .collect()
}

pub fn foreign_to_text(value: &ForeignValue, model: TextModel) -> BridgeResult<Vec<String>> {
    let items = expect_sequence(value)?;
    items
        .iter()
        .enumerate()
        .map(|(index, item)| match (item, model) {
            (ForeignValue::Text(s), _) => Ok(s.clone()),
            (ForeignValue::Bytes(bytes), TextModel::Legacy) => String::from_utf8(bytes.clone())
                .map_err(|_| BridgeError::ElementTypeMismatch {
                    index,
                    expected: "utf-8 text",
                    found: "bytes (invalid utf-8)".to_string(),
                }),
            (other, _) => Err(BridgeError::ElementTypeMismatch {
                index,
                expected: "str",
                found: other.type_name().to_string(),
            }),
        })
        .collect()
}
