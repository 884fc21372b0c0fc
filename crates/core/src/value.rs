//! Foreign value model
//!
//! `ForeignValue` is the host-side mirror of an object living inside the
//! embedded interpreter. Every crossing of the boundary goes through this
//! type, so shape checks happen in one place instead of relying on the
//! interpreter's implicit coercions.

use std::fmt;

/// Tagged mirror of an interpreter object
///
/// Mappings keep insertion order and arbitrary keys, matching the
/// interpreter's `dict`. `Opaque` carries only the interpreter type name of
/// an object that has no structural mirror (modules, functions, arrays).
#[derive(Debug, Clone, PartialEq)]
pub enum ForeignValue {
    None,
    Bool(bool),
    Int(i64),
    Float(f64),
    Text(String),
    Bytes(Vec<u8>),
    Sequence(Vec<ForeignValue>),
    Mapping(Vec<(ForeignValue, ForeignValue)>),
    Opaque(String),
}

impl ForeignValue {
    /// Interpreter-facing type name, used in mismatch diagnostics
    pub fn type_name(&self) -> &str {
        match self {
            ForeignValue::None => "NoneType",
            ForeignValue::Bool(_) => "bool",
            ForeignValue::Int(_) => "int",
            ForeignValue::Float(_) => "float",
            ForeignValue::Text(_) => "str",
            ForeignValue::Bytes(_) => "bytes",
            ForeignValue::Sequence(_) => "list",
            ForeignValue::Mapping(_) => "dict",
            ForeignValue::Opaque(name) => name,
        }
    }

    pub fn is_sequence(&self) -> bool {
        matches!(self, ForeignValue::Sequence(_))
    }

    pub fn is_mapping(&self) -> bool {
        matches!(self, ForeignValue::Mapping(_))
    }

    /// Numeric coercion for a single element
    ///
    /// Accepts the interpreter's numeric tower (`bool` ⊂ `int` ⊂ `float`).
    /// Text is never parsed.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            ForeignValue::Float(v) => Some(*v),
            ForeignValue::Int(v) => Some(*v as f64),
            ForeignValue::Bool(v) => Some(if *v { 1.0 } else { 0.0 }),
            _ => None,
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            ForeignValue::Text(s) => Some(s),
            _ => None,
        }
    }

    /// Look up a text key in a mapping
    pub fn get(&self, key: &str) -> Option<&ForeignValue> {
        match self {
            ForeignValue::Mapping(entries) => entries
                .iter()
                .find(|(k, _)| k.as_text() == Some(key))
                .map(|(_, v)| v),
            _ => None,
        }
    }

    /// Number of elements for sequences and mappings
    pub fn len(&self) -> Option<usize> {
        match self {
            ForeignValue::Sequence(items) => Some(items.len()),
            ForeignValue::Mapping(entries) => Some(entries.len()),
            _ => None,
        }
    }
}

impl fmt::Display for ForeignValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ForeignValue::None => write!(f, "None"),
            ForeignValue::Bool(true) => write!(f, "True"),
            ForeignValue::Bool(false) => write!(f, "False"),
            ForeignValue::Int(v) => write!(f, "{}", v),
            ForeignValue::Float(v) => write!(f, "{:?}", v),
            ForeignValue::Text(s) => write!(f, "{:?}", s),
            ForeignValue::Bytes(b) => write!(f, "b{:?}", String::from_utf8_lossy(b)),
            ForeignValue::Sequence(items) => {
                write!(f, "[")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}", item)?;
                }
                write!(f, "]")
            }
            ForeignValue::Mapping(entries) => {
                write!(f, "{{")?;
                for (i, (k, v)) in entries.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}: {}", k, v)?;
                }
                write!(f, "}}")
            }
            ForeignValue::Opaque(name) => write!(f, "<{}>", name),
        }
    }
}

impl From<f64> for ForeignValue {
    fn from(v: f64) -> Self {
        ForeignValue::Float(v)
    }
}

impl From<i64> for ForeignValue {
    fn from(v: i64) -> Self {
        ForeignValue::Int(v)
    }
}

impl From<bool> for ForeignValue {
    fn from(v: bool) -> Self {
        ForeignValue::Bool(v)
    }
}

impl From<&str> for ForeignValue {
    fn from(v: &str) -> Self {
        ForeignValue::Text(v.to_string())
    }
}

impl From<String> for ForeignValue {
    fn from(v: String) -> Self {
        ForeignValue::Text(v)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_numeric_tower_coercion() {
        assert_eq!(ForeignValue::Float(2.5).as_f64(), Some(2.5));
        assert_eq!(ForeignValue::Int(-3).as_f64(), Some(-3.0));
        assert_eq!(ForeignValue::Bool(true).as_f64(), Some(1.0));
        assert_eq!(ForeignValue::Text("1.0".into()).as_f64(), None);
        assert_eq!(ForeignValue::None.as_f64(), None);
    }

    #[test]
    fn test_mapping_lookup_by_text_key() {
        let map = ForeignValue::Mapping(vec![
            (ForeignValue::Int(1), ForeignValue::from("int key")),
            (ForeignValue::from("a"), ForeignValue::Float(1.0)),
        ]);
        assert_eq!(map.get("a"), Some(&ForeignValue::Float(1.0)));
        assert_eq!(map.get("1"), None);
        assert_eq!(map.len(), Some(2));
        assert_eq!(ForeignValue::Float(1.0).get("a"), None);
    }

    #[test]
    fn test_display_matches_interpreter_repr() {
        let v = ForeignValue::Sequence(vec![
            ForeignValue::Float(1.0),
            ForeignValue::from("x"),
            ForeignValue::Bool(false),
            ForeignValue::None,
        ]);
        assert_eq!(v.to_string(), "[1.0, \"x\", False, None]");

        let m = ForeignValue::Mapping(vec![(ForeignValue::from("k"), ForeignValue::Int(2))]);
        assert_eq!(m.to_string(), "{\"k\": 2}");
        assert_eq!(ForeignValue::Opaque("module".into()).to_string(), "<module>");
    }

    #[test]
    fn test_type_names() {
        assert_eq!(ForeignValue::Sequence(vec![]).type_name(), "list");
        assert_eq!(ForeignValue::Opaque("ndarray".into()).type_name(), "ndarray");
        assert!(ForeignValue::Mapping(vec![]).is_mapping());
        assert!(!ForeignValue::Text(String::new()).is_sequence());
    }
}
