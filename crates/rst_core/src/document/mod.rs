//! Generic tree model of the game document and its text parser.
//!
//! Strings are stored as 8-bit bytes: 2-byte UTF-8 sequences that encode
//! code points up to U+00FF are folded into a single byte while parsing, so
//! the bytes can be written to legacy fixed-width fields as they are. Longer
//! UTF-8 sequences are kept byte for byte.

mod parser;

use std::collections::BTreeMap;
use std::fmt;

pub use parser::{SyntaxError, parse};

#[derive(Debug, Clone, Copy)]
pub enum Number {
    Int(i64),
    Decimal(f64),
}

impl Number {
    pub fn as_i64(&self) -> i64 {
        match *self {
            Self::Int(v) => v,
            Self::Decimal(v) => v as i64,
        }
    }

    pub fn as_f64(&self) -> f64 {
        match *self {
            Self::Int(v) => v as f64,
            Self::Decimal(v) => v,
        }
    }
}

impl PartialEq for Number {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Int(a), Self::Int(b)) => a == b,
            (Self::Decimal(a), Self::Decimal(b)) => a == b,
            _ => false,
        }
    }
}

pub type Mapping = BTreeMap<String, Value>;

#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Null,
    Bool(bool),
    Number(Number),
    String(Vec<u8>),
    List(Vec<Value>),
    Mapping(Mapping),
}

impl Value {
    /// Look up a field of a mapping. Absent keys and non-mapping values both
    /// yield `None`; a present `null` yields `Some(&Value::Null)`.
    pub fn get(&self, key: &str) -> Option<&Value> {
        match self {
            Self::Mapping(map) => map.get(key),
            _ => None,
        }
    }

    /// Follow a dotted path of mapping keys, e.g. `rst.player.id`.
    pub fn pointer(&self, path: &str) -> Option<&Value> {
        path.split('.')
            .filter(|segment| !segment.is_empty())
            .try_fold(self, |node, segment| node.get(segment))
    }

    pub fn as_mapping(&self) -> Option<&Mapping> {
        match self {
            Self::Mapping(map) => Some(map),
            _ => None,
        }
    }

    pub fn as_list(&self) -> Option<&[Value]> {
        match self {
            Self::List(items) => Some(items),
            _ => None,
        }
    }

    pub fn as_bytes(&self) -> Option<&[u8]> {
        match self {
            Self::String(bytes) => Some(bytes),
            _ => None,
        }
    }

    /// Integer view of a scalar. Booleans count as 0/1, decimals truncate,
    /// and numeric strings are accepted since the service is not consistent
    /// about quoting numbers.
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Self::Number(n) => Some(n.as_i64()),
            Self::Bool(b) => Some(i64::from(*b)),
            Self::String(bytes) => std::str::from_utf8(bytes).ok()?.trim().parse().ok(),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Bool(b) => Some(*b),
            Self::Number(n) => Some(n.as_f64() != 0.0),
            _ => None,
        }
    }

    /// Field of a mapping as integer; `None` when absent, null or non-numeric.
    pub fn int(&self, key: &str) -> Option<i64> {
        self.get(key).and_then(Value::as_i64)
    }

    /// Field of a mapping as a list, empty when absent.
    pub fn list(&self, key: &str) -> &[Value] {
        self.get(key).and_then(Value::as_list).unwrap_or(&[])
    }

    pub fn bytes(&self, key: &str) -> Option<&[u8]> {
        self.get(key).and_then(Value::as_bytes)
    }
}

pub fn latin1_to_string(bytes: &[u8]) -> String {
    bytes.iter().map(|&b| char::from(b)).collect()
}

/// Canonical text form. Reparsing the output yields an equal tree as long
/// as decimals survive a shortest-representation round trip.
impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Null => f.write_str("null"),
            Self::Bool(b) => write!(f, "{b}"),
            Self::Number(Number::Int(v)) => write!(f, "{v}"),
            Self::Number(Number::Decimal(v)) => {
                if v.fract() == 0.0 {
                    write!(f, "{v}.0")
                } else {
                    write!(f, "{v}")
                }
            }
            Self::String(bytes) => write_string(f, bytes),
            Self::List(items) => {
                f.write_str("[")?;
                for (idx, item) in items.iter().enumerate() {
                    if idx > 0 {
                        f.write_str(",")?;
                    }
                    write!(f, "{item}")?;
                }
                f.write_str("]")
            }
            Self::Mapping(map) => {
                f.write_str("{")?;
                for (idx, (key, value)) in map.iter().enumerate() {
                    if idx > 0 {
                        f.write_str(",")?;
                    }
                    let key: Vec<u8> = key
                        .chars()
                        .map(|c| u8::try_from(c).unwrap_or(b'?'))
                        .collect();
                    write_string(f, &key)?;
                    write!(f, ":{value}")?;
                }
                f.write_str("}")
            }
        }
    }
}

fn write_string(f: &mut fmt::Formatter<'_>, bytes: &[u8]) -> fmt::Result {
    f.write_str("\"")?;
    for &b in bytes {
        match b {
            b'"' => f.write_str("\\\"")?,
            b'\\' => f.write_str("\\\\")?,
            b'\n' => f.write_str("\\n")?,
            b'\r' => f.write_str("\\r")?,
            b'\t' => f.write_str("\\t")?,
            0x08 => f.write_str("\\b")?,
            0x0C => f.write_str("\\f")?,
            // Re-widen 8-bit bytes so the parser folds them back.
            _ => write!(f, "{}", char::from(b))?,
        }
    }
    f.write_str("\"")
}
