use super::error::CodecError;
use crate::ranges::TextRange;
use indexmap::IndexMap;
use serde::Serialize;
use std::fmt::{self, Write as _};
use std::hash::{Hash, Hasher};

/// A literal value carried in a message field.
///
/// Equality is type-and-value: `Int(1)`, `Float(1.0)`, `Bool(true)` and
/// `Str("1")` are all different.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Value {
    None,
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(String),
    Tuple(Vec<Value>),
    List(Vec<Value>),
    Dict(IndexMap<String, Value>),
}

impl Value {
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::None => "None",
            Value::Bool(_) => "bool",
            Value::Int(_) => "int",
            Value::Float(_) => "float",
            Value::Str(_) => "str",
            Value::Tuple(_) => "tuple",
            Value::List(_) => "list",
            Value::Dict(_) => "dict",
        }
    }

    pub fn is_none(&self) -> bool {
        matches!(self, Value::None)
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Str(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_int(&self) -> Option<i64> {
        match self {
            Value::Int(i) => Some(*i),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_float(&self) -> Option<f64> {
        match self {
            Value::Float(x) => Some(*x),
            _ => None,
        }
    }

    /// Items of a tuple or a list.
    pub fn as_seq(&self) -> Option<&[Value]> {
        match self {
            Value::Tuple(items) | Value::List(items) => Some(items),
            _ => None,
        }
    }

    pub fn as_dict(&self) -> Option<&IndexMap<String, Value>> {
        match self {
            Value::Dict(map) => Some(map),
            _ => None,
        }
    }

    /// Builds a list of strings, the shape of command arguments.
    pub fn str_list<I, S>(items: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Value::List(items.into_iter().map(|s| Value::Str(s.into())).collect())
    }

    /// Fails on the first NaN or infinite float, which have no literal form.
    pub fn ensure_finite(&self) -> Result<(), CodecError> {
        match self {
            Value::Float(x) if !x.is_finite() => Err(CodecError::NonFiniteFloat(*x)),
            Value::Tuple(items) | Value::List(items) => {
                items.iter().try_for_each(Value::ensure_finite)
            }
            Value::Dict(map) => map.values().try_for_each(Value::ensure_finite),
            _ => Ok(()),
        }
    }
}

/// Agrees with `PartialEq`: dict entries hash independently of their order
/// and `-0.0` hashes like `0.0`.
impl Hash for Value {
    fn hash<H: Hasher>(&self, state: &mut H) {
        std::mem::discriminant(self).hash(state);
        match self {
            Value::None => {}
            Value::Bool(b) => b.hash(state),
            Value::Int(i) => i.hash(state),
            Value::Float(x) => {
                let x = if *x == 0.0 { 0.0_f64 } else { *x };
                x.to_bits().hash(state)
            }
            Value::Str(s) => s.hash(state),
            Value::Tuple(items) | Value::List(items) => items.hash(state),
            Value::Dict(map) => hash_entries(map, state),
        }
    }
}

/// Hashes `entries` sorted by key.
pub(crate) fn hash_entries<H: Hasher>(entries: &IndexMap<String, Value>, state: &mut H) {
    let mut sorted: Vec<_> = entries.iter().collect();
    sorted.sort_unstable_by(|a, b| a.0.cmp(b.0));
    sorted.len().hash(state);
    for (key, value) in sorted {
        key.hash(state);
        value.hash(state);
    }
}

/// Writes `s` as a single-quoted literal. The output never contains a raw
/// line break.
pub(crate) fn write_str_literal(out: &mut impl fmt::Write, s: &str) -> fmt::Result {
    out.write_char('\'')?;
    for c in s.chars() {
        match c {
            '\\' => out.write_str("\\\\")?,
            '\'' => out.write_str("\\'")?,
            '\n' => out.write_str("\\n")?,
            '\r' => out.write_str("\\r")?,
            '\t' => out.write_str("\\t")?,
            c if (c as u32) < 0x20 || c as u32 == 0x7f => write!(out, "\\x{:02x}", c as u32)?,
            '\u{2028}' | '\u{2029}' => write!(out, "\\u{:04x}", c as u32)?,
            c => out.write_char(c)?,
        }
    }
    out.write_char('\'')
}

fn write_items(f: &mut fmt::Formatter<'_>, items: &[Value]) -> fmt::Result {
    for (i, item) in items.iter().enumerate() {
        if i > 0 {
            f.write_str(", ")?;
        }
        write!(f, "{item}")?;
    }
    Ok(())
}

/// The literal form used on the wire.
impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::None => f.write_str("None"),
            Value::Bool(true) => f.write_str("True"),
            Value::Bool(false) => f.write_str("False"),
            Value::Int(i) => write!(f, "{i}"),
            Value::Float(x) => write!(f, "{x:?}"),
            Value::Str(s) => write_str_literal(f, s),
            Value::Tuple(items) => {
                f.write_char('(')?;
                write_items(f, items)?;
                if items.len() == 1 {
                    f.write_char(',')?;
                }
                f.write_char(')')
            }
            Value::List(items) => {
                f.write_char('[')?;
                write_items(f, items)?;
                f.write_char(']')
            }
            Value::Dict(map) => {
                f.write_char('{')?;
                for (i, (key, value)) in map.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write_str_literal(f, key)?;
                    write!(f, ": {value}")?;
                }
                f.write_char('}')
            }
        }
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<i64> for Value {
    fn from(i: i64) -> Self {
        Value::Int(i)
    }
}

impl From<i32> for Value {
    fn from(i: i32) -> Self {
        Value::Int(i.into())
    }
}

impl From<u32> for Value {
    fn from(i: u32) -> Self {
        Value::Int(i.into())
    }
}

impl From<f64> for Value {
    fn from(x: f64) -> Self {
        Value::Float(x)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::Str(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::Str(s)
    }
}

impl From<Vec<Value>> for Value {
    fn from(items: Vec<Value>) -> Self {
        Value::List(items)
    }
}

impl From<IndexMap<String, Value>> for Value {
    fn from(map: IndexMap<String, Value>) -> Self {
        Value::Dict(map)
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(value: Option<T>) -> Self {
        value.map_or(Value::None, Into::into)
    }
}

/// Ranges travel as `(start_line, start_col, end_line, end_col)`.
impl From<TextRange> for Value {
    fn from(range: TextRange) -> Self {
        Value::Tuple(
            [range.start_line, range.start_col, range.end_line, range.end_col]
                .into_iter()
                .map(|n| Value::Int(n as i64))
                .collect(),
        )
    }
}

impl TryFrom<&Value> for TextRange {
    type Error = CodecError;

    fn try_from(value: &Value) -> Result<Self, Self::Error> {
        const EXPECTED: &str = "a tuple of four non-negative ints";
        let items = value
            .as_seq()
            .filter(|items| items.len() == 4)
            .ok_or_else(|| CodecError::type_mismatch(EXPECTED, value.type_name()))?;
        let mut parts = [0usize; 4];
        for (slot, item) in parts.iter_mut().zip(items) {
            *slot = item
                .as_int()
                .and_then(|i| usize::try_from(i).ok())
                .ok_or_else(|| CodecError::type_mismatch(EXPECTED, item.type_name()))?;
        }
        let [start_line, start_col, end_line, end_col] = parts;
        Ok(TextRange::new(start_line, start_col, end_line, end_col))
    }
}
