use crate::protocol::{CodecError, Value};
use crate::ranges::TextRange;
use indexmap::IndexMap;
use serde::Serialize;

/// A stack frame as reported to the front end.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FrameInfo {
    pub id: i64,
    pub filename: String,
    pub code_name: String,
    pub focus: TextRange,
}

impl FrameInfo {
    /// One-line summary, e.g. `[3] main in demo.py, focus=TR(1.0, 1.5)`.
    pub fn description(&self) -> String {
        format!(
            "[{}] {} in {}, focus={}",
            self.id, self.code_name, self.filename, self.focus
        )
    }
}

impl From<&FrameInfo> for Value {
    fn from(frame: &FrameInfo) -> Self {
        let mut fields = IndexMap::new();
        fields.insert("id".to_string(), Value::Int(frame.id));
        fields.insert("filename".to_string(), Value::from(frame.filename.as_str()));
        fields.insert("code_name".to_string(), Value::from(frame.code_name.as_str()));
        fields.insert("focus".to_string(), Value::from(frame.focus));
        Value::Dict(fields)
    }
}

impl TryFrom<&Value> for FrameInfo {
    type Error = CodecError;

    fn try_from(value: &Value) -> Result<Self, Self::Error> {
        let fields = Fields::of(value, "FrameInfo", "a frame dict")?;
        Ok(FrameInfo {
            id: fields.int("id")?,
            filename: fields.text("filename")?,
            code_name: fields.text("code_name")?,
            focus: TextRange::try_from(fields.get("focus")?)?,
        })
    }
}

/// Named lookups into a dict value, reporting errors against `kind`.
struct Fields<'a> {
    kind: &'static str,
    map: &'a IndexMap<String, Value>,
}

impl<'a> Fields<'a> {
    fn of(value: &'a Value, kind: &'static str, expected: &'static str) -> Result<Self, CodecError> {
        let map = value
            .as_dict()
            .ok_or_else(|| CodecError::type_mismatch(expected, value.type_name()))?;
        Ok(Self { kind, map })
    }

    fn get(&self, name: &'static str) -> Result<&'a Value, CodecError> {
        self.map.get(name).ok_or(CodecError::MissingField {
            kind: self.kind,
            field: name,
        })
    }

    fn text(&self, name: &'static str) -> Result<String, CodecError> {
        let value = self.get(name)?;
        value
            .as_str()
            .map(str::to_string)
            .ok_or_else(|| CodecError::type_mismatch("str", value.type_name()))
    }

    fn int(&self, name: &'static str) -> Result<i64, CodecError> {
        let value = self.get(name)?;
        value
            .as_int()
            .ok_or_else(|| CodecError::type_mismatch("int", value.type_name()))
    }
}

/// A value as the variables view shows it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ValueInfo {
    pub id: i64,
    pub repr: String,
    pub type_name: String,
}

impl From<&ValueInfo> for Value {
    fn from(info: &ValueInfo) -> Self {
        let mut fields = IndexMap::new();
        fields.insert("id".to_string(), Value::Int(info.id));
        fields.insert("repr".to_string(), Value::from(info.repr.as_str()));
        fields.insert("type_name".to_string(), Value::from(info.type_name.as_str()));
        Value::Dict(fields)
    }
}

impl TryFrom<&Value> for ValueInfo {
    type Error = CodecError;

    fn try_from(value: &Value) -> Result<Self, Self::Error> {
        let fields = Fields::of(value, "ValueInfo", "a value dict")?;
        Ok(ValueInfo {
            id: fields.int("id")?,
            repr: fields.text("repr")?,
            type_name: fields.text("type_name")?,
        })
    }
}
