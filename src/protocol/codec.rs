//! Literal-only wire codec.
//!
//! A message travels as `('KindName', {'field': value, ...})`. Parsing accepts
//! nothing but literals: strings, numbers, `True`/`False`/`None`, tuples,
//! lists and dicts with string keys.

use super::error::CodecError;
use super::message::{Message, MessageKind};
use super::record::Record;
use super::value::{write_str_literal, Value};
use indexmap::IndexMap;
use tracing::warn;

const MAX_DEPTH: usize = 64;

pub fn serialize_message(message: &Message) -> Result<String, CodecError> {
    let mut out = String::new();
    out.push('(');
    write_str_literal(&mut out, message.kind.name()).map_err(|_| CodecError::NotAMessage)?;
    out.push_str(", {");
    for (i, (name, value)) in message.record().iter().enumerate() {
        value.ensure_finite()?;
        if i > 0 {
            out.push_str(", ");
        }
        write_str_literal(&mut out, name).map_err(|_| CodecError::NotAMessage)?;
        out.push_str(": ");
        out.push_str(&value.to_string());
    }
    out.push_str("})");
    Ok(out)
}

/// Parses exactly one serialized message. Any defect rejects the whole payload.
pub fn parse_message(payload: &str) -> Result<Message, CodecError> {
    let result = parse_value(payload).and_then(into_message);
    if let Err(err) = &result {
        warn!(error = %err, len = payload.len(), "rejected message payload");
    }
    result
}

/// Parses exactly one literal value.
pub fn parse_value(text: &str) -> Result<Value, CodecError> {
    let mut reader = Reader::new(text);
    let value = reader.value()?;
    reader.skip_whitespace();
    if reader.pos < text.len() {
        return Err(CodecError::TrailingInput { at: reader.pos });
    }
    Ok(value)
}

fn into_message(value: Value) -> Result<Message, CodecError> {
    let Value::Tuple(items) = value else {
        return Err(CodecError::NotAMessage);
    };
    let Ok([Value::Str(kind), Value::Dict(fields)]) = <[Value; 2]>::try_from(items) else {
        return Err(CodecError::NotAMessage);
    };
    let kind = MessageKind::from_name(&kind).ok_or(CodecError::UnknownKind(kind))?;
    let message = Message::from_parts(kind, Record::from(fields));
    message.validate()?;
    Ok(message)
}

struct Reader<'a> {
    text: &'a str,
    pos: usize,
    depth: usize,
}

impl<'a> Reader<'a> {
    fn new(text: &'a str) -> Self {
        Self {
            text,
            pos: 0,
            depth: 0,
        }
    }

    fn peek(&self) -> Option<char> {
        self.text[self.pos..].chars().next()
    }

    fn bump(&mut self) -> Option<char> {
        let c = self.peek()?;
        self.pos += c.len_utf8();
        Some(c)
    }

    fn skip_whitespace(&mut self) {
        while matches!(self.peek(), Some(' ' | '\t' | '\n' | '\r')) {
            self.pos += 1;
        }
    }

    fn unexpected(&self, expected: &'static str) -> CodecError {
        match self.peek() {
            Some(found) => CodecError::UnexpectedChar {
                found,
                at: self.pos,
                expected,
            },
            None => CodecError::UnexpectedEnd { expected },
        }
    }

    fn expect(&mut self, c: char, expected: &'static str) -> Result<(), CodecError> {
        if self.peek() == Some(c) {
            self.pos += 1;
            Ok(())
        } else {
            Err(self.unexpected(expected))
        }
    }

    fn value(&mut self) -> Result<Value, CodecError> {
        self.skip_whitespace();
        match self.peek() {
            Some('\'' | '"') => self.string().map(Value::Str),
            Some('(') => self.nested(|r| r.tuple()),
            Some('[') => self.nested(|r| r.sequence(']').map(Value::List)),
            Some('{') => self.nested(|r| r.dict()),
            Some(c) if c.is_ascii_digit() || matches!(c, '-' | '+' | '.') => self.number(),
            Some(c) if c.is_ascii_alphabetic() => self.name(),
            _ => Err(self.unexpected("a literal")),
        }
    }

    fn nested(
        &mut self,
        parse: impl FnOnce(&mut Self) -> Result<Value, CodecError>,
    ) -> Result<Value, CodecError> {
        if self.depth == MAX_DEPTH {
            return Err(CodecError::TooDeep { limit: MAX_DEPTH });
        }
        self.depth += 1;
        let value = parse(self);
        self.depth -= 1;
        value
    }

    fn name(&mut self) -> Result<Value, CodecError> {
        let start = self.pos;
        while self.peek().is_some_and(|c| c.is_ascii_alphanumeric() || c == '_') {
            self.pos += 1;
        }
        match &self.text[start..self.pos] {
            "None" => Ok(Value::None),
            "True" => Ok(Value::Bool(true)),
            "False" => Ok(Value::Bool(false)),
            other => Err(CodecError::UnknownName {
                name: other.to_string(),
                at: start,
            }),
        }
    }

    fn number(&mut self) -> Result<Value, CodecError> {
        let start = self.pos;
        if matches!(self.peek(), Some('-' | '+')) {
            self.pos += 1;
        }
        let mut is_float = false;
        while let Some(c) = self.peek() {
            match c {
                '0'..='9' | '_' => {}
                '.' => is_float = true,
                'e' | 'E' => {
                    is_float = true;
                    self.pos += 1;
                    if matches!(self.peek(), Some('-' | '+')) {
                        self.pos += 1;
                    }
                    continue;
                }
                _ => break,
            }
            self.pos += 1;
        }
        let text = &self.text[start..self.pos];
        let invalid = || CodecError::InvalidNumber {
            text: text.to_string(),
            at: start,
        };
        if text.contains('_') {
            return Err(invalid());
        }
        if is_float {
            text.parse::<f64>()
                .ok()
                .filter(|x| x.is_finite())
                .map(Value::Float)
                .ok_or_else(invalid)
        } else {
            text.parse::<i64>().map(Value::Int).map_err(|_| invalid())
        }
    }

    fn string(&mut self) -> Result<String, CodecError> {
        let mut out = String::new();
        // adjacent literals concatenate
        loop {
            self.string_part(&mut out)?;
            let save = self.pos;
            self.skip_whitespace();
            if !matches!(self.peek(), Some('\'' | '"')) {
                self.pos = save;
                return Ok(out);
            }
        }
    }

    fn string_part(&mut self, out: &mut String) -> Result<(), CodecError> {
        let Some(quote) = self.bump() else {
            return Err(self.unexpected("a string"));
        };
        loop {
            let at = self.pos;
            match self.bump() {
                None | Some('\n' | '\r') => return Err(CodecError::UnexpectedEnd { expected: "closing quote" }),
                Some(c) if c == quote => return Ok(()),
                Some('\\') => out.push(self.escape(at)?),
                Some(c) => out.push(c),
            }
        }
    }

    fn escape(&mut self, at: usize) -> Result<char, CodecError> {
        let invalid = CodecError::InvalidEscape { at };
        let c = self.bump().ok_or(CodecError::InvalidEscape { at })?;
        Ok(match c {
            '\\' => '\\',
            '\'' => '\'',
            '"' => '"',
            'n' => '\n',
            'r' => '\r',
            't' => '\t',
            '0' => '\0',
            'a' => '\u{7}',
            'b' => '\u{8}',
            'f' => '\u{c}',
            'v' => '\u{b}',
            'x' => self.hex_escape(2).ok_or(invalid)?,
            'u' => self.hex_escape(4).ok_or(invalid)?,
            'U' => self.hex_escape(8).ok_or(invalid)?,
            _ => return Err(invalid),
        })
    }

    fn hex_escape(&mut self, digits: usize) -> Option<char> {
        let end = self.pos.checked_add(digits)?;
        let hex = self.text.get(self.pos..end)?;
        if !hex.bytes().all(|b| b.is_ascii_hexdigit()) {
            return None;
        }
        let c = char::from_u32(u32::from_str_radix(hex, 16).ok()?)?;
        self.pos = end;
        Some(c)
    }

    /// Items up to `close`, with an optional trailing comma. Returns the
    /// items and whether any comma was seen.
    fn items(&mut self, close: char) -> Result<(Vec<Value>, bool), CodecError> {
        let mut items = Vec::new();
        let mut saw_comma = false;
        loop {
            self.skip_whitespace();
            if self.peek() == Some(close) {
                self.pos += 1;
                return Ok((items, saw_comma));
            }
            items.push(self.value()?);
            self.skip_whitespace();
            match self.peek() {
                Some(',') => {
                    self.pos += 1;
                    saw_comma = true;
                }
                Some(c) if c == close => {}
                _ => return Err(self.unexpected("',' or a closing bracket")),
            }
        }
    }

    fn sequence(&mut self, close: char) -> Result<Vec<Value>, CodecError> {
        self.pos += 1;
        self.items(close).map(|(items, _)| items)
    }

    fn tuple(&mut self) -> Result<Value, CodecError> {
        self.pos += 1;
        let (mut items, saw_comma) = self.items(')')?;
        // `(x)` is just a parenthesized `x`
        if items.len() == 1 && !saw_comma {
            return Ok(items.remove(0));
        }
        Ok(Value::Tuple(items))
    }

    fn dict(&mut self) -> Result<Value, CodecError> {
        self.pos += 1;
        let mut map = IndexMap::new();
        loop {
            self.skip_whitespace();
            if self.peek() == Some('}') {
                self.pos += 1;
                return Ok(Value::Dict(map));
            }
            let at = self.pos;
            let Value::Str(key) = self.value()? else {
                return Err(CodecError::NonStringKey { at });
            };
            self.skip_whitespace();
            self.expect(':', "':'")?;
            let value = self.value()?;
            map.insert(key, value);
            self.skip_whitespace();
            match self.peek() {
                Some(',') => self.pos += 1,
                Some('}') => {}
                _ => return Err(self.unexpected("',' or '}'")),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ranges::TextRange;
    use quickcheck::{Arbitrary, Gen, QuickCheck, TestResult};

    fn sample_messages() -> Vec<Message> {
        vec![
            Message::toplevel_command("python").with("cmd_line", "print('hi')\n"),
            Message::debugger_command("step").with("frame_id", 7),
            Message::inline_command("get_globals").with("module_name", "__main__"),
            Message::input_submission("42\n"),
            Message::new(MessageKind::ToplevelResponse, Record::new()).with("value_info", Value::None),
            Message::new(MessageKind::DebuggerResponse, Record::new())
                .with("focus", TextRange::new(1, 4, 1, 13))
                .with("stack", vec![Value::from(1), Value::Float(0.25)]),
            Message::new(MessageKind::InputRequest, Record::new()).with("method", "readline"),
            Message::new(MessageKind::InlineResponse, Record::new()).with("ok", true),
            Message::output_event("stderr", "Traceback…\r\n\t'\"\\"),
        ]
    }

    #[test]
    fn test_round_trip_every_kind() {
        for message in sample_messages() {
            let text = serialize_message(&message).unwrap();
            assert!(!text.contains('\n'), "{text}");
            assert_eq!(parse_message(&text).unwrap(), message, "{text}");
        }
    }

    #[test]
    fn test_wire_shape() {
        let text = serialize_message(&Message::toplevel_command("pass")).unwrap();
        assert_eq!(text, "('ToplevelCommand', {'command': 'pass'})");
        let text = serialize_message(&Message::new(MessageKind::InputRequest, Record::new())).unwrap();
        assert_eq!(text, "('InputRequest', {'vm_state': 'input'})");
    }

    #[test]
    fn test_accepts_foreign_spacing_and_quotes() {
        let message = parse_message(
            "( \"DebuggerCommand\" , {\"command\": \"step\", 'args': ( 1, ), 'r': -2.5e-1,} )",
        )
        .unwrap();
        assert_eq!(message.kind, MessageKind::DebuggerCommand);
        assert_eq!(message.get("args"), Some(&Value::Tuple(vec![Value::Int(1)])));
        assert_eq!(message.get("r"), Some(&Value::Float(-0.25)));
    }

    #[test]
    fn test_rejects_malformed_payloads() {
        let cases = [
            "",
            "('ToplevelCommand', {'command': 'pass'}) extra",
            "('ToplevelCommand', {'command': 'pass'}",
            "('NoSuchKind', {'command': 'pass'})",
            "('ToplevelCommand', {})",
            "('ToplevelCommand', {'command': __import__('os')})",
            "('ToplevelCommand', {1: 'pass'})",
            "('ToplevelCommand', {'command': 'unterminated})",
            "('ToplevelCommand', {'command': 'bad \\q escape'})",
            "('ToplevelResponse', {'vm_state': 'debug'})",
            "['ToplevelCommand', {'command': 'pass'}]",
            "('OutputEvent', {'stream_name': 'stdout', 'data': 1e999})",
            "('InputSubmission', {'data': 99999999999999999999})",
        ];
        for case in cases {
            assert!(parse_message(case).is_err(), "accepted {case:?}");
        }
    }

    #[test]
    fn test_non_finite_floats_are_not_serialized() {
        let message = Message::inline_command("x").with("v", f64::NAN);
        assert!(matches!(
            serialize_message(&message),
            Err(CodecError::NonFiniteFloat(_))
        ));
    }

    #[test]
    fn test_nesting_limit() {
        let deep = format!("{}{}", "[".repeat(MAX_DEPTH + 1), "]".repeat(MAX_DEPTH + 1));
        assert!(matches!(parse_value(&deep), Err(CodecError::TooDeep { .. })));
        let fine = format!("{}{}", "[".repeat(MAX_DEPTH), "]".repeat(MAX_DEPTH));
        assert!(parse_value(&fine).is_ok());
    }

    #[derive(Debug, Clone)]
    struct Literal(Value);

    fn gen_value(g: &mut Gen, depth: usize) -> Value {
        let max = if depth == 0 { 5 } else { 8 };
        match usize::arbitrary(g) % max {
            0 => Value::None,
            1 => Value::Bool(bool::arbitrary(g)),
            2 => Value::Int(i64::arbitrary(g)),
            3 => {
                let x = f64::arbitrary(g);
                Value::Float(if x.is_finite() { x } else { 0.5 })
            }
            4 => Value::Str(String::arbitrary(g)),
            5 => Value::Tuple((0..usize::arbitrary(g) % 3).map(|_| gen_value(g, depth - 1)).collect()),
            6 => Value::List((0..usize::arbitrary(g) % 3).map(|_| gen_value(g, depth - 1)).collect()),
            _ => Value::Dict(
                (0..usize::arbitrary(g) % 3)
                    .map(|_| (String::arbitrary(g), gen_value(g, depth - 1)))
                    .collect(),
            ),
        }
    }

    impl Arbitrary for Literal {
        fn arbitrary(g: &mut Gen) -> Self {
            Literal(gen_value(g, 3))
        }
    }

    #[test]
    fn prop_value_literals_parse_back() {
        fn prop(literal: Literal) -> TestResult {
            let text = literal.0.to_string();
            match parse_value(&text) {
                Ok(parsed) => TestResult::from_bool(parsed == literal.0),
                Err(err) => TestResult::error(format!("{text}: {err}")),
            }
        }
        QuickCheck::new().tests(200).quickcheck(prop as fn(Literal) -> TestResult);
    }

    #[test]
    fn prop_messages_round_trip() {
        fn prop(command: String, extra: Literal) -> TestResult {
            let message = Message::debugger_command(&command).with("extra", extra.0);
            let text = match serialize_message(&message) {
                Ok(text) => text,
                Err(err) => return TestResult::error(err.to_string()),
            };
            TestResult::from_bool(parse_message(&text).as_ref() == Ok(&message))
        }
        QuickCheck::new().quickcheck(prop as fn(String, Literal) -> TestResult);
    }
}
