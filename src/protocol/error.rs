use thiserror::Error;

/// A payload that cannot be serialized or parsed.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum CodecError {
    #[error("unexpected end of payload, expected {expected}")]
    UnexpectedEnd { expected: &'static str },

    #[error("unexpected {found:?} at offset {at}, expected {expected}")]
    UnexpectedChar {
        found: char,
        at: usize,
        expected: &'static str,
    },

    #[error("trailing input at offset {at}")]
    TrailingInput { at: usize },

    #[error("invalid escape sequence at offset {at}")]
    InvalidEscape { at: usize },

    #[error("invalid number literal '{text}' at offset {at}")]
    InvalidNumber { text: String, at: usize },

    #[error("unknown name '{name}' at offset {at}")]
    UnknownName { name: String, at: usize },

    #[error("dict keys must be strings (offset {at})")]
    NonStringKey { at: usize },

    #[error("literal nesting deeper than {limit}")]
    TooDeep { limit: usize },

    #[error("float value {0} has no literal form")]
    NonFiniteFloat(f64),

    #[error("payload is not a (kind, fields) pair")]
    NotAMessage,

    #[error("unknown message kind '{0}'")]
    UnknownKind(String),

    #[error("{kind} is missing required field '{field}'")]
    MissingField {
        kind: &'static str,
        field: &'static str,
    },

    #[error("field '{field}' of {kind} must be {expected}")]
    WrongFieldType {
        kind: &'static str,
        field: &'static str,
        expected: &'static str,
    },

    #[error("expected {expected}, found {found}")]
    TypeMismatch {
        expected: &'static str,
        found: &'static str,
    },
}

impl CodecError {
    pub fn type_mismatch(expected: &'static str, found: &'static str) -> Self {
        CodecError::TypeMismatch { expected, found }
    }
}

/// A rejected interactive command line.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ShellCommandError {
    /// Malformed command line; reported back to whoever typed it.
    #[error("command syntax error: {0}")]
    Syntax(String),

    /// A `%` command outside the known set. Callers are expected to have
    /// filtered these out already.
    #[error("unknown magic command: {0}")]
    UnknownCommand(String),
}
