use super::ast::Position;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ParseError {
    #[error("unexpected character(s) '{text}' at {at}")]
    UnexpectedCharacter { text: String, at: Position },

    #[error("expected {expected}, found {found} at {at}")]
    UnexpectedToken {
        expected: String,
        found: String,
        at: Position,
    },

    #[error("unindent does not match any outer indentation level at line {line}")]
    InconsistentDedent { line: usize },

    #[error("unexpected indent at line {line}")]
    UnexpectedIndent { line: usize },

    #[error("cannot {action} {target} at {at}")]
    InvalidTarget {
        action: &'static str,
        target: &'static str,
        at: Position,
    },

    #[error("nesting deeper than {limit} levels at {at}")]
    TooDeep { limit: usize, at: Position },
}

impl ParseError {
    pub fn unexpected(expected: impl Into<String>, found: impl Into<String>, at: Position) -> Self {
        ParseError::UnexpectedToken {
            expected: expected.into(),
            found: found.into(),
            at,
        }
    }
}
