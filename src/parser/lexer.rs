//! Tokenizer for the stepped language.
//!
//! Uses logos for the raw token stream. Indentation tokens are not produced
//! here; see [`super::layout`].

use super::ast::Position;
use super::error::ParseError;
use logos::Logos;

#[derive(Logos, Debug, Clone, Copy, PartialEq)]
#[logos(skip r"[ \t\f]+")]
#[logos(skip r"\\\r?\n")]
pub enum Token<'src> {
    #[regex(r"#[^\n]*", logos::skip, allow_greedy = true)]
    Comment,

    #[regex(r"\r?\n")]
    Newline,

    // Produced by the layout pass only.
    Indent,
    Dedent,
    EndMarker,

    // === Keywords ===
    #[token("and")]
    And,
    #[token("as")]
    As,
    #[token("assert")]
    Assert,
    #[token("break")]
    Break,
    #[token("continue")]
    Continue,
    #[token("def")]
    Def,
    #[token("del")]
    Del,
    #[token("elif")]
    Elif,
    #[token("else")]
    Else,
    #[token("False")]
    False,
    #[token("for")]
    For,
    #[token("from")]
    From,
    #[token("if")]
    If,
    #[token("in")]
    In,
    #[token("is")]
    Is,
    #[token("None")]
    NoneKw,
    #[token("not")]
    Not,
    #[token("or")]
    Or,
    #[token("pass")]
    Pass,
    #[token("raise")]
    Raise,
    #[token("return")]
    Return,
    #[token("True")]
    True,
    #[token("while")]
    While,
    #[token("with")]
    With,
    #[token("yield")]
    Yield,

    // === Literals ===
    #[regex(r"[A-Za-z_][A-Za-z0-9_]*", |lex| lex.slice())]
    Name(&'src str),

    #[regex(r"[0-9][0-9_]*", |lex| lex.slice())]
    #[regex(r"0[xX][0-9a-fA-F_]+", |lex| lex.slice())]
    Int(&'src str),

    #[regex(r"[0-9][0-9_]*\.[0-9_]*([eE][+-]?[0-9]+)?", |lex| lex.slice())]
    #[regex(r"\.[0-9][0-9_]*([eE][+-]?[0-9]+)?", |lex| lex.slice())]
    #[regex(r"[0-9][0-9_]*[eE][+-]?[0-9]+", |lex| lex.slice())]
    Float(&'src str),

    #[regex(r#"([rRbBuUfF]|[rR][bBfF]|[bBfF][rR])?'([^'\\\n]|\\.)*'"#, |lex| lex.slice())]
    #[regex(r#"([rRbBuUfF]|[rR][bBfF]|[bBfF][rR])?"([^"\\\n]|\\.)*""#, |lex| lex.slice())]
    #[token("'''", |lex| triple_quoted(lex, "'''"))]
    #[token("\"\"\"", |lex| triple_quoted(lex, "\"\"\""))]
    Str(&'src str),

    // === Delimiters ===
    #[token("(")]
    LParen,
    #[token(")")]
    RParen,
    #[token("[")]
    LBracket,
    #[token("]")]
    RBracket,
    #[token("{")]
    LBrace,
    #[token("}")]
    RBrace,
    #[token(",")]
    Comma,
    #[token(":")]
    Colon,
    #[token(";")]
    Semi,
    #[token(".")]
    Dot,
    #[token("->")]
    Arrow,

    // === Operators ===
    #[token("=")]
    Assign,
    #[token("+=", aug_operator)]
    #[token("-=", aug_operator)]
    #[token("*=", aug_operator)]
    #[token("/=", aug_operator)]
    #[token("//=", aug_operator)]
    #[token("%=", aug_operator)]
    #[token("**=", aug_operator)]
    #[token("@=", aug_operator)]
    #[token("&=", aug_operator)]
    #[token("|=", aug_operator)]
    #[token("^=", aug_operator)]
    #[token("<<=", aug_operator)]
    #[token(">>=", aug_operator)]
    AugAssign(&'src str),
    #[token("+")]
    Plus,
    #[token("-")]
    Minus,
    #[token("*")]
    Star,
    #[token("**")]
    DoubleStar,
    #[token("/")]
    Slash,
    #[token("//")]
    DoubleSlash,
    #[token("%")]
    Percent,
    #[token("@")]
    At,
    #[token("&")]
    Amper,
    #[token("|")]
    Pipe,
    #[token("^")]
    Caret,
    #[token("~")]
    Tilde,
    #[token("<<")]
    LShift,
    #[token(">>")]
    RShift,
    #[token("<")]
    Less,
    #[token(">")]
    Greater,
    #[token("<=")]
    LessEq,
    #[token(">=")]
    GreaterEq,
    #[token("==")]
    EqEq,
    #[token("!=")]
    NotEq,
}

fn aug_operator<'src>(lex: &mut logos::Lexer<'src, Token<'src>>) -> &'src str {
    lex.slice().trim_end_matches('=')
}

/// Consumes the body of a triple-quoted string up to and including the closing quotes.
fn triple_quoted<'src>(lex: &mut logos::Lexer<'src, Token<'src>>, quote: &str) -> Option<&'src str> {
    let close = lex.remainder().find(quote)?;
    lex.bump(close + quote.len());
    Some(lex.slice())
}

impl Token<'_> {
    /// Tokens inserted by the layout pass rather than read from the source.
    pub fn is_layout(&self) -> bool {
        matches!(
            self,
            Token::Newline | Token::Indent | Token::Dedent | Token::EndMarker
        )
    }
}

/// A token with the positions of its first character and the character after it.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Spanned<'src> {
    pub token: Token<'src>,
    pub start: Position,
    pub end: Position,
}

/// Converts byte offsets into line/character positions.
pub struct LineIndex<'src> {
    source: &'src str,
    line_starts: Vec<usize>,
}

impl<'src> LineIndex<'src> {
    pub fn new(source: &'src str) -> Self {
        let mut line_starts = vec![0];
        line_starts.extend(source.match_indices('\n').map(|(i, _)| i + 1));
        Self {
            source,
            line_starts,
        }
    }

    pub fn position(&self, offset: usize) -> Position {
        let line = match self.line_starts.binary_search(&offset) {
            Ok(exact) => exact,
            Err(next) => next - 1,
        };
        let line_start = self.line_starts[line];
        Position {
            line: line + 1,
            col: self.source[line_start..offset].chars().count(),
        }
    }
}

/// Tokenizes `source` into raw tokens, without layout tokens other than `Newline`.
pub fn lex(source: &str) -> Result<Vec<Spanned<'_>>, ParseError> {
    let index = LineIndex::new(source);
    let mut lexer = Token::lexer(source);
    let mut tokens = Vec::new();

    while let Some(result) = lexer.next() {
        let span = lexer.span();
        match result {
            Ok(token) => tokens.push(Spanned {
                token,
                start: index.position(span.start),
                end: index.position(span.end),
            }),
            Err(()) => {
                return Err(ParseError::UnexpectedCharacter {
                    text: lexer.slice().to_string(),
                    at: index.position(span.start),
                });
            }
        }
    }

    Ok(tokens)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(source: &str) -> Vec<Token<'_>> {
        lex(source).unwrap().into_iter().map(|t| t.token).collect()
    }

    #[test]
    fn test_keywords_and_names() {
        assert_eq!(
            kinds("if x is not None"),
            vec![Token::If, Token::Name("x"), Token::Is, Token::Not, Token::NoneKw]
        );
        assert_eq!(kinds("iffy"), vec![Token::Name("iffy")]);
    }

    #[test]
    fn test_numbers() {
        assert_eq!(
            kinds("42 3.14 1e10 .5 0xff"),
            vec![
                Token::Int("42"),
                Token::Float("3.14"),
                Token::Float("1e10"),
                Token::Float(".5"),
                Token::Int("0xff"),
            ]
        );
    }

    #[test]
    fn test_strings() {
        assert_eq!(kinds(r#"'a' "b\"c" r'x'"#).len(), 3);
        let toks = kinds("'''multi\nline''' x");
        assert_eq!(toks, vec![Token::Str("'''multi\nline'''"), Token::Name("x")]);
    }

    #[test]
    fn test_comments_and_continuations_are_skipped() {
        assert_eq!(
            kinds("a + \\\n  b # trailing\n"),
            vec![Token::Name("a"), Token::Plus, Token::Name("b"), Token::Newline]
        );
    }

    #[test]
    fn test_positions_are_character_columns() {
        let toks = lex("x = 'é'\ny").unwrap();
        assert_eq!(toks[2].start, Position { line: 1, col: 4 });
        assert_eq!(toks[2].end, Position { line: 1, col: 7 });
        assert_eq!(toks[4].start, Position { line: 2, col: 0 });
    }

    #[test]
    fn test_unexpected_character() {
        let err = lex("a ? b").unwrap_err();
        assert!(matches!(err, ParseError::UnexpectedCharacter { .. }));
    }
}
