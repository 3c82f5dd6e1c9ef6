use super::ast::Position;
use super::error::ParseError;
use super::lexer::{Spanned, Token};

/// Inserts `Indent`/`Dedent` tokens and drops newlines that do not end a
/// logical line.
///
/// A newline ends a logical line only outside brackets and only after a
/// significant token, so blank lines, comment-only lines and bracketed
/// continuations collapse away. A `Newline` and all pending `Dedent`s are
/// appended at end of input, followed by `EndMarker`.
pub fn layout<'src>(raw: Vec<Spanned<'src>>) -> Result<Vec<Spanned<'src>>, ParseError> {
    let mut out = Vec::with_capacity(raw.len() + 8);
    let mut indents: Vec<usize> = vec![0];
    let mut depth = 0usize;
    let mut at_line_start = true;

    for tok in raw {
        match tok.token {
            Token::LParen | Token::LBracket | Token::LBrace => depth += 1,
            Token::RParen | Token::RBracket | Token::RBrace => depth = depth.saturating_sub(1),
            Token::Newline => {
                if depth == 0 && !at_line_start {
                    out.push(tok);
                    at_line_start = true;
                }
                continue;
            }
            _ => {}
        }

        if at_line_start {
            let col = tok.start.col;
            let current = indents.last().copied().unwrap_or(0);
            if col > current {
                indents.push(col);
                out.push(marker(Token::Indent, tok.start));
            } else if col < current {
                while indents.last().is_some_and(|&level| col < level) {
                    indents.pop();
                    out.push(marker(Token::Dedent, tok.start));
                }
                if indents.last().copied() != Some(col) {
                    return Err(ParseError::InconsistentDedent {
                        line: tok.start.line,
                    });
                }
            }
            at_line_start = false;
        }

        out.push(tok);
    }

    let end = out
        .last()
        .map(|t| t.end)
        .unwrap_or(Position { line: 1, col: 0 });
    if !at_line_start {
        out.push(marker(Token::Newline, end));
    }
    while indents.len() > 1 {
        indents.pop();
        out.push(marker(Token::Dedent, end));
    }
    out.push(marker(Token::EndMarker, end));

    Ok(out)
}

fn marker(token: Token<'_>, at: Position) -> Spanned<'_> {
    Spanned {
        token,
        start: at,
        end: at,
    }
}
