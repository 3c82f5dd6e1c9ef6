use super::TextRange;
use crate::parser::{self, for_each_meta_mut, Module, NodeMeta, ParseError, Spanned};
use thiserror::Error;
use tracing::debug;

#[derive(Error, Debug)]
pub enum AnnotateError {
    #[error(transparent)]
    Parse(#[from] ParseError),

    #[error("source is not valid UTF-8: {0}")]
    Encoding(#[from] std::str::Utf8Error),

    #[error("token index {index} is outside the token stream ({len} tokens)")]
    TokenOutOfRange { index: usize, len: usize },

    #[error("node range {range} ends before it starts")]
    MalformedRange { range: TextRange },
}

/// Parses `source` and attaches a [`TextRange`] to every node.
pub fn parse_source(source: &str, fallback_to_one_char: bool) -> Result<Module, AnnotateError> {
    let mut module = parser::parse_module(source)?;
    mark_text_ranges(&mut module, source, fallback_to_one_char)?;
    Ok(module)
}

/// Attaches a [`TextRange`] to every node of `module` that has position data.
///
/// Ranges run from the start of a node's first token to the end of its last
/// token. A node that only knows where it starts gets a two-column range on
/// its start line when `fallback_to_one_char` is set. That range is a
/// placeholder, not the node's real extent.
pub fn mark_text_ranges(
    module: &mut Module,
    source: &str,
    fallback_to_one_char: bool,
) -> Result<(), AnnotateError> {
    let tokens = parser::tokenize(source)?;

    let mut failure = None;
    let mut marked = 0usize;
    let mut approximated = 0usize;
    for_each_meta_mut(module, &mut |meta| {
        if failure.is_some() {
            return;
        }
        match resolve(meta, &tokens, fallback_to_one_char) {
            Ok(Some((range, exact))) => {
                meta.start = Some(parser::Position {
                    line: range.start_line,
                    col: range.start_col,
                });
                meta.range = Some(range);
                marked += 1;
                if !exact {
                    approximated += 1;
                }
            }
            Ok(None) => {}
            Err(err) => failure = Some(err),
        }
    });

    if let Some(err) = failure {
        return Err(err);
    }
    debug!(marked, approximated, "marked text ranges");
    Ok(())
}

/// Same as [`mark_text_ranges`] for source that has not been decoded yet.
pub fn mark_text_ranges_bytes(
    module: &mut Module,
    source: &[u8],
    fallback_to_one_char: bool,
) -> Result<(), AnnotateError> {
    let source = std::str::from_utf8(source)?;
    mark_text_ranges(module, source, fallback_to_one_char)
}

/// Returns the node's range and whether it came from real token positions.
fn resolve(
    meta: &NodeMeta,
    tokens: &[Spanned<'_>],
    fallback_to_one_char: bool,
) -> Result<Option<(TextRange, bool)>, AnnotateError> {
    let token = |index: usize| {
        tokens.get(index).ok_or(AnnotateError::TokenOutOfRange {
            index,
            len: tokens.len(),
        })
    };

    let start = match meta.first_token {
        Some(index) => Some(token(index)?.start),
        None => meta.start,
    };
    let end = match meta.last_token {
        Some(index) => Some(token(index)?.end),
        None => None,
    };

    let (range, exact) = match (start, end) {
        (Some(start), Some(end)) => (TextRange::new(start.line, start.col, end.line, end.col), true),
        (Some(start), None) if fallback_to_one_char => (
            TextRange::new(start.line, start.col, start.line, start.col + 2),
            false,
        ),
        _ => return Ok(None),
    };

    if !range.is_well_formed() {
        return Err(AnnotateError::MalformedRange { range });
    }
    Ok(Some((range, exact)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::{Expr, ExprKind, Position, StmtKind};
    use indoc::indoc;

    fn value_of_first(module: &Module) -> &Expr {
        match &module.body[0].kind {
            StmtKind::Assign { value, .. } => value,
            StmtKind::Expr(value) => value,
            other => panic!("unexpected statement {:?}", other),
        }
    }

    #[test]
    fn test_ranges_from_tokens() {
        let module = parse_source("x = foo(a, 1)\n", false).unwrap();
        let stmt = &module.body[0];
        assert_eq!(stmt.range(), Some(TextRange::new(1, 0, 1, 13)));
        let call = value_of_first(&module);
        assert_eq!(call.range(), Some(TextRange::new(1, 4, 1, 13)));
    }

    #[test]
    fn test_multiline_ranges() {
        let source = indoc! {"
            total = (first +
                     second)
            if total:
                total -= 1
        "};
        let module = parse_source(source, false).unwrap();
        assert_eq!(module.body[0].range(), Some(TextRange::new(1, 0, 2, 16)));
        // the grouped binop does not include its parentheses
        assert_eq!(value_of_first(&module).range(), Some(TextRange::new(1, 9, 2, 15)));
        assert_eq!(module.body[1].range(), Some(TextRange::new(3, 0, 4, 14)));
    }

    #[test]
    fn test_fallback_for_nodes_without_tokens() {
        let mut module = parser::parse_module("f(x)\n").unwrap();
        let StmtKind::Expr(Expr {
            kind: ExprKind::Call { args, .. },
            ..
        }) = &mut module.body[0].kind
        else {
            panic!("expected call");
        };
        args.push(Expr::new(
            ExprKind::Name("patched".into()),
            NodeMeta::starting_at(Position { line: 1, col: 2 }),
        ));

        let mut strict = module.clone();
        mark_text_ranges(&mut strict, "f(x)\n", false).unwrap();
        let mut lenient = module;
        mark_text_ranges(&mut lenient, "f(x)\n", true).unwrap();

        let last_arg = |m: &Module| match &m.body[0].kind {
            StmtKind::Expr(Expr {
                kind: ExprKind::Call { args, .. },
                ..
            }) => args[1].range(),
            _ => None,
        };
        assert_eq!(last_arg(&strict), None);
        assert_eq!(last_arg(&lenient), Some(TextRange::new(1, 2, 1, 4)));
    }

    #[test]
    fn test_bytes_are_decoded() {
        let mut module = parser::parse_module("s = 'é'\n").unwrap();
        mark_text_ranges_bytes(&mut module, "s = 'é'\n".as_bytes(), false).unwrap();
        assert_eq!(value_of_first(&module).range(), Some(TextRange::new(1, 4, 1, 7)));

        let err = mark_text_ranges_bytes(&mut module, &[0xff, 0xfe], false).unwrap_err();
        assert!(matches!(err, AnnotateError::Encoding(_)));
    }

    #[test]
    fn test_parse_errors_propagate() {
        assert!(matches!(
            parse_source("x = (\n", false),
            Err(AnnotateError::Parse(_))
        ));
    }
}
