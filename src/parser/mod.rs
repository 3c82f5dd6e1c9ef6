mod ast;
mod error;
mod grammar;
mod layout;
mod lexer;
mod walk;

pub use ast::{
    BinOp, BoolOp, CmpOp, Constant, Expr, ExprKind, Keyword, Module, NodeMeta, Param, Position,
    Slice, Stmt, StmtKind, UnaryOp, WithItem,
};
pub use error::ParseError;
pub use grammar::{decode_string_literal, MAX_NESTING};
pub use lexer::{LineIndex, Spanned, Token};
pub use walk::{for_each_meta_mut, walk, walk_module, NodeRef, Walk};

/// Tokenizes `source` into the stream the parser consumes: raw tokens plus
/// layout tokens. Node token indices refer into this stream.
pub fn tokenize(source: &str) -> Result<Vec<Spanned<'_>>, ParseError> {
    layout::layout(lexer::lex(source)?)
}

/// Parses a whole module. Ranges are not attached yet; see
/// [`crate::ranges::mark_text_ranges`].
pub fn parse_module(source: &str) -> Result<Module, ParseError> {
    let tokens = tokenize(source)?;
    let module = grammar::Parser::new(tokens).parse_module()?;
    tracing::trace!(statements = module.body.len(), "parsed module");
    Ok(module)
}

#[cfg(test)]
mod tests {
    use super::*;
    use indoc::indoc;

    fn single_expr(source: &str) -> Expr {
        let module = parse_module(source).unwrap();
        match module.body.into_iter().next().map(|s| s.kind) {
            Some(StmtKind::Expr(e)) => e,
            other => panic!("expected expression statement, got {:?}", other),
        }
    }

    #[test]
    fn test_call_arguments() {
        let expr = single_expr("f(a, b, c=1, *rest, **extra)\n");
        let ExprKind::Call {
            args,
            keywords,
            starargs,
            kwargs,
            ..
        } = expr.kind
        else {
            panic!("expected call");
        };
        assert_eq!(args.len(), 2);
        assert_eq!(keywords.len(), 1);
        assert_eq!(keywords[0].arg.as_deref(), Some("c"));
        assert!(starargs.is_some());
        assert!(kwargs.is_some());
    }

    #[test]
    fn test_star_arguments_keep_source_order() {
        let expr = single_expr("f(*a, x)\n");
        let ExprKind::Call { args, starargs, .. } = expr.kind else {
            panic!("expected call");
        };
        assert!(starargs.is_none());
        assert!(matches!(args[0].kind, ExprKind::Starred(_)));
        assert_eq!(args[1].kind, ExprKind::Name("x".into()));

        let expr = single_expr("f(**kw, k=1)\n");
        let ExprKind::Call { keywords, kwargs, .. } = expr.kind else {
            panic!("expected call");
        };
        assert!(kwargs.is_none());
        assert_eq!(keywords.len(), 2);
        assert_eq!(keywords[0].arg, None);

        let expr = single_expr("f(*a, *b)\n");
        let ExprKind::Call { args, starargs, .. } = expr.kind else {
            panic!("expected call");
        };
        assert!(starargs.is_none());
        assert_eq!(args.len(), 2);
    }

    #[test]
    fn test_deep_nesting_is_an_error() {
        let nest = |n: usize| format!("{}1{}\n", "(".repeat(n), ")".repeat(n));
        assert!(parse_module(&nest(20)).is_ok());
        for n in [MAX_NESTING + 1, 60, 200, 1000] {
            assert!(matches!(
                parse_module(&nest(n)),
                Err(ParseError::TooDeep { limit: MAX_NESTING, .. })
            ));
        }
        let lists = format!("x = {}{}\n", "[".repeat(100), "]".repeat(100));
        assert!(matches!(parse_module(&lists), Err(ParseError::TooDeep { .. })));
        let negations = format!("{}1\n", "-".repeat(500));
        assert!(matches!(parse_module(&negations), Err(ParseError::TooDeep { .. })));
    }

    #[test]
    fn test_precedence() {
        let expr = single_expr("a + b * c\n");
        let ExprKind::BinOp { op, right, .. } = expr.kind else {
            panic!("expected binop");
        };
        assert_eq!(op, BinOp::Add);
        assert!(matches!(right.kind, ExprKind::BinOp { op: BinOp::Mul, .. }));
    }

    #[test]
    fn test_chained_comparison() {
        let expr = single_expr("a < b <= c is not d\n");
        let ExprKind::Compare { ops, comparators, .. } = expr.kind else {
            panic!("expected compare");
        };
        assert_eq!(ops, vec![CmpOp::Lt, CmpOp::LtE, CmpOp::IsNot]);
        assert_eq!(comparators.len(), 3);
    }

    #[test]
    fn test_slices() {
        let expr = single_expr("x[1:2:3]\n");
        let ExprKind::Subscript { slice, .. } = expr.kind else {
            panic!("expected subscript");
        };
        assert!(matches!(
            *slice,
            Slice::Range {
                lower: Some(_),
                upper: Some(_),
                step: Some(_)
            }
        ));

        let expr = single_expr("m[1:2, ::3]\n");
        let ExprKind::Subscript { slice, .. } = expr.kind else {
            panic!("expected subscript");
        };
        assert!(matches!(*slice, Slice::Extended(ref dims) if dims.len() == 2));

        let expr = single_expr("m[i, j]\n");
        let ExprKind::Subscript { slice, .. } = expr.kind else {
            panic!("expected subscript");
        };
        assert!(matches!(*slice, Slice::Index(Expr { kind: ExprKind::Tuple(_), .. })));
    }

    #[test]
    fn test_compound_statements() {
        let source = indoc! {"
            def f(a, b=2):
                for x in a:
                    if x:
                        yield x
                    elif b:
                        pass
                    else:
                        break
                while b: b -= 1
                with open(a) as fh, g():
                    return fh
        "};
        let module = parse_module(source).unwrap();
        assert_eq!(module.body.len(), 1);
        let StmtKind::FunctionDef { params, body, .. } = &module.body[0].kind else {
            panic!("expected def");
        };
        assert_eq!(params.len(), 2);
        assert_eq!(body.len(), 3);
        assert!(matches!(body[0].kind, StmtKind::For { .. }));
        assert!(matches!(body[1].kind, StmtKind::While { .. }));
        assert!(matches!(&body[2].kind, StmtKind::With { items, .. } if items.len() == 2));
    }

    #[test]
    fn test_simple_statements() {
        let source = "x = y = 1, 2\ndel a, b[0]; assert x, 'm'\nraise E from c\nz += 3\n";
        let module = parse_module(source).unwrap();
        let kinds: Vec<_> = module.body.iter().map(|s| &s.kind).collect();
        assert!(matches!(kinds[0], StmtKind::Assign { targets, .. } if targets.len() == 2));
        assert!(matches!(kinds[1], StmtKind::Delete(t) if t.len() == 2));
        assert!(matches!(kinds[2], StmtKind::Assert { msg: Some(_), .. }));
        assert!(matches!(kinds[3], StmtKind::Raise { cause: Some(_), .. }));
        assert!(matches!(kinds[4], StmtKind::AugAssign { op: BinOp::Add, .. }));
    }

    #[test]
    fn test_literals() {
        let expr = single_expr("{'a': 1, 'b': [2, 3], 'c': {4}, 'd': (), 'e': (5,)}\n");
        let ExprKind::Dict { keys, values } = expr.kind else {
            panic!("expected dict");
        };
        assert_eq!(keys.len(), 5);
        assert!(matches!(values[2].kind, ExprKind::Set(_)));
        assert!(matches!(&values[3].kind, ExprKind::Tuple(e) if e.is_empty()));
        assert!(matches!(&values[4].kind, ExprKind::Tuple(e) if e.len() == 1));
    }

    #[test]
    fn test_string_decoding() {
        assert_eq!(decode_string_literal(r"'a\nb'"), "a\nb");
        assert_eq!(decode_string_literal(r"r'a\nb'"), "a\\nb");
        assert_eq!(decode_string_literal(r#""\x41\"""#), "A\"");
        assert_eq!(decode_string_literal("'''x'y'''"), "x'y");
        let expr = single_expr("'ab' \"cd\"\n");
        assert_eq!(expr.kind, ExprKind::Constant(Constant::Str("abcd".into())));
    }

    #[test]
    fn test_errors() {
        assert!(matches!(
            parse_module("f(\n"),
            Err(ParseError::UnexpectedToken { .. })
        ));
        assert!(matches!(
            parse_module("  x = 1\n"),
            Err(ParseError::UnexpectedIndent { line: 1 })
        ));
        assert!(matches!(
            parse_module("1 = x\n"),
            Err(ParseError::InvalidTarget { .. })
        ));
    }
}
