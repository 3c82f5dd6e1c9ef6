use super::last_child::last_child;
use crate::parser::{walk_module, Expr, ExprKind, Module, NodeRef, Slice, Stmt, StmtKind};
use crate::ranges::{extract_text_range, ExtractError, TextRange};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// One place the debugger pauses inside a statement.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StepFocus {
    pub range: TextRange,
    pub text: String,
    /// Enclosing expressions that are finished as soon as this one is.
    pub completes: Vec<TextRange>,
}

/// Expressions of `stmt` in the order they finish evaluating.
///
/// Nested statements of a compound statement are not included; only its
/// header expressions are. Nodes without a range are skipped but their
/// children are still visited.
pub fn evaluation_order(stmt: &Stmt) -> Vec<&Expr> {
    let mut order = Vec::new();
    match &stmt.kind {
        StmtKind::Expr(value) | StmtKind::Return(Some(value)) => visit(value, &mut order),
        StmtKind::Assign { targets, value } => {
            visit(value, &mut order);
            targets.iter().for_each(|t| visit_target(t, &mut order));
        }
        StmtKind::AugAssign { target, value, .. } => {
            visit(target, &mut order);
            visit(value, &mut order);
        }
        StmtKind::Delete(targets) => targets.iter().for_each(|t| visit_target(t, &mut order)),
        StmtKind::Assert { test, msg } => {
            visit(test, &mut order);
            msg.iter().for_each(|m| visit(m, &mut order));
        }
        StmtKind::Raise { exc, cause } => {
            exc.iter().chain(cause).for_each(|e| visit(e, &mut order));
        }
        StmtKind::If { test, .. } | StmtKind::While { test, .. } => visit(test, &mut order),
        StmtKind::For { target, iter, .. } => {
            visit(iter, &mut order);
            visit_target(target, &mut order);
        }
        StmtKind::With { items, .. } => {
            for item in items {
                visit(&item.context, &mut order);
                item.target.iter().for_each(|t| visit_target(t, &mut order));
            }
        }
        StmtKind::FunctionDef { params, .. } => {
            params
                .iter()
                .filter_map(|p| p.default.as_ref())
                .for_each(|d| visit(d, &mut order));
        }
        StmtKind::Return(None) | StmtKind::Pass | StmtKind::Break | StmtKind::Continue => {}
    }
    order
}

fn push<'a>(expr: &'a Expr, order: &mut Vec<&'a Expr>) {
    if expr.range().is_some() {
        order.push(expr);
    }
}

fn visit<'a>(expr: &'a Expr, order: &mut Vec<&'a Expr>) {
    match &expr.kind {
        ExprKind::IfExp { test, body, orelse } => {
            visit(test, order);
            visit(body, order);
            visit(orelse, order);
        }
        ExprKind::Subscript { value, slice } => {
            visit(value, order);
            visit_slice(slice, order);
        }
        _ => {
            for child in NodeRef::Expr(expr).children() {
                if let Some(child) = child.as_expr() {
                    visit(child, order);
                }
            }
        }
    }
    push(expr, order);
}

fn visit_slice<'a>(slice: &'a Slice, order: &mut Vec<&'a Expr>) {
    match slice {
        Slice::Index(value) => visit(value, order),
        Slice::Range { lower, upper, step } => {
            for part in [lower, upper, step].into_iter().flatten() {
                visit(part, order);
            }
        }
        Slice::Extended(dims) => dims.iter().for_each(|d| visit_slice(d, order)),
    }
}

/// Store targets: only the parts that are read before the store happens.
fn visit_target<'a>(target: &'a Expr, order: &mut Vec<&'a Expr>) {
    match &target.kind {
        ExprKind::Name(_) => {}
        ExprKind::Tuple(elts) | ExprKind::List(elts) => {
            elts.iter().for_each(|e| visit_target(e, order))
        }
        ExprKind::Starred(inner) => visit_target(inner, order),
        ExprKind::Attribute { value, .. } => visit(value, order),
        ExprKind::Subscript { value, slice } => {
            visit(value, order);
            visit_slice(slice, order);
        }
        _ => visit(target, order),
    }
}

/// True iff evaluating `child` is the last thing `parent` does.
pub fn completes_parent(parent: NodeRef<'_>, child: &Expr) -> bool {
    last_child(parent, true)
        .expr()
        .is_some_and(|last| std::ptr::eq(last, child))
}

/// Enclosing expressions below `root` that finish at the same moment as `expr`,
/// innermost first. Empty when `expr` is not under `root`.
pub fn completion_chain<'a>(root: NodeRef<'a>, expr: &Expr) -> Vec<&'a Expr> {
    let mut path = Vec::new();
    if !path_to(root, expr, &mut path) {
        return Vec::new();
    }
    // path ends with `expr` itself
    path.pop();

    let mut chain = Vec::new();
    let mut current: &Expr = expr;
    for ancestor in path.into_iter().rev() {
        match ancestor {
            // the subscript resolves through its slice directly
            NodeRef::Slice(_) => continue,
            NodeRef::Stmt(_) => break,
            NodeRef::Expr(parent) => {
                if !completes_parent(ancestor, current) {
                    break;
                }
                chain.push(parent);
                current = parent;
            }
        }
    }
    chain
}

fn path_to<'a>(node: NodeRef<'a>, target: &Expr, path: &mut Vec<NodeRef<'a>>) -> bool {
    path.push(node);
    if node.as_expr().is_some_and(|e| std::ptr::eq(e, target)) {
        return true;
    }
    for child in node.children() {
        if path_to(child, target, path) {
            return true;
        }
    }
    path.pop();
    false
}

/// Every pause point of `module`, statement by statement in source order.
///
/// The module must already carry ranges (see [`crate::ranges::parse_source`]).
pub fn step_foci(module: &Module, source: &str) -> Result<Vec<StepFocus>, ExtractError> {
    let mut foci = Vec::new();
    for stmt in walk_module(module).filter_map(NodeRef::as_stmt) {
        for expr in evaluation_order(stmt) {
            let Some(range) = expr.range() else {
                continue;
            };
            let completes = completion_chain(NodeRef::Stmt(stmt), expr)
                .into_iter()
                .filter_map(Expr::range)
                .collect();
            foci.push(StepFocus {
                range,
                text: extract_text_range(source, &range)?,
                completes,
            });
        }
    }
    debug!(foci = foci.len(), "computed step foci");
    Ok(foci)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ranges::parse_source;
    use indoc::indoc;

    fn texts(source: &str) -> Vec<String> {
        let module = parse_source(source, false).unwrap();
        evaluation_order(&module.body[0])
            .into_iter()
            .map(|e| extract_text_range(source, &e.range().unwrap()).unwrap())
            .collect()
    }

    #[test]
    fn test_evaluation_order_is_post_order() {
        assert_eq!(texts("f(a + 1, k=b)\n"), ["f", "a", "1", "a + 1", "b", "f(a + 1, k=b)"]);
        assert_eq!(texts("{k: v}\n"), ["k", "v", "{k: v}"]);
        assert_eq!(texts("x if c else y\n"), ["c", "x", "y", "x if c else y"]);
    }

    #[test]
    fn test_star_arguments_step_in_source_order() {
        assert_eq!(texts("f(*a, x)\n"), ["f", "a", "*a", "x", "f(*a, x)"]);
        assert_eq!(texts("f(x, *a)\n"), ["f", "x", "a", "f(x, *a)"]);
    }

    #[test]
    fn test_assignment_evaluates_value_first() {
        assert_eq!(texts("a[i], b = g(), 2\n"), ["g", "g()", "2", "g(), 2", "a", "i"]);
        assert_eq!(texts("n += 1\n"), ["n", "1"]);
        assert_eq!(texts("for x in items:\n    pass\n"), ["items"]);
    }

    #[test]
    fn test_completion_chain() {
        let source = "y = f(g(h(x)))\n";
        let module = parse_source(source, false).unwrap();
        let stmt = &module.body[0];
        let order = evaluation_order(stmt);
        let innermost = order.iter().find(|e| e.kind == ExprKind::Name("x".into())).unwrap();

        let chain: Vec<String> = completion_chain(NodeRef::Stmt(stmt), innermost)
            .into_iter()
            .map(|e| extract_text_range(source, &e.range().unwrap()).unwrap())
            .collect();
        assert_eq!(chain, ["h(x)", "g(h(x))", "f(g(h(x)))"]);

        let callee = order.iter().find(|e| e.kind == ExprKind::Name("f".into())).unwrap();
        assert!(completion_chain(NodeRef::Stmt(stmt), callee).is_empty());
    }

    #[test]
    fn test_completes_through_subscript() {
        let module = parse_source("v[i]\n", false).unwrap();
        let StmtKind::Expr(subscript) = &module.body[0].kind else {
            panic!("expected expression");
        };
        let ExprKind::Subscript { slice, .. } = &subscript.kind else {
            panic!("expected subscript");
        };
        let Slice::Index(index) = &**slice else {
            panic!("expected index");
        };
        assert!(completes_parent(NodeRef::Expr(subscript), index));
        let chain = completion_chain(NodeRef::Expr(subscript), index);
        assert_eq!(chain.len(), 1);
        assert!(std::ptr::eq(chain[0], subscript));
    }

    #[test]
    fn test_step_foci_cover_nested_statements() {
        let source = indoc! {"
            total = 0
            if total < 3:
                print(total)
        "};
        let module = parse_source(source, false).unwrap();
        let foci = step_foci(&module, source).unwrap();
        let texts: Vec<&str> = foci.iter().map(|f| f.text.as_str()).collect();
        assert_eq!(
            texts,
            ["0", "total", "3", "total < 3", "print", "total", "print(total)"]
        );
        let last_arg = &foci[5];
        assert_eq!(last_arg.completes, vec![TextRange::new(3, 4, 3, 16)]);
    }

    #[test]
    fn test_step_foci_json_round_trip() {
        let source = "print(max(a, b))\n";
        let module = parse_source(source, false).unwrap();
        let foci = step_foci(&module, source).unwrap();
        let json = serde_json::to_string(&foci).unwrap();
        let decoded: Vec<StepFocus> = serde_json::from_str(&json).unwrap();
        assert_eq!(decoded, foci);
        assert!(json.contains(r#""range":{"start_line":1,"start_col":10"#));
    }
}
