//! Tree traversal shared by the annotator, the locator and the stepper.

use super::ast::*;

/// A borrowed reference to any node kind the resolver understands.
#[derive(Debug, Clone, Copy)]
pub enum NodeRef<'a> {
    Stmt(&'a Stmt),
    Expr(&'a Expr),
    Slice(&'a Slice),
}

impl<'a> NodeRef<'a> {
    /// Direct children in source order.
    pub fn children(self) -> Vec<NodeRef<'a>> {
        let mut out = Vec::new();
        match self {
            NodeRef::Stmt(stmt) => stmt_children(stmt, &mut out),
            NodeRef::Expr(expr) => expr_children(expr, &mut out),
            NodeRef::Slice(slice) => slice_children(slice, &mut out),
        }
        out
    }

    pub fn as_expr(self) -> Option<&'a Expr> {
        match self {
            NodeRef::Expr(expr) => Some(expr),
            _ => None,
        }
    }

    pub fn as_stmt(self) -> Option<&'a Stmt> {
        match self {
            NodeRef::Stmt(stmt) => Some(stmt),
            _ => None,
        }
    }

    pub fn meta(self) -> Option<&'a NodeMeta> {
        match self {
            NodeRef::Stmt(stmt) => Some(&stmt.meta),
            NodeRef::Expr(expr) => Some(&expr.meta),
            NodeRef::Slice(_) => None,
        }
    }

    /// Identity comparison; two structurally equal nodes are still different nodes.
    pub fn same_node(self, other: NodeRef<'_>) -> bool {
        match (self, other) {
            (NodeRef::Stmt(a), NodeRef::Stmt(b)) => std::ptr::eq(a, b),
            (NodeRef::Expr(a), NodeRef::Expr(b)) => std::ptr::eq(a, b),
            (NodeRef::Slice(a), NodeRef::Slice(b)) => std::ptr::eq(a, b),
            _ => false,
        }
    }
}

fn stmt_children<'a>(stmt: &'a Stmt, out: &mut Vec<NodeRef<'a>>) {
    let exprs = |out: &mut Vec<NodeRef<'a>>, items: &'a [Expr]| {
        out.extend(items.iter().map(NodeRef::Expr));
    };
    let stmts = |out: &mut Vec<NodeRef<'a>>, items: &'a [Stmt]| {
        out.extend(items.iter().map(NodeRef::Stmt));
    };
    match &stmt.kind {
        StmtKind::Expr(value) => out.push(NodeRef::Expr(value)),
        StmtKind::Assign { targets, value } => {
            exprs(out, targets);
            out.push(NodeRef::Expr(value));
        }
        StmtKind::AugAssign { target, value, .. } => {
            out.push(NodeRef::Expr(target));
            out.push(NodeRef::Expr(value));
        }
        StmtKind::Return(value) => out.extend(value.iter().map(NodeRef::Expr)),
        StmtKind::Delete(targets) => exprs(out, targets),
        StmtKind::Pass | StmtKind::Break | StmtKind::Continue => {}
        StmtKind::Assert { test, msg } => {
            out.push(NodeRef::Expr(test));
            out.extend(msg.iter().map(NodeRef::Expr));
        }
        StmtKind::Raise { exc, cause } => {
            out.extend(exc.iter().map(NodeRef::Expr));
            out.extend(cause.iter().map(NodeRef::Expr));
        }
        StmtKind::If { test, body, orelse } | StmtKind::While { test, body, orelse } => {
            out.push(NodeRef::Expr(test));
            stmts(out, body);
            stmts(out, orelse);
        }
        StmtKind::For {
            target,
            iter,
            body,
            orelse,
        } => {
            out.push(NodeRef::Expr(target));
            out.push(NodeRef::Expr(iter));
            stmts(out, body);
            stmts(out, orelse);
        }
        StmtKind::With { items, body } => {
            for item in items {
                out.push(NodeRef::Expr(&item.context));
                out.extend(item.target.iter().map(NodeRef::Expr));
            }
            stmts(out, body);
        }
        StmtKind::FunctionDef { params, body, .. } => {
            out.extend(params.iter().filter_map(|p| p.default.as_ref()).map(NodeRef::Expr));
            stmts(out, body);
        }
    }
}

fn expr_children<'a>(expr: &'a Expr, out: &mut Vec<NodeRef<'a>>) {
    match &expr.kind {
        ExprKind::Name(_) | ExprKind::Constant(_) => {}
        ExprKind::Attribute { value, .. } | ExprKind::Starred(value) | ExprKind::YieldFrom(value) => {
            out.push(NodeRef::Expr(value))
        }
        ExprKind::Call {
            func,
            args,
            keywords,
            starargs,
            kwargs,
        } => {
            out.push(NodeRef::Expr(func));
            out.extend(args.iter().map(NodeRef::Expr));
            out.extend(starargs.iter().map(|e| NodeRef::Expr(e)));
            out.extend(keywords.iter().map(|k| NodeRef::Expr(&k.value)));
            out.extend(kwargs.iter().map(|e| NodeRef::Expr(e)));
        }
        ExprKind::BoolOp { values, .. } => out.extend(values.iter().map(NodeRef::Expr)),
        ExprKind::BinOp { left, right, .. } => {
            out.push(NodeRef::Expr(left));
            out.push(NodeRef::Expr(right));
        }
        ExprKind::Compare {
            left, comparators, ..
        } => {
            out.push(NodeRef::Expr(left));
            out.extend(comparators.iter().map(NodeRef::Expr));
        }
        ExprKind::UnaryOp { operand, .. } => out.push(NodeRef::Expr(operand)),
        ExprKind::IfExp { test, body, orelse } => {
            out.push(NodeRef::Expr(body));
            out.push(NodeRef::Expr(test));
            out.push(NodeRef::Expr(orelse));
        }
        ExprKind::Tuple(elts) | ExprKind::List(elts) | ExprKind::Set(elts) => {
            out.extend(elts.iter().map(NodeRef::Expr))
        }
        ExprKind::Dict { keys, values } => {
            for (key, value) in keys.iter().zip(values) {
                out.push(NodeRef::Expr(key));
                out.push(NodeRef::Expr(value));
            }
        }
        ExprKind::Subscript { value, slice } => {
            out.push(NodeRef::Expr(value));
            out.push(NodeRef::Slice(slice));
        }
        ExprKind::Yield(value) => out.extend(value.iter().map(|e| NodeRef::Expr(e))),
    }
}

fn slice_children<'a>(slice: &'a Slice, out: &mut Vec<NodeRef<'a>>) {
    match slice {
        Slice::Index(value) => out.push(NodeRef::Expr(value)),
        Slice::Range { lower, upper, step } => {
            for part in [lower, upper, step].into_iter().flatten() {
                out.push(NodeRef::Expr(part));
            }
        }
        Slice::Extended(dims) => out.extend(dims.iter().map(NodeRef::Slice)),
    }
}

/// Pre-order iterator over a node and all its descendants.
pub struct Walk<'a> {
    stack: Vec<NodeRef<'a>>,
}

impl<'a> Iterator for Walk<'a> {
    type Item = NodeRef<'a>;

    fn next(&mut self) -> Option<Self::Item> {
        let node = self.stack.pop()?;
        let mut children = node.children();
        children.reverse();
        self.stack.extend(children);
        Some(node)
    }
}

pub fn walk(node: NodeRef<'_>) -> Walk<'_> {
    Walk { stack: vec![node] }
}

/// Pre-order walk over every statement of a module and everything below it.
pub fn walk_module(module: &Module) -> Walk<'_> {
    Walk {
        stack: module.body.iter().rev().map(NodeRef::Stmt).collect(),
    }
}

/// Calls `f` with the metadata of every statement and expression in `module`.
pub fn for_each_meta_mut(module: &mut Module, f: &mut impl FnMut(&mut NodeMeta)) {
    for stmt in &mut module.body {
        stmt_meta_mut(stmt, f);
    }
}

fn stmt_meta_mut(stmt: &mut Stmt, f: &mut impl FnMut(&mut NodeMeta)) {
    f(&mut stmt.meta);
    match &mut stmt.kind {
        StmtKind::Expr(value) => expr_meta_mut(value, f),
        StmtKind::Assign { targets, value } => {
            targets.iter_mut().for_each(|e| expr_meta_mut(e, f));
            expr_meta_mut(value, f);
        }
        StmtKind::AugAssign { target, value, .. } => {
            expr_meta_mut(target, f);
            expr_meta_mut(value, f);
        }
        StmtKind::Return(value) => value.iter_mut().for_each(|e| expr_meta_mut(e, f)),
        StmtKind::Delete(targets) => targets.iter_mut().for_each(|e| expr_meta_mut(e, f)),
        StmtKind::Pass | StmtKind::Break | StmtKind::Continue => {}
        StmtKind::Assert { test, msg } => {
            expr_meta_mut(test, f);
            msg.iter_mut().for_each(|e| expr_meta_mut(e, f));
        }
        StmtKind::Raise { exc, cause } => {
            exc.iter_mut().for_each(|e| expr_meta_mut(e, f));
            cause.iter_mut().for_each(|e| expr_meta_mut(e, f));
        }
        StmtKind::If { test, body, orelse } | StmtKind::While { test, body, orelse } => {
            expr_meta_mut(test, f);
            body.iter_mut().chain(orelse).for_each(|s| stmt_meta_mut(s, f));
        }
        StmtKind::For {
            target,
            iter,
            body,
            orelse,
        } => {
            expr_meta_mut(target, f);
            expr_meta_mut(iter, f);
            body.iter_mut().chain(orelse).for_each(|s| stmt_meta_mut(s, f));
        }
        StmtKind::With { items, body } => {
            for item in items {
                expr_meta_mut(&mut item.context, f);
                item.target.iter_mut().for_each(|e| expr_meta_mut(e, f));
            }
            body.iter_mut().for_each(|s| stmt_meta_mut(s, f));
        }
        StmtKind::FunctionDef { params, body, .. } => {
            params
                .iter_mut()
                .filter_map(|p| p.default.as_mut())
                .for_each(|e| expr_meta_mut(e, f));
            body.iter_mut().for_each(|s| stmt_meta_mut(s, f));
        }
    }
}

fn expr_meta_mut(expr: &mut Expr, f: &mut impl FnMut(&mut NodeMeta)) {
    f(&mut expr.meta);
    match &mut expr.kind {
        ExprKind::Name(_) | ExprKind::Constant(_) => {}
        ExprKind::Attribute { value, .. } | ExprKind::Starred(value) | ExprKind::YieldFrom(value) => {
            expr_meta_mut(value, f)
        }
        ExprKind::Call {
            func,
            args,
            keywords,
            starargs,
            kwargs,
        } => {
            expr_meta_mut(func, f);
            args.iter_mut().for_each(|e| expr_meta_mut(e, f));
            starargs.iter_mut().for_each(|e| expr_meta_mut(e, f));
            keywords.iter_mut().for_each(|k| expr_meta_mut(&mut k.value, f));
            kwargs.iter_mut().for_each(|e| expr_meta_mut(e, f));
        }
        ExprKind::BoolOp { values, .. } => values.iter_mut().for_each(|e| expr_meta_mut(e, f)),
        ExprKind::BinOp { left, right, .. } => {
            expr_meta_mut(left, f);
            expr_meta_mut(right, f);
        }
        ExprKind::Compare {
            left, comparators, ..
        } => {
            expr_meta_mut(left, f);
            comparators.iter_mut().for_each(|e| expr_meta_mut(e, f));
        }
        ExprKind::UnaryOp { operand, .. } => expr_meta_mut(operand, f),
        ExprKind::IfExp { test, body, orelse } => {
            expr_meta_mut(body, f);
            expr_meta_mut(test, f);
            expr_meta_mut(orelse, f);
        }
        ExprKind::Tuple(elts) | ExprKind::List(elts) | ExprKind::Set(elts) => {
            elts.iter_mut().for_each(|e| expr_meta_mut(e, f))
        }
        ExprKind::Dict { keys, values } => {
            keys.iter_mut().chain(values).for_each(|e| expr_meta_mut(e, f))
        }
        ExprKind::Subscript { value, slice } => {
            expr_meta_mut(value, f);
            slice_meta_mut(slice, f);
        }
        ExprKind::Yield(value) => value.iter_mut().for_each(|e| expr_meta_mut(e, f)),
    }
}

fn slice_meta_mut(slice: &mut Slice, f: &mut impl FnMut(&mut NodeMeta)) {
    match slice {
        Slice::Index(value) => expr_meta_mut(value, f),
        Slice::Range { lower, upper, step } => {
            for part in [lower, upper, step].into_iter().flatten() {
                expr_meta_mut(part, f);
            }
        }
        Slice::Extended(dims) => dims.iter_mut().for_each(|d| slice_meta_mut(d, f)),
    }
}
