use crate::parser::{Expr, ExprKind, NodeRef, Slice, StmtKind};

/// Outcome of asking which child of a node is evaluated last.
#[derive(Debug, Clone, Copy)]
pub enum LastChild<'a> {
    Expr(&'a Expr),
    /// Compound statement: it has children, but stepping does not pick one.
    Compound,
    None,
}

impl<'a> LastChild<'a> {
    pub fn expr(self) -> Option<&'a Expr> {
        match self {
            LastChild::Expr(expr) => Some(expr),
            _ => None,
        }
    }

    pub fn is_none(&self) -> bool {
        matches!(self, LastChild::None)
    }
}

impl<'a> From<Option<&'a Expr>> for LastChild<'a> {
    fn from(expr: Option<&'a Expr>) -> Self {
        expr.map_or(LastChild::None, LastChild::Expr)
    }
}

/// Returns the child of `node` whose evaluation completes `node`.
///
/// With `skip_incorrect` set, children flagged `incorrect_range` are never
/// chosen and the next candidate in line is tried instead.
pub fn last_child(node: NodeRef<'_>, skip_incorrect: bool) -> LastChild<'_> {
    let resolver = Resolver { skip_incorrect };
    match node {
        NodeRef::Expr(expr) => resolver.expr(expr).into(),
        NodeRef::Slice(slice) => resolver.slice(slice).into(),
        NodeRef::Stmt(stmt) => match &stmt.kind {
            StmtKind::Expr(value) => resolver.valid(value).into(),
            StmtKind::Return(value) => resolver.ok(value.as_ref()).into(),
            StmtKind::Assign { value, .. } | StmtKind::AugAssign { value, .. } => {
                resolver.valid(value).into()
            }
            StmtKind::Delete(targets) => resolver.last_ok(targets.iter()).into(),
            StmtKind::Assert { test, msg } => resolver
                .ok(msg.as_ref())
                .or_else(|| resolver.valid(test))
                .into(),
            StmtKind::Raise { exc, cause } => resolver
                .ok(cause.as_ref())
                .or_else(|| resolver.ok(exc.as_ref()))
                .into(),
            StmtKind::For { .. } | StmtKind::While { .. } | StmtKind::If { .. } | StmtKind::With { .. } => {
                LastChild::Compound
            }
            StmtKind::Pass | StmtKind::Break | StmtKind::Continue | StmtKind::FunctionDef { .. } => {
                LastChild::None
            }
        },
    }
}

struct Resolver {
    skip_incorrect: bool,
}

impl Resolver {
    fn valid<'a>(&self, expr: &'a Expr) -> Option<&'a Expr> {
        (!(self.skip_incorrect && expr.meta.incorrect_range)).then_some(expr)
    }

    fn ok<'a>(&self, expr: Option<&'a Expr>) -> Option<&'a Expr> {
        expr.and_then(|e| self.valid(e))
    }

    /// Rightmost valid element; a starred element stands for its value.
    fn last_ok<'a>(&self, exprs: impl DoubleEndedIterator<Item = &'a Expr>) -> Option<&'a Expr> {
        let found = exprs.rev().find(|e| self.valid(e).is_some())?;
        match &found.kind {
            ExprKind::Starred(value) => self.valid(value),
            _ => Some(found),
        }
    }

    fn expr<'a>(&self, expr: &'a Expr) -> Option<&'a Expr> {
        match &expr.kind {
            ExprKind::Call {
                func,
                args,
                keywords,
                starargs,
                kwargs,
            } => self
                .ok(kwargs.as_deref())
                .or_else(|| self.ok(starargs.as_deref()))
                .or_else(|| self.last_ok(keywords.iter().map(|k| &k.value)))
                .or_else(|| self.last_ok(args.iter()))
                .or_else(|| self.valid(func)),
            ExprKind::BoolOp { values, .. } => self.last_ok(values.iter()),
            ExprKind::BinOp { left, right, .. } => {
                self.valid(right).or_else(|| self.valid(left))
            }
            ExprKind::Compare { comparators, .. } => self.last_ok(comparators.iter()),
            ExprKind::UnaryOp { operand, .. } => self.valid(operand),
            ExprKind::Tuple(elts) | ExprKind::List(elts) | ExprKind::Set(elts) => {
                self.last_ok(elts.iter())
            }
            ExprKind::Dict { values, .. } => self.last_ok(values.iter()),
            ExprKind::Yield(value) => self.ok(value.as_deref()),
            ExprKind::YieldFrom(value) => self.valid(value),
            // the base is the fallback even when it is flagged
            ExprKind::Subscript { value, slice } => Some(self.slice(slice).unwrap_or(value)),
            ExprKind::Name(_)
            | ExprKind::Constant(_)
            | ExprKind::Attribute { .. }
            | ExprKind::IfExp { .. }
            | ExprKind::Starred(_) => None,
        }
    }

    fn slice<'a>(&self, slice: &'a Slice) -> Option<&'a Expr> {
        match slice {
            Slice::Index(value) => self.valid(value),
            Slice::Range { lower, upper, step } => self
                .ok(step.as_ref())
                .or_else(|| self.ok(upper.as_ref()))
                .or_else(|| self.ok(lower.as_ref())),
            Slice::Extended(dims) => dims.iter().rev().find_map(|dim| self.slice(dim)),
        }
    }
}
