//! Parsed-program tree.
//!
//! Nodes own their children. Every node carries a [`NodeMeta`] with the token
//! span recorded by the parser and the [`TextRange`] attached later by the
//! range annotator.

use crate::ranges::TextRange;
use serde::{Deserialize, Serialize};
use std::fmt;

/// A line/column position; lines are 1-based, columns 0-based characters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Position {
    pub line: usize,
    pub col: usize,
}

/// Position bookkeeping shared by statements and expressions.
impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.line, self.col)
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct NodeMeta {
    /// Index of the node's first significant token.
    pub first_token: Option<usize>,
    /// Index of the node's last significant token.
    pub last_token: Option<usize>,
    /// Start position for nodes created without a token span.
    pub start: Option<Position>,
    /// Set by the range annotator.
    pub range: Option<TextRange>,
    /// Marks a node whose range must not be offered as a step target.
    pub incorrect_range: bool,
}

impl NodeMeta {
    pub fn spanning(first_token: usize, last_token: usize) -> Self {
        Self {
            first_token: Some(first_token),
            last_token: Some(last_token),
            ..Self::default()
        }
    }

    /// Meta for a node synthesized after parsing, e.g. by a fix-up pass.
    pub fn starting_at(start: Position) -> Self {
        Self {
            start: Some(start),
            ..Self::default()
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Module {
    pub body: Vec<Stmt>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Stmt {
    pub kind: StmtKind,
    pub meta: NodeMeta,
}

#[derive(Debug, Clone, PartialEq)]
pub enum StmtKind {
    Expr(Expr),
    Assign {
        targets: Vec<Expr>,
        value: Expr,
    },
    AugAssign {
        target: Expr,
        op: BinOp,
        value: Expr,
    },
    Return(Option<Expr>),
    Delete(Vec<Expr>),
    Pass,
    Break,
    Continue,
    Assert {
        test: Expr,
        msg: Option<Expr>,
    },
    Raise {
        exc: Option<Expr>,
        cause: Option<Expr>,
    },
    If {
        test: Expr,
        body: Vec<Stmt>,
        orelse: Vec<Stmt>,
    },
    While {
        test: Expr,
        body: Vec<Stmt>,
        orelse: Vec<Stmt>,
    },
    For {
        target: Expr,
        iter: Expr,
        body: Vec<Stmt>,
        orelse: Vec<Stmt>,
    },
    With {
        items: Vec<WithItem>,
        body: Vec<Stmt>,
    },
    FunctionDef {
        name: String,
        params: Vec<Param>,
        body: Vec<Stmt>,
    },
}

#[derive(Debug, Clone, PartialEq)]
pub struct WithItem {
    pub context: Expr,
    pub target: Option<Expr>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Param {
    pub name: String,
    pub default: Option<Expr>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Expr {
    pub kind: ExprKind,
    pub meta: NodeMeta,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ExprKind {
    Name(String),
    Constant(Constant),
    Attribute {
        value: Box<Expr>,
        attr: String,
    },
    Call {
        func: Box<Expr>,
        args: Vec<Expr>,
        keywords: Vec<Keyword>,
        /// First `*expr` argument.
        starargs: Option<Box<Expr>>,
        /// First `**expr` argument.
        kwargs: Option<Box<Expr>>,
    },
    BoolOp {
        op: BoolOp,
        values: Vec<Expr>,
    },
    BinOp {
        left: Box<Expr>,
        op: BinOp,
        right: Box<Expr>,
    },
    Compare {
        left: Box<Expr>,
        ops: Vec<CmpOp>,
        comparators: Vec<Expr>,
    },
    UnaryOp {
        op: UnaryOp,
        operand: Box<Expr>,
    },
    IfExp {
        test: Box<Expr>,
        body: Box<Expr>,
        orelse: Box<Expr>,
    },
    Tuple(Vec<Expr>),
    List(Vec<Expr>),
    Set(Vec<Expr>),
    Dict {
        keys: Vec<Expr>,
        values: Vec<Expr>,
    },
    Subscript {
        value: Box<Expr>,
        slice: Box<Slice>,
    },
    Starred(Box<Expr>),
    Yield(Option<Box<Expr>>),
    YieldFrom(Box<Expr>),
}

/// Keyword argument; `arg` is `None` for a `**spread` beyond the first.
#[derive(Debug, Clone, PartialEq)]
pub struct Keyword {
    pub arg: Option<String>,
    pub value: Expr,
}

/// The part between the brackets of a subscript.
#[derive(Debug, Clone, PartialEq)]
pub enum Slice {
    Index(Expr),
    Range {
        lower: Option<Expr>,
        upper: Option<Expr>,
        step: Option<Expr>,
    },
    Extended(Vec<Slice>),
}

#[derive(Debug, Clone, PartialEq)]
pub enum Constant {
    None,
    Bool(bool),
    Int(String),
    Float(String),
    Str(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BoolOp {
    And,
    Or,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinOp {
    Add,
    Sub,
    Mul,
    MatMul,
    Div,
    FloorDiv,
    Mod,
    Pow,
    LShift,
    RShift,
    BitOr,
    BitXor,
    BitAnd,
}

impl BinOp {
    pub fn from_symbol(symbol: &str) -> Option<Self> {
        Some(match symbol {
            "+" => BinOp::Add,
            "-" => BinOp::Sub,
            "*" => BinOp::Mul,
            "@" => BinOp::MatMul,
            "/" => BinOp::Div,
            "//" => BinOp::FloorDiv,
            "%" => BinOp::Mod,
            "**" => BinOp::Pow,
            "<<" => BinOp::LShift,
            ">>" => BinOp::RShift,
            "|" => BinOp::BitOr,
            "^" => BinOp::BitXor,
            "&" => BinOp::BitAnd,
            _ => return None,
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CmpOp {
    Eq,
    NotEq,
    Lt,
    LtE,
    Gt,
    GtE,
    Is,
    IsNot,
    In,
    NotIn,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnaryOp {
    Not,
    Neg,
    Pos,
    Invert,
}

impl Expr {
    pub fn new(kind: ExprKind, meta: NodeMeta) -> Self {
        Self { kind, meta }
    }

    pub fn range(&self) -> Option<TextRange> {
        self.meta.range
    }

    /// Short kind name used in log output and step descriptions.
    pub fn kind_name(&self) -> &'static str {
        match &self.kind {
            ExprKind::Name(_) => "Name",
            ExprKind::Constant(_) => "Constant",
            ExprKind::Attribute { .. } => "Attribute",
            ExprKind::Call { .. } => "Call",
            ExprKind::BoolOp { .. } => "BoolOp",
            ExprKind::BinOp { .. } => "BinOp",
            ExprKind::Compare { .. } => "Compare",
            ExprKind::UnaryOp { .. } => "UnaryOp",
            ExprKind::IfExp { .. } => "IfExp",
            ExprKind::Tuple(_) => "Tuple",
            ExprKind::List(_) => "List",
            ExprKind::Set(_) => "Set",
            ExprKind::Dict { .. } => "Dict",
            ExprKind::Subscript { .. } => "Subscript",
            ExprKind::Starred(_) => "Starred",
            ExprKind::Yield(_) => "Yield",
            ExprKind::YieldFrom(_) => "YieldFrom",
        }
    }
}

impl Stmt {
    pub fn new(kind: StmtKind, meta: NodeMeta) -> Self {
        Self { kind, meta }
    }

    pub fn range(&self) -> Option<TextRange> {
        self.meta.range
    }
}
