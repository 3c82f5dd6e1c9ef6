//! Recursive-descent parser over the laid-out token stream.

use super::ast::*;
use super::error::ParseError;
use super::lexer::{Spanned, Token};

/// Deepest bracket, trailer or block nesting the parser accepts. Later passes
/// recurse over the tree too, so this bounds them as well.
pub const MAX_NESTING: usize = 30;

pub struct Parser<'src> {
    tokens: Vec<Spanned<'src>>,
    pos: usize,
    depth: usize,
}

impl<'src> Parser<'src> {
    /// `tokens` must come from [`super::tokenize`], ending in `EndMarker`.
    pub fn new(tokens: Vec<Spanned<'src>>) -> Self {
        Self {
            tokens,
            pos: 0,
            depth: 0,
        }
    }

    pub fn parse_module(mut self) -> Result<Module, ParseError> {
        let mut body = Vec::new();
        loop {
            match self.peek() {
                Token::EndMarker => break,
                Token::Newline => {
                    self.advance();
                }
                _ => body.extend(self.parse_statement()?),
            }
        }
        Ok(Module { body })
    }

    // ===== token helpers =====

    fn peek(&self) -> Token<'src> {
        self.peek_at(0)
    }

    fn peek_at(&self, ahead: usize) -> Token<'src> {
        self.tokens
            .get(self.pos + ahead)
            .or_else(|| self.tokens.last())
            .map(|t| t.token)
            .unwrap_or(Token::EndMarker)
    }

    fn position(&self) -> Position {
        self.tokens
            .get(self.pos)
            .or_else(|| self.tokens.last())
            .map(|t| t.start)
            .unwrap_or(Position { line: 1, col: 0 })
    }

    fn advance(&mut self) -> usize {
        let index = self.pos;
        if self.pos < self.tokens.len() {
            self.pos += 1;
        }
        index
    }

    fn eat(&mut self, token: Token<'_>) -> Option<usize> {
        (self.peek() == token).then(|| self.advance())
    }

    fn expect(&mut self, token: Token<'_>, what: &str) -> Result<usize, ParseError> {
        match self.eat(token) {
            Some(index) => Ok(index),
            None => Err(self.unexpected(what)),
        }
    }

    fn unexpected(&self, what: &str) -> ParseError {
        ParseError::unexpected(what, format!("{:?}", self.peek()), self.position())
    }

    /// Index of the last consumed token that came from the source text.
    fn last_significant(&self) -> usize {
        let mut index = self.pos.saturating_sub(1);
        while index > 0 && self.tokens[index].token.is_layout() {
            index -= 1;
        }
        index
    }

    fn meta_from(&self, first: usize) -> NodeMeta {
        NodeMeta::spanning(first, self.last_significant())
    }

    fn expr_from(&self, first: usize, kind: ExprKind) -> Expr {
        Expr::new(kind, self.meta_from(first))
    }

    /// Runs `parse` one nesting level deeper.
    fn nested<T>(&mut self, parse: impl FnOnce(&mut Self) -> Result<T, ParseError>) -> Result<T, ParseError> {
        if self.depth >= MAX_NESTING {
            return Err(ParseError::TooDeep {
                limit: MAX_NESTING,
                at: self.position(),
            });
        }
        self.depth += 1;
        let result = parse(self);
        self.depth -= 1;
        result
    }

    // ===== statements =====

    fn parse_statement(&mut self) -> Result<Vec<Stmt>, ParseError> {
        match self.peek() {
            Token::If => Ok(vec![self.parse_if()?]),
            Token::While => Ok(vec![self.parse_while()?]),
            Token::For => Ok(vec![self.parse_for()?]),
            Token::With => Ok(vec![self.parse_with()?]),
            Token::Def => Ok(vec![self.parse_def()?]),
            Token::Indent => Err(ParseError::UnexpectedIndent {
                line: self.position().line,
            }),
            _ => self.parse_simple_statements(),
        }
    }

    fn parse_simple_statements(&mut self) -> Result<Vec<Stmt>, ParseError> {
        let mut stmts = vec![self.parse_small_statement()?];
        while self.eat(Token::Semi).is_some() {
            if self.peek() == Token::Newline {
                break;
            }
            stmts.push(self.parse_small_statement()?);
        }
        self.expect(Token::Newline, "end of statement")?;
        Ok(stmts)
    }

    fn parse_small_statement(&mut self) -> Result<Stmt, ParseError> {
        let first = self.pos;
        let kind = match self.peek() {
            Token::Pass => {
                self.advance();
                StmtKind::Pass
            }
            Token::Break => {
                self.advance();
                StmtKind::Break
            }
            Token::Continue => {
                self.advance();
                StmtKind::Continue
            }
            Token::Return => {
                self.advance();
                let value = if self.at_statement_end() {
                    None
                } else {
                    Some(self.parse_testlist_star()?)
                };
                StmtKind::Return(value)
            }
            Token::Del => {
                self.advance();
                let targets = self.parse_target_list()?;
                for target in &targets {
                    self.check_target(target, "delete")?;
                }
                StmtKind::Delete(targets)
            }
            Token::Assert => {
                self.advance();
                let test = self.parse_test()?;
                let msg = match self.eat(Token::Comma) {
                    Some(_) => Some(self.parse_test()?),
                    None => None,
                };
                StmtKind::Assert { test, msg }
            }
            Token::Raise => {
                self.advance();
                let (exc, cause) = if self.at_statement_end() {
                    (None, None)
                } else {
                    let exc = self.parse_test()?;
                    let cause = match self.eat(Token::From) {
                        Some(_) => Some(self.parse_test()?),
                        None => None,
                    };
                    (Some(exc), cause)
                };
                StmtKind::Raise { exc, cause }
            }
            _ => self.parse_expression_statement()?,
        };
        Ok(Stmt::new(kind, self.meta_from(first)))
    }

    fn at_statement_end(&self) -> bool {
        matches!(self.peek(), Token::Newline | Token::Semi | Token::EndMarker)
    }

    fn parse_expression_statement(&mut self) -> Result<StmtKind, ParseError> {
        let first = self.parse_yield_or_testlist()?;

        if let Token::AugAssign(symbol) = self.peek() {
            let at = self.position();
            self.advance();
            if !matches!(
                first.kind,
                ExprKind::Name(_) | ExprKind::Attribute { .. } | ExprKind::Subscript { .. }
            ) {
                return Err(ParseError::InvalidTarget {
                    action: "augment-assign to",
                    target: first.kind_name(),
                    at,
                });
            }
            let op = BinOp::from_symbol(symbol)
                .ok_or_else(|| ParseError::unexpected("augmented operator", symbol, at))?;
            let value = self.parse_yield_or_testlist()?;
            return Ok(StmtKind::AugAssign {
                target: first,
                op,
                value,
            });
        }

        if self.peek() != Token::Assign {
            return Ok(StmtKind::Expr(first));
        }

        let mut chain = vec![first];
        while self.eat(Token::Assign).is_some() {
            chain.push(self.parse_yield_or_testlist()?);
        }
        let value = chain.pop().ok_or_else(|| self.unexpected("assignment value"))?;
        for target in &chain {
            self.check_target(target, "assign to")?;
        }
        Ok(StmtKind::Assign {
            targets: chain,
            value,
        })
    }

    fn parse_block(&mut self) -> Result<Vec<Stmt>, ParseError> {
        self.expect(Token::Colon, "':'")?;
        if self.eat(Token::Newline).is_none() {
            return self.parse_simple_statements();
        }
        self.expect(Token::Indent, "indented block")?;
        let mut body = Vec::new();
        while self.eat(Token::Dedent).is_none() {
            if self.peek() == Token::EndMarker {
                break;
            }
            body.extend(self.nested(Self::parse_statement)?);
        }
        Ok(body)
    }

    fn parse_if(&mut self) -> Result<Stmt, ParseError> {
        // `if` or `elif`
        let first = self.advance();
        let test = self.parse_test()?;
        let body = self.parse_block()?;
        let orelse = match self.peek() {
            Token::Elif => vec![self.nested(Self::parse_if)?],
            Token::Else => {
                self.advance();
                self.parse_block()?
            }
            _ => Vec::new(),
        };
        Ok(Stmt::new(
            StmtKind::If { test, body, orelse },
            self.meta_from(first),
        ))
    }

    fn parse_while(&mut self) -> Result<Stmt, ParseError> {
        let first = self.advance();
        let test = self.parse_test()?;
        let body = self.parse_block()?;
        let orelse = self.parse_else_block()?;
        Ok(Stmt::new(
            StmtKind::While { test, body, orelse },
            self.meta_from(first),
        ))
    }

    fn parse_for(&mut self) -> Result<Stmt, ParseError> {
        let first = self.advance();
        let target = self.parse_target_expr()?;
        self.check_target(&target, "assign to")?;
        self.expect(Token::In, "'in'")?;
        let iter = self.parse_testlist_star()?;
        let body = self.parse_block()?;
        let orelse = self.parse_else_block()?;
        Ok(Stmt::new(
            StmtKind::For {
                target,
                iter,
                body,
                orelse,
            },
            self.meta_from(first),
        ))
    }

    fn parse_else_block(&mut self) -> Result<Vec<Stmt>, ParseError> {
        match self.eat(Token::Else) {
            Some(_) => self.parse_block(),
            None => Ok(Vec::new()),
        }
    }

    fn parse_with(&mut self) -> Result<Stmt, ParseError> {
        let first = self.advance();
        let mut items = Vec::new();
        loop {
            let context = self.parse_test()?;
            let target = match self.eat(Token::As) {
                Some(_) => {
                    let target = self.parse_bitor()?;
                    self.check_target(&target, "assign to")?;
                    Some(target)
                }
                None => None,
            };
            items.push(WithItem { context, target });
            if self.eat(Token::Comma).is_none() {
                break;
            }
        }
        let body = self.parse_block()?;
        Ok(Stmt::new(StmtKind::With { items, body }, self.meta_from(first)))
    }

    fn parse_def(&mut self) -> Result<Stmt, ParseError> {
        let first = self.advance();
        let name = self.expect_name()?;
        self.expect(Token::LParen, "'('")?;
        let mut params = Vec::new();
        while self.peek() != Token::RParen {
            let name = self.expect_name()?;
            let default = match self.eat(Token::Assign) {
                Some(_) => Some(self.parse_test()?),
                None => None,
            };
            params.push(Param { name, default });
            if self.eat(Token::Comma).is_none() {
                break;
            }
        }
        self.expect(Token::RParen, "')'")?;
        if self.eat(Token::Arrow).is_some() {
            self.parse_test()?;
        }
        let body = self.parse_block()?;
        Ok(Stmt::new(
            StmtKind::FunctionDef { name, params, body },
            self.meta_from(first),
        ))
    }

    fn check_target(&self, target: &Expr, action: &'static str) -> Result<(), ParseError> {
        match &target.kind {
            ExprKind::Name(_) | ExprKind::Attribute { .. } | ExprKind::Subscript { .. } => Ok(()),
            ExprKind::Starred(inner) => self.check_target(inner, action),
            ExprKind::Tuple(elts) | ExprKind::List(elts) => {
                elts.iter().try_for_each(|e| self.check_target(e, action))
            }
            _ => Err(ParseError::InvalidTarget {
                action,
                target: target.kind_name(),
                at: target
                    .meta
                    .first_token
                    .and_then(|i| self.tokens.get(i))
                    .map(|t| t.start)
                    .unwrap_or_else(|| self.position()),
            }),
        }
    }

    fn expect_name(&mut self) -> Result<String, ParseError> {
        match self.peek() {
            Token::Name(name) => {
                self.advance();
                Ok(name.to_string())
            }
            _ => Err(self.unexpected("name")),
        }
    }

    // ===== expressions =====

    fn parse_yield_or_testlist(&mut self) -> Result<Expr, ParseError> {
        if self.peek() == Token::Yield {
            self.parse_yield()
        } else {
            self.parse_testlist_star()
        }
    }

    fn parse_yield(&mut self) -> Result<Expr, ParseError> {
        let first = self.advance();
        if self.eat(Token::From).is_some() {
            let value = self.parse_test()?;
            return Ok(self.expr_from(first, ExprKind::YieldFrom(Box::new(value))));
        }
        let value = if self.at_statement_end() || matches!(self.peek(), Token::RParen | Token::Assign) {
            None
        } else {
            Some(Box::new(self.parse_testlist_star()?))
        };
        Ok(self.expr_from(first, ExprKind::Yield(value)))
    }

    /// `test (',' test)* [',']` with starred elements allowed; a comma makes a tuple.
    fn parse_testlist_star(&mut self) -> Result<Expr, ParseError> {
        let first = self.pos;
        let head = self.parse_test_or_star()?;
        if self.peek() != Token::Comma {
            return Ok(head);
        }
        let mut elts = vec![head];
        while self.eat(Token::Comma).is_some() {
            if !self.starts_expression() {
                break;
            }
            elts.push(self.parse_test_or_star()?);
        }
        Ok(self.expr_from(first, ExprKind::Tuple(elts)))
    }

    /// Assignment targets of `for` and `del`, parsed below the comparison
    /// level so that `in` is left for the caller.
    fn parse_target_expr(&mut self) -> Result<Expr, ParseError> {
        let first = self.pos;
        let head = self.parse_star_or_bitor()?;
        if self.peek() != Token::Comma {
            return Ok(head);
        }
        let mut elts = vec![head];
        while self.eat(Token::Comma).is_some() {
            if !self.starts_expression() {
                break;
            }
            elts.push(self.parse_star_or_bitor()?);
        }
        Ok(self.expr_from(first, ExprKind::Tuple(elts)))
    }

    fn parse_target_list(&mut self) -> Result<Vec<Expr>, ParseError> {
        let mut targets = vec![self.parse_bitor()?];
        while self.eat(Token::Comma).is_some() {
            if !self.starts_expression() {
                break;
            }
            targets.push(self.parse_bitor()?);
        }
        Ok(targets)
    }

    fn starts_expression(&self) -> bool {
        matches!(
            self.peek(),
            Token::Name(_)
                | Token::Int(_)
                | Token::Float(_)
                | Token::Str(_)
                | Token::NoneKw
                | Token::True
                | Token::False
                | Token::LParen
                | Token::LBracket
                | Token::LBrace
                | Token::Minus
                | Token::Plus
                | Token::Tilde
                | Token::Not
                | Token::Star
        )
    }

    fn parse_test_or_star(&mut self) -> Result<Expr, ParseError> {
        if self.peek() == Token::Star {
            let first = self.advance();
            let value = self.parse_bitor()?;
            return Ok(self.expr_from(first, ExprKind::Starred(Box::new(value))));
        }
        self.parse_test()
    }

    fn parse_star_or_bitor(&mut self) -> Result<Expr, ParseError> {
        if self.peek() == Token::Star {
            let first = self.advance();
            let value = self.parse_bitor()?;
            return Ok(self.expr_from(first, ExprKind::Starred(Box::new(value))));
        }
        self.parse_bitor()
    }

    pub(crate) fn parse_test(&mut self) -> Result<Expr, ParseError> {
        let first = self.pos;
        let body = self.parse_or()?;
        if self.peek() != Token::If {
            return Ok(body);
        }
        // a conditional expression, not an `if` statement: we are mid-expression
        self.advance();
        let test = self.parse_or()?;
        self.expect(Token::Else, "'else'")?;
        let orelse = self.nested(Self::parse_test)?;
        Ok(self.expr_from(
            first,
            ExprKind::IfExp {
                test: Box::new(test),
                body: Box::new(body),
                orelse: Box::new(orelse),
            },
        ))
    }

    fn parse_or(&mut self) -> Result<Expr, ParseError> {
        let first = self.pos;
        let head = self.parse_and()?;
        if self.peek() != Token::Or {
            return Ok(head);
        }
        let mut values = vec![head];
        while self.eat(Token::Or).is_some() {
            values.push(self.parse_and()?);
        }
        Ok(self.expr_from(
            first,
            ExprKind::BoolOp {
                op: BoolOp::Or,
                values,
            },
        ))
    }

    fn parse_and(&mut self) -> Result<Expr, ParseError> {
        let first = self.pos;
        let head = self.parse_not()?;
        if self.peek() != Token::And {
            return Ok(head);
        }
        let mut values = vec![head];
        while self.eat(Token::And).is_some() {
            values.push(self.parse_not()?);
        }
        Ok(self.expr_from(
            first,
            ExprKind::BoolOp {
                op: BoolOp::And,
                values,
            },
        ))
    }

    fn parse_not(&mut self) -> Result<Expr, ParseError> {
        if self.peek() == Token::Not {
            let first = self.advance();
            let operand = self.nested(Self::parse_not)?;
            return Ok(self.expr_from(
                first,
                ExprKind::UnaryOp {
                    op: UnaryOp::Not,
                    operand: Box::new(operand),
                },
            ));
        }
        self.parse_comparison()
    }

    fn parse_comparison(&mut self) -> Result<Expr, ParseError> {
        let first = self.pos;
        let left = self.parse_bitor()?;
        let mut ops = Vec::new();
        let mut comparators = Vec::new();
        while let Some(op) = self.eat_comparison_operator() {
            ops.push(op);
            comparators.push(self.parse_bitor()?);
        }
        if ops.is_empty() {
            return Ok(left);
        }
        Ok(self.expr_from(
            first,
            ExprKind::Compare {
                left: Box::new(left),
                ops,
                comparators,
            },
        ))
    }

    fn eat_comparison_operator(&mut self) -> Option<CmpOp> {
        let op = match (self.peek(), self.peek_at(1)) {
            (Token::Less, _) => CmpOp::Lt,
            (Token::Greater, _) => CmpOp::Gt,
            (Token::LessEq, _) => CmpOp::LtE,
            (Token::GreaterEq, _) => CmpOp::GtE,
            (Token::EqEq, _) => CmpOp::Eq,
            (Token::NotEq, _) => CmpOp::NotEq,
            (Token::In, _) => CmpOp::In,
            (Token::Not, Token::In) => {
                self.advance();
                CmpOp::NotIn
            }
            (Token::Is, Token::Not) => {
                self.advance();
                CmpOp::IsNot
            }
            (Token::Is, _) => CmpOp::Is,
            _ => return None,
        };
        self.advance();
        Some(op)
    }

    fn parse_bitor(&mut self) -> Result<Expr, ParseError> {
        self.parse_binary_level(0)
    }

    /// Left-associative binary operator levels, loosest first.
    fn parse_binary_level(&mut self, level: usize) -> Result<Expr, ParseError> {
        const LEVELS: &[&[(Token<'static>, BinOp)]] = &[
            &[(Token::Pipe, BinOp::BitOr)],
            &[(Token::Caret, BinOp::BitXor)],
            &[(Token::Amper, BinOp::BitAnd)],
            &[(Token::LShift, BinOp::LShift), (Token::RShift, BinOp::RShift)],
            &[(Token::Plus, BinOp::Add), (Token::Minus, BinOp::Sub)],
            &[
                (Token::Star, BinOp::Mul),
                (Token::Slash, BinOp::Div),
                (Token::DoubleSlash, BinOp::FloorDiv),
                (Token::Percent, BinOp::Mod),
                (Token::At, BinOp::MatMul),
            ],
        ];

        let Some(operators) = LEVELS.get(level) else {
            return self.parse_factor();
        };

        let first = self.pos;
        let mut left = self.parse_binary_level(level + 1)?;
        loop {
            let next = self.peek();
            let Some(&(_, op)) = operators.iter().find(|(token, _)| *token == next) else {
                return Ok(left);
            };
            self.advance();
            let right = self.parse_binary_level(level + 1)?;
            left = self.expr_from(
                first,
                ExprKind::BinOp {
                    left: Box::new(left),
                    op,
                    right: Box::new(right),
                },
            );
        }
    }

    fn parse_factor(&mut self) -> Result<Expr, ParseError> {
        let op = match self.peek() {
            Token::Minus => UnaryOp::Neg,
            Token::Plus => UnaryOp::Pos,
            Token::Tilde => UnaryOp::Invert,
            _ => return self.parse_power(),
        };
        let first = self.advance();
        let operand = self.nested(Self::parse_factor)?;
        Ok(self.expr_from(
            first,
            ExprKind::UnaryOp {
                op,
                operand: Box::new(operand),
            },
        ))
    }

    fn parse_power(&mut self) -> Result<Expr, ParseError> {
        let first = self.pos;
        let base = self.parse_atom_expr()?;
        if self.eat(Token::DoubleStar).is_none() {
            return Ok(base);
        }
        let exponent = self.nested(Self::parse_factor)?;
        Ok(self.expr_from(
            first,
            ExprKind::BinOp {
                left: Box::new(base),
                op: BinOp::Pow,
                right: Box::new(exponent),
            },
        ))
    }

    fn parse_atom_expr(&mut self) -> Result<Expr, ParseError> {
        let first = self.pos;
        let mut expr = self.parse_atom()?;
        loop {
            expr = match self.peek() {
                Token::LParen => {
                    self.advance();
                    self.nested(|parser| parser.parse_call(expr, first))?
                }
                Token::LBracket => {
                    self.advance();
                    let slice = self.nested(Self::parse_subscript_list)?;
                    self.expect(Token::RBracket, "']'")?;
                    self.expr_from(
                        first,
                        ExprKind::Subscript {
                            value: Box::new(expr),
                            slice: Box::new(slice),
                        },
                    )
                }
                Token::Dot => {
                    self.advance();
                    let attr = self.expect_name()?;
                    self.expr_from(
                        first,
                        ExprKind::Attribute {
                            value: Box::new(expr),
                            attr,
                        },
                    )
                }
                _ => return Ok(expr),
            };
        }
    }

    /// Arguments stay in source order. A single `*args` is lifted into
    /// `starargs` only when no positional argument follows it, and likewise a
    /// single `**kwargs` when no keyword follows it.
    fn parse_call(&mut self, func: Expr, first: usize) -> Result<Expr, ParseError> {
        let mut args = Vec::new();
        let mut keywords = Vec::new();

        while self.peek() != Token::RParen {
            match (self.peek(), self.peek_at(1)) {
                (Token::Star, _) => {
                    let star = self.advance();
                    let value = self.parse_test()?;
                    args.push(self.expr_from(star, ExprKind::Starred(Box::new(value))));
                }
                (Token::DoubleStar, _) => {
                    self.advance();
                    let value = self.parse_test()?;
                    keywords.push(Keyword { arg: None, value });
                }
                (Token::Name(name), Token::Assign) => {
                    self.advance();
                    self.advance();
                    let value = self.parse_test()?;
                    keywords.push(Keyword {
                        arg: Some(name.to_string()),
                        value,
                    });
                }
                _ => args.push(self.parse_test()?),
            }
            if self.eat(Token::Comma).is_none() {
                break;
            }
        }
        self.expect(Token::RParen, "')'")?;

        let mut starargs = None;
        let stars = args.iter().filter(|a| matches!(a.kind, ExprKind::Starred(_))).count();
        if stars == 1 && args.last().is_some_and(|a| matches!(a.kind, ExprKind::Starred(_))) {
            if let Some(ExprKind::Starred(inner)) = args.pop().map(|a| a.kind) {
                starargs = Some(inner);
            }
        }
        let mut kwargs = None;
        let double_stars = keywords.iter().filter(|k| k.arg.is_none()).count();
        if double_stars == 1 && keywords.last().is_some_and(|k| k.arg.is_none()) {
            kwargs = keywords.pop().map(|k| Box::new(k.value));
        }

        Ok(self.expr_from(
            first,
            ExprKind::Call {
                func: Box::new(func),
                args,
                keywords,
                starargs,
                kwargs,
            },
        ))
    }

    fn parse_subscript_list(&mut self) -> Result<Slice, ParseError> {
        let first = self.pos;
        let head = self.parse_subscript()?;
        if self.peek() != Token::Comma {
            return Ok(head);
        }
        let mut dims = vec![head];
        while self.eat(Token::Comma).is_some() {
            if self.peek() == Token::RBracket {
                break;
            }
            dims.push(self.parse_subscript()?);
        }
        if dims.iter().any(|d| !matches!(d, Slice::Index(_))) {
            return Ok(Slice::Extended(dims));
        }
        let elts = dims
            .into_iter()
            .filter_map(|d| match d {
                Slice::Index(e) => Some(e),
                _ => None,
            })
            .collect();
        Ok(Slice::Index(self.expr_from(first, ExprKind::Tuple(elts))))
    }

    fn parse_subscript(&mut self) -> Result<Slice, ParseError> {
        let lower = if self.peek() == Token::Colon {
            None
        } else {
            Some(self.parse_test()?)
        };
        if self.eat(Token::Colon).is_none() {
            return match lower {
                Some(index) => Ok(Slice::Index(index)),
                None => Err(self.unexpected("subscript")),
            };
        }
        let upper = if matches!(self.peek(), Token::Colon | Token::Comma | Token::RBracket) {
            None
        } else {
            Some(self.parse_test()?)
        };
        let step = if self.eat(Token::Colon).is_some()
            && !matches!(self.peek(), Token::Comma | Token::RBracket)
        {
            Some(self.parse_test()?)
        } else {
            None
        };
        Ok(Slice::Range { lower, upper, step })
    }

    fn parse_atom(&mut self) -> Result<Expr, ParseError> {
        let first = self.pos;
        let kind = match self.peek() {
            Token::Name(name) => {
                self.advance();
                ExprKind::Name(name.to_string())
            }
            Token::Int(text) => {
                self.advance();
                ExprKind::Constant(Constant::Int(text.replace('_', "")))
            }
            Token::Float(text) => {
                self.advance();
                ExprKind::Constant(Constant::Float(text.replace('_', "")))
            }
            Token::Str(_) => {
                let mut value = String::new();
                while let Token::Str(text) = self.peek() {
                    self.advance();
                    value.push_str(&decode_string_literal(text));
                }
                ExprKind::Constant(Constant::Str(value))
            }
            Token::NoneKw => {
                self.advance();
                ExprKind::Constant(Constant::None)
            }
            Token::True => {
                self.advance();
                ExprKind::Constant(Constant::Bool(true))
            }
            Token::False => {
                self.advance();
                ExprKind::Constant(Constant::Bool(false))
            }
            Token::LParen => return self.nested(Self::parse_parenthesized),
            Token::LBracket => {
                self.advance();
                let elts = self.nested(|parser| parser.parse_elements(Token::RBracket))?;
                self.expect(Token::RBracket, "']'")?;
                ExprKind::List(elts)
            }
            Token::LBrace => {
                self.advance();
                let kind = self.nested(Self::parse_dict_or_set)?;
                self.expect(Token::RBrace, "'}'")?;
                kind
            }
            _ => return Err(self.unexpected("expression")),
        };
        Ok(self.expr_from(first, kind))
    }

    fn parse_parenthesized(&mut self) -> Result<Expr, ParseError> {
        let first = self.advance();
        if self.peek() == Token::Yield {
            let inner = self.parse_yield()?;
            self.expect(Token::RParen, "')'")?;
            return Ok(inner);
        }
        if self.eat(Token::RParen).is_some() {
            return Ok(self.expr_from(first, ExprKind::Tuple(Vec::new())));
        }
        let head = self.parse_test_or_star()?;
        if self.eat(Token::RParen).is_some() && !matches!(head.kind, ExprKind::Starred(_)) {
            // plain grouping: the node keeps its own range, without the parentheses
            return Ok(head);
        }
        let mut elts = vec![head];
        while self.eat(Token::Comma).is_some() {
            if self.peek() == Token::RParen {
                break;
            }
            elts.push(self.parse_test_or_star()?);
        }
        self.expect(Token::RParen, "')'")?;
        Ok(self.expr_from(first, ExprKind::Tuple(elts)))
    }

    fn parse_elements(&mut self, close: Token<'_>) -> Result<Vec<Expr>, ParseError> {
        let mut elts = Vec::new();
        while self.peek() != close {
            elts.push(self.parse_test_or_star()?);
            if self.eat(Token::Comma).is_none() {
                break;
            }
        }
        Ok(elts)
    }

    fn parse_dict_or_set(&mut self) -> Result<ExprKind, ParseError> {
        if self.peek() == Token::RBrace {
            return Ok(ExprKind::Dict {
                keys: Vec::new(),
                values: Vec::new(),
            });
        }
        let head = self.parse_test_or_star()?;
        if self.eat(Token::Colon).is_none() {
            let mut elts = vec![head];
            if self.eat(Token::Comma).is_some() {
                elts.extend(self.parse_elements(Token::RBrace)?);
            }
            return Ok(ExprKind::Set(elts));
        }

        let mut keys = vec![head];
        let mut values = vec![self.parse_test()?];
        while self.eat(Token::Comma).is_some() {
            if self.peek() == Token::RBrace {
                break;
            }
            keys.push(self.parse_test()?);
            self.expect(Token::Colon, "':'")?;
            values.push(self.parse_test()?);
        }
        Ok(ExprKind::Dict { keys, values })
    }
}

/// Decodes the value of a single string literal token, prefix and quotes included.
pub fn decode_string_literal(text: &str) -> String {
    let prefix_len = text.find(['\'', '"']).unwrap_or(0);
    let (prefix, quoted) = text.split_at(prefix_len);
    let raw = prefix.contains(['r', 'R']);
    let quote_len = if quoted.starts_with("'''") || quoted.starts_with("\"\"\"") {
        3
    } else {
        1
    };
    let body = quoted
        .get(quote_len..quoted.len().saturating_sub(quote_len))
        .unwrap_or_default();
    if raw {
        return body.to_string();
    }

    let mut out = String::with_capacity(body.len());
    let mut chars = body.chars();
    while let Some(ch) = chars.next() {
        if ch != '\\' {
            out.push(ch);
            continue;
        }
        match chars.next() {
            Some('n') => out.push('\n'),
            Some('t') => out.push('\t'),
            Some('r') => out.push('\r'),
            Some('0') => out.push('\0'),
            Some('\\') => out.push('\\'),
            Some('\'') => out.push('\''),
            Some('"') => out.push('"'),
            Some('\n') => {}
            Some('x') => {
                let hex: String = chars.by_ref().take(2).collect();
                match u32::from_str_radix(&hex, 16).ok().and_then(char::from_u32) {
                    Some(decoded) => out.push(decoded),
                    None => {
                        out.push_str("\\x");
                        out.push_str(&hex);
                    }
                }
            }
            Some(other) => {
                out.push('\\');
                out.push(other);
            }
            None => out.push('\\'),
        }
    }
    out
}
