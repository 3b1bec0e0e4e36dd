//! # nv_parser
//!
//! A hand-written recursive-descent parser with precedence climbing over
//! the token stream `nv_lexer` produces. Operator precedence follows a
//! fixed eleven-level table (lowest to highest: `or`, `and`, equality,
//! comparison, range, additive, multiplicative, power, unary, postfix,
//! primary).

use nv_ast::*;
use nv_base::{Position, Result, SpannedError};
use nv_lexer::{ImportInfo, Token, TokenKind};

pub struct Parser {
    tokens: Vec<Token>,
    pos: usize,
}

impl Parser {
    pub fn new(tokens: Vec<Token>) -> Self {
        Self { tokens, pos: 0 }
    }

    /// Parses a full compilation unit: the import statements the lexer
    /// already recognized, plus the top-level statement sequence.
    pub fn parse_program(tokens: Vec<Token>, imports: Vec<ImportInfo>) -> Result<Program> {
        let mut parser = Parser::new(tokens);
        let import_decls = imports
            .into_iter()
            .map(|info| ImportDecl {
                module_path: info.module_path,
                items: info
                    .items
                    .into_iter()
                    .map(|item| ImportItem {
                        name: item.name,
                        alias: item.alias,
                        position: Position::new(item.line, item.col_start, item.col_end, 0, 0),
                    })
                    .collect(),
                position: info.position,
            })
            .collect();

        let mut statements = Vec::new();
        while !parser.check(TokenKind::Eof) {
            if parser.check(TokenKind::Import) {
                // The token is already a consolidated `Import`; its detail
                // lives in `imports`, not in the statement stream, so a
                // bare import statement at top level is simply skipped.
                parser.advance();
                continue;
            }
            statements.push(parser.statement()?);
        }
        Ok(Program {
            imports: import_decls,
            statements,
        })
    }

    // ------------------------------------------------------------------
    // Token stream helpers
    // ------------------------------------------------------------------

    fn peek(&self) -> &Token {
        &self.tokens[self.pos.min(self.tokens.len() - 1)]
    }

    fn peek_kind(&self) -> TokenKind {
        self.peek().kind
    }

    fn check(&self, kind: TokenKind) -> bool {
        self.peek_kind() == kind
    }

    fn advance(&mut self) -> Token {
        let tok = self.peek().clone();
        if self.pos < self.tokens.len() - 1 {
            self.pos += 1;
        }
        tok
    }

    fn matches(&mut self, kind: TokenKind) -> bool {
        if self.check(kind) {
            self.advance();
            true
        } else {
            false
        }
    }

    fn expect(&mut self, kind: TokenKind, context: &str) -> Result<Token> {
        if self.check(kind) {
            Ok(self.advance())
        } else {
            let found = self.peek().clone();
            Err(SpannedError::new(
                format!(
                    "expected {:?} {}, found {:?} ('{}')",
                    kind, context, found.kind, found.lexeme
                ),
                found.position,
            ))
        }
    }

    fn error(&self, message: impl Into<String>) -> SpannedError {
        SpannedError::new(message, self.peek().position)
    }

    // ------------------------------------------------------------------
    // Statements
    // ------------------------------------------------------------------

    fn block(&mut self) -> Result<Block> {
        self.expect(TokenKind::OBrace, "to open a block")?;
        let mut statements = Vec::new();
        while !self.check(TokenKind::CBrace) && !self.check(TokenKind::Eof) {
            statements.push(self.statement()?);
        }
        self.expect(TokenKind::CBrace, "to close a block")?;
        Ok(statements)
    }

    fn statement(&mut self) -> Result<Stmt> {
        let start = self.peek().position;
        match self.peek_kind() {
            TokenKind::Lock => self.lock_statement(start),
            TokenKind::If => self.if_statement(start),
            TokenKind::While => self.while_statement(start),
            TokenKind::For => self.for_statement(start),
            TokenKind::Loop => self.loop_statement(start),
            TokenKind::Break => {
                self.advance();
                self.expect(TokenKind::Semicolon, "after 'break'")?;
                Ok(Stmt::new(StmtKind::Break, start))
            }
            TokenKind::Continue => {
                self.advance();
                self.expect(TokenKind::Semicolon, "after 'continue'")?;
                Ok(Stmt::new(StmtKind::Continue, start))
            }
            TokenKind::Return => self.return_statement(start),
            TokenKind::Def => self.def_statement(start).map(|f| Stmt::new(StmtKind::Def(f), start)),
            TokenKind::Label => {
                self.advance();
                let name = self.expect(TokenKind::Identifier, "after 'label'")?;
                self.expect(TokenKind::Semicolon, "after label name")?;
                Ok(Stmt::new(StmtKind::Label(name.lexeme), start))
            }
            _ => self.expr_statement(start),
        }
    }

    fn lock_statement(&mut self, start: Position) -> Result<Stmt> {
        self.advance(); // 'lock'
        let name = self.expect(TokenKind::Identifier, "after 'lock'")?.lexeme;
        let type_annotation = if self.matches(TokenKind::Colon) {
            Some(self.type_expr()?)
        } else {
            None
        };
        self.expect(TokenKind::Assign, "in lock binding")?;
        let value = self.expr()?;
        self.expect(TokenKind::Semicolon, "after lock binding")?;
        Ok(Stmt::new(
            StmtKind::Lock {
                name,
                type_annotation,
                value,
            },
            start,
        ))
    }

    fn if_statement(&mut self, start: Position) -> Result<Stmt> {
        self.advance(); // 'if'
        let cond = self.expr()?;
        let then_branch = self.block()?;
        let mut elifs = Vec::new();
        let mut else_branch = None;
        loop {
            if self.matches(TokenKind::Elif) {
                let c = self.expr()?;
                let b = self.block()?;
                elifs.push((c, b));
            } else if self.matches(TokenKind::Else) {
                else_branch = Some(self.block()?);
                break;
            } else {
                break;
            }
        }
        Ok(Stmt::new(
            StmtKind::If {
                cond,
                then_branch,
                elifs,
                else_branch,
            },
            start,
        ))
    }

    fn while_statement(&mut self, start: Position) -> Result<Stmt> {
        self.advance(); // 'while'
        let cond = self.expr()?;
        let body = self.block()?;
        Ok(Stmt::new(StmtKind::While { cond, body }, start))
    }

    fn for_statement(&mut self, start: Position) -> Result<Stmt> {
        self.advance(); // 'for'
        let binding = self.for_binding()?;
        self.expect_from_keyword()?;
        let iterable = self.expr()?;
        let body = self.block()?;
        let else_branch = if self.matches(TokenKind::Else) { Some(self.block()?) } else { None };
        Ok(Stmt::new(
            StmtKind::For {
                binding,
                iterable,
                body,
                else_branch,
            },
            start,
        ))
    }

    /// `x` or `i, x`: one or two loop-variable names, shared by `for`
    /// headers and comprehension generators.
    fn for_binding(&mut self) -> Result<ForBinding> {
        let first = self.expect(TokenKind::Identifier, "as a loop variable")?.lexeme;
        let second = if self.matches(TokenKind::Comma) {
            Some(self.expect(TokenKind::Identifier, "as a loop variable")?.lexeme)
        } else {
            None
        };
        Ok(ForBinding { first, second })
    }

    /// `for x in xs for y in ys ...`: one or more comprehension generator
    /// clauses, each introduced by its own `for`.
    fn comprehension_generators(&mut self) -> Result<Vec<ComprehensionGenerator>> {
        let mut generators = Vec::new();
        while self.matches(TokenKind::For) {
            let binding = self.for_binding()?;
            self.expect(TokenKind::In, "in a list comprehension generator")?;
            let source = self.expr()?;
            generators.push(ComprehensionGenerator { binding, source });
        }
        Ok(generators)
    }

    /// narval's `for` loop header is `for x from iterable { ... }`; `from`
    /// is otherwise only a keyword inside import statements, so it is
    /// matched here by lexeme on an `Identifier`-shaped token stream or by
    /// its own `From` kind if the lexer ever special-cases it outside
    /// imports.
    fn expect_from_keyword(&mut self) -> Result<()> {
        if self.check(TokenKind::From) || (self.check(TokenKind::Identifier) && self.peek().lexeme == "from") {
            self.advance();
            Ok(())
        } else {
            Err(self.error("expected 'from' in for-loop header"))
        }
    }

    fn loop_statement(&mut self, start: Position) -> Result<Stmt> {
        self.advance(); // 'loop'
        let body = self.block()?;
        Ok(Stmt::new(StmtKind::Loop { body }, start))
    }

    fn return_statement(&mut self, start: Position) -> Result<Stmt> {
        self.advance(); // 'return'
        let value = if self.check(TokenKind::Semicolon) {
            None
        } else {
            Some(self.expr()?)
        };
        self.expect(TokenKind::Semicolon, "after 'return'")?;
        Ok(Stmt::new(StmtKind::Return(value), start))
    }

    fn def_statement(&mut self, start: Position) -> Result<FunctionDef> {
        self.advance(); // 'def'
        let name = self.expect(TokenKind::Identifier, "as the function name")?.lexeme;
        self.expect(TokenKind::OParen, "to open the parameter list")?;
        let mut params = Vec::new();
        if !self.check(TokenKind::CParen) {
            loop {
                let p_start = self.peek().position;
                let p_name = self.expect(TokenKind::Identifier, "as a parameter name")?.lexeme;
                let type_annotation = if self.matches(TokenKind::Colon) {
                    Some(self.type_expr()?)
                } else {
                    None
                };
                let default = if self.matches(TokenKind::Assign) {
                    Some(self.expr()?)
                } else {
                    None
                };
                params.push(Param {
                    name: p_name,
                    type_annotation,
                    default,
                    position: p_start,
                });
                if !self.matches(TokenKind::Comma) {
                    break;
                }
            }
        }
        self.expect(TokenKind::CParen, "to close the parameter list")?;
        let return_type = if self.matches(TokenKind::Arrow) {
            Some(self.type_expr()?)
        } else {
            None
        };
        let body = self.block()?;
        Ok(FunctionDef {
            name,
            params,
            return_type,
            body,
            position: start,
        })
    }

    fn expr_statement(&mut self, start: Position) -> Result<Stmt> {
        let target = self.expr()?;
        let kind = if self.matches(TokenKind::Assign) {
            let value = self.expr()?;
            StmtKind::Assign { target, value }
        } else if let Some(op) = self.compound_op() {
            self.advance();
            let value = self.expr()?;
            StmtKind::CompoundAssign { op, target, value }
        } else {
            StmtKind::Expr(target)
        };
        self.expect(TokenKind::Semicolon, "after statement")?;
        Ok(Stmt::new(kind, start))
    }

    fn compound_op(&self) -> Option<CompoundOp> {
        Some(match self.peek_kind() {
            TokenKind::PlusAssign => CompoundOp::Add,
            TokenKind::MinusAssign => CompoundOp::Sub,
            TokenKind::StarAssign => CompoundOp::Mul,
            TokenKind::SlashAssign => CompoundOp::Div,
            TokenKind::SlashSlashAssign => CompoundOp::FloorDiv,
            TokenKind::PowerAssign => CompoundOp::Pow,
            TokenKind::PercentAssign => CompoundOp::Mod,
            _ => return None,
        })
    }

    fn type_expr(&mut self) -> Result<TypeExpr> {
        if self.matches(TokenKind::OBracket) {
            let inner = self.type_expr()?;
            self.expect(TokenKind::CBracket, "to close a list type")?;
            return Ok(TypeExpr::List(Box::new(inner)));
        }
        if self.matches(TokenKind::OParen) {
            let mut params = Vec::new();
            if !self.check(TokenKind::CParen) {
                loop {
                    params.push(self.type_expr()?);
                    if !self.matches(TokenKind::Comma) {
                        break;
                    }
                }
            }
            self.expect(TokenKind::CParen, "to close a parenthesized type")?;
            if self.matches(TokenKind::Arrow) {
                let ret = self.type_expr()?;
                return Ok(TypeExpr::Function(params, Box::new(ret)));
            }
            return Ok(TypeExpr::Tuple(params));
        }
        let name = self.expect(TokenKind::Identifier, "as a type name")?.lexeme;
        Ok(TypeExpr::Named(name))
    }

    // ------------------------------------------------------------------
    // Expressions: precedence climbing, lowest to highest.
    // ------------------------------------------------------------------

    pub fn expr(&mut self) -> Result<Expr> {
        self.or_expr()
    }

    fn or_expr(&mut self) -> Result<Expr> {
        let mut left = self.and_expr()?;
        while self.check(TokenKind::Or) {
            let start = left.position;
            self.advance();
            let right = self.and_expr()?;
            left = Expr::new(
                ExprKind::Binary {
                    op: BinaryOp::Or,
                    left: Box::new(left),
                    right: Box::new(right),
                },
                start,
            );
        }
        Ok(left)
    }

    fn and_expr(&mut self) -> Result<Expr> {
        let mut left = self.equality_expr()?;
        while self.check(TokenKind::And) {
            let start = left.position;
            self.advance();
            let right = self.equality_expr()?;
            left = Expr::new(
                ExprKind::Binary {
                    op: BinaryOp::And,
                    left: Box::new(left),
                    right: Box::new(right),
                },
                start,
            );
        }
        Ok(left)
    }

    fn equality_expr(&mut self) -> Result<Expr> {
        let mut left = self.comparison_expr()?;
        loop {
            let op = match self.peek_kind() {
                TokenKind::Eq => BinaryOp::Eq,
                TokenKind::NotEq => BinaryOp::NotEq,
                _ => break,
            };
            let start = left.position;
            self.advance();
            let right = self.comparison_expr()?;
            left = Expr::new(
                ExprKind::Binary {
                    op,
                    left: Box::new(left),
                    right: Box::new(right),
                },
                start,
            );
        }
        Ok(left)
    }

    fn comparison_expr(&mut self) -> Result<Expr> {
        let mut left = self.range_expr()?;
        loop {
            let op = match self.peek_kind() {
                TokenKind::Lt => BinaryOp::Lt,
                TokenKind::Gt => BinaryOp::Gt,
                TokenKind::LtEq => BinaryOp::LtEq,
                TokenKind::GtEq => BinaryOp::GtEq,
                _ => break,
            };
            let start = left.position;
            self.advance();
            let right = self.range_expr()?;
            left = Expr::new(
                ExprKind::Binary {
                    op,
                    left: Box::new(left),
                    right: Box::new(right),
                },
                start,
            );
        }
        Ok(left)
    }

    fn range_expr(&mut self) -> Result<Expr> {
        let left = self.additive_expr()?;
        let inclusive = match self.peek_kind() {
            TokenKind::Range => false,
            TokenKind::RangeInclusive => true,
            _ => return Ok(left),
        };
        let start = left.position;
        self.advance();
        let right = self.additive_expr()?;
        Ok(Expr::new(
            ExprKind::Range {
                start: Box::new(left),
                end: Box::new(right),
                inclusive,
            },
            start,
        ))
    }

    fn additive_expr(&mut self) -> Result<Expr> {
        let mut left = self.multiplicative_expr()?;
        loop {
            let op = match self.peek_kind() {
                TokenKind::Plus => BinaryOp::Add,
                TokenKind::Minus => BinaryOp::Sub,
                _ => break,
            };
            let start = left.position;
            self.advance();
            let right = self.multiplicative_expr()?;
            left = Expr::new(
                ExprKind::Binary {
                    op,
                    left: Box::new(left),
                    right: Box::new(right),
                },
                start,
            );
        }
        Ok(left)
    }

    fn multiplicative_expr(&mut self) -> Result<Expr> {
        let mut left = self.power_expr()?;
        loop {
            let op = match self.peek_kind() {
                TokenKind::Star => BinaryOp::Mul,
                TokenKind::Slash => BinaryOp::Div,
                TokenKind::SlashSlash => BinaryOp::FloorDiv,
                TokenKind::Percent => BinaryOp::Mod,
                _ => break,
            };
            let start = left.position;
            self.advance();
            let right = self.power_expr()?;
            left = Expr::new(
                ExprKind::Binary {
                    op,
                    left: Box::new(left),
                    right: Box::new(right),
                },
                start,
            );
        }
        Ok(left)
    }

    /// Right-associative: `2 ** 3 ** 2 == 2 ** (3 ** 2)`.
    fn power_expr(&mut self) -> Result<Expr> {
        let left = self.unary_expr()?;
        if self.check(TokenKind::Power) {
            let start = left.position;
            self.advance();
            let right = self.power_expr()?;
            return Ok(Expr::new(
                ExprKind::Binary {
                    op: BinaryOp::Pow,
                    left: Box::new(left),
                    right: Box::new(right),
                },
                start,
            ));
        }
        Ok(left)
    }

    fn unary_expr(&mut self) -> Result<Expr> {
        let start = self.peek().position;
        if let Some(op) = match self.peek_kind() {
            TokenKind::Increment => Some(IncDecOp::Increment),
            TokenKind::Decrement => Some(IncDecOp::Decrement),
            _ => None,
        } {
            self.advance();
            let operand = self.unary_expr()?;
            return Ok(Expr::new(ExprKind::PrefixIncDec { op, operand: Box::new(operand) }, start));
        }
        let op = match self.peek_kind() {
            TokenKind::Minus => Some(UnaryOp::Neg),
            TokenKind::Not => Some(UnaryOp::Not),
            _ => None,
        };
        if let Some(op) = op {
            self.advance();
            let operand = self.unary_expr()?;
            return Ok(Expr::new(
                ExprKind::Unary {
                    op,
                    operand: Box::new(operand),
                },
                start,
            ));
        }
        self.postfix_expr()
    }

    fn postfix_expr(&mut self) -> Result<Expr> {
        let mut expr = self.primary_expr()?;
        loop {
            expr = match self.peek_kind() {
                TokenKind::OParen => {
                    self.advance();
                    let mut args = Vec::new();
                    if !self.check(TokenKind::CParen) {
                        loop {
                            args.push(self.expr()?);
                            if !self.matches(TokenKind::Comma) {
                                break;
                            }
                        }
                    }
                    self.expect(TokenKind::CParen, "to close a call's argument list")?;
                    let start = expr.position;
                    Expr::new(
                        ExprKind::Call {
                            callee: Box::new(expr),
                            args,
                        },
                        start,
                    )
                }
                TokenKind::OBracket => {
                    self.advance();
                    let index = self.expr()?;
                    self.expect(TokenKind::CBracket, "to close an index expression")?;
                    let start = expr.position;
                    Expr::new(
                        ExprKind::Index {
                            collection: Box::new(expr),
                            index: Box::new(index),
                        },
                        start,
                    )
                }
                TokenKind::Dot => {
                    self.advance();
                    let name = self.expect(TokenKind::Identifier, "after '.'")?.lexeme;
                    let start = expr.position;
                    Expr::new(
                        ExprKind::Field {
                            object: Box::new(expr),
                            name,
                        },
                        start,
                    )
                }
                TokenKind::Increment => {
                    self.advance();
                    let start = expr.position;
                    Expr::new(ExprKind::PostfixIncDec { op: IncDecOp::Increment, operand: Box::new(expr) }, start)
                }
                TokenKind::Decrement => {
                    self.advance();
                    let start = expr.position;
                    Expr::new(ExprKind::PostfixIncDec { op: IncDecOp::Decrement, operand: Box::new(expr) }, start)
                }
                _ => break,
            };
        }
        Ok(expr)
    }

    fn primary_expr(&mut self) -> Result<Expr> {
        let start = self.peek().position;
        match self.peek_kind() {
            TokenKind::Number => {
                let tok = self.advance();
                let value = parse_numeric_lexeme(&tok.lexeme).ok_or_else(|| {
                    SpannedError::new(format!("malformed numeric literal '{}'", tok.lexeme), tok.position)
                })?;
                Ok(Expr::new(ExprKind::Literal(Literal::Number(value)), start))
            }
            TokenKind::String => {
                let tok = self.advance();
                Ok(Expr::new(ExprKind::Literal(Literal::String(tok.lexeme)), start))
            }
            TokenKind::True => {
                self.advance();
                Ok(Expr::new(ExprKind::Literal(Literal::Bool(true)), start))
            }
            TokenKind::False => {
                self.advance();
                Ok(Expr::new(ExprKind::Literal(Literal::Bool(false)), start))
            }
            TokenKind::Identifier => {
                let tok = self.advance();
                Ok(Expr::new(ExprKind::Identifier(tok.lexeme), start))
            }
            TokenKind::OParen => {
                self.advance();
                if self.matches(TokenKind::CParen) {
                    return Ok(Expr::new(ExprKind::Tuple(Vec::new()), start));
                }
                let first = self.expr()?;
                if self.matches(TokenKind::Comma) {
                    let mut items = vec![first];
                    if !self.check(TokenKind::CParen) {
                        loop {
                            items.push(self.expr()?);
                            if !self.matches(TokenKind::Comma) {
                                break;
                            }
                        }
                    }
                    self.expect(TokenKind::CParen, "to close a tuple literal")?;
                    return Ok(Expr::new(ExprKind::Tuple(items), start));
                }
                self.expect(TokenKind::CParen, "to close a parenthesized expression")?;
                Ok(first)
            }
            TokenKind::OBracket => {
                self.advance();
                if self.matches(TokenKind::CBracket) {
                    return Ok(Expr::new(ExprKind::Vector(Vec::new()), start));
                }
                let first = self.expr()?;
                if self.check(TokenKind::For) {
                    let generators = self.comprehension_generators()?;
                    let condition = if self.matches(TokenKind::If) { Some(Box::new(self.expr()?)) } else { None };
                    let else_branch = if self.matches(TokenKind::Else) { Some(Box::new(self.expr()?)) } else { None };
                    self.expect(TokenKind::CBracket, "to close a list comprehension")?;
                    return Ok(Expr::new(
                        ExprKind::ListComp {
                            element: Box::new(first),
                            generators,
                            condition,
                            else_branch,
                        },
                        start,
                    ));
                }
                let mut items = vec![first];
                while self.matches(TokenKind::Comma) {
                    if self.check(TokenKind::CBracket) {
                        break;
                    }
                    items.push(self.expr()?);
                }
                self.expect(TokenKind::CBracket, "to close a vector literal")?;
                Ok(Expr::new(ExprKind::Vector(items), start))
            }
            TokenKind::If => self.if_expr(start),
            TokenKind::Match => self.match_expr(start),
            TokenKind::OBrace => {
                self.advance();
                if self.matches(TokenKind::CBrace) {
                    return Ok(Expr::new(ExprKind::Array(Vec::new()), start));
                }
                let first = self.expr()?;
                if self.matches(TokenKind::Colon) {
                    let first_value = self.expr()?;
                    let mut pairs = vec![(first, first_value)];
                    while self.matches(TokenKind::Comma) {
                        if self.check(TokenKind::CBrace) {
                            break;
                        }
                        let key = self.expr()?;
                        self.expect(TokenKind::Colon, "in a map literal")?;
                        let value = self.expr()?;
                        pairs.push((key, value));
                    }
                    self.expect(TokenKind::CBrace, "to close a map literal")?;
                    return Ok(Expr::new(ExprKind::Map(pairs), start));
                }
                let mut items = vec![first];
                while self.matches(TokenKind::Comma) {
                    if self.check(TokenKind::CBrace) {
                        break;
                    }
                    items.push(self.expr()?);
                }
                self.expect(TokenKind::CBrace, "to close an array literal")?;
                Ok(Expr::new(ExprKind::Array(items), start))
            }
            _ => {
                let tok = self.peek().clone();
                Err(SpannedError::new(
                    format!("unexpected token {:?} ('{}') in expression", tok.kind, tok.lexeme),
                    tok.position,
                ))
            }
        }
    }

    fn if_expr(&mut self, start: Position) -> Result<Expr> {
        self.advance(); // 'if'
        let cond = self.expr()?;
        let then_branch = self.expr_block_value()?;
        self.expect(TokenKind::Else, "an 'if' used as an expression requires an 'else' branch")?;
        let else_branch = if self.check(TokenKind::If) {
            self.if_expr(self.peek().position)?
        } else {
            self.expr_block_value()?
        };
        Ok(Expr::new(
            ExprKind::IfElse {
                cond: Box::new(cond),
                then_branch: Box::new(then_branch),
                else_branch: Box::new(else_branch),
            },
            start,
        ))
    }

    fn expr_block_value(&mut self) -> Result<Expr> {
        let start = self.peek().position;
        let block = self.block()?;
        Ok(Expr::new(ExprKind::Block(block), start))
    }

    fn match_expr(&mut self, start: Position) -> Result<Expr> {
        self.advance(); // 'match'
        let scrutinee = self.expr()?;
        self.expect(TokenKind::OBrace, "to open a match body")?;
        let mut arms = Vec::new();
        while !self.check(TokenKind::CBrace) {
            let arm_start = self.peek().position;
            let pattern = self.pattern()?;
            let guard = if self.check(TokenKind::If) {
                self.advance();
                Some(self.expr()?)
            } else {
                None
            };
            self.expect(TokenKind::FatArrow, "after a match pattern")?;
            let body = self.expr()?;
            arms.push(MatchArm {
                pattern,
                guard,
                body,
                position: arm_start,
            });
            if !self.matches(TokenKind::Comma) {
                break;
            }
        }
        self.expect(TokenKind::CBrace, "to close a match body")?;
        Ok(Expr::new(
            ExprKind::Match {
                scrutinee: Box::new(scrutinee),
                arms,
            },
            start,
        ))
    }

    /// A pattern, with `a || b` disjunction binding looser than any single
    /// alternative.
    fn pattern(&mut self) -> Result<Pattern> {
        let mut pat = self.pattern_primary()?;
        while self.matches(TokenKind::Or) {
            let rhs = self.pattern_primary()?;
            pat = Pattern::Or(Box::new(pat), Box::new(rhs));
        }
        Ok(pat)
    }

    fn pattern_primary(&mut self) -> Result<Pattern> {
        if self.check(TokenKind::Default) {
            self.advance();
            return Ok(Pattern::Wildcard);
        }
        if self.check(TokenKind::Identifier) && self.peek().lexeme == "_" {
            self.advance();
            return Ok(Pattern::Wildcard);
        }
        if self.check(TokenKind::Identifier) {
            let name = self.advance().lexeme;
            return Ok(Pattern::Binding(name));
        }
        let lo = self.pattern_literal()?;
        if self.check(TokenKind::Range) || self.check(TokenKind::RangeInclusive) {
            let inclusive = self.check(TokenKind::RangeInclusive);
            self.advance();
            let hi = self.pattern_literal()?;
            return Ok(Pattern::Range { lo, hi, inclusive });
        }
        Ok(Pattern::Literal(lo))
    }

    fn pattern_literal(&mut self) -> Result<Literal> {
        match self.peek_kind() {
            TokenKind::Number => {
                let tok = self.advance();
                let value = parse_numeric_lexeme(&tok.lexeme)
                    .ok_or_else(|| SpannedError::new(format!("malformed numeric pattern '{}'", tok.lexeme), tok.position))?;
                Ok(Literal::Number(value))
            }
            TokenKind::String => Ok(Literal::String(self.advance().lexeme)),
            TokenKind::True => {
                self.advance();
                Ok(Literal::Bool(true))
            }
            TokenKind::False => {
                self.advance();
                Ok(Literal::Bool(false))
            }
            _ => Err(self.error("expected a literal pattern")),
        }
    }
}

/// Decodes a numeric lexeme exactly as the lexer scanned it: base-prefixed
/// integers (`0b`, `0o`, `0x`) and decimal literals with an optional
/// fractional part and exponent.
fn parse_numeric_lexeme(lexeme: &str) -> Option<f64> {
    if let Some(bits) = lexeme.strip_prefix("0b") {
        return i64::from_str_radix(bits, 2).ok().map(|v| v as f64);
    }
    if let Some(digits) = lexeme.strip_prefix("0o") {
        return i64::from_str_radix(digits, 8).ok().map(|v| v as f64);
    }
    if let Some(digits) = lexeme.strip_prefix("0x") {
        return i64::from_str_radix(digits, 16).ok().map(|v| v as f64);
    }
    lexeme.parse::<f64>().ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use nv_lexer::Lexer;

    fn parse(src: &str) -> Program {
        let (tokens, imports) = Lexer::new(src, "test.rv").tokenize().unwrap();
        Parser::parse_program(tokens, imports).unwrap()
    }

    #[test]
    fn parses_lock_binding() {
        let program = parse("lock x = 1;");
        assert_eq!(program.statements.len(), 1);
        match &program.statements[0].kind {
            StmtKind::Lock { name, value, .. } => {
                assert_eq!(name, "x");
                assert_eq!(value.kind, ExprKind::Literal(Literal::Number(1.0)));
            }
            other => panic!("expected Lock, got {:?}", other),
        }
    }

    #[test]
    fn precedence_climbing_respects_arithmetic_priority() {
        let program = parse("lock x = 1 + 2 * 3;");
        match &program.statements[0].kind {
            StmtKind::Lock { value, .. } => match &value.kind {
                ExprKind::Binary { op: BinaryOp::Add, right, .. } => {
                    assert!(matches!(right.kind, ExprKind::Binary { op: BinaryOp::Mul, .. }));
                }
                other => panic!("expected Add at the top, got {:?}", other),
            },
            other => panic!("expected Lock, got {:?}", other),
        }
    }

    #[test]
    fn power_is_right_associative() {
        let program = parse("lock x = 2 ** 3 ** 2;");
        match &program.statements[0].kind {
            StmtKind::Lock { value, .. } => match &value.kind {
                ExprKind::Binary { op: BinaryOp::Pow, right, .. } => {
                    assert!(matches!(right.kind, ExprKind::Binary { op: BinaryOp::Pow, .. }));
                }
                other => panic!("expected Pow at the top, got {:?}", other),
            },
            other => panic!("expected Lock, got {:?}", other),
        }
    }

    #[test]
    fn parses_if_else_statement_with_elifs() {
        let program = parse("if x { lock a = 1; } elif y { lock a = 2; } else { lock a = 3; }");
        match &program.statements[0].kind {
            StmtKind::If { elifs, else_branch, .. } => {
                assert_eq!(elifs.len(), 1);
                assert!(else_branch.is_some());
            }
            other => panic!("expected If, got {:?}", other),
        }
    }

    #[test]
    fn parses_function_definition() {
        let program = parse("def add(a: Int, b: Int) -> Int { return a + b; }");
        match &program.statements[0].kind {
            StmtKind::Def(f) => {
                assert_eq!(f.name, "add");
                assert_eq!(f.params.len(), 2);
                assert!(f.return_type.is_some());
            }
            other => panic!("expected Def, got {:?}", other),
        }
    }

    #[test]
    fn parses_match_expression_with_guard_and_wildcard() {
        let program = parse("lock x = match n { 0 => 1, _ if n > 0 => 2, _ => 3 };");
        match &program.statements[0].kind {
            StmtKind::Lock { value, .. } => match &value.kind {
                ExprKind::Match { arms, .. } => {
                    assert_eq!(arms.len(), 3);
                    assert!(arms[1].guard.is_some());
                    assert_eq!(arms[2].pattern, Pattern::Wildcard);
                }
                other => panic!("expected Match, got {:?}", other),
            },
            other => panic!("expected Lock, got {:?}", other),
        }
    }

    #[test]
    fn parses_call_index_and_field_postfix_chain() {
        let program = parse("lock x = foo(1, 2)[0].bar;");
        match &program.statements[0].kind {
            StmtKind::Lock { value, .. } => {
                assert!(matches!(value.kind, ExprKind::Field { .. }));
            }
            other => panic!("expected Lock, got {:?}", other),
        }
    }

    #[test]
    fn parses_for_loop_over_range() {
        let program = parse("for i from 0..10 { lock x = i; }");
        assert!(matches!(program.statements[0].kind, StmtKind::For { .. }));
    }

    #[test]
    fn parses_import_side_channel_and_skips_its_statement_slot() {
        let program = parse("from \"math\" import sqrt; lock x = sqrt(4);");
        assert_eq!(program.imports.len(), 1);
        assert_eq!(program.statements.len(), 1);
    }

    #[test]
    fn reports_missing_semicolon_with_position() {
        let (tokens, imports) = Lexer::new("lock x = 1", "test.rv").tokenize().unwrap();
        let err = Parser::parse_program(tokens, imports).unwrap_err();
        assert!(err.message.contains("Semicolon"));
    }
}
