//! Recursive-descent parser for workflow scripts
//!
//! Produces the AST executed by the executor. Function headers are recorded
//! in the unit's symbol table before their bodies are parsed, so calls that
//! appear earlier in the file (or recursively) can be checked by the linker.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::rc::Rc;
use thiserror::Error;

use super::executor::errors::ScriptError;
use super::executor::types::ast::{
    Accessor, BinaryOp, Binding, Branch, Call, CastKind, ElseBranch, Expr, FunctionDef, Stmt,
    StmtRef, Target, UnaryOp,
};
use super::executor::types::Val;
use super::lexer::{self, Keyword, LexError, Punct, Token, TokenKind, Tokens};

pub mod linker;


/* ===================== Program ===================== */

/// A parsed compilation unit (a script file or an included module)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Program {
    /// Name the unit was loaded under (file path or module name)
    pub name: String,
    /// Top-level statement list
    pub body: StmtRef,
    /// Functions declared anywhere in the unit
    pub symbols: SymbolTable,
}

impl Program {
    /// Every function declaration in the unit, in source order
    pub fn functions(&self) -> Vec<Rc<FunctionDef>> {
        linker::declarations(&self.body)
    }
}

/// Function signature recorded when the parser reads a function header
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Signature {
    pub arity: usize,
    pub line: usize,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SymbolTable {
    functions: BTreeMap<String, Signature>,
}

impl SymbolTable {
    /// Record a declaration
    ///
    /// Redeclaring a name with the same arity replaces the earlier body.
    /// A different arity would leave calls checked against the wrong
    /// signature, so it is rejected.
    pub fn declare(&mut self, name: &str, arity: usize, line: usize) -> ParseResult<()> {
        if let Some(prev) = self.functions.get(name) {
            if prev.arity != arity {
                return Err(ParseError {
                    line,
                    expected: format!(
                        "{} parameter(s) for '{}' as declared on line {}",
                        prev.arity, name, prev.line
                    ),
                    found: arity.to_string(),
                });
            }
            tracing::warn!(
                function = name,
                first_line = prev.line,
                line,
                "function declared more than once, the last declaration wins"
            );
        }
        self.functions
            .insert(name.to_string(), Signature { arity, line });
        Ok(())
    }

    pub fn get(&self, name: &str) -> Option<&Signature> {
        self.functions.get(name)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.functions.keys().map(String::as_str)
    }
}

/* ===================== Error Types ===================== */

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("line {line}: expected {expected}, found {found}")]
pub struct ParseError {
    pub line: usize,
    pub expected: String,
    pub found: String,
}

pub type ParseResult<T> = Result<T, ParseError>;

/// Deepest nesting of expressions and blocks the parser descends into
pub const MAX_NESTING: usize = 128;

/* ===================== Public API ===================== */

/// Lex and parse a source string
pub fn parse(source: &str) -> Result<Program, ScriptError> {
    parse_named("<script>", source)
}

/// Lex and parse a source string, recording `name` on the program
pub fn parse_named(name: &str, source: &str) -> Result<Program, ScriptError> {
    let parser = Parser::new(lexer::tokenize(source))?;
    Ok(parser.parse_program(name)?)
}

/// Parse, then link the unit so every local call is checked before it runs
pub fn load(name: &str, source: &str) -> Result<Program, ScriptError> {
    let program = parse_named(name, source)?;
    linker::link(&program)?;
    Ok(program)
}

/// Report every error in a source instead of stopping at the first
///
/// After a syntax error the parser skips to the next statement and carries
/// on, so one mistake can produce follow-on errors. Linking only runs when
/// the unit parsed cleanly.
pub fn check(name: &str, source: &str) -> Vec<ScriptError> {
    let parser = match Parser::new(lexer::tokenize(source)) {
        Ok(parser) => parser,
        Err(err) => return vec![err.into()],
    };
    let (program, errors) = parser.parse_recovering(name);
    if !errors.is_empty() {
        return errors.into_iter().map(ScriptError::from).collect();
    }
    match linker::link(&program) {
        Ok(()) => Vec::new(),
        Err(err) => vec![err.into()],
    }
}

/* ===================== Parser ===================== */

pub struct Parser {
    tokens: Vec<Token>,
    pos: usize,
    depth: usize,
    symbols: SymbolTable,
}

impl Parser {
    /// Drain the token stream; lexing errors abort before parsing starts
    pub fn new(tokens: Tokens) -> Result<Self, LexError> {
        let mut tokens = tokens.collect::<Result<Vec<_>, _>>()?;
        if tokens.is_empty() {
            tokens.push(Token {
                kind: TokenKind::Eof,
                line: 1,
            });
        }
        Ok(Parser {
            tokens,
            pos: 0,
            depth: 0,
            symbols: SymbolTable::default(),
        })
    }

    pub fn parse_program(mut self, name: &str) -> ParseResult<Program> {
        let line = self.peek().line;
        let mut body = Vec::new();
        while !self.at_eof() {
            if let Some(stmt) = self.statement()? {
                body.push(stmt);
            }
        }
        Ok(self.finish(name, body, line))
    }

    /// Parse the whole unit, collecting errors and resynchronizing after each
    pub fn parse_recovering(mut self, name: &str) -> (Program, Vec<ParseError>) {
        let line = self.peek().line;
        let mut body = Vec::new();
        let mut errors = Vec::new();
        while !self.at_eof() {
            match self.statement() {
                Ok(Some(stmt)) => body.push(stmt),
                Ok(None) => {}
                Err(err) => {
                    tracing::debug!(line = err.line, error = %err, "recovering");
                    errors.push(err);
                    self.synchronize();
                }
            }
        }
        (self.finish(name, body, line), errors)
    }

    fn finish(self, name: &str, body: Vec<StmtRef>, line: usize) -> Program {
        let end_line = self.peek().line;
        Program {
            name: name.to_string(),
            body: Rc::new(Stmt::Block {
                body,
                line,
                end_line,
            }),
            symbols: self.symbols,
        }
    }

    /// Skip past the broken statement: up to a `;` or `}`, or to the next
    /// statement keyword
    fn synchronize(&mut self) {
        self.depth = 0;
        while !self.at_eof() {
            let tok = self.advance();
            if matches!(
                tok.kind,
                TokenKind::Punct(Punct::Semicolon) | TokenKind::Punct(Punct::RBrace)
            ) {
                return;
            }
            if self.starts_statement() {
                return;
            }
        }
    }

    fn starts_statement(&self) -> bool {
        matches!(
            self.peek().kind,
            TokenKind::Keyword(
                Keyword::If
                    | Keyword::While
                    | Keyword::Do
                    | Keyword::Retry
                    | Keyword::Try
                    | Keyword::Function
                    | Keyword::Include
                    | Keyword::Var
                    | Keyword::Const
                    | Keyword::Return
                    | Keyword::Throw
                    | Keyword::Exit
                    | Keyword::Delay
            )
        )
    }

    /* ---------- token helpers ---------- */

    fn peek(&self) -> &Token {
        let idx = self.pos.min(self.tokens.len() - 1);
        &self.tokens[idx]
    }

    fn peek_kind_at(&self, offset: usize) -> &TokenKind {
        let idx = (self.pos + offset).min(self.tokens.len() - 1);
        &self.tokens[idx].kind
    }

    fn advance(&mut self) -> Token {
        let tok = self.peek().clone();
        if self.pos < self.tokens.len() - 1 {
            self.pos += 1;
        }
        tok
    }

    fn at_eof(&self) -> bool {
        self.peek().kind == TokenKind::Eof
    }

    fn check_punct(&self, p: Punct) -> bool {
        self.peek().kind == TokenKind::Punct(p)
    }

    fn check_keyword(&self, kw: Keyword) -> bool {
        self.peek().kind == TokenKind::Keyword(kw)
    }

    fn error(&self, expected: impl Into<String>) -> ParseError {
        let tok = self.peek();
        ParseError {
            line: tok.line,
            expected: expected.into(),
            found: tok.kind.to_string(),
        }
    }

    /// Consume the punctuation token or fail; returns its line
    fn eat_punct(&mut self, p: Punct) -> ParseResult<usize> {
        if self.check_punct(p) {
            Ok(self.advance().line)
        } else {
            Err(self.error(format!("'{}'", p.as_str())))
        }
    }

    fn eat_keyword(&mut self, kw: Keyword) -> ParseResult<usize> {
        if self.check_keyword(kw) {
            Ok(self.advance().line)
        } else {
            Err(self.error(format!("'{}'", kw.as_str())))
        }
    }

    /// Run `f` one nesting level deeper
    fn nested<T>(&mut self, f: impl FnOnce(&mut Self) -> ParseResult<T>) -> ParseResult<T> {
        if self.depth >= MAX_NESTING {
            return Err(self.error("shallower nesting"));
        }
        self.depth += 1;
        let result = f(self);
        self.depth -= 1;
        result
    }

    fn eat_ident(&mut self) -> ParseResult<(String, usize)> {
        match &self.peek().kind {
            TokenKind::Ident(name) => {
                let name = name.clone();
                let line = self.advance().line;
                Ok((name, line))
            }
            _ => Err(self.error("identifier")),
        }
    }

    /* ---------- statements ---------- */

    /// Parse one statement; an empty statement (`;`) yields `None`
    fn statement(&mut self) -> ParseResult<Option<StmtRef>> {
        let stmt = match &self.peek().kind {
            TokenKind::Punct(Punct::Semicolon) => {
                self.advance();
                return Ok(None);
            }
            TokenKind::Keyword(Keyword::If) => self.if_statement()?,
            TokenKind::Keyword(Keyword::While) => self.while_statement()?,
            TokenKind::Keyword(Keyword::Do) => self.do_statement()?,
            TokenKind::Keyword(Keyword::Retry) => self.retry_statement()?,
            TokenKind::Keyword(Keyword::Try) => self.try_statement()?,
            TokenKind::Keyword(Keyword::Function) => self.function_statement()?,
            TokenKind::Keyword(Keyword::Include) => self.include_statement()?,
            TokenKind::Keyword(Keyword::Var) => self.var_statement()?,
            TokenKind::Keyword(Keyword::Const) => self.const_statement()?,
            TokenKind::Keyword(Keyword::Return) => self.return_statement()?,
            TokenKind::Keyword(Keyword::Throw) => self.throw_statement()?,
            TokenKind::Keyword(Keyword::Exit) => {
                let line = self.advance().line;
                self.eat_punct(Punct::Semicolon)?;
                Stmt::Exit { line }
            }
            TokenKind::Keyword(Keyword::Delay) => {
                let line = self.advance().line;
                let seconds = self.expr()?;
                self.eat_punct(Punct::Semicolon)?;
                Stmt::Delay { seconds, line }
            }
            _ => self.expression_statement()?,
        };
        Ok(Some(Rc::new(stmt)))
    }

    /// `{ stmt* }` or a single statement
    fn block(&mut self) -> ParseResult<StmtRef> {
        self.nested(Self::block_body)
    }

    fn block_body(&mut self) -> ParseResult<StmtRef> {
        if self.check_punct(Punct::LBrace) {
            let line = self.advance().line;
            let mut body = Vec::new();
            while !self.check_punct(Punct::RBrace) {
                if self.at_eof() {
                    return Err(self.error("'}'"));
                }
                if let Some(stmt) = self.statement()? {
                    body.push(stmt);
                }
            }
            let end_line = self.eat_punct(Punct::RBrace)?;
            return Ok(Rc::new(Stmt::Block {
                body,
                line,
                end_line,
            }));
        }

        let line = self.peek().line;
        let stmt = self.statement()?;
        let end_line = stmt.as_ref().map_or(line, |s| s.end_line());
        Ok(Rc::new(Stmt::Block {
            body: stmt.into_iter().collect(),
            line,
            end_line,
        }))
    }

    fn if_statement(&mut self) -> ParseResult<Stmt> {
        let line = self.eat_keyword(Keyword::If)?;
        let cond = self.expr()?;
        let body = self.block()?;
        let mut end_line = body.end_line();
        let mut branches = vec![Branch { cond, line, body }];
        let mut else_branch = None;

        while self.check_keyword(Keyword::Else) {
            let else_line = self.advance().line;
            if self.check_keyword(Keyword::If) {
                let line = self.advance().line;
                let cond = self.expr()?;
                let body = self.block()?;
                end_line = body.end_line();
                branches.push(Branch { cond, line, body });
            } else {
                let body = self.block()?;
                end_line = body.end_line();
                else_branch = Some(ElseBranch {
                    line: else_line,
                    body,
                });
                break;
            }
        }

        Ok(Stmt::Condition {
            branches,
            else_branch,
            line,
            end_line,
        })
    }

    fn while_statement(&mut self) -> ParseResult<Stmt> {
        let line = self.eat_keyword(Keyword::While)?;
        let cond = self.expr()?;
        let body = self.block()?;
        let end_line = body.end_line();
        Ok(Stmt::Cycle {
            cond,
            body,
            line,
            end_line,
        })
    }

    fn do_statement(&mut self) -> ParseResult<Stmt> {
        let line = self.eat_keyword(Keyword::Do)?;
        let body = self.block()?;
        let cond_line = self.eat_keyword(Keyword::While)?;
        let cond = self.expr()?;
        let end_line = self.eat_punct(Punct::Semicolon)?;
        Ok(Stmt::DoCycle {
            body,
            cond,
            cond_line,
            line,
            end_line,
        })
    }

    fn retry_statement(&mut self) -> ParseResult<Stmt> {
        let line = self.eat_keyword(Keyword::Retry)?;
        let tries = self.expr()?;
        let body = self.block()?;
        let cond_line = self.eat_keyword(Keyword::While)?;
        let cond = self.expr()?;
        let end_line = self.eat_punct(Punct::Semicolon)?;
        Ok(Stmt::Retry {
            tries,
            body,
            cond,
            cond_line,
            line,
            end_line,
        })
    }

    fn try_statement(&mut self) -> ParseResult<Stmt> {
        let line = self.eat_keyword(Keyword::Try)?;
        let body = self.block()?;
        let catch_line = self.eat_keyword(Keyword::Catch)?;
        let handler = self.block()?;
        let end_line = handler.end_line();
        Ok(Stmt::TryCatch {
            body,
            handler,
            catch_line,
            line,
            end_line,
        })
    }

    fn function_statement(&mut self) -> ParseResult<Stmt> {
        let line = self.eat_keyword(Keyword::Function)?;
        let (name, _) = self.eat_ident()?;
        self.eat_punct(Punct::LParen)?;
        let mut params = Vec::new();
        if !self.check_punct(Punct::RParen) {
            loop {
                let (param, _) = self.eat_ident()?;
                params.push(param);
                if self.check_punct(Punct::Comma) {
                    self.advance();
                } else {
                    break;
                }
            }
        }
        self.eat_punct(Punct::RParen)?;

        // Registered before the body so recursive calls link
        self.symbols.declare(&name, params.len(), line)?;

        let body = self.block()?;
        Ok(Stmt::Function {
            def: Rc::new(FunctionDef {
                name,
                params,
                body,
                line,
            }),
            line,
        })
    }

    fn include_statement(&mut self) -> ParseResult<Stmt> {
        let line = self.eat_keyword(Keyword::Include)?;
        let module = match &self.peek().kind {
            TokenKind::Str(s) => s.clone(),
            _ => return Err(self.error("module name string")),
        };
        self.advance();
        self.eat_punct(Punct::Semicolon)?;
        Ok(Stmt::Include { module, line })
    }

    /// `var target (, target)* (= expr (, expr)*)? ;`
    fn var_statement(&mut self) -> ParseResult<Stmt> {
        let line = self.eat_keyword(Keyword::Var)?;
        let mut targets = vec![self.target()?];
        while self.check_punct(Punct::Comma) {
            self.advance();
            targets.push(self.target()?);
        }
        let values = if self.check_punct(Punct::Eq) {
            self.advance();
            self.values_for(targets.len())?
        } else {
            Vec::new()
        };
        self.eat_punct(Punct::Semicolon)?;
        Ok(Stmt::Assign {
            targets,
            values,
            line,
        })
    }

    /// `const NAME = expr (, NAME = expr)* ;`
    fn const_statement(&mut self) -> ParseResult<Stmt> {
        let line = self.eat_keyword(Keyword::Const)?;
        let mut bindings = Vec::new();
        loop {
            let (name, _) = self.eat_ident()?;
            self.eat_punct(Punct::Eq)?;
            let value = self.expr()?;
            bindings.push(Binding { name, value });
            if self.check_punct(Punct::Comma) {
                self.advance();
            } else {
                break;
            }
        }
        self.eat_punct(Punct::Semicolon)?;
        Ok(Stmt::Const { bindings, line })
    }

    fn return_statement(&mut self) -> ParseResult<Stmt> {
        let line = self.eat_keyword(Keyword::Return)?;
        let value = if self.check_punct(Punct::Semicolon) {
            None
        } else {
            Some(self.expr()?)
        };
        self.eat_punct(Punct::Semicolon)?;
        Ok(Stmt::Return { value, line })
    }

    fn throw_statement(&mut self) -> ParseResult<Stmt> {
        let line = self.eat_keyword(Keyword::Throw)?;
        let value = self.expr()?;
        self.eat_punct(Punct::Semicolon)?;
        Ok(Stmt::Throw { value, line })
    }

    /// An expression, or assignment when the expression is followed by `=`
    /// or by a comma-separated target list
    fn expression_statement(&mut self) -> ParseResult<Stmt> {
        let line = self.peek().line;
        let first = self.expr()?;
        if !self.check_punct(Punct::Eq) && !self.check_punct(Punct::Comma) {
            self.eat_punct(Punct::Semicolon)?;
            return Ok(Stmt::Expr { expr: first, line });
        }

        let mut targets = vec![into_target(first, line)?];
        while self.check_punct(Punct::Comma) {
            self.advance();
            let target_line = self.peek().line;
            let expr = self.expr()?;
            targets.push(into_target(expr, target_line)?);
        }
        self.eat_punct(Punct::Eq)?;
        let values = self.values_for(targets.len())?;
        self.eat_punct(Punct::Semicolon)?;
        Ok(Stmt::Assign {
            targets,
            values,
            line,
        })
    }

    /// One value per assignment target
    fn values_for(&mut self, count: usize) -> ParseResult<Vec<Expr>> {
        let line = self.peek().line;
        let mut values = vec![self.expr()?];
        while self.check_punct(Punct::Comma) {
            self.advance();
            values.push(self.expr()?);
        }
        if values.len() != count {
            return Err(ParseError {
                line,
                expected: format!("{} value(s)", count),
                found: values.len().to_string(),
            });
        }
        Ok(values)
    }

    fn target(&mut self) -> ParseResult<Target> {
        let line = self.peek().line;
        let expr = self.postfix()?;
        into_target(expr, line)
    }

    /* ---------- expressions ---------- */

    pub fn expr(&mut self) -> ParseResult<Expr> {
        self.binary(1)
    }

    fn peek_binary_op(&self) -> Option<BinaryOp> {
        let TokenKind::Punct(p) = self.peek().kind else {
            return None;
        };
        let op = match p {
            Punct::OrOr => BinaryOp::Or,
            Punct::AndAnd => BinaryOp::And,
            Punct::EqEq => BinaryOp::Eq,
            Punct::BangEq => BinaryOp::Ne,
            Punct::Lt => BinaryOp::Lt,
            Punct::LtEq => BinaryOp::Le,
            Punct::Gt => BinaryOp::Gt,
            Punct::GtEq => BinaryOp::Ge,
            Punct::Plus => BinaryOp::Add,
            Punct::Minus => BinaryOp::Sub,
            Punct::Star => BinaryOp::Mul,
            Punct::Slash => BinaryOp::Div,
            Punct::Percent => BinaryOp::Mod,
            _ => return None,
        };
        Some(op)
    }

    /// Precedence climbing; every level is left-associative
    fn binary(&mut self, min_prec: u8) -> ParseResult<Expr> {
        let mut left = self.unary()?;
        while let Some(op) = self.peek_binary_op() {
            if op.precedence() < min_prec {
                break;
            }
            let line = self.advance().line;
            let right = self.binary(op.precedence() + 1)?;
            left = Expr::Binary {
                op,
                left: Box::new(left),
                right: Box::new(right),
                line,
            };
        }
        Ok(left)
    }

    fn cast_ahead(&self) -> Option<CastKind> {
        if !self.check_punct(Punct::LParen) {
            return None;
        }
        let TokenKind::Ident(name) = self.peek_kind_at(1) else {
            return None;
        };
        if *self.peek_kind_at(2) != TokenKind::Punct(Punct::RParen) {
            return None;
        }
        CastKind::from_name(name)
    }

    fn unary(&mut self) -> ParseResult<Expr> {
        self.nested(Self::unary_body)
    }

    fn unary_body(&mut self) -> ParseResult<Expr> {
        let line = self.peek().line;
        let op = match self.peek().kind {
            TokenKind::Punct(Punct::Bang) => Some(UnaryOp::Not),
            TokenKind::Punct(Punct::Minus) => Some(UnaryOp::Neg),
            TokenKind::Punct(Punct::Plus) => Some(UnaryOp::Plus),
            _ => None,
        };
        if let Some(op) = op {
            self.advance();
            let operand = self.unary()?;
            return Ok(match (op, operand) {
                (UnaryOp::Neg, Expr::Lit { value: Val::Int(i), .. }) => Expr::Lit {
                    value: Val::Int(i.wrapping_neg()),
                    line,
                },
                (UnaryOp::Neg, Expr::Lit { value: Val::Float(x), .. }) => Expr::Lit {
                    value: Val::Float(-x),
                    line,
                },
                (op, operand) => Expr::Unary {
                    op,
                    operand: Box::new(operand),
                    line,
                },
            });
        }

        if let Some(kind) = self.cast_ahead() {
            self.advance();
            self.advance();
            self.advance();
            let operand = self.unary()?;
            return Ok(Expr::Unary {
                op: UnaryOp::Cast(kind),
                operand: Box::new(operand),
                line,
            });
        }

        self.postfix()
    }

    fn postfix(&mut self) -> ParseResult<Expr> {
        let mut expr = self.primary()?;
        loop {
            if self.check_punct(Punct::LBracket) {
                let line = self.advance().line;
                let index = self.expr()?;
                self.eat_punct(Punct::RBracket)?;
                expr = Expr::Index {
                    object: Box::new(expr),
                    index: Box::new(index),
                    line,
                };
            } else if self.check_punct(Punct::Dot) {
                let line = self.advance().line;
                let (property, _) = self.eat_ident()?;
                expr = Expr::Member {
                    object: Box::new(expr),
                    property,
                    line,
                };
            } else {
                break;
            }
        }
        Ok(expr)
    }

    fn primary(&mut self) -> ParseResult<Expr> {
        let tok = self.peek().clone();
        let line = tok.line;
        let lit = |value: Val| Expr::Lit { value, line };

        match tok.kind {
            TokenKind::Int(i) => {
                self.advance();
                Ok(lit(Val::Int(i)))
            }
            TokenKind::Float(x) => {
                self.advance();
                Ok(lit(Val::Float(x)))
            }
            TokenKind::Str(s) => {
                self.advance();
                Ok(lit(Val::Str(s)))
            }
            TokenKind::Keyword(Keyword::True) => {
                self.advance();
                Ok(lit(Val::Bool(true)))
            }
            TokenKind::Keyword(Keyword::False) => {
                self.advance();
                Ok(lit(Val::Bool(false)))
            }
            TokenKind::Keyword(Keyword::Null) => {
                self.advance();
                Ok(lit(Val::Null))
            }
            TokenKind::Punct(Punct::LBracket) => {
                self.advance();
                let items = self.expr_list(Punct::RBracket)?;
                Ok(Expr::Array { items, line })
            }
            TokenKind::Punct(Punct::LParen) => {
                self.advance();
                let inner = self.expr()?;
                self.eat_punct(Punct::RParen)?;
                Ok(inner)
            }
            TokenKind::Ident(name) => {
                self.advance();
                if !self.check_punct(Punct::LParen) {
                    return Ok(Expr::Ident { name, line });
                }
                self.advance();
                let args = self.expr_list(Punct::RParen)?;
                let target = if self.check_punct(Punct::At) {
                    self.advance();
                    Some(Box::new(self.unary()?))
                } else {
                    None
                };
                Ok(Expr::Call(Call {
                    name,
                    args,
                    target,
                    line,
                }))
            }
            _ => Err(self.error("expression")),
        }
    }

    /// Comma-separated expressions up to and including `close`
    fn expr_list(&mut self, close: Punct) -> ParseResult<Vec<Expr>> {
        let mut items = Vec::new();
        if !self.check_punct(close) {
            loop {
                items.push(self.expr()?);
                if self.check_punct(Punct::Comma) {
                    self.advance();
                } else {
                    break;
                }
            }
        }
        self.eat_punct(close)?;
        Ok(items)
    }
}

/// Turn a parsed expression into the place it names: a variable with an
/// optional chain of `[index]` and `.field` accessors
fn into_target(expr: Expr, line: usize) -> ParseResult<Target> {
    let mut path = Vec::new();
    let mut expr = expr;
    loop {
        match expr {
            Expr::Ident { name, .. } => {
                path.reverse();
                return Ok(Target { name, path });
            }
            Expr::Index { object, index, .. } => {
                path.push(Accessor::Index { index: *index });
                expr = *object;
            }
            Expr::Member {
                object, property, ..
            } => {
                path.push(Accessor::Field { name: property });
                expr = *object;
            }
            other => {
                return Err(ParseError {
                    line,
                    expected: "assignment target".to_string(),
                    found: describe(&other).to_string(),
                })
            }
        }
    }
}

fn describe(expr: &Expr) -> &'static str {
    match expr {
        Expr::Lit { .. } => "literal",
        Expr::Array { .. } => "array",
        Expr::Call(_) => "call",
        Expr::Unary { .. } | Expr::Binary { .. } => "operator expression",
        Expr::Ident { .. } | Expr::Index { .. } | Expr::Member { .. } => "variable",
    }
}
