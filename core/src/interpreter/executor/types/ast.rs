//! Abstract Syntax Tree node types
//!
//! Statement children are held behind `Rc` so execution frames can point at
//! the node they run without copying the subtree.

use super::values::Val;
use serde::{Deserialize, Serialize};
use std::rc::Rc;

pub type StmtRef = Rc<Stmt>;

/* ===================== Statements ===================== */

/// Statement AST node
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum Stmt {
    /// Statement list (a `{ ... }` block or a whole program)
    Block {
        body: Vec<StmtRef>,
        line: usize,
        end_line: usize,
    },
    /// `a = x;`, `a, b = x, y;` or `var a;` (no values, every target set to null)
    Assign {
        targets: Vec<Target>,
        values: Vec<Expr>,
        line: usize,
    },
    /// `const a = 1, b = 2;`
    Const {
        bindings: Vec<Binding>,
        line: usize,
    },
    Expr {
        expr: Expr,
        line: usize,
    },
    Return {
        value: Option<Expr>,
        line: usize,
    },
    Throw {
        value: Expr,
        line: usize,
    },
    Function {
        def: Rc<FunctionDef>,
        line: usize,
    },
    /// if / else if / else
    Condition {
        branches: Vec<Branch>,
        else_branch: Option<ElseBranch>,
        line: usize,
        end_line: usize,
    },
    /// while
    Cycle {
        cond: Expr,
        body: StmtRef,
        line: usize,
        end_line: usize,
    },
    /// do { } while cond;
    DoCycle {
        body: StmtRef,
        cond: Expr,
        cond_line: usize,
        line: usize,
        end_line: usize,
    },
    /// retry tries { } while cond;
    Retry {
        tries: Expr,
        body: StmtRef,
        cond: Expr,
        cond_line: usize,
        line: usize,
        end_line: usize,
    },
    TryCatch {
        body: StmtRef,
        handler: StmtRef,
        catch_line: usize,
        line: usize,
        end_line: usize,
    },
    Include {
        module: String,
        line: usize,
    },
    /// Ends the whole run, from any depth
    Exit {
        line: usize,
    },
    /// Pause for a number of seconds
    Delay {
        seconds: Expr,
        line: usize,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Branch {
    pub cond: Expr,
    pub line: usize,
    pub body: StmtRef,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ElseBranch {
    pub line: usize,
    pub body: StmtRef,
}

/// User function declaration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FunctionDef {
    pub name: String,
    pub params: Vec<String>,
    pub body: StmtRef,
    pub line: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Binding {
    pub name: String,
    pub value: Expr,
}

/// Assignment target: a variable optionally followed by index/field accessors
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Target {
    pub name: String,
    pub path: Vec<Accessor>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum Accessor {
    Index { index: Expr },
    Field { name: String },
}

impl Stmt {
    /// Source line the statement starts on
    pub fn line(&self) -> usize {
        match self {
            Stmt::Block { line, .. }
            | Stmt::Assign { line, .. }
            | Stmt::Const { line, .. }
            | Stmt::Expr { line, .. }
            | Stmt::Return { line, .. }
            | Stmt::Throw { line, .. }
            | Stmt::Function { line, .. }
            | Stmt::Condition { line, .. }
            | Stmt::Cycle { line, .. }
            | Stmt::DoCycle { line, .. }
            | Stmt::Retry { line, .. }
            | Stmt::TryCatch { line, .. }
            | Stmt::Include { line, .. }
            | Stmt::Exit { line }
            | Stmt::Delay { line, .. } => *line,
        }
    }

    /// Last source line of the statement's span
    pub fn end_line(&self) -> usize {
        match self {
            Stmt::Block { end_line, .. }
            | Stmt::Condition { end_line, .. }
            | Stmt::Cycle { end_line, .. }
            | Stmt::DoCycle { end_line, .. }
            | Stmt::Retry { end_line, .. }
            | Stmt::TryCatch { end_line, .. } => *end_line,
            other => other.line(),
        }
    }

    /// Line of the first step this statement reports, `None` for an empty block
    pub fn entry_line(&self) -> Option<usize> {
        match self {
            Stmt::Block { body, .. } => body.iter().find_map(|s| s.entry_line()),
            other => Some(other.line()),
        }
    }
}

/* ===================== Expressions ===================== */

/// Expression AST node
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum Expr {
    Ident {
        name: String,
        line: usize,
    },
    Lit {
        value: Val,
        line: usize,
    },
    Array {
        items: Vec<Expr>,
        line: usize,
    },
    Unary {
        op: UnaryOp,
        operand: Box<Expr>,
        line: usize,
    },
    Binary {
        op: BinaryOp,
        left: Box<Expr>,
        right: Box<Expr>,
        line: usize,
    },
    Index {
        object: Box<Expr>,
        index: Box<Expr>,
        line: usize,
    },
    Member {
        object: Box<Expr>,
        property: String,
        line: usize,
    },
    /// Procedure call
    Call(Call),
}

/// Procedure call: local when `target` is `None`, remote otherwise
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Call {
    pub name: String,
    pub args: Vec<Expr>,
    /// `@ "service/interface"`
    pub target: Option<Box<Expr>>,
    pub line: usize,
}

impl Expr {
    pub fn line(&self) -> usize {
        match self {
            Expr::Ident { line, .. }
            | Expr::Lit { line, .. }
            | Expr::Array { line, .. }
            | Expr::Unary { line, .. }
            | Expr::Binary { line, .. }
            | Expr::Index { line, .. }
            | Expr::Member { line, .. } => *line,
            Expr::Call(call) => call.line,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum UnaryOp {
    Not,
    Neg,
    Plus,
    Cast(CastKind),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CastKind {
    Int,
    Float,
    Str,
    Bool,
}

impl CastKind {
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "int" => Some(CastKind::Int),
            "float" => Some(CastKind::Float),
            "string" => Some(CastKind::Str),
            "bool" => Some(CastKind::Bool),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BinaryOp {
    Or,
    And,
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
    Add,
    Sub,
    Mul,
    Div,
    Mod,
}

impl BinaryOp {
    /// Binding power; higher binds tighter. All operators are left-associative.
    pub fn precedence(self) -> u8 {
        match self {
            BinaryOp::Or => 1,
            BinaryOp::And => 2,
            BinaryOp::Eq | BinaryOp::Ne => 3,
            BinaryOp::Lt | BinaryOp::Le | BinaryOp::Gt | BinaryOp::Ge => 4,
            BinaryOp::Add | BinaryOp::Sub => 5,
            BinaryOp::Mul | BinaryOp::Div | BinaryOp::Mod => 6,
        }
    }

    pub fn symbol(self) -> &'static str {
        match self {
            BinaryOp::Or => "||",
            BinaryOp::And => "&&",
            BinaryOp::Eq => "==",
            BinaryOp::Ne => "!=",
            BinaryOp::Lt => "<",
            BinaryOp::Le => "<=",
            BinaryOp::Gt => ">",
            BinaryOp::Ge => ">=",
            BinaryOp::Add => "+",
            BinaryOp::Sub => "-",
            BinaryOp::Mul => "*",
            BinaryOp::Div => "/",
            BinaryOp::Mod => "%",
        }
    }
}

/* ===================== Nodes ===================== */

/// Any AST node, as accepted by `visit`
///
/// The node's category decides the shape of its result: expressions produce
/// a value, statements produce a step sequence.
#[derive(Debug, Clone, PartialEq)]
pub enum Node {
    Expr(Expr),
    Stmt(StmtRef),
}

impl Node {
    pub fn line(&self) -> usize {
        match self {
            Node::Expr(expr) => expr.line(),
            Node::Stmt(stmt) => stmt.line(),
        }
    }
}

impl From<Expr> for Node {
    fn from(expr: Expr) -> Self {
        Node::Expr(expr)
    }
}

impl From<Stmt> for Node {
    fn from(stmt: Stmt) -> Self {
        Node::Stmt(Rc::new(stmt))
    }
}

impl From<StmtRef> for Node {
    fn from(stmt: StmtRef) -> Self {
        Node::Stmt(stmt)
    }
}
