//! AST node types for Desi source files.
//!
//! Type annotations are carried as the raw annotation text; the checker maps
//! them onto its kind lattice lazily. Nodes own their children; a merged
//! `File` produced by the import resolver owns the concatenated `decls`.

use serde::Serialize;

/// A compilation unit: one parsed source file, or the merged result of
/// resolving an entry file plus its imports.
#[derive(Debug, Clone, Default, Serialize)]
pub struct File {
    pub package: Option<PackageDecl>,
    pub imports: Vec<ImportDecl>,
    pub decls: Vec<Decl>,
}

#[derive(Debug, Clone, Serialize)]
pub struct PackageDecl {
    /// Dotted identifier, e.g. `compiler.desi`.
    pub name: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct ImportDecl {
    /// Dotted import path, e.g. `util.strings`.
    pub path: String,
}

#[derive(Debug, Clone, Serialize)]
pub enum Decl {
    Func(FuncDecl),
}

#[derive(Debug, Clone, Serialize)]
pub struct FuncDecl {
    pub name: String,
    pub params: Vec<Param>,
    /// Return type annotation text (empty means void).
    pub ret: String,
    pub body: Vec<Stmt>,
}

#[derive(Debug, Clone, Serialize)]
pub struct Param {
    pub name: String,
    pub ty: String,
}

/// One name on the left side of a `let`, with an optional per-name type.
#[derive(Debug, Clone, Serialize)]
pub struct LetBind {
    pub name: String,
    pub ty: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub enum Stmt {
    /// `let [mut] a, b: int = e1, e2` or `let (a: int, b): T = ...`
    Let {
        mutable: bool,
        binds: Vec<LetBind>,
        /// Optional group annotation after a parenthesized bind list.
        group_ty: Option<String>,
        values: Vec<Expr>,
    },
    /// `a := e` or `a, b := e1, e2`
    Assign { names: Vec<String>, values: Vec<Expr> },
    /// `return` or `return e`
    Return { value: Option<Expr> },
    /// Bare expression terminated by a newline.
    Expr { expr: Expr },
    If {
        cond: Expr,
        then_: Vec<Stmt>,
        elifs: Vec<ElseIf>,
        else_: Option<Vec<Stmt>>,
    },
    While { cond: Expr, body: Vec<Stmt> },
    /// `defer f(...)` — scheduled before every return site, LIFO.
    Defer { call: Expr },
}

#[derive(Debug, Clone, Serialize)]
pub struct ElseIf {
    pub cond: Expr,
    pub body: Vec<Stmt>,
}

#[derive(Debug, Clone, Serialize)]
pub enum Expr {
    Ident(String),
    /// Integer literal, lexeme preserved (`42`, `0xff`, `0b1010`).
    Int(String),
    /// String literal, decoded value (no quotes, escapes resolved).
    Str(String),
    Bool(bool),
    Unary {
        op: UnOp,
        expr: Box<Expr>,
    },
    Binary {
        op: BinOp,
        lhs: Box<Expr>,
        rhs: Box<Expr>,
    },
    Call {
        callee: Box<Expr>,
        args: Vec<Expr>,
    },
    Index {
        seq: Box<Expr>,
        index: Box<Expr>,
    },
    Field {
        base: Box<Expr>,
        name: String,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum UnOp {
    Neg,
    Bang,
    Not,
}

impl UnOp {
    pub fn as_str(self) -> &'static str {
        match self {
            UnOp::Neg => "-",
            UnOp::Bang => "!",
            UnOp::Not => "not",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum BinOp {
    // pipeline (lowest precedence)
    Pipe,
    // logical words
    Or,
    And,
    // equality
    Eq,
    Ne,
    // relational
    Lt,
    Le,
    Gt,
    Ge,
    // arithmetic
    Add,
    Sub,
    Mul,
    Div,
    Rem,
}

impl BinOp {
    pub fn as_str(self) -> &'static str {
        match self {
            BinOp::Pipe => "|>",
            BinOp::Or => "or",
            BinOp::And => "and",
            BinOp::Eq => "==",
            BinOp::Ne => "!=",
            BinOp::Lt => "<",
            BinOp::Le => "<=",
            BinOp::Gt => ">",
            BinOp::Ge => ">=",
            BinOp::Add => "+",
            BinOp::Sub => "-",
            BinOp::Mul => "*",
            BinOp::Div => "/",
            BinOp::Rem => "%",
        }
    }
}

impl std::fmt::Display for UnOp {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::fmt::Display for BinOp {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
