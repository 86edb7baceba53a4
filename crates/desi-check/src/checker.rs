//! Semantic checker.
//!
//! Pass 1 collects function signatures; pass 2 walks each body with a scope
//! chain and a stack of block-returned flags for return-flow analysis.
//! Errors and warnings are accumulated, never fail-fast: a broken statement
//! still lets the rest of the function produce diagnostics.

use std::collections::HashMap;

use desi_ast::ast::{BinOp, Decl, Expr, File, FuncDecl, Stmt};

use crate::kind::{map_text_type, unify, Kind};
use crate::scope::{ScopeStack, VarInfo};

#[derive(Debug, Clone, Default)]
pub struct FuncSig {
    pub name: String,
    pub params: Vec<Kind>,
    pub ret: Kind,
}

/// Checker output consumed by the emitter: the function table.
#[derive(Debug, Clone, Default)]
pub struct Info {
    pub funcs: HashMap<String, FuncSig>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CheckError {
    DuplicateFunction { name: String },
    ParamRedeclaration { index: usize, name: String },
    Redeclaration { name: String },
    /// Grouped-binding arity mismatch in a `let` or assignment.
    ArityMismatch {
        context: &'static str,
        names: usize,
        values: usize,
    },
    LetTypeMismatch {
        name: String,
        declared: Kind,
        actual: Kind,
    },
    AssignUndeclared { name: String },
    AssignImmutable { name: String },
    AssignTypeMismatch {
        name: String,
        have: Kind,
        got: Kind,
    },
    MissingReturnValue { expected: Kind },
    ReturnValueInVoid,
    ReturnKindMismatch { expected: Kind, got: Kind },
    CondKind {
        construct: &'static str,
        got: Kind,
    },
    DeferPlacement,
    DeferNotCall,
    UndeclaredIdent { name: String },
    UnknownFunction { name: String },
    CallArity {
        name: String,
        want: usize,
        got: usize,
    },
    CallArgKind {
        name: String,
        index: usize,
        want: Kind,
        got: Kind,
    },
    PrintlnVoidArg { index: usize },
    PrintlnBadArg { index: usize, kind: Kind },
    ShimArity {
        shim: &'static str,
        want: &'static str,
        got: usize,
    },
    ShimArgKind {
        shim: &'static str,
        what: &'static str,
        want: &'static str,
        got: Kind,
    },
}

impl std::fmt::Display for CheckError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        use CheckError::*;
        match self {
            DuplicateFunction { name } => write!(f, "duplicate function {name:?}"),
            ParamRedeclaration { index, name } => {
                write!(f, "parameter {index} {name:?}: redeclaration of {name:?}")
            }
            Redeclaration { name } => write!(f, "redeclaration of {name:?}"),
            ArityMismatch {
                context,
                names,
                values,
            } => write!(
                f,
                "DTE0002: arity mismatch in grouped binding in {context}: names={names}, values={values}"
            ),
            LetTypeMismatch {
                name,
                declared,
                actual,
            } => write!(
                f,
                "let {name:?}: type mismatch (declared {declared}, got {actual})"
            ),
            AssignUndeclared { name } => write!(f, "assign to undeclared variable {name:?}"),
            AssignImmutable { name } => {
                write!(f, "cannot assign to immutable variable {name:?}")
            }
            AssignTypeMismatch { name, have, got } => {
                write!(f, "type mismatch: {name:?} is {have} but assigned {got}")
            }
            MissingReturnValue { expected } => {
                write!(f, "missing return value; function returns {expected}")
            }
            ReturnValueInVoid => write!(f, "return value in function returning void"),
            ReturnKindMismatch { expected, got } => {
                write!(f, "return kind mismatch: have {expected}, got {got}")
            }
            CondKind { construct, got } => {
                write!(f, "{construct}-condition must be bool/int, got {got}")
            }
            DeferPlacement => write!(f, "defer is only allowed at function top-level in Stage-0"),
            DeferNotCall => write!(f, "defer expects a call expression"),
            UndeclaredIdent { name } => write!(f, "use of undeclared identifier {name:?}"),
            UnknownFunction { name } => write!(f, "call to unknown function {name:?}"),
            CallArity { name, want, got } => {
                write!(f, "call to {name}: want {want} args, got {got}")
            }
            CallArgKind {
                name,
                index,
                want,
                got,
            } => write!(
                f,
                "call to {name}: arg {index} kind mismatch (want {want}, got {got})"
            ),
            PrintlnVoidArg { index } => {
                write!(f, "io.println arg {index} is void (no value)")
            }
            PrintlnBadArg { index, kind } => {
                write!(f, "io.println arg {index} has unsupported kind {kind}")
            }
            ShimArity { shim, want, got } => {
                write!(f, "{shim}: want {want}, got {got}")
            }
            ShimArgKind {
                shim,
                what,
                want,
                got,
            } => write!(f, "{shim}: {what} must be {want}, got {got}"),
        }
    }
}

impl std::error::Error for CheckError {}

/// A lightweight compiler warning.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Warning {
    pub code: &'static str,
    pub msg: String,
}

impl std::fmt::Display for Warning {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.code, self.msg)
    }
}

/// Check a merged file: collect signatures, then check every body.
pub fn check_file(file: &File) -> (Info, Vec<CheckError>, Vec<Warning>) {
    let mut info = Info::default();
    let mut errors = Vec::new();
    let mut warnings = Vec::new();

    for decl in &file.decls {
        let Decl::Func(fun) = decl;
        if info.funcs.contains_key(&fun.name) {
            errors.push(CheckError::DuplicateFunction {
                name: fun.name.clone(),
            });
            continue;
        }
        let params = fun.params.iter().map(|p| map_text_type(&p.ty)).collect();
        info.funcs.insert(
            fun.name.clone(),
            FuncSig {
                name: fun.name.clone(),
                params,
                ret: map_text_type(&fun.ret),
            },
        );
    }

    for decl in &file.decls {
        let Decl::Func(fun) = decl;
        let (fn_errs, fn_warns) = check_func(&info, fun);
        errors.extend(fn_errs);
        warnings.extend(fn_warns);
    }

    (info, errors, warnings)
}

fn check_func(info: &Info, fun: &FuncDecl) -> (Vec<CheckError>, Vec<Warning>) {
    let sig = info.funcs.get(&fun.name).cloned().unwrap_or_default();
    let mut c = FnChecker {
        info,
        sig,
        errors: Vec::new(),
        warnings: Vec::new(),
        locals: Vec::new(),
        scopes: ScopeStack::new(),
        block_returned: Vec::new(),
    };

    // parameters are immutable locals, already written
    for (i, p) in fun.params.iter().enumerate() {
        let var = VarInfo {
            kind: map_text_type(&p.ty),
            mutable: false,
            decl_name: p.name.clone(),
            read: false,
            written: true,
        };
        let idx = c.locals.len();
        if c.scopes.define(&p.name, idx) {
            c.locals.push(var);
        } else {
            c.errors.push(CheckError::ParamRedeclaration {
                index: i,
                name: p.name.clone(),
            });
        }
    }

    c.block_returned.push(false);
    for stmt in &fun.body {
        c.check_stmt(stmt);
    }
    let has_return = c.block_returned.pop().unwrap_or(false);

    // non-void fallthrough: codegen synthesizes a default return
    if c.sig.ret != Kind::Void && !has_return {
        c.warnings.push(Warning {
            code: "W0006",
            msg: format!(
                "function {:?} returns {} but may fall through without an explicit return",
                fun.name, c.sig.ret
            ),
        });
    }

    // unused bindings; names starting with "_" opt out
    for var in &c.locals {
        if var.decl_name.starts_with('_') {
            continue;
        }
        if !var.read {
            c.warnings.push(Warning {
                code: "W0001",
                msg: format!("unused variable or parameter {:?}", var.decl_name),
            });
        }
    }

    (c.errors, c.warnings)
}

struct FnChecker<'a> {
    info: &'a Info,
    sig: FuncSig,
    errors: Vec<CheckError>,
    warnings: Vec<Warning>,
    locals: Vec<VarInfo>,
    scopes: ScopeStack,
    block_returned: Vec<bool>,
}

impl<'a> FnChecker<'a> {
    fn mark_returned(&mut self) {
        if let Some(top) = self.block_returned.last_mut() {
            *top = true;
        }
    }

    fn with_block(&mut self, body: &[Stmt]) {
        self.block_returned.push(false);
        self.scopes.push_frame();
        for stmt in body {
            self.check_stmt(stmt);
        }
        self.scopes.pop_frame();
        self.block_returned.pop();
    }

    fn check_stmt(&mut self, stmt: &Stmt) {
        if self.block_returned.last().copied() == Some(true) {
            self.warnings.push(Warning {
                code: "W0004",
                msg: "unreachable code: statement after return".to_string(),
            });
        }

        match stmt {
            Stmt::Let {
                mutable,
                binds,
                values,
                ..
            } => {
                if binds.len() != values.len() {
                    self.errors.push(CheckError::ArityMismatch {
                        context: "let",
                        names: binds.len(),
                        values: values.len(),
                    });
                    // still check the pairs we do have
                }
                let n = binds.len().min(values.len());
                for i in 0..n {
                    let bind = &binds[i];
                    let actual = self.kind_of_expr(&values[i]);

                    let declared = match &bind.ty {
                        Some(text) if !text.trim().is_empty() => map_text_type(text),
                        _ => Kind::Unknown,
                    };
                    let mut kind = actual;
                    if declared != Kind::Unknown {
                        match unify(declared, actual) {
                            Some(k) => kind = k,
                            None => self.errors.push(CheckError::LetTypeMismatch {
                                name: bind.name.clone(),
                                declared,
                                actual,
                            }),
                        }
                    }

                    let var = VarInfo {
                        kind,
                        mutable: *mutable,
                        decl_name: bind.name.clone(),
                        read: false,
                        written: true,
                    };
                    let idx = self.locals.len();
                    if self.scopes.define(&bind.name, idx) {
                        self.locals.push(var);
                    } else {
                        self.errors.push(CheckError::Redeclaration {
                            name: bind.name.clone(),
                        });
                    }
                }
            }

            Stmt::Assign { names, values } => {
                if names.len() != values.len() {
                    self.errors.push(CheckError::ArityMismatch {
                        context: "assignment",
                        names: names.len(),
                        values: values.len(),
                    });
                }
                let n = names.len().min(values.len());
                for i in 0..n {
                    let name = &names[i];
                    let got = self.kind_of_expr(&values[i]);

                    let Some(idx) = self.scopes.lookup(name) else {
                        self.errors.push(CheckError::AssignUndeclared {
                            name: name.clone(),
                        });
                        continue;
                    };
                    if !self.locals[idx].mutable {
                        self.errors.push(CheckError::AssignImmutable {
                            name: name.clone(),
                        });
                        continue;
                    }
                    let have = self.locals[idx].kind;
                    match unify(have, got) {
                        None => self.errors.push(CheckError::AssignTypeMismatch {
                            name: name.clone(),
                            have,
                            got,
                        }),
                        Some(k) => {
                            if have == Kind::Unknown {
                                self.locals[idx].kind = k;
                            }
                        }
                    }
                    self.locals[idx].written = true;
                }
            }

            Stmt::Return { value } => {
                let expected = self.sig.ret;
                match value {
                    None => {
                        if expected != Kind::Void {
                            self.errors.push(CheckError::MissingReturnValue { expected });
                        }
                    }
                    Some(expr) => {
                        let got = self.kind_of_expr(expr);
                        if expected == Kind::Void {
                            self.errors.push(CheckError::ReturnValueInVoid);
                        } else if unify(expected, got).is_none() {
                            self.errors
                                .push(CheckError::ReturnKindMismatch { expected, got });
                        }
                    }
                }
                self.mark_returned();
            }

            Stmt::Expr { expr } => {
                self.kind_of_expr(expr);
            }

            Stmt::If {
                cond,
                then_,
                elifs,
                else_,
            } => {
                self.check_cond("if", cond);
                self.with_block(then_);
                for elif in elifs {
                    self.check_cond("elif", &elif.cond);
                    self.with_block(&elif.body);
                }
                if let Some(body) = else_ {
                    self.with_block(body);
                }
            }

            Stmt::While { cond, body } => {
                self.check_cond("while", cond);
                self.with_block(body);
            }

            Stmt::Defer { call } => {
                if self.block_returned.len() > 1 {
                    self.errors.push(CheckError::DeferPlacement);
                }
                if !matches!(call, Expr::Call { .. }) {
                    self.errors.push(CheckError::DeferNotCall);
                }
                self.kind_of_expr(call);
            }
        }
    }

    fn check_cond(&mut self, construct: &'static str, cond: &Expr) {
        let k = self.kind_of_expr(cond);
        if k != Kind::Bool && k != Kind::Int && k != Kind::Unknown {
            self.errors.push(CheckError::CondKind { construct, got: k });
        }
    }

    /* ---------- expressions ---------- */

    fn kind_of_expr(&mut self, expr: &Expr) -> Kind {
        match expr {
            Expr::Int(_) => Kind::Int,
            Expr::Str(_) => Kind::Str,
            Expr::Bool(_) => Kind::Bool,

            Expr::Ident(name) => {
                if let Some(idx) = self.scopes.lookup(name) {
                    self.locals[idx].read = true;
                    return self.locals[idx].kind;
                }
                // functions are not first-class in Stage-0
                if self.info.funcs.contains_key(name) {
                    return Kind::Unknown;
                }
                self.errors.push(CheckError::UndeclaredIdent {
                    name: name.clone(),
                });
                Kind::Unknown
            }

            Expr::Unary { expr, .. } => {
                let k = self.kind_of_expr(expr);
                if k == Kind::Int || k == Kind::Bool || k == Kind::Unknown {
                    Kind::Int
                } else {
                    Kind::Unknown
                }
            }

            Expr::Binary { op, lhs, rhs } => {
                let lk = self.kind_of_expr(lhs);
                let rk = self.kind_of_expr(rhs);
                match op {
                    BinOp::Add => {
                        // `+` with any str operand is string concatenation
                        if lk == Kind::Str || rk == Kind::Str {
                            Kind::Str
                        } else if lk == Kind::Int && rk == Kind::Int {
                            Kind::Int
                        } else {
                            Kind::Unknown
                        }
                    }
                    BinOp::Sub
                    | BinOp::Mul
                    | BinOp::Div
                    | BinOp::Rem
                    | BinOp::Lt
                    | BinOp::Le
                    | BinOp::Gt
                    | BinOp::Ge
                    | BinOp::Eq
                    | BinOp::Ne => {
                        if unify(lk, rk).is_some() {
                            Kind::Int
                        } else {
                            Kind::Unknown
                        }
                    }
                    BinOp::And | BinOp::Or | BinOp::Pipe => Kind::Int,
                }
            }

            Expr::Field { .. } | Expr::Index { .. } => Kind::Unknown,

            Expr::Call { callee, args } => self.kind_of_call(callee, args),
        }
    }

    fn kind_of_call(&mut self, callee: &Expr, args: &[Expr]) -> Kind {
        // std-shim calls: module.name(...) where the module is a bare ident
        if let Expr::Field { base, name } = callee {
            if let Expr::Ident(module) = base.as_ref() {
                if let Some(kind) = self.check_shim_call(module, name, args) {
                    return kind;
                }
            }
            return Kind::Unknown;
        }

        // user function call
        if let Expr::Ident(name) = callee {
            let Some(sig) = self.info.funcs.get(name).cloned() else {
                self.errors.push(CheckError::UnknownFunction {
                    name: name.clone(),
                });
                return Kind::Unknown;
            };
            if sig.params.len() != args.len() {
                self.errors.push(CheckError::CallArity {
                    name: name.clone(),
                    want: sig.params.len(),
                    got: args.len(),
                });
            }
            let n = sig.params.len().min(args.len());
            for i in 0..n {
                let got = self.kind_of_expr(&args[i]);
                let want = sig.params[i];
                if unify(want, got).is_none() {
                    self.errors.push(CheckError::CallArgKind {
                        name: name.clone(),
                        index: i + 1,
                        want,
                        got,
                    });
                }
            }
            return sig.ret;
        }

        Kind::Unknown
    }

    /// Validate a known std-shim call and yield its return kind. Returns
    /// `None` when `(module, name)` is not a documented shim.
    fn check_shim_call(&mut self, module: &str, name: &str, args: &[Expr]) -> Option<Kind> {
        match (module, name) {
            ("io", "println") => {
                for (i, arg) in args.iter().enumerate() {
                    let k = self.kind_of_expr(arg);
                    match k {
                        Kind::Int | Kind::Str | Kind::Bool => {}
                        Kind::Void => {
                            self.errors.push(CheckError::PrintlnVoidArg { index: i + 1 })
                        }
                        other => self.errors.push(CheckError::PrintlnBadArg {
                            index: i + 1,
                            kind: other,
                        }),
                    }
                }
                Some(Kind::Void)
            }
            ("fs", "read_all") => {
                self.shim_unary("fs.read_all", "1 arg (path: str)", "path", Kind::Str, args);
                Some(Kind::Str)
            }
            ("fs", "write_all") => {
                if args.len() != 2 {
                    self.errors.push(CheckError::ShimArity {
                        shim: "fs.write_all",
                        want: "2 args (path: str, data: str)",
                        got: args.len(),
                    });
                } else {
                    self.shim_arg("fs.write_all", "path", Kind::Str, &args[0]);
                    self.shim_arg("fs.write_all", "data", Kind::Str, &args[1]);
                }
                Some(Kind::Int)
            }
            ("os", "exit") => {
                self.shim_unary("os.exit", "1 arg (code: int)", "code", Kind::Int, args);
                Some(Kind::Void)
            }
            ("mem", "free") => {
                if args.len() != 1 {
                    self.errors.push(CheckError::ShimArity {
                        shim: "mem.free",
                        want: "1 arg",
                        got: args.len(),
                    });
                } else {
                    let k = self.kind_of_expr(&args[0]);
                    if k != Kind::Str && k != Kind::Unknown && k != Kind::Void {
                        self.errors.push(CheckError::ShimArgKind {
                            shim: "mem.free",
                            what: "arg",
                            want: "str",
                            got: k,
                        });
                    }
                }
                Some(Kind::Void)
            }
            ("str", "len") => {
                self.shim_unary("str.len", "1 arg (str)", "arg", Kind::Str, args);
                Some(Kind::Int)
            }
            ("str", "at") => {
                if args.len() != 2 {
                    self.errors.push(CheckError::ShimArity {
                        shim: "str.at",
                        want: "2 args (str, int)",
                        got: args.len(),
                    });
                } else {
                    self.shim_arg("str.at", "first arg", Kind::Str, &args[0]);
                    self.shim_arg("str.at", "second arg", Kind::Int, &args[1]);
                }
                Some(Kind::Int)
            }
            ("str", "from_code") => {
                self.shim_unary("str.from_code", "1 arg (int)", "arg", Kind::Int, args);
                Some(Kind::Str)
            }
            _ => None,
        }
    }

    fn shim_unary(
        &mut self,
        shim: &'static str,
        want_arity: &'static str,
        what: &'static str,
        want: Kind,
        args: &[Expr],
    ) {
        if args.len() != 1 {
            self.errors.push(CheckError::ShimArity {
                shim,
                want: want_arity,
                got: args.len(),
            });
            return;
        }
        self.shim_arg(shim, what, want, &args[0]);
    }

    fn shim_arg(&mut self, shim: &'static str, what: &'static str, want: Kind, arg: &Expr) {
        let got = self.kind_of_expr(arg);
        if got != want && got != Kind::Unknown {
            self.errors.push(CheckError::ShimArgKind {
                shim,
                what,
                want: match want {
                    Kind::Str => "str",
                    Kind::Int => "int",
                    Kind::Bool => "bool",
                    _ => "value",
                },
                got,
            });
        }
    }
}
