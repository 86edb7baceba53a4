//! Lowering from the merged AST to a single portable C translation unit.
//!
//! The emitter runs only after the checker reported zero errors, so it can
//! assume arities line up and kinds are settled. It keeps its own scope map
//! (name to kind plus string-ownership flag) to choose printf specifiers,
//! string lowerings, and release points.
//!
//! String ownership: values produced by `desi_str_concat`,
//! `desi_str_from_code` and `desi_fs_read_all` are heap-owned. A binding
//! initialized from an owning expression is released on every exit path and
//! whenever it is reassigned; returning such a binding hands ownership to
//! the caller instead. Strings returned by user functions are not tracked.

use desi_ast::ast::{BinOp, Decl, Expr, File, FuncDecl, Stmt, UnOp};
use desi_check::{map_text_type, unify, Info, Kind};

/// Emit the whole translation unit for a merged file.
pub fn emit_file(file: &File, info: &Info) -> String {
    let mut out = String::new();
    out.push_str("/* Generated by desic. Do not edit. */\n");
    out.push_str("#include <stdio.h>\n");
    out.push_str("#include <string.h>\n\n");
    out.push_str("#include \"desi_std.h\"\n\n");

    let mut protos = Vec::new();
    for decl in &file.decls {
        let Decl::Func(fun) = decl;
        if fun.name != "main" {
            protos.push(format!("{};", signature(fun, info)));
        }
    }
    if !protos.is_empty() {
        for p in &protos {
            out.push_str(p);
            out.push('\n');
        }
        out.push('\n');
    }

    for (i, decl) in file.decls.iter().enumerate() {
        let Decl::Func(fun) = decl;
        let mut emitter = Emitter::new(info, &mut out);
        emitter.emit_func(fun);
        if i + 1 < file.decls.len() {
            out.push('\n');
        }
    }
    out
}

fn signature(fun: &FuncDecl, info: &Info) -> String {
    if fun.name == "main" {
        return "int main(void)".to_string();
    }
    let sig = info.funcs.get(&fun.name);
    let ret = sig
        .map(|s| s.ret)
        .unwrap_or_else(|| map_text_type(&fun.ret));
    if fun.params.is_empty() {
        return format!("{} {}(void)", c_type(ret), c_name(&fun.name));
    }
    let params: Vec<String> = fun
        .params
        .iter()
        .enumerate()
        .map(|(i, p)| {
            let kind = sig
                .and_then(|s| s.params.get(i).copied())
                .unwrap_or_else(|| map_text_type(&p.ty));
            format!("{} {}", c_type(kind), c_name(&p.name))
        })
        .collect();
    format!("{} {}({})", c_type(ret), c_name(&fun.name), params.join(", "))
}

fn c_type(kind: Kind) -> &'static str {
    match kind {
        Kind::Str => "const char*",
        Kind::Void => "void",
        // int, bool, and unknown all travel as C int
        _ => "int",
    }
}

fn zero_value(kind: Kind) -> &'static str {
    match kind {
        Kind::Str => "NULL",
        _ => "0",
    }
}

/// C identifier for a Desi name (`$` is legal in Desi, not in C).
fn c_name(name: &str) -> String {
    name.replace('$', "_")
}

fn c_string(value: &str) -> String {
    let mut s = String::from("\"");
    for ch in value.chars() {
        match ch {
            '"' => s.push_str("\\\""),
            '\\' => s.push_str("\\\\"),
            '\n' => s.push_str("\\n"),
            '\r' => s.push_str("\\r"),
            '\t' => s.push_str("\\t"),
            c if (c as u32) < 0x20 => s.push_str(&format!("\\{:03o}", c as u32)),
            c => s.push(c),
        }
    }
    s.push('"');
    s
}

#[derive(Debug, Clone, Copy)]
struct Local {
    kind: Kind,
    owned: bool,
}

struct Emitter<'a> {
    info: &'a Info,
    out: &'a mut String,
    indent: usize,
    tmp: u32,
    frames: Vec<Vec<(String, Local)>>,
    defers: Vec<Expr>,
    ret_kind: Kind,
    is_main: bool,
}

impl<'a> Emitter<'a> {
    fn new(info: &'a Info, out: &'a mut String) -> Self {
        Emitter {
            info,
            out,
            indent: 0,
            tmp: 0,
            frames: Vec::new(),
            defers: Vec::new(),
            ret_kind: Kind::Void,
            is_main: false,
        }
    }

    fn line(&mut self, text: &str) {
        for _ in 0..self.indent {
            self.out.push_str("  ");
        }
        self.out.push_str(text);
        self.out.push('\n');
    }

    fn fresh_tmp(&mut self) -> String {
        let t = format!("_t{}", self.tmp);
        self.tmp += 1;
        t
    }

    /* ---------- scope bookkeeping ---------- */

    fn push_frame(&mut self) {
        self.frames.push(Vec::new());
    }

    fn pop_frame(&mut self) {
        self.frames.pop();
    }

    fn define(&mut self, name: &str, local: Local) {
        if let Some(frame) = self.frames.last_mut() {
            frame.push((name.to_string(), local));
        }
    }

    fn lookup(&self, name: &str) -> Option<Local> {
        for frame in self.frames.iter().rev() {
            for (n, local) in frame.iter().rev() {
                if n == name {
                    return Some(*local);
                }
            }
        }
        None
    }

    fn set_owned(&mut self, name: &str, owned: bool) {
        for frame in self.frames.iter_mut().rev() {
            for (n, local) in frame.iter_mut().rev() {
                if n == name {
                    local.owned = owned;
                    return;
                }
            }
        }
    }

    /// Owned string bindings visible right now, release order (most recent
    /// declaration first).
    fn owned_names_reversed(&self) -> Vec<String> {
        let mut names = Vec::new();
        for frame in self.frames.iter().rev() {
            for (name, local) in frame.iter().rev() {
                if local.owned {
                    names.push(name.clone());
                }
            }
        }
        names
    }

    fn any_owned(&self) -> bool {
        self.frames
            .iter()
            .any(|f| f.iter().any(|(_, l)| l.owned))
    }

    /* ---------- functions ---------- */

    fn emit_func(&mut self, fun: &FuncDecl) {
        let sig = self.info.funcs.get(&fun.name).cloned().unwrap_or_default();
        self.is_main = fun.name == "main";
        self.ret_kind = if self.is_main { Kind::Int } else { sig.ret };

        let head = signature(fun, self.info);
        self.line(&format!("{head} {{"));
        self.indent += 1;
        self.push_frame();
        for (i, p) in fun.params.iter().enumerate() {
            let kind = sig
                .params
                .get(i)
                .copied()
                .unwrap_or_else(|| map_text_type(&p.ty));
            self.define(&p.name, Local { kind, owned: false });
        }

        for stmt in &fun.body {
            self.emit_stmt(stmt);
        }

        // synthesized default return on fall-through
        let ends_with_return = matches!(fun.body.last(), Some(Stmt::Return { .. }));
        if !ends_with_return {
            self.emit_exit_path(None);
            if self.ret_kind != Kind::Void {
                let zero = zero_value(self.ret_kind);
                self.line(&format!("return {zero};"));
            }
        }

        self.pop_frame();
        self.indent -= 1;
        self.line("}");
    }

    /* ---------- statements ---------- */

    fn emit_stmt(&mut self, stmt: &Stmt) {
        match stmt {
            Stmt::Let { binds, values, .. } => {
                for (bind, value) in binds.iter().zip(values) {
                    let mut kind = self.kind_of(value);
                    if let Some(text) = &bind.ty {
                        if !text.trim().is_empty() {
                            let declared = map_text_type(text);
                            if declared != Kind::Unknown {
                                kind = unify(declared, kind).unwrap_or(declared);
                            }
                        }
                    }
                    let owned = kind == Kind::Str && self.owning(value);
                    let rhs = self.emit_expr(value);
                    let ty = c_type(kind);
                    let name = c_name(&bind.name);
                    self.line(&format!("{ty} {name} = {rhs};"));
                    self.define(&bind.name, Local { kind, owned });
                }
            }

            Stmt::Assign { names, values } => self.emit_assign(names, values),

            Stmt::Return { value } => self.emit_return(value.as_ref()),

            Stmt::Expr { expr } => self.emit_call_stmt(expr),

            Stmt::If {
                cond,
                then_,
                elifs,
                else_,
            } => {
                let c = self.emit_expr(cond);
                self.line(&format!("if ({c}) {{"));
                self.emit_block(then_);
                for elif in elifs {
                    let c = self.emit_expr(&elif.cond);
                    self.line(&format!("}} else if ({c}) {{"));
                    self.emit_block(&elif.body);
                }
                if let Some(body) = else_ {
                    self.line("} else {");
                    self.emit_block(body);
                }
                self.line("}");
            }

            Stmt::While { cond, body } => {
                let c = self.emit_expr(cond);
                self.line(&format!("while ({c}) {{"));
                self.emit_block(body);
                self.line("}");
            }

            // collected here, emitted LIFO at every return site
            Stmt::Defer { call } => {
                // an explicit deferred mem.free takes over the release
                self.note_manual_free(call);
                self.defers.push(call.clone());
            }
        }
    }

    fn emit_block(&mut self, stmts: &[Stmt]) {
        self.indent += 1;
        self.push_frame();
        for stmt in stmts {
            self.emit_stmt(stmt);
        }
        // end-of-scope release for strings owned by this block; pointless
        // (and unreachable) when the block already returned
        if !matches!(stmts.last(), Some(Stmt::Return { .. })) {
            self.free_top_frame();
        }
        self.pop_frame();
        self.indent -= 1;
    }

    fn free_top_frame(&mut self) {
        let names: Vec<String> = self
            .frames
            .last()
            .map(|frame| {
                frame
                    .iter()
                    .rev()
                    .filter(|(_, l)| l.owned)
                    .map(|(n, _)| n.clone())
                    .collect()
            })
            .unwrap_or_default();
        for name in names {
            let c = c_name(&name);
            self.line(&format!("desi_mem_free({c});"));
        }
    }

    fn emit_assign(&mut self, names: &[String], values: &[Expr]) {
        if names.len() == 1 && values.len() == 1 {
            let name = &names[0];
            let local = self.lookup(name).unwrap_or(Local {
                kind: Kind::Unknown,
                owned: false,
            });
            let rhs = self.emit_expr(&values[0]);
            let cname = c_name(name);
            if local.kind == Kind::Str {
                let t = self.fresh_tmp();
                self.line(&format!("const char* {t} = {rhs};"));
                if local.owned {
                    self.line(&format!("desi_mem_free({cname});"));
                }
                self.line(&format!("{cname} = {t};"));
                let owning = self.owning(&values[0]);
                self.set_owned(name, owning);
            } else {
                self.line(&format!("{cname} = {rhs};"));
            }
            return;
        }

        // parallel assignment: evaluate every RHS into a fresh temporary
        // before the first store, preserving swap semantics
        let mut tmps = Vec::new();
        for (name, value) in names.iter().zip(values) {
            let kind = self
                .lookup(name)
                .map(|l| l.kind)
                .unwrap_or(Kind::Unknown);
            let t = self.fresh_tmp();
            let rhs = self.emit_expr(value);
            let ty = c_type(kind);
            self.line(&format!("{ty} {t} = {rhs};"));
            tmps.push(t);
        }
        for ((name, value), t) in names.iter().zip(values).zip(&tmps) {
            let local = self.lookup(name).unwrap_or(Local {
                kind: Kind::Unknown,
                owned: false,
            });
            let cname = c_name(name);
            if local.kind == Kind::Str && local.owned {
                self.line(&format!("desi_mem_free({cname});"));
            }
            self.line(&format!("{cname} = {t};"));
            if local.kind == Kind::Str {
                let owning = self.owning(value);
                self.set_owned(name, owning);
            }
        }
    }

    fn emit_return(&mut self, value: Option<&Expr>) {
        match value {
            None => {
                self.emit_exit_path(None);
                if self.is_main {
                    self.line("return 0;");
                } else {
                    self.line("return;");
                }
            }
            Some(expr) => {
                let has_cleanup = !self.defers.is_empty() || self.any_owned();
                if !has_cleanup {
                    let c = self.emit_expr(expr);
                    self.line(&format!("return {c};"));
                    return;
                }
                // returning an owned string hands it to the caller
                if let Expr::Ident(name) = expr {
                    if self.lookup(name).map(|l| l.owned) == Some(true) {
                        self.emit_exit_path(Some(name.as_str()));
                        let c = c_name(name);
                        self.line(&format!("return {c};"));
                        return;
                    }
                }
                // evaluate before releases so the value may still use them
                let t = self.fresh_tmp();
                let c = self.emit_expr(expr);
                let ty = c_type(self.ret_kind);
                self.line(&format!("{ty} {t} = {c};"));
                self.emit_exit_path(None);
                self.line(&format!("return {t};"));
            }
        }
    }

    /// Deferred calls in LIFO order, then releases for owned strings.
    fn emit_exit_path(&mut self, keep: Option<&str>) {
        let defers = self.defers.clone();
        for call in defers.iter().rev() {
            let c = self.emit_expr(call);
            self.line(&format!("{c};"));
        }
        for name in self.owned_names_reversed() {
            if keep == Some(name.as_str()) {
                continue;
            }
            let c = c_name(&name);
            self.line(&format!("desi_mem_free({c});"));
        }
    }

    /// Expression statement. For direct calls, owning string arguments are
    /// hoisted into temporaries and released right after the call.
    fn emit_call_stmt(&mut self, expr: &Expr) {
        if let Expr::Call { callee, args } = expr {
            let mut hoisted = Vec::new();
            let mut rendered = Vec::new();
            for arg in args {
                if self.kind_of(arg) == Kind::Str && self.owning(arg) {
                    let t = self.fresh_tmp();
                    let c = self.emit_expr(arg);
                    self.line(&format!("const char* {t} = {c};"));
                    rendered.push(t.clone());
                    hoisted.push(t);
                } else {
                    rendered.push(self.emit_expr(arg));
                }
            }
            let call = self.emit_call_with(callee, args, &rendered);
            self.line(&format!("{call};"));
            for t in hoisted.iter().rev() {
                self.line(&format!("desi_mem_free({t});"));
            }
            // a manual mem.free releases the binding; don't release it again
            self.note_manual_free(expr);
            return;
        }
        let c = self.emit_expr(expr);
        self.line(&format!("{c};"));
    }

    /* ---------- expressions ---------- */

    fn emit_expr(&mut self, expr: &Expr) -> String {
        match expr {
            Expr::Ident(name) => c_name(name),
            Expr::Int(lex) => lex.clone(),
            Expr::Str(value) => c_string(value),
            Expr::Bool(b) => (if *b { "1" } else { "0" }).to_string(),
            Expr::Unary { op, expr } => {
                let x = self.emit_expr(expr);
                match op {
                    UnOp::Neg => format!("(-{x})"),
                    UnOp::Bang | UnOp::Not => format!("(!{x})"),
                }
            }
            Expr::Binary { op, lhs, rhs } => self.emit_binary(*op, lhs, rhs),
            Expr::Call { callee, args } => {
                let rendered: Vec<String> = args.iter().map(|a| self.emit_expr(a)).collect();
                self.emit_call_with(callee, args, &rendered)
            }
            // aggregate indexing and field access are not lowered yet
            Expr::Index { .. } | Expr::Field { .. } => "0".to_string(),
        }
    }

    fn emit_binary(&mut self, op: BinOp, lhs: &Expr, rhs: &Expr) -> String {
        if op == BinOp::Pipe {
            return self.emit_pipe(lhs, rhs);
        }

        let lk = self.kind_of(lhs);
        let rk = self.kind_of(rhs);
        let any_str = lk == Kind::Str || rk == Kind::Str;
        let l = self.emit_expr(lhs);
        let r = self.emit_expr(rhs);

        match op {
            BinOp::Add if any_str => format!("desi_str_concat({l}, {r})"),
            BinOp::Eq if any_str => format!("(strcmp({l}, {r}) == 0)"),
            BinOp::Ne if any_str => format!("(strcmp({l}, {r}) != 0)"),
            BinOp::And => format!("({l} && {r})"),
            BinOp::Or => format!("({l} || {r})"),
            _ => {
                let sym = match op {
                    BinOp::Add => "+",
                    BinOp::Sub => "-",
                    BinOp::Mul => "*",
                    BinOp::Div => "/",
                    BinOp::Rem => "%",
                    BinOp::Lt => "<",
                    BinOp::Le => "<=",
                    BinOp::Gt => ">",
                    BinOp::Ge => ">=",
                    BinOp::Eq => "==",
                    BinOp::Ne => "!=",
                    BinOp::And | BinOp::Or | BinOp::Pipe => unreachable!(),
                };
                format!("({l} {sym} {r})")
            }
        }
    }

    /// `x |> f` becomes `f(x)`. A right side that is already a call was
    /// arity-checked as written, so it keeps its own arguments and the pipe
    /// lowers to C's comma operator: evaluate the left, yield the right.
    fn emit_pipe(&mut self, lhs: &Expr, rhs: &Expr) -> String {
        if let Expr::Ident(name) = rhs {
            let l = self.emit_expr(lhs);
            return format!("{}({})", c_name(name), l);
        }
        let l = self.emit_expr(lhs);
        let r = self.emit_expr(rhs);
        format!("({l}, {r})")
    }

    fn emit_call_with(&mut self, callee: &Expr, args: &[Expr], rendered: &[String]) -> String {
        if let Expr::Field { base, name } = callee {
            if let Expr::Ident(module) = base.as_ref() {
                match (module.as_str(), name.as_str()) {
                    ("io", "println") => {
                        // one specifier per argument, then the newline
                        let mut fmt = String::new();
                        for arg in args {
                            fmt.push_str(if self.kind_of(arg) == Kind::Str {
                                "%s"
                            } else {
                                "%d"
                            });
                        }
                        fmt.push_str("\\n");
                        let mut call = format!("printf(\"{fmt}\"");
                        for r in rendered {
                            call.push_str(", ");
                            call.push_str(r);
                        }
                        call.push(')');
                        return call;
                    }
                    ("fs", "read_all") => {
                        return format!("desi_fs_read_all({})", rendered.join(", "))
                    }
                    ("fs", "write_all") => {
                        return format!("desi_fs_write_all({})", rendered.join(", "))
                    }
                    ("os", "exit") => return format!("desi_os_exit({})", rendered.join(", ")),
                    ("mem", "free") => return format!("desi_mem_free({})", rendered.join(", ")),
                    ("str", "len") => return format!("desi_str_len({})", rendered.join(", ")),
                    ("str", "at") => return format!("desi_str_at({})", rendered.join(", ")),
                    ("str", "from_code") => {
                        return format!("desi_str_from_code({})", rendered.join(", "))
                    }
                    _ => {}
                }
            }
            // method calls on aggregates are out of scope for Stage-0
            return "0".to_string();
        }
        if let Expr::Ident(name) = callee {
            return format!("{}({})", c_name(name), rendered.join(", "));
        }
        "0".to_string()
    }

    /* ---------- kind inference (mirrors the checker, silently) ---------- */

    fn kind_of(&self, expr: &Expr) -> Kind {
        match expr {
            Expr::Int(_) => Kind::Int,
            Expr::Str(_) => Kind::Str,
            Expr::Bool(_) => Kind::Bool,
            Expr::Ident(name) => self
                .lookup(name)
                .map(|l| l.kind)
                .unwrap_or(Kind::Unknown),
            Expr::Unary { expr, .. } => match self.kind_of(expr) {
                Kind::Int | Kind::Bool | Kind::Unknown => Kind::Int,
                _ => Kind::Unknown,
            },
            Expr::Binary { op, lhs, rhs } => {
                let lk = self.kind_of(lhs);
                let rk = self.kind_of(rhs);
                match op {
                    BinOp::Add => {
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
            Expr::Call { callee, .. } => match callee.as_ref() {
                Expr::Field { base, name } => match base.as_ref() {
                    Expr::Ident(module) => {
                        shim_ret_kind(module, name).unwrap_or(Kind::Unknown)
                    }
                    _ => Kind::Unknown,
                },
                Expr::Ident(name) => self
                    .info
                    .funcs
                    .get(name)
                    .map(|s| s.ret)
                    .unwrap_or(Kind::Unknown),
                _ => Kind::Unknown,
            },
        }
    }

    /// When `expr` is `mem.free(<ident>)`, stop tracking that binding: the
    /// program freed it itself.
    fn note_manual_free(&mut self, expr: &Expr) {
        let Expr::Call { callee, args } = expr else {
            return;
        };
        let Expr::Field { base, name } = callee.as_ref() else {
            return;
        };
        let Expr::Ident(module) = base.as_ref() else {
            return;
        };
        if module != "mem" || name != "free" {
            return;
        }
        if let Some(Expr::Ident(target)) = args.first() {
            self.set_owned(target, false);
        }
    }

    /// Does evaluating this expression allocate a string the caller owns?
    fn owning(&self, expr: &Expr) -> bool {
        match expr {
            Expr::Binary { op: BinOp::Add, .. } => self.kind_of(expr) == Kind::Str,
            Expr::Call { callee, .. } => match callee.as_ref() {
                Expr::Field { base, name } => match base.as_ref() {
                    Expr::Ident(module) => matches!(
                        (module.as_str(), name.as_str()),
                        ("fs", "read_all") | ("str", "from_code")
                    ),
                    _ => false,
                },
                _ => false,
            },
            _ => false,
        }
    }
}

fn shim_ret_kind(module: &str, name: &str) -> Option<Kind> {
    Some(match (module, name) {
        ("io", "println") => Kind::Void,
        ("fs", "read_all") => Kind::Str,
        ("fs", "write_all") => Kind::Int,
        ("os", "exit") => Kind::Void,
        ("mem", "free") => Kind::Void,
        ("str", "len") => Kind::Int,
        ("str", "at") => Kind::Int,
        ("str", "from_code") => Kind::Str,
        _ => return None,
    })
}
