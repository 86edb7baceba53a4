//! Plain-text outline of a parsed file, used by `desic parse`.

use crate::ast::{Decl, Expr, File, Stmt};

/// Render an indented outline of the file: package, imports, functions,
/// then statements one level deeper per nesting.
pub fn outline(file: &File) -> String {
    let mut out = String::new();
    if let Some(pkg) = &file.package {
        out.push_str(&format!("package {}\n", pkg.name));
    }
    for imp in &file.imports {
        out.push_str(&format!("import {}\n", imp.path));
    }
    for decl in &file.decls {
        let Decl::Func(fun) = decl;
        let params: Vec<String> = fun
            .params
            .iter()
            .map(|p| format!("{}: {}", p.name, p.ty))
            .collect();
        let ret = if fun.ret.is_empty() { "void" } else { &fun.ret };
        out.push_str(&format!("def {}({}) -> {}\n", fun.name, params.join(", "), ret));
        for stmt in &fun.body {
            write_stmt(&mut out, stmt, 1);
        }
    }
    out
}

fn pad(out: &mut String, depth: usize) {
    for _ in 0..depth {
        out.push_str("  ");
    }
}

fn write_stmt(out: &mut String, stmt: &Stmt, depth: usize) {
    pad(out, depth);
    match stmt {
        Stmt::Let {
            mutable,
            binds,
            group_ty,
            values,
        } => {
            out.push_str("let ");
            if *mutable {
                out.push_str("mut ");
            }
            let lhs: Vec<String> = binds
                .iter()
                .map(|b| match &b.ty {
                    Some(ty) => format!("{}: {}", b.name, ty),
                    None => b.name.clone(),
                })
                .collect();
            out.push_str(&lhs.join(", "));
            if let Some(gt) = group_ty {
                out.push_str(&format!(": {gt}"));
            }
            out.push_str(" = ");
            out.push_str(&expr_list(values));
            out.push('\n');
        }
        Stmt::Assign { names, values } => {
            out.push_str(&names.join(", "));
            out.push_str(" := ");
            out.push_str(&expr_list(values));
            out.push('\n');
        }
        Stmt::Return { value } => {
            match value {
                Some(e) => out.push_str(&format!("return {}\n", expr_text(e))),
                None => out.push_str("return\n"),
            };
        }
        Stmt::Expr { expr } => {
            out.push_str(&expr_text(expr));
            out.push('\n');
        }
        Stmt::If {
            cond,
            then_,
            elifs,
            else_,
        } => {
            out.push_str(&format!("if {}:\n", expr_text(cond)));
            for s in then_ {
                write_stmt(out, s, depth + 1);
            }
            for elif in elifs {
                pad(out, depth);
                out.push_str(&format!("elif {}:\n", expr_text(&elif.cond)));
                for s in &elif.body {
                    write_stmt(out, s, depth + 1);
                }
            }
            if let Some(body) = else_ {
                pad(out, depth);
                out.push_str("else:\n");
                for s in body {
                    write_stmt(out, s, depth + 1);
                }
            }
        }
        Stmt::While { cond, body } => {
            out.push_str(&format!("while {}:\n", expr_text(cond)));
            for s in body {
                write_stmt(out, s, depth + 1);
            }
        }
        Stmt::Defer { call } => {
            out.push_str(&format!("defer {}\n", expr_text(call)));
        }
    }
}

fn expr_list(exprs: &[Expr]) -> String {
    let parts: Vec<String> = exprs.iter().map(expr_text).collect();
    parts.join(", ")
}

/// Compact one-line rendering; binary and unary operations are
/// parenthesized so the tree shape stays visible.
pub fn expr_text(expr: &Expr) -> String {
    match expr {
        Expr::Ident(name) => name.clone(),
        Expr::Int(lex) => lex.clone(),
        Expr::Str(value) => format!("{value:?}"),
        Expr::Bool(b) => b.to_string(),
        Expr::Unary { op, expr } => format!("({}{})", op.as_str(), expr_text(expr)),
        Expr::Binary { op, lhs, rhs } => {
            format!("({} {} {})", expr_text(lhs), op.as_str(), expr_text(rhs))
        }
        Expr::Call { callee, args } => {
            let parts: Vec<String> = args.iter().map(expr_text).collect();
            format!("{}({})", expr_text(callee), parts.join(", "))
        }
        Expr::Index { seq, index } => format!("{}[{}]", expr_text(seq), expr_text(index)),
        Expr::Field { base, name } => format!("{}.{}", expr_text(base), name),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::{BinOp, FuncDecl, LetBind};

    #[test]
    fn outline_shows_signature_and_statements() {
        let file = File {
            package: None,
            imports: vec![],
            decls: vec![Decl::Func(FuncDecl {
                name: "main".into(),
                params: vec![],
                ret: "int".into(),
                body: vec![
                    Stmt::Let {
                        mutable: true,
                        binds: vec![LetBind {
                            name: "x".into(),
                            ty: None,
                        }],
                        group_ty: None,
                        values: vec![Expr::Binary {
                            op: BinOp::Add,
                            lhs: Box::new(Expr::Int("1".into())),
                            rhs: Box::new(Expr::Int("2".into())),
                        }],
                    },
                    Stmt::Return {
                        value: Some(Expr::Ident("x".into())),
                    },
                ],
            })],
        };
        let text = outline(&file);
        assert!(text.contains("def main() -> int"));
        assert!(text.contains("let mut x = (1 + 2)"));
        assert!(text.contains("  return x"));
    }
}
