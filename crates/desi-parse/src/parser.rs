//! Recursive-descent parser with a Pratt expression core.
//!
//! The parser consumes any [`TokenSource`] and produces a [`File`], failing
//! fast with a single located diagnostic. ERR tokens from the lexer are
//! lifted into diagnostics at the position they occur.

use desi_ast::ast::{
    BinOp, Decl, ElseIf, Expr, File, FuncDecl, ImportDecl, LetBind, PackageDecl, Param, Stmt, UnOp,
};
use desi_ast::span::Pos;
use desi_diag::{lookup_or, Diag, Domain, Level};

use crate::lexer::Lexer;
use crate::source::TokenSource;
use crate::token::{TokKind, Token};

/// Parse a source string with the built-in lexer.
pub fn parse_str(file: &str, src: &str) -> Result<File, Diag> {
    parse_source(file, Lexer::new(src))
}

/// Parse from an arbitrary token source (e.g. a replayed external stream).
pub fn parse_source<S: TokenSource>(file: &str, src: S) -> Result<File, Diag> {
    Parser::new(file, src).parse_file()
}

pub struct Parser<S: TokenSource> {
    src: S,
    tok: Token,
    file: String,
}

impl<S: TokenSource> Parser<S> {
    pub fn new(file: &str, mut src: S) -> Self {
        let tok = src.next();
        Parser {
            src,
            tok,
            file: file.to_string(),
        }
    }

    fn next(&mut self) {
        self.tok = self.src.next();
    }

    fn at(&self, kind: TokKind) -> bool {
        self.tok.kind == kind
    }

    fn accept(&mut self, kind: TokKind) -> bool {
        if self.at(kind) {
            self.next();
            true
        } else {
            false
        }
    }

    fn expect(&mut self, kind: TokKind) -> Result<Token, Diag> {
        if self.at(TokKind::Err) {
            return Err(self.lex_err());
        }
        if self.at(kind) {
            let t = self.tok.clone();
            self.next();
            Ok(t)
        } else {
            let entry = lookup_or(
                Domain::Parser,
                "expected_token",
                "DPE0002",
                "expected a different token here",
            );
            Err(Diag::error(format!(
                "expected {}, got {}",
                kind.name(),
                self.tok.kind.name()
            ))
            .with_code(entry.id)
            .in_file(self.file.as_str())
            .at(self.pos()))
        }
    }

    fn pos(&self) -> Pos {
        Pos::new(self.tok.line, self.tok.col)
    }

    /// Lift the current ERR token into a located diagnostic, pulling span
    /// shaping and suggestions from the catalog when the message is known.
    fn lex_err(&self) -> Diag {
        let t = &self.tok;
        let pos = Pos::new(t.line, t.col);
        let key = if t.text.starts_with("unterminated string") {
            Some(("unterminated_string", "DLE0001"))
        } else if t.text.starts_with("malformed numeric") {
            Some(("bad_number", "DLE0002"))
        } else {
            None
        };
        match key {
            Some((k, id)) => Diag::from_catalog(Level::Error, Domain::Lexer, k, id, &t.text)
                .in_file(self.file.as_str())
                .at(pos),
            None => Diag::error(t.text.clone())
                .in_file(self.file.as_str())
                .at(pos),
        }
    }

    fn skip_newlines(&mut self) {
        while self.accept(TokKind::Newline) {}
    }

    /* ---------- file / declarations ---------- */

    pub fn parse_file(&mut self) -> Result<File, Diag> {
        let mut file = File::default();
        self.skip_newlines();

        if self.accept(TokKind::Package) {
            let name = self.parse_dotted_ident()?;
            self.expect(TokKind::Newline)?;
            file.package = Some(PackageDecl { name });
            self.skip_newlines();
        }

        while self.accept(TokKind::Import) {
            let path = self.parse_dotted_ident()?;
            self.expect(TokKind::Newline)?;
            file.imports.push(ImportDecl { path });
            self.skip_newlines();
        }

        while !self.at(TokKind::Eof) {
            if self.accept(TokKind::Def) {
                file.decls.push(Decl::Func(self.parse_func_decl()?));
            } else {
                // a leading lexer error is surfaced immediately; anything
                // else unexpected at top level is skipped to the next line
                if self.at(TokKind::Err) {
                    return Err(self.lex_err());
                }
                while !self.at(TokKind::Newline) && !self.at(TokKind::Eof) {
                    self.next();
                }
                self.skip_newlines();
            }
        }
        Ok(file)
    }

    fn parse_dotted_ident(&mut self) -> Result<String, Diag> {
        let mut parts = vec![self.expect(TokKind::Ident)?.text];
        while self.accept(TokKind::Dot) {
            parts.push(self.expect(TokKind::Ident)?.text);
        }
        Ok(parts.join("."))
    }

    /// Capture a type annotation as raw text: everything until a stopper at
    /// paren/bracket depth zero. EOF, NEWLINE and `:` always terminate.
    fn parse_type_until(&mut self, stoppers: &[TokKind]) -> String {
        let mut parts: Vec<String> = Vec::new();
        let mut depth_paren = 0u32;
        let mut depth_brack = 0u32;
        loop {
            if depth_paren == 0 && depth_brack == 0 && stoppers.contains(&self.tok.kind) {
                break;
            }
            match self.tok.kind {
                TokKind::Eof | TokKind::Newline | TokKind::Colon => return parts.join(" "),
                TokKind::LParen => depth_paren += 1,
                TokKind::RParen => depth_paren = depth_paren.saturating_sub(1),
                TokKind::LBrack => depth_brack += 1,
                TokKind::RBrack => depth_brack = depth_brack.saturating_sub(1),
                _ => {}
            }
            parts.push(self.tok.display_text().to_string());
            self.next();
        }
        parts.join(" ")
    }

    fn parse_func_decl(&mut self) -> Result<FuncDecl, Diag> {
        // def <name> "(" params? ")" "->" type ":" NEWLINE INDENT body DEDENT
        let name = self.expect(TokKind::Ident)?.text;
        self.expect(TokKind::LParen)?;

        let mut params = Vec::new();
        if !self.accept(TokKind::RParen) {
            loop {
                let id = self.expect(TokKind::Ident)?;
                self.expect(TokKind::Colon)?;
                let ty = self.parse_type_until(&[TokKind::Comma, TokKind::RParen]);
                params.push(Param { name: id.text, ty });
                if self.accept(TokKind::Comma) {
                    continue;
                }
                self.expect(TokKind::RParen)?;
                break;
            }
        }

        self.expect(TokKind::Arrow)?;
        let ret = self.parse_type_until(&[TokKind::Colon]);
        self.expect(TokKind::Colon)?;
        let body = self.parse_block()?;

        Ok(FuncDecl {
            name,
            params,
            ret,
            body,
        })
    }

    fn parse_block(&mut self) -> Result<Vec<Stmt>, Diag> {
        self.expect(TokKind::Newline)?;
        self.expect(TokKind::Indent)?;
        let mut body = Vec::new();
        while !self.at(TokKind::Dedent) && !self.at(TokKind::Eof) {
            self.skip_newlines();
            if self.at(TokKind::Dedent) || self.at(TokKind::Eof) {
                break;
            }
            body.push(self.parse_stmt()?);
        }
        self.expect(TokKind::Dedent)?;
        Ok(body)
    }

    /* ---------- statements ---------- */

    fn parse_stmt(&mut self) -> Result<Stmt, Diag> {
        if self.at(TokKind::Err) {
            return Err(self.lex_err());
        }

        if self.accept(TokKind::Let) {
            return self.parse_let_stmt();
        }
        if self.at(TokKind::Ident) {
            return self.parse_assign_or_expr();
        }
        if self.accept(TokKind::Return) {
            if self.at(TokKind::Newline) {
                self.next();
                return Ok(Stmt::Return { value: None });
            }
            let expr = self.parse_expr()?;
            self.expect(TokKind::Newline)?;
            return Ok(Stmt::Return { value: Some(expr) });
        }
        if self.accept(TokKind::If) {
            return self.parse_if_stmt();
        }
        if self.accept(TokKind::While) {
            return self.parse_while_stmt();
        }
        if self.accept(TokKind::Defer) {
            let call = self.parse_expr()?;
            self.expect(TokKind::Newline)?;
            return Ok(Stmt::Defer { call });
        }

        let expr = self.parse_expr()?;
        self.expect(TokKind::Newline)?;
        Ok(Stmt::Expr { expr })
    }

    fn parse_let_stmt(&mut self) -> Result<Stmt, Diag> {
        let mutable = self.accept(TokKind::Mut);

        let mut binds = Vec::new();
        let mut group_ty = None;

        if self.accept(TokKind::LParen) {
            // parenthesized LHS allows an optional group type: (a: A, b): T
            loop {
                binds.push(self.parse_let_bind(&[TokKind::Comma, TokKind::RParen, TokKind::Eq])?);
                if self.accept(TokKind::Comma) {
                    continue;
                }
                self.expect(TokKind::RParen)?;
                break;
            }
            if self.accept(TokKind::Colon) {
                group_ty = Some(self.parse_type_until(&[TokKind::Eq]));
            }
        } else {
            // unparenthesized: per-name annotations, no group type
            binds.push(self.parse_let_bind(&[TokKind::Comma, TokKind::Eq, TokKind::Newline])?);
            while self.accept(TokKind::Comma) {
                binds.push(self.parse_let_bind(&[TokKind::Comma, TokKind::Eq, TokKind::Newline])?);
            }
        }

        self.expect(TokKind::Eq)?;
        let values = self.parse_expr_list_until_newline()?;
        self.expect(TokKind::Newline)?;

        Ok(Stmt::Let {
            mutable,
            binds,
            group_ty,
            values,
        })
    }

    /// `Ident (":" type)?` — the type runs until a stopper token.
    fn parse_let_bind(&mut self, stoppers: &[TokKind]) -> Result<LetBind, Diag> {
        let id = self.expect(TokKind::Ident)?;
        if self.accept(TokKind::Colon) {
            let ty = self.parse_type_until(stoppers);
            return Ok(LetBind {
                name: id.text,
                ty: Some(ty),
            });
        }
        Ok(LetBind {
            name: id.text,
            ty: None,
        })
    }

    /// Statement starting with an identifier: single assignment (`a := e`),
    /// parallel assignment (`a, b := e1, e2`), or an expression statement.
    fn parse_assign_or_expr(&mut self) -> Result<Stmt, Diag> {
        let first = self.expect(TokKind::Ident)?;

        if self.accept(TokKind::Assign) {
            let values = self.parse_expr_list_until_newline()?;
            self.expect(TokKind::Newline)?;
            return Ok(Stmt::Assign {
                names: vec![first.text],
                values,
            });
        }

        if self.accept(TokKind::Comma) {
            let mut names = vec![first.text];
            loop {
                names.push(self.expect(TokKind::Ident)?.text);
                if self.accept(TokKind::Comma) {
                    continue;
                }
                break;
            }
            self.expect(TokKind::Assign)?;
            let values = self.parse_expr_list_until_newline()?;
            self.expect(TokKind::Newline)?;
            return Ok(Stmt::Assign { names, values });
        }

        let lhs = Expr::Ident(first.text);
        let expr = self.parse_expr_with_lhs(lhs)?;
        self.expect(TokKind::Newline)?;
        Ok(Stmt::Expr { expr })
    }

    fn parse_expr_list_until_newline(&mut self) -> Result<Vec<Expr>, Diag> {
        let mut xs = vec![self.parse_expr()?];
        while self.accept(TokKind::Comma) {
            // trailing comma before NEWLINE is allowed
            if self.at(TokKind::Newline) {
                break;
            }
            xs.push(self.parse_expr()?);
        }
        Ok(xs)
    }

    fn parse_if_stmt(&mut self) -> Result<Stmt, Diag> {
        let cond = self.parse_expr()?;
        self.expect(TokKind::Colon)?;
        let then_ = self.parse_block()?;

        let mut elifs = Vec::new();
        while self.accept(TokKind::Elif) {
            let cond = self.parse_expr()?;
            self.expect(TokKind::Colon)?;
            let body = self.parse_block()?;
            elifs.push(ElseIf { cond, body });
        }

        let else_ = if self.accept(TokKind::Else) {
            self.expect(TokKind::Colon)?;
            Some(self.parse_block()?)
        } else {
            None
        };

        Ok(Stmt::If {
            cond,
            then_,
            elifs,
            else_,
        })
    }

    fn parse_while_stmt(&mut self) -> Result<Stmt, Diag> {
        let cond = self.parse_expr()?;
        self.expect(TokKind::Colon)?;
        let body = self.parse_block()?;
        Ok(Stmt::While { cond, body })
    }

    /* ---------- expressions (Pratt parser) ---------- */
    //
    // precedence (low -> high):
    //   1: |>   2: or   3: and   4: == !=   5: < <= > >=
    //   6: + -  7: * / %
    // unary prefix binds tighter than all infix; postfix tighter still.

    fn parse_expr(&mut self) -> Result<Expr, Diag> {
        if self.at(TokKind::Err) {
            return Err(self.lex_err());
        }
        let left = self.parse_unary()?;
        self.parse_binary_rhs(1, left)
    }

    /// Continue an expression whose leading identifier was already consumed
    /// by the assignment/expression dispatch.
    fn parse_expr_with_lhs(&mut self, lhs: Expr) -> Result<Expr, Diag> {
        if self.at(TokKind::Err) {
            return Err(self.lex_err());
        }
        let post = self.parse_postfix(lhs)?;
        self.parse_binary_rhs(1, post)
    }

    fn parse_unary(&mut self) -> Result<Expr, Diag> {
        if self.at(TokKind::Err) {
            return Err(self.lex_err());
        }
        let op = match self.tok.kind {
            TokKind::Minus => Some(UnOp::Neg),
            TokKind::Bang => Some(UnOp::Bang),
            TokKind::Not => Some(UnOp::Not),
            _ => None,
        };
        if let Some(op) = op {
            self.next();
            let x = self.parse_unary()?;
            return Ok(Expr::Unary {
                op,
                expr: Box::new(x),
            });
        }
        self.parse_primary()
    }

    fn parse_primary(&mut self) -> Result<Expr, Diag> {
        if self.at(TokKind::Err) {
            return Err(self.lex_err());
        }
        match self.tok.kind {
            TokKind::Ident => {
                let t = self.tok.clone();
                self.next();
                self.parse_postfix(Expr::Ident(t.text))
            }
            TokKind::Int => {
                let t = self.tok.clone();
                self.next();
                self.parse_postfix(Expr::Int(t.text))
            }
            TokKind::Str => {
                let t = self.tok.clone();
                self.next();
                self.parse_postfix(Expr::Str(t.text))
            }
            TokKind::True => {
                self.next();
                self.parse_postfix(Expr::Bool(true))
            }
            TokKind::False => {
                self.next();
                self.parse_postfix(Expr::Bool(false))
            }
            TokKind::LParen => {
                self.next();
                let e = self.parse_expr()?;
                self.expect(TokKind::RParen)?;
                self.parse_postfix(e)
            }
            _ => {
                let entry = lookup_or(
                    Domain::Parser,
                    "unexpected_expr_token",
                    "DPE0003",
                    "unexpected token in expression",
                );
                Err(Diag::error(format!(
                    "unexpected token in expression: {}",
                    self.tok.kind.name()
                ))
                .with_code(entry.id)
                .in_file(self.file.as_str())
                .at(self.pos()))
            }
        }
    }

    /// Postfix chain: call `(args)`, index `[expr]`, field `.name`.
    fn parse_postfix(&mut self, base: Expr) -> Result<Expr, Diag> {
        let mut e = base;
        loop {
            if self.accept(TokKind::LParen) {
                let mut args = Vec::new();
                if !self.accept(TokKind::RParen) {
                    loop {
                        if self.at(TokKind::RParen) {
                            self.next();
                            break;
                        }
                        if self.at(TokKind::Err) {
                            return Err(self.lex_err());
                        }
                        args.push(self.parse_expr()?);
                        if self.accept(TokKind::Comma) {
                            continue;
                        }
                        self.expect(TokKind::RParen)?;
                        break;
                    }
                }
                e = Expr::Call {
                    callee: Box::new(e),
                    args,
                };
            } else if self.accept(TokKind::LBrack) {
                let index = self.parse_expr()?;
                self.expect(TokKind::RBrack)?;
                e = Expr::Index {
                    seq: Box::new(e),
                    index: Box::new(index),
                };
            } else if self.accept(TokKind::Dot) {
                let id = self.expect(TokKind::Ident)?;
                e = Expr::Field {
                    base: Box::new(e),
                    name: id.text,
                };
            } else {
                return Ok(e);
            }
        }
    }

    fn parse_binary_rhs(&mut self, min_prec: i32, mut left: Expr) -> Result<Expr, Diag> {
        loop {
            let Some((prec, op)) = bin_prec(self.tok.kind) else {
                return Ok(left);
            };
            if prec < min_prec {
                return Ok(left);
            }
            self.next();

            let mut right = self.parse_unary()?;
            loop {
                match bin_prec(self.tok.kind) {
                    Some((next_prec, _)) if next_prec > prec => {
                        right = self.parse_binary_rhs(prec + 1, right)?;
                    }
                    _ => break,
                }
            }

            left = Expr::Binary {
                op,
                lhs: Box::new(left),
                rhs: Box::new(right),
            };
        }
    }
}

fn bin_prec(kind: TokKind) -> Option<(i32, BinOp)> {
    Some(match kind {
        TokKind::Pipe => (1, BinOp::Pipe),
        TokKind::Or => (2, BinOp::Or),
        TokKind::And => (3, BinOp::And),
        TokKind::EqEq => (4, BinOp::Eq),
        TokKind::Ne => (4, BinOp::Ne),
        TokKind::Lt => (5, BinOp::Lt),
        TokKind::Le => (5, BinOp::Le),
        TokKind::Gt => (5, BinOp::Gt),
        TokKind::Ge => (5, BinOp::Ge),
        TokKind::Plus => (6, BinOp::Add),
        TokKind::Minus => (6, BinOp::Sub),
        TokKind::Star => (7, BinOp::Mul),
        TokKind::Slash => (7, BinOp::Div),
        TokKind::Percent => (7, BinOp::Rem),
        _ => return None,
    })
}
