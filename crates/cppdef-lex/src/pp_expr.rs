//! The macro-mode tokenizer and the `#if` expression evaluator.
//!
//! Macro mode differs from the main loop in four ways: a line break ends
//! the stream, `\`-newline is a continuation, `##` and `#` are tokens of
//! their own, and directives are never interpreted. Identifiers follow the
//! controlling-expression rules: `defined NAME` consults the macro table,
//! object-like macros expand, anything else reads as `0`.
//!
//! The evaluator is a small precedence climber over those tokens with the
//! usual C operator table, `?:` included.

use cppdef_util::Loc;

use crate::chars::{is_digit, is_letter, is_letterd, is_newline};
use crate::lexer::{LexCtx, Lexer, MACRO_DEPTH_LIMIT};
use crate::literal::{parse_char_literal, parse_int_literal};
use crate::token::{Token, TokenKind};

impl Lexer {
    /// Next token in macro mode.
    ///
    /// `base_depth` is the buffer-stack depth where the controlling
    /// expression started; buffers pushed by expansion inside the line are
    /// popped here, outer buffers are not.
    pub fn get_macro_token(&mut self, ctx: &mut LexCtx, base_depth: usize) -> Token {
        use TokenKind::*;
        loop {
            if self.reader.at_end() {
                if self.stack.len() > base_depth {
                    if let Some(mut saved) = self.stack.pop() {
                        self.reader.consume(&mut saved);
                        continue;
                    }
                }
                return Token::new(EndOfCode, self.cur_loc());
            }
            let b = self.reader.current();
            if b == b' ' || b == b'\t' {
                self.reader.pos += 1;
                continue;
            }
            if is_newline(b) {
                return Token::new(EndOfCode, self.cur_loc());
            }
            if b == b'/' {
                match self.reader.at(1) {
                    b'/' => {
                        self.skip_line_comment();
                        continue;
                    }
                    b'*' => {
                        self.skip_block_comment();
                        continue;
                    }
                    _ => return self.lex_symbol(ctx),
                }
            }
            if b == b'\\' && is_newline(self.reader.at(1)) {
                self.reader.pos += 1;
                self.reader.count_newline();
                self.reader.pos += 1;
                continue;
            }
            if b == b'#' {
                let spos = self.reader.pos;
                self.reader.pos += 1;
                if self.reader.current() == b'#' {
                    self.reader.pos += 1;
                    return Token::new(Concat, self.loc_at(spos));
                }
                return Token::new(ToString, self.loc_at(spos));
            }
            if is_letter(b) {
                if let Some(token) = self.macro_identifier(ctx) {
                    return token;
                }
                continue;
            }
            if is_digit(b) {
                return self.lex_number(ctx);
            }
            if b == b'"' || b == b'\'' {
                return self.lex_quoted(ctx);
            }
            return self.lex_symbol(ctx);
        }
    }

    /// Identifier in a controlling expression: `defined`, macro expansion,
    /// or the literal `0`.
    fn macro_identifier(&mut self, ctx: &mut LexCtx) -> Option<Token> {
        let spos = self.reader.pos;
        self.reader.pos += 1;
        while !self.reader.at_end() && is_letterd(self.reader.current()) {
            self.reader.pos += 1;
        }
        let text = self.reader.slice_str(spos, self.reader.pos).into_owned();
        let loc = self.loc_at(spos);
        if text == "defined" {
            return Some(self.pp_defined(ctx, loc));
        }
        let sym = ctx.syms.intern(&text);
        if self.macros.contains(sym) && self.stack.len() < MACRO_DEPTH_LIMIT {
            let body = self
                .macros
                .get(sym)
                .map(|m| m.body.clone())
                .unwrap_or_default();
            self.push_source(&text, body, ctx.map);
            return None;
        }
        // Identifiers that survive expansion read as 0.
        let zero = ctx.syms.intern("0");
        Some(Token::with_text(TokenKind::DecLiteral, loc, zero))
    }

    /// `defined NAME` or `defined(NAME)`.
    fn pp_defined(&mut self, ctx: &mut LexCtx, loc: Loc) -> Token {
        while matches!(self.reader.current(), b' ' | b'\t') {
            self.reader.pos += 1;
        }
        let parenthesized = self.reader.current() == b'(';
        if parenthesized {
            self.reader.pos += 1;
            while matches!(self.reader.current(), b' ' | b'\t') {
                self.reader.pos += 1;
            }
        }
        let defined = if is_letter(self.reader.current()) {
            let spos = self.reader.pos;
            while !self.reader.at_end() && is_letterd(self.reader.current()) {
                self.reader.pos += 1;
            }
            let name = self.reader.slice_str(spos, self.reader.pos).into_owned();
            let sym = ctx.syms.intern(&name);
            self.macros.contains(sym)
        } else {
            ctx.herr.error("expected macro name after `defined`", loc);
            false
        };
        if parenthesized {
            while matches!(self.reader.current(), b' ' | b'\t') {
                self.reader.pos += 1;
            }
            if self.reader.current() == b')' {
                self.reader.pos += 1;
            } else {
                ctx.herr.error("expected `)` to close `defined(`", loc);
            }
        }
        let text = ctx.syms.intern(if defined { "1" } else { "0" });
        Token::with_text(TokenKind::DecLiteral, loc, text)
    }

    /// Evaluate the controlling expression of `#if`/`#elif`. Leaves the
    /// reader wherever the expression ends; the directive skips the rest of
    /// the line.
    pub(crate) fn eval_pp_expression(&mut self, ctx: &mut LexCtx) -> i64 {
        let base = self.stack.len();
        let mut token = self.get_macro_token(ctx, base);
        let value = if token.is(TokenKind::EndOfCode) {
            ctx.herr
                .error("expected expression in preprocessor conditional", token.loc);
            0
        } else {
            self.pp_conditional(&mut token, ctx, base)
        };
        // Drop any expansion buffer the expression did not fully consume,
        // so the directive's line handling resumes in the source buffer.
        while self.stack.len() > base {
            if let Some(mut saved) = self.stack.pop() {
                self.reader.consume(&mut saved);
            }
        }
        value
    }

    fn pp_conditional(&mut self, token: &mut Token, ctx: &mut LexCtx, base: usize) -> i64 {
        let cond = self.pp_binary(token, ctx, base, 1);
        if token.is(TokenKind::Operator) && token.text_is(ctx.syms, "?") {
            *token = self.get_macro_token(ctx, base);
            let then = self.pp_conditional(token, ctx, base);
            if token.is(TokenKind::Colon) {
                *token = self.get_macro_token(ctx, base);
            } else {
                ctx.herr
                    .error("expected `:` in conditional expression", token.loc);
            }
            let other = self.pp_conditional(token, ctx, base);
            return if cond != 0 { then } else { other };
        }
        cond
    }

    fn pp_binary(&mut self, token: &mut Token, ctx: &mut LexCtx, base: usize, min_prec: u8) -> i64 {
        let mut lhs = self.pp_unary(token, ctx, base);
        while let Some((prec, op)) = classify_binary(token, ctx) {
            if prec < min_prec {
                break;
            }
            let op_loc = token.loc;
            *token = self.get_macro_token(ctx, base);
            let rhs = self.pp_binary(token, ctx, base, prec + 1);
            lhs = apply_binary(op, lhs, rhs, op_loc, ctx);
        }
        lhs
    }

    fn pp_unary(&mut self, token: &mut Token, ctx: &mut LexCtx, base: usize) -> i64 {
        if token.is(TokenKind::Operator) {
            let spelling = ctx.syms.resolve(token.text).to_string();
            match spelling.as_str() {
                "!" => {
                    *token = self.get_macro_token(ctx, base);
                    return (self.pp_unary(token, ctx, base) == 0) as i64;
                }
                "~" => {
                    *token = self.get_macro_token(ctx, base);
                    return !self.pp_unary(token, ctx, base);
                }
                "-" => {
                    *token = self.get_macro_token(ctx, base);
                    return self.pp_unary(token, ctx, base).wrapping_neg();
                }
                "+" => {
                    *token = self.get_macro_token(ctx, base);
                    return self.pp_unary(token, ctx, base);
                }
                _ => {}
            }
        }
        self.pp_primary(token, ctx, base)
    }

    fn pp_primary(&mut self, token: &mut Token, ctx: &mut LexCtx, base: usize) -> i64 {
        use TokenKind::*;
        match token.kind {
            DecLiteral | HexLiteral | OctLiteral => {
                let value = parse_int_literal(ctx.syms.resolve(token.text));
                *token = self.get_macro_token(ctx, base);
                value
            }
            CharLiteral => {
                let value = parse_char_literal(ctx.syms.resolve(token.text));
                *token = self.get_macro_token(ctx, base);
                value
            }
            LeftParenth => {
                *token = self.get_macro_token(ctx, base);
                let value = self.pp_conditional(token, ctx, base);
                if token.is(RightParenth) {
                    *token = self.get_macro_token(ctx, base);
                } else {
                    ctx.herr.error(
                        "expected `)` in preprocessor conditional expression",
                        token.loc,
                    );
                }
                value
            }
            EndOfCode => {
                ctx.herr
                    .error("expected expression in preprocessor conditional", token.loc);
                0
            }
            _ => {
                let what = token.describe(ctx.syms);
                ctx.herr.error(
                    format!("unexpected {what} in preprocessor conditional"),
                    token.loc,
                );
                *token = self.get_macro_token(ctx, base);
                0
            }
        }
    }
}

#[derive(Clone, Copy)]
enum PpBinOp {
    Mul,
    Div,
    Rem,
    Add,
    Sub,
    Shl,
    Shr,
    Lt,
    Gt,
    Le,
    Ge,
    Eq,
    Ne,
    BitAnd,
    BitXor,
    BitOr,
    And,
    Or,
}

fn classify_binary(token: &Token, ctx: &LexCtx) -> Option<(u8, PpBinOp)> {
    use PpBinOp::*;
    match token.kind {
        TokenKind::LessThan => Some((7, Lt)),
        TokenKind::GreaterThan => Some((7, Gt)),
        TokenKind::Operator => match ctx.syms.resolve(token.text) {
            "*" => Some((10, Mul)),
            "/" => Some((10, Div)),
            "%" => Some((10, Rem)),
            "+" => Some((9, Add)),
            "-" => Some((9, Sub)),
            "<<" => Some((8, Shl)),
            ">>" => Some((8, Shr)),
            "<=" => Some((7, Le)),
            ">=" => Some((7, Ge)),
            "==" => Some((6, Eq)),
            "!=" => Some((6, Ne)),
            "&" => Some((5, BitAnd)),
            "^" => Some((4, BitXor)),
            "|" => Some((3, BitOr)),
            "&&" => Some((2, And)),
            "||" => Some((1, Or)),
            _ => None,
        },
        _ => None,
    }
}

fn apply_binary(op: PpBinOp, lhs: i64, rhs: i64, loc: Loc, ctx: &LexCtx) -> i64 {
    use PpBinOp::*;
    match op {
        Mul => lhs.wrapping_mul(rhs),
        Div | Rem if rhs == 0 => {
            ctx.herr
                .error("division by zero in preprocessor conditional", loc);
            0
        }
        Div => lhs.wrapping_div(rhs),
        Rem => lhs.wrapping_rem(rhs),
        Add => lhs.wrapping_add(rhs),
        Sub => lhs.wrapping_sub(rhs),
        Shl => lhs.wrapping_shl(rhs as u32),
        Shr => lhs.wrapping_shr(rhs as u32),
        Lt => (lhs < rhs) as i64,
        Gt => (lhs > rhs) as i64,
        Le => (lhs <= rhs) as i64,
        Ge => (lhs >= rhs) as i64,
        Eq => (lhs == rhs) as i64,
        Ne => (lhs != rhs) as i64,
        BitAnd => lhs & rhs,
        BitXor => lhs ^ rhs,
        BitOr => lhs | rhs,
        And => ((lhs != 0) && (rhs != 0)) as i64,
        Or => ((lhs != 0) || (rhs != 0)) as i64,
    }
}
