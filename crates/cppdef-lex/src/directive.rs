//! Preprocessor directive handling.
//!
//! Entered from the token loop when a `#` is seen. One call handles exactly
//! one directive; when the conditional stack ends up inactive, the token
//! loop drives [`Lexer::skip_to_region_end`] until the region closes —
//! skipping is a loop between those two functions, never recursion.

use cppdef_util::Level;

use crate::chars::{is_letter, is_letterd, is_newline};
use crate::lexer::{LexCtx, Lexer};

/// One open conditional.
///
/// `is_true`: the branch currently selected is active. `can_be_true`: no
/// earlier sibling branch has been taken yet, so a later `#elif`/`#else`
/// may still activate.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Condition {
    pub is_true: bool,
    pub can_be_true: bool,
}

impl Condition {
    /// Shorthand constructor.
    pub fn new(is_true: bool, can_be_true: bool) -> Self {
        Self {
            is_true,
            can_be_true,
        }
    }
}

/// Which check an `#elif`-family directive re-evaluates.
#[derive(Clone, Copy)]
enum ElifKind {
    Expr,
    Defined { negated: bool },
}

impl Lexer {
    /// Whether the innermost conditional is inactive.
    pub(crate) fn skipping(&self) -> bool {
        self.conditionals.last().is_some_and(|c| !c.is_true)
    }

    /// Handle one directive; the leading `#` is already consumed.
    pub(crate) fn handle_directive(&mut self, ctx: &mut LexCtx) {
        while matches!(self.reader.current(), b' ' | b'\t') {
            self.reader.pos += 1;
        }
        let spos = self.reader.pos;
        while !self.reader.at_end() && is_letterd(self.reader.current()) {
            self.reader.pos += 1;
        }
        let word = self.reader.slice_str(spos, self.reader.pos).into_owned();
        match word.as_str() {
            "define" => self.pp_define(ctx),
            "undef" => self.pp_undef(ctx),
            "if" => self.pp_if(ctx),
            "ifdef" => self.pp_ifdef(ctx, false),
            "ifndef" => self.pp_ifdef(ctx, true),
            "elif" => self.pp_elif(ctx, ElifKind::Expr),
            "elifdef" => self.pp_elif(ctx, ElifKind::Defined { negated: false }),
            "elifndef" => self.pp_elif(ctx, ElifKind::Defined { negated: true }),
            "else" => self.pp_else(ctx),
            "endif" => self.pp_endif(ctx),
            "error" => self.pp_message(ctx, Level::Error),
            "warning" => self.pp_message(ctx, Level::Warning),
            "line" => self.pp_line(ctx),
            // Inclusion is resolved by the embedder through push_source;
            // these directives are consumed without effect here.
            "include" | "import" | "pragma" | "using" => self.skip_line(),
            // Null directive.
            "" if is_newline(self.reader.current()) || self.reader.at_end() => {}
            _ => {
                if !self.skipping() {
                    ctx.herr.error(
                        format!("invalid preprocessor directive `{word}`"),
                        self.loc_at(spos),
                    );
                }
                self.skip_line();
            }
        }
    }

    /// Inside an inactive region: advance to the next `#` at the start of a
    /// line (comments and literals respected, nothing tokenized) and handle
    /// that directive. Returns false when the buffer ends first.
    pub(crate) fn skip_to_region_end(&mut self, ctx: &mut LexCtx) -> bool {
        while !self.reader.at_end() {
            // Burn the rest of the current line.
            while !self.reader.at_end() && !is_newline(self.reader.current()) {
                let b = self.reader.current();
                if b == b'/' && self.reader.at(1) == b'*' {
                    self.skip_block_comment();
                    continue;
                }
                if b == b'/' && self.reader.at(1) == b'/' {
                    self.skip_line_comment();
                    continue;
                }
                if b == b'"' || b == b'\'' {
                    self.skip_quoted_raw();
                    continue;
                }
                self.reader.pos += 1;
            }
            if self.reader.at_end() {
                break;
            }
            self.skip_whitespace();
            if self.reader.current() == b'#' {
                self.reader.pos += 1;
                self.handle_directive(ctx);
                return true;
            }
        }
        ctx.herr.error(
            "expected closing preprocessor conditional before end of code",
            self.cur_loc(),
        );
        false
    }

    /// Skip a quoted literal without tokenizing; used inside skipped
    /// regions. Stops at an unescaped line break.
    fn skip_quoted_raw(&mut self) {
        let quote = self.reader.current();
        self.reader.pos += 1;
        while !self.reader.at_end() {
            let b = self.reader.current();
            if b == quote {
                self.reader.pos += 1;
                return;
            }
            if b == b'\\' {
                self.reader.pos += 1;
                if self.reader.at_end() {
                    return;
                }
                if is_newline(self.reader.current()) {
                    self.reader.count_newline();
                }
                self.reader.pos += 1;
                continue;
            }
            if is_newline(b) {
                return;
            }
            self.reader.pos += 1;
        }
    }

    /// Advance to the line break without consuming it.
    pub(crate) fn skip_line(&mut self) {
        while !self.reader.at_end() && !is_newline(self.reader.current()) {
            self.reader.pos += 1;
        }
    }

    /// Read to the line break, joining `\`-continuations into one logical
    /// line and counting the continued lines.
    fn read_logical_line(&mut self) -> String {
        let mut out = String::new();
        while !self.reader.at_end() {
            let b = self.reader.current();
            if is_newline(b) {
                break;
            }
            if b == b'\\' && is_newline(self.reader.at(1)) {
                self.reader.pos += 1;
                self.reader.count_newline();
                self.reader.pos += 1;
                out.push(' ');
                continue;
            }
            out.push(b as char);
            self.reader.pos += 1;
        }
        out
    }

    /// Read a directive-level identifier after optional blanks.
    fn read_name(&mut self) -> Option<String> {
        while matches!(self.reader.current(), b' ' | b'\t') {
            self.reader.pos += 1;
        }
        if !is_letter(self.reader.current()) {
            return None;
        }
        let spos = self.reader.pos;
        while !self.reader.at_end() && is_letterd(self.reader.current()) {
            self.reader.pos += 1;
        }
        Some(self.reader.slice_str(spos, self.reader.pos).into_owned())
    }

    fn pp_define(&mut self, ctx: &mut LexCtx) {
        if self.skipping() {
            self.skip_line();
            return;
        }
        let loc = self.cur_loc();
        let Some(name) = self.read_name() else {
            ctx.herr.error("expected macro name after #define", loc);
            self.skip_line();
            return;
        };
        if self.reader.current() == b'(' {
            // Function-like macros are reserved.
            ctx.herr.error(
                format!("function-like macro `{name}` is not supported"),
                loc,
            );
            self.read_logical_line();
            return;
        }
        let body = self.read_logical_line().trim().to_string();
        let sym = ctx.syms.intern(&name);
        self.macros.define(sym, body);
    }

    fn pp_undef(&mut self, ctx: &mut LexCtx) {
        if self.skipping() {
            self.skip_line();
            return;
        }
        let loc = self.cur_loc();
        match self.read_name() {
            Some(name) => {
                let sym = ctx.syms.intern(&name);
                self.macros.undef(sym);
            }
            None => ctx.herr.error("expected macro name after #undef", loc),
        }
        self.skip_line();
    }

    fn pp_if(&mut self, ctx: &mut LexCtx) {
        if self.skipping() {
            self.conditionals.push(Condition::new(false, false));
            self.skip_line();
            return;
        }
        let value = self.eval_pp_expression(ctx);
        self.skip_line();
        let taken = value != 0;
        self.conditionals.push(Condition::new(taken, !taken));
    }

    fn pp_ifdef(&mut self, ctx: &mut LexCtx, negated: bool) {
        if self.skipping() {
            self.conditionals.push(Condition::new(false, false));
            self.skip_line();
            return;
        }
        let loc = self.cur_loc();
        let defined = match self.read_name() {
            Some(name) => {
                let sym = ctx.syms.intern(&name);
                self.macros.contains(sym)
            }
            None => {
                ctx.herr.error("expected macro name after #ifdef", loc);
                false
            }
        };
        self.skip_line();
        let taken = defined != negated;
        self.conditionals.push(Condition::new(taken, !taken));
    }

    fn pp_else(&mut self, ctx: &mut LexCtx) {
        if self.conditionals.is_empty() {
            let loc = self.cur_loc();
            ctx.herr
                .error("unexpected #else directive; no matching #if", loc);
        } else if let Some(top) = self.conditionals.last_mut() {
            if top.is_true {
                top.is_true = false;
                top.can_be_true = false;
            } else {
                top.is_true = top.can_be_true;
            }
        }
        self.skip_line();
    }

    fn pp_elif(&mut self, ctx: &mut LexCtx, kind: ElifKind) {
        let Some(top) = self.conditionals.last().copied() else {
            let loc = self.cur_loc();
            ctx.herr
                .error("unexpected #elif directive; no matching #if", loc);
            self.skip_line();
            return;
        };
        if top.is_true {
            if let Some(t) = self.conditionals.last_mut() {
                t.is_true = false;
                t.can_be_true = false;
            }
            self.skip_line();
        } else if top.can_be_true {
            // Re-evaluate as if this were the opening #if.
            self.conditionals.pop();
            match kind {
                ElifKind::Expr => self.pp_if(ctx),
                ElifKind::Defined { negated } => self.pp_ifdef(ctx, negated),
            }
        } else {
            self.skip_line();
        }
    }

    fn pp_endif(&mut self, ctx: &mut LexCtx) {
        if self.conditionals.pop().is_none() {
            let loc = self.cur_loc();
            ctx.herr
                .error("unexpected #endif directive: no open conditionals", loc);
        }
        self.skip_line();
    }

    /// `#error` / `#warning`: the remaining line is the message. Suppressed
    /// inside inactive regions.
    fn pp_message(&mut self, ctx: &mut LexCtx, level: Level) {
        while matches!(self.reader.current(), b' ' | b'\t') {
            self.reader.pos += 1;
        }
        let loc = self.cur_loc();
        let spos = self.reader.pos;
        self.skip_line();
        if self.skipping() {
            return;
        }
        let text = self.reader.slice_str(spos, self.reader.pos).into_owned();
        match level {
            Level::Error => ctx.herr.error(format!("#error {text}"), loc),
            Level::Warning => ctx.herr.warning(format!("#warning {text}"), loc),
        }
    }

    /// `#line N`: renumber so the following line reads as line N.
    fn pp_line(&mut self, ctx: &mut LexCtx) {
        if self.skipping() {
            self.skip_line();
            return;
        }
        let loc = self.cur_loc();
        while matches!(self.reader.current(), b' ' | b'\t') {
            self.reader.pos += 1;
        }
        let spos = self.reader.pos;
        while self.reader.current().is_ascii_digit() {
            self.reader.pos += 1;
        }
        let digits = self.reader.slice_str(spos, self.reader.pos);
        match digits.parse::<u32>() {
            Ok(n) => self.reader.line = n.saturating_sub(1),
            Err(_) => ctx.herr.error("expected line number after #line", loc),
        }
        self.skip_line();
    }
}
