//! The C++ lexer.
//!
//! One token at a time, straight off the byte buffer. The classification
//! order for identifiers is fixed: macro table first (object-like macros
//! expand by pushing the current buffer and re-entering the loop), then the
//! keyword table, then the builtin-declarator registry, and only then plain
//! identifier. Scope-sensitive classification (`Definition`/`Declarator`
//! from name lookup) happens a level up, in the parse context.

use cppdef_util::{FileId, FxHashMap, Handler, Interner, Loc, SourceMap, Symbol};

use cppdef_sem::{BuiltinEntry, Builtins, UF_PRIMITIVE, UF_STANDALONE_FLAG};

use crate::chars::{is_digit, is_hexdigit, is_letter, is_letterd, is_newline, is_space};
use crate::directive::Condition;
use crate::macros::MacroTable;
use crate::reader::SourceReader;
use crate::token::{Token, TokenKind};

/// Everything the lexer borrows from the surrounding parse per call.
pub struct LexCtx<'a> {
    /// String interner for token payloads.
    pub syms: &'a mut Interner,
    /// Builtin-declarator registry.
    pub builtins: &'a Builtins,
    /// Diagnostic sink.
    pub herr: &'a Handler,
    /// Buffer-name registry; macro expansions register here.
    pub map: &'a mut SourceMap,
}

/// Expansion depth guard; `#define A A` style recursion hits this and
/// degrades to a plain identifier with a diagnostic.
pub(crate) const MACRO_DEPTH_LIMIT: usize = 512;

/// The tokenizer over a stack of source buffers.
pub struct Lexer {
    pub(crate) reader: SourceReader,
    /// Saved buffers for nested input: macro expansions and pushed sources.
    pub(crate) stack: Vec<SourceReader>,
    /// Open `#if`/`#ifdef` states, innermost last.
    pub(crate) conditionals: Vec<Condition>,
    /// Object-like macro table; written by `#define`/`#undef`.
    pub(crate) macros: MacroTable,
    keywords: FxHashMap<Symbol, TokenKind>,
}

impl Lexer {
    /// Create a lexer over a registered buffer.
    pub fn new(file: FileId, text: impl Into<Vec<u8>>, syms: &mut Interner) -> Self {
        use TokenKind::*;
        let mut keywords = FxHashMap::default();
        for (name, kind) in [
            ("class", Class),
            ("struct", Struct),
            ("union", Union),
            ("enum", Enum),
            ("namespace", Namespace),
            ("template", Template),
            ("typename", Typename),
            ("typedef", Typedef),
            ("using", Using),
            ("public", Public),
            ("private", Private),
            ("protected", Protected),
            ("operator", OperatorKw),
            ("sizeof", Sizeof),
            ("isempty", IsEmpty),
            ("asm", Asm),
            ("decltype", Decltype),
        ] {
            keywords.insert(syms.intern(name), kind);
        }
        Self {
            reader: SourceReader::new(file, text),
            stack: Vec::new(),
            conditionals: Vec::new(),
            macros: MacroTable::new(),
            keywords,
        }
    }

    /// The macro table.
    pub fn macros(&self) -> &MacroTable {
        &self.macros
    }

    /// Mutable access to the macro table, for predefined macros.
    pub fn macros_mut(&mut self) -> &mut MacroTable {
        &mut self.macros
    }

    /// Current conditional-stack depth: open `#if`-family directives minus
    /// closed `#endif`s.
    pub fn conditional_depth(&self) -> usize {
        self.conditionals.len()
    }

    /// Byte position in the active buffer.
    pub fn buffer_pos(&self) -> usize {
        self.reader.pos
    }

    /// Length of the active buffer.
    pub fn buffer_len(&self) -> usize {
        self.reader.len()
    }

    /// Push a nested source buffer; tokens come from it until exhausted,
    /// then the current buffer resumes.
    pub fn push_source(&mut self, name: &str, text: impl Into<Vec<u8>>, map: &mut SourceMap) {
        let file = map.add(name);
        let fresh = SourceReader::new(file, text);
        let saved = std::mem::replace(&mut self.reader, fresh);
        self.stack.push(saved);
    }

    /// Location of an absolute offset in the current buffer.
    pub(crate) fn loc_at(&self, pos: usize) -> Loc {
        Loc::new(self.reader.file, self.reader.line, self.reader.col_of(pos))
    }

    /// Location of the current position.
    pub(crate) fn cur_loc(&self) -> Loc {
        self.loc_at(self.reader.pos)
    }

    /// Produce the next token, or `EndOfCode` once every buffer is spent.
    ///
    /// Invalid bytes produce an `Invalid` token and advance exactly one
    /// byte; the position never moves past the buffer end.
    pub fn get_token(&mut self, ctx: &mut LexCtx) -> Token {
        loop {
            if self.reader.at_end() {
                match self.stack.pop() {
                    Some(mut saved) => {
                        self.reader.consume(&mut saved);
                        continue;
                    }
                    None => return Token::new(TokenKind::EndOfCode, self.cur_loc()),
                }
            }
            let b = self.reader.current();
            if is_space(b) {
                self.skip_whitespace();
                continue;
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
            if is_letter(b) {
                match self.lex_identifier(ctx) {
                    Some(token) => return token,
                    // A macro expansion opened a new buffer.
                    None => continue,
                }
            }
            if is_digit(b) {
                return self.lex_number(ctx);
            }
            if b == b'"' || b == b'\'' {
                return self.lex_quoted(ctx);
            }
            if b == b'#' {
                self.reader.pos += 1;
                self.handle_directive(ctx);
                while self.skipping() {
                    if !self.skip_to_region_end(ctx) {
                        break;
                    }
                }
                continue;
            }
            return self.lex_symbol(ctx);
        }
    }

    /// Skip whitespace, counting line breaks.
    pub(crate) fn skip_whitespace(&mut self) {
        while !self.reader.at_end() && is_space(self.reader.current()) {
            if is_newline(self.reader.current()) {
                self.reader.count_newline();
            }
            self.reader.pos += 1;
        }
    }

    /// Skip `//` to the line break, leaving the break unconsumed.
    pub(crate) fn skip_line_comment(&mut self) {
        self.reader.pos += 2;
        while !self.reader.at_end() && !is_newline(self.reader.current()) {
            self.reader.pos += 1;
        }
    }

    /// Skip `/* ... */`, counting lines. An unterminated comment simply
    /// exhausts the buffer.
    pub(crate) fn skip_block_comment(&mut self) {
        self.reader.pos += 2;
        while !self.reader.at_end() {
            let b = self.reader.current();
            if b == b'*' && self.reader.at(1) == b'/' {
                self.reader.pos += 2;
                return;
            }
            if is_newline(b) {
                self.reader.count_newline();
            }
            self.reader.pos += 1;
        }
    }

    /// Identifier path: macro, keyword, builtin, plain identifier.
    ///
    /// Returns `None` when an object-like macro expansion pushed a new
    /// buffer and the caller should re-enter the token loop.
    fn lex_identifier(&mut self, ctx: &mut LexCtx) -> Option<Token> {
        let spos = self.reader.pos;
        self.reader.pos += 1;
        while !self.reader.at_end() && is_letterd(self.reader.current()) {
            self.reader.pos += 1;
        }
        let text = self.reader.slice_str(spos, self.reader.pos).into_owned();
        let sym = ctx.syms.intern(&text);
        let loc = self.loc_at(spos);

        if let Some(mac) = self.macros.get(sym) {
            if self.stack.len() >= MACRO_DEPTH_LIMIT {
                ctx.herr
                    .error(format!("expansion of macro `{text}` is too deep"), loc);
            } else {
                let body = mac.body.clone();
                self.push_source(&text, body, ctx.map);
                return None;
            }
        }

        if let Some(&kind) = self.keywords.get(&sym) {
            return Some(Token::new(kind, loc));
        }

        if let Some(entry) = ctx.builtins.lookup(sym) {
            return Some(match entry {
                BuiltinEntry::Primitive(def) => {
                    Token::with_def(TokenKind::Declarator, loc, sym, def)
                }
                BuiltinEntry::Flag(id) => {
                    let tf = ctx.builtins.flag(id);
                    match tf.def {
                        Some(def) if tf.usage & UF_STANDALONE_FLAG == UF_PRIMITIVE => {
                            Token::with_def(TokenKind::Declarator, loc, sym, def)
                        }
                        _ => Token::with_flag(TokenKind::Decflag, loc, sym, id),
                    }
                }
            });
        }

        Some(Token::with_text(TokenKind::Identifier, loc, sym))
    }

    /// Numeric literal: hex, octal, or decimal, with the trailing letter
    /// suffix (`ull` and friends) included in the slice.
    pub(crate) fn lex_number(&mut self, ctx: &mut LexCtx) -> Token {
        let spos = self.reader.pos;
        let kind;
        if self.reader.current() == b'0' && matches!(self.reader.at(1), b'x' | b'X') {
            self.reader.pos += 2;
            while !self.reader.at_end() && is_hexdigit(self.reader.current()) {
                self.reader.pos += 1;
            }
            kind = TokenKind::HexLiteral;
        } else if self.reader.current() == b'0' && is_digit(self.reader.at(1)) {
            self.reader.pos += 1;
            while !self.reader.at_end() && is_digit(self.reader.current()) {
                self.reader.pos += 1;
            }
            kind = TokenKind::OctLiteral;
        } else {
            while !self.reader.at_end() && is_digit(self.reader.current()) {
                self.reader.pos += 1;
            }
            kind = TokenKind::DecLiteral;
        }
        while !self.reader.at_end() && is_letter(self.reader.current()) {
            self.reader.pos += 1;
        }
        let sym = {
            let text = self.reader.slice_str(spos, self.reader.pos);
            ctx.syms.intern(&text)
        };
        Token::with_text(kind, self.loc_at(spos), sym)
    }

    /// String or character literal, quotes included in the slice. Escaped
    /// line breaks continue the literal; a bare line break or the end of
    /// the buffer is an unterminated-literal diagnostic.
    pub(crate) fn lex_quoted(&mut self, ctx: &mut LexCtx) -> Token {
        let spos = self.reader.pos;
        let quote = self.reader.current();
        self.reader.pos += 1;
        loop {
            if self.reader.at_end() {
                ctx.herr
                    .error("unterminated string literal", self.loc_at(spos));
                break;
            }
            let b = self.reader.current();
            if b == quote {
                self.reader.pos += 1;
                break;
            }
            if b == b'\\' {
                self.reader.pos += 1;
                if self.reader.at_end() {
                    ctx.herr
                        .error("unterminated string literal", self.loc_at(spos));
                    break;
                }
                if is_newline(self.reader.current()) {
                    self.reader.count_newline();
                }
                self.reader.pos += 1;
                continue;
            }
            if is_newline(b) {
                ctx.herr
                    .error("unterminated string literal", self.loc_at(spos));
                break;
            }
            self.reader.pos += 1;
        }
        let kind = if quote == b'"' {
            TokenKind::StringLiteral
        } else {
            TokenKind::CharLiteral
        };
        let sym = {
            let text = self.reader.slice_str(spos, self.reader.pos);
            ctx.syms.intern(&text)
        };
        Token::with_text(kind, self.loc_at(spos), sym)
    }

    /// Punctuation and operators. The caller has already excluded `#`.
    pub(crate) fn lex_symbol(&mut self, ctx: &mut LexCtx) -> Token {
        use TokenKind::*;
        let spos = self.reader.pos;
        let b = self.reader.current();
        self.reader.pos += 1;
        let loc = self.loc_at(spos);
        match b {
            b';' => Token::new(Semicolon, loc),
            b',' => Token::new(Comma, loc),
            b'(' => Token::new(LeftParenth, loc),
            b')' => Token::new(RightParenth, loc),
            b'[' => Token::new(LeftBracket, loc),
            b']' => Token::new(RightBracket, loc),
            b'{' => Token::new(LeftBrace, loc),
            b'}' => Token::new(RightBrace, loc),
            b'~' => Token::new(Tilde, loc),
            b':' => {
                if self.reader.current() == b':' {
                    self.reader.pos += 1;
                    Token::new(Scope, loc)
                } else {
                    Token::new(Colon, loc)
                }
            }
            b'.' => {
                if self.reader.current() == b'.' && self.reader.at(1) == b'.' {
                    self.reader.pos += 2;
                    Token::new(Ellipsis, loc)
                } else {
                    self.operator_token(ctx, spos, loc)
                }
            }
            b'+' | b'-' => {
                let cur = self.reader.current();
                if cur == b || cur == b'=' {
                    self.reader.pos += 1;
                }
                self.operator_token(ctx, spos, loc)
            }
            b'=' => {
                if self.reader.current() == b'=' {
                    self.reader.pos += 1;
                }
                self.operator_token(ctx, spos, loc)
            }
            b'*' | b'%' | b'^' | b'/' => {
                if self.reader.current() == b'=' {
                    self.reader.pos += 1;
                }
                self.operator_token(ctx, spos, loc)
            }
            b'&' | b'|' | b'!' => {
                let cur = self.reader.current();
                if (cur == b && b != b'!') || cur == b'=' {
                    self.reader.pos += 1;
                }
                self.operator_token(ctx, spos, loc)
            }
            b'<' | b'>' => {
                if self.reader.current() == b {
                    self.reader.pos += 1;
                }
                if self.reader.current() == b'=' {
                    self.reader.pos += 1;
                }
                if self.reader.pos - spos == 1 {
                    let kind = if b == b'<' { LessThan } else { GreaterThan };
                    Token::new(kind, loc)
                } else {
                    self.operator_token(ctx, spos, loc)
                }
            }
            b'?' => self.operator_token(ctx, spos, loc),
            _ => Token::new(Invalid, loc),
        }
    }

    fn operator_token(&mut self, ctx: &mut LexCtx, spos: usize, loc: Loc) -> Token {
        let sym = {
            let text = self.reader.slice_str(spos, self.reader.pos);
            ctx.syms.intern(&text)
        };
        Token::with_text(TokenKind::Operator, loc, sym)
    }
}
