//! The parse context: storage, lexer, classification, and the drive loop.

use cppdef_util::{DeclError, DeclResult, DefId, FxHashMap, Handler, Interner, SourceMap, Symbol};

use cppdef_lex::{LexCtx, Lexer, Token, TokenKind};
use cppdef_sem::{Builtins, DefFlags, DefTable};

/// Everything one parse owns.
///
/// The context is the single mutator of the definition tree; all engines
/// are methods on it, so re-entrancy is plain `&mut self` call nesting.
pub struct ParseContext {
    /// The definition arena; root scope at index 0.
    pub defs: DefTable,
    /// String interner shared by lexer and parser.
    pub syms: Interner,
    /// Buffer-name registry.
    pub map: SourceMap,
    /// Diagnostic sink.
    pub herr: Handler,
    /// Builtin types and modifiers.
    pub builtins: Builtins,
    /// The tokenizer.
    pub lexer: Lexer,
    /// The C-style tag namespace: class/union/enum names displaced from the
    /// member map by a typed redeclaration.
    pub c_structs: FxHashMap<Symbol, DefId>,
    /// Abort on the first diagnostic instead of recovering.
    pub strict: bool,
    /// Counter behind `<anonymousField%010d>` and friends.
    pub(crate) anon_count: u32,
    /// One-token pushback used for lookahead; stored unclassified.
    lookahead: Option<Token>,
}

impl ParseContext {
    /// Set up a parse over one source buffer. Builtins are installed into
    /// the root scope before any token is read.
    pub fn new(filename: &str, source: &str) -> Self {
        let mut syms = Interner::new();
        let mut defs = DefTable::new();
        let builtins = Builtins::install(&mut defs, &mut syms);
        let mut map = SourceMap::new();
        let file = map.add(filename);
        let lexer = Lexer::new(file, source, &mut syms);
        Self {
            defs,
            syms,
            map,
            herr: Handler::new(),
            builtins,
            lexer,
            c_structs: FxHashMap::default(),
            strict: false,
            anon_count: 0,
            lookahead: None,
        }
    }

    /// Parse a whole buffer: convenience over `new` + [`ParseContext::parse`].
    pub fn parse_source(filename: &str, source: &str) -> Self {
        let mut cx = Self::new(filename, source);
        cx.parse();
        cx
    }

    /// Drive the root scope to end of code. Diagnostics accumulate in
    /// `herr`; the tree holds whatever could be parsed.
    pub fn parse(&mut self) {
        let root = DefTable::ROOT_ID;
        let mut token = self.read_next_token(root);
        let _ = self.parse_scope_body(root, &mut token, DefFlags::EMPTY, TokenKind::EndOfCode);
    }

    /// The `FATAL_RETURN` policy: in strict mode any diagnostic aborts the
    /// enclosing declaration, in permissive mode parsing continues.
    pub(crate) fn fatal(&self) -> DeclResult<()> {
        if self.strict {
            Err(DeclError::Unrecoverable)
        } else {
            Ok(())
        }
    }

    /// Generate the next `<anonymousField%010d>`-style name.
    pub(crate) fn anon_name(&mut self, what: &str) -> Symbol {
        let name = format!("<anonymous{}{:010}>", what, self.anon_count);
        self.anon_count += 1;
        self.syms.intern(&name)
    }

    fn fetch_token(&mut self) -> Token {
        let Self {
            lexer,
            syms,
            builtins,
            herr,
            map,
            ..
        } = self;
        let mut ctx = LexCtx {
            syms,
            builtins,
            herr,
            map,
        };
        lexer.get_token(&mut ctx)
    }

    /// Next token with scope-sensitive classification: an identifier that
    /// names a type in `scope`'s chain becomes `Declarator`, any other
    /// resolved name becomes `Definition`.
    pub fn read_next_token(&mut self, scope: DefId) -> Token {
        let t = match self.lookahead.take() {
            Some(t) => t,
            None => self.fetch_token(),
        };
        self.classify_in_scope(t, scope)
    }

    /// Kind of the next token without consuming it. The token is kept
    /// unclassified; classification happens on delivery.
    pub(crate) fn peek_kind(&mut self) -> TokenKind {
        if self.lookahead.is_none() {
            let t = self.fetch_token();
            self.lookahead = Some(t);
        }
        self.lookahead.map(|t| t.kind).unwrap_or(TokenKind::EndOfCode)
    }

    fn classify_in_scope(&mut self, t: Token, scope: DefId) -> Token {
        if !t.is(TokenKind::Identifier) {
            return t;
        }
        match self.defs.lookup(scope, t.text) {
            Some(d) if self.defs.is_type_name(d) => {
                Token::with_def(TokenKind::Declarator, t.loc, t.text, d)
            }
            Some(d) => Token::with_def(TokenKind::Definition, t.loc, t.text, d),
            None => t,
        }
    }

    /// Report an error whose message ends in the offending token: the
    /// `%s` placeholder convention.
    pub(crate) fn report_errorf(&self, token: &Token, message: &str) {
        let what = token.describe(&self.syms);
        self.herr
            .error(message.replace("%s", &what), token.loc);
    }

    /// Declaration-level recovery: skip to the next `;`, `}` or `,` at the
    /// current bracket depth. The terminator is left in `token`.
    pub(crate) fn skip_declaration(&mut self, token: &mut Token, scope: DefId) {
        use TokenKind::*;
        let mut depth = 0i32;
        loop {
            match token.kind {
                EndOfCode => return,
                LeftBrace | LeftParenth | LeftBracket => depth += 1,
                RightBrace | RightParenth | RightBracket => {
                    if depth <= 0 {
                        return;
                    }
                    depth -= 1;
                }
                Semicolon | Comma if depth == 0 => return,
                _ => {}
            }
            *token = self.read_next_token(scope);
        }
    }

    /// Skip a balanced `{ ... }` block (function bodies are not parsed).
    /// Leaves `token` on the first token after the closing brace.
    pub(crate) fn skip_brace_block(&mut self, token: &mut Token, scope: DefId) {
        use TokenKind::*;
        debug_assert!(token.is(LeftBrace));
        let mut depth = 0i32;
        loop {
            match token.kind {
                LeftBrace => depth += 1,
                RightBrace => {
                    depth -= 1;
                    if depth == 0 {
                        *token = self.read_next_token(scope);
                        return;
                    }
                }
                EndOfCode => {
                    self.herr
                        .error("unexpected end of code inside a block", token.loc);
                    return;
                }
                _ => {}
            }
            *token = self.read_next_token(scope);
        }
    }

    /// Parse declarations in `scope` until `end` (or end of code).
    pub(crate) fn parse_scope_body(
        &mut self,
        scope: DefId,
        token: &mut Token,
        inherited: DefFlags,
        end: TokenKind,
    ) -> DeclResult<()> {
        use TokenKind::*;
        loop {
            if token.kind == end || token.is(EndOfCode) {
                return Ok(());
            }
            match token.kind {
                Semicolon => *token = self.read_next_token(scope),
                Namespace => {
                    if self.handle_namespace(scope, token, inherited).is_err() {
                        self.recover(token, scope);
                    }
                }
                Template => {
                    if self.handle_template(scope, token, inherited).is_err() {
                        self.recover(token, scope);
                    }
                }
                Typedef => {
                    if self.handle_typedef(scope, token, inherited).is_err() {
                        self.recover(token, scope);
                    }
                }
                Using => {
                    if self.handle_using(scope, token, inherited).is_err() {
                        self.recover(token, scope);
                    }
                }
                Public | Private | Protected => {
                    self.herr.error(
                        "access specifiers are only meaningful inside a class",
                        token.loc,
                    );
                    *token = self.read_next_token(scope);
                    if token.is(Colon) {
                        *token = self.read_next_token(scope);
                    }
                }
                _ => self.declaration_step(scope, token, inherited),
            }
        }
    }

    /// One declaration through the declarator handler, with recovery and a
    /// no-progress guard.
    pub(crate) fn declaration_step(&mut self, scope: DefId, token: &mut Token, inherited: DefFlags) {
        use TokenKind::*;
        let before = (token.kind, token.loc);
        match self.handle_declarators(scope, token, inherited) {
            Ok(_) => {
                if token.is(LeftBrace) {
                    // A function body; not parsed, only balanced.
                    self.skip_brace_block(token, scope);
                } else if token.is(Semicolon) {
                    *token = self.read_next_token(scope);
                } else if (token.kind, token.loc) == before {
                    self.report_errorf(token, "unexpected %s");
                    *token = self.read_next_token(scope);
                }
            }
            Err(_) => {
                self.recover(token, scope);
                if (token.kind, token.loc) == before && !token.is(EndOfCode) {
                    *token = self.read_next_token(scope);
                }
            }
        }
    }

    /// Post-error recovery: skip to a terminator and step past it when it
    /// is a `;` or `,`.
    pub(crate) fn recover(&mut self, token: &mut Token, scope: DefId) {
        use TokenKind::*;
        self.skip_declaration(token, scope);
        if token.is(Semicolon) || token.is(Comma) {
            *token = self.read_next_token(scope);
        }
    }

    /// Highest error status so far, 0 when the parse is clean. Mirrors the
    /// numeric contract of the declaration handlers.
    pub fn status(&self) -> i32 {
        if self.herr.has_errors() {
            1
        } else {
            0
        }
    }
}
