//! The token model.
//!
//! Tokens are small `Copy` values: a kind, a location, an interned text
//! payload (the empty symbol when the kind has no spelling) and optional
//! handles into the definition table (`Declarator`/`Definition` tokens) or
//! the builtin-flag registry (`Decflag` tokens).

use cppdef_util::{DefId, FlagId, Interner, Loc, Symbol};
use static_assertions::const_assert;

/// Wire-level token classification.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TokenKind {
    /// A name that resolved to nothing.
    Identifier,
    /// A name that resolved to a non-type definition in scope.
    Definition,
    /// A name that denotes a type (builtin primitive or scope lookup).
    Declarator,
    /// A type modifier keyword (`const`, `unsigned`, `static`, ...).
    Decflag,
    Class,
    Struct,
    Union,
    Enum,
    Namespace,
    Extern,
    Template,
    Typename,
    Typedef,
    Using,
    Public,
    Private,
    Protected,
    Asm,
    Sizeof,
    IsEmpty,
    /// The `operator` keyword.
    OperatorKw,
    Decltype,
    /// Any operator without a dedicated kind; spelling in `text`.
    Operator,
    Tilde,
    Comma,
    Semicolon,
    Colon,
    /// `::`
    Scope,
    LeftParenth,
    RightParenth,
    LeftBracket,
    RightBracket,
    LeftBrace,
    RightBrace,
    LessThan,
    GreaterThan,
    /// `...`
    Ellipsis,
    StringLiteral,
    CharLiteral,
    DecLiteral,
    HexLiteral,
    OctLiteral,
    /// `##`, macro-mode only.
    Concat,
    /// `#`, macro-mode only.
    ToString,
    EndOfCode,
    Invalid,
}

/// One lexed token.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Token {
    /// Classification.
    pub kind: TokenKind,
    /// Source position of the token's first byte.
    pub loc: Loc,
    /// Interned spelling; `Symbol::EMPTY` for structural tokens.
    pub text: Symbol,
    /// Definition handle for `Declarator`/`Definition` tokens.
    pub def: Option<DefId>,
    /// Flag handle for `Decflag` tokens.
    pub flag: Option<FlagId>,
}

// The lexer's inner loop copies tokens freely; keep them register-friendly.
const_assert!(std::mem::size_of::<Token>() <= 56);

impl Token {
    /// A payload-free token.
    pub fn new(kind: TokenKind, loc: Loc) -> Self {
        Self {
            kind,
            loc,
            text: Symbol::EMPTY,
            def: None,
            flag: None,
        }
    }

    /// A token with a spelling.
    pub fn with_text(kind: TokenKind, loc: Loc, text: Symbol) -> Self {
        Self {
            kind,
            loc,
            text,
            def: None,
            flag: None,
        }
    }

    /// A token carrying a definition handle.
    pub fn with_def(kind: TokenKind, loc: Loc, text: Symbol, def: DefId) -> Self {
        Self {
            kind,
            loc,
            text,
            def: Some(def),
            flag: None,
        }
    }

    /// A token carrying a builtin-flag handle.
    pub fn with_flag(kind: TokenKind, loc: Loc, text: Symbol, flag: FlagId) -> Self {
        Self {
            kind,
            loc,
            text,
            def: None,
            flag: Some(flag),
        }
    }

    /// Shorthand kind test.
    #[inline]
    pub fn is(&self, kind: TokenKind) -> bool {
        self.kind == kind
    }

    /// Whether this token's spelling equals `s` (single ASCII byte).
    #[inline]
    pub fn text_is(&self, syms: &Interner, s: &str) -> bool {
        syms.resolve(self.text) == s
    }

    /// A human-readable name for diagnostics; this is what replaces the
    /// `%s` placeholder in formatted error messages.
    pub fn describe(&self, syms: &Interner) -> String {
        use TokenKind::*;
        match self.kind {
            Identifier => format!("identifier `{}`", syms.resolve(self.text)),
            Definition | Declarator => format!("`{}`", syms.resolve(self.text)),
            Decflag => format!("`{}`", syms.resolve(self.text)),
            Operator => format!("operator `{}`", syms.resolve(self.text)),
            StringLiteral => "string literal".to_string(),
            CharLiteral => "character literal".to_string(),
            DecLiteral | HexLiteral | OctLiteral => {
                format!("literal `{}`", syms.resolve(self.text))
            }
            EndOfCode => "end of code".to_string(),
            Invalid => "invalid token".to_string(),
            kind => format!("`{}`", fixed_spelling(kind)),
        }
    }
}

fn fixed_spelling(kind: TokenKind) -> &'static str {
    use TokenKind::*;
    match kind {
        Class => "class",
        Struct => "struct",
        Union => "union",
        Enum => "enum",
        Namespace => "namespace",
        Extern => "extern",
        Template => "template",
        Typename => "typename",
        Typedef => "typedef",
        Using => "using",
        Public => "public",
        Private => "private",
        Protected => "protected",
        Asm => "asm",
        Sizeof => "sizeof",
        IsEmpty => "isempty",
        OperatorKw => "operator",
        Decltype => "decltype",
        Tilde => "~",
        Comma => ",",
        Semicolon => ";",
        Colon => ":",
        Scope => "::",
        LeftParenth => "(",
        RightParenth => ")",
        LeftBracket => "[",
        RightBracket => "]",
        LeftBrace => "{",
        RightBrace => "}",
        LessThan => "<",
        GreaterThan => ">",
        Ellipsis => "...",
        Concat => "##",
        ToString => "#",
        _ => "?",
    }
}
