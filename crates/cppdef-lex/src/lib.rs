//! cppdef-lex - Tokenization and preprocessing for C++ declarations.
//!
//! The crate turns bytes into [`Token`]s. Three cooperating engines:
//!
//! 1. **The buffered reader** ([`reader`]): a contiguous byte buffer with
//!    position, line and line-start tracking. Buffers move between readers
//!    only by ownership transfer (`consume`); the lexer keeps a stack of
//!    saved readers, which is how macro expansion and nested input work.
//!
//! 2. **The main lexer** ([`lexer`]): whitespace and comments, identifiers
//!    (classified macro → keyword → builtin → identifier), numeric and
//!    quoted literals, operators and punctuation. On `#` it hands control
//!    to the directive engine ([`directive`]): object-macro definition and
//!    expansion, the full `#if`/`#elif`/`#else`/`#endif` conditional stack,
//!    `#error`/`#warning`, `#line`, with skipped regions scanned byte-wise
//!    (comments and literals respected, nothing tokenized).
//!
//! 3. **The macro-mode tokenizer** ([`pp_expr`]): the newline-terminated
//!    variant used for controlling expressions, with `##`/`#` tokens,
//!    `defined`, and the constant evaluator behind `#if`.
//!
//! Scope-sensitive classification (`Definition` vs `Declarator` by name
//! lookup) is deliberately absent here; the parse context layers it on top
//! of [`Lexer::get_token`].

pub mod chars;
pub mod directive;
pub mod lexer;
pub mod literal;
pub mod macros;
pub mod pp_expr;
pub mod reader;
pub mod token;

mod edge_cases;

pub use directive::Condition;
pub use lexer::{LexCtx, Lexer};
pub use literal::{parse_char_literal, parse_int_literal};
pub use macros::{MacroDef, MacroTable};
pub use reader::SourceReader;
pub use token::{Token, TokenKind};
