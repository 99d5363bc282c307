//! The macro table.
//!
//! Only object-like macros are representable; function-like definitions are
//! diagnosed at the `#define` site and skipped. A macro's replacement text
//! is stored verbatim (continuations already joined) and becomes a fresh
//! buffer when the macro is expanded.

use cppdef_util::{FxHashMap, Symbol};

/// One object-like macro.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MacroDef {
    /// The macro's name.
    pub name: Symbol,
    /// Replacement text.
    pub body: String,
}

/// Name → macro mapping, written by `#define`/`#undef` and read by the
/// identifier path of the lexer.
#[derive(Debug, Default)]
pub struct MacroTable {
    map: FxHashMap<Symbol, MacroDef>,
}

impl MacroTable {
    /// Create an empty table.
    pub fn new() -> Self {
        Self::default()
    }

    /// Define or redefine an object-like macro.
    pub fn define(&mut self, name: Symbol, body: impl Into<String>) {
        self.map.insert(
            name,
            MacroDef {
                name,
                body: body.into(),
            },
        );
    }

    /// Remove a macro; succeeds silently when absent, like `#undef`.
    pub fn undef(&mut self, name: Symbol) {
        self.map.remove(&name);
    }

    /// Look a name up.
    pub fn get(&self, name: Symbol) -> Option<&MacroDef> {
        self.map.get(&name)
    }

    /// `defined(name)`.
    pub fn contains(&self, name: Symbol) -> bool {
        self.map.contains_key(&name)
    }

    /// Number of live macros.
    pub fn len(&self) -> usize {
        self.map.len()
    }

    /// Whether no macros are defined.
    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }
}
