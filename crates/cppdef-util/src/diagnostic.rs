//! Error and warning reporting.
//!
//! The parser reports through a collecting [`Handler`]; nothing in the core
//! prints. A [`Diagnostic`] carries its severity, message and [`Loc`], and
//! [`Handler::render`] formats the collected set as `file:line:col: level:
//! message` lines against a [`SourceMap`].

use std::cell::RefCell;
use std::fmt;

use crate::span::{Loc, SourceMap};

/// Diagnostic severity level.
///
/// # Example
///
/// ```
/// use cppdef_util::Level;
///
/// assert_eq!(format!("{}", Level::Error), "error");
/// assert_eq!(format!("{}", Level::Warning), "warning");
/// ```
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Level {
    /// An error; the surrounding declaration is abandoned or recovered.
    Error,
    /// A warning; parsing continues unaffected.
    Warning,
}

impl fmt::Display for Level {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Level::Error => write!(f, "error"),
            Level::Warning => write!(f, "warning"),
        }
    }
}

/// A single diagnostic message with severity and location.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Diagnostic {
    /// Severity.
    pub level: Level,
    /// Human-readable message.
    pub message: String,
    /// Where the problem was noticed.
    pub loc: Loc,
}

impl Diagnostic {
    /// Create an error diagnostic.
    pub fn error(message: impl Into<String>, loc: Loc) -> Self {
        Self {
            level: Level::Error,
            message: message.into(),
            loc,
        }
    }

    /// Create a warning diagnostic.
    pub fn warning(message: impl Into<String>, loc: Loc) -> Self {
        Self {
            level: Level::Warning,
            message: message.into(),
            loc,
        }
    }
}

/// Collecting sink for diagnostics.
///
/// Interior mutability keeps the reporting entry points `&self`; the lexer
/// and parser hold a shared reference while mutating their own state.
///
/// # Example
///
/// ```
/// use cppdef_util::{Handler, Loc};
///
/// let herr = Handler::new();
/// herr.error("unexpected token", Loc::DUMMY);
/// assert!(herr.has_errors());
/// assert_eq!(herr.error_count(), 1);
/// ```
#[derive(Debug, Default)]
pub struct Handler {
    diagnostics: RefCell<Vec<Diagnostic>>,
    panic_on_error: bool,
}

impl Handler {
    /// Create a handler.
    pub fn new() -> Self {
        Self {
            diagnostics: RefCell::new(Vec::new()),
            panic_on_error: false,
        }
    }

    /// Create a handler that panics on the first error. Test-only strictness.
    pub fn new_panicking() -> Self {
        Self {
            diagnostics: RefCell::new(Vec::new()),
            panic_on_error: true,
        }
    }

    /// Report an error.
    pub fn error(&self, message: impl Into<String>, loc: Loc) {
        self.emit(Diagnostic::error(message, loc));
    }

    /// Report a warning.
    pub fn warning(&self, message: impl Into<String>, loc: Loc) {
        self.emit(Diagnostic::warning(message, loc));
    }

    /// Emit a pre-built diagnostic.
    pub fn emit(&self, diagnostic: Diagnostic) {
        if self.panic_on_error && diagnostic.level == Level::Error {
            panic!(
                "diagnostic error at {}: {}",
                diagnostic.loc, diagnostic.message
            );
        }
        self.diagnostics.borrow_mut().push(diagnostic);
    }

    /// Whether any errors have been reported.
    pub fn has_errors(&self) -> bool {
        self.diagnostics
            .borrow()
            .iter()
            .any(|d| d.level == Level::Error)
    }

    /// Number of reported errors.
    pub fn error_count(&self) -> usize {
        self.diagnostics
            .borrow()
            .iter()
            .filter(|d| d.level == Level::Error)
            .count()
    }

    /// Number of reported warnings.
    pub fn warning_count(&self) -> usize {
        self.diagnostics
            .borrow()
            .iter()
            .filter(|d| d.level == Level::Warning)
            .count()
    }

    /// Clone out the collected diagnostics.
    pub fn diagnostics(&self) -> Vec<Diagnostic> {
        self.diagnostics.borrow().clone()
    }

    /// Drain the collected diagnostics.
    pub fn take(&self) -> Vec<Diagnostic> {
        std::mem::take(&mut *self.diagnostics.borrow_mut())
    }

    /// Render all diagnostics as `file:line:col: level: message` lines.
    pub fn render(&self, map: &SourceMap) -> String {
        let mut out = String::new();
        for d in self.diagnostics.borrow().iter() {
            out.push_str(&format!(
                "{}:{}:{}: {}: {}\n",
                map.name(d.loc.file),
                d.loc.line,
                d.loc.col,
                d.level,
                d.message
            ));
        }
        out
    }
}
