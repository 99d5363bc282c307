//! cppdef-util - Foundation types for the cppdef parser pipeline.
//!
//! This crate provides the shared infrastructure every other stage builds
//! on: source locations, diagnostics, string interning, typed index vectors,
//! and the severity-coded error type that drives error recovery.
//!
//! The pieces are intentionally small and self-contained:
//!
//! - [`span`] — [`FileId`], [`Loc`] (file/line/column) and the [`SourceMap`]
//!   that resolves file ids back to names. Every token and diagnostic carries
//!   a `Loc`.
//! - [`diagnostic`] — [`Level`], [`Diagnostic`] and the collecting
//!   [`Handler`]. The parser never prints; it reports into a `Handler` and
//!   the embedder decides what to do with the collected diagnostics.
//! - [`symbol`] — [`Symbol`] and [`Interner`]. Identifiers, operator
//!   spellings and literal slices are interned once so that tokens and
//!   definition names stay `Copy` and compare as integers.
//! - [`index_vec`] — the [`Idx`] trait, [`IndexVec`] and [`define_idx!`],
//!   used for the definition arena and the builtin-flag registry.
//! - [`def_id`] — [`DefId`] and [`FlagId`], the typed indices shared across
//!   stage boundaries.
//! - [`error`] — [`DeclError`], whose numeric status (1, 3, 5) tells a
//!   caller how far to unwind before resuming the parse.

pub mod def_id;
pub mod diagnostic;
pub mod error;
pub mod index_vec;
pub mod span;
pub mod symbol;

pub use def_id::{DefId, FlagId};
pub use diagnostic::{Diagnostic, Handler, Level};
pub use error::{DeclError, DeclResult};
pub use index_vec::{Idx, IndexVec};
pub use span::{FileId, Loc, SourceMap};
pub use symbol::{Interner, Symbol};

// Re-export commonly used hash containers
pub use rustc_hash::FxHashMap;
pub use rustc_hash::FxHashSet;
