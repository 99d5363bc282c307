//! Typed indices shared across pipeline stages.

use crate::define_idx;

define_idx!(
    /// Index of a definition in the definition table.
    ///
    /// Definitions reference each other (parent scopes, base types, overload
    /// sets, template dependents) exclusively through `DefId`s; the arena in
    /// `cppdef-sem` owns the actual nodes, so back-references are weak by
    /// construction.
    DefId
);

define_idx!(
    /// Index of a builtin type-flag record (`const`, `unsigned`, ...).
    ///
    /// Carried on `Decflag` tokens so the type reader can fetch the flag's
    /// usage bits and implied primitive without a name lookup.
    FlagId
);

impl DefId {
    /// The root scope. The definition table always creates it first.
    pub const ROOT: DefId = DefId(0);
}
