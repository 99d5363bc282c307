//! cppdef-sem - The storage model behind the declaration parser.
//!
//! Everything the parser knows lives here: the definition arena and its
//! scope hierarchy, full types with their referencer stacks, argument keys
//! for overload sets and template specializations, constant-expression
//! trees, and the builtin-declarator registry.
//!
//! The model follows two structural rules:
//!
//! 1. **Arena + ids.** Definitions are stored in a single [`DefTable`]
//!    (an `IndexVec<DefId, Definition>`); every relationship between
//!    entities — parent scope, base type, overload, template dependent — is
//!    a [`DefId`](cppdef_util::DefId). Ownership flows strictly root-to-leaf
//!    through scope member lists, so child-to-parent back-references can
//!    never form ownership cycles.
//!
//! 2. **Tagged variants, not inheritance.** A [`Definition`] is a common
//!    header (name, parent, flags) plus a [`DefKind`] payload. The flag set
//!    selects behavior; the payload holds the data.

pub mod arg_key;
pub mod builtins;
pub mod def;
pub mod expr;
pub mod flags;
pub mod full_type;
pub mod value;

pub use arg_key::{ArgKey, ArgNode};
pub use builtins::{
    BuiltinEntry, Builtins, TypeFlagDef, UF_PRIMITIVE, UF_STANDALONE, UF_STANDALONE_FLAG,
};
pub use def::{
    DefKind, DefTable, Definition, FunctionData, HypotheticalData, ScopeData, TemplateData,
    TypedData, ValuedData,
};
pub use expr::{BinOp, Expr, UnOp};
pub use flags::{DefFlags, TypeFlags};
pub use full_type::{FullType, Parameter, RefNode, RefStack};
pub use value::Value;
