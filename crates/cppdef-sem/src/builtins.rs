//! The builtin-declarator registry.
//!
//! Installed once into the root scope before parsing. The lexer consults
//! [`Builtins::lookup`] to classify identifiers: a pure primitive usage
//! lexes as a `Declarator` token carrying the type's [`DefId`], anything
//! else as a `Decflag` carrying a [`FlagId`] into the flag table.
//!
//! Usage bits follow the type reader's contract:
//!
//! - `UF_PRIMITIVE` alone: a concrete type (`int`, `char`, ...).
//! - `UF_PRIMITIVE | UF_STANDALONE`: a modifier that both implies a type
//!   when standing alone and can replace an overridable one (`unsigned`,
//!   `long`, ...).
//! - `UF_STANDALONE` alone: a qualifier that implies `int` when no type is
//!   named (`const x;` declares an int).
//! - no bits: a pure storage-class flag (`static`, `extern`, ...).

use cppdef_util::{DefId, FlagId, FxHashMap, FxHashSet, IndexVec, Interner, Symbol};

use crate::def::DefTable;
use crate::flags::TypeFlags;

/// The name denotes a concrete primitive type.
pub const UF_PRIMITIVE: u8 = 1;
/// The name implies a type when it stands alone.
pub const UF_STANDALONE: u8 = 2;
/// Mask of both usage bits.
pub const UF_STANDALONE_FLAG: u8 = UF_PRIMITIVE | UF_STANDALONE;

/// One builtin modifier record.
#[derive(Clone, Debug)]
pub struct TypeFlagDef {
    /// Spelling.
    pub name: Symbol,
    /// Usage bits (`UF_*`).
    pub usage: u8,
    /// The primitive this flag implies or overrides toward, if any.
    pub def: Option<DefId>,
    /// The qualifier bit the flag contributes.
    pub flagbit: TypeFlags,
}

/// What a builtin name resolves to.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BuiltinEntry {
    /// A concrete primitive type.
    Primitive(DefId),
    /// A modifier with usage bits.
    Flag(FlagId),
}

/// The installed builtin tables.
pub struct Builtins {
    /// Name → classification used by the lexer.
    pub declarators: FxHashMap<Symbol, BuiltinEntry>,
    /// Modifier records addressed by `FlagId`.
    pub flags: IndexVec<FlagId, TypeFlagDef>,
    /// `int`, the inferred and overridable default.
    pub type_int: DefId,
    /// `char`.
    pub type_char: DefId,
    /// `void`.
    pub type_void: DefId,
    /// `bool`.
    pub type_bool: DefId,
    /// `float`.
    pub type_float: DefId,
    /// `double`.
    pub type_double: DefId,
    /// `va_list`, the type of `...`.
    pub type_va_list: DefId,
    /// The `const` flag record.
    pub flag_const: FlagId,
    /// The `volatile` flag record.
    pub flag_volatile: FlagId,
    /// Base types that mark a parameter as variadic.
    pub variadics: FxHashSet<DefId>,
}

impl Builtins {
    /// Install the primitives into the root scope and build the registry.
    pub fn install(defs: &mut DefTable, syms: &mut Interner) -> Self {
        let root = DefTable::ROOT_ID;
        let mut declarators = FxHashMap::default();
        let mut flags: IndexVec<FlagId, TypeFlagDef> = IndexVec::new();

        let mut primitive = |defs: &mut DefTable,
                             syms: &mut Interner,
                             declarators: &mut FxHashMap<Symbol, BuiltinEntry>,
                             name: &str,
                             size: u32| {
            let sym = syms.intern(name);
            let id = defs.add_primitive(root, sym, size);
            declarators.insert(sym, BuiltinEntry::Primitive(id));
            id
        };

        let type_void = primitive(defs, syms, &mut declarators, "void", 0);
        let type_bool = primitive(defs, syms, &mut declarators, "bool", 1);
        let type_char = primitive(defs, syms, &mut declarators, "char", 1);
        primitive(defs, syms, &mut declarators, "wchar_t", 4);
        let type_int = primitive(defs, syms, &mut declarators, "int", 4);
        let type_float = primitive(defs, syms, &mut declarators, "float", 4);
        let type_double = primitive(defs, syms, &mut declarators, "double", 8);
        let type_va_list = primitive(defs, syms, &mut declarators, "va_list", 8);

        let mut flag = |syms: &mut Interner,
                        flags: &mut IndexVec<FlagId, TypeFlagDef>,
                        declarators: &mut FxHashMap<Symbol, BuiltinEntry>,
                        name: &str,
                        usage: u8,
                        def: Option<DefId>,
                        flagbit: TypeFlags| {
            let sym = syms.intern(name);
            let id = flags.push(TypeFlagDef {
                name: sym,
                usage,
                def,
                flagbit,
            });
            declarators.insert(sym, BuiltinEntry::Flag(id));
            id
        };

        let int = Some(type_int);
        flag(syms, &mut flags, &mut declarators, "signed", UF_STANDALONE_FLAG, int, TypeFlags::SIGNED);
        flag(syms, &mut flags, &mut declarators, "unsigned", UF_STANDALONE_FLAG, int, TypeFlags::UNSIGNED);
        flag(syms, &mut flags, &mut declarators, "short", UF_STANDALONE_FLAG, int, TypeFlags::SHORT);
        flag(syms, &mut flags, &mut declarators, "long", UF_STANDALONE_FLAG, int, TypeFlags::LONG);
        let flag_const = flag(syms, &mut flags, &mut declarators, "const", UF_STANDALONE, int, TypeFlags::CONST);
        let flag_volatile = flag(syms, &mut flags, &mut declarators, "volatile", UF_STANDALONE, int, TypeFlags::VOLATILE);
        flag(syms, &mut flags, &mut declarators, "static", 0, None, TypeFlags::STATIC);
        flag(syms, &mut flags, &mut declarators, "extern", 0, None, TypeFlags::EXTERN);
        flag(syms, &mut flags, &mut declarators, "register", 0, None, TypeFlags::REGISTER);
        flag(syms, &mut flags, &mut declarators, "inline", 0, None, TypeFlags::INLINE);
        flag(syms, &mut flags, &mut declarators, "virtual", 0, None, TypeFlags::VIRTUAL);
        flag(syms, &mut flags, &mut declarators, "mutable", 0, None, TypeFlags::MUTABLE);

        let mut variadics = FxHashSet::default();
        variadics.insert(type_va_list);

        Self {
            declarators,
            flags,
            type_int,
            type_char,
            type_void,
            type_bool,
            type_float,
            type_double,
            type_va_list,
            flag_const,
            flag_volatile,
            variadics,
        }
    }

    /// Classify a name against the registry.
    pub fn lookup(&self, name: Symbol) -> Option<BuiltinEntry> {
        self.declarators.get(&name).copied()
    }

    /// Borrow a flag record.
    pub fn flag(&self, id: FlagId) -> &TypeFlagDef {
        &self.flags[id]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fixture() -> (DefTable, Interner, Builtins) {
        let mut defs = DefTable::new();
        let mut syms = Interner::new();
        let builtins = Builtins::install(&mut defs, &mut syms);
        (defs, syms, builtins)
    }

    #[test]
    fn int_is_a_pure_primitive() {
        let (_, mut syms, builtins) = fixture();
        let sym = syms.intern("int");
        match builtins.lookup(sym) {
            Some(BuiltinEntry::Primitive(id)) => assert_eq!(id, builtins.type_int),
            other => panic!("unexpected classification: {other:?}"),
        }
    }

    #[test]
    fn unsigned_is_an_overridable_flag() {
        let (_, mut syms, builtins) = fixture();
        let sym = syms.intern("unsigned");
        let Some(BuiltinEntry::Flag(id)) = builtins.lookup(sym) else {
            panic!("unsigned should be a flag");
        };
        let tf = builtins.flag(id);
        assert_eq!(tf.usage, UF_STANDALONE_FLAG);
        assert_eq!(tf.def, Some(builtins.type_int));
        assert_eq!(tf.flagbit, TypeFlags::UNSIGNED);
    }

    #[test]
    fn const_is_standalone_only() {
        let (_, mut syms, builtins) = fixture();
        let sym = syms.intern("const");
        let Some(BuiltinEntry::Flag(id)) = builtins.lookup(sym) else {
            panic!("const should be a flag");
        };
        let tf = builtins.flag(id);
        assert_eq!(tf.usage, UF_STANDALONE);
        assert_eq!(tf.flagbit, TypeFlags::CONST);
    }

    #[test]
    fn static_has_no_usage_bits() {
        let (_, mut syms, builtins) = fixture();
        let sym = syms.intern("static");
        let Some(BuiltinEntry::Flag(id)) = builtins.lookup(sym) else {
            panic!("static should be a flag");
        };
        assert_eq!(builtins.flag(id).usage, 0);
        assert_eq!(builtins.flag(id).def, None);
    }

    #[test]
    fn primitives_resolve_in_root_scope() {
        let (defs, mut syms, builtins) = fixture();
        let sym = syms.intern("double");
        assert_eq!(
            defs.lookup(DefTable::ROOT_ID, sym),
            Some(builtins.type_double)
        );
    }

    #[test]
    fn va_list_is_variadic() {
        let (_, _, builtins) = fixture();
        assert!(builtins.variadics.contains(&builtins.type_va_list));
    }
}
