//! Flag sets for definitions and type qualifiers.
//!
//! Both sets are plain `u32` newtypes with named bit constants. Definition
//! flags select the variant-specific behavior of a definition (what kind of
//! entity it is, how it participates in lookup); type flags accumulate the
//! qualifier and storage-class words of a declaration specifier.

use std::fmt;
use std::ops::{BitAnd, BitOr, BitOrAssign};

/// Classification bits carried by every definition.
#[derive(Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct DefFlags(pub u32);

impl DefFlags {
    pub const EMPTY: DefFlags = DefFlags(0);
    /// Carries a full type (variables, typedefs, function results).
    pub const TYPED: DefFlags = DefFlags(1 << 0);
    /// Contains members (namespaces, classes, unions, enums, templates).
    pub const SCOPE: DefFlags = DefFlags(1 << 1);
    pub const CLASS: DefFlags = DefFlags(1 << 2);
    pub const UNION: DefFlags = DefFlags(1 << 3);
    pub const ENUM: DefFlags = DefFlags(1 << 4);
    pub const NAMESPACE: DefFlags = DefFlags(1 << 5);
    pub const FUNCTION: DefFlags = DefFlags(1 << 6);
    pub const TEMPLATE: DefFlags = DefFlags(1 << 7);
    /// Transient template parameter scope.
    pub const TEMPSCOPE: DefFlags = DefFlags(1 << 8);
    /// Usable as a type name in a declaration specifier.
    pub const TYPENAME: DefFlags = DefFlags(1 << 9);
    /// Unresolved dependent type awaiting template instantiation.
    pub const HYPOTHETICAL: DefFlags = DefFlags(1 << 10);
    /// Template parameter (type or non-type).
    pub const TEMPPARAM: DefFlags = DefFlags(1 << 11);
    /// Carries a compile-time value (enumerators, non-type arguments).
    pub const VALUED: DefFlags = DefFlags(1 << 12);
    /// Access control inherited from a `private:` label.
    pub const PRIVATE: DefFlags = DefFlags(1 << 13);
    /// Access control inherited from a `protected:` label.
    pub const PROTECTED: DefFlags = DefFlags(1 << 14);
    /// A template specialization; registered on its template, not in the
    /// enclosing scope's member map.
    pub const SPECIALIZATION: DefFlags = DefFlags(1 << 15);

    /// All of `other`'s bits are set.
    #[inline]
    pub fn contains(self, other: DefFlags) -> bool {
        self.0 & other.0 == other.0
    }

    /// Any of `other`'s bits are set.
    #[inline]
    pub fn intersects(self, other: DefFlags) -> bool {
        self.0 & other.0 != 0
    }

    /// No bits set.
    #[inline]
    pub fn is_empty(self) -> bool {
        self.0 == 0
    }
}

impl BitOr for DefFlags {
    type Output = DefFlags;
    #[inline]
    fn bitor(self, rhs: DefFlags) -> DefFlags {
        DefFlags(self.0 | rhs.0)
    }
}

impl BitOrAssign for DefFlags {
    #[inline]
    fn bitor_assign(&mut self, rhs: DefFlags) {
        self.0 |= rhs.0;
    }
}

impl BitAnd for DefFlags {
    type Output = DefFlags;
    #[inline]
    fn bitand(self, rhs: DefFlags) -> DefFlags {
        DefFlags(self.0 & rhs.0)
    }
}

impl fmt::Debug for DefFlags {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "DefFlags({:#x})", self.0)
    }
}

/// Qualifier and storage-class bits of a declaration specifier.
#[derive(Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TypeFlags(pub u32);

impl TypeFlags {
    pub const EMPTY: TypeFlags = TypeFlags(0);
    pub const CONST: TypeFlags = TypeFlags(1 << 0);
    pub const VOLATILE: TypeFlags = TypeFlags(1 << 1);
    pub const STATIC: TypeFlags = TypeFlags(1 << 2);
    pub const EXTERN: TypeFlags = TypeFlags(1 << 3);
    pub const SIGNED: TypeFlags = TypeFlags(1 << 4);
    pub const UNSIGNED: TypeFlags = TypeFlags(1 << 5);
    pub const SHORT: TypeFlags = TypeFlags(1 << 6);
    pub const LONG: TypeFlags = TypeFlags(1 << 7);
    /// Second `long`.
    pub const LONG_LONG: TypeFlags = TypeFlags(1 << 8);
    pub const REGISTER: TypeFlags = TypeFlags(1 << 9);
    pub const INLINE: TypeFlags = TypeFlags(1 << 10);
    pub const VIRTUAL: TypeFlags = TypeFlags(1 << 11);
    pub const MUTABLE: TypeFlags = TypeFlags(1 << 12);

    /// All of `other`'s bits are set.
    #[inline]
    pub fn contains(self, other: TypeFlags) -> bool {
        self.0 & other.0 == other.0
    }

    /// Any of `other`'s bits are set.
    #[inline]
    pub fn intersects(self, other: TypeFlags) -> bool {
        self.0 & other.0 != 0
    }

    /// No bits set.
    #[inline]
    pub fn is_empty(self) -> bool {
        self.0 == 0
    }

    /// OR in a qualifier, promoting a repeated `long` to `long long`.
    pub fn absorb(&mut self, bit: TypeFlags) {
        if bit == TypeFlags::LONG && self.contains(TypeFlags::LONG) {
            *self |= TypeFlags::LONG_LONG;
        } else {
            *self |= bit;
        }
    }

    /// The qualifier words in canonical spelling order.
    pub fn words(self) -> Vec<&'static str> {
        const SPELLINGS: &[(TypeFlags, &str)] = &[
            (TypeFlags::STATIC, "static"),
            (TypeFlags::EXTERN, "extern"),
            (TypeFlags::REGISTER, "register"),
            (TypeFlags::INLINE, "inline"),
            (TypeFlags::VIRTUAL, "virtual"),
            (TypeFlags::MUTABLE, "mutable"),
            (TypeFlags::CONST, "const"),
            (TypeFlags::VOLATILE, "volatile"),
            (TypeFlags::SIGNED, "signed"),
            (TypeFlags::UNSIGNED, "unsigned"),
            (TypeFlags::SHORT, "short"),
            (TypeFlags::LONG, "long"),
            (TypeFlags::LONG_LONG, "long"),
        ];
        SPELLINGS
            .iter()
            .filter(|(bit, _)| self.contains(*bit))
            .map(|&(_, word)| word)
            .collect()
    }
}

impl BitOr for TypeFlags {
    type Output = TypeFlags;
    #[inline]
    fn bitor(self, rhs: TypeFlags) -> TypeFlags {
        TypeFlags(self.0 | rhs.0)
    }
}

impl BitOrAssign for TypeFlags {
    #[inline]
    fn bitor_assign(&mut self, rhs: TypeFlags) {
        self.0 |= rhs.0;
    }
}

impl BitAnd for TypeFlags {
    type Output = TypeFlags;
    #[inline]
    fn bitand(self, rhs: TypeFlags) -> TypeFlags {
        TypeFlags(self.0 & rhs.0)
    }
}

impl fmt::Debug for TypeFlags {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "TypeFlags({:#x})", self.0)
    }
}
