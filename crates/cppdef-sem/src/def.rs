//! The definition model: named entities in a hierarchical scope.
//!
//! Definitions live in a single arena ([`DefTable`]) and reference each
//! other by [`DefId`]. The root scope is created with the table and owns
//! everything transitively; parent links are ids, so child-to-parent
//! references are weak by construction. A definition is a common header
//! (name, parent, flags) plus a variant payload — a tagged enum rather than
//! an inheritance tree.

use std::collections::BTreeMap;

use cppdef_util::{DefId, IndexVec, Interner, Symbol};
use indexmap::IndexMap;

use crate::arg_key::ArgKey;
use crate::expr::Expr;
use crate::flags::DefFlags;
use crate::full_type::FullType;
use crate::value::Value;

/// A named entity: common header plus variant payload.
#[derive(Clone, Debug)]
pub struct Definition {
    /// The entity's name; empty for the root scope and anonymous entities
    /// until a generated name is assigned.
    pub name: Symbol,
    /// Owning scope; `None` only for the root.
    pub parent: Option<DefId>,
    /// Classification bits; these select which payload operations apply.
    pub flags: DefFlags,
    /// Variant payload.
    pub kind: DefKind,
}

/// Variant payload of a definition.
#[derive(Clone, Debug)]
pub enum DefKind {
    /// A builtin primitive type with its storage size in bytes.
    Primitive { size: u32 },
    /// A member container: namespace, class, union, enum, or a template
    /// instance.
    Scope(ScopeData),
    /// A typed entity: variable, field, typedef.
    Typed(TypedData),
    /// A function with an overload set.
    Function(FunctionData),
    /// A template; doubles as its own parameter scope.
    Template(TemplateData),
    /// An unresolved dependent type inside a template.
    Hypothetical(HypotheticalData),
    /// A compile-time value: enumerator or non-type template argument.
    Valued(ValuedData),
}

/// Member storage for scope-like definitions.
///
/// `members` is insertion-ordered (diagnostics walk it in declaration
/// order); `dec_order` additionally records entities that never enter the
/// name map, such as hypotheticals.
#[derive(Clone, Debug, Default)]
pub struct ScopeData {
    /// Name → definition; keys unique per scope.
    pub members: IndexMap<Symbol, DefId>,
    /// Declaration order, including unnamed entries.
    pub dec_order: Vec<DefId>,
    /// Scopes imported by `using namespace`.
    pub usings: Vec<DefId>,
    /// Base classes, in declaration order.
    pub bases: Vec<DefId>,
}

/// Payload of a typed definition.
#[derive(Clone, Debug, Default)]
pub struct TypedData {
    /// The declared full type.
    pub ty: FullType,
    /// Initializer expression, when one was parsed.
    pub init: Option<Expr>,
    /// Bit-field width, when one was parsed.
    pub bit_width: Option<u32>,
}

/// Payload of a function definition.
#[derive(Clone, Debug)]
pub struct FunctionData {
    /// The signature this definition was first declared with.
    pub ty: FullType,
    /// All registered signatures, keyed by parameter types. The primary
    /// signature is included, mapping to the function itself.
    pub overloads: BTreeMap<ArgKey, DefId>,
}

/// Payload of a template definition.
///
/// The template is its own parameter scope: looking up a name inside the
/// parameterized declaration passes through `scope` before reaching the
/// enclosing scope.
#[derive(Clone, Debug, Default)]
pub struct TemplateData {
    /// Parameter definitions, in declaration order.
    pub params: Vec<DefId>,
    /// The transient parameter scope's member storage.
    pub scope: ScopeData,
    /// The parameterized definition, once parsed.
    pub wrapped: Option<DefId>,
    /// Explicit specializations keyed by argument tuple.
    pub specializations: BTreeMap<ArgKey, DefId>,
    /// Materialized instantiations keyed by argument tuple.
    pub instances: BTreeMap<ArgKey, DefId>,
    /// Hypotheticals awaiting this template's instantiation. Non-owning:
    /// each hypothetical lives in its own enclosing scope's `dec_order`.
    pub dependents: Vec<DefId>,
}

/// Payload of a hypothetical definition. The expression is immutable after
/// creation.
#[derive(Clone, Debug)]
pub struct HypotheticalData {
    /// The dependent expression to evaluate at instantiation time.
    pub expr: Expr,
}

/// Payload of a valued definition.
#[derive(Clone, Debug)]
pub struct ValuedData {
    /// The value's type.
    pub ty: FullType,
    /// The value itself.
    pub value: Value,
}

/// The definition arena.
pub struct DefTable {
    defs: IndexVec<DefId, Definition>,
}

impl DefTable {
    /// The root scope's id.
    pub const ROOT_ID: DefId = DefId::ROOT;

    /// Create a table holding only the root scope.
    pub fn new() -> Self {
        let mut defs = IndexVec::new();
        defs.push(Definition {
            name: Symbol::EMPTY,
            parent: None,
            flags: DefFlags::NAMESPACE | DefFlags::SCOPE,
            kind: DefKind::Scope(ScopeData::default()),
        });
        Self { defs }
    }

    /// Append a definition without touching any member map.
    pub fn push(&mut self, def: Definition) -> DefId {
        self.defs.push(def)
    }

    /// Number of definitions, root included.
    pub fn len(&self) -> usize {
        self.defs.len()
    }

    /// Never true: the root always exists.
    pub fn is_empty(&self) -> bool {
        self.defs.is_empty()
    }

    /// Borrow a definition.
    pub fn def(&self, id: DefId) -> &Definition {
        &self.defs[id]
    }

    /// Mutably borrow a definition.
    pub fn def_mut(&mut self, id: DefId) -> &mut Definition {
        &mut self.defs[id]
    }

    /// Iterate over all definitions in creation order.
    pub fn iter(&self) -> impl Iterator<Item = (DefId, &Definition)> {
        self.defs.iter_enumerated()
    }

    /// The definition's name as a string.
    pub fn name_str<'a>(&self, id: DefId, syms: &'a Interner) -> &'a str {
        syms.resolve(self.defs[id].name)
    }

    /// Scope storage of a scope-like definition (scopes and templates).
    pub fn scope_data(&self, id: DefId) -> Option<&ScopeData> {
        match &self.defs[id].kind {
            DefKind::Scope(s) => Some(s),
            DefKind::Template(t) => Some(&t.scope),
            _ => None,
        }
    }

    /// Mutable scope storage of a scope-like definition.
    pub fn scope_data_mut(&mut self, id: DefId) -> Option<&mut ScopeData> {
        match &mut self.defs[id].kind {
            DefKind::Scope(s) => Some(s),
            DefKind::Template(t) => Some(&mut t.scope),
            _ => None,
        }
    }

    /// Install a builtin primitive into a scope.
    pub fn add_primitive(&mut self, scope: DefId, name: Symbol, size: u32) -> DefId {
        let id = self.push(Definition {
            name,
            parent: Some(scope),
            flags: DefFlags::TYPENAME,
            kind: DefKind::Primitive { size },
        });
        let data = self
            .scope_data_mut(scope)
            .expect("primitives install into a scope");
        data.members.insert(name, id);
        data.dec_order.push(id);
        id
    }

    /// Insert `def` into `scope` under `name`.
    ///
    /// Returns `Err(existing)` without modifying anything if the name is
    /// taken; an inserted name is never silently overwritten.
    pub fn declare(&mut self, scope: DefId, name: Symbol, def: DefId) -> Result<(), DefId> {
        let data = self
            .scope_data_mut(scope)
            .expect("declaration target is a scope");
        if let Some(&existing) = data.members.get(&name) {
            return Err(existing);
        }
        data.members.insert(name, def);
        data.dec_order.push(def);
        Ok(())
    }

    /// Replace the member slot for `name`, returning the previous occupant.
    ///
    /// Only the tag-namespace cross-indexing path uses this; the displaced
    /// definition stays reachable through the C-tag namespace.
    pub fn redeclare(&mut self, scope: DefId, name: Symbol, def: DefId) -> Option<DefId> {
        let data = self
            .scope_data_mut(scope)
            .expect("declaration target is a scope");
        let old = data.members.insert(name, def);
        data.dec_order.push(def);
        old
    }

    /// Record an unnamed entity (e.g. a hypothetical) in declaration order.
    pub fn push_dec_order(&mut self, scope: DefId, def: DefId) {
        if let Some(data) = self.scope_data_mut(scope) {
            data.dec_order.push(def);
        }
    }

    /// Look a name up in one scope: members first, then `using namespace`
    /// imports.
    pub fn lookup_local(&self, scope: DefId, name: Symbol) -> Option<DefId> {
        let data = self.scope_data(scope)?;
        if let Some(&id) = data.members.get(&name) {
            return Some(id);
        }
        for &used in &data.usings {
            if let Some(d) = self.scope_data(used) {
                if let Some(&id) = d.members.get(&name) {
                    return Some(id);
                }
            }
        }
        None
    }

    /// Look a name up through the scope chain, innermost first.
    pub fn lookup(&self, scope: DefId, name: Symbol) -> Option<DefId> {
        let mut at = Some(scope);
        while let Some(s) = at {
            if let Some(found) = self.lookup_local(s, name) {
                return Some(found);
            }
            at = self.defs[s].parent;
        }
        None
    }

    /// The nearest enclosing definition (including `scope` itself) with the
    /// `TEMPLATE` flag.
    pub fn nearest_template(&self, scope: DefId) -> Option<DefId> {
        let mut at = Some(scope);
        while let Some(s) = at {
            if self.defs[s].flags.contains(DefFlags::TEMPLATE) {
                return Some(s);
            }
            at = self.defs[s].parent;
        }
        None
    }

    /// Whether the definition can serve as a base type name.
    pub fn is_type_name(&self, id: DefId) -> bool {
        self.defs[id].flags.intersects(
            DefFlags::CLASS
                | DefFlags::UNION
                | DefFlags::ENUM
                | DefFlags::TYPENAME
                | DefFlags::HYPOTHETICAL,
        )
    }

    /// Whether the definition can be entered with `::`.
    pub fn is_scope(&self, id: DefId) -> bool {
        self.defs[id].flags.contains(DefFlags::SCOPE)
    }

    /// A short description for diagnostics: kind word plus name.
    pub fn describe(&self, id: DefId, syms: &Interner) -> String {
        let d = &self.defs[id];
        let kind = if d.flags.contains(DefFlags::NAMESPACE) {
            "namespace"
        } else if d.flags.contains(DefFlags::CLASS) {
            "class"
        } else if d.flags.contains(DefFlags::UNION) {
            "union"
        } else if d.flags.contains(DefFlags::ENUM) {
            "enum"
        } else if d.flags.contains(DefFlags::TEMPLATE) {
            "template"
        } else if d.flags.contains(DefFlags::FUNCTION) {
            "function"
        } else if d.flags.contains(DefFlags::HYPOTHETICAL) {
            "dependent type"
        } else {
            "definition"
        };
        format!("{} `{}`", kind, syms.resolve(d.name))
    }
}

impl Default for DefTable {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn typed(defs: &mut DefTable, parent: DefId, name: Symbol) -> DefId {
        defs.push(Definition {
            name,
            parent: Some(parent),
            flags: DefFlags::TYPED,
            kind: DefKind::Typed(TypedData::default()),
        })
    }

    #[test]
    fn root_exists() {
        let defs = DefTable::new();
        assert_eq!(defs.len(), 1);
        assert!(defs.is_scope(DefTable::ROOT_ID));
        assert!(defs.def(DefTable::ROOT_ID).parent.is_none());
    }

    #[test]
    fn declare_and_lookup() {
        let mut syms = Interner::new();
        let mut defs = DefTable::new();
        let name = syms.intern("x");
        let x = typed(&mut defs, DefTable::ROOT_ID, name);
        defs.declare(DefTable::ROOT_ID, name, x).unwrap();
        // Invariant: members[name] == def and def.parent == scope.
        assert_eq!(defs.lookup(DefTable::ROOT_ID, name), Some(x));
        assert_eq!(defs.def(x).parent, Some(DefTable::ROOT_ID));
    }

    #[test]
    fn declare_never_overwrites() {
        let mut syms = Interner::new();
        let mut defs = DefTable::new();
        let name = syms.intern("x");
        let a = typed(&mut defs, DefTable::ROOT_ID, name);
        let b = typed(&mut defs, DefTable::ROOT_ID, name);
        defs.declare(DefTable::ROOT_ID, name, a).unwrap();
        assert_eq!(defs.declare(DefTable::ROOT_ID, name, b), Err(a));
        assert_eq!(defs.lookup(DefTable::ROOT_ID, name), Some(a));
    }

    #[test]
    fn lookup_walks_parents() {
        let mut syms = Interner::new();
        let mut defs = DefTable::new();
        let outer_name = syms.intern("g");
        let g = typed(&mut defs, DefTable::ROOT_ID, outer_name);
        defs.declare(DefTable::ROOT_ID, outer_name, g).unwrap();

        let ns_name = syms.intern("ns");
        let ns = defs.push(Definition {
            name: ns_name,
            parent: Some(DefTable::ROOT_ID),
            flags: DefFlags::NAMESPACE | DefFlags::SCOPE,
            kind: DefKind::Scope(ScopeData::default()),
        });
        defs.declare(DefTable::ROOT_ID, ns_name, ns).unwrap();
        assert_eq!(defs.lookup(ns, outer_name), Some(g));
        assert_eq!(defs.lookup_local(ns, outer_name), None);
    }

    #[test]
    fn using_imports_members() {
        let mut syms = Interner::new();
        let mut defs = DefTable::new();
        let ns_name = syms.intern("ns");
        let ns = defs.push(Definition {
            name: ns_name,
            parent: Some(DefTable::ROOT_ID),
            flags: DefFlags::NAMESPACE | DefFlags::SCOPE,
            kind: DefKind::Scope(ScopeData::default()),
        });
        defs.declare(DefTable::ROOT_ID, ns_name, ns).unwrap();
        let x_name = syms.intern("x");
        let x = typed(&mut defs, ns, x_name);
        defs.declare(ns, x_name, x).unwrap();

        let other = defs.push(Definition {
            name: syms.intern("other"),
            parent: Some(DefTable::ROOT_ID),
            flags: DefFlags::NAMESPACE | DefFlags::SCOPE,
            kind: DefKind::Scope(ScopeData::default()),
        });
        defs.scope_data_mut(other).unwrap().usings.push(ns);
        assert_eq!(defs.lookup_local(other, x_name), Some(x));
    }

    #[test]
    fn members_preserve_insertion_order() {
        let mut syms = Interner::new();
        let mut defs = DefTable::new();
        let names: Vec<Symbol> = ["c", "a", "b"].iter().map(|s| syms.intern(s)).collect();
        for &n in &names {
            let d = typed(&mut defs, DefTable::ROOT_ID, n);
            defs.declare(DefTable::ROOT_ID, n, d).unwrap();
        }
        let stored: Vec<Symbol> = defs
            .scope_data(DefTable::ROOT_ID)
            .unwrap()
            .members
            .keys()
            .copied()
            .collect();
        assert_eq!(stored, names);
    }

    #[test]
    fn nearest_template_walks_chain() {
        let mut syms = Interner::new();
        let mut defs = DefTable::new();
        let t = defs.push(Definition {
            name: syms.intern("V"),
            parent: Some(DefTable::ROOT_ID),
            flags: DefFlags::TEMPLATE | DefFlags::SCOPE | DefFlags::TEMPSCOPE,
            kind: DefKind::Template(TemplateData::default()),
        });
        let inner = defs.push(Definition {
            name: syms.intern("V"),
            parent: Some(t),
            flags: DefFlags::CLASS | DefFlags::SCOPE | DefFlags::TYPENAME,
            kind: DefKind::Scope(ScopeData::default()),
        });
        assert_eq!(defs.nearest_template(inner), Some(t));
        assert_eq!(defs.nearest_template(DefTable::ROOT_ID), None);
    }
}
