//! Full types: base definition, qualifier flags, referencer stack.
//!
//! A [`FullType`] is everything a declaration specifier plus its declarator
//! chain says about one declared entity. The [`RefStack`] holds the derived-
//! type nodes; they are stored innermost-first (nearest the declared name
//! first), so the last element — [`RefStack::top`] — is the node nearest the
//! base type, and [`RefStack::iter_top`] walks them outside-in, which is the
//! order type printing consumes them.

use cppdef_util::{DefId, Interner, Symbol};

use crate::def::DefTable;
use crate::flags::TypeFlags;

/// One function parameter: its full type, and whether the parameter's base
/// type is registered as variadic (`va_list`).
#[derive(Clone, Debug, Default, PartialEq, Eq, PartialOrd, Ord)]
pub struct Parameter {
    pub ty: FullType,
    pub variadic: bool,
}

impl Parameter {
    /// Build a parameter by taking ownership of the given type's contents.
    ///
    /// The referencer stack moves; the source is left empty. Parameter
    /// handoff never deep-copies a `RefStack`.
    pub fn swap_in(ty: &mut FullType) -> Self {
        Self {
            ty: std::mem::take(ty),
            variadic: false,
        }
    }
}

/// A single declarator node.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub enum RefNode {
    /// `*`, with cv-qualifiers applied to the pointer itself.
    Pointer { is_const: bool, is_volatile: bool },
    /// `&`
    Reference,
    /// `[bound]`; `None` is the unspecified bound.
    Array { bound: Option<usize> },
    /// `(params)`
    Function { params: Vec<Parameter> },
}

impl RefNode {
    /// A plain, unqualified pointer node.
    pub fn pointer() -> Self {
        RefNode::Pointer {
            is_const: false,
            is_volatile: false,
        }
    }

    /// An array node; `None` for an unspecified bound.
    pub fn array(bound: Option<usize>) -> Self {
        RefNode::Array { bound }
    }

    /// A function node with the given parameters.
    pub fn function(params: Vec<Parameter>) -> Self {
        RefNode::Function { params }
    }

    /// Whether this is a function node.
    pub fn is_function(&self) -> bool {
        matches!(self, RefNode::Function { .. })
    }
}

/// The declarator chain of one declaration, plus the declared name.
///
/// The name may be empty (abstract declarators), a plain identifier, an
/// operator spelling (`operator+`, `operator[]`, `operator()`), or one of
/// the synthesized names `<construct>`, `<destruct>`,
/// `<anonymousField0000000000>`.
#[derive(Clone, Debug, Default, PartialEq, Eq, PartialOrd, Ord)]
pub struct RefStack {
    /// Declared identifier; `Symbol::EMPTY` for abstract declarators.
    pub name: Symbol,
    nodes: Vec<RefNode>,
}

impl RefStack {
    /// An empty stack with no name.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of nodes.
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Whether the stack holds no nodes.
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// The outermost node (nearest the base type), if any.
    pub fn top(&self) -> Option<&RefNode> {
        self.nodes.last()
    }

    /// Mutable access to the outermost node.
    pub fn top_mut(&mut self) -> Option<&mut RefNode> {
        self.nodes.last_mut()
    }

    /// Walk the nodes outside-in: outermost (top) first.
    pub fn iter_top(&self) -> impl Iterator<Item = &RefNode> {
        self.nodes.iter().rev()
    }

    /// Push a node as the new outermost node.
    pub fn push_outer(&mut self, node: RefNode) {
        self.nodes.push(node);
    }

    /// Layer `nodes` under everything currently held: the new nodes bind
    /// closer to the declared name. Used when a group's declarators are
    /// folded into the surrounding declarator.
    pub fn nest(&mut self, nodes: Vec<RefNode>) {
        self.nodes.splice(0..0, nodes);
    }

    /// The nodes, innermost-first.
    pub fn nodes(&self) -> &[RefNode] {
        &self.nodes
    }

    /// Consume the stack, yielding the nodes innermost-first.
    pub fn into_nodes(self) -> Vec<RefNode> {
        self.nodes
    }

    /// Clear the declared name, recursing into function parameters.
    ///
    /// Signature keys must compare equal regardless of parameter naming.
    pub fn strip_names(&mut self) {
        self.name = Symbol::EMPTY;
        for node in &mut self.nodes {
            if let RefNode::Function { params } = node {
                for p in params {
                    p.ty.refs.strip_names();
                }
            }
        }
    }
}

/// Base type + qualifier flags + referencer stack.
#[derive(Clone, Debug, Default, PartialEq, Eq, PartialOrd, Ord)]
pub struct FullType {
    /// The base type definition; `None` when no type was named.
    pub def: Option<DefId>,
    /// Accumulated qualifier and storage-class bits.
    pub flags: TypeFlags,
    /// Declarator chain.
    pub refs: RefStack,
}

impl FullType {
    /// A type with a base definition and nothing else.
    pub fn of(def: DefId) -> Self {
        Self {
            def: Some(def),
            flags: TypeFlags::EMPTY,
            refs: RefStack::new(),
        }
    }

    /// The empty type: no base, no flags, no referencers.
    pub fn empty() -> Self {
        Self::default()
    }

    /// Whether nothing at all was read.
    pub fn is_unset(&self) -> bool {
        self.def.is_none() && self.flags.is_empty() && self.refs.is_empty()
    }

    /// Move the referencer stack out, leaving this type's stack empty.
    pub fn take_refs(&mut self) -> RefStack {
        std::mem::take(&mut self.refs)
    }

    /// Render as source text: qualifier words, base type name, declarator.
    ///
    /// Re-parsing the rendered text yields an equivalent type (same base,
    /// same flags, same stack modulo the declared name).
    pub fn render(&self, defs: &DefTable, syms: &Interner) -> String {
        let mut out = String::new();
        for word in self.flags.words() {
            out.push_str(word);
            out.push(' ');
        }
        match self.def {
            Some(d) => out.push_str(defs.name_str(d, syms)),
            // A bare flag set implies int; a fully empty type renders as nothing.
            None if !self.flags.is_empty() => out.push_str("int"),
            None => {
                out.pop();
            }
        }
        let decl = self.render_declarator(defs, syms, syms.resolve(self.refs.name));
        if !decl.is_empty() {
            out.push(' ');
            out.push_str(&decl);
        }
        out
    }

    /// Render only the declarator chain wrapped around `name`.
    ///
    /// Classic inside-out algorithm: pointers and references grow leftward,
    /// arrays and functions grow rightward, and a pointer directly inside a
    /// suffix node forces grouping parentheses.
    pub fn render_declarator(&self, defs: &DefTable, syms: &Interner, name: &str) -> String {
        let mut left = String::new();
        let mut right = String::new();
        let mut prev_prefix = false;
        for node in self.refs.nodes() {
            match node {
                RefNode::Pointer {
                    is_const,
                    is_volatile,
                } => {
                    let mut p = String::from("*");
                    if *is_const {
                        p.push_str("const ");
                    }
                    if *is_volatile {
                        p.push_str("volatile ");
                    }
                    left.insert_str(0, &p);
                    prev_prefix = true;
                }
                RefNode::Reference => {
                    left.insert_str(0, "&");
                    prev_prefix = true;
                }
                RefNode::Array { bound } => {
                    if prev_prefix {
                        left.insert_str(0, "(");
                        right.push(')');
                        prev_prefix = false;
                    }
                    match bound {
                        Some(n) => right.push_str(&format!("[{n}]")),
                        None => right.push_str("[]"),
                    }
                }
                RefNode::Function { params } => {
                    if prev_prefix {
                        left.insert_str(0, "(");
                        right.push(')');
                        prev_prefix = false;
                    }
                    let rendered: Vec<String> =
                        params.iter().map(|p| p.ty.render(defs, syms)).collect();
                    right.push('(');
                    right.push_str(&rendered.join(", "));
                    right.push(')');
                }
            }
        }
        format!("{left}{name}{right}")
    }
}
