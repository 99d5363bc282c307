//! Argument tuples for overload sets and template specializations.
//!
//! An [`ArgKey`] is a fixed-length sequence of nodes, each a full type (type
//! parameters, function parameters) or a value (non-type parameters). Keys
//! are stored in `BTreeMap`s, so the derived ordering must be total — the
//! property tests below pin antisymmetry, transitivity and totality.

use cppdef_util::Interner;

use crate::def::DefTable;
use crate::flags::DefFlags;
use crate::full_type::{FullType, Parameter};
use crate::value::Value;

/// One slot of an argument tuple.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub enum ArgNode {
    /// Not yet bound; a still-abstract template parameter.
    Abstract,
    /// A type argument.
    Type(FullType),
    /// A non-type (value) argument.
    Value(Value),
}

impl ArgNode {
    /// Whether this slot cannot be resolved without template context.
    pub fn is_abstract(&self, defs: &DefTable) -> bool {
        match self {
            ArgNode::Abstract => true,
            ArgNode::Value(v) => v.is_undefined(),
            ArgNode::Type(t) => match t.def {
                Some(d) => defs
                    .def(d)
                    .flags
                    .intersects(DefFlags::TEMPPARAM | DefFlags::HYPOTHETICAL),
                None => true,
            },
        }
    }
}

/// A fixed-length tuple of template/overload arguments.
///
/// Invariant: when mirrored from a template, `len()` equals the template's
/// parameter count.
#[derive(Clone, Debug, Default, PartialEq, Eq, PartialOrd, Ord)]
pub struct ArgKey {
    nodes: Vec<ArgNode>,
}

impl ArgKey {
    /// A key of `n` abstract slots.
    pub fn with_size(n: usize) -> Self {
        Self {
            nodes: vec![ArgNode::Abstract; n],
        }
    }

    /// A key of the parameter types of a function signature.
    ///
    /// Parameter names are stripped: `f(int a)` and `f(int b)` share a
    /// signature.
    pub fn from_params(params: &[Parameter]) -> Self {
        let mut key = Self::with_size(params.len());
        for (i, p) in params.iter().enumerate() {
            key.set_type(i, p.ty.clone());
        }
        key
    }

    /// Number of slots.
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Whether the key has no slots.
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Borrow a slot.
    pub fn get(&self, i: usize) -> Option<&ArgNode> {
        self.nodes.get(i)
    }

    /// The slots in order.
    pub fn nodes(&self) -> &[ArgNode] {
        &self.nodes
    }

    /// Bind slot `i` to a type, consuming it. The declared name is stripped
    /// so keys compare modulo naming.
    pub fn set_type(&mut self, i: usize, mut ty: FullType) {
        ty.refs.strip_names();
        self.nodes[i] = ArgNode::Type(ty);
    }

    /// Bind slot `i` to a value.
    pub fn set_value(&mut self, i: usize, value: Value) {
        self.nodes[i] = ArgNode::Value(value);
    }

    /// Whether any slot is still abstract or dependent.
    pub fn is_dependent(&self, defs: &DefTable) -> bool {
        self.nodes.iter().any(|n| n.is_abstract(defs))
    }

    /// Render the argument list; wrap in `<>` or `()` yourself.
    pub fn render(&self, defs: &DefTable, syms: &Interner) -> String {
        let parts: Vec<String> = self
            .nodes
            .iter()
            .map(|n| match n {
                ArgNode::Abstract => "?".to_string(),
                ArgNode::Type(t) => t.render(defs, syms),
                ArgNode::Value(v) => v.to_string(),
            })
            .collect();
        parts.join(", ")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use quickcheck::{Arbitrary, Gen};
    use quickcheck_macros::quickcheck;

    #[test]
    fn size_invariant() {
        let key = ArgKey::with_size(3);
        assert_eq!(key.len(), 3);
        assert!(key.nodes().iter().all(|n| matches!(n, ArgNode::Abstract)));
    }

    #[test]
    fn from_params_strips_names() {
        let mut syms = cppdef_util::Interner::new();
        let mut a = FullType::empty();
        a.refs.name = syms.intern("first");
        let mut b = FullType::empty();
        b.refs.name = syms.intern("second");
        let ka = ArgKey::from_params(&[Parameter {
            ty: a,
            variadic: false,
        }]);
        let kb = ArgKey::from_params(&[Parameter {
            ty: b,
            variadic: false,
        }]);
        assert_eq!(ka, kb);
    }

    #[test]
    fn distinct_values_distinct_keys() {
        let mut a = ArgKey::with_size(1);
        a.set_value(0, Value::Integer(1));
        let mut b = ArgKey::with_size(1);
        b.set_value(0, Value::Integer(2));
        assert_ne!(a, b);
        assert!(a < b);
    }

    // Property tests: the ordering used to key specialization maps must be
    // a strict total order.

    #[derive(Clone, Debug)]
    struct AnyKey(ArgKey);

    impl Arbitrary for AnyKey {
        fn arbitrary(g: &mut Gen) -> Self {
            let len = usize::arbitrary(g) % 4;
            let mut key = ArgKey::with_size(len);
            for i in 0..len {
                match u8::arbitrary(g) % 4 {
                    0 => {} // leave abstract
                    1 => key.set_value(i, Value::Integer(i64::arbitrary(g) % 8)),
                    2 => key.set_value(i, Value::Str(String::from("s"))),
                    _ => key.set_value(i, Value::Undefined),
                }
            }
            AnyKey(key)
        }
    }

    #[quickcheck]
    fn ordering_is_antisymmetric(a: AnyKey, b: AnyKey) -> bool {
        !(a.0 < b.0 && b.0 < a.0)
    }

    #[quickcheck]
    fn ordering_is_transitive(a: AnyKey, b: AnyKey, c: AnyKey) -> bool {
        if a.0 <= b.0 && b.0 <= c.0 {
            a.0 <= c.0
        } else {
            true
        }
    }

    #[quickcheck]
    fn ordering_is_total(a: AnyKey, b: AnyKey) -> bool {
        let lt = a.0 < b.0;
        let gt = b.0 < a.0;
        let eq = a.0 == b.0;
        (lt as u8 + gt as u8 + eq as u8) == 1
    }
}
