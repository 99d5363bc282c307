//! Constant-expression trees.
//!
//! The evaluator behind `#if` conditions at the parser level, array bounds,
//! bit-field widths, initializers and template arguments. Expressions are
//! plain data: the parser builds them from tokens, [`Expr::eval`] folds them
//! against the definition table, and [`Expr::render`] prints them back —
//! which is how hypothetical definitions get their `(?=...)` display names.

use cppdef_util::{DefId, Interner, Symbol};

use crate::arg_key::ArgKey;
use crate::def::{DefKind, DefTable};
use crate::flags::DefFlags;
use crate::full_type::{FullType, RefNode};
use crate::value::Value;

/// Unary operators.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum UnOp {
    /// `-`
    Neg,
    /// `+`
    Pos,
    /// `!`
    Not,
    /// `~`
    BitNot,
    /// `*`; never constant, but representable.
    Deref,
    /// `&`; never constant, but representable.
    AddrOf,
}

impl UnOp {
    /// Source spelling.
    pub fn spelling(self) -> &'static str {
        match self {
            UnOp::Neg => "-",
            UnOp::Pos => "+",
            UnOp::Not => "!",
            UnOp::BitNot => "~",
            UnOp::Deref => "*",
            UnOp::AddrOf => "&",
        }
    }
}

/// Binary operators, in no particular precedence order.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BinOp {
    Mul,
    Div,
    Rem,
    Add,
    Sub,
    Shl,
    Shr,
    Lt,
    Gt,
    Le,
    Ge,
    Eq,
    Ne,
    BitAnd,
    BitXor,
    BitOr,
    And,
    Or,
    Comma,
}

impl BinOp {
    /// Source spelling.
    pub fn spelling(self) -> &'static str {
        match self {
            BinOp::Mul => "*",
            BinOp::Div => "/",
            BinOp::Rem => "%",
            BinOp::Add => "+",
            BinOp::Sub => "-",
            BinOp::Shl => "<<",
            BinOp::Shr => ">>",
            BinOp::Lt => "<",
            BinOp::Gt => ">",
            BinOp::Le => "<=",
            BinOp::Ge => ">=",
            BinOp::Eq => "==",
            BinOp::Ne => "!=",
            BinOp::BitAnd => "&",
            BinOp::BitXor => "^",
            BinOp::BitOr => "|",
            BinOp::And => "&&",
            BinOp::Or => "||",
            BinOp::Comma => ",",
        }
    }
}

/// A constant-expression tree.
#[derive(Clone, Debug)]
pub enum Expr {
    /// Integer literal.
    Int(i64),
    /// Floating-point literal.
    Real(f64),
    /// String literal contents.
    Str(String),
    /// An identifier that resolved to nothing.
    Ident(Symbol),
    /// A reference to a definition.
    Def(DefId),
    /// Prefix operator application.
    Unary { op: UnOp, expr: Box<Expr> },
    /// Infix operator application.
    Binary {
        op: BinOp,
        lhs: Box<Expr>,
        rhs: Box<Expr>,
    },
    /// `cond ? then : other`
    Conditional {
        cond: Box<Expr>,
        then: Box<Expr>,
        other: Box<Expr>,
    },
    /// `sizeof(type)`
    Sizeof(Box<FullType>),
    /// A template instantiation whose resolution is deferred.
    Instantiate { template: DefId, key: ArgKey },
    /// `base::member` where `base` is itself unresolved.
    Access { base: Box<Expr>, member: Symbol },
}

impl Expr {
    /// Evaluate against the definition table.
    ///
    /// Anything that cannot be folded to a constant — unknown identifiers,
    /// template parameters, dependent instantiations — evaluates to
    /// [`Value::Undefined`]; callers decide whether that is an error.
    pub fn eval(&self, defs: &DefTable) -> Value {
        match self {
            Expr::Int(i) => Value::Integer(*i),
            Expr::Real(r) => Value::Real(*r),
            Expr::Str(s) => Value::Str(s.clone()),
            Expr::Ident(_) => Value::Undefined,
            Expr::Def(id) => match &defs.def(*id).kind {
                DefKind::Valued(v) if !defs.def(*id).flags.contains(DefFlags::TEMPPARAM) => {
                    v.value.clone()
                }
                _ => Value::Undefined,
            },
            Expr::Unary { op, expr } => eval_unary(*op, expr.eval(defs)),
            Expr::Binary { op, lhs, rhs } => match op {
                BinOp::Comma => {
                    lhs.eval(defs);
                    rhs.eval(defs)
                }
                BinOp::And => {
                    let l = lhs.eval(defs);
                    if l.is_undefined() {
                        return Value::Undefined;
                    }
                    if !l.truthy() {
                        return Value::Integer(0);
                    }
                    let r = rhs.eval(defs);
                    if r.is_undefined() {
                        return Value::Undefined;
                    }
                    Value::Integer(r.truthy() as i64)
                }
                BinOp::Or => {
                    let l = lhs.eval(defs);
                    if l.is_undefined() {
                        return Value::Undefined;
                    }
                    if l.truthy() {
                        return Value::Integer(1);
                    }
                    let r = rhs.eval(defs);
                    if r.is_undefined() {
                        return Value::Undefined;
                    }
                    Value::Integer(r.truthy() as i64)
                }
                _ => eval_binary(*op, lhs.eval(defs), rhs.eval(defs)),
            },
            Expr::Conditional { cond, then, other } => match cond.eval(defs) {
                Value::Undefined => Value::Undefined,
                c if c.truthy() => then.eval(defs),
                _ => other.eval(defs),
            },
            Expr::Sizeof(ty) => sizeof_type(ty, defs),
            Expr::Instantiate { .. } | Expr::Access { .. } => Value::Undefined,
        }
    }

    /// Render to source-like text.
    pub fn render(&self, defs: &DefTable, syms: &Interner) -> String {
        match self {
            Expr::Int(i) => i.to_string(),
            Expr::Real(r) => r.to_string(),
            Expr::Str(s) => format!("{s:?}"),
            Expr::Ident(sym) => syms.resolve(*sym).to_string(),
            Expr::Def(id) => match &defs.def(*id).kind {
                // Hypotheticals print their underlying expression so
                // nested accesses do not stack (?=...) wrappers.
                DefKind::Hypothetical(h) => h.expr.render(defs, syms),
                _ => defs.name_str(*id, syms).to_string(),
            },
            Expr::Unary { op, expr } => {
                format!("{}{}", op.spelling(), expr.render_grouped(defs, syms))
            }
            Expr::Binary { op, lhs, rhs } => format!(
                "{} {} {}",
                lhs.render_grouped(defs, syms),
                op.spelling(),
                rhs.render_grouped(defs, syms)
            ),
            Expr::Conditional { cond, then, other } => format!(
                "{} ? {} : {}",
                cond.render_grouped(defs, syms),
                then.render_grouped(defs, syms),
                other.render_grouped(defs, syms)
            ),
            Expr::Sizeof(ty) => format!("sizeof({})", ty.render(defs, syms)),
            Expr::Instantiate { template, key } => format!(
                "{}<{}>",
                defs.name_str(*template, syms),
                key.render(defs, syms)
            ),
            Expr::Access { base, member } => {
                format!("{}::{}", base.render(defs, syms), syms.resolve(*member))
            }
        }
    }

    fn render_grouped(&self, defs: &DefTable, syms: &Interner) -> String {
        match self {
            Expr::Binary { .. } | Expr::Conditional { .. } => {
                format!("({})", self.render(defs, syms))
            }
            _ => self.render(defs, syms),
        }
    }
}

fn eval_unary(op: UnOp, v: Value) -> Value {
    match (op, v) {
        (UnOp::Neg, Value::Integer(i)) => Value::Integer(i.wrapping_neg()),
        (UnOp::Neg, Value::Real(r)) => Value::Real(-r),
        (UnOp::Pos, v @ (Value::Integer(_) | Value::Real(_))) => v,
        (UnOp::Not, Value::Undefined) => Value::Undefined,
        (UnOp::Not, v) => Value::Integer(!v.truthy() as i64),
        (UnOp::BitNot, Value::Integer(i)) => Value::Integer(!i),
        (UnOp::Deref | UnOp::AddrOf, _) => Value::Undefined,
        _ => Value::Undefined,
    }
}

fn eval_binary(op: BinOp, l: Value, r: Value) -> Value {
    use BinOp::*;
    // Numeric promotion: any real operand makes the arithmetic real.
    let numeric = |v: &Value| matches!(v, Value::Integer(_) | Value::Real(_));
    if matches!(op, Add | Sub | Mul | Div)
        && numeric(&l)
        && numeric(&r)
        && (matches!(l, Value::Real(_)) || matches!(r, Value::Real(_)))
    {
        let lf = as_real(&l);
        let rf = as_real(&r);
        return match op {
            Add => Value::Real(lf + rf),
            Sub => Value::Real(lf - rf),
            Mul => Value::Real(lf * rf),
            Div if rf != 0.0 => Value::Real(lf / rf),
            _ => Value::Undefined,
        };
    }
    match (l, r) {
        (Value::Integer(a), Value::Integer(b)) => match op {
            Add => Value::Integer(a.wrapping_add(b)),
            Sub => Value::Integer(a.wrapping_sub(b)),
            Mul => Value::Integer(a.wrapping_mul(b)),
            Div if b != 0 => Value::Integer(a.wrapping_div(b)),
            Rem if b != 0 => Value::Integer(a.wrapping_rem(b)),
            Div | Rem => Value::Undefined,
            Shl => Value::Integer(a.wrapping_shl(b as u32)),
            Shr => Value::Integer(a.wrapping_shr(b as u32)),
            Lt => Value::Integer((a < b) as i64),
            Gt => Value::Integer((a > b) as i64),
            Le => Value::Integer((a <= b) as i64),
            Ge => Value::Integer((a >= b) as i64),
            Eq => Value::Integer((a == b) as i64),
            Ne => Value::Integer((a != b) as i64),
            BitAnd => Value::Integer(a & b),
            BitXor => Value::Integer(a ^ b),
            BitOr => Value::Integer(a | b),
            And | Or | Comma => Value::Undefined,
        },
        (Value::Real(a), Value::Real(b)) => match op {
            Lt => Value::Integer((a < b) as i64),
            Gt => Value::Integer((a > b) as i64),
            Le => Value::Integer((a <= b) as i64),
            Ge => Value::Integer((a >= b) as i64),
            Eq => Value::Integer((a == b) as i64),
            Ne => Value::Integer((a != b) as i64),
            _ => Value::Undefined,
        },
        (Value::Str(a), Value::Str(b)) => match op {
            Eq => Value::Integer((a == b) as i64),
            Ne => Value::Integer((a != b) as i64),
            Add => Value::Str(a + &b),
            _ => Value::Undefined,
        },
        _ => Value::Undefined,
    }
}

fn as_real(v: &Value) -> f64 {
    match v {
        Value::Integer(i) => *i as f64,
        Value::Real(r) => *r,
        _ => 0.0,
    }
}

/// Best-effort `sizeof`: pointers and references have pointer size, known
/// arrays multiply, primitives report their table size, anything else is
/// undefined.
fn sizeof_type(ty: &FullType, defs: &DefTable) -> Value {
    const POINTER_SIZE: i64 = 8;
    let mut multiplier: i64 = 1;
    for node in ty.refs.iter_top() {
        match node {
            RefNode::Pointer { .. } | RefNode::Reference | RefNode::Function { .. } => {
                return Value::Integer(POINTER_SIZE * multiplier)
            }
            RefNode::Array { bound: Some(n) } => multiplier *= *n as i64,
            RefNode::Array { bound: None } => return Value::Undefined,
        }
    }
    match ty.def {
        Some(d) => match defs.def(d).kind {
            DefKind::Primitive { size } => Value::Integer(size as i64 * multiplier),
            _ => Value::Undefined,
        },
        None => Value::Undefined,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bin(op: BinOp, l: Expr, r: Expr) -> Expr {
        Expr::Binary {
            op,
            lhs: Box::new(l),
            rhs: Box::new(r),
        }
    }

    #[test]
    fn integer_arithmetic() {
        let defs = DefTable::new();
        let e = bin(BinOp::Add, Expr::Int(2), bin(BinOp::Mul, Expr::Int(3), Expr::Int(4)));
        assert_eq!(e.eval(&defs), Value::Integer(14));
    }

    #[test]
    fn division_by_zero_is_undefined() {
        let defs = DefTable::new();
        let e = bin(BinOp::Div, Expr::Int(1), Expr::Int(0));
        assert_eq!(e.eval(&defs), Value::Undefined);
    }

    #[test]
    fn logical_short_circuit() {
        let defs = DefTable::new();
        let e = bin(BinOp::And, Expr::Int(0), Expr::Ident(Symbol::EMPTY));
        assert_eq!(e.eval(&defs), Value::Integer(0));
        let e = bin(BinOp::Or, Expr::Int(5), Expr::Ident(Symbol::EMPTY));
        assert_eq!(e.eval(&defs), Value::Integer(1));
    }

    #[test]
    fn unknown_identifier_is_undefined() {
        let defs = DefTable::new();
        assert_eq!(Expr::Ident(Symbol::EMPTY).eval(&defs), Value::Undefined);
    }

    #[test]
    fn conditional_picks_branch() {
        let defs = DefTable::new();
        let e = Expr::Conditional {
            cond: Box::new(Expr::Int(1)),
            then: Box::new(Expr::Int(10)),
            other: Box::new(Expr::Int(20)),
        };
        assert_eq!(e.eval(&defs), Value::Integer(10));
    }

    #[test]
    fn sizeof_pointer() {
        let mut syms = Interner::new();
        let mut defs = DefTable::new();
        let int = defs.add_primitive(DefTable::ROOT_ID, syms.intern("int"), 4);
        let mut ty = FullType::of(int);
        ty.refs.push_outer(RefNode::pointer());
        assert_eq!(
            Expr::Sizeof(Box::new(ty)).eval(&defs),
            Value::Integer(8)
        );
    }

    #[test]
    fn sizeof_array_multiplies() {
        let mut syms = Interner::new();
        let mut defs = DefTable::new();
        let int = defs.add_primitive(DefTable::ROOT_ID, syms.intern("int"), 4);
        let mut ty = FullType::of(int);
        ty.refs.push_outer(RefNode::array(Some(3)));
        assert_eq!(
            Expr::Sizeof(Box::new(ty)).eval(&defs),
            Value::Integer(12)
        );
    }

    #[test]
    fn render_binary() {
        let defs = DefTable::new();
        let syms = Interner::new();
        let e = bin(BinOp::Add, Expr::Int(1), Expr::Int(2));
        assert_eq!(e.render(&defs, &syms), "1 + 2");
    }
}
