//! The expression parser.
//!
//! Precedence climbing from the scope-aware token stream into
//! [`cppdef_sem::Expr`] trees. Callers bound the parse with a named
//! precedence level: initializers parse at [`precedence::COMMA`], bit
//! widths one step above it, template arguments above the relational
//! operators (so a bare `>` closes the argument list), and dependent type
//! expressions at [`precedence::SCOPE`].

use cppdef_util::{DeclError, DeclResult, DefId};

use cppdef_lex::{parse_char_literal, parse_int_literal, Token, TokenKind};
use cppdef_sem::{BinOp, DefKind, Expr, UnOp};

use crate::context::ParseContext;

/// Named precedence levels, loosest first.
pub mod precedence {
    pub const COMMA: u8 = 1;
    pub const ASSIGN: u8 = 2;
    pub const TERNARY: u8 = 3;
    pub const LOGICAL_OR: u8 = 4;
    pub const LOGICAL_AND: u8 = 5;
    pub const BIT_OR: u8 = 6;
    pub const BIT_XOR: u8 = 7;
    pub const BIT_AND: u8 = 8;
    pub const EQUALITY: u8 = 9;
    pub const RELATION: u8 = 10;
    /// Template arguments bind above relational so `>` ends the list.
    pub const TEMPLATE_ARG: u8 = 11;
    pub const SHIFT: u8 = 12;
    pub const ADDITION: u8 = 13;
    pub const MULTIPLY: u8 = 14;
    pub const UNARY: u8 = 15;
    pub const SCOPE: u8 = 18;
}

impl ParseContext {
    /// Parse an expression whose operators all bind at least as tightly as
    /// `min_prec`. Leaves `token` on the first token past the expression.
    pub fn parse_expression(
        &mut self,
        token: &mut Token,
        scope: DefId,
        min_prec: u8,
    ) -> DeclResult<Expr> {
        let mut lhs = self.parse_primary(token, scope)?;
        loop {
            if token.is(TokenKind::Operator)
                && token.text_is(&self.syms, "?")
                && precedence::TERNARY >= min_prec
            {
                *token = self.read_next_token(scope);
                let then = self.parse_expression(token, scope, precedence::TERNARY)?;
                if token.is(TokenKind::Colon) {
                    *token = self.read_next_token(scope);
                } else {
                    self.report_errorf(token, "expected `:` in conditional expression before %s");
                    return Err(DeclError::Recoverable);
                }
                let other = self.parse_expression(token, scope, precedence::TERNARY)?;
                lhs = Expr::Conditional {
                    cond: Box::new(lhs),
                    then: Box::new(then),
                    other: Box::new(other),
                };
                continue;
            }
            let Some((prec, op)) = self.classify_binary(token) else {
                break;
            };
            if prec < min_prec {
                break;
            }
            *token = self.read_next_token(scope);
            let rhs = self.parse_expression(token, scope, prec + 1)?;
            lhs = Expr::Binary {
                op,
                lhs: Box::new(lhs),
                rhs: Box::new(rhs),
            };
        }
        Ok(lhs)
    }

    fn classify_binary(&self, token: &Token) -> Option<(u8, BinOp)> {
        use precedence::*;
        match token.kind {
            TokenKind::LessThan => Some((RELATION, BinOp::Lt)),
            TokenKind::GreaterThan => Some((RELATION, BinOp::Gt)),
            TokenKind::Operator => match self.syms.resolve(token.text) {
                "*" => Some((MULTIPLY, BinOp::Mul)),
                "/" => Some((MULTIPLY, BinOp::Div)),
                "%" => Some((MULTIPLY, BinOp::Rem)),
                "+" => Some((ADDITION, BinOp::Add)),
                "-" => Some((ADDITION, BinOp::Sub)),
                "<<" => Some((SHIFT, BinOp::Shl)),
                ">>" => Some((SHIFT, BinOp::Shr)),
                "<=" => Some((RELATION, BinOp::Le)),
                ">=" => Some((RELATION, BinOp::Ge)),
                "==" => Some((EQUALITY, BinOp::Eq)),
                "!=" => Some((EQUALITY, BinOp::Ne)),
                "&" => Some((BIT_AND, BinOp::BitAnd)),
                "^" => Some((BIT_XOR, BinOp::BitXor)),
                "|" => Some((BIT_OR, BinOp::BitOr)),
                "&&" => Some((LOGICAL_AND, BinOp::And)),
                "||" => Some((LOGICAL_OR, BinOp::Or)),
                _ => None,
            },
            _ => None,
        }
    }

    fn parse_primary(&mut self, token: &mut Token, scope: DefId) -> DeclResult<Expr> {
        use TokenKind::*;
        let expr = match token.kind {
            DecLiteral | HexLiteral | OctLiteral => {
                let value = parse_int_literal(self.syms.resolve(token.text));
                *token = self.read_next_token(scope);
                Expr::Int(value)
            }
            CharLiteral => {
                let value = parse_char_literal(self.syms.resolve(token.text));
                *token = self.read_next_token(scope);
                Expr::Int(value)
            }
            StringLiteral => {
                let text = self.syms.resolve(token.text);
                let inner = text.trim_matches('"').to_string();
                *token = self.read_next_token(scope);
                Expr::Str(inner)
            }
            Identifier => {
                let sym = token.text;
                *token = self.read_next_token(scope);
                Expr::Ident(sym)
            }
            Definition | Declarator => {
                let Some(d) = token.def else {
                    self.report_errorf(token, "unresolved name %s in expression");
                    return Err(DeclError::Recoverable);
                };
                *token = self.read_next_token(scope);
                self.parse_member_chain(token, scope, Expr::Def(d))?
            }
            Sizeof => {
                *token = self.read_next_token(scope);
                if !token.is(LeftParenth) {
                    self.report_errorf(token, "expected `(` after `sizeof` before %s");
                    return Err(DeclError::Recoverable);
                }
                *token = self.read_next_token(scope);
                let ty = self.read_full_type(token, scope)?;
                if token.is(RightParenth) {
                    *token = self.read_next_token(scope);
                } else {
                    self.report_errorf(token, "expected `)` to close `sizeof` before %s");
                    return Err(DeclError::Recoverable);
                }
                Expr::Sizeof(Box::new(ty))
            }
            LeftParenth => {
                *token = self.read_next_token(scope);
                let inner = self.parse_expression(token, scope, precedence::COMMA)?;
                if token.is(RightParenth) {
                    *token = self.read_next_token(scope);
                } else {
                    self.report_errorf(token, "expected `)` before %s");
                    return Err(DeclError::Recoverable);
                }
                inner
            }
            Operator => {
                let op = match self.syms.resolve(token.text) {
                    "-" => Some(UnOp::Neg),
                    "+" => Some(UnOp::Pos),
                    "!" => Some(UnOp::Not),
                    "*" => Some(UnOp::Deref),
                    "&" => Some(UnOp::AddrOf),
                    _ => None,
                };
                let Some(op) = op else {
                    self.report_errorf(token, "expected expression before %s");
                    return Err(DeclError::Recoverable);
                };
                *token = self.read_next_token(scope);
                let operand = self.parse_expression(token, scope, precedence::UNARY)?;
                Expr::Unary {
                    op,
                    expr: Box::new(operand),
                }
            }
            Tilde => {
                *token = self.read_next_token(scope);
                let operand = self.parse_expression(token, scope, precedence::UNARY)?;
                Expr::Unary {
                    op: UnOp::BitNot,
                    expr: Box::new(operand),
                }
            }
            _ => {
                self.report_errorf(token, "expected expression before %s");
                return Err(DeclError::Recoverable);
            }
        };
        Ok(expr)
    }

    /// `::`-member chains on a resolved primary. Known members resolve
    /// eagerly; members of hypotheticals become access expressions.
    fn parse_member_chain(
        &mut self,
        token: &mut Token,
        scope: DefId,
        mut base: Expr,
    ) -> DeclResult<Expr> {
        use TokenKind::*;
        while token.is(Scope) {
            *token = self.read_next_token(scope);
            if !matches!(token.kind, Identifier | Definition | Declarator) {
                self.report_errorf(token, "expected member name after `::` before %s");
                return Err(DeclError::Recoverable);
            }
            let member = token.text;
            let resolvable = match &base {
                Expr::Def(d) => Some(*d),
                _ => None,
            };
            let known_member = resolvable.and_then(|d| {
                if matches!(self.defs.def(d).kind, DefKind::Hypothetical(_)) {
                    None
                } else {
                    self.defs.lookup_local(d, member)
                }
            });
            base = match known_member {
                Some(found) => Expr::Def(found),
                None => Expr::Access {
                    base: Box::new(base),
                    member,
                },
            };
            *token = self.read_next_token(scope);
        }
        Ok(base)
    }
}
