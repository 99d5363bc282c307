//! The referencer reader: the declarator grammar.
//!
//! ```text
//! declarator := (prefix* core postfix*) | '(' declarator ')' postfix*
//! prefix     := '*' cv* | '&'
//! postfix    := '[' expr? ']' | '(' param-list ')' cv*
//! core       := IDENT | 'operator' op | empty
//! ```
//!
//! Three local stacks build the final node sequence: `prefix` for pointers
//! and references, `postfix` for arrays and parameter lists, `append` for a
//! parenthesized inner declarator. Composition order (innermost-first) is
//! `append ++ postfix ++ reverse(prefix)`: suffixes bind tighter than
//! prefixes, groups bind tightest of all.

use cppdef_util::{DeclError, DeclResult, DefId};

use cppdef_lex::{Token, TokenKind};
use cppdef_sem::{DefFlags, FullType, Parameter, RefNode, RefStack, TypeFlags, Value};

use crate::context::ParseContext;
use crate::expr::precedence;

/// Flags that let a type name be reused as a declared identifier: tags and
/// typedefs, never raw primitives.
const NAMEABLE: DefFlags = DefFlags(
    DefFlags::CLASS.0 | DefFlags::UNION.0 | DefFlags::ENUM.0 | DefFlags::TYPED.0,
);

impl ParseContext {
    /// Read declarators into `ty.refs`, attaching loose cv-qualifiers to
    /// `ty.flags`. On return the token is the first one that belongs to
    /// the surrounding construct.
    pub fn read_referencers(
        &mut self,
        ty: &mut FullType,
        token: &mut Token,
        scope: DefId,
    ) -> DeclResult<()> {
        use TokenKind::*;
        let mut prefix: Vec<RefNode> = Vec::new();
        let mut postfix: Vec<RefNode> = Vec::new();
        let mut append = RefStack::new();
        let mut rhs = false;
        loop {
            match token.kind {
                LeftBracket => {
                    rhs = true;
                    *token = self.read_next_token(scope);
                    if token.is(RightBracket) {
                        postfix.push(RefNode::array(None));
                    } else {
                        let expr = self.parse_expression(token, scope, precedence::COMMA)?;
                        if !token.is(RightBracket) {
                            self.report_errorf(token, "expected closing `]` before %s");
                            return Err(DeclError::Recoverable);
                        }
                        let bound = match expr.eval(&self.defs) {
                            Value::Integer(n) if n >= 0 => Some(n as usize),
                            _ => None,
                        };
                        postfix.push(RefNode::array(bound));
                    }
                }
                LeftParenth => {
                    *token = self.read_next_token(scope);
                    if !rhs {
                        rhs = true;
                        if matches!(token.kind, Declarator | Decflag | RightParenth | Decltype) {
                            self.read_params(&mut postfix, token, scope)?;
                            if append.is_empty() {
                                self.skip_trailing_qualifiers(token, scope);
                                continue;
                            }
                        } else {
                            // A grouped inner declarator.
                            let mut inner = FullType::empty();
                            self.read_referencers(&mut inner, token, scope)?;
                            append = inner.refs;
                            ty.flags |= inner.flags;
                            if !token.is(RightParenth) {
                                self.report_errorf(
                                    token,
                                    "expected `)` to close nested declarator before %s",
                                );
                                return Err(DeclError::Recoverable);
                            }
                        }
                    } else {
                        self.read_params(&mut postfix, token, scope)?;
                        if append.is_empty() {
                            self.skip_trailing_qualifiers(token, scope);
                            continue;
                        }
                    }
                }
                Identifier => {
                    ty.refs.name = token.text;
                    rhs = true;
                }
                Definition => {
                    // A name followed by `::` is a qualified-id; the
                    // declarator handler resolves it.
                    if self.peek_kind() == Scope {
                        break;
                    }
                    ty.refs.name = token.text;
                    rhs = true;
                }
                Declarator => {
                    if self.peek_kind() == Scope {
                        break;
                    }
                    let nameable = !rhs
                        && ty.refs.name.is_empty()
                        && token
                            .def
                            .map(|d| self.defs.def(d).flags.intersects(NAMEABLE))
                            .unwrap_or(false);
                    if nameable {
                        ty.refs.name = token.text;
                        rhs = true;
                    } else {
                        break;
                    }
                }
                OperatorKw => {
                    self.read_operator_name(ty, token, scope)?;
                    rhs = true;
                    continue;
                }
                Operator => {
                    match self.syms.resolve(token.text) {
                        "*" => prefix.push(RefNode::pointer()),
                        "&" => prefix.push(RefNode::Reference),
                        _ => break,
                    }
                }
                Decflag => {
                    let Some(id) = token.flag else { break };
                    let bit = self.builtins.flag(id).flagbit;
                    if bit == TypeFlags::CONST || bit == TypeFlags::VOLATILE {
                        match prefix.last_mut() {
                            Some(RefNode::Pointer {
                                is_const,
                                is_volatile,
                            }) => {
                                if bit == TypeFlags::CONST {
                                    *is_const = true;
                                } else {
                                    *is_volatile = true;
                                }
                            }
                            // No pointer yet: the qualifier belongs to the
                            // base type.
                            _ => ty.flags |= bit,
                        }
                    } else {
                        break;
                    }
                }
                Ellipsis => {
                    self.herr
                        .error("`...` not allowed as a general modifier", token.loc);
                    self.fatal()?;
                    break;
                }
                _ => break,
            }
            *token = self.read_next_token(scope);
        }

        if ty.refs.name.is_empty() && !append.name.is_empty() {
            ty.refs.name = append.name;
        }
        let mut assembled = append.into_nodes();
        assembled.extend(postfix);
        assembled.extend(prefix.into_iter().rev());
        ty.refs.nest(assembled);
        Ok(())
    }

    /// Postfix-only declarators after a qualified-id: arrays, parameter
    /// lists, trailing qualifiers.
    pub fn read_referencers_post(
        &mut self,
        ty: &mut FullType,
        token: &mut Token,
        scope: DefId,
    ) -> DeclResult<()> {
        use TokenKind::*;
        let mut postfix: Vec<RefNode> = Vec::new();
        loop {
            match token.kind {
                LeftBracket => {
                    *token = self.read_next_token(scope);
                    if token.is(RightBracket) {
                        postfix.push(RefNode::array(None));
                    } else {
                        let expr = self.parse_expression(token, scope, precedence::COMMA)?;
                        if !token.is(RightBracket) {
                            self.report_errorf(token, "expected closing `]` before %s");
                            return Err(DeclError::Recoverable);
                        }
                        let bound = match expr.eval(&self.defs) {
                            Value::Integer(n) if n >= 0 => Some(n as usize),
                            _ => None,
                        };
                        postfix.push(RefNode::array(bound));
                    }
                    *token = self.read_next_token(scope);
                }
                LeftParenth => {
                    *token = self.read_next_token(scope);
                    self.read_params(&mut postfix, token, scope)?;
                    *token = self.read_next_token(scope);
                    self.skip_trailing_qualifiers_in_place(token, scope);
                }
                _ => break,
            }
        }
        ty.refs.nest(postfix);
        Ok(())
    }

    /// Comma-separated parameter list; the opening `(` is already
    /// consumed. Leaves the token on the closing `)`.
    pub(crate) fn read_params(
        &mut self,
        postfix: &mut Vec<RefNode>,
        token: &mut Token,
        scope: DefId,
    ) -> DeclResult<()> {
        use TokenKind::*;
        let mut params: Vec<Parameter> = Vec::new();
        while !token.is(RightParenth) {
            if token.is(EndOfCode) {
                self.herr
                    .error("unterminated function parameter list", token.loc);
                return Err(DeclError::Recoverable);
            }
            let mut ty = self.read_full_type(token, scope)?;
            let mut param = Parameter::swap_in(&mut ty);
            param.variadic = param
                .ty
                .def
                .map(|d| self.builtins.variadics.contains(&d))
                .unwrap_or(false);
            params.push(param);
            if !token.is(Comma) {
                if token.is(RightParenth) {
                    break;
                }
                self.herr.error(
                    "expected comma or closing parenthesis to function parameters",
                    token.loc,
                );
                return Err(DeclError::Recoverable);
            }
            *token = self.read_next_token(scope);
        }
        postfix.push(RefNode::function(params));
        Ok(())
    }

    /// After a parameter list that ends the declarator, consume the legal
    /// trailing words (`const`, `volatile`, `throw`). Advances off the
    /// closing `)` first.
    fn skip_trailing_qualifiers(&mut self, token: &mut Token, scope: DefId) {
        *token = self.read_next_token(scope);
        self.skip_trailing_qualifiers_in_place(token, scope);
    }

    fn skip_trailing_qualifiers_in_place(&mut self, token: &mut Token, scope: DefId) {
        while token.is(TokenKind::Decflag) {
            *token = self.read_next_token(scope);
        }
    }

    /// `operator` followed by its spelling: `operator+`, `operator[]`,
    /// `operator()`. Advances past the full name.
    fn read_operator_name(
        &mut self,
        ty: &mut FullType,
        token: &mut Token,
        scope: DefId,
    ) -> DeclResult<()> {
        use TokenKind::*;
        *token = self.read_next_token(scope);
        match token.kind {
            Operator => {
                let spelling = format!("operator{}", self.syms.resolve(token.text));
                ty.refs.name = self.syms.intern(&spelling);
            }
            LessThan => ty.refs.name = self.syms.intern("operator<"),
            GreaterThan => ty.refs.name = self.syms.intern("operator>"),
            LeftBracket => {
                *token = self.read_next_token(scope);
                if !token.is(RightBracket) {
                    self.herr.error(
                        "expected closing bracket for `operator[]` definition",
                        token.loc,
                    );
                    return Err(DeclError::Recoverable);
                }
                ty.refs.name = self.syms.intern("operator[]");
            }
            LeftParenth => {
                *token = self.read_next_token(scope);
                if !token.is(RightParenth) {
                    self.herr.error(
                        "expected closing parenthesis for `operator()` definition",
                        token.loc,
                    );
                    return Err(DeclError::Recoverable);
                }
                ty.refs.name = self.syms.intern("operator()");
            }
            _ => {
                self.report_errorf(
                    token,
                    "unexpected %s following `operator` keyword; does not form a valid operator",
                );
                return Err(DeclError::Recoverable);
            }
        }
        *token = self.read_next_token(scope);
        Ok(())
    }
}
