//! The type reader: declaration specifier → `FullType`.
//!
//! The state machine keeps four working values while it eats specifier
//! tokens: `rdef` (a definitively named base type), `overridable` (a
//! primitive a later sign/size flag may replace, e.g. the `int` implied by
//! a bare `unsigned`), `inferred` (the type implied by a standalone
//! qualifier used alone), and the flag accumulators `rflags`/`swif`. After
//! the specifier sequence resolves, control passes to the referencer
//! reader, so on return the token sits on the first non-type,
//! non-referencer token.

use cppdef_util::{DeclResult, DefId};

use cppdef_lex::{Token, TokenKind};
use cppdef_sem::{ArgKey, DefFlags, DefKind, FullType, TypeFlags, UF_PRIMITIVE, UF_STANDALONE};

use crate::context::ParseContext;
use crate::expr::precedence;

/// Definition flags that let a `Declarator` token act as a declared name
/// instead of a second type: tags and typedefs can be shadowed, raw
/// primitives cannot.
const TYPEISH: DefFlags = DefFlags(
    DefFlags::CLASS.0 | DefFlags::UNION.0 | DefFlags::ENUM.0 | DefFlags::TYPED.0,
);

impl ParseContext {
    /// Read a declaration specifier plus its declarators.
    ///
    /// Returns an unset `FullType` (and leaves the token alone) when no
    /// type is named; the caller decides whether that is an error.
    pub fn read_full_type(&mut self, token: &mut Token, scope: DefId) -> DeclResult<FullType> {
        use TokenKind::*;
        let mut inferred: Option<DefId> = None;
        let mut overridable: Option<DefId> = None;
        let mut rflags = TypeFlags::EMPTY;
        let mut swif = TypeFlags::EMPTY;
        let mut rdef: Option<DefId> = None;

        match token.kind {
            Declarator => {
                let base = token.def;
                *token = self.read_next_token(scope);
                rdef = match base {
                    Some(d) => Some(self.resolve_type_suffixes(d, token, scope)?),
                    None => base,
                };
            }
            Decflag => {
                if let Some(id) = token.flag {
                    let tf = self.builtins.flag(id);
                    if tf.usage & UF_PRIMITIVE != 0 {
                        if tf.usage == UF_PRIMITIVE {
                            rdef = tf.def;
                        } else {
                            overridable = tf.def;
                        }
                        swif = tf.flagbit;
                    } else {
                        if tf.usage & UF_STANDALONE != 0 {
                            inferred = tf.def;
                        }
                        rflags = tf.flagbit;
                    }
                }
                *token = self.read_next_token(scope);
            }
            Class | Struct => {
                rdef = Some(self.handle_class(scope, token, DefFlags::EMPTY)?);
            }
            Union => {
                rdef = Some(self.handle_union(scope, token, DefFlags::EMPTY)?);
            }
            Enum => {
                rdef = Some(self.handle_enum(scope, token, DefFlags::EMPTY)?);
            }
            Ellipsis => {
                rdef = Some(self.builtins.type_va_list);
                *token = self.read_next_token(scope);
            }
            Typename => {
                *token = self.read_next_token(scope);
                rdef = Some(self.handle_hypothetical(token, scope, DefFlags::TYPENAME)?);
            }
            Decltype => {
                rdef = Some(self.read_decltype(token, scope)?);
            }
            Identifier | Definition => {
                let what = self.syms.resolve(token.text).to_string();
                self.herr.error(
                    format!("type name expected here; `{what}` does not name a type"),
                    token.loc,
                );
                return Ok(FullType::empty());
            }
            _ => {
                self.report_errorf(token, "type name expected here before %s");
                return Ok(FullType::empty());
            }
        }

        // Additional specifier tokens.
        loop {
            match token.kind {
                Declarator => {
                    if rdef.is_some() {
                        let shadowing = token
                            .def
                            .map(|d| self.defs.def(d).flags.intersects(TYPEISH))
                            .unwrap_or(false);
                        if shadowing {
                            // The name position; the referencer reader
                            // takes it from here.
                            break;
                        }
                        self.herr
                            .error("two types named in declaration", token.loc);
                        self.fatal()?;
                        *token = self.read_next_token(scope);
                        continue;
                    }
                    let base = token.def;
                    *token = self.read_next_token(scope);
                    rdef = match base {
                        Some(d) => Some(self.resolve_type_suffixes(d, token, scope)?),
                        None => base,
                    };
                    rflags.absorb(swif);
                    swif = TypeFlags::EMPTY;
                }
                Decflag => {
                    let Some(id) = token.flag else {
                        *token = self.read_next_token(scope);
                        continue;
                    };
                    let tf = self.builtins.flag(id);
                    let (usage, def, bit) = (tf.usage, tf.def, tf.flagbit);
                    if usage & UF_PRIMITIVE != 0 {
                        if usage == UF_PRIMITIVE {
                            if rdef.is_some() {
                                self.herr
                                    .error("two types named in declaration", token.loc);
                                self.fatal()?;
                            }
                            rdef = def;
                            rflags.absorb(swif);
                            swif = TypeFlags::EMPTY;
                        } else {
                            overridable = def;
                            rflags.absorb(swif);
                            swif = bit;
                        }
                    } else {
                        if usage & UF_STANDALONE != 0 {
                            inferred = def;
                        }
                        rflags.absorb(bit);
                    }
                    *token = self.read_next_token(scope);
                }
                Class | Struct if rdef.is_none() => {
                    rdef = Some(self.handle_class(scope, token, DefFlags::EMPTY)?);
                }
                Union if rdef.is_none() => {
                    rdef = Some(self.handle_union(scope, token, DefFlags::EMPTY)?);
                }
                Enum if rdef.is_none() => {
                    rdef = Some(self.handle_enum(scope, token, DefFlags::EMPTY)?);
                }
                _ => break,
            }
        }

        if rdef.is_none() {
            if let Some(o) = overridable {
                rdef = Some(o);
                rflags.absorb(swif);
            }
        }
        if rdef.is_none() {
            rdef = inferred;
        }

        let mut ty = FullType {
            def: rdef,
            flags: rflags,
            refs: Default::default(),
        };
        if ty.def.is_some() {
            self.read_referencers(&mut ty, token, scope)?;
        }
        Ok(ty)
    }

    /// Resolve `<args>` and `::member` chains after a type name.
    pub(crate) fn resolve_type_suffixes(
        &mut self,
        mut d: DefId,
        token: &mut Token,
        scope: DefId,
    ) -> DeclResult<DefId> {
        use TokenKind::*;
        loop {
            if token.is(LessThan) && self.defs.def(d).flags.contains(DefFlags::TEMPLATE) {
                let key = self.read_template_args(token, scope, d)?;
                d = self.instantiate_or_defer(d, key, scope, token)?;
                *token = self.read_next_token(scope);
                continue;
            }
            if token.is(Scope) {
                if self.defs.def(d).flags.contains(DefFlags::HYPOTHETICAL) {
                    *token = self.read_next_token(scope);
                    if !matches!(token.kind, Identifier | Definition | Declarator) {
                        self.report_errorf(token, "expected member name after `::` before %s");
                        return Err(cppdef_util::DeclError::Recoverable);
                    }
                    let member = token.text;
                    let loc = token.loc;
                    d = self.hypothetical_access(d, member, loc)?;
                    *token = self.read_next_token(scope);
                    continue;
                }
                if !self.defs.is_scope(d) {
                    let what = self.defs.describe(d, &self.syms);
                    self.herr
                        .error(format!("cannot access {what} as a scope"), token.loc);
                    return Err(cppdef_util::DeclError::Recoverable);
                }
                *token = self.read_next_token(d);
                if !token.is(Declarator) {
                    self.report_errorf(token, "expected a nested type name before %s");
                    return Err(cppdef_util::DeclError::Recoverable);
                }
                match token.def {
                    Some(m) => d = m,
                    None => return Err(cppdef_util::DeclError::Recoverable),
                }
                *token = self.read_next_token(scope);
                continue;
            }
            return Ok(d);
        }
    }

    /// `<args...>` into an [`ArgKey`] mirroring the template's parameter
    /// list. Leaves the token on the closing `>`.
    pub(crate) fn read_template_args(
        &mut self,
        token: &mut Token,
        scope: DefId,
        temp: DefId,
    ) -> DeclResult<ArgKey> {
        use TokenKind::*;
        debug_assert!(token.is(LessThan));
        let count = match &self.defs.def(temp).kind {
            DefKind::Template(t) => t.params.len(),
            _ => 0,
        };
        let mut key = ArgKey::with_size(count);
        let mut index = 0usize;
        *token = self.read_next_token(scope);
        loop {
            if token.is(GreaterThan) {
                break;
            }
            if token.is(EndOfCode) {
                self.herr
                    .error("unterminated template argument list", token.loc);
                return Err(cppdef_util::DeclError::Recoverable);
            }
            let starts_type = matches!(
                token.kind,
                Declarator | Decflag | Class | Struct | Union | Enum | Typename | Decltype
                    | Ellipsis
            );
            if starts_type {
                let ty = self.read_full_type(token, scope)?;
                if index < count {
                    key.set_type(index, ty);
                }
            } else {
                let expr = self.parse_expression(token, scope, precedence::TEMPLATE_ARG)?;
                let value = expr.eval(&self.defs);
                if index < count {
                    key.set_value(index, value);
                }
            }
            index += 1;
            if token.is(Comma) {
                *token = self.read_next_token(scope);
                continue;
            }
            if token.is(GreaterThan) {
                break;
            }
            self.report_errorf(token, "expected `,` or `>` in template arguments before %s");
            return Err(cppdef_util::DeclError::Recoverable);
        }
        if index > count {
            let name = self.defs.name_str(temp, &self.syms).to_string();
            self.herr.error(
                format!("too many template arguments for `{name}`"),
                token.loc,
            );
        }
        Ok(key)
    }

    /// `decltype(expr)`: a dependent type inside a template, an error
    /// outside one.
    fn read_decltype(&mut self, token: &mut Token, scope: DefId) -> DeclResult<DefId> {
        use TokenKind::*;
        *token = self.read_next_token(scope);
        if !token.is(LeftParenth) {
            self.report_errorf(token, "expected `(` after `decltype` before %s");
            return Err(cppdef_util::DeclError::Recoverable);
        }
        *token = self.read_next_token(scope);
        let loc = token.loc;
        let expr = self.parse_expression(token, scope, precedence::COMMA)?;
        if token.is(RightParenth) {
            *token = self.read_next_token(scope);
        } else {
            self.report_errorf(token, "expected `)` to close `decltype` before %s");
            return Err(cppdef_util::DeclError::Recoverable);
        }
        self.handle_hypothetical_expr(expr, scope, DefFlags::TYPENAME, loc)
    }
}
