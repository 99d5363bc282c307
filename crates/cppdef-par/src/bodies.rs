//! Scope-body handlers: classes, unions, enums, namespaces, templates,
//! typedefs and using-directives.
//!
//! Each handler takes `(scope, token, inherited_flags)`, consumes its
//! construct, and leaves the token on whatever follows — for tags that may
//! be a declarator (`struct S { } x;`), so the type reader can keep going.

use cppdef_util::{DeclError, DeclResult, DefId, Symbol};

use cppdef_lex::{Token, TokenKind};
use cppdef_sem::{
    DefFlags, DefKind, FullType, ScopeData, TemplateData, TypedData, Value, ValuedData,
};

use crate::context::ParseContext;
use crate::expr::precedence;

impl ParseContext {
    /// `class`/`struct` tag: definition, reference, or specialization.
    pub fn handle_class(
        &mut self,
        scope: DefId,
        token: &mut Token,
        inherited: DefFlags,
    ) -> DeclResult<DefId> {
        self.handle_tag(scope, token, inherited, DefFlags::CLASS, "Class")
    }

    /// `union` tag.
    pub fn handle_union(
        &mut self,
        scope: DefId,
        token: &mut Token,
        inherited: DefFlags,
    ) -> DeclResult<DefId> {
        self.handle_tag(scope, token, inherited, DefFlags::UNION, "Union")
    }

    fn handle_tag(
        &mut self,
        scope: DefId,
        token: &mut Token,
        inherited: DefFlags,
        kind_flag: DefFlags,
        what: &str,
    ) -> DeclResult<DefId> {
        use TokenKind::*;
        *token = self.read_next_token(scope);

        // Tag name, possibly followed by template arguments when this is a
        // specialization header.
        let mut specialization: Option<(DefId, cppdef_sem::ArgKey)> = None;
        let mut resolved: Option<DefId> = None;
        let name = match token.kind {
            Identifier | Declarator | Definition => {
                let n = token.text;
                let named = token.def;
                *token = self.read_next_token(scope);
                if let Some(d) = named {
                    if self.defs.def(d).flags.contains(DefFlags::TEMPLATE) && token.is(LessThan) {
                        let key = self.read_template_args(token, scope, d)?;
                        *token = self.read_next_token(scope);
                        specialization = Some((d, key));
                    } else {
                        resolved = Some(d);
                    }
                }
                n
            }
            _ => self.anon_name(what),
        };

        let class_id = if let Some((temp, key)) = specialization {
            let rendered = key.render(&self.defs, &self.syms);
            let base = self.defs.name_str(temp, &self.syms).to_string();
            let shown = self.syms.intern(&format!("{base}<{rendered}>"));
            let id = self.defs.push(cppdef_sem::Definition {
                name: shown,
                parent: Some(scope),
                flags: kind_flag | DefFlags::SCOPE | DefFlags::TYPENAME | DefFlags::SPECIALIZATION,
                kind: DefKind::Scope(ScopeData::default()),
            });
            let duplicate = match &mut self.defs.def_mut(temp).kind {
                DefKind::Template(t) => t.specializations.insert(key, id).is_some(),
                _ => false,
            };
            if duplicate {
                self.herr.error(
                    format!("duplicate specialization `{base}<{rendered}>`"),
                    token.loc,
                );
                self.fatal()?;
            }
            id
        } else {
            let in_members = self
                .defs
                .scope_data(scope)
                .and_then(|s| s.members.get(&name).copied())
                .filter(|d| self.defs.def(*d).flags.contains(kind_flag));
            let in_tags = self
                .c_structs
                .get(&name)
                .copied()
                .filter(|d| self.defs.def(*d).flags.contains(kind_flag));
            // A bodiless `struct S x;` may reference a tag from an outer
            // scope; a definition always (re)defines in the current scope.
            let referenced = if token.is(LeftBrace) || token.is(Colon) {
                None
            } else {
                resolved.filter(|d| self.defs.def(*d).flags.contains(kind_flag))
            };
            match in_members.or(in_tags).or(referenced) {
                Some(existing) => {
                    let redefined = token.is(LeftBrace)
                        && self
                            .defs
                            .scope_data(existing)
                            .map(|s| !s.members.is_empty())
                            .unwrap_or(false);
                    if redefined {
                        let shown = self.syms.resolve(name).to_string();
                        self.herr
                            .error(format!("redefinition of `{shown}`"), token.loc);
                        self.fatal()?;
                    }
                    existing
                }
                None => {
                    let access = inherited & (DefFlags::PRIVATE | DefFlags::PROTECTED);
                    let id = self.defs.push(cppdef_sem::Definition {
                        name,
                        parent: Some(scope),
                        flags: kind_flag | DefFlags::SCOPE | DefFlags::TYPENAME | access,
                        kind: DefKind::Scope(ScopeData::default()),
                    });
                    if self.defs.declare(scope, name, id).is_err() {
                        // The member slot is taken by a typed name; the tag
                        // lives in the C-tag namespace instead.
                        self.c_structs.insert(name, id);
                    }
                    id
                }
            }
        };

        if token.is(Colon) {
            self.read_base_clause(class_id, token, scope)?;
        }

        if token.is(LeftBrace) {
            *token = self.read_next_token(class_id);
            self.parse_class_body(class_id, token)?;
            *token = self.read_next_token(scope);
        }
        Ok(class_id)
    }

    /// `: [virtual] [access] Base, ...` up to the opening brace.
    fn read_base_clause(
        &mut self,
        class_id: DefId,
        token: &mut Token,
        scope: DefId,
    ) -> DeclResult<()> {
        use TokenKind::*;
        loop {
            *token = self.read_next_token(scope);
            while matches!(token.kind, Public | Private | Protected | Decflag) {
                *token = self.read_next_token(scope);
            }
            if !matches!(token.kind, Declarator | Definition) {
                self.report_errorf(token, "expected base class name before %s");
                return Err(DeclError::Recoverable);
            }
            let mut base = match token.def {
                Some(b) => b,
                None => return Err(DeclError::Recoverable),
            };
            *token = self.read_next_token(scope);
            if token.is(LessThan) && self.defs.def(base).flags.contains(DefFlags::TEMPLATE) {
                let key = self.read_template_args(token, scope, base)?;
                base = self.instantiate_or_defer(base, key, scope, token)?;
                *token = self.read_next_token(scope);
            }
            if let Some(s) = self.defs.scope_data_mut(class_id) {
                s.bases.push(base);
            }
            if !token.is(Comma) {
                return Ok(());
            }
        }
    }

    /// Member loop of a class or union body, honoring access labels.
    fn parse_class_body(&mut self, class_id: DefId, token: &mut Token) -> DeclResult<()> {
        use TokenKind::*;
        let mut access = DefFlags::EMPTY;
        loop {
            match token.kind {
                RightBrace => return Ok(()),
                EndOfCode => {
                    self.herr
                        .error("unexpected end of code inside class body", token.loc);
                    return Err(DeclError::Unrecoverable);
                }
                Semicolon => *token = self.read_next_token(class_id),
                Public => {
                    access = DefFlags::EMPTY;
                    self.expect_label_colon(token, class_id);
                }
                Private => {
                    access = DefFlags::PRIVATE;
                    self.expect_label_colon(token, class_id);
                }
                Protected => {
                    access = DefFlags::PROTECTED;
                    self.expect_label_colon(token, class_id);
                }
                Typedef => {
                    if self.handle_typedef(class_id, token, access).is_err() {
                        self.recover(token, class_id);
                    }
                }
                Template => {
                    if self.handle_template(class_id, token, access).is_err() {
                        self.recover(token, class_id);
                    }
                }
                Using => {
                    if self.handle_using(class_id, token, access).is_err() {
                        self.recover(token, class_id);
                    }
                }
                _ => self.declaration_step(class_id, token, access),
            }
        }
    }

    fn expect_label_colon(&mut self, token: &mut Token, scope: DefId) {
        *token = self.read_next_token(scope);
        if token.is(TokenKind::Colon) {
            *token = self.read_next_token(scope);
        } else {
            self.report_errorf(token, "expected `:` after access specifier before %s");
        }
    }

    /// `enum [class] [name] [: base] { enumerators }`.
    pub fn handle_enum(
        &mut self,
        scope: DefId,
        token: &mut Token,
        inherited: DefFlags,
    ) -> DeclResult<DefId> {
        use TokenKind::*;
        *token = self.read_next_token(scope);
        let scoped = if matches!(token.kind, Class | Struct) {
            *token = self.read_next_token(scope);
            true
        } else {
            false
        };
        let name = match token.kind {
            Identifier | Declarator | Definition => {
                let n = token.text;
                *token = self.read_next_token(scope);
                n
            }
            _ => self.anon_name("Enum"),
        };

        let existing = self
            .defs
            .scope_data(scope)
            .and_then(|s| s.members.get(&name).copied())
            .filter(|d| self.defs.def(*d).flags.contains(DefFlags::ENUM));
        let enum_id = match existing {
            Some(e) => e,
            None => {
                let access = inherited & (DefFlags::PRIVATE | DefFlags::PROTECTED);
                let id = self.defs.push(cppdef_sem::Definition {
                    name,
                    parent: Some(scope),
                    flags: DefFlags::ENUM | DefFlags::SCOPE | DefFlags::TYPENAME | access,
                    kind: DefKind::Scope(ScopeData::default()),
                });
                if self.defs.declare(scope, name, id).is_err() {
                    self.c_structs.insert(name, id);
                }
                id
            }
        };

        if token.is(Colon) {
            *token = self.read_next_token(scope);
            let _underlying = self.read_full_type(token, scope)?;
        }

        if token.is(LeftBrace) {
            *token = self.read_next_token(enum_id);
            let mut next_value: i64 = 0;
            loop {
                match token.kind {
                    RightBrace => break,
                    EndOfCode => {
                        self.herr
                            .error("unexpected end of code inside enum body", token.loc);
                        return Err(DeclError::Unrecoverable);
                    }
                    // An enumerator may shadow an existing name.
                    Identifier | Definition | Declarator => {
                        let ename = token.text;
                        *token = self.read_next_token(enum_id);
                        let value = if token.is(Operator) && token.text_is(&self.syms, "=") {
                            *token = self.read_next_token(enum_id);
                            let expr =
                                self.parse_expression(token, enum_id, precedence::COMMA)?;
                            match expr.eval(&self.defs) {
                                Value::Integer(n) => n,
                                _ => {
                                    self.herr.error(
                                        "enumerator value is not an integer constant",
                                        token.loc,
                                    );
                                    next_value
                                }
                            }
                        } else {
                            next_value
                        };
                        next_value = value.wrapping_add(1);
                        let entry = self.defs.push(cppdef_sem::Definition {
                            name: ename,
                            parent: Some(enum_id),
                            flags: DefFlags::VALUED | DefFlags::TYPED,
                            kind: DefKind::Valued(ValuedData {
                                ty: FullType::of(self.builtins.type_int),
                                value: Value::Integer(value),
                            }),
                        });
                        if self.defs.declare(enum_id, ename, entry).is_err() {
                            let shown = self.syms.resolve(ename).to_string();
                            self.herr.error(
                                format!("duplicate enumerator `{shown}`"),
                                token.loc,
                            );
                        } else if !scoped {
                            // Unscoped enumerators are visible in the
                            // enclosing scope as well.
                            let _ = self.defs.declare(scope, ename, entry);
                        }
                        if token.is(Comma) {
                            *token = self.read_next_token(enum_id);
                        }
                    }
                    _ => {
                        self.report_errorf(token, "expected enumerator name before %s");
                        while !matches!(token.kind, Comma | RightBrace | EndOfCode) {
                            *token = self.read_next_token(enum_id);
                        }
                        if token.is(Comma) {
                            *token = self.read_next_token(enum_id);
                        }
                    }
                }
            }
            *token = self.read_next_token(scope);
        }
        Ok(enum_id)
    }

    /// `namespace [name] { ... }`, reopening an existing namespace of the
    /// same name. Anonymous namespaces are imported into the parent.
    pub fn handle_namespace(
        &mut self,
        scope: DefId,
        token: &mut Token,
        _inherited: DefFlags,
    ) -> DeclResult<DefId> {
        use TokenKind::*;
        *token = self.read_next_token(scope);
        let ns = match token.kind {
            Identifier => {
                let name = token.text;
                let id = self.defs.push(cppdef_sem::Definition {
                    name,
                    parent: Some(scope),
                    flags: DefFlags::NAMESPACE | DefFlags::SCOPE,
                    kind: DefKind::Scope(ScopeData::default()),
                });
                if let Err(prior) = self.defs.declare(scope, name, id) {
                    if self.defs.def(prior).flags.contains(DefFlags::NAMESPACE) {
                        prior
                    } else {
                        let shown = self.syms.resolve(name).to_string();
                        self.herr.error(
                            format!("redeclaration of `{shown}` as a namespace"),
                            token.loc,
                        );
                        return Err(DeclError::Conflict);
                    }
                } else {
                    id
                }
            }
            Definition | Declarator => {
                // An existing namespace being reopened.
                match token.def {
                    Some(d) if self.defs.def(d).flags.contains(DefFlags::NAMESPACE) => d,
                    _ => {
                        self.report_errorf(token, "cannot reopen %s as a namespace");
                        return Err(DeclError::Conflict);
                    }
                }
            }
            LeftBrace => {
                let id = self.defs.push(cppdef_sem::Definition {
                    name: Symbol::EMPTY,
                    parent: Some(scope),
                    flags: DefFlags::NAMESPACE | DefFlags::SCOPE,
                    kind: DefKind::Scope(ScopeData::default()),
                });
                self.defs.push_dec_order(scope, id);
                // Anonymous namespace members are visible in the parent.
                if let Some(s) = self.defs.scope_data_mut(scope) {
                    s.usings.push(id);
                }
                id
            }
            _ => {
                self.report_errorf(token, "expected namespace name before %s");
                return Err(DeclError::Recoverable);
            }
        };
        if !token.is(LeftBrace) {
            *token = self.read_next_token(scope);
        }
        if !token.is(LeftBrace) {
            self.report_errorf(token, "expected `{` to open namespace body before %s");
            return Err(DeclError::Recoverable);
        }
        *token = self.read_next_token(ns);
        self.parse_scope_body(ns, token, DefFlags::EMPTY, TokenKind::RightBrace)?;
        if token.is(RightBrace) {
            *token = self.read_next_token(scope);
        } else {
            self.report_errorf(token, "expected `}` to close namespace before %s");
        }
        Ok(ns)
    }

    /// `template < params > declaration`.
    pub fn handle_template(
        &mut self,
        scope: DefId,
        token: &mut Token,
        inherited: DefFlags,
    ) -> DeclResult<DefId> {
        use TokenKind::*;
        let header_loc = token.loc;
        *token = self.read_next_token(scope);
        if !token.is(LessThan) {
            self.report_errorf(token, "expected `<` after `template` before %s");
            return Err(DeclError::Recoverable);
        }

        let temp = self.defs.push(cppdef_sem::Definition {
            name: Symbol::EMPTY,
            parent: Some(scope),
            flags: DefFlags::TEMPLATE | DefFlags::SCOPE | DefFlags::TEMPSCOPE,
            kind: DefKind::Template(TemplateData::default()),
        });

        *token = self.read_next_token(temp);
        let mut params: Vec<DefId> = Vec::new();
        while !token.is(GreaterThan) {
            if token.is(EndOfCode) {
                self.herr
                    .error("unterminated template parameter list", header_loc);
                return Err(DeclError::Unrecoverable);
            }
            match token.kind {
                Typename | Class => {
                    *token = self.read_next_token(temp);
                    let pname = if token.is(Identifier) {
                        let n = token.text;
                        *token = self.read_next_token(temp);
                        n
                    } else {
                        Symbol::EMPTY
                    };
                    let p = self.defs.push(cppdef_sem::Definition {
                        name: pname,
                        parent: Some(temp),
                        flags: DefFlags::TYPENAME | DefFlags::TEMPPARAM,
                        kind: DefKind::Primitive { size: 0 },
                    });
                    if pname.is_empty() {
                        self.defs.push_dec_order(temp, p);
                    } else {
                        let _ = self.defs.declare(temp, pname, p);
                    }
                    params.push(p);
                    if token.is(Operator) && token.text_is(&self.syms, "=") {
                        *token = self.read_next_token(temp);
                        let _default = self.read_full_type(token, temp)?;
                    }
                }
                Declarator | Decflag | Struct | Union | Enum => {
                    // Non-type parameter.
                    let ty = self.read_full_type(token, temp)?;
                    let pname = ty.refs.name;
                    let p = self.defs.push(cppdef_sem::Definition {
                        name: pname,
                        parent: Some(temp),
                        flags: DefFlags::TEMPPARAM | DefFlags::VALUED | DefFlags::TYPED,
                        kind: DefKind::Valued(ValuedData {
                            ty,
                            value: Value::Undefined,
                        }),
                    });
                    if pname.is_empty() {
                        self.defs.push_dec_order(temp, p);
                    } else {
                        let _ = self.defs.declare(temp, pname, p);
                    }
                    params.push(p);
                    if token.is(Operator) && token.text_is(&self.syms, "=") {
                        *token = self.read_next_token(temp);
                        let _default =
                            self.parse_expression(token, temp, precedence::TEMPLATE_ARG)?;
                    }
                }
                _ => {
                    self.report_errorf(token, "expected template parameter before %s");
                    return Err(DeclError::Recoverable);
                }
            }
            if token.is(Comma) {
                *token = self.read_next_token(temp);
                continue;
            }
            if !token.is(GreaterThan) {
                self.report_errorf(token, "expected `,` or `>` in template parameters before %s");
                return Err(DeclError::Recoverable);
            }
        }
        if let DefKind::Template(t) = &mut self.defs.def_mut(temp).kind {
            t.params = params;
        }
        *token = self.read_next_token(temp);

        // The parameterized declaration, parsed inside the parameter scope.
        let wrapped = match token.kind {
            Class | Struct => self.handle_class(temp, token, inherited)?,
            Union => self.handle_union(temp, token, inherited)?,
            _ => match self.handle_declarators(temp, token, inherited)? {
                Some(d) => d,
                None => {
                    self.herr
                        .error("expected a declaration after template header", header_loc);
                    return Err(DeclError::Recoverable);
                }
            },
        };
        if token.is(LeftBrace) {
            // A function template's body.
            self.skip_brace_block(token, temp);
        }

        let wrapped_name = self.defs.def(wrapped).name;
        let wrapped_flags = self.defs.def(wrapped).flags;
        {
            let d = self.defs.def_mut(temp);
            d.name = wrapped_name;
            if wrapped_flags.intersects(DefFlags::CLASS | DefFlags::UNION | DefFlags::TYPENAME) {
                d.flags |= DefFlags::TYPENAME;
            }
        }
        if let DefKind::Template(t) = &mut self.defs.def_mut(temp).kind {
            t.wrapped = Some(wrapped);
        }

        if wrapped_flags.contains(DefFlags::SPECIALIZATION) {
            // Registered on the base template inside the tag handler; the
            // enclosing scope does not get a second entry.
            return Ok(temp);
        }

        match self.defs.declare(scope, wrapped_name, temp) {
            Ok(()) => {}
            Err(prior) => {
                if !self.defs.def(prior).flags.contains(DefFlags::TEMPLATE) {
                    let shown = self.syms.resolve(wrapped_name).to_string();
                    self.herr.error(
                        format!("redeclaration of `{shown}` as a template"),
                        token.loc,
                    );
                    return Err(DeclError::Conflict);
                }
            }
        }
        Ok(temp)
    }

    /// `typedef type declarators;` — the declared names become type names.
    pub fn handle_typedef(
        &mut self,
        scope: DefId,
        token: &mut Token,
        inherited: DefFlags,
    ) -> DeclResult<()> {
        *token = self.read_next_token(scope);
        self.handle_declarators(scope, token, inherited | DefFlags::TYPENAME)?;
        Ok(())
    }

    /// `using namespace N;`, `using A::b;`, `using X = T;`.
    pub fn handle_using(
        &mut self,
        scope: DefId,
        token: &mut Token,
        inherited: DefFlags,
    ) -> DeclResult<()> {
        use TokenKind::*;
        *token = self.read_next_token(scope);
        if token.is(Namespace) {
            *token = self.read_next_token(scope);
            let Some(mut d) = token.def else {
                self.report_errorf(token, "expected namespace name before %s");
                return Err(DeclError::Recoverable);
            };
            *token = self.read_next_token(scope);
            while token.is(Scope) {
                *token = self.read_next_token(d);
                match token.def {
                    Some(next) => d = next,
                    None => {
                        self.report_errorf(token, "expected namespace member before %s");
                        return Err(DeclError::Recoverable);
                    }
                }
                *token = self.read_next_token(scope);
            }
            if !self.defs.def(d).flags.contains(DefFlags::NAMESPACE) {
                let what = self.defs.describe(d, &self.syms);
                self.herr
                    .error(format!("{what} is not a namespace"), token.loc);
                return Err(DeclError::Recoverable);
            }
            if let Some(s) = self.defs.scope_data_mut(scope) {
                s.usings.push(d);
            }
            return Ok(());
        }

        match token.kind {
            Identifier => {
                // Alias form: `using X = type;`
                let alias = token.text;
                *token = self.read_next_token(scope);
                if !(token.is(Operator) && token.text_is(&self.syms, "=")) {
                    self.report_errorf(token, "unknown name in using-declaration before %s");
                    return Err(DeclError::Recoverable);
                }
                *token = self.read_next_token(scope);
                let ty = self.read_full_type(token, scope)?;
                if ty.def.is_none() {
                    self.herr
                        .error("alias target does not name a type", token.loc);
                    return Err(DeclError::Recoverable);
                }
                let id = self.defs.push(cppdef_sem::Definition {
                    name: alias,
                    parent: Some(scope),
                    flags: DefFlags::TYPED | DefFlags::TYPENAME | inherited,
                    kind: DefKind::Typed(TypedData {
                        ty,
                        init: None,
                        bit_width: None,
                    }),
                });
                if self.defs.declare(scope, alias, id).is_err() {
                    let shown = self.syms.resolve(alias).to_string();
                    self.herr
                        .error(format!("redeclaration of `{shown}`"), token.loc);
                    return Err(DeclError::Conflict);
                }
                Ok(())
            }
            Definition | Declarator => {
                // Member import: `using A::b;`
                let Some(mut d) = token.def else {
                    self.report_errorf(token, "unresolved name %s in using-declaration");
                    return Err(DeclError::Recoverable);
                };
                *token = self.read_next_token(scope);
                while token.is(Scope) {
                    if !self.defs.is_scope(d) {
                        let what = self.defs.describe(d, &self.syms);
                        self.herr
                            .error(format!("cannot access {what} as a scope"), token.loc);
                        return Err(DeclError::Recoverable);
                    }
                    *token = self.read_next_token(d);
                    match token.def {
                        Some(next) => d = next,
                        None => {
                            self.report_errorf(token, "expected qualified-id before %s");
                            return Err(DeclError::Recoverable);
                        }
                    }
                    *token = self.read_next_token(scope);
                }
                let name = self.defs.def(d).name;
                let _ = self.defs.declare(scope, name, d);
                Ok(())
            }
            _ => {
                self.report_errorf(token, "expected a name after `using` before %s");
                Err(DeclError::Recoverable)
            }
        }
    }
}
