//! The declarator handler: the top-level declaration driver.
//!
//! Phase A determines the declared name and kind: destructors, then the
//! type reader, then the special cases for an empty name (constructors,
//! anonymous bitfields, qualified redeclarations). Phase B inserts into the
//! scope (with tag-namespace cross-indexing and function overloading on
//! collision) and runs the post-insert loop: initializers, comma-separated
//! continuations, bit widths, and the diagnostics for anything else.

use cppdef_util::{DeclError, DeclResult, DefId, Symbol};

use cppdef_lex::{Token, TokenKind};
use cppdef_sem::{
    ArgKey, DefFlags, DefKind, Definition, FullType, FunctionData, RefNode, TypeFlags, TypedData,
    Value,
};

use crate::context::ParseContext;
use crate::expr::precedence;

impl ParseContext {
    /// Handle one declaration starting at `token`. Returns the affected
    /// definition, or `None` when no declaration was present. The token is
    /// left on the terminator (`;`, `{`, `}`, ...) for the caller.
    pub fn handle_declarators(
        &mut self,
        scope: DefId,
        token: &mut Token,
        inherited: DefFlags,
    ) -> DeclResult<Option<DefId>> {
        let dtor = token.is(TokenKind::Tilde);
        if dtor {
            *token = self.read_next_token(scope);
        }

        let mut ty = self.read_full_type(token, scope)?;

        if dtor {
            let well_formed = ty.refs.name.is_empty()
                && ty.def == Some(scope)
                && ty.flags.is_empty()
                && ty.refs.len() == 1
                && ty.refs.top().is_some_and(RefNode::is_function);
            if well_formed {
                ty.refs.name = self.syms.intern("<destruct>");
            } else {
                self.herr
                    .error("malformed destructor declaration", token.loc);
                return Err(DeclError::Recoverable);
            }
        }

        if ty.def.is_none() {
            self.herr
                .error("declaration does not give a valid type", token.loc);
            return Err(DeclError::Recoverable);
        }

        self.handle_declarators_with(scope, token, ty, inherited)
    }

    /// Phase A for an already-read type, then phase B.
    pub fn handle_declarators_with(
        &mut self,
        scope: DefId,
        token: &mut Token,
        mut ty: FullType,
        inherited: DefFlags,
    ) -> DeclResult<Option<DefId>> {
        use TokenKind::*;

        if ty.refs.name.is_empty() {
            let scope_flags = self.defs.def(scope).flags;
            let parent = self.defs.def(scope).parent;
            let potential_ctor = ty.def == Some(scope)
                || (scope_flags.contains(DefFlags::TEMPSCOPE) && ty.def == parent && parent.is_some());
            let ctor_shaped = ty.flags.is_empty()
                && ty.refs.len() == 1
                && ty.refs.top().is_some_and(RefNode::is_function);
            if potential_ctor && ctor_shaped {
                ty.refs.name = self.syms.intern("<construct>");
                if token.is(Colon) {
                    // Member initializers run to the constructor body.
                    loop {
                        *token = self.read_next_token(scope);
                        if token.is(Semicolon) {
                            self.herr.error(
                                "expected constructor body here after initializers",
                                token.loc,
                            );
                            return Err(DeclError::Recoverable);
                        }
                        if token.is(EndOfCode) {
                            self.herr.error(
                                "unexpected end of code in constructor initializers",
                                token.loc,
                            );
                            return Err(DeclError::Unrecoverable);
                        }
                        if token.is(LeftBrace) {
                            break;
                        }
                    }
                }
            } else if token.is(Colon) {
                if scope_flags.contains(DefFlags::CLASS) {
                    ty.refs.name = self.anon_name("Field");
                } else {
                    self.herr.warning(
                        "declaration without a name is meaningless outside of a class",
                        token.loc,
                    );
                }
            } else if token.is(Definition) || token.is(Declarator) {
                return self.handle_qualified_redeclaration(scope, token, ty, inherited);
            } else {
                // Not a declaration (e.g. `struct S {};` where the tag
                // handler did all the work).
                return Ok(None);
            }
        }

        let base_def = ty.def;
        let base_flags = ty.flags;
        let res = self.insert_declaration(scope, token, ty, inherited)?;
        self.declaration_tail(scope, token, base_def, base_flags, inherited, res)
    }

    /// Phase A step 4's qualified-name walk: `S::f`, `outer::inner::x`,
    /// with template instantiation along the way.
    fn handle_qualified_redeclaration(
        &mut self,
        scope: DefId,
        token: &mut Token,
        mut ty: FullType,
        inherited: DefFlags,
    ) -> DeclResult<Option<DefId>> {
        use TokenKind::*;
        let Some(mut d) = token.def else {
            self.report_errorf(token, "unresolved name %s");
            return Err(DeclError::Recoverable);
        };
        *token = self.read_next_token(scope);
        loop {
            while token.is(Scope) {
                if !self.defs.is_scope(d) {
                    let what = self.defs.describe(d, &self.syms);
                    self.herr
                        .error(format!("cannot access {what} as a scope"), token.loc);
                    return Err(DeclError::Recoverable);
                }
                // Look the member up inside the named scope.
                *token = self.read_next_token(d);
                if !token.is(Definition) && !token.is(Declarator) {
                    if token.is(Identifier) {
                        let member = self.syms.resolve(token.text).to_string();
                        let owner = self.defs.name_str(d, &self.syms).to_string();
                        self.herr.error(
                            format!(
                                "expected qualified-id; `{member}` is not a member of `{owner}`"
                            ),
                            token.loc,
                        );
                    } else {
                        self.report_errorf(token, "expected qualified-id before %s");
                    }
                    return Err(DeclError::Recoverable);
                }
                match token.def {
                    Some(next) => d = next,
                    None => return Err(DeclError::Recoverable),
                }
                *token = self.read_next_token(scope);
            }
            if token.is(LessThan) && self.defs.def(d).flags.contains(DefFlags::TEMPLATE) {
                let key = self.read_template_args(token, scope, d)?;
                d = self.instantiate_or_defer(d, key, scope, token)?;
                *token = self.read_next_token(scope);
                continue;
            }
            break;
        }
        self.read_referencers_post(&mut ty, token, scope)?;
        let base_def = ty.def;
        let base_flags = ty.flags;
        self.declaration_tail(scope, token, base_def, base_flags, inherited, Some(d))
    }

    /// Phase B: insert the declared name, resolving collisions.
    fn insert_declaration(
        &mut self,
        scope: DefId,
        token: &mut Token,
        ty: FullType,
        inherited: DefFlags,
    ) -> DeclResult<Option<DefId>> {
        let name = ty.refs.name;
        let existing = self
            .defs
            .scope_data(scope)
            .and_then(|s| s.members.get(&name).copied());

        match existing {
            None => {
                let id = self.new_definition(scope, name, ty, inherited);
                // Cannot collide: we just checked.
                let _ = self.defs.declare(scope, name, id);
                Ok(Some(id))
            }
            Some(prior) => {
                let prior_flags = self.defs.def(prior).flags;
                if prior_flags.intersects(DefFlags::CLASS | DefFlags::UNION | DefFlags::ENUM) {
                    // The tag keeps living in the C-tag namespace; the
                    // typed name takes the member slot.
                    if let Some(&tag) = self.c_structs.get(&name) {
                        if tag != prior {
                            let shown = self.syms.resolve(name).to_string();
                            self.herr.error(
                                format!("attempt to redeclare `{shown}` failed due to conflicts"),
                                token.loc,
                            );
                            self.fatal()?;
                            return Ok(Some(prior));
                        }
                    }
                    self.c_structs.insert(name, prior);
                    let id = self.new_definition(scope, name, ty, inherited);
                    self.defs.redeclare(scope, name, id);
                    return Ok(Some(id));
                }
                if !prior_flags.contains(DefFlags::TYPED) {
                    let shown = self.syms.resolve(name).to_string();
                    self.herr.error(
                        format!("redeclaration of `{shown}` as a different kind of symbol"),
                        token.loc,
                    );
                    return Err(DeclError::Conflict);
                }
                if prior_flags.contains(DefFlags::FUNCTION) {
                    return self
                        .overload_function(scope, prior, ty, inherited, token)
                        .map(Some);
                }
                // Silent redeclaration of a typed entity.
                Ok(Some(prior))
            }
        }
    }

    /// Build a typed or function definition from the parsed type.
    fn new_definition(
        &mut self,
        scope: DefId,
        name: Symbol,
        ty: FullType,
        inherited: DefFlags,
    ) -> DefId {
        let is_function = ty.refs.top().is_some_and(RefNode::is_function);
        let flags = DefFlags::TYPED | inherited;
        if is_function {
            let key = signature_key(&ty);
            let id = self.defs.push(Definition {
                name,
                parent: Some(scope),
                flags: flags | DefFlags::FUNCTION,
                kind: DefKind::Function(FunctionData {
                    ty,
                    overloads: Default::default(),
                }),
            });
            // The primary signature maps to the function itself.
            if let DefKind::Function(f) = &mut self.defs.def_mut(id).kind {
                f.overloads.insert(key, id);
            }
            id
        } else {
            self.defs.push(Definition {
                name,
                parent: Some(scope),
                flags,
                kind: DefKind::Typed(TypedData {
                    ty,
                    init: None,
                    bit_width: None,
                }),
            })
        }
    }

    /// Register a new signature on an existing function, or diagnose the
    /// conflict.
    fn overload_function(
        &mut self,
        scope: DefId,
        func: DefId,
        ty: FullType,
        inherited: DefFlags,
        token: &Token,
    ) -> DeclResult<DefId> {
        let key = signature_key(&ty);
        let prior = match &self.defs.def(func).kind {
            DefKind::Function(f) => f.overloads.get(&key).copied(),
            _ => None,
        };
        if let Some(existing) = prior {
            // The same parameter list again: fine if the rest agrees.
            let matches = match &self.defs.def(existing).kind {
                DefKind::Function(f) => f.ty.def == ty.def && f.ty.flags == ty.flags,
                _ => false,
            };
            if matches {
                return Ok(existing);
            }
            let shown = self.syms.resolve(ty.refs.name).to_string();
            self.herr.error(
                format!("conflicting declaration of overload `{shown}`"),
                token.loc,
            );
            return Err(DeclError::Conflict);
        }
        let name = ty.refs.name;
        let id = self.defs.push(Definition {
            name,
            parent: Some(scope),
            flags: DefFlags::TYPED | DefFlags::FUNCTION | inherited,
            kind: DefKind::Function(FunctionData {
                ty,
                overloads: Default::default(),
            }),
        });
        if let DefKind::Function(f) = &mut self.defs.def_mut(func).kind {
            f.overloads.insert(key, id);
        }
        Ok(id)
    }

    /// The post-insert loop: `=` initializer, `,` continuation, `:` bit
    /// width, diagnostics for loose literals and operators. Structural
    /// tokens terminate and stay in `token`.
    fn declaration_tail(
        &mut self,
        scope: DefId,
        token: &mut Token,
        base_def: Option<DefId>,
        base_flags: TypeFlags,
        inherited: DefFlags,
        res: Option<DefId>,
    ) -> DeclResult<Option<DefId>> {
        use TokenKind::*;
        loop {
            match token.kind {
                Operator => {
                    if !token.text_is(&self.syms, "=") {
                        let what = token.describe(&self.syms);
                        self.herr
                            .error(format!("unexpected {what} at this point"), token.loc);
                        return Err(DeclError::Unrecoverable);
                    }
                    *token = self.read_next_token(scope);
                    let init = self.parse_expression(token, scope, precedence::COMMA)?;
                    if let Some(id) = res {
                        if let DefKind::Typed(t) = &mut self.defs.def_mut(id).kind {
                            t.init = Some(init);
                        }
                    }
                }
                LessThan | GreaterThan => {
                    let what = token.describe(&self.syms);
                    self.herr
                        .error(format!("unexpected {what} at this point"), token.loc);
                    return Err(DeclError::Unrecoverable);
                }
                Comma => {
                    *token = self.read_next_token(scope);
                    let mut next_ty = FullType {
                        def: base_def,
                        flags: base_flags,
                        refs: Default::default(),
                    };
                    self.read_referencers(&mut next_ty, token, scope)?;
                    return self.handle_declarators_with(scope, token, next_ty, inherited);
                }
                Colon => {
                    if base_def != Some(self.builtins.type_int) {
                        self.herr.error(
                            "attempt to assign bit count in non-integer declaration",
                            token.loc,
                        );
                        self.fatal()?;
                    }
                    *token = self.read_next_token(scope);
                    let width = self.parse_expression(token, scope, precedence::COMMA + 1)?;
                    match width.eval(&self.defs) {
                        Value::Integer(n) if n >= 0 => {
                            if let Some(id) = res {
                                if let DefKind::Typed(t) = &mut self.defs.def_mut(id).kind {
                                    t.bit_width = Some(n as u32);
                                }
                            }
                        }
                        _ => {
                            self.herr
                                .error("bit count is not an integer", token.loc);
                            self.fatal()?;
                        }
                    }
                }
                StringLiteral | CharLiteral | DecLiteral | HexLiteral | OctLiteral => {
                    self.herr
                        .error("expected initializer `=` here before literal", token.loc);
                    return Err(DeclError::Unrecoverable);
                }
                _ => return Ok(res),
            }
        }
    }
}

/// The overload key of a declaration: the parameter types of the outermost
/// function node.
fn signature_key(ty: &FullType) -> ArgKey {
    match ty.refs.top() {
        Some(RefNode::Function { params }) => ArgKey::from_params(params),
        _ => ArgKey::default(),
    }
}
