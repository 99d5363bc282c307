//! Hypothetical definitions and template instantiation.
//!
//! A template accessed where its arguments cannot be resolved yields a
//! hypothetical: a placeholder definition named `(?=expr)` whose expression
//! is evaluated once the enclosing template is instantiated. The template
//! keeps a non-owning back-reference in `dependents`; the hypothetical
//! itself lives in its scope's declaration-order list.

use cppdef_util::{DeclError, DeclResult, DefId, Loc, Symbol};

use cppdef_lex::Token;
use cppdef_sem::{ArgKey, DefFlags, DefKind, Definition, Expr, HypotheticalData};

use crate::context::ParseContext;

impl ParseContext {
    /// Resolve a template-id: direct instantiation outside templates, the
    /// dependent path inside one.
    pub fn instantiate_or_defer(
        &mut self,
        temp: DefId,
        key: ArgKey,
        scope: DefId,
        token: &Token,
    ) -> DeclResult<DefId> {
        if self.defs.nearest_template(scope).is_some() {
            return self.handle_dependent_tempinst(scope, temp, key, DefFlags::EMPTY, token.loc);
        }
        if key.is_dependent(&self.defs) {
            self.herr
                .error("cannot infer type outside of template", token.loc);
            return Err(DeclError::Recoverable);
        }
        self.instantiate(temp, key, token.loc)
    }

    /// Materialize (or fetch) the instantiation of `temp` for `key`.
    /// Specializations win over the instance cache; a template whose
    /// parameterized declaration has not been parsed yet resolves to
    /// itself.
    pub fn instantiate(&mut self, temp: DefId, key: ArgKey, loc: Loc) -> DeclResult<DefId> {
        let (wrapped, parent) = match &self.defs.def(temp).kind {
            DefKind::Template(t) => {
                if let Some(&spec) = t.specializations.get(&key) {
                    return Ok(spec);
                }
                if let Some(&inst) = t.instances.get(&key) {
                    return Ok(inst);
                }
                (t.wrapped, self.defs.def(temp).parent)
            }
            _ => {
                let what = self.defs.describe(temp, &self.syms);
                self.herr
                    .error(format!("{what} is not a template"), loc);
                return Err(DeclError::Recoverable);
            }
        };

        let Some(wrapped) = wrapped else {
            // Not yet parameterized (self-reference in the template's own
            // header): the template stands for itself.
            return Ok(temp);
        };

        let rendered = key.render(&self.defs, &self.syms);
        let base = self.defs.name_str(temp, &self.syms).to_string();
        let name = self.syms.intern(&format!("{base}<{rendered}>"));

        // Shallow instance: shares the wrapped definition's members; full
        // member remapping is argument deduction, which stays out of scope.
        let instance = Definition {
            name,
            parent,
            flags: self.defs.def(wrapped).flags,
            kind: self.defs.def(wrapped).kind.clone(),
        };
        let id = self.defs.push(instance);
        if let DefKind::Template(t) = &mut self.defs.def_mut(temp).kind {
            t.instances.insert(key, id);
        }
        Ok(id)
    }

    /// The dependent path: inside the template's own parameter scope the
    /// template resolves to its wrapped definition (after a specialization
    /// lookup); anywhere else inside a template a hypothetical is created.
    pub fn handle_dependent_tempinst(
        &mut self,
        scope: DefId,
        temp: DefId,
        key: ArgKey,
        flags: DefFlags,
        loc: Loc,
    ) -> DeclResult<DefId> {
        if self.defs.def(scope).flags.contains(DefFlags::TEMPLATE) {
            if let DefKind::Template(t) = &self.defs.def(temp).kind {
                if let Some(&spec) = t.specializations.get(&key) {
                    return Ok(spec);
                }
                if let Some(wrapped) = t.wrapped {
                    return Ok(wrapped);
                }
            }
            return Ok(temp);
        }
        let mut flags = flags;
        let wrapped_flags = match &self.defs.def(temp).kind {
            DefKind::Template(t) => t.wrapped.map(|w| self.defs.def(w).flags),
            _ => None,
        };
        if wrapped_flags
            .map(|f| f.intersects(DefFlags::CLASS | DefFlags::TYPENAME))
            .unwrap_or(false)
        {
            flags |= DefFlags::TYPENAME;
        }
        let expr = Expr::Instantiate {
            template: temp,
            key,
        };
        self.handle_hypothetical_expr(expr, scope, flags, loc)
    }

    /// Wrap an unresolved expression in a hypothetical definition owned by
    /// `scope` and registered with the nearest enclosing template.
    pub fn handle_hypothetical_expr(
        &mut self,
        expr: Expr,
        scope: DefId,
        flags: DefFlags,
        loc: Loc,
    ) -> DeclResult<DefId> {
        let Some(temp) = self.defs.nearest_template(scope) else {
            self.herr
                .error("cannot infer type outside of template", loc);
            return Err(DeclError::Recoverable);
        };
        let rendered = expr.render(&self.defs, &self.syms);
        let name = self.syms.intern(&format!("(?={rendered})"));
        let hyp = self.defs.push(Definition {
            name,
            parent: Some(scope),
            flags: flags | DefFlags::HYPOTHETICAL | DefFlags::TYPENAME,
            kind: DefKind::Hypothetical(HypotheticalData { expr }),
        });
        if let DefKind::Template(t) = &mut self.defs.def_mut(temp).kind {
            t.dependents.push(hyp);
        }
        self.defs.push_dec_order(scope, hyp);
        Ok(hyp)
    }

    /// Member access on a hypothetical (`h::id`): another hypothetical,
    /// owned by the parent scope.
    pub fn hypothetical_access(
        &mut self,
        base: DefId,
        member: Symbol,
        loc: Loc,
    ) -> DeclResult<DefId> {
        let scope = self.defs.def(base).parent.unwrap_or(cppdef_sem::DefTable::ROOT_ID);
        let expr = Expr::Access {
            base: Box::new(Expr::Def(base)),
            member,
        };
        self.handle_hypothetical_expr(expr, scope, DefFlags::TYPENAME, loc)
    }

    /// Parse a dependent type expression at scope precedence and wrap it.
    pub fn handle_hypothetical(
        &mut self,
        token: &mut Token,
        scope: DefId,
        flags: DefFlags,
    ) -> DeclResult<DefId> {
        let loc = token.loc;
        let expr = self.parse_expression(token, scope, crate::expr::precedence::SCOPE)?;
        self.handle_hypothetical_expr(expr, scope, flags, loc)
    }
}
