//! Edge case tests for cppdef-par

#[cfg(test)]
mod tests {
    use crate::ParseContext;
    use cppdef_sem::{DefFlags, DefKind, DefTable, FullType, RefNode, TypeFlags, Value};
    use cppdef_util::{DefId, Symbol};

    fn parse(source: &str) -> ParseContext {
        ParseContext::parse_source("test.cpp", source)
    }

    fn parse_clean(source: &str) -> ParseContext {
        let cx = parse(source);
        assert!(
            !cx.herr.has_errors(),
            "unexpected diagnostics:\n{}",
            cx.herr.render(&cx.map)
        );
        cx
    }

    impl ParseContext {
        fn find(&self, scope: DefId, name: &str) -> Option<DefId> {
            let sym = self.syms.lookup(name)?;
            self.defs
                .scope_data(scope)
                .and_then(|s| s.members.get(&sym).copied())
        }

        fn root_member(&self, name: &str) -> DefId {
            self.find(DefTable::ROOT_ID, name)
                .unwrap_or_else(|| panic!("`{name}` not found in root scope"))
        }

        fn typed_ty(&self, id: DefId) -> &FullType {
            match &self.defs.def(id).kind {
                DefKind::Typed(t) => &t.ty,
                DefKind::Function(f) => &f.ty,
                other => panic!("expected a typed definition, got {other:?}"),
            }
        }
    }

    // ==================== BASIC DECLARATIONS ====================

    #[test]
    fn plain_int_declaration() {
        let cx = parse_clean("int x;");
        let x = cx.root_member("x");
        // Invariant: members[name] == def and def.parent == scope.
        assert_eq!(cx.defs.def(x).parent, Some(DefTable::ROOT_ID));
        let ty = cx.typed_ty(x);
        assert_eq!(ty.def, Some(cx.builtins.type_int));
        assert!(ty.flags.is_empty());
        assert!(ty.refs.is_empty());
    }

    #[test]
    fn const_pointer_with_initializer() {
        let cx = parse_clean("const int *const p = 0;");
        let p = cx.root_member("p");
        let ty = cx.typed_ty(p).clone();
        assert_eq!(ty.def, Some(cx.builtins.type_int));
        assert_eq!(ty.flags, TypeFlags::CONST);
        assert_eq!(ty.refs.len(), 1);
        assert_eq!(
            ty.refs.top(),
            Some(&RefNode::Pointer {
                is_const: true,
                is_volatile: false
            })
        );
        match &cx.defs.def(p).kind {
            DefKind::Typed(t) => assert!(t.init.is_some(), "initializer not attached"),
            _ => panic!("p should be typed"),
        }
    }

    #[test]
    fn comma_separated_declarators() {
        let cx = parse_clean("int a, *b, c[4];");
        let a = cx.root_member("a");
        assert!(cx.typed_ty(a).refs.is_empty());
        let b = cx.root_member("b");
        assert_eq!(cx.typed_ty(b).refs.top(), Some(&RefNode::pointer()));
        let c = cx.root_member("c");
        assert_eq!(
            cx.typed_ty(c).refs.top(),
            Some(&RefNode::Array { bound: Some(4) })
        );
    }

    #[test]
    fn unsigned_alone_implies_int() {
        let cx = parse_clean("unsigned u;");
        let u = cx.root_member("u");
        let ty = cx.typed_ty(u);
        assert_eq!(ty.def, Some(cx.builtins.type_int));
        assert!(ty.flags.contains(TypeFlags::UNSIGNED));
    }

    #[test]
    fn const_alone_implies_int() {
        let cx = parse_clean("const c = 5;");
        let c = cx.root_member("c");
        let ty = cx.typed_ty(c);
        assert_eq!(ty.def, Some(cx.builtins.type_int));
        assert!(ty.flags.contains(TypeFlags::CONST));
    }

    #[test]
    fn long_long_promotes() {
        let cx = parse_clean("unsigned long long big;");
        let big = cx.root_member("big");
        let ty = cx.typed_ty(big);
        assert!(ty.flags.contains(TypeFlags::UNSIGNED));
        assert!(ty.flags.contains(TypeFlags::LONG));
        assert!(ty.flags.contains(TypeFlags::LONG_LONG));
    }

    #[test]
    fn two_types_is_diagnosed() {
        let cx = parse("int double x;");
        assert!(cx.herr.has_errors());
    }

    // ==================== DECLARATORS ====================

    #[test]
    fn function_pointer_stack_order() {
        let cx = parse_clean("int (*f)(int, char);");
        let f = cx.root_member("f");
        let ty = cx.typed_ty(f);
        // Outside-in: FUNCTION[int, char] then POINTER_TO.
        let kinds: Vec<bool> = ty.refs.iter_top().map(RefNode::is_function).collect();
        assert_eq!(kinds, vec![true, false]);
        match ty.refs.top() {
            Some(RefNode::Function { params }) => {
                assert_eq!(params.len(), 2);
                assert_eq!(params[0].ty.def, Some(cx.builtins.type_int));
                assert_eq!(params[1].ty.def, Some(cx.builtins.type_char));
            }
            other => panic!("expected function at top, got {other:?}"),
        }
    }

    #[test]
    fn array_bounds() {
        let cx = parse_clean("int a[3]; int b[]; int c[2 + 2];");
        assert_eq!(
            cx.typed_ty(cx.root_member("a")).refs.top(),
            Some(&RefNode::Array { bound: Some(3) })
        );
        assert_eq!(
            cx.typed_ty(cx.root_member("b")).refs.top(),
            Some(&RefNode::Array { bound: None })
        );
        assert_eq!(
            cx.typed_ty(cx.root_member("c")).refs.top(),
            Some(&RefNode::Array { bound: Some(4) })
        );
    }

    #[test]
    fn array_of_pointers_vs_pointer_to_array() {
        let cx = parse_clean("int *a[3]; int (*b)[3];");
        // *a[3]: array of pointer — array binds tighter (innermost).
        let a_ty = cx.typed_ty(cx.root_member("a"));
        assert!(matches!(a_ty.refs.top(), Some(RefNode::Pointer { .. })));
        // (*b)[3]: pointer to array — array is outermost.
        let b_ty = cx.typed_ty(cx.root_member("b"));
        assert!(matches!(b_ty.refs.top(), Some(RefNode::Array { .. })));
    }

    #[test]
    fn reference_declarator() {
        let cx = parse_clean("int x; int &r = x;");
        let r = cx.root_member("r");
        assert_eq!(cx.typed_ty(r).refs.top(), Some(&RefNode::Reference));
    }

    #[test]
    fn variadic_parameter() {
        let cx = parse_clean("int printf(char *fmt, ...);");
        let f = cx.root_member("printf");
        match cx.typed_ty(f).refs.top() {
            Some(RefNode::Function { params }) => {
                assert_eq!(params.len(), 2);
                assert!(!params[0].variadic);
                assert!(params[1].variadic);
                assert_eq!(params[1].ty.def, Some(cx.builtins.type_va_list));
            }
            other => panic!("expected function, got {other:?}"),
        }
    }

    // ==================== FUNCTIONS & OVERLOADS ====================

    #[test]
    fn function_declaration() {
        let cx = parse_clean("int foo(int a, char b);");
        let foo = cx.root_member("foo");
        assert!(cx.defs.def(foo).flags.contains(DefFlags::FUNCTION));
        match &cx.defs.def(foo).kind {
            DefKind::Function(f) => assert_eq!(f.overloads.len(), 1),
            _ => panic!("foo should be a function"),
        }
    }

    #[test]
    fn overloads_keyed_by_signature() {
        let cx = parse_clean("int foo(int); int foo(char);");
        let foo = cx.root_member("foo");
        match &cx.defs.def(foo).kind {
            DefKind::Function(f) => assert_eq!(f.overloads.len(), 2),
            _ => panic!("foo should be a function"),
        }
    }

    #[test]
    fn same_signature_is_silent_redeclaration() {
        let cx = parse_clean("int foo(int); int foo(int);");
        let foo = cx.root_member("foo");
        match &cx.defs.def(foo).kind {
            DefKind::Function(f) => assert_eq!(f.overloads.len(), 1),
            _ => panic!("foo should be a function"),
        }
    }

    #[test]
    fn parameter_names_do_not_split_overloads() {
        let cx = parse_clean("int foo(int alpha); int foo(int beta);");
        let foo = cx.root_member("foo");
        match &cx.defs.def(foo).kind {
            DefKind::Function(f) => assert_eq!(f.overloads.len(), 1),
            _ => panic!("foo should be a function"),
        }
    }

    #[test]
    fn conflicting_return_type_is_diagnosed() {
        let cx = parse("int foo(int); char foo(int);");
        assert!(cx.herr.has_errors());
    }

    #[test]
    fn function_with_body_is_balanced() {
        let cx = parse_clean("int f() { if (1) { } } int g;");
        cx.root_member("f");
        cx.root_member("g");
    }

    // ==================== CLASSES ====================

    #[test]
    fn struct_with_special_members() {
        let cx = parse_clean("struct S { S(); ~S(); int x : 3; int : 0; };");
        let s = cx.root_member("S");
        assert!(cx.defs.def(s).flags.contains(DefFlags::CLASS));

        let ctor = cx.find(s, "<construct>").expect("constructor missing");
        assert!(cx.defs.def(ctor).flags.contains(DefFlags::FUNCTION));
        let dtor = cx.find(s, "<destruct>").expect("destructor missing");
        assert!(cx.defs.def(dtor).flags.contains(DefFlags::FUNCTION));

        let x = cx.find(s, "x").expect("bitfield x missing");
        match &cx.defs.def(x).kind {
            DefKind::Typed(t) => assert_eq!(t.bit_width, Some(3)),
            _ => panic!("x should be typed"),
        }

        let anon = cx
            .find(s, "<anonymousField0000000000>")
            .expect("anonymous zero-width field missing");
        match &cx.defs.def(anon).kind {
            DefKind::Typed(t) => assert_eq!(t.bit_width, Some(0)),
            _ => panic!("anonymous field should be typed"),
        }
    }

    #[test]
    fn constructor_with_member_initializers() {
        let cx = parse_clean("struct P { int x; P() : x(0) { } };");
        assert_eq!(cx.herr.error_count(), 0);
    }

    #[test]
    fn member_access_labels() {
        let cx = parse_clean("struct A { public: int x; private: int y; protected: int z; };");
        let a = cx.root_member("A");
        let x = cx.find(a, "x").unwrap();
        let y = cx.find(a, "y").unwrap();
        let z = cx.find(a, "z").unwrap();
        assert!(!cx.defs.def(x).flags.intersects(DefFlags::PRIVATE | DefFlags::PROTECTED));
        assert!(cx.defs.def(y).flags.contains(DefFlags::PRIVATE));
        assert!(cx.defs.def(z).flags.contains(DefFlags::PROTECTED));
    }

    #[test]
    fn struct_then_variable_of_it() {
        let cx = parse_clean("struct S { int a; } s1; S s2;");
        let s = cx.root_member("S");
        // `} s1;` and `S s2;` share the base type.
        assert_eq!(cx.typed_ty(cx.root_member("s1")).def, Some(s));
        assert_eq!(cx.typed_ty(cx.root_member("s2")).def, Some(s));
    }

    #[test]
    fn tag_and_typed_name_coexist() {
        let mut cx = parse_clean("struct S { }; int S;");
        let sym = cx.syms.intern("S");
        // The typed name takes the member slot...
        let member = cx.root_member("S");
        assert!(cx.defs.def(member).flags.contains(DefFlags::TYPED));
        // ...and the tag remains reachable through the C-tag namespace.
        let tag = cx.c_structs.get(&sym).copied().expect("tag displaced");
        assert!(cx.defs.def(tag).flags.contains(DefFlags::CLASS));
    }

    #[test]
    fn base_clause_is_recorded() {
        let cx = parse_clean("struct B { }; struct D : public B { };");
        let b = cx.root_member("B");
        let d = cx.root_member("D");
        assert_eq!(cx.defs.scope_data(d).unwrap().bases, vec![b]);
    }

    #[test]
    fn malformed_destructor_is_diagnosed() {
        let cx = parse("struct T { ~T; };");
        assert!(cx.herr.has_errors());
    }

    #[test]
    fn bitfield_on_non_integer_is_diagnosed() {
        let cx = parse("struct B { char c : 3; };");
        assert!(cx.herr.has_errors());
    }

    #[test]
    fn qualified_member_redeclaration() {
        let cx = parse_clean("struct S { int f(); }; int S::f() { }");
        let s = cx.root_member("S");
        assert!(cx.find(s, "f").is_some());
    }

    #[test]
    fn operator_overload_names() {
        let cx = parse_clean(
            "struct V { int operator[](int i); int operator()(); int operator+(int other); };",
        );
        let v = cx.root_member("V");
        assert!(cx.find(v, "operator[]").is_some());
        assert!(cx.find(v, "operator()").is_some());
        assert!(cx.find(v, "operator+").is_some());
    }

    // ==================== NAMESPACES, ENUMS, USING ====================

    #[test]
    fn namespace_members_and_reopening() {
        let cx = parse_clean("namespace n { int x; } namespace n { int y; }");
        let n = cx.root_member("n");
        assert!(cx.defs.def(n).flags.contains(DefFlags::NAMESPACE));
        assert!(cx.find(n, "x").is_some());
        assert!(cx.find(n, "y").is_some());
    }

    #[test]
    fn using_namespace_imports() {
        let mut cx = parse_clean("namespace n { int x; } using namespace n; int y = x;");
        let sym = cx.syms.intern("x");
        assert!(cx.defs.lookup(DefTable::ROOT_ID, sym).is_some());
        let y = cx.root_member("y");
        match &cx.defs.def(y).kind {
            DefKind::Typed(t) => assert!(t.init.is_some()),
            _ => panic!("y should be typed"),
        }
    }

    #[test]
    fn using_member_declaration() {
        let cx = parse_clean("namespace n { int x; } using n::x;");
        cx.root_member("x");
    }

    #[test]
    fn using_alias() {
        let cx = parse_clean("using word = unsigned long; word w;");
        let word = cx.root_member("word");
        assert!(cx.defs.def(word).flags.contains(DefFlags::TYPENAME));
        assert_eq!(cx.typed_ty(cx.root_member("w")).def, Some(word));
    }

    #[test]
    fn enum_values_increment() {
        let cx = parse_clean("enum Color { RED, GREEN = 5, BLUE };");
        let color = cx.root_member("Color");
        let value_of = |cx: &ParseContext, name: &str| {
            let id = cx.find(color, name).unwrap();
            match &cx.defs.def(id).kind {
                DefKind::Valued(v) => v.value.clone(),
                _ => panic!("enumerator should be valued"),
            }
        };
        assert_eq!(value_of(&cx, "RED"), Value::Integer(0));
        assert_eq!(value_of(&cx, "GREEN"), Value::Integer(5));
        assert_eq!(value_of(&cx, "BLUE"), Value::Integer(6));
        // Unscoped enumerators are visible in the enclosing scope.
        cx.root_member("RED");
    }

    #[test]
    fn enumerator_usable_in_constant_expressions() {
        let cx = parse_clean("enum { N = 4 }; int a[N];");
        assert_eq!(
            cx.typed_ty(cx.root_member("a")).refs.top(),
            Some(&RefNode::Array { bound: Some(4) })
        );
    }

    #[test]
    fn typedef_names_are_types() {
        let cx = parse_clean("typedef unsigned long size_type; size_type n;");
        let alias = cx.root_member("size_type");
        assert!(cx.defs.def(alias).flags.contains(DefFlags::TYPENAME));
        assert_eq!(cx.typed_ty(cx.root_member("n")).def, Some(alias));
    }

    // ==================== TEMPLATES & HYPOTHETICALS ====================

    #[test]
    fn template_registers_under_wrapped_name() {
        let cx = parse_clean("template<typename T> struct V { T x; };");
        let v = cx.root_member("V");
        assert!(cx.defs.def(v).flags.contains(DefFlags::TEMPLATE));
        match &cx.defs.def(v).kind {
            DefKind::Template(t) => {
                assert_eq!(t.params.len(), 1);
                assert!(t.wrapped.is_some());
            }
            _ => panic!("V should be a template"),
        }
    }

    #[test]
    fn template_instantiation_outside_template() {
        let cx = parse_clean("template<typename T> struct V { T x; }; V<int> v;");
        let v_var = cx.root_member("v");
        let base = cx.typed_ty(v_var).def.expect("v has a base type");
        assert_eq!(cx.defs.name_str(base, &cx.syms), "V<int>");
        assert!(cx.defs.def(base).flags.contains(DefFlags::CLASS));
        // The instance is cached.
        let v = cx.root_member("V");
        match &cx.defs.def(v).kind {
            DefKind::Template(t) => assert_eq!(t.instances.len(), 1),
            _ => panic!("V should be a template"),
        }
    }

    #[test]
    fn dependent_access_becomes_hypothetical() {
        let cx = parse_clean(
            "template<typename T> struct V { T x; };\n\
             template<typename U> struct W { V<int>::x y; };",
        );
        let hyp_names: Vec<String> = cx
            .defs
            .iter()
            .filter(|(_, d)| d.flags.contains(DefFlags::HYPOTHETICAL))
            .map(|(_, d)| cx.syms.resolve(d.name).to_string())
            .collect();
        assert!(
            hyp_names.iter().any(|n| n == "(?=V<int>::x)"),
            "expected (?=V<int>::x), found {hyp_names:?}"
        );
    }

    #[test]
    fn hypothetical_recorded_as_dependent() {
        let cx = parse_clean(
            "template<typename T> struct V { T x; };\n\
             template<typename U> struct W { V<int>::x y; };",
        );
        let w = cx.root_member("W");
        match &cx.defs.def(w).kind {
            DefKind::Template(t) => assert!(!t.dependents.is_empty()),
            _ => panic!("W should be a template"),
        }
    }

    #[test]
    fn typename_dependent_member() {
        let cx = parse_clean("template<typename T> struct Q { typename T::value_type v; };");
        let found = cx
            .defs
            .iter()
            .any(|(_, d)| d.flags.contains(DefFlags::HYPOTHETICAL));
        assert!(found, "typename T::value_type should produce a hypothetical");
    }

    #[test]
    fn cannot_infer_outside_template() {
        let cx = parse("template<typename T> struct V { T x; }; V<int>::x y;");
        // Outside a template, the dependent member access is an error.
        assert!(cx.herr.has_errors());
    }

    #[test]
    fn self_reference_inside_template_body() {
        let cx = parse_clean("template<typename T> struct V { V *next; };");
        let v = cx.root_member("V");
        let wrapped = match &cx.defs.def(v).kind {
            DefKind::Template(t) => t.wrapped.unwrap(),
            _ => panic!("V should be a template"),
        };
        let next = cx.find(wrapped, "next").expect("member next missing");
        assert!(matches!(
            cx.typed_ty(next).refs.top(),
            Some(RefNode::Pointer { .. })
        ));
    }

    #[test]
    fn template_specialization_is_found() {
        let cx = parse_clean(
            "template<typename T> struct V { T x; };\n\
             template<> struct V<int> { int special; };\n\
             V<int> v;",
        );
        let v_var = cx.root_member("v");
        let base = cx.typed_ty(v_var).def.unwrap();
        assert!(cx.defs.def(base).flags.contains(DefFlags::SPECIALIZATION));
        let special = cx.find(base, "special");
        assert!(special.is_some(), "specialization members should be visible");
    }

    #[test]
    fn non_type_template_parameter() {
        let cx = parse_clean("template<int N> struct Arr { int data[N]; }; Arr<4> a;");
        let a = cx.root_member("a");
        let base = cx.typed_ty(a).def.unwrap();
        assert_eq!(cx.defs.name_str(base, &cx.syms), "Arr<4>");
    }

    #[test]
    fn equal_argument_spellings_share_a_key() {
        // Independently parsed argument lists with the same meaning must
        // produce equal keys: one cached instance, not two.
        let cx = parse_clean(
            "template<typename T> struct V { T x; };\n\
             V<unsigned long> a;\n\
             V<unsigned long> b;\n\
             V<char> c;",
        );
        let v = cx.root_member("V");
        match &cx.defs.def(v).kind {
            DefKind::Template(t) => assert_eq!(t.instances.len(), 2),
            _ => panic!("V should be a template"),
        }
        assert_eq!(
            cx.typed_ty(cx.root_member("a")).def,
            cx.typed_ty(cx.root_member("b")).def
        );
        assert_ne!(
            cx.typed_ty(cx.root_member("a")).def,
            cx.typed_ty(cx.root_member("c")).def
        );
    }

    // ==================== ERRORS & RECOVERY ====================

    #[test]
    fn recovery_after_bad_declaration() {
        let cx = parse("int 5; int ok;");
        assert!(cx.herr.has_errors());
        cx.root_member("ok");
    }

    #[test]
    fn redeclaration_as_different_kind() {
        let cx = parse("namespace n { } int n;");
        assert!(cx.herr.has_errors());
    }

    #[test]
    fn literal_without_initializer_marker() {
        let cx = parse("int x 5; int y;");
        assert!(cx.herr.has_errors());
        cx.root_member("y");
    }

    #[test]
    fn unexpected_operator_in_tail() {
        let cx = parse("int x + 2;");
        assert!(cx.herr.has_errors());
    }

    #[test]
    fn status_reflects_diagnostics() {
        assert_eq!(parse("int x;").status(), 0);
        assert_ne!(parse("int 5;").status(), 0);
    }

    #[test]
    fn preprocessor_reaches_parser() {
        let cx = parse_clean("#define WIDTH 3\n#if 1\nint a[WIDTH];\n#else\nint b;\n#endif\n");
        assert_eq!(
            cx.typed_ty(cx.root_member("a")).refs.top(),
            Some(&RefNode::Array { bound: Some(3) })
        );
        assert!(cx.find(DefTable::ROOT_ID, "b").is_none());
    }

    // ==================== ROUND TRIP ====================

    #[test]
    fn rendered_type_reparses_equivalently() {
        let sources = [
            "const unsigned int *p;",
            "int (*f)(int, char);",
            "int *a[3];",
            "static long n;",
        ];
        for src in sources {
            let first = parse_clean(src);
            let names: Vec<Symbol> = first
                .defs
                .scope_data(DefTable::ROOT_ID)
                .unwrap()
                .members
                .keys()
                .copied()
                .collect();
            let declared = *names.last().unwrap();
            let declared_name = first.syms.resolve(declared).to_string();
            let id = first.root_member(&declared_name);
            let rendered = {
                let ty = first.typed_ty(id);
                format!("{};", ty.render(&first.defs, &first.syms))
            };

            let second = parse_clean(&rendered);
            let re_id = second.root_member(&declared_name);

            // Equivalent modulo definition identity: compare base name,
            // flags, and the referencer stack with names stripped.
            let (a_base, a_flags, mut a_refs) = {
                let t = first.typed_ty(id).clone();
                let base = t.def.map(|d| first.defs.name_str(d, &first.syms).to_string());
                (base, t.flags, t.refs)
            };
            let (b_base, b_flags, mut b_refs) = {
                let t = second.typed_ty(re_id).clone();
                let base = t
                    .def
                    .map(|d| second.defs.name_str(d, &second.syms).to_string());
                (base, t.flags, t.refs)
            };
            a_refs.strip_names();
            b_refs.strip_names();
            assert_eq!(a_base, b_base, "base mismatch for {src}");
            assert_eq!(a_flags, b_flags, "flag mismatch for {src}");
            assert_eq!(a_refs, b_refs, "referencer mismatch for {src}");
        }
    }
}
