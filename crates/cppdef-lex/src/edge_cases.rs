//! Edge case tests for cppdef-lex

#[cfg(test)]
mod tests {
    use crate::{LexCtx, Lexer, Token, TokenKind};
    use cppdef_sem::{Builtins, DefTable};
    use cppdef_util::{Handler, Interner, SourceMap};

    struct Fixture {
        syms: Interner,
        map: SourceMap,
        herr: Handler,
        builtins: Builtins,
        lexer: Lexer,
    }

    fn fixture(source: &str) -> Fixture {
        let mut syms = Interner::new();
        let mut defs = DefTable::new();
        let builtins = Builtins::install(&mut defs, &mut syms);
        let mut map = SourceMap::new();
        let file = map.add("test.cpp");
        let lexer = Lexer::new(file, source, &mut syms);
        Fixture {
            syms,
            map,
            herr: Handler::new(),
            builtins,
            lexer,
        }
    }

    impl Fixture {
        fn next(&mut self) -> Token {
            let mut ctx = LexCtx {
                syms: &mut self.syms,
                builtins: &self.builtins,
                herr: &self.herr,
                map: &mut self.map,
            };
            self.lexer.get_token(&mut ctx)
        }

        fn all(&mut self) -> Vec<Token> {
            let mut tokens = Vec::new();
            for _ in 0..10_000 {
                let t = self.next();
                if t.is(TokenKind::EndOfCode) {
                    return tokens;
                }
                tokens.push(t);
            }
            panic!("lexer failed to reach EndOfCode");
        }

        fn text(&self, t: &Token) -> &str {
            self.syms.resolve(t.text)
        }
    }

    fn kinds(source: &str) -> Vec<TokenKind> {
        let mut f = fixture(source);
        f.all().iter().map(|t| t.kind).collect()
    }

    fn texts(source: &str) -> Vec<String> {
        let mut f = fixture(source);
        let tokens = f.all();
        tokens.iter().map(|t| f.text(t).to_string()).collect()
    }

    // ==================== BASIC CLASSIFICATION ====================

    #[test]
    fn empty_source() {
        let mut f = fixture("");
        assert!(f.next().is(TokenKind::EndOfCode));
        // Idempotent at the end.
        assert!(f.next().is(TokenKind::EndOfCode));
    }

    #[test]
    fn simple_declaration() {
        use TokenKind::*;
        assert_eq!(
            kinds("int x;"),
            vec![Declarator, Identifier, Semicolon]
        );
    }

    #[test]
    fn keywords_classify() {
        use TokenKind::*;
        assert_eq!(
            kinds("class struct enum union namespace template typedef typename using"),
            vec![Class, Struct, Enum, Union, Namespace, Template, Typedef, Typename, Using]
        );
        assert_eq!(
            kinds("public private protected operator sizeof decltype"),
            vec![Public, Private, Protected, OperatorKw, Sizeof, Decltype]
        );
    }

    #[test]
    fn builtin_flags_are_decflags() {
        use TokenKind::*;
        assert_eq!(
            kinds("const unsigned static long"),
            vec![Decflag, Decflag, Decflag, Decflag]
        );
        let mut f = fixture("unsigned");
        let t = f.next();
        assert!(t.flag.is_some());
        assert!(t.def.is_none());
    }

    #[test]
    fn builtin_primitives_carry_defs() {
        let mut f = fixture("double");
        let t = f.next();
        assert_eq!(t.kind, TokenKind::Declarator);
        assert_eq!(t.def, Some(f.builtins.type_double));
    }

    #[test]
    fn case_sensitive_keywords() {
        use TokenKind::*;
        assert_eq!(kinds("Class class"), vec![Identifier, Class]);
    }

    // ==================== OPERATORS & PUNCTUATION ====================

    #[test]
    fn punctuation_kinds() {
        use TokenKind::*;
        assert_eq!(
            kinds("; , ( ) [ ] { } ~ : :: ..."),
            vec![
                Semicolon,
                Comma,
                LeftParenth,
                RightParenth,
                LeftBracket,
                RightBracket,
                LeftBrace,
                RightBrace,
                Tilde,
                Colon,
                Scope,
                Ellipsis
            ]
        );
    }

    #[test]
    fn angle_brackets_are_their_own_kinds() {
        use TokenKind::*;
        assert_eq!(kinds("< > << >> <= >= <<= >>="), vec![
            LessThan, GreaterThan, Operator, Operator, Operator, Operator, Operator, Operator
        ]);
    }

    #[test]
    fn compound_operators_absorb() {
        assert_eq!(
            texts("++ -- += -= == = && || |= != /="),
            vec!["++", "--", "+=", "-=", "==", "=", "&&", "||", "|=", "!=", "/="]
        );
    }

    #[test]
    fn slash_is_division_not_comment() {
        let mut f = fixture("a / b");
        let tokens = f.all();
        assert_eq!(tokens[1].kind, TokenKind::Operator);
        assert_eq!(f.text(&tokens[1]), "/");
    }

    // ==================== COMMENTS & WHITESPACE ====================

    #[test]
    fn comments_are_skipped() {
        use TokenKind::*;
        assert_eq!(
            kinds("int // trailing\nx /* inline */ ;"),
            vec![Declarator, Identifier, Semicolon]
        );
    }

    #[test]
    fn block_comment_counts_lines() {
        let mut f = fixture("/* a\nb\nc */ x");
        let t = f.next();
        assert_eq!(t.loc.line, 3);
    }

    #[test]
    fn line_and_column_tracking() {
        let mut f = fixture("int\n  x;");
        let int_tok = f.next();
        assert_eq!((int_tok.loc.line, int_tok.loc.col), (1, 0));
        let x_tok = f.next();
        assert_eq!((x_tok.loc.line, x_tok.loc.col), (2, 3));
    }

    #[test]
    fn crlf_counts_one_line() {
        let mut f = fixture("int\r\nx\rint");
        f.next();
        let x = f.next();
        assert_eq!(x.loc.line, 2);
        let last = f.next();
        assert_eq!(last.loc.line, 3);
    }

    // ==================== LITERALS ====================

    #[test]
    fn numeric_literals() {
        use TokenKind::*;
        assert_eq!(kinds("42 0x1F 0755 0"), vec![
            DecLiteral, HexLiteral, OctLiteral, DecLiteral
        ]);
        assert_eq!(texts("42ull 0x1Fu"), vec!["42ull", "0x1Fu"]);
    }

    #[test]
    fn quoted_literals() {
        use TokenKind::*;
        assert_eq!(kinds("\"hi\" 'a'"), vec![StringLiteral, CharLiteral]);
        assert_eq!(texts("\"a\\\"b\""), vec!["\"a\\\"b\""]);
    }

    #[test]
    fn unterminated_string_is_diagnosed() {
        let mut f = fixture("\"abc\nint x;");
        let t = f.next();
        assert_eq!(t.kind, TokenKind::StringLiteral);
        assert!(f.herr.has_errors());
        // Recovery: lexing continues on the next line.
        assert_eq!(f.next().kind, TokenKind::Declarator);
    }

    #[test]
    fn invalid_byte_advances_one() {
        use TokenKind::*;
        assert_eq!(kinds("@int"), vec![Invalid, Declarator]);
    }

    // ==================== MACROS ====================

    #[test]
    fn object_macro_expands() {
        use TokenKind::*;
        let mut f = fixture("#define N 3\nint x = N;");
        let tokens = f.all();
        let kinds: Vec<TokenKind> = tokens.iter().map(|t| t.kind).collect();
        assert_eq!(
            kinds,
            vec![Declarator, Identifier, Operator, DecLiteral, Semicolon]
        );
        assert_eq!(f.text(&tokens[3]), "3");
        assert!(!f.herr.has_errors());
    }

    #[test]
    fn macro_body_can_hold_many_tokens() {
        use TokenKind::*;
        let mut f = fixture("#define DECL int y ;\nDECL");
        assert_eq!(
            f.all().iter().map(|t| t.kind).collect::<Vec<_>>(),
            vec![Declarator, Identifier, Semicolon]
        );
    }

    #[test]
    fn undef_removes_macro() {
        use TokenKind::*;
        let mut f = fixture("#define A 1\n#undef A\nA;");
        let tokens = f.all();
        assert_eq!(tokens[0].kind, Identifier);
        assert_eq!(f.text(&tokens[0]), "A");
    }

    #[test]
    fn define_with_continuation() {
        let mut f = fixture("#define WIDE 1 + \\\n 2\nWIDE;");
        let tokens = f.all();
        let texts: Vec<&str> = tokens.iter().map(|t| f.text(t)).collect();
        assert_eq!(texts, vec!["1", "+", "2", ""]);
    }

    #[test]
    fn function_like_macro_is_diagnosed() {
        let mut f = fixture("#define F(x) x\nint y;");
        let tokens = f.all();
        assert!(f.herr.has_errors());
        assert_eq!(tokens[0].kind, TokenKind::Declarator);
    }

    #[test]
    fn recursive_macro_hits_depth_limit() {
        let mut f = fixture("#define A A\nA;");
        let tokens = f.all();
        assert!(f.herr.has_errors());
        // Degrades to a plain identifier once the limit trips.
        assert_eq!(tokens[0].kind, TokenKind::Identifier);
    }

    // ==================== CONDITIONALS ====================

    #[test]
    fn if_true_keeps_then_branch() {
        let texts = texts("#if 1\nint a;\n#else\nint b;\n#endif\n");
        assert!(texts.contains(&"a".to_string()));
        assert!(!texts.contains(&"b".to_string()));
    }

    #[test]
    fn if_false_takes_else_branch() {
        let texts = texts("#if 0\nint a;\n#else\nint b;\n#endif\n");
        assert!(!texts.contains(&"a".to_string()));
        assert!(texts.contains(&"b".to_string()));
    }

    #[test]
    fn stray_else_is_diagnosed() {
        let mut f = fixture("#else\nint x;");
        f.all();
        assert!(f.herr.has_errors());
    }

    #[test]
    fn stray_endif_is_diagnosed() {
        let mut f = fixture("#endif\n");
        f.all();
        assert!(f.herr.has_errors());
    }

    #[test]
    fn nested_conditionals_in_dead_region() {
        let texts = texts("#if 0\n#if 1\nint a;\n#endif\n#else\nint b;\n#endif\n");
        assert!(!texts.contains(&"a".to_string()));
        assert!(texts.contains(&"b".to_string()));
    }

    #[test]
    fn elif_chain_takes_first_true() {
        let texts = texts("#if 0\nint a;\n#elif 1\nint b;\n#elif 1\nint c;\n#else\nint d;\n#endif\n");
        assert_eq!(
            texts.iter().filter(|t| ["a", "b", "c", "d"].contains(&t.as_str())).count(),
            1
        );
        assert!(texts.contains(&"b".to_string()));
    }

    #[test]
    fn ifdef_and_ifndef() {
        let texts1 = texts("#define X 1\n#ifdef X\nint a;\n#endif\n");
        assert!(texts1.contains(&"a".to_string()));
        let texts2 = texts("#ifndef X\nint a;\n#endif\n");
        assert!(texts2.contains(&"a".to_string()));
    }

    #[test]
    fn conditional_expressions_fold() {
        let texts1 = texts("#if 2 + 2 == 4 && !(1 > 2)\nint yes;\n#endif\n");
        assert!(texts1.contains(&"yes".to_string()));
        let texts2 = texts("#if 1 ? 0 : 1\nint no;\n#endif\n");
        assert!(!texts2.contains(&"no".to_string()));
    }

    #[test]
    fn defined_operator() {
        let texts1 = texts("#define X 0\n#if defined(X) && defined X\nint a;\n#endif\n");
        assert!(texts1.contains(&"a".to_string()));
        let texts2 = texts("#if defined(Y)\nint a;\n#endif\n");
        assert!(!texts2.contains(&"a".to_string()));
    }

    #[test]
    fn macros_expand_in_conditionals() {
        let texts = texts("#define FOUR 4\n#if FOUR == 4\nint a;\n#endif\n");
        assert!(texts.contains(&"a".to_string()));
    }

    #[test]
    fn undefined_identifier_reads_as_zero() {
        let texts = texts("#if MYSTERY\nint a;\n#else\nint b;\n#endif\n");
        assert!(texts.contains(&"b".to_string()));
    }

    #[test]
    fn conditional_depth_tracks_stack() {
        let mut f = fixture("#if 1\nint a;\n");
        f.all();
        assert_eq!(f.lexer.conditional_depth(), 1);
        let mut f = fixture("#if 1\n#endif\nint a;\n");
        f.all();
        assert_eq!(f.lexer.conditional_depth(), 0);
    }

    #[test]
    fn unclosed_conditional_in_dead_region_is_diagnosed() {
        let mut f = fixture("#if 0\nint a;\n");
        f.all();
        assert!(f.herr.has_errors());
    }

    // ==================== MESSAGES & MISC DIRECTIVES ====================

    #[test]
    fn error_directive_reports() {
        let mut f = fixture("#error something broke\n");
        f.all();
        assert_eq!(f.herr.error_count(), 1);
        let rendered = f.herr.render(&f.map);
        assert!(rendered.contains("#error something broke"));
    }

    #[test]
    fn warning_directive_reports() {
        let mut f = fixture("#warning heads up\n");
        f.all();
        assert_eq!(f.herr.warning_count(), 1);
        assert_eq!(f.herr.error_count(), 0);
    }

    #[test]
    fn messages_suppressed_in_dead_branch() {
        let mut f = fixture("#if 0\n#error unseen\n#warning unseen\n#endif\n");
        f.all();
        assert_eq!(f.herr.error_count(), 0);
        assert_eq!(f.herr.warning_count(), 0);
    }

    #[test]
    fn unknown_directive_is_diagnosed() {
        let mut f = fixture("#frobnicate\nint x;");
        let tokens = f.all();
        assert!(f.herr.has_errors());
        assert_eq!(tokens[0].kind, TokenKind::Declarator);
    }

    #[test]
    fn include_is_consumed_quietly() {
        use TokenKind::*;
        let mut f = fixture("#include <vector>\nint x;");
        assert_eq!(
            f.all().iter().map(|t| t.kind).collect::<Vec<_>>(),
            vec![Declarator, Identifier, Semicolon]
        );
        assert!(!f.herr.has_errors());
    }

    #[test]
    fn line_directive_renumbers() {
        let mut f = fixture("#line 100\nint x;");
        let t = f.next();
        assert_eq!(t.loc.line, 100);
    }

    #[test]
    fn define_inert_in_dead_branch() {
        let texts = texts("#if 0\n#define D 1\n#endif\n#ifdef D\nint a;\n#endif\n");
        assert!(!texts.contains(&"a".to_string()));
    }

    // ==================== NESTED INPUT ====================

    #[test]
    fn push_source_interleaves_buffers() {
        let mut f = fixture("int tail;");
        f.lexer.push_source("inner.h", "char head;", &mut f.map);
        let names: Vec<String> = {
            let tokens = f.all();
            tokens.iter().map(|t| f.text(t).to_string()).collect()
        };
        assert_eq!(names, vec!["char", "head", "", "int", "tail", ""]);
    }

    // ==================== PROPERTY: POSITION BOUNDS ====================

    mod properties {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            // The lexer never advances past the buffer end without
            // producing EndOfCode, on arbitrary byte soup.
            #[test]
            fn never_walks_past_end(source in "[ -~\n\r\t]{0,200}") {
                let mut f = fixture(&source);
                let mut steps = 0usize;
                loop {
                    let t = f.next();
                    prop_assert!(f.lexer.buffer_pos() <= f.lexer.buffer_len());
                    if t.is(TokenKind::EndOfCode) {
                        break;
                    }
                    steps += 1;
                    prop_assert!(steps <= source.len() * 4 + 64, "lexer failed to terminate");
                }
            }

            #[test]
            fn conditional_depth_matches_balance(n in 0usize..5) {
                let mut src = String::new();
                for _ in 0..n {
                    src.push_str("#if 1\n");
                }
                src.push_str("int x;\n");
                let mut f = fixture(&src);
                f.all();
                prop_assert_eq!(f.lexer.conditional_depth(), n);
            }
        }
    }
}
