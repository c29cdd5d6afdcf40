use proptest::prelude::*;
use string_interner::DefaultStringInterner;

use frontend::lexer::Lexer;
use frontend::parser::Parser;
use frontend::token::Kind;

fn parse_count_errors(input: &str) -> usize {
    let mut interner = DefaultStringInterner::new();
    let mut parser = Parser::new(input, &mut interner);
    let _ = parser.parse_program();
    parser.errors.len()
}

fn valid_identifier() -> impl Strategy<Value = String> {
    "[a-z_][a-zA-Z0-9_]{0,5}".prop_filter("not a reserved word", |s| Kind::keyword(s).is_none())
}

proptest! {
    #![proptest_config(proptest::test_runner::Config {
        cases: 32,
        .. proptest::test_runner::Config::default()
    })]

    #[test]
    fn prop_valid_identifiers_parse(name in valid_identifier()) {
        let input = format!("i32 main() {{ i32 {} = 1; return {}; }}", name, name);
        prop_assert_eq!(parse_count_errors(&input), 0);
    }

    #[test]
    fn prop_binary_operations_parse(
        left in -1000i64..1000,
        right in -1000i64..1000,
        op in prop::sample::select(vec!["+", "-", "*", "/", "%", "<", ">", "==", "!=", "&", "|", "^"])
    ) {
        let input = format!("i32 main() {{ return {} {} {}; }}", left, op, right);
        prop_assert_eq!(parse_count_errors(&input), 0);
    }

    #[test]
    fn prop_nested_parens_parse(depth in 1usize..24) {
        let mut expr = String::from("1");
        for _ in 0..depth {
            expr = format!("({} + 1)", expr);
        }
        let input = format!("i32 main() {{ return {}; }}", expr);
        prop_assert_eq!(parse_count_errors(&input), 0);
    }

    /// Every token's lexeme is exactly the source slice it covers, so the
    /// token stream plus interstitial text reproduces the input.
    #[test]
    fn prop_lexemes_are_source_slices(words in prop::collection::vec(valid_identifier(), 1..8)) {
        let source = words.join(" + ");
        let mut lexer = Lexer::new(&source);
        let mut reconstructed = String::new();
        let mut last_end = 0usize;
        loop {
            let token = lexer.next_token();
            if token.kind == Kind::EOF {
                break;
            }
            reconstructed.push_str(&source[last_end..token.position.start]);
            reconstructed.push_str(token.lexeme(&source));
            last_end = token.position.end;
        }
        reconstructed.push_str(&source[last_end..]);
        prop_assert_eq!(reconstructed, source);
    }

    #[test]
    fn prop_eof_is_idempotent(input in "[a-z0-9 +*/()-]{0,24}") {
        let mut lexer = Lexer::new(&input);
        for _ in 0..64 {
            if lexer.next_token().kind == Kind::EOF {
                break;
            }
        }
        prop_assert_eq!(lexer.next_token().kind, Kind::EOF);
        prop_assert_eq!(lexer.next_token().kind, Kind::EOF);
    }

    /// Garbage never panics or hangs the parser; it only produces errors.
    #[test]
    fn prop_parser_terminates_on_noise(input in "[a-z0-9{}();=+*@#]{0,48}") {
        let _ = parse_count_errors(&input);
    }
}
