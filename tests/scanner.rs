use rlox::scanner::Scanner;
use rlox::token::TokenType;

fn assert_token_sequence(source: &str, expected: &[(TokenType, &str)]) {
    let scanner = Scanner::new(source.as_bytes());
    let tokens: Vec<_> = scanner.filter_map(Result::ok).collect();

    assert_eq!(tokens.len(), expected.len());

    for (actual, (expected_type, expected_lexeme)) in tokens.iter().zip(expected.iter()) {
        assert_eq!(actual.token_type, *expected_type);
        assert_eq!(actual.lexeme, *expected_lexeme);
    }
}

#[test]
fn scans_symbols() {
    assert_token_sequence(
        "({*.,+*})",
        &[
            (TokenType::LEFT_PAREN, "("),
            (TokenType::LEFT_BRACE, "{"),
            (TokenType::STAR, "*"),
            (TokenType::DOT, "."),
            (TokenType::COMMA, ","),
            (TokenType::PLUS, "+"),
            (TokenType::STAR, "*"),
            (TokenType::RIGHT_BRACE, "}"),
            (TokenType::RIGHT_PAREN, ")"),
            (TokenType::EOF, ""),
        ],
    );
}

#[test]
fn scans_two_character_operators() {
    assert_token_sequence(
        "! != = == < <= > >=",
        &[
            (TokenType::BANG, "!"),
            (TokenType::BANG_EQUAL, "!="),
            (TokenType::EQUAL, "="),
            (TokenType::EQUAL_EQUAL, "=="),
            (TokenType::LESS, "<"),
            (TokenType::LESS_EQUAL, "<="),
            (TokenType::GREATER, ">"),
            (TokenType::GREATER_EQUAL, ">="),
            (TokenType::EOF, ""),
        ],
    );
}

#[test]
fn scans_keywords_including_break() {
    assert_token_sequence(
        "var while break fun return and or",
        &[
            (TokenType::VAR, "var"),
            (TokenType::WHILE, "while"),
            (TokenType::BREAK, "break"),
            (TokenType::FUN, "fun"),
            (TokenType::RETURN, "return"),
            (TokenType::AND, "and"),
            (TokenType::OR, "or"),
            (TokenType::EOF, ""),
        ],
    );
}

#[test]
fn keyword_prefixes_are_identifiers() {
    assert_token_sequence(
        "breaker variable orchid",
        &[
            (TokenType::IDENTIFIER, "breaker"),
            (TokenType::IDENTIFIER, "variable"),
            (TokenType::IDENTIFIER, "orchid"),
            (TokenType::EOF, ""),
        ],
    );
}

#[test]
fn scans_string_and_number_literals() {
    let source = "\"hello\" 123 3.14";
    let tokens: Vec<_> = Scanner::new(source.as_bytes())
        .filter_map(Result::ok)
        .collect();

    assert_eq!(tokens.len(), 4);

    match &tokens[0].token_type {
        TokenType::STRING(s) => assert_eq!(s, "hello"),
        other => panic!("expected string token, got {:?}", other),
    }
    match tokens[1].token_type {
        TokenType::NUMBER(n) => assert_eq!(n, 123.0),
        ref other => panic!("expected number token, got {:?}", other),
    }
    match tokens[2].token_type {
        TokenType::NUMBER(n) => assert_eq!(n, 3.14),
        ref other => panic!("expected number token, got {:?}", other),
    }
    assert_eq!(tokens[3].token_type, TokenType::EOF);
}

#[test]
fn skips_comments_and_tracks_lines() {
    let source = "var a = 1; // trailing comment\nprint a;";
    let tokens: Vec<_> = Scanner::new(source.as_bytes())
        .filter_map(Result::ok)
        .collect();

    let print_token = tokens
        .iter()
        .find(|t| t.token_type == TokenType::PRINT)
        .expect("print token missing");

    assert_eq!(print_token.line, 2);
}

#[test]
fn reports_unexpected_characters_and_continues() {
    let source = ",.$(#";
    let results: Vec<_> = Scanner::new(source.as_bytes()).collect();

    // COMMA, DOT, error($), LEFT_PAREN, error(#), EOF
    assert_eq!(results.len(), 6);

    let error_count = results.iter().filter(|r| r.is_err()).count();
    assert_eq!(error_count, 2, "expected 2 lex errors");

    for err in results.iter().filter_map(|r| r.as_ref().err()) {
        assert!(
            err.to_string().contains("Unexpected character"),
            "error message should contain 'Unexpected character', got: {}",
            err
        );
    }
}

#[test]
fn reports_unterminated_string() {
    let source = "\"never closed";
    let results: Vec<_> = Scanner::new(source.as_bytes()).collect();

    let err = results
        .iter()
        .filter_map(|r| r.as_ref().err())
        .next()
        .expect("expected a lex error");

    assert!(err.to_string().contains("Unterminated string"));
}

#[test]
fn multiline_strings_advance_line_counter() {
    let source = "\"one\ntwo\" ident";
    let tokens: Vec<_> = Scanner::new(source.as_bytes())
        .filter_map(Result::ok)
        .collect();

    let ident = tokens
        .iter()
        .find(|t| t.token_type == TokenType::IDENTIFIER)
        .expect("identifier missing");

    assert_eq!(ident.line, 2);
}
