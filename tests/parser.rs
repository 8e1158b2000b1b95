use rlox::ast_printer::AstPrinter;
use rlox::diagnostics::Diagnostics;
use rlox::expr::Expr;
use rlox::parser::Parser;
use rlox::scanner::Scanner;
use rlox::stmt::Stmt;
use rlox::token::Token;

fn tokenize(source: &str) -> Vec<Token> {
    Scanner::new(source.as_bytes())
        .filter_map(Result::ok)
        .collect()
}

fn parse_program(source: &str) -> (Vec<Stmt>, Diagnostics) {
    let tokens = tokenize(source);
    let mut parser = Parser::new(&tokens);
    let mut diagnostics = Diagnostics::new();
    let statements = parser.parse(&mut diagnostics);
    (statements, diagnostics)
}

fn printed_expression(source: &str) -> String {
    let tokens = tokenize(source);
    let mut parser = Parser::new(&tokens);
    let expr = parser.parse_expression().expect("expression should parse");
    AstPrinter::print(&expr)
}

#[test]
fn prints_grouped_arithmetic_in_prefix_form() {
    assert_eq!(
        printed_expression("(1 + 2) * 3"),
        "(* (group (+ 1.0 2.0)) 3.0)"
    );
}

#[test]
fn prints_logical_and_comparison_operators() {
    assert_eq!(
        printed_expression("a < 3 and b >= 4"),
        "(and (< a 3.0) (>= b 4.0))"
    );
}

#[test]
fn assignment_nests_to_the_right() {
    assert_eq!(printed_expression("a = b = 1"), "(= a (= b 1.0))");
}

#[test]
fn parses_call_with_arguments() {
    assert_eq!(printed_expression("add(1, 2)"), "(call add 1.0 2.0)");
}

#[test]
fn parses_anonymous_function_expression() {
    assert_eq!(printed_expression("fun (a, b) { }"), "(fun (a b))");
}

#[test]
fn invalid_assignment_target_is_an_error() {
    let tokens = tokenize("1 = 2");
    let mut parser = Parser::new(&tokens);

    let err = parser.parse_expression().unwrap_err();
    assert!(err.to_string().contains("Invalid assignment target"));
}

#[test]
fn named_function_declaration_produces_function_statement() {
    let (statements, diagnostics) = parse_program("fun add(a, b) { return a + b; }");

    assert!(!diagnostics.had_error());
    assert_eq!(statements.len(), 1);

    match &statements[0] {
        Stmt::Function { name, function } => {
            assert_eq!(name.lexeme, "add");
            assert_eq!(function.params.len(), 2);
        }
        other => panic!("expected function statement, got {:?}", other),
    }
}

#[test]
fn anonymous_function_may_initialize_a_variable() {
    let (statements, diagnostics) = parse_program("var f = fun (a) { return a; };");

    assert!(!diagnostics.had_error());
    assert_eq!(statements.len(), 1);

    match &statements[0] {
        Stmt::Var {
            initializer: Some(Expr::Function(function)),
            ..
        } => {
            assert_eq!(function.params.len(), 1);
        }
        other => panic!("expected var with function initializer, got {:?}", other),
    }
}

#[test]
fn for_loop_desugars_into_block_and_while() {
    let (statements, diagnostics) = parse_program("for (var i = 0; i < 3; i = i + 1) print i;");

    assert!(!diagnostics.had_error());
    assert_eq!(statements.len(), 1);

    // Outer block: [initializer, while]
    let Stmt::Block(outer) = &statements[0] else {
        panic!("expected outer block, got {:?}", statements[0]);
    };
    assert_eq!(outer.len(), 2);
    assert!(matches!(outer[0], Stmt::Var { .. }));

    // While body: [print, increment]
    let Stmt::While { body, .. } = &outer[1] else {
        panic!("expected while, got {:?}", outer[1]);
    };
    let Stmt::Block(inner) = body.as_ref() else {
        panic!("expected desugared body block, got {:?}", body);
    };
    assert_eq!(inner.len(), 2);
    assert!(matches!(inner[0], Stmt::Print(_)));
    assert!(matches!(inner[1], Stmt::Expression(Expr::Assign { .. })));
}

#[test]
fn for_loop_without_condition_defaults_to_true() {
    let (statements, diagnostics) = parse_program("for (;;) break;");

    assert!(!diagnostics.had_error());

    let Stmt::While { condition, body } = &statements[0] else {
        panic!("expected while, got {:?}", statements[0]);
    };
    assert!(matches!(
        condition,
        Expr::Literal(rlox::expr::LiteralValue::True)
    ));
    assert!(matches!(body.as_ref(), Stmt::Break { .. }));
}

#[test]
fn break_inside_loop_parses() {
    let (statements, diagnostics) = parse_program("while (true) { break; }");

    assert!(!diagnostics.had_error());
    assert_eq!(statements.len(), 1);
}

#[test]
fn break_outside_loop_is_a_parse_error() {
    let (_, diagnostics) = parse_program("break;");

    assert!(diagnostics.had_error());
}

#[test]
fn break_inside_function_inside_loop_is_a_parse_error() {
    // A function body is a new break boundary even inside a loop.
    let (_, diagnostics) = parse_program("while (true) { fun f() { break; } }");

    assert!(diagnostics.had_error());
}

#[test]
fn parser_recovers_after_an_error() {
    // The first statement is malformed; the second should still parse.
    let (statements, diagnostics) = parse_program("var 1 = 2; print 3;");

    assert!(diagnostics.had_error());
    assert_eq!(statements.len(), 1);
    assert!(matches!(statements[0], Stmt::Print(_)));
}

#[test]
fn variable_and_assign_nodes_get_distinct_ids() {
    // Same identifier twice - identity must differ even when structure matches.
    let tokens = tokenize("a + a");
    let mut parser = Parser::new(&tokens);
    let expr = parser.parse_expression().expect("expression should parse");

    let Expr::Binary { left, right, .. } = expr else {
        panic!("expected binary expression");
    };
    let (Expr::Variable { id: left_id, .. }, Expr::Variable { id: right_id, .. }) =
        (left.as_ref(), right.as_ref())
    else {
        panic!("expected variable operands");
    };

    assert_ne!(left_id, right_id);
}

#[test]
fn id_base_threads_across_parsers() {
    let tokens_a = tokenize("a;");
    let mut parser_a = Parser::new(&tokens_a);
    let mut diagnostics = Diagnostics::new();
    parser_a.parse(&mut diagnostics);
    let watermark = parser_a.id_watermark();
    assert!(watermark > 0);

    let tokens_b = tokenize("b;");
    let mut parser_b = Parser::with_id_base(&tokens_b, watermark);
    let statements = parser_b.parse(&mut diagnostics);

    let Stmt::Expression(Expr::Variable { id, .. }) = &statements[0] else {
        panic!("expected variable expression");
    };
    assert!(id.0 >= watermark);
}
