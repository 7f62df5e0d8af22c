// tests/parser_tests.rs

use std::collections::BTreeSet;

use loglang::parser::parse_program;
use loglang::{BinOp, Expr, LexError, Lexer, ParseError, Parser, Value};
use pretty_assertions::assert_eq;

fn tree(source: &str) -> String {
    parse_program(source).unwrap().describe()
}

fn deps(source: &str) -> BTreeSet<String> {
    parse_program(source).unwrap().dependencies()
}

fn set(names: &[&str]) -> BTreeSet<String> {
    names.iter().map(|s| s.to_string()).collect()
}

// ============================================================================
// Precedence and associativity
// ============================================================================

#[test]
fn test_multiplication_binds_tighter() {
    assert_eq!(tree("1 + 2 * 3"), "(1 + (2 * 3))");
}

#[test]
fn test_parentheses() {
    let expr = parse_program("(1 + 2) * 3").unwrap();

    // Should be: Multiply(Add(1, 2), 3)
    match expr {
        Expr::BinaryOp {
            op: BinOp::Multiply,
            left,
            right,
        } => {
            assert!(matches!(*left, Expr::BinaryOp { op: BinOp::Add, .. }));
            assert_eq!(*right, Expr::Const(Value::Int(3)));
        }
        _ => panic!("Expected multiplication"),
    }
}

#[test]
fn test_left_associative_chains() {
    assert_eq!(tree("10 - 4 - 3"), "((10 - 4) - 3)");
    assert_eq!(tree("8 / 4 / 2"), "((8 / 4) / 2)");
}

#[test]
fn test_logic_below_comparison() {
    assert_eq!(
        tree("a > 1 and b < 2 or c"),
        "(((a > 1) and (b < 2)) or c)"
    );
}

#[test]
fn test_assignment_is_right_associative() {
    assert_eq!(tree("x = y = 3"), "(x = (y = 3))");
    assert_eq!(tree("total = a + b"), "(total = (a + b))");
}

#[test]
fn test_negation() {
    assert_eq!(tree("-x"), "(-x)");
    assert_eq!(tree("a - -1"), "(a - (-1))");
}

// ============================================================================
// Literals and references
// ============================================================================

#[test]
fn test_numeric_literals() {
    assert_eq!(parse_program("3").unwrap(), Expr::Const(Value::Int(3)));
    assert_eq!(parse_program("2.5").unwrap(), Expr::Const(Value::Double(2.5)));
}

#[test]
fn test_invalid_number() {
    assert!(matches!(
        parse_program("1.2.3"),
        Err(ParseError::InvalidNumber { lexeme, .. }) if lexeme == "1.2.3"
    ));
}

#[test]
fn test_string_literal() {
    assert_eq!(tree(r#"host = "db-1""#), r#"(host = "db-1")"#);
}

#[test]
fn test_glob_references() {
    assert_eq!(parse_program("cpu.*").unwrap(), Expr::Glob("cpu.*".to_string()));
    assert_eq!(parse_program("*").unwrap(), Expr::Glob("*".to_string()));
    assert_eq!(parse_program("cpu.0").unwrap(), Expr::Var("cpu.0".to_string()));
}

// ============================================================================
// Statements
// ============================================================================

#[test]
fn test_sequence() {
    assert_eq!(tree("a = 1; b = 2"), "((a = 1); (b = 2))");
    assert_eq!(tree("a = 1;"), "(a = 1)");
}

#[test]
fn test_blocks() {
    assert_eq!(parse_program("{}").unwrap(), Expr::Block(vec![]));
    assert_eq!(tree("{a = 1; b}"), "{(a = 1); b}");
    assert_eq!(tree("{a = 1;}"), "{(a = 1)}");
}

#[test]
fn test_edge_if() {
    assert_eq!(
        tree("edge_if a > 10 then x = 1 else x = 0"),
        "(edge_if (a > 10) then (x = 1) else (x = 0))"
    );
}

#[test]
fn test_edge_if_requires_else() {
    assert!(matches!(
        parse_program("edge_if a then b"),
        Err(ParseError::UnexpectedToken { .. })
    ));
}

#[test]
fn test_at() {
    assert_eq!(tree("at hour do count = 0"), "(at hour do (count = 0))");
    assert_eq!(
        tree("at day do { a = 0; b = 0 }"),
        "(at day do {(a = 0); (b = 0)})"
    );
}

#[test]
fn test_plain_if() {
    assert_eq!(tree("if a then b else c"), "(if a then b else c)");
    assert_eq!(tree("if a then b"), "(if a then b)");
}

#[test]
fn test_calls() {
    assert_eq!(tree("round(sum(cpu.*), 2)"), "round(sum(cpu.*), 2)");
    assert_eq!(tree("now()"), "now()");
}

// ============================================================================
// Errors
// ============================================================================

#[test]
fn test_assign_to_glob_rejected() {
    assert!(matches!(
        parse_program("cpu.* = 1"),
        Err(ParseError::Semantic { .. })
    ));
}

#[test]
fn test_assign_to_constant_rejected() {
    assert!(matches!(
        parse_program("1 = 2"),
        Err(ParseError::Semantic { .. })
    ));
}

#[test]
fn test_calling_glob_rejected() {
    assert!(matches!(
        parse_program("cpu.*(1)"),
        Err(ParseError::Semantic { .. })
    ));
}

#[test]
fn test_malformed_call() {
    assert!(matches!(
        parse_program("f(1 2)"),
        Err(ParseError::MalformedCall { name, .. }) if name == "f"
    ));
}

#[test]
fn test_missing_operand() {
    assert!(matches!(
        parse_program("a +"),
        Err(ParseError::UnexpectedToken { .. })
    ));
    assert!(matches!(
        parse_program("(a"),
        Err(ParseError::UnexpectedToken { .. })
    ));
}

#[test]
fn test_lex_error_propagates() {
    assert_eq!(
        parse_program("a @"),
        Err(ParseError::Lex(LexError::UnexpectedChar {
            ch: '@',
            position: 2
        }))
    );
}

#[test]
fn test_error_context_points_at_token() {
    let err = Parser::new(Lexer::new("a + )")).parse().unwrap_err();
    match err {
        ParseError::UnexpectedToken { context, .. } => {
            assert_eq!(context, "a + )\n    ^");
        }
        other => panic!("Expected unexpected token, got {:?}", other),
    }
}

// ============================================================================
// Dependencies
// ============================================================================

#[test]
fn test_dependencies_exclude_assignment_target() {
    assert_eq!(deps("x = a + b"), set(&["a", "b"]));
}

#[test]
fn test_dependencies_of_stateful_forms() {
    assert_eq!(deps("edge_if a > 1 then x = b else y = c"), set(&["a"]));
    assert_eq!(deps("at w do x = v"), set(&["w"]));
}

#[test]
fn test_dependencies_of_plain_if() {
    assert_eq!(deps("if a then b else c"), set(&["a", "b", "c"]));
}

#[test]
fn test_dependencies_keep_globs() {
    assert_eq!(deps("total = sum(cpu.*) + base"), set(&["base", "cpu.*"]));
}
