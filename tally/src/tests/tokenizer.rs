use crate::formula::tokenizer::{rewrite_unary, tokenize, Operator, TokenKind};
use crate::Span;

fn kinds(formula: &str) -> Vec<TokenKind> {
    tokenize(formula)
        .unwrap()
        .into_iter()
        .map(|t| t.kind)
        .collect()
}

fn rewritten(formula: &str) -> Vec<TokenKind> {
    rewrite_unary(&tokenize(formula).unwrap())
        .into_iter()
        .map(|t| t.kind)
        .collect()
}

#[test]
fn test_tokenize_arithmetic() {
    assert_eq!(
        kinds("2 + 3.5*x(1)"),
        vec![
            TokenKind::Number(2.0),
            TokenKind::Operator(Operator::Add),
            TokenKind::Number(3.5),
            TokenKind::Operator(Operator::Multiply),
            TokenKind::Identifier("x".to_string()),
            TokenKind::LeftParen,
            TokenKind::Number(1.0),
            TokenKind::RightParen,
        ]
    );
}

#[test]
fn test_reference_names_are_trimmed_and_keep_spaces() {
    assert_eq!(
        kinds("{ longest road }"),
        vec![TokenKind::Reference("longest road".to_string())]
    );
}

#[test]
fn test_token_spans_are_byte_ranges() {
    let tokens = tokenize("{a} ^ 10").unwrap();
    assert_eq!(tokens[0].span, Span::new(0, 3));
    assert_eq!(tokens[1].span, Span::new(4, 5));
    assert_eq!(tokens[2].span, Span::new(6, 8));
}

#[test]
fn test_leading_dot_number() {
    assert_eq!(kinds(".5"), vec![TokenKind::Number(0.5)]);
}

#[test]
fn test_invalid_number() {
    let err = tokenize("1.2.3 + 4").unwrap_err();
    assert!(err.is_syntax());
    assert!(err.message().contains("Invalid number '1.2.3'"));
}

#[test]
fn test_unterminated_reference() {
    let err = tokenize("{score + 1").unwrap_err();
    assert!(err.message().contains("Unterminated reference"));
}

#[test]
fn test_empty_reference() {
    let err = tokenize("{  } + 1").unwrap_err();
    assert!(err.message().contains("Empty reference"));
}

#[test]
fn test_nested_brace_in_reference() {
    let err = tokenize("{a{b}}").unwrap_err();
    assert!(err.message().contains("Nested"));
}

#[test]
fn test_unexpected_character() {
    let err = tokenize("2 % 3").unwrap_err();
    assert!(err.message().contains("Unexpected character '%'"));
    match err {
        crate::TallyError::Syntax(details) => assert_eq!(details.span, Span::new(2, 3)),
        other => panic!("expected syntax error, got {:?}", other),
    }
}

#[test]
fn test_empty_formula_has_no_tokens() {
    assert!(tokenize("   ").unwrap().is_empty());
}

#[test]
fn test_unary_minus_wraps_operand() {
    assert_eq!(
        rewritten("-2"),
        vec![
            TokenKind::LeftParen,
            TokenKind::Number(0.0),
            TokenKind::Operator(Operator::Subtract),
            TokenKind::Number(2.0),
            TokenKind::RightParen,
        ]
    );
}

#[test]
fn test_unary_plus_is_dropped() {
    assert_eq!(
        rewritten("3 * +4"),
        vec![
            TokenKind::Number(3.0),
            TokenKind::Operator(Operator::Multiply),
            TokenKind::Number(4.0),
        ]
    );
}

#[test]
fn test_binary_minus_untouched() {
    assert_eq!(
        rewritten("5 - 2"),
        vec![
            TokenKind::Number(5.0),
            TokenKind::Operator(Operator::Subtract),
            TokenKind::Number(2.0),
        ]
    );
}

#[test]
fn test_unary_minus_over_parenthesised_group() {
    let kinds = rewritten("-(1 + 2)");
    assert_eq!(kinds.len(), 9);
    assert_eq!(kinds[0], TokenKind::LeftParen);
    assert_eq!(kinds[1], TokenKind::Number(0.0));
    assert_eq!(kinds[2], TokenKind::Operator(Operator::Subtract));
    assert_eq!(kinds[3], TokenKind::LeftParen);
    assert_eq!(kinds[8], TokenKind::RightParen);
}
