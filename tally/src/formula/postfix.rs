//! Infix to postfix conversion (shunting-yard)

use super::functions::{self, Function};
use super::tokenizer::{Operator, Token, TokenKind};
use crate::span::Span;
use crate::{ResourceLimits, TallyError, TallyResult};

/// One instruction of a postfix program
#[derive(Debug, Clone, PartialEq)]
pub enum PostfixItem {
    Number(f64, Span),
    Reference(String, Span),
    Operator(Operator, Span),
    Function {
        function: Function,
        argc: usize,
        span: Span,
    },
}

enum Pending {
    Operator(Operator, Span),
    Function(Function, Span),
    LeftParen { span: Span, call: bool },
}

/// Convert tokens (after unary rewrite) to postfix order.
///
/// An incoming operator pops every stacked operator of greater or equal
/// precedence, which makes all operators left-associative, `^` included:
/// `2^3^2` is `(2^3)^2`.
pub fn to_postfix(
    tokens: &[Token],
    formula: &str,
    limits: &ResourceLimits,
) -> TallyResult<Vec<PostfixItem>> {
    let mut output = Vec::with_capacity(tokens.len());
    let mut pending: Vec<Pending> = Vec::new();
    // Comma count per open function call
    let mut commas: Vec<usize> = Vec::new();
    let mut depth = 0usize;

    for (index, token) in tokens.iter().enumerate() {
        let previous = index.checked_sub(1).map(|i| &tokens[i].kind);

        match &token.kind {
            TokenKind::Number(value) => output.push(PostfixItem::Number(*value, token.span)),
            TokenKind::Reference(name) => {
                output.push(PostfixItem::Reference(name.clone(), token.span))
            }
            TokenKind::Identifier(name) => {
                if !matches!(
                    tokens.get(index + 1).map(|t| &t.kind),
                    Some(TokenKind::LeftParen)
                ) {
                    return Err(TallyError::syntax_with_suggestion(
                        format!("Unknown identifier '{}'", name),
                        token.span,
                        formula,
                        format!("wrap references in braces, e.g. {{{}}}", name),
                    ));
                }
                let function = Function::from_name(name).ok_or_else(|| {
                    TallyError::syntax_with_suggestion(
                        format!("Unknown function '{}'", name),
                        token.span,
                        formula,
                        format!("known functions: {}", functions::known_names()),
                    )
                })?;
                pending.push(Pending::Function(function, token.span));
            }
            TokenKind::LeftParen => {
                let call = matches!(previous, Some(TokenKind::Identifier(_)));
                if call {
                    commas.push(0);
                }
                pending.push(Pending::LeftParen {
                    span: token.span,
                    call,
                });
                depth += 1;
                if depth > limits.max_expression_depth {
                    return Err(TallyError::ResourceLimitExceeded {
                        limit_name: "max_expression_depth".to_string(),
                        limit_value: limits.max_expression_depth.to_string(),
                        actual_value: depth.to_string(),
                        suggestion: "Flatten the formula by removing nested parentheses"
                            .to_string(),
                    });
                }
            }
            TokenKind::Comma => {
                let call = pop_until_paren(&mut pending, &mut output).ok_or_else(|| {
                    TallyError::syntax("Misplaced comma", token.span, formula)
                })?;
                if !call {
                    return Err(TallyError::syntax(
                        "Comma outside of a function call",
                        token.span,
                        formula,
                    ));
                }
                if let Some(count) = commas.last_mut() {
                    *count += 1;
                }
            }
            TokenKind::RightParen => {
                let call = pop_until_paren(&mut pending, &mut output).ok_or_else(|| {
                    TallyError::syntax_with_suggestion(
                        "Unmatched parenthesis",
                        token.span,
                        formula,
                        "remove this ')' or add a matching '('",
                    )
                })?;
                pending.pop();
                depth -= 1;

                if call {
                    let comma_count = commas.pop().unwrap_or(0);
                    let argc = if matches!(previous, Some(TokenKind::LeftParen)) {
                        0
                    } else {
                        comma_count + 1
                    };
                    if let Some(Pending::Function(function, span)) = pending.pop() {
                        output.push(PostfixItem::Function {
                            function,
                            argc,
                            span: span.to(token.span),
                        });
                    }
                }
            }
            TokenKind::Operator(op) => {
                while let Some(Pending::Operator(top, span)) = pending.last() {
                    if top.precedence() < op.precedence() {
                        break;
                    }
                    output.push(PostfixItem::Operator(*top, *span));
                    pending.pop();
                }
                pending.push(Pending::Operator(*op, token.span));
            }
        }
    }

    while let Some(item) = pending.pop() {
        match item {
            Pending::Operator(op, span) => output.push(PostfixItem::Operator(op, span)),
            Pending::LeftParen { span, .. } => {
                return Err(TallyError::syntax_with_suggestion(
                    "Unmatched parenthesis",
                    span,
                    formula,
                    "add a closing ')'",
                ))
            }
            // Identifiers are only accepted when a '(' follows, so a bare
            // function on the stack always sits under an unclosed paren
            Pending::Function(function, span) => {
                return Err(TallyError::syntax(
                    format!("Unclosed call to {}()", function.name()),
                    span,
                    formula,
                ))
            }
        }
    }

    Ok(output)
}

/// Move operators to the output until the nearest '(' (left on the stack).
///
/// Returns whether that paren opens a function call, or `None` when there
/// is no open paren at all.
fn pop_until_paren(pending: &mut Vec<Pending>, output: &mut Vec<PostfixItem>) -> Option<bool> {
    loop {
        match pending.last()? {
            Pending::LeftParen { call, .. } => return Some(*call),
            Pending::Operator(op, span) => {
                output.push(PostfixItem::Operator(*op, *span));
                pending.pop();
            }
            Pending::Function(..) => return None,
        }
    }
}
