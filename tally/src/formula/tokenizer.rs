//! Formula tokenizer
//!
//! Turns a formula string into a flat token list and rewrites unary signs
//! into plain binary arithmetic so the shunting-yard pass only ever sees
//! binary operators.

use crate::span::Span;
use crate::{TallyError, TallyResult};
use std::fmt;

/// Binary arithmetic operators
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operator {
    Add,
    Subtract,
    Multiply,
    Divide,
    Power,
}

impl Operator {
    /// Binding strength: `^` > `* /` > `+ -`
    pub fn precedence(&self) -> u8 {
        match self {
            Operator::Add | Operator::Subtract => 1,
            Operator::Multiply | Operator::Divide => 2,
            Operator::Power => 3,
        }
    }

    pub fn symbol(&self) -> char {
        match self {
            Operator::Add => '+',
            Operator::Subtract => '-',
            Operator::Multiply => '*',
            Operator::Divide => '/',
            Operator::Power => '^',
        }
    }

    fn from_char(ch: char) -> Option<Self> {
        match ch {
            '+' => Some(Operator::Add),
            '-' => Some(Operator::Subtract),
            '*' => Some(Operator::Multiply),
            '/' => Some(Operator::Divide),
            '^' => Some(Operator::Power),
            _ => None,
        }
    }
}

impl fmt::Display for Operator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.symbol())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum TokenKind {
    Number(f64),
    /// `{name}` with surrounding whitespace trimmed
    Reference(String),
    /// Bare word; only valid as a function name
    Identifier(String),
    Operator(Operator),
    LeftParen,
    RightParen,
    Comma,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Token {
    pub kind: TokenKind,
    pub span: Span,
}

impl Token {
    pub fn new(kind: TokenKind, span: Span) -> Self {
        Self { kind, span }
    }

    /// True for tokens after which a `+`/`-` is a binary operator
    fn ends_operand(&self) -> bool {
        matches!(
            self.kind,
            TokenKind::Number(_) | TokenKind::Reference(_) | TokenKind::RightParen
        )
    }
}

/// Split a formula into tokens.
///
/// Fails on characters outside the grammar, malformed numbers such as
/// `1.2.3`, and empty or unterminated references.
pub fn tokenize(formula: &str) -> TallyResult<Vec<Token>> {
    let mut tokens = Vec::new();
    let mut chars = formula.char_indices().peekable();

    while let Some(&(start, ch)) = chars.peek() {
        if ch.is_whitespace() {
            chars.next();
            continue;
        }

        if ch.is_ascii_digit() || ch == '.' {
            let mut end = start;
            while let Some(&(i, next)) = chars.peek() {
                if !next.is_ascii_digit() && next != '.' {
                    break;
                }
                end = i + next.len_utf8();
                chars.next();
            }
            let text = &formula[start..end];
            let value: f64 = text.parse().map_err(|_| {
                TallyError::syntax(
                    format!("Invalid number '{}'", text),
                    Span::new(start, end),
                    formula,
                )
            })?;
            tokens.push(Token::new(TokenKind::Number(value), Span::new(start, end)));
            continue;
        }

        if ch == '{' {
            chars.next();
            let mut close = None;
            for (i, next) in chars.by_ref() {
                if next == '}' {
                    close = Some(i);
                    break;
                }
                if next == '{' {
                    return Err(TallyError::syntax(
                        "Nested '{' inside a reference",
                        Span::new(i, i + 1),
                        formula,
                    ));
                }
            }
            let close = close.ok_or_else(|| {
                TallyError::syntax_with_suggestion(
                    "Unterminated reference",
                    Span::new(start, formula.len()),
                    formula,
                    "close the reference with '}'",
                )
            })?;
            let name = formula[start + 1..close].trim();
            if name.is_empty() {
                return Err(TallyError::syntax(
                    "Empty reference '{}'",
                    Span::new(start, close + 1),
                    formula,
                ));
            }
            tokens.push(Token::new(
                TokenKind::Reference(name.to_string()),
                Span::new(start, close + 1),
            ));
            continue;
        }

        if ch.is_ascii_alphabetic() || ch == '_' {
            let mut end = start;
            while let Some(&(i, next)) = chars.peek() {
                if !next.is_ascii_alphanumeric() && next != '_' {
                    break;
                }
                end = i + next.len_utf8();
                chars.next();
            }
            tokens.push(Token::new(
                TokenKind::Identifier(formula[start..end].to_string()),
                Span::new(start, end),
            ));
            continue;
        }

        let span = Span::new(start, start + ch.len_utf8());
        let kind = match ch {
            '(' => TokenKind::LeftParen,
            ')' => TokenKind::RightParen,
            ',' => TokenKind::Comma,
            _ => match Operator::from_char(ch) {
                Some(op) => TokenKind::Operator(op),
                None => {
                    return Err(TallyError::syntax(
                        format!("Unexpected character '{}'", ch),
                        span,
                        formula,
                    ))
                }
            },
        };
        chars.next();
        tokens.push(Token::new(kind, span));
    }

    Ok(tokens)
}

/// Rewrite unary signs into binary arithmetic.
///
/// A sign is unary when it is not preceded by a number, a reference or `)`.
/// Unary plus is dropped. Unary minus over the operand that follows it
/// becomes `(0 - operand)`, so it binds tighter than every binary operator:
/// `-2^2` is `(0-2)^2`.
pub fn rewrite_unary(tokens: &[Token]) -> Vec<Token> {
    let mut out: Vec<Token> = Vec::with_capacity(tokens.len());
    let mut i = 0;

    while i < tokens.len() {
        let token = &tokens[i];
        let unary = match token.kind {
            TokenKind::Operator(op @ (Operator::Add | Operator::Subtract)) => {
                if out.last().is_some_and(Token::ends_operand) {
                    None
                } else {
                    Some(op)
                }
            }
            _ => None,
        };

        match unary {
            Some(Operator::Add) => i += 1,
            Some(_) => match operand_end(tokens, i + 1) {
                Some(end) => {
                    out.push(Token::new(TokenKind::LeftParen, token.span));
                    out.push(Token::new(TokenKind::Number(0.0), token.span));
                    out.push(Token::new(TokenKind::Operator(Operator::Subtract), token.span));
                    out.extend(rewrite_unary(&tokens[i + 1..end]));
                    let close = Span::at(tokens[end - 1].span.end);
                    out.push(Token::new(TokenKind::RightParen, close));
                    i = end;
                }
                // Dangling minus: leave it for the evaluator to report
                None => {
                    out.push(token.clone());
                    i += 1;
                }
            },
            None => {
                out.push(token.clone());
                i += 1;
            }
        }
    }

    out
}

/// Exclusive end index of the operand starting at `start`, if there is one
fn operand_end(tokens: &[Token], start: usize) -> Option<usize> {
    let mut j = start;
    while matches!(
        tokens.get(j).map(|t| &t.kind),
        Some(TokenKind::Operator(Operator::Add | Operator::Subtract))
    ) {
        j += 1;
    }

    match tokens.get(j).map(|t| &t.kind)? {
        TokenKind::Number(_) | TokenKind::Reference(_) => Some(j + 1),
        TokenKind::Identifier(_) => match tokens.get(j + 1).map(|t| &t.kind) {
            Some(TokenKind::LeftParen) => Some(matching_paren(tokens, j + 1)),
            _ => Some(j + 1),
        },
        TokenKind::LeftParen => Some(matching_paren(tokens, j)),
        _ => None,
    }
}

/// Index just past the parenthesis closing the one at `open`, or the end of
/// input when it is never closed
fn matching_paren(tokens: &[Token], open: usize) -> usize {
    let mut depth = 0usize;
    for (offset, token) in tokens[open..].iter().enumerate() {
        match token.kind {
            TokenKind::LeftParen => depth += 1,
            TokenKind::RightParen => {
                depth -= 1;
                if depth == 0 {
                    return open + offset + 1;
                }
            }
            _ => {}
        }
    }
    tokens.len()
}
