//! Postfix evaluation
//!
//! Runs a postfix program against an explicit operand stack. References stay
//! as names on the stack until an operator or function needs their value, so
//! `state` and `owns` can consume the name itself.

use super::functions::{self, Function};
use super::postfix::PostfixItem;
use super::tokenizer::Operator;
use super::Resolver;
use crate::span::Span;
use crate::{TallyError, TallyResult};

/// A value on the evaluation stack
#[derive(Debug, Clone, PartialEq)]
pub enum Operand {
    Number(f64),
    Reference(String),
}

impl Operand {
    /// Numeric value; an unresolved reference counts as 0
    pub fn resolve(&self, resolver: &dyn Resolver) -> f64 {
        match self {
            Operand::Number(n) => *n,
            Operand::Reference(name) => resolver.resolve(name).unwrap_or(0.0),
        }
    }
}

pub fn evaluate_postfix(
    program: &[PostfixItem],
    formula: &str,
    resolver: &dyn Resolver,
) -> TallyResult<f64> {
    let mut stack: Vec<Operand> = Vec::with_capacity(program.len());

    for item in program {
        match item {
            PostfixItem::Number(value, _) => stack.push(Operand::Number(*value)),
            PostfixItem::Reference(name, _) => stack.push(Operand::Reference(name.clone())),
            PostfixItem::Operator(op, span) => {
                let (right, left) = match (stack.pop(), stack.pop()) {
                    (Some(right), Some(left)) => (right, left),
                    _ => {
                        return Err(TallyError::runtime(
                            format!("Insufficient operands for operator '{}'", op),
                            *span,
                            formula,
                        ))
                    }
                };
                let result = apply_operator(
                    *op,
                    left.resolve(resolver),
                    right.resolve(resolver),
                    *span,
                    formula,
                )?;
                stack.push(Operand::Number(result));
            }
            PostfixItem::Function {
                function,
                argc,
                span,
            } => {
                if let Some(required) = function.required_context(*argc) {
                    if !resolver.provides(required) {
                        return Err(TallyError::syntax_with_suggestion(
                            format!("Unknown function '{}'", function.name()),
                            *span,
                            formula,
                            format!(
                                "{}() is only available when evaluating against game state",
                                function.name()
                            ),
                        ));
                    }
                }
                if stack.len() < *argc {
                    return Err(TallyError::runtime(
                        format!("Insufficient operands for function '{}'", function.name()),
                        *span,
                        formula,
                    ));
                }
                let args = stack.split_off(stack.len() - argc);
                let result = call_function(*function, &args, resolver, *span, formula)?;
                stack.push(Operand::Number(result));
            }
        }
    }

    if stack.len() != 1 {
        return Err(TallyError::runtime(
            format!(
                "Formula must reduce to a single value, found {}",
                stack.len()
            ),
            Span::new(0, formula.len()),
            formula,
        ));
    }

    let value = stack[0].resolve(resolver);
    if !value.is_finite() {
        return Err(TallyError::runtime(
            "Result is not a finite number",
            Span::new(0, formula.len()),
            formula,
        ));
    }
    Ok(value)
}

fn apply_operator(
    op: Operator,
    left: f64,
    right: f64,
    span: Span,
    formula: &str,
) -> TallyResult<f64> {
    Ok(match op {
        Operator::Add => left + right,
        Operator::Subtract => left - right,
        Operator::Multiply => left * right,
        Operator::Divide => {
            if right == 0.0 {
                return Err(TallyError::runtime("Division by zero", span, formula));
            }
            left / right
        }
        Operator::Power => left.powf(right),
    })
}

fn call_function(
    function: Function,
    args: &[Operand],
    resolver: &dyn Resolver,
    span: Span,
    formula: &str,
) -> TallyResult<f64> {
    functions::call(function, args, resolver).map_err(|msg| TallyError::runtime(msg, span, formula))
}
