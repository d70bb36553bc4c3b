//! Scoring formula language
//!
//! Formulas are small infix expressions over numbers, braced references and
//! function calls, e.g. `{territories} * 2 + max({bonus}, 0)`.
//!
//! Evaluation runs in three steps:
//! 1. Tokenize and rewrite unary signs
//! 2. Convert to postfix with the shunting-yard algorithm
//! 3. Evaluate the postfix program against a [`Resolver`]
//!
//! The engine knows nothing about game data. Everything a formula can look
//! up goes through the resolver, and formulas are evaluated fresh each time.

pub mod evaluator;
pub mod functions;
pub mod postfix;
pub mod tokenizer;

pub use evaluator::Operand;
pub use functions::Function;

use crate::model::ObjectState;
use crate::span::Span;
use crate::{ResourceLimits, TallyError, TallyResult};
use serde::Serialize;
use std::collections::{BTreeSet, HashMap};
use tokenizer::TokenKind;

/// Name of the pseudo-reference that sums every category total
pub const TOTAL_REFERENCE: &str = "total";

/// Functions that need game context to mean anything
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ContextFunction {
    /// `state(ref)`
    State,
    /// `owns(ref)` and `owns(ref, player)`
    Owns,
    /// `round()` with no arguments
    Round,
    /// `phase()`
    Phase,
}

/// Turns `{reference}` names into numbers and backs the context functions.
///
/// Every method has a lenient default, so a resolver only implements what
/// it can answer. A reference nobody resolves evaluates to 0.
pub trait Resolver {
    /// Numeric value of an object by name or id
    fn object_value(&self, _name: &str) -> Option<f64> {
        None
    }

    /// Total of a category by name or id
    fn category_total(&self, _name: &str) -> Option<f64> {
        None
    }

    /// Sum of all current category totals, backing `{total}`
    fn grand_total(&self) -> Option<f64> {
        None
    }

    /// Whether the context function may be called at all
    fn provides(&self, _function: ContextFunction) -> bool {
        false
    }

    fn object_state(&self, _name: &str) -> Option<ObjectState> {
        None
    }

    /// Whether the object is owned by `player_id`, or by the player being
    /// evaluated when no player is given
    fn owns(&self, _name: &str, _player_id: Option<&str>) -> bool {
        false
    }

    fn round_index(&self) -> Option<usize> {
        None
    }

    fn phase_id(&self) -> Option<String> {
        None
    }

    /// Objects first, then categories, then the `total` pseudo-reference
    fn resolve(&self, name: &str) -> Option<f64> {
        self.object_value(name)
            .or_else(|| self.category_total(name))
            .or_else(|| {
                if name.eq_ignore_ascii_case(TOTAL_REFERENCE) {
                    self.grand_total()
                } else {
                    None
                }
            })
    }
}

/// Resolver with no references and no context; every reference is 0
#[derive(Debug, Default, Clone, Copy)]
pub struct EmptyResolver;

impl Resolver for EmptyResolver {}

/// Resolver over a fixed name → value table, matched case-insensitively
#[derive(Debug, Default, Clone)]
pub struct StaticResolver {
    values: HashMap<String, f64>,
}

impl StaticResolver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, name: &str, value: f64) -> Self {
        self.insert(name, value);
        self
    }

    pub fn insert(&mut self, name: &str, value: f64) {
        self.values.insert(name.to_lowercase(), value);
    }
}

impl Resolver for StaticResolver {
    fn category_total(&self, name: &str) -> Option<f64> {
        self.values.get(&name.to_lowercase()).copied()
    }

    fn grand_total(&self) -> Option<f64> {
        Some(self.values.values().sum())
    }
}

/// Outcome of [`validate`]
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FormulaValidation {
    pub valid: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl FormulaValidation {
    fn ok() -> Self {
        Self {
            valid: true,
            error: None,
        }
    }

    fn failed(error: &TallyError) -> Self {
        Self {
            valid: false,
            error: Some(error.message()),
        }
    }
}

/// Evaluate a formula with default resource limits
pub fn evaluate(formula: &str, resolver: &dyn Resolver) -> TallyResult<f64> {
    evaluate_with_limits(formula, resolver, &ResourceLimits::default())
}

pub fn evaluate_with_limits(
    formula: &str,
    resolver: &dyn Resolver,
    limits: &ResourceLimits,
) -> TallyResult<f64> {
    let program = compile(formula, limits)?;
    evaluator::evaluate_postfix(&program, formula, resolver)
}

/// Check a formula without executing it.
///
/// Covers tokenization, parenthesis balance and known function names.
/// Never fails; problems are reported in the result.
pub fn validate(formula: &str) -> FormulaValidation {
    match compile(formula, &ResourceLimits::default()) {
        Ok(_) => FormulaValidation::ok(),
        Err(e) => FormulaValidation::failed(&e),
    }
}

/// Names of all `{references}` in a formula.
///
/// Best-effort: a formula that does not tokenize has no references.
pub fn extract_references(formula: &str) -> BTreeSet<String> {
    match tokenizer::tokenize(formula) {
        Ok(tokens) => tokens
            .into_iter()
            .filter_map(|token| match token.kind {
                TokenKind::Reference(name) => Some(name),
                _ => None,
            })
            .collect(),
        Err(_) => BTreeSet::new(),
    }
}

/// Tokenize, rewrite and convert a formula to postfix
pub fn compile(formula: &str, limits: &ResourceLimits) -> TallyResult<Vec<postfix::PostfixItem>> {
    if formula.len() > limits.max_formula_length {
        return Err(TallyError::ResourceLimitExceeded {
            limit_name: "max_formula_length".to_string(),
            limit_value: limits.max_formula_length.to_string(),
            actual_value: formula.len().to_string(),
            suggestion: "Split the formula across several categories".to_string(),
        });
    }

    let tokens = tokenizer::tokenize(formula)?;
    if tokens.is_empty() {
        return Err(TallyError::syntax(
            "Formula is empty",
            Span::new(0, formula.len()),
            formula,
        ));
    }
    let tokens = tokenizer::rewrite_unary(&tokens);
    postfix::to_postfix(&tokens, formula, limits)
}
