//! # Tally Engine
//!
//! **Scoring formulas and rules for board-game scorekeeping**
//!
//! Tally turns a session's score ledger into per-category totals, keeps
//! track of the stateful objects a game hands around, and runs the scoring
//! rules that append automatic adjustments.
//!
//! ## Quick Start
//!
//! ```rust
//! use tally::formula::{self, StaticResolver};
//! use tally::TallyResult;
//!
//! fn main() -> TallyResult<()> {
//!     let resolver = StaticResolver::new()
//!         .with("territories", 7.0)
//!         .with("bonus", -2.0);
//!
//!     let score = formula::evaluate("{territories} * 2 + max({bonus}, 0)", &resolver)?;
//!     assert_eq!(score, 14.0);
//!     Ok(())
//! }
//! ```
//!
//! ## Core Concepts
//!
//! ### Entries
//! The ledger is append-only. Players record manual entries; rules and
//! object score impacts produce entries tagged `ruleEngine`.
//!
//! ### Categories
//! Categories nest into a forest. A category's total is the sum of its own
//! entries and its children's totals, optionally replaced by a formula or
//! scaled by a weight.
//!
//! ### Objects
//! Objects are stateful game elements with an owner, an active window and
//! an optional calculation. Formulas read them by name: `{longest road}`.
//!
//! ### Rules
//! A rule compares a total against a threshold and, when it holds, appends
//! a compensating entry. [`Engine::run_cycle`] runs the rules once per
//! manual entry and suppresses duplicates.

pub mod aggregation;
pub mod analysis;
pub mod context;
pub mod engine;
pub mod error;
pub mod formula;
pub mod model;
pub mod objects;
pub mod resolver;
pub mod resource_limits;
pub mod response;
pub mod rules;
pub mod span;
pub mod validator;

#[cfg(target_arch = "wasm32")]
pub mod wasm;

pub use aggregation::CategoryTotals;
pub use context::{EvaluationContext, GameState};
pub use engine::Engine;
pub use error::TallyError;
pub use formula::{FormulaValidation, Resolver};
pub use model::*;
pub use objects::{ComputedValue, ObjectRefresh, Owner, RefreshedObject};
pub use resolver::GameResolver;
pub use resource_limits::ResourceLimits;
pub use response::{CycleOutcome, PlayerStanding, RuleTest, Scoreboard};
pub use rules::DuplicateGuard;
pub use span::Span;
pub use validator::{Issue, ValueValidation, Validator};

/// Result type for Tally operations
pub type TallyResult<T> = Result<T, TallyError>;

#[cfg(test)]
mod tests;
