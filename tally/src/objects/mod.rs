//! Object state machine
//!
//! Objects are the stateful pieces of a game: a longest-road card, a pile
//! of resources, a bonus that only counts in the final round. Each instance
//! has an owner, an active window and a lifecycle state, all derived from
//! its definition and the evaluation context unless the instance pins an
//! explicit state.

mod refresh;

pub use refresh::{refresh_objects, ObjectRefresh, RefreshedObject};

use crate::aggregation;
use crate::context::EvaluationContext;
use crate::formula;
use crate::model::{ActiveWindow, ObjectDefinition, ObjectState, ObjectValue, Ownership, VariableValue};
use crate::resolver::GameResolver;
use tracing::warn;

/// Resolved owner of an object
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Owner {
    Global,
    Inactive,
    Player(String),
}

/// Result of [`compute_value`]
#[derive(Debug, Clone, PartialEq)]
pub enum ComputedValue {
    /// The calculation produced a number
    Computed(f64),
    /// No calculation, or it failed; the stored value stands
    Stored(VariableValue),
}

impl ComputedValue {
    pub fn as_number(&self) -> Option<f64> {
        match self {
            ComputedValue::Computed(n) => Some(*n),
            ComputedValue::Stored(value) => value.as_number(),
        }
    }
}

/// Who owns the object in this context.
///
/// `None` means player ownership with no player in context.
pub fn evaluate_ownership(def: &ObjectDefinition, ctx: &EvaluationContext) -> Option<Owner> {
    ownership_at_depth(def, ctx, 0)
}

fn ownership_at_depth(def: &ObjectDefinition, ctx: &EvaluationContext, depth: usize) -> Option<Owner> {
    match &def.ownership {
        Ownership::Global => Some(Owner::Global),
        Ownership::Inactive => Some(Owner::Inactive),
        Ownership::Player => ctx.player_id.map(|p| Owner::Player(p.to_string())),
        Ownership::Object { object_id } => {
            let Some(referenced) = follow_reference(def, object_id, ctx, depth) else {
                return Some(Owner::Inactive);
            };
            let value = ctx.object_value(&referenced.id);
            if state_at_depth(referenced, value, ctx, depth + 1).is_live() {
                ownership_at_depth(referenced, ctx, depth + 1)
            } else {
                Some(Owner::Inactive)
            }
        }
    }
}

/// Whether the object currently takes part in scoring
pub fn evaluate_active_window(def: &ObjectDefinition, ctx: &EvaluationContext) -> bool {
    window_at_depth(def, ctx, 0)
}

fn window_at_depth(def: &ObjectDefinition, ctx: &EvaluationContext, depth: usize) -> bool {
    match &def.active_window {
        ActiveWindow::Always => true,
        ActiveWindow::Round {
            round_id,
            round_index,
        } => {
            if round_id.is_none() && round_index.is_none() {
                return ctx.session.rounds_enabled && ctx.round_id.is_some();
            }
            let id_matches = round_id.is_some() && round_id.as_deref() == ctx.round_id;
            let index_matches = round_index.is_some() && *round_index == ctx.round_index();
            id_matches || index_matches
        }
        // Phases are not tracked yet; a phase window is open whenever the
        // template uses phases at all
        ActiveWindow::Phase { .. } => ctx.template.is_some_and(|t| t.phases_enabled),
        ActiveWindow::Object { object_id } => match follow_reference(def, object_id, ctx, depth) {
            Some(referenced) => {
                let value = ctx.object_value(&referenced.id);
                state_at_depth(referenced, value, ctx, depth + 1).is_live()
            }
            None => false,
        },
    }
}

/// Lifecycle state of an instance in this context
pub fn evaluate_state(
    def: &ObjectDefinition,
    value: Option<&ObjectValue>,
    ctx: &EvaluationContext,
) -> ObjectState {
    state_at_depth(def, value, ctx, 0)
}

fn state_at_depth(
    def: &ObjectDefinition,
    value: Option<&ObjectValue>,
    ctx: &EvaluationContext,
    depth: usize,
) -> ObjectState {
    let Some(value) = value else {
        return ObjectState::Inactive;
    };
    if let Some(state) = &value.state {
        return state.clone();
    }

    let scoped = match value.player_id.as_deref() {
        Some(player_id) => ctx.for_player(player_id),
        None => *ctx,
    };
    let owner = ownership_at_depth(def, &scoped, depth);
    if owner == Some(Owner::Inactive) || !window_at_depth(def, &scoped, depth) {
        return ObjectState::Inactive;
    }
    match owner {
        Some(Owner::Global) => ObjectState::Active,
        Some(Owner::Player(_)) => ObjectState::Owned,
        _ if value.player_id.is_some() => ObjectState::Owned,
        _ => ObjectState::Active,
    }
}

/// Run the object's calculation, or return the stored value.
///
/// The calculation sees the owning player's raw category totals (entries
/// and rollups only) and the stored object values.
pub fn compute_value(def: &ObjectDefinition, value: &ObjectValue, ctx: &EvaluationContext) -> ComputedValue {
    let Some(calculation) = def.calculation.as_deref() else {
        return ComputedValue::Stored(value.value.clone());
    };

    let scoped = match value.player_id.as_deref() {
        Some(player_id) => ctx.for_player(player_id),
        None => *ctx,
    };
    let totals = aggregation::raw_totals(&scoped);
    let resolver = GameResolver::new(scoped, &totals, &ctx.state.object_values);

    match formula::evaluate_with_limits(calculation, &resolver, ctx.limits) {
        Ok(result) => ComputedValue::Computed(result),
        Err(e) => {
            warn!(object = %def.name, error = %e, "object calculation failed; keeping stored value");
            ComputedValue::Stored(value.value.clone())
        }
    }
}

/// Points the object contributes to its owner this cycle
pub fn apply_score_impact(def: &ObjectDefinition, value: &ObjectValue, ctx: &EvaluationContext) -> f64 {
    let Some(formula_text) = def.score_impact.as_deref() else {
        return 0.0;
    };
    let Some(player_id) = value.player_id.as_deref().or(ctx.player_id) else {
        return 0.0;
    };
    let scoped = ctx.for_player(player_id);
    if !matches!(evaluate_ownership(def, &scoped), Some(Owner::Player(_))) {
        return 0.0;
    }

    let totals = aggregation::raw_totals(&scoped);
    let resolver = GameResolver::new(scoped, &totals, &ctx.state.object_values);
    match formula::evaluate_with_limits(formula_text, &resolver, ctx.limits) {
        Ok(impact) => impact,
        Err(e) => {
            warn!(object = %def.name, error = %e, "score impact failed; contributing 0");
            0.0
        }
    }
}

fn follow_reference<'a>(
    from: &ObjectDefinition,
    object_id: &str,
    ctx: &EvaluationContext<'a>,
    depth: usize,
) -> Option<&'a ObjectDefinition> {
    if depth >= ctx.limits.max_reference_depth {
        warn!(
            object = %from.name,
            depth,
            "object reference chain too deep or cyclic; treating as inactive"
        );
        return None;
    }
    ctx.object_definition(object_id)
}
