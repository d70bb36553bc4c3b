//! Category aggregation pipeline
//!
//! Turns the ledger into per-category totals for one player:
//!
//! 1. Refresh objects (computed values and states)
//! 2. Sum the player's entries per category
//! 3. Roll nested categories up into their parents
//! 4. Evaluate formula categories in dependency order
//! 5. Apply category weights
//!
//! Every formula failure is recovered here: the affected total keeps its
//! previous value and a warning is logged.

use crate::analysis;
use crate::context::EvaluationContext;
use crate::formula;
use crate::model::{CategoryDefinition, DisplayType, ObjectValue, WinCondition, EPSILON};
use crate::objects;
use crate::resolver::GameResolver;
use std::collections::{BTreeMap, HashMap, HashSet};
use tracing::warn;

/// Category id → total, in id order
pub type CategoryTotals = BTreeMap<String, f64>;

/// Final category totals for the context's player and round
pub fn compute_category_totals(ctx: &EvaluationContext) -> CategoryTotals {
    let refresh = objects::refresh_objects(ctx);
    let objects = refresh.values();

    let mut totals = raw_totals(ctx);
    apply_formulas(ctx, &mut totals, &objects);
    apply_weights(ctx, &mut totals);
    totals
}

/// Sum of every final category total
pub fn compute_player_total(ctx: &EvaluationContext) -> f64 {
    compute_category_totals(ctx).values().sum()
}

/// Players whose total equals the best total, ties included
pub fn find_winners(totals: &BTreeMap<String, f64>, direction: WinCondition) -> Vec<String> {
    let best = match direction {
        WinCondition::HigherWins => totals.values().copied().fold(f64::NEG_INFINITY, f64::max),
        WinCondition::LowerWins => totals.values().copied().fold(f64::INFINITY, f64::min),
    };
    totals
        .iter()
        .filter(|(_, total)| (**total - best).abs() < EPSILON)
        .map(|(player, _)| player.clone())
        .collect()
}

/// Entries and rollups only, before formulas and weights
pub fn raw_totals(ctx: &EvaluationContext) -> CategoryTotals {
    let base = base_totals(ctx);
    rollup(ctx, &base)
}

/// Per-category sums of the player's entries, filtered to the context round.
///
/// Without a player in context every player's entries are summed.
pub fn base_totals(ctx: &EvaluationContext) -> CategoryTotals {
    let mut totals = CategoryTotals::new();
    let entries = ctx.state.entries_for(ctx.session_id()).filter(|entry| {
        ctx.player_id.is_none_or(|p| entry.player_id == p)
            && ctx.round_id.is_none_or(|r| entry.round_id.as_deref() == Some(r))
    });
    for entry in entries {
        *totals.entry(entry.category_key().to_string()).or_insert(0.0) += entry.value;
    }
    totals
}

/// Add each category's subtree into its total.
///
/// Categories with nothing in their subtree stay absent. Keys that are not
/// categories of the session, such as [`UNCATEGORIZED`](crate::model::UNCATEGORIZED), pass through.
pub fn rollup(ctx: &EvaluationContext, base: &CategoryTotals) -> CategoryTotals {
    let categories: Vec<&CategoryDefinition> = ctx.state.categories_for(ctx.session_id()).collect();
    let mut children: HashMap<&str, Vec<&str>> = HashMap::new();
    for category in &categories {
        if let Some(parent) = category.parent_category_id.as_deref() {
            children.entry(parent).or_default().push(&category.id);
        }
    }

    let mut rollup = Rollup {
        base,
        children: &children,
        memo: HashMap::new(),
        visiting: HashSet::new(),
        max_depth: ctx.limits.max_category_depth,
    };
    let mut totals = base.clone();
    for category in &categories {
        if !children.contains_key(category.id.as_str()) {
            continue;
        }
        if let Some(total) = rollup.subtree_total(&category.id, 0) {
            totals.insert(category.id.clone(), total);
        }
    }
    totals
}

struct Rollup<'r> {
    base: &'r CategoryTotals,
    children: &'r HashMap<&'r str, Vec<&'r str>>,
    memo: HashMap<&'r str, Option<f64>>,
    visiting: HashSet<&'r str>,
    max_depth: usize,
}

impl<'r> Rollup<'r> {
    fn subtree_total(&mut self, id: &'r str, depth: usize) -> Option<f64> {
        if let Some(total) = self.memo.get(id) {
            return *total;
        }
        if depth > self.max_depth || !self.visiting.insert(id) {
            warn!(category = id, "category nesting is cyclic or too deep; skipping");
            return None;
        }

        let mut total = self.base.get(id).copied();
        let children = self.children.get(id).cloned().unwrap_or_default();
        for child in children {
            if let Some(child_total) = self.subtree_total(child, depth + 1) {
                total = Some(total.unwrap_or(0.0) + child_total);
            }
        }

        self.visiting.remove(id);
        self.memo.insert(id, total);
        total
    }
}

fn apply_formulas(ctx: &EvaluationContext, totals: &mut CategoryTotals, objects: &[ObjectValue]) {
    let categories: Vec<&CategoryDefinition> = ctx.state.categories_for(ctx.session_id()).collect();
    let order = match analysis::formula_evaluation_order(&categories) {
        Ok(order) => order,
        Err(e) => {
            warn!(error = %e, "falling back to definition order for formula categories");
            categories
                .iter()
                .copied()
                .filter(|c| c.display_type == DisplayType::Formula)
                .collect()
        }
    };

    for category in order {
        let Some(text) = category.formula.as_deref() else {
            continue;
        };
        let result = {
            let resolver = GameResolver::new(*ctx, totals, objects);
            formula::evaluate_with_limits(text, &resolver, ctx.limits)
        };
        match result {
            Ok(value) => {
                totals.insert(category.id.clone(), value);
            }
            Err(e) => {
                warn!(category = %category.name, error = %e, "formula failed; keeping base total");
            }
        }
    }
}

fn apply_weights(ctx: &EvaluationContext, totals: &mut CategoryTotals) {
    for category in ctx.state.categories_for(ctx.session_id()) {
        if category.display_type != DisplayType::Weighted {
            continue;
        }
        if let Some(total) = totals.get_mut(&category.id) {
            *total *= category.weight.unwrap_or(1.0);
        }
    }
}
