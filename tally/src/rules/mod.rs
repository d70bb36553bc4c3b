//! Rule engine
//!
//! A rule is a condition over a player's aggregated totals and an action
//! that adjusts a category. Actions never edit existing entries; they
//! append a compensating delta, so the ledger stays append-only and every
//! automatic adjustment is visible.

pub mod guard;

pub use guard::{find_trigger, DuplicateGuard};

use crate::aggregation::{self, CategoryTotals};
use crate::context::EvaluationContext;
use crate::model::{
    ActionKind, ConditionKind, EntrySource, RuleCondition, ScoreEntry, ScoringRule, EPSILON,
};
use crate::response::RuleTest;
use crate::{TallyError, TallyResult};
use tracing::{debug, warn};
use uuid::Uuid;

/// Whether the condition holds for the context's player
pub fn evaluate_condition(condition: &RuleCondition, ctx: &EvaluationContext) -> TallyResult<bool> {
    require_player(ctx)?;
    let totals = aggregation::compute_category_totals(ctx);
    Ok(condition_holds(condition, ctx, &totals))
}

/// The entry the rule's action would append, if the delta is not negligible
pub fn apply_rule_action(rule: &ScoringRule, ctx: &EvaluationContext) -> TallyResult<Option<ScoreEntry>> {
    require_player(ctx)?;
    let totals = aggregation::compute_category_totals(ctx);
    action_entry(rule, ctx, &totals)
}

/// Entries produced by every active rule for the context's player.
///
/// Rules are evaluated independently against the same totals. A failing
/// rule is logged and skipped.
pub fn evaluate_rules(ctx: &EvaluationContext) -> Vec<ScoreEntry> {
    if ctx.player_id.is_none() {
        warn!(session = %ctx.session_id(), "rule evaluation needs a player; nothing to do");
        return Vec::new();
    }
    let rules = active_rules(ctx);
    if rules.is_empty() {
        return Vec::new();
    }

    let totals = aggregation::compute_category_totals(ctx);
    let mut entries = Vec::new();
    for rule in &rules {
        if !condition_holds(&rule.condition, ctx, &totals) {
            continue;
        }
        match action_entry(rule, ctx, &totals) {
            Ok(Some(entry)) => {
                debug!(rule = %rule.name, player = %entry.player_id, delta = entry.value, "rule fired");
                entries.push(entry);
            }
            Ok(None) => {}
            Err(e) => warn!(rule = %rule.name, error = %e, "rule action failed; skipping"),
        }
    }
    entries
}

/// Dry run of a single rule, ignoring `enabled` and template reconciliation
pub fn test_rule(rule: &ScoringRule, ctx: &EvaluationContext) -> TallyResult<RuleTest> {
    require_player(ctx)?;
    let totals = aggregation::compute_category_totals(ctx);
    let would_trigger = condition_holds(&rule.condition, ctx, &totals);
    let entry = if would_trigger {
        action_entry(rule, ctx, &totals)?
    } else {
        None
    };
    Ok(RuleTest {
        rule_id: rule.id.clone(),
        would_trigger,
        entry,
    })
}

/// Enabled session rules that still match their template.
///
/// A rule linked by `template_rule_id` takes the template rule's current
/// condition and action. An unlinked copy must match an enabled template
/// rule exactly. Sessions without a template use their rules as they are.
pub fn active_rules(ctx: &EvaluationContext) -> Vec<ScoringRule> {
    let session_rules = ctx
        .state
        .rules_for(ctx.session_id())
        .filter(|rule| rule.enabled);

    if ctx.session.template_id.is_none() {
        return session_rules.cloned().collect();
    }
    let Some(template) = ctx.template else {
        warn!(session = %ctx.session_id(), "session template is missing; no rules apply");
        return Vec::new();
    };

    session_rules
        .filter_map(|rule| match rule.template_rule_id.as_deref() {
            Some(template_rule_id) => template
                .rules
                .iter()
                .find(|t| t.id == template_rule_id && t.enabled)
                .map(|t| ScoringRule {
                    condition: t.condition.clone(),
                    action: t.action.clone(),
                    ..rule.clone()
                }),
            None => template
                .rules
                .iter()
                .any(|t| t.enabled && t.condition == rule.condition && t.action == rule.action)
                .then(|| rule.clone()),
        })
        .collect()
}

fn require_player(ctx: &EvaluationContext) -> TallyResult<()> {
    match ctx.player_id {
        Some(_) => Ok(()),
        None => Err(TallyError::Engine(
            "Rule evaluation needs a player in context".to_string(),
        )),
    }
}

fn condition_holds(condition: &RuleCondition, ctx: &EvaluationContext, totals: &CategoryTotals) -> bool {
    let observed = match condition.kind {
        ConditionKind::Total => Some(totals.values().sum::<f64>()),
        ConditionKind::Category => condition
            .category_id
            .as_deref()
            .and_then(|reference| category_or_object(reference, ctx, totals)),
        ConditionKind::Round => {
            let count = ctx
                .state
                .entries_for(ctx.session_id())
                .filter(|e| Some(e.player_id.as_str()) == ctx.player_id)
                .filter(|e| e.round_id == condition.round_id)
                .count();
            Some(count as f64)
        }
    };
    observed.is_some_and(|value| condition.operator.compare(value, condition.value))
}

/// A category total by id or name, else an object's value by name or id
fn category_or_object(reference: &str, ctx: &EvaluationContext, totals: &CategoryTotals) -> Option<f64> {
    if let Some(total) = totals.get(reference) {
        return Some(*total);
    }
    if let Some(category) = ctx.find_category(reference) {
        if let Some(total) = totals.get(&category.id) {
            return Some(*total);
        }
    }
    let definition = ctx.find_object_definition(reference)?;
    ctx.object_value(&definition.id)?.numeric()
}

fn action_entry(
    rule: &ScoringRule,
    ctx: &EvaluationContext,
    totals: &CategoryTotals,
) -> TallyResult<Option<ScoreEntry>> {
    let player_id = ctx
        .player_id
        .ok_or_else(|| TallyError::Engine("Rule action needs a player in context".to_string()))?;
    let action = &rule.action;

    let target = match action.target_category_id.as_deref() {
        Some(reference) => totals
            .get(reference)
            .or_else(|| {
                ctx.find_category(reference)
                    .and_then(|category| totals.get(&category.id))
            })
            .copied()
            .unwrap_or(0.0),
        None => totals.values().sum(),
    };
    let delta = match action.kind {
        ActionKind::Add => action.value,
        ActionKind::Multiply => target * action.value - target,
        ActionKind::Set => action.value - target,
    };

    if !delta.is_finite() {
        return Err(TallyError::Engine(format!(
            "Rule '{}' produced a non-finite adjustment",
            rule.name
        )));
    }
    if delta.abs() < EPSILON {
        return Ok(None);
    }

    Ok(Some(ScoreEntry {
        id: Uuid::new_v4().to_string(),
        session_id: ctx.session_id().to_string(),
        player_id: player_id.to_string(),
        value: delta,
        category_id: action.target_category_id.clone(),
        round_id: ctx.round_id.map(str::to_string),
        note: Some(format!("Rule: {}", rule.name)),
        created_at: ctx.now,
        source: EntrySource::RuleEngine,
    }))
}
