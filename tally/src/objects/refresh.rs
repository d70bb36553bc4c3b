//! Session-wide object refresh (aggregation pass 1)

use super::{apply_score_impact, compute_value, evaluate_state, ComputedValue};
use crate::context::EvaluationContext;
use crate::model::{EntrySource, ObjectState, ObjectValue, ScoreEntry, EPSILON};
use serde::Serialize;
use uuid::Uuid;

/// An object instance after recomputation
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RefreshedObject {
    /// The instance with `computed_value` updated; `state` is left as stored
    pub value: ObjectValue,
    /// Derived lifecycle state
    pub state: ObjectState,
    /// Impact credited to the instance's player; 0 for session-wide instances
    pub score_impact: f64,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ObjectRefresh {
    pub objects: Vec<RefreshedObject>,
    /// Entries for nonzero score impacts, for the caller to append
    pub impact_entries: Vec<ScoreEntry>,
}

impl ObjectRefresh {
    /// Refreshed instances, in the shape formula resolvers read
    pub fn values(&self) -> Vec<ObjectValue> {
        self.objects.iter().map(|o| o.value.clone()).collect()
    }
}

/// Recompute every object instance of the session, global and per player.
///
/// Instances whose definition is missing from the template are skipped.
pub fn refresh_objects(ctx: &EvaluationContext) -> ObjectRefresh {
    let mut refresh = ObjectRefresh::default();

    for value in ctx.state.object_values_for(ctx.session_id()) {
        let Some(def) = ctx.object_definition(&value.object_definition_id) else {
            continue;
        };
        let scoped = match value.player_id.as_deref() {
            Some(player_id) => ctx.for_player(player_id),
            None => *ctx,
        };

        let mut refreshed = value.clone();
        if let ComputedValue::Computed(result) = compute_value(def, value, &scoped) {
            refreshed.computed_value = Some(result);
        }
        let state = evaluate_state(def, Some(value), &scoped);
        // Only a player's own instance can credit that player
        let score_impact = match value.player_id.as_deref() {
            Some(_) => apply_score_impact(def, value, &scoped),
            None => 0.0,
        };

        if let Some(player_id) = value.player_id.as_deref() {
            if score_impact.abs() >= EPSILON {
                refresh.impact_entries.push(ScoreEntry {
                    id: Uuid::new_v4().to_string(),
                    session_id: ctx.session_id().to_string(),
                    player_id: player_id.to_string(),
                    value: score_impact,
                    category_id: None,
                    round_id: ctx.round_id.map(str::to_string),
                    note: Some(format!("{} impact", def.name)),
                    created_at: ctx.now,
                    source: EntrySource::RuleEngine,
                });
            }
        }

        refresh.objects.push(RefreshedObject {
            value: refreshed,
            state,
            score_impact,
        });
    }

    refresh
}
