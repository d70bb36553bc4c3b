//! Formula resolver backed by game state

use crate::aggregation::CategoryTotals;
use crate::context::{find_object_value, EvaluationContext};
use crate::formula::{ContextFunction, Resolver};
use crate::model::{ObjectState, ObjectValue};
use crate::objects;

/// Resolves formula references against one evaluation context.
///
/// Category references read from `totals`, which is whatever the calling
/// pass has computed so far. Object references read from `objects`, which
/// may be the refreshed instances of the current pass.
pub struct GameResolver<'a> {
    ctx: EvaluationContext<'a>,
    totals: &'a CategoryTotals,
    objects: &'a [ObjectValue],
}

impl<'a> GameResolver<'a> {
    pub fn new(
        ctx: EvaluationContext<'a>,
        totals: &'a CategoryTotals,
        objects: &'a [ObjectValue],
    ) -> Self {
        Self {
            ctx,
            totals,
            objects,
        }
    }

    fn instance(&self, definition_id: &str, player_id: Option<&str>) -> Option<&'a ObjectValue> {
        find_object_value(
            self.objects,
            self.ctx.session_id(),
            definition_id,
            player_id,
        )
    }
}

impl Resolver for GameResolver<'_> {
    fn object_value(&self, name: &str) -> Option<f64> {
        let definition = self.ctx.find_object_definition(name)?;
        self.instance(&definition.id, self.ctx.player_id)?.numeric()
    }

    fn category_total(&self, name: &str) -> Option<f64> {
        match self.ctx.find_category(name) {
            Some(category) => self.totals.get(&category.id).copied(),
            None => self.totals.get(name).copied(),
        }
    }

    fn grand_total(&self) -> Option<f64> {
        Some(self.totals.values().sum())
    }

    fn provides(&self, _function: ContextFunction) -> bool {
        true
    }

    fn object_state(&self, name: &str) -> Option<ObjectState> {
        let definition = self.ctx.find_object_definition(name)?;
        let value = self.instance(&definition.id, self.ctx.player_id);
        Some(objects::evaluate_state(definition, value, &self.ctx))
    }

    fn owns(&self, name: &str, player_id: Option<&str>) -> bool {
        let Some(definition) = self.ctx.find_object_definition(name) else {
            return false;
        };
        let Some(player) = player_id.or(self.ctx.player_id) else {
            return false;
        };
        let value = self.instance(&definition.id, Some(player));
        let scoped = self.ctx.for_player(player);
        objects::evaluate_state(definition, value, &scoped) == ObjectState::Owned
    }

    fn round_index(&self) -> Option<usize> {
        self.ctx.round_index()
    }

    // Phases are not tracked yet
    fn phase_id(&self) -> Option<String> {
        None
    }
}
