use crate::aggregation::{self, CategoryTotals};
use crate::context::{EvaluationContext, GameState};
use crate::formula::{self, Resolver};
use crate::model::ScoreEntry;
use crate::objects;
use crate::response::{CycleOutcome, PlayerStanding, RuleTest, Scoreboard};
use crate::rules::{self, find_trigger, DuplicateGuard};
use crate::validator::{Issue, Validator};
use crate::{ResourceLimits, TallyError, TallyResult};
use chrono::{DateTime, Duration, Utc};
use std::collections::BTreeMap;
use tracing::debug;

/// The Tally scoring engine.
///
/// Holds configuration only. Every call reads the [`GameState`] it is
/// given and returns new values; the caller persists any entries.
#[derive(Debug, Clone, Default)]
pub struct Engine {
    validator_enabled: bool,
    limits: ResourceLimits,
    guard: DuplicateGuard,
}

impl Engine {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an engine with custom resource limits
    pub fn with_limits(limits: ResourceLimits) -> Self {
        Self {
            limits,
            ..Self::default()
        }
    }

    /// Change how close in time two identical rule entries must be to
    /// count as duplicates
    pub fn with_duplicate_window(mut self, window: Duration) -> Self {
        self.guard = DuplicateGuard::new(window);
        self
    }

    /// Refuse to score sessions that fail static validation
    pub fn strict(mut self) -> Self {
        self.validator_enabled = true;
        self
    }

    /// Get the current resource limits
    pub fn limits(&self) -> &ResourceLimits {
        &self.limits
    }

    pub fn duplicate_guard(&self) -> &DuplicateGuard {
        &self.guard
    }

    /// Context for a session, carrying this engine's limits
    pub fn context<'a>(&'a self, state: &'a GameState, session_id: &str) -> TallyResult<EvaluationContext<'a>> {
        let ctx = EvaluationContext::new(state, session_id)?.with_limits(&self.limits);
        if self.validator_enabled {
            let issues = Validator::new().check_session(state, ctx.session);
            if !issues.is_empty() {
                return Err(issues_to_error(issues));
            }
        }
        Ok(ctx)
    }

    /// Evaluate a standalone formula
    pub fn evaluate_formula(&self, formula_text: &str, resolver: &dyn Resolver) -> TallyResult<f64> {
        formula::evaluate_with_limits(formula_text, resolver, &self.limits)
    }

    pub fn category_totals(
        &self,
        state: &GameState,
        session_id: &str,
        player_id: &str,
        round_id: Option<&str>,
    ) -> TallyResult<CategoryTotals> {
        let ctx = self
            .context(state, session_id)?
            .for_player(player_id)
            .in_round(round_id);
        Ok(aggregation::compute_category_totals(&ctx))
    }

    /// Totals for every player and the current winners
    pub fn scoreboard(
        &self,
        state: &GameState,
        session_id: &str,
        round_id: Option<&str>,
    ) -> TallyResult<Scoreboard> {
        let ctx = self.context(state, session_id)?.in_round(round_id);
        let players = state.players_for(ctx.session);

        let mut standings = Vec::with_capacity(players.len());
        let mut totals = BTreeMap::new();
        for player_id in &players {
            let categories = aggregation::compute_category_totals(&ctx.for_player(player_id));
            let total: f64 = categories.values().sum();
            totals.insert(player_id.clone(), total);
            standings.push(PlayerStanding {
                player_id: player_id.clone(),
                categories,
                total,
            });
        }

        Ok(Scoreboard {
            session_id: session_id.to_string(),
            round_id: round_id.map(str::to_string),
            win_condition: ctx.session.win_condition,
            winners: aggregation::find_winners(&totals, ctx.session.win_condition),
            standings,
        })
    }

    /// Rule entries for one player, without trigger scoping or duplicate
    /// suppression
    pub fn evaluate_rules(
        &self,
        state: &GameState,
        session_id: &str,
        player_id: &str,
        round_id: Option<&str>,
    ) -> TallyResult<Vec<ScoreEntry>> {
        let ctx = self
            .context(state, session_id)?
            .for_player(player_id)
            .in_round(round_id);
        Ok(rules::evaluate_rules(&ctx))
    }

    /// Dry-run a session rule by id for a player
    pub fn test_rule(
        &self,
        state: &GameState,
        session_id: &str,
        rule_id: &str,
        player_id: &str,
        round_id: Option<&str>,
    ) -> TallyResult<RuleTest> {
        let ctx = self
            .context(state, session_id)?
            .for_player(player_id)
            .in_round(round_id);
        let rule = state
            .rules_for(session_id)
            .find(|r| r.id == rule_id)
            .ok_or_else(|| TallyError::Engine(format!("Rule '{}' not found", rule_id)))?;
        rules::test_rule(rule, &ctx)
    }

    /// Run one evaluation cycle at the current time
    pub fn run_cycle(&self, state: &GameState, session_id: &str) -> TallyResult<CycleOutcome> {
        self.run_cycle_at(state, session_id, Utc::now())
    }

    /// Run one evaluation cycle.
    ///
    /// Only a manual latest entry triggers a cycle. Rules are evaluated for
    /// the triggering player in the trigger's round, and candidates that
    /// repeat a recent entry are dropped. The trigger player's object
    /// score impacts go through the same duplicate check; they are computed
    /// before the caller appends them, so they count from the next cycle.
    pub fn run_cycle_at(
        &self,
        state: &GameState,
        session_id: &str,
        now: DateTime<Utc>,
    ) -> TallyResult<CycleOutcome> {
        let ctx = self.context(state, session_id)?.at(now);
        let Some(trigger) = find_trigger(state, session_id) else {
            debug!(session = session_id, "latest entry is not manual; nothing to evaluate");
            return Ok(CycleOutcome::idle());
        };

        let player_id = trigger.player_id.as_str();
        let ctx = ctx.for_player(player_id).in_round(trigger.round_id.as_deref());

        let candidates = rules::evaluate_rules(&ctx);
        let rule_count = candidates.len();
        let entries = self.guard.admit(candidates, &state.entries);

        let refresh = objects::refresh_objects(&ctx);
        let impacts: Vec<ScoreEntry> = refresh
            .impact_entries
            .into_iter()
            .filter(|entry| entry.player_id == player_id)
            .collect();
        let impact_count = impacts.len();
        let mut seen = state.entries.clone();
        seen.extend(entries.iter().cloned());
        let impact_entries = self.guard.admit(impacts, &seen);

        let objects = refresh
            .objects
            .into_iter()
            .filter(|object| {
                object
                    .value
                    .player_id
                    .as_deref()
                    .is_none_or(|owner| owner == player_id)
            })
            .collect();

        Ok(CycleOutcome {
            trigger_entry_id: Some(trigger.id.clone()),
            player_id: Some(trigger.player_id.clone()),
            suppressed: (rule_count - entries.len()) + (impact_count - impact_entries.len()),
            entries,
            impact_entries,
            objects,
        })
    }

    /// Static checks over every session in the snapshot
    pub fn check(&self, state: &GameState) -> Vec<Issue> {
        Validator::new().check_state(state)
    }
}

fn issues_to_error(issues: Vec<Issue>) -> TallyError {
    let mut errors: Vec<TallyError> = issues
        .into_iter()
        .map(|issue| TallyError::Engine(format!("{}: {}", issue.location, issue.message)))
        .collect();
    if errors.len() == 1 {
        errors.remove(0)
    } else {
        TallyError::MultipleErrors(errors)
    }
}
