//! Game state snapshot and evaluation context
//!
//! [`GameState`] is everything the engine reads. [`EvaluationContext`] pins
//! down one evaluation within it: which session, which player, which round,
//! and the instant used to stamp any entries produced.

use crate::model::{
    CategoryDefinition, ObjectDefinition, ObjectValue, ScoreEntry, ScoringRule, Session, Template,
};
use crate::{ResourceLimits, TallyError, TallyResult};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

static DEFAULT_LIMITS: ResourceLimits = ResourceLimits::DEFAULT;

/// Read-only snapshot of the scorekeeping store
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GameState {
    #[serde(default)]
    pub sessions: Vec<Session>,
    #[serde(default)]
    pub templates: Vec<Template>,
    #[serde(default)]
    pub categories: Vec<CategoryDefinition>,
    #[serde(default)]
    pub entries: Vec<ScoreEntry>,
    #[serde(default)]
    pub object_values: Vec<ObjectValue>,
    #[serde(default)]
    pub rules: Vec<ScoringRule>,
}

impl GameState {
    pub fn from_json(json: &str) -> TallyResult<Self> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn session(&self, session_id: &str) -> Option<&Session> {
        self.sessions.iter().find(|s| s.id == session_id)
    }

    pub fn template(&self, template_id: &str) -> Option<&Template> {
        self.templates.iter().find(|t| t.id == template_id)
    }

    pub fn template_for(&self, session: &Session) -> Option<&Template> {
        session
            .template_id
            .as_deref()
            .and_then(|id| self.template(id))
    }

    /// Category definitions of a session, in definition order
    pub fn categories_for<'s>(
        &'s self,
        session_id: &'s str,
    ) -> impl Iterator<Item = &'s CategoryDefinition> + 's {
        self.categories
            .iter()
            .filter(move |c| c.session_id == session_id)
    }

    pub fn entries_for<'s>(&'s self, session_id: &'s str) -> impl Iterator<Item = &'s ScoreEntry> + 's {
        self.entries.iter().filter(move |e| e.session_id == session_id)
    }

    pub fn rules_for<'s>(&'s self, session_id: &'s str) -> impl Iterator<Item = &'s ScoringRule> + 's {
        self.rules.iter().filter(move |r| r.session_id == session_id)
    }

    pub fn object_values_for<'s>(
        &'s self,
        session_id: &'s str,
    ) -> impl Iterator<Item = &'s ObjectValue> + 's {
        self.object_values
            .iter()
            .filter(move |v| v.session_id == session_id)
    }

    /// Players of a session: the roster, or everyone with an entry when the
    /// roster is empty
    pub fn players_for(&self, session: &Session) -> Vec<String> {
        if !session.player_ids.is_empty() {
            return session.player_ids.clone();
        }
        let mut players: Vec<String> = Vec::new();
        for entry in self.entries_for(&session.id) {
            if !players.contains(&entry.player_id) {
                players.push(entry.player_id.clone());
            }
        }
        players
    }
}

/// Find the instance of an object, preferring the player's own instance and
/// falling back to the session-wide one
pub fn find_object_value<'v>(
    values: &'v [ObjectValue],
    session_id: &str,
    definition_id: &str,
    player_id: Option<&str>,
) -> Option<&'v ObjectValue> {
    let in_scope = |scope: Option<&str>| {
        values.iter().find(|v| {
            v.session_id == session_id
                && v.object_definition_id == definition_id
                && v.player_id.as_deref() == scope
        })
    };
    player_id.and_then(|p| in_scope(Some(p))).or_else(|| in_scope(None))
}

/// One evaluation within a [`GameState`]
#[derive(Debug, Clone, Copy)]
pub struct EvaluationContext<'a> {
    pub state: &'a GameState,
    pub session: &'a Session,
    /// Template of the session, when it has one and the template exists
    pub template: Option<&'a Template>,
    pub player_id: Option<&'a str>,
    pub round_id: Option<&'a str>,
    /// Timestamp for entries produced by this evaluation
    pub now: DateTime<Utc>,
    pub limits: &'a ResourceLimits,
}

impl<'a> EvaluationContext<'a> {
    /// Context for a whole session, with no player or round selected
    pub fn new(state: &'a GameState, session_id: &str) -> TallyResult<Self> {
        let session = state
            .session(session_id)
            .ok_or_else(|| TallyError::Engine(format!("Session '{}' not found", session_id)))?;
        Ok(Self {
            state,
            session,
            template: state.template_for(session),
            player_id: None,
            round_id: None,
            now: Utc::now(),
            limits: &DEFAULT_LIMITS,
        })
    }

    pub fn for_player(self, player_id: &'a str) -> Self {
        Self {
            player_id: Some(player_id),
            ..self
        }
    }

    pub fn in_round(self, round_id: Option<&'a str>) -> Self {
        Self { round_id, ..self }
    }

    pub fn at(self, now: DateTime<Utc>) -> Self {
        Self { now, ..self }
    }

    pub fn with_limits(self, limits: &'a ResourceLimits) -> Self {
        Self { limits, ..self }
    }

    pub fn session_id(&self) -> &'a str {
        &self.session.id
    }

    /// Index of the selected round, if it exists in the session
    pub fn round_index(&self) -> Option<usize> {
        let round_id = self.round_id?;
        self.session.round(round_id).map(|r| r.index)
    }

    /// Object definitions come from the session's template
    pub fn object_definitions(&self) -> &'a [ObjectDefinition] {
        match self.template {
            Some(template) => &template.object_definitions,
            None => &[],
        }
    }

    pub fn object_definition(&self, id: &str) -> Option<&'a ObjectDefinition> {
        self.object_definitions().iter().find(|d| d.id == id)
    }

    /// Look up an object by case-insensitive name, then by id
    pub fn find_object_definition(&self, name_or_id: &str) -> Option<&'a ObjectDefinition> {
        let definitions = self.object_definitions();
        definitions
            .iter()
            .find(|d| d.name.eq_ignore_ascii_case(name_or_id))
            .or_else(|| definitions.iter().find(|d| d.id == name_or_id))
    }

    /// Look up a category by case-insensitive name, then by id
    pub fn find_category(&self, name_or_id: &str) -> Option<&'a CategoryDefinition> {
        let state = self.state;
        let session_id = self.session_id();
        state
            .categories_for(session_id)
            .find(|c| c.name.eq_ignore_ascii_case(name_or_id))
            .or_else(|| state.categories_for(session_id).find(|c| c.id == name_or_id))
    }

    /// Instance of a definition for the selected player, or the session-wide one
    pub fn object_value(&self, definition_id: &str) -> Option<&'a ObjectValue> {
        find_object_value(
            &self.state.object_values,
            self.session_id(),
            definition_id,
            self.player_id,
        )
    }
}
