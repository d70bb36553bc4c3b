//! Session data consumed by the engine
//!
//! These types mirror the snapshot the scorekeeping app keeps in its store,
//! so they deserialize from its JSON export directly. The engine only reads
//! them; new entries are returned for the caller to append.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Bucket for entries recorded without a category
pub const UNCATEGORIZED: &str = "uncategorized";

/// Tolerance for comparing scores
pub const EPSILON: f64 = 0.001;

/// Who created a ledger entry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum EntrySource {
    #[default]
    Manual,
    RuleEngine,
}

/// An immutable scoring fact in the ledger
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScoreEntry {
    pub id: String,
    pub session_id: String,
    pub player_id: String,
    pub value: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub round_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub source: EntrySource,
}

impl ScoreEntry {
    /// A manual entry with no category, round or note
    pub fn manual(
        id: impl Into<String>,
        session_id: impl Into<String>,
        player_id: impl Into<String>,
        value: f64,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id: id.into(),
            session_id: session_id.into(),
            player_id: player_id.into(),
            value,
            category_id: None,
            round_id: None,
            note: None,
            created_at,
            source: EntrySource::Manual,
        }
    }

    pub fn in_category(mut self, category_id: impl Into<String>) -> Self {
        self.category_id = Some(category_id.into());
        self
    }

    pub fn in_round(mut self, round_id: impl Into<String>) -> Self {
        self.round_id = Some(round_id.into());
        self
    }

    pub fn with_note(mut self, note: impl Into<String>) -> Self {
        self.note = Some(note.into());
        self
    }

    /// Category key used for aggregation
    pub fn category_key(&self) -> &str {
        self.category_id.as_deref().unwrap_or(UNCATEGORIZED)
    }
}

/// Which aggregation pass rewrites a category's total
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum DisplayType {
    #[default]
    Sum,
    Formula,
    Weighted,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CategoryDefinition {
    pub id: String,
    pub session_id: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent_category_id: Option<String>,
    #[serde(default)]
    pub display_type: DisplayType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub formula: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub weight: Option<f64>,
}

impl CategoryDefinition {
    /// A plain summing category
    pub fn new(
        id: impl Into<String>,
        session_id: impl Into<String>,
        name: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            session_id: session_id.into(),
            name: name.into(),
            parent_category_id: None,
            display_type: DisplayType::Sum,
            formula: None,
            weight: None,
        }
    }

    pub fn child_of(mut self, parent_id: impl Into<String>) -> Self {
        self.parent_category_id = Some(parent_id.into());
        self
    }

    pub fn with_formula(mut self, formula: impl Into<String>) -> Self {
        self.display_type = DisplayType::Formula;
        self.formula = Some(formula.into());
        self
    }

    pub fn weighted(mut self, weight: f64) -> Self {
        self.display_type = DisplayType::Weighted;
        self.weight = Some(weight);
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ObjectType {
    #[default]
    Number,
    Boolean,
    String,
    Set,
    Custom,
}

/// How a set object stores its contents
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SetType {
    /// Interchangeable pieces; the value is a count
    Identical,
    /// Distinct elements; the value maps element id to quantity
    Elements,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SetElement {
    pub id: String,
    pub name: String,
}

/// Who an object belongs to
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(try_from = "ScopeRepr", into = "ScopeRepr")]
pub enum Ownership {
    /// One shared instance for the whole session
    #[default]
    Global,
    /// One instance per player
    Player,
    /// Exists but belongs to nobody
    Inactive,
    /// Follows the ownership of another object while that object is live
    Object { object_id: String },
}

/// When an object takes part in scoring
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(try_from = "ScopeRepr", into = "ScopeRepr")]
pub enum ActiveWindow {
    #[default]
    Always,
    Round {
        round_id: Option<String>,
        round_index: Option<usize>,
    },
    /// Placeholder until phases exist; see `objects::evaluate_active_window`
    Phase { phase_id: Option<String> },
    Object { object_id: String },
}

/// Wire form shared by ownership and active window: a bare keyword or an
/// object with a `type` discriminant
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
enum ScopeRepr {
    Keyword(String),
    Tagged(TaggedScope),
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct TaggedScope {
    #[serde(rename = "type")]
    kind: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    object_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    round_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    round_index: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    phase_id: Option<String>,
}

impl TaggedScope {
    fn object(object_id: String) -> Self {
        Self {
            kind: "object".to_string(),
            object_id: Some(object_id),
            ..Self::default()
        }
    }

    fn require_object_id(self) -> Result<String, String> {
        self.object_id
            .ok_or_else(|| "an object reference needs an objectId".to_string())
    }
}

impl TryFrom<ScopeRepr> for Ownership {
    type Error = String;

    fn try_from(repr: ScopeRepr) -> Result<Self, Self::Error> {
        match repr {
            ScopeRepr::Keyword(keyword) => match keyword.as_str() {
                "global" => Ok(Ownership::Global),
                "player" => Ok(Ownership::Player),
                "inactive" => Ok(Ownership::Inactive),
                other => Err(format!("unknown ownership '{}'", other)),
            },
            ScopeRepr::Tagged(tagged) if tagged.kind == "object" => Ok(Ownership::Object {
                object_id: tagged.require_object_id()?,
            }),
            ScopeRepr::Tagged(tagged) => Err(format!("unknown ownership type '{}'", tagged.kind)),
        }
    }
}

impl From<Ownership> for ScopeRepr {
    fn from(ownership: Ownership) -> Self {
        match ownership {
            Ownership::Global => ScopeRepr::Keyword("global".to_string()),
            Ownership::Player => ScopeRepr::Keyword("player".to_string()),
            Ownership::Inactive => ScopeRepr::Keyword("inactive".to_string()),
            Ownership::Object { object_id } => ScopeRepr::Tagged(TaggedScope::object(object_id)),
        }
    }
}

impl TryFrom<ScopeRepr> for ActiveWindow {
    type Error = String;

    fn try_from(repr: ScopeRepr) -> Result<Self, Self::Error> {
        match repr {
            ScopeRepr::Keyword(keyword) if keyword == "always" => Ok(ActiveWindow::Always),
            ScopeRepr::Keyword(other) => Err(format!("unknown active window '{}'", other)),
            ScopeRepr::Tagged(tagged) => match tagged.kind.as_str() {
                "round" => Ok(ActiveWindow::Round {
                    round_id: tagged.round_id,
                    round_index: tagged.round_index,
                }),
                "phase" => Ok(ActiveWindow::Phase {
                    phase_id: tagged.phase_id,
                }),
                "object" => Ok(ActiveWindow::Object {
                    object_id: tagged.require_object_id()?,
                }),
                other => Err(format!("unknown active window type '{}'", other)),
            },
        }
    }
}

impl From<ActiveWindow> for ScopeRepr {
    fn from(window: ActiveWindow) -> Self {
        match window {
            ActiveWindow::Always => ScopeRepr::Keyword("always".to_string()),
            ActiveWindow::Round {
                round_id,
                round_index,
            } => ScopeRepr::Tagged(TaggedScope {
                kind: "round".to_string(),
                round_id,
                round_index,
                ..TaggedScope::default()
            }),
            ActiveWindow::Phase { phase_id } => ScopeRepr::Tagged(TaggedScope {
                kind: "phase".to_string(),
                phase_id,
                ..TaggedScope::default()
            }),
            ActiveWindow::Object { object_id } => ScopeRepr::Tagged(TaggedScope::object(object_id)),
        }
    }
}

/// Lifecycle state of an object instance
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum ObjectState {
    Inactive,
    Active,
    Owned,
    Discarded,
    /// Template-specific state the engine carries but does not interpret
    Custom(String),
}

impl ObjectState {
    /// Numeric encoding returned by `state()` in formulas
    pub fn code(&self) -> f64 {
        match self {
            ObjectState::Inactive => 0.0,
            ObjectState::Active => 1.0,
            ObjectState::Owned => 2.0,
            ObjectState::Discarded => -1.0,
            ObjectState::Custom(_) => 0.0,
        }
    }

    /// Active or owned
    pub fn is_live(&self) -> bool {
        matches!(self, ObjectState::Active | ObjectState::Owned)
    }

    pub fn as_str(&self) -> &str {
        match self {
            ObjectState::Inactive => "inactive",
            ObjectState::Active => "active",
            ObjectState::Owned => "owned",
            ObjectState::Discarded => "discarded",
            ObjectState::Custom(name) => name,
        }
    }
}

impl From<String> for ObjectState {
    fn from(value: String) -> Self {
        match value.as_str() {
            "inactive" => ObjectState::Inactive,
            "active" => ObjectState::Active,
            "owned" => ObjectState::Owned,
            "discarded" => ObjectState::Discarded,
            _ => ObjectState::Custom(value),
        }
    }
}

impl From<ObjectState> for String {
    fn from(state: ObjectState) -> Self {
        state.as_str().to_string()
    }
}

impl fmt::Display for ObjectState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Stored value of an object instance
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(untagged)]
pub enum VariableValue {
    #[default]
    Null,
    Boolean(bool),
    Number(f64),
    Text(String),
    /// Element id → quantity, for element sets
    Elements(BTreeMap<String, f64>),
}

impl VariableValue {
    /// Numeric reading used by formulas.
    ///
    /// Identical sets store their count as a number; element sets read as
    /// the sum of their quantities.
    pub fn as_number(&self) -> Option<f64> {
        match self {
            VariableValue::Null => None,
            VariableValue::Boolean(b) => Some(if *b { 1.0 } else { 0.0 }),
            VariableValue::Number(n) => Some(*n),
            VariableValue::Text(text) => text.trim().parse().ok(),
            VariableValue::Elements(elements) => Some(elements.values().sum()),
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, VariableValue::Null)
    }

    pub fn type_name(&self) -> &'static str {
        match self {
            VariableValue::Null => "null",
            VariableValue::Boolean(_) => "boolean",
            VariableValue::Number(_) => "number",
            VariableValue::Text(_) => "string",
            VariableValue::Elements(_) => "set",
        }
    }
}

/// Template-level descriptor of a stateful game element
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ObjectDefinition {
    pub id: String,
    pub name: String,
    #[serde(rename = "type", default)]
    pub object_type: ObjectType,
    #[serde(default)]
    pub ownership: Ownership,
    #[serde(default)]
    pub active_window: ActiveWindow,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub calculation: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub score_impact: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub set_type: Option<SetType>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub set_elements: Vec<SetElement>,
    #[serde(default, skip_serializing_if = "VariableValue::is_null")]
    pub default_value: VariableValue,
}

impl ObjectDefinition {
    /// A global number object with no formulas
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            object_type: ObjectType::Number,
            ownership: Ownership::Global,
            active_window: ActiveWindow::Always,
            calculation: None,
            score_impact: None,
            min: None,
            max: None,
            set_type: None,
            set_elements: Vec::new(),
            default_value: VariableValue::Null,
        }
    }

    pub fn owned_by(mut self, ownership: Ownership) -> Self {
        self.ownership = ownership;
        self
    }

    pub fn active_during(mut self, window: ActiveWindow) -> Self {
        self.active_window = window;
        self
    }

    pub fn calculated(mut self, formula: impl Into<String>) -> Self {
        self.calculation = Some(formula.into());
        self
    }

    pub fn with_score_impact(mut self, formula: impl Into<String>) -> Self {
        self.score_impact = Some(formula.into());
        self
    }

    pub fn matches(&self, name_or_id: &str) -> bool {
        self.name.eq_ignore_ascii_case(name_or_id) || self.id == name_or_id
    }
}

/// A concrete object instance within a session
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ObjectValue {
    pub id: String,
    pub session_id: String,
    pub object_definition_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub player_id: Option<String>,
    #[serde(default)]
    pub value: VariableValue,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub computed_value: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub state: Option<ObjectState>,
    pub updated_at: DateTime<Utc>,
    #[serde(default)]
    pub updated_by: String,
}

impl ObjectValue {
    pub fn new(
        id: impl Into<String>,
        session_id: impl Into<String>,
        object_definition_id: impl Into<String>,
        value: VariableValue,
        updated_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id: id.into(),
            session_id: session_id.into(),
            object_definition_id: object_definition_id.into(),
            player_id: None,
            value,
            computed_value: None,
            state: None,
            updated_at,
            updated_by: "system".to_string(),
        }
    }

    pub fn for_player(mut self, player_id: impl Into<String>) -> Self {
        self.player_id = Some(player_id.into());
        self
    }

    pub fn with_state(mut self, state: ObjectState) -> Self {
        self.state = Some(state);
        self
    }

    /// Computed value when present, else the stored value read as a number
    pub fn numeric(&self) -> Option<f64> {
        self.computed_value.or_else(|| self.value.as_number())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ConditionKind {
    /// Player total across all categories
    Total,
    /// A category total, or an object value by name or id
    Category,
    /// Number of the player's entries in a round
    Round,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Comparison {
    #[serde(rename = ">=")]
    GreaterOrEqual,
    #[serde(rename = "<=")]
    LessOrEqual,
    #[serde(rename = "==")]
    Equal,
    #[serde(rename = "!=")]
    NotEqual,
    #[serde(rename = ">")]
    Greater,
    #[serde(rename = "<")]
    Less,
}

impl Comparison {
    /// Compare with [`EPSILON`] tolerance for equality
    pub fn compare(&self, left: f64, right: f64) -> bool {
        match self {
            Comparison::GreaterOrEqual => left >= right,
            Comparison::LessOrEqual => left <= right,
            Comparison::Equal => (left - right).abs() < EPSILON,
            Comparison::NotEqual => (left - right).abs() >= EPSILON,
            Comparison::Greater => left > right,
            Comparison::Less => left < right,
        }
    }

    pub fn symbol(&self) -> &'static str {
        match self {
            Comparison::GreaterOrEqual => ">=",
            Comparison::LessOrEqual => "<=",
            Comparison::Equal => "==",
            Comparison::NotEqual => "!=",
            Comparison::Greater => ">",
            Comparison::Less => "<",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RuleCondition {
    #[serde(rename = "type")]
    pub kind: ConditionKind,
    pub operator: Comparison,
    pub value: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub round_id: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ActionKind {
    Add,
    Multiply,
    Set,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RuleAction {
    #[serde(rename = "type")]
    pub kind: ActionKind,
    pub value: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target_category_id: Option<String>,
}

fn enabled_by_default() -> bool {
    true
}

/// A rule attached to a session
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScoringRule {
    pub id: String,
    pub session_id: String,
    pub name: String,
    pub condition: RuleCondition,
    pub action: RuleAction,
    #[serde(default = "enabled_by_default")]
    pub enabled: bool,
    /// Template rule this copy was made from
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub template_rule_id: Option<String>,
}

/// A rule as defined on a template
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RuleTemplate {
    pub id: String,
    pub name: String,
    pub condition: RuleCondition,
    pub action: RuleAction,
    #[serde(default = "enabled_by_default")]
    pub enabled: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum WinCondition {
    #[default]
    HigherWins,
    LowerWins,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Round {
    pub id: String,
    pub index: usize,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Session {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub template_id: Option<String>,
    #[serde(default)]
    pub player_ids: Vec<String>,
    #[serde(default)]
    pub rounds_enabled: bool,
    #[serde(default)]
    pub rounds: Vec<Round>,
    #[serde(default)]
    pub win_condition: WinCondition,
}

impl Session {
    pub fn new(id: impl Into<String>, player_ids: &[&str]) -> Self {
        Self {
            id: id.into(),
            template_id: None,
            player_ids: player_ids.iter().map(|p| p.to_string()).collect(),
            rounds_enabled: false,
            rounds: Vec::new(),
            win_condition: WinCondition::HigherWins,
        }
    }

    pub fn round(&self, round_id: &str) -> Option<&Round> {
        self.rounds.iter().find(|r| r.id == round_id)
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Template {
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub object_definitions: Vec<ObjectDefinition>,
    #[serde(default)]
    pub rules: Vec<RuleTemplate>,
    #[serde(default)]
    pub phases_enabled: bool,
}
