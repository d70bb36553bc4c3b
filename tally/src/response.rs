use crate::aggregation::CategoryTotals;
use crate::model::{ScoreEntry, WinCondition};
use crate::objects::RefreshedObject;
use serde::Serialize;

/// Totals for every player of a session
///
/// Standings follow the session roster. `winners` lists every player tied
/// for the best total under the session's win condition.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Scoreboard {
    pub session_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub round_id: Option<String>,
    pub win_condition: WinCondition,
    pub standings: Vec<PlayerStanding>,
    pub winners: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PlayerStanding {
    pub player_id: String,
    pub categories: CategoryTotals,
    pub total: f64,
}

impl Scoreboard {
    pub fn standing(&self, player_id: &str) -> Option<&PlayerStanding> {
        self.standings.iter().find(|s| s.player_id == player_id)
    }
}

/// What one evaluation cycle produced
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CycleOutcome {
    /// The manual entry that triggered the cycle
    #[serde(skip_serializing_if = "Option::is_none")]
    pub trigger_entry_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub player_id: Option<String>,
    /// Rule entries for the caller to append, after duplicate suppression
    pub entries: Vec<ScoreEntry>,
    /// Object score-impact entries for the caller to append, after
    /// duplicate suppression. They count from the next cycle on.
    pub impact_entries: Vec<ScoreEntry>,
    /// Refreshed session-wide instances and the trigger player's own, for
    /// the caller to write back to its object store
    pub objects: Vec<RefreshedObject>,
    /// Candidates dropped as duplicates
    pub suppressed: usize,
}

impl CycleOutcome {
    /// A cycle with no trigger
    pub fn idle() -> Self {
        Self::default()
    }

    pub fn is_idle(&self) -> bool {
        self.trigger_entry_id.is_none()
    }
}

/// Dry-run result of a single rule
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RuleTest {
    pub rule_id: String,
    pub would_trigger: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub entry: Option<ScoreEntry>,
}
