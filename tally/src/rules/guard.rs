//! Re-entrancy protection for the rule engine
//!
//! Rule entries land in the same ledger the rules read, so an evaluation
//! cycle could otherwise feed on its own output. Two checks stop that: only
//! a manual entry can trigger a cycle, and a candidate that matches a
//! recent entry is dropped.

use crate::context::GameState;
use crate::model::{EntrySource, ScoreEntry, EPSILON};
use chrono::Duration;
use tracing::debug;

/// Drops rule entries that repeat a recent entry
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DuplicateGuard {
    window: Duration,
}

impl Default for DuplicateGuard {
    fn default() -> Self {
        Self {
            window: Duration::seconds(1),
        }
    }
}

impl DuplicateGuard {
    pub fn new(window: Duration) -> Self {
        Self { window }
    }

    pub fn window(&self) -> Duration {
        self.window
    }

    /// Same session, player, value, category and note, created within the window
    pub fn is_duplicate(&self, candidate: &ScoreEntry, existing: &ScoreEntry) -> bool {
        candidate.session_id == existing.session_id
            && candidate.player_id == existing.player_id
            && candidate.category_id == existing.category_id
            && candidate.note == existing.note
            && (candidate.value - existing.value).abs() < EPSILON
            && (candidate.created_at - existing.created_at).abs() <= self.window
    }

    /// Candidates that duplicate neither an existing entry nor an earlier
    /// admitted candidate
    pub fn admit(&self, candidates: Vec<ScoreEntry>, existing: &[ScoreEntry]) -> Vec<ScoreEntry> {
        let mut admitted: Vec<ScoreEntry> = Vec::with_capacity(candidates.len());
        for candidate in candidates {
            let duplicate = existing
                .iter()
                .chain(admitted.iter())
                .any(|entry| self.is_duplicate(&candidate, entry));
            if duplicate {
                debug!(
                    player = %candidate.player_id,
                    note = candidate.note.as_deref().unwrap_or(""),
                    "suppressed duplicate rule entry"
                );
                continue;
            }
            admitted.push(candidate);
        }
        admitted
    }
}

/// The entry that triggers an evaluation cycle.
///
/// That is the session's most recent entry, and only when it was entered
/// manually. A rule-generated entry never triggers another cycle.
pub fn find_trigger<'s>(state: &'s GameState, session_id: &str) -> Option<&'s ScoreEntry> {
    state
        .entries
        .iter()
        .filter(|e| e.session_id == session_id)
        .max_by_key(|e| e.created_at)
        .filter(|e| e.source == EntrySource::Manual)
}
