use super::fixtures::*;
use crate::formula::StaticResolver;
use crate::model::*;
use crate::{Engine, ResourceLimits, TallyError};
use chrono::Duration;

fn bonus_rule() -> ScoringRule {
    session_rule(
        "r1",
        "Bonus",
        condition(ConditionKind::Total, Comparison::GreaterOrEqual, 10.0),
        action(ActionKind::Add, 5.0, None),
    )
}

#[test]
fn test_scoreboard_standings_and_winners() {
    let state = GameBuilder::new(&["p1", "p2", "p3"])
        .category("c1", "Cities")
        .entry("p1", 4.0, Some("c1"), 0)
        .entry("p2", 6.0, Some("c1"), 1)
        .entry("p3", 6.0, None, 2)
        .build();
    let board = Engine::new().scoreboard(&state, SESSION, None).unwrap();

    assert_eq!(board.standings.len(), 3);
    assert_eq!(board.standing("p1").unwrap().total, 4.0);
    assert_eq!(board.standing("p2").unwrap().categories.get("c1"), Some(&6.0));
    assert_eq!(board.winners, vec!["p2".to_string(), "p3".to_string()]);
    assert_eq!(board.win_condition, WinCondition::HigherWins);
}

#[test]
fn test_scoreboard_lower_wins() {
    let state = GameBuilder::new(&["p1", "p2"])
        .lower_wins()
        .entry("p1", 40.0, None, 0)
        .entry("p2", 12.0, None, 1)
        .build();
    let board = Engine::new().scoreboard(&state, SESSION, None).unwrap();
    assert_eq!(board.winners, vec!["p2".to_string()]);
}

#[test]
fn test_scoreboard_for_a_round() {
    let state = GameBuilder::new(&["p1", "p2"])
        .rounds(&["r1", "r2"])
        .entry_in_round("p1", 10.0, None, Some("r1"), 0)
        .entry_in_round("p2", 3.0, None, Some("r1"), 1)
        .entry_in_round("p2", 5.0, None, Some("r2"), 2)
        .build();
    let board = Engine::new().scoreboard(&state, SESSION, Some("r2")).unwrap();

    assert_eq!(board.round_id.as_deref(), Some("r2"));
    assert_eq!(board.standing("p1").unwrap().total, 0.0);
    assert_eq!(board.winners, vec!["p2".to_string()]);
}

#[test]
fn test_scoreboard_without_roster_uses_entry_players() {
    let mut state = GameBuilder::new(&[])
        .entry("p9", 1.0, None, 0)
        .entry("p8", 2.0, None, 1)
        .build();
    state.sessions[0].player_ids.clear();
    let board = Engine::new().scoreboard(&state, SESSION, None).unwrap();
    let players: Vec<&str> = board.standings.iter().map(|s| s.player_id.as_str()).collect();
    assert_eq!(players, vec!["p9", "p8"]);
}

#[test]
fn test_unknown_session() {
    let state = GameBuilder::new(&["p1"]).build();
    let err = Engine::new().scoreboard(&state, "nope", None).unwrap_err();
    assert!(matches!(err, TallyError::Engine(ref msg) if msg.contains("Session 'nope' not found")));
}

#[test]
fn test_category_totals_for_player() {
    let state = GameBuilder::new(&["p1"])
        .category("c1", "Cities")
        .entry("p1", 4.0, Some("c1"), 0)
        .build();
    let totals = Engine::new().category_totals(&state, SESSION, "p1", None).unwrap();
    assert_eq!(totals.get("c1"), Some(&4.0));
}

#[test]
fn test_evaluate_formula_uses_engine_limits() {
    let engine = Engine::with_limits(ResourceLimits {
        max_formula_length: 5,
        ..ResourceLimits::default()
    });
    let resolver = StaticResolver::new();
    assert_eq!(engine.evaluate_formula("1 + 2", &resolver).unwrap(), 3.0);
    assert!(matches!(
        engine.evaluate_formula("1 + 2 + 3", &resolver),
        Err(TallyError::ResourceLimitExceeded { .. })
    ));
}

#[test]
fn test_cycle_after_manual_entry() {
    let state = GameBuilder::new(&["p1", "p2"])
        .without_template()
        .entry("p2", 20.0, None, 0)
        .entry("p1", 12.0, None, 5)
        .rule(bonus_rule())
        .build();
    let outcome = Engine::new().run_cycle_at(&state, SESSION, at(10)).unwrap();

    assert!(!outcome.is_idle());
    assert_eq!(outcome.trigger_entry_id.as_deref(), Some("e2"));
    assert_eq!(outcome.player_id.as_deref(), Some("p1"));
    assert_eq!(outcome.entries.len(), 1);
    assert_eq!(outcome.entries[0].player_id, "p1");
    assert_eq!(outcome.entries[0].created_at, at(10));
    assert_eq!(outcome.suppressed, 0);
}

#[test]
fn test_cycle_is_idle_after_rule_entry() {
    let mut generated = ScoreEntry::manual("g1", SESSION, "p1", 5.0, at(6)).with_note("Rule: Bonus");
    generated.source = EntrySource::RuleEngine;
    let state = GameBuilder::new(&["p1"])
        .without_template()
        .entry("p1", 12.0, None, 5)
        .raw_entry(generated)
        .rule(bonus_rule())
        .build();
    let outcome = Engine::new().run_cycle_at(&state, SESSION, at(10)).unwrap();

    assert!(outcome.is_idle());
    assert!(outcome.entries.is_empty());
}

#[test]
fn test_cycle_suppresses_recent_duplicate() {
    let mut generated = ScoreEntry::manual("g1", SESSION, "p1", 5.0, at(9)).with_note("Rule: Bonus");
    generated.source = EntrySource::RuleEngine;
    let state = GameBuilder::new(&["p1"])
        .without_template()
        .raw_entry(generated)
        .entry("p1", 12.0, None, 10)
        .rule(bonus_rule())
        .build();

    let outcome = Engine::new().run_cycle_at(&state, SESSION, at(10)).unwrap();
    assert!(outcome.entries.is_empty());
    assert_eq!(outcome.suppressed, 1);

    let later = Engine::new().run_cycle_at(&state, SESSION, at(20)).unwrap();
    assert_eq!(later.entries.len(), 1);

    let patient = Engine::new()
        .with_duplicate_window(Duration::seconds(30))
        .run_cycle_at(&state, SESSION, at(20))
        .unwrap();
    assert_eq!(patient.suppressed, 1);
}

#[test]
fn test_cycle_uses_trigger_round() {
    let state = GameBuilder::new(&["p1"])
        .without_template()
        .rounds(&["r1", "r2"])
        .entry_in_round("p1", 9.0, None, Some("r1"), 0)
        .entry_in_round("p1", 4.0, None, Some("r2"), 1)
        .rule(bonus_rule())
        .build();
    // 13 overall, but only 4 in the trigger's round
    let outcome = Engine::new().run_cycle_at(&state, SESSION, at(10)).unwrap();
    assert!(outcome.entries.is_empty());
    assert!(!outcome.is_idle());
}

#[test]
fn test_evaluate_and_dry_run_rules() {
    let state = GameBuilder::new(&["p1"])
        .without_template()
        .entry("p1", 12.0, None, 0)
        .rule(bonus_rule())
        .build();
    let engine = Engine::new();

    assert_eq!(engine.evaluate_rules(&state, SESSION, "p1", None).unwrap().len(), 1);
    assert!(engine.test_rule(&state, SESSION, "r1", "p1", None).unwrap().would_trigger);
    assert!(engine
        .test_rule(&state, SESSION, "missing", "p1", None)
        .unwrap_err()
        .message()
        .contains("Rule 'missing' not found"));
}

#[test]
fn test_strict_engine_rejects_invalid_sessions() {
    let state = GameBuilder::new(&["p1"])
        .category_def(CategoryDefinition::new("f", SESSION, "Broken").with_formula("{a} + (2"))
        .build();

    assert!(Engine::new().scoreboard(&state, SESSION, None).is_ok());
    let err = Engine::new().strict().scoreboard(&state, SESSION, None).unwrap_err();
    assert!(err.message().contains("category 'Broken'"));
}

#[test]
fn test_check_reports_issues() {
    let state = GameBuilder::new(&["p1"])
        .category_def(CategoryDefinition::new("a", SESSION, "A").child_of("ghost"))
        .build();
    let issues = Engine::new().check(&state);
    assert_eq!(issues.len(), 1);
    assert_eq!(issues[0].session_id, SESSION);
}

#[test]
fn test_cycle_returns_trigger_players_object_impacts() {
    let state = GameBuilder::new(&["p1", "p2"])
        .object(
            ObjectDefinition::new("road", "Longest Road")
                .owned_by(Ownership::Player)
                .with_score_impact("2"),
        )
        .object(ObjectDefinition::new("robber", "Robber"))
        .value("road", Some("p1"), VariableValue::Boolean(true))
        .value("road", Some("p2"), VariableValue::Boolean(true))
        .value("robber", None, VariableValue::Number(1.0))
        .entry("p1", 3.0, None, 5)
        .build();
    let outcome = Engine::new().run_cycle_at(&state, SESSION, at(10)).unwrap();

    assert!(outcome.entries.is_empty());
    assert_eq!(outcome.impact_entries.len(), 1);
    assert_eq!(outcome.impact_entries[0].player_id, "p1");
    assert_eq!(outcome.impact_entries[0].value, 2.0);

    // The session-wide robber and p1's road; p2's road is left out
    let ids: Vec<&str> = outcome.objects.iter().map(|o| o.value.id.as_str()).collect();
    assert_eq!(ids, vec!["v1", "v3"]);
}
