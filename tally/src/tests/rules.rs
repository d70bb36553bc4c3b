use super::fixtures::*;
use crate::context::EvaluationContext;
use crate::model::*;
use crate::rules::*;

fn bonus_rule() -> ScoringRule {
    session_rule(
        "r1",
        "Bonus",
        condition(ConditionKind::Total, Comparison::GreaterOrEqual, 10.0),
        action(ActionKind::Add, 5.0, None),
    )
}

#[test]
fn test_total_condition_fires_add() {
    let state = GameBuilder::new(&["p1"])
        .without_template()
        .entry("p1", 6.0, None, 0)
        .entry("p1", 5.0, None, 1)
        .rule(bonus_rule())
        .build();
    let entries = evaluate_rules(&ctx_for(&state, "p1"));

    assert_eq!(entries.len(), 1);
    let entry = &entries[0];
    assert_eq!(entry.value, 5.0);
    assert_eq!(entry.player_id, "p1");
    assert_eq!(entry.session_id, SESSION);
    assert_eq!(entry.category_id, None);
    assert_eq!(entry.note.as_deref(), Some("Rule: Bonus"));
    assert_eq!(entry.source, EntrySource::RuleEngine);
    assert_eq!(entry.created_at, at(100));
}

#[test]
fn test_condition_not_met() {
    let state = GameBuilder::new(&["p1"])
        .without_template()
        .entry("p1", 9.0, None, 0)
        .rule(bonus_rule())
        .build();
    assert!(evaluate_rules(&ctx_for(&state, "p1")).is_empty());
}

#[test]
fn test_rules_only_see_the_context_player() {
    let state = GameBuilder::new(&["p1", "p2"])
        .without_template()
        .entry("p1", 12.0, None, 0)
        .entry("p2", 3.0, None, 1)
        .rule(bonus_rule())
        .build();
    assert_eq!(evaluate_rules(&ctx_for(&state, "p1")).len(), 1);
    assert!(evaluate_rules(&ctx_for(&state, "p2")).is_empty());
}

#[test]
fn test_rules_evaluate_against_the_same_totals() {
    let second = session_rule(
        "r2",
        "Big bonus",
        condition(ConditionKind::Total, Comparison::GreaterOrEqual, 14.0),
        action(ActionKind::Add, 1.0, None),
    );
    let state = GameBuilder::new(&["p1"])
        .without_template()
        .entry("p1", 11.0, None, 0)
        .rule(bonus_rule())
        .rule(second)
        .build();
    let entries = evaluate_rules(&ctx_for(&state, "p1"));
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0].note.as_deref(), Some("Rule: Bonus"));
}

#[test]
fn test_category_condition_by_id_and_name() {
    let state = GameBuilder::new(&["p1"])
        .category("c1", "Cities")
        .entry("p1", 4.0, Some("c1"), 0)
        .build();
    let ctx = ctx_for(&state, "p1");

    for reference in ["c1", "cities", "Cities"] {
        let cond = RuleCondition {
            category_id: Some(reference.to_string()),
            ..condition(ConditionKind::Category, Comparison::Equal, 4.0)
        };
        assert!(evaluate_condition(&cond, &ctx).unwrap(), "{}", reference);
    }
}

#[test]
fn test_category_condition_on_unknown_reference_is_false() {
    let state = GameBuilder::new(&["p1"]).entry("p1", 4.0, None, 0).build();
    let cond = RuleCondition {
        category_id: Some("nowhere".to_string()),
        ..condition(ConditionKind::Category, Comparison::GreaterOrEqual, 0.0)
    };
    assert!(!evaluate_condition(&cond, &ctx_for(&state, "p1")).unwrap());

    let without_target = condition(ConditionKind::Category, Comparison::GreaterOrEqual, 0.0);
    assert!(!evaluate_condition(&without_target, &ctx_for(&state, "p1")).unwrap());
}

#[test]
fn test_category_condition_falls_back_to_objects() {
    let state = GameBuilder::new(&["p1"])
        .object(ObjectDefinition {
            object_type: ObjectType::Number,
            ..ObjectDefinition::new("army", "Largest Army")
        })
        .value("army", None, VariableValue::Number(3.0))
        .build();
    let cond = RuleCondition {
        category_id: Some("largest army".to_string()),
        ..condition(ConditionKind::Category, Comparison::Greater, 2.0)
    };
    assert!(evaluate_condition(&cond, &ctx_for(&state, "p1")).unwrap());
}

#[test]
fn test_round_condition_counts_entries() {
    let state = GameBuilder::new(&["p1", "p2"])
        .rounds(&["r1", "r2"])
        .entry_in_round("p1", 1.0, None, Some("r1"), 0)
        .entry_in_round("p1", 1.0, None, Some("r1"), 1)
        .entry_in_round("p1", 1.0, None, Some("r2"), 2)
        .entry_in_round("p2", 1.0, None, Some("r1"), 3)
        .build();
    let cond = RuleCondition {
        round_id: Some("r1".to_string()),
        ..condition(ConditionKind::Round, Comparison::Equal, 2.0)
    };
    assert!(evaluate_condition(&cond, &ctx_for(&state, "p1")).unwrap());
    assert!(!evaluate_condition(&cond, &ctx_for(&state, "p2")).unwrap());
}

#[test]
fn test_multiply_appends_delta_to_target() {
    let state = GameBuilder::new(&["p1"])
        .category("c1", "Cities")
        .entry("p1", 4.0, Some("c1"), 0)
        .build();
    let rule = session_rule(
        "r1",
        "Double cities",
        condition(ConditionKind::Total, Comparison::Greater, 0.0),
        action(ActionKind::Multiply, 2.0, Some("c1")),
    );
    let entry = apply_rule_action(&rule, &ctx_for(&state, "p1")).unwrap().unwrap();
    assert_eq!(entry.value, 4.0);
    assert_eq!(entry.category_id.as_deref(), Some("c1"));
}

#[test]
fn test_set_appends_difference() {
    let state = GameBuilder::new(&["p1"]).entry("p1", 7.0, None, 0).build();
    let ctx = ctx_for(&state, "p1");
    let set_to = |value: f64| {
        session_rule(
            "r1",
            "Floor",
            condition(ConditionKind::Total, Comparison::Less, 100.0),
            action(ActionKind::Set, value, None),
        )
    };

    assert_eq!(apply_rule_action(&set_to(10.0), &ctx).unwrap().unwrap().value, 3.0);
    assert_eq!(apply_rule_action(&set_to(2.0), &ctx).unwrap().unwrap().value, -5.0);
    assert!(apply_rule_action(&set_to(7.0), &ctx).unwrap().is_none());
}

#[test]
fn test_negligible_delta_is_skipped() {
    let state = GameBuilder::new(&["p1"]).entry("p1", 7.0, None, 0).build();
    let rule = session_rule(
        "r1",
        "Nothing",
        condition(ConditionKind::Total, Comparison::Greater, 0.0),
        action(ActionKind::Add, 0.0004, None),
    );
    assert!(apply_rule_action(&rule, &ctx_for(&state, "p1")).unwrap().is_none());
}

#[test]
fn test_multiply_of_empty_target_is_skipped() {
    let state = GameBuilder::new(&["p1"]).entry("p1", 7.0, None, 0).build();
    let rule = session_rule(
        "r1",
        "Double",
        condition(ConditionKind::Total, Comparison::Greater, 0.0),
        action(ActionKind::Multiply, 2.0, Some("missing")),
    );
    assert!(apply_rule_action(&rule, &ctx_for(&state, "p1")).unwrap().is_none());
}

#[test]
fn test_non_finite_adjustment_is_an_error() {
    let rule = session_rule(
        "r1",
        "Broken",
        condition(ConditionKind::Total, Comparison::GreaterOrEqual, 0.0),
        action(ActionKind::Add, f64::INFINITY, None),
    );
    let state = GameBuilder::new(&["p1"])
        .without_template()
        .entry("p1", 1.0, None, 0)
        .rule(rule.clone())
        .build();
    let ctx = ctx_for(&state, "p1");

    assert!(apply_rule_action(&rule, &ctx).unwrap_err().message().contains("non-finite"));
    assert!(evaluate_rules(&ctx).is_empty());
}

#[test]
fn test_rule_entry_carries_context_round() {
    let state = GameBuilder::new(&["p1"])
        .without_template()
        .rounds(&["r1"])
        .entry_in_round("p1", 12.0, None, Some("r1"), 0)
        .rule(bonus_rule())
        .build();
    let entries = evaluate_rules(&ctx_for(&state, "p1").in_round(Some("r1")));
    assert_eq!(entries[0].round_id.as_deref(), Some("r1"));
}

#[test]
fn test_player_is_required() {
    let state = GameBuilder::new(&["p1"])
        .without_template()
        .entry("p1", 12.0, None, 0)
        .rule(bonus_rule())
        .build();
    let ctx = EvaluationContext::new(&state, SESSION).unwrap();

    assert!(evaluate_condition(&bonus_rule().condition, &ctx).is_err());
    assert!(apply_rule_action(&bonus_rule(), &ctx).is_err());
    assert!(evaluate_rules(&ctx).is_empty());
}

#[test]
fn test_linked_rule_uses_template_definition() {
    let stale = ScoringRule {
        template_rule_id: Some("tr1".to_string()),
        ..session_rule(
            "r1",
            "Bonus",
            condition(ConditionKind::Total, Comparison::GreaterOrEqual, 100.0),
            action(ActionKind::Add, 1.0, None),
        )
    };
    let state = GameBuilder::new(&["p1"])
        .template_rule(template_rule(
            "tr1",
            "Bonus",
            condition(ConditionKind::Total, Comparison::GreaterOrEqual, 10.0),
            action(ActionKind::Add, 5.0, None),
        ))
        .rule(stale)
        .entry("p1", 12.0, None, 0)
        .build();
    let ctx = ctx_for(&state, "p1");

    let active = active_rules(&ctx);
    assert_eq!(active.len(), 1);
    assert_eq!(active[0].id, "r1");
    assert_eq!(active[0].condition.value, 10.0);

    let entries = evaluate_rules(&ctx);
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0].value, 5.0);
}

#[test]
fn test_linked_rule_to_removed_or_disabled_template_rule() {
    let linked = |template_id: &str| ScoringRule {
        template_rule_id: Some(template_id.to_string()),
        ..bonus_rule()
    };
    let mut disabled = template_rule(
        "tr-off",
        "Bonus",
        bonus_rule().condition,
        bonus_rule().action,
    );
    disabled.enabled = false;

    let state = GameBuilder::new(&["p1"])
        .template_rule(disabled)
        .rule(linked("tr-gone"))
        .rule(ScoringRule {
            id: "r2".to_string(),
            ..linked("tr-off")
        })
        .entry("p1", 12.0, None, 0)
        .build();
    let ctx = ctx_for(&state, "p1");

    assert!(active_rules(&ctx).is_empty());
    assert!(evaluate_rules(&ctx).is_empty());
}

#[test]
fn test_unlinked_rule_needs_structural_match() {
    let state = GameBuilder::new(&["p1"])
        .template_rule(template_rule(
            "tr1",
            "Bonus",
            bonus_rule().condition,
            bonus_rule().action,
        ))
        .rule(bonus_rule())
        .rule(session_rule(
            "r2",
            "Edited",
            condition(ConditionKind::Total, Comparison::GreaterOrEqual, 1.0),
            action(ActionKind::Add, 50.0, None),
        ))
        .build();
    let active = active_rules(&ctx_for(&state, "p1"));
    let ids: Vec<&str> = active.iter().map(|r| r.id.as_str()).collect();
    assert_eq!(ids, vec!["r1"]);
}

#[test]
fn test_disabled_session_rule_is_skipped() {
    let state = GameBuilder::new(&["p1"])
        .without_template()
        .rule(ScoringRule {
            enabled: false,
            ..bonus_rule()
        })
        .build();
    assert!(active_rules(&ctx_for(&state, "p1")).is_empty());
}

#[test]
fn test_missing_template_disables_rules() {
    let mut state = GameBuilder::new(&["p1"])
        .rule(bonus_rule())
        .entry("p1", 12.0, None, 0)
        .build();
    state.templates.clear();
    assert!(active_rules(&ctx_for(&state, "p1")).is_empty());
}

#[test]
fn test_rule_dry_run() {
    let rule = ScoringRule {
        enabled: false,
        ..bonus_rule()
    };
    let state = GameBuilder::new(&["p1", "p2"])
        .without_template()
        .entry("p1", 12.0, None, 0)
        .entry("p2", 2.0, None, 1)
        .build();

    let hit = test_rule(&rule, &ctx_for(&state, "p1")).unwrap();
    assert_eq!(hit.rule_id, "r1");
    assert!(hit.would_trigger);
    assert_eq!(hit.entry.map(|e| e.value), Some(5.0));

    let miss = test_rule(&rule, &ctx_for(&state, "p2")).unwrap();
    assert!(!miss.would_trigger);
    assert!(miss.entry.is_none());
}
