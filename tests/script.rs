//! Tests for the expression language parser.
mod common;
use common::*;
use fabula::prelude::*;

#[test]
fn test_subtract_assignment_statement() {
    let parsed = assignments("mc.jaime.health -= 10");
    assert_eq!(parsed.len(), 1);

    let assignment = &parsed[0];
    assert_eq!(assignment.sheet, "mc.jaime");
    assert_eq!(assignment.variable, "health");
    assert_eq!(assignment.operator, AssignOp::Subtract);
    assert_eq!(assignment.value, Value::Number(10.0));
    assert_eq!(assignment.value_type, ValueKind::Literal);
    assert_eq!(assignment.value_sheet, None);
    assert_eq!(assignment.target_ref(), "mc.jaime.health");
}

#[test]
fn test_each_statement_gets_a_unique_id() {
    let parsed = assignments("a.b = 1; a.c = 2; a.b += 1");
    assert_eq!(parsed.len(), 3);
    for assignment in &parsed {
        assert!(assignment.id.starts_with("assign_"));
    }
    assert_ne!(parsed[0].id, parsed[1].id);
    assert_ne!(parsed[0].id, parsed[2].id);
    assert_ne!(parsed[1].id, parsed[2].id);
}

#[test]
fn test_empty_statements_are_skipped() {
    let parsed = parse_assignments("a.b = 1;;  ; a.c = 2;");
    assert!(parsed.is_valid());
    assert_eq!(parsed.assignments.len(), 2);
}

#[test]
fn test_boolean_literals_fold_into_dedicated_operators() {
    let on = assignments("world.visited = true");
    assert_eq!(on[0].operator, AssignOp::SetTrue);
    assert_eq!(on[0].value, Value::Null);

    let off = assignments("world.visited = false");
    assert_eq!(off[0].operator, AssignOp::SetFalse);
    assert_eq!(off[0].value, Value::Null);
}

#[test]
fn test_set_if_unset_operator() {
    let parsed = assignments("save.slot ?= \"empty\"");
    assert_eq!(parsed[0].operator, AssignOp::SetIfUnset);
    assert_eq!(parsed[0].value, Value::Text("empty".to_string()));
}

#[test]
fn test_reference_operand_keeps_its_sheet() {
    let parsed = assignments("mc.jaime.health = stats.base.health");
    assert_eq!(parsed[0].value_type, ValueKind::VariableRef);
    assert_eq!(parsed[0].value, Value::Text("health".to_string()));
    assert_eq!(parsed[0].value_sheet.as_deref(), Some("stats.base"));
}

#[test]
fn test_single_segment_reference_is_rejected() {
    let parsed = parse_assignments("health = 5");
    assert!(!parsed.is_valid());
    assert!(parsed.assignments.is_empty());

    let error = &parsed.errors[0];
    assert!(error.message.contains("sheet and a variable"));
    assert_eq!(error.from, 0);
    assert_eq!(error.to, 6);
}

#[test]
fn test_missing_operator_span_points_at_the_offending_token() {
    let parsed = parse_assignments("mc.hp 3");
    assert_eq!(parsed.errors.len(), 1);

    let error = &parsed.errors[0];
    assert!(error.message.contains("assignment operator"));
    assert_eq!(error.from, 6);
    assert_eq!(error.to, 7);
}

#[test]
fn test_statement_errors_do_not_hide_later_statements() {
    let parsed = parse_assignments("mc.hp 3; mc.jaime.health -= 10");
    assert_eq!(parsed.errors.len(), 1);
    assert_eq!(parsed.assignments.len(), 1);
    assert_eq!(parsed.assignments[0].variable, "health");
}

#[test]
fn test_missing_operand_is_reported_at_end_of_input() {
    let parsed = parse_assignments("mc.hp =");
    assert!(!parsed.is_valid());

    let error = &parsed.errors[0];
    assert!(error.message.contains("expected a value"));
    // Zero-width span right after the last token.
    assert_eq!(error.from, 7);
    assert_eq!(error.to, 7);
}

#[test]
fn test_condition_with_two_terms() {
    let parsed = condition("mc.jaime.health > 0 && party.together");
    assert_eq!(parsed.logic, Logic::All);
    assert_eq!(parsed.rules.len(), 2);

    assert_eq!(parsed.rules[0].sheet, "mc.jaime");
    assert_eq!(parsed.rules[0].variable, "health");
    assert_eq!(parsed.rules[0].operator, RuleOp::GreaterThan);
    assert_eq!(parsed.rules[0].value, Value::Number(0.0));

    assert_eq!(parsed.rules[1].sheet, "party");
    assert_eq!(parsed.rules[1].variable, "together");
    assert_eq!(parsed.rules[1].operator, RuleOp::IsTrue);
    assert_eq!(parsed.rules[1].value, Value::Null);

    assert!(parsed.rules.iter().all(|rule| rule.id.starts_with("rule_")));
}

#[test]
fn test_or_conditions_use_any_logic() {
    let parsed = condition("a.b || a.c");
    assert_eq!(parsed.logic, Logic::Any);
    assert_eq!(parsed.rules.len(), 2);
}

#[test]
fn test_mixed_logic_is_rejected() {
    let parsed = parse_condition("a.b && a.c || a.d");
    assert!(!parsed.is_valid());
    assert!(parsed.errors[0].message.contains("cannot mix"));
    // The terms themselves still parse; only the combination is refused.
    assert_eq!(parsed.condition.rules.len(), 3);
}

#[test]
fn test_negated_reference_parses_as_is_false() {
    let bare = condition("!world.visited");
    assert_eq!(bare.rules[0].operator, RuleOp::IsFalse);

    let parenthesized = condition("!(world.visited)");
    assert_eq!(parenthesized.rules[0].operator, RuleOp::IsFalse);
    assert_eq!(parenthesized.rules[0].sheet, "world");
    assert_eq!(parenthesized.rules[0].variable, "visited");
}

#[test]
fn test_comparison_operator_coverage() {
    let parsed = condition("a.b >= 2 && a.c != x.y && a.d <= 1 && a.e < 5");
    let operators: Vec<RuleOp> = parsed.rules.iter().map(|rule| rule.operator).collect();
    assert_eq!(
        operators,
        vec![
            RuleOp::GreaterThanOrEqual,
            RuleOp::NotEquals,
            RuleOp::LessThanOrEqual,
            RuleOp::LessThan,
        ]
    );

    // The `x.y` operand is a reference, not a literal.
    assert_eq!(parsed.rules[1].value_type, ValueKind::VariableRef);
    assert_eq!(parsed.rules[1].value_sheet.as_deref(), Some("x"));
    assert_eq!(parsed.rules[1].value, Value::Text("y".to_string()));
}

#[test]
fn test_string_literal_operands() {
    let parsed = condition("mc.jaime.name == \"Jaime\"");
    assert_eq!(parsed.rules[0].operator, RuleOp::Equals);
    assert_eq!(parsed.rules[0].value, Value::Text("Jaime".to_string()));
    assert_eq!(parsed.rules[0].value_type, ValueKind::Literal);
}

#[test]
fn test_empty_condition_is_vacuous() {
    for text in ["", "   "] {
        let parsed = parse_condition(text);
        assert!(parsed.is_valid());
        assert!(parsed.condition.is_vacuous());
    }
}

#[test]
fn test_table_cell_references_split_on_the_last_dot() {
    let parsed = condition("quests.main.act1.done");
    assert_eq!(parsed.rules[0].sheet, "quests.main.act1");
    assert_eq!(parsed.rules[0].variable, "done");
    assert_eq!(parsed.rules[0].operator, RuleOp::IsTrue);
}
