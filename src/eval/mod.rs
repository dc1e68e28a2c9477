//! Condition and assignment evaluation.
//!
//! Both halves read the variable store and explain themselves: every rule
//! produces a [`RuleDetail`] for the console, and every assignment reports
//! what it changed or why it declined to. No path in here fails hard; an
//! unknown reference or a botched coercion makes a rule false or turns an
//! assignment into a logged no-op, because authors routinely evaluate against
//! sheets that are still being edited.

mod assign;

pub use assign::{AssignmentOutcome, SkipReason, apply_assignment};

use crate::script::{Condition, Logic, Rule, RuleOp, ValueKind};
use crate::value::{Value, VarType};
use crate::vars::{Variable, VariableStore};
use serde::{Deserialize, Serialize};

// This macro generates a match arm for a numeric comparison operator.
macro_rules! num_cmp {
    ($variable:expr, $operand:expr, $op_fn:expr) => {
        match (
            $variable.value.as_number(),
            $operand.and_then(|v| v.as_number()),
        ) {
            (Some(lhs), Some(rhs)) => $op_fn(lhs, rhs),
            _ => false,
        }
    };
}

/// Outcome of one rule, kept for the console explanation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RuleDetail {
    pub variable_ref: String,
    pub operator: RuleOp,
    /// Resolved right-hand side; absent for is_true/is_false and for operand
    /// references that did not resolve. Never skipped when serializing, for
    /// the bincode artifact's positional decoding.
    #[serde(default)]
    pub expected_value: Option<Value>,
    pub passed: bool,
    /// Live value of the target at evaluation time, null when undeclared.
    pub actual_value: Value,
}

/// What a condition evaluation decided.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Decision {
    /// Boolean mode: the combined truth of all rules.
    Holds(bool),
    /// Switch mode: index of the first matching rule, `None` for fallthrough.
    Route(Option<usize>),
}

#[derive(Debug, Clone, PartialEq)]
pub struct ConditionEvaluation {
    pub decision: Decision,
    /// One entry per rule actually visited, in evaluation order.
    pub details: Vec<RuleDetail>,
}

impl ConditionEvaluation {
    /// Whether execution should take the "satisfied" path.
    pub fn is_met(&self) -> bool {
        match self.decision {
            Decision::Holds(holds) => holds,
            Decision::Route(route) => route.is_some(),
        }
    }
}

/// Evaluates a condition against the store.
///
/// Boolean mode evaluates every rule so the console can explain each one,
/// then combines them under the condition's logic; a condition without rules
/// is vacuously true. Switch mode ignores the logic, walks the rules in
/// authoring order and stops at the first one that passes, so `details`
/// covers exactly the visited prefix.
pub fn evaluate_condition(
    condition: &Condition,
    switch_mode: bool,
    variables: &VariableStore,
) -> ConditionEvaluation {
    if switch_mode {
        let mut details = Vec::new();
        for (index, rule) in condition.rules.iter().enumerate() {
            let detail = evaluate_rule(rule, variables);
            let passed = detail.passed;
            details.push(detail);
            if passed {
                return ConditionEvaluation {
                    decision: Decision::Route(Some(index)),
                    details,
                };
            }
        }
        return ConditionEvaluation {
            decision: Decision::Route(None),
            details,
        };
    }

    let details: Vec<RuleDetail> = condition
        .rules
        .iter()
        .map(|rule| evaluate_rule(rule, variables))
        .collect();
    let holds = match condition.logic {
        _ if details.is_empty() => true,
        Logic::All => details.iter().all(|d| d.passed),
        Logic::Any => details.iter().any(|d| d.passed),
    };
    ConditionEvaluation {
        decision: Decision::Holds(holds),
        details,
    }
}

/// Evaluates one rule. An undeclared target or operand makes the rule false,
/// never an error.
pub fn evaluate_rule(rule: &Rule, variables: &VariableStore) -> RuleDetail {
    let target = variables.resolve_pair(&rule.sheet, &rule.variable);
    let operand = resolve_operand(rule, variables);

    let passed = match target {
        Some(variable) => rule_passes(rule.operator, variable, operand.as_ref()),
        None => false,
    };

    RuleDetail {
        variable_ref: rule.target_ref(),
        operator: rule.operator,
        actual_value: target.map(|v| v.value.clone()).unwrap_or(Value::Null),
        expected_value: operand,
        passed,
    }
}

fn rule_passes(operator: RuleOp, variable: &Variable, operand: Option<&Value>) -> bool {
    match operator {
        // --- Boolean identity ---
        RuleOp::IsTrue => variable.value.as_bool() == Some(true),
        RuleOp::IsFalse => variable.value.as_bool() == Some(false),

        // --- Equality, by the target's declared type ---
        RuleOp::Equals => operand.is_some_and(|expected| values_equal(variable, expected)),
        RuleOp::NotEquals => operand.is_some_and(|expected| !values_equal(variable, expected)),

        // --- Numeric ordering ---
        RuleOp::GreaterThan => num_cmp!(variable, operand, |a, b| a > b),
        RuleOp::GreaterThanOrEqual => num_cmp!(variable, operand, |a, b| a >= b),
        RuleOp::LessThan => num_cmp!(variable, operand, |a, b| a < b),
        RuleOp::LessThanOrEqual => num_cmp!(variable, operand, |a, b| a <= b),
    }
}

/// Equality under the target's declared type: numeric compare for numbers,
/// strict for booleans, structural for multi-selects, rendered string
/// compare for the text-like types.
fn values_equal(variable: &Variable, expected: &Value) -> bool {
    if variable.value.is_null() || expected.is_null() {
        return variable.value == *expected;
    }
    match variable.var_type {
        VarType::Number => match (variable.value.as_number(), expected.as_number()) {
            (Some(lhs), Some(rhs)) => lhs == rhs,
            _ => false,
        },
        VarType::Boolean => match (variable.value.as_bool(), expected.as_bool()) {
            (Some(lhs), Some(rhs)) => lhs == rhs,
            _ => false,
        },
        VarType::MultiSelect => variable.value == *expected,
        VarType::Text | VarType::RichText | VarType::Date | VarType::Select => {
            variable.value.to_string() == expected.to_string()
        }
    }
}

fn resolve_operand(rule: &Rule, variables: &VariableStore) -> Option<Value> {
    if !rule.operator.takes_operand() {
        return None;
    }
    match rule.value_type {
        ValueKind::Literal => Some(rule.value.clone()),
        ValueKind::VariableRef => {
            let sheet = rule.value_sheet.as_deref().unwrap_or_default();
            let name = match &rule.value {
                Value::Text(name) => name.as_str(),
                _ => return None,
            };
            variables.resolve_pair(sheet, name).map(|v| v.value.clone())
        }
    }
}
