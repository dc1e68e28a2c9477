use crate::script::{AssignOp, Assignment, ValueKind};
use crate::value::Value;
use crate::vars::{VarSource, VariableStore};
use std::fmt;

/// What applying one assignment did to the store.
#[derive(Debug, Clone, PartialEq)]
pub enum AssignmentOutcome {
    Changed {
        key: String,
        old: Value,
        new: Value,
    },
    Skipped {
        key: String,
        reason: SkipReason,
    },
}

/// Why an assignment left its target untouched.
#[derive(Debug, Clone, PartialEq)]
pub enum SkipReason {
    UnknownTarget,
    UnknownOperand(String),
    NonNumericTarget(Value),
    NonNumericOperand(Value),
    /// `?=` found a value that is not the type's default.
    AlreadySet,
    /// The write would not have changed anything.
    NoChange,
}

impl SkipReason {
    /// Whether the skip goes to the console at warning level. `?=` declining
    /// and same-value writes are expected behavior and stay informational.
    pub fn is_warning(&self) -> bool {
        !matches!(self, SkipReason::AlreadySet | SkipReason::NoChange)
    }
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SkipReason::UnknownTarget => write!(f, "the target variable is not declared"),
            SkipReason::UnknownOperand(reference) => {
                write!(f, "operand '{}' is not declared", reference)
            }
            SkipReason::NonNumericTarget(value) => {
                write!(f, "current value '{}' is not numeric", value)
            }
            SkipReason::NonNumericOperand(value) => {
                write!(f, "operand value '{}' is not numeric", value)
            }
            SkipReason::AlreadySet => write!(f, "already set, ?= left it unchanged"),
            SkipReason::NoChange => write!(f, "value unchanged"),
        }
    }
}

/// Applies one assignment to the store.
///
/// Exactly one variable can change. A successful write moves the current
/// value to `previous_value` and tags the entry `source = instruction`; every
/// failure mode degrades to a [`SkipReason`] for the console instead of an
/// error.
pub fn apply_assignment(
    assignment: &Assignment,
    variables: &mut VariableStore,
) -> AssignmentOutcome {
    let outcome = decide(assignment, variables);
    if let AssignmentOutcome::Changed { key, new, .. } = &outcome {
        if let Some(variable) = variables.get_mut(key) {
            variable.apply(new.clone(), VarSource::Instruction);
        }
    }
    outcome
}

/// Pure half of the application: reads the store, never writes it.
fn decide(assignment: &Assignment, variables: &VariableStore) -> AssignmentOutcome {
    let key = assignment.target_ref();
    let Some(target) = variables.resolve_pair(&assignment.sheet, &assignment.variable) else {
        return AssignmentOutcome::Skipped {
            key,
            reason: SkipReason::UnknownTarget,
        };
    };

    let operand = match assignment.value_type {
        ValueKind::Literal => assignment.value.clone(),
        ValueKind::VariableRef => {
            let sheet = assignment.value_sheet.as_deref().unwrap_or_default();
            let name = match &assignment.value {
                Value::Text(name) => name.as_str(),
                _ => "",
            };
            match variables.resolve_pair(sheet, name) {
                Some(source) => source.value.clone(),
                None => {
                    return AssignmentOutcome::Skipped {
                        key,
                        reason: SkipReason::UnknownOperand(format!("{}.{}", sheet, name)),
                    };
                }
            }
        }
    };

    let new_value = match assignment.operator {
        AssignOp::Set => operand,
        AssignOp::SetTrue => Value::Bool(true),
        AssignOp::SetFalse => Value::Bool(false),
        AssignOp::Add | AssignOp::Subtract => {
            let Some(current) = target.value.as_number() else {
                return AssignmentOutcome::Skipped {
                    key,
                    reason: SkipReason::NonNumericTarget(target.value.clone()),
                };
            };
            let Some(amount) = operand.as_number() else {
                return AssignmentOutcome::Skipped {
                    key,
                    reason: SkipReason::NonNumericOperand(operand),
                };
            };
            if assignment.operator == AssignOp::Add {
                Value::Number(current + amount)
            } else {
                Value::Number(current - amount)
            }
        }
        AssignOp::SetIfUnset => {
            if !target.value.is_default_for(target.var_type) {
                return AssignmentOutcome::Skipped {
                    key,
                    reason: SkipReason::AlreadySet,
                };
            }
            operand
        }
    };

    if new_value == target.value {
        return AssignmentOutcome::Skipped {
            key,
            reason: SkipReason::NoChange,
        };
    }

    AssignmentOutcome::Changed {
        key,
        old: target.value.clone(),
        new: new_value,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::script::parse_assignments;
    use crate::value::VarType;
    use crate::vars::Variable;

    fn store() -> VariableStore {
        VariableStore::from_variables([
            Variable::seeded("mc.jaime", "health", VarType::Number, Value::Number(50.0)),
            Variable::seeded("mc.jaime", "title", VarType::Text, Value::Text(String::new())),
            Variable::seeded("world", "bonus", VarType::Number, Value::Number(5.0)),
        ])
    }

    fn apply_one(text: &str, variables: &mut VariableStore) -> AssignmentOutcome {
        let parsed = parse_assignments(text);
        assert!(parsed.is_valid(), "bad fixture: {:?}", parsed.errors);
        apply_assignment(&parsed.assignments[0], variables)
    }

    #[test]
    fn subtract_moves_the_old_value_to_previous() {
        let mut variables = store();
        let outcome = apply_one("mc.jaime.health -= 10", &mut variables);
        assert_eq!(
            outcome,
            AssignmentOutcome::Changed {
                key: "mc.jaime.health".into(),
                old: Value::Number(50.0),
                new: Value::Number(40.0),
            }
        );
        let health = variables.get("mc.jaime.health").unwrap();
        assert_eq!(health.value, Value::Number(40.0));
        assert_eq!(health.previous_value, Some(Value::Number(50.0)));
        assert_eq!(health.source, VarSource::Instruction);
    }

    #[test]
    fn add_with_a_reference_operand_reads_the_other_variable() {
        let mut variables = store();
        apply_one("mc.jaime.health += world.bonus", &mut variables);
        assert_eq!(
            variables.get("mc.jaime.health").unwrap().value,
            Value::Number(55.0)
        );
    }

    #[test]
    fn add_on_text_is_a_warning_level_skip() {
        let mut variables = store();
        let outcome = apply_one("mc.jaime.title += 3", &mut variables);
        match outcome {
            AssignmentOutcome::Skipped { reason, .. } => {
                assert!(matches!(reason, SkipReason::NonNumericTarget(_)));
                assert!(reason.is_warning());
            }
            other => panic!("expected a skip, got {other:?}"),
        }
        assert_eq!(
            variables.get("mc.jaime.title").unwrap().value,
            Value::Text(String::new())
        );
    }

    #[test]
    fn set_if_unset_only_writes_defaults() {
        let mut variables = store();
        apply_one("mc.jaime.title ?= \"Ser\"", &mut variables);
        assert_eq!(
            variables.get("mc.jaime.title").unwrap().value,
            Value::Text("Ser".into())
        );

        let outcome = apply_one("mc.jaime.title ?= \"Lord\"", &mut variables);
        match outcome {
            AssignmentOutcome::Skipped { reason, .. } => {
                assert_eq!(reason, SkipReason::AlreadySet);
                assert!(!reason.is_warning());
            }
            other => panic!("expected a skip, got {other:?}"),
        }
    }

    #[test]
    fn same_value_writes_do_not_touch_provenance() {
        let mut variables = store();
        let outcome = apply_one("mc.jaime.health = 50", &mut variables);
        assert!(matches!(
            outcome,
            AssignmentOutcome::Skipped {
                reason: SkipReason::NoChange,
                ..
            }
        ));
        let health = variables.get("mc.jaime.health").unwrap();
        assert_eq!(health.previous_value, None);
        assert_eq!(health.source, VarSource::Initial);
    }

    #[test]
    fn unknown_target_is_a_logged_no_op() {
        let mut variables = store();
        let outcome = apply_one("mc.jaime.mana = 4", &mut variables);
        assert!(matches!(
            outcome,
            AssignmentOutcome::Skipped {
                reason: SkipReason::UnknownTarget,
                ..
            }
        ));
    }
}
