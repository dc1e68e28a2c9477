use super::token::Span;
use crate::value::Value;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Comparison operators a condition rule can carry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RuleOp {
    Equals,
    NotEquals,
    GreaterThan,
    GreaterThanOrEqual,
    LessThan,
    LessThanOrEqual,
    IsTrue,
    IsFalse,
}

impl RuleOp {
    pub fn symbol(self) -> &'static str {
        match self {
            RuleOp::Equals => "==",
            RuleOp::NotEquals => "!=",
            RuleOp::GreaterThan => ">",
            RuleOp::GreaterThanOrEqual => ">=",
            RuleOp::LessThan => "<",
            RuleOp::LessThanOrEqual => "<=",
            RuleOp::IsTrue => "is true",
            RuleOp::IsFalse => "is false",
        }
    }

    /// Operators that compare against an explicit right-hand value.
    pub fn takes_operand(self) -> bool {
        !matches!(self, RuleOp::IsTrue | RuleOp::IsFalse)
    }
}

/// Mutation operators an assignment statement can carry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AssignOp {
    Set,
    Add,
    Subtract,
    SetIfUnset,
    SetTrue,
    SetFalse,
}

impl AssignOp {
    pub fn symbol(self) -> &'static str {
        match self {
            AssignOp::Set => "=",
            AssignOp::Add => "+=",
            AssignOp::Subtract => "-=",
            AssignOp::SetIfUnset => "?=",
            AssignOp::SetTrue => "= true",
            AssignOp::SetFalse => "= false",
        }
    }
}

/// Whether the right-hand side is a literal or a reference to another variable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ValueKind {
    Literal,
    VariableRef,
}

/// How a condition combines its rules.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Logic {
    All,
    Any,
}

/// One parsed comparison, e.g. `mc.jaime.health > 0`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Rule {
    pub id: String,
    pub sheet: String,
    pub variable: String,
    pub operator: RuleOp,
    pub value: Value,
    pub value_type: ValueKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value_sheet: Option<String>,
    pub source_span: Span,
}

impl Rule {
    /// Composite key of the left-hand variable.
    pub fn target_ref(&self) -> String {
        format!("{}.{}", self.sheet, self.variable)
    }
}

/// A full condition expression: rules joined by one logic operator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Condition {
    pub logic: Logic,
    pub rules: Vec<Rule>,
}

impl Condition {
    /// The empty condition, which holds for every variable state.
    pub fn vacuous() -> Self {
        Self {
            logic: Logic::All,
            rules: Vec::new(),
        }
    }

    pub fn is_vacuous(&self) -> bool {
        self.rules.is_empty()
    }
}

impl Default for Condition {
    fn default() -> Self {
        Self::vacuous()
    }
}

/// One parsed mutation statement, e.g. `mc.jaime.health -= 10`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Assignment {
    pub id: String,
    pub sheet: String,
    pub variable: String,
    pub operator: AssignOp,
    pub value: Value,
    pub value_type: ValueKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value_sheet: Option<String>,
    pub source_span: Span,
}

impl Assignment {
    /// Composite key of the assignment target.
    pub fn target_ref(&self) -> String {
        format!("{}.{}", self.sheet, self.variable)
    }
}

/// A position-tagged parse diagnostic.
///
/// These are values the editor renders inline, not Rust errors; a parse with
/// any of them attached must not be applied.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScriptError {
    pub from: usize,
    pub to: usize,
    pub message: String,
}

impl ScriptError {
    pub fn new(span: Span, message: impl Into<String>) -> Self {
        Self {
            from: span.from,
            to: span.to,
            message: message.into(),
        }
    }
}

impl fmt::Display for ScriptError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}..{}: {}", self.from, self.to, self.message)
    }
}
