//! The expression language of the engine.
//!
//! Narrative scripts drive transitions with two kinds of free text: condition
//! expressions (`mc.jaime.health > 0 && party.present`) and assignment
//! statements (`mc.jaime.health -= 10; world.visited = true`). This module
//! parses both into the structured [`Rule`]/[`Assignment`] lists the engine
//! executes, with character-precise [`ScriptError`] diagnostics for the
//! editor.
//!
//! Parsing is pure and side-effect free: it holds no session state and can be
//! called on every (debounced) editor keystroke. A parse that produced any
//! error must not be applied, even if some statements parsed cleanly.

mod rules;
mod scanner;
mod token;

pub use rules::{
    AssignOp, Assignment, Condition, Logic, Rule, RuleOp, ScriptError, ValueKind,
};
pub use token::Span;

use crate::value::Value;
use rand::Rng;
use scanner::Scanner;
use serde::{Deserialize, Serialize};
use token::{Token, TokenKind};

/// Outcome of [`parse_assignments`]. Valid only when `errors` is empty.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParsedAssignments {
    pub assignments: Vec<Assignment>,
    pub errors: Vec<ScriptError>,
}

impl ParsedAssignments {
    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }
}

/// Outcome of [`parse_condition`]. Valid only when `errors` is empty.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParsedCondition {
    pub condition: Condition,
    pub errors: Vec<ScriptError>,
}

impl ParsedCondition {
    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }
}

/// Parses `;`-separated assignment statements.
///
/// Empty or whitespace-only input is a vacuous success: no assignments, no
/// errors. Each parsed statement receives a fresh `assign_<random>` id and
/// the character span of its left-hand reference.
pub fn parse_assignments(text: &str) -> ParsedAssignments {
    let (tokens, mut errors) = Scanner::new(text).scan();
    let mut assignments = Vec::new();
    for statement in tokens.split(|t| t.kind == TokenKind::Semicolon) {
        if statement.is_empty() {
            continue;
        }
        match parse_assignment_statement(statement) {
            Ok(assignment) => assignments.push(assignment),
            Err(error) => errors.push(error),
        }
    }
    ParsedAssignments {
        assignments,
        errors,
    }
}

/// Parses one condition expression.
///
/// Terms join with `&&` (all) or `||` (any); mixing both in one expression is
/// not supported and reported at the offending operator. Empty input yields
/// the vacuous condition.
pub fn parse_condition(text: &str) -> ParsedCondition {
    let (tokens, mut errors) = Scanner::new(text).scan();
    if tokens.is_empty() {
        return ParsedCondition {
            condition: Condition::vacuous(),
            errors,
        };
    }

    let mut cursor = Cursor::new(&tokens);
    let mut logic: Option<Logic> = None;
    let mut parsed_rules = Vec::new();

    loop {
        match parse_term(&mut cursor) {
            Ok(rule) => parsed_rules.push(rule),
            Err(error) => {
                errors.push(error);
                break;
            }
        }
        match cursor.next() {
            None => break,
            Some(token) => {
                let joined = match token.kind {
                    TokenKind::AndAnd => Logic::All,
                    TokenKind::OrOr => Logic::Any,
                    _ => {
                        errors.push(ScriptError::new(token.span, "expected '&&' or '||'"));
                        break;
                    }
                };
                match logic {
                    None => logic = Some(joined),
                    Some(current) if current != joined => {
                        errors.push(ScriptError::new(
                            token.span,
                            "cannot mix '&&' and '||' in one expression",
                        ));
                    }
                    Some(_) => {}
                }
            }
        }
    }

    ParsedCondition {
        condition: Condition {
            logic: logic.unwrap_or(Logic::All),
            rules: parsed_rules,
        },
        errors,
    }
}

/// Generates the random id suffix carried by parsed rules and assignments.
fn fresh_id(prefix: &str) -> String {
    let suffix: String = rand::rng()
        .sample_iter(rand::distr::Alphanumeric)
        .take(8)
        .map(char::from)
        .collect();
    format!("{}_{}", prefix, suffix)
}

// ---------------------------------------------------------------------------
// Statement parsing
// ---------------------------------------------------------------------------

struct Cursor<'a> {
    tokens: &'a [Token],
    pos: usize,
}

impl<'a> Cursor<'a> {
    fn new(tokens: &'a [Token]) -> Self {
        Self { tokens, pos: 0 }
    }

    fn peek(&self) -> Option<&'a Token> {
        self.tokens.get(self.pos)
    }

    fn next(&mut self) -> Option<&'a Token> {
        let token = self.tokens.get(self.pos);
        if token.is_some() {
            self.pos += 1;
        }
        token
    }

    /// Zero-width span at the end of the input, for "ran out of tokens" errors.
    fn end_span(&self) -> Span {
        match self.tokens.last() {
            Some(token) => Span::new(token.span.to, token.span.to),
            None => Span::new(0, 0),
        }
    }
}

/// A dotted reference as written, before sheet/variable attribution.
struct RefPath {
    segments: Vec<String>,
    span: Span,
}

impl RefPath {
    /// Everything before the final segment. The last segment is always the
    /// variable; multi-segment sheets keep their inner dots.
    fn sheet(&self) -> String {
        self.segments[..self.segments.len() - 1].join(".")
    }

    fn variable(&self) -> &str {
        self.segments.last().map(String::as_str).unwrap_or_default()
    }
}

enum Operand {
    Literal(Value),
    Reference(RefPath),
}

fn parse_assignment_statement(tokens: &[Token]) -> Result<Assignment, ScriptError> {
    let mut cursor = Cursor::new(tokens);
    let target = parse_ref(&mut cursor)?;

    let operator = match cursor.next() {
        Some(token) => match token.kind {
            TokenKind::Assign => AssignOp::Set,
            TokenKind::AddAssign => AssignOp::Add,
            TokenKind::SubAssign => AssignOp::Subtract,
            TokenKind::DefaultAssign => AssignOp::SetIfUnset,
            _ => {
                return Err(ScriptError::new(
                    token.span,
                    "expected an assignment operator (=, +=, -=, ?=)",
                ));
            }
        },
        None => {
            return Err(ScriptError::new(
                cursor.end_span(),
                "expected an assignment operator (=, +=, -=, ?=)",
            ));
        }
    };

    let operand = parse_operand(&mut cursor)?;

    if let Some(extra) = cursor.next() {
        return Err(ScriptError::new(
            extra.span.merge(cursor.end_span()),
            "unexpected input after assignment",
        ));
    }

    // Plain `= true` / `= false` fold into dedicated operators.
    let (operator, value, value_type, value_sheet) = match (operator, operand) {
        (AssignOp::Set, Operand::Literal(Value::Bool(true))) => {
            (AssignOp::SetTrue, Value::Null, ValueKind::Literal, None)
        }
        (AssignOp::Set, Operand::Literal(Value::Bool(false))) => {
            (AssignOp::SetFalse, Value::Null, ValueKind::Literal, None)
        }
        (op, Operand::Literal(value)) => (op, value, ValueKind::Literal, None),
        (op, Operand::Reference(path)) => (
            op,
            Value::Text(path.variable().to_string()),
            ValueKind::VariableRef,
            Some(path.sheet()),
        ),
    };

    Ok(Assignment {
        id: fresh_id("assign"),
        sheet: target.sheet(),
        variable: target.variable().to_string(),
        operator,
        value,
        value_type,
        value_sheet,
        source_span: target.span,
    })
}

fn parse_term(cursor: &mut Cursor) -> Result<Rule, ScriptError> {
    // Negated form: `!ref` or `!(ref)` means "is false".
    if matches!(cursor.peek().map(|t| &t.kind), Some(TokenKind::Bang)) {
        cursor.next();
        let parenthesized = matches!(cursor.peek().map(|t| &t.kind), Some(TokenKind::LParen));
        if parenthesized {
            cursor.next();
        }
        let target = parse_ref(cursor)?;
        if parenthesized {
            match cursor.next() {
                Some(token) if token.kind == TokenKind::RParen => {}
                Some(token) => return Err(ScriptError::new(token.span, "expected ')'")),
                None => return Err(ScriptError::new(cursor.end_span(), "expected ')'")),
            }
        }
        return Ok(make_rule(target, RuleOp::IsFalse, None));
    }

    let target = parse_ref(cursor)?;

    let comparison = match cursor.peek().map(|t| &t.kind) {
        Some(TokenKind::EqEq) => Some(RuleOp::Equals),
        Some(TokenKind::NotEq) => Some(RuleOp::NotEquals),
        Some(TokenKind::Gt) => Some(RuleOp::GreaterThan),
        Some(TokenKind::Ge) => Some(RuleOp::GreaterThanOrEqual),
        Some(TokenKind::Lt) => Some(RuleOp::LessThan),
        Some(TokenKind::Le) => Some(RuleOp::LessThanOrEqual),
        _ => None,
    };

    match comparison {
        Some(operator) => {
            cursor.next();
            let operand = parse_operand(cursor)?;
            Ok(make_rule(target, operator, Some(operand)))
        }
        // A bare reference asserts the variable is true.
        None => Ok(make_rule(target, RuleOp::IsTrue, None)),
    }
}

fn make_rule(target: RefPath, operator: RuleOp, operand: Option<Operand>) -> Rule {
    let (value, value_type, value_sheet) = match operand {
        None => (Value::Null, ValueKind::Literal, None),
        Some(Operand::Literal(value)) => (value, ValueKind::Literal, None),
        Some(Operand::Reference(path)) => (
            Value::Text(path.variable().to_string()),
            ValueKind::VariableRef,
            Some(path.sheet()),
        ),
    };
    Rule {
        id: fresh_id("rule"),
        sheet: target.sheet(),
        variable: target.variable().to_string(),
        operator,
        value,
        value_type,
        value_sheet,
        source_span: target.span,
    }
}

fn parse_ref(cursor: &mut Cursor) -> Result<RefPath, ScriptError> {
    let first = match cursor.next() {
        Some(token) => token,
        None => {
            return Err(ScriptError::new(
                cursor.end_span(),
                "expected a variable reference",
            ));
        }
    };
    let TokenKind::Ident(ref name) = first.kind else {
        return Err(ScriptError::new(first.span, "expected a variable reference"));
    };

    let mut segments = vec![name.clone()];
    let mut span = first.span;
    while matches!(cursor.peek().map(|t| &t.kind), Some(TokenKind::Dot)) {
        let dot = cursor.next().map(|t| t.span).unwrap_or(span);
        match cursor.next() {
            Some(token) => {
                if let TokenKind::Ident(ref segment) = token.kind {
                    segments.push(segment.clone());
                    span = span.merge(token.span);
                } else {
                    return Err(ScriptError::new(token.span, "expected a name after '.'"));
                }
            }
            None => return Err(ScriptError::new(dot, "expected a name after '.'")),
        }
    }

    if segments.len() < 2 {
        return Err(ScriptError::new(
            span,
            "a reference needs a sheet and a variable name (e.g. sheet.variable)",
        ));
    }

    Ok(RefPath { segments, span })
}

fn parse_operand(cursor: &mut Cursor) -> Result<Operand, ScriptError> {
    match cursor.peek() {
        Some(token) => match token.kind {
            TokenKind::Number(n) => {
                cursor.next();
                Ok(Operand::Literal(Value::Number(n)))
            }
            TokenKind::Str(ref s) => {
                cursor.next();
                Ok(Operand::Literal(Value::Text(s.clone())))
            }
            TokenKind::True => {
                cursor.next();
                Ok(Operand::Literal(Value::Bool(true)))
            }
            TokenKind::False => {
                cursor.next();
                Ok(Operand::Literal(Value::Bool(false)))
            }
            TokenKind::Ident(_) => Ok(Operand::Reference(parse_ref(cursor)?)),
            _ => Err(ScriptError::new(
                token.span,
                "expected a value (number, \"string\", true/false, or a reference)",
            )),
        },
        None => Err(ScriptError::new(
            cursor.end_span(),
            "expected a value (number, \"string\", true/false, or a reference)",
        )),
    }
}
