//! Execution state of a running debug session.
//!
//! [`ExecutionState`] is the single owned record of everything a session has
//! done: variable values, the console, the change history, the raw depth
//! trace and the snapshot stack that powers step-back. The step logic in
//! [`step`] mutates it one node visit at a time; nothing else writes to it.

pub(crate) mod step;

use crate::eval::RuleDetail;
use crate::value::Value;
use crate::vars::{VarSource, VariableStore};
use ahash::AHashSet;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Lifecycle of a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Status {
    /// Stopped between steps; stepping is allowed.
    Paused,
    /// Auto-play is ticking.
    Running,
    /// A dialogue node is waiting for a response choice.
    WaitingInput,
    /// An exit node or a dead end ended the run.
    Finished,
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Status::Paused => "paused",
            Status::Running => "running",
            Status::WaitingInput => "waiting_input",
            Status::Finished => "finished",
        };
        write!(f, "{}", name)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConsoleLevel {
    Info,
    Warning,
    Error,
}

/// One line of the session console.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConsoleEntry {
    pub ts: DateTime<Utc>,
    pub level: ConsoleLevel,
    /// Optional fields are never skipped when serializing: console entries
    /// ride inside the bincode session artifact, whose positional decoding
    /// needs every field present.
    #[serde(default)]
    pub node_id: Option<String>,
    pub node_label: String,
    pub message: String,
    /// Per-rule explanation attached to condition evaluations.
    #[serde(default)]
    pub rule_details: Vec<RuleDetail>,
}

impl ConsoleEntry {
    pub fn info(
        node_id: Option<&str>,
        node_label: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self::new(ConsoleLevel::Info, node_id, node_label, message)
    }

    pub fn warning(
        node_id: Option<&str>,
        node_label: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self::new(ConsoleLevel::Warning, node_id, node_label, message)
    }

    pub fn error(
        node_id: Option<&str>,
        node_label: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self::new(ConsoleLevel::Error, node_id, node_label, message)
    }

    fn new(
        level: ConsoleLevel,
        node_id: Option<&str>,
        node_label: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            ts: Utc::now(),
            level,
            node_id: node_id.map(String::from),
            node_label: node_label.into(),
            message: message.into(),
            rule_details: Vec::new(),
        }
    }

    pub fn with_details(mut self, details: Vec<RuleDetail>) -> Self {
        self.rule_details = details;
        self
    }
}

/// Provenance record of one variable write.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChangeRecord {
    pub ts: DateTime<Utc>,
    /// Label of the node that wrote, or "user override".
    pub node_label: String,
    pub variable_ref: String,
    pub old_value: Value,
    pub new_value: Value,
    pub source: VarSource,
}

/// One executed node in the raw depth trace.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogEntry {
    pub node_id: String,
    /// Call-stack length at the moment the node executed.
    pub depth: usize,
}

/// Caller frame pushed by jump and subflow nodes, popped by exit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CallFrame {
    pub flow_id: String,
    pub flow_name: String,
    /// Where the caller resumes; `None` when the call site had no output
    /// connection, in which case popping finishes the run. Never skipped when
    /// serializing, for the bincode artifact's positional decoding.
    #[serde(default)]
    pub return_node_id: Option<String>,
}

/// One dialogue response offered while the session waits for input.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PendingChoice {
    pub response_id: String,
    pub text: String,
    /// Failed-condition responses stay listed for authoring visibility but
    /// cannot be chosen.
    pub valid: bool,
}

/// Point-in-time copy popped by step-back.
///
/// Console, log and history are append-only, so recording their lengths is
/// enough to roll them back exactly. Breakpoints are session configuration
/// and deliberately survive a restore.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    pub variables: VariableStore,
    pub current_node_id: Option<String>,
    pub next_node: Option<String>,
    pub current_flow_id: String,
    pub current_flow_name: String,
    pub call_stack: Vec<CallFrame>,
    pub pending_choices: Vec<PendingChoice>,
    pub console_len: usize,
    pub log_len: usize,
    pub history_len: usize,
    pub step_count: usize,
    pub step_limit_reached: bool,
}

/// Everything one debug session owns.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExecutionState {
    pub status: Status,
    pub step_count: usize,
    /// The node most recently executed.
    pub current_node_id: Option<String>,
    /// The node the next step will execute. `None` once the run ended or
    /// stalled.
    pub(crate) next_node: Option<String>,
    pub current_flow_id: String,
    pub current_flow_name: String,
    pub variables: VariableStore,
    /// Pristine copy taken at session start, used by reset.
    pub(crate) initial_variables: VariableStore,
    pub snapshots: Vec<Snapshot>,
    pub history: Vec<ChangeRecord>,
    pub console: Vec<ConsoleEntry>,
    pub execution_log: Vec<LogEntry>,
    pub pending_choices: Vec<PendingChoice>,
    pub breakpoints: AHashSet<String>,
    pub call_stack: Vec<CallFrame>,
    pub max_steps: usize,
    pub step_limit_reached: bool,
}

impl ExecutionState {
    pub(crate) fn new(
        flow_id: impl Into<String>,
        flow_name: impl Into<String>,
        start_node: Option<String>,
        variables: VariableStore,
        max_steps: usize,
    ) -> Self {
        Self {
            status: Status::Paused,
            step_count: 0,
            current_node_id: None,
            next_node: start_node,
            current_flow_id: flow_id.into(),
            current_flow_name: flow_name.into(),
            initial_variables: variables.clone(),
            variables,
            snapshots: Vec::new(),
            history: Vec::new(),
            console: Vec::new(),
            execution_log: Vec::new(),
            pending_choices: Vec::new(),
            breakpoints: AHashSet::new(),
            call_stack: Vec::new(),
            max_steps,
            step_limit_reached: false,
        }
    }

    pub(crate) fn record_change(
        &mut self,
        node_label: &str,
        variable_ref: &str,
        old_value: Value,
        new_value: Value,
        source: VarSource,
    ) {
        self.history.push(ChangeRecord {
            ts: Utc::now(),
            node_label: node_label.to_string(),
            variable_ref: variable_ref.to_string(),
            old_value,
            new_value,
            source,
        });
    }

    pub(crate) fn snapshot(&self) -> Snapshot {
        Snapshot {
            variables: self.variables.clone(),
            current_node_id: self.current_node_id.clone(),
            next_node: self.next_node.clone(),
            current_flow_id: self.current_flow_id.clone(),
            current_flow_name: self.current_flow_name.clone(),
            call_stack: self.call_stack.clone(),
            pending_choices: self.pending_choices.clone(),
            console_len: self.console.len(),
            log_len: self.execution_log.len(),
            history_len: self.history.len(),
            step_count: self.step_count,
            step_limit_reached: self.step_limit_reached,
        }
    }

    /// Restores a snapshot verbatim, truncating the append-only collections
    /// to their recorded lengths. The session comes back paused.
    pub(crate) fn restore(&mut self, snapshot: Snapshot) {
        self.variables = snapshot.variables;
        self.current_node_id = snapshot.current_node_id;
        self.next_node = snapshot.next_node;
        self.current_flow_id = snapshot.current_flow_id;
        self.current_flow_name = snapshot.current_flow_name;
        self.call_stack = snapshot.call_stack;
        self.pending_choices = snapshot.pending_choices;
        self.console.truncate(snapshot.console_len);
        self.execution_log.truncate(snapshot.log_len);
        self.history.truncate(snapshot.history_len);
        self.step_count = snapshot.step_count;
        self.step_limit_reached = snapshot.step_limit_reached;
        self.status = Status::Paused;
    }
}
