//! Prelude module for convenient imports
//!
//! This module re-exports the most commonly used types and traits from the fabula crate.
//! Import this module to get access to the core functionality without having to import
//! each type individually.
//!
//! # Example
//!
//! ```rust,no_run
//! // Use the prelude to get easy access to all the core types.
//! use fabula::prelude::*;
//!
//! # fn run_example() -> Result<()> {
//! // Load flow graphs and variable sheet seeds
//! let flows_json = std::fs::read_to_string("path/to/flows.json")?;
//! let sheets_json = std::fs::read_to_string("path/to/sheets.json")?;
//!
//! let store = MemoryFlowStore::from_graphs(flow_graphs_from_json(&flows_json)?);
//! let sheets = MemorySheetStore::from_seeds(variable_seeds_from_json(&sheets_json)?);
//!
//! // Open a session and run until something needs attention
//! let mut session = DebugSession::start(store, &sheets, "main", None)?;
//! session.run_until_pause()?;
//!
//! println!("{}", TraceFormatter::format_console(&session.state().console));
//! # Ok(())
//! # }
//! ```

// Session control
pub use crate::session::{
    ARTIFACT_FORMAT_VERSION, CallFrameView, DEFAULT_MAX_STEPS, DebugSession, STEP_LIMIT_INCREMENT,
    SessionArtifact, SessionView,
};

// Execution state
pub use crate::engine::{
    CallFrame, ChangeRecord, ConsoleEntry, ConsoleLevel, ExecutionState, LogEntry, PendingChoice,
    Snapshot, Status,
};

// Flow graphs and stores
pub use crate::flow::{
    Connection, DialogueResponse, FlowGraph, FlowStore, IntoFlowGraph, MemoryFlowStore,
    MemorySheetStore, Node, NodeBody, SheetStore, VariableSeed, flow_graph_from_json,
    flow_graphs_from_json, validate_flow_graph, variable_seeds_from_json,
};

// Script language
pub use crate::script::{
    AssignOp, Assignment, Condition, Logic, ParsedAssignments, ParsedCondition, Rule, RuleOp,
    ScriptError, ValueKind, parse_assignments, parse_condition,
};

// Values and variables
pub use crate::value::{Value, VarType};
pub use crate::vars::{Suggestion, SuggestionKind, VarSource, Variable, VariableStore, suggest};

// Evaluation
pub use crate::eval::{
    AssignmentOutcome, ConditionEvaluation, Decision, RuleDetail, SkipReason, apply_assignment,
    evaluate_condition, evaluate_rule,
};

// Error types
pub use crate::error::{ArtifactError, ConversionError, FlowError, SessionError};

// Trace formatting
pub use crate::trace::TraceFormatter;

// Result type alias for convenience
pub type Result<T> = std::result::Result<T, Box<dyn std::error::Error>>;
