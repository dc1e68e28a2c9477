//! # Fabula - Narrative Flow Execution and Debugging Engine
//!
//! **Fabula** is an execution engine for node-based narrative flows: dialogue
//! trees, branching scenes and the scripted conditions and instructions that
//! wire them together. It walks a flow graph one node at a time under a
//! debugger-style session with breakpoints, step-back, variable overrides,
//! a runaway-loop guard and a full execution trace.
//!
//! ## Core Workflow
//!
//! The engine is format-agnostic. It operates on a canonical model of a "flow
//! graph" plus a variable store seeded from authoring sheets. The primary
//! workflow is:
//!
//! 1.  **Load Your Data**: Parse your editor's export format (e.g. from JSON) into your own Rust structs.
//! 2.  **Convert to Fabula's Model**: Implement the [`IntoFlowGraph`](flow::IntoFlowGraph) trait for your structs, or use the JSON helpers for the native format.
//! 3.  **Store**: Put the graphs in a [`FlowStore`](flow::FlowStore) and the variable declarations in a [`SheetStore`](flow::SheetStore).
//! 4.  **Execute**: Open a [`DebugSession`](session::DebugSession) on a flow and drive it with `step`, `play`/`tick`, `choose_response` and `step_back`.
//!
//! ## Quick Start
//!
//! The following example builds a small flow in code and runs it to the end.
//!
//! ```rust,no_run
//! use fabula::prelude::*;
//!
//! fn main() -> Result<()> {
//!     // Build a tiny flow in code. Real projects load these from JSON via
//!     // `flow_graphs_from_json` or an `IntoFlowGraph` implementation.
//!     let flow = FlowGraph::new("main", "Main")
//!         .with_node(Node::new("start", NodeBody::Entry))
//!         .with_node(Node::new(
//!             "greet",
//!             NodeBody::Dialogue {
//!                 speaker: Some("Jaime".to_string()),
//!                 text: "Hello there!".to_string(),
//!                 responses: vec![],
//!             },
//!         ))
//!         .with_node(Node::new("done", NodeBody::Exit))
//!         .with_connection(Connection::new("start", "output", "greet"))
//!         .with_connection(Connection::new("greet", "output", "done"));
//!
//!     let mut store = MemoryFlowStore::new();
//!     store.insert(flow)?;
//!     let sheets = MemorySheetStore::new().declare(
//!         "mc.jaime",
//!         "health",
//!         VarType::Number,
//!         Value::Number(60.0),
//!     );
//!
//!     // Open a session, set a breakpoint and run until something stops us.
//!     let mut session = DebugSession::start(store, &sheets, "main", None)?;
//!     session.toggle_breakpoint("greet");
//!     session.run_until_pause()?;
//!
//!     // Inspect what happened.
//!     println!("{}", TraceFormatter::format_console(&session.state().console));
//!     println!("status: {}", session.state().status);
//!
//!     Ok(())
//! }
//! ```

pub mod engine;
pub mod error;
pub mod eval;
pub mod flow;
pub mod prelude;
pub mod script;
pub mod session;
pub mod trace;
pub mod value;
pub mod vars;
