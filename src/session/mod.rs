//! The debug session controller.
//!
//! [`DebugSession`] is the only public way to execute a flow. It owns the
//! [`ExecutionState`] exclusively and drives it strictly one step at a time:
//! snapshot, execute one node, then apply breakpoint and step-limit policy.
//! Auto-play is cooperative; the UI (or CLI) calls [`DebugSession::tick`] on
//! its own cadence and can stop between any two ticks without ever observing
//! a half-finished step.

mod artifact;

pub use artifact::{ARTIFACT_FORMAT_VERSION, SessionArtifact};

use crate::engine::step::{StepOutcome, execute_node};
use crate::engine::{ConsoleEntry, ExecutionState, LogEntry, PendingChoice, Status};
use crate::error::{FlowError, SessionError};
use crate::flow::{FlowStore, SheetStore};
use crate::value::Value;
use crate::vars::{VarSource, Variable};
use itertools::Itertools;
use serde::{Deserialize, Serialize};

/// Runaway-loop budget a fresh session starts with.
pub const DEFAULT_MAX_STEPS: usize = 1000;
/// How much an explicit continue raises the budget.
pub const STEP_LIMIT_INCREMENT: usize = 1000;

/// Interactive, reversible driver of one flow execution.
pub struct DebugSession<S: FlowStore> {
    store: S,
    state: ExecutionState,
    start_flow_id: String,
    start_flow_name: String,
    start_node: String,
    initial_max_steps: usize,
}

impl<S: FlowStore> DebugSession<S> {
    /// Opens a session on `flow_id`, primed at `start_node_id` or the flow's
    /// entry node. Variables are seeded from the sheet store once; the copy
    /// taken here is what [`DebugSession::reset`] later restores.
    pub fn start(
        store: S,
        sheets: &impl SheetStore,
        flow_id: &str,
        start_node_id: Option<&str>,
    ) -> Result<Self, SessionError> {
        let graph = store.get_flow_graph(flow_id)?;
        let start_node = match start_node_id {
            Some(node_id) => graph
                .node(node_id)
                .ok_or_else(|| FlowError::NodeNotFound {
                    flow_id: flow_id.to_string(),
                    node_id: node_id.to_string(),
                })?
                .id
                .clone(),
            None => graph
                .entry_node()
                .ok_or_else(|| FlowError::NoEntryNode(flow_id.to_string()))?
                .id
                .clone(),
        };
        let start_flow_id = graph.id.clone();
        let start_flow_name = graph.name.clone();
        let state = ExecutionState::new(
            start_flow_id.clone(),
            start_flow_name.clone(),
            Some(start_node.clone()),
            sheets.build_initial_variables(),
            DEFAULT_MAX_STEPS,
        );
        Ok(Self {
            store,
            state,
            start_flow_id,
            start_flow_name,
            start_node,
            initial_max_steps: DEFAULT_MAX_STEPS,
        })
    }

    pub fn with_max_steps(mut self, max_steps: usize) -> Self {
        self.initial_max_steps = max_steps;
        self.state.max_steps = max_steps;
        self
    }

    pub fn with_breakpoints<I>(mut self, node_ids: I) -> Self
    where
        I: IntoIterator,
        I::Item: Into<String>,
    {
        self.state.breakpoints = node_ids.into_iter().map(Into::into).collect();
        self
    }

    pub fn state(&self) -> &ExecutionState {
        &self.state
    }

    /// Executes exactly one node.
    ///
    /// A snapshot is pushed before anything mutates, so a failed or stalled
    /// step can always be stepped back out of. Lookup failures inside the
    /// graph degrade to an error console entry plus a paused session; the
    /// `Err` cases here are API misuse only.
    pub fn step(&mut self) -> Result<(), SessionError> {
        match self.state.status {
            Status::Finished => return Err(SessionError::SessionFinished),
            Status::WaitingInput => return Err(SessionError::AwaitingChoice),
            Status::Paused | Status::Running => {}
        }
        if self.state.step_limit_reached {
            return Err(SessionError::StepLimitReached(self.state.max_steps));
        }
        let node_id = match self.state.next_node.clone() {
            Some(node_id) => node_id,
            None => return Err(SessionError::NothingToExecute),
        };

        let snapshot = self.state.snapshot();
        self.state.snapshots.push(snapshot);
        self.state.next_node = None;

        let graph = match self.store.get_flow_graph(&self.state.current_flow_id) {
            Ok(graph) => graph,
            Err(error) => {
                stall(&mut self.state, &node_id, error.to_string());
                return Ok(());
            }
        };
        let node = match graph.node(&node_id) {
            Some(node) => node,
            None => {
                let message = FlowError::NodeNotFound {
                    flow_id: graph.id.clone(),
                    node_id: node_id.clone(),
                }
                .to_string();
                stall(&mut self.state, &node_id, message);
                return Ok(());
            }
        };

        self.state.step_count += 1;
        self.state.current_node_id = Some(node_id.clone());
        // Depth is recorded before the node itself pushes or pops a frame.
        self.state.execution_log.push(LogEntry {
            node_id: node_id.clone(),
            depth: self.state.call_stack.len(),
        });

        match execute_node(&mut self.state, &self.store, graph, node) {
            StepOutcome::Advance(next) => {
                self.state.next_node = Some(next);
            }
            StepOutcome::AwaitChoice => {
                self.state.status = Status::WaitingInput;
            }
            StepOutcome::Finished => {
                self.state.status = Status::Finished;
            }
            StepOutcome::Stalled => {
                self.state.status = Status::Paused;
            }
        }

        // Breakpoints pause at the node, after its step, and only interrupt
        // auto-play; manual stepping walks through them.
        if self.state.status == Status::Running && self.state.breakpoints.contains(&node_id) {
            self.state.status = Status::Paused;
            self.state.console.push(ConsoleEntry::info(
                Some(&node_id),
                node.display_label(),
                "Hit breakpoint",
            ));
        }

        if self.state.step_count >= self.state.max_steps && !self.state.step_limit_reached {
            self.state.step_limit_reached = true;
            if self.state.status == Status::Running {
                self.state.status = Status::Paused;
            }
            self.state.console.push(ConsoleEntry::warning(
                Some(&node_id),
                node.display_label(),
                format!(
                    "Step limit of {} reached; execution paused",
                    self.state.max_steps
                ),
            ));
        }

        Ok(())
    }

    /// Rolls the session back exactly one step.
    pub fn step_back(&mut self) -> Result<(), SessionError> {
        let snapshot = self
            .state
            .snapshots
            .pop()
            .ok_or(SessionError::NothingToUndo)?;
        self.state.restore(snapshot);
        Ok(())
    }

    /// Switches to auto-play. The caller owns the cadence via [`tick`].
    ///
    /// [`tick`]: DebugSession::tick
    pub fn play(&mut self) -> Result<(), SessionError> {
        match self.state.status {
            Status::Finished => Err(SessionError::SessionFinished),
            Status::WaitingInput => Err(SessionError::AwaitingChoice),
            Status::Paused | Status::Running => {
                self.state.status = Status::Running;
                Ok(())
            }
        }
    }

    pub fn pause(&mut self) {
        if self.state.status == Status::Running {
            self.state.status = Status::Paused;
        }
    }

    /// One auto-play tick: a single step, then a report on whether auto-play
    /// is still running. Breakpoints, the step limit, input waits, stalls
    /// and the end of the flow all stop the ticking.
    pub fn tick(&mut self) -> Result<bool, SessionError> {
        if self.state.status != Status::Running {
            return Ok(false);
        }
        self.step()?;
        Ok(self.state.status == Status::Running)
    }

    /// Convenience loop over [`DebugSession::tick`] for headless runs.
    pub fn run_until_pause(&mut self) -> Result<(), SessionError> {
        self.play()?;
        while self.tick()? {}
        Ok(())
    }

    /// Returns whether the node now has a breakpoint.
    pub fn toggle_breakpoint(&mut self, node_id: &str) -> bool {
        if self.state.breakpoints.remove(node_id) {
            false
        } else {
            self.state.breakpoints.insert(node_id.to_string());
            true
        }
    }

    /// Overrides one variable from the debugger.
    ///
    /// The write is tagged `user_override` and recorded in the history, so
    /// the UI can badge it apart from instruction writes. Writing the value
    /// a variable already holds is a silent no-op.
    pub fn set_variable(&mut self, key: &str, value: Value) -> Result<(), SessionError> {
        let variable = self
            .state
            .variables
            .get_mut(key)
            .ok_or_else(|| SessionError::UnknownVariable(key.to_string()))?;
        if variable.value == value {
            return Ok(());
        }
        let old = variable.value.clone();
        variable.apply(value.clone(), VarSource::UserOverride);
        self.state
            .record_change("user override", key, old, value, VarSource::UserOverride);
        Ok(())
    }

    /// Resolves `waiting_input` by picking one of the pending choices.
    ///
    /// Choosing is not a step: it primes the chosen response's target node,
    /// and the next [`DebugSession::step`] executes it.
    pub fn choose_response(&mut self, response_id: &str) -> Result<(), SessionError> {
        if self.state.status != Status::WaitingInput {
            return Err(SessionError::NotWaitingForChoice);
        }
        let choice = self
            .state
            .pending_choices
            .iter()
            .find(|choice| choice.response_id == response_id)
            .ok_or_else(|| SessionError::UnknownResponse(response_id.to_string()))?;
        if !choice.valid {
            return Err(SessionError::ChoiceNotAvailable(response_id.to_string()));
        }
        let text = choice.text.clone();
        let node_id = match self.state.current_node_id.clone() {
            Some(node_id) => node_id,
            None => return Err(SessionError::NothingToExecute),
        };

        let (label, target) = match self.store.get_flow_graph(&self.state.current_flow_id) {
            Ok(graph) => (
                graph
                    .node(&node_id)
                    .map(|n| n.display_label().to_string())
                    .unwrap_or_else(|| node_id.clone()),
                graph.target_of(&node_id, response_id).map(String::from),
            ),
            Err(error) => {
                self.state.pending_choices.clear();
                stall(&mut self.state, &node_id, error.to_string());
                return Ok(());
            }
        };

        self.state.pending_choices.clear();
        self.state.console.push(ConsoleEntry::info(
            Some(&node_id),
            label.clone(),
            format!("Chose: {}", text),
        ));
        match target {
            Some(target) => {
                self.state.next_node = Some(target);
                self.state.status = Status::Paused;
            }
            None => {
                self.state.console.push(ConsoleEntry::error(
                    Some(&node_id),
                    label,
                    format!("No connection for response '{}'", response_id),
                ));
                self.state.status = Status::Paused;
            }
        }
        Ok(())
    }

    /// Raises the step budget after the runaway guard tripped. The guard
    /// never lifts itself; this call is the only way past it.
    pub fn continue_past_limit(&mut self) -> Result<(), SessionError> {
        if !self.state.step_limit_reached {
            return Err(SessionError::LimitNotReached);
        }
        self.state.max_steps += STEP_LIMIT_INCREMENT;
        self.state.step_limit_reached = false;
        self.state.console.push(ConsoleEntry::info(
            None,
            "session",
            format!("Step limit raised to {}", self.state.max_steps),
        ));
        Ok(())
    }

    /// Returns the session to its start state: pristine variables, empty
    /// console/history/log, the start node primed again. Breakpoints and the
    /// configured step budget survive.
    pub fn reset(&mut self) {
        let breakpoints = std::mem::take(&mut self.state.breakpoints);
        let mut state = ExecutionState::new(
            self.start_flow_id.clone(),
            self.start_flow_name.clone(),
            Some(self.start_node.clone()),
            self.state.initial_variables.clone(),
            self.initial_max_steps,
        );
        state.breakpoints = breakpoints;
        self.state = state;
    }

    /// Captures the full state for bug reports and offline inspection.
    pub fn capture_artifact(&self) -> SessionArtifact {
        SessionArtifact::capture(&self.state)
    }

    /// The render subset UIs consume after every interaction.
    pub fn view(&self) -> SessionView {
        SessionView {
            status: self.state.status,
            step_count: self.state.step_count,
            current_node_id: self.state.current_node_id.clone(),
            current_flow_id: self.state.current_flow_id.clone(),
            variables: self
                .state
                .variables
                .iter()
                .cloned()
                .sorted_by(|a, b| a.key.cmp(&b.key))
                .collect(),
            console: self.state.console.clone(),
            execution_log: self.state.execution_log.clone(),
            breakpoints: self.state.breakpoints.iter().cloned().sorted().collect(),
            call_stack: self
                .state
                .call_stack
                .iter()
                .map(|frame| CallFrameView {
                    flow_id: frame.flow_id.clone(),
                    flow_name: frame.flow_name.clone(),
                })
                .collect(),
            pending_choices: self.state.pending_choices.clone(),
            step_limit_reached: self.state.step_limit_reached,
            max_steps: self.state.max_steps,
        }
    }
}

/// An in-graph failure: report it on the console and pause, never crash.
fn stall(state: &mut ExecutionState, node_id: &str, message: String) {
    state
        .console
        .push(ConsoleEntry::error(Some(node_id), node_id, message));
    state.status = Status::Paused;
}

/// Serializable render subset of [`ExecutionState`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionView {
    pub status: Status,
    pub step_count: usize,
    pub current_node_id: Option<String>,
    pub current_flow_id: String,
    /// Sorted by key for a stable variable panel.
    pub variables: Vec<Variable>,
    pub console: Vec<ConsoleEntry>,
    pub execution_log: Vec<LogEntry>,
    pub breakpoints: Vec<String>,
    pub call_stack: Vec<CallFrameView>,
    pub pending_choices: Vec<PendingChoice>,
    pub step_limit_reached: bool,
    pub max_steps: usize,
}

/// Caller frame as rendered; the return node stays engine-internal.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CallFrameView {
    pub flow_id: String,
    pub flow_name: String,
}
