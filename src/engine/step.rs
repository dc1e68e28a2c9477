use super::{CallFrame, ConsoleEntry, ExecutionState, PendingChoice};
use crate::error::FlowError;
use crate::eval::{self, AssignmentOutcome, Decision};
use crate::flow::{DialogueResponse, FlowGraph, FlowStore, Node, NodeBody, pin};
use crate::script::{Assignment, Condition};
use crate::vars::VarSource;

/// What executing one node asks the session to do next.
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum StepOutcome {
    /// Prime this node for the next step.
    Advance(String),
    /// Offer the pending choices and wait for input.
    AwaitChoice,
    /// The run ended normally.
    Finished,
    /// The graph is broken at this node; stay paused so it can be fixed.
    Stalled,
}

/// Executes one node. Every visit pushes at least one console entry; graph
/// problems never return an error, they stall the session instead.
pub(crate) fn execute_node<S: FlowStore>(
    state: &mut ExecutionState,
    store: &S,
    graph: &FlowGraph,
    node: &Node,
) -> StepOutcome {
    match &node.body {
        NodeBody::Entry => visit_entry(state, graph, node),
        NodeBody::Exit => visit_exit(state, node),
        NodeBody::Dialogue {
            speaker,
            text,
            responses,
        } => visit_dialogue(state, graph, node, speaker.as_deref(), text, responses),
        NodeBody::Hub => visit_hub(state, graph, node),
        NodeBody::Condition {
            condition,
            switch_mode,
        } => visit_condition(state, graph, node, condition, *switch_mode),
        NodeBody::Instruction { assignments } => visit_instruction(state, graph, node, assignments),
        NodeBody::Jump {
            target_flow_id,
            target_node_id,
        } => visit_call(
            state,
            store,
            graph,
            node,
            target_flow_id,
            target_node_id.as_deref(),
        ),
        NodeBody::Scene { description } => visit_scene(state, graph, node, description),
        NodeBody::Subflow { target_flow_id } => {
            visit_call(state, store, graph, node, target_flow_id, None)
        }
    }
}

/// Follows `source_pin` out of the node. A missing connection is an invalid
/// transition: error entry, stall.
fn follow(
    state: &mut ExecutionState,
    graph: &FlowGraph,
    node: &Node,
    source_pin: &str,
) -> StepOutcome {
    match graph.target_of(&node.id, source_pin) {
        Some(target) => StepOutcome::Advance(target.to_string()),
        None => {
            state.console.push(ConsoleEntry::error(
                Some(&node.id),
                node.display_label(),
                format!("No connection on pin '{}'", source_pin),
            ));
            StepOutcome::Stalled
        }
    }
}

fn visit_entry(state: &mut ExecutionState, graph: &FlowGraph, node: &Node) -> StepOutcome {
    state.console.push(ConsoleEntry::info(
        Some(&node.id),
        node.display_label(),
        format!("Execution started in '{}'", state.current_flow_name),
    ));
    follow(state, graph, node, pin::OUTPUT)
}

fn visit_exit(state: &mut ExecutionState, node: &Node) -> StepOutcome {
    let Some(frame) = state.call_stack.pop() else {
        state.console.push(ConsoleEntry::info(
            Some(&node.id),
            node.display_label(),
            "Flow finished",
        ));
        return StepOutcome::Finished;
    };

    // Jump and subflow frames return identically; the frame alone decides.
    state.current_flow_id = frame.flow_id;
    state.current_flow_name = frame.flow_name;
    match frame.return_node_id {
        Some(return_node) => {
            state.console.push(ConsoleEntry::info(
                Some(&node.id),
                node.display_label(),
                format!("Returning to '{}'", state.current_flow_name),
            ));
            StepOutcome::Advance(return_node)
        }
        None => {
            state.console.push(ConsoleEntry::info(
                Some(&node.id),
                node.display_label(),
                format!(
                    "Returned to '{}', which has nothing left to run",
                    state.current_flow_name
                ),
            ));
            StepOutcome::Finished
        }
    }
}

fn visit_dialogue(
    state: &mut ExecutionState,
    graph: &FlowGraph,
    node: &Node,
    speaker: Option<&str>,
    text: &str,
    responses: &[DialogueResponse],
) -> StepOutcome {
    let line = match speaker {
        Some(speaker) => format!("{}: {}", speaker, text),
        None => text.to_string(),
    };
    state
        .console
        .push(ConsoleEntry::info(Some(&node.id), node.display_label(), line));

    if !responses.is_empty() {
        // Failed-condition responses stay listed, tagged invalid, so authors
        // see what was withheld and why the run went elsewhere.
        let choices: Vec<PendingChoice> = responses
            .iter()
            .map(|response| PendingChoice {
                response_id: response.id.clone(),
                text: response.text.clone(),
                valid: eval::evaluate_condition(&response.condition, false, &state.variables)
                    .is_met(),
            })
            .collect();
        if choices.iter().any(|choice| choice.valid) {
            state.pending_choices = choices;
            return StepOutcome::AwaitChoice;
        }
        state.console.push(ConsoleEntry::info(
            Some(&node.id),
            node.display_label(),
            "No response is currently available",
        ));
    }

    match graph.target_of(&node.id, pin::OUTPUT) {
        Some(target) => StepOutcome::Advance(target.to_string()),
        None => {
            state.console.push(ConsoleEntry::info(
                Some(&node.id),
                node.display_label(),
                "Dialogue ended the flow",
            ));
            StepOutcome::Finished
        }
    }
}

fn visit_hub(state: &mut ExecutionState, graph: &FlowGraph, node: &Node) -> StepOutcome {
    for pin_name in pin::HUB_OUTS {
        if let Some(target) = graph.target_of(&node.id, pin_name) {
            state.console.push(ConsoleEntry::info(
                Some(&node.id),
                node.display_label(),
                format!("Forwarding via '{}'", pin_name),
            ));
            return StepOutcome::Advance(target.to_string());
        }
    }
    state.console.push(ConsoleEntry::error(
        Some(&node.id),
        node.display_label(),
        "No hub output is connected",
    ));
    StepOutcome::Stalled
}

fn visit_condition(
    state: &mut ExecutionState,
    graph: &FlowGraph,
    node: &Node,
    condition: &Condition,
    switch_mode: bool,
) -> StepOutcome {
    let evaluation = eval::evaluate_condition(condition, switch_mode, &state.variables);
    match evaluation.decision {
        Decision::Holds(holds) => {
            state.console.push(
                ConsoleEntry::info(
                    Some(&node.id),
                    node.display_label(),
                    if holds {
                        "Condition passed"
                    } else {
                        "Condition failed"
                    },
                )
                .with_details(evaluation.details),
            );
            follow(state, graph, node, if holds { pin::TRUE } else { pin::FALSE })
        }
        // Switch mode: the matching rule's id doubles as its output pin.
        Decision::Route(Some(index)) => {
            let rule_id = condition.rules[index].id.clone();
            state.console.push(
                ConsoleEntry::info(
                    Some(&node.id),
                    node.display_label(),
                    format!("Rule {} matched", index + 1),
                )
                .with_details(evaluation.details),
            );
            follow(state, graph, node, &rule_id)
        }
        Decision::Route(None) => match graph.target_of(&node.id, pin::DEFAULT) {
            Some(target) => {
                state.console.push(
                    ConsoleEntry::info(
                        Some(&node.id),
                        node.display_label(),
                        "No rule matched, taking the default",
                    )
                    .with_details(evaluation.details),
                );
                StepOutcome::Advance(target.to_string())
            }
            None => {
                state.console.push(
                    ConsoleEntry::error(
                        Some(&node.id),
                        node.display_label(),
                        "No rule matched and no default connection exists",
                    )
                    .with_details(evaluation.details),
                );
                StepOutcome::Stalled
            }
        },
    }
}

fn visit_instruction(
    state: &mut ExecutionState,
    graph: &FlowGraph,
    node: &Node,
    assignments: &[Assignment],
) -> StepOutcome {
    let mut applied = 0usize;
    for assignment in assignments {
        match eval::apply_assignment(assignment, &mut state.variables) {
            AssignmentOutcome::Changed { key, old, new } => {
                state.record_change(node.display_label(), &key, old, new, VarSource::Instruction);
                applied += 1;
            }
            AssignmentOutcome::Skipped { key, reason } => {
                if reason.is_warning() {
                    state.console.push(ConsoleEntry::warning(
                        Some(&node.id),
                        node.display_label(),
                        format!(
                            "Skipped '{} {}': {}",
                            key,
                            assignment.operator.symbol(),
                            reason
                        ),
                    ));
                }
            }
        }
    }
    state.console.push(ConsoleEntry::info(
        Some(&node.id),
        node.display_label(),
        format!("Applied {} of {} assignment(s)", applied, assignments.len()),
    ));
    follow(state, graph, node, pin::OUTPUT)
}

fn visit_scene(
    state: &mut ExecutionState,
    graph: &FlowGraph,
    node: &Node,
    description: &str,
) -> StepOutcome {
    let message = if description.is_empty() {
        "Scene change".to_string()
    } else {
        format!("Scene: {}", description)
    };
    state.console.push(ConsoleEntry::info(
        Some(&node.id),
        node.display_label(),
        message,
    ));
    follow(state, graph, node, pin::OUTPUT)
}

/// Shared by jump and subflow: push a caller frame, switch to the target
/// flow. The return point is wherever this node's `output` pin leads,
/// captured now so the exit node needs no per-type handling.
fn visit_call<S: FlowStore>(
    state: &mut ExecutionState,
    store: &S,
    graph: &FlowGraph,
    node: &Node,
    target_flow_id: &str,
    target_node_id: Option<&str>,
) -> StepOutcome {
    let return_node_id = graph.target_of(&node.id, pin::OUTPUT).map(String::from);

    let target_graph = match store.get_flow_graph(target_flow_id) {
        Ok(target_graph) => target_graph,
        Err(error) => {
            state.console.push(ConsoleEntry::error(
                Some(&node.id),
                node.display_label(),
                error.to_string(),
            ));
            return StepOutcome::Stalled;
        }
    };

    let start = match target_node_id {
        Some(node_id) => match store.get_node_by_technical_id(target_flow_id, node_id) {
            Ok(target) => target.id.clone(),
            Err(error) => {
                state.console.push(ConsoleEntry::error(
                    Some(&node.id),
                    node.display_label(),
                    error.to_string(),
                ));
                return StepOutcome::Stalled;
            }
        },
        None => match target_graph.entry_node() {
            Some(entry) => entry.id.clone(),
            None => {
                state.console.push(ConsoleEntry::error(
                    Some(&node.id),
                    node.display_label(),
                    FlowError::NoEntryNode(target_flow_id.to_string()).to_string(),
                ));
                return StepOutcome::Stalled;
            }
        },
    };

    state.call_stack.push(CallFrame {
        flow_id: state.current_flow_id.clone(),
        flow_name: state.current_flow_name.clone(),
        return_node_id,
    });
    state.current_flow_id = target_graph.id.clone();
    state.current_flow_name = target_graph.name.clone();
    state.console.push(ConsoleEntry::info(
        Some(&node.id),
        node.display_label(),
        format!("Entering flow '{}'", state.current_flow_name),
    ));
    StepOutcome::Advance(start)
}
