//! Common test utilities for building flows, sheets and sessions.
use fabula::prelude::*;

/// Parses an assignment script the test requires to be valid.
#[allow(dead_code)]
pub fn assignments(text: &str) -> Vec<Assignment> {
    let parsed = parse_assignments(text);
    assert!(
        parsed.is_valid(),
        "assignment script '{}' failed to parse: {:?}",
        text,
        parsed.errors
    );
    parsed.assignments
}

/// Parses a condition expression the test requires to be valid.
#[allow(dead_code)]
pub fn condition(text: &str) -> Condition {
    let parsed = parse_condition(text);
    assert!(
        parsed.is_valid(),
        "condition '{}' failed to parse: {:?}",
        text,
        parsed.errors
    );
    parsed.condition
}

/// Creates the sheet store most tests run against.
///
/// Declares:
/// - `mc.jaime.health` (number, 60)
/// - `mc.jaime.name` (text, "Jaime")
/// - `party.together` (boolean, true)
/// - `world.visited` (boolean, false)
/// - `quests.main.act1.done` (boolean, false), a table cell
/// - `inventory.loadout` (multi_select, ["sword", "torch"])
#[allow(dead_code)]
pub fn create_sample_sheets() -> MemorySheetStore {
    MemorySheetStore::new()
        .declare("mc.jaime", "health", VarType::Number, Value::Number(60.0))
        .declare(
            "mc.jaime",
            "name",
            VarType::Text,
            Value::Text("Jaime".to_string()),
        )
        .declare("party", "together", VarType::Boolean, Value::Bool(true))
        .declare("world", "visited", VarType::Boolean, Value::Bool(false))
        .declare(
            "quests",
            "main.act1.done",
            VarType::Boolean,
            Value::Bool(false),
        )
        .declare(
            "inventory",
            "loadout",
            VarType::MultiSelect,
            Value::List(vec!["sword".to_string(), "torch".to_string()]),
        )
}

/// Creates a simple linear flow for basic stepping tests.
///
/// Path: `start` -> `tavern` (scene) -> `hit` (health -= 10) -> `done`
#[allow(dead_code)]
pub fn create_linear_flow() -> FlowGraph {
    FlowGraph::new("night_out", "Tavern Night")
        .with_node(Node::new("start", NodeBody::Entry))
        .with_node(Node::new(
            "tavern",
            NodeBody::Scene {
                description: "A smoky tavern".to_string(),
            },
        ))
        .with_node(
            Node::new(
                "hit",
                NodeBody::Instruction {
                    assignments: assignments("mc.jaime.health -= 10"),
                },
            )
            .with_label("take damage"),
        )
        .with_node(Node::new("done", NodeBody::Exit))
        .with_connection(Connection::new("start", "output", "tavern"))
        .with_connection(Connection::new("tavern", "output", "hit"))
        .with_connection(Connection::new("hit", "output", "done"))
}

/// Creates a dialogue flow with one gated and one always-open response.
///
/// `talk` offers "Fight" (needs `mc.jaime.health > 50`, leads to `brawl`)
/// and "Run away" (always valid, leads to `fled`).
#[allow(dead_code)]
pub fn create_dialogue_flow() -> FlowGraph {
    FlowGraph::new("trouble", "Trouble")
        .with_node(Node::new("start", NodeBody::Entry))
        .with_node(Node::new(
            "talk",
            NodeBody::Dialogue {
                speaker: Some("Brute".to_string()),
                text: "You want trouble?".to_string(),
                responses: vec![
                    DialogueResponse::new("r_fight", "Fight")
                        .with_condition(condition("mc.jaime.health > 50")),
                    DialogueResponse::new("r_flee", "Run away"),
                ],
            },
        ))
        .with_node(
            Node::new(
                "brawl",
                NodeBody::Instruction {
                    assignments: assignments("mc.jaime.health -= 20"),
                },
            )
            .with_label("brawl"),
        )
        .with_node(Node::new("fled", NodeBody::Exit))
        .with_node(Node::new("bruised", NodeBody::Exit))
        .with_connection(Connection::new("start", "output", "talk"))
        .with_connection(Connection::new("talk", "r_fight", "brawl"))
        .with_connection(Connection::new("talk", "r_flee", "fled"))
        .with_connection(Connection::new("brawl", "output", "bruised"))
}

/// Creates a boolean condition flow gated by `expression`.
///
/// Path: `start` -> `gate` -> `win` (true pin) or `lose` (false pin)
#[allow(dead_code)]
pub fn create_condition_flow(expression: &str) -> FlowGraph {
    FlowGraph::new("gated", "Gated")
        .with_node(Node::new("start", NodeBody::Entry))
        .with_node(Node::new(
            "gate",
            NodeBody::Condition {
                condition: condition(expression),
                switch_mode: false,
            },
        ))
        .with_node(Node::new("win", NodeBody::Exit))
        .with_node(Node::new("lose", NodeBody::Exit))
        .with_connection(Connection::new("start", "output", "gate"))
        .with_connection(Connection::new("gate", "true", "win"))
        .with_connection(Connection::new("gate", "false", "lose"))
}

/// Creates a switch-mode condition flow from two rule expressions.
///
/// The first matching rule's pin leads to `branch_1`/`branch_2`; the default
/// pin leads to `fallback`. Rule pins carry the parsed rule ids, mirroring
/// how the editor wires switch outputs.
#[allow(dead_code)]
pub fn create_switch_flow(first_rule: &str, second_rule: &str) -> FlowGraph {
    let switch = condition(&format!("{} && {}", first_rule, second_rule));
    let first_pin = switch.rules[0].id.clone();
    let second_pin = switch.rules[1].id.clone();
    FlowGraph::new("router", "Router")
        .with_node(Node::new("start", NodeBody::Entry))
        .with_node(Node::new(
            "route",
            NodeBody::Condition {
                condition: switch,
                switch_mode: true,
            },
        ))
        .with_node(Node::new("branch_1", NodeBody::Exit))
        .with_node(Node::new("branch_2", NodeBody::Exit))
        .with_node(Node::new("fallback", NodeBody::Exit))
        .with_connection(Connection::new("start", "output", "route"))
        .with_connection(Connection::new("route", first_pin, "branch_1"))
        .with_connection(Connection::new("route", second_pin, "branch_2"))
        .with_connection(Connection::new("route", "default", "fallback"))
}

/// Creates a store with a main flow that calls a sub flow and resumes after.
///
/// Main: `start` -> `call` (subflow) -> `after` (scene) -> `done`
/// Sub: `sub_start` -> `sub_work` (world.visited = true) -> `sub_done`
#[allow(dead_code)]
pub fn create_subflow_store() -> MemoryFlowStore {
    let main = FlowGraph::new("main", "Main")
        .with_node(Node::new("start", NodeBody::Entry))
        .with_node(Node::new(
            "call",
            NodeBody::Subflow {
                target_flow_id: "sub".to_string(),
            },
        ))
        .with_node(Node::new(
            "after",
            NodeBody::Scene {
                description: "Back in the tavern".to_string(),
            },
        ))
        .with_node(Node::new("done", NodeBody::Exit))
        .with_connection(Connection::new("start", "output", "call"))
        .with_connection(Connection::new("call", "output", "after"))
        .with_connection(Connection::new("after", "output", "done"));

    let sub = FlowGraph::new("sub", "Sub")
        .with_node(Node::new("sub_start", NodeBody::Entry))
        .with_node(Node::new(
            "sub_work",
            NodeBody::Instruction {
                assignments: assignments("world.visited = true"),
            },
        ))
        .with_node(Node::new("sub_done", NodeBody::Exit))
        .with_connection(Connection::new("sub_start", "output", "sub_work"))
        .with_connection(Connection::new("sub_work", "output", "sub_done"));

    MemoryFlowStore::from_graphs([main, sub])
}

/// Creates a flow that cycles forever, for runaway guard tests.
///
/// Cycle: `start` -> `spin` (hub) -> `beat` (scene) -> `spin` -> ...
#[allow(dead_code)]
pub fn create_loop_flow() -> FlowGraph {
    FlowGraph::new("endless", "Endless")
        .with_node(Node::new("start", NodeBody::Entry))
        .with_node(Node::new("spin", NodeBody::Hub))
        .with_node(Node::new(
            "beat",
            NodeBody::Scene {
                description: String::new(),
            },
        ))
        .with_connection(Connection::new("start", "output", "spin"))
        .with_connection(Connection::new("spin", "out1", "beat"))
        .with_connection(Connection::new("beat", "output", "spin"))
}

/// Opens a session on a single flow, seeded with the sample sheets.
#[allow(dead_code)]
pub fn start_session(graph: FlowGraph) -> DebugSession<MemoryFlowStore> {
    start_session_with_sheets(graph, &create_sample_sheets())
}

/// Opens a session on a single flow with a custom sheet store.
#[allow(dead_code)]
pub fn start_session_with_sheets(
    graph: FlowGraph,
    sheets: &MemorySheetStore,
) -> DebugSession<MemoryFlowStore> {
    let flow_id = graph.id.clone();
    let store = MemoryFlowStore::from_graphs([graph]);
    DebugSession::start(store, sheets, &flow_id, None).expect("Failed to start session")
}

/// The node ids of the execution log, in step order.
#[allow(dead_code)]
pub fn logged_nodes<S: FlowStore>(session: &DebugSession<S>) -> Vec<String> {
    session
        .state()
        .execution_log
        .iter()
        .map(|entry| entry.node_id.clone())
        .collect()
}

/// Whether any console entry message contains `needle`.
#[allow(dead_code)]
pub fn console_contains<S: FlowStore>(session: &DebugSession<S>, needle: &str) -> bool {
    session
        .state()
        .console
        .iter()
        .any(|entry| entry.message.contains(needle))
}
