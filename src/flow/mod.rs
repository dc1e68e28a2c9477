//! The flow graph the engine walks.
//!
//! A flow is a directed graph of typed nodes wired together by named pins.
//! The graph layer is deliberately dumb: it stores nodes and connections and
//! answers lookup queries, while all transition logic lives in the engine.
//! Node payloads are a tagged union keyed by the node type, so the wire
//! format stays `{id, label?, type, data}`.

mod convert;
mod store;

pub use convert::{
    IntoFlowGraph, flow_graph_from_json, flow_graphs_from_json, validate_flow_graph,
};
pub use store::{
    FlowStore, MemoryFlowStore, MemorySheetStore, SheetStore, VariableSeed,
    variable_seeds_from_json,
};

use crate::script::{Assignment, Condition};
use serde::{Deserialize, Serialize};

/// Pin names the engine follows per node type.
pub mod pin {
    /// Single forward output of entry, dialogue, instruction, scene and
    /// jump/subflow nodes.
    pub const OUTPUT: &str = "output";
    /// Boolean-mode condition outputs.
    pub const TRUE: &str = "true";
    pub const FALSE: &str = "false";
    /// Switch-mode fallthrough when no rule matched.
    pub const DEFAULT: &str = "default";
    /// Hub outputs, probed in fixed order.
    pub const HUB_OUTS: [&str; 4] = ["out1", "out2", "out3", "out4"];
}

/// One selectable answer on a dialogue node.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DialogueResponse {
    pub id: String,
    pub text: String,
    /// Gating condition; vacuous when the response is always available.
    #[serde(default)]
    pub condition: Condition,
}

impl DialogueResponse {
    pub fn new(id: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            text: text.into(),
            condition: Condition::vacuous(),
        }
    }

    pub fn with_condition(mut self, condition: Condition) -> Self {
        self.condition = condition;
        self
    }
}

/// Type-specific payload of a node.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data", rename_all = "snake_case")]
pub enum NodeBody {
    /// Where execution starts. One per flow.
    Entry,
    /// Pops back to the caller flow, or finishes the session at top level.
    Exit,
    Dialogue {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        speaker: Option<String>,
        #[serde(default)]
        text: String,
        #[serde(default, skip_serializing_if = "Vec::is_empty")]
        responses: Vec<DialogueResponse>,
    },
    /// Merge/fan-out point with no logic of its own.
    Hub,
    Condition {
        condition: Condition,
        #[serde(default)]
        switch_mode: bool,
    },
    Instruction {
        #[serde(default)]
        assignments: Vec<Assignment>,
    },
    Jump {
        target_flow_id: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        target_node_id: Option<String>,
    },
    /// Stage direction shown in the console; otherwise a pass-through.
    Scene {
        #[serde(default)]
        description: String,
    },
    Subflow {
        target_flow_id: String,
    },
}

impl NodeBody {
    /// Wire name of the node type, also the fallback display label.
    pub fn kind_name(&self) -> &'static str {
        match self {
            NodeBody::Entry => "entry",
            NodeBody::Exit => "exit",
            NodeBody::Dialogue { .. } => "dialogue",
            NodeBody::Hub => "hub",
            NodeBody::Condition { .. } => "condition",
            NodeBody::Instruction { .. } => "instruction",
            NodeBody::Jump { .. } => "jump",
            NodeBody::Scene { .. } => "scene",
            NodeBody::Subflow { .. } => "subflow",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Node {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    #[serde(flatten)]
    pub body: NodeBody,
}

impl Node {
    pub fn new(id: impl Into<String>, body: NodeBody) -> Self {
        Self {
            id: id.into(),
            label: None,
            body,
        }
    }

    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }

    /// Authored label, falling back to the node type name.
    pub fn display_label(&self) -> &str {
        self.label.as_deref().unwrap_or_else(|| self.body.kind_name())
    }
}

/// A wire from one node's output pin to another node's input pin.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Connection {
    pub source_node_id: String,
    pub source_pin: String,
    pub target_node_id: String,
    #[serde(default = "Connection::default_target_pin")]
    pub target_pin: String,
}

impl Connection {
    pub fn new(
        source_node_id: impl Into<String>,
        source_pin: impl Into<String>,
        target_node_id: impl Into<String>,
    ) -> Self {
        Self {
            source_node_id: source_node_id.into(),
            source_pin: source_pin.into(),
            target_node_id: target_node_id.into(),
            target_pin: Self::default_target_pin(),
        }
    }

    fn default_target_pin() -> String {
        "input".to_string()
    }
}

/// One flow: nodes plus the connections between them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FlowGraph {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub nodes: Vec<Node>,
    #[serde(default)]
    pub connections: Vec<Connection>,
}

impl FlowGraph {
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            nodes: Vec::new(),
            connections: Vec::new(),
        }
    }

    pub fn with_node(mut self, node: Node) -> Self {
        self.nodes.push(node);
        self
    }

    pub fn with_connection(mut self, connection: Connection) -> Self {
        self.connections.push(connection);
        self
    }

    pub fn node(&self, node_id: &str) -> Option<&Node> {
        self.nodes.iter().find(|n| n.id == node_id)
    }

    /// The flow's entry node. Exactly one is expected; the first wins if an
    /// unvalidated graph carries several.
    pub fn entry_node(&self) -> Option<&Node> {
        self.nodes.iter().find(|n| n.body == NodeBody::Entry)
    }

    pub fn connections_from<'a>(
        &'a self,
        node_id: &'a str,
    ) -> impl Iterator<Item = &'a Connection> {
        self.connections
            .iter()
            .filter(move |c| c.source_node_id == node_id)
    }

    pub fn connection_from(&self, node_id: &str, source_pin: &str) -> Option<&Connection> {
        self.connections
            .iter()
            .find(|c| c.source_node_id == node_id && c.source_pin == source_pin)
    }

    /// Target node of the connection leaving `node_id` on `source_pin`.
    pub fn target_of(&self, node_id: &str, source_pin: &str) -> Option<&str> {
        self.connection_from(node_id, source_pin)
            .map(|c| c.target_node_id.as_str())
    }
}
