use super::{FlowGraph, NodeBody};
use crate::error::ConversionError;

/// A trait for custom editor formats that can be converted into a [`FlowGraph`].
///
/// This is the extension point that keeps the engine format-agnostic. The
/// canvas editor, an importer for another dialogue tool, or a test fixture
/// can each implement this trait on their own structs and hand the result to
/// a flow store.
///
/// # Example
///
/// ```rust,no_run
/// use fabula::prelude::*;
/// use fabula::error::ConversionError;
///
/// // 1. Define structs matching your editor's export format.
/// struct EditorScene { id: String, title: String }
/// struct EditorExport { scenes: Vec<EditorScene> }
///
/// // 2. Implement `IntoFlowGraph` for the top-level struct.
/// impl IntoFlowGraph for EditorExport {
///     fn into_flow_graph(self) -> std::result::Result<FlowGraph, ConversionError> {
///         let mut graph = FlowGraph::new("imported", "Imported flow");
///         for scene in self.scenes {
///             graph = graph.with_node(Node::new(
///                 scene.id,
///                 NodeBody::Scene { description: scene.title },
///             ));
///         }
///         Ok(graph)
///     }
/// }
/// ```
pub trait IntoFlowGraph {
    /// Consumes the object and converts it into a flow graph the engine can walk.
    fn into_flow_graph(self) -> Result<FlowGraph, ConversionError>;
}

impl IntoFlowGraph for FlowGraph {
    fn into_flow_graph(self) -> Result<FlowGraph, ConversionError> {
        Ok(self)
    }
}

/// Parses one flow graph from its JSON export.
pub fn flow_graph_from_json(json: &str) -> Result<FlowGraph, ConversionError> {
    serde_json::from_str(json).map_err(|e| ConversionError::JsonParseError(e.to_string()))
}

/// Parses a project export holding an array of flow graphs.
pub fn flow_graphs_from_json(json: &str) -> Result<Vec<FlowGraph>, ConversionError> {
    serde_json::from_str(json).map_err(|e| ConversionError::JsonParseError(e.to_string()))
}

/// Structural checks a graph must pass before a session runs it: exactly one
/// entry node, unique node ids, and no connection endpoint pointing at a
/// node that does not exist.
pub fn validate_flow_graph(graph: &FlowGraph) -> Result<(), ConversionError> {
    let entries = graph
        .nodes
        .iter()
        .filter(|n| n.body == NodeBody::Entry)
        .count();
    if entries == 0 {
        return Err(ConversionError::ValidationError(format!(
            "flow '{}' has no entry node",
            graph.id
        )));
    }
    if entries > 1 {
        return Err(ConversionError::ValidationError(format!(
            "flow '{}' has {} entry nodes, expected one",
            graph.id, entries
        )));
    }

    for (index, node) in graph.nodes.iter().enumerate() {
        if graph.nodes[..index].iter().any(|other| other.id == node.id) {
            return Err(ConversionError::ValidationError(format!(
                "flow '{}' declares node id '{}' more than once",
                graph.id, node.id
            )));
        }
    }

    for connection in &graph.connections {
        for endpoint in [&connection.source_node_id, &connection.target_node_id] {
            if graph.node(endpoint).is_none() {
                return Err(ConversionError::ValidationError(format!(
                    "flow '{}' wires pin '{}' to unknown node '{}'",
                    graph.id, connection.source_pin, endpoint
                )));
            }
        }
    }

    Ok(())
}
