use super::{FlowGraph, IntoFlowGraph, Node};
use crate::error::{ConversionError, FlowError};
use crate::value::{Value, VarType};
use crate::vars::{Variable, VariableStore};
use ahash::AHashMap;
use serde::{Deserialize, Serialize};

/// Read side of the flow persistence layer.
///
/// The engine only ever asks for whole graphs and for individual nodes by
/// their technical id (the latter is how jump and subflow targets resolve).
/// Everything else about persistence stays outside.
pub trait FlowStore {
    fn get_flow_graph(&self, flow_id: &str) -> Result<&FlowGraph, FlowError>;

    fn get_node_by_technical_id(&self, flow_id: &str, node_id: &str) -> Result<&Node, FlowError> {
        let graph = self.get_flow_graph(flow_id)?;
        graph.node(node_id).ok_or_else(|| FlowError::NodeNotFound {
            flow_id: flow_id.to_string(),
            node_id: node_id.to_string(),
        })
    }
}

/// Read side of the sheet layer: flattens every declared variable, table
/// cells included, into the store a fresh session starts from.
pub trait SheetStore {
    fn build_initial_variables(&self) -> VariableStore;
}

/// One declared variable as the sheet layer exports it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VariableSeed {
    pub sheet: String,
    /// Plain variable name, or `table.row.column` for a cell.
    pub name: String,
    #[serde(rename = "type")]
    pub var_type: VarType,
    /// Authored initial value; the type's default when absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub owner_block_id: Option<String>,
}

/// Parses a sheet export holding an array of variable seeds.
pub fn variable_seeds_from_json(json: &str) -> Result<Vec<VariableSeed>, ConversionError> {
    serde_json::from_str(json).map_err(|e| ConversionError::SheetParseError(e.to_string()))
}

/// In-memory flow store backing tests, the CLI and embedded use.
#[derive(Debug, Clone, Default)]
pub struct MemoryFlowStore {
    flows: AHashMap<String, FlowGraph>,
}

impl MemoryFlowStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_graphs<I>(graphs: I) -> Self
    where
        I: IntoIterator<Item = FlowGraph>,
    {
        Self {
            flows: graphs.into_iter().map(|g| (g.id.clone(), g)).collect(),
        }
    }

    /// Adds any convertible flow format to the store.
    pub fn insert<F: IntoFlowGraph>(&mut self, flow: F) -> Result<(), ConversionError> {
        let graph = flow.into_flow_graph()?;
        self.flows.insert(graph.id.clone(), graph);
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.flows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.flows.is_empty()
    }
}

impl FlowStore for MemoryFlowStore {
    fn get_flow_graph(&self, flow_id: &str) -> Result<&FlowGraph, FlowError> {
        self.flows
            .get(flow_id)
            .ok_or_else(|| FlowError::FlowNotFound(flow_id.to_string()))
    }
}

/// In-memory sheet store built from declarations or a parsed sheet export.
#[derive(Debug, Clone, Default)]
pub struct MemorySheetStore {
    seeds: Vec<VariableSeed>,
}

impl MemorySheetStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_seeds(seeds: Vec<VariableSeed>) -> Self {
        Self { seeds }
    }

    /// Declares one variable, builder style.
    pub fn declare(mut self, sheet: &str, name: &str, var_type: VarType, value: Value) -> Self {
        self.seeds.push(VariableSeed {
            sheet: sheet.to_string(),
            name: name.to_string(),
            var_type,
            value: Some(value),
            owner_block_id: None,
        });
        self
    }
}

impl SheetStore for MemorySheetStore {
    fn build_initial_variables(&self) -> VariableStore {
        VariableStore::from_variables(self.seeds.iter().map(|seed| {
            let value = seed
                .value
                .clone()
                .unwrap_or_else(|| seed.var_type.default_value());
            let mut variable = Variable::seeded(&seed.sheet, &seed.name, seed.var_type, value);
            variable.owner_block_id = seed.owner_block_id.clone();
            variable
        }))
    }
}
