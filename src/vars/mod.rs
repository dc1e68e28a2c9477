//! The typed variable store a session executes against.
//!
//! Variables are declared externally (character sheets, world-state blocks,
//! tables) and arrive here flattened into one map keyed by their composite
//! reference, `sheet.variable` or `sheet.table.row.column`. Each entry tracks
//! its current, initial and previous value plus the provenance of the last
//! write, so the debugger can show where every value came from.

mod autocomplete;
mod resolver;

pub use autocomplete::{Suggestion, SuggestionKind, suggest};

use crate::value::{Value, VarType};
use ahash::AHashMap;
use itertools::Itertools;
use serde::{Deserialize, Serialize};

/// Why a variable currently holds the value it does.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VarSource {
    /// Untouched since session start.
    Initial,
    /// Written by an instruction node.
    Instruction,
    /// Set directly by the user from the debugger.
    UserOverride,
}

/// One declared variable, flattened out of its sheet.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Variable {
    /// Full composite reference, e.g. `mc.jaime.health`.
    pub key: String,
    pub value: Value,
    /// Set once at session start, never mutated afterwards.
    pub initial_value: Value,
    /// The value immediately before the most recent write.
    ///
    /// Never skipped when serializing: entries ride inside the bincode
    /// session artifact, whose positional decoding needs every field present.
    #[serde(default)]
    pub previous_value: Option<Value>,
    pub source: VarSource,
    #[serde(rename = "type")]
    pub var_type: VarType,
    /// Id of the sheet block that declared this variable, when known.
    #[serde(default)]
    pub owner_block_id: Option<String>,
    /// Namespace part of `key`. May itself contain dots (`mc.jaime`).
    pub sheet_shortcut: String,
    /// Name part of `key`. Table cells use `table.row.column`.
    pub variable_name: String,
}

impl Variable {
    /// Builds a fresh entry as the sheet store seeds it at session start.
    pub fn seeded(sheet: &str, name: &str, var_type: VarType, value: Value) -> Self {
        Self {
            key: format!("{}.{}", sheet, name),
            initial_value: value.clone(),
            value,
            previous_value: None,
            source: VarSource::Initial,
            var_type,
            owner_block_id: None,
            sheet_shortcut: sheet.to_string(),
            variable_name: name.to_string(),
        }
    }

    /// Writes a new value, moving the current one to `previous_value`.
    pub fn apply(&mut self, new_value: Value, source: VarSource) {
        self.previous_value = Some(std::mem::replace(&mut self.value, new_value));
        self.source = source;
    }

    /// Restores the entry to its session-start state.
    pub fn reset(&mut self) {
        self.value = self.initial_value.clone();
        self.previous_value = None;
        self.source = VarSource::Initial;
    }
}

/// Flat map of all project variables, keyed by composite reference.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct VariableStore {
    entries: AHashMap<String, Variable>,
}

impl VariableStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_variables<I>(variables: I) -> Self
    where
        I: IntoIterator<Item = Variable>,
    {
        Self {
            entries: variables.into_iter().map(|v| (v.key.clone(), v)).collect(),
        }
    }

    pub fn insert(&mut self, variable: Variable) {
        self.entries.insert(variable.key.clone(), variable);
    }

    pub fn get(&self, key: &str) -> Option<&Variable> {
        self.entries.get(key)
    }

    pub fn get_mut(&mut self, key: &str) -> Option<&mut Variable> {
        self.entries.get_mut(key)
    }

    pub fn contains(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Variable> {
        self.entries.values()
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut Variable> {
        self.entries.values_mut()
    }

    /// All distinct sheet shortcuts, sorted for stable display.
    pub fn sheets(&self) -> Vec<String> {
        self.entries
            .values()
            .map(|v| v.sheet_shortcut.clone())
            .sorted()
            .dedup()
            .collect()
    }
}
