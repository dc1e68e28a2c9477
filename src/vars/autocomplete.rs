//! Reference autocomplete for the expression editors.
//!
//! Given the partial text left of the caret, [`suggest`] returns the next
//! segment candidates at the right namespace depth: sheets first, then the
//! variable (or table, row, column for cell references). Leaf candidates
//! carry the declared type so the editor popup can annotate them.

use super::{Variable, VariableStore};
use crate::value::VarType;
use itertools::Itertools;
use serde::{Deserialize, Serialize};

/// Namespace depth a suggested segment sits at.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SuggestionKind {
    Sheet,
    Variable,
    Table,
    Row,
    Column,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Suggestion {
    /// Full replacement text for the editor, e.g. `mc.jaime.health`.
    pub insert: String,
    /// The suggested segment on its own, for display.
    pub label: String,
    pub kind: SuggestionKind,
    /// Declared type, present when the suggestion completes a reference.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub var_type: Option<VarType>,
}

/// Ranks completion candidates for a partial dotted reference.
///
/// The segment being typed is matched case-insensitively by prefix; segments
/// already completed (left of the last dot) must match exactly. Shorter
/// labels rank first, ties break alphabetically, and when the same text names
/// both a variable and a deeper namespace the typed variable wins.
pub fn suggest(store: &VariableStore, partial: &str) -> Vec<Suggestion> {
    let text = partial.trim();
    let (path, fragment) = match text.rsplit_once('.') {
        Some((path, fragment)) => (path, fragment),
        None => ("", text),
    };
    let path_segments: Vec<&str> = if path.is_empty() {
        Vec::new()
    } else {
        path.split('.').collect()
    };
    let fragment_lower = fragment.to_lowercase();

    let mut candidates: Vec<Suggestion> = store
        .iter()
        .filter_map(|entry| candidate_for(entry, path, &path_segments, &fragment_lower))
        .collect();

    candidates.sort_by(|a, b| {
        (a.label.len(), a.label.as_str(), a.var_type.is_none()).cmp(&(
            b.label.len(),
            b.label.as_str(),
            b.var_type.is_none(),
        ))
    });
    candidates
        .into_iter()
        .unique_by(|s| s.insert.clone())
        .collect()
}

fn candidate_for(
    entry: &Variable,
    path: &str,
    path_segments: &[&str],
    fragment_lower: &str,
) -> Option<Suggestion> {
    let segments: Vec<&str> = entry.key.split('.').collect();
    if segments.len() <= path_segments.len() || segments[..path_segments.len()] != path_segments[..]
    {
        return None;
    }
    let segment = segments[path_segments.len()];
    if !segment.to_lowercase().starts_with(fragment_lower) {
        return None;
    }

    let index = path_segments.len();
    let sheet_depth = entry.sheet_shortcut.split('.').count();
    let kind = if index < sheet_depth {
        SuggestionKind::Sheet
    } else {
        match (entry.variable_name.split('.').count(), index - sheet_depth) {
            (1, _) => SuggestionKind::Variable,
            (_, 0) => SuggestionKind::Table,
            (_, 1) => SuggestionKind::Row,
            _ => SuggestionKind::Column,
        }
    };
    let is_leaf = index + 1 == segments.len();

    Some(Suggestion {
        insert: if path.is_empty() {
            segment.to_string()
        } else {
            format!("{}.{}", path, segment)
        },
        label: segment.to_string(),
        kind,
        var_type: is_leaf.then_some(entry.var_type),
    })
}
