//! Dotted-reference resolution.
//!
//! A reference like `mc.jaime.health` is ambiguous on its own: the sheet part
//! may contain dots (`mc.jaime` + `health`) and so may the variable part for
//! table cells (`quests` + `main.act1.done`). Composite keys collapse the
//! ambiguity for plain lookup, but attributing the two halves needs the
//! store: [`VariableStore::split_reference`] tries the longest sheet and the
//! shortest variable first, then backs off one segment at a time until a
//! declared pair matches.

use super::{Variable, VariableStore};

impl VariableStore {
    /// Looks a full composite reference up. Every valid split of a reference
    /// joins back to the same string, so the exact key is enough here.
    pub fn resolve(&self, reference: &str) -> Option<&Variable> {
        self.get(reference)
    }

    /// Fast path for callers that already carry the sheet/variable split,
    /// like parsed rules and assignments.
    pub fn resolve_pair(&self, sheet: &str, variable: &str) -> Option<&Variable> {
        self.get(&format!("{}.{}", sheet, variable))
    }

    /// Attributes a reference to a declared `(sheet, variable)` pair.
    ///
    /// Split points are tried right to left, so the longest sheet wins when
    /// several declared pairs could fit. Returns `None` when no declared pair
    /// matches the reference.
    pub fn split_reference<'a>(&self, reference: &'a str) -> Option<(&'a str, &'a str)> {
        for (at, _) in reference.rmatch_indices('.') {
            let sheet = &reference[..at];
            let variable = &reference[at + 1..];
            if self
                .resolve_pair(sheet, variable)
                .is_some_and(|v| v.sheet_shortcut == sheet && v.variable_name == variable)
            {
                return Some((sheet, variable));
            }
        }
        None
    }
}
