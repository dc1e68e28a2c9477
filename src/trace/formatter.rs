use crate::engine::{ConsoleEntry, ConsoleLevel, LogEntry};
use crate::eval::RuleDetail;
use itertools::Itertools;

/// Formats console entries and execution logs into human-readable strings
pub struct TraceFormatter;

impl TraceFormatter {
    /// Format the raw depth trace into an indented walk.
    ///
    /// The engine records only `{node_id, depth}` pairs; the sub-flow
    /// separators are derived here from depth changes between consecutive
    /// entries.
    pub fn format_log(log: &[LogEntry]) -> String {
        let mut lines = Vec::new();
        let mut previous_depth = 0usize;
        for entry in log {
            if entry.depth > previous_depth {
                lines.push(format!("{}-> entering sub-flow", indent(entry.depth)));
            } else if entry.depth < previous_depth {
                lines.push(format!("{}<- returning", indent(entry.depth)));
            }
            lines.push(format!("{}{}", indent(entry.depth), entry.node_id));
            previous_depth = entry.depth;
        }
        lines.join("\n")
    }

    /// Format the whole console, one entry per line block.
    pub fn format_console(entries: &[ConsoleEntry]) -> String {
        entries.iter().map(Self::format_entry).join("\n")
    }

    /// Format one console entry, with its rule details indented below it.
    pub fn format_entry(entry: &ConsoleEntry) -> String {
        let mut result = format!(
            "[{}] {}: {}",
            Self::level_tag(entry.level),
            entry.node_label,
            entry.message
        );
        for detail in &entry.rule_details {
            result.push('\n');
            result.push_str(&Self::format_detail(detail));
        }
        result
    }

    fn format_detail(detail: &RuleDetail) -> String {
        let verdict = if detail.passed { "passed" } else { "failed" };
        match &detail.expected_value {
            Some(expected) => format!(
                "  - {} {} {} {} (was {})",
                detail.variable_ref,
                detail.operator.symbol(),
                expected,
                verdict,
                detail.actual_value,
            ),
            None => format!(
                "  - {} {} {} (was {})",
                detail.variable_ref,
                detail.operator.symbol(),
                verdict,
                detail.actual_value,
            ),
        }
    }

    fn level_tag(level: ConsoleLevel) -> &'static str {
        match level {
            ConsoleLevel::Info => "INFO",
            ConsoleLevel::Warning => "WARN",
            ConsoleLevel::Error => "ERROR",
        }
    }
}

fn indent(depth: usize) -> String {
    "  ".repeat(depth)
}
