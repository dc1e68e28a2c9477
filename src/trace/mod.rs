//! Human-readable rendering of session output.

mod formatter;

pub use formatter::TraceFormatter;
