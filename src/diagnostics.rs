use std::{error::Error, fmt::Display};

use colored::Colorize;

/// A user-facing problem report produced by any stage of the pipeline.
///
/// Stages accumulate diagnostics and keep going; a diagnostic is never a
/// panic and never carries a stack trace.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Diagnostic {
    pub description: String,
    pub line: usize,
    pub column: usize,
}

impl Diagnostic {
    pub fn new(description: impl Into<String>, line: usize, column: usize) -> Self {
        Self {
            description: description.into(),
            line,
            column,
        }
    }
}

impl Display for Diagnostic {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_fmt(format_args!(
            "{}: {} (line {}, column {})",
            "error".red(),
            self.description,
            self.line,
            self.column
        ))
    }
}

impl Error for Diagnostic {}

/// Print every diagnostic of a stage to stderr, one per line, under a short
/// heading. Does nothing when the list is empty.
pub fn report(stage: &str, diagnostics: &[Diagnostic]) {
    if diagnostics.is_empty() {
        return;
    }

    eprintln!("{} errors:", stage);
    for diagnostic in diagnostics {
        eprintln!("  {diagnostic}");
    }
}
