//! Diagnostic collection for a single compilation run.
//!
//! The parser and the code generator both record recoverable errors here
//! instead of printing or aborting on their own. The collector is created
//! per run and threaded through the pipeline by mutable reference, so no
//! state survives between compilations.

use std::fmt;

/// A single user-visible diagnostic.
///
/// Line and column are 1-based token coordinates. Code-generation errors
/// have no source position and carry `None`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Diagnostic {
    pub position: Option<(i32, i32)>,
    pub message: String,
}

impl Diagnostic {
    pub fn at(line: i32, column: i32, message: impl Into<String>) -> Self {
        Diagnostic {
            position: Some((line, column)),
            message: message.into(),
        }
    }

    pub fn bare(message: impl Into<String>) -> Self {
        Diagnostic {
            position: None,
            message: message.into(),
        }
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.position {
            Some((line, column)) => {
                write!(f, "[Line {}, Col {}] Error: {}", line, column, self.message)
            }
            None => write!(f, "Error: {}", self.message),
        }
    }
}

/// Accumulator for the diagnostics of one compilation run.
#[derive(Debug, Default)]
pub struct Diagnostics {
    entries: Vec<Diagnostic>,
}

impl Diagnostics {
    pub fn new() -> Self {
        Diagnostics::default()
    }

    pub fn report(&mut self, diagnostic: Diagnostic) {
        self.entries.push(diagnostic);
    }

    pub fn error_count(&self) -> usize {
        self.entries.len()
    }

    pub fn had_error(&self) -> bool {
        !self.entries.is_empty()
    }

    pub fn entries(&self) -> &[Diagnostic] {
        &self.entries
    }
}
