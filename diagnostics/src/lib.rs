//! Error collection for the Bantam compiler
//!
//! Every phase reports problems through the same append-only
//! [`ErrorHandler`]:
//! - One record per violation: kind, source file, line, message
//! - Registration never fails and never aborts the running phase
//! - Records are kept in registration order so the driver can surface
//!   them exactly as they were discovered
//! - A plain-text report formatter for terminal output

use std::fmt;

/// The phase a record originates from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ErrorKind {
    Lex,
    Parse,
    Semantic,
    Internal,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ErrorKind::Lex => write!(f, "lex error"),
            ErrorKind::Parse => write!(f, "parse error"),
            ErrorKind::Semantic => write!(f, "semantic error"),
            ErrorKind::Internal => write!(f, "internal error"),
        }
    }
}

/// A single reported violation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Error {
    pub kind: ErrorKind,
    /// Source file the violating construct was parsed from.
    pub file: String,
    /// 1-based line number of the violating node.
    pub line: u32,
    pub message: String,
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}:{}: {}: {}",
            self.file, self.line, self.kind, self.message
        )
    }
}

/// Append-only collection of errors, accumulated across a whole pass
/// and inspected by the driver afterwards.
#[derive(Debug, Clone, Default)]
pub struct ErrorHandler {
    errors: Vec<Error>,
}

impl ErrorHandler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record one error. Never fails.
    pub fn register(
        &mut self,
        kind: ErrorKind,
        file: impl Into<String>,
        line: u32,
        message: impl Into<String>,
    ) {
        self.errors.push(Error {
            kind,
            file: file.into(),
            line,
            message: message.into(),
        });
    }

    pub fn has_errors(&self) -> bool {
        !self.errors.is_empty()
    }

    pub fn len(&self) -> usize {
        self.errors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.errors.is_empty()
    }

    /// Errors in registration order.
    pub fn errors(&self) -> &[Error] {
        &self.errors
    }

    pub fn into_errors(self) -> Vec<Error> {
        self.errors
    }

    /// Render every record on its own line, in registration order.
    pub fn report(&self) -> String {
        let mut out = String::new();
        for error in &self.errors {
            out.push_str(&error.to_string());
            out.push('\n');
        }
        out
    }
}
