use std::error::Error;
use std::fmt::{self, Display};

/// A single parse failure. Grounded on the teacher's `TypeError`/
/// `FileLoadError` shape: a message plus a source position, manual
/// `Display`/`Error` rather than a derive-macro error enum.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseError {
    pub message: String,
    pub line: usize,
}

impl ParseError {
    pub fn new(message: impl Into<String>, line: usize) -> Self {
        Self {
            message: message.into(),
            line,
        }
    }

    /// Unexpected end of input while parsing `context` (e.g. "block",
    /// "map literal").
    pub fn eof(context: impl Into<String>, line: usize) -> Self {
        Self {
            message: format!("unexpected end of input while parsing {}", context.into()),
            line,
        }
    }
}

impl Display for ParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} on line {}", self.message, self.line)
    }
}

impl Error for ParseError {}
