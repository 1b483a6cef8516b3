//! Evaluator-level error types (spec.md §7).
//!
//! Two categories, exactly as spec.md draws them: `EvalError::Static`
//! for programmer errors the evaluator detects directly (type
//! mismatches, arity, out-of-bounds, divide-by-zero, ...) which are
//! never catchable, and `RuntimeError` for kind-tagged errors raised
//! by builtins and the file engines, which `try` can catch. Both use
//! the teacher's manual `Display`/`std::error::Error` idiom rather
//! than a `thiserror` derive.

use std::error::Error;
use std::fmt::{self, Display};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RuntimeErrorKind {
    Type,
    Key,
    File,
    Hex,
    Elf,
    Bytes,
    Custom,
}

impl Display for RuntimeErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            RuntimeErrorKind::Type => "type",
            RuntimeErrorKind::Key => "key",
            RuntimeErrorKind::File => "file",
            RuntimeErrorKind::Hex => "hex",
            RuntimeErrorKind::Elf => "elf",
            RuntimeErrorKind::Bytes => "bytes",
            RuntimeErrorKind::Custom => "custom",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RuntimeError {
    pub kind: RuntimeErrorKind,
    pub message: String,
    pub line: usize,
}

impl RuntimeError {
    pub fn new(kind: RuntimeErrorKind, message: impl Into<String>, line: usize) -> Self {
        Self {
            kind,
            message: message.into(),
            line,
        }
    }
}

impl Display for RuntimeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {} on line {}", self.kind, self.message, self.line)
    }
}

impl Error for RuntimeError {}

/// The evaluator's `Result::Err` type. `Static` aborts unconditionally;
/// `Runtime` aborts too unless an enclosing `try` intercepts it first
/// (spec.md §4.3, §7).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EvalError {
    Static(String, usize),
    Runtime(RuntimeError),
}

impl EvalError {
    pub fn static_err(message: impl Into<String>, line: usize) -> Self {
        EvalError::Static(message.into(), line)
    }

    pub fn runtime(kind: RuntimeErrorKind, message: impl Into<String>, line: usize) -> Self {
        EvalError::Runtime(RuntimeError::new(kind, message, line))
    }
}

impl Display for EvalError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EvalError::Static(message, line) => write!(f, "error: {message} on line {line}"),
            EvalError::Runtime(e) => e.fmt(f),
        }
    }
}

impl Error for EvalError {}
