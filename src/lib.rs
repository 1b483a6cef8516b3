//! Harlock: a small dynamically-typed scripting language for
//! ELF/Intel-HEX/raw-byte post-processing (spec.md §1).
//!
//! `exec` is the embedding entry point (spec.md §6.5): it owns parsing
//! and evaluation end to end so a host program (or the `harlock` CLI
//! binary) never has to touch the parser or evaluator directly.

pub mod ast;
pub mod bytesfile;
pub mod cli;
pub mod elf;
pub mod environment;
pub mod eval;
pub mod hex;
pub mod lexer;
pub mod object;
pub mod parser;
pub mod token;

use std::io::{Read, Write};

use eval::Evaluator;
use object::Object;
use parser::Parser;

/// Runs a script read from `reader`, binding `args` to an array of
/// strings in the top-level environment, and writes nothing itself —
/// diagnostics are returned, not printed, so embedders decide how to
/// surface them. `stderr_writer` is reserved for diagnostics an
/// embedder wants streamed as they occur (spec.md §6.5); Harlock
/// currently only ever needs the batch return value, so it is flushed
/// but otherwise unused.
///
/// Returns `None` on success, `Some(diagnostics)` with parser errors or
/// the final runtime/static error text otherwise.
pub fn exec<R: Read, W: Write>(mut reader: R, mut stderr_writer: W, args: Vec<String>) -> Option<Vec<String>> {
    let mut src = String::new();
    if let Err(e) = reader.read_to_string(&mut src) {
        let msg = format!("error: could not read script source: {e}");
        let _ = writeln!(stderr_writer, "{msg}");
        return Some(vec![msg]);
    }

    let (program, parse_errors) = Parser::new(&src).parse_program();
    if !parse_errors.is_empty() {
        let diagnostics: Vec<String> = parse_errors.iter().map(|e| e.to_string()).collect();
        for d in &diagnostics {
            let _ = writeln!(stderr_writer, "{d}");
        }
        return Some(diagnostics);
    }

    let mut evaluator = Evaluator::new();
    let arg_values = args.into_iter().map(Object::new_str).collect();
    evaluator.globals.borrow_mut().set("args", Object::new_array(arg_values));

    match evaluator.eval_program(&program) {
        Ok(_) => None,
        Err(e) => {
            let diagnostic = e.to_string();
            let _ = writeln!(stderr_writer, "{diagnostic}");
            Some(vec![diagnostic])
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn runs_a_script_and_binds_args() {
        let src = "print(args[0])\nargs[0]";
        let mut stderr = Vec::new();
        let diagnostics = exec(src.as_bytes(), &mut stderr, vec!["hello".to_string()]);
        assert!(diagnostics.is_none());
    }

    #[test]
    fn parse_errors_are_returned_as_diagnostics() {
        let src = "var = 1";
        let mut stderr = Vec::new();
        let diagnostics = exec(src.as_bytes(), &mut stderr, vec![]);
        assert!(diagnostics.is_some());
    }

    #[test]
    fn runtime_errors_are_returned_as_diagnostics() {
        let src = "1 / 0";
        let mut stderr = Vec::new();
        let diagnostics = exec(src.as_bytes(), &mut stderr, vec![]);
        assert!(diagnostics.is_some());
    }
}
