//! Test harness adapted from the teacher's `test-utils`: instead of
//! shelling out to a compiled binary, it drives `harlock::exec`
//! in-process, since Harlock has no separate compile step.

use std::fs::File;
use std::path::Path;

/// Runs a script that is expected to succeed with no diagnostics.
pub fn run_ok_script(src_path: &Path, args: Vec<String>) {
    let file = File::open(src_path).unwrap_or_else(|e| panic!("could not open {}: {e}", src_path.display()));
    let mut stderr = Vec::new();
    let diagnostics = harlock::exec(file, &mut stderr, args);
    assert!(
        diagnostics.is_none(),
        "expected {} to succeed, got {:?}",
        src_path.display(),
        diagnostics
    );
}

/// Runs a script that is expected to fail (a parse error or a runtime
/// error), without asserting the exact diagnostic text.
pub fn run_failing_script(src_path: &Path, args: Vec<String>) {
    let file = File::open(src_path).unwrap_or_else(|e| panic!("could not open {}: {e}", src_path.display()));
    let mut stderr = Vec::new();
    let diagnostics = harlock::exec(file, &mut stderr, args);
    assert!(diagnostics.is_some(), "expected {} to fail", src_path.display());
}
