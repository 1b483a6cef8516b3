use std::path::Path;

use harlock_test_utils::run_failing_script;

const SRC_PATH: &str = "./demos/type_error.hl";

#[test]
fn cross_type_equality_fails() {
    run_failing_script(Path::new(SRC_PATH), vec![]);
}
