use std::path::Path;

use harlock_test_utils::run_ok_script;

const SRC_PATH: &str = "./demos/boolean.hl";

#[test]
fn interpret_boolean() {
    run_ok_script(Path::new(SRC_PATH), vec![]);
}
