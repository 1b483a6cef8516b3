use std::path::Path;

use harlock_test_utils::run_ok_script;

const SRC_PATH: &str = "./demos/sets.hl";

#[test]
fn interpret_sets() {
    run_ok_script(Path::new(SRC_PATH), vec![]);
}
