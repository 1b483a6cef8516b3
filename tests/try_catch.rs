use std::path::Path;

use harlock_test_utils::run_ok_script;

const SRC_PATH: &str = "./demos/try_catch.hl";

#[test]
fn interpret_try_catch() {
    run_ok_script(Path::new(SRC_PATH), vec![]);
}
