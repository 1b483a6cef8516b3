use std::path::Path;

use harlock_test_utils::run_ok_script;

const SRC_PATH: &str = "./demos/maps.hl";

#[test]
fn interpret_maps() {
    run_ok_script(Path::new(SRC_PATH), vec![]);
}
