use std::path::Path;

use harlock_test_utils::run_ok_script;

const SRC_PATH: &str = "./demos/hex.hl";
const FIXTURE_PATH: &str = "./demos/fixtures/sample.hex";

/// `hex.hl` calls `save()`, so the test runs against a scratch copy
/// rather than mutating the checked-in fixture.
#[test]
fn interpret_hex() {
    let scratch = std::env::temp_dir().join("harlock_test_hex_sample.hex");
    std::fs::copy(FIXTURE_PATH, &scratch).expect("copy fixture to scratch path");

    run_ok_script(Path::new(SRC_PATH), vec![scratch.to_string_lossy().to_string()]);

    let _ = std::fs::remove_file(&scratch);
}
