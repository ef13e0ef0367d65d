use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

#[allow(dead_code)]
pub fn fixture(name: &str) -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR"))
        .join("tests/fixtures")
        .join(name)
}

/// Copies a fixture tree into a fresh temporary directory so tests can edit it.
#[allow(dead_code)]
pub fn copy_fixture(name: &str) -> TempDir {
    let dir = TempDir::new().expect("Failed to create temp dir");
    copy_tree(&fixture(name), dir.path());
    dir
}

fn copy_tree(from: &Path, to: &Path) {
    fs::create_dir_all(to).expect("Failed to create directory");
    for entry in fs::read_dir(from).expect("Failed to read fixture directory") {
        let entry = entry.expect("Failed to read entry");
        let target = to.join(entry.file_name());
        if entry.path().is_dir() {
            copy_tree(&entry.path(), &target);
        } else {
            fs::copy(entry.path(), &target).expect("Failed to copy fixture file");
        }
    }
}
