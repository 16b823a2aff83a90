#![allow(dead_code)]
use assert_cmd::{Command, cargo_bin_cmd};
use std::env;
use std::fs;
use std::path::PathBuf;

pub fn tv() -> Command {
    cargo_bin_cmd!("timevault")
}

/// Create a unique test store path inside the system temp dir and remove any
/// existing file
pub fn setup_test_db(name: &str) -> String {
    let mut path: PathBuf = env::temp_dir();
    path.push(format!("{}_timevault.sqlite", name));
    let db_path = path.to_string_lossy().to_string();
    fs::remove_file(&db_path).ok();
    fs::remove_file(format!("{db_path}-wal")).ok();
    fs::remove_file(format!("{db_path}-shm")).ok();
    db_path
}

/// Initialize a store and add a small set of pending drafts
pub fn init_db_with_drafts(db_path: &str, count: usize) {
    tv().args(["--db", db_path, "--test", "init"])
        .assert()
        .success();

    for i in 0..count {
        tv().args([
            "--db",
            db_path,
            "add",
            "--date",
            &format!("2025-03-{:02}", i + 3),
            "--hours",
            "8.0",
            "--project",
            "Research",
            "--desc",
            &format!("task {i}"),
        ])
        .assert()
        .success();
    }
}
