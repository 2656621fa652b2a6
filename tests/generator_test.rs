use assert_cmd::cargo_bin;
use std::process::Command;

mod common;

#[test]
fn test_generated_script_submits_every_row() {
    let dir = tempfile::tempdir().unwrap();
    let script = dir.path().join("generated.csv");
    common::generate_script(&script, 25).expect("Failed to generate script");

    let content = std::fs::read_to_string(&script).expect("Failed to read file");
    // Header + 25 rows
    assert_eq!(content.lines().count(), 26);

    let output = Command::new(cargo_bin!())
        .arg(&script)
        .output()
        .expect("Failed to execute command");
    assert!(output.status.success());

    let stdout = String::from_utf8_lossy(&output.stdout);
    // Header + one row per loan
    assert_eq!(stdout.lines().count(), 26);
    assert_eq!(stdout.matches(",pending,").count(), 25);
}
