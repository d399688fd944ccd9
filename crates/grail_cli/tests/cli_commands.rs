use std::fs;
use std::path::Path;
use std::process::Command;

use serde_json::Value;

const HERO: &str = r#"{
    "header": { "status": { "hardcore": false } },
    "items": [
        {
            "type": "uap",
            "unique_name": "Harlequin Crest",
            "socketed_items": [ { "type": "r30" } ]
        }
    ]
}"#;

fn run_cli(data_dir: &Path, args: &[&str]) -> std::process::Output {
    Command::new(env!("CARGO_BIN_EXE_d2-grail"))
        .arg("--data-dir")
        .arg(data_dir)
        .args(args)
        .output()
        .expect("failed to run d2-grail CLI")
}

fn run_json(data_dir: &Path, args: &[&str]) -> Value {
    let output = run_cli(data_dir, args);
    assert!(
        output.status.success(),
        "{args:?} failed: {}",
        String::from_utf8_lossy(&output.stderr)
    );
    let stdout = String::from_utf8_lossy(&output.stdout);
    serde_json::from_str(&stdout).expect("stdout should be valid JSON")
}

fn save_dir_with_hero() -> tempfile::TempDir {
    let saves = tempfile::tempdir().expect("tempdir");
    fs::write(saves.path().join("Hero.d2s"), HERO).expect("write save");
    saves
}

#[test]
fn scan_json_reports_items_and_new_finds_once() {
    let saves = save_dir_with_hero();
    let data = tempfile::tempdir().expect("tempdir");
    let dir = saves.path().to_string_lossy().to_string();

    let json = run_json(data.path(), &["scan", &dir, "--json"]);
    assert!(json["snapshot"]["items"]["harlequincrest"].is_object());
    assert_eq!(json["snapshot"]["items"]["ber"]["type"], "Rune");
    assert_eq!(json["snapshot"]["stats"]["Hero"], 2);
    assert_eq!(json["newFinds"].as_array().map(Vec::len), Some(2));
    assert_eq!(json["hasNewItems"], true);

    // The stored save directory is used when none is given. Each process
    // starts from an empty snapshot, so the finds repeat without duplicating.
    let again = run_json(data.path(), &["scan", "--json"]);
    assert_eq!(again["snapshot"]["stats"]["Hero"], 2);

    let recent = run_json(data.path(), &["recent", "--json"]);
    let recent = recent.as_array().expect("recent finds array");
    assert_eq!(recent.len(), 2);
    assert!(recent[0]["timestamp"].as_i64() > recent[1]["timestamp"].as_i64());
}

#[test]
fn config_changes_feed_stats() {
    let saves = save_dir_with_hero();
    let data = tempfile::tempdir().expect("tempdir");
    let dir = saves.path().to_string_lossy().to_string();
    run_json(data.path(), &["scan", &dir, "--json"]);

    let settings = run_json(data.path(), &["config", "--runes", "true", "--json"]);
    assert_eq!(settings["grailRunes"], true);
    assert_eq!(settings["gameMode"], "softcore");

    let json = run_json(data.path(), &["stats", "--json"]);
    assert_eq!(json["stats"]["runes"]["owned"], 1);
    assert_eq!(json["stats"]["runes"]["exists"], 33);
    assert_eq!(json["stats"]["normal"]["armor"]["owned"], 1);
    let normal_exists = json["stats"]["normal"]["total"]["exists"]
        .as_u64()
        .expect("normal total");
    assert_eq!(json["summary"]["counter"]["exists"], normal_exists + 33);
    assert_eq!(json["summary"]["counter"]["owned"], 2);
}

#[test]
fn clearing_history_needs_confirmation() {
    let data = tempfile::tempdir().expect("tempdir");
    let set = run_cli(data.path(), &["manual", "set", "shako", "1"]);
    assert!(set.status.success());
    let refused = run_cli(data.path(), &["history", "--clear"]);
    assert!(!refused.status.success());

    let history = run_json(data.path(), &["history", "--json"]);
    assert_eq!(history["everFound"].as_array().map(Vec::len), Some(1));

    let cleared = run_json(data.path(), &["history", "--clear", "--yes", "--json"]);
    assert_eq!(cleared["everFound"].as_array().map(Vec::len), Some(0));
}

#[test]
fn manual_items_and_notes_persist() {
    let data = tempfile::tempdir().expect("tempdir");
    let set = run_cli(data.path(), &["manual", "set", "ber", "2"]);
    assert!(set.status.success());
    let set = run_cli(data.path(), &["manual", "set", "titansrevenge", "1", "--eth"]);
    assert!(set.status.success());

    let manual = run_json(data.path(), &["manual", "list", "--json"]);
    assert_eq!(
        manual["items"]["ber"]["inSaves"]["Manual entry"]
            .as_array()
            .map(Vec::len),
        Some(2)
    );
    assert!(manual["ethItems"]["titansrevenge"].is_object());

    let note = run_cli(data.path(), &["notes", "set", "Harlequin Crest", "on the sorc"]);
    assert!(note.status.success());
    let notes = run_json(data.path(), &["notes", "list", "--json"]);
    assert_eq!(notes["Harlequin Crest"], "on the sorc");
}

#[test]
fn scan_of_missing_directory_reports_no_directory() {
    let data = tempfile::tempdir().expect("tempdir");
    let missing = data.path().join("missing").to_string_lossy().to_string();
    let json = run_json(data.path(), &["scan", &missing, "--json"]);
    assert_eq!(json["noDirectory"], true);
}
