use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;
use std::time::{SystemTime, UNIX_EPOCH};

use serde_json::Value;

const DOCUMENT: &str = r#"{"savekey":"k","rst":{
  "settings":{"turn":4,"hostcompleted":"1/2/2014 3:04:05 AM"},
  "player":{"id":2,"raceid":5,"savekey":"k"},
  "players":[{"id":2,"raceid":5}],
  "racehulls":[1,2],
  "ships":[{"id":1,"ownerid":2,"name":"One","x":10,"y":20,"targetx":10,"targety":20}],
  "planets":[{"id":7,"name":"Seven","x":10,"y":20,"ownerid":2,"friendlycode":"hey"}],
  "vcrs":[{"seed":3,"left":{"name":"One","hullid":1},"right":{"name":"Seven"}}]
}}"#;

fn temp_dir(name: &str) -> PathBuf {
    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .expect("clock")
        .as_nanos();
    let dir = std::env::temp_dir().join(format!(
        "nu-rst-cli-{}-{nanos}-{name}",
        std::process::id()
    ));
    fs::create_dir_all(&dir).expect("create temp dir");
    dir
}

fn write_document(dir: &Path) -> PathBuf {
    let path = dir.join("turn.json");
    fs::write(&path, DOCUMENT).expect("write document");
    path
}

fn run_cli(args: &[&str]) -> std::process::Output {
    Command::new(env!("CARGO_BIN_EXE_nu-rst"))
        .args(args)
        .env_remove("NU_RST_ROOT")
        .output()
        .expect("failed to run nu-rst CLI")
}

fn path_str(path: &Path) -> &str {
    path.to_str().expect("utf-8 temp path")
}

#[test]
fn unpack_json_reports_identity_and_files() {
    let dir = temp_dir("unpack");
    let doc = write_document(&dir);
    let output = run_cli(&["unpack", path_str(&doc), "--output", path_str(&dir), "--json"]);
    assert!(output.status.success(), "{}", String::from_utf8_lossy(&output.stderr));

    let report: Value = serde_json::from_slice(&output.stdout).expect("json report");
    assert_eq!(report["player_id"], 2);
    assert_eq!(report["race"], 5);
    assert_eq!(report["turn"], 4);
    assert_eq!(report["sections"].as_array().expect("sections").len(), 8);
    let kinds: Vec<&str> = report["files"]
        .as_array()
        .expect("files")
        .iter()
        .filter_map(|f| f["kind"].as_str())
        .collect();
    assert!(kinds.contains(&"result"));
    assert!(kinds.contains(&"combat"));
    assert!(dir.join("player5.rst").is_file());
    assert_eq!(fs::read(dir.join("vcr5.dat")).expect("vcr").len(), 2 + 100);
}

#[test]
fn unpack_can_skip_result_and_combat_files() {
    let dir = temp_dir("skip");
    let doc = write_document(&dir);
    let output = run_cli(&[
        "unpack",
        path_str(&doc),
        "--output",
        path_str(&dir),
        "--no-result",
        "--no-vcr",
    ]);
    assert!(output.status.success());
    assert!(!dir.join("player5.rst").exists());
    assert!(!dir.join("vcr5.dat").exists());
    assert!(dir.join("util5.dat").is_file());

    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.starts_with("player 2 (race 5), turn 4"));
}

#[test]
fn layout_reads_back_result_sections() {
    let dir = temp_dir("layout");
    let doc = write_document(&dir);
    let output = run_cli(&["unpack", path_str(&doc), "--output", path_str(&dir)]);
    assert!(output.status.success());

    let rst = dir.join("player5.rst");
    let output = run_cli(&["layout", path_str(&rst), "--json"]);
    assert!(output.status.success());
    let layout: Value = serde_json::from_slice(&output.stdout).expect("json layout");
    let names: Vec<&str> = layout["sections"]
        .as_array()
        .expect("sections")
        .iter()
        .filter_map(|s| s["name"].as_str())
        .collect();
    assert_eq!(
        names,
        ["header", "ships", "targets", "planets", "bases", "messages", "shipxy", "gen", "vcr"]
    );
    assert_eq!(
        layout["file_len"].as_u64(),
        Some(fs::metadata(&rst).expect("metadata").len())
    );
}

#[test]
fn vcr_writes_only_the_combat_file() {
    let dir = temp_dir("vcr");
    let doc = write_document(&dir);
    let output = run_cli(&["vcr", path_str(&doc), "--output", path_str(&dir)]);
    assert!(output.status.success());
    assert!(dir.join("vcr5.dat").is_file());
    assert!(!dir.join("player5.rst").exists());
    assert!(!dir.join("hullspec.dat").exists());
}

#[test]
fn dump_prints_subtree() {
    let dir = temp_dir("dump");
    let doc = write_document(&dir);
    let output = run_cli(&["dump", path_str(&doc), "--path", "rst.player"]);
    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert_eq!(stdout.trim(), r#"{"id":2,"raceid":5,"savekey":"k"}"#);
}

#[test]
fn verbose_flags_raise_the_log_level() {
    let dir = temp_dir("verbose");
    let doc = write_document(&dir);
    let quiet = run_cli(&["unpack", path_str(&doc), "--output", path_str(&dir)]);
    assert!(quiet.status.success());
    assert!(!String::from_utf8_lossy(&quiet.stderr).contains("unpack options"));

    let output = run_cli(&["-vv", "unpack", path_str(&doc), "--output", path_str(&dir)]);
    assert!(output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("DEBUG: unpack options: UnpackOptions"));
    assert!(stderr.contains("player 2 (race 5)"));
    assert!(stderr.contains("INFO: wrote"));
}

#[test]
fn failures_exit_with_one_and_usage_errors_with_two() {
    let dir = temp_dir("errors");
    let missing = dir.join("missing.json");
    let output = run_cli(&["unpack", path_str(&missing)]);
    assert_eq!(output.status.code(), Some(1));

    let broken = dir.join("broken.json");
    fs::write(&broken, "{\"rst\": [1,}").expect("write");
    let output = run_cli(&["dump", path_str(&broken)]);
    assert_eq!(output.status.code(), Some(1));
    assert!(String::from_utf8_lossy(&output.stderr).contains("Syntax"));

    let output = run_cli(&["unpack"]);
    assert_eq!(output.status.code(), Some(2));
}
