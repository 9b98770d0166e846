//! CLI contract tests, run against the built binary.

use std::fs;
use std::path::PathBuf;

use assert_cmd::Command;

/// Command pointed at a config file that does not exist, so defaults apply
/// regardless of the working directory.
fn aria(tmp: &tempfile::TempDir) -> Command {
    let mut cmd = Command::cargo_bin("aria").expect("binary built");
    cmd.arg("--config")
        .arg(tmp.path().join("missing.toml"))
        .env_remove("RUST_LOG")
        .env_remove("ARIA_CONFIG_PATH");
    cmd
}

fn stdout_of(cmd: &mut Command) -> String {
    let output = cmd.output().expect("run aria");
    assert!(
        output.status.success(),
        "aria failed: {}",
        String::from_utf8_lossy(&output.stderr)
    );
    String::from_utf8(output.stdout).expect("utf-8 stdout")
}

#[test]
fn resolve_prints_json_decision() {
    let tmp = tempfile::tempdir().expect("temp dir");
    let stdout = stdout_of(aria(&tmp).args(["resolve", "ouvre le bloc-notes", "--json"]));

    let decision: serde_json::Value = serde_json::from_str(&stdout).expect("json on stdout");
    assert_eq!(decision["intent"], "OPEN_APPLICATION");
    assert_eq!(decision["verdict"], "EXECUTE");
}

#[test]
fn resolve_summary_names_the_verdict() {
    let tmp = tempfile::tempdir().expect("temp dir");
    let stdout = stdout_of(aria(&tmp).args([
        "resolve",
        "supprime les fichiers temporaires",
    ]));
    assert!(stdout.contains("CONFIRM"), "{stdout}");
    assert!(stdout.contains("DELETE_FILES"), "{stdout}");
}

#[test]
fn voice_confidence_requires_voice_flag() {
    let tmp = tempfile::tempdir().expect("temp dir");
    aria(&tmp)
        .args(["resolve", "ouvre chrome", "--confidence", "0.5"])
        .assert()
        .failure();
}

#[test]
fn check_config_reports_ok() {
    let tmp = tempfile::tempdir().expect("temp dir");
    let stdout = stdout_of(aria(&tmp).arg("check-config"));
    assert!(stdout.contains("configuration ok"));
    assert!(stdout.contains("execute threshold"));
}

#[test]
fn suggest_lists_matching_phrases() {
    let tmp = tempfile::tempdir().expect("temp dir");
    let stdout = stdout_of(aria(&tmp).args(["suggest", "ouvre", "--limit", "3"]));
    let lines: Vec<&str> = stdout.lines().collect();
    assert!(!lines.is_empty());
    assert!(lines.len() <= 3);
    assert!(lines.iter().all(|l| l.to_lowercase().contains("ouvre")));
}

#[test]
fn repl_confirms_then_executes() {
    let tmp = tempfile::tempdir().expect("temp dir");
    let stdout = stdout_of(
        aria(&tmp)
            .arg("repl")
            .write_stdin("supprime les fichiers temporaires\noui\n:quit\n"),
    );
    assert!(stdout.contains("needs confirmation"), "{stdout}");
    assert!(stdout.contains("confirmed, executed DELETE_FILES"), "{stdout}");
}

#[test]
fn invalid_config_file_fails() {
    let tmp = tempfile::tempdir().expect("temp dir");
    let path: PathBuf = tmp.path().join("aria.toml");
    fs::write(&path, "[resolver]\nexecute_threshold = 2.0\n").expect("write config");

    Command::cargo_bin("aria")
        .expect("binary built")
        .arg("--config")
        .arg(&path)
        .arg("check-config")
        .assert()
        .failure();
}
