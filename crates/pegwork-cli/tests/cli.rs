use std::io::Write;
use std::process::Command;

fn write_grammar(dir: &tempfile::TempDir, name: &str, contents: &str) -> std::path::PathBuf {
    let path = dir.path().join(name);
    let mut file = std::fs::File::create(&path).expect("create grammar file");
    file.write_all(contents.as_bytes()).expect("write grammar");
    path
}

#[test]
fn emit_prints_rust_source() {
    let dir = tempfile::tempdir().expect("tempdir");
    let grammar = write_grammar(&dir, "letters.peg", "letters = /[a-z]+/\n");

    let output = Command::new(env!("CARGO_BIN_EXE_pegwork"))
        .arg("emit")
        .arg(&grammar)
        .output()
        .expect("run pegwork");

    assert!(output.status.success());
    let stdout = String::from_utf8(output.stdout).expect("utf-8");
    assert!(stdout.contains("pub fn grammar()"));
    assert!(stdout.contains(r#"g.define("letters", regex("[a-z]+"))?;"#));
}

#[test]
fn check_is_silent_on_success() {
    let dir = tempfile::tempdir().expect("tempdir");
    let grammar = write_grammar(&dir, "ok.peg", "a = 'x'\n");

    let output = Command::new(env!("CARGO_BIN_EXE_pegwork"))
        .arg("check")
        .arg(&grammar)
        .output()
        .expect("run pegwork");

    assert!(output.status.success());
    assert!(output.stdout.is_empty());
}

#[test]
fn syntax_errors_exit_nonzero_with_positions() {
    let dir = tempfile::tempdir().expect("tempdir");
    let grammar = write_grammar(&dir, "bad.peg", "a = 'x'\n@@@\n");

    let output = Command::new(env!("CARGO_BIN_EXE_pegwork"))
        .arg("check")
        .arg("--color")
        .arg("never")
        .arg(&grammar)
        .output()
        .expect("run pegwork");

    assert_eq!(output.status.code(), Some(1));
    let stderr = String::from_utf8(output.stderr).expect("utf-8");
    assert!(stderr.contains("Line 2"));
}

#[test]
fn ast_dumps_json() {
    let dir = tempfile::tempdir().expect("tempdir");
    let grammar = write_grammar(&dir, "ast.peg", "a = 'x'\n");

    let output = Command::new(env!("CARGO_BIN_EXE_pegwork"))
        .arg("ast")
        .arg(&grammar)
        .arg("--pretty")
        .output()
        .expect("run pegwork");

    assert!(output.status.success());
    let stdout = String::from_utf8(output.stdout).expect("utf-8");
    let json: serde_json::Value = serde_json::from_str(&stdout).expect("valid JSON");
    assert_eq!(json["rules"][0]["name"], "a");
}

#[test]
fn missing_file_is_an_error() {
    let output = Command::new(env!("CARGO_BIN_EXE_pegwork"))
        .arg("check")
        .arg("does-not-exist.peg")
        .output()
        .expect("run pegwork");

    assert_eq!(output.status.code(), Some(1));
}
