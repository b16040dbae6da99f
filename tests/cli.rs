use std::path::Path;
use std::process::{Command, Output};

fn arc(dir: &Path) -> Command {
    let mut cmd = Command::new(env!("CARGO_BIN_EXE_arc"));
    cmd.current_dir(dir).env("NO_COLOR", "1");
    cmd
}

fn stdout(out: &Output) -> String {
    String::from_utf8_lossy(&out.stdout).into_owned()
}

fn stderr(out: &Output) -> String {
    String::from_utf8_lossy(&out.stderr).into_owned()
}

fn write_source(dir: &Path, code: &str) {
    std::fs::write(dir.join("test.arc"), code).expect("write source");
}

fn build(dir: &Path) -> Output {
    arc(dir).args(["build", "test.arc"]).output().expect("failed to run arc")
}

fn build_and_run(code: &str) -> Output {
    let dir = tempfile::tempdir().expect("tempdir");
    write_source(dir.path(), code);
    let out = build(dir.path());
    assert!(out.status.success(), "build failed: {}", stderr(&out));
    arc(dir.path()).args(["run", "main.arx"]).output().expect("failed to run arc")
}

// --- build / run ---

#[test]
fn build_reports_default_artifact() {
    let dir = tempfile::tempdir().unwrap();
    write_source(dir.path(), "let a=5; let b=7; c=a+b; return c");
    let out = build(dir.path());
    assert!(out.status.success(), "stderr: {}", stderr(&out));
    assert_eq!(stdout(&out).trim(), "Compiled to main.arx");
    assert!(dir.path().join("main.arx").exists());
}

#[test]
fn run_prints_single_return_line() {
    let out = build_and_run("let a=5; let b=7; c=a+b; return c");
    assert!(out.status.success(), "stderr: {}", stderr(&out));
    assert_eq!(stdout(&out), "Return: 12\n");
}

#[test]
fn run_prints_bool() {
    let out = build_and_run("let a=true; let b=!a; return b");
    assert_eq!(stdout(&out), "Return: false\n");
}

#[test]
fn build_honours_output_flag() {
    let dir = tempfile::tempdir().unwrap();
    write_source(dir.path(), "return 42");
    let out = arc(dir.path())
        .args(["build", "test.arc", "-o", "answer.arx"])
        .output()
        .unwrap();
    assert!(out.status.success(), "stderr: {}", stderr(&out));
    assert_eq!(stdout(&out).trim(), "Compiled to answer.arx");

    let out = arc(dir.path()).args(["run", "answer.arx"]).output().unwrap();
    assert_eq!(stdout(&out), "Return: 42\n");
}

// --- failures ---

#[test]
fn runtime_fault_exits_nonzero_without_output() {
    let out = build_and_run("let x=10; return x/0");
    assert!(!out.status.success());
    assert!(stdout(&out).is_empty());
    assert!(stderr(&out).contains("division by zero"), "stderr: {}", stderr(&out));
}

#[test]
fn compile_error_writes_no_artifact() {
    let dir = tempfile::tempdir().unwrap();
    write_source(dir.path(), "let a = 1\nbreak");
    let out = build(dir.path());
    assert!(!out.status.success());
    assert!(stdout(&out).is_empty());
    let err = stderr(&out);
    assert!(err.contains("error[ARC-C002]"), "stderr: {err}");
    assert!(err.contains("--> 2:1"), "stderr: {err}");
    assert!(!dir.path().join("main.arx").exists());
}

#[test]
fn syntax_error_shows_snippet() {
    let dir = tempfile::tempdir().unwrap();
    write_source(dir.path(), "let a = 5\nlet b = a +\nreturn b");
    let out = build(dir.path());
    assert!(!out.status.success());
    let err = stderr(&out);
    assert!(err.contains("ARC-P007"), "stderr: {err}");
    assert!(err.contains("expected expression after '+', found 'return'"), "stderr: {err}");
    assert!(err.contains("--> 3:1"), "stderr: {err}");
}

#[test]
fn deep_nesting_is_a_diagnostic_not_a_crash() {
    let dir = tempfile::tempdir().unwrap();
    write_source(dir.path(), &format!("return {}1{}", "(".repeat(5000), ")".repeat(5000)));
    let out = build(dir.path());
    assert_eq!(out.status.code(), Some(1), "stderr: {}", stderr(&out));
    assert!(stderr(&out).contains("error[ARC-P009]"), "stderr: {}", stderr(&out));
    assert!(!dir.path().join("main.arx").exists());
}

#[test]
fn corrupt_artifact_rejected() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("main.arx"), b"not an artifact").unwrap();
    let out = arc(dir.path()).args(["run", "main.arx"]).output().unwrap();
    assert!(!out.status.success());
    assert!(stdout(&out).is_empty());
    assert!(stderr(&out).contains("corrupt artifact"), "stderr: {}", stderr(&out));
}

#[test]
fn missing_source_reported() {
    let dir = tempfile::tempdir().unwrap();
    let out = build(dir.path());
    assert!(!out.status.success());
    assert!(stderr(&out).contains("test.arc"), "stderr: {}", stderr(&out));
}

#[test]
fn json_diagnostics() {
    let dir = tempfile::tempdir().unwrap();
    write_source(dir.path(), "return b");
    let out = arc(dir.path()).args(["--json", "build", "test.arc"]).output().unwrap();
    assert!(!out.status.success());
    let line = stderr(&out);
    let v: serde_json::Value = serde_json::from_str(line.trim()).expect("one JSON line");
    assert_eq!(v["code"], "ARC-C001");
    assert_eq!(v["labels"][0]["line"], 1);
    assert_eq!(v["labels"][0]["col"], 8);
}

// --- inspection ---

#[test]
fn disasm_lists_code() {
    let dir = tempfile::tempdir().unwrap();
    write_source(dir.path(), "let a=0; while a<3 { a=a+1 }; return a");
    assert!(build(dir.path()).status.success());
    let out = arc(dir.path()).args(["disasm", "main.arx"]).output().unwrap();
    assert!(out.status.success(), "stderr: {}", stderr(&out));
    let listing = stdout(&out);
    assert!(listing.contains("== code"), "{listing}");
    assert!(listing.contains("JUMP_IF_FALSE"), "{listing}");
    assert!(listing.contains("0002 > LOAD_VAR"), "{listing}");
    assert!(listing.contains("RETURN"), "{listing}");
}

#[test]
fn ast_prints_json() {
    let dir = tempfile::tempdir().unwrap();
    write_source(dir.path(), "let a = 1 + 2");
    let out = arc(dir.path()).args(["ast", "test.arc"]).output().unwrap();
    assert!(out.status.success(), "stderr: {}", stderr(&out));
    let v: serde_json::Value = serde_json::from_str(&stdout(&out)).expect("AST JSON");
    assert!(v["body"].is_array());
    assert!(stdout(&out).contains("\"Let\""), "{}", stdout(&out));
}
