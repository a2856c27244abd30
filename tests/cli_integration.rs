// CLI integration tests for the `n3-native` host binary.
use std::io::Write;
use std::process::{Command, Stdio};

use serde_json::Value;
use tempfile::NamedTempFile;

fn cmd() -> Command {
    let exe = env!("CARGO_BIN_EXE_n3-native");
    let mut command = Command::new(exe);
    command.env_remove("N3_CHUNK_MAX_CHARS");
    command.env_remove("N3_CHUNK_OVERLAP");
    command.env_remove("RUST_LOG");
    command
}

fn write_temp(contents: &[u8]) -> NamedTempFile {
    let mut file = NamedTempFile::new().expect("tempfile");
    file.write_all(contents).expect("write");
    file
}

fn parse_error_line(stderr: &[u8]) -> Value {
    let text = String::from_utf8_lossy(stderr);
    let line = text.lines().next().expect("error line");
    serde_json::from_str(line).expect("error json")
}

#[test]
fn embed_check_prints_digest() {
    let output = cmd().arg("embed-check").output().expect("embed-check");
    assert!(output.status.success());
    assert_eq!(
        output.stdout,
        b"a25ba8bc7c4cdb6b8fdee5225e4f2a725ecfa2b50b18cb67996624fdb7f49104"
    );
    assert!(output.stderr.is_empty());
}

#[test]
fn info_reports_library_identity() {
    let output = cmd().arg("info").output().expect("info");
    assert!(output.status.success());
    let info: Value = serde_json::from_slice(&output.stdout).expect("json");
    assert_eq!(info["name"], "namel3ss-native");
    assert_eq!(info["abi_version"], 1);
}

#[test]
fn hash_reads_file_and_stdin_alike() {
    let file = write_temp(b"payload bytes");
    let from_file = cmd()
        .args(["hash", file.path().to_str().unwrap()])
        .output()
        .expect("hash file");
    assert!(from_file.status.success());

    let mut child = cmd()
        .args(["hash", "-"])
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .spawn()
        .expect("spawn");
    child
        .stdin
        .take()
        .expect("stdin")
        .write_all(b"payload bytes")
        .expect("write stdin");
    let from_stdin = child.wait_with_output().expect("hash stdin");
    assert!(from_stdin.status.success());
    assert_eq!(from_file.stdout, from_stdin.stdout);
    assert_eq!(from_file.stdout.len(), 64);
}

#[test]
fn normalize_writes_text() {
    let file = write_temp(b"\xEF\xBB\xBFline one  \r\n\r\n\r\nline two\r\n");
    let output = cmd()
        .args(["normalize", file.path().to_str().unwrap()])
        .output()
        .expect("normalize");
    assert!(output.status.success());
    assert_eq!(output.stdout, b"line one\n\nline two");
}

#[cfg(feature = "scan")]
#[test]
fn scan_emits_token_json() {
    let file = write_temp(b"flow \"demo\":\n  return 1\n");
    let output = cmd()
        .args(["scan", file.path().to_str().unwrap()])
        .output()
        .expect("scan");
    assert!(output.status.success());
    let tokens: Value = serde_json::from_slice(&output.stdout).expect("json");
    let tokens = tokens.as_array().expect("array");
    assert_eq!(tokens[0]["type"], "FLOW");
    assert_eq!(tokens.last().expect("eof")["type"], "EOF");
}

#[cfg(feature = "scan")]
#[test]
fn scan_error_exits_with_usage_code() {
    let file = write_temp(b"\"unterminated");
    let output = cmd()
        .args(["scan", file.path().to_str().unwrap()])
        .output()
        .expect("scan");
    assert_eq!(output.status.code(), Some(2));
    assert!(output.stdout.is_empty());
    let err = parse_error_line(&output.stderr);
    assert_eq!(err["error"]["status"], "N3_STATUS_INVALID_ARGUMENT");
}

#[test]
fn chunk_plan_uses_flags() {
    let file = write_temp(b"abcdefghij");
    let output = cmd()
        .args([
            "chunk-plan",
            file.path().to_str().unwrap(),
            "--max-chars",
            "4",
            "--overlap",
            "1",
        ])
        .output()
        .expect("chunk-plan");
    assert!(output.status.success());
    let plan: Value = serde_json::from_slice(&output.stdout).expect("json");
    assert_eq!(plan["max_chars"], 4);
    assert_eq!(plan["chunks"].as_array().expect("chunks").len(), 3);
}

#[test]
fn chunk_plan_reads_env_defaults() {
    let file = write_temp(b"abcdefghij");
    let output = cmd()
        .args(["chunk-plan", file.path().to_str().unwrap()])
        .env("N3_CHUNK_MAX_CHARS", "5")
        .env("N3_CHUNK_OVERLAP", "0")
        .output()
        .expect("chunk-plan");
    assert!(output.status.success());
    let plan: Value = serde_json::from_slice(&output.stdout).expect("json");
    assert_eq!(plan["max_chars"], 5);
    assert_eq!(plan["overlap"], 0);
}

#[test]
fn chunk_plan_invalid_options_exit_code() {
    let file = write_temp(b"some text");
    let output = cmd()
        .args([
            "chunk-plan",
            file.path().to_str().unwrap(),
            "--max-chars",
            "5",
            "--overlap",
            "5",
        ])
        .output()
        .expect("chunk-plan");
    assert_eq!(output.status.code(), Some(2));
    assert!(output.stdout.is_empty());
    let err = parse_error_line(&output.stderr);
    assert_eq!(err["error"]["kind"], "Usage");
    assert_eq!(err["error"]["status"], "N3_STATUS_INVALID_ARGUMENT");
    assert_eq!(
        err["error"]["message"],
        "chunk_plan returned N3_STATUS_INVALID_ARGUMENT"
    );
    assert!(err["error"]["hint"].is_string());
}

#[cfg(feature = "exec")]
#[test]
fn exec_ir_with_config() {
    let ir = write_temp(
        br#"{"flows":[{"name":"demo","line":1,"column":1,"body":[
            {"type":"Set","line":2,"column":3,
             "target":{"type":"StatePath","path":["greeting"]},
             "expression":{"type":"Literal","value":"hi"}}
        ]}]}"#,
    );
    let config = write_temp(br#"{"flow_name":"demo"}"#);
    let output = cmd()
        .args([
            "exec-ir",
            ir.path().to_str().unwrap(),
            "--config",
            config.path().to_str().unwrap(),
        ])
        .output()
        .expect("exec-ir");
    assert!(output.status.success());
    let result: Value = serde_json::from_slice(&output.stdout).expect("json");
    assert_eq!(result["state"]["greeting"], "hi");
}

#[test]
fn missing_input_file_is_io_error() {
    let dir = tempfile::tempdir().expect("tempdir");
    let missing = dir.path().join("absent.txt");
    let output = cmd()
        .args(["hash", missing.to_str().unwrap()])
        .output()
        .expect("hash");
    assert_eq!(output.status.code(), Some(5));
    assert!(output.stdout.is_empty());
    let err = parse_error_line(&output.stderr);
    assert_eq!(err["error"]["kind"], "Io");
}

#[test]
fn unknown_flag_is_usage_error() {
    let output = cmd().args(["hash", "--nope"]).output().expect("hash");
    assert_eq!(output.status.code(), Some(2));
    let err = parse_error_line(&output.stderr);
    assert_eq!(err["error"]["kind"], "Usage");
}

#[test]
fn completion_generates_script() {
    let output = cmd().args(["completion", "bash"]).output().expect("completion");
    assert!(output.status.success());
    assert!(String::from_utf8_lossy(&output.stdout).contains("n3-native"));
}
