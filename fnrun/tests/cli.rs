//! CLI tests for the `fnrun` binary.
//!
//! Spawns the binary against a temporary project and verifies stdout and
//! exit codes for each command.

#![cfg(unix)]

use std::fs;
use std::process::{Command, Output};
use std::time::{Duration, Instant};

use fnrun::exit_codes;
use fnrun::test_support::{BOOM_SCRIPT, ECHO_SCRIPT, HELLO_SCRIPT, TestHost};

fn fnrun(host: &TestHost, args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_fnrun"))
        .current_dir(host.path())
        .args(args)
        .output()
        .expect("run fnrun")
}

fn host_with(functions: &[(&str, &str)]) -> TestHost {
    let host = TestHost::new().expect("host");
    host.write_config().expect("write config");
    for &(name, source) in functions {
        let path = host.path().join(format!("{name}.src"));
        fs::write(&path, source).expect("write source");
        let out = fnrun(&host, &["put", name, path.to_str().expect("utf8")]);
        assert_eq!(out.status.code(), Some(exit_codes::OK), "{out:?}");
    }
    host
}

#[test]
fn init_writes_config_and_store() {
    let host = TestHost::new().expect("host");
    let out = fnrun(&host, &["init"]);
    assert_eq!(out.status.code(), Some(exit_codes::OK), "{out:?}");
    assert!(host.path().join("fnrun.toml").is_file());
    assert!(host.path().join("functions").is_dir());
}

#[test]
fn invoke_prints_function_stdout() {
    let host = host_with(&[("hello", HELLO_SCRIPT)]);
    let out = fnrun(&host, &["invoke", "hello"]);
    assert_eq!(out.status.code(), Some(exit_codes::OK));
    assert_eq!(out.stdout, b"hello");
}

#[test]
fn invoke_json_input_is_rendered() {
    let host = host_with(&[("echo", ECHO_SCRIPT)]);

    let out = fnrun(&host, &["invoke", "echo", "--json", r#"{"a": 1}"#]);
    assert_eq!(out.stdout, br#"{"a":1}"#);

    let out = fnrun(&host, &["invoke", "echo", "--json", r#""plain""#]);
    assert_eq!(out.stdout, b"plain");

    let out = fnrun(&host, &["invoke", "echo"]);
    assert_eq!(out.stdout, b"{}");
}

#[test]
fn failed_invoke_exits_with_execution_failed() {
    let host = host_with(&[("boom", BOOM_SCRIPT)]);
    let out = fnrun(&host, &["invoke", "boom"]);
    assert_eq!(out.status.code(), Some(exit_codes::EXECUTION_FAILED));
    assert!(out.stdout.is_empty());
    assert!(String::from_utf8_lossy(&out.stderr).contains("boom"));
}

#[test]
fn missing_function_exits_with_not_found() {
    let host = host_with(&[]);
    let out = fnrun(&host, &["invoke", "missing"]);
    assert_eq!(out.status.code(), Some(exit_codes::NOT_FOUND));

    let out = fnrun(&host, &["remove", "missing"]);
    assert_eq!(out.status.code(), Some(exit_codes::NOT_FOUND));
}

#[test]
fn traversal_name_is_invalid() {
    let host = host_with(&[]);
    let victim = host.path().join("victim.sh");
    fs::write(&victim, "keep").expect("write victim");

    let out = fnrun(&host, &["remove", "../victim"]);
    assert_eq!(out.status.code(), Some(exit_codes::INVALID));
    assert!(victim.exists());
}

#[test]
fn list_and_remove() {
    let host = host_with(&[("b", HELLO_SCRIPT), ("a", HELLO_SCRIPT)]);
    let out = fnrun(&host, &["list"]);
    assert_eq!(out.stdout, b"a\nb\n");

    let out = fnrun(&host, &["remove", "a"]);
    assert_eq!(out.status.code(), Some(exit_codes::OK));
    let out = fnrun(&host, &["list"]);
    assert_eq!(out.stdout, b"b\n");
}

#[test]
fn timed_out_invoke_exits_with_timeout() {
    let mut host = TestHost::new().expect("host");
    host.config.invoke_timeout_secs = 1;
    host.write_config().expect("write config");
    host.store()
        .expect("store")
        .put("spin", b"sleep 30\n")
        .expect("put");

    let started = Instant::now();
    let out = fnrun(&host, &["invoke", "spin"]);
    assert_eq!(out.status.code(), Some(exit_codes::TIMEOUT), "{out:?}");
    assert!(out.stdout.is_empty());
    assert!(started.elapsed() < Duration::from_secs(10));
}
