//! Crash test harness for subprocess management

use std::path::Path;
use std::process::{Command, ExitStatus};

/// Result of running the binary
#[derive(Debug)]
pub struct CrashTestResult {
    /// Whether the process exited unsuccessfully
    pub crashed: bool,
    /// Exit status
    pub exit_status: ExitStatus,
    /// stdout output
    pub stdout: String,
    /// stderr output
    pub stderr: String,
}

/// Runs `keeldb <args>` with no crash point
pub fn run_cli(args: &[&str]) -> CrashTestResult {
    execute(None, args)
}

/// Runs `keeldb <args>` with `KEELDB_CRASH_POINT=crash_point`
pub fn execute_with_crash_point(crash_point: &str, args: &[&str]) -> CrashTestResult {
    execute(Some(crash_point), args)
}

fn execute(crash_point: Option<&str>, args: &[&str]) -> CrashTestResult {
    let mut command = Command::new(env!("CARGO_BIN_EXE_keeldb"));
    command.args(args).env_remove("KEELDB_CRASH_POINT");
    if let Some(point) = crash_point {
        command.env("KEELDB_CRASH_POINT", point);
    }

    let output = command.output().expect("Failed to execute keeldb");
    CrashTestResult {
        crashed: !output.status.success(),
        exit_status: output.status,
        stdout: String::from_utf8_lossy(&output.stdout).to_string(),
        stderr: String::from_utf8_lossy(&output.stderr).to_string(),
    }
}

/// Parses the `data` object of a successful command
pub fn response_data(result: &CrashTestResult) -> serde_json::Value {
    assert!(
        !result.crashed,
        "command failed: {:?}\nstderr: {}",
        result.exit_status, result.stderr
    );
    let response: serde_json::Value =
        serde_json::from_str(result.stdout.trim()).expect("stdout is not JSON");
    assert_eq!(response["status"], "ok");
    response["data"].clone()
}

/// Creates a database at `path` and commits one document. Returns the
/// checkpoint.
pub fn create_with_one_document(path: &Path) -> u64 {
    let path = path.to_str().expect("utf-8 temp path");
    response_data(&run_cli(&["create", path]));
    let put = response_data(&run_cli(&["put", path, "first", r#"{"n":1}"#]));
    put["checkpoint"].as_u64().expect("checkpoint id")
}
