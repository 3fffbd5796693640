//! Integration tests for core CLI contract behavior.
//!
//! None of these tests need a printer attached: every device subcommand is
//! expected to fail with "not found" on a machine without one.

use {predicates::prelude::*, std::fs, tempfile::tempdir};

fn cli_cmd() -> assert_cmd::Command {
    let mut cmd = assert_cmd::cargo::cargo_bin_cmd!("modt");
    for var in [
        "MODT_NO_STATUS_LOOP",
        "MODT_STATUS_INTERVAL",
        "MODT_TIMEOUT_MS",
        "RUST_LOG",
    ] {
        cmd.env_remove(var);
    }
    cmd
}

#[test]
fn help_exits_zero_and_writes_stdout_only() {
    let mut cmd = cli_cmd();
    cmd.arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("modt"))
        .stdout(predicate::str::contains("send_gcode"))
        .stderr(predicate::str::is_empty());
}

#[test]
fn version_exits_zero_and_writes_stdout_only() {
    let mut cmd = cli_cmd();
    cmd.arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains("modt"))
        .stderr(predicate::str::is_empty());
}

#[test]
fn subcommand_help_lists_upload_flags() {
    let mut cmd = cli_cmd();
    cmd.args(["send_gcode", "--help"])
        .assert()
        .success()
        .stdout(predicate::str::contains("--print-blocks"))
        .stdout(predicate::str::contains("--print-status"))
        .stdout(predicate::str::contains("--job-id"));
}

// ============================================================================
// Exit Code Tests
// ============================================================================

/// Exit code 0: successful operations
#[test]
fn exit_code_zero_for_completions() {
    let mut cmd = cli_cmd();
    cmd.args(["completions", "bash"])
        .assert()
        .success()
        .code(0)
        .stdout(predicate::str::contains("modt"));
}

/// Exit code 2: usage error (unknown command, invalid arguments)
#[test]
fn exit_code_two_without_subcommand() {
    let mut cmd = cli_cmd();
    cmd.assert()
        .failure()
        .code(2);
}

#[test]
fn exit_code_two_for_usage_error_unknown_command() {
    let mut cmd = cli_cmd();
    cmd.arg("unknown-command-xyz")
        .assert()
        .failure()
        .code(2)
        .stderr(predicate::str::contains("unrecognized").or(predicate::str::contains("unknown")));
}

#[test]
fn exit_code_two_for_usage_error_invalid_interval() {
    let mut cmd = cli_cmd();
    cmd.args(["--status-interval", "soon", "status"])
        .assert()
        .failure()
        .code(2);
}

#[test]
fn exit_code_two_for_zero_interval_in_loop() {
    let dir = tempdir().expect("tempdir should be created");
    let mut cmd = cli_cmd();
    cmd.current_dir(dir.path())
        .args(["--status-interval", "0", "status"])
        .assert()
        .failure()
        .code(2)
        .stdout(predicate::str::is_empty())
        .stderr(predicate::str::contains("--status-interval"));
}

#[test]
fn exit_code_two_for_completions_without_shell() {
    let mut cmd = cli_cmd();
    cmd.env_remove("SHELL")
        .env_remove("PSModulePath")
        .arg("completions")
        .assert()
        .failure()
        .code(2)
        .stderr(predicate::str::contains("shell"));
}

/// Exit code 1: device not found
#[test]
fn exit_code_one_when_no_printer_is_attached() {
    let dir = tempdir().expect("tempdir should be created");
    let mut cmd = cli_cmd();
    cmd.current_dir(dir.path())
        .args(["--no-status-loop", "status"])
        .assert()
        .failure()
        .code(1)
        .stdout(predicate::str::is_empty())
        .stderr(predicate::str::contains("Error"));
}

#[test]
fn send_gcode_reads_file_before_opening_the_printer() {
    let dir = tempdir().expect("tempdir should be created");
    let missing = dir
        .path()
        .join("missing.gcode");

    let mut cmd = cli_cmd();
    cmd.current_dir(dir.path())
        .arg("send_gcode")
        .arg(missing.as_os_str())
        .assert()
        .failure()
        .code(1)
        .stdout(predicate::str::is_empty())
        .stderr(predicate::str::contains("Failed to read g-code file"))
        .stderr(predicate::str::contains("printer").not());
}

/// Invalid config files are warnings, not fatal
#[test]
fn invalid_local_config_is_reported_and_ignored() {
    let dir = tempdir().expect("tempdir should be created");
    fs::write(dir.path().join("modt.toml"), "invalid toml [[[").expect("write invalid config");

    let mut cmd = cli_cmd();
    cmd.current_dir(dir.path())
        .args(["--no-status-loop", "status"])
        .assert()
        .failure()
        .code(1)
        .stderr(predicate::str::contains("Failed to parse config file"));
}

#[test]
fn config_flag_file_is_used() {
    let dir = tempdir().expect("tempdir should be created");
    let config = dir
        .path()
        .join("custom.toml");
    fs::write(&config, "[status]\nloop = false\ninterval_secs = 0\n").expect("write config");

    // loop = false from the file makes a zero interval acceptable, so the
    // run gets as far as opening the printer
    let mut cmd = cli_cmd();
    cmd.current_dir(dir.path())
        .arg("--config")
        .arg(config.as_os_str())
        .arg("status")
        .assert()
        .failure()
        .code(1);
}
