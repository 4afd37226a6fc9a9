use assert_cmd::Command;
use tempfile::tempdir;

// Keeps config, history and logs out of the real home directory.
fn typr(home: &std::path::Path) -> Command {
    let mut cmd = Command::cargo_bin("typr").unwrap();
    cmd.env("HOME", home).env("XDG_CONFIG_HOME", home.join(".config"));
    cmd
}

#[test]
fn help_lists_flags() {
    let home = tempdir().unwrap();
    let out = typr(home.path()).arg("--help").assert().success();
    let stdout = String::from_utf8_lossy(&out.get_output().stdout).to_string();
    for flag in ["--mode", "--words", "--time", "--prompt", "--no-history", "--history"] {
        assert!(stdout.contains(flag), "missing {flag}");
    }
}

#[test]
fn unknown_mode_is_a_usage_error() {
    let home = tempdir().unwrap();
    typr(home.path()).args(["--mode", "poem"]).assert().code(2);
}

#[test]
fn non_ascii_prompt_is_rejected_before_the_terminal_opens() {
    let home = tempdir().unwrap();
    let out = typr(home.path())
        .args(["--no-history", "-p", "héllo"])
        .write_stdin("")
        .assert()
        .code(2);
    let stderr = String::from_utf8_lossy(&out.get_output().stderr).to_string();
    assert!(stderr.contains("printable ASCII"));
}

#[test]
fn history_flag_prints_without_a_terminal() {
    let home = tempdir().unwrap();
    let out = typr(home.path()).arg("--history").assert().success();
    let stdout = String::from_utf8_lossy(&out.get_output().stdout).to_string();
    assert!(stdout.contains("No previous sessions yet."));
}
