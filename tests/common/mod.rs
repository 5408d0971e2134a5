#![allow(dead_code)]

use assert_cmd::Command;
use std::path::Path;

/// `memotrack` binary isolated in `home`
pub fn memotrack_cmd(home: &Path) -> Command {
    let mut cmd = Command::cargo_bin("memotrack").unwrap();
    cmd.env("MEMOTRACK_HOME", home);
    cmd.env_remove("MEMOTRACK_LOG");
    cmd
}

/// Run a command that must succeed and return its stdout
pub fn run_ok(home: &Path, args: &[&str]) -> String {
    let output = memotrack_cmd(home).args(args).output().unwrap();
    assert!(
        output.status.success(),
        "memotrack {:?} failed: {}",
        args,
        String::from_utf8_lossy(&output.stderr)
    );
    String::from_utf8(output.stdout).unwrap()
}
