//! Process-level checks of the `danmu-probe` binary's argument handling.

use std::process::Command;

fn probe() -> Command {
    let mut cmd = Command::new(env!("CARGO_BIN_EXE_danmu-probe"));
    // keep the run hermetic: no user config file
    cmd.env("DANMU_CONFIG", "/nonexistent/danmu/config.toml");
    cmd
}

#[test]
fn missing_room_id_exits_with_usage() {
    let out = probe().output().unwrap();
    assert_eq!(out.status.code(), Some(2));
    let stderr = String::from_utf8_lossy(&out.stderr);
    assert!(stderr.contains("Usage: danmu-probe <ROOM_ID>"), "stderr: {stderr}");
    assert!(out.stdout.is_empty());
}

#[test]
fn non_numeric_room_id_exits_with_usage() {
    let out = probe().arg("not-a-room").output().unwrap();
    assert_eq!(out.status.code(), Some(2));
    assert!(String::from_utf8_lossy(&out.stderr).contains("invalid room id"));
}
