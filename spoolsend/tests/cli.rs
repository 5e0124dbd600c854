//! The `spoolsend` binary's exit codes
#![allow(clippy::unwrap_used)]

mod support;

use std::{fs, path::Path, process::Command};

use spoolsend::{LockFileGuard, RunGuard};
use support::{MESSAGE, config_ron, listing, write};

fn spoolsend(config: &Path) -> Command {
    let mut command = Command::new(env!("CARGO_BIN_EXE_spoolsend"));
    command
        .arg("--config")
        .arg(config)
        .env_remove("SPOOLSEND_CONFIG")
        .env("LOG_LEVEL", "off");
    command
}

#[test]
fn empty_spool_exits_zero() {
    let dir = tempfile::tempdir().unwrap();
    let spool = dir.path().join("spool");
    fs::create_dir(&spool).unwrap();
    let config = dir.path().join("spoolsend.config.ron");
    fs::write(&config, config_ron(&spool, &dir.path().join("run.lock"))).unwrap();

    let status = spoolsend(&config).arg("batch-send").status().unwrap();

    assert!(status.success());
}

#[test]
fn legacy_command_name_is_accepted() {
    let dir = tempfile::tempdir().unwrap();
    let config = dir.path().join("spoolsend.config.ron");
    fs::write(
        &config,
        config_ron(&dir.path().join("absent"), &dir.path().join("run.lock")),
    )
    .unwrap();

    let status = spoolsend(&config)
        .args(["email:batch_send", "--bypass-locking"])
        .status()
        .unwrap();

    assert!(status.success());
}

#[test]
fn missing_region_exits_non_zero() {
    let dir = tempfile::tempdir().unwrap();
    let spool = dir.path().join("spool");
    fs::create_dir(&spool).unwrap();
    write(&spool, "a.message", MESSAGE);

    let config = dir.path().join("spoolsend.config.ron");
    let content = config_ron(&spool, &dir.path().join("run.lock"))
        .replace(r#"region: "eu-west-1","#, r#"region: "","#);
    fs::write(&config, content).unwrap();

    let output = spoolsend(&config).arg("batch-send").output().unwrap();

    assert!(!output.status.success());
    assert!(String::from_utf8_lossy(&output.stderr).contains("ses.region"));
    assert_eq!(listing(&spool), ["a.message"]);
}

#[test]
fn missing_config_file_exits_non_zero() {
    let dir = tempfile::tempdir().unwrap();

    let status = spoolsend(&dir.path().join("nope.ron"))
        .arg("batch-send")
        .status()
        .unwrap();

    assert!(!status.success());
}

#[test]
fn active_batch_exits_zero_without_touching_the_spool() {
    let dir = tempfile::tempdir().unwrap();
    let spool = dir.path().join("spool");
    fs::create_dir(&spool).unwrap();
    write(&spool, "a.message", MESSAGE);

    let lock = dir.path().join("run.lock");
    let config = dir.path().join("spoolsend.config.ron");
    fs::write(&config, config_ron(&spool, &lock)).unwrap();

    let mut holder = LockFileGuard::new(&lock);
    assert!(holder.check_run_status().unwrap());

    let status = spoolsend(&config).arg("batch-send").status().unwrap();

    assert!(status.success());
    assert_eq!(listing(&spool), ["a.message"]);
}
