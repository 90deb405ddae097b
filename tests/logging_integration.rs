#![cfg(unix)]

//! File logging through the config: the log file is created 0600 and gets
//! one JSON object per event when --json is set.

use std::fs;
use std::os::unix::fs::{symlink, PermissionsExt};
use std::process::Command;
use tempfile::tempdir;

fn write_config(dir: &std::path::Path, log_file: &std::path::Path) -> std::path::PathBuf {
    let cfg = dir.join("config.xml");
    fs::write(
        &cfg,
        format!(
            "<config>\n  <log_level>debug</log_level>\n  <log_file>{}</log_file>\n</config>\n",
            log_file.display()
        ),
    )
    .unwrap();
    cfg
}

#[test]
fn json_events_reach_the_log_file() {
    let td = tempdir().unwrap();
    let log = td.path().join("logs/atomic_tmp.log");
    fs::create_dir_all(log.parent().unwrap()).unwrap();
    let cfg = write_config(td.path(), &log);
    let target = td.path().join("out");

    let out = Command::new(assert_cmd::cargo::cargo_bin!("atomic_tmp"))
        .arg("--config")
        .arg(&cfg)
        .arg("--json")
        .arg("write")
        .arg(&target)
        .stdin(std::process::Stdio::null())
        .output()
        .expect("run binary");
    assert!(out.status.success(), "{}", String::from_utf8_lossy(&out.stderr));
    assert_eq!(fs::read(&target).unwrap(), b"");

    assert_eq!(fs::metadata(&log).unwrap().permissions().mode() & 0o777, 0o600);
    let contents = fs::read_to_string(&log).unwrap();
    let published = contents
        .lines()
        .find(|l| l.contains("\"published\""))
        .unwrap_or_else(|| panic!("no publish event in log:\n{contents}"));
    assert!(published.trim_start().starts_with('{'), "not JSON: {published}");
}

#[test]
fn symlinked_log_directory_is_refused() {
    let td = tempdir().unwrap();
    let real = td.path().join("real");
    fs::create_dir(&real).unwrap();
    let link = td.path().join("link");
    symlink(&real, &link).unwrap();
    let cfg = write_config(td.path(), &link.join("atomic_tmp.log"));

    let out = Command::new(assert_cmd::cargo::cargo_bin!("atomic_tmp"))
        .arg("--config")
        .arg(&cfg)
        .args(["name", "/a/b"])
        .output()
        .expect("run binary");
    assert!(out.status.success());
    assert!(String::from_utf8_lossy(&out.stderr).contains("symlink"));
    assert_eq!(fs::read_dir(&real).unwrap().count(), 0);
}
