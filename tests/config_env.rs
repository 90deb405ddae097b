#![cfg(unix)]

// Every test here is serial: one of them points TMPDIR at a relative path,
// which breaks tempdir() in anything running alongside it.

use atomic_tmp::config::{load_config, resolve_config_path, LoadResult, LogLevel, CONFIG_ENV};
use atomic_tmp::tmp_dir;
use serial_test::serial;
use std::fs;
use std::os::unix::fs::PermissionsExt;
use std::path::PathBuf;
use std::process::Command;
use tempfile::tempdir;

#[test]
#[serial]
fn env_config_is_loaded() {
    let td = tempdir().unwrap();
    let cfg_path = td.path().join("custom.xml");
    fs::write(
        &cfg_path,
        "<config>\n  <file_mode>0640</file_mode>\n  <log_level>info</log_level>\n</config>\n",
    )
    .unwrap();

    unsafe {
        std::env::set_var(CONFIG_ENV, &cfg_path);
    }
    let loaded = load_config(None);
    unsafe {
        std::env::remove_var(CONFIG_ENV);
    }

    match loaded.unwrap() {
        LoadResult::Loaded(cfg, path) => {
            assert_eq!(path, cfg_path);
            assert_eq!(cfg.file_mode, 0o640);
            assert_eq!(cfg.log_level, LogLevel::Info);
        }
        other => panic!("expected a loaded config, got {other:?}"),
    }
}

#[test]
#[serial]
fn explicit_flag_beats_env() {
    let td = tempdir().unwrap();
    let flag = td.path().join("flag.xml");
    unsafe {
        std::env::set_var(CONFIG_ENV, td.path().join("env.xml"));
    }
    let resolved = resolve_config_path(Some(&flag));
    unsafe {
        std::env::remove_var(CONFIG_ENV);
    }
    assert_eq!(resolved.unwrap(), flag);
}

#[test]
#[serial]
fn missing_env_config_is_an_error() {
    let td = tempdir().unwrap();
    unsafe {
        std::env::set_var(CONFIG_ENV, td.path().join("absent.xml"));
    }
    let loaded = load_config(None);
    unsafe {
        std::env::remove_var(CONFIG_ENV);
    }
    assert!(loaded.is_err());
}

#[test]
#[serial]
fn tmp_dir_honours_env_and_falls_back() {
    let td = tempdir().unwrap();
    let saved: Vec<_> = ["TMPDIR", "TEMP", "TMP"].iter().map(|v| (*v, std::env::var_os(v))).collect();

    unsafe {
        std::env::set_var("TMPDIR", td.path());
    }
    assert_eq!(tmp_dir(), td.path());

    unsafe {
        std::env::set_var("TMPDIR", "relative/dir");
        std::env::remove_var("TEMP");
        std::env::set_var("TMP", td.path());
    }
    assert_eq!(tmp_dir(), td.path(), "relative TMPDIR must be skipped");

    unsafe {
        std::env::remove_var("TMPDIR");
        std::env::remove_var("TMP");
    }
    assert_eq!(tmp_dir(), PathBuf::from("/tmp"));

    for (var, val) in saved {
        unsafe {
            match val {
                Some(v) => std::env::set_var(var, v),
                None => std::env::remove_var(var),
            }
        }
    }
}

#[test]
#[serial]
fn init_config_writes_template_once_via_binary() {
    let td = tempdir().unwrap();
    let cfg_path = td.path().join("conf/atomic_tmp/config.xml");
    let me = assert_cmd::cargo::cargo_bin!("atomic_tmp");

    let out = Command::new(me)
        .env(CONFIG_ENV, &cfg_path)
        .arg("--init-config")
        .output()
        .expect("run binary");
    assert!(out.status.success(), "{}", String::from_utf8_lossy(&out.stderr));
    assert_eq!(fs::metadata(&cfg_path).unwrap().permissions().mode() & 0o777, 0o600);

    let again = Command::new(me)
        .env(CONFIG_ENV, &cfg_path)
        .arg("--init-config")
        .output()
        .expect("run binary");
    assert_eq!(again.status.code(), Some(14));
}

#[test]
#[serial]
fn print_config_reports_flag_path() {
    let td = tempdir().unwrap();
    let cfg_path = td.path().join("where.xml");
    let out = Command::new(assert_cmd::cargo::cargo_bin!("atomic_tmp"))
        .arg("--config")
        .arg(&cfg_path)
        .arg("--print-config")
        .output()
        .expect("run binary");
    assert!(out.status.success());
    assert_eq!(String::from_utf8_lossy(&out.stdout).trim_end(), cfg_path.display().to_string());
}

#[test]
#[serial]
fn unknown_config_field_fails_the_run() {
    let td = tempdir().unwrap();
    let cfg_path = td.path().join("bad.xml");
    fs::write(&cfg_path, "<config><completed_base>/x</completed_base></config>").unwrap();
    let out = Command::new(assert_cmd::cargo::cargo_bin!("atomic_tmp"))
        .env(CONFIG_ENV, &cfg_path)
        .args(["name", "/a/b"])
        .output()
        .expect("run binary");
    assert!(!out.status.success());
    assert!(String::from_utf8_lossy(&out.stderr).contains("unknown field"));
}
