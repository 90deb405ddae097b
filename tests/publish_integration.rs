#![cfg(unix)]

use atomic_tmp::{
    fopen_temporary, open_tmpfile_linkable, open_tmpfile_linkable_at, open_tmpfile_unlinkable,
    LinkStrategy, Overwrite, PublishOptions, TmpError,
};
use assert_fs::prelude::*;
use std::fs::{self, File};
use std::io::Write;
use std::os::fd::AsFd;
use std::os::unix::fs::PermissionsExt;
use std::path::Path;
use std::sync::{Arc, Barrier};
use std::thread;

fn mode_of(p: &Path) -> u32 {
    fs::metadata(p).unwrap().permissions().mode() & 0o7777
}

#[test]
fn published_file_has_written_bytes_and_requested_mode() {
    let dir = assert_fs::TempDir::new().unwrap();
    for (i, mode) in [0o600u32, 0o640, 0o644, 0o400].into_iter().enumerate() {
        let target = dir.child(format!("out{i}"));
        let mut tmp = open_tmpfile_linkable(target.path(), 0, mode).unwrap();
        let payload = format!("payload {i}\n").repeat(1000);
        tmp.write_all(payload.as_bytes()).unwrap();
        let published = tmp.publish(target.path()).unwrap();
        assert_eq!(published.path(), target.path());

        assert_eq!(fs::read_to_string(target.path()).unwrap(), payload);
        assert_eq!(mode_of(target.path()), mode);
    }
    // Only the four targets remain: no transient dot-files.
    assert_eq!(fs::read_dir(dir.path()).unwrap().count(), 4);
}

#[test]
fn concurrent_publishes_to_distinct_targets_do_not_mix() {
    const K: usize = 32;
    let dir = Arc::new(assert_fs::TempDir::new().unwrap());
    let barrier = Arc::new(Barrier::new(K));

    let handles: Vec<_> = (0..K)
        .map(|i| {
            let dir = Arc::clone(&dir);
            let barrier = Arc::clone(&barrier);
            thread::spawn(move || {
                let target = dir.path().join(format!("t{i}"));
                let mut tmp = open_tmpfile_linkable(&target, 0, 0o600).unwrap();
                barrier.wait();
                for _ in 0..100 {
                    write!(tmp, "{i};").unwrap();
                }
                tmp.publish(&target).unwrap();
            })
        })
        .collect();
    for h in handles {
        h.join().unwrap();
    }

    for i in 0..K {
        let content = fs::read_to_string(dir.path().join(format!("t{i}"))).unwrap();
        assert_eq!(content, format!("{i};").repeat(100), "target t{i} mixed content");
    }
    assert_eq!(fs::read_dir(dir.path()).unwrap().count(), K);
}

#[test]
fn concurrent_create_only_publishes_to_one_target_have_one_winner() {
    const K: usize = 16;
    let dir = Arc::new(assert_fs::TempDir::new().unwrap());
    let barrier = Arc::new(Barrier::new(K));
    let handles: Vec<_> = (0..K)
        .map(|i| {
            let dir = Arc::clone(&dir);
            let barrier = Arc::clone(&barrier);
            thread::spawn(move || {
                let target = dir.path().join("lock");
                let mut tmp = open_tmpfile_linkable(&target, 0, 0o600).unwrap();
                write!(tmp, "owner={i}").unwrap();
                barrier.wait();
                match tmp.publish(&target) {
                    Ok(_) => Some(i),
                    Err(e) => {
                        assert!(matches!(e.error, TmpError::TargetExists(_)), "{e:?}");
                        e.file.discard().unwrap();
                        None
                    }
                }
            })
        })
        .collect();
    let winners: Vec<usize> = handles.into_iter().filter_map(|h| h.join().unwrap()).collect();
    assert_eq!(winners.len(), 1);
    let content = fs::read_to_string(dir.path().join("lock")).unwrap();
    assert_eq!(content, format!("owner={}", winners[0]));
    assert_eq!(fs::read_dir(dir.path()).unwrap().count(), 1);
}

#[test]
fn create_only_publish_onto_existing_target_is_refused() {
    let dir = assert_fs::TempDir::new().unwrap();
    let target = dir.child("config");
    target.write_str("original").unwrap();

    let mut tmp = open_tmpfile_linkable(target.path(), 0, 0o600).unwrap();
    tmp.write_all(b"intruder").unwrap();
    let err = tmp.publish(target.path()).unwrap_err();
    assert_eq!(err.error.code(), 14);
    assert!(err.error.hint().is_some());
    err.file.discard().unwrap();

    target.assert("original");
    assert_eq!(fs::read_dir(dir.path()).unwrap().count(), 1);
}

#[test]
fn replace_publish_swaps_content_and_mode() {
    let dir = assert_fs::TempDir::new().unwrap();
    let target = dir.child("state");
    target.write_str("v1").unwrap();
    fs::set_permissions(target.path(), fs::Permissions::from_mode(0o644)).unwrap();

    let mut tmp = open_tmpfile_linkable(target.path(), 0, 0o600).unwrap();
    tmp.write_all(b"v2").unwrap();
    let published = tmp
        .publish_with(target.path(), PublishOptions { overwrite: Overwrite::Replace, sync: true })
        .unwrap();
    assert!(matches!(published.strategy(), LinkStrategy::Descriptor | LinkStrategy::Rename));

    target.assert("v2");
    assert_eq!(mode_of(target.path()), 0o600);
    assert_eq!(fs::read_dir(dir.path()).unwrap().count(), 1);
}

#[test]
fn published_stream_stays_usable() {
    let dir = assert_fs::TempDir::new().unwrap();
    let target = dir.child("log");
    let mut tmp = open_tmpfile_linkable(target.path(), 0, 0o600).unwrap();
    tmp.write_all(b"first\n").unwrap();
    let mut file: File = tmp.publish(target.path()).unwrap().into_inner();
    file.write_all(b"second\n").unwrap();
    target.assert("first\nsecond\n");
}

#[test]
fn relative_target_resolves_against_directory_descriptor() {
    let dir = assert_fs::TempDir::new().unwrap();
    let sub = dir.child("sub");
    sub.create_dir_all().unwrap();
    let handle = File::open(sub.path()).unwrap();

    let mut tmp = open_tmpfile_linkable_at(handle.as_fd().into(), Path::new("rel.txt"), 0, 0o600).unwrap();
    tmp.write_all(b"relative").unwrap();
    tmp.publish("rel.txt").unwrap();
    sub.child("rel.txt").assert("relative");
}

#[test]
fn named_temporary_then_manual_rename() {
    let dir = assert_fs::TempDir::new().unwrap();
    let target = dir.child("manual.json");
    let (mut w, tmp_path) = fopen_temporary(target.path()).unwrap();
    w.write_all(b"[]").unwrap();
    w.flush().unwrap();
    assert!(tmp_path.file_name().unwrap().to_str().unwrap().starts_with(".#manual.json"));
    fs::rename(&tmp_path, target.path()).unwrap();
    target.assert("[]");
}

#[test]
fn unlinkable_file_never_appears_in_directory() {
    let dir = assert_fs::TempDir::new().unwrap();
    let mut files = Vec::new();
    for _ in 0..8 {
        let mut f = open_tmpfile_unlinkable(Some(dir.path()), 0).unwrap();
        f.write_all(b"scratch").unwrap();
        files.push(f);
    }
    assert_eq!(fs::read_dir(dir.path()).unwrap().count(), 0);
}
