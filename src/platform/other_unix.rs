//! Non-Linux Unix implementations.
//! No pathless-create primitive exists here, so linkable files always take
//! the named-temp + rename route.

use std::io;
use std::os::fd::{BorrowedFd, OwnedFd};
use std::path::Path;

use super::common_unix::{rename_noreplace_emulated, DirFd};

pub(crate) fn open_tmpfile(_dir: DirFd<'_>, _path: &Path, _flags: libc::c_int, _mode: u32) -> io::Result<OwnedFd> {
    Err(io::Error::new(io::ErrorKind::Unsupported, "O_TMPFILE is Linux-only"))
}

pub(crate) fn linkat_fd(_fd: BorrowedFd<'_>, _dir: DirFd<'_>, _path: &Path) -> io::Result<()> {
    Err(io::Error::new(io::ErrorKind::Unsupported, "linking a descriptor is Linux-only"))
}

pub(crate) fn renameat_noreplace(
    old_dir: DirFd<'_>,
    old: &Path,
    new_dir: DirFd<'_>,
    new: &Path,
) -> io::Result<()> {
    rename_noreplace_emulated(old_dir, old, new_dir, new)
}
