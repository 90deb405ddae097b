//! Common Unix helpers shared by Linux and other Unix targets.
//! Wraps the `*at` family so every operation can be scoped to a directory
//! descriptor instead of re-resolving paths.

use std::ffi::CString;
use std::io;
use std::os::fd::{AsFd, AsRawFd, BorrowedFd, FromRawFd, OwnedFd, RawFd};
use std::os::unix::ffi::OsStrExt;
use std::path::Path;

/// Directory that relative paths are resolved against.
#[derive(Debug, Clone, Copy, Default)]
pub enum DirFd<'a> {
    /// The process working directory (`AT_FDCWD`).
    #[default]
    Cwd,
    /// An open directory descriptor.
    Fd(BorrowedFd<'a>),
}

impl<'a> DirFd<'a> {
    pub(crate) fn raw(&self) -> RawFd {
        match self {
            DirFd::Cwd => libc::AT_FDCWD,
            DirFd::Fd(fd) => fd.as_raw_fd(),
        }
    }

    /// Duplicate into an owned reference (None stands for the working directory).
    pub(crate) fn try_clone_to_owned(&self) -> io::Result<Option<OwnedFd>> {
        match self {
            DirFd::Cwd => Ok(None),
            DirFd::Fd(fd) => fd.try_clone_to_owned().map(Some),
        }
    }

    pub(crate) fn from_owned(fd: Option<&'a OwnedFd>) -> Self {
        match fd {
            Some(fd) => DirFd::Fd(fd.as_fd()),
            None => DirFd::Cwd,
        }
    }
}

impl<'a> From<BorrowedFd<'a>> for DirFd<'a> {
    fn from(fd: BorrowedFd<'a>) -> Self {
        DirFd::Fd(fd)
    }
}

pub(super) fn cstr(path: &Path) -> io::Result<CString> {
    CString::new(path.as_os_str().as_bytes())
        .map_err(|_| io::Error::new(io::ErrorKind::InvalidInput, "path contains null byte"))
}

pub(super) fn cvt(ret: libc::c_int) -> io::Result<libc::c_int> {
    if ret == -1 {
        Err(io::Error::last_os_error())
    } else {
        Ok(ret)
    }
}

/// `openat(2)` with `O_CLOEXEC` always set.
pub(crate) fn openat(dir: DirFd<'_>, path: &Path, flags: libc::c_int, mode: u32) -> io::Result<OwnedFd> {
    let c_path = cstr(path)?;
    unsafe {
        let fd = cvt(libc::openat(
            dir.raw(),
            c_path.as_ptr(),
            flags | libc::O_CLOEXEC,
            mode as libc::c_uint,
        ))?;
        Ok(OwnedFd::from_raw_fd(fd))
    }
}

pub(crate) fn mkdirat(dir: DirFd<'_>, path: &Path, mode: u32) -> io::Result<()> {
    let c_path = cstr(path)?;
    unsafe { cvt(libc::mkdirat(dir.raw(), c_path.as_ptr(), mode as libc::mode_t)).map(drop) }
}

/// `unlinkat(2)`; pass `libc::AT_REMOVEDIR` to remove a directory.
pub(crate) fn unlinkat(dir: DirFd<'_>, path: &Path, flags: libc::c_int) -> io::Result<()> {
    let c_path = cstr(path)?;
    unsafe { cvt(libc::unlinkat(dir.raw(), c_path.as_ptr(), flags)).map(drop) }
}

pub(crate) fn renameat(old_dir: DirFd<'_>, old: &Path, new_dir: DirFd<'_>, new: &Path) -> io::Result<()> {
    let c_old = cstr(old)?;
    let c_new = cstr(new)?;
    unsafe {
        cvt(libc::renameat(old_dir.raw(), c_old.as_ptr(), new_dir.raw(), c_new.as_ptr())).map(drop)
    }
}

pub(crate) fn linkat(
    old_dir: DirFd<'_>,
    old: &Path,
    new_dir: DirFd<'_>,
    new: &Path,
    flags: libc::c_int,
) -> io::Result<()> {
    let c_old = cstr(old)?;
    let c_new = cstr(new)?;
    unsafe {
        cvt(libc::linkat(
            old_dir.raw(),
            c_old.as_ptr(),
            new_dir.raw(),
            c_new.as_ptr(),
            flags,
        ))
        .map(drop)
    }
}

pub(crate) fn fchmod(fd: BorrowedFd<'_>, mode: u32) -> io::Result<()> {
    unsafe { cvt(libc::fchmod(fd.as_raw_fd(), mode as libc::mode_t)).map(drop) }
}

/// fsync a directory so a rename/link into it survives a crash.
pub(crate) fn fsync_dir(dir: DirFd<'_>, path: &Path) -> io::Result<()> {
    let fd = openat(dir, path, libc::O_RDONLY | libc::O_DIRECTORY, 0)?;
    unsafe { cvt(libc::fsync(fd.as_raw_fd())).map(drop) }
}

/// fsync the directory containing `path`.
pub(crate) fn fsync_parent(dir: DirFd<'_>, path: &Path) -> io::Result<()> {
    fsync_dir(dir, parent_or_dot(path))
}

pub(crate) fn parent_or_dot(path: &Path) -> &Path {
    match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    }
}

/// Create-only rename for kernels/filesystems without `RENAME_NOREPLACE`:
/// hard-link the new name (fails with EEXIST if taken), then drop the old one.
/// Filesystems without hard links get a check-then-rename, which is racy but
/// the best that can be done there.
pub(super) fn rename_noreplace_emulated(
    old_dir: DirFd<'_>,
    old: &Path,
    new_dir: DirFd<'_>,
    new: &Path,
) -> io::Result<()> {
    match linkat(old_dir, old, new_dir, new, 0) {
        Ok(()) => {
            if let Err(e) = unlinkat(old_dir, old, 0) {
                if let Err(rm) = unlinkat(new_dir, new, 0) {
                    tracing::warn!(new = %new.display(), error = %rm, "failed to roll back link after unlink failure");
                }
                return Err(e);
            }
            Ok(())
        }
        Err(e) if matches!(e.raw_os_error(), Some(libc::EPERM | libc::EOPNOTSUPP | libc::EINVAL)) => {
            tracing::debug!(error = %e, new = %new.display(), "hard links unsupported; check-then-rename");
            let c_new = cstr(new)?;
            let exists = unsafe {
                libc::faccessat(new_dir.raw(), c_new.as_ptr(), libc::F_OK, libc::AT_SYMLINK_NOFOLLOW) == 0
            };
            if exists {
                return Err(io::Error::from_raw_os_error(libc::EEXIST));
            }
            renameat(old_dir, old, new_dir, new)
        }
        Err(e) => Err(e),
    }
}
