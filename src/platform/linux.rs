//! Linux implementations: `O_TMPFILE`, descriptor linking and `renameat2`.

use std::io;
use std::os::fd::{AsRawFd, BorrowedFd, OwnedFd};
use std::path::{Path, PathBuf};

use tracing::{debug, trace};

use super::common_unix::{cstr, cvt, linkat, openat, rename_noreplace_emulated, DirFd};

/// Open an anonymous file in directory `path` (relative to `dir`).
/// `flags` may carry `O_EXCL` to make the file permanently unlinkable.
pub(crate) fn open_tmpfile(dir: DirFd<'_>, path: &Path, flags: libc::c_int, mode: u32) -> io::Result<OwnedFd> {
    trace!(dir = %path.display(), "openat O_TMPFILE");
    openat(dir, path, libc::O_TMPFILE | libc::O_RDWR | flags, mode)
}

fn proc_mounted() -> bool {
    Path::new("/proc/self/fd").is_dir()
}

/// Give the anonymous file behind `fd` the name `path`. Fails with EEXIST
/// rather than replacing an existing entry.
pub(crate) fn linkat_fd(fd: BorrowedFd<'_>, dir: DirFd<'_>, path: &Path) -> io::Result<()> {
    let proc_path = PathBuf::from(format!("/proc/self/fd/{}", fd.as_raw_fd()));
    match linkat(DirFd::Cwd, &proc_path, dir, path, libc::AT_SYMLINK_FOLLOW) {
        Err(e) if e.raw_os_error() == Some(libc::ENOENT) && !proc_mounted() => {
            // AT_EMPTY_PATH needs CAP_DAC_READ_SEARCH, so it is only the second choice.
            debug!("/proc not mounted; linking with AT_EMPTY_PATH");
            linkat(
                DirFd::Fd(fd),
                Path::new(""),
                dir,
                path,
                libc::AT_EMPTY_PATH,
            )
        }
        other => other,
    }
}

/// Rename that fails with EEXIST instead of replacing the target.
pub(crate) fn renameat_noreplace(
    old_dir: DirFd<'_>,
    old: &Path,
    new_dir: DirFd<'_>,
    new: &Path,
) -> io::Result<()> {
    let c_old = cstr(old)?;
    let c_new = cstr(new)?;
    let ret = unsafe {
        libc::syscall(
            libc::SYS_renameat2,
            old_dir.raw() as libc::c_long,
            c_old.as_ptr(),
            new_dir.raw() as libc::c_long,
            c_new.as_ptr(),
            libc::RENAME_NOREPLACE as libc::c_long,
        )
    };
    match cvt(ret as libc::c_int) {
        Ok(_) => Ok(()),
        Err(e) if matches!(e.raw_os_error(), Some(libc::EINVAL | libc::ENOSYS | libc::EOPNOTSUPP)) => {
            debug!(error = %e, "renameat2(RENAME_NOREPLACE) unsupported; emulating");
            rename_noreplace_emulated(old_dir, old, new_dir, new)
        }
        Err(e) => Err(e),
    }
}
