//! Platform-specific helpers.
//! This module hides OS differences (Linux vs other Unixes) behind a uniform API
//! so the temp-file code can stay free of `cfg` noise.
//!
//! Everything here is a thin `*at` syscall wrapper returning `io::Result`; the
//! callers attach paths and map errors into `TmpError`.

mod common_unix;
#[cfg(target_os = "linux")]
mod linux;
#[cfg(not(target_os = "linux"))]
mod other_unix;

pub use common_unix::DirFd;
pub(crate) use common_unix::{
    fchmod, fsync_dir, fsync_parent, linkat, mkdirat, openat, parent_or_dot, renameat, unlinkat,
};

#[cfg(target_os = "linux")]
pub(crate) use linux::{linkat_fd, open_tmpfile, renameat_noreplace};

#[cfg(not(target_os = "linux"))]
pub(crate) use other_unix::{linkat_fd, open_tmpfile, renameat_noreplace};

use std::fs::{self, File, OpenOptions};
use std::io;
use std::os::unix::fs::{OpenOptionsExt, PermissionsExt};
use std::path::Path;

/// Open log file for appending; set 0600 only when creating a new file.
/// If the file already exists, we preserve its existing permissions to avoid
/// clobbering administrator adjustments (e.g. group-readable for log shipping).
pub fn open_log_file_secure_append(path: &Path) -> io::Result<File> {
    if let Some(parent) = path.parent() {
        let _ = fs::create_dir_all(parent);
    }
    let existed = path.exists();
    let f = OpenOptions::new()
        .create(true)
        .append(true)
        .mode(0o600) // applies on create
        .open(path)?;
    if !existed {
        let _ = fs::set_permissions(path, fs::Permissions::from_mode(0o600));
    }
    Ok(f)
}
