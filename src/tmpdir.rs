//! Temporary directories: same naming and collision handling as files,
//! created with `mkdir`. Nothing here removes a directory automatically.

use std::fs;
use std::io;
use std::os::fd::OwnedFd;
use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};
use tracing::{debug, trace, warn};

use crate::errors::{Result, TmpError};
use crate::naming::{tmp_dir, PathTemplate};
use crate::platform::{self, DirFd};
use crate::secure::MAX_ATTEMPTS;

/// Default mode for temporary directories: owner only.
pub const DEFAULT_DIR_MODE: u32 = 0o700;

/// A created temporary directory. The caller owns it and removes it.
#[derive(Debug)]
pub struct TmpDir {
    path: PathBuf,
    fd: Option<OwnedFd>,
}

impl TmpDir {
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// The open directory, for the `*_at` functions. Falls back to the
    /// working directory when the handle was created without a descriptor,
    /// so pair it with absolute paths in that case.
    pub fn as_dir(&self) -> DirFd<'_> {
        DirFd::from_owned(self.fd.as_ref())
    }

    pub fn has_fd(&self) -> bool {
        self.fd.is_some()
    }

    /// Close any descriptor and hand back the path.
    pub fn into_path(self) -> PathBuf {
        self.path
    }
}

fn default_template() -> Result<PathTemplate> {
    PathTemplate::in_dir(&tmp_dir(), "")
}

/// Create a directory from `template` (default `<tmpdir>/XXXXXX`) with mode 0700.
pub fn mkdtemp(template: Option<&PathTemplate>) -> Result<PathBuf> {
    mkdtemp_with_mode(template, DEFAULT_DIR_MODE)
}

/// `mkdtemp` with an explicit mode, applied exactly (umask is compensated
/// after creation, never widened before it).
pub fn mkdtemp_with_mode(template: Option<&PathTemplate>, mode: u32) -> Result<PathBuf> {
    let owned;
    let template = match template {
        Some(t) => t,
        None => {
            owned = default_template()?;
            &owned
        }
    };

    for attempt in 1..=MAX_ATTEMPTS {
        let candidate = template.candidate();
        match platform::mkdirat(DirFd::Cwd, &candidate, mode) {
            Ok(()) => {
                if let Err(e) = fs::set_permissions(&candidate, fs::Permissions::from_mode(mode)) {
                    remove_quietly(&candidate);
                    return Err(TmpError::io("chmod", &candidate, e));
                }
                debug!(path = %candidate.display(), mode = %format!("{mode:o}"), "created temp directory");
                return Ok(candidate);
            }
            Err(e) if e.kind() == io::ErrorKind::AlreadyExists => {
                trace!(attempt, path = %candidate.display(), "temp directory name taken; retrying");
            }
            Err(e) => return Err(TmpError::io("mkdir", &candidate, e)),
        }
    }
    Err(TmpError::ResourceExhausted(format!(
        "no free directory name for template '{template}' after {MAX_ATTEMPTS} attempts"
    )))
}

/// `mkdtemp`, then open the new directory with `O_DIRECTORY|O_CLOEXEC|flags`.
/// If the open fails the directory is removed again.
pub fn mkdtemp_open(template: Option<&PathTemplate>, flags: libc::c_int) -> Result<TmpDir> {
    let path = mkdtemp(template)?;
    let open_flags = libc::O_DIRECTORY | libc::O_RDONLY | libc::O_NOFOLLOW | flags;
    match platform::openat(DirFd::Cwd, &path, open_flags, 0) {
        Ok(fd) => Ok(TmpDir { path, fd: Some(fd) }),
        Err(e) => {
            remove_quietly(&path);
            Err(TmpError::io("open directory", &path, e))
        }
    }
}

fn remove_quietly(path: &Path) {
    if let Err(e) = platform::unlinkat(DirFd::Cwd, path, libc::AT_REMOVEDIR) {
        warn!(path = %path.display(), error = %e, "failed to remove temp directory after error");
    }
}
