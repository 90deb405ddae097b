//! Hidden, randomly named temp siblings.

use std::fs::File;
use std::io::BufWriter;
use std::path::{Path, PathBuf};
use tracing::trace;

use crate::errors::{Result, TmpError};
use crate::naming::tempfn_random;
use crate::platform::DirFd;
use crate::secure::{secure_create_at, DEFAULT_FILE_MODE, MAX_ATTEMPTS};

/// Create `.#<name><random>` next to `target` (relative to `dir`), retrying
/// collisions up to `MAX_ATTEMPTS`.
pub(super) fn create_random_sibling(
    dir: DirFd<'_>,
    target: &Path,
    flags: libc::c_int,
    mode: u32,
) -> Result<(File, PathBuf)> {
    for attempt in 1..=MAX_ATTEMPTS {
        let tmp = tempfn_random(target, None)?;
        match secure_create_at(dir, &tmp, flags, mode) {
            Ok(file) => return Ok((file, tmp)),
            Err(TmpError::NameCollision(p)) => {
                trace!(attempt, path = %p.display(), "temp sibling taken; retrying");
            }
            Err(e) => return Err(e),
        }
    }
    Err(TmpError::ResourceExhausted(format!(
        "no free temp name next to '{}' after {MAX_ATTEMPTS} attempts",
        target.display()
    )))
}

/// Create a 0600 hidden sibling of `path`. The caller writes it and renames
/// it into place (or removes it); both descriptor and path are the caller's.
pub fn open_temporary_at(dir: DirFd<'_>, path: &Path) -> Result<(File, PathBuf)> {
    create_random_sibling(dir, path, 0, DEFAULT_FILE_MODE)
}

/// Buffered form of `open_temporary_at`.
pub fn fopen_temporary_at(dir: DirFd<'_>, path: &Path) -> Result<(BufWriter<File>, PathBuf)> {
    let (file, tmp) = open_temporary_at(dir, path)?;
    Ok((BufWriter::new(file), tmp))
}

/// `fopen_temporary_at` relative to the working directory.
pub fn fopen_temporary(path: &Path) -> Result<(BufWriter<File>, PathBuf)> {
    fopen_temporary_at(DirFd::Cwd, path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use std::io::Write;
    use std::os::fd::AsFd;
    use std::os::unix::fs::PermissionsExt;
    use tempfile::tempdir;

    #[test]
    fn temporary_is_hidden_sibling_with_0600() {
        let td = tempdir().unwrap();
        let target = td.path().join("state.json");
        let (mut w, tmp) = fopen_temporary(&target).unwrap();
        w.write_all(b"{}").unwrap();
        w.flush().unwrap();

        assert_eq!(tmp.parent(), Some(td.path()));
        assert!(tmp.file_name().unwrap().to_str().unwrap().starts_with(".#state.json"));
        let mode = fs::metadata(&tmp).unwrap().permissions().mode() & 0o777;
        assert_eq!(mode, 0o600);
        assert!(!target.exists());

        fs::rename(&tmp, &target).unwrap();
        assert_eq!(fs::read(&target).unwrap(), b"{}");
    }

    #[test]
    fn temporary_at_is_relative_to_dir_fd() {
        let td = tempdir().unwrap();
        let dir = File::open(td.path()).unwrap();
        let (_f, tmp) = open_temporary_at(DirFd::from(dir.as_fd()), Path::new("rel.txt")).unwrap();
        assert!(tmp.is_relative());
        assert!(td.path().join(&tmp).is_file());
    }
}
